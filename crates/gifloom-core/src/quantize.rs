//! NeuQuant color quantization.
//!
//! This module implements Anthony Dekker's NeuQuant algorithm: a Kohonen
//! self-organizing network of 256 neurons that learns a representative
//! palette from sampled pixels of one frame. Fixed-point arithmetic
//! throughout (neuron weights scaled by 16) keeps the learning loop
//! integer-only and fully deterministic.

// ============================================================================
// Network Constants
// ============================================================================

/// Number of neurons, and therefore palette entries.
const NET_SIZE: usize = 256;
const MAX_NET_POS: usize = NET_SIZE - 1;

/// Number of alpha/radius decay cycles over one learning pass.
const N_CYCLES: i32 = 100;

// Four primes near 500, all assumed greater than any likely image width.
// The sampling stride is built from the first of these that does not evenly
// divide the pixel-byte length, so successive samples never land on the
// same image column.
const PRIME1: usize = 499;
const PRIME2: usize = 491;
const PRIME3: usize = 487;
const PRIME4: usize = 503;

/// Below this many input bytes every third pixel is sampled instead.
const MIN_PICTURE_BYTES: usize = 3 * PRIME4;

/// Bias of neuron weights relative to 8-bit color values.
const NET_BIAS_SHIFT: i32 = 4;

const INT_BIAS_SHIFT: i32 = 16;
const INT_BIAS: i32 = 1 << INT_BIAS_SHIFT;
const GAMMA_SHIFT: i32 = 10;
const BETA_SHIFT: i32 = 10;
const BETA: i32 = INT_BIAS >> BETA_SHIFT;
const BETA_GAMMA: i32 = INT_BIAS << (GAMMA_SHIFT - BETA_SHIFT);

// The neighborhood radius starts at a 32-neuron span and decays by a
// factor of 1/30 each cycle, reaching zero after ~100 cycles.
const INIT_RAD: i32 = (NET_SIZE as i32) >> 3;
const RADIUS_BIAS_SHIFT: i32 = 6;
const RADIUS_BIAS: i32 = 1 << RADIUS_BIAS_SHIFT;
const INIT_RADIUS: i32 = INIT_RAD * RADIUS_BIAS;
const RADIUS_DEC: i32 = 30;

const ALPHA_BIAS_SHIFT: i32 = 10;
const INIT_ALPHA: i32 = 1 << ALPHA_BIAS_SHIFT;

const RAD_BIAS_SHIFT: i32 = 8;
const RAD_BIAS: i32 = 1 << RAD_BIAS_SHIFT;
const ALPHA_RAD_SHIFT: i32 = ALPHA_BIAS_SHIFT + RAD_BIAS_SHIFT;
const ALPHA_RAD_BIAS: i32 = 1 << ALPHA_RAD_SHIFT;

// ============================================================================
// Quantizer
// ============================================================================

/// A learned 256-color quantization network.
///
/// Construction runs the full learning pass; afterwards the network is
/// immutable and only serves palette extraction and nearest-color lookups.
pub struct NeuQuant {
    /// Neuron weights as (red, green, blue), green-sorted after learning.
    network: [[i32; 3]; NET_SIZE],
    /// For each green value, the network position to start searching from.
    net_index: [usize; 256],
    /// Per-neuron selection bias ("conscience"), learning scratch.
    bias: [i32; NET_SIZE],
    /// Per-neuron selection frequency, learning scratch.
    freq: [i32; NET_SIZE],
    /// Radial falloff weights for the current neighborhood radius.
    rad_power: [i32; INIT_RAD as usize],
}

impl NeuQuant {
    /// Learn a palette from RGB pixel data.
    ///
    /// # Arguments
    /// * `pixels` - RGB pixel data (3 bytes per pixel, row-major order)
    /// * `sample_factor` - sampling stride divisor (1-30); 1 samples every
    ///   pixel and gives the highest fidelity, larger values are faster.
    ///   Values below 1 are clamped to 1.
    pub fn new(pixels: &[u8], sample_factor: i32) -> Self {
        let mut quant = Self::init();
        quant.learn(pixels, sample_factor.clamp(1, 30));
        quant.unbias();
        quant.build_index();
        quant
    }

    /// The learned palette as 256 packed RGB triples (768 bytes).
    ///
    /// Entry order matches the indices returned by [`Self::index_of`].
    pub fn palette(&self) -> [u8; 768] {
        let mut palette = [0u8; 768];
        for (entry, neuron) in palette.chunks_exact_mut(3).zip(self.network.iter()) {
            entry[0] = neuron[0] as u8;
            entry[1] = neuron[1] as u8;
            entry[2] = neuron[2] as u8;
        }
        palette
    }

    /// Index of the palette entry nearest to an RGB color.
    ///
    /// Searches outward from the green bucket matching the query's green
    /// value, pruning a direction once the green distance alone exceeds the
    /// best match so far. Ties resolve to the first minimal entry found.
    pub fn index_of(&self, r: u8, g: u8, b: u8) -> u8 {
        let (r, g, b) = (i32::from(r), i32::from(g), i32::from(b));
        let mut best_dist = 1000;
        let mut best = 0usize;

        let mut up = self.net_index[g as usize];
        let mut down = up as isize - 1;

        while up < NET_SIZE || down >= 0 {
            if up < NET_SIZE {
                let neuron = &self.network[up];
                let green_dist = neuron[1] - g;
                if green_dist >= best_dist {
                    // Everything further up is even greener.
                    up = NET_SIZE;
                } else {
                    let dist = green_dist.abs() + (neuron[0] - r).abs() + (neuron[2] - b).abs();
                    if dist < best_dist {
                        best_dist = dist;
                        best = up;
                    }
                    up += 1;
                }
            }
            if down >= 0 {
                let neuron = &self.network[down as usize];
                let green_dist = g - neuron[1];
                if green_dist >= best_dist {
                    down = -1;
                } else {
                    let dist = green_dist.abs() + (neuron[0] - r).abs() + (neuron[2] - b).abs();
                    if dist < best_dist {
                        best_dist = dist;
                        best = down as usize;
                    }
                    down -= 1;
                }
            }
        }

        best as u8
    }

    // ========================================================================
    // Learning
    // ========================================================================

    /// Neurons start evenly spaced along the gray diagonal, with uniform
    /// frequency and zero bias.
    fn init() -> Self {
        let mut network = [[0i32; 3]; NET_SIZE];
        for (i, neuron) in network.iter_mut().enumerate() {
            let v = ((i as i32) << (NET_BIAS_SHIFT + 8)) / NET_SIZE as i32;
            *neuron = [v, v, v];
        }
        Self {
            network,
            net_index: [0; 256],
            bias: [0; NET_SIZE],
            freq: [INT_BIAS / NET_SIZE as i32; NET_SIZE],
            rad_power: [0; INIT_RAD as usize],
        }
    }

    /// One full learning pass over the sampled pixels.
    fn learn(&mut self, pixels: &[u8], sample_factor: i32) {
        let length = pixels.len();
        let sample_factor = if length < MIN_PICTURE_BYTES { 1 } else { sample_factor };

        let alpha_dec = 30 + (sample_factor - 1) / 3;
        let sample_count = length / (3 * sample_factor as usize);
        let delta = (sample_count as i32 / N_CYCLES).max(1);

        let mut alpha = INIT_ALPHA;
        let mut radius = INIT_RADIUS;
        let mut rad = radius >> RADIUS_BIAS_SHIFT;
        if rad <= 1 {
            rad = 0;
        }
        self.fill_rad_power(rad, alpha);

        // Stride over whole pixels; a prime stride that does not divide the
        // buffer length walks every residue class and avoids periodic bias.
        let step = if length < MIN_PICTURE_BYTES {
            3
        } else if length % PRIME1 != 0 {
            3 * PRIME1
        } else if length % PRIME2 != 0 {
            3 * PRIME2
        } else if length % PRIME3 != 0 {
            3 * PRIME3
        } else {
            3 * PRIME4
        };

        let mut pos = 0usize;
        for i in 1..=sample_count as i32 {
            let r = i32::from(pixels[pos]) << NET_BIAS_SHIFT;
            let g = i32::from(pixels[pos + 1]) << NET_BIAS_SHIFT;
            let b = i32::from(pixels[pos + 2]) << NET_BIAS_SHIFT;

            let winner = self.contest(r, g, b);
            self.alter_single(alpha, winner, r, g, b);
            if rad != 0 {
                self.alter_neighbors(rad, winner, r, g, b);
            }

            pos += step;
            if pos >= length {
                pos -= length;
            }

            if i % delta == 0 {
                alpha -= alpha / alpha_dec;
                radius -= radius / RADIUS_DEC;
                rad = radius >> RADIUS_BIAS_SHIFT;
                if rad <= 1 {
                    rad = 0;
                }
                self.fill_rad_power(rad, alpha);
            }
        }
    }

    /// Recompute the radial falloff table for the current radius and alpha.
    fn fill_rad_power(&mut self, rad: i32, alpha: i32) {
        let rad_sq = rad * rad;
        for (i, power) in self.rad_power.iter_mut().take(rad.max(0) as usize).enumerate() {
            let i = i as i32;
            *power = alpha * (((rad_sq - i * i) * RAD_BIAS) / rad_sq);
        }
    }

    /// Find the best-matching neuron, and the frequency-biased winner.
    ///
    /// The conscience mechanism: every neuron's frequency decays and its
    /// bias grows, while the closest neuron gets a frequency boost and a
    /// bias penalty. The returned winner minimizes distance minus bias, so
    /// frequently-chosen neurons yield to starved ones and no neuron dies.
    fn contest(&mut self, r: i32, g: i32, b: i32) -> usize {
        let mut best_dist = i32::MAX;
        let mut best_bias_dist = i32::MAX;
        let mut best_pos = 0usize;
        let mut best_bias_pos = 0usize;

        for i in 0..NET_SIZE {
            let neuron = &self.network[i];
            let dist = (neuron[0] - r).abs() + (neuron[1] - g).abs() + (neuron[2] - b).abs();
            if dist < best_dist {
                best_dist = dist;
                best_pos = i;
            }

            let bias_dist = dist - (self.bias[i] >> (INT_BIAS_SHIFT - NET_BIAS_SHIFT));
            if bias_dist < best_bias_dist {
                best_bias_dist = bias_dist;
                best_bias_pos = i;
            }

            let beta_freq = self.freq[i] >> BETA_SHIFT;
            self.freq[i] -= beta_freq;
            self.bias[i] += beta_freq << GAMMA_SHIFT;
        }

        self.freq[best_pos] += BETA;
        self.bias[best_pos] -= BETA_GAMMA;
        best_bias_pos
    }

    /// Move one neuron toward the sample color by the learning rate.
    fn alter_single(&mut self, alpha: i32, i: usize, r: i32, g: i32, b: i32) {
        let neuron = &mut self.network[i];
        neuron[0] -= alpha * (neuron[0] - r) / INIT_ALPHA;
        neuron[1] -= alpha * (neuron[1] - g) / INIT_ALPHA;
        neuron[2] -= alpha * (neuron[2] - b) / INIT_ALPHA;
    }

    /// Move the winner's neighbors toward the sample color, weighted by the
    /// radial falloff table.
    fn alter_neighbors(&mut self, rad: i32, i: usize, r: i32, g: i32, b: i32) {
        let i = i as i32;
        let lo = (i - rad).max(-1);
        let hi = (i + rad).min(NET_SIZE as i32);

        let mut up = i + 1;
        let mut down = i - 1;
        let mut m = 1usize;
        while up < hi || down > lo {
            let power = self.rad_power[m];
            m += 1;
            if up < hi {
                let neuron = &mut self.network[up as usize];
                neuron[0] -= power * (neuron[0] - r) / ALPHA_RAD_BIAS;
                neuron[1] -= power * (neuron[1] - g) / ALPHA_RAD_BIAS;
                neuron[2] -= power * (neuron[2] - b) / ALPHA_RAD_BIAS;
                up += 1;
            }
            if down > lo {
                let neuron = &mut self.network[down as usize];
                neuron[0] -= power * (neuron[0] - r) / ALPHA_RAD_BIAS;
                neuron[1] -= power * (neuron[1] - g) / ALPHA_RAD_BIAS;
                neuron[2] -= power * (neuron[2] - b) / ALPHA_RAD_BIAS;
                down -= 1;
            }
        }
    }

    // ========================================================================
    // Index construction
    // ========================================================================

    /// Scale neuron weights back down to 8-bit color values.
    fn unbias(&mut self) {
        for neuron in self.network.iter_mut() {
            neuron[0] >>= NET_BIAS_SHIFT;
            neuron[1] >>= NET_BIAS_SHIFT;
            neuron[2] >>= NET_BIAS_SHIFT;
        }
    }

    /// Sort the network by green value and record, for each possible green,
    /// where a nearest-color search should start.
    fn build_index(&mut self) {
        let mut previous_green = 0usize;
        let mut start_pos = 0usize;

        for i in 0..NET_SIZE {
            let mut small_pos = i;
            let mut small_val = self.network[i][1];
            for j in (i + 1)..NET_SIZE {
                if self.network[j][1] < small_val {
                    small_pos = j;
                    small_val = self.network[j][1];
                }
            }
            self.network.swap(i, small_pos);

            let small_val = small_val as usize;
            if small_val != previous_green {
                self.net_index[previous_green] = (start_pos + i) >> 1;
                for slot in &mut self.net_index[(previous_green + 1)..small_val] {
                    *slot = i;
                }
                previous_green = small_val;
                start_pos = i;
            }
        }

        self.net_index[previous_green] = (start_pos + MAX_NET_POS) >> 1;
        for slot in &mut self.net_index[(previous_green + 1)..] {
            *slot = MAX_NET_POS;
        }
    }
}
