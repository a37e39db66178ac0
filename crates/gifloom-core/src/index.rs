//! Palette-index mapping for one frame.
//!
//! This module maps every pixel of a frame to its nearest palette entry
//! using a learned [`NeuQuant`] network, and tracks which palette entries
//! were actually referenced so transparency can be resolved against real
//! colors only.

use crate::quantize::NeuQuant;

/// One frame mapped through a palette.
pub struct IndexedFrame {
    /// One palette index per pixel, in row-major order.
    pub indices: Vec<u8>,
    /// Which palette entries were referenced by at least one pixel.
    pub used: [bool; 256],
}

/// Map RGB pixel data to palette indices.
///
/// # Arguments
/// * `pixels` - RGB pixel data (3 bytes per pixel, row-major order)
/// * `quant` - the quantization network learned from this frame
pub fn index_frame(pixels: &[u8], quant: &NeuQuant) -> IndexedFrame {
    let mut indices = Vec::with_capacity(pixels.len() / 3);
    let mut used = [false; 256];

    for chunk in pixels.chunks_exact(3) {
        let idx = quant.index_of(chunk[0], chunk[1], chunk[2]);
        used[idx as usize] = true;
        indices.push(idx);
    }

    IndexedFrame { indices, used }
}

/// Find the used palette entry closest to a requested transparent color.
///
/// Only entries referenced by the frame are considered; marking an
/// unreferenced slot transparent would punch holes where no pixel ever
/// pointed. Returns `None` when no entry is used (an empty frame).
pub fn transparent_index(palette: &[u8; 768], used: &[bool; 256], color: [u8; 3]) -> Option<u8> {
    let mut best: Option<(u8, u32)> = None;

    for (i, entry) in palette.chunks_exact(3).enumerate() {
        if !used[i] {
            continue;
        }
        let dist = squared_distance(entry, color);
        if best.is_none_or(|(_, d)| dist < d) {
            best = Some((i as u8, dist));
        }
    }

    best.map(|(i, _)| i)
}

/// Squared Euclidean distance between two RGB colors.
#[inline]
fn squared_distance(entry: &[u8], color: [u8; 3]) -> u32 {
    let dr = i32::from(entry[0]) - i32::from(color[0]);
    let dg = i32::from(entry[1]) - i32::from(color[1]);
    let db = i32::from(entry[2]) - i32::from(color[2]);
    (dr * dr + dg * dg + db * db) as u32
}
