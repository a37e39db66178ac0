//! GIF-variant LZW compression.
//!
//! This module compresses a palette-index stream into the GIF LZW bitstream:
//! one minimum-code-size byte, then length-prefixed data sub-blocks, then a
//! zero-length terminator. Codes start one bit wider than the color depth
//! and grow to 12 bits; when the dictionary reaches 4096 entries a Clear
//! code is emitted and the dictionary resets. Decoders depend on exactly
//! this cadence.

/// Maximum code width in bits.
const MAX_BITS: u32 = 12;
/// Dictionary entry limit; reaching it triggers a Clear-code reset.
const MAX_CODES: i32 = 1 << MAX_BITS;
/// Open-addressing hash table size, a prime comfortably above 4096.
const HASH_SIZE: usize = 5003;
/// Sub-block staging capacity, leaving headroom below the 255-byte format
/// limit for the final partial bit flush at end-of-information.
const SUB_BLOCK_CAPACITY: usize = 254;

/// Compress palette indices and append the full image-data block to `out`.
///
/// # Arguments
/// * `indices` - one palette index per pixel, row-major order
/// * `color_depth` - bits per palette index (8 for a 256-entry palette)
/// * `out` - output buffer; receives the minimum-code-size byte, the data
///   sub-blocks, and the terminating zero byte
pub fn compress(indices: &[u8], color_depth: u8, out: &mut Vec<u8>) {
    let min_code_size = color_depth.max(2);
    out.push(min_code_size);

    let mut compressor = Compressor::new(u32::from(min_code_size) + 1, out);
    compressor.compress(indices);

    out.push(0);
}

/// LZW state machine for one image-data block.
///
/// The dictionary is an open-addressed hash table keyed by
/// `(next_index << 12) | prefix_code`, probed with an xor-fold primary hash
/// and a secondary displacement. Only the logical dictionary size
/// (`free_code`) drives Clear-code resets; the physical table just has to
/// be big enough to keep probing cheap.
struct Compressor<'a> {
    out: &'a mut Vec<u8>,

    /// Hash slots: packed `(index << 12) | prefix` keys, -1 when empty.
    hash_keys: Vec<i32>,
    /// Code assigned to the key in the matching `hash_keys` slot.
    hash_codes: Vec<i32>,

    init_bits: u32,
    clear_code: i32,
    eof_code: i32,
    /// Next unassigned dictionary code.
    free_code: i32,
    code_bits: u32,
    /// Largest code representable at the current width.
    max_code: i32,
    /// Set while a Clear has been emitted but the width not yet reset.
    clear_pending: bool,

    /// Little-endian rolling bit accumulator.
    bit_buffer: u32,
    bit_count: u32,

    /// Staged sub-block payload.
    block: [u8; SUB_BLOCK_CAPACITY],
    block_len: usize,
}

impl<'a> Compressor<'a> {
    fn new(init_bits: u32, out: &'a mut Vec<u8>) -> Self {
        let clear_code = 1 << (init_bits - 1);
        Self {
            out,
            hash_keys: vec![-1; HASH_SIZE],
            hash_codes: vec![0; HASH_SIZE],
            init_bits,
            clear_code,
            eof_code: clear_code + 1,
            free_code: clear_code + 2,
            code_bits: init_bits,
            max_code: (1 << init_bits) - 1,
            clear_pending: false,
            bit_buffer: 0,
            bit_count: 0,
            block: [0; SUB_BLOCK_CAPACITY],
            block_len: 0,
        }
    }

    fn compress(&mut self, indices: &[u8]) {
        let Some((&first, rest)) = indices.split_first() else {
            return;
        };

        // Primary hash shift: fold the 12-bit code space onto the table.
        let mut hash_shift = 0u32;
        let mut fcode = HASH_SIZE;
        while fcode < 65536 {
            hash_shift += 1;
            fcode *= 2;
        }
        let hash_shift = 8 - hash_shift;

        self.emit(self.clear_code);

        let mut prefix = i32::from(first);
        for &next in rest {
            let next = i32::from(next);
            let key = (next << MAX_BITS) + prefix;
            let mut slot = ((next << hash_shift) ^ prefix) as usize;

            if self.hash_keys[slot] != key && self.hash_keys[slot] >= 0 {
                // Secondary displacement, relatively prime to the table size.
                let disp = if slot == 0 { 1 } else { HASH_SIZE - slot };
                loop {
                    slot = if slot < disp { slot + HASH_SIZE - disp } else { slot - disp };
                    if self.hash_keys[slot] == key || self.hash_keys[slot] < 0 {
                        break;
                    }
                }
            }

            if self.hash_keys[slot] == key {
                prefix = self.hash_codes[slot];
                continue;
            }

            self.emit(prefix);
            prefix = next;

            if self.free_code < MAX_CODES {
                self.hash_codes[slot] = self.free_code;
                self.hash_keys[slot] = key;
                self.free_code += 1;
            } else {
                // Dictionary full: reset and tell the decoder to do the same.
                self.hash_keys.fill(-1);
                self.free_code = self.clear_code + 2;
                self.clear_pending = true;
                self.emit(self.clear_code);
            }
        }

        self.emit(prefix);
        self.emit(self.eof_code);
    }

    /// Pack one code into the bitstream, then track width transitions.
    fn emit(&mut self, code: i32) {
        debug_assert!(code >= 0 && code < MAX_CODES, "code {code} out of range");

        self.bit_buffer |= (code as u32) << self.bit_count;
        self.bit_count += self.code_bits;
        while self.bit_count >= 8 {
            self.stage((self.bit_buffer & 0xFF) as u8);
            self.bit_buffer >>= 8;
            self.bit_count -= 8;
        }

        // Width grows when the next assigned code would not fit; a pending
        // Clear instead snaps the width back to its initial value.
        if self.free_code > self.max_code || self.clear_pending {
            if self.clear_pending {
                self.code_bits = self.init_bits;
                self.max_code = (1 << self.code_bits) - 1;
                self.clear_pending = false;
            } else {
                self.code_bits += 1;
                self.max_code = if self.code_bits == MAX_BITS {
                    MAX_CODES
                } else {
                    (1 << self.code_bits) - 1
                };
            }
        }

        if code == self.eof_code {
            while self.bit_count > 0 {
                self.stage((self.bit_buffer & 0xFF) as u8);
                self.bit_buffer >>= 8;
                self.bit_count = self.bit_count.saturating_sub(8);
            }
            self.flush_block();
        }
    }

    /// Stage one byte, flushing a full sub-block when the cap is reached.
    fn stage(&mut self, byte: u8) {
        self.block[self.block_len] = byte;
        self.block_len += 1;
        if self.block_len >= SUB_BLOCK_CAPACITY {
            self.flush_block();
        }
    }

    fn flush_block(&mut self) {
        if self.block_len > 0 {
            self.out.push(self.block_len as u8);
            self.out.extend_from_slice(&self.block[..self.block_len]);
            self.block_len = 0;
        }
    }
}
