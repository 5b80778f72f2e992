// src/encode/lzw.rs

//! GIF-flavored LZW compression of palette-indexed pixels.
//!
//! Strings are looked up in an open-addressing hash table keyed on
//! (prefix code, next symbol), with double hashing and a relatively prime
//! secondary probe (Knuth vol. 3, algorithm D, with G. Knott's probe). Codes
//! are variable width, packed LSB-first and emitted in sub-blocks of at most
//! 254 bytes, each preceded by its length.
//!
//! Two growth rules apply:
//! - when the next code would not fit the current width, the width grows by
//!   one bit, up to 12 bits;
//! - when all 4096 codes are assigned, a Clear code is emitted and the table
//!   starts over at the initial width.

use crate::gif::byte_array::ByteArray;
use log::trace;

/// Hard ceiling on code width.
const BITS: u32 = 12;

/// Number of codes available at the widest setting.
const MAX_CODES: u32 = 1 << BITS;

/// Hash table capacity (about 80% occupancy at 4096 codes).
const HSIZE: usize = 5003;

/// Largest number of payload bytes in one sub-block.
const MAX_PACKET: usize = 254;

/// Counters from one compression run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LzwStats {
    /// Codes written, including Clear and End codes.
    pub codes: usize,
    /// Times the table filled up and was reset mid-stream.
    pub table_clears: usize,
    /// Bytes appended to the output, including sub-block headers.
    pub bytes: usize,
}

/// Compressor for a single frame's indexed pixels.
///
/// All state is per frame: build one, call [`encode`](Self::encode), drop it.
pub struct LzwEncoder {
    init_code_size: u8,

    htab: Vec<i32>,
    codetab: Vec<u16>,

    n_bits: u32,
    maxcode: u32,
    init_bits: u32,
    clear_code: u32,
    eof_code: u32,
    free_ent: u32,
    clear_flag: bool,

    cur_accum: u32,
    cur_bits: u32,

    packet: [u8; 256],
    packet_len: usize,

    stats: LzwStats,
}

impl LzwEncoder {
    /// Creates a compressor for symbols of `color_depth` bits (at least 2).
    pub fn new(color_depth: u8) -> Self {
        LzwEncoder {
            init_code_size: color_depth.clamp(2, 8),
            htab: vec![-1; HSIZE],
            codetab: vec![0; HSIZE],
            n_bits: 0,
            maxcode: 0,
            init_bits: 0,
            clear_code: 0,
            eof_code: 0,
            free_ent: 0,
            clear_flag: false,
            cur_accum: 0,
            cur_bits: 0,
            packet: [0; 256],
            packet_len: 0,
            stats: LzwStats::default(),
        }
    }

    /// Writes the minimum code size byte, the compressed sub-blocks and the
    /// zero-length terminator block.
    pub fn encode(mut self, pixels: &[u8], out: &mut ByteArray) -> LzwStats {
        let start = out.len();
        out.write_byte(self.init_code_size);
        self.compress(self.init_code_size as u32 + 1, pixels, out);
        out.write_byte(0);

        self.stats.bytes = out.len() - start;
        trace!(
            "lzw: {} pixels -> {} bytes, {} codes, {} table clears",
            pixels.len(),
            self.stats.bytes,
            self.stats.codes,
            self.stats.table_clears
        );
        self.stats
    }

    fn compress(&mut self, init_bits: u32, pixels: &[u8], out: &mut ByteArray) {
        self.init_bits = init_bits;
        self.clear_flag = false;
        self.n_bits = init_bits;
        self.maxcode = max_code(self.n_bits);

        self.clear_code = 1 << (init_bits - 1);
        self.eof_code = self.clear_code + 1;
        self.free_ent = self.clear_code + 2;
        self.packet_len = 0;
        self.cur_accum = 0;
        self.cur_bits = 0;

        // Shift that spreads an 8-bit symbol over the table range.
        let mut hshift = 0;
        let mut fcode = HSIZE;
        while fcode < 65536 {
            hshift += 1;
            fcode *= 2;
        }
        let hshift = 8 - hshift;

        self.clear_hash();
        self.output(self.clear_code, out);

        let Some((&first, rest)) = pixels.split_first() else {
            self.output(self.eof_code, out);
            return;
        };
        let mut ent = first as u32;

        'outer: for &c in rest {
            let c = c as u32;
            let fcode = ((c << BITS) + ent) as i32;
            let mut i = ((c << hshift) ^ ent) as usize;

            if self.htab[i] == fcode {
                ent = self.codetab[i] as u32;
                continue;
            }
            if self.htab[i] >= 0 {
                // Secondary probe.
                let disp = if i == 0 { 1 } else { HSIZE - i };
                loop {
                    i = if i >= disp { i - disp } else { i + HSIZE - disp };
                    if self.htab[i] == fcode {
                        ent = self.codetab[i] as u32;
                        continue 'outer;
                    }
                    if self.htab[i] < 0 {
                        break;
                    }
                }
            }

            self.output(ent, out);
            ent = c;
            if self.free_ent < MAX_CODES {
                self.codetab[i] = self.free_ent as u16;
                self.free_ent += 1;
                self.htab[i] = fcode;
            } else {
                self.clear_block(out);
            }
        }

        self.output(ent, out);
        self.output(self.eof_code, out);
    }

    fn clear_hash(&mut self) {
        self.htab.fill(-1);
    }

    /// Resets the table and tells the decoder to do the same.
    fn clear_block(&mut self, out: &mut ByteArray) {
        self.clear_hash();
        self.free_ent = self.clear_code + 2;
        self.clear_flag = true;
        self.stats.table_clears += 1;
        self.output(self.clear_code, out);
    }

    fn output(&mut self, code: u32, out: &mut ByteArray) {
        self.stats.codes += 1;

        self.cur_accum &= mask(self.cur_bits);
        if self.cur_bits > 0 {
            self.cur_accum |= code << self.cur_bits;
        } else {
            self.cur_accum = code;
        }
        self.cur_bits += self.n_bits;

        while self.cur_bits >= 8 {
            self.char_out((self.cur_accum & 0xFF) as u8, out);
            self.cur_accum >>= 8;
            self.cur_bits -= 8;
        }

        // Widen once the next code would not fit, or drop back after a clear.
        if self.free_ent > self.maxcode || self.clear_flag {
            if self.clear_flag {
                self.n_bits = self.init_bits;
                self.maxcode = max_code(self.n_bits);
                self.clear_flag = false;
            } else {
                self.n_bits += 1;
                self.maxcode = if self.n_bits == BITS {
                    MAX_CODES
                } else {
                    max_code(self.n_bits)
                };
            }
        }

        if code == self.eof_code {
            while self.cur_bits > 0 {
                self.char_out((self.cur_accum & 0xFF) as u8, out);
                self.cur_accum >>= 8;
                self.cur_bits = self.cur_bits.saturating_sub(8);
            }
            self.flush_packet(out);
        }
    }

    fn char_out(&mut self, byte: u8, out: &mut ByteArray) {
        self.packet[self.packet_len] = byte;
        self.packet_len += 1;
        if self.packet_len >= MAX_PACKET {
            self.flush_packet(out);
        }
    }

    fn flush_packet(&mut self, out: &mut ByteArray) {
        if self.packet_len > 0 {
            out.write_byte(self.packet_len as u8);
            out.write_bytes(&self.packet[..self.packet_len]);
            self.packet_len = 0;
        }
    }
}

#[inline]
fn max_code(n_bits: u32) -> u32 {
    (1 << n_bits) - 1
}

#[inline]
fn mask(bits: u32) -> u32 {
    (1u32 << bits) - 1
}

/// Compresses `pixels` (8-bit palette indices) into `out`.
pub fn encode_indexed(pixels: &[u8], out: &mut ByteArray) -> LzwStats {
    LzwEncoder::new(8).encode(pixels, out)
}
