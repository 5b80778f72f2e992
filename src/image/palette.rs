// src/image/palette.rs

//! Color palettes and the per-frame record of which entries are in use.

use crate::image::image_formats::Pixel;
use bitvec::prelude::*;
use bytemuck::cast_slice;
use std::io::Write;

/// Number of entries in a GIF color table at 8 bits per pixel.
pub const PALETTE_COLORS: usize = 256;

/// Size in bytes of a full color table.
pub const PALETTE_BYTES: usize = PALETTE_COLORS * 3;

/// An ordered list of RGB colors.
///
/// Quantizer output always has 256 entries. Shorter palettes are accepted and
/// padded with zeros when written, so the table on disk is always 768 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Pixel>,
}

impl Palette {
    /// Creates a palette directly from a list of colors. Entries past 256 are dropped.
    pub fn from_colors(mut colors: Vec<Pixel>) -> Self {
        colors.truncate(PALETTE_COLORS);
        Palette { colors }
    }

    /// Returns the number of colors in the palette.
    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Pixel] {
        &self.colors
    }

    /// Returns the color at a given index in the palette.
    #[inline]
    pub fn color(&self, index: u8) -> Option<&Pixel> {
        self.colors.get(index as usize)
    }

    /// Returns the index of the *used* entry closest to `target`
    /// (squared Euclidean distance), or 0 when no entry is used.
    ///
    /// Unused slots are skipped: they may hold leftovers of the learning
    /// process that happen to sit near the target while nothing in the frame
    /// is drawn with them.
    pub fn closest_used(&self, target: Pixel, used: &UsedEntries) -> u8 {
        let mut best = 0usize;
        let mut best_d = u32::MAX;
        for (i, color) in self.colors.iter().enumerate() {
            if !used.is_used(i as u8) {
                continue;
            }
            let d = color.distance_sq(&target);
            if d < best_d {
                best_d = d;
                best = i;
            }
        }
        best as u8
    }

    /// Returns the color table as exactly 768 bytes, zero-filled past the last color.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut table = Vec::with_capacity(PALETTE_BYTES);
        table.extend_from_slice(cast_slice(&self.colors));
        table.resize(PALETTE_BYTES, 0);
        table
    }

    /// Writes the 768-byte color table.
    pub fn write_table<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.to_bytes())
    }
}

/// Which palette slots at least one pixel of the current frame maps to.
#[derive(Debug, Clone, Default)]
pub struct UsedEntries {
    bits: BitArr!(for PALETTE_COLORS),
}

impl UsedEntries {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn mark(&mut self, index: u8) {
        self.bits.set(index as usize, true);
    }

    #[inline]
    pub fn is_used(&self, index: u8) -> bool {
        self.bits[index as usize]
    }

    pub fn count(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn clear(&mut self) {
        self.bits.fill(false);
    }

    /// Marks every index that appears in `indexed`.
    pub fn mark_all(&mut self, indexed: &[u8]) {
        for &index in indexed {
            self.mark(index);
        }
    }
}
