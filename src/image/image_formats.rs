// src/image/image_formats.rs

//! In-memory pixel representations for captured frames.
//!
//! Frames arrive as flat interleaved RGBA bytes. The quantizer and the GIF
//! palette only deal in RGB, so the alpha channel is dropped up front.

use bytemuck::{Pod, Zeroable, cast_slice};

/// A single RGB pixel with 8-bit components.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Pixel {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Pixel { r, g, b }
    }

    pub fn black() -> Self {
        Pixel { r: 0, g: 0, b: 0 }
    }

    pub fn white() -> Self {
        Pixel {
            r: 255,
            g: 255,
            b: 255,
        }
    }

    /// Unpacks a `0xRRGGBB` integer, the form transparent colors take on the wire.
    pub fn from_rgb_hex(rgb: u32) -> Self {
        Pixel {
            r: ((rgb >> 16) & 0xFF) as u8,
            g: ((rgb >> 8) & 0xFF) as u8,
            b: (rgb & 0xFF) as u8,
        }
    }

    pub fn to_rgb_hex(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Squared Euclidean distance between two colors.
    #[inline]
    pub fn distance_sq(&self, other: &Pixel) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

impl From<[u8; 3]> for Pixel {
    fn from(arr: [u8; 3]) -> Self {
        Pixel {
            r: arr[0],
            g: arr[1],
            b: arr[2],
        }
    }
}

impl From<Pixel> for [u8; 3] {
    fn from(p: Pixel) -> Self {
        [p.r, p.g, p.b]
    }
}

/// An RGBA pixel as produced by a canvas read-back.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct RgbaPixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<RgbaPixel> for Pixel {
    fn from(p: RgbaPixel) -> Self {
        Pixel::new(p.r, p.g, p.b)
    }
}

/// Converts interleaved RGBA bytes to RGB bytes, discarding every fourth byte.
///
/// A trailing partial pixel (fewer than 4 bytes) is ignored.
pub fn strip_alpha(rgba: &[u8]) -> Vec<u8> {
    let whole = rgba.len() - rgba.len() % 4;
    let pixels: &[RgbaPixel] = cast_slice(&rgba[..whole]);
    let mut rgb = Vec::with_capacity(pixels.len() * 3);
    for &p in pixels {
        rgb.extend_from_slice(&<[u8; 3]>::from(Pixel::from(p)));
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_alpha_drops_fourth_byte() {
        let rgba = [1, 2, 3, 255, 4, 5, 6, 0, 7, 8, 9, 128];
        assert_eq!(strip_alpha(&rgba), vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn strip_alpha_ignores_partial_tail() {
        let rgba = [10, 20, 30, 40, 50, 60];
        assert_eq!(strip_alpha(&rgba), vec![10, 20, 30]);
        assert!(strip_alpha(&[]).is_empty());
    }

    #[test]
    fn strip_alpha_on_full_frame() {
        let rgba: Vec<u8> = (0..4000u32).map(|i| (i * 31 % 256) as u8).collect();
        let rgb = strip_alpha(&rgba);
        assert_eq!(rgb.len(), 3000);
        for (px, src) in rgb.chunks_exact(3).zip(rgba.chunks_exact(4)) {
            assert_eq!(px, &src[..3]);
        }
    }

    #[test]
    fn hex_conversion() {
        let p = Pixel::from_rgb_hex(0x12AB_EF);
        assert_eq!(p, Pixel::new(0x12, 0xAB, 0xEF));
        assert_eq!(p.to_rgb_hex(), 0x12ABEF);
        assert_eq!(Pixel::from_rgb_hex(0xFF00_0000), Pixel::black());
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Pixel::new(10, 20, 30);
        let b = Pixel::new(13, 16, 30);
        assert_eq!(a.distance_sq(&b), 25);
        assert_eq!(b.distance_sq(&a), 25);
        assert_eq!(a.distance_sq(&a), 0);
    }
}
