// src/gif/encoder.rs

//! Animated GIF89a assembly.
//!
//! Every frame is quantized on its own. The first frame's palette becomes the
//! global color table; later frames carry a local table of their own. Blocks
//! are written in this order:
//!
//! ```text
//! "GIF89a"  Logical Screen Descriptor  Global Color Table  [NETSCAPE2.0 loop]
//! per frame: Graphic Control Extension  Image Descriptor  [Local Color Table]  LZW data
//! 0x3B trailer
//! ```

use crate::encode::lzw::{LzwEncoder, LzwStats};
use crate::gif::byte_array::ByteArray;
use crate::image::image_formats::{Pixel, strip_alpha};
use crate::image::neuquant::NeuQuant;
use crate::image::palette::{Palette, UsedEntries};
use crate::utils::error::{GifError, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use log::{debug, trace};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

const EXTENSION_INTRODUCER: u8 = 0x21;
const APPLICATION_LABEL: u8 = 0xFF;
const GRAPHIC_CONTROL_LABEL: u8 = 0xF9;
const IMAGE_SEPARATOR: u8 = 0x2C;
const TRAILER: u8 = 0x3B;

/// Bits per palette index. Fixed: every table has 256 entries.
const COLOR_DEPTH: u8 = 8;

/// Color table size field: the table holds 2^(n+1) entries.
const PALETTE_SIZE_BITS: u8 = 7;

/// Default quantizer sample factor.
pub const DEFAULT_QUALITY: u32 = 10;

/// How many times the animation plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Repeat {
    /// Play once; no loop extension is written.
    #[default]
    NoLoop,
    /// Loop forever.
    Infinite,
    /// Play this many extra times after the first.
    Times(u16),
}

impl Repeat {
    /// The value stored in the NETSCAPE2.0 extension, if one is written.
    pub fn loop_count(self) -> Option<u16> {
        match self {
            Repeat::NoLoop => None,
            Repeat::Infinite => Some(0),
            Repeat::Times(n) => Some(n),
        }
    }
}

impl From<i32> for Repeat {
    /// Maps the wire encoding: negative = no loop, 0 = forever, N = N extra plays.
    fn from(value: i32) -> Self {
        match value {
            v if v < 0 => Repeat::NoLoop,
            0 => Repeat::Infinite,
            v => Repeat::Times(v.min(u16::MAX as i32) as u16),
        }
    }
}

/// What a decoder does with a frame before drawing the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Disposal {
    Unspecified = 0,
    /// Leave the frame in place.
    None = 1,
    RestoreBackground = 2,
    RestorePrevious = 3,
}

impl TryFrom<u8> for Disposal {
    type Error = GifError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Disposal::Unspecified),
            1 => Ok(Disposal::None),
            2 => Ok(Disposal::RestoreBackground),
            3 => Ok(Disposal::RestorePrevious),
            other => Err(GifError::InvalidArg(format!(
                "disposal code {} out of range 0..=3",
                other
            ))),
        }
    }
}

/// Summary of one written frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSummary {
    /// Zero-based frame number.
    pub index: usize,
    /// Palette slots actually referenced by the frame's pixels.
    pub colors_used: usize,
    /// Palette index flagged transparent, if a transparent color is set.
    pub transparent_index: Option<u8>,
    pub lzw: LzwStats,
}

/// Writes a multi-frame animated GIF into a paged byte buffer.
pub struct GifEncoder {
    width: u16,
    height: u16,

    transparent: Option<Pixel>,
    repeat: Repeat,
    /// Frame delay in hundredths of a second.
    delay: u16,
    dispose: Option<Disposal>,
    sample: u32,

    first_frame: bool,
    frames: usize,
    used: UsedEntries,

    out: ByteArray,
}

impl GifEncoder {
    pub fn new(width: u16, height: u16) -> Self {
        GifEncoder {
            width,
            height,
            transparent: None,
            repeat: Repeat::NoLoop,
            delay: 0,
            dispose: None,
            sample: DEFAULT_QUALITY,
            first_frame: true,
            frames: 0,
            used: UsedEntries::new(),
            out: ByteArray::new(),
        }
    }

    pub fn dimensions(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Sets the delay for the next frames, in milliseconds (stored rounded to 1/100 s).
    pub fn set_delay_ms(&mut self, milliseconds: u32) {
        self.delay = ((milliseconds + 5) / 10).min(u16::MAX as u32) as u16;
    }

    /// Sets the delay from a frame rate: `round(100 / fps)` hundredths.
    pub fn set_frame_rate(&mut self, fps: f32) {
        if fps > 0.0 {
            self.delay = (100.0 / fps).round().min(u16::MAX as f32) as u16;
        }
    }

    pub fn delay(&self) -> u16 {
        self.delay
    }

    /// Overrides the disposal method for the next frames.
    pub fn set_dispose(&mut self, dispose: Disposal) {
        self.dispose = Some(dispose);
    }

    /// Sets the loop behaviour. Only takes effect before the first frame.
    pub fn set_repeat(&mut self, repeat: Repeat) {
        if !self.first_frame {
            debug!("repeat changed after the header was written; ignored");
            return;
        }
        self.repeat = repeat;
    }

    pub fn repeat(&self) -> Repeat {
        self.repeat
    }

    /// Sets the color to treat as transparent in the next frames.
    ///
    /// Quantization moves colors around, so the closest used palette entry of
    /// each frame becomes that frame's transparent index.
    pub fn set_transparent(&mut self, color: Option<Pixel>) {
        self.transparent = color;
    }

    /// Sets the quantizer sample factor. 1 is best and slowest; values below 1 become 1.
    pub fn set_quality(&mut self, quality: u32) {
        self.sample = quality.max(1);
    }

    pub fn frame_count(&self) -> usize {
        self.frames
    }

    /// Palette slots used by the most recently added frame.
    pub fn used_entries(&self) -> &UsedEntries {
        &self.used
    }

    /// Quantizes, compresses and writes one RGBA frame of exactly `width * height * 4` bytes.
    pub fn add_frame(&mut self, rgba: &[u8]) -> Result<FrameSummary> {
        let expected = self.width as usize * self.height as usize * 4;
        if rgba.len() != expected {
            return Err(GifError::DimensionMismatch {
                expected,
                actual: rgba.len(),
            });
        }

        let rgb = strip_alpha(rgba);
        let (palette, indexed) = self.analyze_pixels(&rgb);
        let transparent_index = self
            .transparent
            .map(|color| palette.closest_used(color, &self.used));

        if self.first_frame {
            self.write_header()?;
            self.write_lsd()?;
            palette.write_table(&mut self.out)?;
            if let Some(count) = self.repeat.loop_count() {
                self.write_netscape_ext(count)?;
            }
            debug!(
                "gif: header written for {}x{}, repeat {:?}",
                self.width, self.height, self.repeat
            );
        }

        self.write_graphic_ctrl_ext(transparent_index)?;
        self.write_image_desc()?;
        if !self.first_frame {
            palette.write_table(&mut self.out)?;
        }
        let lzw = LzwEncoder::new(COLOR_DEPTH).encode(&indexed, &mut self.out);

        let summary = FrameSummary {
            index: self.frames,
            colors_used: self.used.count(),
            transparent_index,
            lzw,
        };
        trace!(
            "gif: frame {} uses {} colors, {} compressed bytes",
            summary.index, summary.colors_used, summary.lzw.bytes
        );

        self.first_frame = false;
        self.frames += 1;
        Ok(summary)
    }

    /// Appends the trailer. Frames added afterwards produce an invalid file.
    pub fn finish(&mut self) {
        self.out.write_byte(TRAILER);
        debug!(
            "gif: finished {} frames, {} bytes",
            self.frames,
            self.out.len()
        );
    }

    pub fn stream(&self) -> &ByteArray {
        &self.out
    }

    pub fn into_stream(self) -> ByteArray {
        self.out
    }

    /// Learns the frame's palette and maps every pixel to it.
    fn analyze_pixels(&mut self, rgb: &[u8]) -> (Palette, Vec<u8>) {
        let nq = NeuQuant::new(self.sample, rgb);

        #[cfg(feature = "rayon")]
        let indexed: Vec<u8> = rgb
            .par_chunks_exact(3)
            .map(|p| nq.index_of(p[0], p[1], p[2]))
            .collect();
        #[cfg(not(feature = "rayon"))]
        let indexed: Vec<u8> = rgb
            .chunks_exact(3)
            .map(|p| nq.index_of(p[0], p[1], p[2]))
            .collect();

        self.used.clear();
        self.used.mark_all(&indexed);
        (nq.palette(), indexed)
    }

    fn write_header(&mut self) -> Result<()> {
        self.out.write_ascii("GIF89a");
        Ok(())
    }

    /// Logical Screen Descriptor.
    fn write_lsd(&mut self) -> Result<()> {
        self.out.write_u16::<LittleEndian>(self.width)?;
        self.out.write_u16::<LittleEndian>(self.height)?;
        // global table present, 8 bits color resolution, unsorted, 256 entries
        self.out.write_u8(0x80 | 0x70 | PALETTE_SIZE_BITS)?;
        self.out.write_u8(0)?; // background color index
        self.out.write_u8(0)?; // pixel aspect ratio: square
        Ok(())
    }

    /// NETSCAPE2.0 application extension carrying the loop count.
    fn write_netscape_ext(&mut self, count: u16) -> Result<()> {
        self.out.write_u8(EXTENSION_INTRODUCER)?;
        self.out.write_u8(APPLICATION_LABEL)?;
        self.out.write_u8(11)?;
        self.out.write_ascii("NETSCAPE2.0");
        self.out.write_u8(3)?;
        self.out.write_u8(1)?; // loop sub-block id
        self.out.write_u16::<LittleEndian>(count)?;
        self.out.write_u8(0)?;
        Ok(())
    }

    fn write_graphic_ctrl_ext(&mut self, transparent_index: Option<u8>) -> Result<()> {
        self.out.write_u8(EXTENSION_INTRODUCER)?;
        self.out.write_u8(GRAPHIC_CONTROL_LABEL)?;
        self.out.write_u8(4)?;

        let (transparent_flag, default_disposal) = match transparent_index {
            Some(_) => (1u8, Disposal::RestoreBackground),
            None => (0u8, Disposal::Unspecified),
        };
        let disposal = self.dispose.unwrap_or(default_disposal) as u8 & 7;

        // reserved(3) | disposal(3) | user input(1) | transparency(1)
        self.out.write_u8((disposal << 2) | transparent_flag)?;
        self.out.write_u16::<LittleEndian>(self.delay)?;
        self.out.write_u8(transparent_index.unwrap_or(0))?;
        self.out.write_u8(0)?;
        Ok(())
    }

    fn write_image_desc(&mut self) -> Result<()> {
        self.out.write_u8(IMAGE_SEPARATOR)?;
        self.out.write_u16::<LittleEndian>(0)?;
        self.out.write_u16::<LittleEndian>(0)?;
        self.out.write_u16::<LittleEndian>(self.width)?;
        self.out.write_u16::<LittleEndian>(self.height)?;
        if self.first_frame {
            // the global table applies
            self.out.write_u8(0)?;
        } else {
            // local table, not interlaced, unsorted, 256 entries
            self.out.write_u8(0x80 | PALETTE_SIZE_BITS)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u16, height: u16, color: [u8; 4]) -> Vec<u8> {
        color.repeat(width as usize * height as usize)
    }

    #[test]
    fn repeat_wire_mapping() {
        assert_eq!(Repeat::from(-1), Repeat::NoLoop);
        assert_eq!(Repeat::from(0), Repeat::Infinite);
        assert_eq!(Repeat::from(3), Repeat::Times(3));
        assert_eq!(Repeat::from(1_000_000), Repeat::Times(u16::MAX));
        assert_eq!(Repeat::NoLoop.loop_count(), None);
        assert_eq!(Repeat::Infinite.loop_count(), Some(0));
    }

    #[test]
    fn disposal_codes() {
        assert_eq!(Disposal::try_from(2u8).unwrap(), Disposal::RestoreBackground);
        assert!(Disposal::try_from(4u8).is_err());
    }

    #[test]
    fn delay_conversions_round() {
        let mut enc = GifEncoder::new(1, 1);
        enc.set_delay_ms(104);
        assert_eq!(enc.delay(), 10);
        enc.set_delay_ms(105);
        assert_eq!(enc.delay(), 11);
        enc.set_frame_rate(30.0);
        assert_eq!(enc.delay(), 3);
        enc.set_frame_rate(0.0);
        assert_eq!(enc.delay(), 3);
    }

    #[test]
    fn rejects_wrong_frame_size() {
        let mut enc = GifEncoder::new(2, 2);
        let err = enc.add_frame(&[0u8; 15]).unwrap_err();
        assert!(matches!(
            err,
            GifError::DimensionMismatch {
                expected: 16,
                actual: 15
            }
        ));
        assert_eq!(enc.frame_count(), 0);
        assert!(enc.stream().is_empty());
    }

    #[test]
    fn first_frame_layout() {
        let mut enc = GifEncoder::new(2, 2);
        enc.set_delay_ms(100);
        enc.add_frame(&solid(2, 2, [255, 0, 0, 255])).unwrap();
        enc.finish();
        let bytes = enc.stream().to_vec();

        assert_eq!(&bytes[..6], b"GIF89a");
        assert_eq!(&bytes[6..13], &[2, 0, 2, 0, 0xF7, 0, 0]);
        // global table, then the graphic control extension (no loop extension)
        let gce = 13 + 768;
        assert_eq!(
            &bytes[gce..gce + 8],
            &[0x21, 0xF9, 4, 0x00, 10, 0, 0, 0]
        );
        let desc = gce + 8;
        assert_eq!(&bytes[desc..desc + 10], &[0x2C, 0, 0, 0, 0, 2, 0, 2, 0, 0]);
        assert_eq!(bytes[desc + 10], 8);
        assert_eq!(*bytes.last().unwrap(), 0x3B);
    }

    #[test]
    fn loop_extension_follows_global_table() {
        let mut enc = GifEncoder::new(1, 1);
        enc.set_repeat(Repeat::Infinite);
        enc.add_frame(&[1, 2, 3, 255]).unwrap();
        let bytes = enc.stream().to_vec();
        let ext = 13 + 768;
        assert_eq!(&bytes[ext..ext + 3], &[0x21, 0xFF, 11]);
        assert_eq!(&bytes[ext + 3..ext + 14], b"NETSCAPE2.0");
        assert_eq!(&bytes[ext + 14..ext + 19], &[3, 1, 0, 0, 0]);
    }

    #[test]
    fn later_frames_carry_local_tables() {
        let mut enc = GifEncoder::new(1, 1);
        enc.add_frame(&[0, 0, 0, 255]).unwrap();
        let second_start = enc.stream().len();
        enc.add_frame(&[255, 255, 255, 255]).unwrap();
        let bytes = enc.stream().to_vec();

        let desc = second_start + 8;
        assert_eq!(bytes[desc], 0x2C);
        assert_eq!(bytes[desc + 9], 0x87);
        assert_eq!(bytes[desc + 10 + 768], 8);
        assert_eq!(enc.frame_count(), 2);
    }

    #[test]
    fn transparency_sets_flag_and_default_disposal() {
        let mut enc = GifEncoder::new(2, 1);
        enc.set_transparent(Some(Pixel::new(0, 255, 0)));
        let summary = enc
            .add_frame(&[0, 255, 0, 255, 0, 0, 255, 255])
            .unwrap();
        let bytes = enc.stream().to_vec();
        let gce = 13 + 768;
        // disposal 2 (restore background), transparency flag set
        assert_eq!(bytes[gce + 3], (2 << 2) | 1);
        let index = summary.transparent_index.expect("transparent index");
        assert_eq!(bytes[gce + 6], index);
    }

    #[test]
    fn settings_between_frames_apply_to_next_frame() {
        let green = [0u8, 255, 0, 255];
        let red = [255u8, 0, 0, 255];
        let blue = [0u8, 0, 255, 255];
        let frames = [
            [green, red].concat(),
            [blue, green].concat(),
            [red, blue].concat(),
        ];

        let mut enc = GifEncoder::new(2, 1);
        enc.set_transparent(Some(Pixel::new(0, 255, 0)));
        let mut gce_at = Vec::new();
        let mut summaries = Vec::new();

        for (i, frame) in frames.iter().enumerate() {
            match i {
                1 => {
                    enc.set_delay_ms(70);
                    enc.set_repeat(Repeat::Infinite);
                }
                2 => enc.set_transparent(None),
                _ => {}
            }
            let start = enc.stream().len();
            gce_at.push(if i == 0 { 13 + 768 } else { start });

            let summary = enc.add_frame(frame).unwrap();
            if let Some(index) = summary.transparent_index {
                assert!(enc.used_entries().is_used(index), "frame {}", i);
            }
            assert_eq!(enc.used_entries().count(), summary.colors_used);

            // The used set holds this frame's indices only.
            let rgb = strip_alpha(frame);
            let nq = NeuQuant::new(DEFAULT_QUALITY, &rgb);
            let mut own = UsedEntries::new();
            own.mark_all(&[
                nq.index_of(rgb[0], rgb[1], rgb[2]),
                nq.index_of_pixel(Pixel::new(rgb[3], rgb[4], rgb[5])),
            ]);
            for slot in 0..=255u8 {
                assert_eq!(enc.used_entries().is_used(slot), own.is_used(slot));
            }
            summaries.push(summary);
        }
        enc.finish();
        let bytes = enc.stream().to_vec();

        assert_eq!(enc.repeat(), Repeat::NoLoop);
        assert!(!bytes.windows(11).any(|w| w == b"NETSCAPE2.0"));

        // (packed, delay) per frame
        let expected = [(0x09u8, 0u16), (0x09, 7), (0x00, 7)];
        for (i, &at) in gce_at.iter().enumerate() {
            assert_eq!(&bytes[at..at + 3], &[0x21, 0xF9, 4], "frame {}", i);
            assert_eq!(bytes[at + 3], expected[i].0, "frame {}", i);
            assert_eq!(
                u16::from_le_bytes([bytes[at + 4], bytes[at + 5]]),
                expected[i].1,
                "frame {}",
                i
            );
            let want_index = summaries[i].transparent_index.unwrap_or(0);
            assert_eq!(bytes[at + 6], want_index, "frame {}", i);
        }
        assert!(summaries[1].transparent_index.is_some());
        assert_eq!(summaries[2].transparent_index, None);
    }

    #[test]
    fn repeat_is_fixed_once_header_is_written() {
        let mut enc = GifEncoder::new(1, 1);
        enc.set_repeat(Repeat::Times(4));
        enc.add_frame(&[5, 5, 5, 255]).unwrap();
        enc.set_repeat(Repeat::NoLoop);
        assert_eq!(enc.repeat(), Repeat::Times(4));
    }

    #[test]
    fn explicit_disposal_overrides_default() {
        let mut enc = GifEncoder::new(1, 1);
        enc.set_transparent(Some(Pixel::black()));
        enc.set_dispose(Disposal::None);
        enc.add_frame(&[0, 0, 0, 255]).unwrap();
        let bytes = enc.stream().to_vec();
        assert_eq!(bytes[13 + 768 + 3], (1 << 2) | 1);
    }
}
