// src/session/builder.rs

//! Recording configuration.
//!
//! ```ignore
//! use gif_recorder::{EncoderConfig, Pixel, Repeat};
//!
//! let config = EncoderConfig::new(320, 240)
//!     .with_repeat(Repeat::Infinite)
//!     .with_delay_ms(40)
//!     .with_quality(10)
//!     .with_transparent(Some(Pixel::from_rgb_hex(0x00FF00)));
//! let mut encoder = config.build()?;
//! ```

use crate::gif::encoder::{DEFAULT_QUALITY, GifEncoder};
use crate::image::image_formats::Pixel;
use crate::{GifError, Result};

pub use crate::gif::encoder::{Disposal, Repeat};

/// How the per-frame delay was given.
#[derive(Debug, Clone, Copy, PartialEq)]
enum FrameTiming {
    DelayMs(u32),
    FrameRate(f32),
}

/// Settings fixed when a recording starts.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderConfig {
    pub width: u16,
    pub height: u16,
    pub repeat: Repeat,
    pub quality: u32,
    pub transparent: Option<Pixel>,
    pub dispose: Option<Disposal>,
    timing: FrameTiming,
}

impl EncoderConfig {
    /// Creates a configuration for frames of `width` x `height` pixels.
    ///
    /// Defaults: no loop, zero delay, quality 10, no transparency.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            repeat: Repeat::NoLoop,
            quality: DEFAULT_QUALITY,
            transparent: None,
            dispose: None,
            timing: FrameTiming::DelayMs(0),
        }
    }

    /// Builds a configuration from the `start` command fields.
    ///
    /// `repeat` uses the -1 / 0 / N encoding, `delay` is in milliseconds and
    /// `transparent` is a `0xRRGGBB` value.
    pub fn from_wire(
        width: u32,
        height: u32,
        repeat: i32,
        delay: u32,
        quality: u32,
        transparent: Option<u32>,
    ) -> Result<Self> {
        let width = u16::try_from(width)
            .map_err(|_| GifError::InvalidArg(format!("width {} exceeds 65535", width)))?;
        let height = u16::try_from(height)
            .map_err(|_| GifError::InvalidArg(format!("height {} exceeds 65535", height)))?;
        Ok(Self::new(width, height)
            .with_repeat(Repeat::from(repeat))
            .with_delay_ms(delay)
            .with_quality(quality)
            .with_transparent(transparent.map(Pixel::from_rgb_hex)))
    }

    /// Sets the loop behaviour
    pub fn with_repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    /// Sets the frame delay in milliseconds (rounded to 1/100 s in the file)
    pub fn with_delay_ms(mut self, delay_ms: u32) -> Self {
        self.timing = FrameTiming::DelayMs(delay_ms);
        self
    }

    /// Sets the frame delay from a frame rate
    pub fn with_frame_rate(mut self, fps: f32) -> Self {
        self.timing = FrameTiming::FrameRate(fps);
        self
    }

    /// Sets the quantizer sample factor (1 = best, clamped to at least 1)
    pub fn with_quality(mut self, quality: u32) -> Self {
        self.quality = quality.max(1);
        self
    }

    /// Sets the color written as transparent
    pub fn with_transparent(mut self, color: Option<Pixel>) -> Self {
        self.transparent = color;
        self
    }

    /// Overrides the default disposal method
    pub fn with_dispose(mut self, dispose: Disposal) -> Self {
        self.dispose = Some(dispose);
        self
    }

    /// Byte length every RGBA frame must have.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    /// Checks the configuration and creates an encoder from it.
    pub fn build(&self) -> Result<GifEncoder> {
        if self.width == 0 || self.height == 0 {
            return Err(GifError::InvalidArg(format!(
                "frame dimensions must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }

        let mut encoder = GifEncoder::new(self.width, self.height);
        encoder.set_repeat(self.repeat);
        encoder.set_quality(self.quality);
        encoder.set_transparent(self.transparent);
        if let Some(dispose) = self.dispose {
            encoder.set_dispose(dispose);
        }
        match self.timing {
            FrameTiming::DelayMs(ms) => encoder.set_delay_ms(ms),
            FrameTiming::FrameRate(fps) => encoder.set_frame_rate(fps),
        }
        Ok(encoder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_fields_map_to_config() {
        let config = EncoderConfig::from_wire(4, 3, 0, 120, 0, Some(0x112233)).unwrap();
        assert_eq!((config.width, config.height), (4, 3));
        assert_eq!(config.repeat, Repeat::Infinite);
        assert_eq!(config.quality, 1);
        assert_eq!(config.transparent, Some(Pixel::new(0x11, 0x22, 0x33)));
        assert_eq!(config.frame_len(), 48);

        let encoder = config.build().unwrap();
        assert_eq!(encoder.delay(), 12);
        assert_eq!(encoder.dimensions(), (4, 3));
    }

    #[test]
    fn oversized_wire_dimensions_are_rejected() {
        let err = EncoderConfig::from_wire(70_000, 1, -1, 0, 10, None).unwrap_err();
        assert!(matches!(err, GifError::InvalidArg(_)));
    }

    #[test]
    fn zero_dimensions_fail_to_build() {
        assert!(matches!(
            EncoderConfig::new(0, 5).build(),
            Err(GifError::InvalidArg(_))
        ));
    }

    #[test]
    fn frame_rate_sets_delay() {
        let encoder = EncoderConfig::new(1, 1).with_frame_rate(25.0).build().unwrap();
        assert_eq!(encoder.delay(), 4);
    }
}
