// src/image/mod.rs

pub mod image_formats;
pub mod neuquant;
pub mod palette;

pub use image_formats::{Pixel, RgbaPixel, strip_alpha};
pub use neuquant::{NeuQuant, build_palette};
pub use palette::{Palette, UsedEntries};
