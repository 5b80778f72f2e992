// src/gif/mod.rs

pub mod byte_array;
pub mod encoder;

pub use byte_array::{ByteArray, PAGE_SIZE, Page};
pub use encoder::{Disposal, FrameSummary, GifEncoder, Repeat};
