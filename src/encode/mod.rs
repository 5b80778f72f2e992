// src/encode/mod.rs

pub mod lzw;

pub use lzw::{LzwEncoder, LzwStats, encode_indexed};
