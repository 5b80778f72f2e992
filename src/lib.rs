//! A Rust library for recording animated GIFs.
//!
//! Frames arrive as raw RGBA buffers. Each one is quantized to its own
//! 256-color palette with NeuQuant, LZW-compressed and appended to a paged
//! output buffer that is handed over whole when the recording finishes.
//!
//! # Quick Start
//!
//! ```ignore
//! use gif_recorder::{EncoderConfig, NoProgress, Repeat, Session};
//!
//! let mut session = Session::new();
//! session.start(
//!     EncoderConfig::new(320, 240)
//!         .with_repeat(Repeat::Infinite)
//!         .with_delay_ms(40),
//! )?;
//!
//! for frame in captured_frames() {
//!     session.frame(&frame)?; // 320 * 240 * 4 bytes of RGBA
//! }
//!
//! let gif = session.finish(&mut NoProgress)?;
//! std::fs::write("recording.gif", gif.to_vec())?;
//! ```
//!
//! # Off-thread encoding
//!
//! [`EncoderWorker`] runs a session on its own thread. Commands go in
//! (`Start`, `Frame`, `Finish`) and events come out (`Progress`, `Finished`,
//! `Error`).
//!
//! # Features
//!
//! - **Per-frame palettes**: the first frame's palette is global, later frames carry local tables
//! - **Transparency**: a chosen color maps to the closest palette entry the frame actually uses
//! - **Looping**: NETSCAPE2.0 extension for infinite or counted repeats
//! - **Optional parallelism**: enable the `rayon` feature to map pixels to the palette in parallel

// Core modules
pub mod encode;
pub mod gif;
pub mod image;
pub mod session;
pub mod utils;

// Public session API
pub use session::{Command, EncodedGif, EncoderConfig, EncoderWorker, Event, Session};

// Encoder types (for driving the assembler directly)
pub use gif::{ByteArray, Disposal, FrameSummary, GifEncoder, PAGE_SIZE, Page, Repeat};

// Image types
pub use image::{NeuQuant, Palette, Pixel, build_palette};

// Error and progress types
pub use utils::error::{GifError, Result};
pub use utils::progress::{NoProgress, Progress, ProgressSink};

// Constants
pub const GIF_RECORDER_VERSION: &str = "0.1.0";
