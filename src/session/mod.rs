// src/session/mod.rs

// Configuration
pub mod builder;

// Explicit session object and its background thread
pub mod state;
pub mod worker;

pub use builder::EncoderConfig;
pub use state::{EncodedGif, Session};
pub use worker::{Command, EncoderWorker, Event};
