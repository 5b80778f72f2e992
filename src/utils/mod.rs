//! General-purpose utility modules.

pub mod error;
pub mod progress;

// Re-export commonly used items
pub use error::{GifError, Result};
pub use progress::{NoProgress, Progress, ProgressSink};
