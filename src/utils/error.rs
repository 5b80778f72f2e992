// src/utils/error.rs

use thiserror::Error;

/// The primary error type for all operations in the GIF recorder library.
#[derive(Error, Debug)]
pub enum GifError {
    /// An error occurred while writing to an output sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An invalid argument was provided to a function.
    #[error("Invalid argument: {0}")]
    InvalidArg(String),

    /// A frame buffer does not have the byte length the session was started with.
    #[error("Frame size mismatch: expected {expected} bytes, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A command arrived out of order (e.g. `frame` before `start`).
    #[error("Command out of sequence: {0}")]
    Sequence(String),

    /// The session already finished or failed and accepts no further commands.
    #[error("Session is closed")]
    SessionClosed,

    /// The worker reported a failed command.
    #[error("Encoder worker error: {0}")]
    Worker(String),

    /// The worker thread is gone.
    #[error("Encoder worker disconnected")]
    WorkerDisconnected,
}

/// A specialized `Result` type for GIF encoding operations.
pub type Result<T> = std::result::Result<T, GifError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err: GifError = io.into();
        assert!(matches!(err, GifError::Io(_)));
        assert_eq!(err.to_string(), "I/O error: boom");
    }

    #[test]
    fn mismatch_message_names_both_sizes() {
        let err = GifError::DimensionMismatch {
            expected: 64,
            actual: 60,
        };
        assert_eq!(
            err.to_string(),
            "Frame size mismatch: expected 64 bytes, got 60"
        );
    }
}
