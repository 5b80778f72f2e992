// src/session/state.rs

//! One recording, driven by `start`, `frame` and `finish`.
//!
//! The session owns its encoder; nothing is shared between sessions. Commands
//! that arrive out of order are rejected instead of corrupting the stream, and
//! a frame that fails to encode ends the session.

use crate::gif::byte_array::{Page, concat_pages};
use crate::gif::encoder::{FrameSummary, GifEncoder};
use crate::session::builder::EncoderConfig;
use crate::utils::progress::{Progress, ProgressSink};
use crate::{GifError, Result};
use log::{debug, warn};
use std::io::Write;
use std::mem;

/// The finished file as the encoder's pages plus the number of valid bytes.
#[derive(Debug)]
pub struct EncodedGif {
    pub pages: Vec<Page>,
    pub len: usize,
}

impl EncodedGif {
    /// Concatenates the pages, dropping the unused tail of the last one.
    pub fn to_vec(&self) -> Vec<u8> {
        concat_pages(&self.pages, self.len)
    }

    /// Writes exactly `len` bytes to `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut remaining = self.len;
        for page in &self.pages {
            let take = remaining.min(page.len());
            writer.write_all(&page[..take])?;
            remaining -= take;
            if remaining == 0 {
                break;
            }
        }
        Ok(())
    }
}

enum State {
    Idle,
    Recording(Box<GifEncoder>),
    Finished,
    Failed,
}

/// Explicit recording session.
pub struct Session {
    state: State,
    frames: usize,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            frames: 0,
        }
    }

    /// Starts recording with `config`. Valid once, before any frame.
    pub fn start(&mut self, config: EncoderConfig) -> Result<()> {
        match self.state {
            State::Idle => {
                let encoder = config.build()?;
                debug!(
                    "session: start {}x{}, repeat {:?}, quality {}",
                    config.width, config.height, config.repeat, config.quality
                );
                self.state = State::Recording(Box::new(encoder));
                Ok(())
            }
            State::Recording(_) => Err(GifError::Sequence("start sent twice".into())),
            State::Finished => Err(GifError::Sequence("start after finish".into())),
            State::Failed => Err(GifError::SessionClosed),
        }
    }

    /// Encodes one RGBA frame.
    pub fn frame(&mut self, rgba: &[u8]) -> Result<FrameSummary> {
        let encoder = match &mut self.state {
            State::Recording(encoder) => encoder,
            State::Idle => return Err(GifError::Sequence("frame before start".into())),
            State::Finished => return Err(GifError::Sequence("frame after finish".into())),
            State::Failed => return Err(GifError::SessionClosed),
        };

        match encoder.add_frame(rgba) {
            Ok(summary) => {
                self.frames += 1;
                Ok(summary)
            }
            Err(err) => {
                warn!("session: frame {} failed, closing session: {}", self.frames, err);
                self.state = State::Failed;
                Err(err)
            }
        }
    }

    /// Writes the trailer and hands over the output pages.
    ///
    /// Frames are fully encoded by [`frame`](Self::frame), so the only work
    /// left here is the page handoff. `sink` receives `k / n` after page `k`
    /// of `n`; the values track that handoff, not encoding time.
    pub fn finish<P: ProgressSink>(&mut self, sink: &mut P) -> Result<EncodedGif> {
        let mut encoder = match mem::replace(&mut self.state, State::Finished) {
            State::Recording(encoder) => encoder,
            other => {
                let err = match other {
                    State::Idle => GifError::Sequence("finish before start".into()),
                    State::Finished => GifError::Sequence("finish sent twice".into()),
                    _ => GifError::SessionClosed,
                };
                self.state = other;
                return Err(err);
            }
        };

        encoder.finish();
        let (pages, len) = encoder.into_stream().into_pages();
        for done in 1..=pages.len() {
            sink.report(Progress::from_steps(done, pages.len()));
        }
        debug!(
            "session: finished {} frames, {} bytes in {} pages",
            self.frames,
            len,
            pages.len()
        );
        Ok(EncodedGif { pages, len })
    }

    pub fn frame_count(&self) -> usize {
        self.frames
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, State::Recording(_))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::progress::NoProgress;

    fn started(width: u16, height: u16) -> Session {
        let mut session = Session::new();
        session.start(EncoderConfig::new(width, height)).unwrap();
        session
    }

    #[test]
    fn full_sequence_produces_a_gif() {
        let mut session = started(2, 2);
        session.frame(&[10u8; 16]).unwrap();
        session.frame(&[200u8; 16]).unwrap();
        assert_eq!(session.frame_count(), 2);

        let mut reported = Vec::new();
        let gif = session
            .finish(&mut |p: Progress| reported.push(p.value()))
            .unwrap();
        let bytes = gif.to_vec();
        assert_eq!(&bytes[..6], b"GIF89a");
        assert_eq!(*bytes.last().unwrap(), 0x3B);
        assert_eq!(reported.len(), gif.pages.len());
        assert_eq!(reported.last(), Some(&1.0));
        assert!(reported.windows(2).all(|w| w[0] < w[1]));
        assert!(!session.is_recording());
    }

    #[test]
    fn progress_counts_pages_handed_over() {
        // Noise does not compress, so the file spans several pages.
        let mut state = 7u32;
        let frame: Vec<u8> = (0..64 * 64 * 4)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (state >> 16) as u8
            })
            .collect();
        let mut session = started(64, 64);
        session.frame(&frame).unwrap();

        let mut reported = Vec::new();
        let gif = session
            .finish(&mut |p: Progress| reported.push(p.value()))
            .unwrap();
        let n = gif.pages.len();
        assert!(n > 1);
        let expected: Vec<f32> = (1..=n).map(|k| Progress::from_steps(k, n).value()).collect();
        assert_eq!(reported, expected);
    }

    #[test]
    fn out_of_order_commands_are_rejected() {
        let mut session = Session::new();
        assert!(matches!(session.frame(&[0; 4]), Err(GifError::Sequence(_))));
        assert!(matches!(
            session.finish(&mut NoProgress),
            Err(GifError::Sequence(_))
        ));

        session.start(EncoderConfig::new(1, 1)).unwrap();
        assert!(matches!(
            session.start(EncoderConfig::new(1, 1)),
            Err(GifError::Sequence(_))
        ));

        session.finish(&mut NoProgress).unwrap();
        assert!(matches!(
            session.finish(&mut NoProgress),
            Err(GifError::Sequence(_))
        ));
        assert!(matches!(session.frame(&[0; 4]), Err(GifError::Sequence(_))));
    }

    #[test]
    fn bad_frame_closes_the_session() {
        let mut session = started(2, 2);
        let err = session.frame(&[0; 12]).unwrap_err();
        assert!(matches!(err, GifError::DimensionMismatch { .. }));
        assert!(matches!(session.frame(&[0; 16]), Err(GifError::SessionClosed)));
        assert!(matches!(
            session.finish(&mut NoProgress),
            Err(GifError::SessionClosed)
        ));
    }

    #[test]
    fn failed_start_leaves_session_idle() {
        let mut session = Session::new();
        assert!(session.start(EncoderConfig::new(0, 0)).is_err());
        session.start(EncoderConfig::new(1, 1)).unwrap();
        assert!(session.is_recording());
    }

    #[test]
    fn write_to_emits_true_length() {
        let mut session = started(1, 1);
        session.frame(&[1, 2, 3, 255]).unwrap();
        let gif = session.finish(&mut NoProgress).unwrap();
        let mut out = Vec::new();
        gif.write_to(&mut out).unwrap();
        assert_eq!(out.len(), gif.len);
        assert_eq!(out, gif.to_vec());
    }
}
