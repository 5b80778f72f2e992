// src/session/worker.rs

//! Background encoder thread.
//!
//! The worker owns a [`Session`] and processes [`Command`]s one at a time, in
//! the order they were sent. Results come back as [`Event`]s. Frame buffers
//! and the finished pages move across the channels by ownership.

use crate::gif::byte_array::Page;
use crate::session::builder::EncoderConfig;
use crate::session::state::Session;
use crate::utils::progress::Progress;
use crate::{GifError, Result};
use log::{debug, error};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

/// Requests sent to the worker.
#[derive(Debug)]
pub enum Command {
    Start(EncoderConfig),
    /// One RGBA frame of `width * height * 4` bytes.
    Frame(Vec<u8>),
    Finish,
}

/// Notifications sent back by the worker.
#[derive(Debug)]
pub enum Event {
    /// Share of output pages handed over so far, in `[0, 1]`. Only sent while
    /// finishing, one per page, just before `Finished`.
    Progress(f32),
    /// The complete file: concatenate `pages` and keep the first `len` bytes.
    Finished { pages: Vec<Page>, len: usize },
    /// A command failed. After a frame failure the session stays closed.
    Error(String),
}

/// Handle to a running encoder thread.
pub struct EncoderWorker {
    commands: Option<Sender<Command>>,
    events: Receiver<Event>,
    handle: Option<JoinHandle<()>>,
}

impl EncoderWorker {
    /// Starts the worker thread with a fresh session.
    pub fn spawn() -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (evt_tx, evt_rx) = mpsc::channel::<Event>();

        let handle = thread::Builder::new()
            .name("gif-encoder".into())
            .spawn(move || run(cmd_rx, evt_tx))?;

        Ok(Self {
            commands: Some(cmd_tx),
            events: evt_rx,
            handle: Some(handle),
        })
    }

    /// Queues a command.
    pub fn send(&self, command: Command) -> Result<()> {
        self.commands
            .as_ref()
            .ok_or(GifError::WorkerDisconnected)?
            .send(command)
            .map_err(|_| GifError::WorkerDisconnected)
    }

    /// Blocks until the next event arrives.
    pub fn recv(&self) -> Result<Event> {
        self.events.recv().map_err(|_| GifError::WorkerDisconnected)
    }

    /// Returns the next event if one is already waiting.
    pub fn try_recv(&self) -> Option<Event> {
        self.events.try_recv().ok()
    }

    /// Blocks until `Finished` arrives, passing progress values to `on_progress`.
    ///
    /// An `Error` event is returned as `Err`.
    pub fn wait_finished<F: FnMut(f32)>(&self, mut on_progress: F) -> Result<(Vec<Page>, usize)> {
        loop {
            match self.recv()? {
                Event::Progress(value) => on_progress(value),
                Event::Finished { pages, len } => return Ok((pages, len)),
                Event::Error(message) => return Err(GifError::Worker(message)),
            }
        }
    }

    /// Closes the command channel and waits for the thread to exit.
    ///
    /// Events already queued are dropped with the handle.
    pub fn join(mut self) -> Result<()> {
        self.commands.take();
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| GifError::WorkerDisconnected),
            None => Ok(()),
        }
    }
}

fn run(commands: Receiver<Command>, events: Sender<Event>) {
    let mut session = Session::new();

    for command in commands {
        let outcome = match command {
            Command::Start(config) => session.start(config),
            Command::Frame(rgba) => session.frame(&rgba).map(|_| ()),
            Command::Finish => {
                let mut sink = |p: Progress| {
                    // The receiver may already be gone; progress is advisory.
                    let _ = events.send(Event::Progress(p.value()));
                };
                session
                    .finish(&mut sink)
                    .and_then(|gif| {
                        events
                            .send(Event::Finished {
                                pages: gif.pages,
                                len: gif.len,
                            })
                            .map_err(|_| GifError::WorkerDisconnected)
                    })
            }
        };

        if let Err(err) = outcome {
            error!("encoder worker: {}", err);
            if matches!(err, GifError::WorkerDisconnected) {
                break;
            }
            if events.send(Event::Error(err.to_string())).is_err() {
                break;
            }
        }
    }
    debug!("encoder worker: command channel closed");
}
