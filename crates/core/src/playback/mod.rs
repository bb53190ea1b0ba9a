//! Playback coordination for camera streams.
//!
//! [`catalog`] resolves a stream name to an MP4 or MJPEG URL (or a snapshot
//! picture). [`PlaybackCoordinator`] tracks the playback state and decides
//! when to restart or retry. It does no I/O and owns no timers: the caller
//! reports events, passes the current time, and executes the returned
//! [`PlaybackAction`].
//!
//! ## State machine
//!
//! ```text
//! play()                -> Play
//! first frame           -> Playing
//! stall while Playing   -> Waiting  (arms the waiting timeout)
//! timeout while Waiting -> Timeout  => Restart
//! end while Playing     -> Ended    => Restart
//! error                 -> Error    => Retry { after: retry delay }
//! stop() / pause()      -> Stopped  (ignores everything but play())
//! ```
//!
//! The retry delay starts at [`PlaybackConfig::retry_delay`] on every
//! `play()` and drops to zero once a frame was shown, so a stream that
//! worked is retried at once while a failing one is retried slowly.

pub mod catalog;

use std::time::{Duration, Instant};

use crate::error::{Result, StreamError};

pub use catalog::{
    PlaybackSource, StreamCatalog, StreamDescriptor, StreamUrl, api_url, fetch_snapshot,
};

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_WAITING_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Delay before retrying a stream that failed before showing a frame.
    pub retry_delay: Duration,
    /// How long playback may stay in [`PlaybackState::Waiting`].
    pub waiting_timeout: Duration,
    /// Stream played when [`PlaybackCoordinator::play`] gets no name and
    /// none was played before.
    pub default_stream: Option<String>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            retry_delay: DEFAULT_RETRY_DELAY,
            waiting_timeout: DEFAULT_WAITING_TIMEOUT,
            default_stream: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    /// Playback requested, no frame yet.
    Play,
    Playing,
    /// Playing, but data stopped arriving.
    Waiting,
    Timeout,
    Ended,
    Error,
}

/// What the caller must do after a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackAction {
    /// Stop the current session and play the stream again now.
    Restart,
    /// Stop the current session and play again after `after`, unless
    /// playback was stopped meanwhile (see [`PlaybackCoordinator::resume`]).
    Retry { after: Duration },
}

#[derive(Debug)]
pub struct PlaybackCoordinator {
    config: PlaybackConfig,
    state: PlaybackState,
    current_stream: Option<String>,
    retry_delay: Duration,
    waiting_deadline: Option<Instant>,
    frames: u64,
}

impl PlaybackCoordinator {
    pub fn new(config: PlaybackConfig) -> Self {
        Self {
            config,
            state: PlaybackState::Stopped,
            current_stream: None,
            retry_delay: Duration::ZERO,
            waiting_deadline: None,
            frames: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_stream(&self) -> Option<&str> {
        self.current_stream.as_deref()
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Frames shown since the last [`play`](Self::play).
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Start (or restart) playback and return the stream to open.
    ///
    /// Without a name, the current stream is played again, falling back to
    /// the configured default.
    pub fn play(&mut self, stream: Option<&str>, now: Instant) -> Result<String> {
        let stream = stream
            .map(str::to_string)
            .or_else(|| self.current_stream.clone())
            .or_else(|| self.config.default_stream.clone())
            .ok_or_else(|| StreamError::UnknownStream(String::new()))?;

        self.current_stream = Some(stream.clone());
        self.retry_delay = self.config.retry_delay;
        self.frames = 0;
        self.update(PlaybackState::Play, now);

        Ok(stream)
    }

    /// Play the current stream again after a [`PlaybackAction`], unless
    /// playback has been stopped in the meantime.
    pub fn resume(&mut self, now: Instant) -> Option<String> {
        if self.state == PlaybackState::Stopped {
            return None;
        }
        self.play(None, now).ok()
    }

    /// Stop playback. Late events from the old session are ignored.
    pub fn stop(&mut self, now: Instant) {
        self.current_stream = None;
        self.update(PlaybackState::Stopped, now);
    }

    /// Stop playback but keep the current stream, so that `play(None, ..)`
    /// picks it up again. Does nothing when already stopped.
    pub fn pause(&mut self, now: Instant) {
        if self.state == PlaybackState::Stopped {
            return;
        }

        tracing::info!(stream = ?self.current_stream, "pausing playback");
        self.update(PlaybackState::Stopped, now);
    }

    /// A frame was displayed.
    pub fn frame_displayed(&mut self, now: Instant) -> Option<PlaybackAction> {
        self.retry_delay = Duration::ZERO;
        self.frames += 1;

        if self.frames == 1 {
            self.update(PlaybackState::Playing, now)
        } else if self.state == PlaybackState::Waiting {
            // data is flowing again
            self.update(PlaybackState::Playing, now)
        } else {
            None
        }
    }

    /// The stream session ended; `cancelled` tells a deliberate stop from an
    /// unexpected end.
    pub fn stream_finished(&mut self, cancelled: bool, now: Instant) -> Option<PlaybackAction> {
        if cancelled {
            self.update(PlaybackState::Stopped, now)
        } else {
            self.update(PlaybackState::Ended, now)
        }
    }

    /// The stream session failed.
    pub fn fail(&mut self, error: &StreamError, now: Instant) -> Option<PlaybackAction> {
        if self.state != PlaybackState::Stopped {
            tracing::warn!(error = %error, "playback error");
        }
        self.update(PlaybackState::Error, now)
    }

    /// Fire the waiting timeout if its deadline has passed.
    pub fn poll_timeout(&mut self, now: Instant) -> Option<PlaybackAction> {
        match self.waiting_deadline {
            Some(deadline) if self.state == PlaybackState::Waiting && now >= deadline => {
                self.update(PlaybackState::Timeout, now)
            }
            _ => None,
        }
    }

    /// Deadline of the armed waiting timeout, if any.
    pub fn waiting_deadline(&self) -> Option<Instant> {
        self.waiting_deadline
    }

    /// Apply a state transition and return what the caller must do next.
    pub fn update(&mut self, state: PlaybackState, now: Instant) -> Option<PlaybackAction> {
        if state != PlaybackState::Waiting {
            self.waiting_deadline = None;
        }

        if self.state == PlaybackState::Stopped && state != PlaybackState::Play {
            return None;
        }

        let mut action = None;

        match state {
            PlaybackState::Play => {
                tracing::info!(stream = ?self.current_stream, "starting playback");
            }
            PlaybackState::Playing => {
                self.retry_delay = Duration::ZERO;
                if self.state == PlaybackState::Play {
                    tracing::debug!("playback started");
                } else {
                    tracing::debug!("playback resumed");
                }
            }
            PlaybackState::Waiting => match self.state {
                PlaybackState::Play => return None,
                PlaybackState::Playing => {
                    tracing::debug!("waiting for video data");
                    self.waiting_deadline = Some(now + self.config.waiting_timeout);
                }
                _ => {}
            },
            PlaybackState::Timeout if self.state == PlaybackState::Waiting => {
                tracing::info!("video stream timeout");
                action = Some(PlaybackAction::Restart);
            }
            PlaybackState::Ended if self.state == PlaybackState::Playing => {
                tracing::info!("unexpected end of video stream");
                action = Some(PlaybackAction::Restart);
            }
            PlaybackState::Error => {
                if !self.retry_delay.is_zero() {
                    tracing::info!(delay = ?self.retry_delay, "retrying");
                }
                action = Some(PlaybackAction::Retry {
                    after: self.retry_delay,
                });
            }
            PlaybackState::Stopped => {
                tracing::info!("playback stopped");
            }
            _ => {}
        }

        self.state = state;
        action
    }
}

impl Default for PlaybackCoordinator {
    fn default() -> Self {
        Self::new(PlaybackConfig::default())
    }
}
