// Playback transport state
// Tracks where the playhead is without touching the audio device

use std::time::{Duration, Instant};

use serde::Serialize;

/// Transport status of the current playback session.
///
/// A stopped session and a fresh one are the same rest state, so both are
/// represented as `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Idle,
    Playing,
    Paused,
}

/// Offset-based playhead bookkeeping.
///
/// Pausing never slices sample data; it records how far playback got, and
/// the next start seeks into the full buffer by that offset. All clock
/// reads are injected so the state machine is testable without a device.
#[derive(Debug, Clone)]
pub struct Transport {
    status: PlaybackStatus,
    paused_offset: Duration,
    started_at: Option<Instant>,
}

impl Transport {
    pub fn new() -> Self {
        Self {
            status: PlaybackStatus::Idle,
            paused_offset: Duration::ZERO,
            started_at: None,
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    /// Offset the next start should seek to.
    pub fn paused_offset(&self) -> Duration {
        self.paused_offset
    }

    /// Start (or restart) playback at the stored offset.
    ///
    /// The recorded start timestamp is backdated by the offset so that
    /// `position` keeps reading the absolute playhead.
    pub fn begin(&mut self, now: Instant) {
        self.started_at = Some(now - self.paused_offset);
        self.status = PlaybackStatus::Playing;
    }

    /// Freeze the playhead where it is. No-op unless playing.
    pub fn pause(&mut self, now: Instant) -> Duration {
        if self.status == PlaybackStatus::Playing {
            if let Some(started_at) = self.started_at.take() {
                self.paused_offset = now.saturating_duration_since(started_at);
            }
            self.status = PlaybackStatus::Paused;
        }
        self.paused_offset
    }

    /// Return to the rest state and rewind the offset. Idempotent; used
    /// both for an explicit stop and for a clip playing to its natural end.
    pub fn halt(&mut self) {
        self.status = PlaybackStatus::Idle;
        self.paused_offset = Duration::ZERO;
        self.started_at = None;
    }

    /// Current playhead position.
    pub fn position(&self, now: Instant) -> Duration {
        match self.status {
            PlaybackStatus::Playing => self
                .started_at
                .map(|started_at| now.saturating_duration_since(started_at))
                .unwrap_or(Duration::ZERO),
            PlaybackStatus::Paused => self.paused_offset,
            PlaybackStatus::Idle => Duration::ZERO,
        }
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}
