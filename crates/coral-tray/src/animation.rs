//! Tray icon animation driven by trigger events.
//!
//! The machine owns no timer. The event loop asks for [`TrayAnimation::next_deadline`]
//! and calls [`TrayAnimation::tick`] when it passes, so there is never more
//! than one periodic tick outstanding.

use std::fmt;
use std::time::{Duration, Instant};

/// Number of frames in the active cycle.
pub const FRAME_COUNT: usize = 8;

/// Time between frames while animating.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(100);

/// An icon the tray can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconFrame {
    /// The idle, non-animated icon.
    Static,
    /// One frame of the active cycle, in `[0, FRAME_COUNT)`.
    Wave(usize),
}

impl fmt::Display for IconFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => f.write_str("static"),
            Self::Wave(index) => write!(f, "wave-{index}"),
        }
    }
}

/// Observable animation state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrayAnimationState {
    /// Whether the periodic tick is running.
    pub is_animating: bool,
    /// Next frame to display.
    pub current_frame_index: usize,
}

/// The `Idle`/`Animating` state machine.
#[derive(Debug, Clone)]
pub struct TrayAnimation {
    state: TrayAnimationState,
    next_tick: Option<Instant>,
    interval: Duration,
}

impl Default for TrayAnimation {
    fn default() -> Self {
        Self::new()
    }
}

impl TrayAnimation {
    /// Builds an idle machine ticking every [`FRAME_INTERVAL`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: TrayAnimationState {
                is_animating: false,
                current_frame_index: 0,
            },
            next_tick: None,
            interval: FRAME_INTERVAL,
        }
    }

    /// Starts the cycle from frame 0. Returns `false` when already animating.
    pub fn trigger_down(&mut self, now: Instant) -> bool {
        if self.state.is_animating {
            return false;
        }
        self.state = TrayAnimationState {
            is_animating: true,
            current_frame_index: 0,
        };
        self.next_tick = Some(now + self.interval);
        true
    }

    /// Stops the cycle and returns the icon to restore, or `None` when idle.
    pub fn trigger_up(&mut self) -> Option<IconFrame> {
        if !self.state.is_animating {
            return None;
        }
        self.state = TrayAnimationState::default();
        self.next_tick = None;
        Some(IconFrame::Static)
    }

    /// Emits the due frame and advances, or `None` when no tick is due.
    pub fn tick(&mut self, now: Instant) -> Option<IconFrame> {
        let due = self.next_tick.filter(|due| *due <= now)?;
        let frame = IconFrame::Wave(self.state.current_frame_index);
        self.state.current_frame_index = (self.state.current_frame_index + 1) % FRAME_COUNT;
        let next = due + self.interval;
        // Skip missed ticks instead of replaying them in a burst.
        self.next_tick = Some(if next <= now { now + self.interval } else { next });
        Some(frame)
    }

    /// When the next frame is due.
    #[must_use]
    pub const fn next_deadline(&self) -> Option<Instant> {
        self.next_tick
    }

    /// Current state snapshot.
    #[must_use]
    pub const fn state(&self) -> TrayAnimationState {
        self.state
    }
}
