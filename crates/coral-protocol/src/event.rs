//! Typed events decoded from single lines of backend output.

use std::fmt;

/// The trigger key was pressed.
pub const TRIGGER_DOWN: &str = "TRIGGER_DOWN";
/// The trigger key was released.
pub const TRIGGER_UP: &str = "TRIGGER_UP";
/// The backend cannot read input devices because the user lacks the group.
pub const NEED_INPUT_GROUP: &str = "NEED_INPUT_GROUP";
/// The backend cannot open the virtual keyboard device.
pub const NEED_UINPUT_RULE: &str = "NEED_UINPUT_RULE";
/// The backend finished initialising.
pub const BACKEND_READY: &str = "BACKEND_READY";

/// One line of backend output, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolEvent {
    /// `TRIGGER_DOWN`
    TriggerDown,
    /// `TRIGGER_UP`
    TriggerUp,
    /// `NEED_INPUT_GROUP`
    NeedInputGroup,
    /// `NEED_UINPUT_RULE`
    NeedUinputRule,
    /// `BACKEND_READY`
    BackendReady,
    /// Any other line, kept verbatim for diagnostics.
    Unrecognized(String),
}

impl ProtocolEvent {
    /// Classifies a line with its terminator already removed.
    ///
    /// Matching is exact: surrounding whitespace, prefixes, and case
    /// differences all produce [`ProtocolEvent::Unrecognized`].
    #[must_use]
    pub fn decode(line: &str) -> Self {
        match line {
            TRIGGER_DOWN => Self::TriggerDown,
            TRIGGER_UP => Self::TriggerUp,
            NEED_INPUT_GROUP => Self::NeedInputGroup,
            NEED_UINPUT_RULE => Self::NeedUinputRule,
            BACKEND_READY => Self::BackendReady,
            other => Self::Unrecognized(other.to_owned()),
        }
    }

    /// Wire token for recognised events.
    #[must_use]
    pub const fn token(&self) -> Option<&'static str> {
        match self {
            Self::TriggerDown => Some(TRIGGER_DOWN),
            Self::TriggerUp => Some(TRIGGER_UP),
            Self::NeedInputGroup => Some(NEED_INPUT_GROUP),
            Self::NeedUinputRule => Some(NEED_UINPUT_RULE),
            Self::BackendReady => Some(BACKEND_READY),
            Self::Unrecognized(_) => None,
        }
    }
}

impl fmt::Display for ProtocolEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unrecognized(line) => write!(f, "unrecognized({line:?})"),
            recognised => f.write_str(recognised.token().unwrap_or_default()),
        }
    }
}
