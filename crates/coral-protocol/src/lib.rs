//! Wire vocabulary spoken between the tray supervisor, its backend, and
//! sibling supervisor invocations.
//!
//! Two line-oriented protocols live here:
//!
//! - the backend's standard output, decoded into [`ProtocolEvent`]s by
//!   [`LineDecoder`]; unknown lines decode to [`ProtocolEvent::Unrecognized`]
//!   so newer backends can add output without breaking older supervisors;
//! - the single-instance control socket, which carries [`ControlCommand`]s
//!   from a second launch or the settings editor to the running instance.

mod control;
mod decoder;
mod event;

pub use control::{ControlCommand, ControlCommandParseError};
pub use decoder::{DecodeError, DecodeSummary, LineDecoder};
pub use event::{
    BACKEND_READY, NEED_INPUT_GROUP, NEED_UINPUT_RULE, ProtocolEvent, TRIGGER_DOWN, TRIGGER_UP,
};
