//! [`Desktop`] double that records every call.

use std::sync::{Arc, Mutex};

use crate::animation::IconFrame;
use crate::desktop::{Desktop, Notice};

/// One recorded desktop call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesktopCall {
    Frame(IconFrame),
    Ready,
    DismissWelcome,
    Focus,
    Error(Notice),
    AskPermission(Notice),
    AskReboot(Notice),
    Shutdown,
}

/// Records calls; clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingDesktop {
    calls: Arc<Mutex<Vec<DesktopCall>>>,
}

impl RecordingDesktop {
    /// Snapshot of every call so far.
    #[must_use]
    pub fn calls(&self) -> Vec<DesktopCall> {
        self.calls
            .lock()
            .expect("desktop mutex poisoned")
            .clone()
    }

    /// Frames shown, in order.
    #[must_use]
    pub fn frames(&self) -> Vec<IconFrame> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DesktopCall::Frame(frame) => Some(frame),
                _ => None,
            })
            .collect()
    }

    /// Number of permission prompts shown.
    #[must_use]
    pub fn permission_prompts(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, DesktopCall::AskPermission(_)))
            .count()
    }

    /// Error notices shown, in order.
    #[must_use]
    pub fn errors(&self) -> Vec<Notice> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DesktopCall::Error(notice) => Some(notice),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: DesktopCall) {
        self.calls
            .lock()
            .expect("desktop mutex poisoned")
            .push(call);
    }
}

impl Desktop for RecordingDesktop {
    fn show_frame(&mut self, frame: IconFrame) {
        self.record(DesktopCall::Frame(frame));
    }

    fn backend_ready(&mut self) {
        self.record(DesktopCall::Ready);
    }

    fn dismiss_welcome(&mut self) {
        self.record(DesktopCall::DismissWelcome);
    }

    fn focus_primary(&mut self) {
        self.record(DesktopCall::Focus);
    }

    fn show_error(&mut self, notice: &Notice) {
        self.record(DesktopCall::Error(notice.clone()));
    }

    fn ask_permission(&mut self, notice: &Notice) {
        self.record(DesktopCall::AskPermission(notice.clone()));
    }

    fn ask_reboot(&mut self, notice: &Notice) {
        self.record(DesktopCall::AskReboot(notice.clone()));
    }

    fn shutdown(&mut self) {
        self.record(DesktopCall::Shutdown);
    }
}
