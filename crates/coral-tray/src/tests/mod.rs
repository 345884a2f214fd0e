//! Test suites for the tray supervisor core.

mod app;
mod behaviour;
pub(crate) mod support;
