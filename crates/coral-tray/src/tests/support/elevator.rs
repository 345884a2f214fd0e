//! [`Elevator`] double; results are injected by the test as loop events.

use std::sync::{Arc, Mutex};

use crate::permissions::{ElevationError, Elevator, RemediationPlan};

#[derive(Debug, Default)]
struct Log {
    remediations: Vec<RemediationPlan>,
    reboots: usize,
}

/// Records remediation and reboot requests; clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingElevator {
    log: Arc<Mutex<Log>>,
}

impl RecordingElevator {
    /// Number of remediation requests.
    #[must_use]
    pub fn remediation_count(&self) -> usize {
        self.log
            .lock()
            .expect("elevator mutex poisoned")
            .remediations
            .len()
    }

    /// Number of reboot requests.
    #[must_use]
    pub fn reboot_count(&self) -> usize {
        self.log.lock().expect("elevator mutex poisoned").reboots
    }
}

impl Elevator for RecordingElevator {
    fn remediate(&mut self, plan: &RemediationPlan) {
        self.log
            .lock()
            .expect("elevator mutex poisoned")
            .remediations
            .push(plan.clone());
    }

    fn reboot(&mut self) -> Result<(), ElevationError> {
        self.log.lock().expect("elevator mutex poisoned").reboots += 1;
        Ok(())
    }
}
