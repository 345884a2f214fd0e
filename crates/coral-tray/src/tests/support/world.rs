//! Scenario world: a coordinator wired to recording doubles and a manual clock.

use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use coral_protocol::ProtocolEvent;

use crate::events::LoopEvent;
use crate::launch::LaunchContext;
use crate::permissions::{GrantProbe, Grants};
use crate::process::{ExitReport, Generation, ProcessSupervisor};
use crate::runtime::Coordinator;

use super::desktop::RecordingDesktop;
use super::elevator::RecordingElevator;
use super::reporter::RecordingHealthReporter;
use super::spawner::FakeSpawner;

/// Grant probe whose answer the scenario can change.
#[derive(Debug, Clone, Default)]
pub struct SwitchableGrantProbe {
    grants: Arc<Mutex<Grants>>,
    probes: Arc<AtomicUsize>,
}

impl SwitchableGrantProbe {
    /// Sets the grants reported from now on.
    pub fn set(&self, grants: Grants) {
        *self.grants.lock().expect("probe mutex poisoned") = grants;
    }

    /// Number of times the OS was probed.
    #[must_use]
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl GrantProbe for SwitchableGrantProbe {
    fn probe(&self) -> Grants {
        self.probes.fetch_add(1, Ordering::SeqCst);
        *self.grants.lock().expect("probe mutex poisoned")
    }
}

/// Coordinator type driven by the tests.
pub type TestCoordinator =
    Coordinator<FakeSpawner, RecordingDesktop, RecordingElevator, SwitchableGrantProbe>;

/// Scenario world shared across steps.
pub struct TestWorld {
    pub coordinator: TestCoordinator,
    pub spawner: FakeSpawner,
    pub desktop: RecordingDesktop,
    pub elevator: RecordingElevator,
    pub probe: SwitchableGrantProbe,
    pub reporter: Arc<RecordingHealthReporter>,
    pub now: Instant,
}

impl TestWorld {
    /// Builds a world with no backend running and no grants.
    #[must_use]
    pub fn new() -> Self {
        let spawner = FakeSpawner::default();
        let desktop = RecordingDesktop::default();
        let elevator = RecordingElevator::default();
        let probe = SwitchableGrantProbe::default();
        let reporter = Arc::new(RecordingHealthReporter::default());
        let supervisor = ProcessSupervisor::new(
            LaunchContext::new(
                "/opt/coral/usr/bin/coral",
                "/home/tester/.coral/conf/config.json",
                "/opt/coral/usr/bin",
            ),
            spawner.clone(),
            reporter.clone(),
        );
        let coordinator = Coordinator::new(
            supervisor,
            desktop.clone(),
            elevator.clone(),
            probe.clone(),
            reporter.clone(),
        );
        Self {
            coordinator,
            spawner,
            desktop,
            elevator,
            probe,
            reporter,
            now: Instant::now(),
        }
    }

    /// Runs the startup launch.
    pub fn start(&mut self) {
        self.coordinator.startup();
    }

    /// Generation of the most recently spawned backend.
    #[must_use]
    pub fn current_generation(&self) -> Generation {
        self.spawner
            .last_spawn()
            .map(|(_, generation)| generation)
            .expect("a backend should have been spawned")
    }

    /// Delivers one line of output from the current backend.
    pub fn emit(&mut self, line: &str) {
        let generation = self.current_generation();
        self.emit_from(generation, line);
    }

    /// Delivers one line of output tagged with `generation`.
    pub fn emit_from(&mut self, generation: Generation, line: &str) {
        self.post(LoopEvent::Backend {
            generation,
            event: ProtocolEvent::decode(line),
        });
    }

    /// Makes the current backend exit with `code`.
    pub fn exit_backend(&mut self, code: i32) {
        let (pid, generation) = self
            .spawner
            .last_spawn()
            .expect("a backend should have been spawned");
        self.spawner.kill_externally(pid);
        self.post(LoopEvent::BackendExited {
            generation,
            pid,
            report: ExitReport {
                code: Some(code),
                signal: None,
            },
        });
    }

    /// Delivers a loop event at the current instant.
    pub fn post(&mut self, event: LoopEvent) {
        self.coordinator.handle(event, self.now);
    }

    /// Moves the clock forward and runs due timers.
    pub fn advance(&mut self, elapsed: Duration) {
        self.now += elapsed;
        self.coordinator.on_deadline(self.now);
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture constructor for behaviour scenarios.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
