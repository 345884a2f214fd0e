//! Recording doubles and the scenario world shared by the test suites.

mod desktop;
mod elevator;
mod reporter;
mod spawner;
mod world;

pub use desktop::{DesktopCall, RecordingDesktop};
pub use elevator::RecordingElevator;
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use spawner::FakeSpawner;
pub use world::{SwitchableGrantProbe, TestCoordinator, TestWorld, world};
