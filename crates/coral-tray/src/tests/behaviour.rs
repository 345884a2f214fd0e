//! Behavioural tests for backend supervision and the permission workflow.

use std::cell::RefCell;
use std::time::Duration;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::animation::{FRAME_INTERVAL, IconFrame};
use crate::events::LoopEvent;
use crate::permissions::{GrantChoice, RebootChoice};
use crate::process::Generation;

use super::support::{self, TestWorld};

type StepResult = Result<(), String>;

#[fixture]
fn world() -> RefCell<TestWorld> {
    support::world()
}

fn parse_count(raw: &str) -> Result<u64, String> {
    raw.parse::<u64>()
        .map_err(|error| format!("invalid count '{raw}': {error}"))
}

#[given("a running backend")]
fn given_running_backend(world: &RefCell<TestWorld>) {
    world.borrow_mut().start();
}

#[given("a backend that cannot be launched")]
fn given_unlaunchable_backend(world: &RefCell<TestWorld>) {
    world.borrow().spawner.fail_spawns();
}

#[given("the backend reported missing device access")]
fn given_deficiency(world: &RefCell<TestWorld>) {
    world.borrow_mut().emit("NEED_INPUT_GROUP");
}

#[when("the supervisor starts")]
fn when_supervisor_starts(world: &RefCell<TestWorld>) {
    world.borrow_mut().start();
}

#[when("the configuration is saved")]
fn when_config_saved(world: &RefCell<TestWorld>) {
    world.borrow_mut().post(LoopEvent::ConfigSaved);
}

#[when("{millis} milliseconds pass")]
fn when_time_passes(world: &RefCell<TestWorld>, millis: String) -> StepResult {
    let millis = parse_count(&millis)?;
    world.borrow_mut().advance(Duration::from_millis(millis));
    Ok(())
}

#[when("{count} animation frames elapse")]
fn when_frames_elapse(world: &RefCell<TestWorld>, count: String) -> StepResult {
    let count = parse_count(&count)?;
    let mut world = world.borrow_mut();
    for _ in 0..count {
        world.advance(FRAME_INTERVAL);
    }
    Ok(())
}

#[when("the backend prints {line}")]
fn when_backend_prints(world: &RefCell<TestWorld>, line: String) {
    world.borrow_mut().emit(&line);
}

#[when("the first backend prints {line}")]
fn when_first_backend_prints(world: &RefCell<TestWorld>, line: String) {
    world.borrow_mut().emit_from(Generation::new(1), &line);
}

#[when("the user skips the permission setup")]
fn when_user_skips(world: &RefCell<TestWorld>) {
    world
        .borrow_mut()
        .post(LoopEvent::PermissionChoice(GrantChoice::Skip));
}

#[when("the user grants access")]
fn when_user_grants(world: &RefCell<TestWorld>) {
    world
        .borrow_mut()
        .post(LoopEvent::PermissionChoice(GrantChoice::Grant));
}

#[when("the privileged setup fails with \"{message}\"")]
fn when_setup_fails(world: &RefCell<TestWorld>, message: String) {
    world
        .borrow_mut()
        .post(LoopEvent::RemediationFinished(Err(message)));
}

#[when("the privileged setup succeeds")]
fn when_setup_succeeds(world: &RefCell<TestWorld>) {
    world
        .borrow_mut()
        .post(LoopEvent::RemediationFinished(Ok(())));
}

#[when("the user chooses to reboot now")]
fn when_user_reboots(world: &RefCell<TestWorld>) {
    world
        .borrow_mut()
        .post(LoopEvent::RebootChoice(RebootChoice::RebootNow));
}

#[then("the spawn count is {count}")]
fn then_spawn_count(world: &RefCell<TestWorld>, count: String) -> StepResult {
    let expected = parse_count(&count)?;
    let actual = world.borrow().spawner.spawn_count() as u64;
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected {expected} spawns, saw {actual}"))
    }
}

#[then("the backend is {state}")]
fn then_backend_state(world: &RefCell<TestWorld>, state: String) -> StepResult {
    let actual = world
        .borrow()
        .coordinator
        .supervisor()
        .lifecycle_state()
        .to_string();
    if actual == state {
        Ok(())
    } else {
        Err(format!("expected backend {state}, found {actual}"))
    }
}

#[then("an error titled \"{title}\" is shown")]
fn then_error_shown(world: &RefCell<TestWorld>, title: String) -> StepResult {
    let errors = world.borrow().desktop.errors();
    if errors.iter().any(|notice| notice.title == title) {
        Ok(())
    } else {
        Err(format!("no error titled '{title}': {errors:?}"))
    }
}

#[then("the tray showed {count} wave frames and then the static icon")]
fn then_wave_frames(world: &RefCell<TestWorld>, count: String) -> StepResult {
    let count = usize::try_from(parse_count(&count)?).map_err(|error| error.to_string())?;
    let mut expected: Vec<IconFrame> = (0..count).map(IconFrame::Wave).collect();
    expected.push(IconFrame::Static);
    let frames = world.borrow().desktop.frames();
    if frames == expected {
        Ok(())
    } else {
        Err(format!("expected frames {expected:?}, saw {frames:?}"))
    }
}

#[then("the tray icon is idle")]
fn then_icon_idle(world: &RefCell<TestWorld>) {
    let state = world.borrow().coordinator.animation_state();
    assert!(!state.is_animating, "animation still running: {state:?}");
}

#[then("the permission prompt was shown {count} times")]
fn then_prompt_count(world: &RefCell<TestWorld>, count: String) -> StepResult {
    let expected = parse_count(&count)?;
    let actual = world.borrow().desktop.permission_prompts() as u64;
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected {expected} prompts, saw {actual}"))
    }
}

#[then("the session ends with \"{reason}\"")]
fn then_session_ends(world: &RefCell<TestWorld>, reason: String) -> StepResult {
    match world.borrow().coordinator.exit_reason() {
        Some(actual) if actual.to_string() == reason => Ok(()),
        other => Err(format!("expected exit '{reason}', found {other:?}")),
    }
}

#[then("a reboot was requested")]
fn then_reboot_requested(world: &RefCell<TestWorld>) {
    assert_eq!(world.borrow().elevator.reboot_count(), 1);
}

#[scenario(
    path = "tests/features/backend_supervision.feature",
    name = "Startup launches one backend"
)]
fn startup_launches_one_backend(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/backend_supervision.feature",
    name = "Saved configuration restarts the backend after the grace delay"
)]
fn config_restart_waits_for_grace(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/backend_supervision.feature",
    name = "A backend that cannot be launched is reported"
)]
fn launch_failure_reported(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/backend_supervision.feature",
    name = "Trigger lines animate the tray icon"
)]
fn trigger_lines_animate(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/backend_supervision.feature",
    name = "Output from a replaced backend is ignored"
)]
fn replaced_backend_output_ignored(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/permission_workflow.feature",
    name = "Repeated deficiency reports prompt only once"
)]
fn deficiency_prompts_once(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/permission_workflow.feature",
    name = "Skipping the setup ends the session"
)]
fn skipping_ends_session(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/permission_workflow.feature",
    name = "A failed setup shows manual instructions"
)]
fn failed_setup_shows_instructions(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/permission_workflow.feature",
    name = "A successful setup offers a reboot"
)]
fn successful_setup_offers_reboot(world: RefCell<TestWorld>) {
    drop(world);
}
