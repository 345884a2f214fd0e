use crate::desktop::Notice;

use super::grants::Grants;
use super::remediation::RemediationPlan;

/// The grant/skip prompt.
#[must_use]
pub fn permission_request(grants: Grants) -> Notice {
    let mut steps = Vec::new();
    if !grants.input_group {
        steps.push("  \u{2022} Adds your user to the \"input\" group");
    }
    if !grants.uinput_rule {
        steps.push("  \u{2022} Enables the virtual keyboard device (/dev/uinput)");
    }
    let message = format!(
        "Coral needs access to keyboard input devices for hotkey detection and text injection.\n\n\
         This is a one-time setup that requires your password:\n{}\n\n\
         You will need to log out and back in for the change to take effect.",
        steps.join("\n")
    );
    Notice::question("Keyboard Access Required", message, "Grant Access", "Skip")
}

/// The failure notice with manual fallback commands.
#[must_use]
pub fn remediation_failed(error: &str, plan: &RemediationPlan) -> Notice {
    Notice::error(
        "Permission Error",
        format!(
            "Failed to set up input permissions:\n{error}\n\nYou can do it manually:\n{}",
            plan.manual_instructions()
        ),
    )
}

/// The reboot prompt shown after a successful setup.
#[must_use]
pub fn setup_complete() -> Notice {
    Notice::question(
        "Setup Complete",
        "Input permissions have been configured.\n\n\
         Please reboot your computer for the changes to take effect,\n\
         then start Coral again.",
        "Reboot Now",
        "Later",
    )
}
