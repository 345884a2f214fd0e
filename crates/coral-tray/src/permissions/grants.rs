use std::path::PathBuf;

use nix::unistd::{Group, getegid, getgroups};
use tracing::{debug, warn};

use super::PERMISSIONS_TARGET;

/// Group granting read access to `/dev/input/event*`.
pub const INPUT_GROUP: &str = "input";

/// Rule file granting the input group access to `/dev/uinput`.
pub const UINPUT_RULE_PATH: &str = "/etc/udev/rules.d/99-coral-uinput.rules";

/// Contents of [`UINPUT_RULE_PATH`].
pub const UINPUT_RULE: &str = r#"KERNEL=="uinput", GROUP="input", MODE="0660""#;

/// The OS grants the backend needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Grants {
    /// The session is a member of [`INPUT_GROUP`].
    pub input_group: bool,
    /// The uinput device rule is installed.
    pub uinput_rule: bool,
}

impl Grants {
    /// Whether nothing needs remediating.
    #[must_use]
    pub const fn is_complete(self) -> bool {
        self.input_group && self.uinput_rule
    }
}

/// Reads the current grants from the OS.
#[cfg_attr(test, mockall::automock)]
pub trait GrantProbe {
    /// Checks group membership and rule presence.
    fn probe(&self) -> Grants;
}

/// Probes the running session.
///
/// Membership is read from the process's own group list, so a user added to
/// the group after login still counts as missing until the session restarts.
#[derive(Debug, Clone)]
pub struct SystemGrantProbe {
    group: String,
    rule_path: PathBuf,
}

impl Default for SystemGrantProbe {
    fn default() -> Self {
        Self::new(INPUT_GROUP, UINPUT_RULE_PATH)
    }
}

impl SystemGrantProbe {
    /// Probes `group` membership and the presence of `rule_path`.
    #[must_use]
    pub fn new(group: impl Into<String>, rule_path: impl Into<PathBuf>) -> Self {
        Self {
            group: group.into(),
            rule_path: rule_path.into(),
        }
    }

    fn in_group(&self) -> bool {
        let gid = match Group::from_name(&self.group) {
            Ok(Some(group)) => group.gid,
            Ok(None) => {
                debug!(target: PERMISSIONS_TARGET, group = %self.group, "group does not exist");
                return false;
            }
            Err(error) => {
                warn!(
                    target: PERMISSIONS_TARGET,
                    group = %self.group,
                    error = %error,
                    "group lookup failed"
                );
                return false;
            }
        };
        if getegid() == gid {
            return true;
        }
        match getgroups() {
            Ok(groups) => groups.contains(&gid),
            Err(error) => {
                warn!(
                    target: PERMISSIONS_TARGET,
                    error = %error,
                    "reading supplementary groups failed"
                );
                false
            }
        }
    }

    fn rule_installed(&self) -> bool {
        self.rule_path.exists()
    }
}

impl GrantProbe for SystemGrantProbe {
    fn probe(&self) -> Grants {
        let grants = Grants {
            input_group: self.in_group(),
            uinput_rule: self.rule_installed(),
        };
        debug!(
            target: PERMISSIONS_TARGET,
            input_group = grants.input_group,
            uinput_rule = grants.uinput_rule,
            "probed device access"
        );
        grants
    }
}
