//! Shared constants for the editor core.

use std::time::Duration;

/// DOM id of the implicit root container. Blocks directly under it have no parent.
pub const ROOT_CONTAINER_ID: &str = "rootContainer";

/// The command armed whenever no other interaction is in progress.
pub const DEFAULT_COMMAND: &str = "openBlock";

/// The universal abort command; runs in every mode.
pub const ESCAPE_COMMAND: &str = "escape";

/// Leading-edge throttle absorbing physical key repeat.
pub const HOTKEY_THROTTLE: Duration = Duration::from_millis(250);

/// Delay before re-arming the default command after a mode mismatch.
pub const FALLBACK_DELAY: Duration = Duration::from_millis(50);

/// DOM id prefix of the transient before-indicator in cut mode.
pub const INDICATOR_PREFIX: &str = "indicator";
