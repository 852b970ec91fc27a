//! Key combo to command table with per-binding repeat throttling.

use std::collections::HashMap;
use std::time::Duration;

use crate::clock::Throttle;
use crate::commands::CommandId;
use crate::constants::HOTKEY_THROTTLE;

use super::KeyCombo;

#[derive(Debug, Clone)]
struct Binding {
    command: CommandId,
    /// `None` for throttle-exempt commands.
    throttle: Option<Throttle>,
}

/// What a key press resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Fire(CommandId),
    /// Bound, but dropped as a repeat inside the throttle window.
    Throttled(CommandId),
    Unbound,
}

#[derive(Debug, Clone)]
pub struct HotkeyBinder {
    bindings: HashMap<KeyCombo, Binding>,
    throttle_window: Duration,
}

impl HotkeyBinder {
    pub fn new() -> Self {
        Self::with_throttle(HOTKEY_THROTTLE)
    }

    pub fn with_throttle(throttle_window: Duration) -> Self {
        Self {
            bindings: HashMap::new(),
            throttle_window,
        }
    }

    /// Bind a combo; a later binding of the same combo replaces the earlier one.
    pub fn bind(
        &mut self,
        combo: KeyCombo,
        command: CommandId,
        throttle_exempt: bool,
    ) -> Option<CommandId> {
        let throttle = (!throttle_exempt).then(|| Throttle::new(self.throttle_window));
        self.bindings
            .insert(combo, Binding { command, throttle })
            .map(|previous| previous.command)
    }

    pub fn unbind_all(&mut self) {
        self.bindings.clear();
    }

    pub fn bound_command(&self, combo: &KeyCombo) -> Option<CommandId> {
        self.bindings.get(combo).map(|b| b.command)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn trigger(&mut self, combo: &KeyCombo, now: Duration) -> Trigger {
        let Some(binding) = self.bindings.get_mut(combo) else {
            return Trigger::Unbound;
        };
        let admitted = binding.throttle.as_mut().is_none_or(|t| t.admit(now));
        if admitted {
            Trigger::Fire(binding.command)
        } else {
            Trigger::Throttled(binding.command)
        }
    }
}

impl Default for HotkeyBinder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn repeats_inside_window_are_throttled() {
        let mut binder = HotkeyBinder::new();
        let combo: KeyCombo = "ctrl+x".parse().unwrap();
        binder.bind(combo, CommandId("cutBlock"), false);

        assert_eq!(binder.trigger(&combo, ms(0)), Trigger::Fire(CommandId("cutBlock")));
        assert_eq!(
            binder.trigger(&combo, ms(100)),
            Trigger::Throttled(CommandId("cutBlock"))
        );
        assert_eq!(binder.trigger(&combo, ms(260)), Trigger::Fire(CommandId("cutBlock")));
    }

    #[test]
    fn exempt_bindings_always_fire() {
        let mut binder = HotkeyBinder::new();
        let combo: KeyCombo = "arrowdown".parse().unwrap();
        binder.bind(combo, CommandId("navDown"), true);
        for t in [0, 10, 20, 30] {
            assert_eq!(binder.trigger(&combo, ms(t)), Trigger::Fire(CommandId("navDown")));
        }
    }

    #[test]
    fn throttles_are_per_binding() {
        let mut binder = HotkeyBinder::new();
        let cut: KeyCombo = "ctrl+x".parse().unwrap();
        let copy: KeyCombo = "ctrl+c".parse().unwrap();
        binder.bind(cut, CommandId("cutBlock"), false);
        binder.bind(copy, CommandId("copyBlock"), false);

        assert!(matches!(binder.trigger(&cut, ms(0)), Trigger::Fire(_)));
        assert!(matches!(binder.trigger(&copy, ms(10)), Trigger::Fire(_)));
    }

    #[test]
    fn rebinding_replaces_and_unbind_all_clears() {
        let mut binder = HotkeyBinder::new();
        let combo: KeyCombo = "ctrl+k".parse().unwrap();
        assert_eq!(binder.bind(combo, CommandId("chat"), false), None);
        assert_eq!(
            binder.bind(combo, CommandId("diagram"), false),
            Some(CommandId("chat"))
        );
        assert_eq!(binder.bound_command(&combo), Some(CommandId("diagram")));

        binder.unbind_all();
        assert!(binder.is_empty());
        assert_eq!(binder.trigger(&combo, ms(0)), Trigger::Unbound);
    }
}
