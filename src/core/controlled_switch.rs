//! Level switch driven by hints from the ingestion server

use super::event::LogEvent;
use super::level::Level;
use super::level_switch::LevelSwitch;
use parking_lot::Mutex;
use std::sync::Arc;

/// Applies a server-provided minimum level to an optional local switch.
///
/// When a switch is supplied it is adjusted in place, so loggers sharing it
/// observe the server's level. Without one, events are only filtered after a
/// hint has arrived, through a switch created on demand.
#[derive(Debug, Default)]
pub struct ControlledLevelSwitch {
    state: Mutex<ControlState>,
}

#[derive(Debug, Default)]
struct ControlState {
    controlled: Option<Arc<LevelSwitch>>,
    original: Option<Level>,
}

impl ControlledLevelSwitch {
    pub fn new(controlled: Option<Arc<LevelSwitch>>) -> Self {
        Self {
            state: Mutex::new(ControlState {
                controlled,
                original: None,
            }),
        }
    }

    /// True once there is a switch under control
    pub fn is_active(&self) -> bool {
        self.state.lock().controlled.is_some()
    }

    pub fn is_included(&self, event: &LogEvent) -> bool {
        match &self.state.lock().controlled {
            Some(switch) => switch.is_enabled(event.level()),
            None => true,
        }
    }

    /// The switch under control, if any
    pub fn switch(&self) -> Option<Arc<LevelSwitch>> {
        self.state.lock().controlled.clone()
    }

    /// Apply a server hint; `None` restores the level in effect before the first hint
    pub fn update(&self, server_level: Option<Level>) {
        let mut state = self.state.lock();
        match server_level {
            Some(level) => match state.controlled.clone() {
                None => {
                    state.original = Some(Level::MINIMUM);
                    state.controlled = Some(Arc::new(LevelSwitch::new(level)));
                }
                Some(switch) => {
                    if state.original.is_none() {
                        state.original = Some(switch.minimum_level());
                    }
                    if switch.minimum_level() != level {
                        switch.set_minimum_level(level);
                    }
                }
            },
            None => {
                if let (Some(switch), Some(original)) = (&state.controlled, state.original) {
                    if switch.minimum_level() != original {
                        switch.set_minimum_level(original);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::template::MessageTemplate;
    use chrono::Utc;

    fn event(level: Level) -> LogEvent {
        LogEvent::new(
            Utc::now(),
            level,
            None,
            Arc::new(MessageTemplate::parse("test")),
            Vec::new(),
        )
    }

    #[test]
    fn test_update_then_clear_restores_original() {
        let switch = Arc::new(LevelSwitch::new(Level::Debug));
        let controller = ControlledLevelSwitch::new(Some(Arc::clone(&switch)));

        controller.update(Some(Level::Error));
        assert_eq!(switch.minimum_level(), Level::Error);

        controller.update(Some(Level::Warning));
        assert_eq!(switch.minimum_level(), Level::Warning);

        controller.update(None);
        assert_eq!(switch.minimum_level(), Level::Debug);
    }

    #[test]
    fn test_without_switch_everything_is_included_until_a_hint() {
        let controller = ControlledLevelSwitch::new(None);
        assert!(!controller.is_active());
        assert!(controller.is_included(&event(Level::Trace)));

        controller.update(None);
        assert!(!controller.is_active());

        controller.update(Some(Level::Warning));
        assert!(controller.is_active());
        assert!(!controller.is_included(&event(Level::Information)));
        assert!(controller.is_included(&event(Level::Error)));

        // Clearing reverts to unrestricted but stays active
        controller.update(None);
        assert!(controller.is_active());
        assert!(controller.is_included(&event(Level::Trace)));
    }

    #[test]
    fn test_supplied_switch_is_active_from_construction() {
        let controller = ControlledLevelSwitch::new(Some(Arc::new(LevelSwitch::default())));
        assert!(controller.is_active());
        assert!(!controller.is_included(&event(Level::Debug)));
    }

    #[test]
    fn test_clear_before_any_hint_leaves_level_alone() {
        let switch = Arc::new(LevelSwitch::new(Level::Error));
        let controller = ControlledLevelSwitch::new(Some(Arc::clone(&switch)));
        controller.update(None);
        assert_eq!(switch.minimum_level(), Level::Error);
    }
}
