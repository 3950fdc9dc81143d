//! Dynamically adjustable minimum level

use super::level::Level;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// A shared, mutable minimum level.
///
/// Reads are a single atomic load so the switch can be consulted on every
/// `is_enabled` check from any thread. Share it with `Arc<LevelSwitch>`.
///
/// # Example
///
/// ```
/// use rust_event_logger::{Level, LevelSwitch};
///
/// let switch = LevelSwitch::new(Level::Warning);
/// assert!(!switch.is_enabled(Level::Information));
///
/// switch.set_minimum_level(Level::Debug);
/// assert!(switch.is_enabled(Level::Information));
/// ```
pub struct LevelSwitch {
    minimum_level: AtomicU8,
}

impl LevelSwitch {
    pub const fn new(initial_minimum_level: Level) -> Self {
        Self {
            minimum_level: AtomicU8::new(initial_minimum_level as u8),
        }
    }

    /// The current minimum level, below which no events should be generated
    #[inline]
    pub fn minimum_level(&self) -> Level {
        Level::from_u8(self.minimum_level.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set_minimum_level(&self, level: Level) {
        self.minimum_level.store(level.as_u8(), Ordering::Release);
    }

    #[inline]
    pub fn is_enabled(&self, level: Level) -> bool {
        level >= self.minimum_level()
    }
}

impl Default for LevelSwitch {
    fn default() -> Self {
        Self::new(Level::Information)
    }
}

impl fmt::Debug for LevelSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LevelSwitch")
            .field("minimum_level", &self.minimum_level())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_default_is_information() {
        assert_eq!(LevelSwitch::default().minimum_level(), Level::Information);
    }

    #[test]
    fn test_switch_admits_at_and_above_minimum() {
        for minimum in Level::ALL {
            let switch = LevelSwitch::new(minimum);
            for level in Level::ALL {
                assert_eq!(switch.is_enabled(level), level >= minimum);
            }
        }
    }

    #[test]
    fn test_writes_visible_across_threads() {
        let switch = Arc::new(LevelSwitch::new(Level::Critical));
        let writer = Arc::clone(&switch);

        thread::spawn(move || writer.set_minimum_level(Level::Trace))
            .join()
            .unwrap();

        assert_eq!(switch.minimum_level(), Level::Trace);
    }
}
