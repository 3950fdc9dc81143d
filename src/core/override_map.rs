//! Per-source minimum level overrides

use super::error::{LoggerError, Result};
use super::level_switch::LevelSwitch;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps dot-separated source name prefixes to level switches.
///
/// Built once when the logger is constructed and never mutated afterwards.
/// Resolution picks the longest configured prefix that ends on a segment
/// boundary, falling back to the root switch.
#[derive(Debug, Clone)]
pub struct LevelOverrideMap {
    overrides: HashMap<String, Arc<LevelSwitch>>,
    root: Arc<LevelSwitch>,
}

impl LevelOverrideMap {
    pub fn new<I>(overrides: I, root: Arc<LevelSwitch>) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Arc<LevelSwitch>)>,
    {
        let mut map = HashMap::new();
        for (source, switch) in overrides {
            let trimmed = normalize(source.trim());
            if trimmed.is_empty() {
                return Err(LoggerError::config(
                    "LevelOverrideMap",
                    "a source name must be provided for each override",
                ));
            }
            map.insert(trimmed, switch);
        }

        Ok(Self {
            overrides: map,
            root,
        })
    }

    /// Find the switch governing `source`.
    ///
    /// `"A.B.C"` is checked as `"A.B.C"`, then `"A.B"`, then `"A"`. Rust paths
    /// using `::` are treated the same as dots.
    pub fn resolve(&self, source: &str) -> Arc<LevelSwitch> {
        if self.overrides.is_empty() {
            return Arc::clone(&self.root);
        }

        let normalized = normalize(source.trim());
        let mut candidate = normalized.as_str();
        loop {
            if let Some(switch) = self.overrides.get(candidate) {
                return Arc::clone(switch);
            }
            match candidate.rfind('.') {
                Some(idx) => candidate = &candidate[..idx],
                None => return Arc::clone(&self.root),
            }
        }
    }

    pub fn root(&self) -> &Arc<LevelSwitch> {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

fn normalize(source: &str) -> String {
    source.replace("::", ".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::level::Level;

    fn map() -> (LevelOverrideMap, Arc<LevelSwitch>, Arc<LevelSwitch>, Arc<LevelSwitch>) {
        let root = Arc::new(LevelSwitch::new(Level::Information));
        let a = Arc::new(LevelSwitch::new(Level::Warning));
        let ab = Arc::new(LevelSwitch::new(Level::Error));
        let map = LevelOverrideMap::new(
            vec![
                ("A".to_string(), Arc::clone(&a)),
                ("A.B".to_string(), Arc::clone(&ab)),
            ],
            Arc::clone(&root),
        )
        .unwrap();
        (map, root, a, ab)
    }

    #[test]
    fn test_longest_prefix_wins() {
        let (map, _, _, ab) = map();
        assert!(Arc::ptr_eq(&map.resolve("A.B.C"), &ab));
        assert!(Arc::ptr_eq(&map.resolve("A.B"), &ab));
    }

    #[test]
    fn test_falls_back_to_shorter_prefix() {
        let (map, _, a, _) = map();
        assert!(Arc::ptr_eq(&map.resolve("A.X"), &a));
    }

    #[test]
    fn test_unmatched_source_uses_root() {
        let (map, root, _, _) = map();
        assert!(Arc::ptr_eq(&map.resolve("Z"), &root));
        assert!(Arc::ptr_eq(&map.resolve(""), &root));
    }

    #[test]
    fn test_matches_on_segment_boundaries_only() {
        let (map, root, a, _) = map();
        // "A.BC" shares a raw prefix with "A.B" but not a segment
        assert!(Arc::ptr_eq(&map.resolve("A.BC"), &a));
        assert!(Arc::ptr_eq(&map.resolve("AB"), &root));
    }

    #[test]
    fn test_rust_paths_are_normalized() {
        let (map, _, _, ab) = map();
        assert!(Arc::ptr_eq(&map.resolve("A::B::handler"), &ab));
    }

    #[test]
    fn test_empty_source_name_is_rejected() {
        let root = Arc::new(LevelSwitch::default());
        let result = LevelOverrideMap::new(
            vec![("  ".to_string(), Arc::new(LevelSwitch::default()))],
            root,
        );
        assert!(matches!(result, Err(LoggerError::InvalidConfiguration { .. })));
    }
}
