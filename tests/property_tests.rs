//! Property-based tests for rust_event_logger using proptest

use proptest::prelude::*;
use rust_event_logger::core::{ControlledLevelSwitch, LevelOverrideMap, MessageTemplate, Token};
use rust_event_logger::prelude::*;
use rust_event_logger::sinks::{BackoffPolicy, BoundedQueue, ConnectionStatus};
use std::sync::Arc;
use std::time::Duration;

fn any_level() -> impl Strategy<Value = Level> {
    prop_oneof![
        Just(Level::Trace),
        Just(Level::Debug),
        Just(Level::Information),
        Just(Level::Warning),
        Just(Level::Error),
        Just(Level::Critical),
    ]
}

fn event(level: Level) -> LogEvent {
    LogEvent::new(
        chrono::Utc::now(),
        level,
        None,
        Arc::new(MessageTemplate::parse("e")),
        Vec::new(),
    )
}

// ============================================================================
// Level Tests
// ============================================================================

proptest! {
    /// Level names roundtrip through Display and FromStr
    #[test]
    fn test_level_str_roundtrip(level in any_level()) {
        let parsed: Level = level.to_string().parse().unwrap();
        prop_assert_eq!(level, parsed);
    }

    /// Parsing ignores case
    #[test]
    fn test_level_parse_is_case_insensitive(level in any_level(), upper in any::<bool>()) {
        let name = if upper {
            level.to_str().to_uppercase()
        } else {
            level.to_str().to_lowercase()
        };
        prop_assert_eq!(name.parse::<Level>().unwrap(), level);
    }

    /// A switch admits exactly the levels at or above its minimum
    #[test]
    fn test_switch_admits_at_or_above_minimum(minimum in any_level(), level in any_level()) {
        let switch = LevelSwitch::new(minimum);
        prop_assert_eq!(switch.is_enabled(level), level >= minimum);
    }
}

// ============================================================================
// Override Tests
// ============================================================================

proptest! {
    /// Any source below a configured prefix resolves to that prefix's switch
    #[test]
    fn test_override_covers_descendants(
        prefix in "[a-z]{1,6}(\\.[a-z]{1,6}){0,2}",
        suffix in "(\\.[a-z]{1,6}){0,3}",
    ) {
        let root = Arc::new(LevelSwitch::new(Level::Information));
        let special = Arc::new(LevelSwitch::new(Level::Error));
        let map = LevelOverrideMap::new(
            vec![(prefix.clone(), Arc::clone(&special))],
            Arc::clone(&root),
        )
        .unwrap();

        let source = format!("{}{}", prefix, suffix);
        prop_assert!(Arc::ptr_eq(&map.resolve(&source), &special));
    }

    /// A source that only shares a raw string prefix is not covered
    #[test]
    fn test_override_respects_segment_boundaries(
        prefix in "[a-z]{1,6}",
        extra in "[a-z]{1,6}",
    ) {
        let root = Arc::new(LevelSwitch::new(Level::Information));
        let special = Arc::new(LevelSwitch::new(Level::Error));
        let map = LevelOverrideMap::new(vec![(prefix.clone(), special)], Arc::clone(&root)).unwrap();

        let source = format!("{}{}", prefix, extra);
        prop_assert!(Arc::ptr_eq(&map.resolve(&source), &root));
    }
}

// ============================================================================
// Controlled Switch Tests
// ============================================================================

proptest! {
    /// Any sequence of hints followed by a clear restores the original level
    #[test]
    fn test_hints_then_clear_restore_original(
        original in any_level(),
        hints in prop::collection::vec(any_level(), 1..8),
    ) {
        let switch = Arc::new(LevelSwitch::new(original));
        let controller = ControlledLevelSwitch::new(Some(Arc::clone(&switch)));

        for hint in &hints {
            controller.update(Some(*hint));
            prop_assert_eq!(switch.minimum_level(), *hint);
        }
        controller.update(None);
        prop_assert_eq!(switch.minimum_level(), original);
        prop_assert!(controller.is_active());
    }

    /// Without a local switch the latest hint decides inclusion
    #[test]
    fn test_switchless_controller_follows_hint(hint in any_level(), level in any_level()) {
        let controller = ControlledLevelSwitch::new(None);
        prop_assert!(controller.is_included(&event(level)));

        controller.update(Some(hint));
        prop_assert!(controller.is_active());
        prop_assert_eq!(controller.is_included(&event(level)), level >= hint);
    }
}

// ============================================================================
// Queue Tests
// ============================================================================

proptest! {
    /// Rejected enqueues never change the length
    #[test]
    fn test_queue_never_exceeds_limit(limit in 1usize..64, offered in 0usize..256) {
        let queue = BoundedQueue::new(Some(limit)).unwrap();
        let accepted = (0..offered).filter(|&i| queue.try_enqueue(i)).count();

        prop_assert_eq!(accepted, offered.min(limit));
        prop_assert_eq!(queue.len(), offered.min(limit));

        for i in 0..10 {
            prop_assert_eq!(queue.try_enqueue(i), offered + i < limit);
        }
        prop_assert!(queue.len() <= limit);
    }

    /// Dequeue order matches enqueue order
    #[test]
    fn test_queue_is_fifo(items in prop::collection::vec(any::<u32>(), 0..100)) {
        let queue = BoundedQueue::new(None).unwrap();
        for item in &items {
            prop_assert!(queue.try_enqueue(*item));
        }
        let drained: Vec<u32> = std::iter::from_fn(|| queue.try_dequeue()).collect();
        prop_assert_eq!(drained, items);
    }
}

// ============================================================================
// Backoff Tests
// ============================================================================

proptest! {
    /// The interval never drops below the period nor exceeds the cap
    #[test]
    fn test_backoff_stays_within_bounds(period_ms in 1u64..20_000, failures in 0u32..200) {
        let period = Duration::from_millis(period_ms);
        let policy = BackoffPolicy::default();
        let mut status = ConnectionStatus::new(period, policy);
        for _ in 0..failures {
            status.mark_failure();
        }

        let interval = status.next_interval();
        prop_assert!(interval >= period);
        prop_assert!(interval <= policy.maximum_backoff.max(period));
    }

    /// More failures never shorten the interval, and success resets it
    #[test]
    fn test_backoff_is_monotonic(failures in 1u32..40) {
        let mut status = ConnectionStatus::new(Duration::from_secs(2), BackoffPolicy::default());
        let mut previous = status.next_interval();
        for _ in 0..failures {
            status.mark_failure();
            let next = status.next_interval();
            prop_assert!(next >= previous);
            previous = next;
        }
        status.mark_success();
        prop_assert_eq!(status.next_interval(), Duration::from_secs(2));
    }
}

// ============================================================================
// Template Tests
// ============================================================================

proptest! {
    /// Text without braces is a single text token rendered unchanged
    #[test]
    fn test_plain_text_renders_unchanged(text in "[^{}]{0,64}") {
        let template = MessageTemplate::parse(&text);
        prop_assert_eq!(template.render(|_| None), text.clone());
        prop_assert!(template.tokens().iter().all(|t| matches!(t, Token::Text(_))));
    }

    /// Doubled braces render as literal braces
    #[test]
    fn test_escaped_braces(inner in "[a-zA-Z0-9 ]{0,16}") {
        let template = MessageTemplate::parse(&format!("{{{{{}}}}}", inner));
        prop_assert_eq!(template.render(|_| None), format!("{{{}}}", inner));
        prop_assert_eq!(template.property_tokens().count(), 0);
    }

    /// A bound named property appears in the rendered message
    #[test]
    fn test_named_property_is_rendered(name in "[A-Z][a-zA-Z0-9_]{0,10}", value in any::<i64>()) {
        let events = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let target = Arc::clone(&events);

        struct Capture(Arc<parking_lot::Mutex<Vec<String>>>);
        impl Sink for Capture {
            fn emit(&self, event: LogEvent) {
                self.0.lock().push(event.render_message());
            }
        }

        let logger = Logger::builder().sink(Capture(target)).build().unwrap();
        logger.info(&format!("value {{{}}} end", name), &[Arg::from(value)]);
        prop_assert_eq!(events.lock().clone(), vec![format!("value {} end", value)]);
    }
}
