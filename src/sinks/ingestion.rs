//! Batched sink over an [`IngestionClient`] with server-controlled levels

use super::batched::{BatchedSink, IngestionClient};
use crate::core::controlled_switch::ControlledLevelSwitch;
use crate::core::error::Result;
use crate::core::event::LogEvent;
use crate::core::level_switch::LevelSwitch;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long an idle sink waits before sending a keep-alive to learn the
/// server's current level
pub const DEFAULT_LEVEL_CHECK_INTERVAL: Duration = Duration::from_secs(2 * 60);

/// Delivers batches through a client and applies the minimum level the
/// server reports back.
///
/// Passing the logger's own [`LevelSwitch`] lets the server raise or lower
/// the level at which events are produced in the first place.
pub struct IngestionSink<C> {
    client: C,
    controller: Arc<ControlledLevelSwitch>,
    level_check_interval: Duration,
    next_level_check: Instant,
}

impl<C: IngestionClient> IngestionSink<C> {
    pub fn new(client: C, level_switch: Option<Arc<LevelSwitch>>) -> Self {
        Self {
            client,
            controller: Arc::new(ControlledLevelSwitch::new(level_switch)),
            level_check_interval: DEFAULT_LEVEL_CHECK_INTERVAL,
            next_level_check: Instant::now() + DEFAULT_LEVEL_CHECK_INTERVAL,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_level_check_interval(mut self, interval: Duration) -> Self {
        self.level_check_interval = interval;
        self.next_level_check = Instant::now() + interval;
        self
    }

    /// The switch the server's hints are applied to
    pub fn controller(&self) -> Arc<ControlledLevelSwitch> {
        Arc::clone(&self.controller)
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: IngestionClient> BatchedSink for IngestionSink<C> {
    fn emit_batch(&mut self, batch: &[LogEvent]) -> Result<()> {
        self.next_level_check = Instant::now() + self.level_check_interval;
        self.client.deliver(batch)?;

        let server_level = self.client.poll_server_level();
        self.controller.update(server_level);
        Ok(())
    }

    fn on_empty_batch(&mut self) -> Result<()> {
        if self.controller.is_active() && Instant::now() >= self.next_level_check {
            self.emit_batch(&[])?;
        }
        Ok(())
    }

    fn can_include(&self, event: &LogEvent) -> bool {
        self.controller.is_included(event)
    }

    fn close(&mut self) {
        self.client.close();
    }

    fn name(&self) -> &str {
        self.client.name()
    }
}
