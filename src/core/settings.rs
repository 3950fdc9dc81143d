//! Settings for wiring a logger to an ingestion endpoint
//!
//! Keys follow the usual configuration section layout:
//!
//! ```json
//! {
//!   "ServerUrl": "http://localhost:5341",
//!   "ApiKey": "abc123",
//!   "MinimumLevel": "Debug",
//!   "LevelOverride": { "noisy::module": "Warning" },
//!   "BatchSizeLimit": 500,
//!   "PeriodSeconds": 5,
//!   "QueueLimit": 10000
//! }
//! ```
//!
//! Level names are parsed leniently: an unknown name is reported to the
//! self-log and replaced (minimum level) or skipped (override).

use super::error::Result;
use super::level::Level;
use super::level_switch::LevelSwitch;
use super::logger::Logger;
use crate::sinks::{IngestionClient, IngestionSink, PeriodicBatchingOptions, PeriodicBatchingSink};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LoggerSettings {
    pub server_url: Option<String>,
    pub api_key: Option<String>,
    pub minimum_level: Option<String>,
    /// Source prefix to level name
    pub level_override: BTreeMap<String, String>,
    pub batch_size_limit: Option<usize>,
    pub period_seconds: Option<u64>,
    pub queue_limit: Option<usize>,
}

impl LoggerSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The server URL, ignoring blank values
    pub fn server_url(&self) -> Option<&str> {
        non_blank(self.server_url.as_deref())
    }

    pub fn api_key(&self) -> Option<&str> {
        non_blank(self.api_key.as_deref())
    }

    /// The configured minimum level, `Information` when absent or invalid
    pub fn resolved_minimum_level(&self) -> Level {
        let Some(setting) = non_blank(self.minimum_level.as_deref()) else {
            return Level::Information;
        };
        match setting.parse::<Level>() {
            Ok(level) => level,
            Err(_) => {
                crate::self_log!("The minimum level setting `{}` is invalid", setting);
                Level::Information
            }
        }
    }

    /// Valid overrides; invalid entries are reported and left out
    pub fn resolved_overrides(&self) -> Vec<(String, Level)> {
        self.level_override
            .iter()
            .filter_map(|(source, setting)| match setting.parse::<Level>() {
                Ok(level) => Some((source.clone(), level)),
                Err(_) => {
                    crate::self_log!(
                        "The level override setting `{}` for `{}` is invalid",
                        setting,
                        source
                    );
                    None
                }
            })
            .collect()
    }

    pub fn batching_options(&self) -> PeriodicBatchingOptions {
        let mut options = PeriodicBatchingOptions::default();
        if let Some(limit) = self.batch_size_limit {
            options = options.with_batch_size_limit(limit);
        }
        if let Some(seconds) = self.period_seconds {
            options = options.with_period(Duration::from_secs(seconds));
        }
        if let Some(limit) = self.queue_limit {
            options = options.with_queue_limit(Some(limit));
        }
        options
    }

    /// Build a logger delivering through the client returned by `connect`.
    ///
    /// `connect` receives the server URL and API key. The logger and the
    /// ingestion sink share one [`LevelSwitch`], so levels requested by the
    /// server apply at the source. Without a server URL the logger has no
    /// sink and discards everything.
    pub fn build_logger<C, F>(&self, connect: F) -> Result<Logger>
    where
        C: IngestionClient + 'static,
        F: FnOnce(&str, Option<&str>) -> C,
    {
        let switch = Arc::new(LevelSwitch::new(self.resolved_minimum_level()));
        let mut builder = Logger::builder().level_switch(Arc::clone(&switch));
        for (source, level) in self.resolved_overrides() {
            builder = builder.override_level(source, level);
        }

        let Some(server_url) = self.server_url() else {
            crate::self_log!(
                "Unable to add the ingestion sink: no ServerUrl was present in the configuration"
            );
            return builder.build();
        };

        let client = connect(server_url, self.api_key());
        let ingestion = IngestionSink::new(client, Some(switch));
        let batching = PeriodicBatchingSink::new(Box::new(ingestion), self.batching_options())?;
        builder.sink(batching).build()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
