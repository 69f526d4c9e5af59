//! Runtime configuration for core services.
//!
//! # Responsibility
//! - Carry debounce windows and log level chosen by the host application.
//!
//! # Invariants
//! - Missing fields deserialize to their defaults.
//! - A zero debounce window flushes on the next `take_due` call.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_FIELD_DEBOUNCE_MS: u64 = 600;
pub const DEFAULT_RELATION_DEBOUNCE_MS: u64 = 700;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoreConfig {
    /// Quiet period for entity and scene field edits.
    pub field_debounce_ms: u64,
    /// Quiet period for relation list edits.
    pub relation_debounce_ms: u64,
    /// Overrides the build-mode default when set.
    pub log_level: Option<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            field_debounce_ms: DEFAULT_FIELD_DEBOUNCE_MS,
            relation_debounce_ms: DEFAULT_RELATION_DEBOUNCE_MS,
            log_level: None,
        }
    }
}

impl CoreConfig {
    pub fn field_debounce(&self) -> Duration {
        Duration::from_millis(self.field_debounce_ms)
    }

    pub fn relation_debounce(&self) -> Duration {
        Duration::from_millis(self.relation_debounce_ms)
    }

    /// Configured level, or the build-mode default.
    pub fn log_level(&self) -> &str {
        match self.log_level.as_deref().map(str::trim) {
            Some(level) if !level.is_empty() => level,
            _ => default_log_level(),
        }
    }
}
