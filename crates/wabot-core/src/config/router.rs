use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::defaults::*;

/// One canned reply for non-command messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoReply {
    /// Substrings matched case-insensitively against the message text.
    pub triggers: Vec<String>,
    pub response: String,
}

impl AutoReply {
    /// Whether any trigger occurs in `lowered` (already lowercased text).
    pub fn matches(&self, lowered: &str) -> bool {
        self.triggers
            .iter()
            .any(|t| !t.is_empty() && lowered.contains(&t.to_lowercase()))
    }
}

/// Message router settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Quiet period per chat before the latest message is dispatched.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Messages older than this (by sender timestamp) are dropped.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
    /// Upper bound on a single command run. 0 disables the limit.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    /// Ordered; the first matching entry wins.
    #[serde(default = "default_auto_replies")]
    pub auto_replies: Vec<AutoReply>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            stale_after_secs: default_stale_after_secs(),
            command_timeout_secs: default_command_timeout_secs(),
            auto_replies: default_auto_replies(),
        }
    }
}

impl RouterConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        (self.command_timeout_secs > 0).then(|| Duration::from_secs(self.command_timeout_secs))
    }
}

/// Reconnect and backoff policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Conflict-class reconnects allowed before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_conflict_base_secs")]
    pub conflict_base_secs: u64,
    #[serde(default = "default_conflict_cap_secs")]
    pub conflict_cap_secs: u64,
    /// Delay for ordinary and unauthorized closures.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// Stable-connection window after which the conflict count resets.
    #[serde(default = "default_conflict_reset_secs")]
    pub conflict_reset_secs: u64,
    /// Delay before retrying a failed start.
    #[serde(default = "default_start_retry_secs")]
    pub start_retry_secs: u64,
    /// Delay between teardown and start during a restart.
    #[serde(default = "default_restart_delay_secs")]
    pub restart_delay_secs: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            conflict_base_secs: default_conflict_base_secs(),
            conflict_cap_secs: default_conflict_cap_secs(),
            retry_delay_secs: default_retry_delay_secs(),
            conflict_reset_secs: default_conflict_reset_secs(),
            start_retry_secs: default_start_retry_secs(),
            restart_delay_secs: default_restart_delay_secs(),
        }
    }
}

impl ReconnectConfig {
    pub fn conflict_base(&self) -> Duration {
        Duration::from_secs(self.conflict_base_secs)
    }

    pub fn conflict_cap(&self) -> Duration {
        Duration::from_secs(self.conflict_cap_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn conflict_reset(&self) -> Duration {
        Duration::from_secs(self.conflict_reset_secs)
    }

    pub fn start_retry(&self) -> Duration {
        Duration::from_secs(self.start_retry_secs)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_secs)
    }
}
