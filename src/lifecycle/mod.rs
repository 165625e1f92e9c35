//! Connection lifecycle: reconnect policy, conflict backoff, terminal states.
//!
//! `handle_update` is a pure state transition. It never sleeps or spawns;
//! the orchestrator performs the returned [`LifecycleAction`].


use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use wabot_core::{
    config::ReconnectConfig,
    message::{CloseReason, ConnectionStatus, ConnectionUpdate},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkStatus {
    #[default]
    Disconnected,
    Connecting,
    Open,
}

/// States with no automatic way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    GaveUp,
    LoggedOut,
}

/// How a closed connection should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseClass {
    /// Another client took over the session, or the stream errored.
    Conflict,
    /// Transient authorization failure during connect.
    Unauthorized,
    LoggedOut,
    Other,
}

/// What the orchestrator should do after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    None,
    Reconnect { delay: Duration, class: CloseClass },
    GiveUp,
    LoggedOut,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub status: LinkStatus,
    /// Conflict reconnects since the last open.
    pub reconnect_attempts: u32,
    /// Consecutive conflict closures.
    pub conflict_count: u32,
    pub last_reconnect_at: Option<Instant>,
    pub opened_at: Option<Instant>,
    pub terminal: Option<Terminal>,
}

/// Classify a close reason.
///
/// Conflict detection is a text heuristic over the library's message; it
/// lives here and nowhere else.
pub fn classify_close(reason: &CloseReason) -> CloseClass {
    let message = reason.message.to_lowercase();
    if message.contains("conflict") || message.contains("stream errored") {
        return CloseClass::Conflict;
    }
    if reason.logged_out {
        return CloseClass::LoggedOut;
    }
    match reason.status_code {
        Some(401) if message.contains("connection failure") => CloseClass::Unauthorized,
        Some(401) => CloseClass::LoggedOut,
        _ => CloseClass::Other,
    }
}

pub struct LifecycleManager {
    config: ReconnectConfig,
    state: ConnectionState,
}

impl LifecycleManager {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            state: ConnectionState::default(),
        }
    }

    pub fn currently_connected(&self) -> bool {
        self.state.status == LinkStatus::Open
    }

    pub fn snapshot(&self) -> ConnectionState {
        self.state.clone()
    }

    /// Apply one connection update and decide what to do next.
    pub fn handle_update(&mut self, update: &ConnectionUpdate, now: Instant) -> LifecycleAction {
        match update.status {
            Some(ConnectionStatus::Connecting) => {
                debug!("connecting");
                self.state.status = LinkStatus::Connecting;
                LifecycleAction::None
            }
            Some(ConnectionStatus::Open) => {
                self.on_open(now);
                LifecycleAction::None
            }
            Some(ConnectionStatus::Close) => {
                let reason = update.close.clone().unwrap_or_default();
                self.on_close(&reason, now)
            }
            None => LifecycleAction::None,
        }
    }

    fn on_open(&mut self, now: Instant) {
        let state = &mut self.state;
        state.status = LinkStatus::Open;
        state.terminal = None;
        state.reconnect_attempts = 0;
        let calm = state
            .last_reconnect_at
            .map_or(true, |at| now.saturating_duration_since(at) > self.config.conflict_reset());
        if calm {
            state.conflict_count = 0;
        }
        state.opened_at = Some(now);
        info!("connection open");
    }

    fn on_close(&mut self, reason: &CloseReason, now: Instant) -> LifecycleAction {
        self.state.status = LinkStatus::Disconnected;
        self.state.opened_at = None;

        if let Some(terminal) = self.state.terminal {
            debug!("close while terminal ({terminal:?}), ignoring");
            return terminal_action(terminal);
        }

        let class = classify_close(reason);
        info!(
            "connection closed ({class:?}): {} [{:?}]",
            reason.message, reason.status_code
        );

        match class {
            CloseClass::Conflict => self.on_conflict(now),
            CloseClass::LoggedOut => {
                error!("session logged out, re-pairing required");
                self.state.terminal = Some(Terminal::LoggedOut);
                LifecycleAction::LoggedOut
            }
            CloseClass::Unauthorized | CloseClass::Other => LifecycleAction::Reconnect {
                delay: self.config.retry_delay(),
                class,
            },
        }
    }

    fn on_conflict(&mut self, now: Instant) -> LifecycleAction {
        let state = &mut self.state;
        if state.reconnect_attempts >= self.config.max_attempts {
            error!(
                "giving up after {} conflict reconnects",
                state.reconnect_attempts
            );
            state.terminal = Some(Terminal::GaveUp);
            return LifecycleAction::GiveUp;
        }

        state.reconnect_attempts += 1;
        state.conflict_count += 1;
        state.last_reconnect_at = Some(now);
        let delay = conflict_delay(&self.config, state.conflict_count);
        warn!(
            "session conflict #{}, reconnecting in {}s (attempt {}/{})",
            state.conflict_count,
            delay.as_secs(),
            state.reconnect_attempts,
            self.config.max_attempts
        );
        LifecycleAction::Reconnect {
            delay,
            class: CloseClass::Conflict,
        }
    }

    /// Reset the conflict count once the connection has stayed open long enough.
    pub fn mark_stable(&mut self, now: Instant) {
        let Some(opened_at) = self.state.opened_at else {
            return;
        };
        if self.state.status == LinkStatus::Open
            && now.saturating_duration_since(opened_at) >= self.config.conflict_reset()
            && self.state.conflict_count > 0
        {
            info!("connection stable, clearing conflict count");
            self.state.conflict_count = 0;
        }
    }
}

/// `base * 2^(n-1)`, capped.
fn conflict_delay(config: &ReconnectConfig, conflict_count: u32) -> Duration {
    let factor = 2u32.saturating_pow(conflict_count.saturating_sub(1));
    config
        .conflict_base()
        .saturating_mul(factor)
        .min(config.conflict_cap())
}

fn terminal_action(terminal: Terminal) -> LifecycleAction {
    match terminal {
        Terminal::GaveUp => LifecycleAction::GiveUp,
        Terminal::LoggedOut => LifecycleAction::LoggedOut,
    }
}
