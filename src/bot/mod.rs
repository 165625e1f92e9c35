//! Bot orchestrator: owns the session, pumps transport events into the
//! lifecycle manager and the router, and performs reconnect decisions.

mod qr;


pub use qr::{QrDisplay, TerminalQr};

use crate::lifecycle::{LifecycleAction, LifecycleManager};
use crate::router::Router;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use wabot_core::{
    config::ReconnectConfig,
    message::{ConnectionStatus, ConnectionUpdate, TransportEvent},
    traits::{Connection, Connector, Transport},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotStatus {
    pub running: bool,
    pub connected: bool,
}

struct Session {
    transport: Arc<dyn Transport>,
    pump: JoinHandle<()>,
}

impl Session {
    async fn shutdown(self) {
        self.pump.abort();
        close_transport(self.transport.as_ref()).await;
    }
}

async fn close_transport(transport: &dyn Transport) {
    if let Err(e) = transport.close().await {
        warn!("failed to close {}: {e}", transport.name());
    }
}

pub struct Bot {
    connector: Arc<dyn Connector>,
    router: Arc<Router>,
    qr: Arc<dyn QrDisplay>,
    config: ReconnectConfig,
    lifecycle: std::sync::Mutex<LifecycleManager>,
    session: Mutex<Option<Session>>,
    stability: std::sync::Mutex<Option<JoinHandle<()>>>,
    running: AtomicBool,
    /// Set by `stop()`; pending retry timers check it before starting again.
    halted: AtomicBool,
    /// Bumped on every successful connect; reconnect timers from an older
    /// session are ignored.
    epoch: AtomicU64,
    terminated: Notify,
}

impl Bot {
    pub fn new(
        connector: Arc<dyn Connector>,
        router: Arc<Router>,
        qr: Arc<dyn QrDisplay>,
        config: ReconnectConfig,
    ) -> Self {
        Self {
            connector,
            router,
            qr,
            lifecycle: std::sync::Mutex::new(LifecycleManager::new(config.clone())),
            config,
            session: Mutex::new(None),
            stability: std::sync::Mutex::new(None),
            running: AtomicBool::new(false),
            halted: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            terminated: Notify::new(),
        }
    }

    pub fn status(&self) -> BotStatus {
        let running = self.running.load(Ordering::SeqCst);
        let connected = running && self.with_lifecycle(|lm| lm.currently_connected());
        BotStatus { running, connected }
    }

    /// Resolves once the session reached a terminal state (gave up or
    /// logged out).
    pub async fn wait_terminal(&self) {
        self.terminated.notified().await;
    }

    fn with_lifecycle<T>(&self, f: impl FnOnce(&mut LifecycleManager) -> T) -> T {
        let mut guard = self
            .lifecycle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// Connect and start pumping events. No-op if already running.
    pub async fn start(self: &Arc<Self>) {
        self.halted.store(false, Ordering::SeqCst);
        Arc::clone(self).start_session().await;
    }

    /// Boxed because retry and reconnect timers spawned further down call
    /// back into it.
    fn start_session(self: Arc<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            if self.running.swap(true, Ordering::SeqCst) {
                warn!("bot already running");
                return;
            }

            info!("connecting via {}", self.connector.name());
            match self.connector.connect().await {
                Ok(Connection { transport, events }) => {
                    // Checked under the session lock: `stop()` flips the flags
                    // before taking it in `teardown()`.
                    let mut slot = self.session.lock().await;
                    if self.halted.load(Ordering::SeqCst) || !self.running.load(Ordering::SeqCst)
                    {
                        drop(slot);
                        info!("bot stopped while connecting, closing new session");
                        close_transport(transport.as_ref()).await;
                        return;
                    }

                    let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
                    let pump =
                        tokio::spawn(Arc::clone(&self).pump(epoch, transport.clone(), events));
                    if let Some(previous) = slot.replace(Session { transport, pump }) {
                        warn!("replacing a live session");
                        previous.shutdown().await;
                    }
                    info!("{} session started", self.connector.name());
                }
                Err(e) => {
                    self.running.store(false, Ordering::SeqCst);
                    error!("failed to start {}: {e}", self.connector.name());
                    self.schedule_start(self.config.start_retry());
                }
            }
        })
    }

    /// Start again after `delay` unless stopped in the meantime.
    fn schedule_start(self: &Arc<Self>, delay: Duration) {
        let bot = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if bot.halted.load(Ordering::SeqCst) {
                debug!("bot stopped, skipping scheduled start");
                return;
            }
            bot.start_session().await;
        });
    }

    /// Tear down the session and start a fresh one.
    pub async fn restart(self: &Arc<Self>) {
        info!("restarting bot");
        self.running.store(false, Ordering::SeqCst);
        self.teardown().await;
        self.schedule_start(self.config.restart_delay());
    }

    pub async fn stop(&self) {
        info!("stopping bot");
        self.halted.store(true, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        self.router.cancel_all().await;
        self.teardown().await;
    }

    async fn teardown(&self) {
        if let Some(timer) = self
            .stability
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
        {
            timer.abort();
        }
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            session.shutdown().await;
        }
    }

    async fn pump(
        self: Arc<Self>,
        epoch: u64,
        transport: Arc<dyn Transport>,
        mut events: mpsc::Receiver<TransportEvent>,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::Connection(update) => self.on_connection(epoch, &update),
                TransportEvent::Message(raw) => self.router.route(transport.clone(), *raw).await,
                TransportEvent::CredentialsChanged => {
                    if let Err(e) = transport.save_credentials().await {
                        error!("failed to save credentials: {e}");
                    }
                }
            }
        }
        debug!("event stream for session {epoch} ended");
    }

    fn on_connection(self: &Arc<Self>, epoch: u64, update: &ConnectionUpdate) {
        if let Some(ref code) = update.qr {
            self.qr.show(code);
        }

        let action = self.with_lifecycle(|lm| lm.handle_update(update, Instant::now()));
        if update.status == Some(ConnectionStatus::Open) {
            self.arm_stability_timer();
        }

        match action {
            LifecycleAction::None => {}
            LifecycleAction::Reconnect { delay, class } => {
                info!("reconnecting in {}s ({class:?})", delay.as_secs());
                let bot = Arc::clone(self);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if bot.epoch.load(Ordering::SeqCst) != epoch {
                        debug!("session {epoch} already replaced, skipping reconnect");
                        return;
                    }
                    if bot.halted.load(Ordering::SeqCst) {
                        return;
                    }
                    bot.restart().await;
                });
            }
            LifecycleAction::GiveUp | LifecycleAction::LoggedOut => {
                error!("connection is terminal ({action:?}), stopping");
                let bot = Arc::clone(self);
                tokio::spawn(async move {
                    bot.stop().await;
                    bot.terminated.notify_one();
                });
            }
        }
    }

    fn arm_stability_timer(self: &Arc<Self>) {
        let bot = Arc::clone(self);
        let window = self.config.conflict_reset();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            bot.with_lifecycle(|lm| lm.mark_stable(Instant::now()));
        });
        let previous = self
            .stability
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(timer);
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}
