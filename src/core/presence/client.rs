//! Long-lived socket subscription to the presence relay.
//!
//! [`PresenceClient::run`] owns the connection and reconnects with
//! exponential backoff after abnormal closes. [`PresenceHandle`] is the
//! cloneable control side: it reconciles the cached snapshot against the
//! relay's HTTP view and forces a reconnect when the two have drifted.

use crate::config::toml_config::PresenceConfig;
use crate::core::presence::protocol::{self, ServerMessage};
use crate::core::presence::service::PresenceApi;
use crate::core::presence::store::PresenceStore;
use crate::utils::error::{FolioError, Result};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug)]
enum Command {
    Reconnect,
    Shutdown,
}

#[derive(Debug)]
enum SessionEnd {
    Closed { abnormal: bool, reason: String },
    Reconnect,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    InSync,
    Resynced,
}

/// Delay before reconnect attempt `attempt` (1-based): `base * 2^(attempt-1)`, capped at `max`.
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exponent).min(max)
}

pub struct PresenceClient {
    socket_url: String,
    discord_id: String,
    cdn_base: String,
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
    store: PresenceStore,
    commands: mpsc::Receiver<Command>,
    delivered: bool,
}

#[derive(Debug, Clone)]
pub struct PresenceHandle {
    commands: mpsc::Sender<Command>,
    store: PresenceStore,
    api: PresenceApi,
    visible: Arc<AtomicBool>,
}

/// Builds a client/handle pair sharing `store`.
pub fn presence_channel(
    config: &PresenceConfig,
    api: PresenceApi,
    store: PresenceStore,
) -> (PresenceClient, PresenceHandle) {
    let (tx, rx) = mpsc::channel(8);

    let client = PresenceClient {
        socket_url: config.socket_url.clone(),
        discord_id: api.discord_id().to_string(),
        cdn_base: config.cdn_base.clone(),
        max_attempts: config.max_attempts,
        backoff_base: config.backoff_base(),
        backoff_max: config.backoff_max(),
        store: store.clone(),
        commands: rx,
        delivered: false,
    };
    let handle = PresenceHandle {
        commands: tx,
        store,
        api,
        visible: Arc::new(AtomicBool::new(true)),
    };
    (client, handle)
}

impl PresenceClient {
    /// Runs until shutdown, a normal close, or the retry budget is spent.
    pub async fn run(mut self) -> Result<()> {
        let mut attempts: u32 = 0;

        loop {
            self.delivered = false;
            let outcome = self.session().await;
            self.store.set_live(false);
            if self.delivered {
                attempts = 0;
            }

            match outcome {
                Ok(SessionEnd::Shutdown) => {
                    tracing::info!("Presence client shutting down");
                    return Ok(());
                }
                Ok(SessionEnd::Reconnect) => {
                    tracing::info!("Reconnecting to presence relay on request");
                    attempts = 0;
                    continue;
                }
                Ok(SessionEnd::Closed {
                    abnormal: false,
                    reason,
                }) => {
                    tracing::info!("Presence relay closed the connection normally ({})", reason);
                    return Ok(());
                }
                Ok(SessionEnd::Closed {
                    abnormal: true,
                    reason,
                }) => {
                    tracing::warn!("Presence socket closed abnormally: {}", reason);
                }
                Err(e) => {
                    tracing::warn!("Presence socket failed: {}", e);
                }
            }

            attempts += 1;
            if attempts > self.max_attempts {
                tracing::error!(
                    "Giving up on presence relay after {} reconnect attempts",
                    self.max_attempts
                );
                return Err(FolioError::PresenceUnavailable {
                    attempts: self.max_attempts,
                });
            }

            let delay = backoff_delay(attempts, self.backoff_base, self.backoff_max);
            tracing::info!(
                "Reconnecting to presence relay in {:?} (attempt {}/{})",
                delay,
                attempts,
                self.max_attempts
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Reconnect) => attempts = 0,
                    Some(Command::Shutdown) | None => {
                        tracing::info!("Presence client shutting down");
                        return Ok(());
                    }
                },
            }
        }
    }

    async fn session(&mut self) -> Result<SessionEnd> {
        tracing::debug!("Connecting to presence relay at {}", self.socket_url);
        let (socket, _response) = tokio_tungstenite::connect_async(self.socket_url.as_str()).await?;
        tracing::info!("Connected to presence relay");

        let (mut sink, mut stream) = socket.split();
        sink.send(Message::text(protocol::subscribe_message(&self.discord_id)))
            .await?;

        let mut heartbeat: Option<Interval> = None;

        loop {
            tokio::select! {
                cmd = self.commands.recv() => {
                    let end = match cmd {
                        Some(Command::Reconnect) => SessionEnd::Reconnect,
                        Some(Command::Shutdown) | None => SessionEnd::Shutdown,
                    };
                    let _ = sink.send(Message::Close(None)).await;
                    return Ok(end);
                }
                _ = next_heartbeat(&mut heartbeat) => {
                    tracing::trace!("Sending periodic heartbeat");
                    sink.send(Message::text(protocol::heartbeat_message())).await?;
                }
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        match protocol::decode(text.as_str()) {
                            Ok(ServerMessage::Hello { heartbeat_interval }) => {
                                sink.send(Message::text(protocol::heartbeat_message())).await?;
                                if let Some(period) = heartbeat_interval {
                                    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                                    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                                    heartbeat = Some(interval);
                                }
                            }
                            Ok(ServerMessage::Presence(mut snapshot)) => {
                                protocol::normalize_activity_assets(&mut snapshot, &self.cdn_base);
                                self.delivered = true;
                                if self.store.update(*snapshot) {
                                    tracing::debug!("Presence changed");
                                }
                                self.store.set_live(true);
                            }
                            Ok(ServerMessage::Other { op, event }) => {
                                tracing::debug!("Ignoring relay frame op={} t={:?}", op, event);
                            }
                            Err(e) => {
                                tracing::warn!("Undecodable relay frame: {}", e);
                            }
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (abnormal, reason) = match frame {
                            Some(f) => (
                                f.code != CloseCode::Normal,
                                format!("code {} {}", u16::from(f.code), &*f.reason),
                            ),
                            None => (true, "close without status".to_string()),
                        };
                        return Ok(SessionEnd::Closed { abnormal, reason });
                    }
                    // pings are answered by tungstenite itself
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        return Ok(SessionEnd::Closed {
                            abnormal: true,
                            reason: "stream ended".to_string(),
                        })
                    }
                },
            }
        }
    }
}

async fn next_heartbeat(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

impl PresenceHandle {
    pub fn store(&self) -> &PresenceStore {
        &self.store
    }

    /// Compares the cached snapshot with a fresh HTTP one and forces a
    /// reconnect when they diverge.
    pub async fn reconcile(&self) -> Result<ReconcileOutcome> {
        let fresh = self.api.fetch_snapshot().await?;
        if !self.store.differs_from(&fresh) {
            tracing::debug!("Presence cache matches relay snapshot");
            return Ok(ReconcileOutcome::InSync);
        }

        tracing::info!("Presence cache drifted from relay snapshot, forcing reconnect");
        self.store.update(fresh);
        if self.commands.send(Command::Reconnect).await.is_err() {
            tracing::debug!("Presence client is not running; cache updated only");
        }
        Ok(ReconcileOutcome::Resynced)
    }

    /// Reconciles on a hidden -> visible transition; other transitions are no-ops.
    pub async fn set_visibility(&self, visibility: Visibility) -> Result<Option<ReconcileOutcome>> {
        let now_visible = visibility == Visibility::Visible;
        let was_visible = self.visible.swap(now_visible, Ordering::SeqCst);
        if now_visible && !was_visible {
            return self.reconcile().await.map(Some);
        }
        Ok(None)
    }

    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }

    pub fn spawn_periodic_reconcile(&self, every: Duration) -> JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + every, every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Err(e) = handle.reconcile().await {
                    tracing::warn!("Presence reconciliation failed: {}", e);
                }
            }
        })
    }
}
