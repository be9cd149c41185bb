#![allow(clippy::redundant_pub_crate)]

//! Background worker that owns a [`Session`] and publishes its alerts.
//!
//! The worker wakes on commands, on the session's alert signal and on a slow
//! fallback poll. After every wake-up it drains the session and publishes the
//! records onto the [`AlertBus`]. A fatal drain failure stops the worker; later
//! calls fail with `SessionError::WorkerClosed`.

use std::time::Duration;

use async_trait::async_trait;
use peerlink_core::{
    AddTorrentParams, InfoHash, RemoveFlags, SessionControl, SessionError, SessionResult,
    TorrentHandle,
};
use peerlink_events::{AlertBus, AlertStream};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::command::{Responder, SessionCommand};
use crate::engine::SessionEngine;
use crate::notify::AlertSignal;
use crate::session::{Session, SessionId};

const COMMAND_BUFFER: usize = 128;
/// Fallback drain interval used when no wake-up arrives.
pub const ALERT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Async handle to a session running on its own worker task.
#[derive(Debug)]
pub struct SessionService {
    id: SessionId,
    commands: mpsc::Sender<SessionCommand>,
    bus: AlertBus,
    worker: JoinHandle<()>,
}

impl SessionService {
    /// Move `session` onto a worker task publishing to `bus`.
    ///
    /// # Errors
    ///
    /// Returns an error when the session's alert notify cannot be armed.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn spawn<E>(mut session: Session<E>, bus: AlertBus) -> SessionResult<Self>
    where
        E: SessionEngine + 'static,
    {
        let signal = session.set_alert_notify()?;
        let id = session.id();
        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        let worker = Worker {
            label: id.to_string(),
            session,
            bus: bus.clone(),
        };
        let worker = tokio::spawn(worker.run(receiver, signal));
        info!(session_id = %id, "session worker started");
        Ok(Self {
            id,
            commands,
            bus,
            worker,
        })
    }

    /// Identifier of the owned session.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Bus the worker publishes to.
    #[must_use]
    pub const fn bus(&self) -> &AlertBus {
        &self.bus
    }

    /// Subscribe to published alert records, replaying those after `since_id`.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<u64>) -> AlertStream {
        self.bus.subscribe(since_id)
    }

    /// Whether the worker task has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed() || self.worker.is_finished()
    }

    /// Stop the worker after a final drain and wait for it to exit.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WorkerClosed` when the worker had already stopped
    /// or when the worker task panicked.
    pub async fn shutdown(self) -> SessionResult<()> {
        let delivered = self.commands.send(SessionCommand::Shutdown).await.is_ok();
        self.worker.await.map_err(|err| {
            warn!(session_id = %self.id, error = %err, "session worker did not exit cleanly");
            SessionError::WorkerClosed {
                operation: "shutdown",
            }
        })?;
        if delivered {
            Ok(())
        } else {
            debug!(session_id = %self.id, "session worker stopped before shutdown");
            Err(SessionError::WorkerClosed {
                operation: "shutdown",
            })
        }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Responder<T>) -> SessionCommand,
    ) -> SessionResult<T> {
        let (respond_to, response) = oneshot::channel();
        let command = build(respond_to);
        let operation = command.operation();
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::WorkerClosed { operation })?;
        response
            .await
            .map_err(|_| SessionError::WorkerClosed { operation })?
    }
}

#[async_trait]
impl SessionControl for SessionService {
    async fn apply_settings(&self, partial: Value) -> SessionResult<()> {
        self.request(|respond_to| SessionCommand::ApplySettings {
            overrides: partial,
            respond_to,
        })
        .await
    }

    async fn add_torrent(&self, params: AddTorrentParams) -> SessionResult<TorrentHandle> {
        self.request(|respond_to| SessionCommand::AddTorrent {
            params: Box::new(params),
            respond_to,
        })
        .await
    }

    async fn remove_torrent(&self, handle: TorrentHandle, flags: RemoveFlags) -> SessionResult<()> {
        self.request(|respond_to| SessionCommand::RemoveTorrent {
            handle,
            flags,
            respond_to,
        })
        .await
    }

    async fn find_torrent(&self, info_hash: InfoHash) -> SessionResult<TorrentHandle> {
        self.request(|respond_to| SessionCommand::FindTorrent {
            info_hash,
            respond_to,
        })
        .await
    }

    async fn listen_port(&self) -> SessionResult<u16> {
        self.request(|respond_to| SessionCommand::ListenPort { respond_to })
            .await
    }

    async fn pause(&self) -> SessionResult<()> {
        self.request(|respond_to| SessionCommand::Pause { respond_to })
            .await
    }

    async fn resume(&self) -> SessionResult<()> {
        self.request(|respond_to| SessionCommand::Resume { respond_to })
            .await
    }

    async fn is_paused(&self) -> SessionResult<bool> {
        self.request(|respond_to| SessionCommand::IsPaused { respond_to })
            .await
    }

    async fn post_torrent_updates(&self) -> SessionResult<()> {
        self.request(|respond_to| SessionCommand::PostTorrentUpdates { respond_to })
            .await
    }

    async fn dht_announce(&self, info_hash: InfoHash, port: u16) -> SessionResult<()> {
        self.request(|respond_to| SessionCommand::DhtAnnounce {
            info_hash,
            port,
            respond_to,
        })
        .await
    }

    async fn dht_get_peers(&self, info_hash: InfoHash) -> SessionResult<()> {
        self.request(|respond_to| SessionCommand::DhtGetPeers {
            info_hash,
            respond_to,
        })
        .await
    }
}

struct Worker<E: SessionEngine> {
    label: String,
    session: Session<E>,
    bus: AlertBus,
}

impl<E: SessionEngine> Worker<E> {
    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>, mut signal: AlertSignal) {
        let mut poll = tokio::time::interval(ALERT_POLL_INTERVAL);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut signal_open = true;
        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(SessionCommand::Shutdown) | None => break,
                        Some(command) => self.handle(command),
                    }
                }
                woke = signal.wait(), if signal_open => {
                    if !woke {
                        debug!(session_id = %self.label, "alert signal closed; relying on poll");
                        signal_open = false;
                    }
                }
                _ = poll.tick() => {}
            }
            match self.flush() {
                Err(err) if err.is_fatal() => {
                    warn!(session_id = %self.label, error = %err, reason = ?err, "session alert drain failed; stopping worker");
                    return;
                }
                Err(err) => {
                    warn!(session_id = %self.label, error = %err, reason = ?err, "session alert drain failed; retrying on next wake-up");
                }
                Ok(()) => {}
            }
        }
        if let Err(err) = self.flush() {
            warn!(session_id = %self.label, error = %err, "session alert drain failed during shutdown");
        }
        info!(session_id = %self.label, "session worker stopped");
    }

    fn flush(&mut self) -> SessionResult<()> {
        let records = self.session.pop_alerts()?;
        if records.is_empty() {
            return Ok(());
        }
        debug!(session_id = %self.label, records = records.len(), "publishing alert records");
        for record in records {
            let _ = self.bus.publish(&self.label, record);
        }
        Ok(())
    }

    fn handle(&mut self, command: SessionCommand) {
        let operation = command.operation();
        debug!(session_id = %self.label, operation, "handling session command");
        let session = &mut self.session;
        match command {
            SessionCommand::ApplySettings {
                overrides,
                respond_to,
            } => reply(respond_to, session.apply_settings(&overrides)),
            SessionCommand::AddTorrent { params, respond_to } => {
                reply(respond_to, session.add_torrent(&params));
            }
            SessionCommand::RemoveTorrent {
                handle,
                flags,
                respond_to,
            } => reply(respond_to, session.remove_torrent(&handle, flags)),
            SessionCommand::FindTorrent {
                info_hash,
                respond_to,
            } => reply(respond_to, session.find_torrent(&info_hash)),
            SessionCommand::ListenPort { respond_to } => reply(respond_to, session.listen_port()),
            SessionCommand::Pause { respond_to } => reply(respond_to, session.pause()),
            SessionCommand::Resume { respond_to } => reply(respond_to, session.resume()),
            SessionCommand::IsPaused { respond_to } => reply(respond_to, session.is_paused()),
            SessionCommand::PostTorrentUpdates { respond_to } => {
                reply(respond_to, session.post_torrent_updates());
            }
            SessionCommand::DhtAnnounce {
                info_hash,
                port,
                respond_to,
            } => reply(respond_to, session.dht_announce(&info_hash, port)),
            SessionCommand::DhtGetPeers {
                info_hash,
                respond_to,
            } => reply(respond_to, session.dht_get_peers(&info_hash)),
            SessionCommand::Shutdown => {}
        }
    }
}

fn reply<T>(respond_to: Responder<T>, result: SessionResult<T>) {
    if respond_to.send(result).is_err() {
        debug!("session command caller went away before the reply");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemoryEngine;
    use peerlink_events::AlertRecord;
    use tokio::time::timeout;

    const HASH: &str = "0123456789abcdef0123456789abcdef01234567";

    async fn next_kind(stream: &mut AlertStream) -> Option<&'static str> {
        timeout(Duration::from_secs(2), stream.next())
            .await
            .ok()
            .flatten()
            .map(|envelope| envelope.alert.kind())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn commands_round_trip_and_alerts_are_published() -> anyhow::Result<()> {
        let bus = AlertBus::new();
        let mut stream = bus.subscribe(None);
        let service = SessionService::spawn(Session::<MemoryEngine>::create(None)?, bus)?;

        assert_eq!(next_kind(&mut stream).await, Some("listen_succeeded"));
        assert_eq!(service.listen_port().await?, 7881);

        let params = AddTorrentParams::magnet(format!("magnet:?xt=urn:btih:{HASH}"), "/tmp/x");
        let handle = service.add_torrent(params).await?;
        assert!(handle.is_valid());
        assert_eq!(next_kind(&mut stream).await, Some("torrent_added"));
        assert_eq!(next_kind(&mut stream).await, Some("state_changed"));

        service.pause().await?;
        assert!(service.is_paused().await?);
        assert_eq!(next_kind(&mut stream).await, Some("torrent_paused"));

        service.shutdown().await?;
        Ok(())
    }

    #[tokio::test]
    async fn records_carry_the_session_label() -> anyhow::Result<()> {
        let bus = AlertBus::new();
        let service = SessionService::spawn(Session::<MemoryEngine>::create(None)?, bus)?;
        let mut stream = service.subscribe(Some(0));
        let envelope = timeout(Duration::from_secs(2), stream.next())
            .await?
            .expect("listen alert published");
        assert_eq!(envelope.session, service.id().to_string());
        assert!(matches!(envelope.alert, AlertRecord::ListenSucceeded { .. }));
        service.shutdown().await?;
        Ok(())
    }

    #[tokio::test]
    async fn dead_engine_closes_the_worker() -> anyhow::Result<()> {
        let session = Session::<MemoryEngine>::create(None)?;
        let engine = session.engine().handle();
        let service = SessionService::spawn(session, AlertBus::new())?;

        engine.shutdown();
        let closed = timeout(Duration::from_secs(3), async {
            loop {
                if service.is_closed() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;
        assert!(closed.is_ok(), "worker should stop after engine loss");
        assert_eq!(
            service.listen_port().await,
            Err(SessionError::WorkerClosed {
                operation: "listen_port"
            })
        );
        assert_eq!(
            service.shutdown().await,
            Err(SessionError::WorkerClosed {
                operation: "shutdown"
            })
        );
        Ok(())
    }
}
