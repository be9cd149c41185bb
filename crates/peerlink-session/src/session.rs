//! Session handle owning one engine session and its alert plumbing.

use std::fmt;
use std::sync::Arc;

use peerlink_core::{AddTorrentParams, InfoHash, RemoveFlags, SessionResult, TorrentHandle};
use peerlink_events::AlertRecord;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::encoder::AlertEncoder;
use crate::engine::SessionEngine;
use crate::notify::{AlertSignal, NotificationBridge};
use crate::pipeline::AlertPipeline;
use crate::settings::SettingsPack;

/// Identifier attached to every log line a session emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// The engine session has not been started yet.
    #[default]
    Uninitialized,
    /// The engine is active.
    Running,
    /// All engine activity is suspended.
    Paused,
}

/// Engine plugin paired with the encoder for the alerts it introduces.
pub struct Extension<P> {
    /// Plugin handed over to the engine.
    pub plugin: P,
    /// Encoder appended to the session's registry.
    pub encoder: Arc<dyn AlertEncoder>,
}

impl<P> Extension<P> {
    /// Pair `plugin` with `encoder`.
    pub fn new(plugin: P, encoder: Arc<dyn AlertEncoder>) -> Self {
        Self { plugin, encoder }
    }
}

impl<P> fmt::Debug for Extension<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extension")
            .field("encoder", &self.encoder.name())
            .finish_non_exhaustive()
    }
}

/// Owns exactly one engine session for its whole lifetime.
pub struct Session<E: SessionEngine> {
    id: SessionId,
    state: SessionState,
    engine: E,
    pipeline: AlertPipeline,
    bridge: NotificationBridge,
}

impl<E: SessionEngine> Session<E> {
    /// Start an engine session from the baseline settings merged with `overrides`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Validation` when `overrides` is malformed, or the
    /// engine error when the engine session cannot be started.
    pub fn create(overrides: Option<&Value>) -> SessionResult<Self> {
        let mut settings = SettingsPack::session_defaults();
        if let Some(overrides) = overrides {
            settings.merge(overrides)?;
        }
        let engine = E::start(&settings)?;
        let id = SessionId::new();
        info!(
            session_id = %id,
            settings = settings.len(),
            from = ?SessionState::Uninitialized,
            to = ?SessionState::Running,
            "session created"
        );
        Ok(Self {
            id,
            state: SessionState::Running,
            engine,
            pipeline: AlertPipeline::new(),
            bridge: NotificationBridge::new(),
        })
    }

    /// Push the recognised keys of `overrides` to the engine; other engine settings are untouched.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Validation` when `overrides` is malformed; nothing
    /// reaches the engine in that case.
    pub fn apply_settings(&mut self, overrides: &Value) -> SessionResult<()> {
        let mut pack = SettingsPack::new();
        pack.merge(overrides)?;
        self.engine.apply_settings(&pack)?;
        info!(session_id = %self.id, entries = pack.len(), "settings applied");
        Ok(())
    }

    /// Admit a transfer.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine rejects the parameters.
    pub fn add_torrent(&mut self, params: &AddTorrentParams) -> SessionResult<TorrentHandle> {
        let handle = self.engine.add_torrent(params)?;
        debug!(session_id = %self.id, info_hash = ?handle.info_hash(), "torrent add requested");
        Ok(handle)
    }

    /// Remove a transfer.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle does not name a transfer in the session.
    pub fn remove_torrent(
        &mut self,
        handle: &TorrentHandle,
        flags: RemoveFlags,
    ) -> SessionResult<()> {
        self.engine.remove_torrent(handle, flags)?;
        debug!(session_id = %self.id, info_hash = ?handle.info_hash(), "torrent remove requested");
        Ok(())
    }

    /// Look up a transfer; an unknown hash yields an invalid handle.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine session is gone.
    pub fn find_torrent(&self, info_hash: &InfoHash) -> SessionResult<TorrentHandle> {
        Ok(self.engine.find_torrent(info_hash)?)
    }

    /// Port the engine listens on.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine session is gone.
    pub fn listen_port(&self) -> SessionResult<u16> {
        Ok(self.engine.listen_port()?)
    }

    /// Suspend all engine activity.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine session is gone.
    pub fn pause(&mut self) -> SessionResult<()> {
        self.engine.pause()?;
        self.transition(SessionState::Paused);
        Ok(())
    }

    /// Resume engine activity.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine session is gone.
    pub fn resume(&mut self) -> SessionResult<()> {
        self.engine.resume()?;
        self.transition(SessionState::Running);
        Ok(())
    }

    /// Whether the engine reports itself paused.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine session is gone.
    pub fn is_paused(&self) -> SessionResult<bool> {
        Ok(self.engine.is_paused()?)
    }

    /// Ask the engine for a state-update alert.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine session is gone.
    pub fn post_torrent_updates(&mut self) -> SessionResult<()> {
        Ok(self.engine.post_torrent_updates()?)
    }

    /// Drain pending engine alerts into records, in emission order.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EngineUnavailable` when the engine session is gone.
    pub fn pop_alerts(&mut self) -> SessionResult<Vec<AlertRecord>> {
        self.pipeline.drain(&mut self.engine)
    }

    /// Arm the wake-up slot, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine refuses the callback.
    pub fn set_alert_notify(&mut self) -> SessionResult<AlertSignal> {
        let signal = self.bridge.arm(&mut self.engine)?;
        debug!(session_id = %self.id, "alert notify armed");
        Ok(signal)
    }

    /// Install an extension: the plugin goes to the engine, then its encoder joins the registry.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine refuses the plugin; the encoder is not
    /// registered in that case.
    pub fn register_extension(&mut self, extension: Extension<E::Plugin>) -> SessionResult<()> {
        let Extension { plugin, encoder } = extension;
        self.engine.add_extension(plugin)?;
        info!(session_id = %self.id, encoder = encoder.name(), "extension registered");
        self.pipeline.register(encoder);
        Ok(())
    }

    /// Announce `info_hash` on the DHT.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine session is gone.
    pub fn dht_announce(&mut self, info_hash: &InfoHash, port: u16) -> SessionResult<()> {
        Ok(self.engine.dht_announce(info_hash, port)?)
    }

    /// Start a DHT peer lookup; peers arrive as a `dht_get_peers_reply` record.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine session is gone.
    pub fn dht_get_peers(&mut self, info_hash: &InfoHash) -> SessionResult<()> {
        Ok(self.engine.dht_get_peers(info_hash)?)
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Encoders consulted when draining, built-in last.
    #[must_use]
    pub fn encoder_names(&self) -> Vec<String> {
        self.pipeline.registry().names()
    }

    /// Underlying engine.
    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// Underlying engine, mutably.
    pub const fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            info!(session_id = %self.id, from = ?self.state, to = ?next, "session state changed");
            self.state = next;
        }
    }
}

impl<E: SessionEngine> fmt::Debug for Session<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("pipeline", &self.pipeline)
            .field("bridge", &self.bridge)
            .finish_non_exhaustive()
    }
}

impl From<SessionId> for Uuid {
    fn from(id: SessionId) -> Self {
        id.0
    }
}
