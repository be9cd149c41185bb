//! Boundary between the session layer and the peer-to-peer engine.
//!
//! The engine hands alerts over as opaque trait objects; only encoders look
//! inside them, by downcasting to the concrete alert types they understand.

pub mod alerts;
mod memory;
#[cfg(feature = "libtorrent")]
mod native;

use std::any::Any;
use std::fmt::Debug;

use peerlink_core::{AddTorrentParams, AlertCategory, InfoHash, RemoveFlags, TorrentHandle};

use crate::error::EngineError;
use crate::notify::AlertNotify;
use crate::settings::SettingsPack;

pub use memory::{MemoryEngine, MemoryEngineHandle, MemoryPlugin};
#[cfg(feature = "libtorrent")]
pub use native::{NativeEngine, NativePlugin};

/// One alert posted by the engine.
pub trait EngineAlert: Any + Send + Debug {
    /// Engine name of the alert type (`torrent_finished`, `peer_connect`, ...).
    fn what(&self) -> &str;

    /// Categories the alert belongs to; the engine's `alert_mask` filters on these.
    fn category(&self) -> AlertCategory;

    /// Human readable description.
    fn message(&self) -> String;
}

impl dyn EngineAlert {
    /// Concrete alert, if `self` is a `T`.
    #[must_use]
    pub fn downcast_ref<T: EngineAlert>(&self) -> Option<&T> {
        let any: &dyn Any = self;
        any.downcast_ref::<T>()
    }

    /// Whether `self` is a `T`.
    #[must_use]
    pub fn is<T: EngineAlert>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }
}

/// Alerts popped from the engine in one call, in posting order.
pub type AlertBatch = Vec<Box<dyn EngineAlert>>;

/// Operations the session layer needs from an engine.
///
/// Every call fails with `EngineError::SessionUnavailable` once the engine
/// session is gone.
pub trait SessionEngine: Send + Sized {
    /// Engine-level extension accepted by `add_extension`.
    type Plugin: Send;

    /// Create an engine session configured with `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine cannot be started.
    fn start(settings: &SettingsPack) -> Result<Self, EngineError>;

    /// Apply the entries in `settings`; keys absent from the pack are untouched.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine rejects the update.
    fn apply_settings(&mut self, settings: &SettingsPack) -> Result<(), EngineError>;

    /// Take every pending alert, clearing the queue.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine session is gone.
    fn pop_alerts(&mut self) -> Result<AlertBatch, EngineError>;

    /// Install the wake-up callback, replacing any previous one.
    ///
    /// The engine invokes it from its own thread whenever the alert queue goes
    /// from empty to non-empty, and immediately when alerts are already pending.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine session is gone.
    fn set_alert_notify(&mut self, notify: AlertNotify) -> Result<(), EngineError>;

    /// Admit a transfer.
    ///
    /// # Errors
    ///
    /// Returns an error when the parameters are rejected.
    fn add_torrent(&mut self, params: &AddTorrentParams) -> Result<TorrentHandle, EngineError>;

    /// Remove a transfer.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle does not refer to a transfer in the session.
    fn remove_torrent(
        &mut self,
        handle: &TorrentHandle,
        flags: RemoveFlags,
    ) -> Result<(), EngineError>;

    /// Look up a transfer; unknown hashes yield an invalid handle.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine session is gone.
    fn find_torrent(&self, info_hash: &InfoHash) -> Result<TorrentHandle, EngineError>;

    /// Port the engine is listening on.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine session is gone.
    fn listen_port(&self) -> Result<u16, EngineError>;

    /// Whether the whole session is paused.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine session is gone.
    fn is_paused(&self) -> Result<bool, EngineError>;

    /// Suspend all engine activity.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine session is gone.
    fn pause(&mut self) -> Result<(), EngineError>;

    /// Resume engine activity.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine session is gone.
    fn resume(&mut self) -> Result<(), EngineError>;

    /// Post a state-update alert covering transfers whose status changed.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine session is gone.
    fn post_torrent_updates(&mut self) -> Result<(), EngineError>;

    /// Hand an extension to the engine; ownership moves to the engine.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine refuses the extension.
    fn add_extension(&mut self, plugin: Self::Plugin) -> Result<(), EngineError>;

    /// Announce `info_hash` on the DHT with the given port.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine session is gone.
    fn dht_announce(&mut self, info_hash: &InfoHash, port: u16) -> Result<(), EngineError>;

    /// Look up peers for `info_hash` on the DHT; results arrive as an alert.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine session is gone.
    fn dht_get_peers(&mut self, info_hash: &InfoHash) -> Result<(), EngineError>;
}

#[cfg(test)]
mod tests {
    use super::alerts::{TorrentFinishedAlert, UnknownAlert};
    use super::*;

    #[test]
    fn downcast_recovers_the_concrete_alert() {
        let info_hash = InfoHash::new([3; 20]);
        let alert: Box<dyn EngineAlert> = Box::new(TorrentFinishedAlert { info_hash });

        assert!(alert.is::<TorrentFinishedAlert>());
        assert!(!alert.is::<UnknownAlert>());
        assert_eq!(
            alert
                .downcast_ref::<TorrentFinishedAlert>()
                .map(|finished| finished.info_hash),
            Some(info_hash)
        );
        assert_eq!(alert.what(), "torrent_finished");
    }
}
