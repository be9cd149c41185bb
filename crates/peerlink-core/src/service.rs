//! Async control surface implemented by session services.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SessionResult;
use crate::model::{AddTorrentParams, InfoHash, RemoveFlags, TorrentHandle};

/// Control operations offered by a running session, independent of the engine behind it.
#[async_trait]
pub trait SessionControl: Send + Sync {
    /// Merge a partial settings document and push it to the engine.
    async fn apply_settings(&self, partial: Value) -> SessionResult<()>;

    /// Admit a new transfer.
    async fn add_torrent(&self, params: AddTorrentParams) -> SessionResult<TorrentHandle>;

    /// Remove a transfer, optionally deleting its payload.
    async fn remove_torrent(&self, handle: TorrentHandle, flags: RemoveFlags) -> SessionResult<()>;

    /// Look up a transfer; unknown hashes yield an invalid handle.
    async fn find_torrent(&self, info_hash: InfoHash) -> SessionResult<TorrentHandle>;

    /// Port the engine is listening on.
    async fn listen_port(&self) -> SessionResult<u16>;

    /// Suspend all engine activity.
    async fn pause(&self) -> SessionResult<()>;

    /// Resume engine activity.
    async fn resume(&self) -> SessionResult<()>;

    /// Whether the engine is paused.
    async fn is_paused(&self) -> SessionResult<bool>;

    /// Ask the engine to post a state-update alert for all transfers.
    async fn post_torrent_updates(&self) -> SessionResult<()>;

    /// Announce a transfer on the DHT.
    async fn dht_announce(&self, info_hash: InfoHash, port: u16) -> SessionResult<()>;

    /// Query the DHT for peers; replies arrive as alert records.
    async fn dht_get_peers(&self, info_hash: InfoHash) -> SessionResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;

    struct InertSession;

    #[async_trait]
    impl SessionControl for InertSession {
        async fn apply_settings(&self, _partial: Value) -> SessionResult<()> {
            Ok(())
        }

        async fn add_torrent(&self, _params: AddTorrentParams) -> SessionResult<TorrentHandle> {
            Ok(TorrentHandle::invalid())
        }

        async fn remove_torrent(
            &self,
            _handle: TorrentHandle,
            _flags: RemoveFlags,
        ) -> SessionResult<()> {
            Ok(())
        }

        async fn find_torrent(&self, _info_hash: InfoHash) -> SessionResult<TorrentHandle> {
            Ok(TorrentHandle::invalid())
        }

        async fn listen_port(&self) -> SessionResult<u16> {
            Ok(0)
        }

        async fn pause(&self) -> SessionResult<()> {
            Ok(())
        }

        async fn resume(&self) -> SessionResult<()> {
            Ok(())
        }

        async fn is_paused(&self) -> SessionResult<bool> {
            Ok(false)
        }

        async fn post_torrent_updates(&self) -> SessionResult<()> {
            Ok(())
        }

        async fn dht_announce(&self, _info_hash: InfoHash, _port: u16) -> SessionResult<()> {
            Ok(())
        }

        async fn dht_get_peers(&self, _info_hash: InfoHash) -> SessionResult<()> {
            Err(SessionError::EngineUnavailable {
                operation: "dht_get_peers",
            })
        }
    }

    #[tokio::test]
    async fn control_is_usable_as_a_trait_object() {
        let session: Box<dyn SessionControl> = Box::new(InertSession);
        let hash = InfoHash::new([7; 20]);
        assert_eq!(session.dht_announce(hash, 6881).await, Ok(()));
        let handle = session.find_torrent(hash).await.expect("inert lookup");
        assert!(!handle.is_valid());
        assert!(
            session
                .dht_get_peers(hash)
                .await
                .is_err_and(|err| err.is_fatal())
        );
    }
}
