//! Ordered encoder dispatch turning opaque engine alerts into alert records.
//!
//! # Design
//! - Extension encoders are tried in registration order; the built-in encoder
//!   is always tried last. The first encoder that claims an alert wins.
//! - Encoding never fails. An alert nobody claims is simply not reported.

use std::fmt;
use std::sync::Arc;

use peerlink_events::AlertRecord;

use crate::engine::EngineAlert;
use crate::engine::alerts::{
    AddTorrentAlert, DhtGetPeersReplyAlert, ListenFailedAlert, ListenSucceededAlert,
    MetadataReceivedAlert, PeerConnectAlert, PeerDisconnectedAlert, StateChangedAlert,
    StateUpdateAlert, TorrentCheckedAlert, TorrentErrorAlert, TorrentFinishedAlert,
    TorrentPausedAlert, TorrentRemovedAlert, TorrentResumedAlert,
};

/// Converts engine alerts it understands into [`AlertRecord`]s.
pub trait AlertEncoder: Send + Sync {
    /// Encoder name, used in logs.
    fn name(&self) -> &str;

    /// Encode `alert`, or return `None` to let the next encoder try.
    fn try_encode(&self, alert: &dyn EngineAlert) -> Option<AlertRecord>;
}

/// Encoder for the alerts posted by the bundled engines.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinAlertEncoder;

impl BuiltinAlertEncoder {
    /// Name reported by [`AlertEncoder::name`].
    pub const NAME: &'static str = "builtin";
}

impl AlertEncoder for BuiltinAlertEncoder {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn try_encode(&self, alert: &dyn EngineAlert) -> Option<AlertRecord> {
        match alert.what() {
            "add_torrent" => alert
                .downcast_ref::<AddTorrentAlert>()
                .map(|added| AlertRecord::TorrentAdded {
                    info_hash: added.info_hash,
                    name: added.name.clone(),
                    error: added.error.clone(),
                }),
            "torrent_removed" => alert
                .downcast_ref::<TorrentRemovedAlert>()
                .map(|removed| AlertRecord::TorrentRemoved {
                    info_hash: removed.info_hash,
                }),
            "state_changed" => alert
                .downcast_ref::<StateChangedAlert>()
                .map(|changed| AlertRecord::StateChanged {
                    info_hash: changed.info_hash,
                    state: changed.state,
                    previous: changed.prev_state,
                }),
            "state_update" => alert
                .downcast_ref::<StateUpdateAlert>()
                .map(|update| AlertRecord::StateUpdate {
                    statuses: update.statuses.clone(),
                }),
            "torrent_finished" => alert
                .downcast_ref::<TorrentFinishedAlert>()
                .map(|finished| AlertRecord::TorrentFinished {
                    info_hash: finished.info_hash,
                }),
            "torrent_paused" => alert
                .downcast_ref::<TorrentPausedAlert>()
                .map(|paused| AlertRecord::TorrentPaused {
                    info_hash: paused.info_hash,
                }),
            "torrent_resumed" => alert
                .downcast_ref::<TorrentResumedAlert>()
                .map(|resumed| AlertRecord::TorrentResumed {
                    info_hash: resumed.info_hash,
                }),
            "torrent_checked" => alert
                .downcast_ref::<TorrentCheckedAlert>()
                .map(|checked| AlertRecord::TorrentChecked {
                    info_hash: checked.info_hash,
                }),
            "metadata_received" => alert
                .downcast_ref::<MetadataReceivedAlert>()
                .map(|received| AlertRecord::MetadataReceived {
                    info_hash: received.info_hash,
                }),
            "torrent_error" => alert
                .downcast_ref::<TorrentErrorAlert>()
                .map(|error| AlertRecord::TorrentError {
                    info_hash: error.info_hash,
                    message: error.message.clone(),
                }),
            "peer_connect" => alert
                .downcast_ref::<PeerConnectAlert>()
                .map(|peer| AlertRecord::PeerConnected {
                    info_hash: peer.info_hash,
                    endpoint: peer.endpoint.clone(),
                }),
            "peer_disconnected" => alert
                .downcast_ref::<PeerDisconnectedAlert>()
                .map(|peer| AlertRecord::PeerDisconnected {
                    info_hash: peer.info_hash,
                    endpoint: peer.endpoint.clone(),
                    reason: peer.reason.clone(),
                }),
            "listen_succeeded" => alert
                .downcast_ref::<ListenSucceededAlert>()
                .map(|listen| AlertRecord::ListenSucceeded {
                    endpoint: listen.endpoint.clone(),
                }),
            "listen_failed" => alert
                .downcast_ref::<ListenFailedAlert>()
                .map(|listen| AlertRecord::ListenFailed {
                    endpoint: listen.endpoint.clone(),
                    message: listen.message.clone(),
                }),
            "dht_get_peers_reply" => alert
                .downcast_ref::<DhtGetPeersReplyAlert>()
                .map(|reply| AlertRecord::DhtGetPeersReply {
                    info_hash: reply.info_hash,
                    peers: reply.peers.clone(),
                }),
            _ => None,
        }
    }
}

/// Ordered list of extension encoders backed by the built-in encoder.
pub struct EncoderRegistry {
    extensions: Vec<Arc<dyn AlertEncoder>>,
    builtin: BuiltinAlertEncoder,
}

impl EncoderRegistry {
    /// Registry holding only the built-in encoder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            extensions: Vec::new(),
            builtin: BuiltinAlertEncoder,
        }
    }

    /// Append an extension encoder; it is tried after every earlier registration.
    pub fn register(&mut self, encoder: Arc<dyn AlertEncoder>) {
        self.extensions.push(encoder);
    }

    /// Encode `alert` with the first encoder that claims it.
    #[must_use]
    pub fn encode(&self, alert: &dyn EngineAlert) -> Option<AlertRecord> {
        self.extensions
            .iter()
            .find_map(|encoder| encoder.try_encode(alert))
            .or_else(|| self.builtin.try_encode(alert))
    }

    /// Number of extension encoders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Whether no extension encoder is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Encoder names in dispatch order, built-in last.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|encoder| encoder.name().to_string())
            .chain(std::iter::once(self.builtin.name().to_string()))
            .collect()
    }
}

impl Default for EncoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EncoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncoderRegistry")
            .field("encoders", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::alerts::UnknownAlert;
    use peerlink_core::{AlertCategory, InfoHash, TorrentState};
    use serde_json::json;

    struct Tagging {
        name: &'static str,
        claims: &'static str,
    }

    impl AlertEncoder for Tagging {
        fn name(&self) -> &str {
            self.name
        }

        fn try_encode(&self, alert: &dyn EngineAlert) -> Option<AlertRecord> {
            (alert.what() == self.claims).then(|| AlertRecord::Extension {
                extension: self.name.to_string(),
                name: alert.what().to_string(),
                payload: json!({"message": alert.message()}),
            })
        }
    }

    fn unknown(what: &str) -> UnknownAlert {
        UnknownAlert {
            what: what.to_string(),
            category: AlertCategory::STATUS,
            message: format!("{what} happened"),
        }
    }

    fn extension_of(record: Option<AlertRecord>) -> Option<String> {
        match record {
            Some(AlertRecord::Extension { extension, .. }) => Some(extension),
            _ => None,
        }
    }

    #[test]
    fn builtin_maps_known_alerts() {
        let info_hash = InfoHash::new([7; 20]);
        let registry = EncoderRegistry::new();

        assert_eq!(
            registry.encode(&StateChangedAlert {
                info_hash,
                state: TorrentState::Downloading,
                prev_state: TorrentState::DownloadingMetadata,
            }),
            Some(AlertRecord::StateChanged {
                info_hash,
                state: TorrentState::Downloading,
                previous: TorrentState::DownloadingMetadata,
            })
        );
        assert_eq!(
            registry.encode(&PeerConnectAlert {
                info_hash,
                endpoint: "10.0.0.2:51413".into(),
            }),
            Some(AlertRecord::PeerConnected {
                info_hash,
                endpoint: "10.0.0.2:51413".into(),
            })
        );
        assert!(registry.encode(&unknown("block_finished")).is_none());
    }

    #[test]
    fn builtin_ignores_foreign_alerts_reusing_a_known_name() {
        let registry = EncoderRegistry::new();
        assert!(registry.encode(&unknown("torrent_finished")).is_none());
    }

    #[test]
    fn first_registered_encoder_wins() {
        let mut registry = EncoderRegistry::new();
        registry.register(Arc::new(Tagging {
            name: "first",
            claims: "custom",
        }));
        registry.register(Arc::new(Tagging {
            name: "second",
            claims: "custom",
        }));

        assert_eq!(
            extension_of(registry.encode(&unknown("custom"))),
            Some("first".to_string())
        );
    }

    #[test]
    fn later_encoder_claims_what_earlier_ones_decline() {
        let mut registry = EncoderRegistry::new();
        registry.register(Arc::new(Tagging {
            name: "metadata",
            claims: "metadata_request",
        }));
        registry.register(Arc::new(Tagging {
            name: "pex",
            claims: "pex_update",
        }));

        assert_eq!(
            extension_of(registry.encode(&unknown("pex_update"))),
            Some("pex".to_string())
        );
    }

    #[test]
    fn extensions_take_priority_over_builtin() {
        let mut registry = EncoderRegistry::new();
        registry.register(Arc::new(Tagging {
            name: "override",
            claims: "torrent_finished",
        }));
        let record = registry.encode(&TorrentFinishedAlert {
            info_hash: InfoHash::new([1; 20]),
        });
        assert_eq!(extension_of(record), Some("override".to_string()));
    }

    #[test]
    fn names_list_builtin_last() {
        let mut registry = EncoderRegistry::default();
        assert!(registry.is_empty());
        registry.register(Arc::new(Tagging {
            name: "pex",
            claims: "pex_update",
        }));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names(), vec!["pex".to_string(), "builtin".to_string()]);
    }
}
