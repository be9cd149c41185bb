//! Concrete alert types posted by the bundled engines.

use peerlink_core::{AlertCategory, InfoHash, TorrentState, TorrentStatus};

use super::EngineAlert;

macro_rules! engine_alert {
    ($alert:ty, $what:literal, $category:expr, |$this:ident| $message:expr) => {
        impl EngineAlert for $alert {
            fn what(&self) -> &str {
                $what
            }

            fn category(&self) -> AlertCategory {
                $category
            }

            fn message(&self) -> String {
                let $this = self;
                $message
            }
        }
    };
}

/// A transfer was admitted, or admission failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddTorrentAlert {
    /// Content hash of the transfer.
    pub info_hash: InfoHash,
    /// Display name at admission time.
    pub name: String,
    /// Failure detail when admission failed.
    pub error: Option<String>,
}

engine_alert!(
    AddTorrentAlert,
    "add_torrent",
    AlertCategory::STATUS,
    |alert| match &alert.error {
        Some(error) => format!("{} added with error: {error}", alert.name),
        None => format!("{} added", alert.name),
    }
);

/// A transfer was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentRemovedAlert {
    /// Content hash of the removed transfer.
    pub info_hash: InfoHash,
}

engine_alert!(
    TorrentRemovedAlert,
    "torrent_removed",
    AlertCategory::STATUS,
    |alert| format!("{} removed", alert.info_hash)
);

/// A transfer changed lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChangedAlert {
    /// Content hash of the transfer.
    pub info_hash: InfoHash,
    /// New state.
    pub state: TorrentState,
    /// Previous state.
    pub prev_state: TorrentState,
}

engine_alert!(
    StateChangedAlert,
    "state_changed",
    AlertCategory::STATUS,
    |alert| format!(
        "{} state changed from {:?} to {:?}",
        alert.info_hash, alert.prev_state, alert.state
    )
);

/// Status snapshots requested with `post_torrent_updates`.
#[derive(Debug, Clone, PartialEq)]
pub struct StateUpdateAlert {
    /// Transfers whose status changed since the previous update.
    pub statuses: Vec<TorrentStatus>,
}

engine_alert!(
    StateUpdateAlert,
    "state_update",
    AlertCategory::STATUS,
    |alert| format!("state updates for {} torrents", alert.statuses.len())
);

/// All wanted pieces are downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentFinishedAlert {
    /// Content hash of the transfer.
    pub info_hash: InfoHash,
}

engine_alert!(
    TorrentFinishedAlert,
    "torrent_finished",
    AlertCategory::STATUS,
    |alert| format!("{} torrent finished downloading", alert.info_hash)
);

/// A transfer was paused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentPausedAlert {
    /// Content hash of the transfer.
    pub info_hash: InfoHash,
}

engine_alert!(
    TorrentPausedAlert,
    "torrent_paused",
    AlertCategory::STATUS,
    |alert| format!("{} paused", alert.info_hash)
);

/// A transfer was resumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentResumedAlert {
    /// Content hash of the transfer.
    pub info_hash: InfoHash,
}

engine_alert!(
    TorrentResumedAlert,
    "torrent_resumed",
    AlertCategory::STATUS,
    |alert| format!("{} resumed", alert.info_hash)
);

/// Payload verification finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentCheckedAlert {
    /// Content hash of the transfer.
    pub info_hash: InfoHash,
}

engine_alert!(
    TorrentCheckedAlert,
    "torrent_checked",
    AlertCategory::STATUS,
    |alert| format!("{} checked", alert.info_hash)
);

/// Metadata arrived from the swarm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataReceivedAlert {
    /// Content hash of the transfer.
    pub info_hash: InfoHash,
}

engine_alert!(
    MetadataReceivedAlert,
    "metadata_received",
    AlertCategory::STATUS,
    |alert| format!("{} metadata successfully received", alert.info_hash)
);

/// A transfer stopped on an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentErrorAlert {
    /// Content hash of the transfer.
    pub info_hash: InfoHash,
    /// Error detail.
    pub message: String,
}

engine_alert!(
    TorrentErrorAlert,
    "torrent_error",
    AlertCategory::ERROR.union(AlertCategory::STATUS),
    |alert| format!("{} ERROR: {}", alert.info_hash, alert.message)
);

/// A peer connection was established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConnectAlert {
    /// Content hash of the transfer.
    pub info_hash: InfoHash,
    /// Remote `ip:port`.
    pub endpoint: String,
}

engine_alert!(
    PeerConnectAlert,
    "peer_connect",
    AlertCategory::CONNECT,
    |alert| format!("{} peer {} connecting", alert.info_hash, alert.endpoint)
);

/// A peer connection closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerDisconnectedAlert {
    /// Content hash of the transfer.
    pub info_hash: InfoHash,
    /// Remote `ip:port`.
    pub endpoint: String,
    /// Reason reported by the engine.
    pub reason: String,
}

engine_alert!(
    PeerDisconnectedAlert,
    "peer_disconnected",
    AlertCategory::CONNECT,
    |alert| format!(
        "{} peer {} disconnecting: {}",
        alert.info_hash, alert.endpoint, alert.reason
    )
);

/// A listen socket was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenSucceededAlert {
    /// Local `ip:port`.
    pub endpoint: String,
}

engine_alert!(
    ListenSucceededAlert,
    "listen_succeeded",
    AlertCategory::STATUS,
    |alert| format!("successfully listening on {}", alert.endpoint)
);

/// A listen socket could not be opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenFailedAlert {
    /// Local `ip:port` or interface name.
    pub endpoint: String,
    /// Error detail.
    pub message: String,
}

engine_alert!(
    ListenFailedAlert,
    "listen_failed",
    AlertCategory::STATUS.union(AlertCategory::ERROR),
    |alert| format!("listening on {} failed: {}", alert.endpoint, alert.message)
);

/// Peers returned by a DHT lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhtGetPeersReplyAlert {
    /// Content hash looked up.
    pub info_hash: InfoHash,
    /// Peer `ip:port` list.
    pub peers: Vec<String>,
}

engine_alert!(
    DhtGetPeersReplyAlert,
    "dht_get_peers_reply",
    AlertCategory::DHT_OPERATION,
    |alert| format!(
        "incoming dht get_peers reply: {} peers: {}",
        alert.info_hash,
        alert.peers.len()
    )
);

/// Alert of a type this build does not model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAlert {
    /// Engine name of the alert type.
    pub what: String,
    /// Categories reported by the engine.
    pub category: AlertCategory,
    /// Engine-provided description.
    pub message: String,
}

impl EngineAlert for UnknownAlert {
    fn what(&self) -> &str {
        &self.what
    }

    fn category(&self) -> AlertCategory {
        self.category
    }

    fn message(&self) -> String {
        self.message.clone()
    }
}
