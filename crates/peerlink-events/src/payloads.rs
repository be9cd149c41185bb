//! Alert record payloads carried to session consumers.

use chrono::{DateTime, Utc};
use peerlink_core::{InfoHash, TorrentState, TorrentStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier assigned to each record published on the bus.
pub type AlertId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Structured form of one engine alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertRecord {
    /// A transfer was admitted, or admission failed.
    TorrentAdded {
        /// Content hash of the transfer.
        info_hash: InfoHash,
        /// Display name known at admission time.
        name: String,
        /// Failure detail when admission failed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// A transfer was removed from the session.
    TorrentRemoved {
        /// Content hash of the removed transfer.
        info_hash: InfoHash,
    },
    /// A transfer moved to a new lifecycle state.
    StateChanged {
        /// Content hash of the transfer.
        info_hash: InfoHash,
        /// New state.
        state: TorrentState,
        /// State before the transition.
        previous: TorrentState,
    },
    /// Batched status snapshots requested through `post_torrent_updates`.
    StateUpdate {
        /// Snapshots for every transfer whose status changed.
        statuses: Vec<TorrentStatus>,
    },
    /// All wanted pieces of a transfer are downloaded.
    TorrentFinished {
        /// Content hash of the transfer.
        info_hash: InfoHash,
    },
    /// A transfer was paused.
    TorrentPaused {
        /// Content hash of the transfer.
        info_hash: InfoHash,
    },
    /// A transfer was resumed.
    TorrentResumed {
        /// Content hash of the transfer.
        info_hash: InfoHash,
    },
    /// On-disk payload verification completed.
    TorrentChecked {
        /// Content hash of the transfer.
        info_hash: InfoHash,
    },
    /// Metadata for a magnet or hash-only transfer arrived.
    MetadataReceived {
        /// Content hash of the transfer.
        info_hash: InfoHash,
    },
    /// A transfer hit an error and stopped.
    TorrentError {
        /// Content hash of the transfer.
        info_hash: InfoHash,
        /// Engine error detail.
        message: String,
    },
    /// A peer connection was established.
    PeerConnected {
        /// Content hash of the transfer.
        info_hash: InfoHash,
        /// Remote endpoint (`ip:port`).
        endpoint: String,
    },
    /// A peer connection closed.
    PeerDisconnected {
        /// Content hash of the transfer.
        info_hash: InfoHash,
        /// Remote endpoint (`ip:port`).
        endpoint: String,
        /// Reason reported by the engine.
        reason: String,
    },
    /// The engine opened a listen socket.
    ListenSucceeded {
        /// Local endpoint (`ip:port`).
        endpoint: String,
    },
    /// The engine failed to open a listen socket.
    ListenFailed {
        /// Local endpoint (`ip:port`).
        endpoint: String,
        /// Engine error detail.
        message: String,
    },
    /// Peers returned by a DHT `get_peers` lookup.
    DhtGetPeersReply {
        /// Content hash that was looked up.
        info_hash: InfoHash,
        /// Peer endpoints (`ip:port`).
        peers: Vec<String>,
    },
    /// Record produced by an extension encoder for an alert the extension introduced.
    Extension {
        /// Name of the extension that produced the record.
        extension: String,
        /// Extension-defined alert name.
        name: String,
        /// Extension-defined fields.
        payload: Value,
    },
}

impl AlertRecord {
    /// Machine-friendly discriminator, identical to the serialized `kind` tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TorrentAdded { .. } => "torrent_added",
            Self::TorrentRemoved { .. } => "torrent_removed",
            Self::StateChanged { .. } => "state_changed",
            Self::StateUpdate { .. } => "state_update",
            Self::TorrentFinished { .. } => "torrent_finished",
            Self::TorrentPaused { .. } => "torrent_paused",
            Self::TorrentResumed { .. } => "torrent_resumed",
            Self::TorrentChecked { .. } => "torrent_checked",
            Self::MetadataReceived { .. } => "metadata_received",
            Self::TorrentError { .. } => "torrent_error",
            Self::PeerConnected { .. } => "peer_connected",
            Self::PeerDisconnected { .. } => "peer_disconnected",
            Self::ListenSucceeded { .. } => "listen_succeeded",
            Self::ListenFailed { .. } => "listen_failed",
            Self::DhtGetPeersReply { .. } => "dht_get_peers_reply",
            Self::Extension { .. } => "extension",
        }
    }

    /// Content hash of the transfer the record concerns, when it concerns exactly one.
    #[must_use]
    pub const fn info_hash(&self) -> Option<InfoHash> {
        match self {
            Self::TorrentAdded { info_hash, .. }
            | Self::TorrentRemoved { info_hash }
            | Self::StateChanged { info_hash, .. }
            | Self::TorrentFinished { info_hash }
            | Self::TorrentPaused { info_hash }
            | Self::TorrentResumed { info_hash }
            | Self::TorrentChecked { info_hash }
            | Self::MetadataReceived { info_hash }
            | Self::TorrentError { info_hash, .. }
            | Self::PeerConnected { info_hash, .. }
            | Self::PeerDisconnected { info_hash, .. }
            | Self::DhtGetPeersReply { info_hash, .. } => Some(*info_hash),
            Self::StateUpdate { .. }
            | Self::ListenSucceeded { .. }
            | Self::ListenFailed { .. }
            | Self::Extension { .. } => None,
        }
    }
}

/// Metadata wrapper around records published on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEnvelope {
    /// Sequential identifier assigned by the bus.
    pub id: AlertId,
    /// Session that produced the record.
    pub session: String,
    /// Publication timestamp.
    pub timestamp: DateTime<Utc>,
    /// The record itself.
    pub alert: AlertRecord,
}
