use peerlink_core::{AddTorrentParams, InfoHash, RemoveFlags, SessionResult, TorrentHandle};
use serde_json::Value;
use tokio::sync::oneshot;

/// Reply channel carried by every request.
pub(crate) type Responder<T> = oneshot::Sender<SessionResult<T>>;

/// Requests delivered to the session worker.
#[derive(Debug)]
pub(crate) enum SessionCommand {
    /// Merge loose settings into an empty pack and push it to the engine.
    ApplySettings {
        overrides: Value,
        respond_to: Responder<()>,
    },
    /// Admit a transfer.
    AddTorrent {
        params: Box<AddTorrentParams>,
        respond_to: Responder<TorrentHandle>,
    },
    /// Remove a transfer.
    RemoveTorrent {
        handle: TorrentHandle,
        flags: RemoveFlags,
        respond_to: Responder<()>,
    },
    /// Look up a transfer by content hash.
    FindTorrent {
        info_hash: InfoHash,
        respond_to: Responder<TorrentHandle>,
    },
    ListenPort {
        respond_to: Responder<u16>,
    },
    Pause {
        respond_to: Responder<()>,
    },
    Resume {
        respond_to: Responder<()>,
    },
    IsPaused {
        respond_to: Responder<bool>,
    },
    PostTorrentUpdates {
        respond_to: Responder<()>,
    },
    DhtAnnounce {
        info_hash: InfoHash,
        port: u16,
        respond_to: Responder<()>,
    },
    DhtGetPeers {
        info_hash: InfoHash,
        respond_to: Responder<()>,
    },
    /// Drain once more and stop the worker.
    Shutdown,
}

impl SessionCommand {
    /// Operation name used in logs and `WorkerClosed` errors.
    pub(crate) const fn operation(&self) -> &'static str {
        match self {
            Self::ApplySettings { .. } => "apply_settings",
            Self::AddTorrent { .. } => "add_torrent",
            Self::RemoveTorrent { .. } => "remove_torrent",
            Self::FindTorrent { .. } => "find_torrent",
            Self::ListenPort { .. } => "listen_port",
            Self::Pause { .. } => "pause",
            Self::Resume { .. } => "resume",
            Self::IsPaused { .. } => "is_paused",
            Self::PostTorrentUpdates { .. } => "post_torrent_updates",
            Self::DhtAnnounce { .. } => "dht_announce",
            Self::DhtGetPeers { .. } => "dht_get_peers",
            Self::Shutdown => "shutdown",
        }
    }
}
