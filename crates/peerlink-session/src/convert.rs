//! Conversions between flattened native alerts and engine alert types.

use peerlink_core::{AlertCategory, InfoHash, TorrentState, TorrentStatus};
use tracing::debug;

use crate::engine::EngineAlert;
use crate::engine::alerts::{
    AddTorrentAlert, DhtGetPeersReplyAlert, ListenFailedAlert, ListenSucceededAlert,
    MetadataReceivedAlert, PeerConnectAlert, PeerDisconnectedAlert, StateChangedAlert,
    StateUpdateAlert, TorrentCheckedAlert, TorrentErrorAlert, TorrentFinishedAlert,
    TorrentPausedAlert, TorrentRemovedAlert, TorrentResumedAlert, UnknownAlert,
};
use crate::ffi::ffi::{NativeAlert, NativeAlertKind, NativeTorrentStatus};

#[must_use]
pub(crate) fn map_native_alert(alert: NativeAlert) -> Box<dyn EngineAlert> {
    let NativeAlert {
        kind,
        what,
        category,
        message,
        info_hash,
        name,
        state,
        prev_state,
        endpoint,
        error,
        peers,
        statuses,
    } = alert;

    match kind {
        NativeAlertKind::StateUpdate => {
            return Box::new(StateUpdateAlert {
                statuses: statuses.into_iter().filter_map(map_status).collect(),
            });
        }
        NativeAlertKind::ListenSucceeded => return Box::new(ListenSucceededAlert { endpoint }),
        NativeAlertKind::ListenFailed => {
            return Box::new(ListenFailedAlert {
                endpoint,
                message: error,
            });
        }
        _ => {}
    }

    let unknown = Box::new(UnknownAlert {
        what,
        category: AlertCategory::from_bits(category),
        message,
    });
    let Some(info_hash) = map_hash(&info_hash) else {
        if kind != NativeAlertKind::Other {
            debug!(alert = %unknown.what, "native torrent alert without a v1 info-hash");
        }
        return unknown;
    };

    match kind {
        NativeAlertKind::AddTorrent => Box::new(AddTorrentAlert {
            info_hash,
            name,
            error: (!error.is_empty()).then_some(error),
        }),
        NativeAlertKind::TorrentRemoved => Box::new(TorrentRemovedAlert { info_hash }),
        NativeAlertKind::StateChanged => Box::new(StateChangedAlert {
            info_hash,
            state: TorrentState::from_code(state),
            prev_state: TorrentState::from_code(prev_state),
        }),
        NativeAlertKind::TorrentFinished => Box::new(TorrentFinishedAlert { info_hash }),
        NativeAlertKind::TorrentPaused => Box::new(TorrentPausedAlert { info_hash }),
        NativeAlertKind::TorrentResumed => Box::new(TorrentResumedAlert { info_hash }),
        NativeAlertKind::TorrentChecked => Box::new(TorrentCheckedAlert { info_hash }),
        NativeAlertKind::MetadataReceived => Box::new(MetadataReceivedAlert { info_hash }),
        NativeAlertKind::TorrentError => Box::new(TorrentErrorAlert {
            info_hash,
            message: error,
        }),
        NativeAlertKind::PeerConnect => Box::new(PeerConnectAlert {
            info_hash,
            endpoint,
        }),
        NativeAlertKind::PeerDisconnected => Box::new(PeerDisconnectedAlert {
            info_hash,
            endpoint,
            reason: error,
        }),
        NativeAlertKind::DhtGetPeersReply => Box::new(DhtGetPeersReplyAlert { info_hash, peers }),
        _ => unknown,
    }
}

fn map_hash(bytes: &[u8]) -> Option<InfoHash> {
    <[u8; 20]>::try_from(bytes).ok().map(InfoHash::new)
}

fn map_status(status: NativeTorrentStatus) -> Option<TorrentStatus> {
    let Some(info_hash) = map_hash(&status.info_hash) else {
        debug!(name = %status.name, "dropping status without a v1 info-hash");
        return None;
    };
    Some(TorrentStatus {
        info_hash,
        name: status.name,
        state: TorrentState::from_code(status.state),
        progress: status.progress,
        download_rate: status.download_rate,
        upload_rate: status.upload_rate,
        num_peers: status.num_peers,
        total_done: status.total_done,
        total_wanted: status.total_wanted,
        paused: status.paused,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native(kind: NativeAlertKind, info_hash: Vec<u8>) -> NativeAlert {
        NativeAlert {
            kind,
            what: "test".to_string(),
            category: AlertCategory::STATUS.bits(),
            message: "test alert".to_string(),
            info_hash,
            name: "demo".to_string(),
            state: 3,
            prev_state: 2,
            endpoint: "10.0.0.1:6881".to_string(),
            error: String::new(),
            peers: Vec::new(),
            statuses: Vec::new(),
        }
    }

    #[test]
    fn state_changes_map_native_codes() {
        let alert = map_native_alert(native(NativeAlertKind::StateChanged, vec![5; 20]));
        let changed = alert
            .downcast_ref::<StateChangedAlert>()
            .expect("state_changed alert");
        assert_eq!(changed.info_hash, InfoHash::new([5; 20]));
        assert_eq!(changed.state, TorrentState::Downloading);
        assert_eq!(changed.prev_state, TorrentState::DownloadingMetadata);
    }

    #[test]
    fn add_torrent_keeps_error_detail() {
        let mut raw = native(NativeAlertKind::AddTorrent, vec![1; 20]);
        raw.error = "duplicate torrent".to_string();
        let alert = map_native_alert(raw);
        let added = alert.downcast_ref::<AddTorrentAlert>().expect("add_torrent alert");
        assert_eq!(added.error.as_deref(), Some("duplicate torrent"));
    }

    #[test]
    fn torrent_alert_without_hash_becomes_unknown() {
        let alert = map_native_alert(native(NativeAlertKind::TorrentFinished, Vec::new()));
        assert!(alert.is::<UnknownAlert>());
        assert_eq!(alert.category(), AlertCategory::STATUS);
    }

    #[test]
    fn listen_alerts_need_no_hash() {
        let alert = map_native_alert(native(NativeAlertKind::ListenSucceeded, Vec::new()));
        assert!(alert.is::<ListenSucceededAlert>());
    }
}
