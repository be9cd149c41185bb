use crate::notify::AlertNotify;

/// Wake-up callback handed across the bridge; the native session keeps it
/// until it is replaced or the session is destroyed.
pub struct AlertNotifier(AlertNotify);

impl AlertNotifier {
    pub(crate) const fn new(notify: AlertNotify) -> Self {
        Self(notify)
    }

    fn notify(&self) {
        self.0.notify();
    }
}

#[cxx::bridge(namespace = "peerlink")]
/// Native bridge types and functions exposed to Rust.
pub mod ffi {
    /// Value type carried by a [`SettingEntry`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum SettingKind {
        /// `str_value` is set.
        Str,
        /// `int_value` is set.
        Int,
        /// `bool_value` is set.
        Bool,
    }

    /// One settings-pack entry, resolved by name on the native side.
    #[derive(Debug, Clone)]
    struct SettingEntry {
        /// libtorrent setting name.
        name: String,
        /// Which value field is meaningful.
        kind: SettingKind,
        /// String value.
        str_value: String,
        /// Integer value.
        int_value: i64,
        /// Boolean value.
        bool_value: bool,
    }

    /// Source type used when adding a torrent.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum SourceKind {
        /// Magnet URI in `magnet_uri`.
        Magnet,
        /// Bencoded metainfo in `metainfo`.
        Metainfo,
        /// Bare v1 info-hash in `info_hash`.
        InfoHash,
    }

    /// Request payload for adding a torrent to the native session.
    #[derive(Debug)]
    struct AddTorrentRequest {
        /// Which source field is meaningful.
        source_kind: SourceKind,
        /// Magnet URI when applicable.
        magnet_uri: String,
        /// Raw metainfo payload when applicable.
        metainfo: Vec<u8>,
        /// 20-byte info-hash when applicable.
        info_hash: Vec<u8>,
        /// Payload directory.
        save_path: String,
        /// Display name override; empty when absent.
        name: String,
        /// Whether the torrent starts paused.
        paused: bool,
    }

    /// Status snapshot carried by state-update alerts.
    #[derive(Debug, Clone)]
    struct NativeTorrentStatus {
        /// 20-byte info-hash.
        info_hash: Vec<u8>,
        /// Torrent name.
        name: String,
        /// libtorrent state code.
        state: u8,
        /// Completion ratio.
        progress: f32,
        /// Download rate in bytes per second.
        download_rate: u64,
        /// Upload rate in bytes per second.
        upload_rate: u64,
        /// Connected peers.
        num_peers: u32,
        /// Verified wanted bytes.
        total_done: u64,
        /// Wanted bytes.
        total_wanted: u64,
        /// Whether the torrent is paused.
        paused: bool,
    }

    /// Alert types flattened by the native session.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum NativeAlertKind {
        /// `add_torrent_alert`.
        AddTorrent,
        /// `torrent_removed_alert`.
        TorrentRemoved,
        /// `state_changed_alert`.
        StateChanged,
        /// `state_update_alert`.
        StateUpdate,
        /// `torrent_finished_alert`.
        TorrentFinished,
        /// `torrent_paused_alert`.
        TorrentPaused,
        /// `torrent_resumed_alert`.
        TorrentResumed,
        /// `torrent_checked_alert`.
        TorrentChecked,
        /// `metadata_received_alert`.
        MetadataReceived,
        /// `torrent_error_alert`.
        TorrentError,
        /// `peer_connect_alert`.
        PeerConnect,
        /// `peer_disconnected_alert`.
        PeerDisconnected,
        /// `listen_succeeded_alert`.
        ListenSucceeded,
        /// `listen_failed_alert`.
        ListenFailed,
        /// `dht_get_peers_reply_alert`.
        DhtGetPeersReply,
        /// Any other alert; only `what`, `category` and `message` are set.
        Other,
    }

    /// Alert envelope emitted by the native session.
    #[derive(Debug)]
    struct NativeAlert {
        /// Flattened alert type.
        kind: NativeAlertKind,
        /// `alert::what()`.
        what: String,
        /// `alert::category()` bits.
        category: u32,
        /// `alert::message()`.
        message: String,
        /// Torrent info-hash; empty for session alerts.
        info_hash: Vec<u8>,
        /// Torrent name, when known.
        name: String,
        /// New state code for state changes.
        state: u8,
        /// Previous state code for state changes.
        prev_state: u8,
        /// Peer or listen endpoint.
        endpoint: String,
        /// Error detail; empty when none.
        error: String,
        /// Peers returned by a DHT lookup.
        peers: Vec<String>,
        /// Status snapshots for state updates.
        statuses: Vec<NativeTorrentStatus>,
    }

    /// Session extensions bundled with libtorrent.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum BuiltinPlugin {
        /// Metadata exchange (BEP 9).
        UtMetadata,
        /// Peer exchange.
        UtPex,
        /// Bans peers sending corrupt pieces.
        SmartBan,
    }

    extern "Rust" {
        type AlertNotifier;

        fn notify(self: &AlertNotifier);
    }

    unsafe extern "C++" {
        include!("peerlink/session.hpp");

        /// Opaque handle to the native libtorrent session.
        type Session;

        /// Create a libtorrent session configured with `settings`.
        fn new_session(settings: &[SettingEntry]) -> Result<UniquePtr<Session>>;
        /// Apply a sparse settings pack; returns an error message or an empty string.
        #[must_use]
        fn apply_settings(self: Pin<&mut Session>, settings: &[SettingEntry]) -> String;
        /// Pop and flatten every pending alert.
        #[must_use]
        fn pop_alerts(self: Pin<&mut Session>) -> Vec<NativeAlert>;
        /// Install the wake-up callback, replacing any previous one.
        fn set_alert_notify(self: Pin<&mut Session>, notifier: Box<AlertNotifier>);
        /// Add a torrent; writes the info-hash into `info_hash` and returns an error message or an empty string.
        #[must_use]
        fn add_torrent(
            self: Pin<&mut Session>,
            request: &AddTorrentRequest,
            info_hash: &mut Vec<u8>,
        ) -> String;
        /// Remove a torrent; returns an error message or an empty string.
        #[must_use]
        fn remove_torrent(self: Pin<&mut Session>, info_hash: &[u8], delete_files: bool) -> String;
        /// Whether a torrent with `info_hash` is in the session.
        #[must_use]
        fn has_torrent(self: &Session, info_hash: &[u8]) -> bool;
        /// First listen port.
        #[must_use]
        fn listen_port(self: &Session) -> u16;
        /// Whether the session is paused.
        #[must_use]
        fn is_paused(self: &Session) -> bool;
        /// Pause the whole session.
        fn pause(self: Pin<&mut Session>);
        /// Resume the whole session.
        fn resume(self: Pin<&mut Session>);
        /// Request a `state_update_alert`.
        fn post_torrent_updates(self: Pin<&mut Session>);
        /// Install a bundled extension; returns an error message or an empty string.
        #[must_use]
        fn add_extension(self: Pin<&mut Session>, plugin: BuiltinPlugin) -> String;
        /// Announce `info_hash` on the DHT.
        fn dht_announce(self: Pin<&mut Session>, info_hash: &[u8], port: u16);
        /// Look up peers for `info_hash` on the DHT.
        fn dht_get_peers(self: Pin<&mut Session>, info_hash: &[u8]);
    }
}
