use std::pin::Pin;

use cxx::UniquePtr;
use peerlink_core::{AddTorrentParams, InfoHash, RemoveFlags, TorrentHandle, TorrentSource};
use tracing::{debug, warn};

use super::{AlertBatch, SessionEngine};
use crate::convert::map_native_alert;
use crate::error::EngineError;
use crate::ffi::{AlertNotifier, ffi};
use crate::notify::AlertNotify;
use crate::settings::{SettingValue, SettingsPack};

/// Extensions bundled with libtorrent that can be installed on a native session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativePlugin {
    /// Metadata exchange, required for magnet links.
    UtMetadata,
    /// Peer exchange.
    UtPex,
    /// Bans peers that send corrupt pieces.
    SmartBan,
}

impl NativePlugin {
    const fn to_ffi(self) -> ffi::BuiltinPlugin {
        match self {
            Self::UtMetadata => ffi::BuiltinPlugin::UtMetadata,
            Self::UtPex => ffi::BuiltinPlugin::UtPex,
            Self::SmartBan => ffi::BuiltinPlugin::SmartBan,
        }
    }
}

/// Engine backed by a native libtorrent session.
pub struct NativeEngine {
    session: UniquePtr<ffi::Session>,
}

impl std::fmt::Debug for NativeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeEngine")
            .field("live", &!self.session.is_null())
            .finish()
    }
}

impl NativeEngine {
    fn session(&self, operation: &'static str) -> Result<&ffi::Session, EngineError> {
        self.session
            .as_ref()
            .ok_or(EngineError::SessionUnavailable { operation })
    }

    fn session_mut(
        &mut self,
        operation: &'static str,
    ) -> Result<Pin<&mut ffi::Session>, EngineError> {
        self.session
            .as_mut()
            .ok_or(EngineError::SessionUnavailable { operation })
    }
}

fn check(operation: &'static str, message: String) -> Result<(), EngineError> {
    if message.is_empty() {
        Ok(())
    } else {
        warn!(operation, error = %message, "native session call failed");
        Err(EngineError::NativeFailure { operation, message })
    }
}

fn setting_entries(settings: &SettingsPack) -> Vec<ffi::SettingEntry> {
    settings
        .iter()
        .map(|(name, value)| {
            let mut entry = ffi::SettingEntry {
                name: name.to_string(),
                kind: ffi::SettingKind::Str,
                str_value: String::new(),
                int_value: 0,
                bool_value: false,
            };
            match value {
                SettingValue::Str(value) => entry.str_value = value,
                SettingValue::Int(value) => {
                    entry.kind = ffi::SettingKind::Int;
                    entry.int_value = value;
                }
                SettingValue::Bool(value) => {
                    entry.kind = ffi::SettingKind::Bool;
                    entry.bool_value = value;
                }
            }
            entry
        })
        .collect()
}

fn add_request(params: &AddTorrentParams) -> ffi::AddTorrentRequest {
    let mut request = ffi::AddTorrentRequest {
        source_kind: ffi::SourceKind::Magnet,
        magnet_uri: String::new(),
        metainfo: Vec::new(),
        info_hash: Vec::new(),
        save_path: params.save_path.clone(),
        name: params.name.clone().unwrap_or_default(),
        paused: params.paused,
    };
    match &params.source {
        TorrentSource::Magnet { uri } => request.magnet_uri.clone_from(uri),
        TorrentSource::Metainfo { bytes } => {
            request.source_kind = ffi::SourceKind::Metainfo;
            request.metainfo.clone_from(bytes);
        }
        TorrentSource::InfoHash { info_hash } => {
            request.source_kind = ffi::SourceKind::InfoHash;
            request.info_hash = info_hash.as_bytes().to_vec();
        }
    }
    request
}

impl SessionEngine for NativeEngine {
    type Plugin = NativePlugin;

    fn start(settings: &SettingsPack) -> Result<Self, EngineError> {
        let entries = setting_entries(settings);
        let session = ffi::new_session(&entries).map_err(|err| EngineError::NativeFailure {
            operation: "start",
            message: err.what().to_string(),
        })?;
        if session.is_null() {
            return Err(EngineError::SessionUnavailable { operation: "start" });
        }
        debug!(entries = entries.len(), "native session created");
        Ok(Self { session })
    }

    fn apply_settings(&mut self, settings: &SettingsPack) -> Result<(), EngineError> {
        let entries = setting_entries(settings);
        let message = self.session_mut("apply_settings")?.apply_settings(&entries);
        check("apply_settings", message)
    }

    fn pop_alerts(&mut self) -> Result<AlertBatch, EngineError> {
        let alerts = self.session_mut("pop_alerts")?.pop_alerts();
        Ok(alerts.into_iter().map(map_native_alert).collect())
    }

    fn set_alert_notify(&mut self, notify: AlertNotify) -> Result<(), EngineError> {
        self.session_mut("set_alert_notify")?
            .set_alert_notify(Box::new(AlertNotifier::new(notify)));
        Ok(())
    }

    fn add_torrent(&mut self, params: &AddTorrentParams) -> Result<TorrentHandle, EngineError> {
        let request = add_request(params);
        let mut info_hash = Vec::new();
        let message = self
            .session_mut("add_torrent")?
            .add_torrent(&request, &mut info_hash);
        check("add_torrent", message)?;
        Ok(<[u8; 20]>::try_from(info_hash.as_slice())
            .map(|bytes| TorrentHandle::new(InfoHash::new(bytes)))
            .unwrap_or_else(|_| TorrentHandle::invalid()))
    }

    fn remove_torrent(
        &mut self,
        handle: &TorrentHandle,
        flags: RemoveFlags,
    ) -> Result<(), EngineError> {
        let info_hash = handle.info_hash().ok_or(EngineError::InvalidInput {
            field: "handle",
            reason: "handle does not refer to a torrent",
        })?;
        let message = self
            .session_mut("remove_torrent")?
            .remove_torrent(info_hash.as_bytes(), flags.delete_files);
        check("remove_torrent", message)
    }

    fn find_torrent(&self, info_hash: &InfoHash) -> Result<TorrentHandle, EngineError> {
        let found = self.session("find_torrent")?.has_torrent(info_hash.as_bytes());
        Ok(if found {
            TorrentHandle::new(*info_hash)
        } else {
            TorrentHandle::invalid()
        })
    }

    fn listen_port(&self) -> Result<u16, EngineError> {
        Ok(self.session("listen_port")?.listen_port())
    }

    fn is_paused(&self) -> Result<bool, EngineError> {
        Ok(self.session("is_paused")?.is_paused())
    }

    fn pause(&mut self) -> Result<(), EngineError> {
        self.session_mut("pause")?.pause();
        Ok(())
    }

    fn resume(&mut self) -> Result<(), EngineError> {
        self.session_mut("resume")?.resume();
        Ok(())
    }

    fn post_torrent_updates(&mut self) -> Result<(), EngineError> {
        self.session_mut("post_torrent_updates")?
            .post_torrent_updates();
        Ok(())
    }

    fn add_extension(&mut self, plugin: Self::Plugin) -> Result<(), EngineError> {
        let message = self
            .session_mut("add_extension")?
            .add_extension(plugin.to_ffi());
        check("add_extension", message)
    }

    fn dht_announce(&mut self, info_hash: &InfoHash, port: u16) -> Result<(), EngineError> {
        self.session_mut("dht_announce")?
            .dht_announce(info_hash.as_bytes(), port);
        Ok(())
    }

    fn dht_get_peers(&mut self, info_hash: &InfoHash) -> Result<(), EngineError> {
        self.session_mut("dht_get_peers")?
            .dht_get_peers(info_hash.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{BoolSetting, IntSetting, StrSetting};

    #[test]
    fn setting_entries_carry_typed_values() {
        let mut pack = SettingsPack::new();
        pack.set_str(StrSetting::UserAgent, "agent");
        pack.set_int(IntSetting::AlertQueueSize, 64);
        pack.set_bool(BoolSetting::EnableDht, true);

        let entries = setting_entries(&pack);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, "user_agent");
        assert_eq!(entries[0].kind, ffi::SettingKind::Str);
        assert_eq!(entries[0].str_value, "agent");
        assert_eq!(entries[1].kind, ffi::SettingKind::Int);
        assert_eq!(entries[1].int_value, 64);
        assert_eq!(entries[2].kind, ffi::SettingKind::Bool);
        assert!(entries[2].bool_value);
    }

    #[test]
    fn add_request_selects_the_source_field() {
        let info_hash = InfoHash::new([9; 20]);
        let mut params = AddTorrentParams::info_hash(info_hash, "/tmp/downloads");
        params.paused = true;

        let request = add_request(&params);
        assert_eq!(request.source_kind, ffi::SourceKind::InfoHash);
        assert_eq!(request.info_hash, vec![9; 20]);
        assert!(request.magnet_uri.is_empty());
        assert!(request.paused);
        assert_eq!(request.save_path, "/tmp/downloads");
    }

    #[test]
    fn plugins_map_to_bundled_extensions() {
        assert_eq!(NativePlugin::UtPex.to_ffi(), ffi::BuiltinPlugin::UtPex);
        assert_eq!(NativePlugin::SmartBan.to_ffi(), ffi::BuiltinPlugin::SmartBan);
    }
}
