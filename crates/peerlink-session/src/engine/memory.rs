//! In-process engine that keeps transfers, settings and the alert queue in memory.
//!
//! It follows the native engine's alert contract: posted alerts are filtered
//! by `alert_mask`, the queue is capped at `alert_queue_size`, and the wake-up
//! callback fires once per empty to non-empty transition, outside the queue lock.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use peerlink_core::{
    AddTorrentParams, AlertCategory, InfoHash, RemoveFlags, TorrentHandle, TorrentSource,
    TorrentState, TorrentStatus,
};
use tracing::{debug, trace};

use super::alerts::{
    AddTorrentAlert, DhtGetPeersReplyAlert, ListenFailedAlert, ListenSucceededAlert,
    StateChangedAlert, StateUpdateAlert, TorrentPausedAlert, TorrentRemovedAlert,
    TorrentResumedAlert,
};
use super::{AlertBatch, EngineAlert, SessionEngine};
use crate::error::EngineError;
use crate::notify::AlertNotify;
use crate::settings::{BoolSetting, IntSetting, SettingsPack, StrSetting};

const ENGINE_DEFAULT_ALERT_QUEUE_SIZE: i64 = 2_000;
const ENGINE_DEFAULT_LISTEN_INTERFACES: &str = "0.0.0.0:6881";
const ENGINE_DEFAULT_USER_AGENT: &str = "libtorrent/2.0";
const LOCAL_PEER_ADDRESS: &str = "127.0.0.1";

/// Extension accepted by [`MemoryEngine::add_extension`].
pub trait MemoryPlugin: Send {
    /// Extension name, used in logs.
    fn name(&self) -> &str;

    /// Called after a transfer is admitted; returned alerts are posted in order.
    fn on_torrent_added(&mut self, info_hash: &InfoHash) -> AlertBatch;
}

struct EngineState {
    running: bool,
    settings: SettingsPack,
    queue: VecDeque<Box<dyn EngineAlert>>,
    notify: Option<AlertNotify>,
    dropped: u64,
}

impl EngineState {
    fn alert_mask(&self) -> AlertCategory {
        self.settings.alert_mask().unwrap_or(AlertCategory::ERROR)
    }

    fn queue_capacity(&self) -> usize {
        self.settings
            .get_int(IntSetting::AlertQueueSize)
            .and_then(|size| usize::try_from(size).ok())
            .unwrap_or_default()
    }
}

struct Shared {
    state: Mutex<EngineState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_running(&self, operation: &'static str) -> Result<(), EngineError> {
        if self.lock().running {
            Ok(())
        } else {
            Err(EngineError::SessionUnavailable { operation })
        }
    }

    /// Queue `alert`; returns whether it was accepted.
    fn post(&self, alert: Box<dyn EngineAlert>) -> bool {
        let notify = {
            let mut state = self.lock();
            if !state.running {
                return false;
            }
            if !state.alert_mask().intersects(alert.category()) {
                trace!(alert = alert.what(), "alert filtered by alert_mask");
                return false;
            }
            if state.queue.len() >= state.queue_capacity() {
                state.dropped += 1;
                debug!(
                    alert = alert.what(),
                    dropped = state.dropped,
                    "alert queue full; dropping alert"
                );
                return false;
            }
            let was_empty = state.queue.is_empty();
            state.queue.push_back(alert);
            if was_empty {
                state.notify.clone()
            } else {
                None
            }
        };
        if let Some(notify) = notify {
            notify.notify();
        }
        true
    }
}

/// Cloneable handle used to post alerts from other threads or shut the engine down.
#[derive(Clone)]
pub struct MemoryEngineHandle {
    shared: Arc<Shared>,
}

impl MemoryEngineHandle {
    /// Post an alert as if the engine had raised it; returns whether it was queued.
    pub fn post(&self, alert: impl EngineAlert) -> bool {
        self.shared.post(Box::new(alert))
    }

    /// Number of alerts waiting to be popped.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Alerts dropped because the queue was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.shared.lock().dropped
    }

    /// Whether the engine session is still alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    /// Destroy the engine session; every later engine call fails.
    pub fn shutdown(&self) {
        let notify = {
            let mut state = self.shared.lock();
            state.running = false;
            state.queue.clear();
            state.notify.take()
        };
        drop(notify);
        debug!("memory engine shut down");
    }
}

impl fmt::Debug for MemoryEngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryEngineHandle")
            .field("running", &self.is_running())
            .field("pending", &self.pending())
            .finish()
    }
}

struct MemoryTorrent {
    status: TorrentStatus,
    save_path: String,
    /// Paused on its own, independent of the session-wide pause.
    user_paused: bool,
}

/// In-memory [`SessionEngine`].
pub struct MemoryEngine {
    shared: Arc<Shared>,
    torrents: BTreeMap<InfoHash, MemoryTorrent>,
    changed: BTreeSet<InfoHash>,
    dht_peers: BTreeMap<InfoHash, Vec<String>>,
    paused: bool,
    plugins: Vec<Box<dyn MemoryPlugin>>,
}

impl MemoryEngine {
    /// Settings the engine uses for keys a pack never set.
    #[must_use]
    pub fn engine_defaults() -> SettingsPack {
        let mut pack = SettingsPack::new();
        pack.set_int(IntSetting::AlertMask, i64::from(AlertCategory::ERROR.bits()));
        pack.set_int(IntSetting::AlertQueueSize, ENGINE_DEFAULT_ALERT_QUEUE_SIZE);
        pack.set_str(StrSetting::ListenInterfaces, ENGINE_DEFAULT_LISTEN_INTERFACES);
        pack.set_str(StrSetting::UserAgent, ENGINE_DEFAULT_USER_AGENT);
        pack.set_bool(BoolSetting::EnableDht, true);
        pack.set_bool(BoolSetting::EnableUpnp, true);
        pack.set_bool(BoolSetting::EnableNatpmp, true);
        pack.set_bool(BoolSetting::EnableLsd, true);
        pack.set_bool(BoolSetting::AllowMultipleConnectionsPerIp, false);
        pack
    }

    /// Handle for posting alerts and shutting the engine down from elsewhere.
    #[must_use]
    pub fn handle(&self) -> MemoryEngineHandle {
        MemoryEngineHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Effective settings: engine defaults overlaid with every applied pack.
    #[must_use]
    pub fn settings(&self) -> SettingsPack {
        self.shared.lock().settings.clone()
    }

    /// Names of installed extensions, in installation order.
    #[must_use]
    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins
            .iter()
            .map(|plugin| plugin.name().to_string())
            .collect()
    }

    /// Status of an admitted transfer.
    #[must_use]
    pub fn torrent_status(&self, info_hash: &InfoHash) -> Option<TorrentStatus> {
        self.torrents
            .get(info_hash)
            .map(|torrent| torrent.status.clone())
    }

    fn post(&self, alert: impl EngineAlert) {
        let _ = self.shared.post(Box::new(alert));
    }

    fn announce_listen(&self) {
        let interfaces = self
            .shared
            .lock()
            .settings
            .get_str(StrSetting::ListenInterfaces)
            .unwrap_or_default()
            .to_string();
        for endpoint in interfaces
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
        {
            if parse_listen_port(endpoint).is_some() {
                self.post(ListenSucceededAlert {
                    endpoint: endpoint.to_string(),
                });
            } else {
                self.post(ListenFailedAlert {
                    endpoint: endpoint.to_string(),
                    message: "invalid listen interface".to_string(),
                });
            }
        }
    }

    fn dht_enabled(&self) -> bool {
        self.shared
            .lock()
            .settings
            .get_bool(BoolSetting::EnableDht)
            .unwrap_or(false)
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        let hashes: Vec<InfoHash> = self.torrents.keys().copied().collect();
        for info_hash in hashes {
            let Some(torrent) = self.torrents.get_mut(&info_hash) else {
                continue;
            };
            let effective = torrent.user_paused || paused;
            if torrent.status.paused == effective {
                continue;
            }
            torrent.status.paused = effective;
            self.changed.insert(info_hash);
            if paused {
                self.post(TorrentPausedAlert { info_hash });
            } else {
                self.post(TorrentResumedAlert { info_hash });
            }
        }
    }
}

fn parse_listen_port(endpoint: &str) -> Option<u16> {
    endpoint
        .rsplit_once(':')
        .and_then(|(_, port)| port.parse::<u16>().ok())
}

impl SessionEngine for MemoryEngine {
    type Plugin = Box<dyn MemoryPlugin>;

    fn start(settings: &SettingsPack) -> Result<Self, EngineError> {
        let mut effective = Self::engine_defaults();
        effective.extend(settings);
        let engine = Self {
            shared: Arc::new(Shared {
                state: Mutex::new(EngineState {
                    running: true,
                    settings: effective,
                    queue: VecDeque::new(),
                    notify: None,
                    dropped: 0,
                }),
            }),
            torrents: BTreeMap::new(),
            changed: BTreeSet::new(),
            dht_peers: BTreeMap::new(),
            paused: false,
            plugins: Vec::new(),
        };
        debug!(entries = settings.len(), "memory engine started");
        engine.announce_listen();
        Ok(engine)
    }

    fn apply_settings(&mut self, settings: &SettingsPack) -> Result<(), EngineError> {
        self.shared.ensure_running("apply_settings")?;
        self.shared.lock().settings.extend(settings);
        if settings.get_str(StrSetting::ListenInterfaces).is_some() {
            self.announce_listen();
        }
        Ok(())
    }

    fn pop_alerts(&mut self) -> Result<AlertBatch, EngineError> {
        let mut state = self.shared.lock();
        if !state.running {
            return Err(EngineError::SessionUnavailable {
                operation: "pop_alerts",
            });
        }
        Ok(state.queue.drain(..).collect())
    }

    fn set_alert_notify(&mut self, notify: AlertNotify) -> Result<(), EngineError> {
        let (previous, pending) = {
            let mut state = self.shared.lock();
            if !state.running {
                return Err(EngineError::SessionUnavailable {
                    operation: "set_alert_notify",
                });
            }
            let previous = state.notify.replace(notify.clone());
            (previous, !state.queue.is_empty())
        };
        drop(previous);
        if pending {
            notify.notify();
        }
        Ok(())
    }

    fn add_torrent(&mut self, params: &AddTorrentParams) -> Result<TorrentHandle, EngineError> {
        self.shared.ensure_running("add_torrent")?;
        if matches!(params.source, TorrentSource::Metainfo { .. }) {
            return Err(EngineError::InvalidInput {
                field: "source",
                reason: "metainfo sources are not supported by the memory engine",
            });
        }
        let info_hash = params
            .source
            .magnet_info_hash()
            .ok()
            .flatten()
            .ok_or(EngineError::InvalidInput {
                field: "magnet",
                reason: "missing 40 character btih topic",
            })?;
        let name = params.name.clone().unwrap_or_else(|| info_hash.to_hex());

        if self.torrents.contains_key(&info_hash) {
            self.post(AddTorrentAlert {
                info_hash,
                name,
                error: Some("torrent already exists in session".to_string()),
            });
            return Ok(TorrentHandle::new(info_hash));
        }

        let paused = params.paused || self.paused;
        self.torrents.insert(
            info_hash,
            MemoryTorrent {
                status: TorrentStatus::queued(info_hash, name.clone(), paused),
                save_path: params.save_path.clone(),
                user_paused: params.paused,
            },
        );
        self.changed.insert(info_hash);
        debug!(info_hash = %info_hash, save_path = %params.save_path, paused, "torrent admitted");

        self.post(AddTorrentAlert {
            info_hash,
            name,
            error: None,
        });
        self.post(StateChangedAlert {
            info_hash,
            state: TorrentState::DownloadingMetadata,
            prev_state: TorrentState::CheckingFiles,
        });
        if paused {
            self.post(TorrentPausedAlert { info_hash });
        }
        let extension_alerts: Vec<_> = self
            .plugins
            .iter_mut()
            .flat_map(|plugin| plugin.on_torrent_added(&info_hash))
            .collect();
        for alert in extension_alerts {
            let _ = self.shared.post(alert);
        }
        Ok(TorrentHandle::new(info_hash))
    }

    fn remove_torrent(
        &mut self,
        handle: &TorrentHandle,
        flags: RemoveFlags,
    ) -> Result<(), EngineError> {
        self.shared.ensure_running("remove_torrent")?;
        let info_hash = handle.info_hash().ok_or(EngineError::InvalidInput {
            field: "handle",
            reason: "torrent handle is not valid",
        })?;
        let removed = self
            .torrents
            .remove(&info_hash)
            .ok_or(EngineError::InvalidInput {
                field: "handle",
                reason: "torrent is not in the session",
            })?;
        self.changed.remove(&info_hash);
        debug!(
            info_hash = %info_hash,
            save_path = %removed.save_path,
            delete_files = flags.delete_files,
            "torrent removed"
        );
        self.post(TorrentRemovedAlert { info_hash });
        Ok(())
    }

    fn find_torrent(&self, info_hash: &InfoHash) -> Result<TorrentHandle, EngineError> {
        self.shared.ensure_running("find_torrent")?;
        Ok(if self.torrents.contains_key(info_hash) {
            TorrentHandle::new(*info_hash)
        } else {
            TorrentHandle::invalid()
        })
    }

    fn listen_port(&self) -> Result<u16, EngineError> {
        let state = self.shared.lock();
        if !state.running {
            return Err(EngineError::SessionUnavailable {
                operation: "listen_port",
            });
        }
        Ok(state
            .settings
            .get_str(StrSetting::ListenInterfaces)
            .and_then(|interfaces| interfaces.split(',').next())
            .and_then(|first| parse_listen_port(first.trim()))
            .unwrap_or_default())
    }

    fn is_paused(&self) -> Result<bool, EngineError> {
        self.shared.ensure_running("is_paused")?;
        Ok(self.paused)
    }

    fn pause(&mut self) -> Result<(), EngineError> {
        self.shared.ensure_running("pause")?;
        if !self.paused {
            self.set_paused(true);
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<(), EngineError> {
        self.shared.ensure_running("resume")?;
        if self.paused {
            self.set_paused(false);
        }
        Ok(())
    }

    fn post_torrent_updates(&mut self) -> Result<(), EngineError> {
        self.shared.ensure_running("post_torrent_updates")?;
        let statuses = std::mem::take(&mut self.changed)
            .into_iter()
            .filter_map(|info_hash| self.torrent_status(&info_hash))
            .collect();
        self.post(StateUpdateAlert { statuses });
        Ok(())
    }

    fn add_extension(&mut self, plugin: Self::Plugin) -> Result<(), EngineError> {
        self.shared.ensure_running("add_extension")?;
        debug!(extension = plugin.name(), "memory engine extension installed");
        self.plugins.push(plugin);
        Ok(())
    }

    fn dht_announce(&mut self, info_hash: &InfoHash, port: u16) -> Result<(), EngineError> {
        self.shared.ensure_running("dht_announce")?;
        if !self.dht_enabled() {
            trace!(info_hash = %info_hash, "dht disabled; announce ignored");
            return Ok(());
        }
        let endpoint = format!("{LOCAL_PEER_ADDRESS}:{port}");
        let peers = self.dht_peers.entry(*info_hash).or_default();
        if !peers.contains(&endpoint) {
            peers.push(endpoint);
        }
        Ok(())
    }

    fn dht_get_peers(&mut self, info_hash: &InfoHash) -> Result<(), EngineError> {
        self.shared.ensure_running("dht_get_peers")?;
        if !self.dht_enabled() {
            trace!(info_hash = %info_hash, "dht disabled; get_peers ignored");
            return Ok(());
        }
        let peers = self.dht_peers.get(info_hash).cloned().unwrap_or_default();
        self.post(DhtGetPeersReplyAlert {
            info_hash: *info_hash,
            peers,
        });
        Ok(())
    }
}
