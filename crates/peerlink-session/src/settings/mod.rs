//! Typed settings pack pushed to the engine at creation and on every runtime update.
//!
//! # Design
//! - The pack is sparse: only explicitly set entries travel to the engine, so
//!   a runtime update never resets keys it does not mention.
//! - Loose JSON input is validated once, at `merge`, against a fixed key set.

mod fingerprint;
mod keys;
mod merge;

use std::collections::BTreeMap;

use peerlink_core::AlertCategory;
use serde::{Serialize, Serializer};

pub use fingerprint::{FingerprintError, MAX_VERSION_COMPONENT, PeerFingerprint};
pub use keys::{BoolSetting, IntSetting, ProxyType, SettingKey, SettingValue, StrSetting};
pub use merge::ROOT_FIELD;

/// Client identification string used by new sessions.
pub const DEFAULT_USER_AGENT: &str = "Peerlink";
/// Client id embedded in the default peer fingerprint.
pub const DEFAULT_FINGERPRINT_NAME: &str = "PL";
/// Alert queue capacity used by new sessions.
pub const DEFAULT_ALERT_QUEUE_SIZE: i64 = 5_000;
/// Listen interface used by new sessions.
pub const DEFAULT_LISTEN_INTERFACES: &str = "0.0.0.0:7881";
/// DHT bootstrap nodes used by new sessions.
pub const DEFAULT_DHT_BOOTSTRAP_NODES: &str = "router.bittorrent.com:6881,router.utorrent.com:6881,dht.libtorrent.org:25401,dht.transmissionbt.com:6881,dht.aelitis.com:6881";

/// Sparse, typed collection of engine settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsPack {
    strings: BTreeMap<StrSetting, String>,
    ints: BTreeMap<IntSetting, i64>,
    bools: BTreeMap<BoolSetting, bool>,
}

impl SettingsPack {
    /// Empty pack; applying it changes nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Baseline every session starts from.
    #[must_use]
    pub fn session_defaults() -> Self {
        let fingerprint = PeerFingerprint::new(DEFAULT_FINGERPRINT_NAME, 0, 0, 0, 0)
            .map(|fingerprint| fingerprint.to_string())
            .unwrap_or_default();

        let mut pack = Self::new();
        pack.set_int(
            IntSetting::AlertMask,
            i64::from(AlertCategory::session_default().bits()),
        );
        pack.set_bool(BoolSetting::EnableUpnp, false);
        pack.set_bool(BoolSetting::EnableNatpmp, false);
        pack.set_bool(BoolSetting::EnableLsd, false);
        pack.set_bool(BoolSetting::EnableDht, false);
        pack.set_str(StrSetting::UserAgent, DEFAULT_USER_AGENT);
        pack.set_str(StrSetting::PeerFingerprint, fingerprint);
        pack.set_bool(BoolSetting::AllowMultipleConnectionsPerIp, false);
        pack.set_int(IntSetting::AlertQueueSize, DEFAULT_ALERT_QUEUE_SIZE);
        pack.set_str(StrSetting::DhtBootstrapNodes, DEFAULT_DHT_BOOTSTRAP_NODES);
        pack.set_str(StrSetting::ListenInterfaces, DEFAULT_LISTEN_INTERFACES);
        pack
    }

    /// Set a string entry.
    pub fn set_str(&mut self, key: StrSetting, value: impl Into<String>) {
        self.strings.insert(key, value.into());
    }

    /// Set an integer entry.
    pub fn set_int(&mut self, key: IntSetting, value: i64) {
        self.ints.insert(key, value);
    }

    /// Set a boolean entry.
    pub fn set_bool(&mut self, key: BoolSetting, value: bool) {
        self.bools.insert(key, value);
    }

    /// String entry, if set.
    #[must_use]
    pub fn get_str(&self, key: StrSetting) -> Option<&str> {
        self.strings.get(&key).map(String::as_str)
    }

    /// Integer entry, if set.
    #[must_use]
    pub fn get_int(&self, key: IntSetting) -> Option<i64> {
        self.ints.get(&key).copied()
    }

    /// Boolean entry, if set.
    #[must_use]
    pub fn get_bool(&self, key: BoolSetting) -> Option<bool> {
        self.bools.get(&key).copied()
    }

    /// Entry for any key, if set.
    #[must_use]
    pub fn get(&self, key: SettingKey) -> Option<SettingValue> {
        match key {
            SettingKey::Str(key) => self.get_str(key).map(|value| SettingValue::Str(value.to_string())),
            SettingKey::Int(key) => self.get_int(key).map(SettingValue::Int),
            SettingKey::Bool(key) => self.get_bool(key).map(SettingValue::Bool),
        }
    }

    /// Alert categories selected by the `alert_mask` entry, if set.
    #[must_use]
    pub fn alert_mask(&self) -> Option<AlertCategory> {
        self.get_int(IntSetting::AlertMask)
            .and_then(|bits| u32::try_from(bits).ok())
            .map(AlertCategory::from_bits)
    }

    /// Number of entries set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len() + self.ints.len() + self.bools.len()
    }

    /// Whether no entry is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries as `(engine name, value)` pairs: strings, then integers, then booleans.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, SettingValue)> + '_ {
        let strings = self
            .strings
            .iter()
            .map(|(key, value)| (key.name(), SettingValue::Str(value.clone())));
        let ints = self
            .ints
            .iter()
            .map(|(key, value)| (key.name(), SettingValue::Int(*value)));
        let bools = self
            .bools
            .iter()
            .map(|(key, value)| (key.name(), SettingValue::Bool(*value)));
        strings.chain(ints).chain(bools)
    }

    /// Copy every entry of `other` into `self`; entries of `other` win.
    pub fn extend(&mut self, other: &Self) {
        self.strings
            .extend(other.strings.iter().map(|(key, value)| (*key, value.clone())));
        self.ints.extend(other.ints.iter().map(|(key, value)| (*key, *value)));
        self.bools.extend(other.bools.iter().map(|(key, value)| (*key, *value)));
    }
}

impl Serialize for SettingsPack {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}
