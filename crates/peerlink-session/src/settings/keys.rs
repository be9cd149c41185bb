//! Typed setting keys, grouped by value type the same way the engine groups them.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// String-valued settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StrSetting {
    /// Client identification sent to trackers and in the extension handshake.
    UserAgent,
    /// Comma separated `host:port` list the engine listens on.
    ListenInterfaces,
    /// Comma separated interfaces used for outgoing connections.
    OutgoingInterfaces,
    /// Proxy host name or address.
    ProxyHostname,
    /// Proxy user name.
    ProxyUsername,
    /// Proxy password.
    ProxyPassword,
    /// Encoded peer-id prefix (`-XXabcd-`).
    PeerFingerprint,
    /// Comma separated DHT bootstrap nodes.
    DhtBootstrapNodes,
}

impl StrSetting {
    /// Every string key.
    pub const ALL: [Self; 8] = [
        Self::UserAgent,
        Self::ListenInterfaces,
        Self::OutgoingInterfaces,
        Self::ProxyHostname,
        Self::ProxyUsername,
        Self::ProxyPassword,
        Self::PeerFingerprint,
        Self::DhtBootstrapNodes,
    ];

    /// Engine setting name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UserAgent => "user_agent",
            Self::ListenInterfaces => "listen_interfaces",
            Self::OutgoingInterfaces => "outgoing_interfaces",
            Self::ProxyHostname => "proxy_hostname",
            Self::ProxyUsername => "proxy_username",
            Self::ProxyPassword => "proxy_password",
            Self::PeerFingerprint => "peer_fingerprint",
            Self::DhtBootstrapNodes => "dht_bootstrap_nodes",
        }
    }

    /// Reverse lookup by engine setting name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }
}

/// Integer-valued settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IntSetting {
    /// Proxy protocol, see [`ProxyType`].
    ProxyType,
    /// Proxy port.
    ProxyPort,
    /// Port of the local I2P SAM bridge.
    I2pPort,
    /// Bitmask of alert categories the engine posts.
    AlertMask,
    /// Maximum number of alerts held before new ones are dropped.
    AlertQueueSize,
}

impl IntSetting {
    /// Every integer key.
    pub const ALL: [Self; 5] = [
        Self::ProxyType,
        Self::ProxyPort,
        Self::I2pPort,
        Self::AlertMask,
        Self::AlertQueueSize,
    ];

    /// Engine setting name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ProxyType => "proxy_type",
            Self::ProxyPort => "proxy_port",
            Self::I2pPort => "i2p_port",
            Self::AlertMask => "alert_mask",
            Self::AlertQueueSize => "alert_queue_size",
        }
    }

    /// Reverse lookup by engine setting name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }

    /// Values accepted for this key.
    #[must_use]
    pub const fn range(self) -> RangeInclusive<i64> {
        match self {
            Self::ProxyType => ProxyType::None.code()..=ProxyType::I2pProxy.code(),
            Self::ProxyPort | Self::I2pPort => 0..=u16::MAX as i64,
            Self::AlertMask => 0..=u32::MAX as i64,
            Self::AlertQueueSize => 1..=i32::MAX as i64,
        }
    }
}

/// Boolean settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoolSetting {
    /// Run the DHT node.
    EnableDht,
    /// Accept more than one connection from the same address.
    AllowMultipleConnectionsPerIp,
    /// Map the listen port with `UPnP`.
    EnableUpnp,
    /// Map the listen port with NAT-PMP.
    EnableNatpmp,
    /// Local service discovery.
    EnableLsd,
    /// Hide client identity from peers and trackers.
    AnonymousMode,
    /// Refuse any connection that would bypass the proxy.
    ForceProxy,
}

impl BoolSetting {
    /// Every boolean key.
    pub const ALL: [Self; 7] = [
        Self::EnableDht,
        Self::AllowMultipleConnectionsPerIp,
        Self::EnableUpnp,
        Self::EnableNatpmp,
        Self::EnableLsd,
        Self::AnonymousMode,
        Self::ForceProxy,
    ];

    /// Engine setting name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::EnableDht => "enable_dht",
            Self::AllowMultipleConnectionsPerIp => "allow_multiple_connections_per_ip",
            Self::EnableUpnp => "enable_upnp",
            Self::EnableNatpmp => "enable_natpmp",
            Self::EnableLsd => "enable_lsd",
            Self::AnonymousMode => "anonymous_mode",
            Self::ForceProxy => "force_proxy",
        }
    }

    /// Reverse lookup by engine setting name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }
}

/// Any recognised setting key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// String-valued key.
    Str(StrSetting),
    /// Integer-valued key.
    Int(IntSetting),
    /// Boolean key.
    Bool(BoolSetting),
}

impl SettingKey {
    /// Resolve an engine setting name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        StrSetting::from_name(name)
            .map(Self::Str)
            .or_else(|| IntSetting::from_name(name).map(Self::Int))
            .or_else(|| BoolSetting::from_name(name).map(Self::Bool))
    }

    /// Engine setting name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Str(key) => key.name(),
            Self::Int(key) => key.name(),
            Self::Bool(key) => key.name(),
        }
    }

    /// Whether loose override input may set this key.
    ///
    /// The alert queue size and the DHT bootstrap list are fixed by the
    /// session baseline.
    #[must_use]
    pub const fn accepts_overrides(self) -> bool {
        !matches!(
            self,
            Self::Int(IntSetting::AlertQueueSize) | Self::Str(StrSetting::DhtBootstrapNodes)
        )
    }
}

/// Value stored for one setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// String value.
    Str(String),
}

/// Proxy protocols understood by the engine's `proxy_type` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyType {
    /// Direct connections.
    None,
    /// SOCKS4, no authentication.
    Socks4,
    /// SOCKS5 without authentication.
    Socks5,
    /// SOCKS5 with username and password.
    Socks5Pw,
    /// HTTP CONNECT proxy.
    Http,
    /// HTTP CONNECT proxy with basic authentication.
    HttpPw,
    /// I2P SAM bridge.
    I2pProxy,
}

impl ProxyType {
    /// Map the engine's numeric proxy code.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Socks4),
            2 => Some(Self::Socks5),
            3 => Some(Self::Socks5Pw),
            4 => Some(Self::Http),
            5 => Some(Self::HttpPw),
            6 => Some(Self::I2pProxy),
            _ => None,
        }
    }

    /// Numeric code understood by the engine.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::None => 0,
            Self::Socks4 => 1,
            Self::Socks5 => 2,
            Self::Socks5Pw => 3,
            Self::Http => 4,
            Self::HttpPw => 5,
            Self::I2pProxy => 6,
        }
    }
}
