//! Alert category bitmask matching the engine's `alert_mask` setting.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Set of alert categories; each engine alert belongs to one or more of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertCategory(u32);

impl AlertCategory {
    /// No categories.
    pub const NONE: Self = Self(0);
    /// Errors such as tracker or file failures.
    pub const ERROR: Self = Self(0x1);
    /// Peer related events (bans, snubs, misbehaviour).
    pub const PEER: Self = Self(0x2);
    /// Port mapping events for `UPnP` and NAT-PMP.
    pub const PORT_MAPPING: Self = Self(0x4);
    /// Storage events (file moves, disk errors).
    pub const STORAGE: Self = Self(0x8);
    /// Tracker announces and replies.
    pub const TRACKER: Self = Self(0x10);
    /// Peer connect and disconnect events.
    pub const CONNECT: Self = Self(0x20);
    /// Torrent state changes.
    pub const STATUS: Self = Self(0x40);
    /// Block and piece progress.
    pub const PROGRESS: Self = Self(0x80);
    /// Blocked connection attempts.
    pub const IP_BLOCK: Self = Self(0x100);
    /// Performance warnings.
    pub const PERFORMANCE_WARNING: Self = Self(0x200);
    /// DHT node events.
    pub const DHT: Self = Self(0x400);
    /// Periodic per-torrent statistics.
    pub const STATS: Self = Self(0x800);
    /// Session-wide debug logging.
    pub const SESSION_LOG: Self = Self(0x2000);
    /// Torrent-wide debug logging.
    pub const TORRENT_LOG: Self = Self(0x4000);
    /// Peer-level debug logging.
    pub const PEER_LOG: Self = Self(0x8000);
    /// Incoming block requests.
    pub const INCOMING_REQUEST: Self = Self(0x1_0000);
    /// DHT debug logging.
    pub const DHT_LOG: Self = Self(0x2_0000);
    /// Replies to DHT operations issued by the client.
    pub const DHT_OPERATION: Self = Self(0x4_0000);
    /// Port mapping debug logging.
    pub const PORT_MAPPING_LOG: Self = Self(0x8_0000);
    /// Piece picker debug logging.
    pub const PICKER_LOG: Self = Self(0x10_0000);
    /// Every category.
    pub const ALL: Self = Self(0x7fff_ffff);

    /// Categories excluded from the session baseline because they are high volume or debug only.
    pub const HIGH_VOLUME: Self = Self(
        Self::DHT.0
            | Self::STATS.0
            | Self::SESSION_LOG.0
            | Self::TORRENT_LOG.0
            | Self::PEER_LOG.0
            | Self::DHT_LOG.0
            | Self::PICKER_LOG.0
            | Self::PORT_MAPPING_LOG.0,
    );

    /// Wrap raw mask bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw mask bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Mask used for new sessions: everything except the high-volume categories.
    #[must_use]
    pub const fn session_default() -> Self {
        Self::ALL.difference(Self::HIGH_VOLUME)
    }

    /// Whether every category in `other` is present.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any category in `other` is present.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Categories present in either mask.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Categories present in `self` but not in `other`.
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Whether no category is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for AlertCategory {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl BitOrAssign for AlertCategory {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
