//! Core transfer types and DTOs shared across the workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SessionError;

/// Length in bytes of a v1 content hash.
pub const INFO_HASH_LEN: usize = 20;

const BTIH_PREFIX: &str = "urn:btih:";

/// SHA-1 content hash naming a transfer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InfoHash([u8; INFO_HASH_LEN]);

impl InfoHash {
    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn new(bytes: [u8; INFO_HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a 40 character hex digest.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` when the string is not 40 hex characters.
    pub fn from_hex(value: &str) -> Result<Self, SessionError> {
        let mut bytes = [0_u8; INFO_HASH_LEN];
        hex::decode_to_slice(value, &mut bytes).map_err(|_| SessionError::InvalidInput {
            field: "info_hash",
            reason: "must be 40 hex characters",
        })?;
        Ok(Self(bytes))
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; INFO_HASH_LEN] {
        &self.0
    }

    /// Lowercase hex rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InfoHash({self})")
    }
}

impl FromStr for InfoHash {
    type Err = SessionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_hex(value)
    }
}

impl Serialize for InfoHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for InfoHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

/// Handle to a transfer inside the engine.
///
/// Lookups that find nothing produce an invalid handle instead of an error,
/// mirroring the engine's own handle semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TorrentHandle {
    info_hash: Option<InfoHash>,
}

impl TorrentHandle {
    /// Handle referring to the transfer with `info_hash`.
    #[must_use]
    pub const fn new(info_hash: InfoHash) -> Self {
        Self {
            info_hash: Some(info_hash),
        }
    }

    /// Handle that refers to nothing.
    #[must_use]
    pub const fn invalid() -> Self {
        Self { info_hash: None }
    }

    /// Whether the handle refers to a transfer.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.info_hash.is_some()
    }

    /// Content hash of the referenced transfer, if any.
    #[must_use]
    pub const fn info_hash(&self) -> Option<InfoHash> {
        self.info_hash
    }
}

/// Source describing how a transfer should be added to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TorrentSource {
    /// Magnet URI to resolve.
    Magnet {
        /// Magnet URI to resolve and add.
        uri: String,
    },
    /// Raw `.torrent` metainfo bytes.
    Metainfo {
        /// Bencoded metainfo payload.
        bytes: Vec<u8>,
    },
    /// Bare content hash; metadata is fetched from peers.
    InfoHash {
        /// Content hash to join.
        info_hash: InfoHash,
    },
}

impl TorrentSource {
    #[must_use]
    /// Convenience constructor for magnet-based sources.
    pub fn magnet(uri: impl Into<String>) -> Self {
        Self::Magnet { uri: uri.into() }
    }

    #[must_use]
    /// Convenience constructor for metainfo-based sources.
    pub fn metainfo(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Metainfo {
            bytes: bytes.into(),
        }
    }

    /// Content hash named by the source, when it can be derived without parsing metainfo.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` when a magnet URI carries no usable `btih` topic.
    pub fn magnet_info_hash(&self) -> Result<Option<InfoHash>, SessionError> {
        match self {
            Self::Magnet { uri } => parse_magnet_info_hash(uri).map(Some),
            Self::InfoHash { info_hash } => Ok(Some(*info_hash)),
            Self::Metainfo { .. } => Ok(None),
        }
    }
}

fn parse_magnet_info_hash(uri: &str) -> Result<InfoHash, SessionError> {
    let invalid = SessionError::InvalidInput {
        field: "magnet",
        reason: "missing 40 character btih topic",
    };
    let query = uri.strip_prefix("magnet:?").ok_or_else(|| invalid.clone())?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter(|(key, _)| *key == "xt")
        .find_map(|(_, value)| value.strip_prefix(BTIH_PREFIX))
        .and_then(|digest| InfoHash::from_hex(digest).ok())
        .ok_or(invalid)
}

/// Parameters for admitting a transfer into the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTorrentParams {
    /// How the transfer is retrieved.
    pub source: TorrentSource,
    /// Directory where payload data is stored.
    pub save_path: String,
    /// Display name used before metadata arrives.
    #[serde(default)]
    pub name: Option<String>,
    /// Whether the transfer starts paused.
    #[serde(default)]
    pub paused: bool,
}

impl AddTorrentParams {
    /// Parameters for a magnet source saved under `save_path`.
    #[must_use]
    pub fn magnet(uri: impl Into<String>, save_path: impl Into<String>) -> Self {
        Self {
            source: TorrentSource::magnet(uri),
            save_path: save_path.into(),
            name: None,
            paused: false,
        }
    }

    /// Parameters joining a swarm by content hash alone.
    #[must_use]
    pub fn info_hash(info_hash: InfoHash, save_path: impl Into<String>) -> Self {
        Self {
            source: TorrentSource::InfoHash { info_hash },
            save_path: save_path.into(),
            name: None,
            paused: false,
        }
    }
}

/// Options controlling transfer removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemoveFlags {
    /// Whether payload files are deleted alongside the transfer.
    #[serde(default)]
    pub delete_files: bool,
}

/// Lifecycle states reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentState {
    /// Verifying on-disk payload.
    CheckingFiles,
    /// Waiting for metadata from peers.
    DownloadingMetadata,
    /// Actively downloading.
    Downloading,
    /// All wanted pieces downloaded; not seeding every piece.
    Finished,
    /// Complete and uploading.
    Seeding,
    /// Validating resume data.
    CheckingResumeData,
    /// State code this build does not recognise.
    Unknown,
}

impl TorrentState {
    /// Map the engine's numeric state code.
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            1 => Self::CheckingFiles,
            2 => Self::DownloadingMetadata,
            3 => Self::Downloading,
            4 => Self::Finished,
            5 => Self::Seeding,
            7 => Self::CheckingResumeData,
            _ => Self::Unknown,
        }
    }

    /// Numeric state code understood by the engine.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::CheckingFiles => 1,
            Self::DownloadingMetadata => 2,
            Self::Downloading => 3,
            Self::Finished => 4,
            Self::Seeding => 5,
            Self::CheckingResumeData => 7,
            Self::Unknown => 0,
        }
    }
}

/// Point-in-time status for a single transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentStatus {
    /// Content hash of the transfer.
    pub info_hash: InfoHash,
    /// Display name, empty until metadata is known.
    pub name: String,
    /// Current lifecycle state.
    pub state: TorrentState,
    /// Completion in the range `0.0..=1.0`.
    pub progress: f32,
    /// Download rate in bytes per second.
    pub download_rate: u64,
    /// Upload rate in bytes per second.
    pub upload_rate: u64,
    /// Connected peers.
    pub num_peers: u32,
    /// Bytes of wanted payload already verified.
    pub total_done: u64,
    /// Bytes of payload selected for download.
    pub total_wanted: u64,
    /// Whether the transfer is paused.
    pub paused: bool,
}

impl TorrentStatus {
    /// Fresh status for a transfer that has just been admitted.
    #[must_use]
    pub fn queued(info_hash: InfoHash, name: impl Into<String>, paused: bool) -> Self {
        Self {
            info_hash,
            name: name.into(),
            state: TorrentState::DownloadingMetadata,
            progress: 0.0,
            download_rate: 0,
            upload_rate: 0,
            num_peers: 0,
            total_done: 0,
            total_wanted: 0,
            paused,
        }
    }
}
