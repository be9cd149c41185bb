//! Peer-id fingerprint prefix (`-XXabcd-`).

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

/// Largest value a single version component can encode.
pub const MAX_VERSION_COMPONENT: u8 = 35;

const ENCODED_LEN: usize = 8;

/// Reasons a fingerprint could not be built.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintError {
    /// The override was not a JSON object.
    #[error("peer fingerprint must be an object")]
    NotObject,
    /// The client id was missing or not two ASCII alphanumerics.
    #[error("peer fingerprint name is invalid")]
    InvalidName,
    /// A version component was missing, not an integer, or above 35.
    #[error("peer fingerprint version is invalid")]
    InvalidVersion {
        /// Component that failed.
        component: &'static str,
    },
    /// An encoded fingerprint string had the wrong layout.
    #[error("peer fingerprint encoding is invalid")]
    InvalidEncoding,
}

/// Client id plus four version components, rendered as the 8 character peer-id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerFingerprint {
    name: [u8; 2],
    major: u8,
    minor: u8,
    revision: u8,
    tag: u8,
}

impl PeerFingerprint {
    /// Build a fingerprint.
    ///
    /// # Errors
    ///
    /// Returns `FingerprintError::InvalidName` unless `name` is two ASCII
    /// alphanumerics, and `FingerprintError::InvalidVersion` for components above 35.
    pub fn new(
        name: &str,
        major: u8,
        minor: u8,
        revision: u8,
        tag: u8,
    ) -> Result<Self, FingerprintError> {
        let bytes: [u8; 2] = name
            .as_bytes()
            .try_into()
            .map_err(|_| FingerprintError::InvalidName)?;
        if !bytes.iter().all(u8::is_ascii_alphanumeric) {
            return Err(FingerprintError::InvalidName);
        }
        for (component, value) in [
            ("major", major),
            ("minor", minor),
            ("revision", revision),
            ("tag", tag),
        ] {
            if value > MAX_VERSION_COMPONENT {
                return Err(FingerprintError::InvalidVersion { component });
            }
        }
        Ok(Self {
            name: bytes,
            major,
            minor,
            revision,
            tag,
        })
    }

    /// Parse the `{name, major, minor, revision, tag}` override object.
    ///
    /// # Errors
    ///
    /// Returns a `FingerprintError` describing the first malformed field.
    pub fn from_value(value: &Value) -> Result<Self, FingerprintError> {
        let object = value.as_object().ok_or(FingerprintError::NotObject)?;
        let name = object
            .get("name")
            .and_then(Value::as_str)
            .ok_or(FingerprintError::InvalidName)?;
        let component = |field: &'static str| {
            object
                .get(field)
                .and_then(Value::as_u64)
                .and_then(|raw| u8::try_from(raw).ok())
                .ok_or(FingerprintError::InvalidVersion { component: field })
        };
        Self::new(
            name,
            component("major")?,
            component("minor")?,
            component("revision")?,
            component("tag")?,
        )
    }

    /// Two character client id.
    #[must_use]
    pub fn name(&self) -> &str {
        std::str::from_utf8(&self.name).unwrap_or_default()
    }

    /// Version components `(major, minor, revision, tag)`.
    #[must_use]
    pub const fn version(&self) -> (u8, u8, u8, u8) {
        (self.major, self.minor, self.revision, self.tag)
    }
}

const fn version_char(value: u8) -> char {
    if value < 10 {
        (b'0' + value) as char
    } else {
        (b'A' + value - 10) as char
    }
}

const fn version_value(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'A'..=b'Z' => Some(ch - b'A' + 10),
        _ => None,
    }
}

impl fmt::Display for PeerFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "-{}{}{}{}{}-",
            self.name(),
            version_char(self.major),
            version_char(self.minor),
            version_char(self.revision),
            version_char(self.tag)
        )
    }
}

impl FromStr for PeerFingerprint {
    type Err = FingerprintError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let bytes = value.as_bytes();
        if bytes.len() != ENCODED_LEN || bytes[0] != b'-' || bytes[ENCODED_LEN - 1] != b'-' {
            return Err(FingerprintError::InvalidEncoding);
        }
        let name = value
            .get(1..3)
            .ok_or(FingerprintError::InvalidEncoding)?;
        let mut version = [0_u8; 4];
        for (slot, ch) in version.iter_mut().zip(&bytes[3..7]) {
            *slot = version_value(*ch).ok_or(FingerprintError::InvalidEncoding)?;
        }
        Self::new(name, version[0], version[1], version[2], version[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encodes_fixed_layout() -> anyhow::Result<()> {
        let fingerprint = PeerFingerprint::from_value(&json!({
            "name": "JS", "major": 1, "minor": 2, "revision": 3, "tag": 4
        }))?;
        assert_eq!(fingerprint.to_string(), "-JS1234-");
        Ok(())
    }

    #[test]
    fn round_trips_across_the_version_alphabet() -> anyhow::Result<()> {
        for (name, version) in [
            ("PL", (0, 0, 0, 0)),
            ("lt", (9, 10, 11, 35)),
            ("A1", (35, 0, 17, 9)),
        ] {
            let original = PeerFingerprint::new(name, version.0, version.1, version.2, version.3)?;
            let encoded = original.to_string();
            assert_eq!(encoded.len(), 8);
            let parsed: PeerFingerprint = encoded.parse()?;
            assert_eq!(parsed, original);
            assert_eq!(parsed.name(), name);
            assert_eq!(parsed.version(), version);
        }
        assert_eq!(PeerFingerprint::new("lt", 9, 10, 11, 35)?.to_string(), "-lt9ABZ-");
        Ok(())
    }

    #[test]
    fn rejects_malformed_shapes() {
        let cases = [
            (json!("-JS1234-"), FingerprintError::NotObject),
            (
                json!({"major": 1, "minor": 2, "revision": 3, "tag": 4}),
                FingerprintError::InvalidName,
            ),
            (
                json!({"name": "JSX", "major": 1, "minor": 2, "revision": 3, "tag": 4}),
                FingerprintError::InvalidName,
            ),
            (
                json!({"name": "J-", "major": 1, "minor": 2, "revision": 3, "tag": 4}),
                FingerprintError::InvalidName,
            ),
            (
                json!({"name": "JS", "major": 36, "minor": 2, "revision": 3, "tag": 4}),
                FingerprintError::InvalidVersion { component: "major" },
            ),
            (
                json!({"name": "JS", "major": 1, "minor": "2", "revision": 3, "tag": 4}),
                FingerprintError::InvalidVersion { component: "minor" },
            ),
            (
                json!({"name": "JS", "major": 1, "minor": 2, "revision": 3}),
                FingerprintError::InvalidVersion { component: "tag" },
            ),
        ];
        for (value, expected) in cases {
            assert_eq!(PeerFingerprint::from_value(&value), Err(expected), "{value}");
        }
    }

    #[test]
    fn rejects_malformed_encodings() {
        for (encoded, expected) in [
            ("JS1234", FingerprintError::InvalidEncoding),
            ("-JS1234", FingerprintError::InvalidEncoding),
            ("-JS12a4-", FingerprintError::InvalidEncoding),
            ("-JS12345-", FingerprintError::InvalidEncoding),
            ("-J$1234-", FingerprintError::InvalidName),
        ] {
            assert_eq!(encoded.parse::<PeerFingerprint>(), Err(expected), "{encoded}");
        }
    }
}
