//! Validation of loose override input into a settings pack.

use peerlink_core::SessionError;
use serde_json::Value;
use tracing::{trace, warn};

use super::{PeerFingerprint, SettingKey, SettingsPack, StrSetting};

/// Field reported when the override document itself has the wrong shape.
pub const ROOT_FIELD: &str = "<root>";

impl SettingsPack {
    /// Merge a loose override document into this pack.
    ///
    /// Recognised keys present in `overrides` replace the current entry; keys
    /// absent from `overrides` keep their value. Unknown keys and keys fixed by
    /// the session baseline are ignored. A malformed `peer_fingerprint` is
    /// skipped on its own. The merge is atomic: on error `self` is unchanged.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Validation` when `overrides` is not an object or
    /// a recognised key carries a value of the wrong type or range.
    pub fn merge(&mut self, overrides: &Value) -> Result<(), SessionError> {
        let entries = overrides
            .as_object()
            .ok_or_else(|| SessionError::validation(ROOT_FIELD, "settings must be an object"))?;

        let mut staged = self.clone();
        for (name, value) in entries {
            let Some(key) = SettingKey::from_name(name).filter(|key| key.accepts_overrides())
            else {
                trace!(setting = %name, "ignoring unrecognised setting");
                continue;
            };
            staged.apply_override(key, value)?;
        }
        *self = staged;
        Ok(())
    }

    fn apply_override(&mut self, key: SettingKey, value: &Value) -> Result<(), SessionError> {
        match key {
            SettingKey::Str(StrSetting::PeerFingerprint) => {
                match PeerFingerprint::from_value(value) {
                    Ok(fingerprint) => {
                        self.set_str(StrSetting::PeerFingerprint, fingerprint.to_string());
                    }
                    Err(err) => {
                        warn!(error = %err, reason = ?err, "skipping malformed peer_fingerprint override");
                    }
                }
            }
            SettingKey::Str(key) => {
                let text = value
                    .as_str()
                    .ok_or_else(|| SessionError::validation(key.name(), "must be a string"))?;
                self.set_str(key, text);
            }
            SettingKey::Int(key) => {
                let number = value
                    .as_i64()
                    .ok_or_else(|| SessionError::validation(key.name(), "must be an integer"))?;
                if !key.range().contains(&number) {
                    return Err(SessionError::validation(key.name(), "out of range"));
                }
                self.set_int(key, number);
            }
            SettingKey::Bool(key) => {
                let flag = value
                    .as_bool()
                    .ok_or_else(|| SessionError::validation(key.name(), "must be a boolean"))?;
                self.set_bool(key, flag);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{BoolSetting, IntSetting};
    use peerlink_core::AlertCategory;
    use serde_json::json;

    #[test]
    fn omitted_keys_keep_their_baseline_value() -> anyhow::Result<()> {
        let baseline = SettingsPack::session_defaults();
        let overrides = [
            json!({"enable_dht": true}),
            json!({"user_agent": "other"}),
            json!({"proxy_port": 8080, "proxy_hostname": "proxy.local"}),
        ];
        for partial in overrides {
            let mut merged = baseline.clone();
            merged.merge(&partial)?;
            for (name, value) in baseline.iter() {
                if partial.get(name).is_none() {
                    let key = SettingKey::from_name(name).expect("baseline keys are known");
                    assert_eq!(merged.get(key), Some(value), "{name} changed");
                }
            }
        }
        Ok(())
    }

    #[test]
    fn recognised_keys_overwrite() -> anyhow::Result<()> {
        let mut pack = SettingsPack::session_defaults();
        pack.merge(&json!({
            "listen_interfaces": "127.0.0.1:0",
            "outgoing_interfaces": "eth0",
            "proxy_type": 5,
            "proxy_hostname": "proxy.local",
            "proxy_username": "user",
            "proxy_password": "secret",
            "proxy_port": 3128,
            "i2p_port": 7656,
            "enable_dht": true,
            "allow_multiple_connections_per_ip": true,
            "enable_upnp": true,
            "enable_natpmp": true,
            "enable_lsd": true,
            "anonymous_mode": true,
            "force_proxy": true,
            "user_agent": "Custom/1.0",
            "alert_mask": 0x41,
            "peer_fingerprint": {"name": "JS", "major": 1, "minor": 2, "revision": 3, "tag": 4}
        }))?;

        assert_eq!(pack.get_str(StrSetting::ListenInterfaces), Some("127.0.0.1:0"));
        assert_eq!(pack.get_str(StrSetting::OutgoingInterfaces), Some("eth0"));
        assert_eq!(pack.get_int(IntSetting::ProxyType), Some(5));
        assert_eq!(pack.get_int(IntSetting::ProxyPort), Some(3128));
        assert_eq!(pack.get_int(IntSetting::I2pPort), Some(7656));
        assert_eq!(pack.get_bool(BoolSetting::EnableDht), Some(true));
        assert_eq!(pack.get_bool(BoolSetting::ForceProxy), Some(true));
        assert_eq!(pack.get_str(StrSetting::UserAgent), Some("Custom/1.0"));
        assert_eq!(pack.get_str(StrSetting::PeerFingerprint), Some("-JS1234-"));
        assert_eq!(
            pack.alert_mask(),
            Some(AlertCategory::ERROR | AlertCategory::STATUS)
        );
        Ok(())
    }

    #[test]
    fn non_object_input_is_rejected() {
        for input in [json!(null), json!([1, 2]), json!("enable_dht"), json!(7)] {
            let err = SettingsPack::new()
                .merge(&input)
                .expect_err("non-object input must fail");
            assert_eq!(
                err,
                SessionError::validation(ROOT_FIELD, "settings must be an object")
            );
        }
    }

    #[test]
    fn type_mismatch_fails_atomically() {
        let mut pack = SettingsPack::session_defaults();
        let before = pack.clone();
        let err = pack
            .merge(&json!({"enable_dht": true, "proxy_port": "8080"}))
            .expect_err("string port must fail");
        assert_eq!(err, SessionError::validation("proxy_port", "must be an integer"));
        assert_eq!(pack, before);

        for (input, field, reason) in [
            (json!({"enable_lsd": 1}), "enable_lsd", "must be a boolean"),
            (json!({"user_agent": false}), "user_agent", "must be a string"),
            (json!({"proxy_port": 70_000}), "proxy_port", "out of range"),
            (json!({"proxy_type": 7}), "proxy_type", "out of range"),
            (json!({"alert_mask": -1}), "alert_mask", "out of range"),
            (json!({"i2p_port": 1.5}), "i2p_port", "must be an integer"),
        ] {
            let err = pack.merge(&input).expect_err("invalid value must fail");
            assert_eq!(err, SessionError::validation(field, reason));
        }
        assert_eq!(pack, before);
    }

    #[test]
    fn unknown_and_baseline_only_keys_are_ignored() -> anyhow::Result<()> {
        let mut pack = SettingsPack::session_defaults();
        let before = pack.clone();
        pack.merge(&json!({
            "cache_size": 1024,
            "alert_queue_size": 10,
            "dht_bootstrap_nodes": "localhost:1",
            "totally_unknown": {"nested": true}
        }))?;
        assert_eq!(pack, before);
        Ok(())
    }

    #[test]
    fn malformed_fingerprint_is_skipped_without_failing_the_merge() -> anyhow::Result<()> {
        let mut pack = SettingsPack::session_defaults();
        pack.merge(&json!({
            "peer_fingerprint": {"name": "JS", "major": 99, "minor": 0, "revision": 0, "tag": 0},
            "enable_dht": true
        }))?;
        assert_eq!(pack.get_str(StrSetting::PeerFingerprint), Some("-PL0000-"));
        assert_eq!(pack.get_bool(BoolSetting::EnableDht), Some(true));

        pack.merge(&json!({"peer_fingerprint": "-XX0000-"}))?;
        assert_eq!(pack.get_str(StrSetting::PeerFingerprint), Some("-PL0000-"));
        Ok(())
    }

    #[test]
    fn empty_object_is_a_no_op() -> anyhow::Result<()> {
        let mut pack = SettingsPack::new();
        pack.merge(&json!({}))?;
        assert!(pack.is_empty());

        let mut defaults = SettingsPack::session_defaults();
        defaults.merge(&json!({}))?;
        assert_eq!(defaults, SettingsPack::session_defaults());
        Ok(())
    }
}
