use std::sync::Arc;

use anyhow::Result;
use peerlink_core::{AddTorrentParams, AlertCategory, InfoHash, SessionError};
use peerlink_events::AlertRecord;
use peerlink_session::engine::alerts::{TorrentFinishedAlert, UnknownAlert};
use peerlink_session::{
    AlertBatch, AlertEncoder, EngineAlert, Extension, MemoryEngine, MemoryPlugin,
    PeerFingerprint, Session, StrSetting,
};
use serde_json::json;

type MemorySession = Session<MemoryEngine>;

const MAGNET_URI: &str = "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567&dn=demo";

/// Plugin that posts one `tracker_ping` alert for every admitted torrent.
struct TrackerPingPlugin;

impl MemoryPlugin for TrackerPingPlugin {
    fn name(&self) -> &str {
        "ping"
    }

    fn on_torrent_added(&mut self, info_hash: &InfoHash) -> AlertBatch {
        vec![Box::new(UnknownAlert {
            what: "tracker_ping".to_string(),
            category: AlertCategory::STATUS,
            message: info_hash.to_hex(),
        })]
    }
}

/// Encoder claiming alerts by engine name.
struct NamedEncoder {
    name: &'static str,
    claims: &'static str,
}

impl AlertEncoder for NamedEncoder {
    fn name(&self) -> &str {
        self.name
    }

    fn try_encode(&self, alert: &dyn EngineAlert) -> Option<AlertRecord> {
        (alert.what() == self.claims).then(|| AlertRecord::Extension {
            extension: self.name.to_string(),
            name: alert.what().to_string(),
            payload: json!({ "message": alert.message() }),
        })
    }
}

fn named(name: &'static str, claims: &'static str) -> Arc<dyn AlertEncoder> {
    Arc::new(NamedEncoder { name, claims })
}

fn no_plugin() -> Box<dyn MemoryPlugin> {
    struct Silent;
    impl MemoryPlugin for Silent {
        fn name(&self) -> &str {
            "silent"
        }

        fn on_torrent_added(&mut self, _info_hash: &InfoHash) -> AlertBatch {
            Vec::new()
        }
    }
    Box::new(Silent)
}

#[test]
fn omitted_keys_survive_a_partial_update() -> Result<()> {
    let mut session = MemorySession::create(Some(&json!({ "user_agent": "First/1" })))?;
    session.apply_settings(&json!({
        "peer_fingerprint": { "name": "XX", "major": 1, "minor": 0, "revision": 0, "tag": 0 }
    }))?;

    let settings = session.engine().settings();
    assert_eq!(settings.get_str(StrSetting::UserAgent), Some("First/1"));
    assert_eq!(settings.get_str(StrSetting::PeerFingerprint), Some("-XX1000-"));
    Ok(())
}

#[test]
fn empty_update_changes_nothing() -> Result<()> {
    let mut session = MemorySession::create(None)?;
    let before = session.engine().settings();
    session.apply_settings(&json!({}))?;
    assert_eq!(session.engine().settings(), before);
    assert!(session.pop_alerts()?.iter().all(|record| record.kind() == "listen_succeeded"));
    Ok(())
}

#[test]
fn fingerprint_object_is_encoded_before_reaching_the_engine() -> Result<()> {
    let session = MemorySession::create(Some(&json!({
        "peer_fingerprint": { "name": "JS", "major": 1, "minor": 2, "revision": 3, "tag": 4 }
    })))?;
    assert_eq!(
        session.engine().settings().get_str(StrSetting::PeerFingerprint),
        Some("-JS1234-")
    );

    let encoded = PeerFingerprint::new("JS", 1, 2, 3, 4)?.to_string();
    assert_eq!(encoded.len(), 8);
    assert!(encoded.starts_with('-') && encoded.ends_with('-'));
    Ok(())
}

#[test]
fn unknown_keys_are_ignored_and_bad_values_reject_the_whole_update() -> Result<()> {
    let mut session = MemorySession::create(None)?;
    session.apply_settings(&json!({ "user_agent": "Changed/1", "not_a_setting": 1 }))?;
    let before = session.engine().settings();
    assert_eq!(before.get_str(StrSetting::UserAgent), Some("Changed/1"));

    let err = session
        .apply_settings(&json!({ "user_agent": "Again/2", "enable_dht": "yes" }))
        .expect_err("a string flag must fail");
    assert!(matches!(err, SessionError::Validation { .. }));
    assert_eq!(session.engine().settings(), before);
    Ok(())
}

#[test]
fn malformed_fingerprint_is_skipped_alone() -> Result<()> {
    let mut session = MemorySession::create(None)?;
    session.apply_settings(&json!({
        "peer_fingerprint": { "name": "TOO_LONG", "major": 1, "minor": 0, "revision": 0, "tag": 0 },
        "user_agent": "Kept/1"
    }))?;
    let settings = session.engine().settings();
    assert_eq!(settings.get_str(StrSetting::PeerFingerprint), Some("-PL0000-"));
    assert_eq!(settings.get_str(StrSetting::UserAgent), Some("Kept/1"));
    Ok(())
}

#[test]
fn first_matching_encoder_wins() -> Result<()> {
    let mut session = MemorySession::create(None)?;
    session.register_extension(Extension::new(no_plugin(), named("first", "tracker_ping")))?;
    session.register_extension(Extension::new(no_plugin(), named("second", "tracker_ping")))?;
    let poster = session.engine().handle();
    session.pop_alerts()?;

    poster.post(UnknownAlert {
        what: "tracker_ping".to_string(),
        category: AlertCategory::STATUS,
        message: "hello".to_string(),
    });

    let records = session.pop_alerts()?;
    assert_eq!(records.len(), 1);
    assert!(matches!(
        &records[0],
        AlertRecord::Extension { extension, .. } if extension == "first"
    ));
    assert_eq!(session.encoder_names(), vec!["first", "second", "builtin"]);
    Ok(())
}

#[test]
fn drain_keeps_order_and_skips_unclaimed_alerts() -> Result<()> {
    let mut session = MemorySession::create(None)?;
    let handle = session.engine().handle();
    session.pop_alerts()?;

    let first = InfoHash::new([1; 20]);
    let second = InfoHash::new([2; 20]);
    handle.post(TorrentFinishedAlert { info_hash: first });
    handle.post(UnknownAlert {
        what: "nobody_knows".to_string(),
        category: AlertCategory::STATUS,
        message: String::new(),
    });
    handle.post(TorrentFinishedAlert { info_hash: second });

    let records = session.pop_alerts()?;
    assert_eq!(
        records,
        vec![
            AlertRecord::TorrentFinished { info_hash: first },
            AlertRecord::TorrentFinished { info_hash: second },
        ]
    );
    assert_eq!(handle.pending(), 0);
    assert!(session.pop_alerts()?.is_empty());
    Ok(())
}

#[test]
fn extension_alerts_become_exactly_one_record() -> Result<()> {
    let mut session = MemorySession::create(None)?;
    session.register_extension(Extension::new(
        Box::new(TrackerPingPlugin),
        named("ping", "tracker_ping"),
    ))?;
    session.register_extension(Extension::new(no_plugin(), named("other", "other_ping")))?;
    assert_eq!(session.engine().plugin_names(), vec!["ping", "silent"]);
    session.pop_alerts()?;

    let handle = session.add_torrent(&AddTorrentParams::magnet(MAGNET_URI, "/tmp/peerlink"))?;
    assert!(handle.is_valid());

    let records = session.pop_alerts()?;
    let pings: Vec<_> = records
        .iter()
        .filter(|record| matches!(record, AlertRecord::Extension { .. }))
        .collect();
    assert_eq!(pings.len(), 1);
    assert!(matches!(
        pings[0],
        AlertRecord::Extension { extension, name, .. }
            if extension == "ping" && name == "tracker_ping"
    ));
    assert_eq!(records.first().map(AlertRecord::kind), Some("torrent_added"));
    Ok(())
}

#[test]
fn unknown_hash_is_an_invalid_handle_not_an_error() -> Result<()> {
    let mut session = MemorySession::create(None)?;
    let added = session.add_torrent(&AddTorrentParams::magnet(MAGNET_URI, "/tmp/peerlink"))?;
    let known = added.info_hash().expect("added handle carries a hash");

    assert_eq!(session.find_torrent(&known)?, added);
    assert!(!session.find_torrent(&InfoHash::new([0xee; 20]))?.is_valid());
    Ok(())
}

#[test]
fn notify_wakes_the_owner_once_per_batch() -> Result<()> {
    let mut session = MemorySession::create(None)?;
    let mut signal = session.set_alert_notify()?;
    assert!(signal.try_wait(), "pending listen alert must wake immediately");
    session.pop_alerts()?;

    let handle = session.engine().handle();
    handle.post(TorrentFinishedAlert { info_hash: InfoHash::new([4; 20]) });
    handle.post(TorrentFinishedAlert { info_hash: InfoHash::new([5; 20]) });
    assert!(signal.try_wait());
    assert!(!signal.try_wait());
    assert_eq!(session.pop_alerts()?.len(), 2);
    Ok(())
}
