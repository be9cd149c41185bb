#![cfg(feature = "libtorrent")]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use peerlink_core::{AddTorrentParams, InfoHash, RemoveFlags, SessionControl};
use peerlink_events::{AlertBus, AlertRecord};
use peerlink_session::{
    BuiltinAlertEncoder, Extension, NativeEngine, NativePlugin, Session, SessionService,
};
use serde_json::json;
use tempfile::TempDir;
use tokio::time::timeout;

const MAGNET_URI: &str = "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567&dn=demo";

fn overrides() -> serde_json::Value {
    json!({
        "listen_interfaces": "127.0.0.1:0",
        "enable_dht": false,
        "enable_lsd": false,
    })
}

#[test]
fn native_session_round_trips_a_magnet() -> Result<()> {
    if env::var("PEERLINK_NATIVE_IT").is_err() {
        return Ok(());
    }

    let download = TempDir::new().context("temp download dir")?;
    let save_path = download.path().to_string_lossy().into_owned();
    let mut session = Session::<NativeEngine>::create(Some(&overrides())).context("create")?;
    session
        .register_extension(Extension::new(
            NativePlugin::UtMetadata,
            Arc::new(BuiltinAlertEncoder),
        ))
        .context("register ut_metadata")?;

    let handle = session
        .add_torrent(&AddTorrentParams::magnet(MAGNET_URI, save_path))
        .context("add torrent")?;
    let info_hash = handle.info_hash().context("valid handle")?;
    assert_eq!(session.find_torrent(&info_hash)?, handle);
    assert!(!session.find_torrent(&InfoHash::new([0xab; 20]))?.is_valid());

    session.pause()?;
    assert!(session.is_paused()?);
    session.resume()?;
    assert!(!session.is_paused()?);

    session
        .remove_torrent(&handle, RemoveFlags::default())
        .context("remove torrent")?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn native_service_publishes_torrent_added() -> Result<()> {
    if env::var("PEERLINK_NATIVE_IT").is_err() {
        return Ok(());
    }

    let download = TempDir::new().context("temp download dir")?;
    let session = Session::<NativeEngine>::create(Some(&overrides())).context("create")?;
    let service = SessionService::spawn(session, AlertBus::with_capacity(64))?;
    let mut stream = service.subscribe(None);

    let handle = service
        .add_torrent(AddTorrentParams::magnet(
            MAGNET_URI,
            download.path().to_string_lossy().into_owned(),
        ))
        .await
        .context("add torrent")?;

    let mut saw_added = false;
    let window = Duration::from_secs(15);
    while !saw_added {
        match timeout(window, stream.next()).await {
            Ok(Some(envelope)) => {
                if let AlertRecord::TorrentAdded { info_hash, .. } = envelope.alert {
                    saw_added = Some(info_hash) == handle.info_hash();
                }
            }
            _ => break,
        }
    }

    assert!(saw_added, "did not observe torrent added record");
    service.shutdown().await?;
    Ok(())
}
