use std::io::{self, Write};
use std::time::Duration;

use peerlink_core::{AddTorrentParams, SessionControl};
use peerlink_events::{AlertBus, AlertStream};
use peerlink_session::{Session, SessionService};
use serde_json::Value;
use tokio::signal;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use crate::cli::RunArgs;
use crate::error::CliResult;
use crate::output::write_json_line;

#[cfg(feature = "libtorrent")]
type Engine = peerlink_session::NativeEngine;
#[cfg(not(feature = "libtorrent"))]
type Engine = peerlink_session::MemoryEngine;

pub(crate) async fn handle_run(overrides: Option<&Value>, args: RunArgs) -> CliResult<()> {
    let session = Session::<Engine>::create(overrides)?;
    let bus = AlertBus::new();
    let mut stream = bus.subscribe(None);
    let service = SessionService::spawn(session, bus)?;
    info!(session_id = %service.id(), magnets = args.magnets.len(), "session running");

    for magnet in &args.magnets {
        let params = AddTorrentParams::magnet(magnet.as_str(), args.save_path.as_str());
        let handle = service.add_torrent(params).await?;
        debug!(info_hash = ?handle.info_hash(), "magnet added");
    }

    let deadline = Instant::now() + Duration::from_secs(args.duration_secs);
    let mut stdout = io::stdout();
    tokio::select! {
        printed = stream_until(&mut stream, deadline, &mut stdout) => {
            debug!(records = printed?, "run window elapsed");
        }
        interrupted = signal::ctrl_c() => {
            if let Err(err) = interrupted {
                warn!(error = %err, "failed to listen for interrupt");
            }
            info!("interrupted");
        }
    }

    service.shutdown().await?;
    while let Some(envelope) = stream.next().await {
        write_json_line(&mut stdout, &envelope)?;
    }
    Ok(())
}

/// Print records from `stream` as JSON lines until `deadline` or until the bus closes.
pub(crate) async fn stream_until<W: Write>(
    stream: &mut AlertStream,
    deadline: Instant,
    out: &mut W,
) -> CliResult<usize> {
    let mut printed = 0;
    while let Ok(Some(envelope)) = timeout_at(deadline, stream.next()).await {
        write_json_line(out, &envelope)?;
        printed += 1;
    }
    Ok(printed)
}
