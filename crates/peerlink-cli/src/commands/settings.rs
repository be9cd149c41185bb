use std::io;

use peerlink_session::{PeerFingerprint, SettingsPack};
use serde_json::Value;

use crate::cli::FingerprintArgs;
use crate::error::{CliError, CliResult};
use crate::output::write_json_pretty;

/// Session baseline with `overrides` merged in.
pub(crate) fn effective_settings(overrides: Option<&Value>) -> CliResult<SettingsPack> {
    let mut pack = SettingsPack::session_defaults();
    if let Some(overrides) = overrides {
        pack.merge(overrides)?;
    }
    Ok(pack)
}

pub(crate) fn handle_defaults(overrides: Option<&Value>) -> CliResult<()> {
    let pack = effective_settings(overrides)?;
    write_json_pretty(&mut io::stdout().lock(), &pack)
}

pub(crate) fn encode_fingerprint(args: &FingerprintArgs) -> CliResult<String> {
    PeerFingerprint::new(&args.name, args.major, args.minor, args.revision, args.tag)
        .map(|fingerprint| fingerprint.to_string())
        .map_err(|err| CliError::validation(format!("invalid fingerprint: {err}")))
}

pub(crate) fn handle_fingerprint(args: &FingerprintArgs) -> CliResult<()> {
    println!("{}", encode_fingerprint(args)?);
    Ok(())
}
