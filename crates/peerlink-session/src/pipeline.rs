//! Batch drain of the engine alert queue through the encoder registry.

use std::sync::Arc;

use peerlink_core::SessionError;
use peerlink_events::AlertRecord;
use tracing::{debug, trace, warn};

use crate::encoder::{AlertEncoder, EncoderRegistry};
use crate::engine::{EngineAlert, SessionEngine};
use crate::error::EngineError;

/// Pops engine alerts and turns them into ordered alert records.
#[derive(Debug, Default)]
pub struct AlertPipeline {
    registry: EncoderRegistry,
}

impl AlertPipeline {
    /// Pipeline with only the built-in encoder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            registry: EncoderRegistry::new(),
        }
    }

    /// Encoders consulted for every alert.
    #[must_use]
    pub const fn registry(&self) -> &EncoderRegistry {
        &self.registry
    }

    /// Append an extension encoder.
    pub fn register(&mut self, encoder: Arc<dyn AlertEncoder>) {
        self.registry.register(encoder);
    }

    /// Encode `alerts` in order, dropping the ones no encoder claims.
    pub fn encode_batch<'a, I>(&self, alerts: I) -> Vec<AlertRecord>
    where
        I: IntoIterator<Item = &'a dyn EngineAlert>,
    {
        let mut unclaimed = 0_usize;
        let records: Vec<AlertRecord> = alerts
            .into_iter()
            .filter_map(|alert| {
                let record = self.registry.encode(alert);
                if record.is_none() {
                    unclaimed += 1;
                    trace!(alert = alert.what(), "no encoder claimed alert");
                }
                record
            })
            .collect();
        if unclaimed > 0 {
            debug!(
                records = records.len(),
                unclaimed, "dropped unclaimed alerts from batch"
            );
        }
        records
    }

    /// Pop every pending alert from `engine` and encode the batch.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EngineUnavailable` when the engine can no longer
    /// hand out alerts; the session must be recreated. Any other engine failure
    /// is returned as a non-fatal `SessionError::EngineFailure`.
    pub fn drain<E: SessionEngine>(&self, engine: &mut E) -> Result<Vec<AlertRecord>, SessionError> {
        let batch = engine.pop_alerts().map_err(pop_failure)?;
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let popped = batch.len();
        let records = self.encode_batch(batch.iter().map(|alert| &**alert));
        debug!(popped, records = records.len(), "drained engine alerts");
        Ok(records)
    }
}

fn pop_failure(err: EngineError) -> SessionError {
    warn!(error = %err, reason = ?err, "failed to pop engine alerts");
    if err.is_unavailable() {
        SessionError::EngineUnavailable {
            operation: "pop_alerts",
        }
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemoryEngine;
    use crate::engine::alerts::{TorrentFinishedAlert, TorrentPausedAlert, UnknownAlert};
    use crate::settings::SettingsPack;
    use peerlink_core::{AlertCategory, InfoHash};

    fn hash(byte: u8) -> InfoHash {
        InfoHash::new([byte; 20])
    }

    #[test]
    fn encode_batch_preserves_order_and_skips_unclaimed() {
        let pipeline = AlertPipeline::new();
        let alerts: Vec<Box<dyn EngineAlert>> = vec![
            Box::new(TorrentFinishedAlert { info_hash: hash(1) }),
            Box::new(UnknownAlert {
                what: "block_finished".into(),
                category: AlertCategory::PROGRESS,
                message: String::new(),
            }),
            Box::new(TorrentPausedAlert { info_hash: hash(3) }),
        ];

        let records = pipeline.encode_batch(alerts.iter().map(|alert| &**alert));
        assert_eq!(
            records,
            vec![
                AlertRecord::TorrentFinished { info_hash: hash(1) },
                AlertRecord::TorrentPaused { info_hash: hash(3) },
            ]
        );
    }

    #[test]
    fn drain_empties_the_engine_queue() -> anyhow::Result<()> {
        let mut engine = MemoryEngine::start(&SettingsPack::session_defaults())?;
        let pipeline = AlertPipeline::new();

        let records = pipeline.drain(&mut engine)?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind(), "listen_succeeded");
        assert!(pipeline.drain(&mut engine)?.is_empty());
        Ok(())
    }

    #[test]
    fn drain_reports_a_dead_engine_as_unavailable() -> anyhow::Result<()> {
        let mut engine = MemoryEngine::start(&SettingsPack::session_defaults())?;
        engine.handle().shutdown();

        let err = AlertPipeline::new()
            .drain(&mut engine)
            .expect_err("dead engine cannot be drained");
        assert_eq!(
            err,
            SessionError::EngineUnavailable {
                operation: "pop_alerts"
            }
        );
        assert!(err.is_fatal());
        Ok(())
    }

    #[test]
    fn only_an_unavailable_engine_fails_the_drain_fatally() {
        let gone = pop_failure(EngineError::SessionUnavailable {
            operation: "pop_alerts",
        });
        assert!(gone.is_fatal());

        let hiccup = pop_failure(EngineError::NativeFailure {
            operation: "pop_alerts",
            message: "queue locked".to_string(),
        });
        assert!(!hiccup.is_fatal());
        assert!(matches!(
            hiccup,
            SessionError::EngineFailure { operation: "pop_alerts", ref message } if message == "queue locked"
        ));
    }
}
