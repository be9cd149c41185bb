//! Alert bus routing helpers.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::broadcast::{self, Receiver, Sender, error::RecvError};

use crate::payloads::{AlertEnvelope, AlertId, AlertRecord, DEFAULT_REPLAY_CAPACITY};

/// Shared alert bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct AlertBus {
    sender: Sender<AlertEnvelope>,
    replay: Arc<Mutex<VecDeque<AlertEnvelope>>>,
    replay_capacity: usize,
    next_id: Arc<AtomicU64>,
}

impl AlertBus {
    /// Construct a bus whose broadcast channel and replay ring share `capacity`.
    ///
    /// A zero capacity is clamped to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            replay: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            replay_capacity: capacity,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Construct a bus with the default replay capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Publish a record produced by `session`, returning its assigned id.
    ///
    /// Publishing never blocks; records sent while nobody is subscribed only
    /// land in the replay ring.
    pub fn publish(&self, session: &str, alert: AlertRecord) -> AlertId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = AlertEnvelope {
            id,
            session: session.to_string(),
            timestamp: Utc::now(),
            alert,
        };
        {
            let mut replay = self.lock_replay();
            if replay.len() == self.replay_capacity {
                let _ = replay.pop_front();
            }
            replay.push_back(envelope.clone());
        }
        let _ = self.sender.send(envelope);
        id
    }

    /// Subscribe to the bus, replaying buffered records newer than `since_id`.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<AlertId>) -> AlertStream {
        let receiver = self.sender.subscribe();
        let backlog = since_id.map_or_else(VecDeque::new, |since| {
            self.lock_replay()
                .iter()
                .filter(|env| env.id > since)
                .cloned()
                .collect()
        });
        AlertStream {
            backlog,
            receiver,
            last_seen: since_id,
        }
    }

    /// Last id held in the replay ring, if any record has been published.
    #[must_use]
    pub fn last_alert_id(&self) -> Option<AlertId> {
        self.lock_replay().back().map(|env| env.id)
    }

    /// Records in the replay ring newer than `id`.
    #[must_use]
    pub fn backlog_since(&self, id: AlertId) -> Vec<AlertEnvelope> {
        self.lock_replay()
            .iter()
            .filter(|env| env.id > id)
            .cloned()
            .collect()
    }

    fn lock_replay(&self) -> MutexGuard<'_, VecDeque<AlertEnvelope>> {
        self.replay.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for AlertBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AlertBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertBus")
            .field("replay_capacity", &self.replay_capacity)
            .field("subscribers", &self.sender.receiver_count())
            .field("last_alert_id", &self.last_alert_id())
            .finish()
    }
}

/// Subscriber view yielding replayed records first, then live ones.
pub struct AlertStream {
    backlog: VecDeque<AlertEnvelope>,
    receiver: Receiver<AlertEnvelope>,
    last_seen: Option<AlertId>,
}

impl AlertStream {
    /// Receive the next record; `None` once the bus is gone.
    ///
    /// Records already delivered from the backlog are not repeated when they
    /// also arrive over the live channel. A lagging subscriber skips the
    /// records it missed.
    pub async fn next(&mut self) -> Option<AlertEnvelope> {
        if let Some(envelope) = self.backlog.pop_front() {
            self.last_seen = Some(envelope.id);
            return Some(envelope);
        }

        loop {
            match self.receiver.recv().await {
                Ok(envelope) => {
                    if self.last_seen.is_some_and(|seen| envelope.id <= seen) {
                        continue;
                    }
                    self.last_seen = Some(envelope.id);
                    return Some(envelope);
                }
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
