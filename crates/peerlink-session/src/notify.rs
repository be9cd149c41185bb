//! Cross-thread "alerts pending" wake-up between the engine and the session owner.
//!
//! The engine calls the armed callback from its own thread. The callback only
//! pushes a token into a capacity-1 channel; the consumer side observes the
//! token through [`AlertSignal`] and drains the session on its own context.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::trace;

use crate::engine::SessionEngine;
use crate::error::EngineError;

/// Wake-up callback handed to an engine.
#[derive(Clone)]
pub struct AlertNotify(Arc<dyn Fn() + Send + Sync>);

impl AlertNotify {
    /// Wrap a callback.
    pub fn new(callback: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(callback))
    }

    /// Invoke the callback.
    pub fn notify(&self) {
        (self.0)();
    }
}

impl fmt::Debug for AlertNotify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertNotify").finish_non_exhaustive()
    }
}

/// Owner of a session's single wake-up slot.
#[derive(Debug, Default)]
pub struct NotificationBridge {
    armed: bool,
}

impl NotificationBridge {
    /// Bridge with nothing armed.
    #[must_use]
    pub const fn new() -> Self {
        Self { armed: false }
    }

    /// Install a fresh wake-up callback on `engine` and return its consumer side.
    ///
    /// Re-arming replaces the previous callback; the previous [`AlertSignal`]
    /// then reports closure once the engine drops the old callback.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine refuses the callback.
    pub fn arm<E: SessionEngine>(&mut self, engine: &mut E) -> Result<AlertSignal, EngineError> {
        let (sender, receiver) = mpsc::channel(1);
        let notify = AlertNotify::new(move || match sender.try_send(()) {
            Ok(()) => trace!("alert wake-up queued"),
            Err(TrySendError::Full(())) => {}
            Err(TrySendError::Closed(())) => trace!("alert consumer gone"),
        });
        engine.set_alert_notify(notify)?;
        self.armed = true;
        Ok(AlertSignal { receiver })
    }

    /// Whether a callback has been installed.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.armed
    }
}

/// Consumer side of an armed wake-up slot.
///
/// At most one token is buffered; wake-ups raised while a token is pending
/// coalesce into it.
#[derive(Debug)]
pub struct AlertSignal {
    receiver: mpsc::Receiver<()>,
}

impl AlertSignal {
    /// Wait for the next wake-up; `false` once the callback has been dropped.
    pub async fn wait(&mut self) -> bool {
        self.receiver.recv().await.is_some()
    }

    /// Consume a pending wake-up without waiting.
    pub fn try_wait(&mut self) -> bool {
        self.receiver.try_recv().is_ok()
    }

    /// Block the current thread until the next wake-up; `false` once the callback has been dropped.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context.
    pub fn blocking_wait(&mut self) -> bool {
        self.receiver.blocking_recv().is_some()
    }

    /// Run `callback` on a runtime task for every wake-up until the slot closes.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn forward_to<F>(mut self, mut callback: F) -> JoinHandle<()>
    where
        F: FnMut() + Send + 'static,
    {
        tokio::spawn(async move {
            while self.wait().await {
                callback();
            }
            trace!("alert signal closed");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineAlert, MemoryEngine};
    use crate::engine::alerts::TorrentFinishedAlert;
    use crate::settings::SettingsPack;
    use peerlink_core::InfoHash;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;
    use tokio::time::timeout;

    fn engine() -> MemoryEngine {
        MemoryEngine::start(&SettingsPack::session_defaults()).expect("memory engine starts")
    }

    #[test]
    fn notify_invokes_the_wrapped_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let notify = AlertNotify::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        notify.clone().notify();
        notify.notify();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn pending_alerts_wake_the_signal_immediately() {
        let mut engine = engine();
        let mut bridge = NotificationBridge::new();
        assert!(!bridge.is_armed());

        let mut signal = bridge.arm(&mut engine).expect("arm succeeds");
        assert!(bridge.is_armed());
        assert!(
            timeout(Duration::from_secs(1), signal.wait())
                .await
                .expect("startup alerts should raise a wake-up")
        );
        assert!(!signal.try_wait());
    }

    #[tokio::test]
    async fn rearming_closes_the_previous_signal() {
        let mut engine = engine();
        let mut bridge = NotificationBridge::new();
        let mut first = bridge.arm(&mut engine).expect("first arm");
        let _ = first.try_wait();
        let _second = bridge.arm(&mut engine).expect("second arm");

        assert!(
            !timeout(Duration::from_secs(1), first.wait())
                .await
                .expect("closed signal resolves")
        );
    }

    #[tokio::test]
    async fn forward_to_runs_callback_on_the_consumer_task() {
        let mut engine = engine();
        let handle = engine.handle();
        let mut bridge = NotificationBridge::new();
        let signal = bridge.arm(&mut engine).expect("arm succeeds");

        let (tx, mut rx) = mpsc::unbounded_channel();
        let task = signal.forward_to(move || {
            let _ = tx.send(());
        });

        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("callback forwarded")
            .expect("forwarder alive");

        handle.shutdown();
        timeout(Duration::from_secs(1), task)
            .await
            .expect("forwarder exits after shutdown")
            .expect("forwarder task panicked");
    }

    fn armed_and_drained(engine: &mut MemoryEngine) -> AlertSignal {
        let mut signal = NotificationBridge::new()
            .arm(engine)
            .expect("arm succeeds");
        let _ = engine.pop_alerts().expect("startup alerts drain");
        let _ = signal.try_wait();
        signal
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn alert_from_an_engine_thread_wakes_the_async_consumer() {
        let mut engine = engine();
        let mut signal = armed_and_drained(&mut engine);
        let handle = engine.handle();

        let poster = thread::spawn(move || {
            handle.post(TorrentFinishedAlert {
                info_hash: InfoHash::new([5; 20]),
            })
        });

        assert!(
            timeout(Duration::from_secs(2), signal.wait())
                .await
                .expect("engine thread alert should raise a wake-up")
        );
        assert!(poster.join().expect("poster thread panicked"));
        let batch = engine.pop_alerts().expect("drain after wake-up");
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].what(), "torrent_finished");
    }

    #[test]
    fn blocking_wait_observes_an_alert_from_another_thread() {
        let mut engine = engine();
        let mut signal = armed_and_drained(&mut engine);
        let handle = engine.handle();

        let poster = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            handle.post(TorrentFinishedAlert {
                info_hash: InfoHash::new([6; 20]),
            })
        });

        assert!(signal.blocking_wait());
        assert!(poster.join().expect("poster thread panicked"));
        assert_eq!(engine.handle().pending(), 1);

        engine.handle().shutdown();
        assert!(!signal.blocking_wait());
    }
}
