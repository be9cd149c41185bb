#![deny(unsafe_code)]
#![warn(
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Peer-to-peer session layer: typed engine settings, an ordered alert
//! encoder registry, the drain pipeline, and the cross-thread wake-up bridge.
//!
//! `Session` is the synchronous owner of one engine session. `SessionService`
//! moves a session onto a tokio worker and publishes its alerts on an
//! [`peerlink_events::AlertBus`].

mod command;
#[cfg(feature = "libtorrent")]
mod convert;
/// Alert encoders and their ordered registry.
pub mod encoder;
/// Engine boundary, alert types and the in-process engine.
pub mod engine;
mod error;
#[cfg(feature = "libtorrent")]
#[allow(unsafe_code)]
mod ffi;
pub mod notify;
/// Alert drain pipeline.
pub mod pipeline;
/// Background worker that owns a session and publishes its alerts.
pub mod service;
/// Synchronous session handle.
pub mod session;
pub mod settings;

pub use encoder::{AlertEncoder, BuiltinAlertEncoder, EncoderRegistry};
pub use engine::{
    AlertBatch, EngineAlert, MemoryEngine, MemoryEngineHandle, MemoryPlugin, SessionEngine,
};
#[cfg(feature = "libtorrent")]
pub use engine::{NativeEngine, NativePlugin};
pub use error::EngineError;
pub use notify::{AlertNotify, AlertSignal, NotificationBridge};
pub use pipeline::AlertPipeline;
pub use service::{ALERT_POLL_INTERVAL, SessionService};
pub use session::{Extension, Session, SessionId, SessionState};
pub use settings::{
    BoolSetting, IntSetting, PeerFingerprint, SettingKey, SettingValue, SettingsPack, StrSetting,
};
