#![forbid(unsafe_code)]
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

//! Structured alert records and the bus that fans them out to subscribers.
//!
//! Records are produced by alert encoders when a session drains its engine.
//! The bus assigns sequential identifiers and keeps a bounded replay ring so
//! subscribers that reconnect can resume from the last id they saw. Fan-out
//! uses `tokio::broadcast`; when the channel overflows the oldest records are
//! dropped.

pub mod payloads;
pub mod routing;

pub use payloads::{AlertEnvelope, AlertId, AlertRecord, DEFAULT_REPLAY_CAPACITY};
pub use routing::{AlertBus, AlertStream};
