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

//! Engine-agnostic session types shared across the peerlink workspace.
//!
//! Layout: `model.rs` (content hashes, handles, add parameters, status
//! snapshots), `category.rs` (alert category bitmask), `error.rs` (public error
//! taxonomy), `service.rs` (async control surface implemented by session services).

pub mod category;
pub mod error;
pub mod model;
pub mod service;

pub use category::AlertCategory;
pub use error::{SessionError, SessionResult};
pub use model::{
    AddTorrentParams, InfoHash, RemoveFlags, TorrentHandle, TorrentSource, TorrentState,
    TorrentStatus,
};
pub use service::SessionControl;
