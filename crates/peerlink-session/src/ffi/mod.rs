#![allow(unreachable_pub)]

pub mod bridge;

pub use bridge::{AlertNotifier, ffi};

#[allow(unsafe_code)]
#[allow(clippy::non_send_fields_in_send_ty)]
// SAFETY: the native session is owned by exactly one `NativeEngine` and only
// touched through `&mut` or `&` borrows of it; libtorrent's session object is
// itself safe to call from any thread.
unsafe impl Send for ffi::Session {}
