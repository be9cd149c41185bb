//! Command handlers grouped by concern.

pub(crate) mod run;
pub(crate) mod settings;
