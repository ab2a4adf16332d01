//! CLI command implementations.

pub mod cancel;
pub mod common;
pub mod run;
pub mod status;
pub mod target;
pub mod version;
