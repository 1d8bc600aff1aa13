//! Utilities Module - shared infrastructure
//!
//! - `constants`: polling and naming defaults
//! - `path`: dotted output paths into provider documents

pub mod constants;
pub mod path;

pub use constants::{DEFAULT_POLL_INTERVAL, DEFAULT_STATUS_TIMEOUT, NAME_SUFFIX_LEN};
