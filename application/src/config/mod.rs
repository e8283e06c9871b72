//! Application-level configuration.

pub mod council_config;

pub use council_config::{CouncilConfig, DEFAULT_REQUEST_TIMEOUT};
