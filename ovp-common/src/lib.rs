//! # OVP Common Library
//!
//! Shared code for the OVP viewport-adaptive player including:
//! - Event types (PlayerEvent enum) and EventBus
//! - Bootstrap configuration loading
//! - Logging initialization
//! - Timing utilities

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod time;

pub use error::{Error, Result};
