//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by both jobs:
//! - Logging and tracing setup
//! - JSON configuration loading and validation
//! - Event bus for progress reporting
//!
//! ## Overview
//!
//! Every other workspace crate depends on this one for its configuration
//! types and logging conventions. Nothing here talks to the network.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
