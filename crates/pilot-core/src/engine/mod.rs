//! # Engine Module
//!
//! The machinery between a configuration and a finished run of the external tool.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Builders for run configurations and the validation
//!   rules applied before anything is written or launched
//! - **Layout** ([`layout`]) - Where a run's configuration, transcript and results live
//! - **Execution** ([`launcher`]) - Subprocess launch with merged output capture,
//!   cancellation and timeouts
//! - **Progress Monitoring** ([`progress`]) - Progress reporting and user feedback hooks
//! - **Error Handling** ([`error`]) - The umbrella error type returned by workflows

pub mod config;
pub mod error;
pub mod launcher;
pub mod layout;
pub mod progress;
