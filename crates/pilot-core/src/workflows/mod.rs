//! # Workflows Module
//!
//! Top-level entry points of the library.
//!
//! - **Run Workflow** ([`run`]) - Validates a configuration, writes it into a run
//!   layout, launches the external tool and collects its transcript and result files.
//! - **Analysis Workflow** ([`analyze`]) - Post-processes outputs of a finished run
//!   without launching anything.

pub mod analyze;
pub mod run;
