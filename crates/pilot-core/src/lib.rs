//! # reinvent-pilot Core Library
//!
//! Drives an external REINVENT-style molecule generation program from Rust: builds its
//! JSON run configuration, launches it as a subprocess, and reads back the transcript
//! and result tables it leaves behind.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three-layer split throughout:
//!
//! - **[`core`]: The Contract.** Typed models of the JSON configuration the external tool
//!   consumes, and readers/writers for the files it produces (transcripts, score tables,
//!   sampled SMILES).
//!
//! - **[`engine`]: The Machinery.** Builders and validation for run configurations, the
//!   on-disk layout of a run, the subprocess [`engine::launcher::Launcher`] with
//!   cancellation and timeouts, and progress reporting.
//!
//! - **[`workflows`]: The Public API.** End-to-end procedures that tie the two together:
//!   running a job from a validated configuration, or analyzing outputs of a finished one.

pub mod core;
pub mod engine;
pub mod workflows;
