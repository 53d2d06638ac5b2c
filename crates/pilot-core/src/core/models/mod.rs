//! Serializable models of the run configuration consumed by the external tool.
//!
//! The top-level [`run::RunConfiguration`] owns a [`logging::Logging`] section and one
//! [`run::Parameters`] variant per run type. Reinforcement learning parameters are split
//! over [`learning`], [`diversity`] and [`scoring`], mirroring the nesting of the JSON
//! document.

pub mod diversity;
pub mod learning;
pub mod logging;
pub mod run;
pub mod scoring;
