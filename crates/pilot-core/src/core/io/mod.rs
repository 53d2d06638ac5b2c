//! Provides readers and writers for the files exchanged with the external tool.
//!
//! The tool consumes a JSON configuration ([`config`]) and leaves behind a console
//! transcript ([`transcript`]), CSV score tables such as `scaffold_memory.csv`
//! ([`scores`]) and, for sampling runs, a SMILES file ([`smiles`]). Readers share the
//! [`traits::ResultFile`] interface.

pub mod config;
pub mod scores;
pub mod smiles;
pub mod traits;
pub mod transcript;
