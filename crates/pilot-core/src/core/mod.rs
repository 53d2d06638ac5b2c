//! # Core Module
//!
//! Typed representations of the external tool's configuration contract ([`models`]) and
//! the file formats exchanged with it ([`io`]).
//!
//! Nothing in here knows how a run is executed. The models serialize to exactly the JSON
//! shape the tool expects, and the I/O readers accept the files the tool writes, so both
//! can be used on their own to inspect or post-process runs produced elsewhere.

pub mod io;
pub mod models;
