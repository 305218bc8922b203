//! Domain primitives for assembling a Python function bundle.
//!
//! This crate owns layout configuration, manifest parsing, the build plan and
//! archive entry naming. It intentionally performs no filesystem mutation and
//! spawns no processes; those live in `lambda_bundle_pipeline`.

pub mod archive_names;
pub mod layout;
pub mod manifest;
pub mod plan;
