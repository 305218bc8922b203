//! Filesystem and process adapters plus the orchestrator that composes them
//! into a package run.
//!
//! Domain rules (layout validation, manifest parsing, the step plan) come
//! from `lambda_bundle_core`; this crate owns every side effect.

pub mod adapters;
pub mod error;
pub mod orchestrator;

pub use lambda_bundle_core as domain;
