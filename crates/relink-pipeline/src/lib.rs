//! relink-pipeline — Orchestration of a linking run.
//!
//! Drives the per-document loop: composite-mention decomposition, candidate
//! generation with the shared cache, cross-mention link building, candidate
//! file output and the per-run information-content file.

pub mod composite;
pub mod run;

pub use composite::{decompose, expand_mentions};
pub use run::{Pipeline, RunSummary};
