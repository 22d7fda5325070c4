//! Tramar — declarative resource-graph compiler for two-region serverless
//! services.
//!
//! Deterministic plans. Durable cross-region references. Capability grants
//! no wider than asked for.

pub mod cli;
pub mod core;
pub mod resources;
pub mod trace;
