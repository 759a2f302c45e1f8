//! CLI command implementations.

pub mod enrich;
pub mod export;
pub mod overlay;
pub mod report;
