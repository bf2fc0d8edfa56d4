//! Shared domain types, configuration and the pure decision logic of the
//! self-healing retrieval core.

pub mod config;
pub mod data_processor;
pub mod error;
pub mod merge;
pub mod normalize;
pub mod synthesize;
pub mod traits;
pub mod types;
