//! Monitor service: configuration loading and the pass runtime.
pub mod config;
pub mod runtime;
