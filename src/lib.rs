//! Library crate root re-exporting the monitor modules.

#[path = "lib/mod.rs"]
pub mod lib_mod;
pub use lib_mod as lib;
pub mod alerting;
pub mod cli;
pub mod models;
pub mod monitors;
pub mod service;
pub mod state;
