//! Shared library modules providing error types, HTTP fetching, text extraction, file utilities, and telemetry initialization.

pub mod errors;
pub mod fs;
pub mod html;
pub mod http;
pub mod telemetry;
