// Library root: re-exports all modules so integration tests and the binary
// share one public API.

pub mod api;
pub mod config;
pub mod io;
pub mod plot;
pub mod report;
pub mod season;
pub mod synth;
pub mod workflow;
