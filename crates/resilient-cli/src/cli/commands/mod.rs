//! CLI command handlers, one file per command.

mod backoff;
mod config;
mod request;

pub use backoff::run_backoff;
pub use config::run_config;
pub use request::{run_request, RequestArgs};
