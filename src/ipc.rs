//! Daemon process and the JSON-lines control socket in front of it.

mod dispatch;
mod pipeline;
mod runtime;
mod server;

pub use server::{client_request, run_daemon};
