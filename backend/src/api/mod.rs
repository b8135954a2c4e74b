//! HTTP API module.
//!
//! The axum server, its request/response types and the SSE log stream.

pub mod logs;
pub mod server;
pub mod types;

pub use server::{router, start_server, AppState};
pub use types::*;
