//! HTTP API module.
//!
//! Upload form, upload/download endpoints and the SSE log stream.

pub mod locks;
pub mod logs;
pub mod server;
pub mod storage;
pub mod types;

pub use server::{router, start_server, AppState};
pub use types::*;
pub use logs::*;
