//! HTTP server for a Maniac [`App`](crate::foundation::App).
//!
//! Enabled with the `server` feature.

mod server;

pub use server::{router, serve, MAX_BODY_BYTES};
