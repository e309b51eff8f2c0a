//! Transport layer for lotkeeper.
//!
//! Currently provides HTTP transport via axum.

pub mod http;

pub use http::{ServerConfig, ShutdownReason, serve};
