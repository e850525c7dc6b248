//! HTTP surface of the roster service.

pub mod config;
pub mod http;

pub use config::AppConfig;
pub use http::{AppState, ServeConfig, build_router, serve};
