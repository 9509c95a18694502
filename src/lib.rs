//! caddygen - compiles a structured reverse-proxy model into a Caddyfile
//!
//! This crate provides:
//! - A total, deterministic compiler from `ConfigDocument` to Caddyfile text
//! - Advisory lint over configuration documents
//! - File-backed storage for documents, Caddyfiles and certificates
//! - An admin HTTP API that drives the proxy binary

pub mod config;
pub mod core;
pub mod metrics;
pub mod ports;
pub mod tracing_setup;

pub mod adapters;

// Re-export the specific types needed by the binary crate
pub use crate::adapters::http::AdminServer;
pub use crate::adapters::{CaddyCli, DataPaths, FileStore};
pub use crate::config::models::ConfigDocument;
pub use crate::core::{CompileOptions, Compiler, compile};
