use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

use crate::config::models::ConfigDocument;

/// Error type for configuration storage
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    /// Error when encountering an IO issue
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The stored document could not be decoded or encoded
    #[error("Invalid stored document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
}

/// Result type for configuration storage
pub type StoreResult<T> = Result<T, StoreError>;

/// Type alias for async storage operations
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// ConfigStore defines the port for persisting the structured document and
/// the compiled Caddyfile
pub trait ConfigStore: Send + Sync + 'static {
    /// Load the stored document, or the initial document when nothing is stored
    fn load_document<'a>(&'a self) -> StoreFuture<'a, ConfigDocument>;

    /// Replace the stored document
    fn save_document<'a>(&'a self, doc: &'a ConfigDocument) -> StoreFuture<'a, ()>;

    /// The current Caddyfile text, empty when none has been written
    fn read_caddyfile<'a>(&'a self) -> StoreFuture<'a, String>;

    /// Replace the Caddyfile text
    fn write_caddyfile<'a>(&'a self, content: &'a str) -> StoreFuture<'a, ()>;
}
