pub mod loader;
pub mod models;
pub mod serde_helpers;
pub mod validation;
pub mod watcher;
