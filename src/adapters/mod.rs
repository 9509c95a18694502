pub mod caddy_cli;
pub mod file_store;
pub mod http;

pub use caddy_cli::CaddyCli;
pub use file_store::{DataPaths, FileStore};
