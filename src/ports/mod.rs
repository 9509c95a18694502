pub mod cert_store;
pub mod config_store;
pub mod proxy_control;
