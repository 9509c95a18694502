pub mod server;

pub use server::AdminServer;
