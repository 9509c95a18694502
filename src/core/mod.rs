pub mod caddyfile;
pub mod compiler;
pub mod global;
pub mod index;
pub mod render;
pub mod sites;
pub mod values;

pub use compiler::{CompileOptions, CompileOutput, Compiler, compile};
