// Command line interface
pub mod commands;

pub use commands::*;
