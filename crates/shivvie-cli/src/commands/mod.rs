//! Command handlers, one module per subcommand.

pub mod completions;
pub mod config;
pub mod engine;
pub mod exec;
pub mod info;
pub mod init;
