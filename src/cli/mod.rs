mod args;
mod config;

pub use args::{Cli, CliCommand};
pub use config::handle_config_command;
