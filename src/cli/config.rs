use crate::config::Config;
use anyhow::{Context, Result};
use std::path::Path;

const REDACTED: &str = "********";

/// Prints the effective configuration as TOML.
pub fn handle_config_command(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    println!("{}", render_redacted(&config)?);
    Ok(())
}

fn render_redacted(config: &Config) -> Result<String> {
    let mut config = config.clone();
    if config.llm.api_key.is_some() {
        config.llm.api_key = Some(REDACTED.to_string());
    }
    if config.email.api_key.is_some() {
        config.email.api_key = Some(REDACTED.to_string());
    }

    toml::to_string_pretty(&config).context("Failed to serialize config")
}
