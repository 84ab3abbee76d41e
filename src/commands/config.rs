//! Configuration commands for managing tether settings.
//!
//! - `config show`: Display current configuration
//! - `config get`: Display a single value
//! - `config set`: Set a configuration value

use owo_colors::OwoColorize;
use serde_json::json;

use super::CommandOutput;
use crate::config::{Config, VALID_KEYS};
use crate::error::{Result, TetherError};

const SENSITIVE_KEYS: &[&str] = &["zendesk.api_token"];

/// Mask a sensitive value by showing only the first 2 and last 2 characters
fn mask_sensitive_value(value: &str) -> String {
    let char_count = value.chars().count();
    if char_count > 4 {
        let first: String = value.chars().take(2).collect();
        let last: String = value.chars().skip(char_count - 2).collect();
        format!("{first}...{last}")
    } else {
        "****".to_string()
    }
}

fn display_value(key: &str, value: &str) -> String {
    if SENSITIVE_KEYS.contains(&key) {
        mask_sensitive_value(value)
    } else {
        value.to_string()
    }
}

/// Show current configuration
pub fn cmd_config_show(output_json: bool) -> Result<()> {
    let config = Config::load()?;

    let mut values = serde_json::Map::new();
    let mut text_output = format!("{}\n\n", "Configuration:".cyan().bold());

    for key in VALID_KEYS {
        let value = config.get(key)?;
        let shown = value.as_deref().map(|v| display_value(key, v));
        values.insert(key.to_string(), json!(shown));

        let rendered = match shown {
            Some(v) => v,
            None => "not configured".dimmed().to_string(),
        };
        text_output.push_str(&format!("  {}: {rendered}\n", key.cyan()));
    }

    text_output.push('\n');
    text_output.push_str(&format!(
        "{}",
        format!("Config file: {}", Config::config_path().display()).dimmed()
    ));

    CommandOutput::new(json!({
        "values": values,
        "config_file": Config::config_path().to_string_lossy(),
    }))
    .with_text(text_output)
    .print(output_json)
}

/// Get a specific configuration value
pub fn cmd_config_get(key: &str, output_json: bool) -> Result<()> {
    let config = Config::load()?;

    let value = config
        .get(key)?
        .ok_or_else(|| TetherError::Config(format!("{key} not set")))?;
    let masked = SENSITIVE_KEYS.contains(&key);
    let shown = display_value(key, &value);

    let text = if masked {
        format!("{shown} (masked - showing first 2 and last 2 characters)")
    } else {
        shown.clone()
    };

    CommandOutput::new(json!({
        "key": key,
        "value": shown,
        "configured": true,
        "masked": masked,
    }))
    .with_text(text)
    .print(output_json)
}

/// Set a configuration value
pub fn cmd_config_set(key: &str, value: &str, output_json: bool) -> Result<()> {
    let mut config = Config::load()?;
    config.set(key, value)?;
    config.save()?;

    let shown = display_value(key, value);

    CommandOutput::new(json!({
        "action": "config_set",
        "key": key,
        "value": shown,
        "success": true,
    }))
    .with_text(format!("Set {} to {}", key.cyan(), shown))
    .print(output_json)
}
