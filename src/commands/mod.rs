mod config;
mod link;
mod search;
mod show;

pub use config::{cmd_config_get, cmd_config_set, cmd_config_show};
pub use link::{cmd_link, cmd_unlink};
pub use search::{cmd_search, cmd_similar};
pub use show::{cmd_check, cmd_show};

use owo_colors::OwoColorize;
use serde_json::json;

use crate::config::Config;
use crate::error::Result;
use crate::gateway::{Record, RecordStatus, ZendeskGateway};
use crate::sync::SyncEngine;

/// Command result rendered either as JSON or as human-readable text
pub struct CommandOutput {
    json: serde_json::Value,
    text: Option<String>,
}

impl CommandOutput {
    pub fn new(json: serde_json::Value) -> Self {
        Self { json, text: None }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn print(self, output_json: bool) -> Result<()> {
        match (output_json, self.text) {
            (false, Some(text)) => println!("{text}"),
            _ => println!("{}", serde_json::to_string_pretty(&self.json)?),
        }
        Ok(())
    }
}

/// Load configuration and build an engine over the live Zendesk gateway.
pub(crate) fn connect() -> Result<(Config, SyncEngine<ZendeskGateway>)> {
    let config = Config::load()?;
    let gateway = ZendeskGateway::from_config(&config)?;
    let engine = SyncEngine::new(gateway, config.linked_field_id()?)
        .with_read_policy(config.read_policy());
    Ok((config, engine))
}

/// Color a status badge the way the agent panel does
pub fn format_status(status: &RecordStatus) -> String {
    let badge = format!("[{status}]");
    match status {
        RecordStatus::New => badge.yellow().to_string(),
        RecordStatus::Open => badge.red().to_string(),
        RecordStatus::Pending => badge.blue().to_string(),
        RecordStatus::Hold => badge.bright_black().to_string(),
        RecordStatus::Solved => badge.green().to_string(),
        RecordStatus::Closed => badge.dimmed().to_string(),
        RecordStatus::Other(_) => badge,
    }
}

/// Format a record for single-line display
pub fn format_record_line(record: &Record, config: &Config) -> String {
    let id = format!("#{:<8}", record.id);
    let mut line = format!(
        "{} {} {}",
        id.cyan(),
        format_status(&record.status),
        record.subject()
    );
    if let Some(url) = config.ticket_url(record.id) {
        line.push_str(&format!("  {}", url.dimmed()));
    }
    line
}

pub(crate) fn record_minimal_json(record: &Record, config: &Config) -> serde_json::Value {
    json!({
        "id": record.id,
        "subject": record.subject(),
        "status": record.status,
        "url": config.ticket_url(record.id),
    })
}
