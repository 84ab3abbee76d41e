use owo_colors::OwoColorize;
use serde_json::json;

use super::{CommandOutput, connect, format_record_line, record_minimal_json};
use crate::config::Config;
use crate::error::Result;
use crate::gateway::{Record, RecordGateway};
use crate::link::parse_record_id;
use crate::projection::LinkProjection;

/// Search tickets by text, optionally hiding tickets already linked to `exclude_linked_of`
pub async fn cmd_search(
    query: &str,
    exclude_linked_of: Option<&str>,
    limit: usize,
    output_json: bool,
) -> Result<()> {
    let (config, engine) = connect()?;

    let page = engine.gateway().search_by_text(query).await?;
    let total = page.count;

    let mut results = match exclude_linked_of {
        Some(id) => {
            let id = parse_record_id(id)?;
            let record = engine.gateway().fetch_record(id).await?;
            LinkProjection::from_record(record, engine.field_id()).filter_candidates(page.results)
        }
        None => page.results,
    };
    results.truncate(limit);

    print_records(&results, &config, total, "No tickets found.", output_json)
}

/// List tickets with a subject similar to the given ticket that are not linked yet
pub async fn cmd_similar(id: &str, output_json: bool) -> Result<()> {
    let id = parse_record_id(id)?;
    let (config, engine) = connect()?;

    let record = engine.gateway().fetch_record(id).await?;
    let projection = LinkProjection::from_record(record, engine.field_id());
    let results = projection.similar_candidates(engine.gateway()).await?;

    print_records(&results, &config, None, "No similar tickets.", output_json)
}

fn print_records(
    records: &[Record],
    config: &Config,
    total: Option<u64>,
    empty_message: &str,
    output_json: bool,
) -> Result<()> {
    let text = if records.is_empty() {
        empty_message.dimmed().to_string()
    } else {
        records
            .iter()
            .map(|r| format_record_line(r, config))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let results: Vec<_> = records
        .iter()
        .map(|r| record_minimal_json(r, config))
        .collect();

    CommandOutput::new(json!({
        "results": results,
        "count": total,
    }))
    .with_text(text)
    .print(output_json)
}
