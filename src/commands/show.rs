use owo_colors::OwoColorize;
use serde_json::json;

use super::{CommandOutput, connect, format_record_line, record_minimal_json};
use crate::error::Result;
use crate::gateway::RecordGateway;
use crate::link::parse_record_id;
use crate::projection::LinkProjection;
use crate::sync::{check_symmetry, repair_one_way};

/// Display a ticket with its linked tickets
pub async fn cmd_show(id: &str, output_json: bool) -> Result<()> {
    let id = parse_record_id(id)?;
    let (config, engine) = connect()?;

    let source = engine.gateway().fetch_record(id).await?;
    let mut projection = LinkProjection::from_record(source.clone(), engine.field_id());
    projection.refresh_resolved(engine.gateway()).await?;

    let unresolved: Vec<_> = projection
        .links()
        .ids()
        .into_iter()
        .filter(|linked| !projection.resolved().iter().any(|r| r.id == *linked))
        .collect();

    let linked_json: Vec<_> = projection
        .resolved()
        .iter()
        .map(|r| record_minimal_json(r, &config))
        .collect();

    let mut text = format_record_line(&source, &config);
    text.push_str(&format!("\n\n{}\n", "Linked tickets:".cyan().bold()));
    if projection.resolved().is_empty() && unresolved.is_empty() {
        text.push_str(&format!("  {}", "No linked tickets.".dimmed()));
    }
    for linked in projection.resolved() {
        text.push_str(&format!("  {}\n", format_record_line(linked, &config)));
    }
    for missing in &unresolved {
        text.push_str(&format!("  #{missing} {}\n", "(not found)".dimmed()));
    }

    CommandOutput::new(json!({
        "id": id,
        "subject": source.subject(),
        "status": source.status,
        "links": projection.links().to_string(),
        "linked": linked_json,
        "unresolved": unresolved,
    }))
    .with_text(text.trim_end().to_string())
    .print(output_json)
}

/// Report links that are not mirrored on the other ticket, optionally
/// writing the missing back-links
pub async fn cmd_check(id: &str, repair: bool, output_json: bool) -> Result<()> {
    let id = parse_record_id(id)?;
    let (_, engine) = connect()?;

    let report = check_symmetry(engine.gateway(), engine.field_id(), id).await?;
    let repaired = if repair {
        repair_one_way(engine.gateway(), engine.field_id(), &report).await?
    } else {
        Vec::new()
    };

    let mut text = if report.is_symmetric() {
        format!(
            "{} all {} link(s) on #{id} are mirrored",
            "ok:".green(),
            report.linked.len()
        )
    } else {
        format!("{} #{id} has asymmetric links", "warning:".yellow())
    };
    for other in &report.one_way {
        text.push_str(&format!("\n  #{id} -> #{other} (no link back)"));
    }
    for other in &report.missing {
        text.push_str(&format!("\n  #{other} could not be fetched"));
    }
    for other in &repaired {
        text.push_str(&format!("\n  {} #{other} -> #{id}", "restored".green()));
    }

    CommandOutput::new(json!({
        "id": id,
        "symmetric": report.is_symmetric(),
        "linked": report.linked,
        "one_way": report.one_way,
        "missing": report.missing,
        "repaired": repaired,
    }))
    .with_text(text)
    .print(output_json)
}
