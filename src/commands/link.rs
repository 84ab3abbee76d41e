use owo_colors::OwoColorize;
use serde_json::json;

use super::{CommandOutput, connect};
use crate::error::Result;
use crate::gateway::RecordGateway;
use crate::link::parse_record_id;
use crate::projection::LinkProjection;
use crate::sync::{SyncReport, TargetRead};

/// Link two tickets in both directions
pub async fn cmd_link(
    source: &str,
    target: &str,
    comment: Option<&str>,
    output_json: bool,
) -> Result<()> {
    let source_id = parse_record_id(source)?;
    let target_id = parse_record_id(target)?;
    let (config, engine) = connect()?;

    let source_record = engine.gateway().fetch_record(source_id).await?;
    let mut projection = LinkProjection::from_record(source_record, engine.field_id());

    let report = projection
        .link_id(&engine, target_id, comment.map(str::to_string))
        .await?;

    warn_on_partial(&report);

    let mut text = format!(
        "Linked {} <-> {}",
        format!("#{source_id}").cyan(),
        format!("#{target_id}").cyan()
    );
    if let Some(target) = &report.target_record {
        text.push_str(&format!(" {}", target.subject().dimmed()));
    }
    let mut output = report_json(&report);
    output["url"] = json!(config.ticket_url(target_id));

    CommandOutput::new(output).with_text(text).print(output_json)
}

/// Remove the link between two tickets on both sides
pub async fn cmd_unlink(source: &str, target: &str, output_json: bool) -> Result<()> {
    let source_id = parse_record_id(source)?;
    let target_id = parse_record_id(target)?;
    let (_, engine) = connect()?;

    let source_record = engine.gateway().fetch_record(source_id).await?;
    let mut projection = LinkProjection::from_record(source_record, engine.field_id());

    if !projection.links().contains(target_id) {
        eprintln!(
            "{}",
            format!("Warning: #{source_id} does not list #{target_id} as linked; clearing any back-link.")
                .yellow()
        );
    }

    let report = projection.unlink(&engine, target_id).await?;

    warn_on_partial(&report);

    let text = format!(
        "Removed link: {} <-> {}",
        format!("#{source_id}").cyan(),
        format!("#{target_id}").cyan()
    );

    CommandOutput::new(report_json(&report))
        .with_text(text)
        .print(output_json)
}

fn warn_on_partial(report: &SyncReport) {
    if let TargetRead::Fallback { error } = &report.target_read {
        eprintln!(
            "{}",
            format!(
                "Warning: could not read #{} ({error}); its previous links were not preserved.",
                report.target
            )
            .yellow()
        );
    }
    if let Some(error) = &report.annotation_error {
        eprintln!("{}", format!("Warning: {error}").yellow());
    }
}

fn report_json(report: &SyncReport) -> serde_json::Value {
    json!({
        "action": report.kind,
        "source": report.source,
        "target": report.target,
        "links_updated": {
            report.source.to_string(): report.source_links.to_string(),
            report.target.to_string(): report.target_links.to_string(),
        },
        "target_read": match &report.target_read {
            TargetRead::Fetched => json!("fetched"),
            TargetRead::Fallback { error } => json!({"fallback": error}),
        },
        "annotated": report.fully_annotated(),
        "annotation_error": report.annotation_error.as_ref().map(|e| e.to_string()),
        "job_id": report.ack.job.as_ref().map(|j| j.id.clone()),
        "phases": report.trail,
    })
}
