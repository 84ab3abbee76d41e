#[path = "common/mod.rs"]
mod common;

use common::{Call, FIELD_ID, MockGateway};
use tether::projection::SIMILAR_LIMIT;
use tether::{LinkProjection, Record, check_symmetry, repair_one_way};

fn ids(records: &[Record]) -> Vec<u64> {
    records.iter().map(|r| r.id).collect()
}

// ============================================================================
// Resolving linked records
// ============================================================================

#[tokio::test]
async fn test_refresh_resolves_in_link_order() {
    let gateway = MockGateway::new()
        .with_record(2, "two", "link:1")
        .with_record(3, "three", "link:1")
        .with_record(4, "four", "link:1");
    let mut projection = LinkProjection::new(Some(Record::new(1, "one")), "link:3,link:2,link:4");

    projection.refresh_resolved(&gateway).await.unwrap();

    assert_eq!(ids(projection.resolved()), vec![3, 2, 4]);
    assert_eq!(gateway.calls(), vec![Call::FetchMany(vec![3, 2, 4])]);
}

#[tokio::test]
async fn test_refresh_skips_request_when_up_to_date() {
    let gateway = MockGateway::new()
        .with_record(2, "two", "")
        .with_record(3, "three", "");
    let mut projection = LinkProjection::new(Some(Record::new(1, "one")), "link:2,link:3");

    projection.refresh_resolved(&gateway).await.unwrap();
    projection.refresh_resolved(&gateway).await.unwrap();

    assert_eq!(gateway.calls().len(), 1);
}

#[tokio::test]
async fn test_refresh_with_no_links_makes_no_request() {
    let gateway = MockGateway::new();
    let mut projection = LinkProjection::new(Some(Record::new(1, "one")), "");

    projection.refresh_resolved(&gateway).await.unwrap();

    assert!(projection.resolved().is_empty());
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn test_refresh_drops_records_the_platform_did_not_return() {
    let gateway = MockGateway::new().with_record(2, "two", "");
    let mut projection = LinkProjection::new(Some(Record::new(1, "one")), "link:2,link:404");

    projection.refresh_resolved(&gateway).await.unwrap();

    assert_eq!(ids(projection.resolved()), vec![2]);
    // Still incomplete, so the next refresh asks again
    projection.refresh_resolved(&gateway).await.unwrap();
    assert_eq!(gateway.calls().len(), 2);
}

#[tokio::test]
async fn test_refresh_failure_clears_resolved() {
    let gateway = MockGateway::new().with_record(2, "two", "");
    let mut projection = LinkProjection::new(Some(Record::new(1, "one")), "link:2,link:3");
    projection.refresh_resolved(&gateway).await.unwrap();
    assert_eq!(ids(projection.resolved()), vec![2]);

    let failing = MockGateway::new().failing_batch_fetch();
    let result = projection.refresh_resolved(&failing).await;

    assert!(result.is_err());
    assert!(projection.resolved().is_empty());
    assert_eq!(projection.links().ids(), vec![2, 3]);
}

// ============================================================================
// Similar candidates
// ============================================================================

#[tokio::test]
async fn test_similar_excludes_source_and_linked() {
    let gateway = MockGateway::new().with_search_results(vec![
        Record::new(1, "Printer on fire"),
        Record::new(2, "Printer on fire again"),
        Record::new(3, "Printer fire"),
    ]);
    let projection = LinkProjection::new(Some(Record::new(1, "Printer on fire")), "link:2");

    let candidates = projection.similar_candidates(&gateway).await.unwrap();

    assert_eq!(ids(&candidates), vec![3]);
    let page_size = (SIMILAR_LIMIT + 2) as u32;
    assert_eq!(
        gateway.calls(),
        vec![Call::SearchPaged("Printer on fire".to_string(), page_size)]
    );
}

#[tokio::test]
async fn test_similar_is_capped() {
    let results = (100..130).map(|id| Record::new(id, "dup")).collect();
    let gateway = MockGateway::new().with_search_results(results);
    let projection = LinkProjection::new(Some(Record::new(1, "dup")), "");

    let candidates = projection.similar_candidates(&gateway).await.unwrap();

    assert_eq!(candidates.len(), SIMILAR_LIMIT);
    assert_eq!(candidates[0].id, 100);
}

#[tokio::test]
async fn test_similar_without_subject_makes_no_request() {
    let gateway = MockGateway::new().with_search_results(vec![Record::new(5, "x")]);

    let blank = LinkProjection::new(Some(Record::new(1, "  ")), "");
    assert!(blank.similar_candidates(&gateway).await.unwrap().is_empty());

    let orphan = LinkProjection::new(None, "");
    assert!(orphan.similar_candidates(&gateway).await.unwrap().is_empty());

    assert!(gateway.calls().is_empty());
}

// ============================================================================
// Symmetry check
// ============================================================================

#[tokio::test]
async fn test_check_symmetry_clean() {
    let gateway = MockGateway::new()
        .with_record(1, "a", "link:2,link:3")
        .with_record(2, "b", "link:1")
        .with_record(3, "c", "link:9,link:1");

    let report = check_symmetry(&gateway, FIELD_ID, 1).await.unwrap();

    assert!(report.is_symmetric());
    assert_eq!(report.linked, vec![2, 3]);
}

#[tokio::test]
async fn test_check_symmetry_reports_one_way_and_missing() {
    let gateway = MockGateway::new()
        .with_record(1, "a", "link:2,link:3,link:4")
        .with_record(2, "b", "link:1")
        .with_record(3, "c", "");

    let report = check_symmetry(&gateway, FIELD_ID, 1).await.unwrap();

    assert!(!report.is_symmetric());
    assert_eq!(report.one_way, vec![3]);
    assert_eq!(report.missing, vec![4]);
    // Read-only
    assert!(
        gateway
            .calls()
            .iter()
            .all(|c| matches!(c, Call::Fetch(_) | Call::FetchMany(_)))
    );
}

#[tokio::test]
async fn test_repair_restores_back_links_only() {
    let gateway = MockGateway::new()
        .with_record(1, "a", "link:2,link:3,link:4")
        .with_record(2, "b", "link:1")
        .with_record(3, "c", "link:9");

    let report = check_symmetry(&gateway, FIELD_ID, 1).await.unwrap();
    let repaired = repair_one_way(&gateway, FIELD_ID, &report).await.unwrap();

    assert_eq!(repaired, vec![3]);
    assert_eq!(gateway.field_of(3), "link:9,link:1");
    assert_eq!(gateway.field_of(2), "link:1");
    assert!(
        gateway
            .calls()
            .contains(&Call::UpdateOne(3, "link:9,link:1".to_string()))
    );
    assert!(check_symmetry(&gateway, FIELD_ID, 1).await.unwrap().one_way.is_empty());
}

#[tokio::test]
async fn test_repair_of_symmetric_record_writes_nothing() {
    let gateway = MockGateway::new()
        .with_record(1, "a", "link:2")
        .with_record(2, "b", "link:1");

    let report = check_symmetry(&gateway, FIELD_ID, 1).await.unwrap();
    let repaired = repair_one_way(&gateway, FIELD_ID, &report).await.unwrap();

    assert!(repaired.is_empty());
    assert!(
        !gateway
            .calls()
            .iter()
            .any(|c| matches!(c, Call::UpdateOne(..)))
    );
}
