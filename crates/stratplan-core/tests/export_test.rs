//! Integration tests for the plan pipeline: a backend payload is
//! normalized, validated, assembled into review rows and written out in
//! every export format.

use std::io::Read;

use chrono::{NaiveDate, Utc};
use serde_json::Value;

use stratplan_core::assemble::export::{DOCUMENT_TITLE, export_to_path, export_to_vec};
use stratplan_core::assemble::{ExportFormat, HEADERS, RowKind, assemble};
use stratplan_core::model::{PlanDocument, PlanStatus};
use stratplan_core::normalize::normalize_plan;
use stratplan_core::rules::{Rule, validate_plan};
use stratplan_core::workflow::{ReviewDecision, WorkflowError, record_review, submit};
use stratplan_test_utils::{
    empty_objective_json, initiative_json, messy_plan_json, valid_plan_json,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn valid_plan() -> PlanDocument {
    normalize_plan(&valid_plan_json()).expect("fixture plan").0
}

/// The fixture plus an initiative with no leaves and an objective with no
/// initiatives.
fn plan_with_bare_branches() -> PlanDocument {
    let mut value = valid_plan_json();
    value["objectives"][0]["initiatives"]
        .as_array_mut()
        .unwrap()
        .push(initiative_json(12, "Bare", 0.0, 1));
    value["objectives"]
        .as_array_mut()
        .unwrap()
        .push(empty_objective_json(2, 15.0));
    normalize_plan(&value).expect("extended plan").0
}

fn generated_on() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 15).unwrap()
}

fn sheet_xml(bytes: Vec<u8>) -> String {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut sheet = archive.by_name("xl/worksheets/sheet1.xml").unwrap();
    let mut xml = String::new();
    sheet.read_to_string(&mut xml).unwrap();
    xml
}

// ---------------------------------------------------------------------------
// Validation and lifecycle
// ---------------------------------------------------------------------------

#[test]
fn fixture_plan_validates_with_one_warning() {
    let report = validate_plan(&valid_plan());

    assert!(report.is_submittable(), "{:?}", report.issues);
    let warnings: Vec<_> = report.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].rule, Rule::FundingLeCost);
}

#[test]
fn messy_payload_matches_clean_one() {
    let (messy, coercions) = normalize_plan(&messy_plan_json()).unwrap();
    assert!(!coercions.is_empty());

    let clean = valid_plan();
    assert_eq!(messy.id, clean.id);
    assert_eq!(messy.objectives.len(), 1);
    let initiative = &messy.objectives[0].initiatives[0];
    assert_eq!(initiative.name, "Expand antenatal care");
    assert!(initiative.performance_measures.is_empty());
    assert_eq!(initiative.main_activities.len(), 1);
    assert!(messy.reviews.is_empty());
}

#[test]
fn broken_weights_block_submission() {
    let mut plan = valid_plan();
    plan.objectives[0].initiatives[0].main_activities[0].weight = 30.0;

    let err = submit(&mut plan, Utc::now()).unwrap_err();
    match err {
        WorkflowError::NotSubmittable { report } => {
            assert!(report.has(Rule::ActivitySum65Pct));
        }
        other => panic!("expected NotSubmittable, got {other:?}"),
    }
    assert_eq!(plan.status, PlanStatus::Draft);
}

#[test]
fn submit_then_reject_appends_review() {
    let mut plan = valid_plan();
    submit(&mut plan, Utc::now()).unwrap();
    assert_eq!(plan.status, PlanStatus::Submitted);
    assert!(plan.submitted_at.is_some());

    let review = record_review(
        &mut plan,
        "7",
        "Hana Girma",
        ReviewDecision::reject("Targets are too low"),
        Utc::now(),
    )
    .unwrap();
    assert_eq!(review.feedback, "Targets are too low");
    assert_eq!(plan.status, PlanStatus::Rejected);
    assert_eq!(plan.reviews.len(), 1);

    // Rejected is terminal.
    let err = record_review(
        &mut plan,
        "7",
        "Hana Girma",
        ReviewDecision::approve(None),
        Utc::now(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::InvalidTransition {
            from: PlanStatus::Rejected,
            to: PlanStatus::Approved,
        }
    ));
    assert_eq!(plan.reviews.len(), 1);
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

#[test]
fn fixture_plan_assembles_into_paired_rows() {
    let table = assemble(&valid_plan());

    assert_eq!(table.organization, "ICT Executive Office");
    assert_eq!(table.planner, "Almaz Tesfaye");
    assert_eq!(table.period.as_deref(), Some("2025-07-01 to 2026-06-30"));
    assert_eq!(table.rows.len(), 2);

    let first = &table.rows[0];
    assert_eq!(first.number, Some(1));
    assert_eq!(first.objective.as_deref(), Some("Improve maternal health"));
    assert_eq!(first.initiative.as_deref(), Some("Expand antenatal care"));
    assert_eq!(first.name, "ANC4 coverage");
    assert_eq!(first.kind, Some(RowKind::PerformanceMeasure));
    assert_eq!(first.budget.map(|b| b.total), Some(81000.0));

    let second = &table.rows[1];
    assert_eq!(second.number, None);
    assert_eq!(second.objective, None);
    assert_eq!(second.initiative, None);
    assert_eq!(second.name, "Supply delivery kits");
    assert_eq!(second.kind, Some(RowKind::MainActivity));
    assert_eq!(second.baseline, None);
    assert_eq!(second.implementor.as_deref(), Some("ICT Executive Office"));

    assert_eq!(table.totals.total, 86000.0);
    assert_eq!(table.totals.total_funding(), 85000.0);
    assert_eq!(table.totals.funding_gap(), 1000.0);
    assert_eq!(table.totals.activities_with_budget, 2);
}

// ---------------------------------------------------------------------------
// Export formats
// ---------------------------------------------------------------------------

#[test]
fn workbook_contains_headers_and_rows() {
    let table = assemble(&valid_plan());
    let bytes = export_to_vec(&table, ExportFormat::Xlsx, generated_on()).unwrap();

    let xml = sheet_xml(bytes);
    for header in HEADERS {
        assert!(xml.contains(header), "missing header {header}");
    }
    assert!(xml.contains("Improve maternal health"));
    assert!(xml.contains("Total: 81,000"));
    assert!(xml.contains(r#"<row r="3">"#));
}

#[test]
fn csv_has_header_and_quoted_multiline_cells() {
    let table = assemble(&valid_plan());
    let bytes = export_to_vec(&table, ExportFormat::Csv, generated_on()).unwrap();
    let text = String::from_utf8(bytes).unwrap();

    assert_eq!(text.lines().next(), Some(HEADERS.join(",").as_str()));
    assert!(text.contains("\"Total: 81,000\nTreasury: 50,000"));
    assert!(text.contains("Supply delivery kits"));
}

#[test]
fn json_export_keeps_totals() {
    let table = assemble(&valid_plan());
    let bytes = export_to_vec(&table, ExportFormat::Json, generated_on()).unwrap();
    let doc: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(doc["rows"].as_array().map(Vec::len), Some(2));
    assert_eq!(doc["rows"][0]["Budget"]["display"], "81,000");
    assert_eq!(doc["rows"][1]["Baseline"], "N/A");
    assert_eq!(doc["totals"]["fundingGap"], 1000.0);
}

#[test]
fn bare_branches_still_export_a_row() {
    let table = assemble(&plan_with_bare_branches());
    assert_eq!(table.rows.len(), 4);
    assert_eq!(table.rows[2].initiative.as_deref(), Some("Bare"));
    assert_eq!(table.rows[3].objective.as_deref(), Some("Objective 2"));

    let csv = String::from_utf8(export_to_vec(&table, ExportFormat::Csv, generated_on()).unwrap())
        .unwrap();
    assert!(csv.contains(",,Bare,,,0%,N/A,N/A,N/A,N/A,N/A"));
    assert!(csv.contains("2,Objective 2,,,,15%,N/A,N/A,N/A,N/A,N/A"));

    let bytes = export_to_vec(&table, ExportFormat::Json, generated_on()).unwrap();
    let doc: Value = serde_json::from_slice(&bytes).unwrap();
    let empty = &doc["rows"][3];
    assert_eq!(empty["No"], 2);
    assert_eq!(empty["Weight"], "15%");
    assert_eq!(empty["Type"], "");
    assert_eq!(empty["Budget"], "N/A");

    assert!(sheet_xml(export_to_vec(&table, ExportFormat::Xlsx, generated_on()).unwrap())
        .contains("Objective 2"));
}

#[test]
fn every_format_writes_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let table = assemble(&valid_plan());

    for format in [
        ExportFormat::Xlsx,
        ExportFormat::PdfText,
        ExportFormat::Csv,
        ExportFormat::Json,
    ] {
        let path = dir.path().join(format!("plan.{}", format.extension()));
        let rows = export_to_path(&table, format, &path, generated_on()).unwrap();
        assert_eq!(rows, 2);
        assert!(std::fs::metadata(&path).unwrap().len() > 0, "{format} is empty");
    }

    let document = std::fs::read_to_string(dir.path().join("plan.txt")).unwrap();
    assert!(document.starts_with(DOCUMENT_TITLE));
    assert!(document.contains("Generated on: 2025-07-15"));
    assert!(document.contains("Organization: ICT Executive Office"));
}
