//! Integration tests for the resource query functions.
//!
//! The focus is on what must never reach the backend: weights over their cap,
//! over-funded budgets and illegal plan transitions are refused locally, and
//! the mock server proves no mutation was sent.

use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stratplan_api::models::{ActivityInput, InitiativeInput, MeasureInput};
use stratplan_api::queries::{activities, budgets, initiatives, measures, plans};
use stratplan_api::{ApiClient, ApiConfig, ApiError};
use stratplan_core::budget::{BudgetDraft, BudgetError};
use stratplan_core::costing::{CostAssumptions, CostingTool, Location, TrainingCost};
use stratplan_core::model::{InitiativeParent, Month, PlanStatus, Quarter};
use stratplan_core::weight::{WeightError, WeightLevel};
use stratplan_core::workflow::WorkflowError;
use stratplan_test_utils::{
    activity_json, api_url, empty_objective_json, initiative_json, messy_plan_json, mock_backend,
    mount_csrf, received, received_mutations, training_budget_json, valid_plan_json,
};

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(ApiConfig::new(api_url(server))).expect("client should build")
}

async fn mount_get(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Objective 1 (weight 100, no programs) holding one initiative of 40.
async fn mount_objective_tree(server: &MockServer) {
    mount_get(
        server,
        "/api/strategic-objectives/1/",
        empty_objective_json(1, 100.0),
    )
    .await;
    mount_get(server, "/api/programs/", json!([])).await;
    mount_get(
        server,
        "/api/strategic-initiatives/",
        json!({"data": [initiative_json(11, "Expand antenatal care", 40.0, 1)]}),
    )
    .await;
    mount_get(
        server,
        "/api/strategic-initiatives/11/",
        initiative_json(11, "Expand antenatal care", 40.0, 1),
    )
    .await;
}

fn draft_plan(id: u64) -> Value {
    json!({
        "id": id,
        "status": "DRAFT",
        "from_date": "2025-07-01",
        "to_date": "2026-06-30",
        "objectives": [empty_objective_json(1, 100.0)]
    })
}

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

#[tokio::test]
async fn initiative_over_remaining_weight_is_refused() {
    let server = mock_backend().await;
    mount_csrf(&server).await;
    mount_objective_tree(&server).await;
    let client = client_for(&server);

    let input = InitiativeInput::new("Community outreach", 70.0, &InitiativeParent::Objective("1".into()));
    let err = initiatives::create(&client, &input).await.unwrap_err();

    match err {
        ApiError::Weight(WeightError::ExceedsCap { level, cap, total }) => {
            assert_eq!(level, WeightLevel::Initiatives);
            assert_eq!(cap, 100.0);
            assert_eq!(total, 110.0);
        }
        other => panic!("expected ExceedsCap, got {other:?}"),
    }
    assert!(received_mutations(&server).await.is_empty());
}

#[tokio::test]
async fn initiative_within_remaining_weight_is_created() {
    let server = mock_backend().await;
    mount_csrf(&server).await;
    mount_objective_tree(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/strategic-initiatives/"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(initiative_json(12, "Community outreach", 60.0, 1)),
        )
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server);

    let input = InitiativeInput::new("Community outreach", 60.0, &InitiativeParent::Objective("1".into()));
    let created = initiatives::create(&client, &input).await.unwrap();

    assert_eq!(created.id, "12");
    assert_eq!(created.weight, 60.0);
    assert!(created.performance_measures.is_empty());
}

#[tokio::test]
async fn measures_capped_at_35_percent_of_initiative() {
    let server = mock_backend().await;
    mount_csrf(&server).await;
    mount_objective_tree(&server).await;
    mount_get(&server, "/api/performance-measures/", json!([])).await;
    let client = client_for(&server);

    let input = MeasureInput {
        initiative: "11".into(),
        name: "ANC4 coverage".into(),
        weight: 15.0,
        annual_target: 80.0,
        ..Default::default()
    };
    let err = measures::create(&client, &input).await.unwrap_err();

    assert_eq!(err.to_string(), "Total weight cannot exceed 14%");
    assert!(received_mutations(&server).await.is_empty());
}

#[tokio::test]
async fn activities_fill_65_percent_of_initiative() {
    let server = mock_backend().await;
    mount_csrf(&server).await;
    mount_objective_tree(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/main-activities/"))
        .and(query_param("initiative", "11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([activity_json(20, 11, 20.0)])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/main-activities/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(activity_json(21, 11, 6.0)))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server);

    let over = ActivityInput {
        initiative: "11".into(),
        name: "Supervision visits".into(),
        weight: 7.0,
        selected_months: vec![Month::Jul],
        ..Default::default()
    };
    let err = activities::create(&client, &over).await.unwrap_err();
    assert_eq!(err.to_string(), "Total weight cannot exceed 26%");

    let exact = ActivityInput {
        weight: 6.0,
        ..over
    };
    let created = activities::create(&client, &exact).await.unwrap();
    assert_eq!(created.id, "21");
}

#[tokio::test]
async fn activity_period_must_be_exclusive() {
    let server = mock_backend().await;
    let client = client_for(&server);

    let input = ActivityInput {
        initiative: "11".into(),
        name: "Mixed".into(),
        weight: 5.0,
        selected_months: vec![Month::Jan],
        selected_quarters: vec![Quarter::Q3],
    };
    let err = activities::create(&client, &input).await.unwrap_err();

    assert!(matches!(err, ApiError::Invalid(_)));
    assert!(err.to_string().contains("both months and quarters"));
    assert!(received(&server).await.is_empty());
}

#[tokio::test]
async fn measure_summary_derives_expected_share() {
    let server = mock_backend().await;
    mount_get(
        &server,
        "/api/performance-measures/weight_summary/",
        json!({"data": {"initiative_weight": "40.00", "total_measures_weight": "10.00"}}),
    )
    .await;
    let client = client_for(&server);

    let summary = measures::weight_summary(&client, "11").await.unwrap();

    assert_eq!(summary.expected, 14.0);
    assert_eq!(summary.total, 10.0);
    assert_eq!(summary.remaining, 4.0);
    assert!(!summary.is_valid);
}

#[tokio::test]
async fn backend_weight_verdict_reports_rejection() {
    let server = mock_backend().await;
    mount_csrf(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/main-activities/validate_activities_weight/"))
        .and(query_param("initiative", "11"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Total weight must be 26%. Current total: 20%",
            "is_valid": false
        })))
        .mount(&server)
        .await;
    let client = client_for(&server);

    let verdict = activities::validate(&client, "11").await.unwrap();

    assert!(!verdict.is_valid);
    assert!(verdict.message.contains("26%"));
}

// ---------------------------------------------------------------------------
// Budgets
// ---------------------------------------------------------------------------

fn training_calculation() -> stratplan_core::costing::CostCalculation {
    TrainingCost::new("Midwife refresher training", Location::AddisAbaba, 3, 10)
        .calculate(&CostAssumptions::default())
        .unwrap()
}

#[tokio::test]
async fn over_funded_budget_never_reaches_backend() {
    let server = mock_backend().await;
    mount_csrf(&server).await;
    let client = client_for(&server);

    let draft = BudgetDraft::without_tool("112", 10_000.0)
        .government_treasury(8_000.0)
        .partners_funding(4_000.0);
    let err = activities::update_budget(&client, draft).await.unwrap_err();

    assert!(matches!(
        err,
        ApiError::Budget(BudgetError::FundingExceedsCost { .. })
    ));
    assert_eq!(err.to_string(), "Total funding cannot exceed estimated cost");
    assert!(received(&server).await.is_empty());
}

#[tokio::test]
async fn budget_upsert_posts_reconciled_payload() {
    let server = mock_backend().await;
    mount_csrf(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/main-activities/112/budget/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(training_budget_json(112)))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server);

    let draft = BudgetDraft::with_tool("112", training_calculation())
        .government_treasury(50_000.0)
        .sdg_funding(31_000.0);
    let stored = activities::update_budget(&client, draft).await.unwrap();

    assert_eq!(stored.activity_id, "112");
    assert_eq!(stored.estimated_cost(), 81_000.0);
    assert_eq!(stored.summary().funding_gap, 0.0);

    let requests = server.received_requests().await.unwrap();
    let post = requests
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .expect("budget POST");
    let body: Value = serde_json::from_slice(&post.body).unwrap();
    assert_eq!(body["activity_id"], "112");
    assert_eq!(body["budget_calculation_type"], "WITH_TOOL");
    assert_eq!(body["estimated_cost_with_tool"].as_f64(), Some(81_000.0));
    assert_eq!(body["estimated_cost_without_tool"].as_f64(), Some(0.0));
    assert_eq!(body["training_details"]["totalBudget"].as_f64(), Some(81_000.0));
}

#[tokio::test]
async fn budget_lookup_accepts_list_or_object() {
    let server = mock_backend().await;
    Mock::given(method("GET"))
        .and(path("/api/activity-budgets/"))
        .and(query_param("activity", "112"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([training_budget_json(112)])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/activity-budgets/"))
        .and(query_param("activity", "113"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    let client = client_for(&server);

    let found = budgets::get_by_activity(&client, "112").await.unwrap().unwrap();
    assert_eq!(found.activity_id, "112");
    assert_eq!(found.summary().total_funding, 81_000.0);

    assert!(budgets::get_by_activity(&client, "113").await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

#[tokio::test]
async fn plan_fetch_normalizes_loose_shapes() {
    let server = mock_backend().await;
    mount_get(&server, "/api/plans/42/", messy_plan_json()).await;
    let client = client_for(&server);

    let plan = plans::get(&client, "42").await.unwrap().unwrap();

    assert_eq!(plan.id, "42");
    assert_eq!(plan.objectives.len(), 1);
    let initiative = &plan.objectives[0].initiatives[0];
    assert!(initiative.performance_measures.is_empty());
    assert_eq!(initiative.main_activities.len(), 1);
    assert_eq!(initiative.main_activities[0].selected_months, vec![Month::Jan]);
    assert!(plan.reviews.is_empty());
}

#[tokio::test]
async fn missing_plan_is_none() {
    let server = mock_backend().await;
    Mock::given(method("GET"))
        .and(path("/api/plans/404/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found."})))
        .mount(&server)
        .await;
    let client = client_for(&server);

    assert!(plans::get(&client, "404").await.unwrap().is_none());
    assert!(matches!(
        plans::get(&client, " ").await,
        Err(ApiError::Invalid(_))
    ));
}

#[tokio::test]
async fn valid_plan_is_submitted() {
    let server = mock_backend().await;
    mount_csrf(&server).await;
    mount_get(&server, "/api/plans/42/", valid_plan_json()).await;
    Mock::given(method("POST"))
        .and(path("/api/plans/42/submit/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"detail": "Plan submitted"})))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server);

    let report = plans::submit(&client, "42").await.unwrap();

    assert!(report.is_submittable());
    // The procurement activity is under-funded, which only warns.
    assert_eq!(report.warnings().count(), 1);
}

#[tokio::test]
async fn invalid_plan_is_not_submitted() {
    let server = mock_backend().await;
    mount_csrf(&server).await;
    mount_get(&server, "/api/plans/5/", draft_plan(5)).await;
    let client = client_for(&server);

    let err = plans::submit(&client, "5").await.unwrap_err();

    assert!(matches!(
        err,
        ApiError::Workflow(WorkflowError::NotSubmittable { .. })
    ));
    assert!(err.is_local());
    assert!(received_mutations(&server).await.is_empty());
}

#[tokio::test]
async fn draft_cannot_be_approved() {
    let server = mock_backend().await;
    mount_csrf(&server).await;
    mount_get(&server, "/api/plans/5/", draft_plan(5)).await;
    let client = client_for(&server);

    let err = plans::approve(&client, "5", None).await.unwrap_err();

    match err {
        ApiError::Workflow(WorkflowError::InvalidTransition { from, to }) => {
            assert_eq!(from, PlanStatus::Draft);
            assert_eq!(to, PlanStatus::Approved);
        }
        other => panic!("expected InvalidTransition, got {other:?}"),
    }
    assert!(received_mutations(&server).await.is_empty());
}

#[tokio::test]
async fn rejection_needs_feedback() {
    let server = mock_backend().await;
    let client = client_for(&server);

    let err = plans::reject(&client, "42", "   ").await.unwrap_err();

    assert!(matches!(
        err,
        ApiError::Workflow(WorkflowError::MissingFeedback)
    ));
    assert!(received(&server).await.is_empty());
}

#[tokio::test]
async fn submitted_plan_is_rejected_with_feedback() {
    let server = mock_backend().await;
    mount_csrf(&server).await;
    let mut submitted = valid_plan_json();
    submitted["status"] = json!("SUBMITTED");
    mount_get(&server, "/api/plans/42/", submitted).await;
    Mock::given(method("POST"))
        .and(path("/api/plans/42/reject/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "detail": "Plan rejected",
            "status": "REJECTED"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server);

    let response = plans::reject(&client, "42", "Targets are too low").await.unwrap();

    assert_eq!(response.status.as_deref(), Some("REJECTED"));
    let requests = server.received_requests().await.unwrap();
    let post = requests
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .expect("reject POST");
    let body: Value = serde_json::from_slice(&post.body).unwrap();
    assert_eq!(body, json!({"feedback": "Targets are too low"}));
}

#[tokio::test]
async fn pending_reviews_filter_by_status() {
    let server = mock_backend().await;
    let mut submitted = valid_plan_json();
    submitted["status"] = json!("SUBMITTED");
    Mock::given(method("GET"))
        .and(path("/api/plans/"))
        .and(query_param("status", "SUBMITTED"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([submitted])))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server);

    let pending = plans::pending_reviews(&client).await.unwrap();

    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].status, PlanStatus::Submitted);
}
