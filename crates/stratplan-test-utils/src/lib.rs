//! Shared test utilities for stratplan integration tests.
//!
//! Plan payloads are plain JSON in the backend's wire shape, including its
//! quirks (decimal strings, singleton objects where arrays belong), so every
//! crate can feed them through its own parsing path.
//!
//! The mock backend is a [`wiremock::MockServer`] per test. Tests mount the
//! routes they need; [`mount_csrf`] covers the cookie handshake every
//! mutation goes through.

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CSRF_TOKEN: &str = "test-csrf-token";
pub const SESSION_ID: &str = "test-session";

// ---------------------------------------------------------------------------
// Plan fixtures
// ---------------------------------------------------------------------------

/// A plan that passes every blocking rule.
///
/// One objective (100) with one initiative (100): a single measure at 35
/// and two activities at 40 + 25. The training activity is fully funded
/// with a tool-computed cost; the procurement activity is 1000 short,
/// which is only a warning.
pub fn valid_plan_json() -> Value {
    json!({
        "id": 42,
        "organization": 3,
        "organization_name": "ICT Executive Office",
        "planner_name": "Almaz Tesfaye",
        "type": "LEAD_EXECUTIVE",
        "executive_name": "Dawit Bekele",
        "strategic_objective": 1,
        "fiscal_year": "2025/2026",
        "from_date": "2025-07-01",
        "to_date": "2026-06-30",
        "status": "DRAFT",
        "objectives": [objective_json()],
        "reviews": []
    })
}

/// Same plan as [`valid_plan_json`] with the loose shapes the backend
/// sometimes sends: singleton objects, nulls and a bare month string.
pub fn messy_plan_json() -> Value {
    let mut objective = objective_json();
    let mut initiative = objective["initiatives"][0].take();
    let mut activity = initiative["main_activities"][1].take();
    activity["selected_months"] = json!("JAN");
    initiative["main_activities"] = activity;
    initiative["performance_measures"] = Value::Null;
    objective["initiatives"] = initiative;
    objective["programs"] = Value::Null;

    json!({
        "id": "42",
        "organization_name": "ICT Executive Office",
        "planner_name": "Almaz Tesfaye",
        "status": "DRAFT",
        "objectives": objective,
        "reviews": null
    })
}

/// An objective with the given weight and nothing under it.
pub fn empty_objective_json(id: u64, weight: f64) -> Value {
    json!({
        "id": id,
        "title": format!("Objective {id}"),
        "description": "",
        "weight": weight,
        "programs": [],
        "initiatives": []
    })
}

fn objective_json() -> Value {
    json!({
        "id": 1,
        "title": "Improve maternal health",
        "description": "Reduce maternal mortality",
        "weight": "100.00",
        "programs": [],
        "initiatives": [{
            "id": 11,
            "name": "Expand antenatal care",
            "weight": "100.00",
            "strategic_objective": 1,
            "program": null,
            "subprogram": null,
            "performance_measures": [{
                "id": 111,
                "initiative": 11,
                "name": "ANC4 coverage",
                "weight": "35.00",
                "baseline": "60%",
                "q1_target": 15,
                "q2_target": 20,
                "q3_target": 20,
                "q4_target": 25,
                "annual_target": 80
            }],
            "main_activities": [
                {
                    "id": 112,
                    "initiative": 11,
                    "name": "Train midwives",
                    "weight": "40.00",
                    "selected_months": [],
                    "selected_quarters": ["Q1", "Q2"],
                    "budget": training_budget_json(112)
                },
                {
                    "id": 113,
                    "initiative": 11,
                    "name": "Supply delivery kits",
                    "weight": 25,
                    "selected_months": ["JAN", "FEB"],
                    "selected_quarters": [],
                    "budget": {
                        "id": 2,
                        "activity": 113,
                        "budget_calculation_type": "WITHOUT_TOOL",
                        "activity_type": "Procurement",
                        "estimated_cost_with_tool": "0.00",
                        "estimated_cost_without_tool": "5000.00",
                        "government_treasury": "4000.00",
                        "sdg_funding": "0.00",
                        "partners_funding": "0.00",
                        "other_funding": "0.00"
                    }
                }
            ]
        }]
    })
}

/// Training budget costed with the default rates: three days in Addis
/// Ababa for ten participants, 81000 in total.
pub fn training_budget_json(activity: u64) -> Value {
    json!({
        "id": 1,
        "activity": activity,
        "budget_calculation_type": "WITH_TOOL",
        "activity_type": "Training",
        "estimated_cost_with_tool": "81000.00",
        "estimated_cost_without_tool": "0.00",
        "government_treasury": "50000.00",
        "sdg_funding": "31000.00",
        "partners_funding": "0.00",
        "other_funding": "0.00",
        "training_details": {
            "description": "Midwife refresher training",
            "numberOfDays": 3,
            "numberOfParticipants": 10,
            "trainingLocation": "Addis_Ababa",
            "transportRequired": false,
            "totalBudget": 81000
        }
    })
}

/// Initiative JSON for API responses.
pub fn initiative_json(id: u64, name: &str, weight: f64, objective: u64) -> Value {
    json!({
        "id": id,
        "name": name,
        "weight": weight,
        "strategic_objective": objective,
        "program": null,
        "subprogram": null
    })
}

/// Main activity JSON for API responses.
pub fn activity_json(id: u64, initiative: u64, weight: f64) -> Value {
    json!({
        "id": id,
        "initiative": initiative,
        "name": format!("Activity {id}"),
        "weight": weight,
        "selected_months": ["JUL"],
        "selected_quarters": []
    })
}

// ---------------------------------------------------------------------------
// Mock backend
// ---------------------------------------------------------------------------

/// Start a fresh mock backend for one test.
pub async fn mock_backend() -> MockServer {
    MockServer::start().await
}

/// Base API URL for a mock backend, as the client expects it.
pub fn api_url(server: &MockServer) -> String {
    format!("{}/api", server.uri())
}

/// Serve the CSRF handshake, setting the `csrftoken` cookie.
pub async fn mount_csrf(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/auth/csrf/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", format!("csrftoken={CSRF_TOKEN}; Path=/").as_str())
                .set_body_json(json!({"detail": "CSRF cookie set"})),
        )
        .mount(server)
        .await;
}

/// Serve a successful login for `username`, setting the session cookie.
pub async fn mount_login(server: &MockServer, username: &str) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "set-cookie",
                    format!("sessionid={SESSION_ID}; Path=/; HttpOnly").as_str(),
                )
                .set_body_json(json!({
                    "success": true,
                    "user": user_json(username),
                    "userOrganizations": [{
                        "id": 1,
                        "user": 7,
                        "organization": 3,
                        "organization_name": "ICT Executive Office",
                        "role": "PLANNER"
                    }]
                })),
        )
        .mount(server)
        .await;
}

pub fn user_json(username: &str) -> Value {
    json!({
        "id": 7,
        "username": username,
        "email": format!("{username}@example.org"),
        "first_name": "Almaz",
        "last_name": "Tesfaye"
    })
}

/// `(METHOD, path)` of every request the mock backend received, in order.
pub async fn received(server: &MockServer) -> Vec<(String, String)> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| (r.method.to_string(), r.url.path().to_owned()))
        .collect()
}

/// Every non-GET request, in order.
pub async fn received_mutations(server: &MockServer) -> Vec<(String, String)> {
    received(server)
        .await
        .into_iter()
        .filter(|(m, _)| m != "GET")
        .collect()
}
