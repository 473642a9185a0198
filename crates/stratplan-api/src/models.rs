//! Wire types specific to the API: auth payloads, weight summaries and the
//! request bodies for create/update calls. Plan entities themselves live in
//! `stratplan_core::model`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use chrono::NaiveDate;

use stratplan_core::model::lenient;
use stratplan_core::model::{InitiativeParent, Month, PlanType, Quarter};
use stratplan_core::weight::WeightSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Planner,
    Evaluator,
    #[serde(other)]
    Other,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Admin => "ADMIN",
            Self::Planner => "PLANNER",
            Self::Evaluator => "EVALUATOR",
            Self::Other => "OTHER",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, deserialize_with = "lenient::identifier")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub username: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub first_name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub last_name: String,
}

impl User {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_owned()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserOrganization {
    #[serde(default, deserialize_with = "lenient::identifier")]
    pub organization: String,
    #[serde(default, alias = "organizationName", deserialize_with = "lenient::text")]
    pub organization_name: String,
    pub role: Role,
}

/// The signed-in user with their organization roles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentUser {
    pub user: User,
    pub organizations: Vec<UserOrganization>,
}

impl CurrentUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.organizations.iter().any(|o| o.role == role)
    }

    pub fn is_planner(&self) -> bool {
        self.has_role(Role::Planner)
    }

    pub fn is_evaluator(&self) -> bool {
        self.has_role(Role::Evaluator)
    }

    /// First organization the user plans for.
    pub fn planning_organization(&self) -> Option<&UserOrganization> {
        self.organizations.iter().find(|o| o.role == Role::Planner)
    }
}

/// Response of `/auth/check/` and `/auth/login/`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub user_organizations: Option<Vec<UserOrganization>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl AuthResponse {
    pub fn into_current_user(self) -> Option<CurrentUser> {
        self.user.map(|user| CurrentUser {
            user,
            organizations: self.user_organizations.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// `{"detail": ..., "status": ...}` returned by the plan actions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionResponse {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Feedback<'a> {
    pub feedback: &'a str,
}

/// Weight summary as the backend reports it.
///
/// The endpoints disagree on naming (`total_weight`,
/// `total_initiatives_weight`, `total_measures_weight`, ...) and on whether
/// the payload is wrapped in `data`; [`RemoteWeightSummary::from_value`]
/// accepts all of them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RemoteWeightSummary {
    pub parent_weight: Option<f64>,
    pub total: f64,
    pub expected: Option<f64>,
    pub remaining: Option<f64>,
    pub is_valid: Option<bool>,
}

impl RemoteWeightSummary {
    pub fn from_value(value: &Value) -> Self {
        let body = match value.get("data") {
            Some(data) if data.is_object() => data,
            _ => value,
        };
        let find = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| body.get(*k))
                .filter(|v| !v.is_null())
                .map(lenient::to_number)
        };
        Self {
            parent_weight: find(&["initiative_weight", "parent_weight"]),
            total: find(&[
                "total_weight",
                "total_initiatives_weight",
                "total_measures_weight",
                "total_activities_weight",
            ])
            .unwrap_or(0.0),
            expected: find(&[
                "expected_weight",
                "expected_measures_weight",
                "expected_activities_weight",
            ]),
            remaining: find(&["remaining_weight"]),
            is_valid: body.get("is_valid").and_then(Value::as_bool),
        }
    }

    /// Fill the gaps with `expected` (the cap the caller knows applies).
    pub fn resolve(&self, expected: f64) -> WeightSummary {
        let expected = self.expected.unwrap_or(expected);
        let remaining = self.remaining.unwrap_or(expected - self.total);
        WeightSummary {
            total: self.total,
            expected,
            remaining,
            is_valid: self
                .is_valid
                .unwrap_or((self.total - expected).abs() <= stratplan_core::weight::EPSILON),
        }
    }
}

/// Backend validation verdict (`validate_*_weight` endpoints).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightVerdict {
    pub is_valid: bool,
    pub message: String,
}

impl WeightVerdict {
    pub fn from_value(value: &Value) -> Self {
        let body = match value.get("data") {
            Some(data) if data.is_object() => data,
            _ => value,
        };
        Self {
            is_valid: body.get("is_valid").and_then(Value::as_bool).unwrap_or(false),
            message: body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
        }
    }
}

/// Items of a list response, which is either a bare array or an object
/// with a `data` or `results` array.
pub fn list_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => ["data", "results"]
            .iter()
            .find_map(|k| match map.remove(*k) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Request bodies

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveInput {
    pub title: String,
    pub description: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramInput {
    pub strategic_objective: String,
    pub name: String,
    pub description: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubProgramInput {
    pub program: String,
    pub name: String,
    pub description: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitiativeInput {
    pub name: String,
    pub weight: f64,
    pub strategic_objective: Option<String>,
    pub program: Option<String>,
    pub subprogram: Option<String>,
}

impl InitiativeInput {
    /// An initiative under exactly one parent.
    pub fn new(name: impl Into<String>, weight: f64, parent: &InitiativeParent) -> Self {
        let (mut objective, mut program, mut subprogram) = (None, None, None);
        match parent {
            InitiativeParent::Objective(id) => objective = Some(id.clone()),
            InitiativeParent::Program(id) => program = Some(id.clone()),
            InitiativeParent::SubProgram(id) => subprogram = Some(id.clone()),
        }
        Self {
            name: name.into(),
            weight,
            strategic_objective: objective,
            program,
            subprogram,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MeasureInput {
    pub initiative: String,
    pub name: String,
    pub weight: f64,
    pub baseline: String,
    pub q1_target: f64,
    pub q2_target: f64,
    pub q3_target: f64,
    pub q4_target: f64,
    pub annual_target: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityInput {
    pub initiative: String,
    pub name: String,
    pub weight: f64,
    pub selected_months: Vec<Month>,
    pub selected_quarters: Vec<Quarter>,
}

/// Body for creating or editing a draft plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanInput {
    pub organization: String,
    pub planner_name: String,
    #[serde(rename = "type")]
    pub plan_type: PlanType,
    pub executive_name: String,
    pub strategic_objective: String,
    pub fiscal_year: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
}

impl PlanInput {
    pub fn check_dates(&self) -> Result<(), String> {
        if self.to_date <= self.from_date {
            return Err("End date must be after start date".to_owned());
        }
        Ok(())
    }
}
