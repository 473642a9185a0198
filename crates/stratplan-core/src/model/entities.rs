use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::enums::{
    ActivityType, BudgetCalculationType, Month, PlanStatus, PlanType, Quarter, ReviewStatus,
};
use super::lenient;

/// Top-level strategic objective. Objective weights across a plan sum to 100.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategicObjective {
    #[serde(default, deserialize_with = "lenient::identifier")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub weight: f64,
    #[serde(default)]
    pub programs: Vec<Program>,
    #[serde(default)]
    pub initiatives: Vec<StrategicInitiative>,
}

impl StrategicObjective {
    pub fn programs_weight(&self) -> f64 {
        self.programs.iter().map(|p| p.weight).sum()
    }

    /// Every initiative under this objective: direct ones first, then those
    /// attached to its programs and subprograms. An initiative id listed at
    /// more than one level is yielded once.
    pub fn all_initiatives(&self) -> Vec<&StrategicInitiative> {
        let mut seen = HashSet::new();
        let program_initiatives = self.programs.iter().flat_map(|p| {
            p.initiatives
                .iter()
                .chain(p.subprograms.iter().flat_map(|s| s.initiatives.iter()))
        });
        self.initiatives
            .iter()
            .chain(program_initiatives)
            .filter(|i| i.id.is_empty() || seen.insert(i.id.as_str()))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default, deserialize_with = "lenient::identifier")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::optional_identifier")]
    pub strategic_objective: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub weight: f64,
    #[serde(default)]
    pub subprograms: Vec<SubProgram>,
    #[serde(default)]
    pub initiatives: Vec<StrategicInitiative>,
}

impl Program {
    pub fn subprograms_weight(&self) -> f64 {
        self.subprograms.iter().map(|s| s.weight).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubProgram {
    #[serde(default, deserialize_with = "lenient::identifier")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::optional_identifier")]
    pub program: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub weight: f64,
    #[serde(default)]
    pub initiatives: Vec<StrategicInitiative>,
}

// ---------------------------------------------------------------------------

/// The single parent an initiative is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitiativeParent {
    Objective(String),
    Program(String),
    SubProgram(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategicInitiative {
    #[serde(default, deserialize_with = "lenient::identifier")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub weight: f64,
    #[serde(default, deserialize_with = "lenient::optional_identifier")]
    pub strategic_objective: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_identifier")]
    pub program: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_identifier")]
    pub subprogram: Option<String>,
    #[serde(default)]
    pub performance_measures: Vec<PerformanceMeasure>,
    #[serde(default)]
    pub main_activities: Vec<MainActivity>,
}

impl StrategicInitiative {
    /// Number of non-null parent references. Valid initiatives have exactly one.
    pub fn parent_count(&self) -> usize {
        [&self.strategic_objective, &self.program, &self.subprogram]
            .into_iter()
            .filter(|p| p.is_some())
            .count()
    }

    /// The parent reference, or `None` when zero or several are set.
    pub fn parent(&self) -> Option<InitiativeParent> {
        if self.parent_count() != 1 {
            return None;
        }
        if let Some(id) = &self.strategic_objective {
            return Some(InitiativeParent::Objective(id.clone()));
        }
        if let Some(id) = &self.program {
            return Some(InitiativeParent::Program(id.clone()));
        }
        self.subprogram.clone().map(InitiativeParent::SubProgram)
    }

    pub fn measures_weight(&self) -> f64 {
        self.performance_measures.iter().map(|m| m.weight).sum()
    }

    pub fn activities_weight(&self) -> f64 {
        self.main_activities.iter().map(|a| a.weight).sum()
    }
}

// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMeasure {
    #[serde(default, deserialize_with = "lenient::identifier")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::optional_identifier")]
    pub initiative: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub weight: f64,
    #[serde(default, deserialize_with = "lenient::text")]
    pub baseline: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub q1_target: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub q2_target: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub q3_target: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub q4_target: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub annual_target: f64,
}

impl PerformanceMeasure {
    pub fn quarterly_targets(&self) -> [f64; 4] {
        [self.q1_target, self.q2_target, self.q3_target, self.q4_target]
    }

    pub fn quarterly_sum(&self) -> f64 {
        self.quarterly_targets().iter().sum()
    }
}

// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MainActivity {
    #[serde(default, deserialize_with = "lenient::identifier")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::optional_identifier")]
    pub initiative: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub weight: f64,
    #[serde(default)]
    pub selected_months: Vec<Month>,
    #[serde(default)]
    pub selected_quarters: Vec<Quarter>,
    #[serde(default)]
    pub budget: Option<ActivityBudget>,
}

impl MainActivity {
    /// Display labels for the activity period: the quarters when any are
    /// selected, otherwise the months.
    pub fn period_labels(&self) -> Vec<String> {
        if self.selected_quarters.is_empty() {
            self.selected_months.iter().map(ToString::to_string).collect()
        } else {
            self.selected_quarters.iter().map(ToString::to_string).collect()
        }
    }

    /// Months covered by the schedule, in fiscal order, with quarters
    /// expanded to their months.
    pub fn scheduled_months(&self) -> Vec<Month> {
        let months: BTreeSet<Month> = self
            .selected_months
            .iter()
            .copied()
            .chain(self.selected_quarters.iter().flat_map(|q| q.months()))
            .collect();
        months.into_iter().collect()
    }
}

// ---------------------------------------------------------------------------

/// Budget attached to a main activity.
///
/// Exactly one of the two estimated-cost fields is meaningful, chosen by
/// `budget_calculation_type`. The `<type>_details` fields hold the costing
/// tool output verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityBudget {
    #[serde(
        default,
        deserialize_with = "lenient::optional_identifier",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, alias = "activity", deserialize_with = "lenient::identifier")]
    pub activity_id: String,
    #[serde(default)]
    pub budget_calculation_type: BudgetCalculationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<ActivityType>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub estimated_cost_with_tool: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub estimated_cost_without_tool: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub government_treasury: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub sdg_funding: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub partners_funding: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub other_funding: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_workshop_details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procurement_details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub printing_details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervision_details: Option<Value>,
}

// ---------------------------------------------------------------------------

/// Append-only evaluator decision on a submitted plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReview {
    #[serde(default, deserialize_with = "lenient::identifier")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::identifier")]
    pub plan: String,
    #[serde(default, deserialize_with = "lenient::identifier")]
    pub evaluator: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub evaluator_name: String,
    pub status: ReviewStatus,
    #[serde(default, deserialize_with = "lenient::text")]
    pub feedback: String,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// A plan with its full objective tree, in canonical shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanDocument {
    #[serde(default, deserialize_with = "lenient::identifier")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::identifier")]
    pub organization: String,
    #[serde(default, alias = "organizationName", deserialize_with = "lenient::text")]
    pub organization_name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub planner_name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub plan_type: Option<PlanType>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub executive_name: String,
    #[serde(default, deserialize_with = "lenient::optional_identifier")]
    pub strategic_objective: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub fiscal_year: String,
    #[serde(default)]
    pub from_date: Option<NaiveDate>,
    #[serde(default)]
    pub to_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: PlanStatus,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub objectives: Vec<StrategicObjective>,
    #[serde(default)]
    pub reviews: Vec<PlanReview>,
}

impl PlanDocument {
    pub fn objectives_weight(&self) -> f64 {
        self.objectives.iter().map(|o| o.weight).sum()
    }

    /// Every main activity in the plan, in tree order.
    pub fn activities(&self) -> impl Iterator<Item = &MainActivity> {
        self.objectives
            .iter()
            .flat_map(|o| o.all_initiatives())
            .flat_map(|i| i.main_activities.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn initiative_parent_requires_exactly_one_reference() {
        let mut initiative = StrategicInitiative {
            strategic_objective: Some("1".into()),
            ..Default::default()
        };
        assert_eq!(
            initiative.parent(),
            Some(InitiativeParent::Objective("1".into()))
        );

        initiative.program = Some("2".into());
        assert_eq!(initiative.parent_count(), 2);
        assert_eq!(initiative.parent(), None);

        initiative.strategic_objective = None;
        initiative.program = None;
        assert_eq!(initiative.parent(), None);
    }

    #[test]
    fn budget_fields_accept_decimal_strings() {
        let budget: ActivityBudget = serde_json::from_value(json!({
            "activity": 12,
            "budget_calculation_type": "WITH_TOOL",
            "activity_type": "Training",
            "estimated_cost_with_tool": "81000.00",
            "estimated_cost_without_tool": null,
            "government_treasury": "50000",
            "sdg_funding": 1000
        }))
        .unwrap();
        assert_eq!(budget.activity_id, "12");
        assert_eq!(budget.estimated_cost_with_tool, 81000.0);
        assert_eq!(budget.estimated_cost_without_tool, 0.0);
        assert_eq!(budget.government_treasury, 50000.0);
        assert_eq!(budget.partners_funding, 0.0);
    }

    #[test]
    fn period_prefers_quarters() {
        let activity = MainActivity {
            selected_months: vec![Month::Jul],
            selected_quarters: vec![Quarter::Q2, Quarter::Q3],
            ..Default::default()
        };
        assert_eq!(activity.period_labels(), vec!["Q2", "Q3"]);

        let months_only = MainActivity {
            selected_months: vec![Month::Jan, Month::Aug],
            ..Default::default()
        };
        assert_eq!(months_only.period_labels(), vec!["JAN", "AUG"]);
    }

    #[test]
    fn quarters_expand_to_fiscal_months() {
        let activity = MainActivity {
            selected_quarters: vec![Quarter::Q3],
            selected_months: vec![Month::Jul],
            ..Default::default()
        };
        assert_eq!(
            activity.scheduled_months(),
            vec![Month::Jul, Month::Jan, Month::Feb, Month::Mar]
        );
    }

    #[test]
    fn all_initiatives_includes_program_levels_once() {
        let objective: StrategicObjective = serde_json::from_value(json!({
            "id": 1,
            "title": "Health",
            "weight": 100,
            "initiatives": [{"id": "a", "name": "A", "weight": 40, "strategic_objective": 1}],
            "programs": [{
                "id": 2,
                "name": "P",
                "weight": 30,
                "initiatives": [{"id": "b", "name": "B", "weight": 10, "program": 2}],
                "subprograms": [{
                    "id": 3,
                    "name": "S",
                    "weight": 10,
                    "initiatives": [
                        {"id": "c", "name": "C", "weight": 5, "subprogram": 3},
                        {"id": "a", "name": "A", "weight": 40, "strategic_objective": 1}
                    ]
                }]
            }]
        }))
        .unwrap();
        let names: Vec<_> = objective
            .all_initiatives()
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(objective.programs_weight(), 30.0);
    }
}
