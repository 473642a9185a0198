//! Flatten a plan into review rows and budget totals.
//!
//! Each initiative contributes `max(measures, activities)` rows, pairing the
//! measure and activity at the same index. The objective number and title
//! appear on the first row of the objective's block, the initiative name on
//! the first row of its own block; later rows leave them blank. An objective
//! without initiatives, or an initiative without measures and activities,
//! still gets one row carrying its weight.

pub mod export;

use serde::Serialize;

use crate::budget::FundingSources;
use crate::model::{MainActivity, PerformanceMeasure, PlanDocument, StrategicInitiative};

pub use export::{ExportError, ExportFormat};

/// Column headers shared by every export format, in order.
pub const HEADERS: [&str; 11] = [
    "No",
    "Strategic Objective",
    "Initiative",
    "Performance Measure/Main Activity",
    "Type",
    "Weight",
    "Baseline",
    "Target",
    "Period",
    "Implementor Team/Desk",
    "Budget",
];

/// Text used for cells that have no value.
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowKind {
    #[serde(rename = "Performance Measure")]
    PerformanceMeasure,
    #[serde(rename = "Main Activity")]
    MainActivity,
}

impl RowKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::PerformanceMeasure => "Performance Measure",
            Self::MainActivity => "Main Activity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Target {
    pub annual: f64,
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
    pub q4: f64,
}

impl From<&PerformanceMeasure> for Target {
    fn from(m: &PerformanceMeasure) -> Self {
        Self {
            annual: m.annual_target,
            q1: m.q1_target,
            q2: m.q2_target,
            q3: m.q3_target,
            q4: m.q4_target,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BudgetCell {
    pub total: f64,
    pub treasury: f64,
    pub sdg: f64,
    pub partners: f64,
    pub other: f64,
}

/// One flattened row. `None` renders as blank for the grouping columns
/// and as `N/A` for the measure/activity detail columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanRow {
    pub number: Option<usize>,
    pub objective: Option<String>,
    pub initiative: Option<String>,
    pub name: String,
    pub kind: Option<RowKind>,
    pub weight: Option<f64>,
    pub baseline: Option<String>,
    pub target: Option<Target>,
    pub period: Option<Vec<String>>,
    pub implementor: Option<String>,
    pub budget: Option<BudgetCell>,
}

/// Budget totals across every activity in the plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BudgetTotals {
    /// Sum of each budget's selected cost.
    pub total: f64,
    pub funding: FundingSources,
    pub activities_with_budget: usize,
}

impl BudgetTotals {
    pub fn total_funding(&self) -> f64 {
        self.funding.total()
    }

    pub fn funding_gap(&self) -> f64 {
        self.total - self.funding.total()
    }
}

/// Assembled review table for one plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanTable {
    pub organization: String,
    pub planner: String,
    pub period: Option<String>,
    pub rows: Vec<PlanRow>,
    pub totals: BudgetTotals,
}

/// Build the review table for a normalized plan.
pub fn assemble(plan: &PlanDocument) -> PlanTable {
    let implementor = if plan.organization_name.trim().is_empty() {
        None
    } else {
        Some(plan.organization_name.clone())
    };

    let mut rows = Vec::new();
    for (obj_index, objective) in plan.objectives.iter().enumerate() {
        let initiatives = objective.all_initiatives();
        if initiatives.is_empty() {
            let mut row = placeholder_row(objective.weight);
            row.number = Some(obj_index + 1);
            row.objective = Some(objective.title.clone());
            rows.push(row);
            continue;
        }

        let mut first_of_objective = true;
        for initiative in initiatives {
            let mut block: Vec<PlanRow> =
                initiative_rows(initiative, implementor.as_deref()).collect();
            if block.is_empty() {
                block.push(placeholder_row(initiative.weight));
            }
            for (i, mut row) in block.into_iter().enumerate() {
                if first_of_objective {
                    row.number = Some(obj_index + 1);
                    row.objective = Some(objective.title.clone());
                    first_of_objective = false;
                }
                if i == 0 {
                    row.initiative = Some(initiative.name.clone());
                }
                rows.push(row);
            }
        }
    }

    let period = match (plan.from_date, plan.to_date) {
        (Some(from), Some(to)) => Some(format!("{from} to {to}")),
        _ => None,
    };

    PlanTable {
        organization: plan.organization_name.clone(),
        planner: plan.planner_name.clone(),
        period,
        rows,
        totals: budget_totals(plan),
    }
}

fn initiative_rows<'a>(
    initiative: &'a StrategicInitiative,
    implementor: Option<&'a str>,
) -> impl Iterator<Item = PlanRow> + 'a {
    let measures = &initiative.performance_measures;
    let activities = &initiative.main_activities;
    let len = measures.len().max(activities.len());
    (0..len).map(move |i| pair_row(measures.get(i), activities.get(i), implementor))
}

/// Row standing in for an objective without initiatives or an initiative
/// without measures and activities: only the weight is filled in.
fn placeholder_row(weight: f64) -> PlanRow {
    PlanRow {
        number: None,
        objective: None,
        initiative: None,
        name: String::new(),
        kind: None,
        weight: Some(weight),
        baseline: None,
        target: None,
        period: None,
        implementor: None,
        budget: None,
    }
}

fn pair_row(
    measure: Option<&PerformanceMeasure>,
    activity: Option<&MainActivity>,
    implementor: Option<&str>,
) -> PlanRow {
    let (name, kind, weight) = match (measure, activity) {
        (Some(m), _) => (m.name.clone(), Some(RowKind::PerformanceMeasure), Some(m.weight)),
        (None, Some(a)) => (a.name.clone(), Some(RowKind::MainActivity), Some(a.weight)),
        (None, None) => (String::new(), None, None),
    };

    PlanRow {
        number: None,
        objective: None,
        initiative: None,
        name,
        kind,
        weight,
        baseline: measure.map(|m| m.baseline.clone()),
        target: measure.map(Target::from),
        period: activity.map(MainActivity::period_labels),
        implementor: activity.and(implementor.map(str::to_owned)),
        budget: activity.and_then(|a| a.budget.as_ref()).map(|b| BudgetCell {
            total: b.estimated_cost(),
            treasury: b.government_treasury,
            sdg: b.sdg_funding,
            partners: b.partners_funding,
            other: b.other_funding,
        }),
    }
}

/// Sum each activity's selected cost and every funding source.
pub fn budget_totals(plan: &PlanDocument) -> BudgetTotals {
    let mut totals = BudgetTotals::default();
    for budget in plan.activities().filter_map(|a| a.budget.as_ref()) {
        totals.total += budget.estimated_cost();
        totals.funding += budget.funding();
        totals.activities_with_budget += 1;
    }
    totals
}

// ---------------------------------------------------------------------------
// Cell formatting shared by all exporters.

/// Format an amount with thousands separators and at most two decimals.
pub fn format_amount(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative && cents > 0 { "-" } else { "" };
    if frac == 0 {
        format!("{sign}{grouped}")
    } else if frac % 10 == 0 {
        format!("{sign}{grouped}.{}", frac / 10)
    } else {
        format!("{sign}{grouped}.{frac:02}")
    }
}

fn format_number(value: f64) -> String {
    crate::weight::pct(&value)
}

pub fn format_target(target: Option<&Target>) -> String {
    match target {
        None => NOT_AVAILABLE.to_owned(),
        Some(t) => format!(
            "Annual: {}\nQ1: {}\nQ2: {}\nQ3: {}\nQ4: {}",
            format_number(t.annual),
            format_number(t.q1),
            format_number(t.q2),
            format_number(t.q3),
            format_number(t.q4)
        ),
    }
}

pub fn format_period(period: Option<&[String]>) -> String {
    match period {
        None => NOT_AVAILABLE.to_owned(),
        Some(p) => p.join(", "),
    }
}

pub fn format_budget(budget: Option<&BudgetCell>) -> String {
    match budget {
        None => NOT_AVAILABLE.to_owned(),
        Some(b) => format!(
            "Total: {}\nTreasury: {}\nSDG: {}\nPartners: {}\nOther: {}",
            format_amount(b.total),
            format_amount(b.treasury),
            format_amount(b.sdg),
            format_amount(b.partners),
            format_amount(b.other)
        ),
    }
}

impl PlanRow {
    /// Text for every column, in [`HEADERS`] order.
    pub fn cells(&self) -> [String; 11] {
        [
            self.number.map(|n| n.to_string()).unwrap_or_default(),
            self.objective.clone().unwrap_or_default(),
            self.initiative.clone().unwrap_or_default(),
            self.name.clone(),
            self.kind.map(|k| k.label().to_owned()).unwrap_or_default(),
            self.weight
                .map(|w| format!("{}%", format_number(w)))
                .unwrap_or_default(),
            self.baseline
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_owned()),
            format_target(self.target.as_ref()),
            format_period(self.period.as_deref()),
            self.implementor
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_owned()),
            format_budget(self.budget.as_ref()),
        ]
    }
}
