//! Named plan validation rules.
//!
//! [`validate_plan`] runs every rule over a normalized plan and collects
//! issues instead of stopping at the first one. A plan can be submitted
//! only when no issue is [`Severity::Blocking`].
//!
//! | rule | blocks | warns |
//! |---|---|---|
//! | `objective-sum-100` | total != 100 | |
//! | `program-sum-objective` | programs > objective | |
//! | `subprogram-sum-program` | subprograms > program | |
//! | `initiative-sum-parent` | total != parent's available weight | |
//! | `initiative-single-parent` | zero or several parents | |
//! | `measure-sum-35pct` | total != 35% of initiative | |
//! | `activity-sum-65pct` | total != 65% of initiative | |
//! | `quarterly-le-annual` | | q1..q4 > annual |
//! | `period-exclusive` | no period, or months and quarters both set | |
//! | `funding-le-cost` | funding > cost | funding < cost |
//! | `cost-field-exclusive` | | unselected cost field non-zero |
//! | `transport-le-total` | travellers > attendees | |
//! | `plan-dates` | to_date <= from_date | dates missing |

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::budget::FundingStatus;
use crate::model::{
    ActivityBudget, MainActivity, Month, PlanDocument, Program, Quarter, StrategicInitiative,
    StrategicObjective,
};
use crate::weight::{EPSILON, WeightAllocator, WeightSummary, pct};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rule {
    #[serde(rename = "objective-sum-100")]
    ObjectiveSum100,
    ProgramSumObjective,
    SubprogramSumProgram,
    InitiativeSumParent,
    InitiativeSingleParent,
    #[serde(rename = "measure-sum-35pct")]
    MeasureSum35Pct,
    #[serde(rename = "activity-sum-65pct")]
    ActivitySum65Pct,
    QuarterlyLeAnnual,
    PeriodExclusive,
    FundingLeCost,
    CostFieldExclusive,
    TransportLeTotal,
    PlanDates,
}

impl Rule {
    pub fn name(self) -> &'static str {
        match self {
            Self::ObjectiveSum100 => "objective-sum-100",
            Self::ProgramSumObjective => "program-sum-objective",
            Self::SubprogramSumProgram => "subprogram-sum-program",
            Self::InitiativeSumParent => "initiative-sum-parent",
            Self::InitiativeSingleParent => "initiative-single-parent",
            Self::MeasureSum35Pct => "measure-sum-35pct",
            Self::ActivitySum65Pct => "activity-sum-65pct",
            Self::QuarterlyLeAnnual => "quarterly-le-annual",
            Self::PeriodExclusive => "period-exclusive",
            Self::FundingLeCost => "funding-le-cost",
            Self::CostFieldExclusive => "cost-field-exclusive",
            Self::TransportLeTotal => "transport-le-total",
            Self::PlanDates => "plan-dates",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Blocking,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Warning => "warning",
            Self::Blocking => "blocking",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub rule: Rule,
    pub severity: Severity,
    /// Location in the plan tree, e.g. `objectives[0].initiatives[2]`.
    pub path: String,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} at {}: {}",
            self.severity, self.rule, self.path, self.message
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn is_submittable(&self) -> bool {
        self.blocking().next().is_none()
    }

    pub fn blocking(&self) -> impl Iterator<Item = &Issue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Blocking)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }

    pub fn has(&self, rule: Rule) -> bool {
        self.issues.iter().any(|i| i.rule == rule)
    }

    fn push(&mut self, rule: Rule, severity: Severity, path: &str, message: impl Into<String>) {
        self.issues.push(Issue {
            rule,
            severity,
            path: path.to_owned(),
            message: message.into(),
        });
    }

    /// Report a sibling set that must total exactly its target.
    fn exact_sum(&mut self, rule: Rule, path: &str, what: &str, summary: WeightSummary) {
        if summary.is_valid {
            return;
        }
        let message = if summary.is_over_allocated() {
            format!(
                "{what} total {}%, exceeding {}% by {}%",
                pct(&summary.total),
                pct(&summary.expected),
                pct(&-summary.remaining)
            )
        } else {
            format!(
                "{what} total {}% of {}% ({}% remaining)",
                pct(&summary.total),
                pct(&summary.expected),
                pct(&summary.remaining)
            )
        };
        self.push(rule, Severity::Blocking, path, message);
    }

    /// Report a sibling set that may not exceed its cap.
    fn capped_sum(&mut self, rule: Rule, path: &str, what: &str, summary: WeightSummary) {
        if summary.is_over_allocated() {
            self.push(
                rule,
                Severity::Blocking,
                path,
                format!(
                    "{what} total {}%, exceeding {}%",
                    pct(&summary.total),
                    pct(&summary.expected)
                ),
            );
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for issue in &self.issues {
            writeln!(f, "{issue}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------

/// Run every rule over a plan.
pub fn validate_plan(plan: &PlanDocument) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_dates(plan, &mut report);

    let weights: Vec<f64> = plan.objectives.iter().map(|o| o.weight).collect();
    report.exact_sum(
        Rule::ObjectiveSum100,
        "objectives",
        "Strategic objectives",
        WeightAllocator::objectives().summary(&weights),
    );

    for (i, objective) in plan.objectives.iter().enumerate() {
        check_objective(objective, &format!("objectives[{i}]"), &mut report);
    }

    tracing::debug!(
        plan_id = %plan.id,
        issues = report.issues.len(),
        submittable = report.is_submittable(),
        "plan validated"
    );
    report
}

fn check_dates(plan: &PlanDocument, report: &mut ValidationReport) {
    match (plan.from_date, plan.to_date) {
        (Some(from), Some(to)) if to <= from => report.push(
            Rule::PlanDates,
            Severity::Blocking,
            "plan",
            format!("End date {to} must be after start date {from}"),
        ),
        (Some(_), Some(_)) => {}
        _ => report.push(
            Rule::PlanDates,
            Severity::Warning,
            "plan",
            "Planning period is incomplete",
        ),
    }
}

fn check_objective(objective: &StrategicObjective, path: &str, report: &mut ValidationReport) {
    let program_weights: Vec<f64> = objective.programs.iter().map(|p| p.weight).collect();
    report.capped_sum(
        Rule::ProgramSumObjective,
        path,
        &format!("Programs of objective \"{}\"", objective.title),
        WeightAllocator::programs(objective).summary(&program_weights),
    );

    check_initiatives(
        &objective.initiatives,
        WeightAllocator::objective_initiatives(objective),
        &format!("objective \"{}\"", objective.title),
        path,
        report,
    );

    for (i, program) in objective.programs.iter().enumerate() {
        check_program(program, &format!("{path}.programs[{i}]"), report);
    }
}

fn check_program(program: &Program, path: &str, report: &mut ValidationReport) {
    let weights: Vec<f64> = program.subprograms.iter().map(|s| s.weight).collect();
    report.capped_sum(
        Rule::SubprogramSumProgram,
        path,
        &format!("Subprograms of program \"{}\"", program.name),
        WeightAllocator::subprograms(program).summary(&weights),
    );

    check_initiatives(
        &program.initiatives,
        WeightAllocator::program_initiatives(program),
        &format!("program \"{}\"", program.name),
        path,
        report,
    );

    for (i, sub) in program.subprograms.iter().enumerate() {
        check_initiatives(
            &sub.initiatives,
            WeightAllocator::subprogram_initiatives(sub),
            &format!("subprogram \"{}\"", sub.name),
            &format!("{path}.subprograms[{i}]"),
            report,
        );
    }
}

fn check_initiatives(
    initiatives: &[StrategicInitiative],
    allocator: WeightAllocator,
    parent: &str,
    path: &str,
    report: &mut ValidationReport,
) {
    let weights: Vec<f64> = initiatives.iter().map(|i| i.weight).collect();
    report.exact_sum(
        Rule::InitiativeSumParent,
        &format!("{path}.initiatives"),
        &format!("Initiatives of {parent}"),
        allocator.summary(&weights),
    );

    for (i, initiative) in initiatives.iter().enumerate() {
        check_initiative(initiative, &format!("{path}.initiatives[{i}]"), report);
    }
}

fn check_initiative(initiative: &StrategicInitiative, path: &str, report: &mut ValidationReport) {
    if initiative.parent().is_none() {
        report.push(
            Rule::InitiativeSingleParent,
            Severity::Blocking,
            path,
            format!(
                "Initiative \"{}\" must belong to exactly one objective, program or subprogram (has {})",
                initiative.name,
                initiative.parent_count()
            ),
        );
    }

    let measures: Vec<f64> = initiative
        .performance_measures
        .iter()
        .map(|m| m.weight)
        .collect();
    report.exact_sum(
        Rule::MeasureSum35Pct,
        &format!("{path}.performance_measures"),
        &format!("Performance measures of \"{}\"", initiative.name),
        WeightAllocator::measures(initiative).summary(&measures),
    );

    let activities: Vec<f64> = initiative.main_activities.iter().map(|a| a.weight).collect();
    report.exact_sum(
        Rule::ActivitySum65Pct,
        &format!("{path}.main_activities"),
        &format!("Main activities of \"{}\"", initiative.name),
        WeightAllocator::activities(initiative).summary(&activities),
    );

    for (i, measure) in initiative.performance_measures.iter().enumerate() {
        let quarterly = measure.quarterly_sum();
        if quarterly > measure.annual_target + EPSILON {
            report.push(
                Rule::QuarterlyLeAnnual,
                Severity::Warning,
                &format!("{path}.performance_measures[{i}]"),
                format!(
                    "Quarterly targets of \"{}\" sum to {}, above the annual target {}",
                    measure.name,
                    pct(&quarterly),
                    pct(&measure.annual_target)
                ),
            );
        }
    }

    for (i, activity) in initiative.main_activities.iter().enumerate() {
        check_activity(activity, &format!("{path}.main_activities[{i}]"), report);
    }
}

/// Problem with an activity's schedule: nothing selected, or months and
/// quarters mixed.
pub fn period_problem(name: &str, months: &[Month], quarters: &[Quarter]) -> Option<String> {
    match (months.is_empty(), quarters.is_empty()) {
        (true, true) => Some(format!("Activity \"{name}\" has no month or quarter selected")),
        (false, false) => Some(format!("Activity \"{name}\" selects both months and quarters")),
        _ => None,
    }
}

fn check_activity(activity: &MainActivity, path: &str, report: &mut ValidationReport) {
    if let Some(message) = period_problem(
        &activity.name,
        &activity.selected_months,
        &activity.selected_quarters,
    ) {
        report.push(Rule::PeriodExclusive, Severity::Blocking, path, message);
    }

    if let Some(budget) = &activity.budget {
        check_budget(budget, &activity.name, &format!("{path}.budget"), report);
    }
}

fn check_budget(budget: &ActivityBudget, activity: &str, path: &str, report: &mut ValidationReport) {
    let summary = budget.summary();
    match summary.status() {
        FundingStatus::Surplus(amount) => report.push(
            Rule::FundingLeCost,
            Severity::Blocking,
            path,
            format!("Funding for \"{activity}\" exceeds estimated cost by {amount:.2}"),
        ),
        FundingStatus::Deficit(amount) => report.push(
            Rule::FundingLeCost,
            Severity::Warning,
            path,
            format!("Funding for \"{activity}\" is {amount:.2} short of estimated cost"),
        ),
        FundingStatus::Balanced => {}
    }

    if budget.unselected_cost().abs() > EPSILON {
        report.push(
            Rule::CostFieldExclusive,
            Severity::Warning,
            path,
            format!(
                "Budget for \"{activity}\" is {} but also carries a {} cost",
                budget.budget_calculation_type,
                match budget.budget_calculation_type {
                    crate::model::BudgetCalculationType::WithTool => "manual",
                    crate::model::BudgetCalculationType::WithoutTool => "tool",
                }
            ),
        );
    }

    let details = [
        (&budget.training_details, "numberOfParticipants", "landTransportParticipants", "airTransportParticipants"),
        (&budget.meeting_workshop_details, "numberOfParticipants", "landTransportParticipants", "airTransportParticipants"),
        (&budget.supervision_details, "numberOfSupervisors", "landTransportSupervisors", "airTransportSupervisors"),
    ];
    for (detail, total_key, land_key, air_key) in details {
        let Some(detail) = detail else { continue };
        if detail.get("transportRequired").and_then(Value::as_bool) != Some(true) {
            continue;
        }
        let count = |key: &str| detail.get(key).and_then(Value::as_f64).unwrap_or(0.0);
        let travellers = count(land_key) + count(air_key);
        let total = count(total_key);
        if travellers > total {
            report.push(
                Rule::TransportLeTotal,
                Severity::Blocking,
                path,
                format!(
                    "Budget for \"{activity}\" transports {travellers} of {total} attendees"
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BudgetCalculationType, Month, PerformanceMeasure, Quarter};
    use chrono::NaiveDate;
    use serde_json::json;

    fn balanced_plan() -> PlanDocument {
        let initiative = StrategicInitiative {
            id: "i1".into(),
            name: "Immunization".into(),
            weight: 100.0,
            strategic_objective: Some("o1".into()),
            performance_measures: vec![PerformanceMeasure {
                name: "Coverage".into(),
                weight: 35.0,
                annual_target: 100.0,
                q1_target: 25.0,
                q2_target: 25.0,
                q3_target: 25.0,
                q4_target: 25.0,
                ..Default::default()
            }],
            main_activities: vec![MainActivity {
                name: "Campaign".into(),
                weight: 65.0,
                selected_quarters: vec![Quarter::Q1],
                ..Default::default()
            }],
            ..Default::default()
        };
        PlanDocument {
            id: "p1".into(),
            from_date: NaiveDate::from_ymd_opt(2025, 7, 1),
            to_date: NaiveDate::from_ymd_opt(2026, 6, 30),
            objectives: vec![StrategicObjective {
                id: "o1".into(),
                title: "Health".into(),
                weight: 100.0,
                initiatives: vec![initiative],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn balanced_plan_is_submittable() {
        let report = validate_plan(&balanced_plan());
        assert!(report.is_submittable(), "{report}");
        assert!(report.issues.is_empty(), "{report}");
    }

    #[test]
    fn empty_objective_blocks_submission() {
        let mut plan = balanced_plan();
        plan.objectives[0].initiatives.clear();
        let report = validate_plan(&plan);
        assert!(!report.is_submittable());
        let issue = report
            .blocking()
            .find(|i| i.rule == Rule::InitiativeSumParent)
            .unwrap();
        assert!(issue.message.contains("100% remaining"), "{}", issue.message);
    }

    #[test]
    fn quarterly_over_annual_only_warns() {
        let mut plan = balanced_plan();
        plan.objectives[0].initiatives[0].performance_measures[0].q4_target = 40.0;
        let report = validate_plan(&plan);
        assert!(report.has(Rule::QuarterlyLeAnnual));
        assert!(report.is_submittable());
    }

    #[test]
    fn both_period_kinds_block() {
        let mut plan = balanced_plan();
        plan.objectives[0].initiatives[0].main_activities[0].selected_months = vec![Month::Jul];
        let report = validate_plan(&plan);
        assert!(report.blocking().any(|i| i.rule == Rule::PeriodExclusive));
    }

    #[test]
    fn over_funding_blocks_under_funding_warns() {
        let mut plan = balanced_plan();
        let budget = ActivityBudget {
            budget_calculation_type: BudgetCalculationType::WithTool,
            estimated_cost_with_tool: 10_000.0,
            government_treasury: 12_000.0,
            ..Default::default()
        };
        plan.objectives[0].initiatives[0].main_activities[0].budget = Some(budget.clone());
        assert!(!validate_plan(&plan).is_submittable());

        plan.objectives[0].initiatives[0].main_activities[0].budget = Some(ActivityBudget {
            government_treasury: 4_000.0,
            ..budget
        });
        let report = validate_plan(&plan);
        assert!(report.is_submittable());
        assert!(report.warnings().any(|i| i.rule == Rule::FundingLeCost));
    }

    #[test]
    fn stored_transport_over_total_blocks() {
        let mut plan = balanced_plan();
        plan.objectives[0].initiatives[0].main_activities[0].budget = Some(ActivityBudget {
            budget_calculation_type: BudgetCalculationType::WithTool,
            estimated_cost_with_tool: 10_000.0,
            training_details: Some(json!({
                "numberOfParticipants": 3,
                "transportRequired": true,
                "landTransportParticipants": 2,
                "airTransportParticipants": 2
            })),
            ..Default::default()
        });
        assert!(validate_plan(&plan).blocking().any(|i| i.rule == Rule::TransportLeTotal));
    }

    #[test]
    fn reversed_dates_block() {
        let mut plan = balanced_plan();
        plan.to_date = NaiveDate::from_ymd_opt(2025, 1, 1);
        let report = validate_plan(&plan);
        assert!(report.blocking().any(|i| i.rule == Rule::PlanDates));
    }

    #[test]
    fn program_overflow_blocks() {
        let mut plan = balanced_plan();
        plan.objectives[0].programs.push(Program {
            name: "Big".into(),
            weight: 120.0,
            ..Default::default()
        });
        let report = validate_plan(&plan);
        assert!(report.has(Rule::ProgramSumObjective));
    }

    #[test]
    fn rule_names_serialize_as_kebab() {
        assert_eq!(
            serde_json::to_value(Rule::MeasureSum35Pct).unwrap(),
            json!("measure-sum-35pct")
        );
        assert_eq!(
            serde_json::to_value(Rule::InitiativeSumParent).unwrap(),
            json!(Rule::InitiativeSumParent.name())
        );
    }
}
