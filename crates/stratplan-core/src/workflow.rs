//! Plan lifecycle: submission and evaluator review.
//!
//! These checks run before any request reaches the backend. The backend
//! remains authoritative; a plan that passes here can still be refused
//! there (for example when another planner changed a weight meanwhile).

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{PlanDocument, PlanReview, PlanStatus, ReviewStatus};
use crate::rules::{ValidationReport, validate_plan};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
    #[error("invalid plan transition: {from} -> {to}")]
    InvalidTransition { from: PlanStatus, to: PlanStatus },

    #[error("plan has {} blocking issue(s); first: {}", .report.blocking().count(), first_blocking(.report))]
    NotSubmittable { report: ValidationReport },

    #[error("Feedback is required when rejecting a plan")]
    MissingFeedback,

    #[error("Evaluator is required")]
    MissingEvaluator,
}

fn first_blocking(report: &ValidationReport) -> String {
    report
        .blocking()
        .next()
        .map(ToString::to_string)
        .unwrap_or_default()
}

/// The plan state machine.
///
/// ```text
/// DRAFT     -> SUBMITTED
/// SUBMITTED -> APPROVED
/// SUBMITTED -> REJECTED
/// ```
///
/// Approved and rejected are terminal.
pub struct PlanStateMachine;

impl PlanStateMachine {
    pub fn is_valid_transition(from: PlanStatus, to: PlanStatus) -> bool {
        matches!(
            (from, to),
            (PlanStatus::Draft, PlanStatus::Submitted)
                | (PlanStatus::Submitted, PlanStatus::Approved)
                | (PlanStatus::Submitted, PlanStatus::Rejected)
        )
    }

    pub fn check_transition(from: PlanStatus, to: PlanStatus) -> Result<(), WorkflowError> {
        if Self::is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(WorkflowError::InvalidTransition { from, to })
        }
    }
}

/// Check that `plan` may be submitted. Returns the validation report so
/// callers can still show its warnings.
pub fn check_submission(plan: &PlanDocument) -> Result<ValidationReport, WorkflowError> {
    PlanStateMachine::check_transition(plan.status, PlanStatus::Submitted)?;
    let report = validate_plan(plan);
    if !report.is_submittable() {
        tracing::debug!(
            plan_id = %plan.id,
            blocking = report.blocking().count(),
            "plan submission refused"
        );
        return Err(WorkflowError::NotSubmittable { report });
    }
    Ok(report)
}

/// Mark `plan` submitted after [`check_submission`] passes.
pub fn submit(plan: &mut PlanDocument, at: DateTime<Utc>) -> Result<ValidationReport, WorkflowError> {
    let report = check_submission(plan)?;
    plan.status = PlanStatus::Submitted;
    plan.submitted_at = Some(at);
    tracing::info!(plan_id = %plan.id, warnings = report.warnings().count(), "plan submitted");
    Ok(report)
}

/// An evaluator's decision, before it is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDecision {
    pub status: ReviewStatus,
    pub feedback: String,
}

impl ReviewDecision {
    pub fn approve(feedback: Option<&str>) -> Self {
        Self {
            status: ReviewStatus::Approved,
            feedback: feedback.unwrap_or_default().trim().to_owned(),
        }
    }

    pub fn reject(feedback: &str) -> Self {
        Self {
            status: ReviewStatus::Rejected,
            feedback: feedback.trim().to_owned(),
        }
    }

    /// Rejections must explain themselves; approvals need not.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.status == ReviewStatus::Rejected && self.feedback.is_empty() {
            return Err(WorkflowError::MissingFeedback);
        }
        Ok(())
    }
}

/// Check that `decision` may be applied to a plan in `status`.
pub fn check_review(status: PlanStatus, decision: &ReviewDecision) -> Result<(), WorkflowError> {
    decision.validate()?;
    PlanStateMachine::check_transition(status, decision.status.plan_status())
}

/// Apply `decision` to `plan`, appending a review record. Earlier reviews
/// are never modified.
pub fn record_review<'a>(
    plan: &'a mut PlanDocument,
    evaluator: &str,
    evaluator_name: &str,
    decision: ReviewDecision,
    at: DateTime<Utc>,
) -> Result<&'a PlanReview, WorkflowError> {
    if evaluator.trim().is_empty() {
        return Err(WorkflowError::MissingEvaluator);
    }
    check_review(plan.status, &decision)?;

    plan.status = decision.status.plan_status();
    plan.reviews.push(PlanReview {
        id: String::new(),
        plan: plan.id.clone(),
        evaluator: evaluator.to_owned(),
        evaluator_name: evaluator_name.to_owned(),
        status: decision.status,
        feedback: decision.feedback,
        reviewed_at: Some(at),
    });
    tracing::info!(plan_id = %plan.id, status = %plan.status, evaluator, "plan reviewed");

    let index = plan.reviews.len() - 1;
    Ok(&plan.reviews[index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        MainActivity, Month, PerformanceMeasure, StrategicInitiative, StrategicObjective,
    };
    use chrono::NaiveDate;

    fn valid_plan() -> PlanDocument {
        let initiative = StrategicInitiative {
            id: "i1".into(),
            name: "Only initiative".into(),
            weight: 100.0,
            strategic_objective: Some("1".into()),
            performance_measures: vec![PerformanceMeasure {
                name: "Measure".into(),
                weight: 35.0,
                annual_target: 10.0,
                ..Default::default()
            }],
            main_activities: vec![MainActivity {
                name: "Activity".into(),
                weight: 65.0,
                selected_months: vec![Month::Jul],
                ..Default::default()
            }],
            ..Default::default()
        };
        PlanDocument {
            id: "7".into(),
            from_date: NaiveDate::from_ymd_opt(2025, 7, 1),
            to_date: NaiveDate::from_ymd_opt(2026, 6, 30),
            objectives: vec![StrategicObjective {
                id: "1".into(),
                title: "Only".into(),
                weight: 100.0,
                initiatives: vec![initiative],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn transition_graph() {
        use PlanStatus::*;
        assert!(PlanStateMachine::is_valid_transition(Draft, Submitted));
        assert!(PlanStateMachine::is_valid_transition(Submitted, Approved));
        assert!(PlanStateMachine::is_valid_transition(Submitted, Rejected));

        assert!(!PlanStateMachine::is_valid_transition(Draft, Approved));
        assert!(!PlanStateMachine::is_valid_transition(Approved, Submitted));
        assert!(!PlanStateMachine::is_valid_transition(Rejected, Draft));
        assert!(!PlanStateMachine::is_valid_transition(Submitted, Submitted));
    }

    #[test]
    fn submit_sets_status_and_timestamp() {
        let mut plan = valid_plan();
        let now = Utc::now();
        submit(&mut plan, now).unwrap();
        assert_eq!(plan.status, PlanStatus::Submitted);
        assert_eq!(plan.submitted_at, Some(now));
    }

    #[test]
    fn submit_blocked_by_weights() {
        let mut plan = valid_plan();
        plan.objectives[0].weight = 60.0;
        let err = submit(&mut plan, Utc::now()).unwrap_err();
        assert!(matches!(err, WorkflowError::NotSubmittable { .. }));
        assert_eq!(plan.status, PlanStatus::Draft);
    }

    #[test]
    fn submit_blocked_by_dates() {
        let mut plan = valid_plan();
        plan.to_date = plan.from_date;
        assert!(check_submission(&plan).is_err());
    }

    #[test]
    fn resubmit_rejected() {
        let mut plan = valid_plan();
        plan.status = PlanStatus::Submitted;
        assert_eq!(
            check_submission(&plan).unwrap_err(),
            WorkflowError::InvalidTransition {
                from: PlanStatus::Submitted,
                to: PlanStatus::Submitted
            }
        );
    }

    #[test]
    fn reject_requires_feedback() {
        let mut plan = valid_plan();
        plan.status = PlanStatus::Submitted;
        let err = record_review(&mut plan, "9", "Eval", ReviewDecision::reject("   "), Utc::now())
            .unwrap_err();
        assert_eq!(err, WorkflowError::MissingFeedback);
        assert!(plan.reviews.is_empty());
        assert_eq!(plan.status, PlanStatus::Submitted);
    }

    #[test]
    fn reviews_are_appended() {
        let mut plan = valid_plan();
        plan.status = PlanStatus::Submitted;
        let review = record_review(
            &mut plan,
            "9",
            "Eval",
            ReviewDecision::reject("Targets unclear"),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(review.feedback, "Targets unclear");
        assert_eq!(plan.status, PlanStatus::Rejected);

        // A rejected plan cannot be approved afterwards.
        let err = record_review(&mut plan, "9", "Eval", ReviewDecision::approve(None), Utc::now())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
        assert_eq!(plan.reviews.len(), 1);
    }

    #[test]
    fn approve_without_feedback() {
        let mut plan = valid_plan();
        plan.status = PlanStatus::Submitted;
        record_review(&mut plan, "9", "Eval", ReviewDecision::approve(None), Utc::now()).unwrap();
        assert_eq!(plan.status, PlanStatus::Approved);
        assert_eq!(plan.reviews[0].status, ReviewStatus::Approved);
    }
}
