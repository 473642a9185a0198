//! Step-by-step budget entry for one main activity.
//!
//! ```text
//! Idle              -> ChoosingMethod     (start)
//! ChoosingMethod    -> ChoosingType       (WITH_TOOL)
//! ChoosingMethod    -> FillingBudgetForm  (WITHOUT_TOOL)
//! ChoosingType      -> FillingTool        (type has a costing tool)
//! FillingTool       -> FillingBudgetForm  (tool total computed)
//! FillingBudgetForm -> Previewing         (budget reconciles)
//! Previewing        -> FillingBudgetForm  (edit)
//! Previewing        -> Idle               (confirm)
//! any               -> Idle               (cancel)
//! ```
//!
//! A failed step leaves the wizard where it was.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::budget::{BudgetDraft, BudgetError, BudgetSummary, FundingSources};
use crate::costing::{CostAssumptions, CostCalculation, CostingError, calculate_json};
use crate::model::{ActivityBudget, ActivityType, BudgetCalculationType};

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("cannot {action} while {state}")]
    InvalidStep {
        action: &'static str,
        state: &'static str,
    },

    #[error("No costing tool available for activity type {0}")]
    NoTool(ActivityType),

    #[error("costing tool produced a {actual} budget, expected {expected}")]
    TypeMismatch {
        expected: ActivityType,
        actual: ActivityType,
    },

    #[error(transparent)]
    Costing(#[from] CostingError),

    #[error(transparent)]
    Budget(#[from] BudgetError),
}

/// Values entered on the budget form.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BudgetForm {
    /// Only read on the WITHOUT_TOOL path; the tool total is used otherwise.
    pub estimated_cost: f64,
    pub activity_type: Option<ActivityType>,
    pub funding: FundingSources,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum BudgetWizard {
    #[default]
    Idle,
    ChoosingMethod {
        activity_id: String,
    },
    ChoosingType {
        activity_id: String,
    },
    FillingTool {
        activity_id: String,
        activity_type: ActivityType,
    },
    FillingBudgetForm {
        activity_id: String,
        calculation: Option<CostCalculation>,
    },
    Previewing {
        activity_id: String,
        calculation: Option<CostCalculation>,
        budget: ActivityBudget,
    },
}

impl BudgetWizard {
    pub fn new() -> Self {
        Self::Idle
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ChoosingMethod { .. } => "choosing method",
            Self::ChoosingType { .. } => "choosing type",
            Self::FillingTool { .. } => "filling tool",
            Self::FillingBudgetForm { .. } => "filling budget form",
            Self::Previewing { .. } => "previewing",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn activity_id(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::ChoosingMethod { activity_id }
            | Self::ChoosingType { activity_id }
            | Self::FillingTool { activity_id, .. }
            | Self::FillingBudgetForm { activity_id, .. }
            | Self::Previewing { activity_id, .. } => Some(activity_id),
        }
    }

    /// Tool result carried into the budget form, if any.
    pub fn calculation(&self) -> Option<&CostCalculation> {
        match self {
            Self::FillingBudgetForm { calculation, .. } | Self::Previewing { calculation, .. } => {
                calculation.as_ref()
            }
            _ => None,
        }
    }

    pub fn preview(&self) -> Option<BudgetSummary> {
        match self {
            Self::Previewing { budget, .. } => Some(budget.summary()),
            _ => None,
        }
    }

    pub fn start(&mut self, activity_id: impl Into<String>) -> Result<(), WizardError> {
        match self {
            Self::Idle => {
                *self = Self::ChoosingMethod {
                    activity_id: activity_id.into(),
                };
                Ok(())
            }
            _ => Err(self.invalid("start")),
        }
    }

    pub fn choose_method(&mut self, method: BudgetCalculationType) -> Result<(), WizardError> {
        let Self::ChoosingMethod { activity_id } = self else {
            return Err(self.invalid("choose a calculation method"));
        };
        let activity_id = std::mem::take(activity_id);
        *self = match method {
            BudgetCalculationType::WithTool => Self::ChoosingType { activity_id },
            BudgetCalculationType::WithoutTool => Self::FillingBudgetForm {
                activity_id,
                calculation: None,
            },
        };
        Ok(())
    }

    pub fn choose_type(&mut self, activity_type: ActivityType) -> Result<(), WizardError> {
        let Self::ChoosingType { activity_id } = self else {
            return Err(self.invalid("choose an activity type"));
        };
        if !activity_type.has_costing_tool() {
            return Err(WizardError::NoTool(activity_type));
        }
        *self = Self::FillingTool {
            activity_id: std::mem::take(activity_id),
            activity_type,
        };
        Ok(())
    }

    /// Accept a finished costing tool result.
    pub fn submit_tool(&mut self, calculation: CostCalculation) -> Result<(), WizardError> {
        let Self::FillingTool {
            activity_id,
            activity_type,
        } = self
        else {
            return Err(self.invalid("submit a costing tool"));
        };
        if calculation.activity_type != *activity_type {
            return Err(WizardError::TypeMismatch {
                expected: *activity_type,
                actual: calculation.activity_type,
            });
        }
        *self = Self::FillingBudgetForm {
            activity_id: std::mem::take(activity_id),
            calculation: Some(calculation),
        };
        Ok(())
    }

    /// Run the chosen costing tool over raw form input and accept its result.
    pub fn submit_tool_input(
        &mut self,
        input: Value,
        rates: &CostAssumptions,
    ) -> Result<(), WizardError> {
        let Self::FillingTool { activity_type, .. } = self else {
            return Err(self.invalid("submit a costing tool"));
        };
        let calculation = calculate_json(*activity_type, input, rates)?;
        self.submit_tool(calculation)
    }

    /// Reconcile the form and move to the preview. An over-funded budget
    /// stays on the form.
    pub fn submit_budget(&mut self, form: BudgetForm) -> Result<(), WizardError> {
        let Self::FillingBudgetForm {
            activity_id,
            calculation,
        } = self
        else {
            return Err(self.invalid("submit the budget form"));
        };

        let mut draft = match calculation {
            Some(calc) => BudgetDraft::with_tool(activity_id.clone(), calc.clone()),
            None => BudgetDraft::without_tool(activity_id.clone(), form.estimated_cost),
        };
        if let Some(activity_type) = form.activity_type {
            if calculation.is_none() {
                draft = draft.activity_type(activity_type);
            }
        }
        let budget = draft.funding(form.funding).build()?;

        *self = Self::Previewing {
            activity_id: std::mem::take(activity_id),
            calculation: calculation.take(),
            budget,
        };
        Ok(())
    }

    /// Return from the preview to the budget form.
    pub fn edit(&mut self) -> Result<(), WizardError> {
        let Self::Previewing {
            activity_id,
            calculation,
            ..
        } = self
        else {
            return Err(self.invalid("edit the budget"));
        };
        *self = Self::FillingBudgetForm {
            activity_id: std::mem::take(activity_id),
            calculation: calculation.take(),
        };
        Ok(())
    }

    /// Finish the wizard, handing back the budget to persist.
    pub fn confirm(&mut self) -> Result<ActivityBudget, WizardError> {
        match std::mem::take(self) {
            Self::Previewing { budget, .. } => {
                tracing::debug!(activity_id = %budget.activity_id, "budget confirmed");
                Ok(budget)
            }
            other => {
                *self = other;
                Err(self.invalid("confirm"))
            }
        }
    }

    pub fn cancel(&mut self) {
        if !self.is_idle() {
            tracing::debug!(state = self.state_name(), "budget wizard cancelled");
        }
        *self = Self::Idle;
    }

    fn invalid(&self, action: &'static str) -> WizardError {
        WizardError::InvalidStep {
            action,
            state: self.state_name(),
        }
    }
}

impl fmt::Display for BudgetWizard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.state_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costing::{CostingTool, Location, TrainingCost};

    fn rates() -> CostAssumptions {
        CostAssumptions::default()
    }

    #[test]
    fn without_tool_skips_type_and_tool() {
        let mut wizard = BudgetWizard::new();
        wizard.start("a1").unwrap();
        wizard.choose_method(BudgetCalculationType::WithoutTool).unwrap();
        assert!(matches!(wizard, BudgetWizard::FillingBudgetForm { calculation: None, .. }));

        wizard
            .submit_budget(BudgetForm {
                estimated_cost: 5000.0,
                activity_type: Some(ActivityType::Other),
                funding: FundingSources {
                    government_treasury: 5000.0,
                    ..Default::default()
                },
            })
            .unwrap();
        let budget = wizard.confirm().unwrap();
        assert!(wizard.is_idle());
        assert_eq!(budget.estimated_cost_without_tool, 5000.0);
        assert_eq!(budget.estimated_cost_with_tool, 0.0);
        assert_eq!(budget.activity_type, Some(ActivityType::Other));
    }

    #[test]
    fn with_tool_flow() {
        let mut wizard = BudgetWizard::new();
        wizard.start("a1").unwrap();
        wizard.choose_method(BudgetCalculationType::WithTool).unwrap();
        wizard.choose_type(ActivityType::Training).unwrap();
        let calc = TrainingCost::new("Training", Location::AddisAbaba, 3, 10)
            .calculate(&rates())
            .unwrap();
        wizard.submit_tool(calc).unwrap();
        assert_eq!(wizard.calculation().unwrap().total_budget, 81_000.0);

        wizard
            .submit_budget(BudgetForm {
                // Ignored: the tool total wins.
                estimated_cost: 1.0,
                funding: FundingSources {
                    sdg_funding: 81_000.0,
                    ..Default::default()
                },
                ..Default::default()
            })
            .unwrap();
        assert!(wizard.preview().unwrap().is_submittable());
        let budget = wizard.confirm().unwrap();
        assert_eq!(budget.estimated_cost_with_tool, 81_000.0);
        assert!(budget.training_details.is_some());
    }

    #[test]
    fn other_type_has_no_tool() {
        let mut wizard = BudgetWizard::new();
        wizard.start("a1").unwrap();
        wizard.choose_method(BudgetCalculationType::WithTool).unwrap();
        let err = wizard.choose_type(ActivityType::Other).unwrap_err();
        assert!(matches!(err, WizardError::NoTool(ActivityType::Other)));
        assert!(matches!(wizard, BudgetWizard::ChoosingType { .. }));
    }

    #[test]
    fn over_funding_stays_on_form() {
        let mut wizard = BudgetWizard::new();
        wizard.start("a1").unwrap();
        wizard.choose_method(BudgetCalculationType::WithoutTool).unwrap();
        let err = wizard
            .submit_budget(BudgetForm {
                estimated_cost: 10_000.0,
                funding: FundingSources {
                    government_treasury: 12_000.0,
                    ..Default::default()
                },
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "Total funding cannot exceed estimated cost");
        assert!(matches!(wizard, BudgetWizard::FillingBudgetForm { .. }));
        assert!(wizard.confirm().is_err());
    }

    #[test]
    fn tool_input_from_json() {
        let mut wizard = BudgetWizard::new();
        wizard.start("a1").unwrap();
        wizard.choose_method(BudgetCalculationType::WithTool).unwrap();
        wizard.choose_type(ActivityType::Printing).unwrap();
        wizard
            .submit_tool_input(
                serde_json::json!({
                    "description": "Leaflets",
                    "documentType": "Leaflet",
                    "numberOfPages": 2,
                    "numberOfCopies": 100
                }),
                &rates(),
            )
            .unwrap();
        assert_eq!(wizard.calculation().unwrap().total_budget, 6000.0);
    }

    #[test]
    fn mismatched_tool_rejected() {
        let mut wizard = BudgetWizard::new();
        wizard.start("a1").unwrap();
        wizard.choose_method(BudgetCalculationType::WithTool).unwrap();
        wizard.choose_type(ActivityType::Supervision).unwrap();
        let calc = TrainingCost::new("t", Location::AddisAbaba, 1, 1)
            .calculate(&rates())
            .unwrap();
        assert!(matches!(
            wizard.submit_tool(calc),
            Err(WizardError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn out_of_order_steps_rejected() {
        let mut wizard = BudgetWizard::new();
        let err = wizard
            .choose_method(BudgetCalculationType::WithTool)
            .unwrap_err();
        assert_eq!(err.to_string(), "cannot choose a calculation method while idle");

        wizard.start("a1").unwrap();
        assert!(wizard.start("a2").is_err());
        assert_eq!(wizard.activity_id(), Some("a1"));
    }

    #[test]
    fn cancel_from_anywhere() {
        let mut wizard = BudgetWizard::new();
        wizard.start("a1").unwrap();
        wizard.choose_method(BudgetCalculationType::WithTool).unwrap();
        wizard.choose_type(ActivityType::Training).unwrap();
        wizard.cancel();
        assert!(wizard.is_idle());
        assert_eq!(wizard.activity_id(), None);
    }

    #[test]
    fn edit_returns_to_form() {
        let mut wizard = BudgetWizard::new();
        wizard.start("a1").unwrap();
        wizard.choose_method(BudgetCalculationType::WithoutTool).unwrap();
        wizard
            .submit_budget(BudgetForm {
                estimated_cost: 100.0,
                ..Default::default()
            })
            .unwrap();
        wizard.edit().unwrap();
        assert!(matches!(wizard, BudgetWizard::FillingBudgetForm { .. }));
    }
}
