//! Activity budget reconciliation.
//!
//! The estimated cost is whichever of the two cost fields the calculation
//! type selects. Funding from the four sources may fall short of it (a
//! deficit, allowed but flagged) but may never exceed it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::costing::{CostCalculation, CostDetail};
use crate::model::{ActivityBudget, ActivityType, BudgetCalculationType, lenient};

/// Tolerance for money comparisons after summing decimal amounts.
pub const MONEY_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BudgetError {
    #[error("Total funding cannot exceed estimated cost")]
    FundingExceedsCost {
        total_funding: f64,
        estimated_cost: f64,
    },

    #[error("{field}: Value must be positive")]
    NegativeAmount { field: &'static str, value: f64 },

    #[error("budget must belong to an activity")]
    MissingActivity,
}

/// The four funding sources of an activity budget.
///
/// Each amount accepts a number, a decimal string or null; anything that is
/// not a finite number reads as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FundingSources {
    #[serde(default, deserialize_with = "lenient::number")]
    pub government_treasury: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub sdg_funding: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub partners_funding: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub other_funding: f64,
}

impl FundingSources {
    pub fn total(&self) -> f64 {
        self.government_treasury + self.sdg_funding + self.partners_funding + self.other_funding
    }

    fn check_non_negative(&self) -> Result<(), BudgetError> {
        let fields = [
            ("Government treasury", self.government_treasury),
            ("SDG funding", self.sdg_funding),
            ("Partners funding", self.partners_funding),
            ("Other funding", self.other_funding),
        ];
        for (field, value) in fields {
            if value.is_nan() || value < 0.0 {
                return Err(BudgetError::NegativeAmount { field, value });
            }
        }
        Ok(())
    }
}

impl std::ops::AddAssign for FundingSources {
    fn add_assign(&mut self, rhs: Self) {
        self.government_treasury += rhs.government_treasury;
        self.sdg_funding += rhs.sdg_funding;
        self.partners_funding += rhs.partners_funding;
        self.other_funding += rhs.other_funding;
    }
}

/// Where funding stands against cost. A positive gap is a deficit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "amount", rename_all = "snake_case")]
pub enum FundingStatus {
    Deficit(f64),
    Surplus(f64),
    Balanced,
}

/// Cost, funding and gap for one budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BudgetSummary {
    pub calculation_type: BudgetCalculationType,
    pub estimated_cost: f64,
    pub sources: FundingSources,
    pub total_funding: f64,
    pub funding_gap: f64,
}

impl BudgetSummary {
    pub fn new(
        calculation_type: BudgetCalculationType,
        estimated_cost: f64,
        sources: FundingSources,
    ) -> Self {
        let total_funding = sources.total();
        Self {
            calculation_type,
            estimated_cost,
            sources,
            total_funding,
            funding_gap: estimated_cost - total_funding,
        }
    }

    pub fn status(&self) -> FundingStatus {
        if self.funding_gap > MONEY_EPSILON {
            FundingStatus::Deficit(self.funding_gap)
        } else if self.funding_gap < -MONEY_EPSILON {
            FundingStatus::Surplus(-self.funding_gap)
        } else {
            FundingStatus::Balanced
        }
    }

    /// Saving is allowed unless funding exceeds cost.
    pub fn check(&self) -> Result<(), BudgetError> {
        check_funding(self.estimated_cost, self.total_funding)
    }

    pub fn is_submittable(&self) -> bool {
        self.check().is_ok()
    }
}

/// Reject funding above cost. Equality and under-funding pass.
pub fn check_funding(estimated_cost: f64, total_funding: f64) -> Result<(), BudgetError> {
    if total_funding > estimated_cost + MONEY_EPSILON {
        return Err(BudgetError::FundingExceedsCost {
            total_funding,
            estimated_cost,
        });
    }
    Ok(())
}

impl ActivityBudget {
    /// The cost selected by the calculation type.
    pub fn estimated_cost(&self) -> f64 {
        match self.budget_calculation_type {
            BudgetCalculationType::WithTool => self.estimated_cost_with_tool,
            BudgetCalculationType::WithoutTool => self.estimated_cost_without_tool,
        }
    }

    pub fn funding(&self) -> FundingSources {
        FundingSources {
            government_treasury: self.government_treasury,
            sdg_funding: self.sdg_funding,
            partners_funding: self.partners_funding,
            other_funding: self.other_funding,
        }
    }

    pub fn summary(&self) -> BudgetSummary {
        BudgetSummary::new(self.budget_calculation_type, self.estimated_cost(), self.funding())
    }

    /// The cost field not selected by the calculation type.
    pub fn unselected_cost(&self) -> f64 {
        match self.budget_calculation_type {
            BudgetCalculationType::WithTool => self.estimated_cost_without_tool,
            BudgetCalculationType::WithoutTool => self.estimated_cost_with_tool,
        }
    }
}

// ---------------------------------------------------------------------------

/// Budget form contents before they become an [`ActivityBudget`].
///
/// [`BudgetDraft::build`] is the only way to produce a budget payload, so an
/// over-funded budget never reaches the API.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetDraft {
    activity_id: String,
    calculation_type: BudgetCalculationType,
    activity_type: Option<ActivityType>,
    estimated_cost: f64,
    detail: Option<CostDetail>,
    sources: FundingSources,
}

impl BudgetDraft {
    /// A budget whose cost comes from a costing tool.
    pub fn with_tool(activity_id: impl Into<String>, calculation: CostCalculation) -> Self {
        Self {
            activity_id: activity_id.into(),
            calculation_type: BudgetCalculationType::WithTool,
            activity_type: Some(calculation.activity_type),
            estimated_cost: calculation.total_budget,
            detail: Some(calculation.detail),
            sources: FundingSources::default(),
        }
    }

    /// A budget with a manually entered cost.
    pub fn without_tool(activity_id: impl Into<String>, estimated_cost: f64) -> Self {
        Self {
            activity_id: activity_id.into(),
            calculation_type: BudgetCalculationType::WithoutTool,
            activity_type: None,
            estimated_cost,
            detail: None,
            sources: FundingSources::default(),
        }
    }

    pub fn activity_type(mut self, activity_type: ActivityType) -> Self {
        self.activity_type = Some(activity_type);
        self
    }

    pub fn funding(mut self, sources: FundingSources) -> Self {
        self.sources = sources;
        self
    }

    pub fn government_treasury(mut self, amount: f64) -> Self {
        self.sources.government_treasury = amount;
        self
    }

    pub fn sdg_funding(mut self, amount: f64) -> Self {
        self.sources.sdg_funding = amount;
        self
    }

    pub fn partners_funding(mut self, amount: f64) -> Self {
        self.sources.partners_funding = amount;
        self
    }

    pub fn other_funding(mut self, amount: f64) -> Self {
        self.sources.other_funding = amount;
        self
    }

    pub fn calculation_type(&self) -> BudgetCalculationType {
        self.calculation_type
    }

    /// Preview figures without enforcing anything.
    pub fn summary(&self) -> BudgetSummary {
        BudgetSummary::new(self.calculation_type, self.estimated_cost, self.sources)
    }

    /// Validate and produce the budget payload. The cost field not chosen
    /// by the calculation type is zeroed.
    pub fn build(self) -> Result<ActivityBudget, BudgetError> {
        if self.activity_id.trim().is_empty() {
            return Err(BudgetError::MissingActivity);
        }
        if self.estimated_cost.is_nan() || self.estimated_cost < 0.0 {
            return Err(BudgetError::NegativeAmount {
                field: "Estimated cost",
                value: self.estimated_cost,
            });
        }
        self.sources.check_non_negative()?;
        self.summary().check()?;

        let mut budget = ActivityBudget {
            activity_id: self.activity_id,
            budget_calculation_type: self.calculation_type,
            activity_type: self.activity_type,
            government_treasury: self.sources.government_treasury,
            sdg_funding: self.sources.sdg_funding,
            partners_funding: self.sources.partners_funding,
            other_funding: self.sources.other_funding,
            ..Default::default()
        };
        match self.calculation_type {
            BudgetCalculationType::WithTool => budget.estimated_cost_with_tool = self.estimated_cost,
            BudgetCalculationType::WithoutTool => {
                budget.estimated_cost_without_tool = self.estimated_cost
            }
        }
        if let Some(detail) = self.detail {
            let value = Some(detail.to_value());
            match detail {
                CostDetail::Training(_) => budget.training_details = value,
                CostDetail::MeetingWorkshop(_) => budget.meeting_workshop_details = value,
                CostDetail::Supervision(_) => budget.supervision_details = value,
                CostDetail::Procurement(_) => budget.procurement_details = value,
                CostDetail::Printing(_) => budget.printing_details = value,
            }
        }
        Ok(budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costing::{CostAssumptions, CostingTool, Location, TrainingCost};

    fn training_calc() -> CostCalculation {
        TrainingCost::new("t", Location::AddisAbaba, 3, 10)
            .calculate(&CostAssumptions::default())
            .unwrap()
    }

    #[test]
    fn gap_sign_covers_all_three_cases() {
        let sources = FundingSources {
            government_treasury: 600.0,
            ..Default::default()
        };
        let deficit = BudgetSummary::new(BudgetCalculationType::WithoutTool, 1000.0, sources);
        assert_eq!(deficit.funding_gap, 400.0);
        assert_eq!(deficit.status(), FundingStatus::Deficit(400.0));

        let surplus = BudgetSummary::new(BudgetCalculationType::WithoutTool, 500.0, sources);
        assert_eq!(surplus.status(), FundingStatus::Surplus(100.0));
        assert!(!surplus.is_submittable());

        let balanced = BudgetSummary::new(BudgetCalculationType::WithoutTool, 600.0, sources);
        assert_eq!(balanced.status(), FundingStatus::Balanced);
        assert!(balanced.is_submittable());
    }

    #[test]
    fn estimated_cost_follows_calculation_type() {
        let mut budget = ActivityBudget {
            estimated_cost_with_tool: 10.0,
            estimated_cost_without_tool: 20.0,
            budget_calculation_type: BudgetCalculationType::WithTool,
            ..Default::default()
        };
        assert_eq!(budget.estimated_cost(), 10.0);
        assert_eq!(budget.unselected_cost(), 20.0);
        budget.budget_calculation_type = BudgetCalculationType::WithoutTool;
        assert_eq!(budget.estimated_cost(), 20.0);
    }

    #[test]
    fn over_funded_draft_is_rejected() {
        let err = BudgetDraft::without_tool("7", 10_000.0)
            .government_treasury(8_000.0)
            .partners_funding(4_000.0)
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "Total funding cannot exceed estimated cost");
    }

    #[test]
    fn tool_draft_zeroes_manual_cost_and_stores_detail() {
        let budget = BudgetDraft::with_tool("7", training_calc())
            .government_treasury(50_000.0)
            .build()
            .unwrap();
        assert_eq!(budget.budget_calculation_type, BudgetCalculationType::WithTool);
        assert_eq!(budget.estimated_cost_with_tool, 81_000.0);
        assert_eq!(budget.estimated_cost_without_tool, 0.0);
        assert_eq!(budget.activity_type, Some(ActivityType::Training));
        let detail = budget.training_details.as_ref().unwrap();
        assert_eq!(detail["totalBudget"], 81_000.0);
        assert!(budget.meeting_workshop_details.is_none());
        assert_eq!(budget.summary().funding_gap, 31_000.0);
    }

    #[test]
    fn negative_funding_rejected() {
        let err = BudgetDraft::without_tool("1", 100.0)
            .sdg_funding(-1.0)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            BudgetError::NegativeAmount {
                field: "SDG funding",
                ..
            }
        ));
    }

    #[test]
    fn funding_sources_coerce_loose_values() {
        let sources: FundingSources = serde_json::from_value(serde_json::json!({
            "government_treasury": "1200.00",
            "sdg_funding": null,
            "partners_funding": "n/a",
            "other_funding": 300
        }))
        .unwrap();
        assert_eq!(sources.government_treasury, 1200.0);
        assert_eq!(sources.sdg_funding, 0.0);
        assert_eq!(sources.partners_funding, 0.0);
        assert_eq!(sources.other_funding, 300.0);

        let empty: FundingSources = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(empty, FundingSources::default());
    }

    #[test]
    fn missing_activity_rejected() {
        assert_eq!(
            BudgetDraft::without_tool(" ", 1.0).build(),
            Err(BudgetError::MissingActivity)
        );
    }
}
