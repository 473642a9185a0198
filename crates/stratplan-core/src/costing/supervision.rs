use serde::{Deserialize, Serialize};

use super::rates::{CostAssumptions, Location, SupervisorExtra};
use super::{
    CostDetail, CostingError, CostingTool, Crowd, check_transport, extras_amount, lodging_cost,
    require_at_least, require_description, require_non_negative, transport_cost,
};
use crate::model::ActivityType;

/// Supervision visit costing input. No venue; supervisor add-ons are paid
/// per supervisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisionCost {
    pub description: String,
    pub number_of_days: u32,
    pub number_of_supervisors: u32,
    pub training_location: Location,
    #[serde(default)]
    pub number_of_supervisors_with_additional_cost: u32,
    #[serde(default)]
    pub additional_supervisor_costs: Vec<SupervisorExtra>,
    #[serde(default)]
    pub transport_required: bool,
    #[serde(default)]
    pub land_transport_supervisors: u32,
    #[serde(default)]
    pub air_transport_supervisors: u32,
    #[serde(default)]
    pub other_costs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_budget: Option<f64>,
}

impl SupervisionCost {
    pub fn new(
        description: impl Into<String>,
        location: Location,
        days: u32,
        supervisors: u32,
    ) -> Self {
        Self {
            description: description.into(),
            number_of_days: days,
            number_of_supervisors: supervisors,
            training_location: location,
            number_of_supervisors_with_additional_cost: 0,
            additional_supervisor_costs: Vec::new(),
            transport_required: false,
            land_transport_supervisors: 0,
            air_transport_supervisors: 0,
            other_costs: 0.0,
            justification: None,
            total_budget: None,
        }
    }

    pub fn supervisor_extras(mut self, extras: Vec<SupervisorExtra>) -> Self {
        self.additional_supervisor_costs = extras;
        self
    }

    pub fn transport(mut self, land: u32, air: u32) -> Self {
        self.transport_required = true;
        self.land_transport_supervisors = land;
        self.air_transport_supervisors = air;
        self
    }
}

impl CostingTool for SupervisionCost {
    fn activity_type(&self) -> ActivityType {
        ActivityType::Supervision
    }

    fn validate(&self) -> Result<(), CostingError> {
        require_description(&self.description)?;
        require_at_least("Number of days", self.number_of_days, 1)?;
        require_at_least("Number of supervisors", self.number_of_supervisors, 1)?;
        require_non_negative("Other costs", self.other_costs)?;
        check_transport(
            self.transport_required,
            self.land_transport_supervisors,
            self.air_transport_supervisors,
            self.number_of_supervisors,
            Crowd::Supervisors,
        )
    }

    fn total(&self, rates: &CostAssumptions) -> Result<f64, CostingError> {
        let lodging = lodging_cost(
            self.training_location,
            self.number_of_supervisors,
            self.number_of_days,
            rates,
        )?;
        let transport = transport_cost(
            self.transport_required,
            self.land_transport_supervisors,
            self.air_transport_supervisors,
            rates,
        );
        let extras = f64::from(self.number_of_supervisors)
            * extras_amount(&self.additional_supervisor_costs, SupervisorExtra::All, |e| {
                rates.supervisor_costs.amount(e)
            });

        Ok(lodging + transport + extras + self.other_costs)
    }

    fn into_detail(mut self, total_budget: f64, _rates: &CostAssumptions) -> CostDetail {
        if !self.transport_required {
            self.land_transport_supervisors = 0;
            self.air_transport_supervisors = 0;
        }
        self.total_budget = Some(total_budget);
        CostDetail::Supervision(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supervision_has_no_venue() {
        let rates = CostAssumptions::default();
        let total = SupervisionCost::new("Site visit", Location::AddisAbaba, 2, 3)
            .total(&rates)
            .unwrap();
        assert_eq!(total, 1200.0 * 3.0 * 2.0 + 1500.0 * 3.0);
    }

    #[test]
    fn supervisor_extras_paid_per_supervisor() {
        let rates = CostAssumptions::default();
        let base = SupervisionCost::new("v", Location::Adama, 1, 4);
        let without = base.total(&rates).unwrap();
        let with = base
            .supervisor_extras(vec![SupervisorExtra::MobileCard500, SupervisorExtra::Stationary])
            .total(&rates)
            .unwrap();
        assert_eq!(with - without, 4.0 * 700.0);
    }

    #[test]
    fn transport_over_supervisors_rejected() {
        let rates = CostAssumptions::default();
        let err = SupervisionCost::new("v", Location::Adama, 1, 2)
            .transport(2, 1)
            .calculate(&rates)
            .unwrap_err();
        assert!(matches!(
            err,
            CostingError::TransportExceedsTotal {
                requested: 3,
                total: 2,
                ..
            }
        ));
    }
}
