use serde::{Deserialize, Serialize};

use super::rates::CostAssumptions;
use super::{CostDetail, CostingError, CostingTool, require_at_least, require_description, require_non_negative};
use crate::model::ActivityType;

/// One procurement line. The price comes from the rate table; `unitPrice`
/// is filled in for display when the detail is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcurementItem {
    pub item_type: String,
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: f64,
}

impl ProcurementItem {
    pub fn new(item_type: impl Into<String>, quantity: u32) -> Self {
        Self {
            item_type: item_type.into(),
            quantity,
            unit_price: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcurementCost {
    pub description: String,
    #[serde(default)]
    pub items: Vec<ProcurementItem>,
    #[serde(default)]
    pub other_costs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_budget: Option<f64>,
}

impl ProcurementCost {
    pub fn new(description: impl Into<String>, items: Vec<ProcurementItem>) -> Self {
        Self {
            description: description.into(),
            items,
            other_costs: 0.0,
            justification: None,
            total_budget: None,
        }
    }

    pub fn add_item(mut self, item: ProcurementItem) -> Self {
        self.items.push(item);
        self
    }

    /// Drop the line at `index`; out-of-range indexes are ignored.
    pub fn remove_item(mut self, index: usize) -> Self {
        if index < self.items.len() {
            self.items.remove(index);
        }
        self
    }
}

impl CostingTool for ProcurementCost {
    fn activity_type(&self) -> ActivityType {
        ActivityType::Procurement
    }

    fn validate(&self) -> Result<(), CostingError> {
        require_description(&self.description)?;
        if self.items.is_empty() {
            return Err(CostingError::NoItems);
        }
        for item in &self.items {
            require_at_least("Quantity", item.quantity, 1)?;
        }
        require_non_negative("Other costs", self.other_costs)
    }

    fn total(&self, rates: &CostAssumptions) -> Result<f64, CostingError> {
        let mut total = self.other_costs;
        for item in &self.items {
            total += f64::from(item.quantity) * rates.item_price(&item.item_type)?;
        }
        Ok(total)
    }

    fn into_detail(mut self, total_budget: f64, rates: &CostAssumptions) -> CostDetail {
        for item in &mut self.items {
            if let Ok(price) = rates.item_price(&item.item_type) {
                item.unit_price = price;
            }
        }
        self.total_budget = Some(total_budget);
        CostDetail::Procurement(self)
    }
}
