use serde::{Deserialize, Serialize};

use super::rates::{CostAssumptions, DocumentType};
use super::{CostDetail, CostingError, CostingTool, require_at_least, require_description, require_non_negative};
use crate::model::ActivityType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintingCost {
    pub description: String,
    pub document_type: DocumentType,
    pub number_of_pages: u32,
    pub number_of_copies: u32,
    #[serde(default)]
    pub other_costs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_budget: Option<f64>,
}

impl PrintingCost {
    pub fn new(
        description: impl Into<String>,
        document_type: DocumentType,
        pages: u32,
        copies: u32,
    ) -> Self {
        Self {
            description: description.into(),
            document_type,
            number_of_pages: pages,
            number_of_copies: copies,
            other_costs: 0.0,
            justification: None,
            total_budget: None,
        }
    }
}

impl CostingTool for PrintingCost {
    fn activity_type(&self) -> ActivityType {
        ActivityType::Printing
    }

    fn validate(&self) -> Result<(), CostingError> {
        require_description(&self.description)?;
        require_at_least("Number of pages", self.number_of_pages, 1)?;
        require_at_least("Number of copies", self.number_of_copies, 1)?;
        require_non_negative("Other costs", self.other_costs)
    }

    fn total(&self, rates: &CostAssumptions) -> Result<f64, CostingError> {
        let per_page = rates.cost_per_page(self.document_type)?;
        Ok(f64::from(self.number_of_pages) * f64::from(self.number_of_copies) * per_page
            + self.other_costs)
    }

    fn into_detail(mut self, total_budget: f64, _rates: &CostAssumptions) -> CostDetail {
        self.total_budget = Some(total_budget);
        CostDetail::Printing(self)
    }
}
