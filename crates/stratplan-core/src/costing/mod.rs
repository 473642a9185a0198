//! Per-activity-type costing tools.
//!
//! Each tool takes the structured form input for one activity type and
//! turns it into a total using [`CostAssumptions`]. The input, stamped with
//! `totalBudget`, is kept as the cost detail that gets stored on the
//! budget's `<type>_details` field.

pub mod meeting_workshop;
pub mod printing;
pub mod procurement;
pub mod rates;
pub mod supervision;
pub mod training;

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::model::ActivityType;

pub use meeting_workshop::{MeetingKind, MeetingWorkshopCost};
pub use printing::PrintingCost;
pub use procurement::{ProcurementCost, ProcurementItem};
pub use rates::{
    CostAssumptions, DocumentType, Location, ParticipantExtra, SessionExtra, SupervisorExtra,
};
pub use supervision::SupervisionCost;
pub use training::TrainingCost;

#[derive(Debug, Error)]
pub enum CostingError {
    #[error("Description is required")]
    MissingDescription,

    #[error("{field} must be at least {min}")]
    BelowMinimum {
        field: &'static str,
        min: u32,
        value: u32,
    },

    #[error("{field} cannot be negative")]
    Negative { field: &'static str, value: f64 },

    #[error("Total transport {crowd} cannot exceed total {crowd}")]
    TransportExceedsTotal {
        crowd: Crowd,
        requested: u32,
        total: u32,
    },

    #[error("Total budget must be greater than 0")]
    NonPositiveTotal { total: f64 },

    #[error("At least one procurement item is required")]
    NoItems,

    #[error("{0} activities have no costing tool")]
    NoTool(ActivityType),

    #[error("no {table} rate for {key:?}")]
    MissingRate { table: &'static str, key: String },

    #[error("invalid {tool} input: {source}")]
    InvalidInput {
        tool: ActivityType,
        source: serde_json::Error,
    },

    #[error("invalid rates file: {0}")]
    InvalidRates(#[from] toml::de::Error),

    #[error("failed to read rates file {}: {source}", .path.display())]
    ReadRates {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Who travels: participants for events, supervisors for field visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crowd {
    Participants,
    Supervisors,
}

impl fmt::Display for Crowd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Participants => "participants",
            Self::Supervisors => "supervisors",
        })
    }
}

// ---------------------------------------------------------------------------

/// Tool output stored on the budget, one variant per details field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CostDetail {
    Training(TrainingCost),
    MeetingWorkshop(MeetingWorkshopCost),
    Supervision(SupervisionCost),
    Procurement(ProcurementCost),
    Printing(PrintingCost),
}

impl CostDetail {
    /// Name of the budget field this detail is persisted into.
    pub fn detail_field(&self) -> &'static str {
        match self {
            Self::Training(_) => "training_details",
            Self::MeetingWorkshop(_) => "meeting_workshop_details",
            Self::Supervision(_) => "supervision_details",
            Self::Procurement(_) => "procurement_details",
            Self::Printing(_) => "printing_details",
        }
    }

    pub fn to_value(&self) -> Value {
        // Every variant is a plain struct of numbers, strings and enums.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Result of running a costing tool.
#[derive(Debug, Clone, PartialEq)]
pub struct CostCalculation {
    pub activity_type: ActivityType,
    pub total_budget: f64,
    pub detail: CostDetail,
}

/// Common shape of every costing tool.
pub trait CostingTool: Sized {
    fn activity_type(&self) -> ActivityType;

    /// Reject malformed input before any arithmetic.
    fn validate(&self) -> Result<(), CostingError>;

    fn total(&self, rates: &CostAssumptions) -> Result<f64, CostingError>;

    fn into_detail(self, total_budget: f64, rates: &CostAssumptions) -> CostDetail;

    /// Validate, compute, and require a positive total.
    fn calculate(self, rates: &CostAssumptions) -> Result<CostCalculation, CostingError> {
        self.validate()?;
        let total = self.total(rates)?;
        if total.is_nan() || total <= 0.0 {
            return Err(CostingError::NonPositiveTotal { total });
        }
        let activity_type = self.activity_type();
        tracing::debug!(activity_type = %activity_type, total, "costing tool computed total");
        Ok(CostCalculation {
            activity_type,
            total_budget: total,
            detail: self.into_detail(total, rates),
        })
    }
}

/// Run the tool for `activity_type` over a JSON form input.
pub fn calculate_json(
    activity_type: ActivityType,
    input: Value,
    rates: &CostAssumptions,
) -> Result<CostCalculation, CostingError> {
    let invalid = |source| CostingError::InvalidInput {
        tool: activity_type,
        source,
    };
    match activity_type {
        ActivityType::Training => serde_json::from_value::<TrainingCost>(input)
            .map_err(invalid)?
            .calculate(rates),
        ActivityType::Meeting | ActivityType::Workshop => {
            let kind = if activity_type == ActivityType::Workshop {
                MeetingKind::Workshop
            } else {
                MeetingKind::Meeting
            };
            serde_json::from_value::<MeetingWorkshopCost>(input)
                .map_err(invalid)?
                .with_kind(kind)
                .calculate(rates)
        }
        ActivityType::Supervision => serde_json::from_value::<SupervisionCost>(input)
            .map_err(invalid)?
            .calculate(rates),
        ActivityType::Procurement => serde_json::from_value::<ProcurementCost>(input)
            .map_err(invalid)?
            .calculate(rates),
        ActivityType::Printing => serde_json::from_value::<PrintingCost>(input)
            .map_err(invalid)?
            .calculate(rates),
        ActivityType::Other => Err(CostingError::NoTool(ActivityType::Other)),
    }
}

// ---------------------------------------------------------------------------
// Shared checks and cost components.

pub(crate) fn require_description(description: &str) -> Result<(), CostingError> {
    if description.trim().is_empty() {
        return Err(CostingError::MissingDescription);
    }
    Ok(())
}

pub(crate) fn require_at_least(field: &'static str, value: u32, min: u32) -> Result<(), CostingError> {
    if value < min {
        return Err(CostingError::BelowMinimum { field, min, value });
    }
    Ok(())
}

pub(crate) fn require_non_negative(field: &'static str, value: f64) -> Result<(), CostingError> {
    if value.is_nan() || value < 0.0 {
        return Err(CostingError::Negative { field, value });
    }
    Ok(())
}

/// Travellers by land and air may not outnumber the people attending.
/// Counts are ignored when transport is not required.
pub(crate) fn check_transport(
    required: bool,
    land: u32,
    air: u32,
    total: u32,
    crowd: Crowd,
) -> Result<(), CostingError> {
    if !required {
        return Ok(());
    }
    let requested = land.saturating_add(air);
    if requested > total {
        return Err(CostingError::TransportExceedsTotal {
            crowd,
            requested,
            total,
        });
    }
    Ok(())
}

pub(crate) fn transport_cost(required: bool, land: u32, air: u32, rates: &CostAssumptions) -> f64 {
    if !required {
        return 0.0;
    }
    f64::from(land) * rates.transport.land + f64::from(air) * rates.transport.air
}

/// Per-diem and accommodation for `people` over `days`. Nights are one
/// fewer than days.
pub(crate) fn lodging_cost(
    location: Location,
    people: u32,
    days: u32,
    rates: &CostAssumptions,
) -> Result<f64, CostingError> {
    let r = rates.location(location)?;
    let people = f64::from(people);
    let nights = f64::from(days.saturating_sub(1));
    Ok(r.per_diem * people * f64::from(days) + r.accommodation * people * nights)
}

pub(crate) fn venue_cost(location: Location, days: u32, rates: &CostAssumptions) -> Result<f64, CostingError> {
    Ok(rates.location(location)?.venue * f64::from(days))
}

/// Sum an add-on selection. Duplicates count once; `All` stands for every
/// option and absorbs the rest.
pub(crate) fn extras_amount<E, F>(selected: &[E], all: E, amount: F) -> f64
where
    E: Copy + Ord,
    F: Fn(E) -> f64,
{
    if selected.contains(&all) {
        return amount(all);
    }
    let unique: BTreeSet<E> = selected.iter().copied().collect();
    unique.into_iter().map(amount).sum()
}
