//! Sibling weight allocation.
//!
//! Every level of the hierarchy hands a fixed target down to its children:
//!
//! ```text
//! plan        -> objectives   100
//! objective   -> programs     objective weight
//! program     -> subprograms  program weight
//! parent      -> initiatives  parent weight minus weight held by its programs/subprograms
//! initiative  -> measures     35% of initiative weight
//! initiative  -> activities   65% of initiative weight
//! ```
//!
//! Edits are checked before anything is written: a candidate weight that
//! would push its siblings over the target is rejected with the cap in the
//! message.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Program, StrategicInitiative, StrategicObjective, SubProgram};

/// Tolerance used when comparing floating-point weight sums.
pub const EPSILON: f64 = 1e-9;

/// Total the top-level objectives must reach.
pub const OBJECTIVES_TOTAL: f64 = 100.0;

/// Percentage of an initiative's weight allocated to performance measures.
pub const MEASURES_SHARE: f64 = 35.0;

/// Percentage of an initiative's weight allocated to main activities.
pub const ACTIVITIES_SHARE: f64 = 65.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightError {
    #[error("Weight must be greater than 0")]
    NotPositive { weight: f64 },

    #[error("Weight cannot exceed 100 (got {})", pct(.weight))]
    AboveHundred { weight: f64 },

    #[error("Total weight cannot exceed {}%", pct(.cap))]
    ExceedsCap {
        level: WeightLevel,
        cap: f64,
        total: f64,
    },

    #[error("no {level} at index {index} (have {len})")]
    IndexOutOfRange {
        level: WeightLevel,
        index: usize,
        len: usize,
    },
}

/// Render a weight without a trailing `.0`, rounded to two decimals.
pub fn pct(value: &f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if (rounded - rounded.trunc()).abs() < EPSILON {
        format!("{}", rounded.trunc() as i64)
    } else {
        let s = format!("{rounded:.2}");
        s.trim_end_matches('0').to_owned()
    }
}

/// `parent - current_total + existing_item`: the room left for one item.
///
/// When editing an existing item its prior weight is already inside
/// `current_total`, so it is added back before comparing.
pub fn available_weight(parent_weight: f64, current_total: f64, existing_item_weight: f64) -> f64 {
    parent_weight - current_total + existing_item_weight
}

// ---------------------------------------------------------------------------

/// Which sibling set an allocator governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightLevel {
    Objectives,
    Programs,
    SubPrograms,
    Initiatives,
    Measures,
    Activities,
}

impl fmt::Display for WeightLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Objectives => "objective",
            Self::Programs => "program",
            Self::SubPrograms => "subprogram",
            Self::Initiatives => "initiative",
            Self::Measures => "performance measure",
            Self::Activities => "main activity",
        };
        f.write_str(s)
    }
}

/// Totals for one sibling set, the same shape the backend's
/// `weight_summary` endpoints return.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightSummary {
    pub total: f64,
    pub expected: f64,
    pub remaining: f64,
    pub is_valid: bool,
}

impl WeightSummary {
    pub fn is_over_allocated(&self) -> bool {
        self.total > self.expected + EPSILON
    }

    pub fn is_under_allocated(&self) -> bool {
        self.total + EPSILON < self.expected
    }
}

/// Checks candidate weights against the target for one sibling set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightAllocator {
    level: WeightLevel,
    target: f64,
}

impl WeightAllocator {
    pub fn new(level: WeightLevel, target: f64) -> Self {
        Self {
            level,
            target: target.max(0.0),
        }
    }

    pub fn objectives() -> Self {
        Self::new(WeightLevel::Objectives, OBJECTIVES_TOTAL)
    }

    pub fn programs(objective: &StrategicObjective) -> Self {
        Self::new(WeightLevel::Programs, objective.weight)
    }

    pub fn subprograms(program: &Program) -> Self {
        Self::new(WeightLevel::SubPrograms, program.weight)
    }

    /// Initiatives attached directly to an objective share whatever its
    /// programs have not claimed.
    pub fn objective_initiatives(objective: &StrategicObjective) -> Self {
        Self::new(
            WeightLevel::Initiatives,
            objective.weight - objective.programs_weight(),
        )
    }

    pub fn program_initiatives(program: &Program) -> Self {
        Self::new(
            WeightLevel::Initiatives,
            program.weight - program.subprograms_weight(),
        )
    }

    pub fn subprogram_initiatives(subprogram: &SubProgram) -> Self {
        Self::new(WeightLevel::Initiatives, subprogram.weight)
    }

    pub fn measures(initiative: &StrategicInitiative) -> Self {
        Self::measures_for(initiative.weight)
    }

    pub fn measures_for(initiative_weight: f64) -> Self {
        Self::new(
            WeightLevel::Measures,
            initiative_weight * MEASURES_SHARE / 100.0,
        )
    }

    pub fn activities(initiative: &StrategicInitiative) -> Self {
        Self::activities_for(initiative.weight)
    }

    pub fn activities_for(initiative_weight: f64) -> Self {
        Self::new(
            WeightLevel::Activities,
            initiative_weight * ACTIVITIES_SHARE / 100.0,
        )
    }

    pub fn level(&self) -> WeightLevel {
        self.level
    }

    /// The total the siblings must reach.
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Room left for one item, ignoring the sibling at `exclude_index`
    /// (the item being edited).
    pub fn available(&self, siblings: &[f64], exclude_index: Option<usize>) -> f64 {
        let others: f64 = siblings
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != exclude_index)
            .map(|(_, w)| w)
            .sum();
        self.target - others
    }

    /// Check a candidate weight for a new item (`exclude_index = None`) or
    /// a replacement for the sibling at `exclude_index`.
    pub fn validate(
        &self,
        new_weight: f64,
        siblings: &[f64],
        exclude_index: Option<usize>,
    ) -> Result<(), WeightError> {
        if !new_weight.is_finite() || new_weight <= 0.0 {
            return Err(WeightError::NotPositive { weight: new_weight });
        }
        if new_weight > 100.0 + EPSILON {
            return Err(WeightError::AboveHundred { weight: new_weight });
        }
        if let Some(index) = exclude_index.filter(|i| *i >= siblings.len()) {
            return Err(WeightError::IndexOutOfRange {
                level: self.level,
                index,
                len: siblings.len(),
            });
        }

        let available = self.available(siblings, exclude_index);
        if new_weight > available + EPSILON {
            let total = self.target - available + new_weight;
            tracing::debug!(
                level = %self.level,
                cap = self.target,
                total,
                "weight rejected"
            );
            return Err(WeightError::ExceedsCap {
                level: self.level,
                cap: self.target,
                total,
            });
        }
        Ok(())
    }

    /// Boolean form of [`Self::validate`].
    pub fn is_valid(&self, new_weight: f64, siblings: &[f64], exclude_index: Option<usize>) -> bool {
        self.validate(new_weight, siblings, exclude_index).is_ok()
    }

    /// Summarize a complete sibling set. `is_valid` requires the total to
    /// equal the target exactly (within [`EPSILON`]).
    pub fn summary(&self, weights: &[f64]) -> WeightSummary {
        let total: f64 = weights.iter().sum();
        WeightSummary {
            total,
            expected: self.target,
            remaining: self.target - total,
            is_valid: (total - self.target).abs() <= EPSILON,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_weight_adds_back_existing_item() {
        assert_eq!(available_weight(100.0, 70.0, 0.0), 30.0);
        assert_eq!(available_weight(100.0, 70.0, 20.0), 50.0);
    }

    #[test]
    fn validate_accepts_exact_fill() {
        let alloc = WeightAllocator::objectives();
        assert!(alloc.validate(30.0, &[40.0, 30.0], None).is_ok());
    }

    #[test]
    fn validate_rejects_overflow_with_cap_in_message() {
        let alloc = WeightAllocator::activities_for(40.0);
        let err = alloc.validate(20.0, &[10.0], None).unwrap_err();
        assert_eq!(err.to_string(), "Total weight cannot exceed 26%");
        match err {
            WeightError::ExceedsCap { cap, total, .. } => {
                assert_eq!(cap, 26.0);
                assert_eq!(total, 30.0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn editing_excludes_own_prior_weight() {
        let alloc = WeightAllocator::measures_for(40.0);
        // 14 total; the item at index 1 currently holds 10.
        assert!(alloc.validate(10.0, &[4.0, 10.0], Some(1)).is_ok());
        assert!(alloc.validate(11.0, &[4.0, 10.0], Some(1)).is_err());
    }

    #[test]
    fn exclude_index_out_of_range_is_rejected() {
        let alloc = WeightAllocator::objectives();
        assert!(matches!(
            alloc.validate(10.0, &[10.0], Some(3)),
            Err(WeightError::IndexOutOfRange { index: 3, len: 1, .. })
        ));
    }

    #[test]
    fn non_positive_and_oversized_weights_are_rejected() {
        let alloc = WeightAllocator::objectives();
        assert!(matches!(
            alloc.validate(0.0, &[], None),
            Err(WeightError::NotPositive { .. })
        ));
        assert!(matches!(
            alloc.validate(-5.0, &[], None),
            Err(WeightError::NotPositive { .. })
        ));
        assert!(matches!(
            alloc.validate(f64::NAN, &[], None),
            Err(WeightError::NotPositive { .. })
        ));
        assert!(matches!(
            alloc.validate(101.0, &[], None),
            Err(WeightError::AboveHundred { .. })
        ));
    }

    #[test]
    fn fixed_shares_split_initiative_weight() {
        assert_eq!(WeightAllocator::measures_for(40.0).target(), 14.0);
        assert_eq!(WeightAllocator::activities_for(40.0).target(), 26.0);
        assert_eq!(
            WeightAllocator::measures_for(40.0).target() + WeightAllocator::activities_for(40.0).target(),
            40.0
        );
    }

    #[test]
    fn initiative_cap_excludes_program_weight() {
        let objective = StrategicObjective {
            weight: 60.0,
            programs: vec![Program {
                weight: 25.0,
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(WeightAllocator::objective_initiatives(&objective).target(), 35.0);
    }

    #[test]
    fn summary_distinguishes_under_and_over() {
        let alloc = WeightAllocator::objectives();
        let under = alloc.summary(&[40.0, 30.0]);
        assert_eq!(under.remaining, 30.0);
        assert!(!under.is_valid);
        assert!(under.is_under_allocated());

        let over = alloc.summary(&[70.0, 40.0]);
        assert!(over.is_over_allocated());
        assert_eq!(over.remaining, -10.0);

        let exact = alloc.summary(&[33.3, 33.3, 33.4]);
        assert!(exact.is_valid);
    }

    #[test]
    fn pct_trims_fraction() {
        assert_eq!(pct(&26.0), "26");
        assert_eq!(pct(&14.000000000000002), "14");
        assert_eq!(pct(&12.25), "12.25");
        assert_eq!(pct(&12.5), "12.5");
    }
}
