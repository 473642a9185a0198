//! Planning hierarchy types as served by the backend.
//!
//! Entities deserialize from the canonical (normalized) plan shape. Numeric
//! fields go through [`lenient`] so decimal strings and nulls do not fail a
//! whole plan.

pub mod entities;
pub mod enums;
pub mod lenient;

pub use entities::{
    ActivityBudget, InitiativeParent, MainActivity, PerformanceMeasure, PlanDocument, PlanReview,
    Program, StrategicInitiative, StrategicObjective, SubProgram,
};
pub use enums::{
    ActivityType, BudgetCalculationType, EnumParseError, Month, PlanStatus, PlanType, Quarter,
    ReviewStatus,
};
