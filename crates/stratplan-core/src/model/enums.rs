use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a backend enum string does not match any variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value:?}")]
pub struct EnumParseError {
    pub kind: &'static str,
    pub value: String,
}

impl EnumParseError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------

/// Lifecycle status of a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    #[default]
    Draft,
    Submitted,
    Approved,
    Rejected,
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "DRAFT",
            Self::Submitted => "SUBMITTED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        };
        f.write_str(s)
    }
}

impl FromStr for PlanStatus {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(Self::Draft),
            "SUBMITTED" => Ok(Self::Submitted),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(EnumParseError::new("plan status", s)),
        }
    }
}

// ---------------------------------------------------------------------------

/// Outcome recorded on a plan review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Approved,
    Rejected,
}

impl ReviewStatus {
    /// The plan status a review with this outcome moves the plan to.
    pub fn plan_status(self) -> PlanStatus {
        match self {
            Self::Approved => PlanStatus::Approved,
            Self::Rejected => PlanStatus::Rejected,
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        })
    }
}

// ---------------------------------------------------------------------------

/// How an activity budget's estimated cost was produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetCalculationType {
    /// Cost computed by one of the costing tools.
    WithTool,
    /// Cost entered manually.
    #[default]
    WithoutTool,
}

impl fmt::Display for BudgetCalculationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::WithTool => "WITH_TOOL",
            Self::WithoutTool => "WITHOUT_TOOL",
        })
    }
}

impl FromStr for BudgetCalculationType {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "WITH_TOOL" => Ok(Self::WithTool),
            "WITHOUT_TOOL" => Ok(Self::WithoutTool),
            _ => Err(EnumParseError::new("budget calculation type", s)),
        }
    }
}

// ---------------------------------------------------------------------------

/// Kind of main activity, which selects the costing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityType {
    Training,
    Meeting,
    Workshop,
    Printing,
    Supervision,
    Procurement,
    Other,
}

impl ActivityType {
    pub const ALL: [ActivityType; 7] = [
        Self::Training,
        Self::Meeting,
        Self::Workshop,
        Self::Printing,
        Self::Supervision,
        Self::Procurement,
        Self::Other,
    ];

    /// Whether a costing tool exists for this activity type.
    pub fn has_costing_tool(self) -> bool {
        !matches!(self, Self::Other)
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Training => "Training",
            Self::Meeting => "Meeting",
            Self::Workshop => "Workshop",
            Self::Printing => "Printing",
            Self::Supervision => "Supervision",
            Self::Procurement => "Procurement",
            Self::Other => "Other",
        };
        f.write_str(s)
    }
}

impl FromStr for ActivityType {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| EnumParseError::new("activity type", s))
    }
}

// ---------------------------------------------------------------------------

/// Organizational level a plan is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanType {
    LeadExecutive,
    TeamDesk,
    Individual,
}

// ---------------------------------------------------------------------------

/// Fiscal quarter. The fiscal year starts in July.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub const ALL: [Quarter; 4] = [Self::Q1, Self::Q2, Self::Q3, Self::Q4];

    /// The three months making up this quarter, in fiscal order.
    pub fn months(self) -> [Month; 3] {
        match self {
            Self::Q1 => [Month::Jul, Month::Aug, Month::Sep],
            Self::Q2 => [Month::Oct, Month::Nov, Month::Dec],
            Self::Q3 => [Month::Jan, Month::Feb, Month::Mar],
            Self::Q4 => [Month::Apr, Month::May, Month::Jun],
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Q1 => "Q1",
            Self::Q2 => "Q2",
            Self::Q3 => "Q3",
            Self::Q4 => "Q4",
        })
    }
}

impl FromStr for Quarter {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|q| q.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| EnumParseError::new("quarter", s))
    }
}

// ---------------------------------------------------------------------------

/// Calendar month, ordered by the fiscal year (July first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Month {
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Self::Jul,
        Self::Aug,
        Self::Sep,
        Self::Oct,
        Self::Nov,
        Self::Dec,
        Self::Jan,
        Self::Feb,
        Self::Mar,
        Self::Apr,
        Self::May,
        Self::Jun,
    ];

    pub fn quarter(self) -> Quarter {
        match self {
            Self::Jul | Self::Aug | Self::Sep => Quarter::Q1,
            Self::Oct | Self::Nov | Self::Dec => Quarter::Q2,
            Self::Jan | Self::Feb | Self::Mar => Quarter::Q3,
            Self::Apr | Self::May | Self::Jun => Quarter::Q4,
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Jul => "JUL",
            Self::Aug => "AUG",
            Self::Sep => "SEP",
            Self::Oct => "OCT",
            Self::Nov => "NOV",
            Self::Dec => "DEC",
            Self::Jan => "JAN",
            Self::Feb => "FEB",
            Self::Mar => "MAR",
            Self::Apr => "APR",
            Self::May => "MAY",
            Self::Jun => "JUN",
        };
        f.write_str(s)
    }
}

impl FromStr for Month {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| EnumParseError::new("month", s))
    }
}
