use serde::{Deserialize, Serialize};

use super::rates::{CostAssumptions, Location, ParticipantExtra, SessionExtra};
use super::{
    CostDetail, CostingError, CostingTool, Crowd, check_transport, extras_amount, lodging_cost,
    require_at_least, require_description, require_non_negative, transport_cost, venue_cost,
};
use crate::model::ActivityType;

/// Meetings and workshops are costed the same way; the kind only decides
/// the activity type recorded on the budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MeetingKind {
    #[default]
    Meeting,
    Workshop,
}

/// Meeting or workshop costing input. Session add-ons are a flat amount for
/// the whole event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingWorkshopCost {
    #[serde(skip)]
    pub kind: MeetingKind,
    pub description: String,
    pub number_of_days: u32,
    pub number_of_participants: u32,
    pub location: Location,
    #[serde(default)]
    pub additional_participant_costs: Vec<ParticipantExtra>,
    #[serde(default)]
    pub additional_session_costs: Vec<SessionExtra>,
    #[serde(default)]
    pub transport_required: bool,
    #[serde(default)]
    pub land_transport_participants: u32,
    #[serde(default)]
    pub air_transport_participants: u32,
    #[serde(default)]
    pub other_costs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_budget: Option<f64>,
}

impl MeetingWorkshopCost {
    pub fn new(
        kind: MeetingKind,
        description: impl Into<String>,
        location: Location,
        days: u32,
        participants: u32,
    ) -> Self {
        Self {
            kind,
            description: description.into(),
            number_of_days: days,
            number_of_participants: participants,
            location,
            additional_participant_costs: Vec::new(),
            additional_session_costs: Vec::new(),
            transport_required: false,
            land_transport_participants: 0,
            air_transport_participants: 0,
            other_costs: 0.0,
            justification: None,
            total_budget: None,
        }
    }

    pub fn with_kind(mut self, kind: MeetingKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn participant_extras(mut self, extras: Vec<ParticipantExtra>) -> Self {
        self.additional_participant_costs = extras;
        self
    }

    pub fn session_extras(mut self, extras: Vec<SessionExtra>) -> Self {
        self.additional_session_costs = extras;
        self
    }

    pub fn transport(mut self, land: u32, air: u32) -> Self {
        self.transport_required = true;
        self.land_transport_participants = land;
        self.air_transport_participants = air;
        self
    }

    pub fn other_costs(mut self, amount: f64) -> Self {
        self.other_costs = amount;
        self
    }
}

impl CostingTool for MeetingWorkshopCost {
    fn activity_type(&self) -> ActivityType {
        match self.kind {
            MeetingKind::Meeting => ActivityType::Meeting,
            MeetingKind::Workshop => ActivityType::Workshop,
        }
    }

    fn validate(&self) -> Result<(), CostingError> {
        require_description(&self.description)?;
        require_at_least("Number of days", self.number_of_days, 1)?;
        require_at_least("Number of participants", self.number_of_participants, 1)?;
        require_non_negative("Other costs", self.other_costs)?;
        check_transport(
            self.transport_required,
            self.land_transport_participants,
            self.air_transport_participants,
            self.number_of_participants,
            Crowd::Participants,
        )
    }

    fn total(&self, rates: &CostAssumptions) -> Result<f64, CostingError> {
        let lodging = lodging_cost(
            self.location,
            self.number_of_participants,
            self.number_of_days,
            rates,
        )?;
        let venue = venue_cost(self.location, self.number_of_days, rates)?;
        let transport = transport_cost(
            self.transport_required,
            self.land_transport_participants,
            self.air_transport_participants,
            rates,
        );
        let participants = f64::from(self.number_of_participants)
            * extras_amount(&self.additional_participant_costs, ParticipantExtra::All, |e| {
                rates.participant_costs.amount(e)
            });
        let session = extras_amount(&self.additional_session_costs, SessionExtra::All, |e| {
            rates.session_costs.amount(e)
        });

        Ok(lodging + venue + transport + participants + session + self.other_costs)
    }

    fn into_detail(mut self, total_budget: f64, _rates: &CostAssumptions) -> CostDetail {
        if !self.transport_required {
            self.land_transport_participants = 0;
            self.air_transport_participants = 0;
        }
        self.total_budget = Some(total_budget);
        CostDetail::MeetingWorkshop(self)
    }
}
