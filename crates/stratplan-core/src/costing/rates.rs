//! Fixed costing rates.
//!
//! [`CostAssumptions::default`] is the standard ministry table. A TOML file
//! can replace any top-level section; sections it omits keep the defaults.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::CostingError;
use crate::model::EnumParseError;

/// Venue location for trainings, meetings, workshops and supervision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Location {
    #[serde(rename = "Addis_Ababa")]
    AddisAbaba,
    Adama,
    Bahirdar,
    Mekele,
    Hawassa,
    Gambella,
    Afar,
    Somali,
}

impl Location {
    pub const ALL: [Location; 8] = [
        Self::AddisAbaba,
        Self::Adama,
        Self::Bahirdar,
        Self::Mekele,
        Self::Hawassa,
        Self::Gambella,
        Self::Afar,
        Self::Somali,
    ];

    /// Backend code, also the key in rate tables.
    pub fn code(self) -> &'static str {
        match self {
            Self::AddisAbaba => "Addis_Ababa",
            Self::Adama => "Adama",
            Self::Bahirdar => "Bahirdar",
            Self::Mekele => "Mekele",
            Self::Hawassa => "Hawassa",
            Self::Gambella => "Gambella",
            Self::Afar => "Afar",
            Self::Somali => "Somali",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Location {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.replace(' ', "_");
        Self::ALL
            .into_iter()
            .find(|l| l.code().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| EnumParseError {
                kind: "location",
                value: s.to_owned(),
            })
    }
}

/// Per-person add-ons for trainings, meetings and workshops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParticipantExtra {
    #[serde(rename = "Flash_Disk")]
    FlashDisk,
    Stationary,
    /// Every option above.
    All,
}

/// Per-session add-ons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SessionExtra {
    #[serde(rename = "Flip_Chart")]
    FlipChart,
    Marker,
    #[serde(rename = "Toner_Paper")]
    TonerPaper,
    All,
}

/// Per-supervisor add-ons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SupervisorExtra {
    MobileCard300,
    MobileCard500,
    Stationary,
    All,
}

/// Printed document kind, priced per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DocumentType {
    Manual,
    Booklet,
    Leaflet,
    Brochure,
}

impl DocumentType {
    pub fn code(self) -> &'static str {
        match self {
            Self::Manual => "Manual",
            Self::Booklet => "Booklet",
            Self::Leaflet => "Leaflet",
            Self::Brochure => "Brochure",
        }
    }
}

// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationRates {
    pub per_diem: f64,
    pub accommodation: f64,
    pub venue: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransportRates {
    pub land: f64,
    pub air: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticipantRates {
    pub flash_disk: f64,
    pub stationary: f64,
}

impl ParticipantRates {
    pub fn amount(&self, extra: ParticipantExtra) -> f64 {
        match extra {
            ParticipantExtra::FlashDisk => self.flash_disk,
            ParticipantExtra::Stationary => self.stationary,
            ParticipantExtra::All => self.flash_disk + self.stationary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionRates {
    pub flip_chart: f64,
    pub marker: f64,
    pub toner_paper: f64,
}

impl SessionRates {
    pub fn amount(&self, extra: SessionExtra) -> f64 {
        match extra {
            SessionExtra::FlipChart => self.flip_chart,
            SessionExtra::Marker => self.marker,
            SessionExtra::TonerPaper => self.toner_paper,
            SessionExtra::All => self.flip_chart + self.marker + self.toner_paper,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupervisorRates {
    pub mobile_card_300: f64,
    pub mobile_card_500: f64,
    pub stationary: f64,
}

impl SupervisorRates {
    pub fn amount(&self, extra: SupervisorExtra) -> f64 {
        match extra {
            SupervisorExtra::MobileCard300 => self.mobile_card_300,
            SupervisorExtra::MobileCard500 => self.mobile_card_500,
            SupervisorExtra::Stationary => self.stationary,
            SupervisorExtra::All => self.mobile_card_300 + self.mobile_card_500 + self.stationary,
        }
    }
}

/// The full rate table used by every costing tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostAssumptions {
    /// Keyed by [`Location::code`].
    pub locations: BTreeMap<String, LocationRates>,
    pub transport: TransportRates,
    pub participant_costs: ParticipantRates,
    pub session_costs: SessionRates,
    pub supervisor_costs: SupervisorRates,
    /// Cost per page, keyed by [`DocumentType::code`].
    pub printing: BTreeMap<String, f64>,
    /// Default unit price per procurement item code.
    pub procurement: BTreeMap<String, f64>,
}

const LOCATION_TABLE: [(&str, f64, f64, f64); 8] = [
    ("Addis_Ababa", 1200.0, 1500.0, 5000.0),
    ("Adama", 1000.0, 1200.0, 4000.0),
    ("Bahirdar", 1100.0, 1300.0, 4500.0),
    ("Mekele", 1100.0, 1300.0, 4500.0),
    ("Hawassa", 1000.0, 1200.0, 4000.0),
    ("Gambella", 1200.0, 1400.0, 4500.0),
    ("Afar", 1200.0, 1400.0, 4500.0),
    ("Somali", 1200.0, 1400.0, 4500.0),
];

const PRINTING_TABLE: [(&str, f64); 4] = [
    ("Manual", 50.0),
    ("Booklet", 40.0),
    ("Leaflet", 30.0),
    ("Brochure", 35.0),
];

const PROCUREMENT_TABLE: [(&str, f64); 68] = [
    ("Air_Freshner", 150.0),
    ("Air_Time", 100.0),
    ("Antivirus", 1500.0),
    ("Bag", 800.0),
    ("Binding_Ring", 50.0),
    ("Broom", 100.0),
    ("Calculator", 300.0),
    ("Camera", 15000.0),
    ("Car", 2_000_000.0),
    ("Carbon_Paper", 50.0),
    ("Car_Part", 5000.0),
    ("Carpet", 2000.0),
    ("Cassette", 100.0),
    ("CD", 50.0),
    ("CDMA", 2000.0),
    ("Chair", 3000.0),
    ("Cloth", 1000.0),
    ("Cloth_Accessory", 500.0),
    ("Coat_Hanger", 200.0),
    ("Computer", 30000.0),
    ("Copier", 50000.0),
    ("Curtain", 3000.0),
    ("Detergent", 100.0),
    ("Disinfectant", 200.0),
    ("Divider", 100.0),
    ("D_Link", 1000.0),
    ("Dust_Bin", 300.0),
    ("Envelope", 10.0),
    ("External_Hard_Drive", 3000.0),
    ("Fantastic_Glue", 50.0),
    ("Fax_Machine", 10000.0),
    ("File_Cabinet", 5000.0),
    ("File_Holder", 200.0),
    ("Flash_Disk", 500.0),
    ("Gawn_Tetron", 2000.0),
    ("Generator", 50000.0),
    ("Glove", 100.0),
    ("Hard_Disk", 2000.0),
    ("Laminator", 5000.0),
    ("Marker", 50.0),
    ("Mop", 200.0),
    ("Network_Cable", 1000.0),
    ("Note_Book", 100.0),
    ("Note_Pad", 50.0),
    ("Paper", 200.0),
    ("Paper_Clip", 20.0),
    ("Paper_Fastener", 30.0),
    ("Paper_Punch", 300.0),
    ("Paper_Ream", 400.0),
    ("Stationary", 500.0),
    ("Printer", 20000.0),
    ("Projector", 30000.0),
    ("Rope", 100.0),
    ("Scanner", 15000.0),
    ("Scouring_Powder", 100.0),
    ("Shelf", 3000.0),
    ("Shoe", 2000.0),
    ("Soap", 50.0),
    ("Surge_Arrestor", 1000.0),
    ("Table", 4000.0),
    ("Textile", 1000.0),
    ("Toilet_Paper", 100.0),
    ("Toner", 5000.0),
    ("T_Shirt", 500.0),
    ("Uhu", 100.0),
    ("UPS", 3000.0),
    ("Vacuum_Cleaner", 10000.0),
    ("Water_Filter", 5000.0),
];

impl Default for CostAssumptions {
    fn default() -> Self {
        Self {
            locations: LOCATION_TABLE
                .iter()
                .map(|&(code, per_diem, accommodation, venue)| {
                    (
                        code.to_owned(),
                        LocationRates {
                            per_diem,
                            accommodation,
                            venue,
                        },
                    )
                })
                .collect(),
            transport: TransportRates {
                land: 1000.0,
                air: 5000.0,
            },
            participant_costs: ParticipantRates {
                flash_disk: 500.0,
                stationary: 200.0,
            },
            session_costs: SessionRates {
                flip_chart: 300.0,
                marker: 150.0,
                toner_paper: 1000.0,
            },
            supervisor_costs: SupervisorRates {
                mobile_card_300: 300.0,
                mobile_card_500: 500.0,
                stationary: 200.0,
            },
            printing: PRINTING_TABLE
                .iter()
                .map(|&(code, rate)| (code.to_owned(), rate))
                .collect(),
            procurement: PROCUREMENT_TABLE
                .iter()
                .map(|&(code, price)| (code.to_owned(), price))
                .collect(),
        }
    }
}

impl CostAssumptions {
    /// Parse a TOML rate override.
    pub fn from_toml_str(content: &str) -> Result<Self, CostingError> {
        Ok(toml::from_str(content)?)
    }

    /// Read a TOML rate override from disk.
    pub fn load(path: &Path) -> Result<Self, CostingError> {
        let content = std::fs::read_to_string(path).map_err(|source| CostingError::ReadRates {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn location(&self, location: Location) -> Result<&LocationRates, CostingError> {
        self.locations
            .get(location.code())
            .ok_or_else(|| CostingError::MissingRate {
                table: "locations",
                key: location.code().to_owned(),
            })
    }

    pub fn cost_per_page(&self, document: DocumentType) -> Result<f64, CostingError> {
        self.printing
            .get(document.code())
            .copied()
            .ok_or_else(|| CostingError::MissingRate {
                table: "printing",
                key: document.code().to_owned(),
            })
    }

    pub fn item_price(&self, item_type: &str) -> Result<f64, CostingError> {
        self.procurement
            .get(item_type)
            .copied()
            .ok_or_else(|| CostingError::MissingRate {
                table: "procurement",
                key: item_type.to_owned(),
            })
    }
}
