use serde::{Deserialize, Serialize};

use crate::models::Sport;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CourtStatus {
    Available,
    #[serde(rename = "Under Maintenance")]
    UnderMaintenance,
}

impl CourtStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourtStatus::Available => "Available",
            CourtStatus::UnderMaintenance => "Under Maintenance",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Available" => Some(CourtStatus::Available),
            "Under Maintenance" => Some(CourtStatus::UnderMaintenance),
            _ => None,
        }
    }
}

/// A court joined with the sport it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Court {
    pub id: i64,
    pub name: String,
    pub status: CourtStatus,
    pub sport_id: i64,
    pub sport_name: String,
    pub price: i64,
    pub capacity: i64,
}

impl Court {
    pub fn sport(&self) -> Sport {
        Sport {
            id: self.sport_id,
            name: self.sport_name.clone(),
            price: self.price,
            capacity: self.capacity,
        }
    }
}
