use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sport {
    pub id: i64,
    pub name: String,
    /// Hourly rate in the smallest currency unit.
    pub price: i64,
    /// 1 for exclusive courts, >1 for shared resources such as lanes.
    pub capacity: i64,
}

impl Sport {
    pub fn is_shared(&self) -> bool {
        self.capacity > 1
    }
}
