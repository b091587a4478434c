// Product and user roster domain models
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sensors: Vec<String>,
    #[serde(rename = "amperreadings", default)]
    pub reading_ids: Vec<String>,
}

impl Product {
    pub fn has_sensor(&self, sensor: &str) -> bool {
        self.sensors.iter().any(|s| s == sensor)
    }

    pub fn reading_count(&self) -> usize {
        self.reading_ids.len()
    }
}

/// A user seen on a product, with how many readings they have.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub username: String,
    pub reading_count: u64,
    #[serde(default)]
    pub last_reading: Option<String>,
}

/// The scope of every readings query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection {
    pub product_id: String,
    pub username: String,
    pub sensor: String,
    pub time_range: super::time_range::TimeRange,
}

impl Selection {
    pub fn new(
        product_id: impl Into<String>,
        username: impl Into<String>,
        sensor: impl Into<String>,
        time_range: super::time_range::TimeRange,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            username: username.into(),
            sensor: sensor.into(),
            time_range,
        }
    }
}
