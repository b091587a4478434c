// Reading domain models
use serde::{Deserialize, Serialize};

/// One timestamped current measurement from a sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    #[serde(rename = "timestamp")]
    pub sensor_timestamp: String,
    #[serde(rename = "amper")]
    pub amper_value: f64,
    #[serde(rename = "createdAt")]
    pub record_created_at: String,
}

#[cfg(test)]
impl Reading {
    /// A reading stamped with the current time.
    pub fn new(id: impl Into<String>, username: impl Into<String>, amper_value: f64) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: id.into(),
            username: username.into(),
            sensor_timestamp: now.clone(),
            amper_value,
            record_created_at: now,
        }
    }
}

/// Pagination metadata as computed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u32,
}

impl PaginationMeta {
    /// Checks the server-side invariants without recomputing anything:
    /// `pages == ceil(total / limit)` and `1 <= page <= max(pages, 1)`.
    pub fn is_consistent(&self) -> bool {
        if self.limit == 0 {
            return false;
        }
        let expected_pages = self.total.div_ceil(u64::from(self.limit));
        expected_pages == u64::from(self.pages) && self.page >= 1 && self.page <= self.pages.max(1)
    }

    /// Index of the first reading on this page, 1-based. Zero for an empty set.
    pub fn first_item(&self) -> u64 {
        if self.total == 0 {
            return 0;
        }
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit) + 1
    }

    /// Index of the last reading on this page, 1-based.
    pub fn last_item(&self) -> u64 {
        (u64::from(self.page) * u64::from(self.limit)).min(self.total)
    }
}

/// One page of readings plus its pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingPage {
    pub readings: Vec<Reading>,
    pub pagination: PaginationMeta,
}
