// Time range tokens accepted by the readings endpoints
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown time range '{0}', expected one of 1h, 6h, 12h, 24h, 7d, 30d")]
pub struct TimeRangeError(pub String);

/// Query window. The server decides what each token covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimeRange {
    LastHour,
    Last6Hours,
    Last12Hours,
    #[default]
    Last24Hours,
    Last7Days,
    Last30Days,
}

impl TimeRange {
    pub const ALL: [TimeRange; 6] = [
        TimeRange::LastHour,
        TimeRange::Last6Hours,
        TimeRange::Last12Hours,
        TimeRange::Last24Hours,
        TimeRange::Last7Days,
        TimeRange::Last30Days,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            TimeRange::LastHour => "1h",
            TimeRange::Last6Hours => "6h",
            TimeRange::Last12Hours => "12h",
            TimeRange::Last24Hours => "24h",
            TimeRange::Last7Days => "7d",
            TimeRange::Last30Days => "30d",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeRange::LastHour => "Last hour",
            TimeRange::Last6Hours => "Last 6 hours",
            TimeRange::Last12Hours => "Last 12 hours",
            TimeRange::Last24Hours => "Last 24 hours",
            TimeRange::Last7Days => "Last 7 days",
            TimeRange::Last30Days => "Last 30 days",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for TimeRange {
    type Err = TimeRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        Self::ALL
            .into_iter()
            .find(|range| range.token() == token)
            .ok_or_else(|| TimeRangeError(s.to_string()))
    }
}

impl TryFrom<String> for TimeRange {
    type Error = TimeRangeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeRange> for String {
    fn from(range: TimeRange) -> Self {
        range.token().to_string()
    }
}
