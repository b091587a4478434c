// Reading statistics and the local aggregation fallback
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::reading::Reading;
use super::tier::{classify, Tier};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Negative {field} count: {value}")]
    NegativeCount { field: &'static str, value: i64 },

    #[error("Total override {total} is smaller than the sample of {sample} readings")]
    OverrideBelowSample { total: i64, sample: usize },
}

/// Per-tier reading counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub off: u64,
    pub min: u64,
    pub mid: u64,
    pub max: u64,
}

impl TierCounts {
    pub fn record(&mut self, tier: Tier) {
        match tier {
            Tier::Off => self.off += 1,
            Tier::Min => self.min += 1,
            Tier::Mid => self.mid += 1,
            Tier::Max => self.max += 1,
        }
    }

    pub fn active(&self) -> u64 {
        self.min + self.mid + self.max
    }

    pub fn classified(&self) -> u64 {
        self.off + self.active()
    }
}

/// Aggregate statistics for one user and sensor over a time range.
///
/// Field names follow the backend's stats payload. Payloads with negative
/// counts are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "UserStatsPayload")]
pub struct UserStats {
    pub total_readings: u64,
    pub high_amp_count: u64,
    pub low_amp_count: u64,
    pub percentage: f64,
    #[serde(rename = "offCount")]
    pub off: u64,
    #[serde(rename = "minCount")]
    pub min: u64,
    #[serde(rename = "midCount")]
    pub mid: u64,
    #[serde(rename = "maxCount")]
    pub max: u64,
}

impl UserStats {
    /// Build stats from raw counts, as they arrive from untyped sources.
    ///
    /// `percentage` is computed against `sample_size`, the number of readings
    /// the counts were taken from.
    pub fn from_counts(
        total_readings: i64,
        sample_size: i64,
        off: i64,
        min: i64,
        mid: i64,
        max: i64,
    ) -> Result<Self, ValidationError> {
        let total_readings = non_negative("total", total_readings)?;
        let sample_size = non_negative("sample", sample_size)?;
        let counts = TierCounts {
            off: non_negative("off", off)?,
            min: non_negative("min", min)?,
            mid: non_negative("mid", mid)?,
            max: non_negative("max", max)?,
        };
        Ok(Self::from_tier_counts(total_readings, sample_size, counts))
    }

    fn from_tier_counts(total_readings: u64, sample_size: u64, counts: TierCounts) -> Self {
        let active = counts.active();
        Self {
            total_readings,
            high_amp_count: active,
            low_amp_count: counts.off,
            percentage: percentage(active, sample_size),
            off: counts.off,
            min: counts.min,
            mid: counts.mid,
            max: counts.max,
        }
    }

    pub fn tier_counts(&self) -> TierCounts {
        TierCounts {
            off: self.off,
            min: self.min,
            mid: self.mid,
            max: self.max,
        }
    }
}

/// Stats as the backend sends them, before validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserStatsPayload {
    total_readings: i64,
    high_amp_count: i64,
    low_amp_count: i64,
    percentage: f64,
    off_count: Option<i64>,
    min_count: Option<i64>,
    mid_count: Option<i64>,
    max_count: Option<i64>,
}

impl TryFrom<UserStatsPayload> for UserStats {
    type Error = ValidationError;

    fn try_from(payload: UserStatsPayload) -> Result<Self, Self::Error> {
        // Tier counts, when the backend sends all four, decide the active totals
        if let (Some(off), Some(min), Some(mid), Some(max)) = (
            payload.off_count,
            payload.min_count,
            payload.mid_count,
            payload.max_count,
        ) {
            return Self::from_counts(
                payload.total_readings,
                payload.total_readings,
                off,
                min,
                mid,
                max,
            );
        }

        Ok(Self {
            total_readings: non_negative("total", payload.total_readings)?,
            high_amp_count: non_negative("high amp", payload.high_amp_count)?,
            low_amp_count: non_negative("low amp", payload.low_amp_count)?,
            percentage: payload.percentage,
            off: non_negative("off", payload.off_count.unwrap_or(0))?,
            min: non_negative("min", payload.min_count.unwrap_or(0))?,
            mid: non_negative("mid", payload.mid_count.unwrap_or(0))?,
            max: non_negative("max", payload.max_count.unwrap_or(0))?,
        })
    }
}

/// Statistics tagged with where they came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Statistics {
    /// Computed over the complete filtered set (server endpoint, or a local
    /// aggregate given every reading).
    Exact(UserStats),
    /// Computed from one page only; tier counts and percentage are a sample.
    Estimated(UserStats),
}

impl Statistics {
    pub fn stats(&self) -> &UserStats {
        match self {
            Statistics::Exact(stats) | Statistics::Estimated(stats) => stats,
        }
    }

    pub fn is_estimated(&self) -> bool {
        matches!(self, Statistics::Estimated(_))
    }
}

/// Aggregate readings into tier counts and an active percentage.
///
/// Unclassified readings are excluded from the tier counts but still count
/// towards the sample. With `total_override` the result carries the given
/// total and is tagged as an estimate over the sample.
pub fn aggregate(
    readings: &[Reading],
    total_override: Option<i64>,
) -> Result<Statistics, ValidationError> {
    let mut counts = TierCounts::default();
    for tier in readings.iter().filter_map(|r| classify(r.amper_value)) {
        counts.record(tier);
    }
    let sample_size = readings.len() as u64;

    match total_override {
        None => Ok(Statistics::Exact(UserStats::from_tier_counts(
            sample_size,
            sample_size,
            counts,
        ))),
        Some(total) if total < 0 => Err(ValidationError::NegativeCount {
            field: "total",
            value: total,
        }),
        Some(total) if (total as u64) < sample_size => Err(ValidationError::OverrideBelowSample {
            total,
            sample: readings.len(),
        }),
        Some(total) => Ok(Statistics::Estimated(UserStats::from_tier_counts(
            total as u64,
            sample_size,
            counts,
        ))),
    }
}

fn percentage(active: u64, sample_size: u64) -> f64 {
    if sample_size == 0 {
        return 0.0;
    }
    active as f64 * 100.0 / sample_size as f64
}

fn non_negative(field: &'static str, value: i64) -> Result<u64, ValidationError> {
    u64::try_from(value).map_err(|_| ValidationError::NegativeCount { field, value })
}
