// Amper tier classification
use serde::{Deserialize, Serialize};

/// Readings above this value are not shown and not counted.
pub const UNCLASSIFIED_ABOVE: f64 = 22.0;
const MID_UPPER: f64 = 5.0;
const MID_LOWER: f64 = 3.0;
const MIN_LOWER: f64 = 1.0;

/// Categorical bucket a reading's amperage falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Off,
    Min,
    Mid,
    Max,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Off => "off",
            Tier::Min => "min",
            Tier::Mid => "mid",
            Tier::Max => "max",
        }
    }

    /// Whether the device counts as drawing current in this tier.
    pub fn is_active(&self) -> bool {
        !matches!(self, Tier::Off)
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a current value to its tier.
///
/// Boundaries:
/// - `v > 22` or NaN: unclassified (`None`)
/// - `5 < v <= 22`: max
/// - `3 <= v <= 5`: mid
/// - `1 <= v < 3`: min
/// - `v < 1`: off
pub fn classify(amper_value: f64) -> Option<Tier> {
    if amper_value.is_nan() || amper_value > UNCLASSIFIED_ABOVE {
        None
    } else if amper_value > MID_UPPER {
        Some(Tier::Max)
    } else if amper_value >= MID_LOWER {
        Some(Tier::Mid)
    } else if amper_value >= MIN_LOWER {
        Some(Tier::Min)
    } else {
        Some(Tier::Off)
    }
}
