// Domain layer - Reading models and the rules applied to them
pub mod preferences;
pub mod product;
pub mod reading;
pub mod stats;
pub mod tier;
pub mod time_range;
pub mod username;
