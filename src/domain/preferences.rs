// User preferences
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub auto_refresh: bool,
    /// Seconds between automatic refreshes
    pub refresh_interval: u64,
    pub theme: Theme,
    pub notifications: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            auto_refresh: true,
            refresh_interval: 60,
            theme: Theme::Auto,
            notifications: true,
        }
    }
}

impl Preferences {
    /// Refresh period, or `None` when auto refresh is off.
    pub fn refresh_period(&self) -> Option<Duration> {
        (self.auto_refresh && self.refresh_interval > 0)
            .then(|| Duration::from_secs(self.refresh_interval))
    }

    pub fn merged(mut self, update: &PreferencesUpdate) -> Self {
        if let Some(auto_refresh) = update.auto_refresh {
            self.auto_refresh = auto_refresh;
        }
        if let Some(refresh_interval) = update.refresh_interval {
            self.refresh_interval = refresh_interval;
        }
        if let Some(theme) = update.theme {
            self.theme = theme;
        }
        if let Some(notifications) = update.notifications {
            self.notifications = notifications;
        }
        self
    }
}

/// A partial preferences change; unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferencesUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_refresh: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<bool>,
}
