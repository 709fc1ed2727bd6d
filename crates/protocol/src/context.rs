use crate::error::{ProtocolError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Town-level feature gated behind a participation milestone.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKey {
    TownStories,
    TownPulseLearning,
    TownGraphRoutes,
}

impl FeatureKey {
    pub const ALL: [FeatureKey; 3] = [
        FeatureKey::TownStories,
        FeatureKey::TownPulseLearning,
        FeatureKey::TownGraphRoutes,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            FeatureKey::TownStories => "town_stories",
            FeatureKey::TownPulseLearning => "town_pulse_learning",
            FeatureKey::TownGraphRoutes => "town_graph_routes",
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for FeatureKey {
    type Err = ProtocolError;

    fn from_str(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        FeatureKey::ALL
            .into_iter()
            .find(|key| key.as_str() == normalized)
            .ok_or_else(|| ProtocolError::UnknownFeature(raw.to_string()))
    }
}

/// Label for recurring local temporal context ("summer", "holiday", ...).
///
/// Keys are admin-defined, so this is an open vocabulary. Construction
/// normalizes to lowercase snake_case and rejects anything else.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(try_from = "String", into = "String")]
pub struct SeasonKey(String);

impl SeasonKey {
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let raw = raw.as_ref();
        let normalized: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                other => other.to_ascii_lowercase(),
            })
            .collect();
        let valid = !normalized.is_empty()
            && normalized
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !valid {
            return Err(ProtocolError::InvalidSeasonKey(raw.to_string()));
        }
        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeasonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl FromStr for SeasonKey {
    type Err = ProtocolError;

    fn from_str(raw: &str) -> Result<Self> {
        Self::new(raw)
    }
}

impl TryFrom<String> for SeasonKey {
    type Error = ProtocolError;

    fn try_from(raw: String) -> Result<Self> {
        Self::new(raw)
    }
}

impl From<SeasonKey> for String {
    fn from(key: SeasonKey) -> Self {
        key.0
    }
}

/// Coarse time-of-day / day-of-week bucket.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum RouteWindow {
    Morning,
    Lunch,
    AfterWork,
    Evening,
    Weekend,
}

impl RouteWindow {
    pub const ALL: [RouteWindow; 5] = [
        RouteWindow::Morning,
        RouteWindow::Lunch,
        RouteWindow::AfterWork,
        RouteWindow::Evening,
        RouteWindow::Weekend,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RouteWindow::Morning => "morning",
            RouteWindow::Lunch => "lunch",
            RouteWindow::AfterWork => "after_work",
            RouteWindow::Evening => "evening",
            RouteWindow::Weekend => "weekend",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            RouteWindow::Morning => "Morning",
            RouteWindow::Lunch => "Lunch",
            RouteWindow::AfterWork => "After work",
            RouteWindow::Evening => "Evening",
            RouteWindow::Weekend => "Weekend",
        }
    }

    /// Parse a caller-supplied override. `auto` and the empty string mean
    /// "no override" and yield `Ok(None)`.
    pub fn parse_override(raw: &str) -> Result<Option<Self>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
            return Ok(None);
        }
        trimmed.parse().map(Some)
    }
}

impl fmt::Display for RouteWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for RouteWindow {
    type Err = ProtocolError;

    fn from_str(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        let window = match normalized.as_str() {
            "morning" => RouteWindow::Morning,
            "lunch" => RouteWindow::Lunch,
            "after_work" | "afterwork" => RouteWindow::AfterWork,
            "evening" => RouteWindow::Evening,
            "weekend" => RouteWindow::Weekend,
            _ => return Err(ProtocolError::UnknownWindow(raw.to_string())),
        };
        Ok(window)
    }
}
