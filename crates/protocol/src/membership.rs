use crate::error::{ProtocolError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct TownId(String);

impl TownId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TownId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TownId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TownId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationLevel {
    #[default]
    Standard,
    Leader,
    Hidden,
}

impl ParticipationLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ParticipationLevel::Standard => "standard",
            ParticipationLevel::Leader => "leader",
            ParticipationLevel::Hidden => "hidden",
        }
    }
}

impl FromStr for ParticipationLevel {
    type Err = ProtocolError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(ParticipationLevel::Standard),
            "leader" => Ok(ParticipationLevel::Leader),
            "hidden" => Ok(ParticipationLevel::Hidden),
            _ => Err(ProtocolError::UnknownParticipation(raw.to_string())),
        }
    }
}

/// A business's participation in a town network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TownMembership {
    pub business_id: String,
    pub town_id: TownId,
    #[serde(default)]
    pub participation_level: ParticipationLevel,
    pub active: bool,
}

impl TownMembership {
    pub fn new(business_id: impl Into<String>, town_id: impl Into<TownId>) -> Self {
        Self {
            business_id: business_id.into(),
            town_id: town_id.into(),
            participation_level: ParticipationLevel::Standard,
            active: true,
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: ParticipationLevel) -> Self {
        self.participation_level = level;
        self
    }

    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Whether this membership counts toward milestones and may feed the
    /// flow graph. Hidden and inactive businesses do neither.
    #[must_use]
    pub fn counts_toward_network(&self) -> bool {
        self.active && self.participation_level != ParticipationLevel::Hidden
    }
}
