use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use town_graph::DEFAULT_CHAIN_LENGTH;
use town_season::{SeasonCalendar, SeasonRule};

pub const DEFAULT_CONFIG_FILE: &str = "town.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TownConfig {
    pub data_path: PathBuf,
    pub default_town: Option<String>,
    pub chain_max_length: usize,
    pub calendar: CalendarConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CalendarConfig {
    pub rules: Vec<SeasonRule>,
}

impl Default for TownConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("town-data.json"),
            default_town: None,
            chain_max_length: DEFAULT_CHAIN_LENGTH,
            calendar: CalendarConfig::default(),
        }
    }
}

impl TownConfig {
    /// Load an explicit config file, or `./town.toml` when present.
    ///
    /// A missing explicit file is an error; a missing default file just
    /// means defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !required && !path.exists() {
            log::debug!("No {DEFAULT_CONFIG_FILE} found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::parse(&raw)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        if config.chain_max_length < 2 {
            anyhow::bail!(
                "chain_max_length must be at least 2 (got {})",
                config.chain_max_length
            );
        }
        Ok(config)
    }

    /// Configured calendar, or the built-in one when no rules are set.
    pub fn calendar(&self) -> Result<SeasonCalendar> {
        if self.calendar.rules.is_empty() {
            return Ok(SeasonCalendar::builtin()?);
        }
        Ok(SeasonCalendar::new(self.calendar.rules.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use town_protocol::TownId;

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(TownConfig::parse("").unwrap(), TownConfig::default());
        let calendar = TownConfig::default().calendar().unwrap();
        assert_eq!(calendar, SeasonCalendar::builtin().unwrap());
    }

    #[test]
    fn parses_calendar_rules() {
        let raw = r#"
data_path = "/var/lib/town/data.json"
default_town = "maple"
chain_max_length = 5

[[calendar.rules]]
key = "summer"
start = "06-15"
end = "09-05"

[[calendar.rules]]
key = "maple_fest"
start = "10-10"
end = "10-12"
towns = ["maple"]
"#;
        let config = TownConfig::parse(raw).unwrap();
        assert_eq!(config.default_town.as_deref(), Some("maple"));
        assert_eq!(config.chain_max_length, 5);
        let calendar = config.calendar().unwrap();
        assert_eq!(calendar.rules().len(), 2);
        assert_eq!(calendar.rules()[1].towns, vec![TownId::new("maple")]);
    }

    #[test]
    fn rejects_unknown_keys_and_short_chains() {
        assert!(TownConfig::parse("colour = \"blue\"").is_err());
        assert!(TownConfig::parse("chain_max_length = 1").is_err());
        let bad_rule = "[[calendar.rules]]\nkey = \"x\"\nstart = \"13-01\"\nend = \"01-01\"\n";
        assert!(TownConfig::parse(bad_rule).is_err());
    }
}
