use crate::error::{Result, SeasonError};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use town_protocol::{SeasonKey, TownId};

/// Calendar day without a year, written `MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthDay {
    month: u32,
    day: u32,
}

impl MonthDay {
    pub fn new(month: u32, day: u32) -> Result<Self> {
        // 2000 is a leap year, so 02-29 is accepted.
        if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
            return Err(SeasonError::InvalidRule(format!(
                "{month:02}-{day:02} is not a calendar day"
            )));
        }
        Ok(Self { month, day })
    }

    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self {
            month: date.month(),
            day: date.day(),
        }
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

impl FromStr for MonthDay {
    type Err = SeasonError;

    fn from_str(raw: &str) -> Result<Self> {
        let invalid = || SeasonError::InvalidRule(format!("expected MM-DD, got {raw:?}"));
        let (month, day) = raw.trim().split_once('-').ok_or_else(invalid)?;
        let month = month.parse().map_err(|_| invalid())?;
        let day = day.parse().map_err(|_| invalid())?;
        Self::new(month, day)
    }
}

impl TryFrom<String> for MonthDay {
    type Error = SeasonError;

    fn try_from(raw: String) -> Result<Self> {
        raw.parse()
    }
}

impl From<MonthDay> for String {
    fn from(md: MonthDay) -> Self {
        md.to_string()
    }
}

/// Recurring yearly span during which a season tag is auto-detected.
///
/// `start > end` wraps the year boundary (`12-01..02-28`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeasonRule {
    pub key: SeasonKey,
    pub start: MonthDay,
    pub end: MonthDay,
    /// Restrict the rule to these towns. Empty means every town.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub towns: Vec<TownId>,
}

impl SeasonRule {
    pub fn new(key: &str, start: &str, end: &str) -> Result<Self> {
        Ok(Self {
            key: SeasonKey::new(key).map_err(|e| SeasonError::InvalidRule(e.to_string()))?,
            start: start.parse()?,
            end: end.parse()?,
            towns: Vec::new(),
        })
    }

    #[must_use]
    pub fn for_towns(mut self, towns: Vec<TownId>) -> Self {
        self.towns = towns;
        self
    }

    #[must_use]
    pub fn applies_to(&self, town: &TownId) -> bool {
        self.towns.is_empty() || self.towns.contains(town)
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        let today = MonthDay::of(date);
        if self.start <= self.end {
            self.start <= today && today <= self.end
        } else {
            today >= self.start || today <= self.end
        }
    }
}

/// Auto-detector for season tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonCalendar {
    rules: Vec<SeasonRule>,
}

const BUILTIN_RULES: [(&str, &str, &str); 7] = [
    ("spring_break", "03-10", "03-31"),
    ("summer", "06-01", "08-31"),
    ("back_to_school", "08-10", "09-15"),
    ("school_year", "09-01", "06-15"),
    ("football", "09-01", "11-30"),
    ("fall_festival", "10-01", "10-31"),
    ("holiday", "11-20", "12-31"),
];

impl SeasonCalendar {
    #[must_use]
    pub fn new(rules: Vec<SeasonRule>) -> Self {
        Self { rules }
    }

    pub fn builtin() -> Result<Self> {
        let rules = BUILTIN_RULES
            .iter()
            .map(|(key, start, end)| SeasonRule::new(key, start, end))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[SeasonRule] {
        &self.rules
    }

    /// Every key this calendar can detect for `town`.
    pub fn known_keys(&self, town: &TownId) -> BTreeSet<SeasonKey> {
        self.rules
            .iter()
            .filter(|rule| rule.applies_to(town))
            .map(|rule| rule.key.clone())
            .collect()
    }

    /// Tags whose rule covers `date` in `town`.
    pub fn detect(&self, town: &TownId, date: NaiveDate) -> BTreeSet<SeasonKey> {
        self.rules
            .iter()
            .filter(|rule| rule.applies_to(town) && rule.contains(date))
            .map(|rule| rule.key.clone())
            .collect()
    }
}
