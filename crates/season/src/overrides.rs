use crate::error::{Result, SeasonError};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use town_protocol::{SeasonKey, TownId};

/// Reserved date pair meaning "force this season off".
pub const FORCE_OFF_SENTINEL: NaiveDate = match NaiveDate::from_ymd_opt(1970, 1, 1) {
    Some(date) => date,
    None => panic!("sentinel date is valid"),
};

/// Persisted override row, one per `(town_id, season_key)`.
///
/// The row shape is kept compatible with stored data: force-off is encoded
/// as both dates equal to [`FORCE_OFF_SENTINEL`]. Use [`SeasonOverride::state`]
/// rather than inspecting dates directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonOverride {
    pub town_id: TownId,
    pub season_key: SeasonKey,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Decoded meaning of an override row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideState {
    /// Row carries no dates; behaves as if absent.
    Auto,
    /// Manual window. A missing bound is open-ended.
    Window {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
    ForcedOff,
}

impl OverrideState {
    #[must_use]
    pub fn from_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        match (start, end) {
            (None, None) => OverrideState::Auto,
            (Some(s), Some(e)) if s == FORCE_OFF_SENTINEL && e == FORCE_OFF_SENTINEL => {
                OverrideState::ForcedOff
            }
            (start, end) => OverrideState::Window { start, end },
        }
    }

    #[must_use]
    pub fn to_dates(self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        match self {
            OverrideState::Auto => (None, None),
            OverrideState::Window { start, end } => (start, end),
            OverrideState::ForcedOff => (Some(FORCE_OFF_SENTINEL), Some(FORCE_OFF_SENTINEL)),
        }
    }

    /// Whether a manual window covers `date`, bounds inclusive.
    #[must_use]
    pub fn window_contains(self, date: NaiveDate) -> bool {
        match self {
            OverrideState::Window { start, end } => {
                start.map_or(true, |s| s <= date) && end.map_or(true, |e| date <= e)
            }
            OverrideState::Auto | OverrideState::ForcedOff => false,
        }
    }
}

impl SeasonOverride {
    pub fn new(town_id: TownId, season_key: SeasonKey, state: OverrideState) -> Self {
        let (start_date, end_date) = state.to_dates();
        Self {
            town_id,
            season_key,
            start_date,
            end_date,
            notes: None,
        }
    }

    pub fn window(town_id: TownId, season_key: SeasonKey, start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(
            town_id,
            season_key,
            OverrideState::Window {
                start: Some(start),
                end: Some(end),
            },
        )
    }

    pub fn forced_off(town_id: TownId, season_key: SeasonKey) -> Self {
        Self::new(town_id, season_key, OverrideState::ForcedOff)
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    #[must_use]
    pub fn state(&self) -> OverrideState {
        OverrideState::from_dates(self.start_date, self.end_date)
    }

    /// Reject inverted windows.
    pub fn validate(&self) -> Result<()> {
        if let OverrideState::Window {
            start: Some(start),
            end: Some(end),
        } = self.state()
        {
            if start > end {
                return Err(SeasonError::InvalidWindow {
                    season: self.season_key.clone(),
                    start,
                    end,
                });
            }
        }
        Ok(())
    }
}

/// Read side of the override collaborator.
#[async_trait]
pub trait OverrideStore: Send + Sync {
    async fn list_overrides(&self, town: &TownId) -> Result<Vec<SeasonOverride>>;
}

type Rows = BTreeMap<SeasonKey, SeasonOverride>;

/// Override store keyed by `(town, season_key)`; uniqueness is structural.
#[derive(Default)]
pub struct InMemoryOverrideStore {
    towns: Mutex<HashMap<TownId, Rows>>,
}

impl InMemoryOverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_town(&self, town: TownId) -> Result<()> {
        self.lock()?.entry(town).or_default();
        Ok(())
    }

    /// Insert or replace the row for `(town_id, season_key)`.
    pub fn upsert(&self, row: SeasonOverride) -> Result<()> {
        row.validate()?;
        log::info!(
            "{}: override for {} set to {:?}",
            row.town_id,
            row.season_key,
            row.state()
        );
        self.lock()?
            .entry(row.town_id.clone())
            .or_default()
            .insert(row.season_key.clone(), row);
        Ok(())
    }

    /// Insert a new row, failing if one already exists.
    pub fn insert(&self, row: SeasonOverride) -> Result<()> {
        row.validate()?;
        let mut guard = self.lock()?;
        let rows = guard.entry(row.town_id.clone()).or_default();
        if rows.contains_key(&row.season_key) {
            return Err(SeasonError::OverrideConflict {
                town: row.town_id,
                season: row.season_key,
            });
        }
        rows.insert(row.season_key.clone(), row);
        Ok(())
    }

    /// Remove the row, returning the season to auto-detection.
    pub fn clear(&self, town: &TownId, season: &SeasonKey) -> Result<Option<SeasonOverride>> {
        let mut guard = self.lock()?;
        let rows = guard
            .get_mut(town)
            .ok_or_else(|| SeasonError::UnknownTown(town.clone()))?;
        Ok(rows.remove(season))
    }

    pub fn export(&self) -> Result<BTreeMap<TownId, Vec<SeasonOverride>>> {
        let guard = self.lock()?;
        Ok(guard
            .iter()
            .map(|(town, rows)| (town.clone(), rows.values().cloned().collect()))
            .collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<TownId, Rows>>> {
        self.towns
            .lock()
            .map_err(|_| SeasonError::Store("override map poisoned".to_string()))
    }
}

#[async_trait]
impl OverrideStore for InMemoryOverrideStore {
    async fn list_overrides(&self, town: &TownId) -> Result<Vec<SeasonOverride>> {
        let guard = self.lock()?;
        let rows = guard
            .get(town)
            .ok_or_else(|| SeasonError::UnknownTown(town.clone()))?;
        Ok(rows.values().cloned().collect())
    }
}
