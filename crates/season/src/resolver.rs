use crate::calendar::SeasonCalendar;
use crate::error::{Result, SeasonError};
use crate::overrides::{OverrideState, OverrideStore, SeasonOverride};
use crate::window::Clock;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use town_protocol::{SeasonKey, TownId};

/// Where a season tag's state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonSource {
    Auto,
    Override,
    ForcedOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonDecision {
    pub included: bool,
    pub source: SeasonSource,
}

/// Active season context for one town on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSeason {
    pub as_of: NaiveDate,
    /// Tags in effect, after overrides.
    pub season_tags: BTreeSet<SeasonKey>,
    /// Decision for every tag that was detected, known to the calendar or
    /// named by an override row.
    pub decisions: BTreeMap<SeasonKey, SeasonDecision>,
}

impl ResolvedSeason {
    pub fn is_active(&self, key: &SeasonKey) -> bool {
        self.season_tags.contains(key)
    }

    pub fn decision(&self, key: &SeasonKey) -> Option<SeasonDecision> {
        self.decisions.get(key).copied()
    }
}

/// Decide one tag. An override row, when present, fully owns the tag:
/// outside its window the tag is off even if auto-detection says on.
fn decide(row: Option<&SeasonOverride>, detected: bool, as_of: NaiveDate) -> SeasonDecision {
    let state = row.map_or(OverrideState::Auto, SeasonOverride::state);
    match state {
        OverrideState::ForcedOff => SeasonDecision {
            included: false,
            source: SeasonSource::ForcedOff,
        },
        OverrideState::Window { .. } => SeasonDecision {
            included: state.window_contains(as_of),
            source: SeasonSource::Override,
        },
        OverrideState::Auto => SeasonDecision {
            included: detected,
            source: SeasonSource::Auto,
        },
    }
}

/// Pure resolution over already fetched inputs.
///
/// `known` lists tags that should get a decision even when neither
/// detected nor overridden (usually the calendar's keys for the town).
/// More than one row for the same key is an `OverrideConflict`.
pub fn resolve_tags(
    town: &TownId,
    as_of: NaiveDate,
    detected: &BTreeSet<SeasonKey>,
    known: &BTreeSet<SeasonKey>,
    overrides: &[SeasonOverride],
) -> Result<ResolvedSeason> {
    let mut rows: BTreeMap<&SeasonKey, &SeasonOverride> = BTreeMap::new();
    for row in overrides {
        if rows.insert(&row.season_key, row).is_some() {
            return Err(SeasonError::OverrideConflict {
                town: town.clone(),
                season: row.season_key.clone(),
            });
        }
    }

    let universe: BTreeSet<&SeasonKey> = detected
        .iter()
        .chain(known.iter())
        .chain(rows.keys().copied())
        .collect();

    let mut season_tags = BTreeSet::new();
    let mut decisions = BTreeMap::new();
    for key in universe {
        let decision = decide(rows.get(key).copied(), detected.contains(key), as_of);
        if decision.included {
            season_tags.insert(key.clone());
        }
        decisions.insert(key.clone(), decision);
    }

    Ok(ResolvedSeason {
        as_of,
        season_tags,
        decisions,
    })
}

/// Reconciles the calendar with the town's stored overrides.
#[derive(Debug, Clone)]
pub struct SeasonResolver {
    calendar: SeasonCalendar,
}

impl SeasonResolver {
    #[must_use]
    pub fn new(calendar: SeasonCalendar) -> Self {
        Self { calendar }
    }

    pub fn calendar(&self) -> &SeasonCalendar {
        &self.calendar
    }

    pub async fn resolve<S>(&self, store: &S, town: &TownId, as_of: NaiveDate) -> Result<ResolvedSeason>
    where
        S: OverrideStore + ?Sized,
    {
        let overrides = store.list_overrides(town).await?;
        let detected = self.calendar.detect(town, as_of);
        let known = self.calendar.known_keys(town);
        let resolved = resolve_tags(town, as_of, &detected, &known, &overrides)?;
        log::debug!(
            "{town} on {as_of}: detected {:?}, active {:?}",
            detected.iter().map(SeasonKey::as_str).collect::<Vec<_>>(),
            resolved
                .season_tags
                .iter()
                .map(SeasonKey::as_str)
                .collect::<Vec<_>>()
        );
        Ok(resolved)
    }

    /// Resolve for the clock's current local date.
    pub async fn resolve_today<S>(&self, store: &S, town: &TownId, clock: &dyn Clock) -> Result<ResolvedSeason>
    where
        S: OverrideStore + ?Sized,
    {
        self.resolve(store, town, clock.today()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::SeasonRule;
    use crate::overrides::InMemoryOverrideStore;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn key(raw: &str) -> SeasonKey {
        SeasonKey::new(raw).unwrap()
    }

    fn maple() -> TownId {
        TownId::new("maple")
    }

    fn resolver() -> SeasonResolver {
        SeasonResolver::new(SeasonCalendar::new(vec![
            SeasonRule::new("summer", "06-01", "08-31").unwrap(),
            SeasonRule::new("holiday", "11-20", "12-31").unwrap(),
        ]))
    }

    fn store() -> InMemoryOverrideStore {
        let store = InMemoryOverrideStore::new();
        store.register_town(maple()).unwrap();
        store
    }

    #[tokio::test]
    async fn no_row_falls_back_to_detection() {
        let resolved = resolver()
            .resolve(&store(), &maple(), date(2024, 7, 15))
            .await
            .unwrap();
        assert_eq!(resolved.season_tags, BTreeSet::from([key("summer")]));
        assert_eq!(
            resolved.decision(&key("holiday")),
            Some(SeasonDecision {
                included: false,
                source: SeasonSource::Auto
            })
        );
    }

    #[tokio::test]
    async fn window_override_includes_tag_inside_window() {
        let store = store();
        store
            .upsert(SeasonOverride::window(
                maple(),
                key("summer"),
                date(2024, 6, 1),
                date(2024, 8, 31),
            ))
            .unwrap();
        let resolved = resolver()
            .resolve(&store, &maple(), date(2024, 7, 15))
            .await
            .unwrap();
        assert!(resolved.is_active(&key("summer")));
        assert_eq!(
            resolved.decision(&key("summer")).unwrap().source,
            SeasonSource::Override
        );
    }

    #[tokio::test]
    async fn window_override_can_enable_an_undetected_tag() {
        let store = store();
        store
            .upsert(SeasonOverride::window(
                maple(),
                key("restaurant_week"),
                date(2024, 3, 1),
                date(2024, 3, 7),
            ))
            .unwrap();
        let resolved = resolver()
            .resolve(&store, &maple(), date(2024, 3, 4))
            .await
            .unwrap();
        assert_eq!(resolved.season_tags, BTreeSet::from([key("restaurant_week")]));
    }

    #[tokio::test]
    async fn forced_off_beats_detection() {
        let store = store();
        store
            .upsert(SeasonOverride::forced_off(maple(), key("summer")))
            .unwrap();
        let resolved = resolver()
            .resolve(&store, &maple(), date(2024, 7, 15))
            .await
            .unwrap();
        assert!(!resolved.is_active(&key("summer")));
        assert_eq!(
            resolved.decision(&key("summer")),
            Some(SeasonDecision {
                included: false,
                source: SeasonSource::ForcedOff
            })
        );
    }

    #[tokio::test]
    async fn window_outside_as_of_excludes_even_when_detected() {
        let store = store();
        // Summer pushed later this year; on July 15 the calendar says
        // summer, but the override window owns the tag.
        store
            .upsert(SeasonOverride::window(
                maple(),
                key("summer"),
                date(2024, 7, 20),
                date(2024, 9, 10),
            ))
            .unwrap();
        let resolved = resolver()
            .resolve(&store, &maple(), date(2024, 7, 15))
            .await
            .unwrap();
        assert!(!resolved.is_active(&key("summer")));
        assert_eq!(
            resolved.decision(&key("summer")).unwrap().source,
            SeasonSource::Override
        );
    }

    #[tokio::test]
    async fn dateless_row_behaves_like_no_row() {
        let store = store();
        store
            .upsert(SeasonOverride::new(maple(), key("summer"), OverrideState::Auto))
            .unwrap();
        let resolved = resolver()
            .resolve(&store, &maple(), date(2024, 7, 15))
            .await
            .unwrap();
        assert!(resolved.is_active(&key("summer")));
        assert_eq!(
            resolved.decision(&key("summer")).unwrap().source,
            SeasonSource::Auto
        );
    }

    #[test]
    fn duplicate_rows_are_a_conflict() {
        let rows = vec![
            SeasonOverride::forced_off(maple(), key("summer")),
            SeasonOverride::window(maple(), key("summer"), date(2024, 6, 1), date(2024, 6, 2)),
        ];
        let err = resolve_tags(
            &maple(),
            date(2024, 6, 1),
            &BTreeSet::new(),
            &BTreeSet::new(),
            &rows,
        )
        .unwrap_err();
        assert!(matches!(err, SeasonError::OverrideConflict { .. }));
    }
}
