use crate::error::{MilestoneError, Result};
use crate::summary::MilestoneSummary;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use town_protocol::{FeatureKey, TownId, TownMembership};

/// Read side of the membership/participation collaborator.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn list_memberships(&self, town: &TownId) -> Result<Vec<TownMembership>>;
}

/// Recompute a town's milestone summary from the store.
///
/// Membership changes over time, so callers should not hold on to the
/// result for long.
pub async fn summarize<S>(store: &S, town: &TownId) -> Result<MilestoneSummary>
where
    S: MembershipStore + ?Sized,
{
    let memberships = store.list_memberships(town).await?;
    let summary = MilestoneSummary::from_memberships(&memberships);
    log::debug!(
        "{town}: {} active of {} memberships, unlocked {:?}",
        summary.active_count,
        memberships.len(),
        summary
            .features_unlocked
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
    );
    Ok(summary)
}

/// Convenience for a single gate check against the live store.
pub async fn feature_unlocked<S>(store: &S, town: &TownId, feature: FeatureKey) -> Result<bool>
where
    S: MembershipStore + ?Sized,
{
    Ok(summarize(store, town).await?.is_unlocked(feature))
}

type Members = BTreeMap<String, TownMembership>;

#[derive(Default)]
pub struct InMemoryMembershipStore {
    towns: Mutex<HashMap<TownId, Members>>,
}

impl InMemoryMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_town(&self, town: TownId) -> Result<()> {
        self.lock()?.entry(town).or_default();
        Ok(())
    }

    /// Insert or replace by `(town_id, business_id)`. Registers the town.
    pub fn upsert(&self, membership: TownMembership) -> Result<()> {
        let mut guard = self.lock()?;
        guard
            .entry(membership.town_id.clone())
            .or_default()
            .insert(membership.business_id.clone(), membership);
        Ok(())
    }

    /// Flip a membership's `active` flag. Returns `false` if the business
    /// has no membership in `town`.
    pub fn set_active(&self, town: &TownId, business_id: &str, active: bool) -> Result<bool> {
        let mut guard = self.lock()?;
        let members = guard
            .get_mut(town)
            .ok_or_else(|| MilestoneError::UnknownTown(town.clone()))?;
        match members.get_mut(business_id) {
            Some(membership) => {
                membership.active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn export(&self) -> Result<BTreeMap<TownId, Vec<TownMembership>>> {
        let guard = self.lock()?;
        Ok(guard
            .iter()
            .map(|(town, members)| (town.clone(), members.values().cloned().collect()))
            .collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<TownId, Members>>> {
        self.towns
            .lock()
            .map_err(|_| MilestoneError::Store("membership map poisoned".to_string()))
    }
}

#[async_trait]
impl MembershipStore for InMemoryMembershipStore {
    async fn list_memberships(&self, town: &TownId) -> Result<Vec<TownMembership>> {
        let guard = self.lock()?;
        let members = guard
            .get(town)
            .ok_or_else(|| MilestoneError::UnknownTown(town.clone()))?;
        Ok(members.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use town_protocol::ParticipationLevel;

    fn maple() -> TownId {
        TownId::new("maple")
    }

    fn store_with(count: usize) -> InMemoryMembershipStore {
        let store = InMemoryMembershipStore::new();
        store.register_town(maple()).unwrap();
        for i in 0..count {
            store
                .upsert(TownMembership::new(format!("biz-{i}"), "maple"))
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn summary_tracks_membership_changes() {
        let store = store_with(4);
        let summary = summarize(&store, &maple()).await.unwrap();
        assert_eq!(summary.active_count, 4);
        assert!(!feature_unlocked(&store, &maple(), FeatureKey::TownPulseLearning)
            .await
            .unwrap());

        store.upsert(TownMembership::new("biz-new", "maple")).unwrap();
        assert!(feature_unlocked(&store, &maple(), FeatureKey::TownPulseLearning)
            .await
            .unwrap());

        assert!(store.set_active(&maple(), "biz-new", false).unwrap());
        assert_eq!(summarize(&store, &maple()).await.unwrap().active_count, 4);
        assert!(!store.set_active(&maple(), "nobody", false).unwrap());
    }

    #[tokio::test]
    async fn upsert_replaces_existing_business() {
        let store = store_with(3);
        store
            .upsert(TownMembership::new("biz-0", "maple").with_level(ParticipationLevel::Hidden))
            .unwrap();
        let summary = summarize(&store, &maple()).await.unwrap();
        assert_eq!(summary.active_count, 2);
        assert!(summary.features_unlocked.is_empty());
    }

    #[tokio::test]
    async fn unknown_town_fails_fast() {
        let store = store_with(0);
        let err = summarize(&store, &TownId::new("nowhere")).await.unwrap_err();
        assert!(matches!(err, MilestoneError::UnknownTown(_)));
    }
}
