use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use town_protocol::{FeatureKey, TownMembership};

/// Active-business thresholds, ascending. A feature is unlocked once the
/// town's active count reaches its threshold.
pub const MILESTONES: [(usize, FeatureKey); 3] = [
    (3, FeatureKey::TownStories),
    (5, FeatureKey::TownPulseLearning),
    (10, FeatureKey::TownGraphRoutes),
];

/// Derived view of a town's participation. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MilestoneSummary {
    pub active_count: usize,
    pub features_unlocked: BTreeSet<FeatureKey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NextMilestone {
    pub threshold: usize,
    pub feature: FeatureKey,
    /// Additional active businesses needed.
    pub remaining: usize,
}

impl MilestoneSummary {
    #[must_use]
    pub fn from_active_count(active_count: usize) -> Self {
        let features_unlocked = MILESTONES
            .iter()
            .filter(|(threshold, _)| active_count >= *threshold)
            .map(|(_, feature)| *feature)
            .collect();
        Self {
            active_count,
            features_unlocked,
        }
    }

    pub fn from_memberships<'a>(memberships: impl IntoIterator<Item = &'a TownMembership>) -> Self {
        Self::from_active_count(count_active(memberships))
    }

    #[must_use]
    pub fn is_unlocked(&self, feature: FeatureKey) -> bool {
        self.features_unlocked.contains(&feature)
    }

    /// The lowest threshold not yet reached, if any.
    #[must_use]
    pub fn next_milestone(&self) -> Option<NextMilestone> {
        MILESTONES
            .iter()
            .find(|(threshold, _)| self.active_count < *threshold)
            .map(|&(threshold, feature)| NextMilestone {
                threshold,
                feature,
                remaining: threshold - self.active_count,
            })
    }
}

/// Pure membership check against an already computed summary.
#[must_use]
pub fn is_feature_unlocked(summary: &MilestoneSummary, feature: FeatureKey) -> bool {
    summary.is_unlocked(feature)
}

/// Count memberships that are active and not hidden.
pub fn count_active<'a>(memberships: impl IntoIterator<Item = &'a TownMembership>) -> usize {
    memberships
        .into_iter()
        .filter(|m| m.counts_toward_network())
        .count()
}
