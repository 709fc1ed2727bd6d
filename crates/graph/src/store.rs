use crate::error::{GraphError, Result};
use crate::types::{Contribution, FlowEdge};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use town_protocol::{Category, TownId, TownMembership};

/// Backing store for per-town flow edges.
///
/// Implementations must make `record_transition` atomic per
/// `(town, from, to)`: concurrent observations of the same transition are
/// all counted.
#[async_trait]
pub trait FlowGraphStore: Send + Sync {
    /// Increment the `(from, to)` weight, creating the edge at 1.
    /// Returns the new weight.
    async fn record_transition(&self, town: &TownId, from: Category, to: Category) -> Result<u64>;

    /// All edges for `town`, in no particular order.
    async fn list_edges(&self, town: &TownId) -> Result<Vec<FlowEdge>>;
}

/// Reject self-loops before anything reaches the store.
pub fn validate_transition(town: &TownId, from: Category, to: Category) -> Result<()> {
    if from == to {
        return Err(GraphError::InvalidTransition {
            town: town.clone(),
            category: from,
        });
    }
    Ok(())
}

/// Record a transition observed by `observer`.
///
/// Hidden or inactive businesses don't feed the graph; their observations
/// are dropped without touching the store.
pub async fn record_observed<S>(
    store: &S,
    observer: &TownMembership,
    from: Category,
    to: Category,
) -> Result<Contribution>
where
    S: FlowGraphStore + ?Sized,
{
    validate_transition(&observer.town_id, from, to)?;
    if !observer.counts_toward_network() {
        log::debug!(
            "Ignoring {from} -> {to} from {} (not contributing to {})",
            observer.business_id,
            observer.town_id
        );
        return Ok(Contribution::Skipped);
    }
    let weight = store
        .record_transition(&observer.town_id, from, to)
        .await?;
    Ok(Contribution::Recorded { weight })
}

type EdgeWeights = HashMap<(Category, Category), u64>;

/// Process-local store, used in tests and behind the snapshot file.
///
/// Only towns that were registered are known; anything else is
/// `UnknownTown`.
#[derive(Default)]
pub struct InMemoryFlowGraphStore {
    towns: Mutex<HashMap<TownId, EdgeWeights>>,
}

impl InMemoryFlowGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_towns<I, T>(towns: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TownId>,
    {
        let store = Self::new();
        if let Ok(mut guard) = store.towns.lock() {
            for town in towns {
                guard.entry(town.into()).or_default();
            }
        }
        store
    }

    /// Make `town` known. Existing edges are kept.
    pub fn register_town(&self, town: TownId) -> Result<()> {
        let mut guard = self.lock()?;
        guard.entry(town).or_default();
        Ok(())
    }

    /// Replace a town's edges wholesale (snapshot loading).
    pub fn import_edges(&self, town: TownId, edges: &[FlowEdge]) -> Result<()> {
        let mut weights = EdgeWeights::new();
        for edge in edges {
            validate_transition(&town, edge.from, edge.to)?;
            let weight = weights.entry((edge.from, edge.to)).or_default();
            *weight = weight.saturating_add(edge.weight);
        }
        let mut guard = self.lock()?;
        guard.insert(town, weights);
        Ok(())
    }

    /// Every town's edges, sorted by town then `(from, to)`.
    pub fn export(&self) -> Result<BTreeMap<TownId, Vec<FlowEdge>>> {
        let guard = self.lock()?;
        Ok(guard
            .iter()
            .map(|(town, weights)| {
                let mut edges: Vec<FlowEdge> = weights
                    .iter()
                    .map(|(&(from, to), &weight)| FlowEdge::new(from, to, weight))
                    .collect();
                edges.sort_by_key(|e| (e.from, e.to));
                (town.clone(), edges)
            })
            .collect())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<TownId, EdgeWeights>>> {
        self.towns
            .lock()
            .map_err(|_| GraphError::Store("flow edge map poisoned".to_string()))
    }
}

#[async_trait]
impl FlowGraphStore for InMemoryFlowGraphStore {
    async fn record_transition(&self, town: &TownId, from: Category, to: Category) -> Result<u64> {
        validate_transition(town, from, to)?;
        let mut guard = self.lock()?;
        let weights = guard
            .get_mut(town)
            .ok_or_else(|| GraphError::UnknownTown(town.clone()))?;
        let weight = weights.entry((from, to)).or_insert(0);
        *weight = weight.saturating_add(1);
        log::debug!("{town}: {from} -> {to} now at {weight}");
        Ok(*weight)
    }

    async fn list_edges(&self, town: &TownId) -> Result<Vec<FlowEdge>> {
        let guard = self.lock()?;
        let weights = guard
            .get(town)
            .ok_or_else(|| GraphError::UnknownTown(town.clone()))?;
        Ok(weights
            .iter()
            .map(|(&(from, to), &weight)| FlowEdge::new(from, to, weight))
            .collect())
    }
}
