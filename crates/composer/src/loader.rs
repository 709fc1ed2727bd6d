use crate::types::{BaseContent, BoostKind, BoostPayloads, ComposeContext};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::Arc;
use town_graph::{format_chain, FlowEdge, FlowGraph, FlowGraphStore, DEFAULT_CHAIN_LENGTH};
use town_milestones::{summarize, MembershipStore, MilestoneSummary};
use town_protocol::{Category, FeatureKey, RouteWindow, TownId};
use town_season::{resolve_window, OverrideStore, ResolvedSeason, ResolvedWindow, SeasonResolver};

const NEXT_STOP_LIMIT: usize = 3;

/// Category a route window usually starts from.
#[must_use]
pub const fn window_anchor(window: RouteWindow) -> Category {
    match window {
        RouteWindow::Morning => Category::Coffee,
        RouteWindow::Lunch | RouteWindow::Evening => Category::Food,
        RouteWindow::AfterWork => Category::Fitness,
        RouteWindow::Weekend => Category::Retail,
    }
}

/// Next-stop copy, e.g. `"After Coffee, locals head to Fitness or Retail"`.
///
/// `stops` share one `from` category, heaviest first. `None` when empty.
pub fn next_stop_copy(stops: &[FlowEdge]) -> Option<String> {
    let first = stops.first()?;
    let labels: Vec<&str> = stops.iter().map(|edge| edge.to.label()).collect();
    let targets = match labels.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} or {last}", rest.join(", ")),
        _ => labels.join(""),
    };
    Some(format!(
        "After {}, locals head to {targets}",
        first.from.label()
    ))
}

/// Everything known about a town for one request.
///
/// Fields backed by a failed lookup are `None`; see [`TownContextLoader::load`].
#[derive(Debug, Clone, Serialize)]
pub struct TownContext {
    pub town: TownId,
    pub window: ResolvedWindow,
    pub milestones: Option<MilestoneSummary>,
    pub season: Option<ResolvedSeason>,
    pub edges: Option<Vec<FlowEdge>>,
    /// Greedy flow chain; empty while the town is still learning.
    pub chain: Vec<Category>,
    /// Heaviest stops after the window's anchor category. Only filled
    /// once graph routes are unlocked.
    pub next_stops: Vec<FlowEdge>,
}

impl TownContext {
    pub fn is_unlocked(&self, feature: FeatureKey) -> bool {
        self.milestones
            .as_ref()
            .is_some_and(|summary| summary.is_unlocked(feature))
    }

    /// Bundle with upstream content for [`crate::compose`].
    ///
    /// Blank graph and micro-route slots fall back to copy derived from
    /// the flow graph: [`next_stop_copy`] over `next_stops`, and the
    /// formatted chain. Gating still happens in `compose`.
    pub fn compose_context(&self, base: BaseContent, mut boosts: BoostPayloads) -> ComposeContext {
        if boosts.get(BoostKind::Graph).is_none() {
            boosts.graph = next_stop_copy(&self.next_stops);
        }
        if boosts.get(BoostKind::MicroRoute).is_none() {
            boosts.micro_route = format_chain(&self.chain);
        }
        ComposeContext {
            base,
            boosts,
            milestones: self.milestones.clone(),
            season: self.season.clone(),
            window: Some(self.window),
        }
    }
}

/// Pulls town context from the three stores.
///
/// Store failures never propagate: they are logged and the matching
/// field is left empty so the base plan can still render.
pub struct TownContextLoader {
    graph: Arc<dyn FlowGraphStore>,
    memberships: Arc<dyn MembershipStore>,
    overrides: Arc<dyn OverrideStore>,
    resolver: SeasonResolver,
    chain_max_length: usize,
}

impl TownContextLoader {
    pub fn new(
        graph: Arc<dyn FlowGraphStore>,
        memberships: Arc<dyn MembershipStore>,
        overrides: Arc<dyn OverrideStore>,
        resolver: SeasonResolver,
    ) -> Self {
        Self {
            graph,
            memberships,
            overrides,
            resolver,
            chain_max_length: DEFAULT_CHAIN_LENGTH,
        }
    }

    #[must_use]
    pub fn with_chain_max_length(mut self, max_length: usize) -> Self {
        self.chain_max_length = max_length;
        self
    }

    pub async fn load(
        &self,
        town: &TownId,
        now: NaiveDateTime,
        window_override: Option<RouteWindow>,
    ) -> TownContext {
        let window = resolve_window(window_override, now);

        let milestones = match summarize(self.memberships.as_ref(), town).await {
            Ok(summary) => Some(summary),
            Err(err) => {
                log::warn!("{town}: milestone lookup failed, omitting boosts: {err}");
                None
            }
        };

        let season = match self
            .resolver
            .resolve(self.overrides.as_ref(), town, now.date())
            .await
        {
            Ok(season) => Some(season),
            Err(err) => {
                log::warn!("{town}: season resolution failed, omitting boosts: {err}");
                None
            }
        };

        let edges = match self.graph.list_edges(town).await {
            Ok(edges) => Some(edges),
            Err(err) => {
                log::warn!("{town}: flow edge lookup failed: {err}");
                None
            }
        };

        let graph = FlowGraph::from_edges(edges.as_deref().unwrap_or_default());
        let chain = graph.derive_chain(self.chain_max_length);
        let routes_unlocked = milestones
            .as_ref()
            .is_some_and(|m| m.is_unlocked(FeatureKey::TownGraphRoutes));
        let next_stops = if routes_unlocked {
            graph.next_stops(window_anchor(window.window), NEXT_STOP_LIMIT)
        } else {
            Vec::new()
        };

        TownContext {
            town: town.clone(),
            window,
            milestones,
            season,
            edges,
            chain,
            next_stops,
        }
    }
}
