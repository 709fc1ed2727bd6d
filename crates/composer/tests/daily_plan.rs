use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use town_composer::{
    compose, BaseContent, BoostPayloads, SectionKind, SkipReason, TownContextLoader,
};
use town_graph::FlowEdge;
use town_graph::{format_chain, FlowGraphStore, InMemoryFlowGraphStore};
use town_milestones::{InMemoryMembershipStore, MembershipStore, MilestoneError};
use town_protocol::{Category, FeatureKey, RouteWindow, SeasonKey, TownId, TownMembership};
use town_season::{
    InMemoryOverrideStore, SeasonCalendar, SeasonOverride, SeasonResolver, SeasonSource,
    WindowSource,
};

struct UnreachableMembers;

#[async_trait]
impl MembershipStore for UnreachableMembers {
    async fn list_memberships(&self, _town: &TownId) -> town_milestones::Result<Vec<TownMembership>> {
        Err(MilestoneError::Store("connection refused".to_string()))
    }
}

fn maple() -> TownId {
    TownId::new("maple")
}

// Monday morning in summer.
fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 7, 15)
        .unwrap()
        .and_hms_opt(8, 30, 0)
        .unwrap()
}

fn base() -> BaseContent {
    BaseContent {
        special: Some("Iced maple latte".to_string()),
        post: Some("Beat the heat with us this morning".to_string()),
        sign: Some("ICED LATTES".to_string()),
    }
}

fn boosts() -> BoostPayloads {
    BoostPayloads {
        local: Some("Shout out the bakery".to_string()),
        town: Some("Trail cleanup Saturday".to_string()),
        story: Some("Meet Ana from the gym".to_string()),
        graph: Some("Morning regulars head to Fitness next".to_string()),
        micro_route: Some("Coffee → Fitness → Retail".to_string()),
        seasonal: Some("Summer hours: open at 6".to_string()),
    }
}

async fn seeded_graph() -> Arc<InMemoryFlowGraphStore> {
    let graph = Arc::new(InMemoryFlowGraphStore::with_towns(["maple"]));
    for (from, to, times) in [
        (Category::Coffee, Category::Fitness, 5),
        (Category::Fitness, Category::Retail, 3),
        (Category::Coffee, Category::Retail, 1),
    ] {
        for _ in 0..times {
            graph.record_transition(&maple(), from, to).await.unwrap();
        }
    }
    graph
}

fn members(count: usize) -> Arc<InMemoryMembershipStore> {
    let store = Arc::new(InMemoryMembershipStore::new());
    store.register_town(maple()).unwrap();
    for i in 0..count {
        store
            .upsert(TownMembership::new(format!("biz-{i}"), "maple"))
            .unwrap();
    }
    store
}

fn overrides() -> Arc<InMemoryOverrideStore> {
    let store = Arc::new(InMemoryOverrideStore::new());
    store.register_town(maple()).unwrap();
    store
}

fn resolver() -> SeasonResolver {
    SeasonResolver::new(SeasonCalendar::builtin().unwrap())
}

#[tokio::test]
async fn full_network_gets_every_boost() {
    let loader = TownContextLoader::new(seeded_graph().await, members(12), overrides(), resolver());
    let context = loader.load(&maple(), now(), None).await;

    assert_eq!(context.window.window, RouteWindow::Morning);
    assert_eq!(context.window.source, WindowSource::Auto);
    assert_eq!(
        context.chain,
        vec![Category::Coffee, Category::Fitness, Category::Retail]
    );
    assert_eq!(
        format_chain(&context.chain).as_deref(),
        Some("Coffee → Fitness → Retail")
    );
    let stops: Vec<Category> = context.next_stops.iter().map(|e| e.to).collect();
    assert_eq!(stops, vec![Category::Fitness, Category::Retail]);

    let pack = compose(&context.compose_context(base(), boosts()));
    assert_eq!(pack.sections.len(), 9);
    assert_eq!(pack.route_window, Some(RouteWindow::Morning));
    assert_eq!(pack.season_tags, vec![SeasonKey::new("summer").unwrap()]);
}

#[tokio::test]
async fn small_town_only_sees_stories() {
    let loader = TownContextLoader::new(seeded_graph().await, members(4), overrides(), resolver());
    let context = loader.load(&maple(), now(), Some(RouteWindow::Lunch)).await;

    assert!(context.is_unlocked(FeatureKey::TownStories));
    assert!(!context.is_unlocked(FeatureKey::TownGraphRoutes));
    assert_eq!(context.window.source, WindowSource::Override);
    assert!(context.next_stops.is_empty());

    let pack = compose(&context.compose_context(base(), boosts()));
    assert_eq!(
        pack.section_kinds(),
        vec![
            SectionKind::Special,
            SectionKind::Post,
            SectionKind::Sign,
            SectionKind::LocalBoost,
            SectionKind::TownStory,
            SectionKind::SeasonalBoost,
        ]
    );
}

#[tokio::test]
async fn forced_off_summer_drops_seasonal_boost() {
    let overrides = overrides();
    overrides
        .upsert(SeasonOverride::forced_off(maple(), SeasonKey::new("summer").unwrap()))
        .unwrap();
    let loader = TownContextLoader::new(seeded_graph().await, members(12), overrides, resolver());
    let context = loader.load(&maple(), now(), None).await;

    let season = context.season.as_ref().unwrap();
    assert!(season.season_tags.is_empty());
    assert_eq!(
        season
            .decision(&SeasonKey::new("summer").unwrap())
            .unwrap()
            .source,
        SeasonSource::ForcedOff
    );

    let pack = compose(&context.compose_context(base(), boosts()));
    assert!(pack.section(SectionKind::SeasonalBoost).is_none());
    assert_eq!(pack.skipped.len(), 1);
    assert_eq!(pack.skipped[0].reason, SkipReason::NoActiveSeason);
}

#[tokio::test]
async fn unreachable_membership_store_still_renders_base_plan() {
    let loader = TownContextLoader::new(
        seeded_graph().await,
        Arc::new(UnreachableMembers),
        overrides(),
        resolver(),
    );
    let context = loader.load(&maple(), now(), None).await;
    assert!(context.milestones.is_none());
    assert!(context.season.is_some());

    let pack = compose(&context.compose_context(base(), boosts()));
    assert_eq!(
        pack.section_kinds(),
        vec![SectionKind::Special, SectionKind::Post, SectionKind::Sign]
    );
    assert!(pack
        .skipped
        .iter()
        .all(|s| s.reason == SkipReason::NoTownContext));
}

#[tokio::test]
async fn unknown_town_degrades_instead_of_failing() {
    let loader = TownContextLoader::new(seeded_graph().await, members(12), overrides(), resolver());
    let context = loader.load(&TownId::new("atlantis"), now(), None).await;
    assert!(context.milestones.is_none());
    assert!(context.season.is_none());
    assert!(context.edges.is_none());
    assert!(context.chain.is_empty());

    let pack = compose(&context.compose_context(base(), BoostPayloads::default()));
    assert_eq!(pack.sections.len(), 3);
}

#[tokio::test]
async fn empty_graph_means_still_learning() {
    let graph: Arc<dyn FlowGraphStore> = Arc::new(InMemoryFlowGraphStore::with_towns(["maple"]));
    let loader = TownContextLoader::new(graph, members(12), overrides(), resolver());
    let context = loader.load(&maple(), now(), None).await;
    assert_eq!(context.edges.as_deref(), Some(&[][..]));
    assert_eq!(format_chain(&context.chain), None);
}

#[tokio::test]
async fn routes_come_from_the_graph_when_no_copy_is_supplied() {
    let loader = TownContextLoader::new(seeded_graph().await, members(10), overrides(), resolver());
    let context = loader.load(&maple(), now(), None).await;
    assert_eq!(
        context.next_stops,
        vec![
            FlowEdge::new(Category::Coffee, Category::Fitness, 5),
            FlowEdge::new(Category::Coffee, Category::Retail, 1),
        ]
    );

    let base = BaseContent {
        special: Some("Iced maple latte".to_string()),
        ..BaseContent::default()
    };
    let pack = compose(&context.compose_context(base, BoostPayloads::default()));
    assert_eq!(
        pack.section_kinds(),
        vec![
            SectionKind::Special,
            SectionKind::GraphNextStop,
            SectionKind::MicroRoute,
        ]
    );
    assert_eq!(
        pack.section(SectionKind::GraphNextStop).unwrap().body,
        "After Coffee, locals head to Fitness or Retail"
    );
    assert_eq!(
        pack.section(SectionKind::MicroRoute).unwrap().body,
        "Coffee → Fitness → Retail"
    );
    assert!(pack.skipped.is_empty());
}

#[tokio::test]
async fn supplied_route_copy_wins_and_locked_routes_stay_hidden() {
    let loader = TownContextLoader::new(seeded_graph().await, members(10), overrides(), resolver());
    let context = loader.load(&maple(), now(), None).await;
    let boosts = BoostPayloads {
        micro_route: Some("Latte, then the loop trail".to_string()),
        ..BoostPayloads::default()
    };
    let pack = compose(&context.compose_context(BaseContent::default(), boosts));
    assert_eq!(
        pack.section(SectionKind::MicroRoute).unwrap().body,
        "Latte, then the loop trail"
    );

    let loader = TownContextLoader::new(seeded_graph().await, members(9), overrides(), resolver());
    let context = loader.load(&maple(), now(), None).await;
    let pack = compose(&context.compose_context(BaseContent::default(), BoostPayloads::default()));
    assert!(pack.sections.is_empty());
    assert_eq!(pack.skipped.len(), 2);
    assert!(pack.skipped.iter().all(|s| s.reason == SkipReason::Locked));
}
