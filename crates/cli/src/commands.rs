use crate::config::TownConfig;
use crate::{
    ChainArgs, JoinArgs, LeaveArgs, OutputArgs, OverrideAction, PlanArgs, RecordArgs, SeasonArgs,
    WindowArgs,
};
use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;
use town_composer::{compose, BaseContent, BoostPayloads, DailyRecommendationPack, TownContextLoader};
use town_graph::{format_chain, record_observed, Contribution, FlowGraph, FlowGraphStore};
use town_milestones::{summarize, MembershipStore};
use town_protocol::{Category, ParticipationLevel, RouteWindow, SeasonKey, TownId, TownMembership};
use town_season::{
    resolve_window, Clock, OverrideStore, SeasonOverride, SeasonResolver, SystemClock,
};
use town_store::SnapshotStore;

const STILL_LEARNING: &str = "Still learning local flow";

pub fn print_schema() -> Result<()> {
    let schema = schemars::schema_for!(DailyRecommendationPack);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("Expected YYYY-MM-DD, got {raw:?}"))
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .with_context(|| format!("Expected YYYY-MM-DDTHH:MM, got {raw:?}"))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub struct App {
    config: TownConfig,
    store: SnapshotStore,
    town: TownId,
    clock: SystemClock,
}

impl App {
    /// `exclusive` locks the snapshot for the life of the app, so a
    /// mutating command reads, changes and saves without interleaving
    /// with another `town` process.
    pub async fn open(config: TownConfig, town: Option<String>, exclusive: bool) -> Result<Self> {
        let town = town
            .or_else(|| config.default_town.clone())
            .map(TownId::new)
            .filter(|t| !t.as_str().is_empty())
            .ok_or_else(|| anyhow!("No town selected; pass --town or set default_town"))?;
        let store = if exclusive {
            SnapshotStore::open_exclusive(&config.data_path).await
        } else {
            SnapshotStore::open(&config.data_path).await
        }
        .with_context(|| format!("Failed to open {}", config.data_path.display()))?;
        Ok(Self {
            config,
            store,
            town,
            clock: SystemClock,
        })
    }

    fn resolver(&self) -> Result<SeasonResolver> {
        Ok(SeasonResolver::new(self.config.calendar()?))
    }

    pub async fn record(&self, args: RecordArgs) -> Result<()> {
        let from: Category = args.from.parse()?;
        let to: Category = args.to.parse()?;
        let graph = self.store.graph();

        let observer = match &args.business {
            Some(business_id) => {
                let memberships = self.store.memberships().list_memberships(&self.town).await?;
                let membership = memberships
                    .into_iter()
                    .find(|m| &m.business_id == business_id)
                    .ok_or_else(|| anyhow!("{business_id} is not a member of {}", self.town))?;
                Some(membership)
            }
            None => None,
        };

        let mut weight = 0;
        for _ in 0..args.times {
            match &observer {
                Some(membership) => {
                    match record_observed(graph.as_ref(), membership, from, to).await? {
                        Contribution::Recorded { weight: w } => weight = w,
                        Contribution::Skipped => {
                            println!("Skipped: {} does not contribute to the town graph", membership.business_id);
                            return Ok(());
                        }
                    }
                }
                None => weight = graph.record_transition(&self.town, from, to).await?,
            }
        }
        self.store.save().await?;
        println!("{} → {}: {weight}", from.label(), to.label());
        Ok(())
    }

    pub async fn edges(&self, args: OutputArgs) -> Result<()> {
        let edges = self.store.graph().list_edges(&self.town).await?;
        let ranked = FlowGraph::from_edges(&edges).ranked_edges();
        if args.json {
            return print_json(&ranked);
        }
        if ranked.is_empty() {
            println!("{STILL_LEARNING}");
        }
        for edge in ranked {
            println!("{:<9} -> {:<9} {}", edge.from, edge.to, edge.weight);
        }
        Ok(())
    }

    pub async fn chain(&self, args: ChainArgs) -> Result<()> {
        let max_length = args.max_length.unwrap_or(self.config.chain_max_length);
        let edges = self.store.graph().list_edges(&self.town).await?;
        let chain = FlowGraph::from_edges(&edges).derive_chain(max_length);
        if args.output.json {
            return print_json(&json!({
                "town": self.town,
                "chain": chain,
                "text": format_chain(&chain),
            }));
        }
        println!(
            "{}",
            format_chain(&chain).unwrap_or_else(|| STILL_LEARNING.to_string())
        );
        Ok(())
    }

    pub async fn milestones(&self, args: OutputArgs) -> Result<()> {
        let summary = summarize(self.store.memberships().as_ref(), &self.town).await?;
        let next = summary.next_milestone();
        if args.json {
            return print_json(&json!({
                "town": self.town,
                "summary": summary,
                "next": next,
            }));
        }
        println!("Active businesses: {}", summary.active_count);
        if summary.features_unlocked.is_empty() {
            println!("Unlocked: none");
        } else {
            let unlocked: Vec<&str> = summary.features_unlocked.iter().map(|f| f.as_str()).collect();
            println!("Unlocked: {}", unlocked.join(", "));
        }
        match next {
            Some(next) => println!(
                "Next: {} at {} ({} more)",
                next.feature, next.threshold, next.remaining
            ),
            None => println!("Next: all features unlocked"),
        }
        Ok(())
    }

    pub async fn join(&self, args: JoinArgs) -> Result<()> {
        let level: ParticipationLevel = args.level.parse()?;
        self.store.add_town(&self.town)?;
        self.store.memberships().upsert(
            TownMembership::new(args.business_id.clone(), self.town.clone()).with_level(level),
        )?;
        self.store.save().await?;
        println!("{} joined {} as {}", args.business_id, self.town, level.as_str());
        Ok(())
    }

    pub async fn leave(&self, args: LeaveArgs) -> Result<()> {
        if !self
            .store
            .memberships()
            .set_active(&self.town, &args.business_id, false)?
        {
            anyhow::bail!("{} is not a member of {}", args.business_id, self.town);
        }
        self.store.save().await?;
        println!("{} is now inactive in {}", args.business_id, self.town);
        Ok(())
    }

    pub async fn season(&self, args: SeasonArgs) -> Result<()> {
        let as_of = match args.date.as_deref() {
            Some(raw) => parse_date(raw)?,
            None => self.clock.today(),
        };
        let resolved = self
            .resolver()?
            .resolve(self.store.overrides().as_ref(), &self.town, as_of)
            .await?;
        if args.output.json {
            return print_json(&resolved);
        }
        println!("Season context for {} on {as_of}", self.town);
        for (key, decision) in &resolved.decisions {
            let mark = if decision.included { "on " } else { "off" };
            println!("  {mark} {key:<16} ({:?})", decision.source);
        }
        Ok(())
    }

    pub async fn override_season(&self, action: OverrideAction) -> Result<()> {
        let overrides = self.store.overrides();
        match action {
            OverrideAction::Set {
                season,
                start,
                end,
                notes,
            } => {
                let key = SeasonKey::new(&season)?;
                let start = start.as_deref().map(parse_date).transpose()?;
                let end = end.as_deref().map(parse_date).transpose()?;
                if start.is_none() && end.is_none() {
                    anyhow::bail!("override set needs --start and/or --end; use `clear` to return to auto");
                }
                overrides.upsert(SeasonOverride {
                    town_id: self.town.clone(),
                    season_key: key,
                    start_date: start,
                    end_date: end,
                    notes,
                })?;
            }
            OverrideAction::Off { season, notes } => {
                let mut row = SeasonOverride::forced_off(self.town.clone(), SeasonKey::new(&season)?);
                row.notes = notes;
                overrides.upsert(row)?;
            }
            OverrideAction::Clear { season } => {
                let key = SeasonKey::new(&season)?;
                if overrides.clear(&self.town, &key)?.is_none() {
                    println!("No override for {key} in {}", self.town);
                    return Ok(());
                }
            }
            OverrideAction::List => {
                let rows = overrides.list_overrides(&self.town).await?;
                if rows.is_empty() {
                    println!("No overrides for {}", self.town);
                }
                for row in rows {
                    println!("{:<16} {:?}", row.season_key, row.state());
                }
                return Ok(());
            }
        }
        self.store.save().await?;
        println!("Overrides for {} updated", self.town);
        Ok(())
    }

    pub fn window(&self, args: WindowArgs) -> Result<()> {
        let now = match args.at.as_deref() {
            Some(raw) => parse_timestamp(raw)?,
            None => self.clock.now(),
        };
        let window_override = args
            .window_override
            .as_deref()
            .map(RouteWindow::parse_override)
            .transpose()?
            .flatten();
        let resolved = resolve_window(window_override, now);
        println!("{} ({:?})", resolved.window, resolved.source);
        Ok(())
    }

    pub async fn plan(&self, args: PlanArgs) -> Result<()> {
        let now = match args.at.as_deref() {
            Some(raw) => parse_timestamp(raw)?,
            None => self.clock.now(),
        };
        let window_override = args
            .window_override
            .as_deref()
            .map(RouteWindow::parse_override)
            .transpose()?
            .flatten();

        let loader = TownContextLoader::new(
            self.store.graph(),
            self.store.memberships(),
            self.store.overrides(),
            self.resolver()?,
        )
        .with_chain_max_length(self.config.chain_max_length);
        let context = loader.load(&self.town, now, window_override).await;

        let base = BaseContent {
            special: args.special,
            post: args.post,
            sign: args.sign,
        };
        let boosts = BoostPayloads {
            local: args.local_boost,
            town: args.town_boost,
            story: args.story,
            graph: args.graph_boost,
            micro_route: args.micro_route,
            seasonal: args.seasonal_boost,
        };
        let pack = compose(&context.compose_context(base, boosts));

        if args.output.json {
            println!("{}", pack.to_json()?);
        } else {
            print!("{}", pack.render_text());
        }
        Ok(())
    }
}
