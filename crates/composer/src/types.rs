use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use town_milestones::MilestoneSummary;
use town_protocol::{FeatureKey, RouteWindow, SeasonKey};
use town_season::{ResolvedSeason, ResolvedWindow};

/// Base plan text produced upstream. Always rendered when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseContent {
    pub special: Option<String>,
    pub post: Option<String>,
    pub sign: Option<String>,
}

/// Optional boost text produced upstream, one slot per boost kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoostPayloads {
    pub local: Option<String>,
    pub town: Option<String>,
    pub story: Option<String>,
    pub graph: Option<String>,
    pub micro_route: Option<String>,
    pub seasonal: Option<String>,
}

impl BoostPayloads {
    pub fn get(&self, kind: BoostKind) -> Option<&str> {
        let slot = match kind {
            BoostKind::Local => &self.local,
            BoostKind::Town => &self.town,
            BoostKind::Story => &self.story,
            BoostKind::Graph => &self.graph,
            BoostKind::MicroRoute => &self.micro_route,
            BoostKind::Seasonal => &self.seasonal,
        };
        slot.as_deref().map(str::trim).filter(|text| !text.is_empty())
    }
}

/// Boost sections in their fixed, user-facing order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum BoostKind {
    Local,
    Town,
    Story,
    Graph,
    MicroRoute,
    Seasonal,
}

/// What a boost needs before it may be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoostGate {
    /// Town context resolved; no milestone required.
    TownContext,
    Feature(FeatureKey),
    /// At least one season tag in effect.
    ActiveSeason,
}

impl BoostKind {
    pub const ORDER: [BoostKind; 6] = [
        BoostKind::Local,
        BoostKind::Town,
        BoostKind::Story,
        BoostKind::Graph,
        BoostKind::MicroRoute,
        BoostKind::Seasonal,
    ];

    #[must_use]
    pub const fn gate(self) -> BoostGate {
        match self {
            BoostKind::Local => BoostGate::TownContext,
            BoostKind::Town => BoostGate::Feature(FeatureKey::TownPulseLearning),
            BoostKind::Story => BoostGate::Feature(FeatureKey::TownStories),
            BoostKind::Graph | BoostKind::MicroRoute => {
                BoostGate::Feature(FeatureKey::TownGraphRoutes)
            }
            BoostKind::Seasonal => BoostGate::ActiveSeason,
        }
    }

    #[must_use]
    pub const fn section(self) -> SectionKind {
        match self {
            BoostKind::Local => SectionKind::LocalBoost,
            BoostKind::Town => SectionKind::TownBoost,
            BoostKind::Story => SectionKind::TownStory,
            BoostKind::Graph => SectionKind::GraphNextStop,
            BoostKind::MicroRoute => SectionKind::MicroRoute,
            BoostKind::Seasonal => SectionKind::SeasonalBoost,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Special,
    Post,
    Sign,
    LocalBoost,
    TownBoost,
    TownStory,
    GraphNextStop,
    MicroRoute,
    SeasonalBoost,
}

impl SectionKind {
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            SectionKind::Special => "Today's Special",
            SectionKind::Post => "Ready-to-Post",
            SectionKind::Sign => "Sign Text",
            SectionKind::LocalBoost => "Local Boost",
            SectionKind::TownBoost => "Town Boost",
            SectionKind::TownStory => "Town Story",
            SectionKind::GraphNextStop => "Next Stop",
            SectionKind::MicroRoute => "Micro-Route",
            SectionKind::SeasonalBoost => "Seasonal Boost",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Section {
    pub kind: SectionKind,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Milestone/season inputs were unavailable.
    NoTownContext,
    Locked,
    NoActiveSeason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SkippedBoost {
    pub kind: BoostKind,
    pub reason: SkipReason,
}

/// Everything `compose` needs, already fetched.
///
/// `milestones` or `season` being `None` means the town lookup failed;
/// the pack then carries base content only.
#[derive(Debug, Clone, Default)]
pub struct ComposeContext {
    pub base: BaseContent,
    pub boosts: BoostPayloads,
    pub milestones: Option<MilestoneSummary>,
    pub season: Option<ResolvedSeason>,
    pub window: Option<ResolvedWindow>,
}

/// Assembled daily output. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DailyRecommendationPack {
    pub sections: Vec<Section>,
    pub route_window: Option<RouteWindow>,
    pub season_tags: Vec<SeasonKey>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedBoost>,
}

impl DailyRecommendationPack {
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    pub fn section_kinds(&self) -> Vec<SectionKind> {
        self.sections.iter().map(|s| s.kind).collect()
    }

    /// Plain copy-paste text, sections in pack order.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("== ");
            out.push_str(&section.title);
            out.push_str(" ==\n");
            out.push_str(&section.body);
            out.push('\n');
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
