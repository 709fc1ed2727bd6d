use crate::types::{
    BoostGate, BoostKind, ComposeContext, DailyRecommendationPack, Section, SectionKind,
    SkipReason, SkippedBoost,
};

fn section(kind: SectionKind, body: &str) -> Section {
    Section {
        kind,
        title: kind.title().to_string(),
        body: body.trim().to_string(),
    }
}

/// Assemble the daily pack.
///
/// Pure: no I/O, no clock, same input gives the same pack. Base sections
/// come first (special, post, sign) whenever supplied. Each boost follows
/// in [`BoostKind::ORDER`] iff its gate passes and its payload is
/// non-empty. Missing milestone or season input drops every boost.
pub fn compose(context: &ComposeContext) -> DailyRecommendationPack {
    let base = &context.base;
    let mut sections: Vec<Section> = [
        (SectionKind::Special, base.special.as_deref()),
        (SectionKind::Post, base.post.as_deref()),
        (SectionKind::Sign, base.sign.as_deref()),
    ]
    .into_iter()
    .filter_map(|(kind, body)| body.map(|body| section(kind, body)))
    .collect();

    let mut skipped = Vec::new();
    let town_context = context.milestones.as_ref().zip(context.season.as_ref());

    for kind in BoostKind::ORDER {
        let verdict = match town_context {
            None => Err(SkipReason::NoTownContext),
            Some((milestones, season)) => match kind.gate() {
                BoostGate::TownContext => Ok(()),
                BoostGate::Feature(feature) if milestones.is_unlocked(feature) => Ok(()),
                BoostGate::Feature(_) => Err(SkipReason::Locked),
                BoostGate::ActiveSeason if !season.season_tags.is_empty() => Ok(()),
                BoostGate::ActiveSeason => Err(SkipReason::NoActiveSeason),
            },
        };

        match verdict {
            Ok(()) => {
                if let Some(body) = context.boosts.get(kind) {
                    sections.push(section(kind.section(), body));
                }
            }
            Err(reason) => skipped.push(SkippedBoost { kind, reason }),
        }
    }

    DailyRecommendationPack {
        sections,
        route_window: context.window.map(|w| w.window),
        season_tags: context
            .season
            .as_ref()
            .map(|s| s.season_tags.iter().cloned().collect())
            .unwrap_or_default(),
        skipped,
    }
}
