use futures::try_join;
use serde_json::Value;
use std::collections::HashSet;
use tracing::info;

use crate::client::KillboardClient;
use crate::error::FetchError;
use crate::models::*;
use crate::names::{name_of, resolve_names};

// --- Pure composition ---

fn percent(part: i64, whole: i64) -> String {
    format!("{:.2}", 100.0 * part as f64 / whole as f64)
}

/// Win and loss totals of one subject, with each side's share filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalsPair {
    pub wins: Totals,
    pub losses: Totals,
}

impl TotalsPair {
    /// Percentages are only set when the combined figure is positive.
    pub fn compose(mut wins: Totals, mut losses: Totals) -> Self {
        let total_count = wins.count.saturating_add(losses.count);
        if total_count > 0 {
            wins.count_percent = Some(percent(wins.count, total_count));
            losses.count_percent = Some(percent(losses.count, total_count));
        }

        let total_damage = wins.damage.saturating_add(losses.damage);
        if total_damage > 0 {
            wins.damage_percent = Some(percent(wins.damage, total_damage));
            losses.damage_percent = Some(percent(losses.damage, total_damage));
        }

        Self { wins, losses }
    }
}

/// Every non-zero ID across both sides, once, wins first.
pub fn breakdown_ids(wins: &[CountRecord], losses: &[CountRecord]) -> Vec<EntityId> {
    let mut seen = HashSet::new();
    wins.iter()
        .chain(losses)
        .map(|r| r.id)
        .filter(|&id| id != 0 && seen.insert(id))
        .collect()
}

/// Highest count first; equal counts keep their input order.
pub fn name_records(records: Vec<CountRecord>, names: &NameMap) -> Vec<NamedRecord> {
    let mut records: Vec<CountRecord> = records.into_iter().filter(|r| r.id != 0).collect();
    records.sort_by(|a, b| b.count.cmp(&a.count));
    records
        .into_iter()
        .map(|r| NamedRecord {
            id: r.id,
            name: name_of(names, r.id),
            count: r.count,
        })
        .collect()
}

pub fn compose_breakdown(
    wins: Vec<CountRecord>,
    losses: Vec<CountRecord>,
    names: &NameMap,
) -> Breakdown {
    Breakdown {
        wins: name_records(wins, names),
        losses: name_records(losses, names),
    }
}

fn named(names: &NameMap, id: EntityId) -> NamedRef {
    NamedRef {
        id,
        name: name_of(names, id),
    }
}

pub fn lost_ids(rows: &[LostRow]) -> Vec<EntityId> {
    rows.iter()
        .flat_map(|r| {
            [
                r.character_id,
                r.corporation_id,
                r.alliance_id,
                r.ship_id,
                r.system_id,
            ]
        })
        .collect()
}

pub fn compose_lost(rows: Vec<LostRow>, names: &NameMap) -> Vec<LostEntry> {
    rows.into_iter()
        .map(|r| LostEntry {
            killmail_id: r.killmail_id,
            character: named(names, r.character_id),
            corporation: named(names, r.corporation_id),
            alliance: named(names, r.alliance_id),
            ship: named(names, r.ship_id),
            damage: r.damage,
            system: named(names, r.system_id),
            time: format_killmail_time(&r.time),
        })
        .collect()
}

// --- Fetch → transform → return ---

/// Builds reports from the statistics API, naming entities through the game-data API.
#[derive(Clone)]
pub struct Reporter {
    client: KillboardClient,
}

impl Reporter {
    pub fn new(client: KillboardClient) -> Self {
        Self { client }
    }

    async fn totals(&self, area: Area, id: EntityId) -> Result<TotalsPair, FetchError> {
        let (wins, losses) = try_join!(
            self.client.totals(Side::Wins, area, id),
            self.client.totals(Side::Losses, area, id)
        )?;
        Ok(TotalsPair::compose(wins, losses))
    }

    async fn breakdown(
        &self,
        area: Area,
        id: EntityId,
        kind: BreakdownKind,
    ) -> Result<Breakdown, FetchError> {
        let (wins, losses) = try_join!(
            self.client.breakdown(Side::Wins, area, id, kind),
            self.client.breakdown(Side::Losses, area, id, kind)
        )?;
        let names = resolve_names(&self.client, breakdown_ids(&wins, &losses)).await;
        Ok(compose_breakdown(wins, losses, &names))
    }

    pub async fn short_report(&self, area: Area, id: EntityId) -> Result<ShortReport, FetchError> {
        let TotalsPair { wins, losses } = self.totals(area, id).await?;
        info!("Short report ready for {} {}", area, id);
        Ok(ShortReport {
            area,
            id,
            wins,
            losses,
        })
    }

    pub async fn full_report(&self, area: Area, id: EntityId) -> Result<FullReport, FetchError> {
        let (totals, ships, systems) = try_join!(
            self.totals(area, id),
            self.breakdown(area, id, BreakdownKind::Ships),
            self.breakdown(area, id, BreakdownKind::Systems)
        )?;
        info!(
            "Full report ready for {} {}: {} ship rows, {} system rows",
            area,
            id,
            ships.wins.len() + ships.losses.len(),
            systems.wins.len() + systems.losses.len()
        );
        Ok(FullReport {
            area,
            id,
            wins: totals.wins,
            losses: totals.losses,
            ships,
            systems,
        })
    }

    /// Who `subject`/`id` flies with and against, grouped by `object`.
    pub async fn associates_report(
        &self,
        object: Area,
        subject: Area,
        id: EntityId,
    ) -> Result<AssociatesReport, FetchError> {
        let (friendly, enemy) = try_join!(
            self.client.associates(Relation::Friendly, object, subject, id),
            self.client.associates(Relation::Enemy, object, subject, id)
        )?;
        let names = resolve_names(&self.client, breakdown_ids(&friendly, &enemy)).await;
        let Breakdown { wins, losses } = compose_breakdown(friendly, enemy, &names);
        info!("Associates report ready for {} {} by {}", subject, id, object);
        Ok(AssociatesReport {
            object,
            subject,
            id,
            friendly: wins,
            enemy: losses,
        })
    }

    pub async fn lost_report(
        &self,
        scope: LostScope,
        scope_id: EntityId,
        subject: Area,
        id: EntityId,
    ) -> Result<LostReport, FetchError> {
        let rows = self.client.lost(scope, scope_id, subject, id).await?;
        let names = resolve_names(&self.client, lost_ids(&rows)).await;
        let entries = compose_lost(rows, &names);
        info!(
            "Lost report ready for {} {} ({} {}): {} killmails",
            subject,
            id,
            scope.as_str(),
            scope_id,
            entries.len()
        );
        Ok(LostReport {
            scope,
            scope_id,
            subject,
            id,
            entries,
        })
    }

    pub async fn search(&self, names: &[String]) -> Result<IdsResult, FetchError> {
        self.client.ids(names).await
    }

    /// Cached game-data object, e.g. `("characters", id, None)`.
    pub async fn object(
        &self,
        subject: &str,
        id: EntityId,
        suffix: Option<&str>,
    ) -> Result<Value, FetchError> {
        self.client.object(subject, id, suffix).await
    }
}
