use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Game object identifier. Zero means "none" and never takes part in an aggregation.
pub type EntityId = i32;

pub type NameMap = HashMap<EntityId, String>;

pub const UNKNOWN_NAME: &str = "~Unknown~";

// --- Helper: Human Readable Amounts ---
pub fn format_amount(amount: f64) -> String {
    let abs_amount = amount.abs();
    if abs_amount >= 1_000_000_000_000.0 {
        format!("{:.2}t", amount / 1_000_000_000_000.0)
    } else if abs_amount >= 1_000_000_000.0 {
        format!("{:.2}b", amount / 1_000_000_000.0)
    } else if abs_amount >= 1_000_000.0 {
        format!("{:.2}m", amount / 1_000_000.0)
    } else if abs_amount >= 1_000.0 {
        format!("{:.2}k", amount / 1_000.0)
    } else {
        format!("{:.0}", amount)
    }
}

/// Renders a killmail timestamp as `YYYY-MM-DD HH:MM` in UTC. Unparsable input is returned
/// untouched.
pub fn format_killmail_time(raw: &str) -> String {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return t.with_timezone(&Utc).format("%Y-%m-%d %H:%M").to_string();
    }
    // The statistics server stores naive timestamps, which are UTC.
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, pattern) {
            return t.and_utc().format("%Y-%m-%d %H:%M").to_string();
        }
    }
    raw.to_string()
}

static ZKILL_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"zkillboard\.com/(?P<type>\w+)/(?P<id>\d+)").expect("static regex is valid")
});

/// Extracts the area and subject from a zkillboard link such as
/// `https://zkillboard.com/corporation/98000001/`.
pub fn parse_zkill_link(link: &str) -> Option<(Area, EntityId)> {
    let caps = ZKILL_URL_REGEX.captures(link)?;
    let area = caps.name("type")?.as_str().parse::<Area>().ok()?;
    let id = caps.name("id")?.as_str().parse::<EntityId>().ok()?;
    (id != 0).then_some((area, id))
}

// --- Request Selectors ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Area {
    Character,
    Corporation,
    Alliance,
    Faction,
}

impl Area {
    pub const ALL: [Area; 4] = [
        Area::Character,
        Area::Corporation,
        Area::Alliance,
        Area::Faction,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Area::Character => "character",
            Area::Corporation => "corporation",
            Area::Alliance => "alliance",
            Area::Faction => "faction",
        }
    }

    /// Plural form used by the game-data API paths (`/characters/{id}/`).
    pub fn game_data_subject(self) -> &'static str {
        match self {
            Area::Character => "characters",
            Area::Corporation => "corporations",
            Area::Alliance => "alliances",
            Area::Faction => "factions",
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Area {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Area::ALL
            .into_iter()
            .find(|area| area.as_str() == s)
            .ok_or_else(|| format!("Unsupported area: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Wins,
    Losses,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Wins => "wins",
            Side::Losses => "losses",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakdownKind {
    Ships,
    Systems,
}

impl BreakdownKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BreakdownKind::Ships => "ships",
            BreakdownKind::Systems => "systems",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Friendly,
    Enemy,
}

impl Relation {
    pub fn as_str(self) -> &'static str {
        match self {
            Relation::Friendly => "friendly",
            Relation::Enemy => "enemy",
        }
    }
}

/// What the lost-killmail listing is narrowed by (`/lost/{scope}/{id}/...`). The statistics
/// server only lists losses per ship type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LostScope {
    Ship,
}

impl LostScope {
    pub fn as_str(self) -> &'static str {
        match self {
            LostScope::Ship => "ship",
        }
    }
}

impl FromStr for LostScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ship" => Ok(LostScope::Ship),
            _ => Err(format!("Unsupported lost scope: {}", s)),
        }
    }
}

// --- Main Domain Objects ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRecord {
    pub id: EntityId,
    pub count: i64,
}

impl From<(EntityId, i64)> for CountRecord {
    fn from((id, count): (EntityId, i64)) -> Self {
        Self { id, count }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRecord {
    pub id: EntityId,
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub count: i64,
    pub damage: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_percent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage_percent: Option<String>,
}

impl Totals {
    pub fn new(count: i64, damage: i64) -> Self {
        Self {
            count,
            damage,
            ..Default::default()
        }
    }
}

/// The statistics API answers totals with a positional `[count, damage]` pair; damage is
/// `null` when the subject has no recorded damage and counts as zero.
impl From<(i64, Option<i64>)> for Totals {
    fn from((count, damage): (i64, Option<i64>)) -> Self {
        Self::new(count, damage.unwrap_or(0))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    pub wins: Vec<NamedRecord>,
    pub losses: Vec<NamedRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortReport {
    pub area: Area,
    pub id: EntityId,
    pub wins: Totals,
    pub losses: Totals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullReport {
    pub area: Area,
    pub id: EntityId,
    pub wins: Totals,
    pub losses: Totals,
    pub ships: Breakdown,
    pub systems: Breakdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociatesReport {
    pub object: Area,
    pub subject: Area,
    pub id: EntityId,
    pub friendly: Vec<NamedRecord>,
    pub enemy: Vec<NamedRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: EntityId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LostEntry {
    pub killmail_id: EntityId,
    pub character: NamedRef,
    pub corporation: NamedRef,
    pub alliance: NamedRef,
    pub ship: NamedRef,
    pub damage: i64,
    pub system: NamedRef,
    /// `YYYY-MM-DD HH:MM`, UTC.
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LostReport {
    pub scope: LostScope,
    pub scope_id: EntityId,
    pub subject: Area,
    pub id: EntityId,
    pub entries: Vec<LostEntry>,
}

// --- Fetching / Upstream Intermediate Structs ---

/// One killmail row of the lost listing: `[id, char, corp, alli, ship, dmg, system, time]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawLostRow")]
pub struct LostRow {
    pub killmail_id: EntityId,
    pub character_id: EntityId,
    pub corporation_id: EntityId,
    pub alliance_id: EntityId,
    pub ship_id: EntityId,
    pub damage: i64,
    pub system_id: EntityId,
    pub time: String,
}

type RawLostRow = (
    EntityId,
    EntityId,
    EntityId,
    EntityId,
    EntityId,
    i64,
    EntityId,
    String,
);

impl From<RawLostRow> for LostRow {
    fn from(raw: RawLostRow) -> Self {
        let (killmail_id, character_id, corporation_id, alliance_id, ship_id, damage, system_id, time) =
            raw;
        Self {
            killmail_id,
            character_id,
            corporation_id,
            alliance_id,
            ship_id,
            damage,
            system_id,
            time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameEntry {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdEntry {
    pub id: EntityId,
    pub name: String,
}

/// Answer of `/universe/ids/`; categories without a match are absent upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdsResult {
    #[serde(default)]
    pub characters: Vec<IdEntry>,
    #[serde(default)]
    pub corporations: Vec<IdEntry>,
    #[serde(default)]
    pub alliances: Vec<IdEntry>,
    #[serde(default)]
    pub factions: Vec<IdEntry>,
    #[serde(default)]
    pub systems: Vec<IdEntry>,
    #[serde(default)]
    pub inventory_types: Vec<IdEntry>,
}

impl IdsResult {
    /// First hit among the report areas, characters first.
    pub fn first_subject(&self) -> Option<(Area, EntityId)> {
        [
            (Area::Character, &self.characters),
            (Area::Corporation, &self.corporations),
            (Area::Alliance, &self.alliances),
            (Area::Faction, &self.factions),
        ]
        .into_iter()
        .find_map(|(area, entries)| entries.first().map(|e| (area, e.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_are_abbreviated() {
        assert_eq!(format_amount(950.0), "950");
        assert_eq!(format_amount(12_500.0), "12.50k");
        assert_eq!(format_amount(3_000_000.0), "3.00m");
        assert_eq!(format_amount(1_250_000_000.0), "1.25b");
    }

    #[test]
    fn killmail_time_is_rendered_in_utc() {
        assert_eq!(format_killmail_time("2024-03-01T18:45:12Z"), "2024-03-01 18:45");
        assert_eq!(format_killmail_time("2024-03-01T20:45:12+02:00"), "2024-03-01 18:45");
        assert_eq!(format_killmail_time("2024-03-01T18:45:12"), "2024-03-01 18:45");
        assert_eq!(format_killmail_time("yesterday"), "yesterday");
    }

    #[test]
    fn zkill_links() {
        assert_eq!(
            parse_zkill_link("https://zkillboard.com/corporation/98000001/"),
            Some((Area::Corporation, 98000001))
        );
        assert_eq!(parse_zkill_link("https://zkillboard.com/system/30000142/"), None);
        assert_eq!(parse_zkill_link("https://zkillboard.com/character/0/"), None);
        assert_eq!(parse_zkill_link("Some Pilot"), None);
    }

    #[test]
    fn totals_pair_decodes_positionally() {
        let totals: Totals = serde_json::from_str::<(i64, Option<i64>)>("[7, 1200]")
            .unwrap()
            .into();
        assert_eq!(totals, Totals::new(7, 1200));

        let totals: Totals = serde_json::from_str::<(i64, Option<i64>)>("[0, null]")
            .unwrap()
            .into();
        assert_eq!(totals, Totals::new(0, 0));
    }

    #[test]
    fn lost_row_decodes_from_tuple() {
        let row: LostRow = serde_json::from_str(
            r#"[101, 1, 2, 3, 587, 4500, 30000142, "2024-03-01T18:45:12Z"]"#,
        )
        .unwrap();
        assert_eq!(row.killmail_id, 101);
        assert_eq!(row.ship_id, 587);
        assert_eq!(row.damage, 4500);
        assert_eq!(row.system_id, 30000142);
    }

    #[test]
    fn percent_fields_are_omitted_when_absent() {
        let json = serde_json::to_value(Totals::new(1, 2)).unwrap();
        assert_eq!(json, serde_json::json!({"count": 1, "damage": 2}));
    }

    #[test]
    fn only_ship_losses_are_listed() {
        assert_eq!("ship".parse::<LostScope>(), Ok(LostScope::Ship));
        assert!("system".parse::<LostScope>().is_err());
        assert!(serde_json::from_str::<LostScope>(r#""system""#).is_err());
    }

    #[test]
    fn ids_result_prefers_characters() {
        let ids: IdsResult = serde_json::from_str(
            r#"{"corporations":[{"id":5,"name":"Corp"}],"characters":[{"id":9,"name":"Pilot"}]}"#,
        )
        .unwrap();
        assert_eq!(ids.first_subject(), Some((Area::Character, 9)));
        assert_eq!(IdsResult::default().first_subject(), None);
    }
}
