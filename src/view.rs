//! HTML pages for the report front end.
//!
//! The report types stay free of presentation concerns; everything a template needs is
//! flattened into the view models below first.

use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::error::FetchError;
use crate::models::*;

const IMAGE_SERVER: &str = "https://images.evetech.net";

pub fn report_path(area: Area, id: EntityId) -> String {
    format!("/report/{}/{}", area, id)
}

pub fn associates_path(object: Area, subject: Area, id: EntityId) -> String {
    format!("/associates/{}/for/{}/{}", object, subject, id)
}

pub fn lost_path(scope: LostScope, scope_id: EntityId, subject: Area, id: EntityId) -> String {
    format!("/lost/{}/{}/{}/{}", scope.as_str(), scope_id, subject, id)
}

pub fn image_url(area: Area, id: EntityId) -> String {
    match area {
        Area::Character => format!("{}/characters/{}/portrait?size=128", IMAGE_SERVER, id),
        Area::Corporation | Area::Faction => {
            format!("{}/corporations/{}/logo?size=128", IMAGE_SERVER, id)
        }
        Area::Alliance => format!("{}/alliances/{}/logo?size=128", IMAGE_SERVER, id),
    }
}

fn ship_icon(id: EntityId) -> String {
    format!("{}/types/{}/icon?size=32", IMAGE_SERVER, id)
}

// --- View Models ---

pub struct TableRow {
    pub href: String,
    pub name: String,
    pub count: i64,
    pub icon: Option<String>,
}

/// Two-column `Name | Count` table.
pub struct TableView {
    pub caption: String,
    pub rows: Vec<TableRow>,
}

impl TableView {
    fn new<F>(caption: &str, records: &[NamedRecord], row: F) -> Self
    where
        F: Fn(&NamedRecord) -> TableRow,
    {
        Self {
            caption: caption.to_string(),
            rows: records.iter().map(row).collect(),
        }
    }
}

pub struct TotalsView {
    pub label: &'static str,
    pub count: i64,
    pub count_percent: String,
    pub damage: String,
    pub damage_percent: String,
}

impl TotalsView {
    fn new(label: &'static str, totals: &Totals) -> Self {
        Self {
            label,
            count: totals.count,
            count_percent: totals.count_percent.clone().unwrap_or_else(|| "-".to_string()),
            damage: format_amount(totals.damage as f64),
            damage_percent: totals
                .damage_percent
                .clone()
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

pub struct LostRowView {
    pub killmail_href: String,
    pub time: String,
    pub character: String,
    pub character_href: String,
    pub corporation: String,
    pub corporation_href: String,
    pub alliance: String,
    pub ship: String,
    pub system: String,
    pub damage: String,
}

// --- Templates ---

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub query: String,
}

#[derive(Template)]
#[template(path = "report.html")]
pub struct ReportTemplate {
    pub title: String,
    pub image: Option<String>,
    pub totals: Vec<TotalsView>,
    pub tables: Vec<TableView>,
    pub associates: Vec<(String, String)>,
}

impl ReportTemplate {
    pub fn from_report(report: &FullReport) -> Self {
        let (area, id) = (report.area, report.id);
        let zkill = |kind: &'static str| {
            move |r: &NamedRecord| TableRow {
                href: format!("https://zkillboard.com/{}/{}/", kind, r.id),
                name: r.name.clone(),
                count: r.count,
                icon: (kind == "ship").then(|| ship_icon(r.id)),
            }
        };
        let lost_ship = |r: &NamedRecord| TableRow {
            href: lost_path(LostScope::Ship, r.id, area, id),
            name: r.name.clone(),
            count: r.count,
            icon: Some(ship_icon(r.id)),
        };

        let tables = vec![
            TableView::new("Ships killed", &report.ships.wins, zkill("ship")),
            TableView::new("Ships lost", &report.ships.losses, lost_ship),
            TableView::new("Systems (wins)", &report.systems.wins, zkill("system")),
            TableView::new("Systems (losses)", &report.systems.losses, zkill("system")),
        ];

        let associates = [Area::Character, Area::Corporation, Area::Alliance]
            .into_iter()
            .map(|object| {
                (
                    associates_path(object, area, id),
                    format!("{} associates", object),
                )
            })
            .collect();

        Self {
            title: format!("{} {}", area, id),
            image: Some(image_url(area, id)),
            totals: vec![
                TotalsView::new("Wins", &report.wins),
                TotalsView::new("Losses", &report.losses),
            ],
            tables,
            associates,
        }
    }
}

#[derive(Template)]
#[template(path = "associates.html")]
pub struct AssociatesTemplate {
    pub title: String,
    pub back: String,
    pub tables: Vec<TableView>,
}

impl AssociatesTemplate {
    pub fn from_report(report: &AssociatesReport) -> Self {
        let object = report.object;
        let row = |r: &NamedRecord| TableRow {
            href: report_path(object, r.id),
            name: r.name.clone(),
            count: r.count,
            icon: None,
        };
        Self {
            title: format!("{} associates of {} {}", object, report.subject, report.id),
            back: report_path(report.subject, report.id),
            tables: vec![
                TableView::new("Friendly", &report.friendly, row),
                TableView::new("Enemy", &report.enemy, row),
            ],
        }
    }
}

#[derive(Template)]
#[template(path = "lost.html")]
pub struct LostTemplate {
    pub title: String,
    pub back: String,
    pub rows: Vec<LostRowView>,
}

impl LostTemplate {
    pub fn from_report(report: &LostReport) -> Self {
        let rows = report
            .entries
            .iter()
            .map(|e| LostRowView {
                killmail_href: format!("https://zkillboard.com/kill/{}/", e.killmail_id),
                time: e.time.clone(),
                character: e.character.name.clone(),
                character_href: report_path(Area::Character, e.character.id),
                corporation: e.corporation.name.clone(),
                corporation_href: report_path(Area::Corporation, e.corporation.id),
                alliance: e.alliance.name.clone(),
                ship: e.ship.name.clone(),
                system: e.system.name.clone(),
                damage: format_amount(e.damage as f64),
            })
            .collect();

        Self {
            title: format!(
                "Losses of {} {} by {} {}",
                report.subject,
                report.id,
                report.scope.as_str(),
                report.scope_id
            ),
            back: report_path(report.subject, report.id),
            rows,
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub message: String,
}

// --- Responses ---

pub fn render<T: Template>(template: &T) -> Response {
    render_with(StatusCode::OK, template)
}

pub fn render_with<T: Template>(status: StatusCode, template: &T) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("Failed to render template: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

/// Upstream failure shown as an HTML page.
pub struct PageError(pub FetchError);

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        error!("Report failed: {}", self.0);
        render_with(
            StatusCode::BAD_GATEWAY,
            &ErrorTemplate {
                message: self.0.to_string(),
            },
        )
    }
}

impl From<FetchError> for PageError {
    fn from(err: FetchError) -> Self {
        Self(err)
    }
}

/// Upstream failure as a `{"error": ...}` body.
pub struct ApiError(pub FetchError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("API request failed: {}", self.0);
        (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        Self(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: EntityId, name: &str, count: i64) -> NamedRecord {
        NamedRecord {
            id,
            name: name.to_string(),
            count,
        }
    }

    #[test]
    fn report_page_lists_tables() {
        let report = FullReport {
            area: Area::Corporation,
            id: 98000001,
            wins: Totals {
                count: 7,
                damage: 1500,
                count_percent: Some("70.00".to_string()),
                damage_percent: Some("75.00".to_string()),
            },
            losses: Totals {
                count: 3,
                damage: 500,
                count_percent: Some("30.00".to_string()),
                damage_percent: Some("25.00".to_string()),
            },
            ships: Breakdown {
                wins: vec![record(587, "Rifter", 4)],
                losses: vec![record(588, UNKNOWN_NAME, 1)],
            },
            systems: Breakdown::default(),
        };

        let html = ReportTemplate::from_report(&report).render().unwrap();
        assert!(html.contains("<th>Name</th>"));
        assert!(html.contains("Rifter"));
        assert!(html.contains("~Unknown~"));
        assert!(html.contains("70.00"));
        assert!(html.contains("/lost/ship/588/corporation/98000001"));
        assert!(html.contains("/associates/alliance/for/corporation/98000001"));
    }

    #[test]
    fn system_losses_link_to_zkillboard() {
        let report = FullReport {
            area: Area::Character,
            id: 9,
            wins: Totals::default(),
            losses: Totals::default(),
            ships: Breakdown::default(),
            systems: Breakdown {
                wins: vec![record(30000144, "Perimeter", 1)],
                losses: vec![record(30000142, "Jita", 2)],
            },
        };

        let html = ReportTemplate::from_report(&report).render().unwrap();
        assert!(html.contains("https://zkillboard.com/system/30000142/"));
        assert!(html.contains("https://zkillboard.com/system/30000144/"));
        assert!(!html.contains("/lost/system/"));
    }

    #[test]
    fn names_are_escaped() {
        let report = AssociatesReport {
            object: Area::Character,
            subject: Area::Alliance,
            id: 99000001,
            friendly: vec![record(1, "<b>Pilot</b>", 2)],
            enemy: vec![],
        };
        let html = AssociatesTemplate::from_report(&report).render().unwrap();
        assert!(html.contains("&lt;b&gt;Pilot"));
        assert!(!html.contains("<b>Pilot"));
        assert!(html.contains("/report/character/1"));
    }

    #[test]
    fn paths() {
        assert_eq!(report_path(Area::Alliance, 5), "/report/alliance/5");
        assert_eq!(
            lost_path(LostScope::Ship, 587, Area::Character, 9),
            "/lost/ship/587/character/9"
        );
        assert_eq!(
            image_url(Area::Character, 9),
            "https://images.evetech.net/characters/9/portrait?size=128"
        );
    }
}
