//! Wire format of the visits REST API
//!
//! The backend sends the raw user agent and a nested location. Both are
//! normalized into the flat [`Visit`] the charts work with.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use woothee::parser::Parser;

use crate::models::Visit;

const UNKNOWN: &str = "UNKNOWN";

#[derive(Deserialize)]
pub(crate) struct VisitsResponse {
    pub visits: VisitsPage,
}

#[derive(Deserialize)]
pub(crate) struct VisitsPage {
    pub data: Vec<ApiVisit>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Pagination {
    pub current_page: u32,
    pub pages_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiVisit {
    date: DateTime<FixedOffset>,
    #[serde(default)]
    referer: Option<String>,
    #[serde(default)]
    user_agent: Option<String>,
    #[serde(default)]
    visit_location: Option<ApiVisitLocation>,
    #[serde(default)]
    potential_bot: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiVisitLocation {
    #[serde(default)]
    country_name: Option<String>,
    #[serde(default)]
    city_name: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn known(value: &str) -> Option<String> {
    (!value.is_empty() && value != UNKNOWN).then(|| value.to_string())
}

impl ApiVisit {
    pub fn into_visit(self, parser: &Parser) -> Visit {
        let (browser, os) = non_empty(self.user_agent)
            .and_then(|ua| parser.parse(&ua).map(|r| (known(r.name), known(r.os))))
            .unwrap_or((None, None));
        let (country, city) = match self.visit_location {
            Some(location) => (
                non_empty(location.country_name),
                non_empty(location.city_name),
            ),
            None => (None, None),
        };

        Visit {
            date: self.date,
            referer: non_empty(self.referer),
            browser,
            os,
            country,
            city,
            potential_bot: self.potential_bot,
        }
    }
}

/// Normalize a page of API visits
pub(crate) fn normalize(visits: Vec<ApiVisit>) -> Vec<Visit> {
    let parser = Parser::new();
    visits.into_iter().map(|v| v.into_visit(&parser)).collect()
}
