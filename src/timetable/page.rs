//! Route page parsing.
//!
//! A route page carries the service name in `div#ltw`, the route title in
//! `div.lower_timetables_details_top_title`, and the timetables as direct
//! children of `div#timetableContainer`. The container alternates legend
//! tables and timetables; only the odd ones (0-based) hold times.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::ScrapeError;
use crate::operator::{Operator, direction_code};
use crate::raw::{RawRecord, Schedule, ScheduleEntry, StopCall, has_delimiter, parse_hhmm};

const SERVICE_ROW: &str = "Service:";
const DAYS_ROW: &str = "Days of operation:";

const MAIN_BODY_CSS: &str = "div#MainBody";
const SERVICE_NAME_CSS: &str = "div#ltw";
const ROUTE_TITLE_CSS: &str = "div.lower_timetables_details_top_title";
const CONTAINER_CSS: &str = "div#timetableContainer";

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector")
}

static MAIN_BODY: LazyLock<Selector> = LazyLock::new(|| selector(MAIN_BODY_CSS));
static SERVICE_NAME: LazyLock<Selector> = LazyLock::new(|| selector(SERVICE_NAME_CSS));
static ROUTE_TITLE: LazyLock<Selector> = LazyLock::new(|| selector(ROUTE_TITLE_CSS));
static CONTAINER: LazyLock<Selector> = LazyLock::new(|| selector(CONTAINER_CSS));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));

/// Collapses whitespace, non-breaking spaces included.
pub fn clean_text(text: &str) -> String {
    text.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn element_text(element: ElementRef) -> String {
    clean_text(&element.text().collect::<String>())
}

fn child_elements<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    element.children().filter_map(ElementRef::wrap)
}

fn find<'a>(
    scope: ElementRef<'a>,
    selector: &Selector,
    css: &'static str,
    url: &str,
) -> Result<ElementRef<'a>, ScrapeError> {
    scope
        .select(selector)
        .next()
        .ok_or_else(|| ScrapeError::MissingElement {
            url: url.to_string(),
            selector: css,
        })
}

fn table_rows(table: ElementRef) -> Vec<ElementRef> {
    let mut rows = Vec::new();
    for child in child_elements(table) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => {
                rows.extend(child_elements(child).filter(|row| row.value().name() == "tr"))
            }
            _ => {}
        }
    }
    rows
}

fn row_cells(row: ElementRef) -> Vec<String> {
    child_elements(row)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .map(element_text)
        .collect()
}

/// Route page links found on an index page, as absolute URLs.
pub fn route_links(html: &str, operator: &Operator) -> Vec<String> {
    Html::parse_document(html)
        .select(&LINK)
        .filter_map(|link| link.value().attr("href"))
        .filter(|href| operator.is_route_link(href))
        .map(|href| operator.route_page_url(href))
        .collect()
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Direction named by the last `-` segment of a route URL, e.g. `Inbound`.
fn direction_from_url(url: &str) -> String {
    let tail = url.rsplit('-').next().unwrap_or(url);
    title_case(tail.trim_end_matches('/'))
}

/// Per-route fields shared by every record of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMeta {
    pub agency_id: String,
    pub service_id: String,
    pub route_id: String,
    pub short_name: String,
    pub long_name: String,
    pub url: String,
    pub begin: String,
    pub end: String,
    pub route_type: u8,
    pub direction: Option<u8>,
}

impl RouteMeta {
    fn record(&self, stop_sequence: u32, stop_name: String, schedule: Schedule) -> RawRecord {
        RawRecord {
            agency_id: self.agency_id.clone(),
            service_id: self.service_id.clone(),
            route_id: self.route_id.clone(),
            route_short_name: self.short_name.clone(),
            route_long_name: self.long_name.clone(),
            route_url: self.url.clone(),
            route_begin: self.begin.clone(),
            route_end: self.end.clone(),
            route_type: self.route_type,
            route_direction: self.direction,
            stop_sequence,
            stop_name,
            schedule,
        }
    }
}

pub fn route_meta(document: &Html, url: &str, operator: &Operator) -> Result<RouteMeta, ScrapeError> {
    let root = document.root_element();
    let service_name = element_text(find(root, &SERVICE_NAME, SERVICE_NAME_CSS, url)?);
    let Some(short_name) = service_name.split_whitespace().last().map(str::to_string) else {
        return Err(ScrapeError::MissingElement {
            url: url.to_string(),
            selector: SERVICE_NAME_CSS,
        });
    };

    let direction = direction_from_url(url);
    let direction_id = direction_code(&direction);

    let body = find(root, &MAIN_BODY, MAIN_BODY_CSS, url)?;
    let title = element_text(find(body, &ROUTE_TITLE, ROUTE_TITLE_CSS, url)?);
    let parts: Vec<&str> = title.split('-').collect();
    let begin = parts.first().map(|part| part.trim()).unwrap_or_default();
    let end = parts.last().map(|part| part.trim()).unwrap_or_default();

    let service_id = format!("{}-{}", operator.network_id, short_name.to_lowercase());
    let route_id = match direction_id {
        Some(_) => format!("{service_id}-{}", direction.to_lowercase()),
        None => service_id.clone(),
    };

    Ok(RouteMeta {
        agency_id: operator.agency_id.clone(),
        service_id,
        route_id,
        long_name: format!("{service_name} ({direction})"),
        short_name,
        url: url.to_string(),
        begin: begin.to_string(),
        end: end.to_string(),
        route_type: operator.route_type,
        direction: direction_id,
    })
}

fn timetables<'a>(document: &'a Html, url: &str) -> Result<Vec<ElementRef<'a>>, ScrapeError> {
    let body = find(document.root_element(), &MAIN_BODY, MAIN_BODY_CSS, url)?;
    let container = find(body, &CONTAINER, CONTAINER_CSS, url)?;
    Ok(child_elements(container)
        .filter(|element| element.value().name() == "table")
        .enumerate()
        .filter(|(i, _)| i % 2 == 1)
        .map(|(_, table)| table)
        .collect())
}

/// A cell with no digits at all (`...`, `-`, blank) means the trip does not
/// call; anything else must start with `HHMM`.
fn parse_call(cell: &str) -> Option<StopCall> {
    if !cell.bytes().any(|b| b.is_ascii_digit()) {
        return Some(StopCall::NoStop);
    }
    parse_hhmm(cell).map(StopCall::At)
}

#[derive(Debug)]
struct StopRow {
    name: String,
    entries: Vec<ScheduleEntry>,
}

fn parse_timetable(
    table: ElementRef,
    url: &str,
    next_trip: &mut u32,
) -> Result<Vec<StopRow>, ScrapeError> {
    let mut rows = table_rows(table).into_iter().map(row_cells);

    let mut service_numbers = None;
    let mut day_codes = None;
    for cells in rows.by_ref() {
        let Some((label, columns)) = cells.split_first() else {
            continue;
        };
        if label == SERVICE_ROW {
            service_numbers = Some(columns.to_vec());
        } else if label == DAYS_ROW {
            day_codes = Some(columns.to_vec());
            break;
        }
    }
    let service_numbers = service_numbers.ok_or_else(|| ScrapeError::MissingHeaderRow {
        url: url.to_string(),
        label: SERVICE_ROW,
    })?;
    let day_codes = day_codes.ok_or_else(|| ScrapeError::MissingHeaderRow {
        url: url.to_string(),
        label: DAYS_ROW,
    })?;
    if let Some(value) = service_numbers
        .iter()
        .chain(&day_codes)
        .find(|value| has_delimiter(value))
    {
        return Err(ScrapeError::DelimiterCollision {
            url: url.to_string(),
            value: value.clone(),
        });
    }
    if service_numbers.len() != day_codes.len() {
        return Err(ScrapeError::HeaderMismatch {
            url: url.to_string(),
            services: service_numbers.len(),
            days: day_codes.len(),
        });
    }

    let trips: Vec<u32> = service_numbers
        .iter()
        .map(|_| {
            let trip = *next_trip;
            *next_trip += 1;
            trip
        })
        .collect();

    let mut stops = Vec::new();
    for cells in rows {
        let Some((label, times)) = cells.split_first() else {
            continue;
        };
        if label.is_empty() || label.ends_with(':') {
            continue;
        }
        if times.len() != trips.len() {
            return Err(ScrapeError::RowWidthMismatch {
                url: url.to_string(),
                stop: label.clone(),
                expected: trips.len(),
                found: times.len(),
            });
        }
        let mut entries = Vec::with_capacity(trips.len());
        for (((trip, service), days), cell) in trips.iter().zip(&service_numbers).zip(&day_codes).zip(times) {
            let call = parse_call(cell).ok_or_else(|| ScrapeError::InvalidTime {
                url: url.to_string(),
                stop: label.clone(),
                cell: cell.clone(),
            })?;
            entries.push(ScheduleEntry {
                trip_number: *trip,
                service_number: service.clone(),
                day_code: days.clone(),
                call,
            });
        }
        stops.push(StopRow {
            name: label.clone(),
            entries,
        });
    }
    Ok(stops)
}

fn check_same_stops(expected: &[String], found: &[String], url: &str) -> Result<(), ScrapeError> {
    for position in 0..expected.len().max(found.len()) {
        let (want, got) = (expected.get(position), found.get(position));
        if want != got {
            return Err(ScrapeError::InconsistentStops {
                url: url.to_string(),
                position,
                expected: want.cloned(),
                found: got.cloned(),
            });
        }
    }
    Ok(())
}

/// Parses one route page into one record per stop.
///
/// Trip numbers run across all timetables of the page, starting at 1. Each
/// stop's entries from every table are merged into a single schedule, and
/// records come out ordered by (stop index, stop name).
pub fn parse_route_page(
    html: &str,
    url: &str,
    operator: &Operator,
) -> Result<Vec<RawRecord>, ScrapeError> {
    let document = Html::parse_document(html);
    let meta = route_meta(&document, url, operator)?;

    let mut next_trip = 1;
    let mut stop_names: Option<Vec<String>> = None;
    let mut merged: BTreeMap<(u32, String), Vec<ScheduleEntry>> = BTreeMap::new();
    for table in timetables(&document, url)? {
        let stops = parse_timetable(table, url, &mut next_trip)?;
        let names: Vec<String> = stops.iter().map(|stop| stop.name.clone()).collect();
        match &stop_names {
            Some(expected) => check_same_stops(expected, &names, url)?,
            None => stop_names = Some(names),
        }
        for (index, stop) in stops.into_iter().enumerate() {
            merged
                .entry((index as u32, stop.name))
                .or_default()
                .extend(stop.entries);
        }
    }
    debug!(route_id = %meta.route_id, trips = next_trip - 1, stops = merged.len(), "Route page parsed");

    Ok(merged
        .into_iter()
        .map(|((sequence, name), entries)| meta.record(sequence, name, Schedule(entries)))
        .collect())
}
