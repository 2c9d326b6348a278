//! Reshaping raw records into a GTFS feed directory.
//!
//! Every table is derived and checked in memory before anything is written,
//! so a failed run leaves no partial feed behind.

pub mod enrich;
pub mod ids;
pub mod passes;
pub mod tables;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::info;

use crate::days::UnknownDaySet;
use crate::operator::Operator;
use crate::output;
use crate::raw::{self, RawRecord};
use crate::stats::FeedSummary;
use enrich::StopLocations;
use tables::{
    AgencyRow, CalendarRow, RouteRow, RouteStopRow, STOPS_AS_SCRAPED, StopRow, StopTimeRow,
    TripRow,
};

#[derive(Debug, thiserror::Error)]
pub enum ReshapeError {
    #[error("route id {route_id} is used by more than one route")]
    DuplicateRouteId { route_id: String },

    #[error("trip id {trip_id} is generated more than once")]
    DuplicateTripId { trip_id: String },

    #[error("stop time references unknown trip {trip_id}")]
    UnknownTripReference { trip_id: String },

    #[error(transparent)]
    Days(#[from] UnknownDaySet),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Validity range written to every calendar row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServicePeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

const CALENDAR_DATE_FORMAT: &str = "%Y%m%d";

impl ServicePeriod {
    /// Parses `YYYYMMDD` dates.
    pub fn parse(start: &str, end: &str) -> Result<Self, chrono::ParseError> {
        Ok(Self {
            start: NaiveDate::parse_from_str(start, CALENDAR_DATE_FORMAT)?,
            end: NaiveDate::parse_from_str(end, CALENDAR_DATE_FORMAT)?,
        })
    }

    pub fn start_code(&self) -> String {
        self.start.format(CALENDAR_DATE_FORMAT).to_string()
    }

    pub fn end_code(&self) -> String {
        self.end.format(CALENDAR_DATE_FORMAT).to_string()
    }
}

impl Default for ServicePeriod {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2011, 1, 1).expect("valid date"),
            end: NaiveDate::from_ymd_opt(2099, 12, 31).expect("valid date"),
        }
    }
}

/// All output tables, in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Feed {
    pub agency: Vec<AgencyRow>,
    pub stops: Vec<StopRow>,
    pub routes: Vec<RouteRow>,
    pub route_stops: Vec<RouteStopRow>,
    pub trips: Vec<TripRow>,
    pub stop_times: Vec<StopTimeRow>,
    pub calendar: Vec<CalendarRow>,
}

/// Derives and cross-checks every table.
pub fn build_feed(
    records: &[RawRecord],
    operator: &Operator,
    period: &ServicePeriod,
) -> Result<Feed, ReshapeError> {
    let stops = passes::stops(records);
    let routes = passes::routes(records)?;
    let route_stops = passes::route_stops(records);
    let (trips, calendar) = passes::trips_and_calendar(records, period)?;
    let stop_times = passes::stop_times(records)?;

    let trip_ids: HashSet<&str> = trips.iter().map(|trip| trip.trip_id.as_str()).collect();
    if let Some(orphan) = stop_times
        .iter()
        .find(|stop_time| !trip_ids.contains(stop_time.trip_id.as_str()))
    {
        return Err(ReshapeError::UnknownTripReference {
            trip_id: orphan.trip_id.clone(),
        });
    }

    Ok(Feed {
        agency: vec![passes::agency(operator)],
        stops,
        routes,
        route_stops,
        trips,
        stop_times,
        calendar,
    })
}

/// Writes every table to `dir`. Stops land in `stops_as_scraped.txt` until
/// [`enrich::rewrite_stops`] runs.
pub fn write_feed(feed: &Feed, dir: &Path) -> Result<(), ReshapeError> {
    fs::create_dir_all(dir)?;
    output::write_table(dir, &feed.agency)?;
    output::write_rows(&dir.join(STOPS_AS_SCRAPED), &feed.stops)?;
    output::write_table(dir, &feed.routes)?;
    output::write_table(dir, &feed.route_stops)?;
    output::write_table(dir, &feed.trips)?;
    output::write_table(dir, &feed.stop_times)?;
    output::write_table(dir, &feed.calendar)?;
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct ReshapeOptions {
    pub operator: Operator,
    pub period: ServicePeriod,
    pub coord_map: Option<PathBuf>,
    pub stop_fixes: Option<PathBuf>,
}

/// Loads the raw store at `raw_path` and writes the enriched feed to `dest`.
#[tracing::instrument(skip(options))]
pub fn reshape(raw_path: &Path, dest: &Path, options: &ReshapeOptions) -> Result<FeedSummary> {
    let records = raw::read_raw_store(raw_path)
        .with_context(|| format!("failed to read raw store {}", raw_path.display()))?;
    let feed = build_feed(&records, &options.operator, &options.period)?;

    let locations = StopLocations::load(
        options.coord_map.as_deref(),
        options.stop_fixes.as_deref(),
        &options.operator.agency_id,
    )
    .context("failed to load stop locations")?;

    write_feed(&feed, dest).with_context(|| format!("failed to write feed to {}", dest.display()))?;
    let enrichment = enrich::rewrite_stops(dest, &locations)?;

    let summary = FeedSummary::from_feed(&feed, records.len(), enrichment);
    info!(
        routes = summary.routes,
        trips = summary.trips,
        stop_times = summary.stop_times,
        "Feed written"
    );
    Ok(summary)
}
