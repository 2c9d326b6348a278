use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::reshape::Feed;
use crate::reshape::enrich::EnrichmentSummary;
use crate::timetable::ScrapeSummary;

#[derive(Debug, Default, Serialize)]
pub struct FeedSummary {
    pub timestamp: DateTime<Utc>,
    pub raw_records: usize,

    // table sizes
    pub agencies: usize,
    pub stops: usize,
    pub routes: usize,
    pub route_stops: usize,
    pub trips: usize,
    pub stop_times: usize,
    pub calendars: usize,

    // enrichment
    pub stops_mapped: usize,
    pub stops_fixed: usize,
    pub stops_unmapped: usize,

    pub scrape: Option<ScrapeSummary>,
}

impl FeedSummary {
    pub fn from_feed(feed: &Feed, raw_records: usize, enrichment: EnrichmentSummary) -> Self {
        Self {
            timestamp: Utc::now(),
            raw_records,
            agencies: feed.agency.len(),
            stops: feed.stops.len(),
            routes: feed.routes.len(),
            route_stops: feed.route_stops.len(),
            trips: feed.trips.len(),
            stop_times: feed.stop_times.len(),
            calendars: feed.calendar.len(),
            stops_mapped: enrichment.mapped,
            stops_fixed: enrichment.fixed,
            stops_unmapped: enrichment.unmapped,
            scrape: None,
        }
    }

    pub fn with_scrape(mut self, scrape: ScrapeSummary) -> Self {
        self.scrape = Some(scrape);
        self
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Share of stops placed at a real position.
    pub fn located_pct(&self) -> f64 {
        Self::pct(self.stops_mapped + self.stops_fixed, self.stops)
    }
}
