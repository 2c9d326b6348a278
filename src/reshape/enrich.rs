//! Stop coordinates from hand-maintained lookup files.
//!
//! Two inputs, both CSV with a header row:
//! - the coordinate map, `stop_id,lat,lon`, keyed by generated stop id;
//! - the stop fixes, `stop_name,route_direction,stop_lat,stop_lon,road`,
//!   keyed by the stop id derived from name and direction.
//!
//! The coordinate map wins when both know a stop.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::ReshapeError;
use super::ids;
use super::tables::{STOPS_AS_SCRAPED, StopRow, Table};
use crate::output;

#[derive(Debug, Deserialize)]
struct CoordMapRow {
    stop_id: String,
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct StopFixRow {
    stop_name: String,
    route_direction: Option<u8>,
    stop_lat: f64,
    stop_lon: f64,
    road: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StopFix {
    pub lat: f64,
    pub lon: f64,
    pub road: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Located {
    Mapped,
    Fixed,
    Unmapped,
}

/// Known positions, by stop id.
#[derive(Debug, Clone, Default)]
pub struct StopLocations {
    coords: HashMap<String, (f64, f64)>,
    fixes: HashMap<String, StopFix>,
}

fn reader_for(path: &Path) -> csv::Result<csv::Reader<fs::File>> {
    ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
}

impl StopLocations {
    /// Loads whichever of the two files exist. An absent file contributes no
    /// mappings.
    pub fn load(
        coord_map: Option<&Path>,
        stop_fixes: Option<&Path>,
        agency_id: &str,
    ) -> Result<Self, ReshapeError> {
        let mut locations = Self::default();

        if let Some(path) = coord_map {
            if path.exists() {
                for row in reader_for(path)?.deserialize() {
                    let row: CoordMapRow = row?;
                    if !row.stop_id.is_empty() {
                        locations.insert_coords(row.stop_id, row.lat, row.lon);
                    }
                }
                debug!(path = %path.display(), stops = locations.coords.len(), "Coordinate map loaded");
            } else {
                warn!(path = %path.display(), "Coordinate map not found");
            }
        }

        if let Some(path) = stop_fixes {
            if path.exists() {
                for row in reader_for(path)?.deserialize() {
                    let row: StopFixRow = row?;
                    let stop_id = ids::stop_id(agency_id, &row.stop_name, row.route_direction);
                    locations.insert_fix(
                        stop_id,
                        StopFix {
                            lat: row.stop_lat,
                            lon: row.stop_lon,
                            road: row.road.filter(|road| !road.is_empty()),
                        },
                    );
                }
                debug!(path = %path.display(), stops = locations.fixes.len(), "Stop fixes loaded");
            } else {
                warn!(path = %path.display(), "Stop fixes not found");
            }
        }

        Ok(locations)
    }

    pub fn insert_coords(&mut self, stop_id: String, lat: f64, lon: f64) {
        self.coords.insert(stop_id, (lat, lon));
    }

    pub fn insert_fix(&mut self, stop_id: String, fix: StopFix) {
        self.fixes.insert(stop_id, fix);
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty() && self.fixes.is_empty()
    }

    /// Moves `stop` to its known position, if any.
    pub fn apply(&self, stop: &mut StopRow) -> Located {
        if let Some(&(lat, lon)) = self.coords.get(&stop.stop_id) {
            stop.stop_lat = lat;
            stop.stop_lon = lon;
            return Located::Mapped;
        }
        if let Some(fix) = self.fixes.get(&stop.stop_id) {
            stop.stop_lat = fix.lat;
            stop.stop_lon = fix.lon;
            if let Some(road) = &fix.road {
                stop.stop_desc = Some(road.clone());
            }
            return Located::Fixed;
        }
        Located::Unmapped
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnrichmentSummary {
    pub mapped: usize,
    pub fixed: usize,
    pub unmapped: usize,
}

/// Rewrites `stops_as_scraped.txt` in `dir` into `stops.txt` with known
/// positions filled in, then removes the intermediate file.
#[tracing::instrument(skip(locations))]
pub fn rewrite_stops(dir: &Path, locations: &StopLocations) -> Result<EnrichmentSummary, ReshapeError> {
    let scraped = dir.join(STOPS_AS_SCRAPED);
    let mut stops = reader_for(&scraped)?
        .deserialize()
        .collect::<csv::Result<Vec<StopRow>>>()?;

    let mut summary = EnrichmentSummary::default();
    for stop in &mut stops {
        match locations.apply(stop) {
            Located::Mapped => summary.mapped += 1,
            Located::Fixed => summary.fixed += 1,
            Located::Unmapped => summary.unmapped += 1,
        }
    }

    output::write_rows(&dir.join(StopRow::FILE_NAME), &stops)?;
    fs::remove_file(&scraped)?;
    info!(
        mapped = summary.mapped,
        fixed = summary.fixed,
        unmapped = summary.unmapped,
        "Stops enriched"
    );
    Ok(summary)
}
