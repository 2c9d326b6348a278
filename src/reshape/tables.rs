//! Row types of the output feed, one per file.

use serde::{Deserialize, Serialize};

/// Placeholder position used until a stop is enriched with real coordinates.
pub const DEFAULT_LAT: f64 = 54.5971852032;
pub const DEFAULT_LON: f64 = -5.934116323;

/// A feed file: its name and column headers. Field order of the row type
/// must match `HEADERS`.
pub trait Table: Serialize {
    const FILE_NAME: &'static str;
    const HEADERS: &'static [&'static str];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgencyRow {
    pub agency_id: String,
    pub agency_name: String,
    pub agency_url: String,
    pub agency_timezone: String,
    pub agency_lang: String,
    pub agency_phone: Option<String>,
    pub agency_fare_url: Option<String>,
}

impl Table for AgencyRow {
    const FILE_NAME: &'static str = "agency.txt";
    const HEADERS: &'static [&'static str] = &[
        "agency_id",
        "agency_name",
        "agency_url",
        "agency_timezone",
        "agency_lang",
        "agency_phone",
        "agency_fare_url",
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRow {
    pub stop_id: String,
    pub stop_code: Option<String>,
    pub stop_name: String,
    pub stop_desc: Option<String>,
    pub stop_lat: f64,
    pub stop_lon: f64,
    pub zone_id: Option<String>,
    pub stop_url: Option<String>,
    pub location_type: u8,
    pub parent_station: Option<String>,
    pub stop_timezone: Option<String>,
}

impl StopRow {
    pub fn is_placeholder(&self) -> bool {
        self.stop_lat == DEFAULT_LAT && self.stop_lon == DEFAULT_LON
    }
}

impl Table for StopRow {
    const FILE_NAME: &'static str = "stops.txt";
    const HEADERS: &'static [&'static str] = &[
        "stop_id",
        "stop_code",
        "stop_name",
        "stop_desc",
        "stop_lat",
        "stop_lon",
        "zone_id",
        "stop_url",
        "location_type",
        "parent_station",
        "stop_timezone",
    ];
}

/// Stops before enrichment, same columns as `stops.txt`.
pub const STOPS_AS_SCRAPED: &str = "stops_as_scraped.txt";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteRow {
    pub route_id: String,
    pub agency_id: String,
    pub route_short_name: String,
    pub route_long_name: String,
    pub route_desc: Option<String>,
    pub route_type: u8,
    pub route_url: String,
    pub route_color: Option<String>,
    pub route_text_color: Option<String>,
}

impl Table for RouteRow {
    const FILE_NAME: &'static str = "routes.txt";
    const HEADERS: &'static [&'static str] = &[
        "route_id",
        "agency_id",
        "route_short_name",
        "route_long_name",
        "route_desc",
        "route_type",
        "route_url",
        "route_color",
        "route_text_color",
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteStopRow {
    pub route_id: String,
    pub stop_sequence: u32,
    pub stop_id: String,
    pub direction: Option<u8>,
}

impl Table for RouteStopRow {
    const FILE_NAME: &'static str = "routestops.txt";
    const HEADERS: &'static [&'static str] = &["route_id", "stop_sequence", "stop_id", "direction"];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TripRow {
    pub route_id: String,
    pub service_id: String,
    pub trip_id: String,
    pub trip_headsign: String,
    pub trip_short_name: String,
    pub direction_id: Option<u8>,
    pub block_id: Option<String>,
    pub shape_id: Option<String>,
    /// Atomic day code the trip runs on.
    pub timeframe_id: String,
    pub trip_sequence: u32,
}

impl Table for TripRow {
    const FILE_NAME: &'static str = "trips.txt";
    const HEADERS: &'static [&'static str] = &[
        "route_id",
        "service_id",
        "trip_id",
        "trip_headsign",
        "trip_short_name",
        "direction_id",
        "block_id",
        "shape_id",
        "timeframe_id",
        "trip_sequence",
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopTimeRow {
    pub trip_id: String,
    pub arrival_time: String,
    pub departure_time: String,
    pub stop_id: String,
    pub stop_sequence: u32,
    pub stop_headsign: Option<String>,
    pub pickup_type: Option<u8>,
    pub drop_off_type: Option<u8>,
    pub shape_dist_traveled: Option<f64>,
}

impl Table for StopTimeRow {
    const FILE_NAME: &'static str = "stop_times.txt";
    const HEADERS: &'static [&'static str] = &[
        "trip_id",
        "arrival_time",
        "departure_time",
        "stop_id",
        "stop_sequence",
        "stop_headsign",
        "pickup_type",
        "drop_off_type",
        "shape_dist_traveled",
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarRow {
    pub service_id: String,
    pub monday: u8,
    pub tuesday: u8,
    pub wednesday: u8,
    pub thursday: u8,
    pub friday: u8,
    pub saturday: u8,
    pub sunday: u8,
    pub start_date: String,
    pub end_date: String,
}

impl CalendarRow {
    pub fn new(service_id: &str, start_date: String, end_date: String) -> Self {
        Self {
            service_id: service_id.to_string(),
            monday: 0,
            tuesday: 0,
            wednesday: 0,
            thursday: 0,
            friday: 0,
            saturday: 0,
            sunday: 0,
            start_date,
            end_date,
        }
    }

    /// Turns on the flag for weekday `index` (Monday = 0).
    pub fn set_day(&mut self, index: usize) {
        let flag = match index {
            0 => &mut self.monday,
            1 => &mut self.tuesday,
            2 => &mut self.wednesday,
            3 => &mut self.thursday,
            4 => &mut self.friday,
            5 => &mut self.saturday,
            6 => &mut self.sunday,
            _ => return,
        };
        *flag = 1;
    }

    pub fn days(&self) -> [u8; 7] {
        [
            self.monday,
            self.tuesday,
            self.wednesday,
            self.thursday,
            self.friday,
            self.saturday,
            self.sunday,
        ]
    }
}

impl Table for CalendarRow {
    const FILE_NAME: &'static str = "calendar.txt";
    const HEADERS: &'static [&'static str] = &[
        "service_id",
        "monday",
        "tuesday",
        "wednesday",
        "thursday",
        "friday",
        "saturday",
        "sunday",
        "start_date",
        "end_date",
    ];
}
