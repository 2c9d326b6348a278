//! Raw timetable records: one row per (route, stop) as scraped.
//!
//! Records are kept in a CSV file between scraping and reshaping. The
//! schedule column packs every trip calling at the stop as
//! `trip#service#days#HHMM` entries joined by `!!`; in memory it is the typed
//! [`Schedule`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

pub const ENTRY_DELIMITER: &str = "!!";
pub const FIELD_DELIMITER: char = '#';
/// Written in place of a time when a trip does not call at the stop.
pub const NO_STOP_MARKER: &str = "...";

/// Column order of the raw store.
pub const RAW_STORE_COLUMNS: [&str; 13] = [
    "agency_id",
    "service_id",
    "route_id",
    "route_short_name",
    "route_long_name",
    "route_url",
    "route_begin",
    "route_end",
    "route_type",
    "route_direction",
    "stop_sequence",
    "stop_name",
    "schedule",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub agency_id: String,
    pub service_id: String,
    pub route_id: String,
    pub route_short_name: String,
    pub route_long_name: String,
    pub route_url: String,
    pub route_begin: String,
    pub route_end: String,
    pub route_type: u8,
    /// 0 outbound, 1 inbound.
    pub route_direction: Option<u8>,
    pub stop_sequence: u32,
    pub stop_name: String,
    pub schedule: Schedule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCall {
    At(NaiveTime),
    NoStop,
}

impl StopCall {
    pub fn time(self) -> Option<NaiveTime> {
        match self {
            StopCall::At(time) => Some(time),
            StopCall::NoStop => None,
        }
    }
}

impl fmt::Display for StopCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopCall::At(time) => write!(f, "{:02}{:02}", time.hour(), time.minute()),
            StopCall::NoStop => f.write_str(NO_STOP_MARKER),
        }
    }
}

/// One trip column of a timetable, as seen from a single stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub trip_number: u32,
    pub service_number: String,
    pub day_code: String,
    pub call: StopCall,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule(pub Vec<ScheduleEntry>);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleFormatError {
    #[error("schedule field {0:?} contains a delimiter character")]
    Delimiter(String),
    #[error("malformed schedule entry {0:?}")]
    MalformedEntry(String),
    #[error("invalid trip number {0:?}")]
    TripNumber(String),
    #[error("invalid time {0:?}")]
    Time(String),
}

/// Reads the leading `HHMM` of a timetable cell.
pub fn parse_hhmm(text: &str) -> Option<NaiveTime> {
    let digits = text.get(..4)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hour = digits[..2].parse().ok()?;
    let minute = digits[2..].parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// True if `value` cannot be packed into a schedule entry.
pub fn has_delimiter(value: &str) -> bool {
    value.contains(FIELD_DELIMITER) || value.contains('!')
}

fn check_field(value: &str) -> Result<&str, ScheduleFormatError> {
    if has_delimiter(value) {
        Err(ScheduleFormatError::Delimiter(value.to_string()))
    } else {
        Ok(value)
    }
}

impl Schedule {
    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.0
    }

    pub fn encode(&self) -> Result<String, ScheduleFormatError> {
        let mut parts = Vec::with_capacity(self.0.len());
        for entry in &self.0 {
            parts.push(format!(
                "{}{FIELD_DELIMITER}{}{FIELD_DELIMITER}{}{FIELD_DELIMITER}{}",
                entry.trip_number,
                check_field(&entry.service_number)?,
                check_field(&entry.day_code)?,
                entry.call,
            ));
        }
        Ok(parts.join(ENTRY_DELIMITER))
    }
}

impl FromStr for Schedule {
    type Err = ScheduleFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut entries = Vec::new();
        for part in s.split(ENTRY_DELIMITER).filter(|part| !part.is_empty()) {
            let fields: Vec<&str> = part.split(FIELD_DELIMITER).collect();
            let [trip, service, days, time] = fields.as_slice() else {
                return Err(ScheduleFormatError::MalformedEntry(part.to_string()));
            };
            let trip_number = trip
                .parse()
                .map_err(|_| ScheduleFormatError::TripNumber(trip.to_string()))?;
            let call = if *time == NO_STOP_MARKER {
                StopCall::NoStop
            } else {
                StopCall::At(parse_hhmm(time).ok_or_else(|| ScheduleFormatError::Time(time.to_string()))?)
            };
            entries.push(ScheduleEntry {
                trip_number,
                service_number: service.to_string(),
                day_code: days.to_string(),
                call,
            });
        }
        Ok(Schedule(entries))
    }
}

impl Serialize for Schedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = self.encode().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&encoded)
    }
}

impl<'de> Deserialize<'de> for Schedule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Writes the raw store, replacing any previous file only once every record
/// has been written to a `.part` sibling.
pub fn write_raw_store(path: &Path, records: &[RawRecord]) -> csv::Result<()> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    let written = write_records(&partial, records);
    if written.is_err() {
        let _ = fs::remove_file(&partial);
        return written;
    }
    fs::rename(&partial, path)?;
    debug!(path = %path.display(), records = records.len(), "Raw store written");
    Ok(())
}

fn write_records(path: &Path, records: &[RawRecord]) -> csv::Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(RAW_STORE_COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_raw_store(path: &Path) -> csv::Result<Vec<RawRecord>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let records = reader.deserialize().collect::<csv::Result<Vec<RawRecord>>>()?;
    debug!(path = %path.display(), records = records.len(), "Raw store loaded");
    Ok(records)
}
