//! Table derivations. Each pass reads the whole raw record slice.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::ids;
use super::tables::{
    AgencyRow, CalendarRow, DEFAULT_LAT, DEFAULT_LON, RouteRow, RouteStopRow, StopRow,
    StopTimeRow, TripRow,
};
use super::{ReshapeError, ServicePeriod};
use crate::days;
use crate::operator::Operator;
use crate::raw::RawRecord;

pub fn agency(operator: &Operator) -> AgencyRow {
    AgencyRow {
        agency_id: operator.agency_id.clone(),
        agency_name: operator.agency_name.clone(),
        agency_url: operator.agency_url.clone(),
        agency_timezone: operator.agency_timezone.clone(),
        agency_lang: operator.agency_lang.clone(),
        agency_phone: None,
        agency_fare_url: None,
    }
}

/// One stop per distinct (agency, stop name, direction), sorted.
pub fn stops(records: &[RawRecord]) -> Vec<StopRow> {
    let keys: BTreeSet<(&str, &str, Option<u8>)> = records
        .iter()
        .map(|r| (r.agency_id.as_str(), r.stop_name.as_str(), r.route_direction))
        .collect();

    keys.into_iter()
        .map(|(agency_id, stop_name, direction)| StopRow {
            stop_id: ids::stop_id(agency_id, stop_name, direction),
            stop_code: None,
            stop_name: stop_name.to_string(),
            stop_desc: None,
            stop_lat: DEFAULT_LAT,
            stop_lon: DEFAULT_LON,
            zone_id: None,
            stop_url: None,
            location_type: 0,
            parent_station: None,
            stop_timezone: None,
        })
        .collect()
}

pub fn routes(records: &[RawRecord]) -> Result<Vec<RouteRow>, ReshapeError> {
    let keys: BTreeSet<(&str, &str, &str, &str, u8, &str)> = records
        .iter()
        .map(|r| {
            (
                r.route_id.as_str(),
                r.agency_id.as_str(),
                r.route_short_name.as_str(),
                r.route_long_name.as_str(),
                r.route_type,
                r.route_url.as_str(),
            )
        })
        .collect();

    let mut seen = HashSet::new();
    let mut rows = Vec::with_capacity(keys.len());
    for (route_id, agency_id, short_name, long_name, route_type, url) in keys {
        if !seen.insert(route_id) {
            return Err(ReshapeError::DuplicateRouteId {
                route_id: route_id.to_string(),
            });
        }
        rows.push(RouteRow {
            route_id: route_id.to_string(),
            agency_id: agency_id.to_string(),
            route_short_name: short_name.to_string(),
            route_long_name: long_name.to_string(),
            route_desc: None,
            route_type,
            route_url: url.to_string(),
            route_color: None,
            route_text_color: None,
        });
    }
    Ok(rows)
}

/// Ordered by agency then numeric stop sequence.
pub fn route_stops(records: &[RawRecord]) -> Vec<RouteStopRow> {
    let keys: BTreeSet<(&str, u32, &str, &str, Option<u8>)> = records
        .iter()
        .map(|r| {
            (
                r.agency_id.as_str(),
                r.stop_sequence,
                r.route_id.as_str(),
                r.stop_name.as_str(),
                r.route_direction,
            )
        })
        .collect();

    keys.into_iter()
        .map(|(agency_id, stop_sequence, route_id, stop_name, direction)| RouteStopRow {
            route_id: route_id.to_string(),
            stop_sequence,
            stop_id: ids::stop_id(agency_id, stop_name, direction),
            direction,
        })
        .collect()
}

/// Trips and the service calendar.
///
/// Every stop record of a route carries the same trip columns, so the first
/// record of each (agency, route) group stands for the whole route. A trip
/// running on several days becomes one trip per atomic weekday.
pub fn trips_and_calendar(
    records: &[RawRecord],
    period: &ServicePeriod,
) -> Result<(Vec<TripRow>, Vec<CalendarRow>), ReshapeError> {
    let mut groups: BTreeMap<(&str, &str), &RawRecord> = BTreeMap::new();
    for record in records {
        groups
            .entry((record.agency_id.as_str(), record.route_id.as_str()))
            .or_insert(record);
    }

    let mut calendars: BTreeMap<&str, CalendarRow> = BTreeMap::new();
    let mut trips = Vec::new();
    let mut seen = HashSet::new();
    for ((_, route_id), first) in groups {
        // inbound and outbound share a service id
        let calendar = calendars
            .entry(first.service_id.as_str())
            .or_insert_with(|| CalendarRow::new(&first.service_id, period.start_code(), period.end_code()));
        let headsign = &first.route_end;

        for entry in first.schedule.entries() {
            let short_name = format!("{} - {headsign}", entry.service_number);
            for (weekday, day_code) in days::split_into_atomic_days(&entry.day_code)? {
                let trip_id = ids::trip_id(route_id, weekday, entry.trip_number);
                if !seen.insert(trip_id.clone()) {
                    return Err(ReshapeError::DuplicateTripId { trip_id });
                }
                calendar.set_day(weekday);
                trips.push(TripRow {
                    route_id: route_id.to_string(),
                    service_id: first.service_id.clone(),
                    trip_id,
                    trip_headsign: headsign.clone(),
                    trip_short_name: short_name.clone(),
                    direction_id: first.route_direction,
                    block_id: None,
                    shape_id: None,
                    timeframe_id: day_code.to_string(),
                    trip_sequence: entry.trip_number,
                });
            }
        }
    }

    Ok((trips, calendars.into_values().collect()))
}

/// One row per calling entry and atomic weekday; `NoStop` entries are
/// skipped.
pub fn stop_times(records: &[RawRecord]) -> Result<Vec<StopTimeRow>, ReshapeError> {
    let mut rows = Vec::new();
    for record in records {
        let stop_id = ids::stop_id(&record.agency_id, &record.stop_name, record.route_direction);
        for entry in record.schedule.entries() {
            let Some(time) = entry.call.time() else {
                continue;
            };
            let time = time.format("%H:%M:00").to_string();
            for (weekday, _) in days::split_into_atomic_days(&entry.day_code)? {
                rows.push(StopTimeRow {
                    trip_id: ids::trip_id(&record.route_id, weekday, entry.trip_number),
                    arrival_time: time.clone(),
                    departure_time: time.clone(),
                    stop_id: stop_id.clone(),
                    stop_sequence: record.stop_sequence,
                    stop_headsign: None,
                    pickup_type: None,
                    drop_off_type: None,
                    shape_dist_traveled: None,
                });
            }
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::days::UnknownDaySet;
    use crate::raw::Schedule;

    fn record(route_id: &str, stop_sequence: u32, stop_name: &str, schedule: &str) -> RawRecord {
        RawRecord {
            agency_id: "translinkni".to_string(),
            service_id: "translinkni-metro-1a".to_string(),
            route_id: route_id.to_string(),
            route_short_name: "1A".to_string(),
            route_long_name: "Metro 1A (Inbound)".to_string(),
            route_url: "http://www.translink.co.uk/Metro-1A-inbound/".to_string(),
            route_begin: "Glengormley".to_string(),
            route_end: "City Centre".to_string(),
            route_type: 3,
            route_direction: Some(1),
            stop_sequence,
            stop_name: stop_name.to_string(),
            schedule: schedule.parse::<Schedule>().unwrap(),
        }
    }

    #[test]
    fn stops_are_deduplicated_and_sorted() {
        let mut outbound = record("r-outbound", 0, "Glengormley", "");
        outbound.route_direction = Some(0);
        let records = [
            record("r", 1, "Town Centre", ""),
            record("r", 0, "Glengormley", ""),
            record("r2", 4, "Town Centre", ""),
            outbound,
        ];
        let ids: Vec<String> = stops(&records).into_iter().map(|s| s.stop_id).collect();
        assert_eq!(
            ids,
            [
                "translinkni-glengormley-0",
                "translinkni-glengormley-1",
                "translinkni-town-centre-1",
            ]
        );
    }

    #[test]
    fn conflicting_route_names_are_rejected() {
        let mut renamed = record("translinkni-metro-1a-inbound", 1, "B", "");
        renamed.route_long_name = "Metro 1A (Renamed)".to_string();
        let records = [record("translinkni-metro-1a-inbound", 0, "A", ""), renamed];

        let err = routes(&records).unwrap_err();
        assert!(matches!(
            err,
            ReshapeError::DuplicateRouteId { ref route_id } if route_id == "translinkni-metro-1a-inbound"
        ));
    }

    #[test]
    fn routes_collapse_per_stop_records() {
        let records = [record("r", 0, "A", ""), record("r", 1, "B", "")];
        let rows = routes(&records).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].route_short_name, "1A");
        assert_eq!(rows[0].route_type, 3);
    }

    #[test]
    fn route_stops_sort_numerically() {
        let records = [
            record("r", 10, "K", ""),
            record("r", 2, "B", ""),
            record("r", 1, "A", ""),
        ];
        let sequences: Vec<u32> = route_stops(&records).iter().map(|r| r.stop_sequence).collect();
        assert_eq!(sequences, [1, 2, 10]);
    }

    #[test]
    fn trips_split_per_weekday_and_fill_calendar() {
        let records = [
            record("r", 0, "A", "1#1A#M-W#0800!!2#1B#S#...!!3#1A#SU#1000"),
            record("r", 1, "B", "1#1A#M-W#0810!!2#1B#S#0900!!3#1A#SU#1010"),
        ];
        let (trips, calendar) = trips_and_calendar(&records, &ServicePeriod::default()).unwrap();

        let ids: Vec<&str> = trips.iter().map(|t| t.trip_id.as_str()).collect();
        assert_eq!(ids, ["r-0-001", "r-1-001", "r-2-001", "r-5-002", "r-6-003"]);
        assert_eq!(trips[0].timeframe_id, "M");
        assert_eq!(trips[2].timeframe_id, "W");
        assert_eq!(trips[3].trip_short_name, "1B - City Centre");
        assert_eq!(trips[3].trip_headsign, "City Centre");
        assert_eq!(trips[3].trip_sequence, 2);
        assert_eq!(trips[4].direction_id, Some(1));

        assert_eq!(calendar.len(), 1);
        assert_eq!(calendar[0].service_id, "translinkni-metro-1a");
        assert_eq!(calendar[0].days(), [1, 1, 1, 0, 0, 1, 1]);
        assert_eq!(calendar[0].start_date, "20110101");
        assert_eq!(calendar[0].end_date, "20991231");
    }

    #[test]
    fn directions_share_a_calendar() {
        let mut outbound = record("r-outbound", 0, "A", "1#1A#F#0800");
        outbound.route_direction = Some(0);
        let records = [record("r-inbound", 0, "A", "1#1A#M#0800"), outbound];
        let (trips, calendar) = trips_and_calendar(&records, &ServicePeriod::default()).unwrap();
        assert_eq!(trips.len(), 2);
        assert_eq!(calendar.len(), 1);
        assert_eq!(calendar[0].days(), [1, 0, 0, 0, 1, 0, 0]);
    }

    #[test]
    fn repeated_trip_number_is_rejected() {
        let records = [record("r", 0, "A", "1#1A#M#0800!!1#1A#M-W#0900")];
        let err = trips_and_calendar(&records, &ServicePeriod::default()).unwrap_err();
        assert!(matches!(err, ReshapeError::DuplicateTripId { ref trip_id } if trip_id == "r-0-001"));
    }

    #[test]
    fn unknown_day_code_is_rejected() {
        let records = [record("r", 0, "A", "1#1A#XX#0800")];
        let err = trips_and_calendar(&records, &ServicePeriod::default()).unwrap_err();
        assert!(matches!(err, ReshapeError::Days(UnknownDaySet { .. })));
        assert!(stop_times(&records).is_err());
    }

    #[test]
    fn stop_times_expand_weekdays() {
        let records = [record(
            "translinkni-metro-1a-inbound",
            1,
            "Town Centre",
            "1#101#M-W#0800!!1#101#M-W#1730",
        )];
        let rows = stop_times(&records).unwrap();

        assert_eq!(rows.len(), 6);
        let times: Vec<&str> = rows.iter().map(|r| r.arrival_time.as_str()).collect();
        assert_eq!(
            times,
            ["08:00:00", "08:00:00", "08:00:00", "17:30:00", "17:30:00", "17:30:00"]
        );
        assert!(rows.iter().all(|r| r.arrival_time == r.departure_time));
        assert!(rows.iter().all(|r| r.stop_sequence == 1));
        assert!(rows.iter().all(|r| r.stop_id == "translinkni-town-centre-1"));

        let trip_ids: BTreeSet<&str> = rows.iter().map(|r| r.trip_id.as_str()).collect();
        assert_eq!(
            trip_ids.into_iter().collect::<Vec<_>>(),
            [
                "translinkni-metro-1a-inbound-0-001",
                "translinkni-metro-1a-inbound-1-001",
                "translinkni-metro-1a-inbound-2-001",
            ]
        );
    }

    #[test]
    fn stop_times_skip_no_stop_entries() {
        let records = [record("r", 0, "A", "1#1A#M#...!!2#1A#M#0915")];
        let rows = stop_times(&records).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].trip_id, "r-0-002");
        assert_eq!(rows[0].arrival_time, "09:15:00");
    }
}
