//! Output formatting and persistence.
//!
//! Feed tables are written as CSV with a header row, even when empty. Run
//! summaries are logged as pretty-printed JSON.

use std::path::{Path, PathBuf};

use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::reshape::tables::Table;

/// Writes `rows` to `path` under the table's header, replacing any previous
/// file.
pub fn write_rows<T: Table>(path: &Path, rows: &[T]) -> csv::Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(T::HEADERS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    debug!(path = %path.display(), rows = rows.len(), "Table written");
    Ok(())
}

/// Writes `rows` to the table's own file name inside `dir`.
pub fn write_table<T: Table>(dir: &Path, rows: &[T]) -> csv::Result<PathBuf> {
    let path = dir.join(T::FILE_NAME);
    write_rows(&path, rows)?;
    Ok(path)
}

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty<T: std::fmt::Debug>(value: &T) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reshape::tables::{CalendarRow, RouteStopRow, StopTimeRow};
    use crate::stats::FeedSummary;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&FeedSummary::default());
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&FeedSummary::default()).unwrap();
    }

    #[test]
    fn test_empty_table_still_has_header() {
        let dir = tempdir().unwrap();
        let path = write_table::<CalendarRow>(dir.path(), &[]).unwrap();

        assert_eq!(path.file_name().unwrap(), "calendar.txt");
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\n"
        );
    }

    #[test]
    fn test_rows_follow_header_and_empty_options() {
        let dir = tempdir().unwrap();
        let rows = [
            RouteStopRow {
                route_id: "r".to_string(),
                stop_sequence: 0,
                stop_id: "s".to_string(),
                direction: Some(1),
            },
            RouteStopRow {
                route_id: "r".to_string(),
                stop_sequence: 1,
                stop_id: "t".to_string(),
                direction: None,
            },
        ];
        let path = write_table(dir.path(), &rows).unwrap();

        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines, ["route_id,stop_sequence,stop_id,direction", "r,0,s,1", "r,1,t,"]);
    }

    #[test]
    fn test_stop_time_distance_is_written() {
        let dir = tempdir().unwrap();
        let row = StopTimeRow {
            trip_id: "t".to_string(),
            arrival_time: "08:00:00".to_string(),
            departure_time: "08:00:00".to_string(),
            stop_id: "s".to_string(),
            stop_sequence: 0,
            stop_headsign: None,
            pickup_type: None,
            drop_off_type: None,
            shape_dist_traveled: Some(1.5),
        };
        assert_eq!(row, row.clone());
        let path = write_table(dir.path(), &[row]).unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().nth(1), Some("t,08:00:00,08:00:00,s,0,,,,1.5"));
    }

    #[test]
    fn test_rewrite_replaces_previous_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("calendar.txt");
        fs::write(&path, "stale\nrows\nhere\n").unwrap();

        write_rows::<CalendarRow>(&path, &[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
    }
}
