//! Scraper error types.
//!
//! Every variant except [`ScrapeError::Store`] means the page did not have
//! the structure the parser relies on. These abort the run: emitting rows
//! from such a page could silently attach times to the wrong stops.

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("{url}: missing element {selector}")]
    MissingElement { url: String, selector: &'static str },

    #[error("{url}: timetable has no {label:?} row")]
    MissingHeaderRow { url: String, label: &'static str },

    #[error("{url}: {services} service columns but {days} day columns")]
    HeaderMismatch {
        url: String,
        services: usize,
        days: usize,
    },

    #[error("{url}: stop {stop:?} has {found} time cells, expected {expected}")]
    RowWidthMismatch {
        url: String,
        stop: String,
        expected: usize,
        found: usize,
    },

    #[error(
        "{url}: inconsistent stop sequence between tables at position {position}: expected {expected:?}, found {found:?}"
    )]
    InconsistentStops {
        url: String,
        position: usize,
        expected: Option<String>,
        found: Option<String>,
    },

    #[error("{url}: unreadable time {cell:?} at stop {stop:?}")]
    InvalidTime {
        url: String,
        stop: String,
        cell: String,
    },

    #[error("{url}: header value {value:?} contains a schedule delimiter")]
    DelimiterCollision { url: String, value: String },

    #[error("raw store: {0}")]
    Store(#[from] csv::Error),
}
