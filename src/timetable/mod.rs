//! Timetable scraping: index pages to route pages to raw records.

mod error;
pub mod page;

pub use error::ScrapeError;
pub use page::{RouteMeta, parse_route_page, route_links};

use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::fetch::Fetch;
use crate::operator::Operator;
use crate::raw::{self, RawRecord};

/// Counters reported at the end of a scrape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrapeSummary {
    pub index_pages: usize,
    pub index_pages_skipped: usize,
    pub route_pages: usize,
    pub route_pages_skipped: usize,
    pub records: usize,
}

/// Collects the route page URLs linked from every index page. Index pages
/// that cannot be fetched are logged and skipped.
#[tracing::instrument(skip_all)]
pub fn discover_route_urls<F: Fetch + ?Sized>(
    fetch: &F,
    operator: &Operator,
    summary: &mut ScrapeSummary,
) -> BTreeSet<String> {
    let mut urls = BTreeSet::new();
    for index_url in &operator.index_urls {
        summary.index_pages += 1;
        match fetch.fetch_text(index_url) {
            Ok(html) => urls.extend(route_links(&html, operator)),
            Err(e) => {
                summary.index_pages_skipped += 1;
                warn!(url = %index_url, error = %e, "Index page unavailable, skipping");
            }
        }
    }
    info!(routes = urls.len(), "Route pages discovered");
    urls
}

/// Scrapes every route page of `operator`.
///
/// Fetch failures skip the page. A page that fetches but does not have the
/// expected structure aborts the whole scrape.
pub fn scrape<F: Fetch + ?Sized>(
    fetch: &F,
    operator: &Operator,
) -> Result<(Vec<RawRecord>, ScrapeSummary), ScrapeError> {
    let mut summary = ScrapeSummary::default();
    let urls = discover_route_urls(fetch, operator, &mut summary);

    let mut records = Vec::new();
    for url in &urls {
        summary.route_pages += 1;
        let html = match fetch.fetch_text(url) {
            Ok(html) => html,
            Err(e) => {
                summary.route_pages_skipped += 1;
                warn!(url = %url, error = %e, "Route page unavailable, skipping");
                continue;
            }
        };
        records.extend(parse_route_page(&html, url, operator)?);
    }
    summary.records = records.len();
    Ok((records, summary))
}

/// Scrapes and writes the raw store to `path`. Nothing is written when the
/// scrape fails.
#[tracing::instrument(skip(fetch, operator))]
pub fn scrape_to_raw_store<F: Fetch + ?Sized>(
    fetch: &F,
    operator: &Operator,
    path: &Path,
) -> Result<ScrapeSummary, ScrapeError> {
    let (records, summary) = scrape(fetch, operator)?;
    raw::write_raw_store(path, &records)?;
    info!(
        records = summary.records,
        route_pages = summary.route_pages,
        skipped = summary.route_pages_skipped,
        "Raw store written"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use std::collections::HashMap;
    use tempfile::tempdir;

    struct MapFetch(HashMap<String, String>);

    impl Fetch for MapFetch {
        fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
            self.0.get(url).cloned().ok_or_else(|| FetchError::Status {
                status: 404,
                url: url.to_string(),
                excerpt: String::new(),
            })
        }
    }

    fn operator() -> Operator {
        Operator {
            index_urls: vec![
                "http://www.translink.co.uk/index-1/".to_string(),
                "http://www.translink.co.uk/index-2/".to_string(),
            ],
            ..Operator::translink_metro()
        }
    }

    fn route_page(service: &str, stops: &[&str]) -> String {
        let rows: String = stops
            .iter()
            .map(|stop| format!("<tr><td>{stop}</td><td>0800</td></tr>"))
            .collect();
        format!(
            r#"<html><body><div id="ltw">Metro {service}</div><div id="MainBody">
            <div class="lower_timetables_details_top_title">A - B</div>
            <div id="timetableContainer"><table></table><table>
            <tr><td>Service:</td><td>{service}</td></tr>
            <tr><td>Days of operation:</td><td>M-F</td></tr>
            {rows}</table></div></div></body></html>"#
        )
    }

    const ROUTE_2: &str = "http://www.translink.co.uk/Metro/Metro-Timetables/Metro-2-outbound/";
    const ROUTE_1: &str = "http://www.translink.co.uk/Metro/Metro-Timetables/Metro-1-inbound/";

    fn site() -> MapFetch {
        let index = r#"<a href="/Metro/Metro-Timetables/Metro-2-outbound/">2</a>
            <a href="/Metro/Metro-Timetables/Metro-1-inbound/">1</a>
            <a href="/Metro/Metro-Timetables/Metro-1-inbound/">again</a>"#;
        MapFetch(HashMap::from([
            ("http://www.translink.co.uk/index-1/".to_string(), index.to_string()),
            (ROUTE_1.to_string(), route_page("1", &["X", "Y"])),
            (ROUTE_2.to_string(), route_page("2", &["Z"])),
        ]))
    }

    #[test]
    fn discovery_skips_missing_index_and_deduplicates() {
        let mut summary = ScrapeSummary::default();
        let urls = discover_route_urls(&site(), &operator(), &mut summary);
        assert_eq!(urls.into_iter().collect::<Vec<_>>(), [ROUTE_1, ROUTE_2]);
        assert_eq!(summary.index_pages, 2);
        assert_eq!(summary.index_pages_skipped, 1);
    }

    #[test]
    fn scrape_visits_routes_in_order() {
        let (records, summary) = scrape(&site(), &operator()).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.stop_name.as_str()).collect();
        assert_eq!(names, ["X", "Y", "Z"]);
        assert_eq!(records[0].route_id, "translinkni-metro-1-inbound");
        assert_eq!(records[2].route_id, "translinkni-metro-2-outbound");
        assert_eq!(summary.records, 3);
        assert_eq!(summary.route_pages, 2);
    }

    #[test]
    fn unavailable_route_page_is_skipped() {
        let mut site = site();
        site.0.remove(ROUTE_2);
        let (records, summary) = scrape(&site, &operator()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(summary.route_pages_skipped, 1);
    }

    #[test]
    fn malformed_page_aborts_without_writing() {
        let mut site = site();
        site.0.insert(ROUTE_2.to_string(), "<html><body>maintenance</body></html>".to_string());
        let dir = tempdir().unwrap();
        let path = dir.path().join("raw.csv");

        let err = scrape_to_raw_store(&site, &operator(), &path).unwrap_err();
        assert!(matches!(err, ScrapeError::MissingElement { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn delimiter_in_service_keeps_previous_store() {
        let mut site = site();
        site.0.insert(ROUTE_2.to_string(), route_page("2#X", &["Z"]));
        let dir = tempdir().unwrap();
        let path = dir.path().join("raw.csv");
        std::fs::write(&path, "previous store").unwrap();

        let err = scrape_to_raw_store(&site, &operator(), &path).unwrap_err();
        assert!(matches!(err, ScrapeError::DelimiterCollision { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous store");
    }

    #[test]
    fn raw_store_round_trips_scraped_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("raw.csv");
        let summary = scrape_to_raw_store(&site(), &operator(), &path).unwrap();

        let stored = raw::read_raw_store(&path).unwrap();
        assert_eq!(stored.len(), summary.records);
        assert_eq!(stored, scrape(&site(), &operator()).unwrap().0);
    }
}
