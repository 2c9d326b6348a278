//! Operator profile: where the timetables live and how the feed names things.

use std::collections::HashMap;
use std::sync::LazyLock;

const TRANSLINK_URL: &str = "http://www.translink.co.uk";

/// Route type for buses.
pub const BUS_ROUTE_TYPE: u8 = 3;

static DIRECTION_CODES: LazyLock<HashMap<&'static str, u8>> =
    LazyLock::new(|| HashMap::from([("outbound", 0), ("inbound", 1)]));

/// Direction id for a direction name, case-insensitive.
pub fn direction_code(direction: &str) -> Option<u8> {
    DIRECTION_CODES.get(direction.to_lowercase().as_str()).copied()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub base_url: String,
    /// Listing pages that link to the individual route pages.
    pub index_urls: Vec<String>,
    pub route_path_prefix: String,
    pub route_path_suffix: String,
    pub agency_id: String,
    pub agency_name: String,
    pub agency_url: String,
    pub agency_timezone: String,
    pub agency_lang: String,
    /// Prefix of service and route ids.
    pub network_id: String,
    pub route_type: u8,
}

impl Operator {
    pub fn translink_metro() -> Self {
        let agency_id = "translinkni".to_string();
        let index_urls = (1..=12)
            .map(|i| i.to_string())
            .chain(std::iter::once("910".to_string()))
            .map(|i| format!("{TRANSLINK_URL}/Metro/Metro-Timetables/Metro-{i}-Timetables/"))
            .collect();
        Self {
            base_url: TRANSLINK_URL.to_string(),
            index_urls,
            route_path_prefix: "/Metro/Metro-Timetables/Metro-".to_string(),
            route_path_suffix: "bound/".to_string(),
            network_id: format!("{agency_id}-metro"),
            agency_id,
            agency_name: "Translink N.I.".to_string(),
            agency_url: TRANSLINK_URL.to_string(),
            agency_timezone: "Europe/London".to_string(),
            agency_lang: "en".to_string(),
            route_type: BUS_ROUTE_TYPE,
        }
    }

    /// Whether an index-page link points at a route timetable.
    pub fn is_route_link(&self, href: &str) -> bool {
        href.starts_with(&self.route_path_prefix) && href.ends_with(&self.route_path_suffix)
    }

    pub fn route_page_url(&self, href: &str) -> String {
        format!("{}{href}", self.base_url)
    }

    /// File name of the raw store written between scrape and reshape.
    pub fn raw_store_name(&self) -> String {
        format!("{}-raw.csv", self.agency_id)
    }
}

impl Default for Operator {
    fn default() -> Self {
        Self::translink_metro()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metro_index_pages() {
        let operator = Operator::translink_metro();
        assert_eq!(operator.index_urls.len(), 13);
        assert_eq!(
            operator.index_urls[0],
            "http://www.translink.co.uk/Metro/Metro-Timetables/Metro-1-Timetables/"
        );
        assert!(operator.index_urls[12].contains("Metro-910-Timetables"));
        assert_eq!(operator.network_id, "translinkni-metro");
    }

    #[test]
    fn route_links() {
        let operator = Operator::translink_metro();
        assert!(operator.is_route_link("/Metro/Metro-Timetables/Metro-1-Timetables/Metro-1A-inbound/"));
        assert!(!operator.is_route_link("/Metro/Metro-Timetables/Metro-1-Timetables/"));
        assert!(!operator.is_route_link("/Ulsterbus/Metro-1A-inbound/"));
    }

    #[test]
    fn direction_codes() {
        assert_eq!(direction_code("Inbound"), Some(1));
        assert_eq!(direction_code("outbound"), Some(0));
        assert_eq!(direction_code("circular"), None);
    }
}
