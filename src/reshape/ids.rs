//! Deterministic identifiers for stops and trips.

use unidecode::unidecode;

/// URL-safe slug: transliterated to ASCII, lowercased, anything other than
/// word characters, whitespace and hyphens dropped, and runs of whitespace
/// or hyphens collapsed into one `-`.
pub fn slugify(text: &str) -> String {
    let ascii = unidecode(text);
    let kept: String = ascii
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_ascii_whitespace())
        .collect();

    let mut slug = String::with_capacity(kept.len());
    let mut separator = false;
    for c in kept.trim().chars() {
        if c == '-' || c.is_ascii_whitespace() {
            separator = true;
            continue;
        }
        if separator {
            slug.push('-');
            separator = false;
        }
        slug.push(c.to_ascii_lowercase());
    }
    if separator {
        slug.push('-');
    }
    slug
}

/// Slug of the parts joined by single spaces.
pub fn make_id(parts: &[&str]) -> String {
    slugify(&parts.join(" "))
}

pub fn stop_id(agency_id: &str, stop_name: &str, direction: Option<u8>) -> String {
    let direction = direction.map(|d| d.to_string()).unwrap_or_default();
    make_id(&[agency_id, stop_name, &direction])
}

pub fn trip_id(route_id: &str, weekday: usize, trip_number: u32) -> String {
    make_id(&[route_id, &weekday.to_string(), &format!("{trip_number:03}")])
}
