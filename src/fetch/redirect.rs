//! GET with manual redirect handling and gzip decoding.
//!
//! Every hop is validated before it is requested: only `http`/`https`, a
//! host, and a port from the allowlist. Request headers that describe the
//! previous hop are dropped before resending.

use std::io::Read;

use flate2::read::GzDecoder;
use reqwest::Url;
use reqwest::header::{CONTENT_ENCODING, HeaderMap, LOCATION};
use tracing::debug;

use super::FetchError;
use super::client::{HttpClient, HttpRequest, HttpResponse};

pub const MAX_REDIRECTS: usize = 3;

const REDIRECT_STATUSES: [u16; 4] = [301, 302, 303, 307];

const UNTRUSTED_REQUEST_HEADERS: [&str; 5] =
    ["content-length", "host", "vary", "via", "x-forwarded-for"];

/// Ports a request may target. `None` is the scheme default.
pub fn is_allowed_port(port: Option<u16>) -> bool {
    match port {
        None => true,
        Some(port) => {
            (80..=90).contains(&port) || (440..=450).contains(&port) || port >= 1024
        }
    }
}

/// Parses a fetch target, assuming `http://` when no scheme is given.
pub fn parse_target(url: &str) -> Result<Url, FetchError> {
    let url = if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{url}")
    };
    Url::parse(&url).map_err(|e| FetchError::InvalidUrl {
        reason: e.to_string(),
        url,
    })
}

fn check_target(url: &Url) -> Result<(), FetchError> {
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(FetchError::InvalidProtocol {
                url: url.to_string(),
                protocol: other.to_string(),
            });
        }
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(FetchError::MissingHost {
            url: url.to_string(),
        });
    }
    if !is_allowed_port(url.port()) {
        return Err(FetchError::PortNotAllowed {
            url: url.to_string(),
            port: url.port().unwrap_or_default(),
        });
    }
    Ok(())
}

fn decode_body(mut response: HttpResponse) -> Result<HttpResponse, FetchError> {
    let gzipped = response
        .header(CONTENT_ENCODING.as_str())
        .is_some_and(|encoding| encoding.eq_ignore_ascii_case("gzip"));
    if response.status == 200 && gzipped {
        let mut body = Vec::new();
        GzDecoder::new(response.body.as_slice()).read_to_end(&mut body)?;
        response.body = body;
        response.headers.remove(CONTENT_ENCODING);
    }
    Ok(response)
}

/// Performs a GET, following up to [`MAX_REDIRECTS`] redirects.
///
/// The final response is returned whatever its status; callers decide what
/// a non-200 answer means.
pub fn get<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    mut headers: HeaderMap,
) -> Result<HttpResponse, FetchError> {
    let mut url = parse_target(url)?;
    for hop in 0..=MAX_REDIRECTS {
        check_target(&url)?;
        debug!(%url, hop, "GET");
        let response = client.execute(&HttpRequest {
            url: url.clone(),
            headers: headers.clone(),
        })?;

        if !REDIRECT_STATUSES.contains(&response.status) {
            return decode_body(response);
        }

        let location = response
            .header(LOCATION.as_str())
            .ok_or_else(|| FetchError::MissingLocation {
                url: url.to_string(),
            })?;
        url = url.join(location).map_err(|e| FetchError::InvalidUrl {
            url: location.to_string(),
            reason: e.to_string(),
        })?;
        for name in UNTRUSTED_REQUEST_HEADERS {
            headers.remove(name);
        }
    }
    Err(FetchError::TooManyRedirects {
        url: url.to_string(),
    })
}
