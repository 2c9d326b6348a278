use std::time::Duration;

use super::FetchError;
use super::client::{HttpClient, HttpRequest, HttpResponse};

/// Upper bound on a single request, connection included.
pub const FETCH_DEADLINE: Duration = Duration::from_secs(25);

/// Blocking reqwest transport. Redirects and content decoding are left to
/// the caller.
pub struct BasicClient(reqwest::blocking::Client);

impl BasicClient {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(FETCH_DEADLINE)
            .build()?;
        Ok(Self(client))
    }
}

impl HttpClient for BasicClient {
    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, FetchError> {
        let resp = self
            .0
            .get(req.url.clone())
            .headers(req.headers.clone())
            .send()?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp.bytes()?.to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
