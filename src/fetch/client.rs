use reqwest::Url;
use reqwest::header::HeaderMap;

use super::FetchError;

/// A single GET request as handed to the transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: Url,
    pub headers: HeaderMap,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Transport that performs exactly one request and never follows redirects.
pub trait HttpClient {
    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, FetchError>;
}

impl<C: HttpClient + ?Sized> HttpClient for &C {
    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, FetchError> {
        (**self).execute(req)
    }
}
