//! Cache-aware page fetching.
//!
//! [`CachedFetcher`] serves a URL from the disk cache while the entry is
//! younger than the TTL and goes to the network otherwise. A successful
//! fetch always leaves a cache entry behind; the body returned is read back
//! from that entry.

mod basic;
pub mod cache;
mod client;
mod error;
pub mod redirect;
pub mod retry;
#[cfg(test)]
pub(crate) mod testing;

pub use basic::{BasicClient, FETCH_DEADLINE};
pub use cache::DiskCache;
pub use client::{HttpClient, HttpRequest, HttpResponse};
pub use error::FetchError;
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};

use reqwest::header::{ACCEPT_ENCODING, HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, info, warn};

/// Length of the body excerpt carried by [`FetchError::Status`].
const EXCERPT_CHARS: usize = 200;

/// Source of page text for the scraper.
pub trait Fetch {
    fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

pub struct CachedFetcher<C, S = ThreadSleeper> {
    client: C,
    cache: DiskCache,
    user_agent: HeaderValue,
    retry: RetryPolicy<S>,
}

impl<C: HttpClient> CachedFetcher<C> {
    pub fn new(client: C, cache: DiskCache, user_agent: &str) -> Result<Self, FetchError> {
        Ok(Self {
            client,
            cache,
            user_agent: HeaderValue::from_str(user_agent)?,
            retry: RetryPolicy::none(),
        })
    }
}

impl<C: HttpClient, S: Sleeper> CachedFetcher<C, S> {
    /// Retry policy used by [`Fetch::fetch_text`].
    pub fn with_retry<T: Sleeper>(self, retry: RetryPolicy<T>) -> CachedFetcher<C, T> {
        CachedFetcher {
            client: self.client,
            cache: self.cache,
            user_agent: self.user_agent,
            retry,
        }
    }

    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    fn request_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, self.user_agent.clone());
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
        headers
    }

    /// Returns the body for `url`, from cache when fresh.
    #[tracing::instrument(skip(self))]
    pub fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let target = redirect::parse_target(url)?;
        let path = self.cache.path_for(&target);

        if self.cache.is_fresh(&path) {
            debug!(path = %path.display(), "Cache hit");
        } else {
            let response = redirect::get(&self.client, target.as_str(), self.request_headers())?;
            match response.status {
                200 => {
                    self.cache.store(&path, &response.body)?;
                    info!(bytes = response.body.len(), "Fetched and cached");
                }
                status if status >= 400 => {
                    let excerpt = String::from_utf8_lossy(&response.body)
                        .chars()
                        .take(EXCERPT_CHARS)
                        .collect();
                    return Err(FetchError::Status {
                        status,
                        url: url.to_string(),
                        excerpt,
                    });
                }
                status => warn!(status, "Unexpected status, nothing cached"),
            }
        }

        self.cache.read(&path)
    }

    /// [`fetch`](Self::fetch) under an explicit retry policy.
    pub fn fetch_with_retry<T: Sleeper>(
        &self,
        url: &str,
        policy: &RetryPolicy<T>,
    ) -> Result<Vec<u8>, FetchError> {
        policy.run(|| self.fetch(url))
    }
}

impl<C: HttpClient, S: Sleeper> Fetch for CachedFetcher<C, S> {
    fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let body = self.fetch_with_retry(url, &self.retry)?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;
    use tempfile::tempdir;
    use super::testing::{ScriptedClient, response};

    const URL: &str = "http://www.example.test/Metro/Metro-1A-inbound/";

    fn fetcher<'a>(
        client: &'a ScriptedClient,
        root: &std::path::Path,
    ) -> CachedFetcher<&'a ScriptedClient> {
        CachedFetcher::new(client, DiskCache::new(root), "test-agent").unwrap()
    }

    #[derive(Default)]
    struct CountingSleeper(Cell<usize>);

    impl Sleeper for CountingSleeper {
        fn sleep(&self, _: Duration) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn fresh_cache_entry_skips_network() {
        let dir = tempdir().unwrap();
        let client = ScriptedClient::new(vec![]);
        let fetcher = fetcher(&client, dir.path());
        let path = fetcher.cache().path_for(&redirect::parse_target(URL).unwrap());
        fetcher.cache().store(&path, b"cached page").unwrap();

        assert_eq!(fetcher.fetch(URL).unwrap(), b"cached page");
        assert_eq!(client.calls(), 0);
    }

    #[test]
    fn miss_fetches_once_then_serves_from_cache() {
        let dir = tempdir().unwrap();
        let client = ScriptedClient::new(vec![response(200, "<html>live</html>")]);
        let fetcher = fetcher(&client, dir.path());

        assert_eq!(fetcher.fetch(URL).unwrap(), b"<html>live</html>");
        assert_eq!(fetcher.fetch(URL).unwrap(), b"<html>live</html>");
        assert_eq!(client.calls(), 1);

        let request = &client.requests()[0];
        assert_eq!(request.headers[USER_AGENT], "test-agent");
        assert_eq!(request.headers[ACCEPT_ENCODING], "gzip");
        assert!(dir.path().join("www.example.test").is_dir());
    }

    #[test]
    fn expired_entry_is_refetched() {
        let dir = tempdir().unwrap();
        let client = ScriptedClient::new(vec![response(200, "new")]);
        let fetcher = CachedFetcher::new(
            &client,
            DiskCache::new(dir.path()).with_ttl(Duration::ZERO),
            "test-agent",
        )
        .unwrap();
        let path = fetcher.cache().path_for(&redirect::parse_target(URL).unwrap());
        fetcher.cache().store(&path, b"old").unwrap();

        assert_eq!(fetcher.fetch(URL).unwrap(), b"new");
        assert_eq!(client.calls(), 1);
    }

    #[test]
    fn not_found_leaves_no_cache_entry() {
        let dir = tempdir().unwrap();
        let client = ScriptedClient::new(vec![response(404, "Page not found")]);
        let fetcher = fetcher(&client, dir.path());

        let err = fetcher.fetch(URL).unwrap_err();
        match err {
            FetchError::Status {
                status, excerpt, ..
            } => {
                assert_eq!(status, 404);
                assert_eq!(excerpt, "Page not found");
            }
            other => panic!("unexpected error: {other}"),
        }
        let path = fetcher.cache().path_for(&redirect::parse_target(URL).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn status_excerpt_is_truncated() {
        let dir = tempdir().unwrap();
        let body = "x".repeat(500);
        let client = ScriptedClient::new(vec![response(500, &body)]);
        let fetcher = fetcher(&client, dir.path());

        let FetchError::Status { excerpt, .. } = fetcher.fetch(URL).unwrap_err() else {
            panic!("expected status error");
        };
        assert_eq!(excerpt.len(), EXCERPT_CHARS);
    }

    #[test]
    fn success_without_body_is_missing_cache_entry() {
        let dir = tempdir().unwrap();
        let client = ScriptedClient::new(vec![response(204, "")]);
        let fetcher = fetcher(&client, dir.path());

        let err = fetcher.fetch(URL).unwrap_err();
        assert!(matches!(err, FetchError::MissingCacheEntry { .. }));
    }

    #[test]
    fn fetch_text_retries_transient_failures() {
        let dir = tempdir().unwrap();
        let client = ScriptedClient::new(vec![
            response(503, "busy"),
            response(200, "<p>ok</p>"),
        ]);
        let sleeper = CountingSleeper::default();
        let fetcher = fetcher(&client, dir.path())
            .with_retry(RetryPolicy::new(2, Duration::from_secs(1)).with_sleeper(&sleeper));

        assert_eq!(fetcher.fetch_text(URL).unwrap(), "<p>ok</p>");
        assert_eq!(client.calls(), 2);
        assert_eq!(sleeper.0.get(), 1);
    }

    #[test]
    fn fetch_with_retry_gives_up() {
        let dir = tempdir().unwrap();
        let client = ScriptedClient::new(vec![]);
        let sleeper = CountingSleeper::default();
        let fetcher = fetcher(&client, dir.path());
        let policy = RetryPolicy::new(2, Duration::from_secs(1)).with_sleeper(&sleeper);

        assert!(fetcher.fetch_with_retry(URL, &policy).is_err());
        assert_eq!(client.calls(), 3);
        assert_eq!(sleeper.0.get(), 2);
    }
}
