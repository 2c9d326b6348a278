//! Disk cache for fetched pages.
//!
//! Layout: `<root>/<host[:port]>/<form-urlencoded url>`, one file per URL
//! holding the raw response body. Freshness comes from the file's
//! modification time. Names longer than `MAX_NAME_LEN` are cut and given a
//! hash suffix so they stay under the usual 255-byte file name limit.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use reqwest::Url;
use url::form_urlencoded;

use super::FetchError;

/// Default time-to-live: 30 days.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600 * 24 * 30);

/// Longest encoded URL kept verbatim as a file name. A capped name is this
/// prefix, `-` and 16 hex digits; the `.part` sibling adds 5 more bytes.
pub const MAX_NAME_LEN: usize = 200;

#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
    ttl: Duration,
}

impl DiskCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn path_for(&self, url: &Url) -> PathBuf {
        let host = url.host_str().unwrap_or_default();
        let netloc = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let mut name: String = form_urlencoded::byte_serialize(url.as_str().as_bytes()).collect();
        if name.len() > MAX_NAME_LEN {
            // the encoded name is ASCII, so any byte index is a char boundary
            name.truncate(MAX_NAME_LEN);
            name.push_str(&format!("-{:016x}", fnv1a(url.as_str().as_bytes())));
        }
        self.root.join(netloc).join(name)
    }

    /// True if an entry exists at `path` and is younger than the TTL.
    pub fn is_fresh(&self, path: &Path) -> bool {
        let Ok(modified) = fs::metadata(path).and_then(|meta| meta.modified()) else {
            return false;
        };
        match SystemTime::now().duration_since(modified) {
            Ok(age) => age < self.ttl,
            // modified in the future
            Err(_) => true,
        }
    }

    /// Writes `body` to `path` via a temporary sibling and a rename.
    pub fn store(&self, path: &Path, body: &[u8]) -> io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut partial = path.as_os_str().to_owned();
        partial.push(".part");
        let partial = PathBuf::from(partial);
        fs::write(&partial, body)?;
        fs::rename(&partial, path)
    }

    pub fn read(&self, path: &Path) -> Result<Vec<u8>, FetchError> {
        if !path.exists() {
            return Err(FetchError::MissingCacheEntry {
                path: path.to_path_buf(),
            });
        }
        Ok(fs::read(path)?)
    }
}

/// 64-bit FNV-1a. Stable across runs and platforms, unlike `DefaultHasher`.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}
