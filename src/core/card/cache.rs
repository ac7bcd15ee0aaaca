use crate::utils::error::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tokio::time::Instant;

const ETAG_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

#[derive(Debug, Clone)]
pub struct CachedImage {
    pub bytes: Arc<Vec<u8>>,
    pub etag: String,
    generated_at: Instant,
}

/// One-slot cache for a generated image; regenerates once the entry is older than `ttl`.
#[derive(Debug)]
pub struct ImageCache {
    ttl: Duration,
    slot: Mutex<Option<CachedImage>>,
}

impl ImageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn cache_control(&self) -> String {
        format!("public, max-age={}", self.ttl.as_secs())
    }

    /// Returns the cached image or runs `generate`. The slot stays locked while
    /// generating, so concurrent callers share one regeneration. A failed
    /// generation keeps the previous entry.
    pub async fn get_or_generate<F, Fut>(&self, generate: F) -> Result<CachedImage>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(entry) = slot.as_ref() {
            if entry.generated_at.elapsed() <= self.ttl {
                return Ok(entry.clone());
            }
        }

        let bytes = generate().await?;
        let entry = CachedImage {
            bytes: Arc::new(bytes),
            etag: weak_etag(SystemTime::now()),
            generated_at: Instant::now(),
        };
        tracing::debug!("Cached new image {} ({} bytes)", entry.etag, entry.bytes.len());
        *slot = Some(entry.clone());
        Ok(entry)
    }
}

/// `W/"<unix-ms>-<8 random [0-9a-z]>"`
pub fn weak_etag(at: SystemTime) -> String {
    let millis = at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("W/\"{}-{}\"", millis, nanoid::nanoid!(8, &ETAG_ALPHABET))
}

/// Evaluates an `If-None-Match` header value against the current tag.
pub fn etag_matches(if_none_match: Option<&str>, etag: &str) -> bool {
    let Some(header) = if_none_match else {
        return false;
    };
    header
        .split(',')
        .map(str::trim)
        .any(|candidate| candidate == "*" || candidate == etag)
}
