use crate::domain::ports::{AssetFetcher, FetchedAsset};
use crate::utils::error::{FolioError, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct HttpAssetFetcher {
    client: Client,
}

impl HttpAssetFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedAsset> {
        tracing::debug!("Fetching asset {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FolioError::UpstreamStatus {
                service: format!("asset host ({})", url),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();

        Ok(FetchedAsset {
            content_type,
            bytes,
        })
    }
}

/// Memoizes remote images as `data:` URIs so they can be inlined into SVG.
pub struct AssetCache {
    fetcher: Arc<dyn AssetFetcher>,
    entries: Mutex<HashMap<String, String>>,
}

impl AssetCache {
    pub fn new(fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self {
            fetcher,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn data_uri(&self, url: &str) -> Result<String> {
        if let Some(hit) = self.entries.lock().await.get(url) {
            return Ok(hit.clone());
        }

        let asset = self.fetcher.fetch(url).await?;
        let uri = to_data_uri(&asset);
        self.entries
            .lock()
            .await
            .insert(url.to_string(), uri.clone());
        Ok(uri)
    }

    /// Like [`data_uri`](Self::data_uri) but logs and swallows failures.
    pub async fn optional_data_uri(&self, url: &str) -> Option<String> {
        match self.data_uri(url).await {
            Ok(uri) => Some(uri),
            Err(e) => {
                tracing::warn!("Skipping image {}: {}", url, e);
                None
            }
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

pub fn to_data_uri(asset: &FetchedAsset) -> String {
    let declared = asset
        .content_type
        .as_deref()
        .and_then(|ct| ct.split(';').next())
        .map(str::trim)
        .filter(|ct| ct.starts_with("image/"));
    let mime = declared.unwrap_or_else(|| sniff_mime(&asset.bytes));
    format!("data:{};base64,{}", mime, STANDARD.encode(&asset.bytes))
}

/// Raw hosts often serve SVG as `text/plain`, so fall back to magic bytes.
fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]);
        let head = head.trim_start();
        if head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")) {
            "image/svg+xml"
        } else {
            "application/octet-stream"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFetcher {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl AssetFetcher for CountingFetcher {
        async fn fetch(&self, _url: &str) -> Result<FetchedAsset> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FolioError::UpstreamStatus {
                    service: "asset host".to_string(),
                    status: 404,
                });
            }
            Ok(FetchedAsset {
                content_type: Some("image/png".to_string()),
                bytes: vec![1, 2, 3],
            })
        }
    }

    #[tokio::test]
    async fn test_data_uri_is_memoized() {
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let cache = AssetCache::new(fetcher.clone());

        let first = cache.data_uri("https://cdn.example/a.png").await.unwrap();
        let second = cache.data_uri("https://cdn.example/a.png").await.unwrap();

        assert_eq!(first, "data:image/png;base64,AQID");
        assert_eq!(first, second);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let cache = AssetCache::new(fetcher.clone());

        assert!(cache.data_uri("https://cdn.example/missing.png").await.is_err());
        assert!(cache
            .optional_data_uri("https://cdn.example/missing.png")
            .await
            .is_none());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 0);
    }

    #[test]
    fn test_mime_falls_back_to_sniffing() {
        let svg = FetchedAsset {
            content_type: Some("text/plain; charset=utf-8".to_string()),
            bytes: b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>".to_vec(),
        };
        assert!(to_data_uri(&svg).starts_with("data:image/svg+xml;base64,"));

        let png = FetchedAsset {
            content_type: None,
            bytes: b"\x89PNG\r\n\x1a\nrest".to_vec(),
        };
        assert!(to_data_uri(&png).starts_with("data:image/png;base64,"));

        let unknown = FetchedAsset {
            content_type: None,
            bytes: vec![0, 0, 0],
        };
        assert!(to_data_uri(&unknown).starts_with("data:application/octet-stream;base64,"));
    }

    #[tokio::test]
    async fn test_http_fetcher_reports_status() {
        use httpmock::prelude::*;

        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/icon.svg");
            then.status(200)
                .header("Content-Type", "image/svg+xml")
                .body("<svg/>");
        });
        server.mock(|when, then| {
            when.method(GET).path("/gone.png");
            then.status(404);
        });

        let fetcher = HttpAssetFetcher::new(Client::new());
        let asset = fetcher.fetch(&server.url("/icon.svg")).await.unwrap();
        assert_eq!(asset.content_type.as_deref(), Some("image/svg+xml"));
        assert_eq!(asset.bytes, b"<svg/>");

        let err = fetcher.fetch(&server.url("/gone.png")).await.unwrap_err();
        assert!(matches!(err, FolioError::UpstreamStatus { status: 404, .. }));
    }
}
