use crate::domain::model::PresenceSnapshot;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Raw bytes of a remote image together with its declared MIME type.
#[derive(Debug, Clone)]
pub struct FetchedAsset {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait PresenceSource: Send + Sync {
    async fn snapshot(&self) -> Result<PresenceSnapshot>;
}

#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedAsset>;
}
