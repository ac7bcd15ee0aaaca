pub mod assets;
pub mod cache;
pub mod render;
pub mod svg;

use crate::config::toml_config::ProfileConfig;
use crate::domain::model::DiscordUser;
use crate::domain::ports::{AssetFetcher, PresenceSource};
use crate::utils::error::Result;
use assets::AssetCache;
use cache::{CachedImage, ImageCache};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use render::CardRenderer;
use std::sync::Arc;
use std::time::Duration;

/// Avatar PNG URL for a user, falling back to the default avatar when no hash is set.
pub fn avatar_url(cdn_base: &str, user: &DiscordUser) -> String {
    let cdn_base = cdn_base.trim_end_matches('/');
    match user.avatar.as_deref().filter(|hash| !hash.is_empty()) {
        Some(hash) => format!("{}/avatars/{}/{}.png?size=1024", cdn_base, user.id, hash),
        None => format!("{}/embed/avatars/0.png", cdn_base),
    }
}

/// Generates the profile card and avatar images behind their timed caches.
pub struct CardService {
    profile: ProfileConfig,
    cdn_base: String,
    presence: Arc<dyn PresenceSource>,
    fetcher: Arc<dyn AssetFetcher>,
    assets: AssetCache,
    renderer: Arc<CardRenderer>,
    embed_cache: ImageCache,
    avatar_cache: ImageCache,
}

impl CardService {
    pub fn new(
        profile: ProfileConfig,
        cdn_base: String,
        presence: Arc<dyn PresenceSource>,
        fetcher: Arc<dyn AssetFetcher>,
        renderer: Arc<CardRenderer>,
        ttl: Duration,
    ) -> Self {
        Self {
            profile,
            cdn_base,
            presence,
            assets: AssetCache::new(Arc::clone(&fetcher)),
            fetcher,
            renderer,
            embed_cache: ImageCache::new(ttl),
            avatar_cache: ImageCache::new(ttl),
        }
    }

    pub fn cache_control(&self) -> String {
        self.embed_cache.cache_control()
    }

    pub async fn embed(&self) -> Result<CachedImage> {
        self.embed_cache
            .get_or_generate(|| async {
                let svg = self.build_svg(Utc::now()).await?;
                self.renderer.render_png_blocking(svg).await
            })
            .await
    }

    pub async fn avatar(&self) -> Result<CachedImage> {
        self.avatar_cache
            .get_or_generate(|| async {
                let snapshot = self.presence.snapshot().await?;
                let url = avatar_url(&self.cdn_base, &snapshot.discord_user);
                let asset = self.fetcher.fetch(&url).await?;
                Ok(asset.bytes)
            })
            .await
    }

    /// Assembles the card SVG. Only the avatar is required; activity and skill
    /// images are dropped when their hosts fail.
    pub async fn build_svg(&self, now: DateTime<Utc>) -> Result<String> {
        let snapshot = self.presence.snapshot().await?;

        let avatar_uri = self
            .assets
            .data_uri(&avatar_url(&self.cdn_base, &snapshot.discord_user))
            .await?;

        let activity_image = match snapshot
            .regular_activities()
            .next()
            .and_then(|a| a.large_image())
        {
            Some(url) => self.assets.optional_data_uri(url).await,
            None => None,
        };

        let skill_icons: Vec<String> = join_all(
            self.profile
                .skills
                .iter()
                .take(svg::MAX_SKILLS)
                .map(|skill| self.assets.optional_data_uri(&skill.icon)),
        )
        .await
        .into_iter()
        .flatten()
        .collect();

        let content = svg::CardContent {
            profile: &self.profile,
            snapshot: &snapshot,
            avatar_uri: &avatar_uri,
            activity_image: activity_image.as_deref(),
            skill_icons: &skill_icons,
            now,
        };
        Ok(svg::render_profile_card(&content))
    }
}
