use crate::config::toml_config::PresenceConfig;
use crate::core::presence::protocol::normalize_activity_assets;
use crate::core::presence::store::PresenceStore;
use crate::domain::model::PresenceSnapshot;
use crate::domain::ports::PresenceSource;
use crate::utils::error::{FolioError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    data: Option<PresenceSnapshot>,
}

/// HTTP side of the presence relay: one-shot snapshot lookups.
#[derive(Debug, Clone)]
pub struct PresenceApi {
    client: Client,
    http_base: String,
    cdn_base: String,
    discord_id: String,
}

impl PresenceApi {
    pub fn new(config: &PresenceConfig, discord_id: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;
        Ok(Self::with_client(client, config, discord_id))
    }

    pub fn with_client(client: Client, config: &PresenceConfig, discord_id: &str) -> Self {
        Self {
            client,
            http_base: config.http_base.trim_end_matches('/').to_string(),
            cdn_base: config.cdn_base.clone(),
            discord_id: discord_id.to_string(),
        }
    }

    pub fn discord_id(&self) -> &str {
        &self.discord_id
    }

    pub async fn fetch_snapshot(&self) -> Result<PresenceSnapshot> {
        let url = format!("{}/v1/users/{}", self.http_base, self.discord_id);
        tracing::debug!("Fetching presence snapshot from {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FolioError::UpstreamStatus {
                service: "presence relay".to_string(),
                status: status.as_u16(),
            });
        }

        let envelope: Envelope = response.json().await?;
        let mut snapshot = match envelope {
            Envelope {
                success: true,
                data: Some(data),
            } => data,
            _ => {
                return Err(FolioError::UpstreamStatus {
                    service: "presence relay (unsuccessful envelope)".to_string(),
                    status: status.as_u16(),
                })
            }
        };

        normalize_activity_assets(&mut snapshot, &self.cdn_base);
        Ok(snapshot)
    }
}

/// Serves the socket's snapshot while a session is live, otherwise asks the
/// relay over HTTP on every call.
#[derive(Debug, Clone)]
pub struct PresenceService {
    api: PresenceApi,
    store: PresenceStore,
}

impl PresenceService {
    pub fn new(api: PresenceApi, store: PresenceStore) -> Self {
        Self { api, store }
    }

    pub fn store(&self) -> &PresenceStore {
        &self.store
    }
}

#[async_trait]
impl PresenceSource for PresenceService {
    async fn snapshot(&self) -> Result<PresenceSnapshot> {
        if let Some(snapshot) = self.store.live_snapshot() {
            return Ok(snapshot);
        }

        let snapshot = self.api.fetch_snapshot().await?;
        self.store.update(snapshot.clone());
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn config_for(server: &MockServer) -> PresenceConfig {
        PresenceConfig {
            http_base: server.base_url(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_snapshot_normalizes_assets() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v1/users/42");
            then.status(200).json_body(serde_json::json!({
                "success": true,
                "data": {
                    "discord_user": {"id": "42", "username": "owner", "avatar": "abc"},
                    "discord_status": "online",
                    "activities": [{
                        "type": 0,
                        "name": "Code",
                        "application_id": "7",
                        "assets": {"large_image": "logo"}
                    }]
                }
            }));
        });

        let api = PresenceApi::new(&config_for(&server), "42").unwrap();
        let snapshot = api.fetch_snapshot().await.unwrap();

        mock.assert();
        assert_eq!(snapshot.discord_status, "online");
        assert_eq!(
            snapshot.activities[0].large_image(),
            Some("https://cdn.discordapp.com/app-assets/7/logo.png")
        );
    }

    #[tokio::test]
    async fn test_fetch_snapshot_rejects_unsuccessful_envelope() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/users/42");
            then.status(200)
                .json_body(serde_json::json!({"success": false, "error": {"code": "user_not_monitored"}}));
        });

        let api = PresenceApi::new(&config_for(&server), "42").unwrap();
        let err = api.fetch_snapshot().await.unwrap_err();
        assert!(matches!(err, FolioError::UpstreamStatus { .. }));
    }

    #[tokio::test]
    async fn test_service_prefers_store_over_http() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v1/users/42");
            then.status(500);
        });

        let store = PresenceStore::new();
        store.update(PresenceSnapshot {
            discord_status: "idle".to_string(),
            ..Default::default()
        });
        store.set_live(true);
        let api = PresenceApi::new(&config_for(&server), "42").unwrap();
        let service = PresenceService::new(api, store);

        let snapshot = service.snapshot().await.unwrap();
        assert_eq!(snapshot.discord_status, "idle");
        mock.assert_hits(0);
    }

    #[tokio::test]
    async fn test_service_refetches_while_no_session_is_live() {
        let server = MockServer::start();
        let mut online = server.mock(|when, then| {
            when.method(GET).path("/v1/users/42");
            then.status(200).json_body(serde_json::json!({
                "success": true,
                "data": {"discord_user": {"id": "42"}, "discord_status": "online"}
            }));
        });

        let api = PresenceApi::new(&config_for(&server), "42").unwrap();
        let service = PresenceService::new(api, PresenceStore::new());
        assert_eq!(service.snapshot().await.unwrap().discord_status, "online");

        online.delete();
        let dnd = server.mock(|when, then| {
            when.method(GET).path("/v1/users/42");
            then.status(200).json_body(serde_json::json!({
                "success": true,
                "data": {"discord_user": {"id": "42"}, "discord_status": "dnd"}
            }));
        });

        assert_eq!(service.snapshot().await.unwrap().discord_status, "dnd");
        dnd.assert_hits(1);
        assert_eq!(service.store().current().unwrap().discord_status, "dnd");
    }

    #[tokio::test]
    async fn test_service_falls_back_to_http_and_seeds_store() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/users/42");
            then.status(200).json_body(serde_json::json!({
                "success": true,
                "data": {"discord_user": {"id": "42"}, "discord_status": "dnd"}
            }));
        });

        let api = PresenceApi::new(&config_for(&server), "42").unwrap();
        let service = PresenceService::new(api, PresenceStore::new());

        let snapshot = service.snapshot().await.unwrap();
        assert_eq!(snapshot.discord_status, "dnd");
        assert_eq!(service.store().current().unwrap().discord_status, "dnd");
    }
}
