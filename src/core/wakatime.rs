use crate::config::toml_config::{ProjectConfig, WakaTimeConfig};
use crate::domain::model::{
    ChartData, ChartSegment, ProjectData, ProjectStats, WakaTimeEntry, WakaTimeStats,
};
use crate::utils::error::{FolioError, Result};
use reqwest::Client;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

pub const OTHER_COLOR: &str = "#CCCCCC";
const CHART_LIMIT: usize = 10;

const LANGUAGE_COLORS: &[(&str, &str)] = &[
    ("TypeScript", "#3178C6"),
    ("TSX", "#3178C6"),
    ("JavaScript", "#F7DF1E"),
    ("Python", "#3776AB"),
    ("Svelte", "#FF3E00"),
    ("Rust", "#DEA584"),
    ("Go", "#00ADD8"),
    ("HTML", "#E34F26"),
    ("CSS", "#1572B6"),
    ("JSON", "#292929"),
    ("YAML", "#CB171E"),
    ("Java", "#ED8B00"),
];

pub fn language_color(name: &str) -> &'static str {
    LANGUAGE_COLORS
        .iter()
        .find(|(lang, _)| *lang == name)
        .map(|(_, color)| *color)
        .unwrap_or(OTHER_COLOR)
}

/// `"<h>h <m>m"` above one hour, otherwise `"<m>m"`.
pub fn format_duration(total_seconds: f64) -> String {
    let secs = total_seconds.max(0.0).floor() as u64;
    if secs > 3600 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}m", secs / 60)
    }
}

#[derive(Debug, Clone)]
pub struct WakaTimeClient {
    client: Client,
    endpoint: String,
}

impl WakaTimeClient {
    pub fn new(config: &WakaTimeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub async fn fetch_stats(&self) -> Result<WakaTimeStats> {
        tracing::debug!("Fetching coding stats from {}", self.endpoint);
        let response = self.client.get(&self.endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FolioError::UpstreamStatus {
                service: "time tracker".to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    /// Stats are optional: failures are logged and reported as no data.
    pub async fn fetch_stats_optional(&self) -> Option<WakaTimeStats> {
        match self.fetch_stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                tracing::warn!("Coding stats unavailable: {}", e);
                None
            }
        }
    }
}

/// Looks up each requested project case-insensitively, keyed by the name as given.
pub fn extract_project_stats(
    stats: &WakaTimeStats,
    project_names: &[String],
) -> BTreeMap<String, Option<ProjectStats>> {
    let by_name: HashMap<String, &WakaTimeEntry> = stats
        .data
        .projects
        .iter()
        .map(|p| (p.name.to_lowercase(), p))
        .collect();

    project_names
        .iter()
        .map(|name| {
            let found = by_name.get(&name.to_lowercase()).map(|p| ProjectStats {
                total_seconds: p.total_seconds,
                text: p.text.clone(),
                percent: p.percent,
            });
            (name.clone(), found)
        })
        .collect()
}

pub fn prepare_chart_data(languages: &[WakaTimeEntry]) -> ChartData {
    let mut sorted: Vec<&WakaTimeEntry> = languages.iter().collect();
    sorted.sort_by(|a, b| b.percent.total_cmp(&a.percent));

    let total_seconds: f64 = sorted.iter().map(|l| l.total_seconds).sum();

    let mut segments: Vec<ChartSegment> = sorted
        .iter()
        .take(CHART_LIMIT)
        .map(|lang| ChartSegment {
            name: lang.name.clone(),
            percent: lang.percent,
            color: lang
                .color
                .clone()
                .unwrap_or_else(|| language_color(&lang.name).to_string()),
            text: lang.text.clone(),
            total_seconds: lang.total_seconds,
        })
        .collect();

    if sorted.len() > CHART_LIMIT {
        let rest = &sorted[CHART_LIMIT..];
        let other_seconds: f64 = rest.iter().map(|l| l.total_seconds).sum();
        let other_percent: f64 = rest.iter().map(|l| l.percent).sum();
        segments.push(ChartSegment {
            name: "Other".to_string(),
            percent: other_percent,
            color: OTHER_COLOR.to_string(),
            text: format_duration(other_seconds),
            total_seconds: other_seconds,
        });
    }

    ChartData {
        segments,
        total_time: format_duration(total_seconds),
        total_seconds,
    }
}

/// Joins the configured projects with whatever the tracker knows about them.
pub fn project_cards(projects: &[ProjectConfig], stats: Option<&WakaTimeStats>) -> Vec<ProjectData> {
    let lookup_names: Vec<String> = projects
        .iter()
        .map(|p| p.wakatime_name.clone().unwrap_or_else(|| p.name.clone()))
        .collect();
    let found = stats
        .map(|s| extract_project_stats(s, &lookup_names))
        .unwrap_or_default();

    projects
        .iter()
        .zip(&lookup_names)
        .map(|(project, lookup)| ProjectData {
            name: project.name.clone(),
            description: project.description.clone(),
            link: project.link.clone(),
            logo: project.logo.clone(),
            techs: project.techs.clone(),
            wakatime_stats: found.get(lookup).cloned().flatten(),
        })
        .collect()
}
