use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ---------------------------------------------------------------------------
// Presence relay payloads
// ---------------------------------------------------------------------------

/// Activity type the relay uses for a user-set custom status.
pub const CUSTOM_STATUS_ACTIVITY: u8 = 4;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresenceSnapshot {
    pub discord_user: DiscordUser,
    #[serde(default = "default_status")]
    pub discord_status: String,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub listening_to_spotify: bool,
    #[serde(default)]
    pub spotify: Option<Spotify>,
    #[serde(default)]
    pub kv: HashMap<String, String>,
    #[serde(default)]
    pub active_on_discord_desktop: bool,
    #[serde(default)]
    pub active_on_discord_mobile: bool,
}

fn default_status() -> String {
    "offline".to_string()
}

impl PresenceSnapshot {
    pub fn custom_status(&self) -> Option<&Activity> {
        self.activities
            .iter()
            .find(|a| a.kind == CUSTOM_STATUS_ACTIVITY)
    }

    pub fn regular_activities(&self) -> impl Iterator<Item = &Activity> {
        self.activities
            .iter()
            .filter(|a| a.kind != CUSTOM_STATUS_ACTIVITY)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub public_flags: Option<u64>,
    #[serde(default)]
    pub avatar_decoration_data: Option<AvatarDecorationData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarDecorationData {
    pub sku_id: String,
    pub asset: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timestamps {
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub end: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assets {
    #[serde(default)]
    pub large_image: Option<String>,
    #[serde(default)]
    pub large_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub application_id: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub timestamps: Option<Timestamps>,
    #[serde(default)]
    pub assets: Option<Assets>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl Activity {
    pub fn large_image(&self) -> Option<&str> {
        self.assets.as_ref()?.large_image.as_deref()
    }

    /// Start and end in unix milliseconds, when both are known.
    pub fn bounds(&self) -> Option<(i64, i64)> {
        let ts = self.timestamps.as_ref()?;
        Some((ts.start?, ts.end?))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spotify {
    #[serde(default)]
    pub track_id: Option<String>,
    #[serde(default)]
    pub timestamps: Option<Timestamps>,
    #[serde(default)]
    pub song: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album_art_url: Option<String>,
    #[serde(default)]
    pub album: String,
}

// ---------------------------------------------------------------------------
// Time-tracking payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WakaTimeStats {
    pub data: WakaTimeData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WakaTimeData {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub total_seconds: f64,
    #[serde(default)]
    pub daily_average: f64,
    #[serde(default)]
    pub range: Option<String>,
    #[serde(default)]
    pub human_readable_total: Option<String>,
    #[serde(default)]
    pub human_readable_daily_average: Option<String>,
    #[serde(default)]
    pub languages: Vec<WakaTimeEntry>,
    #[serde(default)]
    pub projects: Vec<WakaTimeEntry>,
    #[serde(default)]
    pub categories: Vec<WakaTimeEntry>,
}

/// One row of a language / project / category breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WakaTimeEntry {
    pub name: String,
    #[serde(default)]
    pub percent: f64,
    #[serde(default)]
    pub total_seconds: f64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub digital: String,
    #[serde(default)]
    pub hours: u64,
    #[serde(default)]
    pub minutes: u64,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub total_seconds: f64,
    pub text: String,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSegment {
    pub name: String,
    pub percent: f64,
    pub color: String,
    pub text: String,
    pub total_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub segments: Vec<ChartSegment>,
    pub total_time: String,
    pub total_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectData {
    pub name: String,
    pub description: String,
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub techs: Vec<String>,
    pub wakatime_stats: Option<ProjectStats>,
}

// ---------------------------------------------------------------------------
// Contribution calendar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub date: String,
    pub count: u32,
    pub level: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Year {
    Calendar(i32),
    LastYear,
}

impl Year {
    pub fn key(&self) -> String {
        match self {
            Year::Calendar(y) => y.to_string(),
            Year::LastYear => "lastYear".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionFormat {
    #[default]
    Nested,
    Flat,
}

pub type NestedContributions = BTreeMap<i32, BTreeMap<u32, BTreeMap<u32, Contribution>>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContributionDays {
    Nested(NestedContributions),
    Flat(Vec<Contribution>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributionCalendar {
    pub total: BTreeMap<String, u64>,
    pub contributions: ContributionDays,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContributionQuery {
    pub years: Vec<i32>,
    pub fetch_all: bool,
    pub last_year: bool,
    pub format: ContributionFormat,
}

impl ContributionQuery {
    /// Every listed year plus the rolling last year.
    pub fn everything(format: ContributionFormat) -> Self {
        Self {
            years: Vec::new(),
            fetch_all: true,
            last_year: true,
            format,
        }
    }
}
