use crate::utils::error::{FolioError, Result};
use crate::utils::validation::{self, Validate};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid")
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub profile: ProfileConfig,
    #[serde(default)]
    pub presence: PresenceConfig,
    #[serde(default)]
    pub wakatime: WakaTimeConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub card: CardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub display_name: String,
    pub birthday: NaiveDate,
    pub discord_id: String,
    pub github_username: String,
    #[serde(default)]
    pub languages: Vec<LanguageSkill>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageSkill {
    pub name: String,
    pub proficiency: u8,
    pub color: String,
    pub icon: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub icon: String,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub description: String,
    pub link: String,
    pub logo: Option<String>,
    #[serde(default)]
    pub techs: Vec<String>,
    /// Project name as recorded by the time tracker, when it differs.
    pub wakatime_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    pub enabled: bool,
    pub socket_url: String,
    pub http_base: String,
    pub cdn_base: String,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub reconcile_interval_seconds: Option<u64>,
    pub request_timeout_seconds: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            socket_url: "wss://lanyard.vmohammad.dev/socket".to_string(),
            http_base: "https://lanyard.vmohammad.dev".to_string(),
            cdn_base: "https://cdn.discordapp.com".to_string(),
            max_attempts: 5,
            backoff_base_ms: 1_000,
            backoff_max_ms: 30_000,
            reconcile_interval_seconds: None,
            request_timeout_seconds: 10,
        }
    }
}

impl PresenceConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    pub fn reconcile_interval(&self) -> Option<Duration> {
        self.reconcile_interval_seconds.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WakaTimeConfig {
    pub endpoint: String,
    pub request_timeout_seconds: u64,
}

impl Default for WakaTimeConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://wakatime.vmohammad.dev".to_string(),
            request_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub base_url: String,
    pub cache_seconds: u64,
    pub request_timeout_seconds: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            base_url: "https://github.com".to_string(),
            cache_seconds: 3_600,
            request_timeout_seconds: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    pub cache_seconds: u64,
    pub render_height: u32,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            cache_seconds: 60,
            render_height: 1_440,
        }
    }
}

impl CardConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.cache_seconds)
    }
}

impl SiteConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(FolioError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| FolioError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures<'_>| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        let profile = &self.profile;
        validation::validate_non_empty_string("profile.display_name", &profile.display_name)?;
        validation::validate_non_empty_string("profile.discord_id", &profile.discord_id)?;
        validation::validate_non_empty_string("profile.github_username", &profile.github_username)?;

        for (i, lang) in profile.languages.iter().enumerate() {
            let field = format!("profile.languages[{}]", i);
            validation::validate_non_empty_string(&format!("{}.name", field), &lang.name)?;
            validation::validate_range(&format!("{}.proficiency", field), lang.proficiency, 0, 100)?;
            validation::validate_hex_color(&format!("{}.color", field), &lang.color)?;
        }
        for (i, skill) in profile.skills.iter().enumerate() {
            validation::validate_url(&format!("profile.skills[{}].icon", i), &skill.icon)?;
        }
        for (i, project) in profile.projects.iter().enumerate() {
            validation::validate_url(&format!("profile.projects[{}].link", i), &project.link)?;
        }

        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(FolioError::InvalidConfigValueError {
                field: "server.bind".to_string(),
                value: self.server.bind.clone(),
                reason: "Expected host:port, e.g. 0.0.0.0:3000".to_string(),
            });
        }

        let presence = &self.presence;
        validation::validate_ws_url("presence.socket_url", &presence.socket_url)?;
        validation::validate_url("presence.http_base", &presence.http_base)?;
        validation::validate_url("presence.cdn_base", &presence.cdn_base)?;
        validation::validate_positive_number("presence.max_attempts", presence.max_attempts, 1)?;
        validation::validate_positive_number("presence.backoff_base_ms", presence.backoff_base_ms, 1)?;
        validation::validate_positive_number(
            "presence.backoff_max_ms",
            presence.backoff_max_ms,
            presence.backoff_base_ms,
        )?;
        if let Some(interval) = presence.reconcile_interval_seconds {
            validation::validate_positive_number("presence.reconcile_interval_seconds", interval, 1)?;
        }

        validation::validate_url("wakatime.endpoint", &self.wakatime.endpoint)?;
        validation::validate_url("github.base_url", &self.github.base_url)?;
        validation::validate_positive_number("github.cache_seconds", self.github.cache_seconds, 1)?;
        validation::validate_positive_number("card.cache_seconds", self.card.cache_seconds, 1)?;
        validation::validate_range("card.render_height", self.card.render_height, 100, 8_192)?;

        Ok(())
    }
}

impl Validate for SiteConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
