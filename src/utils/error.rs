use thiserror::Error;

#[derive(Error, Debug)]
pub enum FolioError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{service} responded with status {status}")]
    UpstreamStatus { service: String, status: u16 },

    #[error("User \"{username}\" not found.")]
    UserNotFound { username: String },

    #[error("Scrape error: {message}")]
    ScrapeError { message: String },

    #[error("Render error: {message}")]
    RenderError { message: String },

    #[error("Presence relay unavailable after {attempts} attempts")]
    PresenceUnavailable { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Upstream,
    Processing,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl FolioError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            Self::ApiError(_) | Self::WebSocketError(_) | Self::PresenceUnavailable { .. } => {
                ErrorCategory::Network
            }
            Self::UpstreamStatus { .. } | Self::UserNotFound { .. } => ErrorCategory::Upstream,
            Self::ScrapeError { .. } | Self::RenderError { .. } | Self::SerializationError(_) => {
                ErrorCategory::Processing
            }
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Upstream => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Processing | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                "Check the site configuration file and any ${VAR} substitutions it relies on"
            }
            Self::ApiError(_) | Self::WebSocketError(_) => {
                "Check network connectivity and the configured upstream URLs"
            }
            Self::PresenceUnavailable { .. } => {
                "The presence relay kept dropping the connection; restart once it is reachable"
            }
            Self::UpstreamStatus { .. } => "The upstream service rejected the request; retry later",
            Self::UserNotFound { .. } => "Verify the configured GitHub username",
            Self::ScrapeError { .. } => "GitHub markup may have changed; update the scraper",
            Self::RenderError { .. } => "Inspect the generated SVG for malformed content",
            Self::SerializationError(_) => "The upstream payload shape may have changed",
            Self::IoError(_) => "Check file permissions and that the path exists",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Network => format!("Could not reach an upstream service: {}", self),
            ErrorCategory::Upstream => format!("Upstream service error: {}", self),
            ErrorCategory::Processing => format!("Failed to process data: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, FolioError>;
