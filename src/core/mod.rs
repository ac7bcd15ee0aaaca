pub mod card;
pub mod github;
pub mod presence;
pub mod wakatime;

pub use crate::domain::model::{ContributionCalendar, PresenceSnapshot};
pub use crate::domain::ports::{AssetFetcher, PresenceSource};
pub use crate::utils::error::Result;
pub use card::CardService;
pub use github::{ContributionService, GitHubScraper};
pub use presence::{PresenceHandle, PresenceService};
pub use wakatime::WakaTimeClient;
