pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::SiteConfig;
pub use server::AppState;
pub use utils::error::{FolioError, Result};
