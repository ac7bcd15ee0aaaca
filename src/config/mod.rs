pub mod toml_config;

pub use toml_config::SiteConfig;

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "folio-status")]
#[command(about = "Portfolio status server: live presence, coding stats, contribution data and image cards")]
pub struct CliConfig {
    /// Path to the TOML site configuration
    #[arg(short, long, default_value = "folio.toml")]
    pub config: String,

    /// Override server.bind from the config file
    #[arg(long)]
    pub bind: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit JSON log lines instead of the compact format
    #[arg(long)]
    pub json_logs: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    pub check: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Loads the site config and applies command-line overrides.
    pub fn load_site_config(&self) -> crate::Result<SiteConfig> {
        let mut site = SiteConfig::from_file(&self.config)?;
        if let Some(bind) = &self.bind {
            site.server.bind = bind.clone();
        }
        Ok(site)
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_bind_override_applies() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"
[server]
bind = "0.0.0.0:3000"

[profile]
display_name = "Owner"
birthday = "2000-01-01"
discord_id = "1"
github_username = "owner"
"#,
        )
        .unwrap();

        let cli = CliConfig::parse_from([
            "folio-status",
            "--config",
            file.path().to_str().unwrap(),
            "--bind",
            "127.0.0.1:8080",
        ]);

        let site = cli.load_site_config().unwrap();
        assert_eq!(site.server.bind, "127.0.0.1:8080");
    }
}
