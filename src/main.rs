use anyhow::Context;
use clap::Parser;
use folio_status::core::presence::{presence_channel, PresenceApi, PresenceStore};
use folio_status::utils::error::{ErrorSeverity, FolioError};
use folio_status::utils::{logger, validation::Validate};
use folio_status::{server, AppState, CliConfig, SiteConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting folio-status");
    tracing::info!("📁 Loading configuration from: {}", cli.config);

    let config = match cli.load_site_config().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };
    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config);

    if cli.check {
        println!("✅ Configuration OK");
        return Ok(());
    }

    let store = PresenceStore::new();
    let presence_task = if config.presence.enabled {
        let api = PresenceApi::new(&config.presence, &config.profile.discord_id)
            .context("building presence relay client")?;
        let (client, handle) = presence_channel(&config.presence, api, store.clone());
        let reconcile_task = config
            .presence
            .reconcile_interval()
            .map(|every| handle.spawn_periodic_reconcile(every));
        let client_task = tokio::spawn(async move {
            if let Err(e) = client.run().await {
                tracing::error!("❌ Presence client stopped: {}", e);
                tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            }
        });
        Some((handle, client_task, reconcile_task))
    } else {
        tracing::info!("Presence socket disabled; snapshots are fetched over HTTP");
        None
    };

    let state = AppState::build(config, store).context("wiring services")?;
    let served = server::serve(state).await;

    if let Some((handle, client_task, reconcile_task)) = presence_task {
        handle.shutdown().await;
        if let Some(task) = reconcile_task {
            task.abort();
        }
        let _ = client_task.await;
    }

    if let Err(e) = served {
        exit_with(&e);
    }
    Ok(())
}

fn display_config_summary(config: &SiteConfig) {
    tracing::info!("📋 Configuration summary:");
    tracing::info!("  Bind: {}", config.server.bind);
    tracing::info!("  Owner: {}", config.profile.display_name);
    tracing::info!(
        "  Presence: {} ({})",
        if config.presence.enabled { "socket" } else { "http only" },
        config.presence.socket_url
    );
    tracing::info!("  GitHub user: {}", config.profile.github_username);
    tracing::info!("  Card cache: {}s", config.card.cache_seconds);
}

fn exit_with(e: &FolioError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
