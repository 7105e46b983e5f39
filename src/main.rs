use anyhow::Result;
use teloxide::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use waves::bot::{self, Command, WavesState};
use waves::catalog::CatalogLoader;
use waves::config::{BotConfig, LogFormat};
use waves::localization::init_localization;
use waves::storage::ConfigStore;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = BotConfig::from_env()?;
    init_tracing(config.log_format);

    info!("Starting Waves Telegram Bot");

    init_localization()?;

    let catalog = CatalogLoader::new(&config.catalog_path);
    // A failed load is retried by the handlers
    if let Err(e) = catalog.load().await {
        error!(path = %catalog.path().display(), error = %e, "Wave catalog failed to load");
    }

    info!(
        catalog = %config.catalog_path.display(),
        save_path = %config.save_path.display(),
        admin_groups = config.access.admin_group_ids.len(),
        "Configuration loaded"
    );

    let state = WavesState::new(catalog, ConfigStore::new(&config.save_path), config.access.clone());
    let bot = Bot::new(config.bot_token.clone());

    info!("Bot initialized, starting dispatcher");

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(bot::message_handler),
        )
        .branch(Update::filter_callback_query().endpoint(bot::callback_handler));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
