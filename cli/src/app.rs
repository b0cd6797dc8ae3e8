//! Wiring shared by both binaries

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lotto_engine::{DrawEngine, SyncController};
use lotto_network::GuildLogClient;
use lotto_storage::{FileStore, SledStore, StateStore};
use tracing::info;

use crate::config::{Backend, Config, StorageConfig};
use crate::display::FilePresenter;

/// Load the config file and apply the `--data-dir` override
pub fn load_config(path: &Path, data_dir: Option<PathBuf>) -> Result<Config> {
    let mut config = Config::load(path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    if let Some(data_dir) = data_dir {
        config.storage.data_dir = data_dir;
    }
    Ok(config)
}

pub fn open_store(storage: &StorageConfig) -> Result<Arc<dyn StateStore>> {
    let store: Arc<dyn StateStore> = match storage.backend {
        Backend::File => {
            let dir = storage.data_dir.join("state");
            Arc::new(
                FileStore::open(&dir)
                    .with_context(|| format!("failed to open state dir {}", dir.display()))?,
            )
        }
        Backend::Sled => {
            let path = storage.data_dir.join("lottery.sled");
            Arc::new(
                SledStore::open(&path)
                    .with_context(|| format!("failed to open sled db {}", path.display()))?,
            )
        }
    };
    info!(backend = ?storage.backend, data_dir = %storage.data_dir.display(), "state store opened");
    Ok(store)
}

pub fn open_engine(config: &Config, now: DateTime<Utc>) -> Result<DrawEngine> {
    let store = open_store(&config.storage)?;
    let engine = DrawEngine::open(store, config.rules()?, now).context("failed to load lottery state")?;
    Ok(engine)
}

pub fn open_presenter(config: &Config) -> Result<FilePresenter> {
    let rules = config.rules()?;
    FilePresenter::open(&config.storage.data_dir, rules.unit_size, rules.utc_offset)
        .context("failed to open display directory")
}

/// Controller over the guild log API and the file display
pub fn build_controller(config: &Config, engine: DrawEngine) -> Result<SyncController> {
    let source = GuildLogClient::new(config.guild_log()).context("failed to create guild log client")?;
    let presenter = open_presenter(config)?;

    Ok(SyncController::new(engine, Arc::new(source), Arc::new(presenter))
        .with_auto_draw(config.lottery.auto_draw))
}
