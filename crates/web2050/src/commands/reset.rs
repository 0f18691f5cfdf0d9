//! `web2050 reset` command implementation.

use std::path::PathBuf;

use clap::Args;
use web2050_config::Config;
use web2050_pipeline::PagePath;
use web2050_store::{PageStore, SqlitePageStore};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the reset command.
#[derive(Args)]
pub(crate) struct ResetArgs {
    /// Page to delete, as requested (e.g. `example.com/blog`).
    path: String,

    /// Path to configuration file (default: auto-discover web2050.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl ResetArgs {
    /// Execute the reset command.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid or the database is unavailable.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let key = self.delete().await?;
        output.deleted(&key);
        Ok(())
    }

    async fn delete(&self) -> Result<String, CliError> {
        let path = PagePath::parse(&self.path)?;
        let config = Config::load(self.config.as_deref(), None)?;

        let database = &config.database_resolved;
        let store = SqlitePageStore::connect(&database.url(), database.max_connections).await?;
        store.delete(path.key()).await?;
        store.close().await;

        tracing::info!(key = %path.key(), "Page deleted");
        Ok(path.into_key())
    }
}
