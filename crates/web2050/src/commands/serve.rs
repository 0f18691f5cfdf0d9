//! `web2050 serve` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use web2050_config::{CliSettings, Config};
use web2050_server::{run_server, server_config_from_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover web2050.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config). `host:port` also sets the port.
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// SQLite database file (overrides config).
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Model name sent to the generator (overrides config).
    #[arg(short, long)]
    model: Option<String>,

    /// Base URL of the OpenAI-compatible API (overrides config).
    #[arg(long)]
    base_url: Option<String>,

    /// Enable verbose output (log every request and generation).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let (host, host_port) = match self.host.as_deref() {
            Some(raw) => {
                let (host, port) = split_host_port(raw);
                (Some(host.to_owned()), port)
            }
            None => (None, None),
        };

        let cli_settings = CliSettings {
            host,
            port: self.port.or(host_port),
            database_path: self.database,
            model: self.model,
            base_url: self.base_url,
        };

        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        ensure_data_dir(&config.database_resolved.path)?;

        output.listening(&config.server.host, config.server.port);
        output.field("database", config.database_resolved.path.display());
        output.field("generator", &config.generator.base_url);
        output.field("model", &config.generator.model);
        if config.generator.api_key.is_empty() {
            output.note("no API key set, requests are sent without authorization");
        }

        run_server(server_config_from_config(&config))
            .await
            .map_err(|e| CliError::Server(e.to_string()))?;

        Ok(())
    }
}

/// Split `host:port` into its parts. A value without a numeric port, or an
/// unbracketed IPv6 address, is all host.
fn split_host_port(raw: &str) -> (&str, Option<u16>) {
    match raw.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') || host.ends_with(']') => {
            match port.parse() {
                Ok(port) => (host.trim_start_matches('[').trim_end_matches(']'), Some(port)),
                Err(_) => (raw, None),
            }
        }
        _ => (raw, None),
    }
}

/// Ensure the database directory exists. A freshly created directory gets
/// a `.gitignore` so the database stays out of version control.
pub(crate) fn ensure_data_dir(database_path: &Path) -> Result<(), CliError> {
    let Some(dir) = database_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
    else {
        return Ok(());
    };
    if dir.exists() {
        return Ok(());
    }

    std::fs::create_dir_all(dir)?;
    let _ = std::fs::write(
        dir.join(".gitignore"),
        "# Automatically created by web2050\n*\n",
    );
    Ok(())
}
