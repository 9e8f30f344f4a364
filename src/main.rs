use clap::Parser;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use gomboc_casino::{
    app,
    config::{
        AppConfig,
        Args,
    },
};
use std::{
    path::Path,
    sync::OnceLock,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

// stdout belongs to the terminal UI, so logs only go to a file
fn init_tracing(log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)
        .wrap_err_with(|| format!("failed to create log directory {}", log_dir.display()))?;
    let appender = rolling::daily(log_dir, "gomboc-casino.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let config = AppConfig::from_args(Args::parse()).wrap_err("invalid configuration")?;
    init_tracing(&config.log_dir)?;
    tracing::info!(endpoint = %config.endpoint, "starting gomboc casino");
    app::run_app(config).await
}
