use clap::Parser;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use crypto_devs_ico::{
    app,
    config::{
        AppConfig,
        Args,
    },
    fuel::KeystoreConnector,
    session::{
        Session,
        SessionSettings,
    },
    wallets,
};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "crypto-devs-ico.log";

/// Logs go to a daily file because the terminal belongs to the UI.
fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .wrap_err_with(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("Failed to install tracing subscriber: {e}"))?;
    Ok(guard)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let _log_guard = init_tracing(&args.log_dir)?;
    let config = AppConfig::from_args(args)?;
    tracing::info!(
        network = ?config.network,
        url = %config.connector.rpc_url,
        chain_id = config.expected_chain_id,
        "starting client"
    );

    let mut connector = KeystoreConnector::new(config.connector.clone());
    match connector.keystore() {
        Ok(keystore) => {
            let password = wallets::prompt_password(&keystore)?;
            connector.set_password(password);
        }
        Err(err) => tracing::warn!(error = %err, "no keystore to unlock before start"),
    }

    let mut settings = SessionSettings::new(config.expected_chain_id);
    settings.withdraw_on_connect = config.withdraw_on_connect;
    let session = Session::new(connector, settings);

    app::run_app(session, config.refresh_interval).await
}
