//! mailroom - send alert email over a reused SMTP connection.
//!
//! Loads configuration, opens the mail service, hands one message to the
//! dispatch worker, and shuts down cleanly. Useful both as a configuration
//! check and as a minimal alerting sender for cron jobs and scripts.

use anyhow::Result;
use clap::Parser;
use mailroom::{cli::Cli, config::Config, MailerService, TracingDiagnostic};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    info!("mailroom starting up");
    info!(
        host = %config.smtp.host,
        port = config.smtp.port,
        enabled = config.smtp.enabled,
        idle_timeout_secs = config.smtp.idle_timeout.as_secs(),
        "loaded SMTP configuration"
    );
    config.smtp.validate()?;

    let service = MailerService::new(config.smtp.clone(), Arc::new(TracingDiagnostic));
    service.open().await?;

    let to = if cli.to.is_empty() {
        config.smtp.to.clone()
    } else {
        cli.to.clone()
    };
    match service.send_mail(&to, &cli.subject, &cli.body).await {
        Ok(()) => info!(recipients = ?to, "message handed to the dispatch worker"),
        Err(err) => error!(error = %err, "message rejected"),
    }

    // close() drains the queue, so the hand-off above is attempted before we
    // exit; delivery failures show up in the log, not in the exit code.
    service.close().await?;
    info!("mailroom shut down");
    Ok(())
}
