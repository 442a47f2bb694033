use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use tokio::io::AsyncReadExt;

use mail_digest::channels::DispatchHandle;
use mail_digest::config::AppConfig;
use mail_digest::pipeline::MessageProcessor;
use mail_digest::transport::RawMessage;

/// sysexits.h: input data was incorrect, retrying will not help.
const EX_DATAERR: u8 = 65;
/// sysexits.h: temporary failure, the MTA keeps the message and retries.
const EX_TEMPFAIL: u8 = 75;

#[tokio::main]
async fn main() -> ExitCode {
    // Already installed is fine; lettre and reqwest only need one provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    // stdout/stdin belong to the MTA pipe, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Message not processed");
            ExitCode::from(EX_TEMPFAIL)
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    config.log_summary();
    let processor = MessageProcessor::from_config(&config).context("failed to build pipeline")?;

    let mut bytes = Vec::new();
    tokio::io::stdin()
        .read_to_end(&mut bytes)
        .await
        .context("failed to read message from stdin")?;
    if bytes.is_empty() {
        tracing::error!("Empty message on stdin");
        return Ok(ExitCode::from(EX_DATAERR));
    }

    let sender = std::env::var("SENDER").ok();
    let message = RawMessage::from_bytes(bytes, sender);

    match processor.process(&message).await {
        Ok(outcome) => {
            drain(outcome.deliveries, config.notify_grace).await;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!(error = %e, "Forwarding failed; asking the MTA to retry");
            drain(e.into_deliveries(), config.notify_grace).await;
            Ok(ExitCode::from(EX_TEMPFAIL))
        }
    }
}

/// Give detached notifications up to `grace` to finish before the process exits.
async fn drain(deliveries: DispatchHandle, grace: Duration) {
    if deliveries.is_empty() {
        return;
    }
    let reports = deliveries.wait(grace).await;
    let delivered = reports.iter().filter(|r| r.is_delivered()).count();
    tracing::info!(delivered, total = reports.len(), "Notifications settled");
}
