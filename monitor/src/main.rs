/// Contract monitor service
/// Watches a deployed counter contract and logs every change of its recent
/// sender or running total
///
/// This service:
/// - Resolves the watched address from CONTRACT_ADDRESS or from compiled code
///   plus an owner address
/// - Stops early when the account is not active
/// - Prints the contract address, a tonhub funding link and its QR code
/// - Polls the configured get-method every MONITOR_POLL_INTERVAL_MS
/// - Exits on SIGINT or SIGTERM
use anyhow::{Context, Result};
use client::{funding_link, qr_code, TonClient4};
use dotenv::dotenv;
use monitor::{resolve_address, Monitor, MonitorConfig};
use shared::FriendlyFormat;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "monitor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .init();

    info!("Contract monitor starting...");

    let config = MonitorConfig::from_env()?;
    let address = resolve_address(&config.target).context("Failed to resolve contract address")?;
    let test_only = config.network.is_test_only();

    let client = Arc::new(TonClient4::new(config.endpoint.clone()));
    let monitor = Monitor::new(client, address, config.get_method.clone());

    if !monitor
        .is_active()
        .await
        .context("Failed to fetch contract account")?
    {
        info!(address = %address, "Contract is not active");
        println!("Contract is not active");
        return Ok(());
    }

    let display = address.to_friendly(FriendlyFormat {
        test_only,
        ..FriendlyFormat::default()
    });
    println!("Contract address is : {}", display);
    let link = funding_link(&address, test_only)?;
    println!("{}", link);
    println!("{}", qr_code(&link).context("Failed to render funding QR code")?);

    let handle = monitor.spawn(config.poll_interval);

    signal_support::create_shutdown_signal()
        .await
        .context("Failed to listen for shutdown signals")?;
    info!("Received shutdown signal, stopping monitor...");

    let state = handle.shutdown().await?;
    info!(
        ticks = state.ticks,
        failures = state.consecutive_failures,
        "Contract monitor exited"
    );
    Ok(())
}

/// Signal handling support
mod signal_support {
    use std::future::Future;

    pub fn create_shutdown_signal() -> impl Future<Output = std::io::Result<()>> {
        async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};

                let mut sigterm = signal(SignalKind::terminate())?;
                let mut sigint = signal(SignalKind::interrupt())?;

                tokio::select! {
                    _ = sigterm.recv() => {
                        tracing::info!("Received SIGTERM");
                    }
                    _ = sigint.recv() => {
                        tracing::info!("Received SIGINT");
                    }
                }
            }

            #[cfg(windows)]
            {
                tokio::signal::ctrl_c().await?;
                tracing::info!("Received Ctrl+C");
            }

            Ok(())
        }
    }
}
