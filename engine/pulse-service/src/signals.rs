//! Signal handling for graceful shutdown

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info};

const SIGNAL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Resolve the returned receiver on Ctrl+C or SIGTERM, whichever comes first
pub fn setup_signal_handlers() -> Result<oneshot::Receiver<()>> {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let terminate = Arc::new(AtomicBool::new(false));
    #[cfg(unix)]
    {
        use anyhow::Context;
        signal_hook::flag::register(signal_hook::consts::SIGTERM, terminate.clone())
            .context("Failed to register SIGTERM handler")?;
    }

    tokio::spawn(async move {
        tokio::select! {
            _ = ctrl_c() => info!("Ctrl+C signal received"),
            _ = flag_raised(terminate) => info!("SIGTERM signal received"),
        }
        let _ = shutdown_tx.send(());
    });

    Ok(shutdown_rx)
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Poll the flag set by the signal-hook handler
async fn flag_raised(flag: Arc<AtomicBool>) {
    while !flag.load(Ordering::Relaxed) {
        tokio::time::sleep(SIGNAL_POLL_INTERVAL).await;
    }
}
