//! Service state management and component initialization

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::config::ServiceConfig;
use event_gateway::EventGateway;
use event_store::{EventStore, SqliteEventStore};
use ingestion::{IngestionPipeline, ShutdownReport, WorkerHandle};

/// Service state containing all initialized components
pub struct ServiceState {
    /// Service configuration
    pub config: ServiceConfig,

    /// Durable event store
    pub store: Arc<dyn EventStore>,

    /// Validator, buffer, counters and dead letters
    pub pipeline: Arc<IngestionPipeline>,

    /// HTTP gateway
    pub gateway: EventGateway,

    worker: Mutex<Option<WorkerHandle>>,
    gateway_stop: Mutex<Option<oneshot::Sender<()>>>,
    gateway_task: Mutex<Option<JoinHandle<()>>>,
}

impl ServiceState {
    /// Create the service. Failing to open the store is fatal.
    pub async fn new(config: ServiceConfig) -> Result<Self> {
        info!("Initializing event store at {:?}...", config.store.database_path);
        let mut sqlite = SqliteEventStore::new(config.store.clone())
            .context("Invalid event store configuration")?;
        sqlite.initialize().await.context("Failed to initialize event store")?;
        let store: Arc<dyn EventStore> = Arc::new(sqlite);

        Self::with_store(config, store)
    }

    /// Create the service around an already initialized store
    pub fn with_store(config: ServiceConfig, store: Arc<dyn EventStore>) -> Result<Self> {
        info!("Initializing ingestion pipeline...");
        let pipeline = Arc::new(
            IngestionPipeline::new(config.ingestion.clone())
                .context("Failed to create ingestion pipeline")?,
        );

        info!("Initializing EventGateway...");
        let gateway = EventGateway::new(config.gateway.clone(), pipeline.clone(), store.clone())
            .context("Failed to create EventGateway")?;

        Ok(Self {
            config,
            store,
            pipeline,
            gateway,
            worker: Mutex::new(None),
            gateway_stop: Mutex::new(None),
            gateway_task: Mutex::new(None),
        })
    }

    /// Spawn the persistence worker
    pub async fn start_worker(&self) {
        let mut slot = self.worker.lock().await;
        if slot.is_some() {
            warn!("Persistence worker already running");
            return;
        }

        let worker = Arc::new(self.pipeline.worker(self.store.clone()));
        *slot = Some(worker.spawn());
        info!(
            "Persistence worker started (tick {}ms, batch {})",
            self.config.ingestion.worker.tick_interval_ms, self.config.ingestion.worker.batch_size
        );
    }

    /// Bind the gateway and serve it in the background
    pub async fn start_gateway(&self) -> Result<SocketAddr> {
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let (addr, server) = self
            .gateway
            .bind(async move {
                let _ = stop_rx.await;
            })
            .context("Failed to bind EventGateway")?;

        *self.gateway_stop.lock().await = Some(stop_tx);
        *self.gateway_task.lock().await = Some(tokio::spawn(server));
        Ok(addr)
    }

    /// Stop intake, flush the buffer, close the store.
    pub async fn shutdown(&self) -> Result<Option<ShutdownReport>> {
        info!("Starting graceful shutdown...");
        let step_timeout = Duration::from_secs(self.config.service.shutdown_timeout_secs);

        // Stop accepting events first so the flush sees a finite buffer
        if let Some(stop) = self.gateway_stop.lock().await.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.gateway_task.lock().await.take() {
            match timeout(step_timeout, task).await {
                Ok(Ok(())) => info!("EventGateway stopped gracefully"),
                Ok(Err(e)) => error!("EventGateway task failed: {}", e),
                Err(_) => warn!("EventGateway did not stop within timeout, continuing shutdown"),
            }
        }

        let mut report = None;
        if let Some(worker) = self.worker.lock().await.take() {
            match worker.shutdown_within(step_timeout).await {
                Some(Ok(flush)) => {
                    if flush.remaining > 0 {
                        warn!(
                            "Shutdown flush left {} events unpersisted (timed_out={})",
                            flush.remaining, flush.timed_out
                        );
                    } else {
                        info!("Shutdown flush persisted {} events", flush.flushed);
                    }
                    report = Some(flush);
                }
                Some(Err(e)) => error!("Persistence worker task failed: {}", e),
                None => warn!(
                    "Persistence worker aborted after {:?}, {} events unpersisted",
                    step_timeout,
                    self.pipeline.buffer().len()
                ),
            }
        }

        let dead_letters = self.pipeline.dead_letters().len();
        if dead_letters > 0 {
            warn!("{} events remain in the dead-letter queue at shutdown", dead_letters);
        }

        self.store.close().await;
        info!("Graceful shutdown complete");
        Ok(report)
    }
}
