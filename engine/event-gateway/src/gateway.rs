//! Main EventGateway implementation

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::rest_api::{create_routes, ApiState};
use event_store::EventStore;
use ingestion::IngestionPipeline;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use warp::Filter;

/// HTTP front door for the ingestion pipeline and the event store
pub struct EventGateway {
    config: Arc<GatewayConfig>,
    state: ApiState,
}

impl EventGateway {
    /// Create a new EventGateway
    pub fn new(
        config: GatewayConfig,
        pipeline: Arc<IngestionPipeline>,
        store: Arc<dyn EventStore>,
    ) -> GatewayResult<Self> {
        config.validate().map_err(GatewayError::Config)?;
        let config = Arc::new(config);
        let state = ApiState { pipeline, store, config: config.clone() };
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn routes(&self) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
        create_routes(self.state.clone())
    }

    /// Bind the listener and return the server future.
    ///
    /// The server stops accepting once `shutdown` resolves and finishes when
    /// in-flight requests are done.
    pub fn bind<F>(
        &self,
        shutdown: F,
    ) -> GatewayResult<(SocketAddr, impl Future<Output = ()> + Send + 'static)>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self
            .config
            .server_addr()
            .map_err(|e| GatewayError::Config(format!("Invalid server address: {e}")))?;

        info!("Starting EventGateway on {}", addr);

        let (bound, server) =
            warp::serve(self.routes()).try_bind_with_graceful_shutdown(addr, shutdown)?;

        info!("EventGateway listening on {}", bound);
        Ok((bound, server))
    }
}
