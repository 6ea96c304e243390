pub mod admission_review;
mod api;
mod certs;
pub mod cli;
pub mod config;
pub mod mutation;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;
use axum::{
    routing::{get, post, put},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;

use crate::admission_review::AdmissionCodec;
use crate::api::handlers::{health_handler, log_level_handler, mutate_handler};
use crate::api::state::ApiServerState;
use crate::certs::create_tls_config_and_watch_certificate_changes;
use crate::config::Config;
use crate::mutation::MutationEngine;
use crate::tracing::LogLevelHandle;

pub struct WebhookServer {
    router: Router,
    addr: SocketAddr,
    tls_config: Option<RustlsConfig>,
}

impl WebhookServer {
    /// Build the server. The `/loglevel` endpoint is exposed only when a
    /// handle over the log filter is given.
    pub async fn new_from_config(
        config: Config,
        log_level_handle: Option<LogLevelHandle>,
    ) -> Result<Self> {
        let state = Arc::new(ApiServerState {
            engine: MutationEngine::new(config.webhook),
            codec: AdmissionCodec::default(),
        });

        let mut router = Router::new()
            .route("/mutate", post(mutate_handler))
            .with_state(state)
            .route("/healthz", get(health_handler));

        if let Some(handle) = log_level_handle {
            router = router.merge(
                Router::new()
                    .route("/loglevel", put(log_level_handler))
                    .with_state(handle),
            );
        }

        let router = router.layer(TraceLayer::new_for_http());

        let tls_config = match config.tls_config {
            Some(tls_config) => {
                Some(create_tls_config_and_watch_certificate_changes(tls_config).await?)
            }
            None => None,
        };

        Ok(Self {
            router,
            addr: config.addr,
            tls_config,
        })
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn run(self) -> Result<()> {
        match self.tls_config {
            Some(tls_config) => {
                info!(address = %self.addr, "started HTTPS server");
                axum_server::bind_rustls(self.addr, tls_config)
                    .serve(self.router.into_make_service())
                    .await?;
            }
            None => {
                info!(address = %self.addr, "started HTTP server");
                axum_server::bind(self.addr)
                    .serve(self.router.into_make_service())
                    .await?;
            }
        }

        Ok(())
    }
}
