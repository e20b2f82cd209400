use crate::handlers;
use axum::{
    routing::{get, post},
    Router,
};
use quorum_ledger::Ledger;
use quorum_trader::TraderHandle;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct ApiState {
    pub handle: TraderHandle,
    pub ledger: Ledger,
}

pub struct ApiServer {
    state: Arc<ApiState>,
}

impl ApiServer {
    #[must_use]
    pub fn new(handle: TraderHandle, ledger: Ledger) -> Self {
        Self {
            state: Arc::new(ApiState { handle, ledger }),
        }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/api/status", get(handlers::get_status))
            .route("/api/stop-all", post(handlers::stop_all))
            .route("/api/report", get(handlers::get_report))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Starts the web server listening on the specified address.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the address or serve requests.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("API listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}
