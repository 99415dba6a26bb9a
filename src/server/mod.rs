//! HTTP surface: axum routers streaming SSE to frontend clients.

pub mod cors;
pub mod error;
pub mod handlers;
pub mod router;
pub mod sse;

use std::io;

use axum::Router;
use tracing::info;

pub use error::ApiError;
pub use handlers::{AgentState, CompletionState};
pub use router::{build_agent_router, build_completion_router};

/// Bind `addr` and serve `app` until ctrl-c.
pub async fn serve(app: Router, addr: &str) -> io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("HTTP server shutting down");
        })
        .await
}
