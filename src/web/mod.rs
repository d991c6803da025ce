// src/web/mod.rs
// HTTP surface: router, state and server loop

mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;

use std::sync::Arc;
use tokio::sync::Notify;
use tracing::info;

/// Bind and serve until Ctrl-C or GET /kill
pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("wafaq listening on {}", addr);
    state
        .diagnostics
        .info(format!("FAQ bridge started on {addr}"));

    let kill_switch = state.kill_switch.clone();
    let app = create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(kill_switch))
        .await?;

    info!("wafaq stopped");
    Ok(())
}

async fn shutdown_signal(kill_switch: Option<Arc<Notify>>) {
    let killed = async {
        match kill_switch {
            Some(notify) => notify.notified().await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Ctrl-C received, shutting down"),
        _ = killed => info!("Kill requested, shutting down"),
    }
}
