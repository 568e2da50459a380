//! Axum web server and background ticks

use axum::routing::{get, post};
use axum::Router;
use roost_core::config::TimingConfig;
use roost_engine::Dispatcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::routes;

/// Shared application state
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

pub type SharedState = Arc<AppState>;

pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    let state = Arc::new(AppState { dispatcher });
    Router::new()
        .route("/message", post(routes::receive_message))
        .route("/call/:id", get(routes::voice_prompt).post(routes::voice_prompt))
        .route("/call/:id/response", post(routes::voice_digits))
        .route("/call/:id/status", post(routes::voice_status))
        .route("/schedule", post(routes::start_schedule))
        .route("/state", get(routes::household))
        .route("/health", get(routes::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Spawn the due-assignment check and the timer poll
pub fn spawn_ticks(dispatcher: Arc<Dispatcher>, timing: &TimingConfig) -> Vec<JoinHandle<()>> {
    let check_every = Duration::from_secs(timing.check_interval_secs.max(1));
    let poll_every = Duration::from_secs(timing.timer_resolution_secs.max(1));

    let due = dispatcher.clone();
    let check = tokio::spawn(async move {
        let mut interval = tokio::time::interval(check_every);
        loop {
            interval.tick().await;
            let prompted = due.check_due_assignments().await;
            if prompted > 0 {
                info!("Prompted {} assignments", prompted);
            }
        }
    });

    let timers = tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll_every);
        loop {
            interval.tick().await;
            let fired = dispatcher.fire_due_timers().await;
            if fired > 0 {
                debug!("Fired {} timers", fired);
            }
        }
    });

    vec![check, timers]
}

/// Serve the webhooks until the process stops
pub async fn serve(dispatcher: Arc<Dispatcher>, timing: &TimingConfig, addr: &str) -> anyhow::Result<()> {
    let ticks = spawn_ticks(dispatcher.clone(), timing);
    let app = router(dispatcher);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Roost listening on {}", addr);
    let result = axum::serve(listener, app).await;

    for tick in ticks {
        tick.abort();
    }
    result?;
    Ok(())
}
