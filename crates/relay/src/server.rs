use crate::{
    Payload, Producer, RelayConfig,
    connection::{ConnectionLifecycle, handle_socket},
    metrics::RelayMetrics,
};
use axum::{
    Router,
    extract::{ConnectInfo, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use protocol::MAX_MESSAGE_BYTES;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub tx: broadcast::Sender<Payload>,
    pub idle_timeout: Duration,
    pub metrics: RelayMetrics,
}

impl AppState {
    pub fn new(tx: broadcast::Sender<Payload>, idle_timeout: Duration) -> Self {
        Self {
            tx,
            idle_timeout,
            metrics: RelayMetrics::new(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve viewer upgrades on an already bound listener until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

/// Start `producer`, then accept viewers on the configured address.
pub async fn run_relay<P: Producer>(config: RelayConfig, producer: P) -> anyhow::Result<()> {
    let (tx, _) = broadcast::channel::<Payload>(config.channel_capacity);
    let state = AppState::new(tx.clone(), config.idle_timeout());

    tokio::spawn(async move {
        if let Err(e) = producer.run(tx).await {
            tracing::error!(error = %e, "Producer stopped");
        }
    });

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        camera = %config.camera_address,
        idle_timeout_secs = config.idle_timeout_secs,
        "Relay listening"
    );

    serve(listener, state, shutdown_signal()).await?;

    tracing::info!("Relay stopped");
    Ok(())
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    // Subscribe before the handshake response so no frame after it is missed
    let rx = state.tx.subscribe();
    let lifecycle = ConnectionLifecycle::new(peer);
    let failure_metrics = state.metrics.clone();

    ws.max_message_size(MAX_MESSAGE_BYTES)
        .on_failed_upgrade(move |e| {
            // Upgrading -> Errored -> Closed
            ConnectionLifecycle::new(peer).finish();
            failure_metrics.connection_errored();
            tracing::error!(%peer, error = %e, "WebSocket upgrade failed");
        })
        .on_upgrade(move |socket| {
            handle_socket(socket, lifecycle, rx, state.idle_timeout, state.metrics)
        })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
