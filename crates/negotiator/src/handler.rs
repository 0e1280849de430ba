use crate::config::NegotiatorConfig;
use crate::negotiate::{NegotiateError, negotiate};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use protocol::{ErrorBody, NegotiateRequest, Scheme};
use tower_http::{
    catch_panic::CatchPanicLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

pub const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

const FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

#[derive(Clone)]
pub struct AppState {
    pub ws_port: u16,
}

impl From<&NegotiatorConfig> for AppState {
    fn from(config: &NegotiatorConfig) -> Self {
        Self {
            ws_port: config.ws_port,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/negotiate", post(negotiate_handler).options(preflight))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        ))
        .with_state(state)
}

pub async fn run_server(config: NegotiatorConfig) -> anyhow::Result<()> {
    let app = router(AppState::from(&config));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(bind_addr = %config.bind_addr, "Negotiator listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Negotiator stopped");
    Ok(())
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn negotiate_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let scheme = Scheme::from_forwarded_proto(
        headers
            .get(&FORWARDED_PROTO)
            .and_then(|value| value.to_str().ok()),
    );

    let result = serde_json::from_slice::<NegotiateRequest>(&body)
        .map_err(NegotiateError::from)
        .and_then(|request| negotiate(&request, scheme, state.ws_port));

    match result {
        Ok(response) => {
            tracing::info!(
                ip_address = %response.ip_address,
                scheme = scheme.as_str(),
                ws_protocol = %response.ws_protocol,
                "Negotiation succeeded"
            );
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(NegotiateError::InvalidAddress) => {
            tracing::info!(scheme = scheme.as_str(), "Rejected invalid camera address");
            error_response(StatusCode::BAD_REQUEST, NegotiateError::InvalidAddress)
        }
        Err(e) => {
            tracing::error!(error = %e, "Error in negotiation request");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

fn error_response(status: StatusCode, error: NegotiateError) -> Response {
    (status, Json(ErrorBody::new(error.to_string()))).into_response()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
