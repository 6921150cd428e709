use std::{net::SocketAddr, time::Duration};

use axum::{
    body::Body,
    http::{header, Request, Response},
    routing::get,
    Router,
};
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    cors::CorsLayer,
    trace::TraceLayer,
};
use tracing::Span;

use crate::config::AppConfig;
use crate::state::AppState;
use crate::{auth, journal, prediction, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(journal::router())
        .merge(prediction::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(trace_layer())
}

type HttpTrace = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    fn(&Request<Body>) -> Span,
    tower_http::trace::DefaultOnRequest,
    fn(&Response<Body>, Duration, &Span),
>;

fn trace_layer() -> HttpTrace {
    TraceLayer::new_for_http()
        .make_span_with(request_span as fn(&Request<Body>) -> Span)
        .on_response(log_response as fn(&Response<Body>, Duration, &Span))
}

fn request_span(req: &Request<Body>) -> Span {
    let agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "http_request",
        method = %req.method(),
        uri = %req.uri(),
        agent,
        status = tracing::field::Empty,
    )
}

fn log_response(res: &Response<Body>, latency: Duration, span: &Span) {
    let status = res.status();
    span.record("status", tracing::field::display(status));
    let latency_ms = latency.as_millis() as u64;
    if status.is_server_error() {
        tracing::error!(%status, latency_ms, "response");
    } else {
        tracing::info!(%status, latency_ms, "response");
    }
}

/// Binds `APP_HOST:APP_PORT` and serves with peer addresses attached, which
/// the login audit falls back on when no proxy header is present.
pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
