use crate::api::api_error::ApiError;
use crate::api::model::{LookupTarget, UpdateParams};
use crate::api::server::AppState;
use crate::api::{auth, favicon};
use crate::context::Context;
use crate::dispatch::parse_hostnames;
use crate::dump;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::HeaderMap;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use axum_extra::extract::WithRejection;
use std::net::SocketAddr;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::Level;

/// The API router. `/favicon.ico` is served ahead of authentication, everything else behind it.
pub fn new(state: AppState) -> Router {
    let timeout = state.config.server.timeout;
    Router::new()
        .route("/nic/update", get(update))
        .route("/zones", get(zones))
        .route("/records", get(records))
        .route("/lookup/*target", get(lookup))
        .fallback(records)
        .layer(middleware::from_fn_with_state(state.clone(), auth::basic))
        .route("/favicon.ico", get(favicon::serve))
        .layer(TimeoutLayer::new(timeout))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        .with_state(state)
}

async fn update(
    State(state): State<AppState>,
    remote: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    WithRejection(Query(params), _): WithRejection<Query<UpdateParams>, ApiError>,
) -> Result<String, ApiError> {
    let hosts = parse_hostnames(params.hostname.as_deref())?;
    let forwarded_for = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|value| value.to_str().ok());
    let ip = state
        .resolver
        .resolve(
            params.myip.as_deref(),
            remote.map(|ConnectInfo(addr)| addr),
            forwarded_for,
        )
        .await?;

    // Dropping the handle, when the request completes or its future is dropped, cancels any
    // provider call still in flight.
    let (ctx, _cancel) = Context::new();
    let batch = state.dispatcher.update(&ctx, hosts, ip).await?;
    for (host, status) in batch.iter() {
        tracing::info!("update {host}: {status}");
    }
    Ok(batch.to_string())
}

async fn zones(State(state): State<AppState>) -> Result<String, ApiError> {
    let (ctx, _cancel) = Context::new();
    Ok(dump::zones(&state.dispatcher, &ctx, &[]).await?.into_body())
}

async fn records(State(state): State<AppState>) -> Result<String, ApiError> {
    let (ctx, _cancel) = Context::new();
    Ok(dump::records(&state.dispatcher, &ctx, &[]).await?.into_body())
}

async fn lookup(
    State(state): State<AppState>,
    Path(target): Path<String>,
) -> Result<String, ApiError> {
    let target = LookupTarget::parse(&target);
    let (ctx, _cancel) = Context::new();
    let report = dump::lookup(&state.dispatcher, &ctx, &target.rtype, &target.hostname).await?;
    Ok(report.into_body())
}
