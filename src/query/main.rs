//! Query server for district lookups.
//!
//! Provides an HTTP API for postal-code and coordinate district resolution,
//! plus the generated-placeholder fallback used by map pages.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use districts::config::Config;
use districts::pip::{LocationQuery, MatchKind, ResolutionSource};
use districts::{DistrictPolygon, DistrictResolver};

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "District lookup server")]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (overrides the config file)
    #[arg(short, long)]
    listen: Option<String>,

    /// Seed table JSON (overrides the config file; embedded table otherwise)
    #[arg(long)]
    table: Option<PathBuf>,

    /// Reject duplicate postal codes and malformed districts at startup
    #[arg(long)]
    strict: bool,
}

/// Application state shared across handlers
struct AppState {
    resolver: DistrictResolver,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let Some(table) = args.table {
        config.table.path = Some(table);
    }
    config.table.strict |= args.strict;

    info!("Districts Query Server");
    match &config.table.path {
        Some(path) => info!("Loading district table from {}", path.display()),
        None => info!("Using embedded district table"),
    }

    let table = config.table.load()?;
    let state = Arc::new(AppState {
        resolver: DistrictResolver::new(Arc::new(table)),
    });

    let app = router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Starting server on {}", config.server.listen);

    let listener = tokio::net::TcpListener::bind(&config.server.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/district/postal/{code}", get(postal_handler))
        .route("/v1/district/reverse", get(reverse_handler))
        .route("/v1/district/generate", get(generate_handler))
        .route("/v1/district/resolve", get(resolve_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let table = state.resolver.table();
    Json(HealthResponse {
        status: "ok",
        districts: table.len(),
        postal_codes: table.postal_len(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    districts: usize,
    postal_codes: usize,
}

/// District by postal code (exact, then 3-character prefix)
async fn postal_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<DistrictPolygon>, (StatusCode, String)> {
    state
        .resolver
        .find_district_by_postal_code(&code)
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                format!("No district for postal code {}", code),
            )
        })
}

/// District containing (or nearest to) a point
async fn reverse_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PointQueryParams>,
) -> Result<Json<ReverseResponse>, (StatusCode, String)> {
    match state
        .resolver
        .locate_coordinates(params.point_lat, params.point_lon)
    {
        Some(res) => Ok(Json(ReverseResponse {
            district: res.district.clone(),
            kind: res.kind,
        })),
        None => Err((
            StatusCode::NOT_FOUND,
            format!(
                "No district for point ({}, {})",
                params.point_lat, params.point_lon
            ),
        )),
    }
}

/// Placeholder district around a point
async fn generate_handler(Query(params): Query<PointQueryParams>) -> Json<DistrictPolygon> {
    Json(districts::pip::generate_district_around_coordinates(
        params.point_lat,
        params.point_lon,
    ))
}

/// Postal code, then point, then a generated placeholder
async fn resolve_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResolveQueryParams>,
) -> Result<Json<ResolveResponse>, (StatusCode, String)> {
    let query = LocationQuery {
        postal_code: params.postal_code,
        lat: params.point_lat,
        lng: params.point_lon,
    };

    let resolved = state.resolver.resolve(&query).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            "Insufficient location data".to_string(),
        )
    })?;

    Ok(Json(ResolveResponse {
        district: resolved.district.into_owned(),
        source: resolved.source,
    }))
}

#[derive(Deserialize)]
struct PointQueryParams {
    /// Point latitude
    #[serde(rename = "point.lat")]
    point_lat: f64,
    /// Point longitude
    #[serde(rename = "point.lon")]
    point_lon: f64,
}

#[derive(Deserialize)]
struct ResolveQueryParams {
    postal_code: Option<String>,
    #[serde(rename = "point.lat")]
    point_lat: Option<f64>,
    #[serde(rename = "point.lon")]
    point_lon: Option<f64>,
}

#[derive(Serialize)]
struct ReverseResponse {
    district: DistrictPolygon,
    #[serde(rename = "match")]
    kind: MatchKind,
}

#[derive(Serialize)]
struct ResolveResponse {
    district: DistrictPolygon,
    source: ResolutionSource,
}
