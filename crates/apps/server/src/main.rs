use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use foundation::BoundingBox;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod cache;
mod overpass;
mod usgs;

use cache::{TtlCache, cache_key};
use overpass::{Brand, OverpassResponse};

const USER_AGENT: &str = "USAVibesMap/1.0 (self-hosted)";
const OVERPASS_TIMEOUT: Duration = Duration::from_secs(60);
const USGS_TIMEOUT: Duration = Duration::from_secs(30);
/// Upstream queries and cache keys use a coarser bbox than the client sends.
const BBOX_CACHE_PLACES: i32 = 2;

#[derive(Clone, Debug)]
struct ServerConfig {
    addr: SocketAddr,
    overpass_endpoint: String,
    usgs_endpoint: String,
    cache_ttl: Duration,
    cache_max_entries: usize,
}

impl ServerConfig {
    fn from_env() -> Result<Self, String> {
        let addr = env::var("VIBES_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".to_string());
        let addr = addr
            .parse()
            .map_err(|e| format!("invalid VIBES_ADDR {addr:?}: {e}"))?;
        Ok(Self {
            addr,
            overpass_endpoint: env::var("OVERPASS_ENDPOINT")
                .unwrap_or_else(|_| "https://overpass-api.de/api/interpreter".to_string()),
            usgs_endpoint: env::var("USGS_ENDPOINT").unwrap_or_else(|_| {
                "https://earthquake.usgs.gov/fdsnws/event/1/query".to_string()
            }),
            cache_ttl: Duration::from_secs(env_var_u64("CACHE_TTL_SECONDS", 3600)),
            cache_max_entries: env_var_usize("CACHE_MAX_ENTRIES", 256),
        })
    }
}

#[derive(Clone)]
struct AppState {
    config: Arc<ServerConfig>,
    cache: Arc<Mutex<TtlCache<Value>>>,
    http: reqwest::Client,
}

impl AppState {
    fn new(config: ServerConfig, http: reqwest::Client) -> Self {
        let cache = TtlCache::new(config.cache_max_entries, config.cache_ttl);
        Self {
            config: Arc::new(config),
            cache: Arc::new(Mutex::new(cache)),
            http,
        }
    }

    fn cached(&self, key: &str) -> Option<Value> {
        let hit = self.cache.lock().get(key, Instant::now());
        if hit.is_some() {
            debug!("cache hit: {key}");
        }
        hit
    }

    fn remember(&self, key: String, value: Value) {
        let mut cache = self.cache.lock();
        cache.insert(key, value, Instant::now());
        debug!("cache holds {} entries", cache.len());
    }
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::from_env()?;
    let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
    let addr = config.addr;
    let state = AppState::new(config, http);

    info!("query proxy listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::OPTIONS]);

    Router::new()
        .route("/health", get(health))
        .route("/api/osm/brand", get(osm_brand))
        .route("/api/usgs/quakes", get(usgs_quakes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "overpass": state.config.overpass_endpoint,
        "cache_ttl": state.config.cache_ttl.as_secs(),
    }))
}

/// Malformed or missing query parameters answer 400 with the usual error body.
fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(params)| params)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))
}

fn parse_bbox(raw: &str) -> Result<BoundingBox, ApiError> {
    raw.parse::<BoundingBox>()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))
}

fn bbox_json(b: BoundingBox) -> Value {
    json!([b.south, b.west, b.north, b.east])
}

async fn read_upstream<T: serde::de::DeserializeOwned>(
    req: reqwest::RequestBuilder,
) -> Result<T, ApiError> {
    let resp = req.send().await.map_err(|e| {
        warn!("upstream request failed: {e}");
        api_error(StatusCode::BAD_GATEWAY, format!("Fetch failed: {e}"))
    })?;

    let status = resp.status();
    if !status.is_success() {
        warn!("upstream returned {status}");
        return Err(api_error(
            StatusCode::BAD_GATEWAY,
            format!("Upstream HTTP {}", status.as_u16()),
        ));
    }

    resp.json::<T>().await.map_err(|e| {
        api_error(
            StatusCode::BAD_GATEWAY,
            format!("Upstream response was not valid JSON: {e}"),
        )
    })
}

#[derive(Debug, Deserialize)]
struct BrandParams {
    #[serde(default)]
    brand: Brand,
    bbox: String,
}

async fn osm_brand(
    State(state): State<AppState>,
    query: Result<Query<BrandParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let params = query_params(query)?;
    let bbox = parse_bbox(&params.bbox)?.rounded(BBOX_CACHE_PLACES);
    let key = cache_key(
        "brand",
        &json!({ "brand": params.brand.id(), "bbox": bbox_json(bbox) }),
    );
    if let Some(hit) = state.cached(&key) {
        return Ok(Json(hit));
    }

    let query = overpass::build_query(params.brand, bbox);
    let req = state
        .http
        .post(&state.config.overpass_endpoint)
        .timeout(OVERPASS_TIMEOUT)
        .form(&[("data", query)]);
    let osm: OverpassResponse = read_upstream(req).await?;

    let fc = overpass::to_feature_collection(&osm);
    debug!(
        "overpass {}: {} elements",
        params.brand.id(),
        osm.elements.len()
    );
    state.remember(key, fc.clone());
    Ok(Json(fc))
}

fn default_hours() -> f64 {
    24.0
}

fn default_minmag() -> f64 {
    2.5
}

#[derive(Debug, Deserialize)]
struct QuakeParams {
    #[serde(default = "default_hours")]
    hours: f64,
    #[serde(default = "default_minmag")]
    minmag: f64,
    bbox: String,
}

async fn usgs_quakes(
    State(state): State<AppState>,
    query: Result<Query<QuakeParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let params = query_params(query)?;
    let bbox = parse_bbox(&params.bbox)?;
    let start = usgs::start_time(Utc::now(), params.hours)
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "hours out of range"))?;
    let key = cache_key(
        "quakes",
        &json!({
            "hours": params.hours,
            "minmag": params.minmag,
            "bbox": bbox_json(bbox.rounded(BBOX_CACHE_PLACES)),
        }),
    );
    if let Some(hit) = state.cached(&key) {
        return Ok(Json(hit));
    }

    let req = state
        .http
        .get(&state.config.usgs_endpoint)
        .timeout(USGS_TIMEOUT)
        .query(&usgs::query_params(start, params.minmag, bbox));
    let data: Value = read_upstream(req).await?;

    state.remember(key, data.clone());
    Ok(Json(data))
}

fn env_var_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_var_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
