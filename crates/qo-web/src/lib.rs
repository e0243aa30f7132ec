//! Axum JSON façade over the mirror stores: sync triggers, cached queries,
//! timestamp markers, and local media streaming.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use qo_core::{EntityKind, Product, SyncContext};
use qo_storage::{MediaStore, MirrorError, MirrorStore};
use qo_sync::{reconciler_from_config, CacheInvalidation, SyncConfig, TimestampStore};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tokio::net::TcpListener;

pub const CRATE_NAME: &str = "qo-web";

/// Process-local read cache keyed by (context, query shape). Entries expire
/// by TTL; the reconciler additionally drops a context's entries through
/// [`CacheInvalidation`] on every successful sync.
pub struct QueryCache {
    ttl: Duration,
    entries: Mutex<HashMap<(SyncContext, String), (Instant, JsonValue)>>,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, context: SyncContext, key: &str) -> Option<JsonValue> {
        let entries = self.entries.lock().expect("query cache lock poisoned");
        let (stored_at, value) = entries.get(&(context, key.to_string()))?;
        if stored_at.elapsed() > self.ttl {
            return None;
        }
        Some(value.clone())
    }

    pub fn put(&self, context: SyncContext, key: String, value: JsonValue) {
        let mut entries = self.entries.lock().expect("query cache lock poisoned");
        entries.insert((context, key), (Instant::now(), value));
    }

    pub fn invalidate(&self, context: SyncContext) {
        let mut entries = self.entries.lock().expect("query cache lock poisoned");
        entries.retain(|(ctx, _), _| *ctx != context);
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().expect("query cache lock poisoned");
        entries.clear();
    }
}

struct CacheHook(Arc<QueryCache>);

impl CacheInvalidation for CacheHook {
    fn invalidate(&self, context: SyncContext) {
        self.0.invalidate(context);
    }
}

pub struct AppState {
    pub config: SyncConfig,
    regular: MirrorStore,
    virtual_store: MirrorStore,
    pub cache: Arc<QueryCache>,
    timestamps: TimestampStore,
    media: MediaStore,
}

impl AppState {
    pub fn new(config: SyncConfig) -> anyhow::Result<Self> {
        let regular = MirrorStore::open(&config.data_dir, SyncContext::Regular)?;
        let virtual_store = MirrorStore::open(&config.data_dir, SyncContext::Virtual)?;
        let cache = Arc::new(QueryCache::new(Duration::from_secs(config.cache_ttl_secs)));
        let timestamps = TimestampStore::new(config.timestamps_path.clone());
        let media = MediaStore::new(config.media_dir.clone());
        Ok(Self {
            config,
            regular,
            virtual_store,
            cache,
            timestamps,
            media,
        })
    }

    pub fn store(&self, context: SyncContext) -> &MirrorStore {
        match context {
            SyncContext::Regular => &self.regular,
            SyncContext::Virtual => &self.virtual_store,
        }
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sync/products", post(sync_products_handler))
        .route("/sync/webphotos", post(sync_webphotos_handler))
        .route(
            "/sync/timestamps",
            get(get_timestamps_handler).post(post_timestamp_handler),
        )
        .route("/products", get(products_handler))
        .route("/webphotos", get(webphotos_handler))
        .route("/cache/refresh", post(cache_refresh_handler))
        .route("/images/{kind}/{filename}", get(image_handler))
        .with_state(state)
}

pub async fn serve(config: SyncConfig) -> anyhow::Result<()> {
    let port = config.web_port;
    let state = Arc::new(AppState::new(config)?);
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct SyncRequest {
    context: SyncContext,
}

async fn sync_products_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SyncRequest>,
) -> Response {
    let reconciler = match reconciler_from_config(&state.config, req.context) {
        Ok(reconciler) => reconciler.with_invalidation(Box::new(CacheHook(state.cache.clone()))),
        Err(err) => return error_json(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    };
    match reconciler.sync_products(state.store(req.context), req.context).await {
        Ok(summary) => Json(json!({
            "success": true,
            "runId": summary.run_id,
            "productsCount": summary.products_count,
            "deletedCount": summary.deleted_count,
            "failedCount": summary.failed_count,
        }))
        .into_response(),
        Err(err) => error_json(StatusCode::BAD_GATEWAY, format!("{err:#}")),
    }
}

async fn sync_webphotos_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SyncRequest>,
) -> Response {
    let reconciler = match reconciler_from_config(&state.config, req.context) {
        Ok(reconciler) => reconciler.with_invalidation(Box::new(CacheHook(state.cache.clone()))),
        Err(err) => return error_json(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    };
    match reconciler.sync_webphotos(state.store(req.context), req.context).await {
        Ok(summary) => Json(json!({
            "success": true,
            "runId": summary.run_id,
            "webPhotosCount": summary.web_photos_count,
            "deletedCount": summary.deleted_count,
            "failedCount": summary.failed_count,
        }))
        .into_response(),
        Err(err) => error_json(StatusCode::BAD_GATEWAY, format!("{err:#}")),
    }
}

#[derive(Debug, Deserialize, Default)]
struct ProductsQuery {
    context: Option<String>,
    search: Option<String>,
    category: Option<String>,
    brand: Option<String>,
    #[serde(rename = "type")]
    product_type: Option<String>,
}

async fn products_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductsQuery>,
) -> Response {
    let context = match parse_context(query.context.as_deref()) {
        Ok(context) => context,
        Err(resp) => return resp,
    };
    let cache_key = format!(
        "products:search={:?}:category={:?}:brand={:?}:type={:?}",
        query.search, query.category, query.brand, query.product_type
    );
    if let Some(hit) = state.cache.get(context, &cache_key) {
        return Json(hit).into_response();
    }

    match load_products(state.store(context), &query) {
        Ok(rows) => {
            let payload = json!({
                "success": true,
                "count": rows.len(),
                "products": rows,
            });
            state.cache.put(context, cache_key, payload.clone());
            Json(payload).into_response()
        }
        Err(err) => mirror_error(err),
    }
}

fn load_products(store: &MirrorStore, query: &ProductsQuery) -> Result<Vec<Product>, MirrorError> {
    // Start from the most selective indexed lookup, then narrow in memory.
    let mut rows = if let Some(brand) = &query.brand {
        store.products_by_brand(brand)?
    } else if let Some(product_type) = &query.product_type {
        store.products_by_type(product_type)?
    } else if let Some(category) = &query.category {
        store.products_by_category(category)?
    } else if let Some(search) = &query.search {
        store.search_products(search)?
    } else {
        store.all_products()?
    };
    if let Some(product_type) = &query.product_type {
        rows.retain(|p| p.has_type(product_type));
    }
    if let Some(category) = &query.category {
        rows.retain(|p| p.in_category(category));
    }
    if let Some(search) = &query.search {
        rows.retain(|p| p.matches_search(search));
    }
    Ok(rows)
}

#[derive(Debug, Deserialize, Default)]
struct ContextQuery {
    context: Option<String>,
}

async fn webphotos_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ContextQuery>,
) -> Response {
    let context = match parse_context(query.context.as_deref()) {
        Ok(context) => context,
        Err(resp) => return resp,
    };
    if let Some(hit) = state.cache.get(context, "webphotos") {
        return Json(hit).into_response();
    }

    match state.store(context).all_webphotos() {
        Ok(photos) => {
            let mapping: BTreeMap<String, String> =
                photos.into_iter().map(|w| (w.name, w.url)).collect();
            let payload = json!({
                "success": true,
                "count": mapping.len(),
                "webPhotos": mapping,
            });
            state.cache.put(context, "webphotos".to_string(), payload.clone());
            Json(payload).into_response()
        }
        Err(err) => mirror_error(err),
    }
}

async fn get_timestamps_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.timestamps.load() {
        Ok(timestamps) => Json(json!({
            "success": true,
            "timestamps": timestamps,
        }))
        .into_response(),
        Err(err) => error_json(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct TimestampUpdate {
    #[serde(rename = "type")]
    name: String,
    timestamp: DateTime<Utc>,
}

async fn post_timestamp_handler(
    State(state): State<Arc<AppState>>,
    Json(update): Json<TimestampUpdate>,
) -> Response {
    match state.timestamps.record_named(&update.name, update.timestamp) {
        Ok(()) => Json(json!({"success": true})).into_response(),
        Err(err) => error_json(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

async fn cache_refresh_handler(State(state): State<Arc<AppState>>) -> Response {
    state.cache.clear();
    Json(json!({"success": true})).into_response()
}

#[derive(Debug, Deserialize, Default)]
struct ImageQuery {
    context: Option<String>,
}

async fn image_handler(
    State(state): State<Arc<AppState>>,
    AxumPath((kind, filename)): AxumPath<(String, String)>,
    Query(query): Query<ImageQuery>,
) -> Response {
    let context = match parse_context(query.context.as_deref()) {
        Ok(context) => context,
        Err(resp) => return resp,
    };
    let kind = match kind.as_str() {
        "products" => EntityKind::Products,
        "webphotos" => EntityKind::WebPhotos,
        _ => return error_json(StatusCode::NOT_FOUND, format!("unknown media type {kind}")),
    };
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return error_json(StatusCode::BAD_REQUEST, "invalid filename".to_string());
    }

    let path = state.media.dir_for(context, kind).join(&filename);
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, content_type_for(&filename)),
                (
                    header::CACHE_CONTROL,
                    "public, max-age=31536000, immutable",
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(_) => error_json(StatusCode::NOT_FOUND, format!("no such media {filename}")),
    }
}

fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

fn parse_context(raw: Option<&str>) -> Result<SyncContext, Response> {
    match raw {
        None => Ok(SyncContext::Regular),
        Some(value) => SyncContext::parse(value).ok_or_else(|| {
            error_json(
                StatusCode::BAD_REQUEST,
                format!("unknown context {value:?}"),
            )
        }),
    }
}

fn mirror_error(err: MirrorError) -> Response {
    match err {
        MirrorError::NotFound(what) => error_json(StatusCode::NOT_FOUND, what),
        other => error_json(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

fn error_json(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(json!({"success": false, "error": message})),
    )
        .into_response()
}
