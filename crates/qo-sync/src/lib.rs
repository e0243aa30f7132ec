//! Reconciliation driver: fetch remote, diff against the mirror, upsert,
//! delete vanished rows, mirror media, clean up orphans.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use qo_adapters::{AirtableConfig, AirtableSource, TabularSource};
use qo_core::{EntityKind, MediaRef, Product, SyncContext, SyncTimestamps, WebPhoto};
use qo_storage::{HttpClientConfig, HttpFetcher, MediaStore, MirrorStore};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

pub const CRATE_NAME: &str = "qo-sync";

/// Central configuration, constructed once at process start and passed by
/// reference; components do not read the environment themselves.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub data_dir: PathBuf,
    pub media_dir: PathBuf,
    pub timestamps_path: PathBuf,
    pub airtable_base_url: String,
    pub airtable_api_key: String,
    pub airtable_base_regular: String,
    pub airtable_base_virtual: String,
    pub products_table: String,
    pub webphotos_table: String,
    pub page_size: usize,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub web_port: u16,
    pub cache_ttl_secs: u64,
}

impl SyncConfig {
    pub fn from_env() -> Self {
        Self {
            data_dir: std::env::var("QO_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            media_dir: std::env::var("QO_MEDIA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./media")),
            timestamps_path: std::env::var("QO_SYNC_TIMESTAMPS")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/sync_timestamps.json")),
            airtable_base_url: std::env::var("AIRTABLE_BASE_URL")
                .unwrap_or_else(|_| "https://api.airtable.com/v0".to_string()),
            airtable_api_key: std::env::var("AIRTABLE_API_KEY").unwrap_or_default(),
            airtable_base_regular: std::env::var("AIRTABLE_BASE_ID_REGULAR").unwrap_or_default(),
            airtable_base_virtual: std::env::var("AIRTABLE_BASE_ID_VIRTUAL").unwrap_or_default(),
            products_table: std::env::var("AIRTABLE_PRODUCTS_TABLE")
                .unwrap_or_else(|_| "Products".to_string()),
            webphotos_table: std::env::var("AIRTABLE_WEBPHOTOS_TABLE")
                .unwrap_or_else(|_| "WebPhotos".to_string()),
            page_size: std::env::var("AIRTABLE_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            http_timeout_secs: std::env::var("QO_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            user_agent: std::env::var("QO_USER_AGENT")
                .unwrap_or_else(|_| "quickorder-mirror/0.1".to_string()),
            web_port: std::env::var("QO_WEB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            cache_ttl_secs: std::env::var("QO_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
        }
    }

    pub fn base_id_for(&self, context: SyncContext) -> &str {
        match context {
            SyncContext::Regular => &self.airtable_base_regular,
            SyncContext::Virtual => &self.airtable_base_virtual,
        }
    }

    pub fn airtable_config(&self, context: SyncContext) -> AirtableConfig {
        AirtableConfig {
            base_url: self.airtable_base_url.clone(),
            base_id: self.base_id_for(context).to_string(),
            api_key: self.airtable_api_key.clone(),
            products_table: self.products_table.clone(),
            webphotos_table: self.webphotos_table.clone(),
            page_size: self.page_size,
        }
    }

    pub fn http_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: Duration::from_secs(self.http_timeout_secs),
            user_agent: Some(self.user_agent.clone()),
        }
    }
}

/// Last-sync markers, persisted as one small JSON document read and written
/// wholesale so dependent clients can decide whether to re-pull.
#[derive(Debug, Clone)]
pub struct TimestampStore {
    path: PathBuf,
}

impl TimestampStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<SyncTimestamps> {
        if !self.path.exists() {
            return Ok(SyncTimestamps::default());
        }
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", self.path.display()))
    }

    pub fn save(&self, timestamps: &SyncTimestamps) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let bytes = serde_json::to_vec_pretty(timestamps).context("serializing sync timestamps")?;
        std::fs::write(&self.path, bytes)
            .with_context(|| format!("writing {}", self.path.display()))
    }

    pub fn record(
        &self,
        kind: EntityKind,
        context: SyncContext,
        when: DateTime<Utc>,
    ) -> Result<()> {
        let mut timestamps = self.load()?;
        timestamps.set(kind, context, when);
        self.save(&timestamps)
    }

    pub fn record_named(&self, name: &str, when: DateTime<Utc>) -> Result<()> {
        let mut timestamps = self.load()?;
        timestamps.set_named(name, when);
        self.save(&timestamps)
    }
}

/// Hook the query façade hands to the driver so a successful sync drops
/// cached reads immediately instead of waiting out the TTL.
pub trait CacheInvalidation: Send + Sync {
    fn invalidate(&self, context: SyncContext);
}

#[derive(Default)]
pub struct NoopInvalidation;

impl CacheInvalidation for NoopInvalidation {
    fn invalidate(&self, _context: SyncContext) {}
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSyncSummary {
    pub run_id: Uuid,
    pub context: SyncContext,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub products_count: usize,
    pub updated_count: usize,
    pub deleted_count: usize,
    pub failed_count: usize,
    pub downloaded_media: usize,
    pub orphans_removed: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebPhotoSyncSummary {
    pub run_id: Uuid,
    pub context: SyncContext,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub web_photos_count: usize,
    pub updated_count: usize,
    pub deleted_count: usize,
    pub failed_count: usize,
    pub downloaded_media: usize,
    pub orphans_removed: usize,
}

enum UpsertOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Runs one reconciliation pass to completion inside the triggering request.
/// Remote fetches and downloads are sequential; callers must not overlap
/// runs against the same context.
pub struct Reconciler {
    source: Box<dyn TabularSource>,
    media: MediaStore,
    http: HttpFetcher,
    timestamps: TimestampStore,
    invalidation: Box<dyn CacheInvalidation>,
}

impl Reconciler {
    pub fn new(
        source: Box<dyn TabularSource>,
        media: MediaStore,
        http: HttpFetcher,
        timestamps: TimestampStore,
    ) -> Self {
        Self {
            source,
            media,
            http,
            timestamps,
            invalidation: Box::<NoopInvalidation>::default(),
        }
    }

    pub fn with_invalidation(mut self, hook: Box<dyn CacheInvalidation>) -> Self {
        self.invalidation = hook;
        self
    }

    pub async fn sync_products(
        &self,
        store: &MirrorStore,
        context: SyncContext,
    ) -> Result<ProductSyncSummary> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        info!(%run_id, context = %context, "starting product sync");

        // A failed remote fetch aborts the run with the mirror untouched.
        let remote = self
            .source
            .fetch_products()
            .await
            .context("fetching remote product set")?;
        let local = store.all_products().context("reading product mirror")?;

        // Deletions come from a snapshot taken before any mutation.
        let remote_ids: HashSet<&str> = remote.iter().map(|p| p.id.as_str()).collect();
        let mut deleted_count = 0usize;
        for existing in &local {
            if !remote_ids.contains(existing.id.as_str())
                && store.delete_product(&existing.id).context("deleting vanished product")?
            {
                deleted_count += 1;
            }
        }

        let local_by_id: HashMap<&str, &Product> =
            local.iter().map(|p| (p.id.as_str(), p)).collect();

        let mut products_count = 0usize;
        let mut updated_count = 0usize;
        let mut failed_count = 0usize;
        let mut downloaded_media = 0usize;

        for mut product in remote {
            for (idx, media) in product.media.iter_mut().enumerate() {
                let MediaRef::Remote(url) = media.clone() else {
                    continue;
                };
                let slug = format!("{}-{}", product.id, idx);
                match self
                    .media
                    .download(&self.http, context, EntityKind::Products, &url, &slug)
                    .await
                {
                    Ok(got) => {
                        if got.fresh {
                            downloaded_media += 1;
                        }
                        *media = MediaRef::Local(local_media_url(EntityKind::Products, &got.filename));
                    }
                    Err(err) => {
                        // Keep the remote URL as the reference value.
                        warn!(%run_id, product_id = %product.id, error = %err, "media download failed");
                        failed_count += 1;
                    }
                }
            }

            let outcome = match local_by_id.get(product.id.as_str()) {
                Some(existing) => {
                    if existing.content_differs(&product) {
                        product.last_updated = Utc::now();
                        store
                            .update_product(&product.id, &product)
                            .map(|_| UpsertOutcome::Updated)
                    } else {
                        Ok(UpsertOutcome::Unchanged)
                    }
                }
                None => {
                    product.last_updated = Utc::now();
                    store.insert_product(&product).map(|_| UpsertOutcome::Created)
                }
            };
            match outcome {
                Ok(UpsertOutcome::Updated) => {
                    products_count += 1;
                    updated_count += 1;
                }
                Ok(_) => products_count += 1,
                Err(err) => {
                    warn!(%run_id, product_id = %product.id, error = %err, "skipping product upsert");
                    failed_count += 1;
                }
            }
        }

        let valid: HashSet<String> = store
            .all_products()
            .context("re-reading product mirror for cleanup")?
            .iter()
            .flat_map(|p| p.media.iter())
            .filter(|m| !m.is_remote())
            .map(|m| m.filename().to_string())
            .collect();
        let orphans_removed = self
            .media
            .cleanup_orphaned(context, EntityKind::Products, &valid)
            .await
            .context("cleaning up orphaned product media")?;

        let finished_at = Utc::now();
        self.timestamps
            .record(EntityKind::Products, context, finished_at)
            .context("recording product sync timestamp")?;
        self.invalidation.invalidate(context);

        info!(
            %run_id,
            context = %context,
            products = products_count,
            updated = updated_count,
            deleted = deleted_count,
            failed = failed_count,
            downloaded = downloaded_media,
            "product sync finished"
        );

        Ok(ProductSyncSummary {
            run_id,
            context,
            started_at,
            finished_at,
            products_count,
            updated_count,
            deleted_count,
            failed_count,
            downloaded_media,
            orphans_removed,
        })
    }

    pub async fn sync_webphotos(
        &self,
        store: &MirrorStore,
        context: SyncContext,
    ) -> Result<WebPhotoSyncSummary> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        info!(%run_id, context = %context, "starting webphoto sync");

        let remote = self
            .source
            .fetch_webphotos()
            .await
            .context("fetching remote webphoto set")?;
        let local = store.all_webphotos().context("reading webphoto mirror")?;

        let remote_names: HashSet<&str> = remote.iter().map(|w| w.name.as_str()).collect();
        let mut deleted_count = 0usize;
        for existing in &local {
            if !remote_names.contains(existing.name.as_str())
                && store
                    .delete_webphoto(&existing.name)
                    .context("deleting vanished webphoto")?
            {
                deleted_count += 1;
            }
        }

        let local_by_name: HashMap<&str, &WebPhoto> =
            local.iter().map(|w| (w.name.as_str(), w)).collect();

        let mut web_photos_count = 0usize;
        let mut updated_count = 0usize;
        let mut failed_count = 0usize;
        let mut downloaded_media = 0usize;

        for mut photo in remote {
            if MediaRef::from_raw(photo.url.clone()).is_remote() {
                match self
                    .media
                    .download(&self.http, context, EntityKind::WebPhotos, &photo.url, &photo.name)
                    .await
                {
                    Ok(got) => {
                        if got.fresh {
                            downloaded_media += 1;
                        }
                        photo.url = local_media_url(EntityKind::WebPhotos, &got.filename);
                    }
                    Err(err) => {
                        warn!(%run_id, photo = %photo.name, error = %err, "media download failed");
                        failed_count += 1;
                    }
                }
            }

            let changed = local_by_name
                .get(photo.name.as_str())
                .map(|existing| existing.url != photo.url)
                .unwrap_or(true);
            if changed {
                match store.upsert_webphoto(&photo) {
                    Ok(()) => {
                        web_photos_count += 1;
                        if local_by_name.contains_key(photo.name.as_str()) {
                            updated_count += 1;
                        }
                    }
                    Err(err) => {
                        warn!(%run_id, photo = %photo.name, error = %err, "skipping webphoto upsert");
                        failed_count += 1;
                    }
                }
            } else {
                web_photos_count += 1;
            }
        }

        let valid: HashSet<String> = store
            .all_webphotos()
            .context("re-reading webphoto mirror for cleanup")?
            .iter()
            .map(|w| MediaRef::from_raw(w.url.clone()))
            .filter(|m| !m.is_remote())
            .map(|m| m.filename().to_string())
            .collect();
        let orphans_removed = self
            .media
            .cleanup_orphaned(context, EntityKind::WebPhotos, &valid)
            .await
            .context("cleaning up orphaned webphoto media")?;

        let finished_at = Utc::now();
        self.timestamps
            .record(EntityKind::WebPhotos, context, finished_at)
            .context("recording webphoto sync timestamp")?;
        self.invalidation.invalidate(context);

        info!(
            %run_id,
            context = %context,
            webphotos = web_photos_count,
            updated = updated_count,
            deleted = deleted_count,
            failed = failed_count,
            downloaded = downloaded_media,
            "webphoto sync finished"
        );

        Ok(WebPhotoSyncSummary {
            run_id,
            context,
            started_at,
            finished_at,
            web_photos_count,
            updated_count,
            deleted_count,
            failed_count,
            downloaded_media,
            orphans_removed,
        })
    }
}

/// Wire up a reconciler against the configured remote base for one context.
pub fn reconciler_from_config(config: &SyncConfig, context: SyncContext) -> Result<Reconciler> {
    let source = AirtableSource::new(
        config.airtable_config(context),
        HttpFetcher::new(config.http_config()).context("building remote source client")?,
    );
    let http = HttpFetcher::new(config.http_config()).context("building media client")?;
    Ok(Reconciler::new(
        Box::new(source),
        MediaStore::new(config.media_dir.clone()),
        http,
        TimestampStore::new(config.timestamps_path.clone()),
    ))
}

fn local_media_url(kind: EntityKind, filename: &str) -> String {
    format!("/images/{}/{}", kind.as_str(), filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use qo_adapters::RemoteFetchError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    struct FixtureSource {
        products: Vec<Product>,
        webphotos: Vec<WebPhoto>,
        fail: bool,
        product_fetches: Arc<AtomicUsize>,
    }

    impl FixtureSource {
        fn products(products: Vec<Product>) -> Self {
            Self {
                products,
                webphotos: Vec::new(),
                fail: false,
                product_fetches: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn webphotos(webphotos: Vec<WebPhoto>) -> Self {
            Self {
                products: Vec::new(),
                webphotos,
                fail: false,
                product_fetches: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing() -> Self {
            Self {
                products: Vec::new(),
                webphotos: Vec::new(),
                fail: true,
                product_fetches: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl TabularSource for FixtureSource {
        async fn fetch_products(&self) -> Result<Vec<Product>, RemoteFetchError> {
            if self.fail {
                return Err(RemoteFetchError::InvalidResponse("boom".into()));
            }
            self.product_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.products.clone())
        }

        async fn fetch_webphotos(&self) -> Result<Vec<WebPhoto>, RemoteFetchError> {
            if self.fail {
                return Err(RemoteFetchError::InvalidResponse("boom".into()));
            }
            Ok(self.webphotos.clone())
        }
    }

    fn product(id: &str, name: &str, price: i64) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            brand: "Naranjos".into(),
            product_type: "Backpack".into(),
            category: vec!["Bags".into()],
            sub_category: vec![],
            price,
            price_with_discount: None,
            quantity: 1,
            starred: false,
            colors: vec![],
            materials: None,
            dimensions: None,
            capacity: None,
            media: vec![],
            last_updated: Utc::now(),
        }
    }

    fn reconciler(source: FixtureSource, root: &std::path::Path) -> Reconciler {
        Reconciler::new(
            Box::new(source),
            MediaStore::new(root.join("media")),
            HttpFetcher::new(HttpClientConfig::default()).unwrap(),
            TimestampStore::new(root.join("sync_timestamps.json")),
        )
    }

    #[tokio::test]
    async fn first_sync_creates_second_sync_is_idempotent() {
        let dir = tempdir().expect("tempdir");
        let store = MirrorStore::open(&dir.path().join("data"), SyncContext::Regular).unwrap();
        let rec = reconciler(
            FixtureSource::products(vec![product("A", "Widget", 100)]),
            dir.path(),
        );

        let first = rec.sync_products(&store, SyncContext::Regular).await.unwrap();
        assert_eq!(first.products_count, 1);
        assert_eq!(first.deleted_count, 0);
        let stamped = store.get_product("A").unwrap().last_updated;

        let second = rec.sync_products(&store, SyncContext::Regular).await.unwrap();
        assert_eq!(second.products_count, 1);
        assert_eq!(second.updated_count, 0);
        assert_eq!(second.downloaded_media, 0);
        assert_eq!(store.get_product("A").unwrap().last_updated, stamped);
    }

    #[tokio::test]
    async fn vanished_remote_rows_are_deleted() {
        let dir = tempdir().expect("tempdir");
        let store = MirrorStore::open(&dir.path().join("data"), SyncContext::Regular).unwrap();

        let seed = reconciler(
            FixtureSource::products(vec![product("A", "Widget", 100), product("B", "Gadget", 50)]),
            dir.path(),
        );
        seed.sync_products(&store, SyncContext::Regular).await.unwrap();

        let shrunk = reconciler(
            FixtureSource::products(vec![product("A", "Widget", 100)]),
            dir.path(),
        );
        let summary = shrunk.sync_products(&store, SyncContext::Regular).await.unwrap();
        assert_eq!(summary.deleted_count, 1);
        assert!(matches!(
            store.get_product("B"),
            Err(qo_storage::MirrorError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn changed_fields_update_the_row() {
        let dir = tempdir().expect("tempdir");
        let store = MirrorStore::open(&dir.path().join("data"), SyncContext::Regular).unwrap();
        reconciler(FixtureSource::products(vec![product("A", "Widget", 100)]), dir.path())
            .sync_products(&store, SyncContext::Regular)
            .await
            .unwrap();

        let summary = reconciler(
            FixtureSource::products(vec![product("A", "Widget", 120)]),
            dir.path(),
        )
        .sync_products(&store, SyncContext::Regular)
        .await
        .unwrap();
        assert_eq!(summary.updated_count, 1);
        assert_eq!(store.get_product("A").unwrap().price, 120);
    }

    #[tokio::test]
    async fn remote_fetch_failure_leaves_mirror_untouched() {
        let dir = tempdir().expect("tempdir");
        let store = MirrorStore::open(&dir.path().join("data"), SyncContext::Regular).unwrap();
        store.insert_product(&product("A", "Widget", 100)).unwrap();

        let rec = reconciler(FixtureSource::failing(), dir.path());
        assert!(rec.sync_products(&store, SyncContext::Regular).await.is_err());
        assert_eq!(store.all_products().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_download_keeps_remote_url_and_other_entities_land() {
        let dir = tempdir().expect("tempdir");
        let store = MirrorStore::open(&dir.path().join("data"), SyncContext::Regular).unwrap();

        let mut broken = product("A", "Widget", 100);
        broken.media = vec![MediaRef::from_raw("http://127.0.0.1:1/unreachable.jpg")];
        let fine = product("B", "Gadget", 50);

        let summary = reconciler(FixtureSource::products(vec![broken, fine]), dir.path())
            .sync_products(&store, SyncContext::Regular)
            .await
            .unwrap();

        assert_eq!(summary.products_count, 2);
        assert_eq!(summary.failed_count, 1);
        let kept = store.get_product("A").unwrap();
        assert!(kept.media[0].is_remote());
        assert!(store.get_product("B").is_ok());
    }

    #[tokio::test]
    async fn previously_mirrored_media_is_reused_and_localized() {
        let dir = tempdir().expect("tempdir");
        let store = MirrorStore::open(&dir.path().join("data"), SyncContext::Regular).unwrap();
        let media_root = dir.path().join("media");
        let products_dir = media_root.join("regular").join("products");
        std::fs::create_dir_all(&products_dir).unwrap();
        std::fs::write(products_dir.join("a-0.jpg"), b"cached").unwrap();

        let mut item = product("A", "Widget", 100);
        item.media = vec![MediaRef::from_raw("https://cdn.example/whatever.jpg")];

        let summary = reconciler(FixtureSource::products(vec![item]), dir.path())
            .sync_products(&store, SyncContext::Regular)
            .await
            .unwrap();

        assert_eq!(summary.downloaded_media, 0);
        let got = store.get_product("A").unwrap();
        assert_eq!(got.media[0].as_str(), "/images/products/a-0.jpg");
    }

    #[tokio::test]
    async fn orphaned_media_is_cleaned_after_sync() {
        let dir = tempdir().expect("tempdir");
        let store = MirrorStore::open(&dir.path().join("data"), SyncContext::Regular).unwrap();
        let products_dir = dir.path().join("media").join("regular").join("products");
        std::fs::create_dir_all(&products_dir).unwrap();
        std::fs::write(products_dir.join("stale.jpg"), b"old").unwrap();

        let summary = reconciler(FixtureSource::products(vec![product("A", "Widget", 100)]), dir.path())
            .sync_products(&store, SyncContext::Regular)
            .await
            .unwrap();

        assert_eq!(summary.orphans_removed, 1);
        assert!(!products_dir.join("stale.jpg").exists());
    }

    #[tokio::test]
    async fn webphoto_sync_tracks_names_and_timestamps() {
        let dir = tempdir().expect("tempdir");
        let store = MirrorStore::open(&dir.path().join("data"), SyncContext::Virtual).unwrap();
        let webphotos_dir = dir.path().join("media").join("virtual").join("webphotos");
        std::fs::create_dir_all(&webphotos_dir).unwrap();
        std::fs::write(webphotos_dir.join("logo.png"), b"cached").unwrap();

        let rec = reconciler(
            FixtureSource::webphotos(vec![WebPhoto {
                name: "logo".into(),
                url: "https://cdn.example/logo.png".into(),
            }]),
            dir.path(),
        );
        let summary = rec.sync_webphotos(&store, SyncContext::Virtual).await.unwrap();
        assert_eq!(summary.web_photos_count, 1);
        assert_eq!(summary.downloaded_media, 0);
        assert_eq!(
            store.get_webphoto("logo").unwrap().url,
            "/images/webphotos/logo.png"
        );

        let timestamps = TimestampStore::new(dir.path().join("sync_timestamps.json"))
            .load()
            .unwrap();
        assert!(timestamps
            .get(EntityKind::WebPhotos, SyncContext::Virtual)
            .is_some());
        assert!(timestamps.get(EntityKind::WebPhotos, SyncContext::Regular).is_none());
    }

    #[test]
    fn timestamp_store_round_trips_wholesale() {
        let dir = tempdir().expect("tempdir");
        let store = TimestampStore::new(dir.path().join("nested").join("ts.json"));
        assert!(store.load().unwrap().is_empty());

        let when = Utc::now();
        store.record(EntityKind::Products, SyncContext::Regular, when).unwrap();
        store.record_named("catalog_pdf", when).unwrap();

        let loaded = store.load().unwrap();
        assert!(loaded.get(EntityKind::Products, SyncContext::Regular).is_some());
        assert!(loaded.get_named("catalog_pdf").is_some());
    }
}
