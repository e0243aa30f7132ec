//! Local media storage, mirror store, and HTTP fetch utilities.

pub mod mirror;

pub use mirror::{MirrorError, MirrorResult, MirrorStore, PushToken};

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use qo_core::{EntityKind, SyncContext};
use reqwest::StatusCode;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

pub const CRATE_NAME: &str = "qo-storage";

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: StatusCode,
    pub final_url: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
}

/// Thin reqwest wrapper with a bounded per-request timeout. A hung or failed
/// request is reported to the caller as-is; retries are the caller's call.
#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().context("building reqwest client")?;
        Ok(Self { client })
    }

    pub async fn get_bytes(&self, url: &str) -> Result<FetchedResponse, FetchError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        let final_url = resp.url().to_string();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: final_url,
            });
        }
        let body = resp.bytes().await?.to_vec();
        Ok(FetchedResponse {
            status,
            final_url,
            body,
        })
    }

    pub async fn get_json(
        &self,
        url: &str,
        bearer: Option<&str>,
    ) -> Result<serde_json::Value, FetchError> {
        let mut req = self.client.get(url);
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: resp.url().to_string(),
            });
        }
        Ok(resp.json().await?)
    }

    /// HEAD probe for the content type; any failure degrades to `None` so the
    /// caller can fall back to the URL path extension.
    pub async fn probe_content_type(&self, url: &str) -> Option<String> {
        let resp = self.client.head(url).send().await.ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let value = resp.headers().get(reqwest::header::CONTENT_TYPE)?;
        let text = value.to_str().ok()?;
        Some(
            text.split(';')
                .next()
                .unwrap_or(text)
                .trim()
                .to_ascii_lowercase(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct DownloadedMedia {
    pub path: PathBuf,
    pub filename: String,
    /// False when the stable target file already existed and no bytes moved.
    pub fresh: bool,
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("downloading {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("media file i/o at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Media mirror on local disk, partitioned `<root>/<context>/<entity-kind>/`.
/// Filenames derive from the entity slug only, so repeated syncs converge on
/// the same file instead of accumulating stamped duplicates.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir_for(&self, context: SyncContext, kind: EntityKind) -> PathBuf {
        self.root.join(context.as_str()).join(kind.as_str())
    }

    /// Collapse an entity name/slug to a filesystem-safe stem: alphanumerics
    /// keep, everything else folds to a single `-`.
    pub fn sanitize_slug(name: &str) -> String {
        let mut out = String::with_capacity(name.len());
        let mut last_dash = true;
        for ch in name.trim().chars() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                out.push(ch.to_ascii_lowercase());
                last_dash = false;
            } else if !last_dash {
                out.push('-');
                last_dash = true;
            }
        }
        while out.ends_with('-') {
            out.pop();
        }
        if out.is_empty() {
            out.push_str("media");
        }
        out
    }

    pub fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
        match content_type {
            "image/jpeg" => Some("jpg"),
            "image/png" => Some("png"),
            "image/webp" => Some("webp"),
            "image/gif" => Some("gif"),
            "image/svg+xml" => Some("svg"),
            "application/pdf" => Some("pdf"),
            _ => None,
        }
    }

    pub fn extension_from_url(url: &str) -> Option<String> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let segment = path.rsplit('/').next()?;
        let (_, ext) = segment.rsplit_once('.')?;
        if ext.is_empty() || ext.len() > 4 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    /// Download `url` into the managed directory under a name derived from
    /// `slug`. Idempotent: if a file with that stem already exists it is
    /// returned untouched, without any network traffic.
    pub async fn download(
        &self,
        http: &HttpFetcher,
        context: SyncContext,
        kind: EntityKind,
        url: &str,
        slug: &str,
    ) -> Result<DownloadedMedia, DownloadError> {
        let slug = Self::sanitize_slug(slug);
        let dir = self.dir_for(context, kind);
        fs::create_dir_all(&dir).await.map_err(|source| DownloadError::Io {
            path: dir.clone(),
            source,
        })?;

        if let Some(filename) = self.find_existing(&dir, &slug).await.map_err(|source| {
            DownloadError::Io {
                path: dir.clone(),
                source,
            }
        })? {
            debug!(%slug, %filename, "media already mirrored, skipping download");
            return Ok(DownloadedMedia {
                path: dir.join(&filename),
                filename,
                fresh: false,
            });
        }

        let extension = match http.probe_content_type(url).await {
            Some(ct) => Self::extension_from_content_type(&ct)
                .map(ToString::to_string)
                .or_else(|| Self::extension_from_url(url)),
            None => Self::extension_from_url(url),
        }
        .unwrap_or_else(|| "jpg".to_string());

        let resp = http.get_bytes(url).await.map_err(|source| DownloadError::Fetch {
            url: url.to_string(),
            source,
        })?;

        let filename = format!("{slug}.{extension}");
        let path = dir.join(&filename);
        fs::write(&path, &resp.body)
            .await
            .map_err(|source| DownloadError::Io {
                path: path.clone(),
                source,
            })?;

        Ok(DownloadedMedia {
            path,
            filename,
            fresh: true,
        })
    }

    async fn find_existing(&self, dir: &Path, slug: &str) -> std::io::Result<Option<String>> {
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let stem = name.rsplit_once('.').map(|(s, _)| s).unwrap_or(&name);
            if stem == slug {
                return Ok(Some(name));
            }
        }
        Ok(None)
    }

    /// Delete every file in the managed directory whose name is not in the
    /// current valid set. Returns the number of files removed.
    pub async fn cleanup_orphaned(
        &self,
        context: SyncContext,
        kind: EntityKind,
        valid: &HashSet<String>,
    ) -> anyhow::Result<usize> {
        let dir = self.dir_for(context, kind);
        if !fs::try_exists(&dir)
            .await
            .with_context(|| format!("checking media directory {}", dir.display()))?
        {
            return Ok(0);
        }

        let mut entries = fs::read_dir(&dir)
            .await
            .with_context(|| format!("reading media directory {}", dir.display()))?;
        let mut deleted = 0usize;
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("scanning media directory {}", dir.display()))?
        {
            if !entry.file_type().await.map(|ft| ft.is_file()).unwrap_or(false) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if !valid.contains(&name) {
                fs::remove_file(entry.path())
                    .await
                    .with_context(|| format!("removing orphaned media {}", entry.path().display()))?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}
