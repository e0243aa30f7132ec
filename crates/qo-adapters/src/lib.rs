//! Remote tabular source contracts + the Airtable-style implementation.

use async_trait::async_trait;
use chrono::Utc;
use qo_core::{MediaRef, Product, WebPhoto};
use qo_storage::{FetchError, HttpFetcher};
use serde_json::Value as JsonValue;
use thiserror::Error;

pub const CRATE_NAME: &str = "qo-adapters";

/// A failed remote fetch aborts the whole sync attempt; there is no
/// retry/backoff at this layer.
#[derive(Debug, Error)]
pub enum RemoteFetchError {
    #[error("remote source unreachable: {0}")]
    Transport(#[from] FetchError),
    #[error("invalid response from remote source: {0}")]
    InvalidResponse(String),
}

/// Read-only view of the external system of record. Implementations have no
/// side effects; rows arrive already normalized into the mirror shape.
#[async_trait]
pub trait TabularSource: Send + Sync {
    async fn fetch_products(&self) -> Result<Vec<Product>, RemoteFetchError>;
    async fn fetch_webphotos(&self) -> Result<Vec<WebPhoto>, RemoteFetchError>;
}

#[derive(Debug, Clone)]
pub struct AirtableConfig {
    pub base_url: String,
    pub base_id: String,
    pub api_key: String,
    pub products_table: String,
    pub webphotos_table: String,
    pub page_size: usize,
}

pub struct AirtableSource {
    config: AirtableConfig,
    http: HttpFetcher,
}

impl AirtableSource {
    pub fn new(config: AirtableConfig, http: HttpFetcher) -> Self {
        Self { config, http }
    }

    fn table_url(&self, table: &str, offset: Option<&str>) -> String {
        let mut url = format!(
            "{}/{}/{}?pageSize={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.base_id,
            table,
            self.config.page_size
        );
        if let Some(offset) = offset {
            url.push_str("&offset=");
            url.push_str(offset);
        }
        url
    }

    /// Follow `offset` cursors until the table is exhausted.
    async fn fetch_table(&self, table: &str) -> Result<Vec<JsonValue>, RemoteFetchError> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;
        loop {
            let url = self.table_url(table, offset.as_deref());
            let page = self.http.get_json(&url, Some(&self.config.api_key)).await?;
            let items = page
                .get("records")
                .and_then(JsonValue::as_array)
                .ok_or_else(|| {
                    RemoteFetchError::InvalidResponse(format!(
                        "missing records array for table {table}"
                    ))
                })?;
            records.extend(items.iter().cloned());
            match page.get("offset").and_then(JsonValue::as_str) {
                Some(next) => offset = Some(next.to_string()),
                None => break,
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl TabularSource for AirtableSource {
    async fn fetch_products(&self) -> Result<Vec<Product>, RemoteFetchError> {
        let records = self.fetch_table(&self.config.products_table).await?;
        Ok(records.iter().filter_map(product_from_record).collect())
    }

    async fn fetch_webphotos(&self) -> Result<Vec<WebPhoto>, RemoteFetchError> {
        let records = self.fetch_table(&self.config.webphotos_table).await?;
        Ok(records.iter().filter_map(webphoto_from_record).collect())
    }
}

/// Lenient row conversion: missing or malformed fields become defaults.
/// Only a record without a stable id is dropped.
pub fn product_from_record(record: &JsonValue) -> Option<Product> {
    let id = record.get("id").and_then(JsonValue::as_str)?.trim();
    if id.is_empty() {
        return None;
    }
    let fields = record.get("fields").cloned().unwrap_or(JsonValue::Null);
    Some(Product {
        id: id.to_string(),
        name: text(&fields, "Name"),
        brand: text(&fields, "Brand"),
        product_type: text(&fields, "Type"),
        category: text_list(&fields, "Category"),
        sub_category: text_list(&fields, "SubCategory"),
        price: integer(&fields, "Price"),
        price_with_discount: opt_integer(&fields, "PriceWithDiscount"),
        quantity: integer(&fields, "Quantity"),
        starred: boolean(&fields, "Starred"),
        colors: text_list(&fields, "Colors"),
        materials: opt_text(&fields, "Materials"),
        dimensions: opt_text(&fields, "Dimensions"),
        capacity: opt_text(&fields, "Capacity"),
        media: media_refs(&fields, "Images"),
        last_updated: Utc::now(),
    })
}

pub fn webphoto_from_record(record: &JsonValue) -> Option<WebPhoto> {
    let fields = record.get("fields")?;
    let name = opt_text(fields, "Name")?;
    let url = opt_text(fields, "URL")
        .or_else(|| media_refs(fields, "Image").first().map(|m| m.as_str().to_string()))?;
    Some(WebPhoto { name, url })
}

fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text(fields: &JsonValue, key: &str) -> String {
    fields.get(key).and_then(scalar_text).unwrap_or_default()
}

fn opt_text(fields: &JsonValue, key: &str) -> Option<String> {
    fields.get(key).and_then(scalar_text)
}

fn integer(fields: &JsonValue, key: &str) -> i64 {
    opt_integer(fields, key).unwrap_or(0)
}

fn opt_integer(fields: &JsonValue, key: &str) -> Option<i64> {
    let value = fields.get(key)?;
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn boolean(fields: &JsonValue, key: &str) -> bool {
    match fields.get(key) {
        Some(JsonValue::Bool(b)) => *b,
        Some(JsonValue::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Accepts both a single scalar and a list; the storefront data has
/// multi-valued categories next to legacy single-string rows.
fn text_list(fields: &JsonValue, key: &str) -> Vec<String> {
    match fields.get(key) {
        Some(JsonValue::Array(items)) => items.iter().filter_map(scalar_text).collect(),
        Some(other) => scalar_text(other).into_iter().collect(),
        None => Vec::new(),
    }
}

/// Attachment cells are arrays of `{url, ...}` objects; plain URL strings
/// and string lists are accepted too.
fn media_refs(fields: &JsonValue, key: &str) -> Vec<MediaRef> {
    match fields.get(key) {
        Some(JsonValue::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                JsonValue::Object(obj) => obj.get("url").and_then(scalar_text),
                other => scalar_text(other),
            })
            .map(MediaRef::from_raw)
            .collect(),
        Some(other) => scalar_text(other).map(MediaRef::from_raw).into_iter().collect(),
        None => Vec::new(),
    }
}
