//! Core domain model for the QuickOrder mirror.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const CRATE_NAME: &str = "qo-core";

/// Deployment variant. Each context owns an independent mirror store file
/// and media subdirectory; readers and writers never cross contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncContext {
    Regular,
    Virtual,
}

impl SyncContext {
    pub const ALL: [SyncContext; 2] = [SyncContext::Regular, SyncContext::Virtual];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncContext::Regular => "regular",
            SyncContext::Virtual => "virtual",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "regular" => Some(SyncContext::Regular),
            "virtual" => Some(SyncContext::Virtual),
            _ => None,
        }
    }
}

impl std::fmt::Display for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity family a mirror row or media file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Products,
    WebPhotos,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Products => "products",
            EntityKind::WebPhotos => "webphotos",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A media reference is either still remote (to be downloaded) or already
/// mirrored locally. On the wire it is the raw string, classified by prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRef {
    Remote(String),
    Local(String),
}

impl MediaRef {
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            MediaRef::Remote(raw)
        } else {
            MediaRef::Local(raw)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MediaRef::Remote(s) | MediaRef::Local(s) => s,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, MediaRef::Remote(_))
    }

    /// Trailing path segment, used to match mirror rows against files on disk.
    pub fn filename(&self) -> &str {
        self.as_str().rsplit('/').next().unwrap_or_default()
    }
}

impl Serialize for MediaRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MediaRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(MediaRef::from_raw(raw))
    }
}

/// Canonical product row, keyed by the stable external record id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default, rename = "type")]
    pub product_type: String,
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default)]
    pub sub_category: Vec<String>,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub price_with_discount: Option<i64>,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub starred: bool,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub materials: Option<String>,
    #[serde(default)]
    pub dimensions: Option<String>,
    #[serde(default)]
    pub capacity: Option<String>,
    #[serde(default)]
    pub media: Vec<MediaRef>,
    pub last_updated: DateTime<Utc>,
}

impl Product {
    /// Deep comparison over tracked fields, excluding the volatile
    /// `last_updated` stamp. An unchanged remote row must not dirty the mirror.
    pub fn content_differs(&self, other: &Product) -> bool {
        self.name != other.name
            || self.brand != other.brand
            || self.product_type != other.product_type
            || self.category != other.category
            || self.sub_category != other.sub_category
            || self.price != other.price
            || self.price_with_discount != other.price_with_discount
            || self.quantity != other.quantity
            || self.starred != other.starred
            || self.colors != other.colors
            || self.materials != other.materials
            || self.dimensions != other.dimensions
            || self.capacity != other.capacity
            || self.media != other.media
    }

    pub fn in_category(&self, filter: &str) -> bool {
        let wanted = norm(filter);
        self.category.iter().any(|c| norm(c) == wanted)
    }

    pub fn in_subcategory(&self, filter: &str) -> bool {
        let wanted = norm(filter);
        self.sub_category.iter().any(|c| norm(c) == wanted)
    }

    pub fn has_brand(&self, filter: &str) -> bool {
        norm(&self.brand) == norm(filter)
    }

    pub fn has_type(&self, filter: &str) -> bool {
        norm(&self.product_type) == norm(filter)
    }

    pub fn matches_search(&self, query: &str) -> bool {
        let needle = norm(query);
        if needle.is_empty() {
            return true;
        }
        norm(&self.name).contains(&needle)
            || norm(&self.brand).contains(&needle)
            || norm(&self.product_type).contains(&needle)
    }
}

/// Named non-product media asset (logo, banner, catalog PDF). `name` is the
/// unique key per mirror instance; `url` is remote until mirrored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebPhoto {
    pub name: String,
    pub url: String,
}

/// Drives which subcategory filters are shown for a category.
/// Toggling `is_active` is a soft-delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRelation {
    pub id: String,
    pub category: String,
    pub subcategory: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Last successful reconciliation instants, serialized wholesale as one
/// JSON document keyed `<entity>_<context>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncTimestamps {
    #[serde(flatten)]
    entries: BTreeMap<String, DateTime<Utc>>,
}

impl SyncTimestamps {
    pub fn key(kind: EntityKind, context: SyncContext) -> String {
        format!("{}_{}", kind.as_str(), context.as_str())
    }

    pub fn get(&self, kind: EntityKind, context: SyncContext) -> Option<DateTime<Utc>> {
        self.entries.get(&Self::key(kind, context)).copied()
    }

    pub fn get_named(&self, name: &str) -> Option<DateTime<Utc>> {
        self.entries.get(name).copied()
    }

    pub fn set(&mut self, kind: EntityKind, context: SyncContext, when: DateTime<Utc>) {
        self.entries.insert(Self::key(kind, context), when);
    }

    pub fn set_named(&mut self, name: &str, when: DateTime<Utc>) {
        self.entries.insert(name.to_string(), when);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Trim + ASCII case fold; every category/brand/type comparison goes
/// through this so filters match regardless of source formatting.
pub fn norm(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_product() -> Product {
        Product {
            id: "recA1".into(),
            name: "Widget".into(),
            brand: "Naranjos".into(),
            product_type: "Backpack".into(),
            category: vec!["Bags ".into()],
            sub_category: vec!["School".into()],
            price: 100,
            price_with_discount: None,
            quantity: 5,
            starred: false,
            colors: vec!["red".into()],
            materials: None,
            dimensions: None,
            capacity: None,
            media: vec![MediaRef::from_raw("https://cdn.example/a.jpg")],
            last_updated: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().unwrap(),
        }
    }

    #[test]
    fn context_parses_case_insensitively() {
        assert_eq!(SyncContext::parse(" Regular "), Some(SyncContext::Regular));
        assert_eq!(SyncContext::parse("VIRTUAL"), Some(SyncContext::Virtual));
        assert_eq!(SyncContext::parse("staging"), None);
    }

    #[test]
    fn media_ref_classifies_by_prefix() {
        assert!(MediaRef::from_raw("https://cdn.example/a.jpg").is_remote());
        assert!(!MediaRef::from_raw("/images/products/a.jpg").is_remote());
        assert_eq!(
            MediaRef::from_raw("/images/products/a.jpg").filename(),
            "a.jpg"
        );
    }

    #[test]
    fn media_ref_round_trips_as_plain_string() {
        let json = serde_json::to_string(&MediaRef::from_raw("https://x/y.png")).unwrap();
        assert_eq!(json, "\"https://x/y.png\"");
        let back: MediaRef = serde_json::from_str(&json).unwrap();
        assert!(back.is_remote());
    }

    #[test]
    fn content_differs_ignores_last_updated() {
        let a = sample_product();
        let mut b = a.clone();
        b.last_updated = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).single().unwrap();
        assert!(!a.content_differs(&b));

        b.price = 120;
        assert!(a.content_differs(&b));
    }

    #[test]
    fn filters_normalize_trim_and_case() {
        let p = sample_product();
        assert!(p.in_category("bags"));
        assert!(p.in_category("  BAGS "));
        assert!(!p.in_category("shoes"));
        assert!(p.has_brand("naranjos"));
        assert!(p.has_type(" backpack"));
        assert!(p.matches_search("wid"));
        assert!(!p.matches_search("gadget"));
    }

    #[test]
    fn timestamps_round_trip_wholesale() {
        let mut ts = SyncTimestamps::default();
        let when = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).single().unwrap();
        ts.set(EntityKind::Products, SyncContext::Regular, when);
        let json = serde_json::to_string(&ts).unwrap();
        assert!(json.contains("products_regular"));
        let back: SyncTimestamps = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(EntityKind::Products, SyncContext::Regular), Some(when));
        assert_eq!(back.get(EntityKind::Products, SyncContext::Virtual), None);
    }
}
