//! State boundary features for choropleth rendering.
//!
//! The boundary document is a GeoJSON feature collection whose features carry
//! the state name in `properties.ST_NM`. It is loaded once (from a URL, a file
//! or an in-memory document) and shared read-only for the rest of the process.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

pub const DEFAULT_BOUNDARY_URL: &str = "https://gist.githubusercontent.com/jbrobst/56c13bbbf9d97d187fea01ca62ea5112/raw/e388c4cae20aa53cb5090210a42ebb9b765c0a36/india_states.geojson";

/// Feature property holding the region name
pub const FEATURE_KEY_PROPERTY: &str = "ST_NM";

/// Path to the key as Plotly's `featureidkey` expects it
pub const FEATURE_ID_KEY: &str = "properties.ST_NM";

#[derive(Debug, Clone)]
pub enum BoundarySource {
    Url(String),
    File(PathBuf),
    /// A GeoJSON document already in memory
    Inline(String),
}

impl std::fmt::Display for BoundarySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundarySource::Url(url) => write!(f, "{}", url),
            BoundarySource::File(path) => write!(f, "{}", path.display()),
            BoundarySource::Inline(_) => write!(f, "<inline>"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<GeoFeature>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoFeature {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    pub geometry: Value,
}

impl GeoFeature {
    pub fn region_name(&self) -> Option<&str> {
        self.properties.get(FEATURE_KEY_PROPERTY).and_then(Value::as_str)
    }
}

/// Boundary features plus the set of their region keys
#[derive(Debug, Clone)]
pub struct BoundarySet {
    collection: FeatureCollection,
    keys: BTreeSet<String>,
}

impl BoundarySet {
    /// Keep only features that carry a region key
    pub fn from_collection(mut collection: FeatureCollection) -> Self {
        let before = collection.features.len();
        collection.features.retain(|f| f.region_name().is_some());
        let skipped = before - collection.features.len();
        if skipped > 0 {
            debug!(skipped, "dropped boundary features without {}", FEATURE_KEY_PROPERTY);
        }

        let keys = collection
            .features
            .iter()
            .filter_map(|f| f.region_name().map(str::to_string))
            .collect();

        Self { collection, keys }
    }

    pub fn from_geojson_str(document: &str) -> Result<Self> {
        let collection: FeatureCollection =
            serde_json::from_str(document).context("parsing boundary GeoJSON")?;
        Ok(Self::from_collection(collection))
    }

    /// Exact, case-sensitive key lookup
    pub fn contains(&self, name: &str) -> bool {
        self.keys.contains(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn collection(&self) -> &FeatureCollection {
        &self.collection
    }
}

/// Loads the boundary set on first use and hands out the cached copy afterwards
#[derive(Clone)]
pub struct BoundaryProvider {
    source: BoundarySource,
    client: reqwest::Client,
    cached: Arc<RwLock<Option<Arc<BoundarySet>>>>,
}

impl BoundaryProvider {
    pub fn new(source: BoundarySource) -> Self {
        Self {
            source,
            client: reqwest::Client::new(),
            cached: Arc::new(RwLock::new(None)),
        }
    }

    pub fn source(&self) -> &BoundarySource {
        &self.source
    }

    pub async fn get(&self) -> Result<Arc<BoundarySet>> {
        // Check cache first
        {
            let cache = self.cached.read().await;
            if let Some(set) = cache.as_ref() {
                return Ok(set.clone());
            }
        }

        // Hold the write lock across the load so concurrent callers fetch once
        let mut cache = self.cached.write().await;
        if let Some(set) = cache.as_ref() {
            return Ok(set.clone());
        }

        let set = Arc::new(self.load().await?);
        info!(source = %self.source, features = set.len(), "loaded boundary features");
        *cache = Some(set.clone());

        Ok(set)
    }

    async fn load(&self) -> Result<BoundarySet> {
        match &self.source {
            BoundarySource::Url(url) => {
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("fetching boundaries from {}", url))?;

                if !response.status().is_success() {
                    let status = response.status();
                    anyhow::bail!("boundary request failed: {} - {}", status, url)
                }

                let collection: FeatureCollection = response
                    .json()
                    .await
                    .context("decoding boundary GeoJSON")?;
                Ok(BoundarySet::from_collection(collection))
            }
            BoundarySource::File(path) => {
                let document = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading boundaries from {}", path.display()))?;
                BoundarySet::from_geojson_str(&document)
            }
            BoundarySource::Inline(document) => BoundarySet::from_geojson_str(document),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::BOUNDARY_FIXTURE;

    #[test]
    fn test_parses_feature_keys() {
        let set = BoundarySet::from_geojson_str(BOUNDARY_FIXTURE).unwrap();
        assert!(set.contains("Tamil Nadu"));
        assert!(set.contains("Andaman & Nicobar"));
        assert!(!set.contains("tamil nadu"));
        assert_eq!(set.len(), set.collection().features.len());
    }

    #[test]
    fn test_drops_features_without_key() {
        let doc = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"ST_NM": "Goa"}, "geometry": null},
                {"type": "Feature", "properties": {"name": "Nowhere"}, "geometry": null}
            ]
        }"#;
        let set = BoundarySet::from_geojson_str(doc).unwrap();
        assert_eq!(set.keys().collect::<Vec<_>>(), vec!["Goa"]);
        assert_eq!(set.collection().features.len(), 1);
    }

    #[test]
    fn test_rejects_malformed_document() {
        assert!(BoundarySet::from_geojson_str("{\"type\": \"FeatureCollection\"}").is_err());
    }

    #[tokio::test]
    async fn test_provider_memoizes() {
        let provider = BoundaryProvider::new(BoundarySource::Inline(BOUNDARY_FIXTURE.to_string()));
        let first = provider.get().await.unwrap();
        let second = provider.clone().get().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let provider = BoundaryProvider::new(BoundarySource::File(PathBuf::from(
            "/nonexistent/india_states.geojson",
        )));
        assert!(provider.get().await.is_err());
    }
}
