//! Async catalog search client
//!
//! Speaks the STAC item-search protocol (`POST /search`) used by public
//! imagery archives. Transient failures retry with exponential backoff;
//! client errors (4xx) fail fast.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{CatalogError, Result};
use crate::models::{Link, Scene, SceneCollection, SearchParams};

// ---------------------------------------------------------------------------
// Catalog endpoints
// ---------------------------------------------------------------------------

/// Well-known catalogs plus custom endpoints.
#[derive(Debug, Clone)]
pub enum Catalog {
    /// AWS Earth Search (Element 84)
    EarthSearch,
    /// Any STAC-style API endpoint (root URL)
    Custom(String),
}

impl Catalog {
    /// Full POST `/search` URL for this catalog
    pub fn search_url(&self) -> String {
        match self {
            Self::EarthSearch => "https://earth-search.aws.element84.com/v1/search".to_string(),
            Self::Custom(base) => {
                let base = base.trim_end_matches('/');
                if base.ends_with("/search") {
                    base.to_string()
                } else {
                    format!("{}/search", base)
                }
            }
        }
    }

    /// Parse a shorthand string into a catalog.
    ///
    /// `"es"` / `"earth-search"` select Earth Search; anything else is
    /// treated as a custom URL.
    pub fn from_str_or_url(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "es" | "earth-search" | "earthsearch" => Self::EarthSearch,
            url => Self::Custom(url.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for [`CatalogClient`]
pub struct CatalogClientOptions {
    /// Per-request timeout (default 30 s)
    pub request_timeout: Duration,
    /// Maximum retries on transient failures (default 3)
    pub max_retries: u32,
    /// Maximum total scenes to collect across pages (default 100)
    pub max_scenes: usize,
}

impl Default for CatalogClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            max_scenes: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Async client for scene search.
pub struct CatalogClient {
    catalog: Catalog,
    client: reqwest::Client,
    options: CatalogClientOptions,
}

impl CatalogClient {
    pub fn new(catalog: Catalog, options: CatalogClientOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| CatalogError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            catalog,
            client,
            options,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Execute a single search request and return one page of results
    pub async fn search(&self, params: &SearchParams) -> Result<SceneCollection> {
        let url = self.catalog.search_url();
        self.post_search(&url, params).await
    }

    /// Search with automatic pagination, collecting up to `max_scenes`.
    ///
    /// The cloud-cover ceiling in `params` is also re-applied client
    /// side, since not every catalog honors the query extension.
    pub async fn search_all(&self, params: &SearchParams) -> Result<Vec<Scene>> {
        let ceiling = cloud_ceiling(params);
        let mut scenes: Vec<Scene> = Vec::new();
        let max = self.options.max_scenes;

        let mut page = self.search(params).await?;

        loop {
            let next = page.next_link().cloned();

            for scene in page.features.drain(..) {
                match ceiling {
                    Some(limit) if scene.cloud_cover() >= limit => {
                        debug!(
                            scene = %scene.id,
                            cloud_cover = scene.cloud_cover(),
                            "dropping scene above cloud ceiling"
                        );
                    }
                    _ => scenes.push(scene),
                }
            }

            if scenes.len() >= max {
                break;
            }

            match next {
                Some(link) => {
                    page = self.follow_next(&link, params).await?;
                    if page.is_empty() {
                        break;
                    }
                }
                None => break,
            }
        }

        scenes.truncate(max);
        Ok(scenes)
    }

    // ── Private helpers ─────────────────────────────────────────────

    async fn post_search(&self, url: &str, params: &SearchParams) -> Result<SceneCollection> {
        let mut last_err = None;

        for attempt in 0..=self.options.max_retries {
            if attempt > 0 {
                // Exponential backoff: 500ms, 1s, 2s, ...
                let delay = Duration::from_millis(500 * (1 << (attempt - 1)));
                tokio::time::sleep(delay).await;
                warn!(attempt, url, "retrying catalog search");
            }

            let resp = self
                .client
                .post(url)
                .header("Content-Type", "application/json")
                .json(params)
                .send()
                .await;

            match resp {
                Ok(r) if r.status().is_success() => {
                    let body = r.text().await.map_err(|e| {
                        CatalogError::Network(format!("reading response body: {e}"))
                    })?;
                    let col: SceneCollection = serde_json::from_str(&body).map_err(|e| {
                        CatalogError::Network(format!("parsing search response: {e}"))
                    })?;
                    return Ok(col);
                }
                Ok(r) => {
                    let status = r.status();
                    let body = r.text().await.unwrap_or_default();
                    last_err = Some(CatalogError::Network(format!(
                        "catalog search returned HTTP {}: {}",
                        status,
                        body.chars().take(500).collect::<String>()
                    )));
                    // Don't retry client errors (4xx)
                    if status.is_client_error() {
                        break;
                    }
                }
                Err(e) => {
                    last_err = Some(CatalogError::Network(format!("search request failed: {e}")));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| CatalogError::Network("catalog search failed".into())))
    }

    /// Follow a pagination link (POST body token or plain GET)
    async fn follow_next(&self, link: &Link, original: &SearchParams) -> Result<SceneCollection> {
        let method = link.method.as_deref().unwrap_or("GET").to_uppercase();

        if method == "POST" {
            // Overlay the link body (usually just a token) on the
            // original request parameters
            let mut base = serde_json::to_value(original)
                .map_err(|e| CatalogError::Network(format!("serializing params: {e}")))?;
            if let Some(link_body) = &link.body {
                if let (Some(base_obj), Some(link_obj)) = (base.as_object_mut(), link_body.as_object())
                {
                    for (k, v) in link_obj {
                        base_obj.insert(k.clone(), v.clone());
                    }
                }
            }
            let merged: SearchParams = serde_json::from_value(base)
                .map_err(|e| CatalogError::Network(format!("parsing merged params: {e}")))?;
            self.post_search(&link.href, &merged).await
        } else {
            let resp = self
                .client
                .get(&link.href)
                .send()
                .await
                .map_err(|e| CatalogError::Network(format!("GET pagination: {e}")))?;

            if !resp.status().is_success() {
                let status = resp.status();
                return Err(CatalogError::Network(format!(
                    "pagination returned HTTP {}",
                    status
                )));
            }

            let body = resp
                .text()
                .await
                .map_err(|e| CatalogError::Network(format!("reading pagination body: {e}")))?;
            serde_json::from_str(&body)
                .map_err(|e| CatalogError::Network(format!("parsing pagination response: {e}")))
        }
    }
}

/// Extract the cloud ceiling back out of a query extension value
fn cloud_ceiling(params: &SearchParams) -> Option<f64> {
    params
        .query
        .as_ref()?
        .get("eo:cloud_cover")?
        .get("lt")?
        .as_f64()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_search_urls() {
        assert_eq!(
            Catalog::EarthSearch.search_url(),
            "https://earth-search.aws.element84.com/v1/search"
        );
        assert_eq!(
            Catalog::Custom("https://example.com/stac".into()).search_url(),
            "https://example.com/stac/search"
        );
        assert_eq!(
            Catalog::Custom("https://example.com/stac/search".into()).search_url(),
            "https://example.com/stac/search"
        );
        assert_eq!(
            Catalog::Custom("https://example.com/stac/".into()).search_url(),
            "https://example.com/stac/search"
        );
    }

    #[test]
    fn catalog_from_str_or_url() {
        assert!(matches!(
            Catalog::from_str_or_url("es"),
            Catalog::EarthSearch
        ));
        assert!(matches!(
            Catalog::from_str_or_url("https://my-catalog.example.com"),
            Catalog::Custom(_)
        ));
    }

    #[test]
    fn cloud_ceiling_roundtrip() {
        let params = SearchParams::new().max_cloud_cover(5.0);
        assert_eq!(cloud_ceiling(&params), Some(5.0));
        assert_eq!(cloud_ceiling(&SearchParams::new()), None);
    }
}
