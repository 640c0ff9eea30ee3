//! Blocking (synchronous) API for the catalog client
//!
//! Wraps [`CatalogClient`] with a current-thread Tokio runtime so the CLI
//! and pipeline don't need to manage their own async runtime.

use crate::client::{Catalog, CatalogClient, CatalogClientOptions};
use crate::error::{CatalogError, Result};
use crate::models::{Scene, SceneCollection, SearchParams};

/// Blocking wrapper around [`CatalogClient`].
pub struct CatalogClientBlocking {
    rt: tokio::runtime::Runtime,
    inner: CatalogClient,
}

impl CatalogClientBlocking {
    pub fn new(catalog: Catalog, options: CatalogClientOptions) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let inner = CatalogClient::new(catalog, options)?;

        Ok(Self { rt, inner })
    }

    /// Single-page search (blocking)
    pub fn search(&self, params: &SearchParams) -> Result<SceneCollection> {
        self.rt.block_on(self.inner.search(params))
    }

    /// Paginated search with the cloud filter applied (blocking)
    pub fn search_all(&self, params: &SearchParams) -> Result<Vec<Scene>> {
        self.rt.block_on(self.inner.search_all(params))
    }
}

/// One-shot convenience: search a catalog and collect matching scenes
pub fn search_scenes(catalog: Catalog, params: &SearchParams) -> Result<Vec<Scene>> {
    let client = CatalogClientBlocking::new(catalog, CatalogClientOptions::default())?;
    client.search_all(params)
}
