//! Local scene store
//!
//! A JSON manifest describing downloaded scenes and their band rasters on
//! disk. The pipeline composites from this store; how the files got there
//! (bulk download, order fulfilment, a colleague's USB stick) is outside
//! our concern. Band rasters are expected to be co-registered on one grid.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use urbdiff_core::io::read_geotiff;
use urbdiff_core::{Raster, Region};

use crate::error::{CatalogError, Result};
use crate::models::DateRange;

/// One scene in the local manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneEntry {
    pub id: String,
    /// Acquisition date, `YYYY-MM-DD`
    pub datetime: String,
    /// Cloud cover percentage from the archive metadata
    pub cloud_cover: f64,
    /// Scene extent `[west, south, east, north]`
    pub bbox: [f64; 4],
    /// Shortwave-infrared band raster, relative to the manifest
    pub swir: PathBuf,
    /// Near-infrared band raster, relative to the manifest
    pub nir: PathBuf,
}

impl SceneEntry {
    pub fn acquisition_date(&self) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(&self.datetime, "%Y-%m-%d")
            .map_err(|e| CatalogError::Date(format!("scene {}: {}", self.id, e)))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    scenes: Vec<SceneEntry>,
}

/// Scene store backed by a manifest file
#[derive(Debug)]
pub struct SceneStore {
    root: PathBuf,
    entries: Vec<SceneEntry>,
}

impl SceneStore {
    /// Load a store from a JSON manifest; band paths resolve relative to
    /// the manifest's directory
    pub fn load<P: AsRef<Path>>(manifest_path: P) -> Result<Self> {
        let manifest_path = manifest_path.as_ref();
        let text = std::fs::read_to_string(manifest_path)?;
        let manifest: Manifest = serde_json::from_str(&text)
            .map_err(|e| CatalogError::Manifest(e.to_string()))?;

        let root = manifest_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        Ok(Self {
            root,
            entries: manifest.scenes,
        })
    }

    /// Build a store from in-memory entries rooted at `root`
    pub fn from_entries<P: AsRef<Path>>(root: P, entries: Vec<SceneEntry>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            entries,
        }
    }

    pub fn entries(&self) -> &[SceneEntry] {
        &self.entries
    }

    /// Scenes intersecting the region, acquired within the date range,
    /// with cloud cover strictly below the ceiling
    pub fn filter(
        &self,
        region: &Region,
        range: &DateRange,
        cloud_ceiling: f64,
    ) -> Vec<&SceneEntry> {
        self.entries
            .iter()
            .filter(|entry| {
                let [west, south, east, north] = entry.bbox;
                if !region.intersects_bounds((west, south, east, north)) {
                    return false;
                }
                if entry.cloud_cover >= cloud_ceiling {
                    debug!(scene = %entry.id, cloud_cover = entry.cloud_cover, "scene too cloudy");
                    return false;
                }
                match entry.acquisition_date() {
                    Ok(date) => range.contains(date),
                    Err(_) => false,
                }
            })
            .collect()
    }

    /// Load the (swir, nir) band rasters for a scene
    pub fn load_bands(&self, entry: &SceneEntry) -> Result<(Raster<f64>, Raster<f64>)> {
        let swir = read_geotiff(self.root.join(&entry.swir))?;
        let nir = read_geotiff(self.root.join(&entry.nir))?;
        Ok((swir, nir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use urbdiff_core::io::write_geotiff;
    use urbdiff_core::GeoTransform;

    fn entry(id: &str, datetime: &str, cloud_cover: f64) -> SceneEntry {
        SceneEntry {
            id: id.to_string(),
            datetime: datetime.to_string(),
            cloud_cover,
            bbox: [-60.0, 12.9, -59.2, 13.6],
            swir: PathBuf::from(format!("{}_swir.tif", id)),
            nir: PathBuf::from(format!("{}_nir.tif", id)),
        }
    }

    fn barbados() -> Region {
        Region::new(-59.9, 13.0, -59.4, 13.5).unwrap()
    }

    #[test]
    fn test_filter_by_cloud_and_date() {
        let store = SceneStore::from_entries(
            ".",
            vec![
                entry("a", "2015-07-01", 2.0),
                entry("b", "2015-08-15", 80.0), // too cloudy
                entry("c", "2016-03-01", 1.0),  // out of range
                entry("d", "2015-12-31", 4.9),
            ],
        );

        let range = DateRange::parse("2015-06-01", "2015-12-31").unwrap();
        let selected = store.filter(&barbados(), &range, 5.0);

        let ids: Vec<&str> = selected.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);
    }

    #[test]
    fn test_cloud_ceiling_is_strict() {
        let store = SceneStore::from_entries(".", vec![entry("edge", "2015-07-01", 5.0)]);
        let range = DateRange::parse("2015-06-01", "2015-12-31").unwrap();

        // Exactly at the ceiling is rejected (must be strictly below)
        assert!(store.filter(&barbados(), &range, 5.0).is_empty());
    }

    #[test]
    fn test_filter_by_region() {
        let mut far_away = entry("far", "2015-07-01", 1.0);
        far_away.bbox = [10.0, 40.0, 11.0, 41.0];
        let store = SceneStore::from_entries(".", vec![far_away]);

        let range = DateRange::parse("2015-06-01", "2015-12-31").unwrap();
        assert!(store.filter(&barbados(), &range, 5.0).is_empty());
    }

    #[test]
    fn test_manifest_roundtrip_and_band_loading() {
        let dir = tempfile::tempdir().unwrap();

        let mut band: Raster<f64> = Raster::filled(4, 4, 0.25);
        band.set_transform(GeoTransform::new(-59.9, 13.5, 0.1, -0.1));
        write_geotiff(&band, dir.path().join("s1_swir.tif")).unwrap();
        write_geotiff(&band, dir.path().join("s1_nir.tif")).unwrap();

        let manifest = serde_json::json!({
            "scenes": [{
                "id": "s1",
                "datetime": "2015-07-01",
                "cloud_cover": 2.0,
                "bbox": [-60.0, 12.9, -59.2, 13.6],
                "swir": "s1_swir.tif",
                "nir": "s1_nir.tif"
            }]
        });
        let manifest_path = dir.path().join("scenes.json");
        std::fs::write(&manifest_path, manifest.to_string()).unwrap();

        let store = SceneStore::load(&manifest_path).unwrap();
        assert_eq!(store.entries().len(), 1);

        let (swir, nir) = store.load_bands(&store.entries()[0]).unwrap();
        assert_eq!(swir.shape(), (4, 4));
        assert_eq!(nir.get(0, 0).unwrap(), 0.25);
    }

    #[test]
    fn test_bad_manifest_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            SceneStore::load(&path),
            Err(CatalogError::Manifest(_))
        ));
    }
}
