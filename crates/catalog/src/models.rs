//! Catalog data types
//!
//! Lightweight serde models for STAC-style item search, covering the
//! subset the change pipeline needs: bbox + datetime + collection
//! filtering, a cloud-cover ceiling via the query extension, pagination
//! links, and band asset lookup.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CatalogError, Result};

// ---------------------------------------------------------------------------
// Date range
// ---------------------------------------------------------------------------

/// Inclusive acquisition date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(CatalogError::Date(format!(
                "range end {} precedes start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse from ISO `"YYYY-MM-DD"` strings
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
                CatalogError::Date(format!("cannot parse '{}': {}", s, e))
            })
        };
        Self::new(parse(start)?, parse(end)?)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Interval string for search APIs, e.g. `"2015-06-01/2015-12-31"`
    pub fn to_interval(&self) -> String {
        format!("{}/{}", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// Search request
// ---------------------------------------------------------------------------

/// Body for `POST /search`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<String>>,

    /// Property query, used for the cloud-cover ceiling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Pagination token (next page)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self {
            bbox: None,
            datetime: None,
            collections: None,
            query: None,
            limit: None,
            token: None,
        }
    }

    /// Set the bounding box `[west, south, east, north]`
    pub fn bbox(mut self, bbox: [f64; 4]) -> Self {
        self.bbox = Some(bbox.to_vec());
        self
    }

    /// Set the acquisition date range
    pub fn date_range(mut self, range: &DateRange) -> Self {
        self.datetime = Some(range.to_interval());
        self
    }

    /// Set the collection filter
    pub fn collection(mut self, id: &str) -> Self {
        self.collections = Some(vec![id.to_string()]);
        self
    }

    /// Keep only scenes with cloud cover strictly below `percent`
    pub fn max_cloud_cover(mut self, percent: f64) -> Self {
        self.query = Some(serde_json::json!({
            "eo:cloud_cover": { "lt": percent }
        }));
        self
    }

    /// Set maximum items per page
    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// One page of search results (GeoJSON FeatureCollection)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SceneCollection {
    #[serde(rename = "type")]
    pub type_: String,

    pub features: Vec<Scene>,

    #[serde(default)]
    pub links: Vec<Link>,

    #[serde(rename = "numberMatched", skip_serializing_if = "Option::is_none")]
    pub number_matched: Option<u64>,
}

impl SceneCollection {
    /// Find the `"next"` pagination link, if any
    pub fn next_link(&self) -> Option<&Link> {
        self.links.iter().find(|l| l.rel == "next")
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A catalog scene (GeoJSON Feature)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Scene {
    /// Unique scene identifier
    pub id: String,

    /// Bounding box `[west, south, east, north]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    pub properties: SceneProperties,

    #[serde(default)]
    pub assets: HashMap<String, SceneAsset>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

impl Scene {
    /// Cloud cover percentage, treating missing metadata as fully cloudy
    /// so unfiltered scenes never slip into a composite
    pub fn cloud_cover(&self) -> f64 {
        self.properties.eo_cloud_cover.unwrap_or(100.0)
    }

    /// Acquisition date parsed from the datetime property
    pub fn acquisition_date(&self) -> Result<NaiveDate> {
        let dt = self.properties.datetime.as_deref().ok_or_else(|| {
            CatalogError::Date(format!("scene {} has no datetime", self.id))
        })?;
        NaiveDate::parse_from_str(&dt[..10.min(dt.len())], "%Y-%m-%d")
            .map_err(|e| CatalogError::Date(format!("scene {}: {}", self.id, e)))
    }

    /// Get a band asset by key
    pub fn band_asset(&self, key: &str) -> Result<&SceneAsset> {
        self.assets.get(key).ok_or_else(|| CatalogError::MissingBand {
            scene_id: self.id.clone(),
            band: key.to_string(),
        })
    }
}

/// Scene properties
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SceneProperties {
    /// ISO 8601 datetime
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    /// Cloud cover percentage (EO extension)
    #[serde(rename = "eo:cloud_cover", skip_serializing_if = "Option::is_none")]
    pub eo_cloud_cover: Option<f64>,

    /// Platform name (e.g., "sentinel-2a")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// All other properties
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A scene asset (file reference)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SceneAsset {
    /// URL of the asset file
    pub href: String,

    /// Media type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    /// Roles: `["data"]`, `["thumbnail"]`, etc.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

/// A pagination / relation link
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Link {
    pub rel: String,
    pub href: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "id": "S2A_MSIL1C_20150712T143316_T20PRT",
      "bbox": [-60.1, 12.9, -59.2, 13.7],
      "properties": {
        "datetime": "2015-07-12T14:33:16Z",
        "eo:cloud_cover": 3.4,
        "platform": "sentinel-2a"
      },
      "assets": {
        "swir16": {
          "href": "https://example.com/B11.tif",
          "type": "image/tiff; application=geotiff; profile=cloud-optimized",
          "roles": ["data"]
        },
        "nir": {
          "href": "https://example.com/B08.tif",
          "type": "image/tiff; application=geotiff; profile=cloud-optimized",
          "roles": ["data"]
        }
      },
      "collection": "sentinel-2-l2a"
    }
  ],
  "links": [
    {
      "rel": "next",
      "href": "https://earth-search.aws.element84.com/v1/search",
      "method": "POST",
      "body": {"token": "abc123"}
    }
  ],
  "numberMatched": 17
}"#;

    #[test]
    fn parse_scene_collection() {
        let col: SceneCollection = serde_json::from_str(FIXTURE).unwrap();
        assert_eq!(col.len(), 1);
        assert_eq!(col.number_matched, Some(17));

        let scene = &col.features[0];
        assert_eq!(scene.id, "S2A_MSIL1C_20150712T143316_T20PRT");
        assert!((scene.cloud_cover() - 3.4).abs() < f64::EPSILON);
        assert_eq!(scene.collection.as_deref(), Some("sentinel-2-l2a"));
    }

    #[test]
    fn acquisition_date_from_datetime() {
        let col: SceneCollection = serde_json::from_str(FIXTURE).unwrap();
        let date = col.features[0].acquisition_date().unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2015, 7, 12).unwrap());
    }

    #[test]
    fn band_asset_lookup() {
        let col: SceneCollection = serde_json::from_str(FIXTURE).unwrap();
        let scene = &col.features[0];

        assert!(scene.band_asset("swir16").is_ok());
        assert!(scene.band_asset("nir").is_ok());
        assert!(matches!(
            scene.band_asset("red"),
            Err(CatalogError::MissingBand { .. })
        ));
    }

    #[test]
    fn missing_cloud_cover_counts_as_cloudy() {
        let json = r#"{
            "type": "Feature",
            "id": "x",
            "properties": { "datetime": "2015-07-12T14:33:16Z" },
            "assets": {}
        }"#;
        let scene: Scene = serde_json::from_str(json).unwrap();
        assert_eq!(scene.cloud_cover(), 100.0);
    }

    #[test]
    fn pagination_link() {
        let col: SceneCollection = serde_json::from_str(FIXTURE).unwrap();
        let next = col.next_link().unwrap();
        assert_eq!(next.method.as_deref(), Some("POST"));
        assert!(next.body.is_some());
    }

    #[test]
    fn search_params_serialization() {
        let range = DateRange::parse("2015-06-01", "2015-12-31").unwrap();
        let params = SearchParams::new()
            .bbox([-59.9, 13.0, -59.4, 13.5])
            .date_range(&range)
            .collection("sentinel-2-l2a")
            .max_cloud_cover(5.0)
            .limit(50);

        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["bbox"], serde_json::json!([-59.9, 13.0, -59.4, 13.5]));
        assert_eq!(json["datetime"], "2015-06-01/2015-12-31");
        assert_eq!(json["collections"], serde_json::json!(["sentinel-2-l2a"]));
        assert_eq!(json["query"]["eo:cloud_cover"]["lt"], 5.0);
        assert_eq!(json["limit"], 50);
        assert!(json.get("token").is_none());
    }

    #[test]
    fn date_range_validation() {
        assert!(DateRange::parse("2015-06-01", "2015-12-31").is_ok());
        assert!(DateRange::parse("2015-12-31", "2015-06-01").is_err());
        assert!(DateRange::parse("not-a-date", "2015-12-31").is_err());

        let range = DateRange::parse("2024-01-01", "2024-12-31").unwrap();
        assert!(range.contains(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()));
    }
}
