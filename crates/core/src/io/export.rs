//! Vector layer export: GeoJSON and ESRI shapefile
//!
//! Each writer serializes a [`FeatureCollection`] to one file (set).
//! Writers are independent; a failed export never touches sibling outputs.

use geo_types::{Geometry, LineString, Polygon};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    GeoJson,
    Shapefile,
}

impl ExportFormat {
    /// File extension for the primary file of this format
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::GeoJson => "geojson",
            ExportFormat::Shapefile => "shp",
        }
    }
}

// ---------------------------------------------------------------------------
// GeoJSON
// ---------------------------------------------------------------------------

/// Write a feature collection as an RFC 7946 GeoJSON document.
///
/// Feature order and attribute key order are stable, so rerunning the
/// pipeline on unchanged inputs produces a byte-identical file.
pub fn write_geojson<P: AsRef<Path>>(collection: &FeatureCollection, path: P) -> Result<()> {
    let features: Vec<geojson::Feature> = collection.iter().map(to_geojson_feature).collect();

    let fc = geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    let json = geojson::GeoJson::from(fc).to_string();
    std::fs::write(path.as_ref(), json).map_err(|e| Error::Export {
        path: path.as_ref().display().to_string(),
        reason: e.to_string(),
    })
}

fn to_geojson_feature(feature: &Feature) -> geojson::Feature {
    let mut properties = geojson::JsonObject::new();
    for (key, value) in &feature.properties {
        properties.insert(key.clone(), attribute_to_json(value));
    }

    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(
            &feature.geometry,
        ))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn attribute_to_json(value: &AttributeValue) -> serde_json::Value {
    match value {
        AttributeValue::Null => serde_json::Value::Null,
        AttributeValue::Int(n) => serde_json::Value::from(*n),
        AttributeValue::Float(f) => serde_json::Value::from(*f),
        AttributeValue::String(s) => serde_json::Value::from(s.as_str()),
    }
}

// ---------------------------------------------------------------------------
// Shapefile
// ---------------------------------------------------------------------------

/// Write a feature collection as a polygon shapefile (.shp/.shx/.dbf).
///
/// Only polygonal geometries are accepted. Rings follow the ESRI
/// convention: outer rings clockwise, holes counter-clockwise.
pub fn write_shapefile<P: AsRef<Path>>(collection: &FeatureCollection, path: P) -> Result<()> {
    use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};

    let path = path.as_ref();
    let export_err = |reason: String| Error::Export {
        path: path.display().to_string(),
        reason,
    };

    let count_field = FieldName::try_from(crate::vector::COUNT_ATTRIBUTE)
        .map_err(|_| export_err("invalid dbf field name".to_string()))?;
    let table = TableWriterBuilder::new().add_numeric_field(count_field, 10, 0);

    let mut writer =
        shapefile::Writer::from_path(path, table).map_err(|e| export_err(e.to_string()))?;

    for feature in collection.iter() {
        let polygon = to_shapefile_polygon(&feature.geometry)?;

        let mut record = Record::default();
        let count = feature.pixel_count().unwrap_or(0) as f64;
        record.insert(
            crate::vector::COUNT_ATTRIBUTE.to_string(),
            FieldValue::Numeric(Some(count)),
        );

        writer
            .write_shape_and_record(&polygon, &record)
            .map_err(|e| export_err(e.to_string()))?;
    }

    Ok(())
}

fn to_shapefile_polygon(geometry: &Geometry<f64>) -> Result<shapefile::Polygon> {
    let polygons: Vec<&Polygon<f64>> = match geometry {
        Geometry::Polygon(p) => vec![p],
        Geometry::MultiPolygon(mp) => mp.0.iter().collect(),
        other => {
            return Err(Error::Geometry(format!(
                "shapefile export requires polygonal geometry, got {}",
                geometry_kind(other)
            )))
        }
    };

    let mut rings = Vec::new();
    for polygon in polygons {
        rings.push(shapefile::PolygonRing::Outer(ring_points(
            polygon.exterior(),
            true,
        )));
        for hole in polygon.interiors() {
            rings.push(shapefile::PolygonRing::Inner(ring_points(hole, false)));
        }
    }

    if rings.is_empty() {
        return Err(Error::Geometry("cannot export empty polygon".to_string()));
    }

    Ok(shapefile::Polygon::with_rings(rings))
}

/// Convert a ring to shapefile points with the requested winding
/// (clockwise for outer rings, counter-clockwise for holes)
fn ring_points(ring: &LineString<f64>, clockwise: bool) -> Vec<shapefile::Point> {
    let mut coords: Vec<(f64, f64)> = ring.0.iter().map(|c| (c.x, c.y)).collect();

    // Close the ring
    if coords.first() != coords.last() {
        if let Some(&first) = coords.first() {
            coords.push(first);
        }
    }

    // Shoelace: positive signed area = counter-clockwise
    let signed_area: f64 = coords
        .windows(2)
        .map(|w| (w[0].0 * w[1].1) - (w[1].0 * w[0].1))
        .sum();
    let is_ccw = signed_area > 0.0;
    if is_ccw == clockwise {
        coords.reverse();
    }

    coords
        .into_iter()
        .map(|(x, y)| shapefile::Point::new(x, y))
        .collect()
}

fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
