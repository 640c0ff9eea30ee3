//! Polygon simplification (Douglas-Peucker)

use geo::Simplify;
use geo_types::{Geometry, LineString, MultiPolygon, Polygon};

use urbdiff_core::vector::{Feature, FeatureCollection};

/// Simplify every polygon in a layer within `tolerance` map units.
///
/// Vertices deviating less than the tolerance from the simplified outline
/// are removed; attributes pass through unchanged. Interior rings that
/// collapse below a valid ring (4 coordinates) are dropped.
pub fn simplify_collection(collection: &FeatureCollection, tolerance: f64) -> FeatureCollection {
    collection
        .iter()
        .map(|feature| Feature {
            geometry: simplify_geometry(&feature.geometry, tolerance),
            properties: feature.properties.clone(),
        })
        .collect()
}

fn simplify_geometry(geom: &Geometry<f64>, tolerance: f64) -> Geometry<f64> {
    match geom {
        Geometry::Polygon(p) => Geometry::Polygon(simplify_polygon(p, tolerance)),
        Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(MultiPolygon::new(
            mp.0.iter().map(|p| simplify_polygon(p, tolerance)).collect(),
        )),
        other => other.clone(),
    }
}

fn simplify_polygon(polygon: &Polygon<f64>, tolerance: f64) -> Polygon<f64> {
    let exterior = polygon.exterior().simplify(&tolerance);
    let interiors: Vec<LineString<f64>> = polygon
        .interiors()
        .iter()
        .map(|ring| ring.simplify(&tolerance))
        .filter(|ring| ring.0.len() >= 4)
        .collect();
    Polygon::new(exterior, interiors)
}
