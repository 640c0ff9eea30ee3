//! Layer dissolve (boolean union)

use geo::BooleanOps;
use geo_types::{Geometry, MultiPolygon};

use urbdiff_core::vector::{AttributeValue, Feature, FeatureCollection, COUNT_ATTRIBUTE};
use urbdiff_core::{Error, Result};

/// Merge all polygons of a layer into a single multipolygon feature.
///
/// Adjacent and overlapping polygons fuse, removing shared internal
/// boundaries; disjoint polygons stay separate parts of the multipolygon.
/// The dissolved feature's `count` is the sum of the inputs' counts. An
/// empty layer dissolves to an empty layer.
pub fn dissolve(collection: &FeatureCollection) -> Result<FeatureCollection> {
    if collection.is_empty() {
        return Ok(FeatureCollection::new());
    }

    let mut merged = MultiPolygon::<f64>::new(vec![]);
    let mut total_count: i64 = 0;

    for feature in collection.iter() {
        let part = match &feature.geometry {
            Geometry::Polygon(p) => MultiPolygon::new(vec![p.clone()]),
            Geometry::MultiPolygon(mp) => mp.clone(),
            other => {
                return Err(Error::Geometry(format!(
                    "dissolve requires polygonal geometry, got {:?}",
                    other
                )))
            }
        };

        merged = if merged.0.is_empty() {
            part
        } else {
            merged.union(&part)
        };
        total_count += feature.pixel_count().unwrap_or(0);
    }

    let mut result = FeatureCollection::new();
    result.push(
        Feature::new(Geometry::MultiPolygon(merged))
            .with_property(COUNT_ATTRIBUTE, AttributeValue::Int(total_count)),
    );
    Ok(result)
}
