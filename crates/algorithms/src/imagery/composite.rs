//! Median compositing and region clipping
//!
//! A composite reduces a stack of co-registered scene rasters to one
//! representative raster via the per-pixel median, ignoring nodata. The
//! stack must share one grid; reprojection of raw scenes is the catalog's
//! concern, not ours.

use ndarray::Array2;

use crate::maybe_rayon::*;
use urbdiff_core::raster::Raster;
use urbdiff_core::{Error, Region, Result};

/// Reduce a stack of rasters to their per-pixel median.
///
/// NaN values are excluded per pixel; a pixel with no valid value in any
/// input stays NaN. An empty stack, or a stack whose median carries no
/// valid pixel at all, is a terminal [`Error::EmptyComposite`] so an
/// all-nodata raster can never flow into change detection unnoticed.
pub fn median_composite(rasters: &[Raster<f64>], label: &str) -> Result<Raster<f64>> {
    let Some(first) = rasters.first() else {
        return Err(Error::EmptyComposite {
            label: label.to_string(),
        });
    };

    let (rows, cols) = first.shape();
    for raster in &rasters[1..] {
        check_aligned(first, raster)?;
    }

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            let mut values: Vec<f64> = Vec::with_capacity(rasters.len());

            for (col, out) in row_data.iter_mut().enumerate() {
                values.clear();
                for raster in rasters {
                    let v = unsafe { raster.get_unchecked(row, col) };
                    if !v.is_nan() && !raster.is_nodata(v) {
                        values.push(v);
                    }
                }
                if !values.is_empty() {
                    *out = median(&mut values);
                }
            }
            row_data
        })
        .collect();

    if data.iter().all(|v| v.is_nan()) {
        return Err(Error::EmptyComposite {
            label: label.to_string(),
        });
    }

    let mut output = first.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

/// Median of a non-empty slice; averages the two middle values for even
/// lengths
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

fn check_aligned(a: &Raster<f64>, b: &Raster<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }

    let ta = a.transform();
    let tb = b.transform();
    let close = |x: f64, y: f64| (x - y).abs() < 1e-9;
    if !close(ta.origin_x, tb.origin_x)
        || !close(ta.origin_y, tb.origin_y)
        || !close(ta.pixel_width, tb.pixel_width)
        || !close(ta.pixel_height, tb.pixel_height)
    {
        return Err(Error::GridMismatch(format!(
            "transform ({:?}) vs ({:?})",
            ta, tb
        )));
    }

    if let (Some(ca), Some(cb)) = (a.crs(), b.crs()) {
        if !ca.is_equivalent(cb) {
            return Err(Error::CrsMismatch(ca.identifier(), cb.identifier()));
        }
    }
    Ok(())
}

/// Crop a raster to the pixel window covering the region.
///
/// The window is snapped outward to whole pixels; a region that does not
/// overlap the raster extent is an error rather than an empty raster.
pub fn clip_to_region(raster: &Raster<f64>, region: &Region) -> Result<Raster<f64>> {
    if !region.intersects_bounds(raster.bounds()) {
        return Err(Error::RegionOutsideRaster);
    }

    let (rows, cols) = raster.shape();

    // Top-left and bottom-right corners of the region in pixel space
    let (col_a, row_a) = raster.geo_to_pixel(region.min_lon, region.max_lat);
    let (col_b, row_b) = raster.geo_to_pixel(region.max_lon, region.min_lat);

    let col_start = col_a.min(col_b).floor().max(0.0) as usize;
    let row_start = row_a.min(row_b).floor().max(0.0) as usize;
    let col_end = (col_a.max(col_b).ceil() as usize).min(cols);
    let row_end = (row_a.max(row_b).ceil() as usize).min(rows);

    if col_start >= col_end || row_start >= row_end {
        return Err(Error::RegionOutsideRaster);
    }

    let out_rows = row_end - row_start;
    let out_cols = col_end - col_start;

    let mut output = raster.with_same_meta::<f64>(out_rows, out_cols);
    output.set_nodata(raster.nodata());

    let (origin_x, origin_y) = raster.transform().pixel_to_geo_corner(col_start, row_start);
    let mut transform = *raster.transform();
    transform.origin_x = origin_x;
    transform.origin_y = origin_y;
    output.set_transform(transform);

    for row in 0..out_rows {
        for col in 0..out_cols {
            let v = unsafe { raster.get_unchecked(row_start + row, col_start + col) };
            output.set(row, col, v)?;
        }
    }

    Ok(output)
}
