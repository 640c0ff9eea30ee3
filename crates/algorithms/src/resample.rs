//! Mask resampling to a coarser grid
//!
//! Vectorizing a full-resolution mask produces an unmanageable polygon
//! count; the pipeline trades spatial precision for tractability by
//! aggregating the mask onto a coarser grid before tracing.

use ndarray::Array2;

use crate::maybe_rayon::*;
use urbdiff_core::raster::{GeoTransform, Raster};
use urbdiff_core::{Error, Result};

/// Resample a partial mask onto a grid with `target_cell_size` cells
/// (in map units), covering the same extent.
///
/// An output cell is set when any input cell overlapping it is set
/// (maximum aggregation), so detections never vanish by falling between
/// coarse cells.
pub fn max_resample(mask: &Raster<f64>, target_cell_size: f64) -> Result<Raster<f64>> {
    if target_cell_size <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "target_cell_size",
            value: target_cell_size.to_string(),
            reason: "cell size must be positive".to_string(),
        });
    }

    let (rows, cols) = mask.shape();
    let src = mask.transform();
    let src_width = src.pixel_width;
    let src_height = src.pixel_height.abs();

    let extent_x = cols as f64 * src_width;
    let extent_y = rows as f64 * src_height;

    let out_cols = (extent_x / target_cell_size).ceil().max(1.0) as usize;
    let out_rows = (extent_y / target_cell_size).ceil().max(1.0) as usize;

    // Input cells per output cell along each axis
    let ratio_x = target_cell_size / src_width;
    let ratio_y = target_cell_size / src_height;

    let data: Vec<f64> = (0..out_rows)
        .into_par_iter()
        .flat_map(|out_row| {
            let mut row_data = vec![f64::NAN; out_cols];
            let row_start = (out_row as f64 * ratio_y).floor() as usize;
            let row_end = (((out_row + 1) as f64 * ratio_y).ceil() as usize).min(rows);

            for (out_col, out) in row_data.iter_mut().enumerate() {
                let col_start = (out_col as f64 * ratio_x).floor() as usize;
                let col_end = (((out_col + 1) as f64 * ratio_x).ceil() as usize).min(cols);

                'scan: for row in row_start..row_end {
                    for col in col_start..col_end {
                        let v = unsafe { mask.get_unchecked(row, col) };
                        if !v.is_nan() {
                            *out = 1.0;
                            break 'scan;
                        }
                    }
                }
            }
            row_data
        })
        .collect();

    let mut output: Raster<f64> = mask.with_same_meta::<f64>(out_rows, out_cols);
    output.set_nodata(Some(f64::NAN));
    output.set_transform(GeoTransform::new(
        src.origin_x,
        src.origin_y,
        target_cell_size,
        -target_cell_size,
    ));
    *output.data_mut() =
        Array2::from_shape_vec((out_rows, out_cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with(rows: usize, cols: usize, set: &[(usize, usize)]) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, f64::NAN);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r.set_nodata(Some(f64::NAN));
        for &(row, col) in set {
            r.set(row, col, 1.0).unwrap();
        }
        r
    }

    #[test]
    fn test_coarsens_dimensions() {
        let mask = mask_with(10, 10, &[]);
        let result = max_resample(&mask, 5.0).unwrap();
        assert_eq!(result.shape(), (2, 2));
        assert_eq!(result.cell_size(), 5.0);
    }

    #[test]
    fn test_any_set_pixel_sets_output_cell() {
        let mask = mask_with(10, 10, &[(3, 3)]);
        let result = max_resample(&mask, 5.0).unwrap();

        assert_eq!(result.get(0, 0).unwrap(), 1.0);
        assert!(result.get(0, 1).unwrap().is_nan());
        assert!(result.get(1, 0).unwrap().is_nan());
        assert!(result.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn test_extent_preserved() {
        let mask = mask_with(10, 10, &[]);
        let result = max_resample(&mask, 4.0).unwrap();

        // 10 units / 4 → 3 cells, extent snapped outward
        assert_eq!(result.shape(), (3, 3));
        let (min_x, _, _, max_y) = result.bounds();
        assert_eq!(min_x, 0.0);
        assert_eq!(max_y, 10.0);
    }

    #[test]
    fn test_invalid_cell_size() {
        let mask = mask_with(4, 4, &[]);
        assert!(max_resample(&mask, 0.0).is_err());
        assert!(max_resample(&mask, -2.0).is_err());
    }

    #[test]
    fn test_empty_in_empty_out() {
        let mask = mask_with(8, 8, &[]);
        let result = max_resample(&mask, 2.0).unwrap();
        assert_eq!(result.valid_count(), 0);
    }
}
