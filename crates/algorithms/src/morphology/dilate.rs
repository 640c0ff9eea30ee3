//! Mask dilation (local maximum filter)

use ndarray::Array2;

use crate::maybe_rayon::*;
use urbdiff_core::raster::Raster;
use urbdiff_core::{Error, Result};

use super::element::StructuringElement;

/// Dilate a partial mask: a pixel is set in the output when any pixel of
/// the structuring element neighborhood is set in the input.
///
/// Unlike value dilation, NaN here means absence rather than unknown, so
/// NaN neighbors never poison a result and edge pixels use the clamped
/// neighborhood. Single set pixels grow into blobs; single-pixel holes
/// close.
pub fn dilate_mask(mask: &Raster<f64>, element: &StructuringElement) -> Result<Raster<f64>> {
    element.validate()?;

    let (rows, cols) = mask.shape();
    let offsets = element.offsets();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let r = row as isize;
                let c = col as isize;

                let any_set = offsets.iter().any(|&(dr, dc)| {
                    let nr = r + dr;
                    let nc = c + dc;
                    if nr < 0 || nr >= rows as isize || nc < 0 || nc >= cols as isize {
                        return false;
                    }
                    let v = unsafe { mask.get_unchecked(nr as usize, nc as usize) };
                    !v.is_nan()
                });

                if any_set {
                    *out = 1.0;
                }
            }
            row_data
        })
        .collect();

    let mut output = mask.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}
