//! Index differencing and gain/loss threshold masks
//!
//! The change raster is always comparison minus baseline. Thresholding
//! splits it into two partial masks; the dead zone between the loss and
//! gain thresholds keeps them disjoint.

use ndarray::Array2;

use crate::maybe_rayon::*;
use urbdiff_core::raster::Raster;
use urbdiff_core::{Error, Result};

/// Classification thresholds for the change raster.
///
/// Values strictly above `gain` are classified as built-up gain, values
/// strictly below `loss` as built-up loss. Both are policy constants
/// separating signal from index noise, not derived quantities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeThresholds {
    pub gain: f64,
    pub loss: f64,
}

impl Default for ChangeThresholds {
    fn default() -> Self {
        Self {
            gain: 0.2,
            loss: -0.2,
        }
    }
}

impl ChangeThresholds {
    /// Reject threshold pairs without a dead zone; overlapping masks would
    /// break the disjointness invariant downstream
    pub fn validate(&self) -> Result<()> {
        if self.gain < self.loss {
            return Err(Error::InvalidParameter {
                name: "thresholds",
                value: format!("gain={}, loss={}", self.gain, self.loss),
                reason: "gain threshold must not be below loss threshold".to_string(),
            });
        }
        Ok(())
    }
}

/// Pixel-wise difference `comparison - baseline`.
///
/// NaN in either input produces NaN in the output; dimensions must match.
pub fn index_difference(
    baseline: &Raster<f64>,
    comparison: &Raster<f64>,
) -> Result<Raster<f64>> {
    if baseline.shape() != comparison.shape() {
        return Err(Error::SizeMismatch {
            er: baseline.rows(),
            ec: baseline.cols(),
            ar: comparison.rows(),
            ac: comparison.cols(),
        });
    }

    let (rows, cols) = baseline.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let before = unsafe { baseline.get_unchecked(row, col) };
                let after = unsafe { comparison.get_unchecked(row, col) };
                if !before.is_nan() && !after.is_nan() {
                    *out = after - before;
                }
            }
            row_data
        })
        .collect();

    let mut output = baseline.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

/// Split a change raster into (gain, loss) masks.
///
/// Masks are partial rasters: qualifying pixels carry 1.0, everything
/// else is NaN. The comparisons are strict, so a change value exactly at
/// a threshold belongs to neither mask.
pub fn threshold_masks(
    change: &Raster<f64>,
    thresholds: ChangeThresholds,
) -> Result<(Raster<f64>, Raster<f64>)> {
    thresholds.validate()?;

    let (rows, cols) = change.shape();

    let (gain_data, loss_data): (Vec<f64>, Vec<f64>) = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut pairs = Vec::with_capacity(cols);
            for col in 0..cols {
                let v = unsafe { change.get_unchecked(row, col) };
                if v.is_nan() {
                    pairs.push((f64::NAN, f64::NAN));
                } else {
                    let gain = if v > thresholds.gain { 1.0 } else { f64::NAN };
                    let loss = if v < thresholds.loss { 1.0 } else { f64::NAN };
                    pairs.push((gain, loss));
                }
            }
            pairs
        })
        .unzip();

    let mut gain = change.with_same_meta::<f64>(rows, cols);
    gain.set_nodata(Some(f64::NAN));
    *gain.data_mut() =
        Array2::from_shape_vec((rows, cols), gain_data).map_err(|e| Error::Other(e.to_string()))?;

    let mut loss = change.with_same_meta::<f64>(rows, cols);
    loss.set_nodata(Some(f64::NAN));
    *loss.data_mut() =
        Array2::from_shape_vec((rows, cols), loss_data).map_err(|e| Error::Other(e.to_string()))?;

    Ok((gain, loss))
}

#[cfg(test)]
mod tests {
    use super::*;
    use urbdiff_core::GeoTransform;

    fn make_band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    #[test]
    fn test_difference_is_exact() {
        let baseline = make_band(5, 5, 0.1);
        let comparison = make_band(5, 5, 0.45);

        let change = index_difference(&baseline, &comparison).unwrap();
        let v = change.get(2, 2).unwrap();
        assert!((v - 0.35).abs() < 1e-12, "Expected 0.35, got {}", v);
    }

    #[test]
    fn test_difference_nan_propagates() {
        let mut baseline = make_band(3, 3, 0.1);
        baseline.set(1, 1, f64::NAN).unwrap();
        let comparison = make_band(3, 3, 0.5);

        let change = index_difference(&baseline, &comparison).unwrap();
        assert!(change.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn test_masks_classify() {
        let mut change = make_band(3, 3, 0.0);
        change.set(0, 0, 0.5).unwrap(); // gain
        change.set(0, 1, -0.5).unwrap(); // loss
        change.set(0, 2, 0.1).unwrap(); // dead zone

        let (gain, loss) = threshold_masks(&change, ChangeThresholds::default()).unwrap();

        assert_eq!(gain.get(0, 0).unwrap(), 1.0);
        assert!(loss.get(0, 0).unwrap().is_nan());

        assert_eq!(loss.get(0, 1).unwrap(), 1.0);
        assert!(gain.get(0, 1).unwrap().is_nan());

        assert!(gain.get(0, 2).unwrap().is_nan());
        assert!(loss.get(0, 2).unwrap().is_nan());
    }

    #[test]
    fn test_threshold_boundary_is_exclusive() {
        let mut change = make_band(1, 2, 0.0);
        change.set(0, 0, 0.2).unwrap();
        change.set(0, 1, -0.2).unwrap();

        let (gain, loss) = threshold_masks(&change, ChangeThresholds::default()).unwrap();

        assert!(gain.get(0, 0).unwrap().is_nan(), "0.2 is not > 0.2");
        assert!(loss.get(0, 1).unwrap().is_nan(), "-0.2 is not < -0.2");
    }

    #[test]
    fn test_masks_are_disjoint() {
        let mut change = Raster::new(10, 10);
        for row in 0..10 {
            for col in 0..10 {
                change
                    .set(row, col, -1.0 + 0.02 * (row * 10 + col) as f64)
                    .unwrap();
            }
        }

        let (gain, loss) = threshold_masks(&change, ChangeThresholds::default()).unwrap();
        for row in 0..10 {
            for col in 0..10 {
                let g = gain.get(row, col).unwrap();
                let l = loss.get(row, col).unwrap();
                assert!(
                    g.is_nan() || l.is_nan(),
                    "Pixel ({}, {}) in both masks",
                    row,
                    col
                );
            }
        }
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let change = make_band(2, 2, 0.0);
        let bad = ChangeThresholds {
            gain: -0.2,
            loss: 0.2,
        };
        assert!(threshold_masks(&change, bad).is_err());
    }
}
