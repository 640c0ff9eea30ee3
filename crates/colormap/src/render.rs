//! Raster-to-RGBA rendering

use crate::scheme::{evaluate, ColorScheme, Rgb};
use urbdiff_core::raster::{Raster, RasterElement};

/// Parameters for colormap rendering
#[derive(Debug, Clone)]
pub struct ColormapParams {
    pub scheme: ColorScheme,
    /// Minimum value for normalization; lower values are clamped
    pub min: f64,
    /// Maximum value for normalization; higher values are clamped
    pub max: f64,
    /// RGBA for nodata pixels (default: fully transparent)
    pub nodata_color: [u8; 4],
}

impl ColormapParams {
    /// Params with an explicit value range
    pub fn with_range(scheme: ColorScheme, min: f64, max: f64) -> Self {
        Self {
            scheme,
            min,
            max,
            nodata_color: [0, 0, 0, 0],
        }
    }
}

/// Auto-detect min/max from a raster's valid cells
pub fn auto_params<T: RasterElement>(raster: &Raster<T>, scheme: ColorScheme) -> ColormapParams {
    let nodata = raster.nodata();
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for val in raster.data().iter() {
        if val.is_nodata(nodata) {
            continue;
        }
        if let Some(v) = val.to_f64() {
            if v.is_finite() {
                min = min.min(v);
                max = max.max(v);
            }
        }
    }

    // All-nodata or constant raster
    if !min.is_finite() || !max.is_finite() {
        min = 0.0;
        max = 1.0;
    } else if (max - min).abs() < f64::EPSILON {
        max = min + 1.0;
    }

    ColormapParams::with_range(scheme, min, max)
}

/// Convert a raster to an RGBA pixel buffer.
///
/// Returns `rows * cols * 4` bytes in row-major order. Nodata pixels get
/// `params.nodata_color`.
pub fn raster_to_rgba<T: RasterElement>(raster: &Raster<T>, params: &ColormapParams) -> Vec<u8> {
    let nodata = raster.nodata();
    let range = params.max - params.min;
    let inv_range = if range.abs() > f64::EPSILON {
        1.0 / range
    } else {
        1.0
    };

    let mut rgba = vec![0u8; raster.len() * 4];

    for (i, val) in raster.data().iter().enumerate() {
        let offset = i * 4;

        let pixel = if val.is_nodata(nodata) {
            params.nodata_color
        } else {
            match val.to_f64() {
                Some(v) if v.is_finite() => {
                    let t = (v - params.min) * inv_range;
                    let Rgb { r, g, b } = evaluate(params.scheme, t);
                    [r, g, b, 255]
                }
                _ => params.nodata_color,
            }
        };

        rgba[offset..offset + 4].copy_from_slice(&pixel);
    }

    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_to_rgba_basic() {
        let mut r = Raster::<f64>::new(2, 2);
        r.set(0, 0, 0.0).unwrap();
        r.set(0, 1, 0.5).unwrap();
        r.set(1, 0, 1.0).unwrap();
        r.set(1, 1, f64::NAN).unwrap();
        r.set_nodata(Some(f64::NAN));

        let params = ColormapParams::with_range(ColorScheme::Grayscale, 0.0, 1.0);
        let rgba = raster_to_rgba(&r, &params);

        assert_eq!(rgba.len(), 16);
        assert_eq!(&rgba[0..4], &[0, 0, 0, 255]);
        assert_eq!(&rgba[4..8], &[128, 128, 128, 255]);
        assert_eq!(&rgba[8..12], &[255, 255, 255, 255]);
        // NaN -> transparent
        assert_eq!(&rgba[12..16], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_change_raster_rendering() {
        // Diverging ramp over the fixed [-0.5, 0.5] display range
        let mut change = Raster::<f64>::new(1, 3);
        change.set(0, 0, -0.5).unwrap();
        change.set(0, 1, 0.0).unwrap();
        change.set(0, 2, 0.5).unwrap();

        let params = ColormapParams::with_range(ColorScheme::BlueWhiteRed, -0.5, 0.5);
        let rgba = raster_to_rgba(&change, &params);

        // Loss end blue-ish, neutral center, gain end red-ish
        assert!(rgba[2] > rgba[0], "loss should be blue");
        assert_eq!(&rgba[4..7], &[247, 247, 247]);
        assert!(rgba[8] > rgba[10], "gain should be red");
    }

    #[test]
    fn test_auto_params_range() {
        let mut r = Raster::<f64>::new(1, 3);
        r.set(0, 0, 10.0).unwrap();
        r.set(0, 1, 50.0).unwrap();
        r.set(0, 2, 100.0).unwrap();

        let params = auto_params(&r, ColorScheme::Grayscale);
        assert!((params.min - 10.0).abs() < f64::EPSILON);
        assert!((params.max - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_auto_params_all_nodata() {
        let mut r = Raster::<f64>::new(1, 2);
        r.set(0, 0, f64::NAN).unwrap();
        r.set(0, 1, f64::NAN).unwrap();
        r.set_nodata(Some(f64::NAN));

        let params = auto_params(&r, ColorScheme::Grayscale);
        assert_eq!(params.min, 0.0);
        assert_eq!(params.max, 1.0);
    }
}
