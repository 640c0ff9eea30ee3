//! GeoTIFF reading/writing
//!
//! Uses the `tiff` crate for single-band TIFF I/O with the GeoTIFF
//! georeferencing tags (ModelPixelScale + ModelTiepoint) and a minimal
//! GeoKey directory carrying the EPSG code.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;

// GeoKey ids (GeoTIFF 1.1)
const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;

/// Read a GeoTIFF file into a single-band raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    let mut decoder =
        Decoder::new(file).map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;

    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let data: Vec<T> = match result {
        DecodingResult::F32(buf) => cast_buffer(&buf),
        DecodingResult::F64(buf) => cast_buffer(&buf),
        DecodingResult::U8(buf) => cast_buffer(&buf),
        DecodingResult::U16(buf) => cast_buffer(&buf),
        DecodingResult::U32(buf) => cast_buffer(&buf),
        DecodingResult::I16(buf) => cast_buffer(&buf),
        DecodingResult::I32(buf) => cast_buffer(&buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Ok(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    raster.set_crs(read_crs(&mut decoder));

    Ok(raster)
}

fn cast_buffer<S, T>(buf: &[S]) -> Vec<T>
where
    S: num_traits::NumCast + Copy,
    T: RasterElement,
{
    buf.iter()
        .map(|&v| num_traits::cast(v).unwrap_or(T::default_nodata()))
        .collect()
}

/// Read GeoTransform from the ModelPixelScale + ModelTiepoint tags
fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<GeoTransform> {
    // The decoder canonicalizes these tag numbers to the `tiff` crate's named
    // variants, so look them up by name rather than `Tag::Unknown(..)`.
    let scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(|_| Error::Other("No pixel scale tag".into()))?;

    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(|_| Error::Other("No tiepoint tag".into()))?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z]; scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];

        return Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
    }

    Err(Error::Other("Cannot determine geotransform".into()))
}

/// Extract the EPSG code from the GeoKey directory, if present
fn read_crs<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder
        .get_tag_u16_vec(Tag::GeoKeyDirectoryTag)
        .ok()?;

    // Directory header is 4 shorts, then 4 shorts per key:
    // [key_id, tag_location, count, value]
    for entry in keys.get(4..)?.chunks_exact(4) {
        let (key_id, tag_location, value) = (entry[0], entry[1], entry[3]);
        if tag_location != 0 {
            continue;
        }
        if key_id == GEOGRAPHIC_TYPE || key_id == PROJECTED_CS_TYPE {
            return Some(CRS::from_epsg(value as u32));
        }
    }
    None
}

/// Write a raster to a GeoTIFF file as 32-bit float
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut encoder =
        TiffEncoder::new(file).map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let (rows, cols) = raster.shape();

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    let gt = raster.transform();

    let scale = vec![gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), scale.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write scale tag: {}", e)))?;

    let tiepoint = vec![0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_TIEPOINT), tiepoint.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write tiepoint tag: {}", e)))?;

    // GeoKey directory: geographic model for EPSG 4xxx codes, projected
    // otherwise; RasterPixelIsArea in both cases.
    let epsg = raster.crs().and_then(CRS::epsg).unwrap_or(4326);
    let geographic = (4000..5000).contains(&epsg);
    let geokeys: Vec<u16> = if geographic {
        vec![
            1, 1, 0, 3,
            GT_MODEL_TYPE, 0, 1, 2,
            GT_RASTER_TYPE, 0, 1, 1,
            GEOGRAPHIC_TYPE, 0, 1, epsg as u16,
        ]
    } else {
        vec![
            1, 1, 0, 3,
            GT_MODEL_TYPE, 0, 1, 1,
            GT_RASTER_TYPE, 0, 1, 1,
            PROJECTED_CS_TYPE, 0, 1, epsg as u16,
        ]
    };
    image
        .encoder()
        .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), geokeys.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write geokey tag: {}", e)))?;

    image
        .write_data(&data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_geotiff_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tif");

        let mut raster: Raster<f64> = Raster::new(4, 5);
        raster.set_transform(GeoTransform::new(-59.9, 13.5, 0.001, -0.001));
        raster.set_crs(Some(CRS::wgs84()));
        raster.set(1, 2, 0.25).unwrap();
        raster.set(3, 4, -0.5).unwrap();

        write_geotiff(&raster, &path).unwrap();
        let back: Raster<f64> = read_geotiff(&path).unwrap();

        assert_eq!(back.shape(), (4, 5));
        assert_relative_eq!(back.get(1, 2).unwrap(), 0.25, epsilon = 1e-6);
        assert_relative_eq!(back.get(3, 4).unwrap(), -0.5, epsilon = 1e-6);
        assert_relative_eq!(back.transform().origin_x, -59.9, epsilon = 1e-9);
        assert_relative_eq!(back.transform().pixel_height, -0.001, epsilon = 1e-9);
        assert_eq!(back.crs().and_then(CRS::epsg), Some(4326));
    }

    #[test]
    fn test_nan_survives_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.tif");

        let mut mask: Raster<f64> = Raster::filled(3, 3, f64::NAN);
        mask.set_nodata(Some(f64::NAN));
        mask.set(1, 1, 1.0).unwrap();

        write_geotiff(&mask, &path).unwrap();
        let back: Raster<f64> = read_geotiff(&path).unwrap();

        assert!(back.get(0, 0).unwrap().is_nan());
        assert_eq!(back.get(1, 1).unwrap(), 1.0);
    }
}
