//! Native GeoTIFF reading (without GDAL)
//!
//! Uses the `tiff` crate. Georeferencing is taken from the
//! ModelPixelScale + ModelTiepoint tags, and no-data from the GDAL_NODATA
//! ASCII tag when present. Projections are not interpreted: all inputs are
//! expected in the same projected CRS with metre units.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

/// Read the first band of a GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(BufReader::new(file))
}

/// Read a GeoTIFF from an in-memory buffer
pub fn read_geotiff_from_buffer<T>(data: &[u8]) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data))
}

fn cast_all<S, T>(buf: Vec<S>) -> Vec<T>
where
    S: num_traits::NumCast + Copy,
    T: RasterElement,
{
    buf.into_iter()
        .map(|v| num_traits::cast(v).unwrap_or_else(T::default_nodata))
        .collect()
}

fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder =
        Decoder::new(reader).map_err(|e| Error::Format(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Format(format!("Cannot read dimensions: {}", e)))?;
    let rows = height as usize;
    let cols = width as usize;

    let image = decoder
        .read_image()
        .map_err(|e| Error::Format(format!("Cannot read image data: {}", e)))?;

    let data: Vec<T> = match image {
        DecodingResult::U8(buf) => cast_all(buf),
        DecodingResult::U16(buf) => cast_all(buf),
        DecodingResult::U32(buf) => cast_all(buf),
        DecodingResult::I8(buf) => cast_all(buf),
        DecodingResult::I16(buf) => cast_all(buf),
        DecodingResult::I32(buf) => cast_all(buf),
        DecodingResult::F32(buf) => cast_all(buf),
        DecodingResult::F64(buf) => cast_all(buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    // Multi-sample images decode interleaved; only single-band files are accepted.
    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;
    raster.set_transform(read_geotransform(&mut decoder)?);
    raster.set_nodata(read_nodata(&mut decoder));
    Ok(raster)
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(|_| Error::Format("GeoTIFF has no ModelPixelScale tag".into()))?;
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(|_| Error::Format("GeoTIFF has no ModelTiepoint tag".into()))?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(Error::Format("Cannot determine geotransform".into()));
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

fn read_nodata<T: RasterElement, R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<T> {
    let text = decoder.get_tag_ascii_string(Tag::GdalNodata).ok()?;
    let value: f64 = text.trim_matches(char::from(0)).trim().parse().ok()?;
    num_traits::cast(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_is_format_error() {
        let result = read_geotiff_from_buffer::<u16>(b"definitely not a tiff");
        assert!(matches!(result, Err(Error::Format(_))));
    }

    fn encode_u16(values: &[u16], rows: u32, cols: u32, nodata: &str) -> Vec<u8> {
        use tiff::encoder::{colortype::Gray16, TiffEncoder};

        let scale = [30.0, 30.0, 0.0];
        let tiepoint = [0.0, 0.0, 0.0, 500_000.0, 4_200_000.0, 0.0];
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut buffer).unwrap();
            let mut image = encoder.new_image::<Gray16>(cols, rows).unwrap();
            image.encoder().write_tag(Tag::ModelPixelScaleTag, &scale[..]).unwrap();
            image.encoder().write_tag(Tag::ModelTiepointTag, &tiepoint[..]).unwrap();
            image.encoder().write_tag(Tag::GdalNodata, nodata).unwrap();
            image.write_data(values).unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn test_decode_class_codes() {
        let bytes = encode_u16(&[41, 42, 11, 0, 43, 90], 2, 3, "0");
        let raster = read_geotiff_from_buffer::<u16>(&bytes).unwrap();

        assert_eq!(raster.shape(), (2, 3));
        assert_eq!(raster.get(0, 1).unwrap(), 42);
        assert_eq!(raster.get(1, 2).unwrap(), 90);
        assert_eq!(raster.nodata(), Some(0));
        assert_eq!(raster.transform().origin_x, 500_000.0);
        assert_eq!(raster.transform().origin_y, 4_200_000.0);
        assert_eq!(raster.cell_size(), 30.0);
    }

    #[test]
    fn test_decode_casts_to_requested_type() {
        let bytes = encode_u16(&[0, 35, 70, 105], 2, 2, "0");
        let raster = read_geotiff_from_buffer::<f64>(&bytes).unwrap();

        assert_eq!(raster.get(0, 1).unwrap(), 35.0);
        assert_eq!(raster.get(1, 1).unwrap(), 105.0);
        assert_eq!(raster.nodata(), Some(0.0));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = read_geotiff::<f64, _>("/nonexistent/landcover.tif");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
