//! Native GeoTIFF reading/writing using the `tiff` crate.
//!
//! Only the affine georeferencing tags (ModelPixelScale + ModelTiepoint) and
//! an inline EPSG code in the GeoKey directory are understood. That is all the
//! engine needs to sample DEMs at map coordinates, check layer CRS agreement
//! and write valley-floor masks back on the same grid.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

// The decoder maps known codes to named variants, so lookups by
// `Tag::Unknown(code)` never match these.
const MODEL_PIXEL_SCALE: Tag = Tag::ModelPixelScaleTag;
const MODEL_TIEPOINT: Tag = Tag::ModelTiepointTag;
const GEO_KEY_DIRECTORY: Tag = Tag::GeoKeyDirectoryTag;
const GDAL_NODATA: Tag = Tag::GdalNodata;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

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
pub fn read_geotiff_from_buffer<T: RasterElement>(data: &[u8]) -> Result<Raster<T>> {
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
        Decoder::new(reader).map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;
    let (rows, cols) = (height as usize, width as usize);

    let data: Vec<T> = match decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?
    {
        DecodingResult::F32(buf) => cast_all(buf),
        DecodingResult::F64(buf) => cast_all(buf),
        DecodingResult::U8(buf) => cast_all(buf),
        DecodingResult::U16(buf) => cast_all(buf),
        DecodingResult::U32(buf) => cast_all(buf),
        DecodingResult::I8(buf) => cast_all(buf),
        DecodingResult::I16(buf) => cast_all(buf),
        DecodingResult::I32(buf) => cast_all(buf),
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };

    let mut raster = Raster::from_vec(data, rows, cols)?;
    if let Some(transform) = read_geotransform(&mut decoder)? {
        raster.set_transform(transform);
    }
    raster.set_crs(read_crs(&mut decoder));
    if let Some(nodata) = read_nodata::<T, R>(&mut decoder) {
        raster.set_nodata(Some(nodata));
    }
    Ok(raster)
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<GeoTransform>> {
    let tag_err = |what: &str, e: tiff::TiffError| Error::Other(format!("{}: {}", what, e));
    let scale = decoder
        .find_tag(MODEL_PIXEL_SCALE)
        .map_err(|e| tag_err("Cannot read scale tag", e))?;
    let tiepoint = decoder
        .find_tag(MODEL_TIEPOINT)
        .map_err(|e| tag_err("Cannot read tiepoint tag", e))?;
    let (scale, tiepoint) = match (scale, tiepoint) {
        (Some(s), Some(t)) => (
            s.into_f64_vec()
                .map_err(|e| tag_err("Invalid scale tag", e))?,
            t.into_f64_vec()
                .map_err(|e| tag_err("Invalid tiepoint tag", e))?,
        ),
        _ => return Ok(None),
    };
    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(Error::Other(format!(
            "Georeferencing tags too short: scale {}, tiepoint {}",
            scale.len(),
            tiepoint.len()
        )));
    }
    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Ok(Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1])))
}

/// EPSG code from the GeoKey directory, if one is declared inline
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder.get_tag_u16_vec(GEO_KEY_DIRECTORY).ok()?;
    // header [version, revision, minor, count], then [id, location, count, value] per key
    let count = usize::from(*keys.get(3)?);
    keys.get(4..4 + 4 * count)?
        .chunks_exact(4)
        .find(|k| (k[0] == PROJECTED_CS_TYPE_KEY || k[0] == GEOGRAPHIC_TYPE_KEY) && k[1] == 0)
        .map(|k| CRS::from_epsg(u32::from(k[3])))
}

/// Minimal key directory: model type, RasterPixelIsArea and the EPSG code when known
fn geo_keys(crs: Option<&CRS>) -> Vec<u16> {
    let epsg = crs
        .and_then(CRS::epsg)
        .and_then(|code| u16::try_from(code).ok());
    let mut keys = vec![1, 1, 0, 2];
    match epsg {
        Some(code) if (4000..5000).contains(&code) => {
            keys[3] = 3;
            keys.extend([GT_MODEL_TYPE_KEY, 0, 1, 2]);
            keys.extend([GT_RASTER_TYPE_KEY, 0, 1, 1]);
            keys.extend([GEOGRAPHIC_TYPE_KEY, 0, 1, code]);
        }
        Some(code) => {
            keys[3] = 3;
            keys.extend([GT_MODEL_TYPE_KEY, 0, 1, 1]);
            keys.extend([GT_RASTER_TYPE_KEY, 0, 1, 1]);
            keys.extend([PROJECTED_CS_TYPE_KEY, 0, 1, code]);
        }
        None => {
            keys.extend([GT_MODEL_TYPE_KEY, 0, 1, 1]);
            keys.extend([GT_RASTER_TYPE_KEY, 0, 1, 1]);
        }
    }
    keys
}

fn read_nodata<T: RasterElement, R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<T> {
    let text = decoder.get_tag_ascii_string(GDAL_NODATA).ok()?;
    let value: f64 = text.trim_matches(char::from(0)).trim().parse().ok()?;
    num_traits::cast(value)
}

/// Write a Raster to a GeoTIFF file as 32-bit float
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    encode_geotiff(raster, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T: RasterElement>(raster: &Raster<T>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let tiff_err = |what: &str, e: tiff::TiffError| Error::Other(format!("{}: {}", what, e));

    let mut encoder = TiffEncoder::new(writer).map_err(|e| tiff_err("TIFF encoder error", e))?;
    let (rows, cols) = raster.shape();

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| tiff_err("Cannot create TIFF image", e))?;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(MODEL_PIXEL_SCALE, &scale[..])
        .map_err(|e| tiff_err("Cannot write scale tag", e))?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(MODEL_TIEPOINT, &tiepoint[..])
        .map_err(|e| tiff_err("Cannot write tiepoint tag", e))?;

    let geokeys = geo_keys(raster.crs());
    image
        .encoder()
        .write_tag(GEO_KEY_DIRECTORY, &geokeys[..])
        .map_err(|e| tiff_err("Cannot write geokey tag", e))?;

    if let Some(nodata) = raster.nodata().and_then(RasterElement::to_f64) {
        image
            .encoder()
            .write_tag(GDAL_NODATA, nodata.to_string().as_str())
            .map_err(|e| tiff_err("Cannot write nodata tag", e))?;
    }

    image
        .write_data(&data)
        .map_err(|e| tiff_err("Cannot write image data", e))?;

    Ok(())
}
