use anyhow::Result;
use ndarray::Array3;
use std::borrow::Cow;
use std::io::{Cursor, Read, Seek};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use zip::ZipArchive;

use crate::error::GeosysError;
use crate::util::prealloc;

/// Pixel values of one image, shaped `(bands, height, width)`.
pub type ImageArray = Array3<f64>;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

pub(crate) fn reflectance_map_path(field_id: &str, image_id: &str) -> String {
    format!(
        "field-level-maps/v4/season-fields/{}/coverage/{}/base-reference-map/REFLECTANCE/image.tiff.zip",
        field_id, image_id
    )
}

fn invalid(e: impl std::fmt::Display) -> GeosysError {
    GeosysError::InvalidImage(e.to_string())
}

/// Decodes a (possibly zipped) TIFF into a `(bands, height, width)` array.
///
/// Every sample type is widened to `f64`. Only the first image of the file is read.
pub fn decode_image(bytes: &[u8]) -> Result<ImageArray> {
    if bytes.is_empty() {
        return Err(GeosysError::DataUnavailable("image download was empty".to_string()).into());
    }

    let tiff: Cow<'_, [u8]> = if bytes.starts_with(ZIP_MAGIC) {
        Cow::Owned(extract_tiff(bytes)?)
    } else {
        Cow::Borrowed(bytes)
    };

    Ok(decode_tiff(&tiff)?)
}

fn extract_tiff(bytes: &[u8]) -> Result<Vec<u8>, GeosysError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(invalid)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(invalid)?;
        let name = entry.name().to_ascii_lowercase();
        if name.ends_with(".tif") || name.ends_with(".tiff") {
            let mut buf = Vec::with_capacity(prealloc(entry.size()));
            entry.read_to_end(&mut buf).map_err(invalid)?;
            return Ok(buf);
        }
    }
    Err(GeosysError::InvalidImage(
        "archive contains no .tif entry".to_string(),
    ))
}

fn decode_tiff(bytes: &[u8]) -> Result<ImageArray, GeosysError> {
    let mut decoder = Decoder::new(Cursor::new(bytes)).map_err(invalid)?;
    let (w, h) = decoder.dimensions().map_err(invalid)?;
    let (width, height) = (w as usize, h as usize);
    if width == 0 || height == 0 {
        return Err(GeosysError::InvalidImage("empty raster".to_string()));
    }

    // 1 = chunky (pixel interleaved), 2 = planar (band sequential)
    let planar = decoder.get_tag_u32(Tag::PlanarConfiguration).unwrap_or(1);
    if planar == 2 {
        let bands = decoder.get_tag_u32(Tag::SamplesPerPixel).unwrap_or(1) as usize;
        let data = read_planes(&mut decoder, width, height, bands)?;
        return Array3::from_shape_vec((bands, height, width), data).map_err(invalid);
    }

    let data = samples_as_f64(decoder.read_image().map_err(invalid)?)?;
    let pixels = width * height;
    if data.len() % pixels != 0 {
        return Err(GeosysError::InvalidImage(format!(
            "{} samples do not fit a {}x{} raster",
            data.len(),
            width,
            height
        )));
    }
    let bands = data.len() / pixels;
    let hwb = Array3::from_shape_vec((height, width, bands), data).map_err(invalid)?;
    Ok(hwb.permuted_axes([2, 0, 1]).as_standard_layout().into_owned())
}

/// Reads every plane of a band-sequential image chunk by chunk.
///
/// `read_image` only yields the first plane of such files. Chunks are stored
/// plane after plane, each plane split into the same grid of strips or tiles.
fn read_planes<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    width: usize,
    height: usize,
    bands: usize,
) -> Result<Vec<f64>, GeosysError> {
    let (cw, ch) = decoder.chunk_dimensions();
    let (cw, ch) = (cw as usize, ch as usize);
    if cw == 0 || ch == 0 {
        return Err(GeosysError::InvalidImage("zero sized chunks".to_string()));
    }
    let across = width.div_ceil(cw);
    let down = height.div_ceil(ch);
    let per_plane = across * down;
    let plane = width * height;

    let mut out = vec![0.0; bands * plane];
    for band in 0..bands {
        for c in 0..per_plane {
            let index = (band * per_plane + c) as u32;
            let chunk = samples_as_f64(decoder.read_chunk(index).map_err(invalid)?)?;

            let (x0, y0) = ((c % across) * cw, (c / across) * ch);
            let dw = cw.min(width - x0);
            let dh = ch.min(height - y0);
            let stride = chunk.len() / dh;
            if stride < dw || chunk.len() < stride * dh {
                return Err(GeosysError::InvalidImage(format!(
                    "chunk {} holds {} samples, expected {}x{}",
                    index,
                    chunk.len(),
                    dw,
                    dh
                )));
            }

            for row in 0..dh {
                let dst = band * plane + (y0 + row) * width + x0;
                out[dst..dst + dw].copy_from_slice(&chunk[row * stride..row * stride + dw]);
            }
        }
    }
    Ok(out)
}

fn samples_as_f64(result: DecodingResult) -> Result<Vec<f64>, GeosysError> {
    #[allow(unreachable_patterns)]
    match result {
        DecodingResult::U8(data) => Ok(data.into_iter().map(f64::from).collect()),
        DecodingResult::U16(data) => Ok(data.into_iter().map(f64::from).collect()),
        DecodingResult::U32(data) => Ok(data.into_iter().map(f64::from).collect()),
        DecodingResult::U64(data) => Ok(data.into_iter().map(|x| x as f64).collect()),
        DecodingResult::I8(data) => Ok(data.into_iter().map(f64::from).collect()),
        DecodingResult::I16(data) => Ok(data.into_iter().map(f64::from).collect()),
        DecodingResult::I32(data) => Ok(data.into_iter().map(f64::from).collect()),
        DecodingResult::I64(data) => Ok(data.into_iter().map(|x| x as f64).collect()),
        DecodingResult::F32(data) => Ok(data.into_iter().map(f64::from).collect()),
        DecodingResult::F64(data) => Ok(data),
        _ => Err(GeosysError::InvalidImage(
            "unsupported TIFF sample format".to_string(),
        )),
    }
}
