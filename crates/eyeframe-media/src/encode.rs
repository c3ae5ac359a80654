use eyeframe_types::{raster::RasterFrame, Result};
use image::{
    codecs::png::PngEncoder,
    imageops::{self, FilterType},
    ColorType, ImageBuffer, ImageEncoder, Rgba,
};

use crate::media_error;

/// Scale a raster to the source's native dimensions.
///
/// Rasters already at native size pass through untouched.
pub fn fit_to_native(raster: RasterFrame, native: (u32, u32)) -> Result<RasterFrame> {
    if (raster.width, raster.height) == native {
        return Ok(raster);
    }
    let Some(buffer) =
        ImageBuffer::<Rgba<u8>, _>::from_raw(raster.width, raster.height, raster.data)
    else {
        return Err(media_error("raster buffer does not match its dimensions"));
    };
    let resized = imageops::resize(&buffer, native.0, native.1, FilterType::Triangle);
    Ok(RasterFrame::from_rgba(native.0, native.1, resized.into_raw()))
}

/// Encode an RGBA raster as a lossless PNG payload.
pub fn encode_png(raster: &RasterFrame) -> Result<Vec<u8>> {
    if raster.is_empty() || !raster.is_consistent() {
        return Err(media_error(format!(
            "cannot encode {}x{} raster with {} bytes",
            raster.width,
            raster.height,
            raster.data.len()
        )));
    }
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(&raster.data, raster.width, raster.height, ColorType::Rgba8)
        .map_err(|err| media_error(format!("PNG encoding failed: {err}")))?;
    Ok(out)
}
