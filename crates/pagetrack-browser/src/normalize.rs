//! Raster normalization: transparent PNG in, opaque JPEG out

use crate::error::{PagetrackError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// JPEG quality used when none is configured
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Composite an image over opaque white
///
/// Images without an alpha channel are converted to RGB unchanged. The
/// PNG decoder expands palette transparency into alpha, so it is covered too.
pub fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    let mut flattened = RgbImage::new(rgba.width(), rgba.height());
    for (source, target) in rgba.pixels().zip(flattened.pixels_mut()) {
        let [r, g, b, a] = source.0;
        *target = Rgb([over_white(r, a), over_white(g, a), over_white(b, a)]);
    }
    flattened
}

fn over_white(channel: u8, alpha: u8) -> u8 {
    let alpha = u32::from(alpha);
    ((u32::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255) as u8
}

/// Convert the raster at `source` into a JPEG at `destination`
pub fn normalize_to_jpeg(source: &Path, destination: &Path, quality: u8) -> Result<()> {
    debug!("Converting {} to JPEG {}", source.display(), destination.display());

    let image = image::open(source)
        .map_err(|e| PagetrackError::Image(format!("Failed to decode {}: {}", source.display(), e)))?;
    let flattened = flatten_onto_white(&image);

    let mut writer = BufWriter::new(File::create(destination)?);
    flattened
        .write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))
        .map_err(|e| PagetrackError::Image(format!("Failed to encode {}: {}", destination.display(), e)))?;
    writer.flush()?;

    Ok(())
}
