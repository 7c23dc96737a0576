use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use log::debug;

use crate::collage_types::{CollageError, CollageImage, CollageResult, MAX_CANVAS_PIXELS};
use crate::raster::RasterOps;

/// A photo cropped to its collage footprint with rounded, transparent corners.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub image: RgbaImage,
}

impl PreparedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Decodes `source` if needed, center-crops it to exactly `target_size` and
/// masks it with a rounded rectangle of `corner_radius`.
pub fn prepare(
    source: &CollageImage,
    target_size: (u32, u32),
    corner_radius: u32,
) -> CollageResult<PreparedImage> {
    let (target_w, target_h) = target_size;
    if target_w == 0 || target_h == 0 {
        return Err(CollageError::ImagePreparation(format!(
            "target size must be positive, got {}x{}",
            target_w, target_h
        )));
    }

    if target_w as u64 * target_h as u64 > MAX_CANVAS_PIXELS {
        return Err(CollageError::ImagePreparation(format!(
            "target size {}x{} exceeds the {} pixel limit",
            target_w, target_h, MAX_CANVAS_PIXELS
        )));
    }

    let decoded = decode(source)?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(CollageError::ImagePreparation(
            "source image has no pixels".to_string(),
        ));
    }

    let mut image = decoded
        .resize_to_fill(target_w, target_h, FilterType::Lanczos3)
        .to_rgba8();
    image.apply_rounded_mask(corner_radius);

    debug!(
        "Prepared {}x{} source as {}x{} (radius {})",
        decoded.width(),
        decoded.height(),
        target_w,
        target_h,
        corner_radius
    );

    Ok(PreparedImage { image })
}

fn decode(source: &CollageImage) -> CollageResult<std::borrow::Cow<'_, DynamicImage>> {
    match source {
        CollageImage::Bitmap(image) => Ok(std::borrow::Cow::Borrowed(image)),
        CollageImage::Encoded(bytes) => image::load_from_memory(bytes)
            .map(std::borrow::Cow::Owned)
            .map_err(|e| CollageError::ImagePreparation(format!("failed to decode image: {}", e))),
    }
}
