use image::RgbaImage;

use crate::collage_types::{CollageError, CollageResult, MAX_ROTATION_DEGREES};
use crate::image_preparer::PreparedImage;
use crate::raster::RasterOps;

/// A prepared image turned by `angle` degrees, on an enlarged transparent canvas.
#[derive(Debug, Clone)]
pub struct RotatedImage {
    pub image: RgbaImage,
    pub angle: i32,
}

impl RotatedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Rotates `prepared` about its center by `angle_degrees`, counter-clockwise
/// for positive angles. Angles beyond ±15° are refused.
pub fn rotate(prepared: &PreparedImage, angle_degrees: i32) -> CollageResult<RotatedImage> {
    if angle_degrees.abs() > MAX_ROTATION_DEGREES {
        return Err(CollageError::Rotation(format!(
            "angle {}° outside [-{max}, {max}]",
            angle_degrees,
            max = MAX_ROTATION_DEGREES
        )));
    }

    if prepared.width() == 0 || prepared.height() == 0 {
        return Err(CollageError::Rotation(
            "cannot rotate an empty image".to_string(),
        ));
    }

    Ok(RotatedImage {
        image: prepared.image.rotated(angle_degrees as f32),
        angle: angle_degrees,
    })
}
