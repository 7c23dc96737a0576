use crate::collage_types::MAX_ROTATION_DEGREES;
use crate::rotator::RotatedImage;

/// Share of the worst-case rotation growth that is pulled back.
const ROTATION_COMPENSATION: f64 = 0.5;

/// Canvas offset for the top-left corner of `rotated` placed in `cell`.
///
/// Cells start `margin` pixels before the canvas origin. Rotation inflates the
/// bounding box toward the bottom-right, so more strongly rotated images are
/// shifted back up and left in proportion to the angle.
pub fn place(
    cell: (usize, usize),
    rotated: &RotatedImage,
    cell_width: u32,
    cell_height: u32,
    margin: u32,
    angle: i32,
) -> (i64, i64) {
    let (row, col) = cell;
    let shift = rotation_shift(rotated.width(), rotated.height(), angle);

    let x = col as i64 * cell_width as i64 - margin as i64 - shift;
    let y = row as i64 * cell_height as i64 - margin as i64 - shift;
    (x, y)
}

/// Pixels to pull a `width`x`height` rotated box back toward its cell origin.
pub fn rotation_shift(width: u32, height: u32, angle: i32) -> i64 {
    let w = width as f64;
    let h = height as f64;
    let diagonal = (w * w + h * h).sqrt();
    let max_shift = (diagonal - w.min(h)) / 2.0;

    let ratio = (angle.unsigned_abs() as f64 / MAX_ROTATION_DEGREES as f64).min(1.0);
    (ratio * max_shift * ROTATION_COMPENSATION) as i64
}
