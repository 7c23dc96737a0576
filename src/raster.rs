//! Raster Operations
//!
//! The small set of pixel operations the collage engine needs, expressed as a
//! trait over `image::RgbaImage`:
//! - free-angle rotation with an expanded bounding box
//! - alpha compositing at signed offsets
//! - rounded-rectangle masks and fills

use image::imageops;
use image::{Pixel, Rgba, RgbaImage};
use imageproc::geometric_transformations::{self, Interpolation};

/// Fill for pixels outside rotated content. White keeps interpolated edges
/// from darkening on the usual white canvas.
const TRANSPARENT: Rgba<u8> = Rgba([255, 255, 255, 0]);

/// Rotations smaller than this (in degrees) are treated as no rotation.
const ANGLE_EPSILON: f32 = 1e-3;

/// Transparent border added around rotated content so anti-aliased edges
/// are never clipped.
const ROTATION_PADDING: u32 = 1;

pub trait RasterOps {
    /// Rotates about the center, counter-clockwise for positive angles.
    /// The output is enlarged so no corner of the content is clipped.
    fn rotated(&self, angle_degrees: f32) -> RgbaImage;

    /// Blends `top` over `self` using `top`'s alpha channel.
    fn alpha_composite(&mut self, top: &RgbaImage, x: i64, y: i64);

    /// Multiplies the alpha channel by a rounded-rectangle mask covering the
    /// whole image. Pixels outside the mask become fully transparent.
    fn apply_rounded_mask(&mut self, radius: u32);

    /// Blends a filled rounded rectangle onto the image.
    fn fill_rounded_rect(&mut self, rect: RoundedRect, color: Rgba<u8>);
}

/// Axis-aligned rectangle with rounded corners, in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundedRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
    pub radius: u32,
}

impl RoundedRect {
    /// Fraction of the pixel at (`px`, `py`) covered by the rectangle.
    pub fn coverage(&self, px: i64, py: i64) -> f32 {
        let w = self.width as f32;
        let h = self.height as f32;
        let r = (self.radius as f32).min(w / 2.0).min(h / 2.0);

        // Pixel center relative to the rectangle's top-left corner
        let cx = (px - self.x) as f32 + 0.5;
        let cy = (py - self.y) as f32 + 0.5;

        if cx < 0.0 || cy < 0.0 || cx > w || cy > h {
            return 0.0;
        }
        if r <= 0.0 {
            return 1.0;
        }

        let nearest_x = cx.clamp(r, w - r);
        let nearest_y = cy.clamp(r, h - r);
        let distance = ((cx - nearest_x).powi(2) + (cy - nearest_y).powi(2)).sqrt();

        (r - distance + 0.5).clamp(0.0, 1.0)
    }
}

impl RasterOps for RgbaImage {
    fn rotated(&self, angle_degrees: f32) -> RgbaImage {
        if angle_degrees.abs() < ANGLE_EPSILON {
            return self.clone();
        }

        let (width, height) = self.dimensions();
        let (new_w, new_h) = rotated_bounds(width, height, angle_degrees);

        // Center the source on the enlarged box so nothing is clipped
        let mut padded = RgbaImage::from_pixel(new_w, new_h, TRANSPARENT);
        imageops::replace(
            &mut padded,
            self,
            ((new_w - width) / 2) as i64,
            ((new_h - height) / 2) as i64,
        );

        // imageproc turns clockwise for positive angles
        geometric_transformations::rotate_about_center(
            &padded,
            -angle_degrees.to_radians(),
            Interpolation::Bilinear,
            TRANSPARENT,
        )
    }

    fn alpha_composite(&mut self, top: &RgbaImage, x: i64, y: i64) {
        imageops::overlay(self, top, x, y);
    }

    fn apply_rounded_mask(&mut self, radius: u32) {
        let (width, height) = self.dimensions();
        let mask = RoundedRect {
            x: 0,
            y: 0,
            width,
            height,
            radius,
        };

        for (px, py, pixel) in self.enumerate_pixels_mut() {
            let coverage = mask.coverage(px as i64, py as i64);
            if coverage >= 1.0 {
                continue;
            }
            pixel[3] = (pixel[3] as f32 * coverage.max(0.0)).round() as u8;
        }
    }

    fn fill_rounded_rect(&mut self, rect: RoundedRect, color: Rgba<u8>) {
        let (canvas_w, canvas_h) = self.dimensions();

        let x_start = rect.x.max(0);
        let y_start = rect.y.max(0);
        let x_end = (rect.x + rect.width as i64).min(canvas_w as i64);
        let y_end = (rect.y + rect.height as i64).min(canvas_h as i64);

        for py in y_start..y_end {
            for px in x_start..x_end {
                let coverage = rect.coverage(px, py);
                if coverage <= 0.0 {
                    continue;
                }
                let alpha = (color[3] as f32 * coverage).round() as u8;
                let paint = Rgba([color[0], color[1], color[2], alpha]);
                self.get_pixel_mut(px as u32, py as u32).blend(&paint);
            }
        }
    }
}

/// Width and height of the box enclosing a `width`x`height` rectangle rotated
/// by `angle_degrees`, including the transparent anti-aliasing border.
pub fn rotated_bounds(width: u32, height: u32, angle_degrees: f32) -> (u32, u32) {
    if angle_degrees.abs() < ANGLE_EPSILON {
        return (width, height);
    }

    let (sin_a, cos_a) = (angle_degrees as f64).to_radians().sin_cos();
    let w = width as f64;
    let h = height as f64;

    let new_w = (w * cos_a.abs() + h * sin_a.abs()).ceil() as u32;
    let new_h = (w * sin_a.abs() + h * cos_a.abs()).ceil() as u32;

    (
        new_w.max(width) + 2 * ROTATION_PADDING,
        new_h.max(height) + 2 * ROTATION_PADDING,
    )
}
