use image::RgbaImage;

use crate::collage_types::PlacedRegion;
use crate::raster::RasterOps;
use crate::rotator::RotatedImage;

/// Blends `rotated` onto `canvas` at `offset`, using the image's own alpha as
/// the mask. Later calls draw over earlier ones.
pub fn composite(
    canvas: &mut RgbaImage,
    offset: (i64, i64),
    rotated: &RotatedImage,
) -> PlacedRegion {
    let (x, y) = offset;
    canvas.alpha_composite(&rotated.image, x, y);

    PlacedRegion {
        x,
        y,
        width: rotated.width(),
        height: rotated.height(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn opaque(width: u32, height: u32, color: [u8; 3]) -> RotatedImage {
        let [r, g, b] = color;
        RotatedImage {
            image: RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255])),
            angle: 0,
        }
    }

    #[test]
    fn test_later_images_draw_on_top() {
        // GIVEN: A white canvas and two overlapping opaque images
        let mut canvas = RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255]));
        let red = opaque(60, 60, [255, 0, 0]);
        let blue = opaque(60, 60, [0, 0, 255]);

        // WHEN: Compositing red first, then blue
        composite(&mut canvas, (0, 0), &red);
        composite(&mut canvas, (30, 30), &blue);

        // THEN: Blue wins where they overlap, red shows elsewhere
        assert_eq!(canvas.get_pixel(45, 45), &Rgba([0, 0, 255, 255]));
        assert_eq!(canvas.get_pixel(10, 10), &Rgba([255, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(95, 5), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_region_records_offset_and_size() {
        let mut canvas = RgbaImage::from_pixel(50, 50, Rgba([255, 255, 255, 255]));
        let region = composite(&mut canvas, (-10, 20), &opaque(30, 40, [0, 0, 0]));

        assert_eq!(
            region,
            PlacedRegion {
                x: -10,
                y: 20,
                width: 30,
                height: 40
            }
        );
        assert_eq!(region.right(), 20);
        assert_eq!(region.bottom(), 60);
    }

    #[test]
    fn test_transparent_pixels_leave_canvas_untouched() {
        let mut canvas = RgbaImage::from_pixel(20, 20, Rgba([255, 255, 255, 255]));
        let clear = RotatedImage {
            image: RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 0])),
            angle: 5,
        };

        composite(&mut canvas, (0, 0), &clear);

        assert!(canvas.pixels().all(|p| *p == Rgba([255, 255, 255, 255])));
    }
}
