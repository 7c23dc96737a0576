//! Text Layer
//!
//! Draws the title, caption and metadata lines of a collage. Each line is
//! centered horizontally and sits on a translucent rounded box so it stays
//! legible on top of the photos. Vertical positions are threaded through a
//! `TextCursor`: every draw returns where the next block may start.

use chrono::NaiveDate;
use image::{Rgba, RgbaImage};

use crate::collage_types::CanvasConfig;
use crate::font_resolver::Font;
use crate::raster::{RasterOps, RoundedRect};

const METADATA_SEPARATOR: &str = " • ";
const METADATA_DATE_FORMAT: &str = "%B %d, %Y";

/// Next free vertical pixel offset on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TextCursor(pub i64);

#[derive(Debug, Clone)]
pub struct TextLayer {
    color: Rgba<u8>,
    background: Option<Rgba<u8>>,
    background_radius: u32,
    padding: u32,
    spacing: u32,
}

impl TextLayer {
    pub fn new(
        color: Rgba<u8>,
        background: Option<Rgba<u8>>,
        background_radius: u32,
        padding: u32,
        spacing: u32,
    ) -> Self {
        Self {
            color,
            background,
            background_radius,
            padding,
            spacing,
        }
    }

    pub fn from_config(config: &CanvasConfig) -> Self {
        let background = config.text_background_pixel();
        Self::new(
            config.text_pixel(),
            (background[3] > 0).then_some(background),
            config.text_background_radius,
            config.text_padding,
            config.margin,
        )
    }

    /// Draws `text` horizontally centered with its ink box starting at
    /// `cursor`, and returns the cursor for the next block.
    pub fn center_text(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        font: &Font,
        cursor: TextCursor,
    ) -> TextCursor {
        let bounds = font.measure(text);
        let TextCursor(y) = cursor;
        let x = (canvas.width() as i64 - bounds.width as i64) / 2;

        if bounds.width > 0 {
            if let Some(background) = self.background {
                let padding = self.padding as i64;
                let rect = RoundedRect {
                    x: x - padding,
                    y: y - padding,
                    width: bounds.width + 2 * self.padding,
                    height: bounds.height + 2 * self.padding,
                    radius: self.background_radius,
                };
                canvas.fill_rounded_rect(rect, background);
            }
            font.draw(canvas, text, x, y, self.color);
        }

        self.advance(cursor, bounds.height)
    }

    /// Height a block of `text` occupies before the spacing to the next one.
    pub fn block_height(&self, text: &str, font: &Font) -> u32 {
        font.measure(text).height
    }

    /// Cursor at which a stack of `blocks` must start so that the last one,
    /// including its background padding, ends `spacing` pixels above the
    /// bottom of a canvas of `canvas_height`.
    pub fn footer_start(&self, canvas_height: u32, blocks: &[(&str, &Font)]) -> TextCursor {
        let stacked: i64 = blocks
            .iter()
            .map(|(text, font)| self.block_height(text, font) as i64)
            .sum();
        let gaps = blocks.len().saturating_sub(1) as i64 * self.spacing as i64;

        TextCursor(
            canvas_height as i64 - self.spacing as i64 - self.padding as i64 - stacked - gaps,
        )
    }

    fn advance(&self, cursor: TextCursor, text_height: u32) -> TextCursor {
        TextCursor(cursor.0 + text_height as i64 + self.spacing as i64)
    }
}

/// Joins location and date ("Month DD, YYYY") with a bullet.
/// A single present field is returned as is; no fields give an empty string.
pub fn format_metadata(location: Option<&str>, date: Option<NaiveDate>) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(2);
    if let Some(location) = location.filter(|l| !l.trim().is_empty()) {
        parts.push(location.to_string());
    }
    if let Some(date) = date {
        parts.push(date.format(METADATA_DATE_FORMAT).to_string());
    }
    parts.join(METADATA_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font_resolver::FontResolver;
    use std::path::Path;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn layer() -> TextLayer {
        TextLayer::from_config(&CanvasConfig::default())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_format_metadata() {
        assert_eq!(
            format_metadata(Some("Paris"), Some(date(2023, 1, 1))),
            "Paris • January 01, 2023"
        );
        assert_eq!(format_metadata(Some("Paris"), None), "Paris");
        assert_eq!(format_metadata(None, Some(date(2023, 6, 15))), "June 15, 2023");
        assert_eq!(format_metadata(None, None), "");
        assert_eq!(format_metadata(Some(""), None), "");
        assert_eq!(format_metadata(Some("  "), Some(date(2020, 12, 31))), "December 31, 2020");
    }

    #[test]
    fn test_center_text_returns_strictly_increasing_cursors() {
        // GIVEN: A canvas and three text blocks
        let mut canvas = RgbaImage::from_pixel(600, 800, WHITE);
        let layer = layer();
        let title = Font::builtin(60);
        let body = Font::builtin(36);
        let small = Font::builtin(24);

        // WHEN: Drawing them one after the other
        let start = TextCursor(40);
        let after_title = layer.center_text(&mut canvas, "Trip", &title, start);
        let after_caption = layer.center_text(&mut canvas, "Fun times", &body, after_title);
        let after_meta =
            layer.center_text(&mut canvas, "NYC • June 15, 2023", &small, after_caption);

        // THEN: Each block starts below the previous one
        assert!(start < after_title);
        assert!(after_title < after_caption);
        assert!(after_caption < after_meta);
        assert_eq!(after_title.0, 40 + title.measure("Trip").height as i64 + 40);
    }

    #[test]
    fn test_center_text_with_truetype_font_advances_past_ink() {
        // GIVEN: A real TrueType font from the bundled test fonts
        let fonts_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fonts");
        let font = FontResolver::new(fonts_dir).load_font("DejaVuSans.ttf", 60);
        assert!(!font.is_builtin());
        let mut canvas = RgbaImage::from_pixel(800, 300, WHITE);

        // WHEN: Drawing a line at y = 50
        let next = layer().center_text(&mut canvas, "Paris • Trip gyq", &font, TextCursor(50));

        // THEN: The cursor moves past the text height plus spacing and no ink lies beyond it
        let height = font.measure("Paris • Trip gyq").height as i64;
        assert_eq!(next, TextCursor(50 + height + 40));
        let lowest_ink = canvas
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] < 120 && p[1] < 120)
            .map(|(_, y, _)| y as i64)
            .max()
            .unwrap();
        assert!(lowest_ink < next.0);
        assert!(lowest_ink >= 50);
    }

    #[test]
    fn test_center_text_is_horizontally_centered() {
        let mut canvas = RgbaImage::from_pixel(300, 100, WHITE);
        let layer = TextLayer::new(Rgba([0, 0, 0, 255]), None, 0, 0, 10);
        let font = Font::builtin(16);

        layer.center_text(&mut canvas, "II", &font, TextCursor(10));

        let inked: Vec<u32> = canvas
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] < 128)
            .map(|(x, _, _)| x)
            .collect();
        let min_x = *inked.iter().min().unwrap();
        let max_x = *inked.iter().max().unwrap();
        let bounds = font.measure("II");
        let left = (300 - bounds.width) / 2;
        assert!(min_x >= left);
        assert!(max_x < left + bounds.width);
    }

    #[test]
    fn test_center_text_paints_translucent_background() {
        let mut canvas = RgbaImage::from_pixel(400, 200, WHITE);
        let layer = layer();
        let font = Font::builtin(24);
        let bounds = font.measure("Hello");

        layer.center_text(&mut canvas, "Hello", &font, TextCursor(50));

        // Just inside the padded box, left of the glyphs
        let x = (400 - bounds.width) / 2 - 5;
        let pixel = canvas.get_pixel(x, 50 + bounds.height / 2);
        assert!(pixel[0] < 255, "expected cyan tint, got {:?}", pixel);
        assert_eq!(pixel[1], 255);
        assert_eq!(pixel[2], 255);
    }

    #[test]
    fn test_empty_text_draws_nothing_but_advances() {
        let mut canvas = RgbaImage::from_pixel(100, 100, WHITE);
        let next = layer().center_text(&mut canvas, "", &Font::builtin(24), TextCursor(10));

        assert!(canvas.pixels().all(|p| *p == WHITE));
        assert_eq!(next, TextCursor(50));
    }

    #[test]
    fn test_footer_fits_on_canvas() {
        let layer = layer();
        let caption = Font::builtin(36);
        let metadata = Font::builtin(24);
        let blocks = [("Fun times", &caption), ("NYC", &metadata)];

        let start = layer.footer_start(2532, &blocks);

        let mut cursor = start;
        for (text, font) in blocks {
            let height = font.measure(text).height as i64;
            assert!(cursor.0 + height + 10 <= 2532);
            cursor = TextCursor(cursor.0 + height + 40);
        }
        assert_eq!(cursor.0 - 40 + 10 + 40, 2532);
    }
}
