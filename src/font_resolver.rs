use image::{Pixel, Rgba, RgbaImage};
use log::{debug, warn};
use rusttype::{point, Rect, Scale};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::builtin_font::{self, GLYPH_HEIGHT, GLYPH_SPACING, GLYPH_WIDTH};
use crate::collage_types::{CollageError, CollageResult};

/// Point size covered by one pixel of the built-in bitmap font.
const BUILTIN_POINTS_PER_PIXEL: u32 = 8;

/// Rendered extent of a string, relative to the drawing origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextBounds {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

/// A font ready for measuring and drawing at a fixed size.
#[derive(Clone)]
pub enum Font {
    TrueType {
        font: Arc<rusttype::Font<'static>>,
        size: u32,
    },
    Builtin {
        size: u32,
    },
}

impl fmt::Debug for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Font::TrueType { size, .. } => write!(f, "Font::TrueType({}pt)", size),
            Font::Builtin { size } => write!(f, "Font::Builtin({}pt)", size),
        }
    }
}

impl Font {
    pub fn builtin(size: u32) -> Self {
        Font::Builtin { size }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Font::Builtin { .. })
    }

    pub fn size(&self) -> u32 {
        match self {
            Font::TrueType { size, .. } | Font::Builtin { size } => *size,
        }
    }

    /// Measures the ink bounding box of `text`.
    pub fn measure(&self, text: &str) -> TextBounds {
        match self {
            Font::TrueType { font, size } => measure_truetype(font, *size, text),
            Font::Builtin { size } => {
                let pixel = builtin_pixel_size(*size);
                let width = builtin_font::text_width_units(text) * pixel;
                TextBounds {
                    left: 0,
                    top: 0,
                    width,
                    height: if width == 0 { 0 } else { GLYPH_HEIGHT * pixel },
                }
            }
        }
    }

    /// Draws `text` so the top-left of its ink box lands at (`x`, `y`).
    pub fn draw(&self, canvas: &mut RgbaImage, text: &str, x: i64, y: i64, color: Rgba<u8>) {
        match self {
            Font::TrueType { font, size } => draw_truetype(canvas, font, *size, text, x, y, color),
            Font::Builtin { size } => draw_builtin(canvas, *size, text, x, y, color),
        }
    }
}

/// Loads fonts by file name from a local assets directory.
///
/// Loading never fails: anything that goes wrong is logged and answered with
/// the built-in bitmap font at the requested size.
#[derive(Clone, Default)]
pub struct FontResolver {
    fonts_dir: Option<PathBuf>,
    parsed: Arc<Mutex<HashMap<String, Arc<rusttype::Font<'static>>>>>,
}

impl fmt::Debug for FontResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontResolver")
            .field("fonts_dir", &self.fonts_dir)
            .finish_non_exhaustive()
    }
}

impl FontResolver {
    pub fn new(fonts_dir: impl Into<PathBuf>) -> Self {
        Self {
            fonts_dir: Some(fonts_dir.into()),
            parsed: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// A resolver without a font directory; every lookup yields the built-in font.
    pub fn builtin_only() -> Self {
        Self::default()
    }

    pub fn fonts_dir(&self) -> Option<&Path> {
        self.fonts_dir.as_deref()
    }

    pub fn load_font(&self, name: &str, size: u32) -> Font {
        match self.try_load_font(name, size) {
            Ok(font) => font,
            Err(e) => {
                warn!("{}, falling back to built-in font", e);
                Font::builtin(size)
            }
        }
    }

    fn try_load_font(&self, name: &str, size: u32) -> CollageResult<Font> {
        let fonts_dir = self
            .fonts_dir
            .as_ref()
            .ok_or_else(|| CollageError::FontLoad("No font directory configured".to_string()))?;

        if let Some(font) = self.cached(name) {
            return Ok(Font::TrueType { font, size });
        }

        let font_path = fonts_dir.join(name);
        if !font_path.is_file() {
            return Err(CollageError::FontLoad(format!(
                "Font file not found at {}",
                font_path.display()
            )));
        }

        let bytes = std::fs::read(&font_path).map_err(|e| {
            CollageError::FontLoad(format!("Error reading font {}: {}", font_path.display(), e))
        })?;

        let font = rusttype::Font::try_from_vec(bytes).ok_or_else(|| {
            CollageError::FontLoad(format!(
                "Error parsing font {}: not a valid TrueType/OpenType file",
                font_path.display()
            ))
        })?;

        debug!("Loaded font {} at {}pt", name, size);
        let font = Arc::new(font);
        if let Ok(mut parsed) = self.parsed.lock() {
            parsed.insert(name.to_string(), font.clone());
        }

        Ok(Font::TrueType { font, size })
    }

    fn cached(&self, name: &str) -> Option<Arc<rusttype::Font<'static>>> {
        self.parsed.lock().ok()?.get(name).cloned()
    }
}

fn builtin_pixel_size(size: u32) -> u32 {
    ((size + BUILTIN_POINTS_PER_PIXEL / 2) / BUILTIN_POINTS_PER_PIXEL).max(1)
}

fn measure_truetype(font: &rusttype::Font<'static>, size: u32, text: &str) -> TextBounds {
    let scale = Scale::uniform(size as f32);
    let v_metrics = font.v_metrics(scale);

    let mut ink: Option<Rect<i32>> = None;
    let mut advance_end = 0.0f32;
    for glyph in font.layout(text, scale, point(0.0, v_metrics.ascent)) {
        advance_end = glyph.position().x + glyph.unpositioned().h_metrics().advance_width;
        if let Some(bb) = glyph.pixel_bounding_box() {
            ink = Some(match ink {
                Some(acc) => Rect {
                    min: point(acc.min.x.min(bb.min.x), acc.min.y.min(bb.min.y)),
                    max: point(acc.max.x.max(bb.max.x), acc.max.y.max(bb.max.y)),
                },
                None => bb,
            });
        }
    }

    match ink {
        Some(bb) => TextBounds {
            left: bb.min.x,
            top: bb.min.y,
            width: (bb.max.x - bb.min.x).max(0) as u32,
            height: (bb.max.y - bb.min.y).max(0) as u32,
        },
        // Whitespace only: it still occupies horizontal space
        None => TextBounds {
            left: 0,
            top: 0,
            width: advance_end.ceil().max(0.0) as u32,
            height: 0,
        },
    }
}

fn draw_truetype(
    canvas: &mut RgbaImage,
    font: &rusttype::Font<'static>,
    size: u32,
    text: &str,
    x: i64,
    y: i64,
    color: Rgba<u8>,
) {
    let bounds = measure_truetype(font, size, text);
    let scale = Scale::uniform(size as f32);
    let v_metrics = font.v_metrics(scale);
    let origin = point(
        (x - bounds.left as i64) as f32,
        (y - bounds.top as i64) as f32 + v_metrics.ascent,
    );

    for glyph in font.layout(text, scale, origin) {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };
        glyph.draw(|gx, gy, coverage| {
            let px = bb.min.x as i64 + gx as i64;
            let py = bb.min.y as i64 + gy as i64;
            blend_pixel(canvas, px, py, color, coverage);
        });
    }
}

fn draw_builtin(canvas: &mut RgbaImage, size: u32, text: &str, x: i64, y: i64, color: Rgba<u8>) {
    let pixel = builtin_pixel_size(size) as i64;
    let advance = (GLYPH_WIDTH + GLYPH_SPACING) as i64 * pixel;

    for (index, ch) in text.chars().enumerate() {
        let rows = builtin_font::glyph_rows(ch);
        let glyph_x = x + index as i64 * advance;

        for row in 0..GLYPH_HEIGHT {
            for col in 0..GLYPH_WIDTH {
                if !builtin_font::is_set(&rows, col, row) {
                    continue;
                }
                let block_x = glyph_x + col as i64 * pixel;
                let block_y = y + row as i64 * pixel;
                for dy in 0..pixel {
                    for dx in 0..pixel {
                        blend_pixel(canvas, block_x + dx, block_y + dy, color, 1.0);
                    }
                }
            }
        }
    }
}

fn blend_pixel(canvas: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let alpha = (color[3] as f32 * coverage.clamp(0.0, 1.0)).round() as u8;
    if alpha == 0 {
        return;
    }
    canvas
        .get_pixel_mut(x as u32, y as u32)
        .blend(&Rgba([color[0], color[1], color[2], alpha]));
}
