use chrono::NaiveDate;
use image::{DynamicImage, Rgba};
use serde::{Deserialize, Serialize};

/// Largest rotation applied to a single collage image, in degrees.
pub const MAX_ROTATION_DEGREES: i32 = 15;

/// Upper bound on grid cells per axis.
pub const MAX_GRID_CELLS: usize = 6;

/// Lower bound on grid cells per axis.
pub const MIN_GRID_CELLS: usize = 2;

/// A canvas larger than this many pixels is refused before allocation.
pub const MAX_CANVAS_PIXELS: u64 = 100_000_000;

/// Largest accepted `image_coverage`; footprints then stay within 2.5 cells.
pub const MAX_IMAGE_COVERAGE: f32 = 2.0;

/// One photo handed to the engine.
///
/// Encoded images are decoded lazily by the preparer, so a corrupt file only
/// costs its own slot in the collage.
#[derive(Debug, Clone)]
pub enum CollageImage {
    Bitmap(DynamicImage),
    Encoded(Vec<u8>),
}

impl From<DynamicImage> for CollageImage {
    fn from(image: DynamicImage) -> Self {
        CollageImage::Bitmap(image)
    }
}

impl From<Vec<u8>> for CollageImage {
    fn from(bytes: Vec<u8>) -> Self {
        CollageImage::Encoded(bytes)
    }
}

/// Everything describing the collection a collage is generated for.
#[derive(Debug, Clone)]
pub struct CollageRequest {
    pub title: String,
    pub caption: Option<String>,
    pub location: Option<String>,
    pub date: Option<NaiveDate>,
    pub images: Vec<CollageImage>,
}

impl CollageRequest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            caption: None,
            location: None,
            date: None,
            images: Vec::new(),
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_images<I, T>(mut self, images: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<CollageImage>,
    {
        self.images = images.into_iter().map(Into::into).collect();
        self
    }
}

/// Font file name plus point size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontSpec {
    pub name: String,
    pub size: u32,
}

impl FontSpec {
    pub fn new(name: &str, size: u32) -> Self {
        Self {
            name: name.to_string(),
            size,
        }
    }
}

/// Layout and styling parameters for one collage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    pub background: [u8; 3],
    pub margin: u32,
    pub max_images_used: usize,
    pub image_corner_radius: u32,
    /// Lower bound of the random image footprint, relative to a grid cell.
    /// The upper bound is half a cell larger.
    pub image_coverage: f32,
    pub text_color: [u8; 3],
    pub text_background_color: [u8; 4],
    pub text_background_radius: u32,
    pub text_padding: u32,
    pub title_font: FontSpec,
    pub caption_font: FontSpec,
    pub metadata_font: FontSpec,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1170,
            height: 2532,
            background: [255, 255, 255],
            margin: 40,
            max_images_used: 15,
            image_corner_radius: 20,
            image_coverage: 1.0,
            text_color: [80, 80, 80],
            text_background_color: [0, 255, 255, 180],
            text_background_radius: 8,
            text_padding: 10,
            title_font: FontSpec::new("Pacifico-Regular.ttf", 60),
            caption_font: FontSpec::new("Quicksand-Regular.ttf", 36),
            metadata_font: FontSpec::new("Quicksand-Regular.ttf", 24),
        }
    }
}

impl CanvasConfig {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn background_pixel(&self) -> Rgba<u8> {
        let [r, g, b] = self.background;
        Rgba([r, g, b, 255])
    }

    pub fn text_pixel(&self) -> Rgba<u8> {
        let [r, g, b] = self.text_color;
        Rgba([r, g, b, 255])
    }

    pub fn text_background_pixel(&self) -> Rgba<u8> {
        Rgba(self.text_background_color)
    }

    /// Rejects configurations the engine cannot lay out.
    pub fn validate(&self) -> CollageResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CollageError::InvalidConfiguration(format!(
                "canvas size must be positive, got {}x{}",
                self.width, self.height
            )));
        }

        let shorter_side = self.width.min(self.height);
        if u64::from(self.margin) * 2 >= u64::from(shorter_side) {
            return Err(CollageError::InvalidConfiguration(format!(
                "margin {} must be smaller than half the shorter canvas side ({})",
                self.margin, shorter_side
            )));
        }

        if self.max_images_used == 0 {
            return Err(CollageError::InvalidConfiguration(
                "max_images_used must be at least 1".to_string(),
            ));
        }

        if !self.image_coverage.is_finite()
            || self.image_coverage <= 0.0
            || self.image_coverage > MAX_IMAGE_COVERAGE
        {
            return Err(CollageError::InvalidConfiguration(format!(
                "image_coverage must be in (0, {}], got {}",
                MAX_IMAGE_COVERAGE, self.image_coverage
            )));
        }

        for font in [&self.title_font, &self.caption_font, &self.metadata_font] {
            if font.size == 0 {
                return Err(CollageError::InvalidConfiguration(format!(
                    "font size for {} must be positive",
                    font.name
                )));
            }
        }

        Ok(())
    }
}

/// Grid cell layout for one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    pub cols: usize,
    pub rows: usize,
    pub cell_width: u32,
    pub cell_height: u32,
    /// (row, col) pairs in the order images are placed.
    pub cells: Vec<(usize, usize)>,
}

/// Where an image actually ended up on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedRegion {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl PlacedRegion {
    pub fn right(&self) -> i64 {
        self.x + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y + self.height as i64
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CollageError {
    #[error("Font load error: {0}")]
    FontLoad(String),
    #[error("Image preparation error: {0}")]
    ImagePreparation(String),
    #[error("Rotation error: {0}")]
    Rotation(String),
    #[error("Canvas allocation error: {0}")]
    CanvasAllocation(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl CollageError {
    /// True when the caller supplied bad input rather than the engine failing.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, CollageError::InvalidConfiguration(_))
    }
}

pub type CollageResult<T> = Result<T, CollageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_phone_portrait() {
        let config = CanvasConfig::default();
        assert_eq!(config.size(), (1170, 2532));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_size() {
        let config = CanvasConfig {
            width: 0,
            ..CanvasConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, CollageError::InvalidConfiguration(_)));
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_validate_rejects_margin_of_half_canvas() {
        let config = CanvasConfig {
            width: 200,
            height: 400,
            margin: 100,
            ..CanvasConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CollageError::InvalidConfiguration(_))
        ));

        let config = CanvasConfig {
            margin: 99,
            ..config
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_accepts_zero_margin_on_tiny_canvas() {
        let config = CanvasConfig {
            width: 1,
            height: 1,
            margin: 0,
            ..CanvasConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bounds_image_coverage() {
        // GIVEN: Coverage values around the accepted range
        let with_coverage = |image_coverage| CanvasConfig {
            width: 300,
            height: 400,
            margin: 20,
            image_coverage,
            ..CanvasConfig::default()
        };

        // THEN: Only (0, 2] passes
        assert!(with_coverage(0.5).validate().is_ok());
        assert!(with_coverage(MAX_IMAGE_COVERAGE).validate().is_ok());
        for bad in [0.0, -1.0, 2.01, 1.0e6, f32::NAN, f32::INFINITY] {
            assert!(
                matches!(
                    with_coverage(bad).validate(),
                    Err(CollageError::InvalidConfiguration(_))
                ),
                "coverage {} accepted",
                bad
            );
        }
    }

    #[test]
    fn test_partial_json_config_uses_defaults() {
        let config: CanvasConfig =
            serde_json::from_str(r#"{"width": 800, "height": 600, "margin": 20}"#).unwrap();
        assert_eq!(config.size(), (800, 600));
        assert_eq!(config.margin, 20);
        assert_eq!(config.max_images_used, 15);
        assert_eq!(config.title_font, FontSpec::new("Pacifico-Regular.ttf", 60));
    }

    #[test]
    fn test_request_builder() {
        let date = NaiveDate::from_ymd_opt(2023, 6, 15).unwrap();
        let request = CollageRequest::new("Trip")
            .with_caption("Fun times")
            .with_location("NYC")
            .with_date(date)
            .with_images(vec![vec![1u8, 2, 3]]);

        assert_eq!(request.title, "Trip");
        assert_eq!(request.caption.as_deref(), Some("Fun times"));
        assert_eq!(request.location.as_deref(), Some("NYC"));
        assert_eq!(request.date, Some(date));
        assert!(matches!(request.images[0], CollageImage::Encoded(_)));
    }
}
