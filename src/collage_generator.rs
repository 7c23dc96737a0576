use image::RgbaImage;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::sync::Arc;

use crate::collage_types::{
    CanvasConfig, CollageError, CollageImage, CollageRequest, CollageResult, PlacedRegion,
    MAX_CANVAS_PIXELS, MAX_ROTATION_DEGREES,
};
use crate::compositor::composite;
use crate::font_resolver::FontResolver;
use crate::grid_planner;
use crate::image_preparer::prepare;
use crate::placement::place;
use crate::rotator::{rotate, RotatedImage};
use crate::text_layer::{format_metadata, TextCursor, TextLayer};

/// Extra footprint, relative to a cell, on top of the configured coverage.
const COVERAGE_SPREAD: f32 = 0.5;

/// Prepared images kept in memory per worker before they are composited.
const IMAGES_IN_FLIGHT_PER_WORKER: usize = 2;

/// Result of one generation call, with per-image diagnostics.
#[derive(Debug)]
pub struct CollageOutcome {
    pub canvas: RgbaImage,
    /// Regions in compositing order; later entries are drawn on top.
    pub placed: Vec<PlacedRegion>,
    pub failed: usize,
}

/// Everything decided up front for one grid cell.
#[derive(Debug, Clone, Copy)]
struct PlacementJob {
    slot: usize,
    image_index: usize,
    cell: (usize, usize),
    target_size: (u32, u32),
    angle: i32,
}

/// Composes a collection's photos and text into a single collage bitmap.
///
/// The generator keeps no state between calls; fonts come from the injected
/// `FontResolver` and all randomness from a per-call RNG.
#[derive(Debug, Clone)]
pub struct CollageGenerator {
    fonts: FontResolver,
    seed: Option<u64>,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl CollageGenerator {
    pub fn new(fonts: FontResolver) -> Self {
        Self {
            fonts,
            seed: None,
            pool: None,
        }
    }

    /// Makes every layout decision reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Runs image preparation on a dedicated pool of `workers` threads instead
    /// of rayon's global pool.
    pub fn with_workers(mut self, workers: usize) -> Self {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("collage-worker-{}", i))
            .build()
        {
            Ok(pool) => self.pool = Some(Arc::new(pool)),
            Err(e) => warn!(
                "Failed to build collage worker pool ({} threads), using global pool: {}",
                workers, e
            ),
        }
        self
    }

    /// Generates the collage bitmap for `request`.
    pub fn create_collage(
        &self,
        request: &CollageRequest,
        config: &CanvasConfig,
    ) -> CollageResult<RgbaImage> {
        self.create_collage_with_report(request, config)
            .map(|outcome| outcome.canvas)
    }

    /// Like `create_collage`, also reporting where each image landed.
    ///
    /// Only configuration and canvas allocation errors are returned; a photo
    /// that cannot be decoded, resized or rotated is logged and skipped.
    pub fn create_collage_with_report(
        &self,
        request: &CollageRequest,
        config: &CanvasConfig,
    ) -> CollageResult<CollageOutcome> {
        config.validate()?;
        info!("Creating collage for collection: {}", request.title);

        let mut canvas = allocate_canvas(config)?;

        info!("Loading fonts");
        let title_font = self
            .fonts
            .load_font(&config.title_font.name, config.title_font.size);
        let caption_font = self
            .fonts
            .load_font(&config.caption_font.name, config.caption_font.size);
        let metadata_font = self
            .fonts
            .load_font(&config.metadata_font.name, config.metadata_font.size);

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };

        let (placed, failed) =
            self.render_scattered_images(&mut canvas, &request.images, config, &mut rng);

        let text = TextLayer::from_config(config);

        info!("Drawing title");
        text.center_text(
            &mut canvas,
            &request.title,
            &title_font,
            TextCursor(config.margin as i64),
        );

        let caption = request.caption.as_deref().filter(|c| !c.is_empty());
        let metadata = format_metadata(request.location.as_deref(), request.date);

        let mut footer = Vec::with_capacity(2);
        if let Some(caption) = caption {
            footer.push((caption, &caption_font));
        }
        if !metadata.is_empty() {
            footer.push((metadata.as_str(), &metadata_font));
        }

        let mut cursor = text.footer_start(config.height, &footer);
        for (line, font) in footer {
            info!("Drawing footer line: {}", line);
            cursor = text.center_text(&mut canvas, line, font, cursor);
        }

        info!(
            "Collage created successfully ({} images placed, {} failed)",
            placed.len(),
            failed
        );

        Ok(CollageOutcome {
            canvas,
            placed,
            failed,
        })
    }

    /// Scatters the photos across a shuffled grid. Returns the placed regions
    /// and the number of cells whose photo could not be processed.
    fn render_scattered_images<R: Rng + ?Sized>(
        &self,
        canvas: &mut RgbaImage,
        images: &[CollageImage],
        config: &CanvasConfig,
        rng: &mut R,
    ) -> (Vec<PlacedRegion>, usize) {
        let used = config.max_images_used.min(images.len());
        if used == 0 {
            info!("No images supplied, collage will only contain text");
            return (Vec::new(), 0);
        }
        if images.len() > used {
            info!(
                "Using {} of {} images (max_images_used = {})",
                used,
                images.len(),
                config.max_images_used
            );
        }

        let grid = grid_planner::plan(used, config.size(), config.margin, rng);
        info!("Adding {} images to {} grid cells", used, grid.cells.len());

        // All random draws happen here, serially, so a seed fixes the layout
        // no matter how the work is scheduled.
        let jobs: Vec<PlacementJob> = grid
            .cells
            .iter()
            .enumerate()
            .map(|(slot, &cell)| {
                let coverage = rng.random_range(
                    config.image_coverage..=config.image_coverage + COVERAGE_SPREAD,
                );
                PlacementJob {
                    slot,
                    // Repeat images until every cell is filled
                    image_index: slot % used,
                    cell,
                    target_size: (
                        (grid.cell_width as f32 * coverage) as u32,
                        (grid.cell_height as f32 * coverage) as u32,
                    ),
                    angle: rng.random_range(-MAX_ROTATION_DEGREES..=MAX_ROTATION_DEGREES),
                }
            })
            .collect();

        let workers = self
            .pool
            .as_ref()
            .map_or_else(rayon::current_num_threads, |pool| pool.current_num_threads());
        let batch_size = (workers * IMAGES_IN_FLIGHT_PER_WORKER).max(1);

        let mut placed = Vec::with_capacity(jobs.len());
        let mut failed = 0;

        for batch in jobs.chunks(batch_size) {
            let rotated = self.prepare_batch(batch, &images[..used], config.image_corner_radius);

            // Compositing stays serial and in shuffled-cell order
            for (job, result) in batch.iter().zip(rotated) {
                match result {
                    Ok(rotated) => {
                        let offset = place(
                            job.cell,
                            &rotated,
                            grid.cell_width,
                            grid.cell_height,
                            config.margin,
                            job.angle,
                        );
                        let region = composite(canvas, offset, &rotated);
                        debug!(
                            "Placed image {} in cell ({}, {}) at ({}, {})..({}, {}), {}°",
                            job.image_index,
                            job.cell.0,
                            job.cell.1,
                            region.x,
                            region.y,
                            region.right(),
                            region.bottom(),
                            job.angle
                        );
                        placed.push(region);
                    }
                    Err(e) => {
                        error!(
                            "Error processing image {} for cell {}: {}",
                            job.image_index, job.slot, e
                        );
                        failed += 1;
                    }
                }
            }
        }

        (placed, failed)
    }

    /// Prepares and rotates a batch in parallel; results keep the batch order.
    fn prepare_batch(
        &self,
        batch: &[PlacementJob],
        images: &[CollageImage],
        corner_radius: u32,
    ) -> Vec<CollageResult<RotatedImage>> {
        let work = || -> Vec<CollageResult<RotatedImage>> {
            batch
                .par_iter()
                .map(|job| {
                    let prepared =
                        prepare(&images[job.image_index], job.target_size, corner_radius)?;
                    rotate(&prepared, job.angle)
                })
                .collect()
        };

        match &self.pool {
            Some(pool) => pool.install(work),
            None => work(),
        }
    }
}

/// Allocates a canvas filled with the configured background color.
fn allocate_canvas(config: &CanvasConfig) -> CollageResult<RgbaImage> {
    let (width, height) = config.size();
    let pixels = width as u64 * height as u64;
    if pixels > MAX_CANVAS_PIXELS {
        return Err(CollageError::CanvasAllocation(format!(
            "{}x{} canvas exceeds the {} pixel limit",
            width, height, MAX_CANVAS_PIXELS
        )));
    }

    let len = usize::try_from(pixels * 4).map_err(|_| {
        CollageError::CanvasAllocation(format!(
            "{}x{} canvas does not fit in memory",
            width, height
        ))
    })?;

    let mut buffer: Vec<u8> = Vec::new();
    buffer.try_reserve_exact(len).map_err(|e| {
        CollageError::CanvasAllocation(format!("{}x{} canvas: {}", width, height, e))
    })?;
    buffer.resize(len, 0);

    let background = config.background_pixel().0;
    for pixel in buffer.chunks_exact_mut(4) {
        pixel.copy_from_slice(&background);
    }

    RgbaImage::from_raw(width, height, buffer).ok_or_else(|| {
        CollageError::CanvasAllocation(format!("{}x{} canvas buffer size mismatch", width, height))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage, Rgba};

    fn small_config() -> CanvasConfig {
        CanvasConfig {
            width: 300,
            height: 400,
            margin: 20,
            image_corner_radius: 8,
            ..CanvasConfig::default()
        }
    }

    fn photo(color: [u8; 3]) -> CollageImage {
        CollageImage::Bitmap(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            160,
            120,
            Rgb(color),
        )))
    }

    fn generator() -> CollageGenerator {
        CollageGenerator::new(FontResolver::builtin_only()).with_seed(11)
    }

    #[test]
    fn test_allocate_canvas_fills_background() {
        let config = CanvasConfig {
            width: 8,
            height: 4,
            background: [1, 2, 3],
            margin: 1,
            ..CanvasConfig::default()
        };
        let canvas = allocate_canvas(&config).unwrap();
        assert_eq!(canvas.dimensions(), (8, 4));
        assert!(canvas.pixels().all(|p| *p == Rgba([1, 2, 3, 255])));
    }

    #[test]
    fn test_allocate_canvas_refuses_huge_canvas() {
        let config = CanvasConfig {
            width: 100_000,
            height: 100_000,
            ..CanvasConfig::default()
        };
        assert!(matches!(
            allocate_canvas(&config),
            Err(CollageError::CanvasAllocation(_))
        ));
    }

    #[test]
    fn test_invalid_configuration_fails_fast() {
        let config = CanvasConfig {
            margin: 200,
            ..small_config()
        };
        let request = CollageRequest::new("Trip").with_images(vec![photo([1, 2, 3])]);

        let err = generator().create_collage(&request, &config).unwrap_err();

        assert!(matches!(err, CollageError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_oversized_coverage_is_rejected_before_allocation() {
        let config = CanvasConfig {
            image_coverage: 1.0e6,
            ..small_config()
        };
        let request = CollageRequest::new("Huge").with_images(vec![photo([1, 2, 3])]);

        let err = generator().create_collage(&request, &config).unwrap_err();

        assert!(matches!(err, CollageError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_every_cell_is_filled_by_wrapping_images() {
        // GIVEN: Three photos, so a 2x2 grid with one cell more than photos
        let request = CollageRequest::new("Wrap").with_images(vec![
            photo([200, 0, 0]),
            photo([0, 200, 0]),
            photo([0, 0, 200]),
        ]);

        // WHEN: Generating
        let outcome = generator()
            .create_collage_with_report(&request, &small_config())
            .unwrap();

        // THEN: All four cells received an image
        assert_eq!(outcome.placed.len(), 4);
        assert_eq!(outcome.failed, 0);
    }

    #[test]
    fn test_max_images_used_limits_the_grid() {
        let config = CanvasConfig {
            max_images_used: 4,
            ..small_config()
        };
        let images: Vec<CollageImage> = (0..10).map(|i| photo([i * 20, 0, 0])).collect();
        let request = CollageRequest::new("Limit").with_images(images);

        let outcome = generator()
            .create_collage_with_report(&request, &config)
            .unwrap();

        assert_eq!(outcome.placed.len(), 4);
    }

    #[test]
    fn test_broken_image_is_skipped() {
        let request = CollageRequest::new("Broken").with_images(vec![
            photo([200, 0, 0]),
            CollageImage::Encoded(b"garbage".to_vec()),
            photo([0, 0, 200]),
            photo([0, 200, 0]),
        ]);

        let outcome = generator()
            .create_collage_with_report(&request, &small_config())
            .unwrap();

        assert_eq!(outcome.placed.len(), 3);
        assert_eq!(outcome.failed, 1);
    }

    #[test]
    fn test_seed_makes_output_reproducible() {
        let request = CollageRequest::new("Seeded")
            .with_caption("Same every time")
            .with_images(vec![photo([10, 20, 30]), photo([200, 100, 0])]);

        let a = generator()
            .create_collage_with_report(&request, &small_config())
            .unwrap();
        let b = generator()
            .create_collage_with_report(&request, &small_config())
            .unwrap();

        assert_eq!(a.placed, b.placed);
        assert_eq!(a.canvas, b.canvas);
    }

    #[test]
    fn test_dedicated_worker_pool_matches_global_pool() {
        let request = CollageRequest::new("Pool")
            .with_images(vec![photo([10, 20, 30]), photo([200, 100, 0]), photo([0, 0, 0])]);

        let global = generator()
            .create_collage_with_report(&request, &small_config())
            .unwrap();
        let pooled = generator()
            .with_workers(2)
            .create_collage_with_report(&request, &small_config())
            .unwrap();

        assert_eq!(global.placed, pooled.placed);
        assert_eq!(global.canvas, pooled.canvas);
    }

    #[test]
    fn test_title_only_collage() {
        let canvas = generator()
            .create_collage(&CollageRequest::new("Just a title"), &small_config())
            .unwrap();

        assert_eq!(canvas.dimensions(), (300, 400));
        assert!(canvas.pixels().any(|p| *p != Rgba([255, 255, 255, 255])));
    }
}
