use anyhow::{bail, Context};
use chrono::NaiveDate;
use image::{DynamicImage, ImageFormat};
use log::info;
use serde::Deserialize;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use warp::{reject, Filter, Rejection, Reply};

use crate::collage_generator::CollageGenerator;
use crate::collage_types::{CanvasConfig, CollageImage, CollageRequest};
use crate::warp_helpers::{with_canvas_config, with_generator, CollageFailure, ValidationError};

const DEFAULT_TITLE: &str = "Test Collection";
const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Deserialize)]
pub struct CollageQuery {
    pub folder_path: String,
    pub title: Option<String>,
    pub caption: Option<String>,
    pub location: Option<String>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
}

impl CollageQuery {
    fn parse_date(&self) -> Result<Option<NaiveDate>, ValidationError> {
        match self.date.as_deref().filter(|d| !d.is_empty()) {
            Some(raw) => NaiveDate::parse_from_str(raw, QUERY_DATE_FORMAT)
                .map(Some)
                .map_err(|e| ValidationError {
                    message: format!("Invalid date '{}': {}", raw, e),
                }),
            None => Ok(None),
        }
    }
}

/// Reads every file in `folder` as an encoded image, in file name order.
/// Files that turn out not to be images are left for the engine to skip.
pub fn load_folder_images(folder: &Path) -> anyhow::Result<Vec<CollageImage>> {
    if !folder.is_dir() {
        bail!("Folder not found or is not a directory: {}", folder.display());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(folder)
        .with_context(|| format!("Failed to read folder {}", folder.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    if files.is_empty() {
        bail!("No image files found in {}", folder.display());
    }

    files
        .iter()
        .map(|path| {
            std::fs::read(path)
                .map(CollageImage::Encoded)
                .with_context(|| format!("Failed to read {}", path.display()))
        })
        .collect()
}

pub fn encode_png(canvas: image::RgbaImage) -> image::ImageResult<Vec<u8>> {
    let mut png = Vec::new();
    DynamicImage::ImageRgba8(canvas).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

pub async fn create_collage(
    query: CollageQuery,
    generator: Arc<CollageGenerator>,
    config: Arc<CanvasConfig>,
) -> Result<impl Reply, Rejection> {
    info!("Collage requested for folder: {}", query.folder_path);

    let date = query.parse_date().map_err(reject::custom)?;

    let folder = PathBuf::from(&query.folder_path);
    let images = match tokio::task::spawn_blocking(move || load_folder_images(&folder)).await {
        Ok(Ok(images)) => images,
        Ok(Err(e)) => {
            log::error!("Failed to load collage images: {:#}", e);
            return Err(reject::custom(ValidationError {
                message: format!("{:#}", e),
            }));
        }
        Err(e) => {
            log::error!("Image loading task failed: {}", e);
            return Err(reject::custom(CollageFailure {
                message: format!("Image loading task failed: {}", e),
            }));
        }
    };
    info!("Loaded {} files", images.len());

    let mut request = CollageRequest::new(query.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()))
        .with_images(images);
    request.caption = query.caption;
    request.location = query.location;
    request.date = date;

    let result = tokio::task::spawn_blocking(move || {
        let canvas = generator.create_collage(&request, &config)?;
        Ok::<_, crate::collage_types::CollageError>(encode_png(canvas)?)
    })
    .await;

    let png = match result {
        Ok(Ok(png)) => png,
        Ok(Err(e)) if e.is_caller_error() => {
            log::error!("Rejected collage request: {}", e);
            return Err(reject::custom(ValidationError {
                message: e.to_string(),
            }));
        }
        Ok(Err(e)) => {
            log::error!("Failed to create collage: {}", e);
            return Err(reject::custom(CollageFailure {
                message: format!("Failed to create collage: {}", e),
            }));
        }
        Err(e) => {
            log::error!("Collage task failed: {}", e);
            return Err(reject::custom(CollageFailure {
                message: format!("Collage task failed: {}", e),
            }));
        }
    };

    let reply = warp::reply::with_header(png, "content-type", "image/png");
    let reply = warp::reply::with_header(reply, "cache-control", "no-store");

    Ok(reply)
}

pub fn build_collage_routes(
    generator: Arc<CollageGenerator>,
    config: Arc<CanvasConfig>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("api")
        .and(warp::path("collage"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<CollageQuery>())
        .and(with_generator(generator))
        .and(with_canvas_config(config))
        .and_then(create_collage)
}
