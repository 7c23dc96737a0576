pub mod builtin_font;
pub mod collage_generator;
pub mod collage_types;
pub mod compositor;
pub mod config;
pub mod font_resolver;
pub mod grid_planner;
pub mod handlers_collage;
pub mod handlers_health;
pub mod image_preparer;
pub mod placement;
pub mod raster;
pub mod rotator;
pub mod text_layer;
pub mod warp_helpers;

pub use collage_generator::{CollageGenerator, CollageOutcome};
pub use collage_types::{
    CanvasConfig, CollageError, CollageImage, CollageRequest, CollageResult, FontSpec,
    PlacedRegion,
};
pub use font_resolver::{Font, FontResolver};
