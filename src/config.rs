use std::env;
use std::path::PathBuf;

use crate::collage_types::CanvasConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub assets_path: PathBuf,
    pub workers: usize,
    pub canvas: CanvasConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let defaults = CanvasConfig::default();

        Ok(Config {
            port: env::var("COLLAGE_PORT")
                .unwrap_or_else(|_| "18474".to_string())
                .parse()?,
            host: env::var("COLLAGE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            assets_path: env::var("COLLAGE_ASSETS_PATH")
                .unwrap_or_else(|_| "./assets".to_string())
                .into(),
            workers: env::var("COLLAGE_WORKERS")
                .unwrap_or_else(|_| num_cpus::get().to_string())
                .parse()?,
            canvas: CanvasConfig {
                width: env::var("COLLAGE_CANVAS_WIDTH")
                    .unwrap_or_else(|_| defaults.width.to_string())
                    .parse()?,
                height: env::var("COLLAGE_CANVAS_HEIGHT")
                    .unwrap_or_else(|_| defaults.height.to_string())
                    .parse()?,
                margin: env::var("COLLAGE_MARGIN")
                    .unwrap_or_else(|_| defaults.margin.to_string())
                    .parse()?,
                max_images_used: env::var("COLLAGE_MAX_IMAGES")
                    .unwrap_or_else(|_| defaults.max_images_used.to_string())
                    .parse()?,
                image_corner_radius: env::var("COLLAGE_CORNER_RADIUS")
                    .unwrap_or_else(|_| defaults.image_corner_radius.to_string())
                    .parse()?,
                ..defaults
            },
        })
    }

    pub fn fonts_path(&self) -> PathBuf {
        self.assets_path.join("fonts")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fonts_live_under_assets() {
        let config = Config {
            port: 1,
            host: "127.0.0.1".to_string(),
            assets_path: PathBuf::from("/srv/collage"),
            workers: 2,
            canvas: CanvasConfig::default(),
        };

        assert_eq!(config.fonts_path(), PathBuf::from("/srv/collage/fonts"));
    }
}
