use log::{error, info};
use std::net::{IpAddr, SocketAddr, TcpListener};
use std::sync::Arc;
use warp::Filter;

use collage_engine::config::Config;
use collage_engine::handlers_collage::build_collage_routes;
use collage_engine::handlers_health::build_health_routes;
use collage_engine::warp_helpers::{cors, handle_rejection};
use collage_engine::{CollageGenerator, FontResolver};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::from_env()?;
    config.canvas.validate()?;

    let host: IpAddr = config.host.parse()?;
    let addr = SocketAddr::new(host, config.port);

    info!("Starting collage engine on {}", addr);
    info!("Fonts: {}", config.fonts_path().display());
    info!("Workers: {}", config.workers);
    info!(
        "Canvas: {}x{} (margin {}, up to {} images)",
        config.canvas.width,
        config.canvas.height,
        config.canvas.margin,
        config.canvas.max_images_used
    );

    if !is_port_available(addr) {
        error!(
            "Port {} is already in use. Stop the other instance or set COLLAGE_PORT.",
            config.port
        );
        return Err(format!("Port {} is already in use", config.port).into());
    }

    let generator = Arc::new(
        CollageGenerator::new(FontResolver::new(config.fonts_path())).with_workers(config.workers),
    );
    let canvas = Arc::new(config.canvas.clone());

    let routes = build_health_routes()
        .or(build_collage_routes(generator, canvas))
        .with(cors())
        .with(warp::log("collage_engine"))
        .recover(handle_rejection);

    info!("Server started successfully, listening on http://{}", addr);

    warp::serve(routes).run(addr).await;

    Ok(())
}

fn is_port_available(addr: SocketAddr) -> bool {
    TcpListener::bind(addr).is_ok()
}
