//! Pixel Arena Server
//!
//! Binary entrypoint: load the saved world, run the server until ctrl-c,
//! save the world on the way out.

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pixel_arena::{persist, GameServer, ServerConfig, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    info!("Pixel Arena Server v{}", VERSION);
    info!("Port: {}", config.port);
    info!("Tick Rate: {} Hz", config.tick_rate);
    info!("World Size: {}", config.world_size);
    info!("Save File: {}", config.save_path.display());

    let server = Arc::new(GameServer::new(config.clone()));

    // Restore before the listener comes up, so no connection ever sees a
    // half-loaded world.
    match persist::load(&config.save_path).await {
        Ok(players) if players.is_empty() => {
            info!("no saved world at {}, starting fresh", config.save_path.display());
        }
        Ok(players) => {
            info!("restoring {} players", players.len());
            server.registry().restore(players).await;
        }
        Err(e) => {
            error!(
                "could not load {}: {}; starting with an empty world",
                config.save_path.display(),
                e
            );
        }
    }

    let mut runner = {
        let server = server.clone();
        tokio::spawn(async move { server.run().await })
    };

    tokio::select! {
        result = &mut runner => {
            result.context("server task panicked")??;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            server.shutdown();
            match (&mut runner).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("server exited with error: {}", e),
                Err(e) => error!("server task failed: {}", e),
            }
        }
    }

    let players = server.registry().dump().await;
    match persist::save(&config.save_path, &players).await {
        Ok(()) => info!(
            "saved {} players to {}",
            players.len(),
            config.save_path.display()
        ),
        Err(e) => error!("final save failed: {}", e),
    }

    Ok(())
}
