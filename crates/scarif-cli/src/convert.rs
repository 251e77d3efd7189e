use crate::config::ConvertConfig;
use futures::future::join_all;
use scarif_common::{Coord2, RegionId, Result, ScarifError};
use scarif_format::{EncodeStats, ScarifWriter};
use scarif_logger::log;
use scarif_logger::LogSeverity::{Debug, Error, Info, Warning};
use scarif_world::{Chunk, Registry, World};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};

/// Runs one conversion: load the selected regions, then encode and write the container.
pub async fn run(config: ConvertConfig) -> Result<EncodeStats> {
    let world_path = config.world.clone();
    let world = tokio::task::spawn_blocking(move || World::open(world_path))
        .await
        .map_err(join_error)??;
    log(
        format!(
            "Opened {} (data version {})",
            world.path().display(),
            world.data_version
        ),
        Info,
    );

    if let Some(path) = &config.registry {
        let registry = Registry::load(path)?;
        let blocks = registry.block_map().map(|map| map.len()).unwrap_or(0);
        log(
            format!(
                "Registry version {}: {} tables, {} block ids",
                registry.version,
                registry.names().count(),
                blocks
            ),
            Info,
        );
    }

    let ids = match &config.regions {
        Some(coords) => coords
            .iter()
            .map(|coord| RegionId::new(*coord, config.dimension.clone()))
            .collect(),
        None => world.region_ids(config.dimension.as_deref())?,
    };
    log(format!("Loading {} region files", ids.len()), Info);

    let chunks = load_chunks(Arc::new(world), ids, config.workers).await;
    log(format!("Loaded {} chunks", chunks.len()), Info);

    let output = config.output.clone();
    let options = config.encoder;
    let stats = tokio::task::spawn_blocking(move || {
        let mut writer = ScarifWriter::new(options);
        writer.add_chunks(chunks.values())?;
        writer.write(&output)
    })
    .await
    .map_err(join_error)??;

    log(
        format!(
            "Wrote {} chunks ({} unique) in {} regions, {} blocks, {} bytes",
            stats.chunks, stats.unique_blobs, stats.regions, stats.blocks, stats.bytes
        ),
        Info,
    );
    Ok(stats)
}

/// Loads region files on the blocking pool, at most `workers` at a time. A region that
/// fails to load is logged and contributes no chunks.
pub async fn load_chunks(world: Arc<World>, ids: Vec<RegionId>, workers: usize) -> BTreeMap<Coord2, Chunk> {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let merged = Arc::new(Mutex::new(BTreeMap::new()));

    let tasks = ids.into_iter().map(|id| {
        let semaphore = semaphore.clone();
        let merged = merged.clone();
        let world = world.clone();
        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            let coord = id.coord;
            let loaded = tokio::task::spawn_blocking(move || world.load_region(&id)).await;
            match loaded {
                Ok(Ok(Some(region))) => {
                    log(
                        format!("Region {}: {} chunks", coord, region.chunks.len()),
                        Debug,
                    );
                    merged.lock().await.extend(region.chunks);
                }
                Ok(Ok(None)) => log(format!("Region {} does not exist", coord), Warning),
                Ok(Err(err)) => log(format!("Region {} failed to load: {}", coord, err), Error),
                Err(err) => log(format!("Region {} worker failed: {}", coord, err), Error),
            }
        })
    });

    for joined in join_all(tasks).await {
        if let Err(err) = joined {
            log(format!("Region task failed: {}", err), Error);
        }
    }

    let mut guard = merged.lock().await;
    std::mem::take(&mut *guard)
}

fn join_error(err: tokio::task::JoinError) -> ScarifError {
    ScarifError::IoError(std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))
}
