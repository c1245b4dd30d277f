//! Headless demo that streams Strata terrain around a walking observer.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p strata-demo -- --radius 4 --ticks 300` for a short walk.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use glam::Vec3;
use strata_config::{CliArgs, Config, ConfigError, default_config_dir};
use strata_terrain::{
    DebrisPool, GridRaycaster, HeightmapParams, HeightmapSource, Ray, SurfaceMesher, Terrain,
};
use strata_voxel::BlockType;
use tracing::{debug, info};

/// Debris pool that only tracks body positions.
#[derive(Default)]
struct DebrisLog {
    bodies: Vec<Option<(Vec3, BlockType)>>,
    free: Vec<usize>,
}

impl DebrisLog {
    fn live(&self) -> usize {
        self.bodies.iter().filter(|b| b.is_some()).count()
    }
}

impl DebrisPool for DebrisLog {
    type Handle = usize;

    fn acquire(&mut self, position: Vec3, block_type: BlockType) -> usize {
        debug!(?position, ?block_type, "debris spawned");
        match self.free.pop() {
            Some(slot) => {
                self.bodies[slot] = Some((position, block_type));
                slot
            }
            None => {
                self.bodies.push(Some((position, block_type)));
                self.bodies.len() - 1
            }
        }
    }

    fn apply_impulse(&mut self, handle: &usize, impulse: Vec3) {
        debug!(handle, ?impulse, "debris impulse");
    }

    fn release(&mut self, handle: usize) {
        if let Some(body) = self.bodies.get_mut(handle)
            && body.take().is_some()
        {
            self.free.push(handle);
        }
    }
}

type DemoTerrain = Terrain<HeightmapSource, SurfaceMesher, GridRaycaster, DebrisLog>;

/// Digs, builds and blows up terrain under the observer.
fn demonstrate_edits(terrain: &mut DemoTerrain, observer: Vec3) {
    let down = Ray::new(observer, Vec3::NEG_Y);
    let reach = observer.y + terrain.grid().block_size();

    let Some(surface) = terrain.raycast_surface(&down, reach) else {
        info!(?observer, "no terrain under the observer");
        return;
    };
    let below = terrain.block_at(surface.point);
    info!(
        point = ?surface.point,
        block = ?below.block_type,
        center = ?below.center(),
        "terrain under observer"
    );

    // Ray edits only reach `raycast_max_distance`, so start just above ground.
    let start = surface.point + Vec3::Y * (terrain.edit_config().raycast_max_distance * 0.5);
    let near = Ray::new(start, Vec3::NEG_Y);

    let removed = terrain.remove_block(&near);
    info!(?removed, "removed block");

    if let Some(placed) = terrain.add_block(&near, BlockType::Stone) {
        info!(center = ?placed.center(), "placed stone");
    }

    let detached = terrain.detach_block(&near, true);
    info!(?detached, live = terrain.debris().live(), "detached block");
    if let Some(handle) = detached {
        terrain.release_debris(handle);
    }

    let explosion = terrain.explode(surface, 3.0 * terrain.grid().block_size());
    match explosion.center() {
        Some(center) => info!(
            destroyed = explosion.destroyed(),
            debris = explosion.debris().len(),
            ?center,
            "explosion"
        ),
        None => info!("explosion hit nothing"),
    }
    for handle in explosion.into_debris() {
        terrain.release_debris(handle);
    }
}

fn main() -> Result<(), ConfigError> {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);
    let mut config = Config::load_or_create(&config_dir)?;
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    strata_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    let source = HeightmapSource::new(HeightmapParams::from_config(&config.terrain));
    let mut terrain = Terrain::new(
        &config,
        source,
        SurfaceMesher::new(),
        GridRaycaster::new(),
        DebrisLog::default(),
    )?;

    let first_load = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&first_load);
    terrain.on_first_load_finished(move || flag.store(true, Ordering::SeqCst));

    let block_size = config.terrain.block_size;
    let eye_height = (config.terrain.water_level_in_blocks + 20) as f32 * block_size;
    let mut observer = Vec3::new(0.5 * block_size, eye_height, 0.5 * block_size);
    let step = Vec3::X * args.speed * block_size;
    let mut edited = false;

    info!(
        ticks = args.ticks,
        speed = args.speed,
        radius = config.terrain.visible_chunks_radius,
        "starting walk"
    );

    for tick in 0..args.ticks {
        let report = terrain.tick(observer);
        if report.generated > 0 || report.retired > 0 {
            debug!(
                tick,
                generated = report.generated,
                retired = report.retired,
                progress = terrain.progress(),
                "streaming"
            );
        }
        if report.settled {
            info!(
                tick,
                chunk = ?terrain.grid().chunk_index_at(observer),
                active = terrain.store().active_count(),
                loaded = terrain.store().loaded_count(),
                faces = terrain.geometry().face_count(),
                "streaming pass settled"
            );
        }

        if first_load.load(Ordering::SeqCst) && !edited {
            demonstrate_edits(&mut terrain, observer);
            edited = true;
        }

        // Hold still until the world is playable.
        if terrain.is_first_load_finished() {
            observer += step;
        }
    }

    info!(
        phase = ?terrain.phase(),
        active = terrain.store().active_count(),
        loaded = terrain.store().loaded_count(),
        rebuilds = terrain.geometry().rebuild_count(),
        live_debris = terrain.debris().live(),
        "walk finished"
    );
    Ok(())
}
