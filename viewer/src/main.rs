//! Thin CLI front end: parses flags, loads one glTF/GLB asset through
//! `scene-core`, and drives a handful of headless frames through the GPU
//! mirror and acceleration-structure builder. The windowing/UI layer, tone
//! mapper, and image decoders are out-of-scope external collaborators (§1);
//! this binary only exists to exercise the core's frame loop and log
//! progress with `log`/`env_logger`, the way the teacher's own app layer
//! hands off to its renderer core.

use std::path::PathBuf;

use std::collections::HashSet;

use anyhow::{Context, Result};
use clap::Parser;
use scene_core::accel::AccelStructureBuilder;
use scene_core::gpu::GpuMirror;
use scene_core::{EngineSettings, Scene};

#[derive(Parser, Debug)]
#[command(name = "viewer", about = "Headless driver for the glTF scene engine core")]
struct Args {
    /// Path to a .gltf or .glb asset.
    asset: PathBuf,

    /// Number of headless frames to step before exiting.
    #[arg(long, default_value_t = 1)]
    frames: u32,

    /// BLAS scratch-buffer memory hint, in bytes.
    #[arg(long)]
    blas_scratch_budget_bytes: Option<u64>,

    /// Disable Russian-roulette path termination.
    #[arg(long)]
    no_russian_roulette: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut settings = EngineSettings::default();
    if let Some(budget) = args.blas_scratch_budget_bytes {
        settings.blas_scratch_budget_bytes = budget;
    }
    if args.no_russian_roulette {
        settings.russian_roulette_enabled = false;
    }

    log::info!("loading {}", args.asset.display());
    let mut scene = Scene::load(&args.asset).with_context(|| format!("loading {}", args.asset.display()))?;

    let (device, queue) = pollster::block_on(init_device()).context("initializing wgpu device")?;

    let mut mirror = GpuMirror::new(&device);
    mirror.full_sync(&device, &queue, &scene, &settings).context("uploading initial GPU mirror tables")?;
    log::info!(
        "uploaded {} render nodes, {} materials, {} lights",
        scene.get_render_nodes().len(),
        scene.model().materials.len(),
        scene.model().lights.len()
    );

    let scene_has_animation = !scene.model().animations.is_empty();
    let mut accel = AccelStructureBuilder::new(&device, &settings);
    accel.build(&device, &scene, scene_has_animation).context("building acceleration structures")?;
    log::info!("built {} BLAS, {} visible TLAS instances", scene.get_render_primitives().len(), accel.visible_instance_count());

    for frame in 0..args.frames {
        log::debug!("frame {frame}");
        scene.update_node_world_matrices(&Default::default());
        mirror.sync_render_nodes(&device, &queue, scene.get_render_nodes(), &Default::default());
        accel.update_top_level_as(&device, &queue, &scene, &HashSet::new());
    }

    Ok(())
}

async fn init_device() -> Result<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::default();
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions::default())
        .await
        .context("no compatible wgpu adapter")?;
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor::default(), None)
        .await
        .context("requesting wgpu device")?;
    Ok((device, queue))
}
