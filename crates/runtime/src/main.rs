//! # hairdemo
//!
//! Headless harness for the hair runtime. Builds the demo scene, sways the
//! head, feeds irregular frame times to the session and writes the last frame
//! to a PNG.

#![deny(clippy::all)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hair_physics::Parallelism;
use hair_render::{write_png, GraphicsDevice, SoftwareDevice};
use hair_runtime::{DemoScene, InputEvent, SessionConfig, SimulationSession};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hairdemo", about = "Simulate and render a head of hair without a window")]
struct Args {
    /// Host frames to run
    #[arg(long, default_value_t = 240)]
    frames: u32,
    #[arg(long, default_value_t = 640)]
    width: u32,
    #[arg(long, default_value_t = 480)]
    height: u32,
    /// Strand count of the demo scalp
    #[arg(long, default_value_t = 1024)]
    strands: usize,
    /// Solver worker threads; 0 or 1 solves on the calling thread
    #[arg(long)]
    workers: Option<usize>,
    /// Constraint relaxation sweeps per step
    #[arg(long)]
    iterations: Option<u32>,
    /// JSON session config; command line options override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// PNG to write the final frame to
    #[arg(long)]
    output: Option<PathBuf>,
    /// Log diagnostics every this many frames
    #[arg(long, default_value_t = 60)]
    log_every: u32,
    /// Render with the wgpu backend
    #[cfg(feature = "gpu")]
    #[arg(long)]
    gpu: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => SessionConfig::from_json_file(path)
            .with_context(|| format!("loading session config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    if let Some(workers) = args.workers {
        config.solver.parallelism = Parallelism::Workers(workers);
    }
    if let Some(iterations) = args.iterations {
        config.solver.iterations = iterations;
    }

    #[cfg(feature = "gpu")]
    if args.gpu {
        let device = hair_render::WgpuDevice::new(args.width, args.height).context("opening wgpu device")?;
        return run(&args, config, device);
    }
    let device = SoftwareDevice::new(args.width, args.height).context("allocating software target")?;
    run(&args, config, device)
}

fn run<D: GraphicsDevice>(args: &Args, config: SessionConfig, device: D) -> Result<()> {
    let scene = DemoScene::new(args.strands, 12);
    let base_dt = f64::from(config.dt);
    let mut session = SimulationSession::initialize(
        config,
        &scene.asset,
        scene.proxies.clone(),
        scene.rest_pose.clone(),
        device,
    )
    .context("initializing simulation session")?;

    let mut time = 0.0_f64;
    let mut last_report = None;
    for frame in 0..args.frames {
        // Deterministic jitter around the fixed step, with an occasional stall.
        let jitter = 1.0 + 0.35 * (f64::from(frame) * 1.7).sin();
        let wall_dt = if frame % 97 == 96 { base_dt * 9.0 } else { base_dt * jitter };
        time += wall_dt;

        session.set_body_pose(scene.sway(time as f32));
        if frame == args.frames / 2 {
            session.handle_input(InputEvent::Orbit { yaw: 0.4, pitch: 0.0 })?;
        }
        let report = session.tick(wall_dt);

        if args.log_every > 0 && report.frame % u64::from(args.log_every) == 0 {
            tracing::info!(
                frame = report.frame,
                steps = report.steps,
                discarded = report.discarded_time,
                covered = report.draw.as_ref().map_or(0, |d| d.covered_pixels),
                diagnostics = ?report.diagnostics,
                "progress"
            );
        }
        last_report = Some(report);
    }

    let output = args.output.clone().unwrap_or_else(|| {
        PathBuf::from(format!(
            "hairdemo-{}.png",
            chrono::Local::now().format("%Y%m%d-%H%M%S")
        ))
    });
    let (width, height) = session.device().size();
    match session.device_mut().read_pixels()? {
        Some(pixels) => write_png(&output, width, height, &pixels)
            .with_context(|| format!("writing {}", output.display()))?,
        None => tracing::warn!("device keeps no pixels; nothing written"),
    }

    if let Some(report) = last_report {
        tracing::info!(frame = report.frame, draw = ?report.draw, "last frame");
    }
    tracing::info!(totals = ?session.totals(), "run finished");
    session.shutdown();
    Ok(())
}
