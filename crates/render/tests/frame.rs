use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glam::Vec3;
use hair_physics::{StateSnapshot, StrandAsset, StrandMaterial, StrandTopology, TopologyAsset};
use hair_render::{
    Camera, GraphicsDevice, Light, Pass, RecordedCommand, RecordingDevice, RenderConfig, RenderError,
    SoftwareDevice, StrandRenderer,
};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// A sheet of vertical strands in the XY plane, `spacing` apart.
fn sheet(count: usize, spacing: f32) -> StateSnapshot {
    let asset = TopologyAsset {
        strands: (0..count)
            .map(|i| {
                let x = i as f32 * spacing - 0.5 * spacing * (count - 1) as f32;
                StrandAsset {
                    root_bone: 0,
                    rest_positions: (0..6).map(|k| [x, 0.2 - 0.08 * k as f32, 0.0]).collect(),
                    material: StrandMaterial::default(),
                }
            })
            .collect(),
    };
    let topology = Arc::new(StrandTopology::from_asset(&asset).expect("valid asset"));
    let positions: Vec<Vec3> = topology.rest_local().to_vec();
    StateSnapshot::new(3, Arc::from(positions), topology)
}

fn camera() -> Camera {
    let mut camera = Camera::new(Vec3::ZERO, 1.0, 96, 96);
    camera.pitch = 0.0;
    camera
}

fn wide_config() -> RenderConfig {
    RenderConfig {
        root_width: 0.01,
        tip_width: 0.006,
        shadow_resolution: 128,
        ..RenderConfig::default()
    }
}

#[test]
fn passes_are_submitted_in_order() {
    let mut renderer = StrandRenderer::default();
    let geometry = renderer.build_geometry(&sheet(4, 0.05));
    let mut device = RecordingDevice::new(64, 64);

    let stats = renderer
        .draw(&mut device, &geometry, &camera(), &Light::studio())
        .expect("draw");

    assert_eq!(
        device.passes(),
        vec![
            Pass::ShadowDepth { light: 0 },
            Pass::ShadowOpacity { light: 0 },
            Pass::Accumulate,
            Pass::Resolve,
        ]
    );
    assert_eq!(
        device.commands().first(),
        Some(&RecordedCommand::Geometry {
            vertices: 4 * 6 * 2,
            indices: 4 * 5 * 6,
            step: 3,
        })
    );
    assert_eq!(device.commands().last(), Some(&RecordedCommand::Finish { frame: 1 }));
    assert_eq!(stats.passes, 4);
    assert_eq!(stats.strands, 4);
    assert_eq!(stats.segments, 20);
    assert_eq!(stats.step, 3);
}

#[test]
fn draws_carry_the_index_count_and_lights() {
    let mut renderer = StrandRenderer::default();
    let geometry = renderer.build_geometry(&sheet(2, 0.05));
    let mut device = RecordingDevice::new(32, 32);
    renderer
        .draw(&mut device, &geometry, &camera(), &Light::studio())
        .expect("draw");

    for command in device.commands() {
        if let RecordedCommand::Draw {
            index_count,
            light_count,
            ..
        } = command
        {
            assert_eq!(*index_count, 2 * 5 * 6);
            assert_eq!(*light_count, 2);
        }
    }
}

#[test]
fn zero_sized_target_submits_nothing() {
    let mut renderer = StrandRenderer::default();
    let geometry = renderer.build_geometry(&sheet(2, 0.05));
    let mut device = RecordingDevice::new(0, 32);

    let err = renderer
        .draw(&mut device, &geometry, &camera(), &Light::studio())
        .unwrap_err();
    assert!(matches!(err, RenderError::InvalidViewport { width: 0, height: 32 }));
    assert!(device.commands().is_empty());
}

#[test]
fn device_failures_propagate() {
    let mut renderer = StrandRenderer::default();
    let geometry = renderer.build_geometry(&sheet(2, 0.05));
    let mut device = RecordingDevice::new(32, 32).failing();

    let err = renderer
        .draw(&mut device, &geometry, &camera(), &[])
        .unwrap_err();
    assert!(matches!(err, RenderError::Device(_)));
    assert!(!err.is_recoverable());
}

/// Counts every event it sees.
struct EventCounter(Arc<AtomicUsize>);

impl<S: tracing::Subscriber> Layer<S> for EventCounter {
    fn on_event(&self, _event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn overflow_is_logged_once_per_build() {
    let renderer = StrandRenderer::new(RenderConfig {
        max_segments: 10,
        ..RenderConfig::default()
    });
    let snapshot = sheet(4, 0.5);
    let events = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(EventCounter(Arc::clone(&events)));

    let geometry = tracing::subscriber::with_default(subscriber, || renderer.build_geometry(&snapshot));

    assert_eq!(geometry.report.culled_strands.len(), 2);
    assert_eq!(events.load(Ordering::SeqCst), 1);
}

#[test]
fn overflow_culls_strands_far_from_the_last_eye() {
    let config = RenderConfig {
        max_segments: 10,
        ..RenderConfig::default()
    };
    let mut renderer = StrandRenderer::new(config);
    let snapshot = sheet(4, 0.5);
    let mut device = RecordingDevice::new(32, 32);

    // Look from the +x side so the strand at the -x end is the farthest.
    let mut camera = camera();
    camera.yaw = std::f32::consts::FRAC_PI_2;
    let first = renderer.build_geometry(&snapshot);
    renderer.draw(&mut device, &first, &camera, &[]).expect("draw");
    assert!((renderer.focus() - camera.eye()).length() < 1e-6);

    let geometry = renderer.build_geometry(&snapshot);
    assert_eq!(geometry.report.culled_strands, vec![0, 1]);
    assert_eq!(geometry.segment_count, 10);

    let stats = renderer.draw(&mut device, &geometry, &camera, &[]).expect("draw");
    assert_eq!(stats.culled_strands, 2);
    assert_eq!(stats.strands, 2);
}

#[test]
fn software_frame_covers_pixels_and_keeps_the_background() -> anyhow::Result<()> {
    let mut renderer = StrandRenderer::new(wide_config());
    let geometry = renderer.build_geometry(&sheet(5, 0.04));
    let mut device = SoftwareDevice::new(96, 96)?;

    let stats = renderer.draw(&mut device, &geometry, &camera(), &Light::studio())?;
    assert!(stats.covered_pixels > 50, "covered {}", stats.covered_pixels);
    assert!(stats.covered_pixels < 96 * 96);

    let pixels = device.read_pixels()?.expect("software keeps pixels");
    assert_eq!(pixels.len(), 96 * 96 * 4);
    let corner = &pixels[..4];
    let expected = (0.06f32.powf(1.0 / 2.2) * 255.0).round() as u8;
    assert_eq!(corner[0], expected);
    assert_eq!(corner[3], 255);
    Ok(())
}

#[test]
fn shadows_darken_the_sheet() -> anyhow::Result<()> {
    let snapshot = sheet(9, 0.02);
    let light = Light::directional(Vec3::new(1.0, -1.0, 0.0), Vec3::ONE, 1.0);
    let unlit_shadow = Light {
        casts_shadows: false,
        ..light
    };

    let mut brightness = Vec::new();
    for lights in [[unlit_shadow], [light]] {
        let mut renderer = StrandRenderer::new(wide_config());
        let geometry = renderer.build_geometry(&snapshot);
        let mut device = SoftwareDevice::new(96, 96)?;
        renderer.draw(&mut device, &geometry, &camera(), &lights)?;
        let sum: u64 = device
            .framebuffer()
            .chunks_exact(4)
            .map(|p| u64::from(p[0]) + u64::from(p[1]) + u64::from(p[2]))
            .sum();
        brightness.push(sum);
    }
    assert!(brightness[1] < brightness[0], "{brightness:?}");
    Ok(())
}

#[test]
fn frame_saves_as_png() -> anyhow::Result<()> {
    let mut renderer = StrandRenderer::new(wide_config());
    let geometry = renderer.build_geometry(&sheet(3, 0.05));
    let mut device = SoftwareDevice::new(48, 32)?;
    renderer.draw(&mut device, &geometry, &camera(), &Light::studio())?;

    let path = std::env::temp_dir().join(format!("hair-render-frame-{}.png", std::process::id()));
    device.save_png(&path)?;
    let image = image::open(&path)?;
    assert_eq!((image.width(), image.height()), (48, 32));
    std::fs::remove_file(&path)?;
    Ok(())
}

#[test]
fn resize_changes_the_target() -> anyhow::Result<()> {
    let mut device = SoftwareDevice::new(16, 16)?;
    device.resize(40, 20)?;
    assert_eq!(device.size(), (40, 20));
    assert!(matches!(
        device.resize(0, 20),
        Err(RenderError::InvalidViewport { .. })
    ));
    Ok(())
}
