//! Planar Effects Demo
//!
//! Headless run of the planar engine: a spinning caster over a floor, next
//! to a wall mirror. The first half of the frames draws planar shadows on
//! the floor, the second half draws the mirror. Every device call goes to
//! the recording backend and per-frame counters are logged.
//!
//! Usage: `planar_demo [config.toml|config.ron]`

use std::path::Path;

use planar_engine::foundation::logging;
use planar_engine::prelude::*;
use planar_engine::render::Attenuation;
use planar_engine::scene::SpinController;
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG: &str = "planar_demo/demo.toml";

/// Kind of light the shadows are projected from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum LightKind {
    Directional,
    Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct PlanarDemoConfig {
    light: LightKind,
    light_position: [f32; 3],
    light_direction: [f32; 3],
    shadow_color: [f32; 4],
    reflectance: f32,
    frames: u32,
    frame_time: f64,
    renderer: RendererConfig,
}

impl Default for PlanarDemoConfig {
    fn default() -> Self {
        Self {
            light: LightKind::Directional,
            light_position: [2.0, 6.0, 1.0],
            light_direction: [-0.3, -1.0, -0.2],
            shadow_color: [0.0, 0.0, 0.0, 0.5],
            reflectance: 0.35,
            frames: 120,
            frame_time: 1.0 / 60.0,
            renderer: RendererConfig::default(),
        }
    }
}

impl Config for PlanarDemoConfig {}

impl PlanarDemoConfig {
    fn projector(&self) -> Light {
        let white = Vec3::new(1.0, 1.0, 1.0);
        match self.light {
            LightKind::Directional => Light::directional(Vec3::from(self.light_direction), white),
            LightKind::Point => Light::point(Vec3::from(self.light_position), white, Attenuation::default()),
        }
    }
}

/// Nodes the effects refer to
struct DemoScene {
    graph: SceneGraph,
    root: NodeId,
    floor: NodeId,
    wall: NodeId,
    caster: NodeId,
}

fn wall_mesh(half_width: f32, height: f32, z: f32) -> TriMesh {
    TriMesh::new(
        vec![
            Point3::new(-half_width, 0.0, z),
            Point3::new(half_width, 0.0, z),
            Point3::new(half_width, height, z),
            Point3::new(-half_width, height, z),
        ],
        vec![0, 1, 2, 0, 2, 3],
    )
}

fn build_scene() -> Result<DemoScene, SceneError> {
    let mut graph = SceneGraph::new();
    let root = graph.create_group("root");

    let floor = graph.create_mesh("floor", TriMesh::horizontal_quad(6.0, 0.0), Effect::default());
    let wall = graph.create_mesh(
        "wall",
        wall_mesh(4.0, 4.0, -4.0),
        Effect::unlit(Vec4::new(0.6, 0.7, 0.8, 1.0)),
    );
    graph.attach_child(root, floor)?;
    graph.attach_child(root, wall)?;

    let caster = graph.create_group("caster");
    graph.attach_child(root, caster)?;
    graph.set_local_transform(caster, Transform::from_position(Vec3::new(0.0, 1.5, 0.0)))?;
    graph.add_controller(caster, Box::new(SpinController::new(Vec3::y(), 0.8, Quat::identity())))?;

    let body = graph.create_mesh("body", TriMesh::cube(0.6), Effect::default());
    let turret = graph.create_mesh("turret", TriMesh::cube(0.25), Effect::unlit(Vec4::new(0.9, 0.3, 0.2, 1.0)));
    graph.attach_child(caster, body)?;
    graph.attach_child(caster, turret)?;
    graph.set_local_transform(turret, Transform::from_position(Vec3::new(0.0, 0.85, 0.3)))?;

    Ok(DemoScene { graph, root, floor, wall, caster })
}

fn load_config() -> Result<PlanarDemoConfig, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => PlanarDemoConfig::load_from_file(&path),
        None if Path::new(DEFAULT_CONFIG).exists() => PlanarDemoConfig::load_from_file(DEFAULT_CONFIG),
        None => Ok(PlanarDemoConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    logging::init_with_level(&config.renderer.log_level);
    log::info!("Planar demo: {} frames, {:?} light", config.frames, config.light);

    let mut scene = build_scene()?;
    let camera = Camera::perspective(Vec3::new(0.0, 5.0, 9.0), 60.0, 16.0 / 9.0, 0.1, 100.0);
    let mut renderer = Renderer::new(RecordingBackend::new(), camera, config.renderer.clone())?;
    let mut culler = Culler::new(&renderer.camera().frustum());

    let shadows: GlobalEffect = PlanarShadowEffect::new(scene.caster)
        .with_plane(scene.floor, config.projector(), Vec4::from(config.shadow_color))
        .into();
    let mirror: GlobalEffect = PlanarReflectionEffect::new()
        .with_plane(scene.wall, config.reflectance)
        .into();

    let mut totals = FrameStats::default();
    for frame in 0..config.frames {
        let effect = if frame < config.frames / 2 { &shadows } else { &mirror };
        let time = f64::from(frame) * config.frame_time;
        let stats = renderer.render_frame(&mut scene.graph, &mut culler, scene.root, time, Some(effect))?;

        totals.draw_calls += stats.draw_calls;
        totals.state_calls += stats.state_calls;
        totals.planes_drawn += stats.planes_drawn;
        totals.planes_skipped += stats.planes_skipped;
        log::debug!("Frame {frame}: {stats:?}");
    }

    let backend = renderer.into_backend();
    log::info!(
        "Done: {} draws, {} state calls, {} planes drawn, {} skipped, {} device calls recorded",
        totals.draw_calls,
        totals.state_calls,
        totals.planes_drawn,
        totals.planes_skipped,
        backend.calls().len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_config_parses_toml() {
        let text = r#"
            light = "Point"
            reflectance = 0.5
            frames = 4

            [renderer]
            stencil_bits = 4
        "#;
        let config = PlanarDemoConfig::load_from_str("demo.toml", text).unwrap();
        assert_eq!(config.light, LightKind::Point);
        assert_eq!(config.frames, 4);
        assert_eq!(config.renderer.stencil_bits, 4);
        assert_eq!(config.shadow_color, [0.0, 0.0, 0.0, 0.5]);
    }

    #[test]
    fn test_demo_frames_draw_both_effects() {
        let config = PlanarDemoConfig { frames: 4, ..PlanarDemoConfig::default() };
        let mut scene = build_scene().unwrap();
        let camera = Camera::perspective(Vec3::new(0.0, 5.0, 9.0), 60.0, 16.0 / 9.0, 0.1, 100.0);
        let mut renderer = Renderer::new(RecordingBackend::new(), camera, config.renderer.clone()).unwrap();
        let mut culler = Culler::new(&renderer.camera().frustum());

        let shadows: GlobalEffect = PlanarShadowEffect::new(scene.caster)
            .with_plane(scene.floor, config.projector(), Vec4::from(config.shadow_color))
            .into();
        let mirror: GlobalEffect = PlanarReflectionEffect::new().with_plane(scene.wall, config.reflectance).into();

        let shadow_stats = renderer.render_frame(&mut scene.graph, &mut culler, scene.root, 0.0, Some(&shadows)).unwrap();
        assert_eq!(shadow_stats.planes_drawn, 1);
        let mirror_stats = renderer.render_frame(&mut scene.graph, &mut culler, scene.root, 0.1, Some(&mirror)).unwrap();
        assert_eq!(mirror_stats.planes_drawn, 1);
    }
}
