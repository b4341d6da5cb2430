//! Terrain driving demo: a car on a shadow-mapped heightmap landscape with
//! water reflections, a sky box and dust particles.

mod assets;
mod camera_rig;
mod config;
mod entity;
mod events;
mod particles;
mod player;
mod scene;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use engine_core::Time;
use input::InputState;
use physics::ControlMode;
use rand::Rng;
use renderer::{ModelData, RenderError, RenderManager, RenderSettings, Renderer, SceneAssets};
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use config::GameConfig;
use scene::{Landmarks, ModelRef, ModelSet, Scene};

/// Vehicle control model picked on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Direct forward/backward movement and turning.
    Basic,
    /// Engine force, drag, rolling resistance and braking.
    Physics,
}

impl From<Mode> for ControlMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Basic => ControlMode::Basic,
            Mode::Physics => ControlMode::Physics,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "terrain-drive", version, about = "Drive a car around a heightmap terrain")]
struct Cli {
    /// Control model for the car.
    #[arg(value_enum)]
    mode: Mode,
    /// Configuration file.
    #[arg(long, default_value = "config.ron")]
    config: PathBuf,
}

/// Main game state: GPU context, render manager, scene and input.
pub struct GameState {
    renderer: Renderer,
    manager: RenderManager,
    scene: Scene,
    input: InputState,
    time: Time,
    running: bool,
}

impl GameState {
    async fn new(window: Arc<Window>, config: GameConfig, mode: ControlMode) -> Result<Self> {
        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        log::info!("World seed {}", seed);

        let world = assets::load_world(&config, seed)?;
        let landmarks = match &world.track {
            Some(track) => Landmarks::from_track(track, &world.terrain_config),
            None => Landmarks::classic(),
        };

        let renderer = Renderer::new(window, config.vsync).await?;
        let settings = RenderSettings {
            shadows: config.shadow_settings(),
            water_reflections: config.water_reflections,
            ..Default::default()
        };
        let mut manager = RenderManager::new(
            &renderer.device,
            &renderer.queue,
            renderer.surface_format(),
            renderer.dimensions(),
            settings,
            SceneAssets {
                terrain: &world.terrain,
                sky_faces: &world.sky_faces,
                particle_sprite: &world.dust,
                water: landmarks.water(&world.terrain),
            },
        )?;

        let mut register = |data: &ModelData| ModelRef {
            id: manager.add_model(&renderer.device, &renderer.queue, data),
            bounds: data.bounds().unwrap_or_default(),
        };
        let models = ModelSet {
            car: register(&world.models.car),
            tree: register(&world.models.tree),
            stump: register(&world.models.stump),
            cone: register(&world.models.cone),
            fence: register(&world.models.fence),
        };

        let mut scene = Scene::new(&config, mode, world.terrain, &landmarks, &models, seed);
        let (width, height) = renderer.dimensions();
        scene.resize(width, height);
        log::info!("Scene ready: {:?} mode, {} props, {} lights", mode, scene.props.len(), scene.lights.len());

        Ok(Self {
            renderer,
            manager,
            scene,
            input: InputState::new(),
            time: Time::with_max_delta(config.max_frame_delta),
            running: true,
        })
    }

    fn update(&mut self) {
        if self.input.quit_requested() {
            self.running = false;
            return;
        }
        self.time.update();
        self.input.begin_frame();
        self.scene.update(&self.input, self.time.delta_seconds());
    }

    fn render(&mut self) -> Result<(), RenderError> {
        let Some(mut frame) = self.renderer.begin_frame()? else {
            return Ok(());
        };
        let batches = self.scene.batches();
        let particles = self.scene.particle_instances();
        let target = self.renderer.target(&frame.view);
        self.manager
            .render(&self.renderer.queue, &mut frame.encoder, target, &self.scene.frame(&batches, &particles))?;
        self.renderer.end_frame(frame);
        Ok(())
    }

    fn resize(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        self.renderer.resize(size);
        let (width, height) = self.renderer.dimensions();
        self.manager.resize(&self.renderer.device, width, height);
        self.scene.resize(width, height);
    }
}

/// Application handler for winit.
struct App {
    cli: Cli,
    state: Option<GameState>,
}

impl App {
    fn new(cli: Cli) -> Self {
        Self { cli, state: None }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let config = GameConfig::load_from(&self.cli.config);
        let window_attrs = Window::default_attributes()
            .with_title("Terrain Drive")
            .with_inner_size(winit::dpi::LogicalSize::new(config.window_width, config.window_height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        match pollster::block_on(GameState::new(window.clone(), config, self.cli.mode.into())) {
            Ok(s) => {
                self.state = Some(s);
                window.request_redraw();
            }
            Err(e) => {
                log::error!("Failed to initialize: {:#}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(state) = &mut self.state {
            if state.handle_window_event(event) || !state.running {
                event_loop.exit();
            }
        }
    }

    fn device_event(&mut self, _: &ActiveEventLoop, _: DeviceId, event: DeviceEvent) {
        if let Some(state) = &mut self.state {
            state.handle_device_event(event);
        }
    }
}

fn print_controls(mode: ControlMode) {
    println!("╔════════════════════════════════════════════════╗");
    println!("║                 TERRAIN DRIVE                  ║");
    println!("╠════════════════════════════════════════════════╣");
    match mode {
        ControlMode::Basic => {
            println!("║  W / Up      - Drive forward                   ║");
            println!("║  S / Down    - Drive backward                  ║");
        }
        ControlMode::Physics => {
            println!("║  W / Up      - Accelerate                      ║");
            println!("║  S / Down    - Brake                           ║");
            println!("║  Space       - Handbrake                       ║");
        }
    }
    println!("║  A/D, Left/Right - Steer                       ║");
    println!("║  Left drag   - Orbit camera                    ║");
    println!("║  Scroll      - Zoom                            ║");
    println!("║  Escape      - Quit                            ║");
    println!("╚════════════════════════════════════════════════╝");
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let mode = ControlMode::from(cli.mode);
    print_controls(mode);
    log::info!("Starting terrain drive in {:?} mode", mode);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(cli);
    event_loop.run_app(&mut app)?;

    if app.state.is_none() {
        anyhow::bail!("Initialization failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_accepts_both_modes() {
        let cli = Cli::try_parse_from(["terrain-drive", "basic"]).unwrap();
        assert_eq!(ControlMode::from(cli.mode), ControlMode::Basic);
        assert_eq!(cli.config, PathBuf::from("config.ron"));

        let cli = Cli::try_parse_from(["terrain-drive", "physics", "--config", "alt.ron"]).unwrap();
        assert_eq!(ControlMode::from(cli.mode), ControlMode::Physics);
        assert_eq!(cli.config, PathBuf::from("alt.ron"));
    }

    #[test]
    fn cli_rejects_missing_or_unknown_mode() {
        assert!(Cli::try_parse_from(["terrain-drive"]).is_err());
        assert!(Cli::try_parse_from(["terrain-drive", "arcade"]).is_err());
    }
}
