mod camera;
mod cli;
mod controls;
mod headless;
mod hud;
mod input;
mod renderer;
mod shaders;
mod stars;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use emblem_field::{EmblemScene, FrameDriver, GestureSignal};
use pollster::FutureExt;
use rand::SeedableRng;
use rand::rngs::StdRng;
use wgpu::SurfaceError;
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::{Window, WindowBuilder},
};

use crate::camera::OrbitCamera;
use crate::cli::Args;
use crate::controls::{Action, ColorCycle, SimulatedHand, action_for_key};
use crate::input::GestureInput;
use crate::renderer::ParticleRenderer;

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::init();
    args.validate()?;

    let scene = cli::build_scene(&args).context("building emblem scene")?;

    if let Some(path) = args.dump_mask.as_ref() {
        let lit = headless::dump_mask(&scene, path)
            .with_context(|| format!("writing mask PNG to {}", path.display()))?;
        println!(
            "{} silhouette exported to {} ({} lit pixels)",
            scene.shape().label(),
            path.display(),
            lit
        );
    }

    let (input, hand) = GestureInput::from_args(&args)?;

    if args.headless {
        let report = headless::run(&args, scene, input)?;
        headless::print_report(&report);
        if let Some(path) = args.stats_json.as_ref() {
            headless::write_report_json(&report, path)?;
            println!("  report written to {}", path.display());
        }
        return Ok(());
    }

    run_window(scene, input, hand.map(SimulatedHand::new), args.seed)
}

struct ViewerApp {
    renderer: ParticleRenderer,
    driver: FrameDriver<GestureInput>,
    simulated: Option<SimulatedHand>,
    colors: ColorCycle,
    camera: OrbitCamera,
    dragging: bool,
    last_cursor: Option<(f32, f32)>,
    started: Instant,
    last_elapsed: f32,
    title: String,
}

impl ViewerApp {
    fn window(&self) -> &Window {
        self.renderer.window()
    }

    /// Apply one keyboard action; returns false when the viewer should exit.
    fn handle(&mut self, action: Action) -> bool {
        match action {
            Action::Quit => return false,
            Action::SelectShape(shape) => {
                self.driver.select_shape(shape);
                self.colors.reset();
            }
            Action::NextShape => {
                let next = self.driver.scene().shape().next();
                self.driver.select_shape(next);
                self.colors.reset();
            }
            Action::CycleColor => {
                let color = self.colors.advance();
                self.driver.select_color(color);
            }
            Action::Open | Action::Close | Action::ToggleHand => match self.simulated.as_mut() {
                Some(hand) => {
                    match action {
                        Action::Open => hand.open(),
                        Action::Close => hand.close(),
                        _ => hand.toggle(),
                    }
                    log::info!(
                        "[viewer] simulated hand {} openness {:.1}",
                        if hand.is_visible() { "shown" } else { "hidden" },
                        hand.openness()
                    );
                }
                None => log::debug!("[viewer] hand keys ignored while replaying landmarks"),
            },
        }
        true
    }

    fn cursor_moved(&mut self, x: f32, y: f32) {
        if self.dragging {
            if let Some((last_x, last_y)) = self.last_cursor {
                self.camera.drag(x - last_x, y - last_y);
            }
        }
        self.last_cursor = Some((x, y));
    }

    /// Title doubles as the hand readout; only touched when the text changes.
    fn refresh_title(&mut self, signal: GestureSignal, spread: f32) {
        let scene = self.driver.scene();
        let title = hud::status_title(scene.shape(), scene.color(), signal, spread);
        if title != self.title {
            self.renderer.window().set_title(&title);
            self.title = title;
        }
    }

    fn render(&mut self) -> Result<(), SurfaceError> {
        let elapsed = self.started.elapsed().as_secs_f32();
        let dt = elapsed - self.last_elapsed;
        self.last_elapsed = elapsed;
        let signal = self.driver.signal();
        self.camera.auto_rotate(dt, signal.detected);

        let Some(frame) = self.driver.tick(elapsed) else {
            return Ok(());
        };
        let spread = frame.spread;
        let result = self.renderer.render(&frame, &self.camera);
        self.refresh_title(signal, spread);
        result
    }
}

fn run_window(
    scene: EmblemScene,
    input: GestureInput,
    simulated: Option<SimulatedHand>,
    seed: Option<u64>,
) -> Result<()> {
    let event_loop = EventLoop::new().context("creating winit event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(format!("Emblem Field - {}", scene.shape().label()))
            .with_inner_size(PhysicalSize::new(1280, 720))
            .build(&event_loop)
            .context("creating viewer window")?,
    );

    let mut star_rng = StdRng::seed_from_u64(seed.unwrap_or_else(rand::random));
    let star_positions =
        stars::starfield(stars::STAR_COUNT, stars::STAR_RADIUS, stars::STAR_DEPTH, &mut star_rng);
    let renderer =
        ParticleRenderer::new(window, scene.config().particle_count, &star_positions).block_on()?;
    println!(
        "Keys: 1-7 emblem, Tab next emblem, C color, Space show/hide hand, Up/Down openness, Esc quit"
    );
    println!("Mouse: drag to orbit, wheel to zoom");

    let mut driver = FrameDriver::new(scene, input);
    driver.start();
    let mut app = ViewerApp {
        renderer,
        driver,
        simulated,
        colors: ColorCycle::default(),
        camera: OrbitCamera::default(),
        dragging: false,
        last_cursor: None,
        started: Instant::now(),
        last_elapsed: 0.0,
        title: String::new(),
    };
    app.refresh_title(GestureSignal::NONE, 0.0);

    event_loop
        .run(move |event, target| {
            target.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { window_id, event } if window_id == app.window().id() => {
                    match event {
                        WindowEvent::CloseRequested => target.exit(),
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key,
                                    state: ElementState::Pressed,
                                    repeat,
                                    ..
                                },
                            ..
                        } => {
                            let Some(action) = action_for_key(&logical_key) else {
                                return;
                            };
                            // Held arrows keep adjusting openness; other keys fire once.
                            if repeat && !matches!(action, Action::Open | Action::Close) {
                                return;
                            }
                            if !app.handle(action) {
                                target.exit();
                            }
                        }
                        WindowEvent::MouseInput {
                            state,
                            button: MouseButton::Left,
                            ..
                        } => app.dragging = state == ElementState::Pressed,
                        WindowEvent::CursorMoved { position, .. } => {
                            app.cursor_moved(position.x as f32, position.y as f32);
                        }
                        WindowEvent::MouseWheel { delta, .. } => {
                            let lines = match delta {
                                MouseScrollDelta::LineDelta(_, y) => y,
                                MouseScrollDelta::PixelDelta(p) => p.y as f32 * 0.1,
                            };
                            app.camera.zoom(lines);
                        }
                        WindowEvent::Resized(new_size) => app.renderer.resize(new_size),
                        WindowEvent::RedrawRequested => match app.render() {
                            Ok(_) => {}
                            Err(SurfaceError::Lost) => {
                                let size = app.renderer.size();
                                app.renderer.resize(size);
                            }
                            Err(SurfaceError::OutOfMemory) => target.exit(),
                            Err(err) => eprintln!("[emblem_viewer] render error: {err:?}"),
                        },
                        _ => {}
                    }
                }
                Event::AboutToWait => app.window().request_redraw(),
                Event::LoopExiting => app.driver.stop(),
                _ => {}
            }
        })
        .context("running viewer application")?;
    Ok(())
}
