//! Application shell: window, GPU setup, and the event/render loop.

use std::path::PathBuf;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::config::ViewerConfig;
use crate::demo;
use crate::playback::{Playback, Recording};
use crate::scene::{SceneComposer, ViewState};
use crate::ui::{Hud, OrbitCamera, TransportInfo};

pub struct App {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    composer: SceneComposer,
    hud: Hud,
    camera: OrbitCamera,
    playback: Playback,
    viewer_config: ViewerConfig,
    last_render_time: std::time::Instant,
}

impl App {
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Returns false when the application should exit.
    pub fn handle_event(&mut self, event: &WindowEvent) -> bool {
        let consumed = self.hud.handle_event(&self.window, event);

        match event {
            WindowEvent::CloseRequested => {
                self.save_config();
                return false;
            }
            WindowEvent::Resized(physical_size) => {
                if physical_size.width > 0 && physical_size.height > 0 {
                    self.config.width = physical_size.width;
                    self.config.height = physical_size.height;
                    self.surface.configure(&self.device, &self.config);
                    self.composer
                        .resize(&self.device, physical_size.width, physical_size.height);
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.camera.set_shift(modifiers.state().shift_key());
            }
            WindowEvent::MouseInput { button, state, .. } => {
                if !consumed && !self.hud.wants_pointer_input() {
                    self.camera.handle_mouse_button(*button, *state);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if !self.hud.wants_pointer_input() {
                    self.camera.handle_mouse_move(*position);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if !consumed && !self.hud.wants_pointer_input() {
                    self.camera.handle_scroll(*delta);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if !consumed && !self.hud.wants_keyboard_input() {
                    self.handle_key(event);
                }
            }
            WindowEvent::RedrawRequested => {
                self.render();
            }
            _ => {}
        }
        true
    }

    fn handle_key(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }
        match event.physical_key {
            PhysicalKey::Code(KeyCode::Space) => self.playback.toggle(),
            PhysicalKey::Code(KeyCode::ArrowRight) => {
                let next = self.playback.current_index() + 1;
                self.playback.select(next);
            }
            PhysicalKey::Code(KeyCode::ArrowLeft) => {
                let index = self.playback.current_index().saturating_sub(1);
                self.playback.select(index);
            }
            _ => {}
        }
    }

    fn save_config(&mut self) {
        self.viewer_config.selected_field = self.hud.state.selected_field.clone();
        self.viewer_config.substrate_opacity = self.hud.state.substrate_opacity;
        self.viewer_config.show_trails = self.hud.state.show_trails;
        self.viewer_config.detailed = self.hud.state.detailed;
        self.viewer_config.playback_speed = self.playback.speed();
        self.viewer_config.window_width = self.config.width;
        self.viewer_config.window_height = self.config.height;
        if let Err(err) = self.viewer_config.save(&ViewerConfig::default_path()) {
            log::warn!("failed to save config: {err}");
        }
    }

    fn render(&mut self) {
        let now = std::time::Instant::now();
        let dt = now.duration_since(self.last_render_time).as_secs_f32();
        self.last_render_time = now;

        self.camera.update(dt);
        self.playback.advance(dt);
        if self.playback.take_reset() {
            self.composer.reset_run();
        }

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(err) => {
                log::error!("surface error: {err}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let transport = TransportInfo {
            current: self.playback.current_index(),
            step_count: self.playback.recording().len(),
            playing: self.playback.is_playing(),
            speed: self.playback.speed(),
            sim_time: self.playback.current_snapshot().time,
        };
        let (hud_output, requests) =
            self.hud
                .run(&self.window, &transport, Some(self.playback.current_snapshot()));

        if requests.toggle_play {
            self.playback.toggle();
        }
        if let Some(step) = requests.seek {
            self.playback.select(step);
        }
        if let Some(speed) = requests.speed {
            self.playback.set_speed(speed);
        }
        if let Some(preset) = requests.preset {
            self.viewer_config.camera_preset = preset;
            self.camera
                .apply_preset(preset, self.composer.domain().domain_size());
        }
        if self.playback.take_reset() {
            self.composer.reset_run();
        }

        let view_state = ViewState {
            selected_field: self.hud.state.selected_field.clone(),
            substrate_opacity: self.hud.state.substrate_opacity,
            show_trails: self.hud.state.show_trails,
            detailed: self.hud.state.detailed,
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let aspect = self.config.width as f32 / self.config.height.max(1) as f32;
        self.composer.render(
            &self.device,
            &self.queue,
            &mut encoder,
            &view,
            &self.camera,
            aspect,
            Some(self.playback.current_snapshot()),
            &view_state,
            dt,
        );

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: self.window.scale_factor() as f32,
        };
        self.hud.render(
            &self.device,
            &self.queue,
            &mut encoder,
            &view,
            screen_descriptor,
            hud_output,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }
}

struct AppState {
    app: Option<App>,
    pending_playback: Option<Playback>,
    viewer_config: ViewerConfig,
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.app.is_some() {
            return;
        }
        let Some(mut playback) = self.pending_playback.take() else {
            return;
        };

        let window_attributes = Window::default_attributes()
            .with_title("Nanoscope")
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.viewer_config.window_width,
                self.viewer_config.window_height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .expect("failed to create window"),
        );

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .expect("failed to create surface");

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .expect("no suitable GPU adapter");

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            ..Default::default()
        }))
        .expect("failed to create device");

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let recording = playback.recording();
        let composer = SceneComposer::new(
            &device,
            &config,
            recording.domain_size,
            recording.tumor_radius,
        );
        let mut camera = OrbitCamera::new(recording.domain_size);
        camera.apply_preset(self.viewer_config.camera_preset, recording.domain_size);
        playback.set_speed(self.viewer_config.playback_speed);

        let mut hud = Hud::new(&device, surface_format, &window);
        hud.state.selected_field = self.viewer_config.selected_field.clone();
        hud.state.substrate_opacity = self.viewer_config.substrate_opacity;
        hud.state.show_trails = self.viewer_config.show_trails;
        hud.state.detailed = self.viewer_config.detailed;

        self.app = Some(App {
            window,
            surface,
            device,
            queue,
            config,
            composer,
            hud,
            camera,
            playback,
            viewer_config: self.viewer_config.clone(),
            last_render_time: std::time::Instant::now(),
        });
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(app) = &mut self.app else { return };
        if window_id != app.window().id() {
            return;
        }
        if !app.handle_event(&event) {
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Poll);
        if let Some(app) = &self.app {
            app.request_redraw();
        }
    }
}

/// Number of steps in the built-in demo run.
const DEMO_STEPS: usize = 600;
const DEMO_SEED: u64 = 7;

fn load_recording() -> Recording {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None | Some("--demo") => {
            log::info!("no recording given, generating demo run");
            demo::generate(DEMO_STEPS, DEMO_SEED)
        }
        Some(path) => match Recording::from_file(&PathBuf::from(path)) {
            Ok(recording) => {
                log::info!("loaded {} steps from {path}", recording.len());
                recording
            }
            Err(err) => {
                eprintln!("error: could not load recording {path}: {err}");
                std::process::exit(1);
            }
        },
    }
}

pub fn run() {
    env_logger::init();

    let recording = load_recording();
    let viewer_config = ViewerConfig::load(&ViewerConfig::default_path()).sanitized();

    let event_loop = EventLoop::new().expect("failed to create event loop");
    let mut state = AppState {
        app: None,
        pending_playback: Some(Playback::new(recording)),
        viewer_config,
    };
    event_loop
        .run_app(&mut state)
        .expect("event loop terminated abnormally");
}
