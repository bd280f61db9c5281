//! HUD overlay built on egui-wgpu and egui-winit.
//!
//! Transport bar along the bottom, view controls on the right, and
//! optional metrics/legend windows. Panels never touch playback or
//! camera state directly; they report requests that the application
//! loop applies, keeping the HUD a pure function of what it is shown.

use egui_wgpu::ScreenDescriptor;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::colormap;
use crate::rendering::visuals::{cell_visual, nanobot_visual, vessel_visual};
use crate::snapshot::{CellPhase, NanobotState, Snapshot};
use crate::ui::camera::CameraPreset;

/// HUD-owned view settings, persisted via the viewer config.
#[derive(Debug, Clone)]
pub struct HudState {
    pub selected_field: Option<String>,
    pub substrate_opacity: f32,
    pub show_trails: bool,
    pub detailed: bool,
    pub show_metrics: bool,
    pub show_legend: bool,
}

impl Default for HudState {
    fn default() -> Self {
        Self {
            selected_field: Some("oxygen".to_string()),
            substrate_opacity: 0.7,
            show_trails: true,
            detailed: true,
            show_metrics: true,
            show_legend: false,
        }
    }
}

/// What the panels asked for this frame.
#[derive(Debug, Default)]
pub struct HudRequests {
    pub toggle_play: bool,
    pub seek: Option<usize>,
    pub speed: Option<f32>,
    pub preset: Option<CameraPreset>,
}

/// Read-only playback facts the transport bar displays.
pub struct TransportInfo {
    pub current: usize,
    pub step_count: usize,
    pub playing: bool,
    pub speed: f32,
    pub sim_time: f32,
}

pub struct Hud {
    ctx: egui::Context,
    winit_state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    pub state: HudState,
}

impl Hud {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat, window: &Window) -> Self {
        let ctx = egui::Context::default();
        let winit_state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            window.theme(),
            Some(device.limits().max_texture_dimension_2d as usize),
        );
        let renderer =
            egui_wgpu::Renderer::new(device, surface_format, egui_wgpu::RendererOptions::default());
        Self {
            ctx,
            winit_state,
            renderer,
            state: HudState::default(),
        }
    }

    /// Feed a window event to egui. Returns whether egui consumed it.
    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let response = self.winit_state.on_window_event(window, event);
        response.consumed
    }

    pub fn wants_pointer_input(&self) -> bool {
        self.ctx.wants_pointer_input() || self.ctx.is_pointer_over_area()
    }

    pub fn wants_keyboard_input(&self) -> bool {
        self.ctx.wants_keyboard_input()
    }

    /// Run all panels for one frame and collect their requests.
    pub fn run(
        &mut self,
        window: &Window,
        transport: &TransportInfo,
        snapshot: Option<&Snapshot>,
    ) -> (egui::FullOutput, HudRequests) {
        let raw_input = self.winit_state.take_egui_input(window);
        self.ctx.begin_pass(raw_input);

        let mut requests = HudRequests::default();
        self.transport_bar(transport, &mut requests);
        self.view_panel(snapshot, &mut requests);
        if self.state.show_metrics {
            self.metrics_window(snapshot);
        }
        if self.state.show_legend {
            self.legend_window(snapshot);
        }

        (self.ctx.end_pass(), requests)
    }

    fn transport_bar(&mut self, transport: &TransportInfo, requests: &mut HudRequests) {
        egui::TopBottomPanel::bottom("transport").show(&self.ctx, |ui| {
            ui.horizontal(|ui| {
                let label = if transport.playing { "Pause" } else { "Play" };
                if ui.button(label).clicked() {
                    requests.toggle_play = true;
                }

                let mut speed = transport.speed;
                ui.label("Speed");
                if ui
                    .add(
                        egui::Slider::new(&mut speed, 0.25..=8.0)
                            .logarithmic(true)
                            .fixed_decimals(2),
                    )
                    .changed()
                {
                    requests.speed = Some(speed);
                }

                let mut step = transport.current;
                let last = transport.step_count.saturating_sub(1);
                ui.spacing_mut().slider_width = ui.available_width() - 220.0;
                if ui
                    .add(egui::Slider::new(&mut step, 0..=last).text("step"))
                    .changed()
                {
                    requests.seek = Some(step);
                }

                ui.label(format!(
                    "{} / {}  t = {:.0} s",
                    transport.current, last, transport.sim_time
                ));
            });
        });
    }

    fn view_panel(&mut self, snapshot: Option<&Snapshot>, requests: &mut HudRequests) {
        egui::SidePanel::right("view").default_width(220.0).show(&self.ctx, |ui| {
            ui.heading("View");

            ui.label("Substrate field");
            let field_names: Vec<String> = snapshot
                .and_then(|s| s.substrate_data.as_ref())
                .map(|s| s.field_names().iter().map(|n| n.to_string()).collect())
                .unwrap_or_default();
            let selected_label = self
                .state
                .selected_field
                .clone()
                .unwrap_or_else(|| "none".to_string());
            egui::ComboBox::from_id_salt("substrate_field")
                .selected_text(selected_label)
                .show_ui(ui, |ui| {
                    if ui
                        .selectable_label(self.state.selected_field.is_none(), "none")
                        .clicked()
                    {
                        self.state.selected_field = None;
                    }
                    for name in &field_names {
                        let selected = self.state.selected_field.as_deref() == Some(name);
                        if ui.selectable_label(selected, name).clicked() {
                            self.state.selected_field = Some(name.clone());
                        }
                    }
                });

            if let (Some(field), Some(substrate)) = (
                self.state.selected_field.as_deref(),
                snapshot.and_then(|s| s.substrate_data.as_ref()),
            ) {
                ui.small(format!(
                    "max {:.3}  mean {:.3}",
                    substrate.max_for(field),
                    substrate.mean_for(field).unwrap_or(0.0)
                ));
            }

            ui.add(
                egui::Slider::new(&mut self.state.substrate_opacity, 0.0..=1.0).text("opacity"),
            );

            ui.separator();
            ui.checkbox(&mut self.state.show_trails, "Trails");
            ui.checkbox(&mut self.state.detailed, "Detail glyphs");
            ui.checkbox(&mut self.state.show_metrics, "Metrics");
            ui.checkbox(&mut self.state.show_legend, "Legend");

            ui.separator();
            ui.label("Camera");
            ui.horizontal_wrapped(|ui| {
                for preset in CameraPreset::ALL {
                    if ui.button(preset.label()).clicked() {
                        requests.preset = Some(preset);
                    }
                }
            });
        });
    }

    fn metrics_window(&mut self, snapshot: Option<&Snapshot>) {
        egui::Window::new("Metrics")
            .default_width(240.0)
            .show(&self.ctx, |ui| {
                let Some(snapshot) = snapshot else {
                    ui.label("no data");
                    return;
                };
                ui.label(format!("Nanobots: {}", snapshot.nanobots.len()));
                ui.label(format!(
                    "Tumor cells: {} living / {}",
                    snapshot.living_cell_count(),
                    snapshot.tumor_cells.len()
                ));
                ui.label(format!("Vessels: {}", snapshot.vessels.len()));
                if !snapshot.metrics.is_empty() {
                    ui.separator();
                    let mut names: Vec<&String> = snapshot.metrics.keys().collect();
                    names.sort();
                    for name in names {
                        ui.label(format!("{name}: {:.2}", snapshot.metrics[name]));
                    }
                }
            });
    }

    fn legend_window(&mut self, snapshot: Option<&Snapshot>) {
        egui::Window::new("Legend")
            .default_width(220.0)
            .show(&self.ctx, |ui| {
                ui.label("Nanobot states");
                for state in [
                    NanobotState::Searching,
                    NanobotState::Targeting,
                    NanobotState::Delivering,
                    NanobotState::Returning,
                    NanobotState::Reloading,
                ] {
                    let color = nanobot_visual(state).color;
                    swatch_row(ui, color.to_array(), state.label());
                }
                ui.separator();
                ui.label("Cell phases");
                for phase in [
                    CellPhase::Viable,
                    CellPhase::Hypoxic,
                    CellPhase::Necrotic,
                    CellPhase::Apoptotic,
                ] {
                    let color = cell_visual(phase).color;
                    swatch_row(ui, color.to_array(), phase.label());
                }
                swatch_row(ui, vessel_visual().color.to_array(), "vessel");
                if let Some(substrate) = snapshot.and_then(|s| s.substrate_data.as_ref()) {
                    ui.separator();
                    ui.label("Substrate fields");
                    for name in substrate.field_names() {
                        swatch_row(ui, colormap::swatch(name), name);
                    }
                }
            });
    }

    /// Paint the egui output on top of the scene.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        screen_descriptor: ScreenDescriptor,
        output: egui::FullOutput,
    ) {
        for (id, image_delta) in &output.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }

        let paint_jobs = self.ctx.tessellate(output.shapes, output.pixels_per_point);
        let _command_buffers =
            self.renderer
                .update_buffers(device, queue, encoder, &paint_jobs, &screen_descriptor);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("hud_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.renderer
                .render(&mut render_pass.forget_lifetime(), &paint_jobs, &screen_descriptor);
        }

        for id in &output.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}

fn swatch_row(ui: &mut egui::Ui, color: [f32; 3], label: &str) {
    ui.horizontal(|ui| {
        let (rect, _) = ui.allocate_exact_size(egui::vec2(14.0, 14.0), egui::Sense::hover());
        ui.painter().rect_filled(
            rect,
            2.0,
            egui::Color32::from_rgb(
                (color[0] * 255.0) as u8,
                (color[1] * 255.0) as u8,
                (color[2] * 255.0) as u8,
            ),
        );
        ui.label(label);
    });
}
