//! Frame composition over one snapshot.
//!
//! The composer owns every scene renderer plus the cross-step state
//! (trail histories, transition tables) and decides the draw order:
//! substrate overlay first, then entity spheres, then trail tubes and
//! line glyphs. Trails are appended exactly once per snapshot step, no
//! matter how many frames display that step.

use glam::Vec3;
use std::collections::HashSet;
use std::time::Instant;

use crate::domain::DomainTransform;
use crate::rendering::instances::{self, ClassInstances, SphereInstance, NANOBOT_RADIUS};
use crate::rendering::lines::{
    push_circle, push_domain_frame, push_ground_grid, push_line, push_scale_bar, LineRenderer,
    LineVertex,
};
use crate::rendering::spheres::SphereRenderer;
use crate::rendering::substrate::SubstrateRenderer;
use crate::rendering::trail_tubes::{build_tube, TrailTubeRenderer, TubeVertex, TUBE_RADIUS};
use crate::snapshot::{Snapshot, NANOBOT_PAYLOAD_CAPACITY};
use crate::trails::{decay_alpha, smooth_path, TrailTracker, TRAIL_CAP};
use crate::transition::TransitionTable;
use crate::ui::camera::OrbitCamera;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.02,
    b: 0.05,
    a: 1.0,
};

const TRAIL_COLOR: [f32; 3] = [0.30, 0.90, 0.45];
const TRAIL_SUBDIVISIONS: usize = 4;

/// Per-frame view options, driven by the HUD.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub selected_field: Option<String>,
    pub substrate_opacity: f32,
    pub show_trails: bool,
    pub detailed: bool,
}

/// Shift a class's local draw ranges into a combined instance array.
fn offset_ranges(built: &ClassInstances, base: u32) -> Vec<std::ops::Range<u32>> {
    built
        .ranges
        .iter()
        .map(|r| (r.start + base)..(r.end + base))
        .collect()
}

/// Line geometry for one frame: always-on scaffolding plus the
/// detail glyphs. Pure so it can be tested without a device.
fn build_scaffold(
    domain: &DomainTransform,
    tumor_radius: f32,
    snapshot: Option<&Snapshot>,
    trails: &TrailTracker,
    detailed: bool,
) -> Vec<LineVertex> {
    let mut out = Vec::new();
    let extent = domain.domain_size();

    push_ground_grid(&mut out, extent, extent / 12.0, [0.25, 0.28, 0.35, 0.15]);
    push_domain_frame(&mut out, extent, [0.45, 0.5, 0.6, 0.5]);
    push_circle(
        &mut out,
        Vec3::new(0.0, 0.3, 0.0),
        tumor_radius,
        64,
        [0.9, 0.3, 0.3, 0.45],
    );

    let Some(snapshot) = snapshot else {
        return out;
    };

    // Externally controlled nanobots are marked in every view.
    for bot in &snapshot.nanobots {
        if bot.is_llm_controlled {
            let center = domain.bot_to_scene(bot.position.into());
            if center.is_finite() {
                push_circle(
                    &mut out,
                    center,
                    NANOBOT_RADIUS * 2.2,
                    20,
                    [0.95, 0.95, 0.3, 0.8],
                );
            }
        }
    }

    if !detailed {
        return out;
    }

    push_scale_bar(
        &mut out,
        Vec3::new(-extent * 0.45, 0.2, extent * 0.47),
        100.0,
        [0.85, 0.85, 0.85, 0.8],
    );

    for vessel in &snapshot.vessels {
        let center = domain.to_scene(vessel.position.into());
        if center.is_finite() {
            push_circle(
                &mut out,
                Vec3::new(center.x, 0.25, center.z),
                vessel.supply_radius,
                40,
                [0.9, 0.2, 0.2, 0.35],
            );
        }
    }

    for bot in &snapshot.nanobots {
        let center = domain.bot_to_scene(bot.position.into());
        if !center.is_finite() {
            continue;
        }

        // Heading glyph from the last two trail points
        if let Some(history) = trails.get(bot.id) {
            if history.len() >= 2 {
                let prev = history[history.len() - 2];
                let dir = (center - prev).normalize_or_zero();
                if dir != Vec3::ZERO {
                    push_line(
                        &mut out,
                        center,
                        center + dir * NANOBOT_RADIUS * 3.0,
                        [1.0, 1.0, 1.0, 0.7],
                    );
                }
            }
        }

        // Payload bar above the glyph
        let fill = (bot.drug_payload / NANOBOT_PAYLOAD_CAPACITY).clamp(0.0, 1.0);
        let base = center + Vec3::new(0.0, NANOBOT_RADIUS * 2.0, 0.0);
        push_line(
            &mut out,
            base,
            base + Vec3::new(0.0, NANOBOT_RADIUS * 2.0 * fill, 0.0),
            [0.2, 1.0, 0.4, 0.9],
        );
    }

    out
}

pub struct SceneComposer {
    spheres: SphereRenderer,
    substrate: SubstrateRenderer,
    tubes: TrailTubeRenderer,
    lines: LineRenderer,

    trails: TrailTracker,
    bot_transitions: TransitionTable,
    cell_transitions: TransitionTable,

    domain: DomainTransform,
    tumor_radius: f32,
    depth_view: wgpu::TextureView,
    start: Instant,
    last_step: Option<u64>,
}

impl SceneComposer {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        domain_size: f32,
        tumor_radius: f32,
    ) -> Self {
        let domain = DomainTransform::new(domain_size);
        Self {
            spheres: SphereRenderer::new(device, config, 4096),
            substrate: SubstrateRenderer::new(device, config, &domain),
            tubes: TrailTubeRenderer::new(device, config),
            lines: LineRenderer::new(device, config),
            trails: TrailTracker::new(),
            bot_transitions: TransitionTable::new(8.0),
            cell_transitions: TransitionTable::new(8.0),
            domain,
            tumor_radius,
            depth_view: Self::create_depth_view(device, config.width, config.height),
            start: Instant::now(),
            last_step: None,
        }
    }

    fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Scene Depth Texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.depth_view = Self::create_depth_view(device, width, height);
    }

    pub fn domain(&self) -> &DomainTransform {
        &self.domain
    }

    /// Drop all accumulated run state after a backward seek or restart.
    pub fn reset_run(&mut self) {
        self.trails.clear();
        self.bot_transitions.clear();
        self.cell_transitions.clear();
        self.substrate.clear();
        self.last_step = None;
    }

    /// Fold a newly displayed step into the cross-step state. Called
    /// every frame; only does work when the step actually changed.
    fn ingest(&mut self, snapshot: &Snapshot) {
        if self.last_step == Some(snapshot.step) {
            return;
        }
        self.last_step = Some(snapshot.step);

        let mut live: HashSet<u64> = HashSet::with_capacity(snapshot.nanobots.len());
        for bot in &snapshot.nanobots {
            let scene = self.domain.bot_to_scene(bot.position.into());
            if scene.is_finite() {
                self.trails.append(bot.id, scene);
            }
            live.insert(bot.id);
        }
        self.trails.retain_ids(&live);
        self.bot_transitions.prune(&live);

        let live_cells: HashSet<u64> = snapshot.tumor_cells.iter().map(|c| c.id).collect();
        self.cell_transitions.prune(&live_cells);
    }

    fn build_trail_mesh(&self) -> (Vec<TubeVertex>, Vec<u32>) {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        for id in self.trails.ids() {
            let Some(history) = self.trails.get(id) else {
                continue;
            };
            let points: Vec<Vec3> = history.iter().copied().collect();
            let path = smooth_path(&points, TRAIL_SUBDIVISIONS);
            if path.len() < 2 {
                continue;
            }
            let cap = TRAIL_CAP * TRAIL_SUBDIVISIONS;
            let alphas: Vec<f32> = (0..path.len())
                .map(|i| decay_alpha(i, path.len(), cap))
                .collect();
            let (mut v, i) = build_tube(&path, &alphas, TUBE_RADIUS, TRAIL_COLOR);
            let base = vertices.len() as u32;
            indices.extend(i.into_iter().map(|idx| idx + base));
            vertices.append(&mut v);
        }
        (vertices, indices)
    }

    /// Render one frame into `view`.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        camera: &OrbitCamera,
        aspect: f32,
        snapshot: Option<&Snapshot>,
        view_state: &ViewState,
        dt: f32,
    ) {
        if let Some(snapshot) = snapshot {
            self.ingest(snapshot);
        }

        let view_proj = camera.view_proj(aspect);
        let camera_pos = camera.position();
        let time = self.start.elapsed().as_secs_f32();

        // Combine all classes into one instance upload; one range per
        // draw keeps the strategies' draw granularity intact.
        let mut all_instances: Vec<SphereInstance> = Vec::new();
        let mut all_ranges = Vec::new();
        if let Some(snapshot) = snapshot {
            let bots = instances::build_nanobots(
                &snapshot.nanobots,
                &self.domain,
                &mut self.bot_transitions,
                dt,
            );
            all_ranges.extend(offset_ranges(&bots, all_instances.len() as u32));
            all_instances.extend(bots.instances);

            let cells = instances::build_tumor_cells(
                &snapshot.tumor_cells,
                &self.domain,
                &mut self.cell_transitions,
                dt,
            );
            all_ranges.extend(offset_ranges(&cells, all_instances.len() as u32));
            all_instances.extend(cells.instances);

            let vessels = instances::build_vessels(&snapshot.vessels, &self.domain);
            all_ranges.extend(offset_ranges(&vessels, all_instances.len() as u32));
            all_instances.extend(vessels.instances);
        }

        self.spheres.prepare(queue, view_proj, camera_pos, time);

        let mut draw_substrate = false;
        if let (Some(snapshot), Some(field)) = (snapshot, view_state.selected_field.as_deref()) {
            if let Some(substrate) = &snapshot.substrate_data {
                self.substrate.prepare(
                    device,
                    queue,
                    snapshot.step,
                    substrate,
                    field,
                    view_state.substrate_opacity,
                    &self.domain,
                    view_proj,
                );
                draw_substrate = true;
            } else {
                self.substrate.clear();
            }
        } else {
            self.substrate.clear();
        }

        if view_state.show_trails {
            let (vertices, indices) = self.build_trail_mesh();
            self.tubes
                .prepare(device, queue, view_proj, camera_pos, &vertices, &indices);
        } else {
            self.tubes.prepare(device, queue, view_proj, camera_pos, &[], &[]);
        }

        let scaffold = build_scaffold(
            &self.domain,
            self.tumor_radius,
            snapshot,
            &self.trails,
            view_state.detailed,
        );
        self.lines.prepare(device, queue, view_proj, &scaffold);

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if draw_substrate {
            self.substrate.render_in_pass(&mut render_pass);
        }
        self.spheres
            .render_in_pass(&mut render_pass, device, queue, &all_instances, &all_ranges);
        if view_state.show_trails {
            self.tubes.render_in_pass(&mut render_pass);
        }
        self.lines.render_in_pass(&mut render_pass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Nanobot, NanobotState};
    use std::collections::HashMap;

    fn bot(id: u64, x: f32, y: f32, llm: bool, payload: f32) -> Nanobot {
        Nanobot {
            id,
            position: [x, y],
            state: NanobotState::Searching,
            drug_payload: payload,
            deliveries_made: 0,
            total_drug_delivered: 0.0,
            is_llm_controlled: llm,
            has_target: false,
        }
    }

    fn snapshot_with(nanobots: Vec<Nanobot>) -> Snapshot {
        Snapshot {
            step: 0,
            time: 0.0,
            nanobots,
            tumor_cells: Vec::new(),
            vessels: Vec::new(),
            substrate_data: None,
            metrics: HashMap::new(),
        }
    }

    #[test]
    fn offset_ranges_shift_by_the_instance_base() {
        let built = ClassInstances {
            strategy: crate::rendering::population::RenderStrategy::Batched,
            instances: Vec::new(),
            ranges: vec![0..3, 3..7],
        };
        assert_eq!(offset_ranges(&built, 10), vec![10..13, 13..17]);
    }

    #[test]
    fn scaffold_without_a_snapshot_is_just_the_static_frame() {
        let domain = DomainTransform::new(600.0);
        let trails = TrailTracker::new();
        let scaffold = build_scaffold(&domain, 200.0, None, &trails, true);
        assert!(!scaffold.is_empty(), "grid, frame and tumor ring remain");
    }

    #[test]
    fn llm_markers_show_even_in_simple_view() {
        let domain = DomainTransform::new(600.0);
        let trails = TrailTracker::new();
        let plain = snapshot_with(vec![bot(0, 300.0, 300.0, false, 0.0)]);
        let marked = snapshot_with(vec![bot(0, 300.0, 300.0, true, 0.0)]);
        let without = build_scaffold(&domain, 200.0, Some(&plain), &trails, false);
        let with = build_scaffold(&domain, 200.0, Some(&marked), &trails, false);
        assert!(with.len() > without.len());
    }

    #[test]
    fn detailed_view_adds_payload_and_scale_glyphs() {
        let domain = DomainTransform::new(600.0);
        let trails = TrailTracker::new();
        let snapshot = snapshot_with(vec![bot(0, 300.0, 300.0, false, 10.0)]);
        let simple = build_scaffold(&domain, 200.0, Some(&snapshot), &trails, false);
        let detailed = build_scaffold(&domain, 200.0, Some(&snapshot), &trails, true);
        assert!(detailed.len() > simple.len());
    }

    #[test]
    fn heading_glyph_requires_two_trail_points() {
        let domain = DomainTransform::new(600.0);
        let mut trails = TrailTracker::new();
        let snapshot = snapshot_with(vec![bot(7, 310.0, 300.0, false, 0.0)]);

        let before = build_scaffold(&domain, 200.0, Some(&snapshot), &trails, true);
        trails.append(7, Vec3::new(0.0, 5.0, 0.0));
        trails.append(7, domain.bot_to_scene([310.0, 300.0].into()));
        let after = build_scaffold(&domain, 200.0, Some(&snapshot), &trails, true);
        assert!(after.len() > before.len());
    }
}
