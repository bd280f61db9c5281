//! Line-list rendering for scene scaffolding and overlay glyphs.
//!
//! One growable vertex buffer redrawn each frame: ground grid, domain
//! frame, tumor boundary ring, vessel supply rings, scale bar, and the
//! per-entity detail glyphs (direction indicators, payload bars, marker
//! rings). Everything is plain `LineList` geometry with vertex color.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct LineCameraUniform {
    view_proj: [[f32; 4]; 4],
}

/// Append one segment to a line-list vertex vec.
pub fn push_line(out: &mut Vec<LineVertex>, from: Vec3, to: Vec3, color: [f32; 4]) {
    out.push(LineVertex {
        position: from.to_array(),
        color,
    });
    out.push(LineVertex {
        position: to.to_array(),
        color,
    });
}

/// A circle on the ground plane (XZ) at the given height.
pub fn push_circle(
    out: &mut Vec<LineVertex>,
    center: Vec3,
    radius: f32,
    segments: u32,
    color: [f32; 4],
) {
    let segments = segments.max(3);
    let mut previous = center + Vec3::new(radius, 0.0, 0.0);
    for s in 1..=segments {
        let angle = s as f32 / segments as f32 * std::f32::consts::TAU;
        let next = center + Vec3::new(radius * angle.cos(), 0.0, radius * angle.sin());
        push_line(out, previous, next, color);
        previous = next;
    }
}

/// Regular grid across the ground plane, centered on the origin.
pub fn push_ground_grid(out: &mut Vec<LineVertex>, extent: f32, spacing: f32, color: [f32; 4]) {
    if spacing <= 0.0 || extent <= 0.0 {
        return;
    }
    let half = extent * 0.5;
    let lines = (extent / spacing).floor() as i32;
    for i in 0..=lines {
        let offset = -half + i as f32 * spacing;
        push_line(
            out,
            Vec3::new(offset, 0.0, -half),
            Vec3::new(offset, 0.0, half),
            color,
        );
        push_line(
            out,
            Vec3::new(-half, 0.0, offset),
            Vec3::new(half, 0.0, offset),
            color,
        );
    }
}

/// The domain boundary as a square frame on the ground plane.
pub fn push_domain_frame(out: &mut Vec<LineVertex>, extent: f32, color: [f32; 4]) {
    let h = extent * 0.5;
    let corners = [
        Vec3::new(-h, 0.0, -h),
        Vec3::new(h, 0.0, -h),
        Vec3::new(h, 0.0, h),
        Vec3::new(-h, 0.0, h),
    ];
    for i in 0..4 {
        push_line(out, corners[i], corners[(i + 1) % 4], color);
    }
}

/// A physical scale bar with end ticks, placed near the domain edge.
pub fn push_scale_bar(out: &mut Vec<LineVertex>, origin: Vec3, length: f32, color: [f32; 4]) {
    let end = origin + Vec3::new(length, 0.0, 0.0);
    push_line(out, origin, end, color);
    let tick = Vec3::new(0.0, 0.0, length * 0.05);
    push_line(out, origin - tick, origin + tick, color);
    push_line(out, end - tick, end + tick, color);
}

pub struct LineRenderer {
    pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    vertex_capacity: usize,
    vertex_count: u32,
}

impl LineRenderer {
    const INITIAL_VERTICES: usize = 8192;

    pub fn new(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> Self {
        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Line Camera Buffer"),
            size: std::mem::size_of::<LineCameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Line Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Line Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let vertex_buffer = Self::create_vertex_buffer(device, Self::INITIAL_VERTICES);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Line Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Line Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../shaders/lines.wgsl").into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Line Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<LineVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[
                        wgpu::VertexAttribute {
                            offset: 0,
                            shader_location: 0,
                            format: wgpu::VertexFormat::Float32x3,
                        },
                        wgpu::VertexAttribute {
                            offset: 12,
                            shader_location: 1,
                            format: wgpu::VertexFormat::Float32x4,
                        },
                    ],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            camera_buffer,
            bind_group,
            vertex_buffer,
            vertex_capacity: Self::INITIAL_VERTICES,
            vertex_count: 0,
        }
    }

    fn create_vertex_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Line Vertex Buffer"),
            size: (capacity * std::mem::size_of::<LineVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view_proj: Mat4,
        vertices: &[LineVertex],
    ) {
        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&LineCameraUniform {
                view_proj: view_proj.to_cols_array_2d(),
            }),
        );

        self.vertex_count = vertices.len() as u32;
        if vertices.is_empty() {
            return;
        }
        if vertices.len() > self.vertex_capacity {
            let mut capacity = self.vertex_capacity;
            while capacity < vertices.len() {
                capacity *= 2;
            }
            self.vertex_buffer = Self::create_vertex_buffer(device, capacity);
            self.vertex_capacity = capacity;
        }
        queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(vertices));
    }

    pub fn render_in_pass(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        if self.vertex_count == 0 {
            return;
        }
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.draw(0..self.vertex_count, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

    #[test]
    fn circle_closes_back_on_its_start() {
        let mut out = Vec::new();
        push_circle(&mut out, Vec3::ZERO, 10.0, 32, WHITE);
        assert_eq!(out.len(), 32 * 2);
        let first = Vec3::from_array(out[0].position);
        let last = Vec3::from_array(out[out.len() - 1].position);
        assert!(first.distance(last) < 1e-4);
    }

    #[test]
    fn grid_covers_both_axes_evenly() {
        let mut out = Vec::new();
        push_ground_grid(&mut out, 600.0, 50.0, WHITE);
        // 13 lines per axis (inclusive of both edges), 2 verts per line
        assert_eq!(out.len(), 13 * 2 * 2);
        // Degenerate inputs draw nothing
        let mut none = Vec::new();
        push_ground_grid(&mut none, 600.0, 0.0, WHITE);
        assert!(none.is_empty());
    }

    #[test]
    fn frame_has_four_edges() {
        let mut out = Vec::new();
        push_domain_frame(&mut out, 600.0, WHITE);
        assert_eq!(out.len(), 8);
        for v in &out {
            assert_eq!(v.position[1], 0.0, "frame lies on the ground plane");
            assert!(v.position[0].abs() <= 300.0 + 1e-4);
            assert!(v.position[2].abs() <= 300.0 + 1e-4);
        }
    }

    #[test]
    fn scale_bar_has_a_body_and_two_ticks() {
        let mut out = Vec::new();
        push_scale_bar(&mut out, Vec3::new(-250.0, 0.0, 280.0), 100.0, WHITE);
        assert_eq!(out.len(), 6);
        let body_len =
            Vec3::from_array(out[0].position).distance(Vec3::from_array(out[1].position));
        assert!((body_len - 100.0).abs() < 1e-4);
    }
}
