//! Trail rendering as lit tube geometry.
//!
//! Each entity's smoothed movement history is thickened into a tube of
//! radial rings. Vertex alpha carries the history decay so trails fade
//! toward their oldest end. Mesh building is pure CPU work; the
//! renderer just owns growable vertex/index buffers and the pipeline.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Radial segments per tube ring. Trails are thin so a hexagonal cross
/// section reads as round.
pub const RADIAL_SEGMENTS: u32 = 6;

/// Tube radius in scene units.
pub const TUBE_RADIUS: f32 = 0.8;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct TubeVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct TubeCameraUniform {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 3],
    _padding: f32,
}

/// A stable perpendicular to `dir`, for seeding the first ring frame.
fn perpendicular(dir: Vec3) -> Vec3 {
    let axis = if dir.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
    dir.cross(axis).normalize_or_zero()
}

/// Thicken a polyline into tube geometry.
///
/// `alphas` supplies one opacity per path point (decay weights); the
/// two slices must be the same length. Paths shorter than 2 points
/// produce no geometry.
pub fn build_tube(
    path: &[Vec3],
    alphas: &[f32],
    radius: f32,
    color: [f32; 3],
) -> (Vec<TubeVertex>, Vec<u32>) {
    if path.len() < 2 || path.len() != alphas.len() {
        return (Vec::new(), Vec::new());
    }

    let mut vertices = Vec::with_capacity(path.len() * RADIAL_SEGMENTS as usize);
    let mut indices = Vec::new();

    for (i, &center) in path.iter().enumerate() {
        let dir = if i + 1 < path.len() {
            (path[i + 1] - path[i]).normalize_or_zero()
        } else {
            (path[i] - path[i - 1]).normalize_or_zero()
        };
        let dir = if dir == Vec3::ZERO { Vec3::Y } else { dir };
        let side = perpendicular(dir);
        let up = dir.cross(side).normalize_or_zero();

        for s in 0..RADIAL_SEGMENTS {
            let angle = s as f32 / RADIAL_SEGMENTS as f32 * std::f32::consts::TAU;
            let normal = side * angle.cos() + up * angle.sin();
            vertices.push(TubeVertex {
                position: (center + normal * radius).to_array(),
                normal: normal.to_array(),
                color: [color[0], color[1], color[2], alphas[i]],
            });
        }
    }

    for ring in 0..(path.len() as u32 - 1) {
        let base = ring * RADIAL_SEGMENTS;
        let next = base + RADIAL_SEGMENTS;
        for s in 0..RADIAL_SEGMENTS {
            let s1 = (s + 1) % RADIAL_SEGMENTS;
            indices.extend_from_slice(&[base + s, next + s, next + s1]);
            indices.extend_from_slice(&[base + s, next + s1, base + s1]);
        }
    }

    (vertices, indices)
}

pub struct TrailTubeRenderer {
    pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    vertex_capacity: usize,
    index_capacity: usize,
    index_count: u32,
}

impl TrailTubeRenderer {
    const INITIAL_VERTICES: usize = 4096;
    const INITIAL_INDICES: usize = 16384;

    pub fn new(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> Self {
        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Trail Tube Camera Buffer"),
            size: std::mem::size_of::<TubeCameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Trail Tube Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Trail Tube Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let vertex_buffer = Self::create_vertex_buffer(device, Self::INITIAL_VERTICES);
        let index_buffer = Self::create_index_buffer(device, Self::INITIAL_INDICES);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Trail Tube Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Trail Tube Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../shaders/trail_tube.wgsl").into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Trail Tube Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<TubeVertex>() as wgpu::BufferAddress,
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
                            format: wgpu::VertexFormat::Float32x3,
                        },
                        wgpu::VertexAttribute {
                            offset: 24,
                            shader_location: 2,
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
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            // Translucent: tested against entities but not written, so
            // overlapping trails do not punch holes in each other.
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
            index_buffer,
            vertex_capacity: Self::INITIAL_VERTICES,
            index_capacity: Self::INITIAL_INDICES,
            index_count: 0,
        }
    }

    fn create_vertex_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Trail Tube Vertex Buffer"),
            size: (capacity * std::mem::size_of::<TubeVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_index_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Trail Tube Index Buffer"),
            size: (capacity * std::mem::size_of::<u32>()) as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Upload the frame's combined tube mesh.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view_proj: Mat4,
        camera_pos: Vec3,
        vertices: &[TubeVertex],
        indices: &[u32],
    ) {
        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&TubeCameraUniform {
                view_proj: view_proj.to_cols_array_2d(),
                camera_pos: camera_pos.to_array(),
                _padding: 0.0,
            }),
        );

        self.index_count = indices.len() as u32;
        if vertices.is_empty() || indices.is_empty() {
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
        if indices.len() > self.index_capacity {
            let mut capacity = self.index_capacity;
            while capacity < indices.len() {
                capacity *= 2;
            }
            self.index_buffer = Self::create_index_buffer(device, capacity);
            self.index_capacity = capacity;
        }

        queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(vertices));
        queue.write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(indices));
    }

    pub fn render_in_pass(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        if self.index_count == 0 {
            return;
        }
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trails::{decay_alpha, smooth_path, TRAIL_CAP};

    #[test]
    fn two_point_history_yields_a_visible_tube() {
        let points = [Vec3::new(0.0, 5.0, 0.0), Vec3::new(20.0, 5.0, 0.0)];
        let path = smooth_path(&points, 4);
        let alphas: Vec<f32> = (0..path.len())
            .map(|i| decay_alpha(i, path.len(), TRAIL_CAP))
            .collect();
        let (vertices, indices) = build_tube(&path, &alphas, TUBE_RADIUS, [0.2, 0.9, 0.4]);
        assert!(!vertices.is_empty());
        assert!(!indices.is_empty());
        assert_eq!(indices.len() % 3, 0, "triangle list");
    }

    #[test]
    fn ring_topology_matches_path_length() {
        let path = [
            Vec3::ZERO,
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 5.0),
        ];
        let alphas = [0.2, 0.5, 1.0];
        let (vertices, indices) = build_tube(&path, &alphas, 1.0, [1.0; 3]);
        assert_eq!(vertices.len(), path.len() * RADIAL_SEGMENTS as usize);
        // (rings - 1) * segments quads, two triangles each
        assert_eq!(
            indices.len(),
            (path.len() - 1) * RADIAL_SEGMENTS as usize * 6
        );
        // Every index addresses a real vertex
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
    }

    #[test]
    fn vertex_alpha_carries_the_decay_weights() {
        let path = [Vec3::ZERO, Vec3::X, Vec3::new(2.0, 0.0, 0.0)];
        let alphas = [0.1, 0.5, 0.9];
        let (vertices, _) = build_tube(&path, &alphas, 1.0, [1.0; 3]);
        let seg = RADIAL_SEGMENTS as usize;
        assert_eq!(vertices[0].color[3], 0.1);
        assert_eq!(vertices[seg].color[3], 0.5);
        assert_eq!(vertices[2 * seg].color[3], 0.9);
    }

    #[test]
    fn degenerate_paths_produce_no_geometry() {
        let (v, i) = build_tube(&[Vec3::ZERO], &[1.0], 1.0, [1.0; 3]);
        assert!(v.is_empty() && i.is_empty());
        // Mismatched alphas are rejected rather than indexed past
        let (v, i) = build_tube(&[Vec3::ZERO, Vec3::X], &[1.0], 1.0, [1.0; 3]);
        assert!(v.is_empty() && i.is_empty());
    }

    #[test]
    fn normals_are_unit_length_and_radial() {
        let path = [Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)];
        let (vertices, _) = build_tube(&path, &[1.0, 1.0], 2.0, [1.0; 3]);
        for v in &vertices {
            let n = Vec3::from_array(v.normal);
            assert!((n.length() - 1.0).abs() < 1e-4);
        }
    }
}
