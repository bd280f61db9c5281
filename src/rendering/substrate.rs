//! Substrate field overlay: scalar grid to ground-plane texture.
//!
//! One selected field per frame is encoded to an RGBA texture and drawn
//! as a translucent quad on the ground plane, scaled to the domain so
//! texels stay registered with entity positions. Encoding only happens
//! when the inputs actually change; an unchanged (step, field, max,
//! opacity) key reuses the texture from the previous frame.

use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::colormap;
use crate::domain::DomainTransform;
use crate::snapshot::SubstrateData;

/// Inputs that determine the texture contents. Float inputs are
/// compared by bit pattern so the key is `Eq`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EncodeKey {
    step: u64,
    field: String,
    max_bits: u32,
    opacity_bits: u32,
    width: u32,
    height: u32,
}

/// Encode one grid into RGBA8 pixels, row-major, one texel per grid
/// sample. Grids arrive already transposed so `grid[y][x]` is texel
/// (x, y).
pub fn encode_pixels(grid: &[Vec<f32>], field: &str, max_value: f32, opacity: f32) -> Vec<u8> {
    let height = grid.len();
    let width = grid.first().map(|row| row.len()).unwrap_or(0);
    let mut pixels = Vec::with_capacity(width * height * 4);
    for row in grid {
        for x in 0..width {
            let value = row.get(x).copied().unwrap_or(0.0);
            pixels.extend_from_slice(&colormap::encode_rgba8(value, field, max_value, opacity));
        }
    }
    pixels
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct OverlayVertex {
    position: [f32; 3],
    uv: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct OverlayUniform {
    view_proj: [[f32; 4]; 4],
}

pub struct SubstrateRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    texture: Option<wgpu::Texture>,
    texture_bind_group: Option<wgpu::BindGroup>,
    last_key: Option<EncodeKey>,
    quad_domain_size: f32,
}

impl SubstrateRenderer {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        domain: &DomainTransform,
    ) -> Self {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Substrate Uniform Buffer"),
            size: std::mem::size_of::<OverlayUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Substrate Quad Buffer"),
            contents: bytemuck::cast_slice(&Self::quad_vertices(domain.domain_size())),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        // Nearest filtering keeps grid cells crisp instead of smearing
        // concentration boundaries.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Substrate Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Substrate Uniform Bind Group Layout"),
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

        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Substrate Texture Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Substrate Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Substrate Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout, &texture_bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Substrate Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../shaders/substrate.wgsl").into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Substrate Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<OverlayVertex>() as wgpu::BufferAddress,
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
                            format: wgpu::VertexFormat::Float32x2,
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
            // Translucent overlay: tested against depth but never
            // written, so entities above it always draw on top.
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
            uniform_buffer,
            uniform_bind_group,
            vertex_buffer,
            sampler,
            texture_bind_group_layout,
            texture: None,
            texture_bind_group: None,
            last_key: None,
            quad_domain_size: domain.domain_size(),
        }
    }

    fn quad_vertices(domain_size: f32) -> [OverlayVertex; 6] {
        let h = domain_size * 0.5;
        let v = |x: f32, z: f32, u: f32, w: f32| OverlayVertex {
            position: [x, 0.0, z],
            uv: [u, w],
        };
        [
            v(-h, -h, 0.0, 0.0),
            v(h, -h, 1.0, 0.0),
            v(h, h, 1.0, 1.0),
            v(-h, -h, 0.0, 0.0),
            v(h, h, 1.0, 1.0),
            v(-h, h, 0.0, 1.0),
        ]
    }

    /// Re-encode the selected field if any encoding input changed, then
    /// remember the key so identical frames skip the work.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        step: u64,
        substrate: &SubstrateData,
        field: &str,
        opacity: f32,
        domain: &DomainTransform,
        view_proj: Mat4,
    ) {
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&OverlayUniform {
                view_proj: view_proj.to_cols_array_2d(),
            }),
        );

        if (self.quad_domain_size - domain.domain_size()).abs() > f32::EPSILON {
            self.quad_domain_size = domain.domain_size();
            queue.write_buffer(
                &self.vertex_buffer,
                0,
                bytemuck::cast_slice(&Self::quad_vertices(self.quad_domain_size)),
            );
        }

        let Some(grid) = substrate.grid(field) else {
            self.clear();
            return;
        };
        let width = grid.first().map(|row| row.len()).unwrap_or(0) as u32;
        let height = grid.len() as u32;
        if width == 0 || height == 0 {
            self.clear();
            return;
        }

        let max_value = substrate.max_for(field);
        let key = EncodeKey {
            step,
            field: field.to_string(),
            max_bits: max_value.to_bits(),
            opacity_bits: opacity.to_bits(),
            width,
            height,
        };
        if self.last_key.as_ref() == Some(&key) {
            return;
        }

        log::debug!("re-encoding substrate field '{field}' ({width}x{height}) for step {step}");
        let pixels = encode_pixels(grid, field, max_value, opacity);

        let needs_new_texture = match &self.texture {
            Some(t) => t.width() != width || t.height() != height,
            None => true,
        };
        if needs_new_texture {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("Substrate Field Texture"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            self.texture_bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Substrate Texture Bind Group"),
                layout: &self.texture_bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            }));
            self.texture = Some(texture);
        }

        if let Some(texture) = &self.texture {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &pixels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * width),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }
        self.last_key = Some(key);
    }

    /// Forget the cached field, e.g. when the selection moves to a
    /// field the current step does not carry.
    pub fn clear(&mut self) {
        self.last_key = None;
        self.texture = None;
        self.texture_bind_group = None;
    }

    pub fn render_in_pass(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        let Some(texture_bind_group) = &self.texture_bind_group else {
            return;
        };
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        render_pass.set_bind_group(1, texture_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.draw(0..6, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn substrate(json: &str) -> SubstrateData {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn pixels_are_row_major_one_texel_per_sample() {
        let grid = vec![vec![0.0, 1.0], vec![0.5, 0.25]];
        let pixels = encode_pixels(&grid, "oxygen", 1.0, 1.0);
        assert_eq!(pixels.len(), 2 * 2 * 4);
        // texel (1, 0) is the second pixel; full-strength value
        let full = &pixels[4..8];
        assert_eq!(full[3], 255, "max value has full alpha");
        // texel (0, 0) is zero concentration
        assert_eq!(pixels[3], 0, "zero value is fully transparent");
    }

    #[test]
    fn opacity_scales_alpha_globally() {
        let grid = vec![vec![1.0]];
        let opaque = encode_pixels(&grid, "drug", 1.0, 1.0);
        let faint = encode_pixels(&grid, "drug", 1.0, 0.25);
        assert!(faint[3] < opaque[3]);
        assert_eq!(faint[3], (0.25f32 * 255.0).round() as u8);
    }

    #[test]
    fn ragged_rows_pad_with_transparent_texels() {
        let grid = vec![vec![1.0, 1.0], vec![1.0]];
        let pixels = encode_pixels(&grid, "trail", 1.0, 1.0);
        assert_eq!(pixels.len(), 2 * 2 * 4);
        // The missing sample renders as zero concentration
        assert_eq!(pixels[15], 0);
    }

    #[test]
    fn encode_key_changes_with_each_input() {
        let base = EncodeKey {
            step: 3,
            field: "oxygen".into(),
            max_bits: 1.0f32.to_bits(),
            opacity_bits: 0.7f32.to_bits(),
            width: 60,
            height: 60,
        };
        assert_eq!(base, base.clone());
        assert_ne!(base, EncodeKey { step: 4, ..base.clone() });
        assert_ne!(
            base,
            EncodeKey {
                field: "drug".into(),
                ..base.clone()
            }
        );
        assert_ne!(
            base,
            EncodeKey {
                opacity_bits: 0.5f32.to_bits(),
                ..base.clone()
            }
        );
    }

    #[test]
    fn missing_field_resolves_to_no_grid() {
        let data = substrate(r#"{"oxygen": [[1.0]], "drug": null}"#);
        assert!(data.grid("drug").is_none());
        assert!(data.grid("perforin").is_none());
        assert!(data.grid("oxygen").is_some());
    }
}
