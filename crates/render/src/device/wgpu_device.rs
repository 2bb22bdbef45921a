//! Offscreen wgpu backend.
//!
//! Every pass is recorded into its own command buffer and submitted right
//! away; `finish_frame` copies the resolved target into a readback buffer.

use wgpu::util::DeviceExt;

use super::{check_size, texel_count, DrawCall, FrameStats, GraphicsDevice, Pass};
use crate::error::RenderError;
use crate::geometry::StrandGeometryBuffer;
use crate::gpu_types::{FrameUniforms, StrandVertex, MAX_LIGHTS};

const STRAND_SHADER: &str = include_str!("../shaders/strand.wgsl");
const RESOLVE_SHADER: &str = include_str!("../shaders/resolve.wgsl");

const ACCUM_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
const REVEAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R16Float;
const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const SHADOW_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const SHADOW_OPACITY_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Light index for the shadow passes, padded to 16 bytes.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct PassInfo {
    light: u32,
    _pad: [u32; 3],
}

struct Layouts {
    frame: wgpu::BindGroupLayout,
    shadow_read: wgpu::BindGroupLayout,
    lighting: wgpu::BindGroupLayout,
    resolve: wgpu::BindGroupLayout,
}

struct Pipelines {
    shadow_depth: wgpu::RenderPipeline,
    shadow_opacity: wgpu::RenderPipeline,
    accumulate: wgpu::RenderPipeline,
    resolve: wgpu::RenderPipeline,
}

struct ShadowTargets {
    resolution: u32,
    depth: wgpu::Texture,
    opacity: wgpu::Texture,
    /// Bind group for the opacity pass, which reads the front depth.
    read_front: wgpu::BindGroup,
    /// Bind group for the accumulate pass, which reads both maps.
    lighting: wgpu::BindGroup,
}

struct FrameTargets {
    accum: wgpu::TextureView,
    reveal: wgpu::TextureView,
    output: wgpu::Texture,
    output_view: wgpu::TextureView,
    resolve: wgpu::BindGroup,
}

struct GeometryBuffers {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    width: u32,
    height: u32,
    layouts: Layouts,
    pipelines: Pipelines,
    uniform_buffer: wgpu::Buffer,
    frame_groups: Vec<wgpu::BindGroup>,
    shadows: ShadowTargets,
    targets: FrameTargets,
    geometry: Option<GeometryBuffers>,
    frame: u64,
    draws: u32,
    background: [u8; 4],
    pixels: Option<Vec<u8>>,
}

impl WgpuDevice {
    /// Open the default adapter and allocate offscreen targets.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Device`] when no adapter or device is available
    /// and [`RenderError::InvalidViewport`] for a zero-sized target.
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        check_size(width, height)?;
        pollster::block_on(Self::new_async(width, height))
    }

    async fn new_async(width: u32, height: u32) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| RenderError::Device("no suitable adapter".into()))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Strand Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|e| RenderError::Device(e.to_string()))?;
        tracing::info!(adapter = ?adapter.get_info().name, "wgpu device ready");

        let layouts = create_layouts(&device);
        let pipelines = create_pipelines(&device, &layouts);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_groups = (0..MAX_LIGHTS)
            .map(|light| {
                let info = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Pass Info"),
                    contents: bytemuck::cast_slice(&[PassInfo {
                        light: light as u32,
                        _pad: [0; 3],
                    }]),
                    usage: wgpu::BufferUsages::UNIFORM,
                });
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Frame Bind Group"),
                    layout: &layouts.frame,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: uniform_buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: info.as_entire_binding(),
                        },
                    ],
                })
            })
            .collect();

        let shadows = create_shadow_targets(&device, &layouts, 1);
        let targets = create_frame_targets(&device, &layouts, &uniform_buffer, width, height);

        Ok(Self {
            device,
            queue,
            width,
            height,
            layouts,
            pipelines,
            uniform_buffer,
            frame_groups,
            shadows,
            targets,
            geometry: None,
            frame: 0,
            draws: 0,
            background: [0; 4],
            pixels: None,
        })
    }

    fn ensure_shadow_resolution(&mut self, resolution: u32) {
        let resolution = resolution.clamp(1, self.device.limits().max_texture_dimension_2d);
        if self.shadows.resolution != resolution {
            self.shadows = create_shadow_targets(&self.device, &self.layouts, resolution);
            tracing::debug!(resolution, "shadow maps reallocated");
        }
    }

    fn encode_pass(&self, pass: Pass, index_count: u32) -> wgpu::CommandBuffer {
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Strand Pass Encoder"),
        });
        match pass {
            Pass::ShadowDepth { light } => {
                let view = layer_view(&self.shadows.depth, light);
                let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Shadow Depth Pass"),
                    color_attachments: &[],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                rpass.set_pipeline(&self.pipelines.shadow_depth);
                rpass.set_bind_group(0, &self.frame_groups[light], &[]);
                self.draw_strands(&mut rpass, index_count);
            }
            Pass::ShadowOpacity { light } => {
                let view = layer_view(&self.shadows.opacity, light);
                let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Shadow Opacity Pass"),
                    color_attachments: &[Some(clear_attachment(&view, wgpu::Color::TRANSPARENT))],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                rpass.set_pipeline(&self.pipelines.shadow_opacity);
                rpass.set_bind_group(0, &self.frame_groups[light], &[]);
                rpass.set_bind_group(1, &self.shadows.read_front, &[]);
                self.draw_strands(&mut rpass, index_count);
            }
            Pass::Accumulate => {
                let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Accumulate Pass"),
                    color_attachments: &[
                        Some(clear_attachment(&self.targets.accum, wgpu::Color::TRANSPARENT)),
                        Some(clear_attachment(&self.targets.reveal, wgpu::Color::WHITE)),
                    ],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                rpass.set_pipeline(&self.pipelines.accumulate);
                rpass.set_bind_group(0, &self.frame_groups[0], &[]);
                rpass.set_bind_group(1, &self.shadows.lighting, &[]);
                self.draw_strands(&mut rpass, index_count);
            }
            Pass::Resolve => {
                let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Resolve Pass"),
                    color_attachments: &[Some(clear_attachment(&self.targets.output_view, wgpu::Color::BLACK))],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                rpass.set_pipeline(&self.pipelines.resolve);
                rpass.set_bind_group(0, &self.targets.resolve, &[]);
                rpass.draw(0..3, 0..1);
            }
        }
        encoder.finish()
    }

    fn draw_strands<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, index_count: u32) {
        let Some(geometry) = &self.geometry else {
            return;
        };
        let count = index_count.min(geometry.index_count);
        if count == 0 {
            return;
        }
        rpass.set_vertex_buffer(0, geometry.vertices.slice(..));
        rpass.set_index_buffer(geometry.indices.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..count, 0, 0..1);
    }

    fn read_output(&self) -> Result<Vec<u8>, RenderError> {
        let unpadded = self.width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: u64::from(padded) * u64::from(self.height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.targets.output,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| RenderError::Device(e.to_string()))?
            .map_err(|e| RenderError::Device(e.to_string()))?;

        let mapped = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity(texel_count(unpadded, self.height));
        for row in mapped.chunks_exact(padded as usize) {
            pixels.extend_from_slice(&row[..unpadded as usize]);
        }
        drop(mapped);
        buffer.unmap();
        Ok(pixels)
    }
}

impl GraphicsDevice for WgpuDevice {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        check_size(width, height)?;
        let max = self.device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(RenderError::InvalidViewport { width, height });
        }
        self.width = width;
        self.height = height;
        self.targets = create_frame_targets(&self.device, &self.layouts, &self.uniform_buffer, width, height);
        self.pixels = None;
        tracing::debug!(width, height, "wgpu targets resized");
        Ok(())
    }

    fn submit_geometry(&mut self, geometry: &StrandGeometryBuffer) -> Result<(), RenderError> {
        if geometry.is_empty() {
            self.geometry = None;
            return Ok(());
        }
        let index_count = u32::try_from(geometry.indices.len())
            .map_err(|_| RenderError::Device("index count exceeds u32".into()))?;
        let vertex_bytes: &[u8] = bytemuck::cast_slice::<StrandVertex, u8>(&geometry.vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(&geometry.indices);

        let fits = self.geometry.as_ref().is_some_and(|g| {
            g.vertices.size() >= vertex_bytes.len() as u64 && g.indices.size() >= index_bytes.len() as u64
        });
        if fits {
            if let Some(g) = self.geometry.as_mut() {
                self.queue.write_buffer(&g.vertices, 0, vertex_bytes);
                self.queue.write_buffer(&g.indices, 0, index_bytes);
                g.index_count = index_count;
            }
        } else {
            let vertices = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Strand Vertices"),
                contents: vertex_bytes,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
            let indices = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Strand Indices"),
                contents: index_bytes,
                usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            });
            tracing::debug!(vertices = geometry.vertices.len(), "strand buffers grown");
            self.geometry = Some(GeometryBuffers {
                vertices,
                indices,
                index_count,
            });
        }
        Ok(())
    }

    fn submit_draw(&mut self, draw: &DrawCall<'_>) -> Result<(), RenderError> {
        if let Pass::ShadowDepth { light } | Pass::ShadowOpacity { light } = draw.pass {
            if light >= MAX_LIGHTS {
                return Err(RenderError::Device(format!("light {light} exceeds {MAX_LIGHTS}")));
            }
        }
        if let Pass::ShadowDepth { light } = draw.pass {
            self.ensure_shadow_resolution(draw.uniforms.lights[light].shadow[2] as u32);
        }
        if draw.pass == Pass::Resolve {
            let bg = draw.uniforms.hair.background;
            self.background = [
                encode_srgb(bg[0]),
                encode_srgb(bg[1]),
                encode_srgb(bg[2]),
                (bg[3].clamp(0.0, 1.0) * 255.0).round() as u8,
            ];
        }

        // Writes land before the submit that follows them.
        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(draw.uniforms));
        let commands = self.encode_pass(draw.pass, draw.index_count);
        self.queue.submit(std::iter::once(commands));
        self.draws += 1;
        Ok(())
    }

    fn finish_frame(&mut self) -> Result<FrameStats, RenderError> {
        let pixels = self.read_output()?;
        let background = self.background;
        let covered = pixels.chunks_exact(4).filter(|p| *p != background).count() as u64;
        self.pixels = Some(pixels);
        self.frame += 1;
        let stats = FrameStats {
            frame: self.frame,
            draws: self.draws,
            covered_pixels: covered,
        };
        self.draws = 0;
        Ok(stats)
    }

    fn read_pixels(&mut self) -> Result<Option<Vec<u8>>, RenderError> {
        Ok(self.pixels.clone())
    }
}

fn encode_srgb(linear: f32) -> u8 {
    (linear.max(0.0).powf(1.0 / 2.2).min(1.0) * 255.0).round() as u8
}

fn clear_attachment(view: &wgpu::TextureView, color: wgpu::Color) -> wgpu::RenderPassColorAttachment<'_> {
    wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(color),
            store: wgpu::StoreOp::Store,
        },
    }
}

fn layer_view(texture: &wgpu::Texture, layer: usize) -> wgpu::TextureView {
    texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some("Shadow Layer View"),
        dimension: Some(wgpu::TextureViewDimension::D2),
        base_array_layer: layer as u32,
        array_layer_count: Some(1),
        ..Default::default()
    })
}

fn array_view(texture: &wgpu::Texture) -> wgpu::TextureView {
    texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some("Shadow Array View"),
        dimension: Some(wgpu::TextureViewDimension::D2Array),
        ..Default::default()
    })
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(
    binding: u32,
    sample_type: wgpu::TextureSampleType,
    view_dimension: wgpu::TextureViewDimension,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type,
            view_dimension,
            multisampled: false,
        },
        count: None,
    }
}

fn create_layouts(device: &wgpu::Device) -> Layouts {
    let unfilterable = wgpu::TextureSampleType::Float { filterable: false };
    let front = texture_entry(0, wgpu::TextureSampleType::Depth, wgpu::TextureViewDimension::D2Array);
    Layouts {
        frame: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[uniform_entry(0), uniform_entry(1)],
        }),
        shadow_read: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shadow Front Bind Group Layout"),
            entries: &[front],
        }),
        lighting: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Lighting Bind Group Layout"),
            entries: &[
                front,
                texture_entry(1, unfilterable, wgpu::TextureViewDimension::D2Array),
            ],
        }),
        resolve: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Resolve Bind Group Layout"),
            entries: &[
                uniform_entry(0),
                texture_entry(1, unfilterable, wgpu::TextureViewDimension::D2),
                texture_entry(2, unfilterable, wgpu::TextureViewDimension::D2),
            ],
        }),
    }
}

fn create_pipelines(device: &wgpu::Device, layouts: &Layouts) -> Pipelines {
    let strand = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Strand Shader"),
        source: wgpu::ShaderSource::Wgsl(STRAND_SHADER.into()),
    });
    let resolve = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Resolve Shader"),
        source: wgpu::ShaderSource::Wgsl(RESOLVE_SHADER.into()),
    });

    let layout = |label, groups: &[&wgpu::BindGroupLayout]| {
        device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: groups,
            push_constant_ranges: &[],
        })
    };
    let depth_layout = layout("Shadow Depth Layout", &[&layouts.frame]);
    let opacity_layout = layout("Shadow Opacity Layout", &[&layouts.frame, &layouts.shadow_read]);
    let accumulate_layout = layout("Accumulate Layout", &[&layouts.frame, &layouts.lighting]);
    let resolve_layout = layout("Resolve Layout", &[&layouts.resolve]);

    let vertex_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<StrandVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32,
            2 => Float32x3,
            3 => Float32,
            4 => Uint32
        ],
    };
    // Ribbons face the camera, so neither side may be culled.
    let primitive = wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        cull_mode: None,
        ..Default::default()
    };
    let additive = wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        },
    };
    let revealage = wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::Zero,
            dst_factor: wgpu::BlendFactor::OneMinusSrc,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::Zero,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    };

    let shadow_depth = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Shadow Depth Pipeline"),
        layout: Some(&depth_layout),
        vertex: wgpu::VertexState {
            module: &strand,
            entry_point: "vs_shadow",
            buffers: &[vertex_layout.clone()],
        },
        fragment: None,
        primitive,
        depth_stencil: Some(wgpu::DepthStencilState {
            format: SHADOW_DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    });

    let shadow_opacity = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Shadow Opacity Pipeline"),
        layout: Some(&opacity_layout),
        vertex: wgpu::VertexState {
            module: &strand,
            entry_point: "vs_shadow",
            buffers: &[vertex_layout.clone()],
        },
        fragment: Some(wgpu::FragmentState {
            module: &strand,
            entry_point: "fs_shadow_opacity",
            targets: &[Some(wgpu::ColorTargetState {
                format: SHADOW_OPACITY_FORMAT,
                blend: Some(additive),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive,
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    });

    let accumulate = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Accumulate Pipeline"),
        layout: Some(&accumulate_layout),
        vertex: wgpu::VertexState {
            module: &strand,
            entry_point: "vs_main",
            buffers: &[vertex_layout],
        },
        fragment: Some(wgpu::FragmentState {
            module: &strand,
            entry_point: "fs_accumulate",
            targets: &[
                Some(wgpu::ColorTargetState {
                    format: ACCUM_FORMAT,
                    blend: Some(additive),
                    write_mask: wgpu::ColorWrites::ALL,
                }),
                Some(wgpu::ColorTargetState {
                    format: REVEAL_FORMAT,
                    blend: Some(revealage),
                    write_mask: wgpu::ColorWrites::ALL,
                }),
            ],
        }),
        primitive,
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    });

    let resolve = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Resolve Pipeline"),
        layout: Some(&resolve_layout),
        vertex: wgpu::VertexState {
            module: &resolve,
            entry_point: "vs_fullscreen",
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: &resolve,
            entry_point: "fs_resolve",
            targets: &[Some(wgpu::ColorTargetState {
                format: OUTPUT_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    });

    Pipelines {
        shadow_depth,
        shadow_opacity,
        accumulate,
        resolve,
    }
}

fn create_texture(
    device: &wgpu::Device,
    label: &str,
    (width, height, layers): (u32, u32, u32),
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: layers,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    })
}

fn create_shadow_targets(device: &wgpu::Device, layouts: &Layouts, resolution: u32) -> ShadowTargets {
    let usage = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
    let size = (resolution, resolution, MAX_LIGHTS as u32);
    let depth = create_texture(device, "Shadow Front Depth", size, SHADOW_DEPTH_FORMAT, usage);
    let opacity = create_texture(device, "Shadow Opacity Layers", size, SHADOW_OPACITY_FORMAT, usage);
    let depth_view = array_view(&depth);
    let opacity_view = array_view(&opacity);

    let read_front = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Shadow Front Bind Group"),
        layout: &layouts.shadow_read,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::TextureView(&depth_view),
        }],
    });
    let lighting = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Lighting Bind Group"),
        layout: &layouts.lighting,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&depth_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&opacity_view),
            },
        ],
    });

    ShadowTargets {
        resolution,
        depth,
        opacity,
        read_front,
        lighting,
    }
}

fn create_frame_targets(
    device: &wgpu::Device,
    layouts: &Layouts,
    uniforms: &wgpu::Buffer,
    width: u32,
    height: u32,
) -> FrameTargets {
    let target = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
    let size = (width, height, 1);
    let accum = create_texture(device, "OIT Accumulation", size, ACCUM_FORMAT, target)
        .create_view(&wgpu::TextureViewDescriptor::default());
    let reveal = create_texture(device, "OIT Revealage", size, REVEAL_FORMAT, target)
        .create_view(&wgpu::TextureViewDescriptor::default());
    let output = create_texture(
        device,
        "Resolved Output",
        size,
        OUTPUT_FORMAT,
        wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
    );
    let output_view = output.create_view(&wgpu::TextureViewDescriptor::default());

    let resolve = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Resolve Bind Group"),
        layout: &layouts.resolve,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&accum),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&reveal),
            },
        ],
    });

    FrameTargets {
        accum,
        reveal,
        output,
        output_view,
        resolve,
    }
}
