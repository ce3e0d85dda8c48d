use std::borrow::Cow;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytemuck::cast_slice;
use emblem_field::{RenderFrame, Rgb};
use glam::{Mat4, Vec3};
use wgpu::{SurfaceError, util::DeviceExt};
use winit::window::Window;

use crate::camera::OrbitCamera;
use crate::shaders::{CornerVertex, PARTICLE_SHADER_SOURCE, ParticleUniforms, SPRITE_CORNERS};

pub const FOV_Y_DEGREES: f32 = 45.0;
const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 1000.0;
pub const BACKGROUND: Rgb = Rgb::new(0x05, 0x05, 0x05);
const STAR_COLOR: Rgb = Rgb::WHITE;
const STAR_SIZE: f32 = 0.4;
const STAR_OPACITY: f32 = 0.8;

/// View and projection for a camera at `eye` looking at the origin.
pub fn camera_matrices(eye: Vec3, aspect: f32) -> (Mat4, Mat4) {
    let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
    let aspect = if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    };
    let proj = Mat4::perspective_rh(FOV_Y_DEGREES.to_radians(), aspect, NEAR_PLANE, FAR_PLANE);
    (view, proj)
}

/// Color channels for a render target; sRGB targets expect linear input.
pub fn target_color(color: Rgb, srgb_target: bool) -> [f32; 3] {
    if srgb_target {
        color.to_linear()
    } else {
        [
            color.r as f32 / 255.0,
            color.g as f32 / 255.0,
            color.b as f32 / 255.0,
        ]
    }
}

pub(crate) fn frame_uniforms(
    frame: &RenderFrame<'_>,
    eye: Vec3,
    aspect: f32,
    srgb_target: bool,
) -> ParticleUniforms {
    let (view, proj) = camera_matrices(eye, aspect);
    let [r, g, b] = target_color(frame.color, srgb_target);
    ParticleUniforms {
        view: view.to_cols_array_2d(),
        proj: proj.to_cols_array_2d(),
        model: frame.model_matrix().to_cols_array_2d(),
        color: [r, g, b, frame.style.opacity],
        params: [frame.style.point_size, 0.0, 0.0, 0.0],
    }
}

/// Stars stay put in world space; only the camera moves past them.
pub(crate) fn star_uniforms(eye: Vec3, aspect: f32, srgb_target: bool) -> ParticleUniforms {
    let (view, proj) = camera_matrices(eye, aspect);
    let [r, g, b] = target_color(STAR_COLOR, srgb_target);
    ParticleUniforms {
        view: view.to_cols_array_2d(),
        proj: proj.to_cols_array_2d(),
        model: Mat4::IDENTITY.to_cols_array_2d(),
        color: [r, g, b, STAR_OPACITY],
        params: [STAR_SIZE, 0.0, 0.0, 0.0],
    }
}

/// Additive blending: overlapping particles brighten instead of occluding.
pub fn additive_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

pub struct ParticleRenderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    pipeline: wgpu::RenderPipeline,
    corner_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    star_buffer: wgpu::Buffer,
    star_count: u32,
    star_uniform_buffer: wgpu::Buffer,
    star_bind_group: wgpu::BindGroup,
    srgb_target: bool,
    background: wgpu::Color,
}

impl ParticleRenderer {
    /// `stars` is a flat `[x, y, z, ...]` list uploaded once.
    pub async fn new(window: Arc<Window>, particle_count: usize, stars: &[f32]) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .context("creating wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await
            .context("requesting wgpu adapter")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("emblem-viewer-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .context("requesting wgpu device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no texture formats")?;
        let present_mode = surface_caps
            .present_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::PresentMode::Mailbox)
            .unwrap_or(wgpu::PresentMode::Fifo);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Opaque);
        let srgb_target = surface_format.is_srgb();

        let uniform_buffer = create_uniform_buffer(&device, "particle-uniform-buffer");
        let star_uniform_buffer = create_uniform_buffer(&device, "star-uniform-buffer");

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("particle-bind-group-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("particle-bind-group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        let star_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("star-bind-group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: star_uniform_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("particle-shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(PARTICLE_SHADER_SOURCE)),
        });

        let corner_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<CornerVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x2],
        };
        let instance_layout = wgpu::VertexBufferLayout {
            array_stride: (3 * std::mem::size_of::<f32>()) as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &wgpu::vertex_attr_array![1 => Float32x3],
        };

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("particle-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("particle-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[corner_layout, instance_layout],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(additive_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            // No depth attachment: sprites never occlude each other.
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let corner_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("particle-corner-buffer"),
            contents: cast_slice(&SPRITE_CORNERS),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let instance_capacity = particle_count.max(1);
        let instance_buffer = create_instance_buffer(&device, instance_capacity);

        let star_count = (stars.len() / 3) as u32;
        // Vertex buffers may not be empty; keep one dummy star that is never drawn.
        let star_contents: &[f32] = if star_count == 0 {
            &[0.0; 3]
        } else {
            &stars[..star_count as usize * 3]
        };
        let star_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("star-instance-buffer"),
            contents: cast_slice(star_contents),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let [r, g, b] = target_color(BACKGROUND, srgb_target);
        let background = wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: 1.0,
        };

        let renderer = Self {
            window,
            surface,
            device,
            queue,
            config: wgpu::SurfaceConfiguration {
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                format: surface_format,
                width: size.width.max(1),
                height: size.height.max(1),
                present_mode,
                alpha_mode,
                view_formats: vec![],
                desired_maximum_frame_latency: 1,
            },
            size,
            pipeline,
            corner_buffer,
            instance_buffer,
            instance_capacity,
            uniform_buffer,
            bind_group,
            star_buffer,
            star_count,
            star_uniform_buffer,
            star_bind_group,
            srgb_target,
            background,
        };
        renderer.surface.configure(&renderer.device, &renderer.config);
        log::info!(
            "[viewer] surface {:?} {}x{} ({:?})",
            surface_format,
            renderer.config.width,
            renderer.config.height,
            present_mode
        );
        Ok(renderer)
    }

    pub fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub fn size(&self) -> winit::dpi::PhysicalSize<u32> {
        self.size
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    fn ensure_instance_capacity(&mut self, count: usize) {
        if count <= self.instance_capacity {
            return;
        }
        let capacity = count.next_power_of_two();
        self.instance_buffer = create_instance_buffer(&self.device, capacity);
        self.instance_capacity = capacity;
    }

    pub fn render(
        &mut self,
        frame: &RenderFrame<'_>,
        camera: &OrbitCamera,
    ) -> Result<(), SurfaceError> {
        let count = frame.particle_count();
        self.ensure_instance_capacity(count);
        let aspect = self.config.width as f32 / self.config.height as f32;
        let eye = camera.eye();
        let uniforms = frame_uniforms(frame, eye, aspect, self.srgb_target);
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
        let stars = star_uniforms(eye, aspect, self.srgb_target);
        self.queue
            .write_buffer(&self.star_uniform_buffer, 0, bytemuck::bytes_of(&stars));
        if count > 0 {
            self.queue.write_buffer(
                &self.instance_buffer,
                0,
                cast_slice(&frame.positions[..count * 3]),
            );
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("emblem-viewer-encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("particle-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.background),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_vertex_buffer(0, self.corner_buffer.slice(..));
            if self.star_count > 0 {
                pass.set_bind_group(0, &self.star_bind_group, &[]);
                pass.set_vertex_buffer(1, self.star_buffer.slice(..));
                pass.draw(0..SPRITE_CORNERS.len() as u32, 0..self.star_count);
            }
            if count > 0 {
                pass.set_bind_group(0, &self.bind_group, &[]);
                let instance_bytes = (count * 3 * std::mem::size_of::<f32>()) as u64;
                pass.set_vertex_buffer(1, self.instance_buffer.slice(0..instance_bytes));
                pass.draw(0..SPRITE_CORNERS.len() as u32, 0..count as u32);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

fn create_uniform_buffer(device: &wgpu::Device, label: &str) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<ParticleUniforms>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("particle-instance-buffer"),
        size: (capacity * 3 * std::mem::size_of::<f32>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
