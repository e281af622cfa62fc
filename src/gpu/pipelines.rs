//! Pipeline construction for the simulate and render programs.
//!
//! One compute pipeline per kernel variant (floating / collision) and one
//! shared render pipeline for additive point sprites. The simulate bind
//! group layout is direction-agnostic: a system creates one bind group per
//! buffer orientation and picks at dispatch time.

use crate::config::GameConfig;
use crate::particles::shaders;
use bytemuck::{Pod, Zeroable};

/// Uniforms consumed by the simulate kernels.
///
/// Layout must match the WGSL `SimUniforms` struct in
/// [`crate::particles::shaders`].
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct SimUniforms {
    pub proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub inv_proj_view: [[f32; 4]; 4],
    pub time: f32,
    pub dt: f32,
    pub figure: i32,
    pub compute_collision: u32,
}

/// Uniforms consumed by the render shader.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct RenderUniforms {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub color: [f32; 3],
    pub size: f32,
}

/// Shared pipelines for all particle systems.
pub struct ParticlePipelines {
    pub simulate_floating: wgpu::ComputePipeline,
    pub simulate_collision: wgpu::ComputePipeline,
    pub render: wgpu::RenderPipeline,
    simulate_layout: wgpu::BindGroupLayout,
    render_layout: wgpu::BindGroupLayout,
}

impl ParticlePipelines {
    /// Compile both simulate kernels and the render program.
    ///
    /// Shader compilation failure is fatal and surfaces as a wgpu
    /// validation panic during module creation.
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        config: &GameConfig,
    ) -> Self {
        let simulate_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Simulate Bind Group Layout"),
                entries: &[
                    // Read buffer: last frame's particle state.
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: true },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    // Write buffer: never the same as the read buffer.
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: false },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let simulate_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Simulate Pipeline Layout"),
                bind_group_layouts: &[&simulate_layout],
                push_constant_ranges: &[],
            });

        let make_compute = |label: &str, source: String| {
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&simulate_pipeline_layout),
                module: &module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            })
        };

        let simulate_floating = make_compute(
            "Floating Simulate Pipeline",
            shaders::floating_simulate_shader(config.base_floating_speed),
        );
        let simulate_collision = make_compute(
            "Collision Simulate Pipeline",
            shaders::collision_simulate_shader(config.final_dist),
        );

        let render_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Render Bind Group Layout"),
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

        let render_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Render Shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::render_shader().into()),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&render_layout],
                push_constant_ranges: &[],
            });

        let render = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Particle Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &render_shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: shaders::PARTICLE_STRIDE as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &[wgpu::VertexAttribute {
                        offset: 0,
                        shader_location: 0,
                        format: wgpu::VertexFormat::Float32x3,
                    }],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &render_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    // Additive: overlapping particles brighten, never occlude.
                    blend: Some(wgpu::BlendState {
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
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            // No depth test or write: ordering is irrelevant under additive
            // blending, which is the intended look.
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            simulate_floating,
            simulate_collision,
            render,
            simulate_layout,
            render_layout,
        }
    }

    /// Bind group for one simulate direction (`src` read, `dst` written).
    pub fn simulate_bind_group(
        &self,
        device: &wgpu::Device,
        src: &wgpu::Buffer,
        dst: &wgpu::Buffer,
        uniforms: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Simulate Bind Group"),
            layout: &self.simulate_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: src.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: dst.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniforms.as_entire_binding(),
                },
            ],
        })
    }

    /// Bind group for one system's render uniforms.
    pub fn render_bind_group(
        &self,
        device: &wgpu::Device,
        uniforms: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Render Uniform Bind Group"),
            layout: &self.render_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_uniforms_layout() {
        // Three mat4 + four scalars, 16-byte aligned for uniform buffers.
        assert_eq!(std::mem::size_of::<SimUniforms>(), 208);
        assert_eq!(std::mem::size_of::<SimUniforms>() % 16, 0);
    }

    #[test]
    fn test_render_uniforms_layout() {
        assert_eq!(std::mem::size_of::<RenderUniforms>(), 144);
        assert_eq!(std::mem::size_of::<RenderUniforms>() % 16, 0);
    }
}
