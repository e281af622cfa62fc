//! GPU-resident particle systems.
//!
//! A [`ParticleSystem`] owns a double-buffered particle population plus a
//! pair of small probe buffers for proximity queries. Per frame the caller
//! runs [`ParticleSystem::simulate`] (read buffer in, write buffer out),
//! draws the freshly written buffer, then calls [`ParticleSystem::swap`]
//! exactly once. Collision-type systems additionally answer
//! [`ParticleSystem::hit_test`] queries against the post-swap state.

pub mod buffers;
pub mod shaders;
pub mod spawn;

use crate::config::GameConfig;
use crate::error::GpuError;
use crate::gpu::{GpuContext, ParticlePipelines, RenderUniforms, SimUniforms};
use buffers::{ParticleData, SystemBuffers};
use glam::{Mat4, Vec3};
use shaders::{COLLISION_PROBES, WORKGROUP_SIZE};
use spawn::ParticleSpawner;

/// Distance reported when a query finds no relevant feature.
pub const QUERY_NO_HIT: f32 = 1.0e6;

/// Camera matrices shared by simulate and render passes.
#[derive(Clone, Copy)]
pub struct ViewProjection {
    pub proj: Mat4,
    pub view: Mat4,
    pub inv_proj_view: Mat4,
}

/// System variant: ambient dust or a queryable collision population.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SystemKind {
    Floating,
    Collision,
}

/// Convert an `RRGGBB` hex color to power-adjusted linear RGB.
///
/// Channels are squared (cheap gamma decode) then scaled, matching how the
/// per-system colors are tuned.
pub fn create_color(hex: &str, power: f32) -> [f32; 3] {
    debug_assert_eq!(hex.len(), 6, "expected RRGGBB hex color");
    let channel = |i: usize| {
        let v = u8::from_str_radix(hex.get(i..i + 2).unwrap_or("ff"), 16).unwrap_or(0xff);
        let c = v as f32 / 255.0;
        c * c * power
    };
    [channel(0), channel(2), channel(4)]
}

/// Reduce raw probe slots to the minimum distance estimate.
///
/// The kernel writes its distance-like value into the x channel of each
/// slot's position; the minimum over all slots is the query result.
pub fn min_probe_distance(slots: &[ParticleData]) -> f32 {
    slots
        .iter()
        .map(|s| s.position[0])
        .fold(QUERY_NO_HIT, f32::min)
}

/// One particle population with double-buffered GPU state.
pub struct ParticleSystem {
    kind: SystemKind,
    count: u32,
    /// Procedural shape the obstacle kernel currently snaps particles
    /// toward. 0 = path ribbon, 1..8 = obstacle figures, 20 = final goal.
    pub figure: i32,
    color: [f32; 3],
    size: f32,
    buffers: SystemBuffers,
    sim_uniforms: wgpu::Buffer,
    render_uniforms: wgpu::Buffer,
    // One bind group per buffer orientation, picked at dispatch time.
    sim_bind_ab: wgpu::BindGroup,
    sim_bind_ba: wgpu::BindGroup,
    probe_bind_ab: wgpu::BindGroup,
    probe_bind_ba: wgpu::BindGroup,
    render_bind: wgpu::BindGroup,
}

impl ParticleSystem {
    /// Ambient parallax dust. Does not collide.
    pub fn floating(gpu: &GpuContext, pipelines: &ParticlePipelines, config: &GameConfig) -> Self {
        let initial = ParticleSpawner::new().floating(
            config.floating_particle_count,
            config.base_floating_speed,
        );
        Self::new(
            gpu,
            pipelines,
            SystemKind::Floating,
            config.floating_particle_count,
            0,
            create_color(config.floating_color, 0.15),
            0.08,
            &initial,
        )
    }

    /// Collision-type system (path ribbon, obstacle figure or final goal).
    pub fn collision(
        gpu: &GpuContext,
        pipelines: &ParticlePipelines,
        config: &GameConfig,
        color_hex: &str,
        figure: i32,
    ) -> Self {
        let initial = ParticleSpawner::new().collision(config.obstacle_particle_count);
        Self::new(
            gpu,
            pipelines,
            SystemKind::Collision,
            config.obstacle_particle_count,
            figure,
            create_color(color_hex, 0.3),
            0.03,
            &initial,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn new(
        gpu: &GpuContext,
        pipelines: &ParticlePipelines,
        kind: SystemKind,
        count: u32,
        figure: i32,
        color: [f32; 3],
        size: f32,
        initial: &[ParticleData],
    ) -> Self {
        assert_eq!(initial.len(), count as usize);
        let device = &gpu.device;
        let buffers = SystemBuffers::new(device, initial);

        let sim_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Sim Uniform Buffer"),
            size: std::mem::size_of::<SimUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let render_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Render Uniform Buffer"),
            size: std::mem::size_of::<RenderUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let sim_bind_ab = pipelines.simulate_bind_group(
            device,
            buffers.main.side_a(),
            buffers.main.side_b(),
            &sim_uniforms,
        );
        let sim_bind_ba = pipelines.simulate_bind_group(
            device,
            buffers.main.side_b(),
            buffers.main.side_a(),
            &sim_uniforms,
        );
        let probe_bind_ab = pipelines.simulate_bind_group(
            device,
            buffers.probes.side_a(),
            buffers.probes.side_b(),
            &sim_uniforms,
        );
        let probe_bind_ba = pipelines.simulate_bind_group(
            device,
            buffers.probes.side_b(),
            buffers.probes.side_a(),
            &sim_uniforms,
        );
        let render_bind = pipelines.render_bind_group(device, &render_uniforms);

        Self {
            kind,
            count,
            figure,
            color,
            size,
            buffers,
            sim_uniforms,
            render_uniforms,
            sim_bind_ab,
            sim_bind_ba,
            probe_bind_ab,
            probe_bind_ba,
            render_bind,
        }
    }

    fn write_sim_uniforms(
        &self,
        gpu: &GpuContext,
        vp: &ViewProjection,
        time: f32,
        dt: f32,
        compute_collision: bool,
    ) {
        let uniforms = SimUniforms {
            proj: vp.proj.to_cols_array_2d(),
            view: vp.view.to_cols_array_2d(),
            inv_proj_view: vp.inv_proj_view.to_cols_array_2d(),
            time,
            dt,
            figure: self.figure,
            compute_collision: compute_collision as u32,
        };
        gpu.queue
            .write_buffer(&self.sim_uniforms, 0, bytemuck::bytes_of(&uniforms));
    }

    /// Advance all particles one timestep: read buffer in, write buffer
    /// out. Does not swap roles; the caller swaps once per rendered frame.
    pub fn simulate(
        &self,
        gpu: &GpuContext,
        pipelines: &ParticlePipelines,
        encoder: &mut wgpu::CommandEncoder,
        vp: &ViewProjection,
        time: f32,
        dt: f32,
    ) {
        self.write_sim_uniforms(gpu, vp, time, dt, false);

        let pipeline = match self.kind {
            SystemKind::Floating => &pipelines.simulate_floating,
            SystemKind::Collision => &pipelines.simulate_collision,
        };
        let bind = if self.buffers.main.a_is_read() {
            &self.sim_bind_ab
        } else {
            &self.sim_bind_ba
        };

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Simulate Pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind, &[]);
        pass.dispatch_workgroups(self.count.div_ceil(WORKGROUP_SIZE), 1, 1);
    }

    /// Upload this frame's render uniforms. Call before encoding the
    /// render pass that draws this system. `brightness` applies the screen
    /// fade by scaling the additive color.
    pub fn prepare_render(
        &self,
        gpu: &GpuContext,
        vp: &ViewProjection,
        size_multiplier: f32,
        brightness: f32,
    ) {
        let b = brightness.clamp(0.0, 1.0);
        let uniforms = RenderUniforms {
            view: vp.view.to_cols_array_2d(),
            proj: vp.proj.to_cols_array_2d(),
            color: [self.color[0] * b, self.color[1] * b, self.color[2] * b],
            size: self.size * size_multiplier,
        };
        gpu.queue
            .write_buffer(&self.render_uniforms, 0, bytemuck::bytes_of(&uniforms));
    }

    /// Draw the just-simulated population as additive point sprites.
    pub fn draw<'a>(&'a self, pipelines: &'a ParticlePipelines, pass: &mut wgpu::RenderPass<'a>) {
        pass.set_pipeline(&pipelines.render);
        pass.set_bind_group(0, &self.render_bind, &[]);
        // The write buffer holds this frame's fresh state until swap().
        pass.set_vertex_buffer(0, self.buffers.main.write().slice(..));
        pass.draw(0..6, 0..self.count);
    }

    /// Exchange read/write roles. Must be called exactly once per rendered
    /// frame, after simulate+draw and before any proximity query.
    pub fn swap(&mut self) {
        self.buffers.swap();
    }

    /// Approximate distance from `pos` to the nearest active feature of
    /// this system, or a large sentinel if none is relevant.
    ///
    /// Synchronous: stalls until the GPU finishes the probe dispatch and
    /// the staging copy. Budget for at most one call per collision system
    /// per frame.
    pub fn hit_test(
        &self,
        gpu: &GpuContext,
        pipelines: &ParticlePipelines,
        pos: Vec3,
        vp: &ViewProjection,
        time: f32,
        dt: f32,
    ) -> Result<f32, GpuError> {
        assert!(
            self.kind == SystemKind::Collision,
            "hit_test on a non-collision particle system"
        );

        // Seed every probe slot with the same query position.
        let probes = vec![ParticleData::new(pos.to_array(), [0.0; 3]); COLLISION_PROBES as usize];
        gpu.queue.write_buffer(
            self.buffers.probes.read(),
            0,
            bytemuck::cast_slice(&probes),
        );
        self.write_sim_uniforms(gpu, vp, time, dt, true);

        let bind = if self.buffers.probes.a_is_read() {
            &self.probe_bind_ab
        } else {
            &self.probe_bind_ba
        };

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Probe Encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Probe Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipelines.simulate_collision);
            pass.set_bind_group(0, bind, &[]);
            pass.dispatch_workgroups(COLLISION_PROBES.div_ceil(WORKGROUP_SIZE), 1, 1);
        }
        let probe_bytes = (COLLISION_PROBES as usize * shaders::PARTICLE_STRIDE) as u64;
        encoder.copy_buffer_to_buffer(
            self.buffers.probes.write(),
            0,
            &self.buffers.staging,
            0,
            probe_bytes,
        );
        gpu.queue.submit(std::iter::once(encoder.finish()));

        // Deliberate GPU->CPU synchronization point.
        let slice = self.buffers.staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = gpu.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|_| GpuError::BufferMapping("map_async callback dropped".into()))?
            .map_err(|e| GpuError::BufferMapping(e.to_string()))?;

        let min = {
            let data = slice.get_mapped_range();
            min_probe_distance(bytemuck::cast_slice(&data))
        };
        self.buffers.staging.unmap();

        Ok(min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_color_white_is_power() {
        let c = create_color("ffffff", 0.15);
        for ch in c {
            assert!((ch - 0.15).abs() < 1e-6);
        }
    }

    #[test]
    fn test_create_color_squares_channels() {
        // 0x80 / 255 = 0.50196; squared then scaled.
        let c = create_color("800000", 0.3);
        let expected = (128.0f32 / 255.0).powi(2) * 0.3;
        assert!((c[0] - expected).abs() < 1e-6);
        assert_eq!(c[1], 0.0);
        assert_eq!(c[2], 0.0);
    }

    #[test]
    fn test_min_probe_distance_picks_smallest_slot() {
        let mut slots =
            vec![ParticleData::new([7.5, 0.0, 0.0], [0.0; 3]); COLLISION_PROBES as usize];
        slots[41] = ParticleData::new([0.25, 0.0, 0.0], [0.0; 3]);
        assert_eq!(min_probe_distance(&slots), 0.25);
    }

    #[test]
    fn test_min_probe_distance_empty_is_no_hit() {
        assert_eq!(min_probe_distance(&[]), QUERY_NO_HIT);
    }

    #[test]
    fn test_min_probe_distance_all_sentinel() {
        let slots = vec![ParticleData::new([QUERY_NO_HIT, 0.0, 0.0], [0.0; 3]); 64];
        assert_eq!(min_probe_distance(&slots), QUERY_NO_HIT);
    }
}
