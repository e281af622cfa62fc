//! Per-frame orchestration of all particle systems.
//!
//! The director owns the pipelines, the four particle systems and the game
//! state, and enforces the frame order the engine depends on: fade, camera,
//! simulate+render for every system, one swap per system, then the
//! proximity queries against the freshly swapped state.

use super::state::{CameraFrame, FinishState, GameState, Proximity};
use crate::config::GameConfig;
use crate::error::AppError;
use crate::gpu::{GpuContext, ParticlePipelines};
use crate::particles::shaders::{FINAL_FIGURE, PATH_FIGURE};
use crate::particles::ParticleSystem;

/// What a frame reported back to the windowing shell.
pub struct FrameReport {
    /// The run ended during this frame's fade update.
    pub just_finished: bool,
}

pub struct Director {
    config: GameConfig,
    pipelines: ParticlePipelines,
    pub state: GameState,
    floating: ParticleSystem,
    path: ParticleSystem,
    obstacle: ParticleSystem,
    /// Created once the camera approaches the end of the tunnel.
    final_goal: Option<ParticleSystem>,
}

impl Director {
    pub fn new(gpu: &GpuContext, config: GameConfig) -> Self {
        let pipelines = ParticlePipelines::new(&gpu.device, gpu.config.format, &config);
        let floating = ParticleSystem::floating(gpu, &pipelines, &config);
        let path =
            ParticleSystem::collision(gpu, &pipelines, &config, config.path_color, PATH_FIGURE);
        let obstacle = ParticleSystem::collision(gpu, &pipelines, &config, config.obstacle_color, 1);
        let state = GameState::new(&config);

        log::info!(
            "particle systems ready: {} floating, {}x2 collision",
            config.floating_particle_count,
            config.obstacle_particle_count
        );

        Self {
            config,
            pipelines,
            state,
            floating,
            path,
            obstacle,
            final_goal: None,
        }
    }

    /// Run one full frame against `target`.
    pub fn frame(
        &mut self,
        gpu: &GpuContext,
        target: &wgpu::TextureView,
        time: f32,
        dt: f32,
    ) -> Result<FrameReport, AppError> {
        self.state.update_fade(dt, &self.config);
        // Captured here because begin_frame collapses the one-frame marker.
        let just_finished = self.state.finish_state == FinishState::JustFinished;

        let (width, height) = gpu.surface_size();
        let aspect = width as f32 / height as f32;
        let frame = self.state.begin_frame(dt, aspect, &self.config)?;

        // Once the run ends the world freezes: no simulation, no draws, no
        // blocking queries. Only a clear keeps the swapchain valid.
        if self.state.is_frozen() {
            self.clear_target(gpu, target);
            return Ok(FrameReport { just_finished });
        }

        if frame.spawn_final {
            log::info!("goal region in range at z = {:.1}", self.state.position.z);
            self.final_goal = Some(ParticleSystem::collision(
                gpu,
                &self.pipelines,
                &self.config,
                self.config.final_color,
                FINAL_FIGURE,
            ));
        }
        self.obstacle.figure = self.state.figure;

        self.encode_passes(gpu, target, &frame, height, time, dt);

        self.floating.swap();
        self.path.swap();
        self.obstacle.swap();
        if let Some(goal) = self.final_goal.as_mut() {
            goal.swap();
        }

        // Queries observe the post-swap state of this frame's simulation.
        let pos = self.state.position;
        let path_dist = self
            .path
            .hit_test(gpu, &self.pipelines, pos, &frame.vp, time, dt)?;
        let obstacle_dist =
            self.obstacle
                .hit_test(gpu, &self.pipelines, pos, &frame.vp, time, dt)?;
        let final_dist = match &self.final_goal {
            Some(goal) => Some(goal.hit_test(gpu, &self.pipelines, pos, &frame.vp, time, dt)?),
            None => None,
        };

        let prox = Proximity {
            path: path_dist,
            obstacle: obstacle_dist,
            final_goal: final_dist,
        };
        self.state.apply_proximity(dt, prox, &self.config);

        log::debug!(
            "z={:.1} energy={:.3} {:?} figure={} path={:.3} obst={:.3}",
            self.state.position.z,
            self.state.energy,
            self.state.energy_state,
            self.state.figure,
            path_dist,
            obstacle_dist,
        );

        Ok(FrameReport { just_finished })
    }

    fn clear_target(&self, gpu: &GpuContext, target: &wgpu::TextureView) {
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frozen Frame Encoder"),
            });
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Frozen Clear Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        gpu.queue.submit(std::iter::once(encoder.finish()));
    }

    fn encode_passes(
        &self,
        gpu: &GpuContext,
        target: &wgpu::TextureView,
        frame: &CameraFrame,
        height: u32,
        time: f32,
        dt: f32,
    ) {
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let systems: [&ParticleSystem; 3] = [&self.floating, &self.path, &self.obstacle];
        for system in systems {
            system.simulate(gpu, &self.pipelines, &mut encoder, &frame.vp, time, dt);
        }
        if let Some(goal) = &self.final_goal {
            goal.simulate(gpu, &self.pipelines, &mut encoder, &frame.vp, time, dt);
        }

        // Point size tracks output resolution; the fade scales brightness.
        let size_multiplier = height as f32 / 1080.0;
        let brightness = self.state.blackout;
        for system in systems {
            system.prepare_render(gpu, &frame.vp, size_multiplier, brightness);
        }
        if let Some(goal) = &self.final_goal {
            goal.prepare_render(gpu, &frame.vp, size_multiplier, brightness);
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Particle Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            for system in systems {
                system.draw(&self.pipelines, &mut pass);
            }
            if let Some(goal) = &self.final_goal {
                goal.draw(&self.pipelines, &mut pass);
            }
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
    }
}
