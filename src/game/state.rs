//! CPU-side game state: camera, steering, energy and run lifecycle.
//!
//! The state is split around the GPU work of a frame. [`GameState::begin_frame`]
//! integrates steering and produces the camera matrices the particle passes
//! need; [`GameState::apply_proximity`] consumes the frame's proximity query
//! results and drives the energy/death/finish machinery. The blackout fade
//! in between is advanced by [`GameState::update_fade`].

use super::fade::{Fade, FadeAction};
use crate::config::GameConfig;
use crate::error::MathError;
use crate::math::{
    checked_inverse, mix, mix_factor, perspective, plane_rotation, smoothstep, translation,
    REF_FRAME_RATE,
};
use crate::particles::ViewProjection;
use glam::{Vec2, Vec3};
use std::f32::consts::{FRAC_PI_4, FRAC_PI_6};

/// Run lifecycle. One-way: `Playing` to `JustFinished` to `Finished`.
/// Death is not a state here; it resets the player in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishState {
    Playing,
    /// Set for exactly one frame so the caller can react to the run ending.
    JustFinished,
    Finished,
}

/// What the camera touched this frame, by priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnergyState {
    None,
    HitPath,
    HitObstacle,
}

/// Proximity query results for one frame, world-space distances.
#[derive(Clone, Copy, Debug)]
pub struct Proximity {
    pub path: f32,
    pub obstacle: f32,
    /// `None` until the final-goal system has been spawned.
    pub final_goal: Option<f32>,
}

/// Camera data for the frame's simulate and render passes.
pub struct CameraFrame {
    pub vp: ViewProjection,
    pub speed: f32,
    /// `true` on the single frame the final-goal system should be created.
    pub spawn_final: bool,
}

pub struct GameState {
    pub position: Vec3,
    /// x: yaw, y: pitch, radians.
    pub rotation: Vec2,
    /// Raw mouse delta since last frame; overwritten, not accumulated.
    mouse: Vec2,
    /// Exponentially damped steering vector.
    movement: Vec2,
    pub energy: f32,
    pub energy_state: EnergyState,
    invincible: f32,
    pub finish_state: FinishState,
    /// Screen fade factor in [-1, 1]; 1 is fully visible.
    pub blackout: f32,
    /// Active obstacle figure, resolved from travel progress.
    pub figure: i32,
    fade: Option<Fade>,
    final_spawned: bool,
    dying: bool,
}

impl GameState {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            rotation: Vec2::ZERO,
            mouse: Vec2::ZERO,
            movement: Vec2::ZERO,
            energy: 1.0,
            energy_state: EnergyState::None,
            invincible: config.invincible_time,
            finish_state: FinishState::Playing,
            blackout: -1.0,
            figure: 1,
            // Initial fade-in from black.
            fade: Some(Fade::new(-1.0, 1.0, 0.05, FadeAction::None)),
            final_spawned: false,
            dying: false,
        }
    }

    /// Store a raw mouse delta for the next frame. Y is flipped so pushing
    /// the mouse forward pitches the camera up.
    pub fn on_mouse_move(&mut self, dx: f64, dy: f64) {
        self.mouse = Vec2::new(dx as f32, -(dy as f32));
    }

    /// Advance the active blackout fade, firing its completion action.
    pub fn update_fade(&mut self, dt: f32, config: &GameConfig) {
        let Some(fade) = self.fade.as_mut() else {
            return;
        };
        let done = fade.advance(dt);
        self.blackout = fade.value();
        if !done {
            return;
        }
        match fade.action() {
            FadeAction::None => {
                self.fade = None;
            }
            FadeAction::Respawn => {
                self.rotation = Vec2::ZERO;
                self.movement = Vec2::ZERO;
                self.mouse = Vec2::ZERO;
                self.position = Vec3::new(0.0, 0.0, self.position.z + config.death_pos_drop);
                self.energy = 1.0;
                self.invincible = config.invincible_time;
                self.dying = false;
                self.fade = Some(Fade::new(self.blackout, 1.0, 0.1, FadeAction::None));
            }
            FadeAction::Finish => {
                self.finish_state = FinishState::JustFinished;
                self.fade = None;
            }
        }
    }

    /// Whether gameplay has stopped for good. Once the run leaves
    /// `Playing`, nothing simulates, draws or queries anymore.
    pub fn is_frozen(&self) -> bool {
        self.finish_state != FinishState::Playing
    }

    /// Integrate steering and produce this frame's camera.
    ///
    /// Once the run has finished the world freezes: matrices are still
    /// produced (the end scene keeps rendering) but nothing moves.
    pub fn begin_frame(
        &mut self,
        dt: f32,
        aspect: f32,
        config: &GameConfig,
    ) -> Result<CameraFrame, MathError> {
        if self.finish_state == FinishState::JustFinished {
            self.finish_state = FinishState::Finished;
        }

        let mut spawn_final = false;
        if !self.is_frozen() {
            // Travel progress picks the active figure; each change grants a
            // fresh grace period.
            let progress = -self.position.z / config.final_dist;
            // Lower bound only: past the goal depth the schedule keeps
            // counting up and the kernel falls back to its generic shape.
            let scheduled = ((1.0 + progress * 8.0).floor() as i32).max(1);
            if scheduled != self.figure {
                self.figure = scheduled;
                self.invincible = config.invincible_time;
            }
            self.invincible -= dt;

            let retain = mix_factor(dt, config.movement_damping_log);
            self.movement = mix_vec2(self.mouse, self.movement, retain);
            self.mouse = Vec2::ZERO;

            let gain = config.movement_power * dt * REF_FRAME_RATE;
            self.rotation.x += soft_increment(self.rotation.x, self.movement.x * gain);
            self.rotation.y += soft_increment(self.rotation.y, self.movement.y * gain);

            let forward = self.forward();
            let speed = self.speed(config);
            self.position += forward * (-speed * dt);

            if !self.final_spawned
                && -self.position.z > config.final_dist - config.camera.far - 2.0
            {
                self.final_spawned = true;
                spawn_final = true;
            }
        }

        let rot = plane_rotation(self.rotation.x, 0, 2) * plane_rotation(self.rotation.y, 1, 2);
        let view = rot * translation(-self.position);
        let proj = perspective(config.camera.fov, aspect, config.camera.near, config.camera.far);
        let inv_proj_view = checked_inverse(&(proj * view))?;

        Ok(CameraFrame {
            vp: ViewProjection {
                proj,
                view,
                inv_proj_view,
            },
            speed: if self.is_frozen() {
                0.0
            } else {
                self.speed(config)
            },
            spawn_final,
        })
    }

    /// Consume the frame's proximity queries: energy state, damage, death
    /// and finish triggers.
    pub fn apply_proximity(&mut self, dt: f32, prox: Proximity, config: &GameConfig) {
        if self.is_frozen() {
            return;
        }

        self.energy_state = if prox.obstacle < config.hit_obst_distance && self.invincible <= 0.0 {
            EnergyState::HitObstacle
        } else if prox.path < config.hit_path_distance {
            EnergyState::HitPath
        } else {
            EnergyState::None
        };

        let rate = match self.energy_state {
            EnergyState::HitPath => config.energy_speed_hit_path,
            EnergyState::HitObstacle => config.energy_speed_hit_obst,
            EnergyState::None => config.energy_speed_none,
        };
        // No lower clamp: going negative is exactly what triggers death.
        self.energy = (self.energy + rate * dt).min(1.0);

        if self.energy <= 0.0 && !self.dying {
            self.dying = true;
            self.fade = Some(Fade::new(self.blackout, -1.0, 0.1, FadeAction::Respawn));
        }

        let finishing = self
            .fade
            .as_ref()
            .is_some_and(|f| f.action() == FadeAction::Finish);
        if let Some(dist) = prox.final_goal {
            if dist < config.hit_final_distance && !self.dying && !finishing {
                self.fade = Some(Fade::new(self.blackout, -1.0, 0.1, FadeAction::Finish));
            }
        }
    }

    /// Forward vector: third row of the view rotation.
    fn forward(&self) -> Vec3 {
        let rot = plane_rotation(self.rotation.x, 0, 2) * plane_rotation(self.rotation.y, 1, 2);
        Vec3::new(rot.x_axis.z, rot.y_axis.z, rot.z_axis.z)
    }

    /// Energy modulates speed non-linearly; empty or negative energy stalls
    /// the player rather than flying backward.
    pub fn speed(&self, config: &GameConfig) -> f32 {
        self.energy.max(0.0).sqrt() * config.max_speed
    }
}

fn mix_vec2(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    Vec2::new(mix(a.x, b.x, t), mix(a.y, b.y, t))
}

/// Scale a rotation increment down as the axis approaches extreme angles,
/// but only while driving further in the same direction. Reversing always
/// gets the full increment.
fn soft_increment(current: f32, delta: f32) -> f32 {
    if delta * current > 0.0 {
        delta * (1.0 - smoothstep(FRAC_PI_6, FRAC_PI_4, current.abs()))
    } else {
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: f32 = 1.0 / 60.0;
    const ASPECT: f32 = 16.0 / 9.0;

    /// A state with the initial fade-in already over.
    fn ready_state(config: &GameConfig) -> GameState {
        let mut s = GameState::new(config);
        for _ in 0..10_000 {
            s.update_fade(STEP, config);
            if s.fade.is_none() {
                return s;
            }
        }
        panic!("initial fade never completed");
    }

    fn no_contact() -> Proximity {
        Proximity {
            path: 1.0e6,
            obstacle: 1.0e6,
            final_goal: None,
        }
    }

    #[test]
    fn test_initial_fade_raises_blackout() {
        let config = GameConfig::default();
        let s = ready_state(&config);
        assert!(s.blackout > 0.9);
        assert_eq!(s.finish_state, FinishState::Playing);
    }

    #[test]
    fn test_path_tracking_raises_energy() {
        let config = GameConfig::default();
        let mut s = ready_state(&config);
        s.energy = 0.5;
        s.apply_proximity(
            STEP,
            Proximity {
                path: config.hit_path_distance * 0.5,
                obstacle: 1.0e6,
                final_goal: None,
            },
            &config,
        );
        assert_eq!(s.energy_state, EnergyState::HitPath);
        let expected = 0.5 + config.energy_speed_hit_path * STEP;
        assert!((s.energy - expected).abs() < 1e-6);
    }

    #[test]
    fn test_energy_clamps_at_one() {
        let config = GameConfig::default();
        let mut s = ready_state(&config);
        assert_eq!(s.energy, 1.0);
        s.apply_proximity(
            STEP,
            Proximity {
                path: 0.0,
                obstacle: 1.0e6,
                final_goal: None,
            },
            &config,
        );
        assert_eq!(s.energy, 1.0);
    }

    #[test]
    fn test_obstacle_hit_during_invincibility_falls_through() {
        let config = GameConfig::default();
        let mut s = ready_state(&config);
        // Fresh state still has its starting grace period.
        s.apply_proximity(
            STEP,
            Proximity {
                path: 1.0e6,
                obstacle: config.hit_obst_distance * 0.5,
                final_goal: None,
            },
            &config,
        );
        assert_eq!(s.energy_state, EnergyState::None);
    }

    #[test]
    fn test_obstacle_hit_after_invincibility_drains_energy() {
        let config = GameConfig::default();
        let mut s = ready_state(&config);
        // One long frame burns through the grace period.
        s.begin_frame(config.invincible_time + 1.0, ASPECT, &config)
            .unwrap();
        s.energy = 0.5;
        s.apply_proximity(
            STEP,
            Proximity {
                path: 0.0,
                obstacle: config.hit_obst_distance * 0.5,
                final_goal: None,
            },
            &config,
        );
        assert_eq!(s.energy_state, EnergyState::HitObstacle);
        assert!(s.energy < 0.5);
    }

    #[test]
    fn test_passive_decay_off_path() {
        let config = GameConfig::default();
        let mut s = ready_state(&config);
        s.energy = 0.5;
        s.apply_proximity(STEP, no_contact(), &config);
        assert_eq!(s.energy_state, EnergyState::None);
        assert!(s.energy < 0.5);
    }

    #[test]
    fn test_death_resets_in_place() {
        let config = GameConfig::default();
        let mut s = ready_state(&config);
        s.energy = 0.001;
        // Burn energy to below zero; exactly one blackout starts.
        s.apply_proximity(1.0, no_contact(), &config);
        assert!(s.energy <= 0.0);
        let z_at_death = s.position.z;
        s.rotation = Vec2::new(0.3, -0.2);

        // Death must not retrigger while the blackout runs.
        s.apply_proximity(STEP, no_contact(), &config);

        let mut respawned = false;
        for _ in 0..10_000 {
            s.update_fade(STEP, &config);
            if s.energy == 1.0 {
                respawned = true;
                break;
            }
        }
        assert!(respawned, "respawn never happened");
        assert_eq!(s.rotation, Vec2::ZERO);
        assert!((s.position.z - (z_at_death + config.death_pos_drop)).abs() < 1e-4);
        assert_eq!(s.position.x, 0.0);
        assert_eq!(s.position.y, 0.0);
        // Blackout-in follows the respawn.
        assert!(s.fade.is_some());
        assert!(s.blackout < 0.0);
    }

    #[test]
    fn test_speed_zero_at_or_below_empty() {
        let config = GameConfig::default();
        let mut s = ready_state(&config);
        s.energy = 0.0;
        assert_eq!(s.speed(&config), 0.0);
        s.energy = -0.5;
        assert_eq!(s.speed(&config), 0.0);
    }

    #[test]
    fn test_speed_increases_with_energy() {
        let config = GameConfig::default();
        let mut s = ready_state(&config);
        let mut prev = 0.0;
        for e in [0.1, 0.3, 0.6, 1.0] {
            s.energy = e;
            let v = s.speed(&config);
            assert!(v > prev);
            prev = v;
        }
        assert!((prev - config.max_speed).abs() < 1e-6);
    }

    #[test]
    fn test_forward_motion_decreases_z() {
        let config = GameConfig::default();
        let mut s = ready_state(&config);
        let z0 = s.position.z;
        s.begin_frame(STEP, ASPECT, &config).unwrap();
        assert!(s.position.z < z0);
    }

    #[test]
    fn test_figure_schedule_follows_progress() {
        let config = GameConfig::default();
        let mut s = ready_state(&config);
        assert_eq!(s.figure, 1);

        s.position.z = -config.final_dist / 3.0;
        s.begin_frame(STEP, ASPECT, &config).unwrap();
        // progress 1/3 -> floor(1 + 8/3) = 3, with a fresh grace period.
        assert_eq!(s.figure, 3);
        assert!(s.invincible > 0.0);

        // Only the lower bound is clamped: past the goal depth the index
        // keeps counting up into the kernel's generic fallback shape.
        s.position.z = -config.final_dist * 2.0;
        s.begin_frame(STEP, ASPECT, &config).unwrap();
        assert_eq!(s.figure, 17);
    }

    #[test]
    fn test_final_spawns_exactly_once() {
        let config = GameConfig::default();
        let mut s = ready_state(&config);
        s.position.z = -(config.final_dist - config.camera.far - 1.0);
        let first = s.begin_frame(STEP, ASPECT, &config).unwrap();
        assert!(first.spawn_final);
        let second = s.begin_frame(STEP, ASPECT, &config).unwrap();
        assert!(!second.spawn_final);
    }

    #[test]
    fn test_finish_is_one_way() {
        let config = GameConfig::default();
        let mut s = ready_state(&config);
        s.apply_proximity(
            STEP,
            Proximity {
                path: 1.0e6,
                obstacle: 1.0e6,
                final_goal: Some(config.hit_final_distance * 0.5),
            },
            &config,
        );
        // Blackout-out runs first; the state flips on completion.
        assert_eq!(s.finish_state, FinishState::Playing);
        for _ in 0..10_000 {
            s.update_fade(STEP, &config);
            if s.finish_state == FinishState::JustFinished {
                break;
            }
        }
        assert_eq!(s.finish_state, FinishState::JustFinished);

        // The one-frame marker collapses to Finished and never reopens.
        s.begin_frame(STEP, ASPECT, &config).unwrap();
        assert_eq!(s.finish_state, FinishState::Finished);
        s.apply_proximity(STEP, no_contact(), &config);
        s.begin_frame(STEP, ASPECT, &config).unwrap();
        assert_eq!(s.finish_state, FinishState::Finished);
    }

    #[test]
    fn test_run_end_freezes_gameplay() {
        let config = GameConfig::default();
        let mut s = ready_state(&config);
        assert!(!s.is_frozen());

        // Both post-run states freeze, including the one-frame marker, so
        // the director skips simulation and queries from the frame the run
        // ends onward.
        s.finish_state = FinishState::JustFinished;
        assert!(s.is_frozen());
        s.finish_state = FinishState::Finished;
        assert!(s.is_frozen());

        // Proximity results are ignored once frozen.
        s.energy = 0.5;
        s.apply_proximity(STEP, no_contact(), &config);
        assert_eq!(s.energy, 0.5);
        assert_eq!(s.finish_state, FinishState::Finished);
    }

    #[test]
    fn test_frozen_world_stops_motion() {
        let config = GameConfig::default();
        let mut s = ready_state(&config);
        s.finish_state = FinishState::Finished;
        let pos = s.position;
        let frame = s.begin_frame(STEP, ASPECT, &config).unwrap();
        assert_eq!(s.position, pos);
        assert_eq!(frame.speed, 0.0);
    }

    #[test]
    fn test_soft_clamp_scales_same_direction_only() {
        // Driving further at an extreme angle is attenuated.
        let attenuated = soft_increment(FRAC_PI_4, 0.01);
        assert!(attenuated.abs() < 1e-6);
        // Partway into the band the increment shrinks but survives.
        let partial = soft_increment((FRAC_PI_6 + FRAC_PI_4) / 2.0, 0.01);
        assert!(partial > 0.0 && partial < 0.01);
        // Reversing always applies in full.
        assert_eq!(soft_increment(FRAC_PI_4, -0.01), -0.01);
    }

    #[test]
    fn test_mouse_delta_is_consumed() {
        let config = GameConfig::default();
        let mut s = ready_state(&config);
        s.on_mouse_move(40.0, 0.0);
        s.begin_frame(STEP, ASPECT, &config).unwrap();
        let after_first = s.rotation.x;
        assert!(after_first > 0.0);
        // No further input: damped movement decays, rotation settles.
        for _ in 0..600 {
            s.begin_frame(STEP, ASPECT, &config).unwrap();
        }
        let drift = s.rotation.x - after_first;
        assert!(drift.is_finite());
        let mut still = s.rotation.x;
        s.begin_frame(STEP, ASPECT, &config).unwrap();
        still = (s.rotation.x - still).abs();
        assert!(still < 1e-5);
    }
}
