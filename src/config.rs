//! Game tuning parameters.
//!
//! Everything the integrator and the particle systems read at runtime lives
//! here, so a whole playthrough is described by one `GameConfig` value.

/// Camera frustum parameters.
#[derive(Clone, Copy, Debug)]
pub struct CameraParams {
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

/// All recognized game options with their gameplay effect.
#[derive(Clone, Debug)]
pub struct GameConfig {
    /// Drift speed of the ambient floating dust.
    pub base_floating_speed: f32,
    /// Population of the floating (non-colliding) system.
    pub floating_particle_count: u32,
    /// Population of each collision-type system (path, obstacle, final).
    pub obstacle_particle_count: u32,

    /// Top forward speed at full energy.
    pub max_speed: f32,
    /// Natural log of the per-frame mouse damping constant.
    pub movement_damping_log: f32,
    /// Scale from damped mouse movement to rotation increment.
    pub movement_power: f32,

    /// Proximity below which the camera counts as on the path.
    pub hit_path_distance: f32,
    /// Proximity below which an obstacle hit is registered.
    pub hit_obst_distance: f32,
    /// Proximity below which the final goal is reached.
    pub hit_final_distance: f32,

    /// Energy delta per second while tracking the path.
    pub energy_speed_hit_path: f32,
    /// Energy delta per second while touching an obstacle.
    pub energy_speed_hit_obst: f32,
    /// Passive energy delta per second off the path.
    pub energy_speed_none: f32,

    /// Grace period after each figure change during which obstacles
    /// cannot damage the player.
    pub invincible_time: f32,
    /// How far back (positive z) the camera is dropped on death.
    pub death_pos_drop: f32,
    /// Distance to the goal region along -z.
    pub final_dist: f32,

    /// Per-system colors as `RRGGBB` hex.
    pub floating_color: &'static str,
    pub path_color: &'static str,
    pub obstacle_color: &'static str,
    pub final_color: &'static str,

    pub camera: CameraParams,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            base_floating_speed: 0.2,
            floating_particle_count: 100,
            obstacle_particle_count: 3500,

            max_speed: 10.0,
            movement_damping_log: -0.16,
            movement_power: 0.003,

            hit_path_distance: 0.2,
            hit_obst_distance: 0.12,
            hit_final_distance: 3.0,

            energy_speed_hit_path: 0.15,
            energy_speed_hit_obst: -1.0,
            energy_speed_none: -0.02,

            invincible_time: 2.0,
            death_pos_drop: 10.0,
            final_dist: 300.0,

            floating_color: "ffffff",
            path_color: "7374FF",
            obstacle_color: "FF9A61",
            final_color: "61FFC8",

            camera: CameraParams {
                fov: 1.3,
                near: 0.1,
                far: 50.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_playable() {
        let c = GameConfig::default();
        // Path contact must regain energy faster than passive decay loses it.
        assert!(c.energy_speed_hit_path > 0.0);
        assert!(c.energy_speed_hit_obst < c.energy_speed_none);
        assert!(c.energy_speed_none < 0.0);
        // The obstacle threshold must sit inside the path threshold band.
        assert!(c.hit_obst_distance < c.hit_final_distance);
        assert!(c.camera.near < c.camera.far);
        assert!(c.final_dist > c.camera.far);
    }
}
