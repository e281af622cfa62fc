//! Initial particle generation policy.
//!
//! Every particle starts at an out-of-frustum sentinel depth; the simulate
//! kernel notices the invalid position on the first step and respawns it
//! in-frustum with the same policy it uses for the rest of the run. The
//! variants differ only in sentinel depth and velocity distribution.

use super::buffers::ParticleData;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Sentinel depth for floating particles, far beyond any far plane.
pub const FLOATING_SENTINEL_Z: f32 = 500.0;
/// Sentinel depth for collision-type particles.
pub const COLLISION_SENTINEL_Z: f32 = 100.0;
/// Speed constant for collision-type initial velocities.
pub const COLLISION_SPAWN_SPEED: f32 = 1.0;

/// Generator for initial buffer contents.
pub struct ParticleSpawner {
    rng: SmallRng,
}

impl ParticleSpawner {
    pub fn new() -> Self {
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42);
        Self::with_seed(seed)
    }

    /// Deterministic generator for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    fn signed(&mut self) -> f32 {
        self.rng.gen::<f32>() * 2.0 - 1.0
    }

    /// Ambient dust: sentinel position, small random drift velocity.
    pub fn floating(&mut self, count: u32, base_speed: f32) -> Vec<ParticleData> {
        (0..count)
            .map(|_| {
                let velocity = [
                    base_speed * self.signed(),
                    base_speed * self.signed(),
                    base_speed * self.signed(),
                ];
                ParticleData::new([0.0, 0.0, FLOATING_SENTINEL_Z], velocity)
            })
            .collect()
    }

    /// Collision-type systems: sentinel position, unit-random direction
    /// scaled by a fixed speed constant.
    pub fn collision(&mut self, count: u32) -> Vec<ParticleData> {
        (0..count)
            .map(|_| {
                let mut v = [self.signed(), self.signed(), self.signed()];
                let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
                if len > 1e-6 {
                    for c in &mut v {
                        *c *= COLLISION_SPAWN_SPEED / len;
                    }
                }
                ParticleData::new([0.0, 0.0, COLLISION_SENTINEL_Z], v)
            })
            .collect()
    }
}

impl Default for ParticleSpawner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn magnitude(v: [f32; 3]) -> f32 {
        (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
    }

    #[test]
    fn test_exact_particle_count() {
        let mut spawner = ParticleSpawner::with_seed(1);
        assert_eq!(spawner.floating(100, 0.2).len(), 100);
        assert_eq!(spawner.collision(3500).len(), 3500);
    }

    #[test]
    fn test_positions_are_bounded_sentinels() {
        let mut spawner = ParticleSpawner::with_seed(2);
        for p in spawner.floating(500, 0.2) {
            assert_eq!(p.position, [0.0, 0.0, FLOATING_SENTINEL_Z]);
        }
        for p in spawner.collision(500) {
            assert_eq!(p.position, [0.0, 0.0, COLLISION_SENTINEL_Z]);
        }
    }

    #[test]
    fn test_floating_velocity_scale() {
        let mut spawner = ParticleSpawner::with_seed(3);
        let base = 0.2;
        for p in spawner.floating(1000, base) {
            for c in p.velocity {
                assert!(c.is_finite());
                assert!(c.abs() <= base + 1e-6);
            }
        }
    }

    #[test]
    fn test_collision_velocity_is_unit_direction() {
        let mut spawner = ParticleSpawner::with_seed(4);
        for p in spawner.collision(1000) {
            let m = magnitude(p.velocity);
            assert!(m.is_finite());
            assert!((m - COLLISION_SPAWN_SPEED).abs() < 1e-3);
        }
    }

    #[test]
    fn test_deterministic_with_same_seed() {
        let a = ParticleSpawner::with_seed(7).collision(16);
        let b = ParticleSpawner::with_seed(7).collision(16);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.velocity, y.velocity);
        }
    }
}
