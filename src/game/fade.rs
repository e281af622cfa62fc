//! Screen fade interpolation.
//!
//! At most one fade runs at a time. Each fade eases the blackout value
//! toward a target and optionally carries an action that fires once the
//! value has effectively arrived. Starting a new fade replaces whatever
//! was running.

use crate::math::{mix, mix_factor};

/// What happens when a fade completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FadeAction {
    /// Nothing; the fade was purely visual.
    None,
    /// Reset the player after a death blackout.
    Respawn,
    /// Enter the finished state after the goal blackout.
    Finish,
}

/// An exponential ease of the blackout value toward a target.
pub struct Fade {
    current: f32,
    initial: f32,
    target: f32,
    retain_log: f32,
    action: FadeAction,
}

impl Fade {
    /// `rate` is the fraction of the remaining distance covered per
    /// reference frame, e.g. 0.1 closes 10% of the gap each frame at
    /// 60 fps.
    pub fn new(initial: f32, target: f32, rate: f32, action: FadeAction) -> Self {
        debug_assert!(rate > 0.0 && rate < 1.0);
        Self {
            current: initial,
            initial,
            target,
            retain_log: (1.0 - rate).ln(),
            action,
        }
    }

    pub fn value(&self) -> f32 {
        self.current
    }

    pub fn action(&self) -> FadeAction {
        self.action
    }

    /// Advance by `dt` seconds. Returns `true` once the remaining gap has
    /// shrunk below 1% of the initial gap; the exponential never reaches
    /// the target exactly.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.current = mix(self.target, self.current, mix_factor(dt, self.retain_log));
        (self.current - self.target).abs() < (self.initial - self.target).abs() * 0.01
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: f32 = 1.0 / 60.0;

    fn run_to_completion(fade: &mut Fade) -> u32 {
        let mut frames = 0;
        while !fade.advance(STEP) {
            frames += 1;
            assert!(frames < 10_000, "fade never completed");
        }
        frames
    }

    #[test]
    fn test_fade_converges_to_target() {
        let mut fade = Fade::new(-1.0, 1.0, 0.05, FadeAction::None);
        run_to_completion(&mut fade);
        assert!((fade.value() - 1.0).abs() < 0.02);
    }

    #[test]
    fn test_fade_is_monotone() {
        let mut fade = Fade::new(1.0, -1.0, 0.1, FadeAction::Respawn);
        let mut prev = fade.value();
        for _ in 0..100 {
            fade.advance(STEP);
            assert!(fade.value() <= prev + 1e-6);
            prev = fade.value();
        }
    }

    #[test]
    fn test_faster_rate_finishes_sooner() {
        let slow = run_to_completion(&mut Fade::new(0.0, 1.0, 0.05, FadeAction::None));
        let fast = run_to_completion(&mut Fade::new(0.0, 1.0, 0.1, FadeAction::None));
        assert!(fast < slow);
    }

    #[test]
    fn test_timestep_invariance() {
        // Two small steps cover the same ground as one double step.
        let mut halves = Fade::new(0.0, 1.0, 0.1, FadeAction::None);
        halves.advance(STEP / 2.0);
        halves.advance(STEP / 2.0);
        let mut whole = Fade::new(0.0, 1.0, 0.1, FadeAction::None);
        whole.advance(STEP);
        assert!((halves.value() - whole.value()).abs() < 1e-5);
    }

    #[test]
    fn test_action_is_preserved() {
        let fade = Fade::new(1.0, -1.0, 0.1, FadeAction::Finish);
        assert_eq!(fade.action(), FadeAction::Finish);
    }
}
