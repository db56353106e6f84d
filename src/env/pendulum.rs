//! Pendulum swing-up environment
//!
//! Classic continuous-control benchmark: swing an underactuated pendulum
//! upright and hold it there by applying bounded torque. There is no failure
//! state; episodes end by truncation after a fixed number of steps.
//!
//! # Reference
//!
//! Dynamics match Gym Pendulum-v1:
//! <https://github.com/openai/gym/blob/master/gym/envs/classic_control/pendulum.py>

use anyhow::Result;
use rand::Rng;

use crate::env::{Environment, StepInfo, StepResult};

const MAX_SPEED: f32 = 8.0;
const MAX_TORQUE: f32 = 2.0;
const DT: f32 = 0.05;
const GRAVITY: f32 = 10.0;
const MASS: f32 = 1.0;
const LENGTH: f32 = 1.0;
const MAX_STEPS: usize = 200;

/// Pendulum swing-up environment
///
/// State is (angle, angular velocity); observations are
/// `[cos(theta), sin(theta), theta_dot]` and the single action component is
/// a torque in `[-2, 2]`.
#[derive(Debug)]
pub struct Pendulum {
    theta: f32,
    theta_dot: f32,
    steps: usize,
    max_steps: usize,
}

impl Pendulum {
    /// Create a new pendulum with the default 200-step episode length
    pub fn new() -> Self {
        Self { theta: 0.0, theta_dot: 0.0, steps: 0, max_steps: MAX_STEPS }
    }

    /// Create a pendulum with a custom episode length
    pub fn with_max_steps(max_steps: usize) -> Self {
        Self { max_steps, ..Self::new() }
    }

    fn observation(&self) -> Vec<f32> {
        vec![self.theta.cos(), self.theta.sin(), self.theta_dot]
    }
}

impl Default for Pendulum {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for Pendulum {
    fn reset(&mut self) -> Result<Vec<f32>> {
        let mut rng = rand::thread_rng();
        self.theta = rng.gen_range(-std::f32::consts::PI..std::f32::consts::PI);
        self.theta_dot = rng.gen_range(-1.0..1.0);
        self.steps = 0;
        Ok(self.observation())
    }

    fn step(&mut self, action: &[f32]) -> Result<StepResult> {
        let torque = action.first().copied().unwrap_or(0.0).clamp(-MAX_TORQUE, MAX_TORQUE);

        let cost = angle_normalize(self.theta).powi(2)
            + 0.1 * self.theta_dot.powi(2)
            + 0.001 * torque.powi(2);

        self.theta_dot += (3.0 * GRAVITY / (2.0 * LENGTH) * self.theta.sin()
            + 3.0 / (MASS * LENGTH * LENGTH) * torque)
            * DT;
        self.theta_dot = self.theta_dot.clamp(-MAX_SPEED, MAX_SPEED);
        self.theta = angle_normalize(self.theta + self.theta_dot * DT);
        self.steps += 1;

        Ok(StepResult {
            observation: self.observation(),
            reward: -cost,
            done: self.steps >= self.max_steps,
            info: StepInfo::default(),
        })
    }

    fn observation_dim(&self) -> usize {
        3
    }

    fn action_dim(&self) -> usize {
        1
    }

    fn action_bounds(&self) -> (f32, f32) {
        (-MAX_TORQUE, MAX_TORQUE)
    }
}

/// Normalize an angle to `[-pi, pi]`
fn angle_normalize(angle: f32) -> f32 {
    let pi = std::f32::consts::PI;
    let two_pi = 2.0 * pi;
    ((angle + pi) % two_pi + two_pi) % two_pi - pi
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_bounds() {
        let mut env = Pendulum::new();
        let obs = env.reset().unwrap();

        assert_eq!(obs.len(), 3);
        assert!((obs[0] * obs[0] + obs[1] * obs[1] - 1.0).abs() < 1e-5);
        assert!(obs[2].abs() <= 1.0);
    }

    #[test]
    fn test_step_reward_is_cost() {
        let mut env = Pendulum::new();
        env.reset().unwrap();

        let result = env.step(&[1.0]).unwrap();
        assert!(result.reward <= 0.0);
        assert!(!result.done);
    }

    #[test]
    fn test_truncation() {
        let mut env = Pendulum::with_max_steps(3);
        env.reset().unwrap();

        assert!(!env.step(&[0.0]).unwrap().done);
        assert!(!env.step(&[0.0]).unwrap().done);
        assert!(env.step(&[0.0]).unwrap().done);
    }

    #[test]
    fn test_torque_clamped() {
        let mut env_small = Pendulum::new();
        let mut env_large = Pendulum::new();
        env_small.reset().unwrap();
        env_large.theta = env_small.theta;
        env_large.theta_dot = env_small.theta_dot;

        let small = env_small.step(&[2.0]).unwrap();
        let large = env_large.step(&[50.0]).unwrap();
        assert_eq!(small.observation, large.observation);
    }

    #[test]
    fn test_angle_normalize() {
        let pi = std::f32::consts::PI;

        assert!((angle_normalize(0.0)).abs() < 1e-5);
        assert!((angle_normalize(3.0 * pi) - (-pi)).abs() < 1e-5);
        assert!((angle_normalize(0.5 * pi) - 0.5 * pi).abs() < 1e-5);
    }
}
