//! Environment traits and implementations
//!
//! This module defines the core environment interface and provides a
//! built-in continuous-control environment. The training loops only ever
//! talk to the batched [`VecEnv`] boundary; a single environment is a pool
//! of one.

use anyhow::Result;

/// Core trait for a single RL environment instance
///
/// Actions are continuous vectors; discrete environments can interpret the
/// components however they like.
pub trait Environment: Send {
    /// Reset the environment and return the initial observation
    fn reset(&mut self) -> Result<Vec<f32>>;

    /// Step the environment with an action
    fn step(&mut self, action: &[f32]) -> Result<StepResult>;

    /// Observation dimensionality
    fn observation_dim(&self) -> usize;

    /// Action dimensionality
    fn action_dim(&self) -> usize;

    /// Inclusive action bounds, identical across components
    fn action_bounds(&self) -> (f32, f32) {
        (-1.0, 1.0)
    }

    /// Render the current state; no-op by default
    fn render(&mut self) {}
}

/// Result of stepping a single environment
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Next observation
    pub observation: Vec<f32>,

    /// Reward received
    pub reward: f32,

    /// Whether the episode ended (terminated or truncated)
    pub done: bool,

    /// Additional info
    pub info: StepInfo,
}

/// Additional step information
#[derive(Debug, Clone, Default)]
pub struct StepInfo {
    // Add custom fields as needed
}

/// Batched environment boundary used by the training loops
///
/// Batched arrays carry one row per parallel environment; a non-vectorized
/// setup is simply a batch of one.
pub trait VecEnv {
    /// Number of parallel environments
    fn num_envs(&self) -> usize;

    /// Observation dimensionality
    fn observation_dim(&self) -> usize;

    /// Action dimensionality
    fn action_dim(&self) -> usize;

    /// Inclusive action bounds, identical across environments
    fn action_bounds(&self) -> (f32, f32);

    /// Reset every environment, returning the batched initial observations
    fn reset(&mut self) -> Result<Vec<Vec<f32>>>;

    /// Reset a single environment by index, leaving the others untouched
    fn reset_env(&mut self, index: usize) -> Result<Vec<f32>>;

    /// Step every environment with one action row each
    fn step(&mut self, actions: &[Vec<f32>]) -> Result<VecStepResult>;

    /// Render; no-op by default
    fn render(&mut self) {}
}

/// Result of stepping a batched environment
#[derive(Debug, Clone)]
pub struct VecStepResult {
    /// Next observations, one row per environment
    pub observations: Vec<Vec<f32>>,

    /// Rewards, one per environment
    pub rewards: Vec<f32>,

    /// Done flags, one per environment
    pub dones: Vec<bool>,

    /// Additional info, one per environment
    pub infos: Vec<StepInfo>,
}

pub mod pendulum;
pub mod pool;

pub use pendulum::Pendulum;
pub use pool::EnvPool;
