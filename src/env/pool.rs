//! Vectorized environment pool for parallel execution
//!
//! Steps multiple environment instances in lockstep, batched along a
//! leading dimension, fanning the per-instance work out across Rayon's
//! thread pool. The pool is the canonical [`VecEnv`] implementation; the
//! training loops never touch individual environments directly.

use anyhow::{anyhow, Result};
use rayon::prelude::*;

use crate::env::{Environment, VecEnv, VecStepResult};

/// A pool of environments stepped in lockstep
///
/// For N environments with average step time T, stepping sequentially costs
/// O(N * T) while the pool costs O(max T) when N fits the core count.
pub struct EnvPool<E: Environment> {
    envs: Vec<E>,
    num_envs: usize,
}

impl<E: Environment> EnvPool<E> {
    /// Create a new environment pool
    ///
    /// # Arguments
    ///
    /// * `env_fn` - Factory function to create environment instances
    /// * `num_envs` - Number of parallel environments
    pub fn new<F>(env_fn: F, num_envs: usize) -> Self
    where
        F: Fn() -> E,
    {
        assert!(num_envs > 0, "pool needs at least one environment");
        let envs = (0..num_envs).map(|_| env_fn()).collect();
        Self { envs, num_envs }
    }

    /// Wrap a single environment instance as a pool of one
    pub fn single(env: E) -> Self {
        Self { envs: vec![env], num_envs: 1 }
    }
}

impl<E: Environment> VecEnv for EnvPool<E> {
    fn num_envs(&self) -> usize {
        self.num_envs
    }

    fn observation_dim(&self) -> usize {
        self.envs[0].observation_dim()
    }

    fn action_dim(&self) -> usize {
        self.envs[0].action_dim()
    }

    fn action_bounds(&self) -> (f32, f32) {
        self.envs[0].action_bounds()
    }

    fn reset(&mut self) -> Result<Vec<Vec<f32>>> {
        self.envs.par_iter_mut().map(|env| env.reset()).collect()
    }

    fn reset_env(&mut self, index: usize) -> Result<Vec<f32>> {
        self.envs
            .get_mut(index)
            .ok_or_else(|| anyhow!("environment index {index} out of range"))?
            .reset()
    }

    fn step(&mut self, actions: &[Vec<f32>]) -> Result<VecStepResult> {
        if actions.len() != self.num_envs {
            return Err(anyhow!(
                "got {} action rows for {} environments",
                actions.len(),
                self.num_envs
            ));
        }

        let results = self
            .envs
            .par_iter_mut()
            .zip(actions.par_iter())
            .map(|(env, action)| env.step(action))
            .collect::<Result<Vec<_>>>()?;

        let mut observations = Vec::with_capacity(self.num_envs);
        let mut rewards = Vec::with_capacity(self.num_envs);
        let mut dones = Vec::with_capacity(self.num_envs);
        let mut infos = Vec::with_capacity(self.num_envs);

        for result in results {
            observations.push(result.observation);
            rewards.push(result.reward);
            dones.push(result.done);
            infos.push(result.info);
        }

        Ok(VecStepResult { observations, rewards, dones, infos })
    }

    fn render(&mut self) {
        for env in &mut self.envs {
            env.render();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Pendulum;

    #[test]
    fn test_pool_creation() {
        let pool = EnvPool::new(Pendulum::new, 4);
        assert_eq!(pool.num_envs(), 4);
        assert_eq!(pool.observation_dim(), 3);
        assert_eq!(pool.action_dim(), 1);
    }

    #[test]
    fn test_pool_reset() {
        let mut pool = EnvPool::new(Pendulum::new, 4);
        let observations = pool.reset().unwrap();

        assert_eq!(observations.len(), 4);
        for obs in observations {
            assert_eq!(obs.len(), 3);
        }
    }

    #[test]
    fn test_pool_step() {
        let mut pool = EnvPool::new(Pendulum::new, 4);
        pool.reset().unwrap();

        let actions = vec![vec![0.5]; 4];
        let result = pool.step(&actions).unwrap();

        assert_eq!(result.observations.len(), 4);
        assert_eq!(result.rewards.len(), 4);
        assert_eq!(result.dones.len(), 4);
    }

    #[test]
    fn test_pool_step_wrong_action_count() {
        let mut pool = EnvPool::new(Pendulum::new, 4);
        pool.reset().unwrap();

        let actions = vec![vec![0.0]; 2];
        assert!(pool.step(&actions).is_err());
    }

    #[test]
    fn test_pool_reset_single_env() {
        let mut pool = EnvPool::new(Pendulum::new, 4);
        pool.reset().unwrap();

        let obs = pool.reset_env(2).unwrap();
        assert_eq!(obs.len(), 3);
        assert!(pool.reset_env(9).is_err());
    }

    #[test]
    fn test_single_wrapper() {
        let mut pool = EnvPool::single(Pendulum::new());
        assert_eq!(pool.num_envs(), 1);
        assert_eq!(pool.reset().unwrap().len(), 1);
    }
}
