//! Experience replay storage and minibatch sampling
//!
//! # Buffer Layout
//!
//! The buffer uses a `[capacity, num_envs]` ring layout: each logical step
//! stores one transition row per parallel environment, and writes wrap
//! around once the capacity is reached. Sampling can either flatten the
//! environment dimension (one big batch for gradient updates) or keep it
//! (per-candidate trajectories for population-based search).

use anyhow::{anyhow, Result};
use rand::Rng;
use tch::{Device, Kind, Tensor};

/// Ring buffer of environment transitions
pub struct ReplayBuffer {
    capacity: usize,
    num_envs: usize,
    obs_dim: usize,
    action_dim: usize,
    device: Device,

    /// Observations: `[capacity][num_envs][obs_dim]`
    observations: Vec<Vec<Vec<f32>>>,

    /// Actions: `[capacity][num_envs][action_dim]`
    actions: Vec<Vec<Vec<f32>>>,

    /// Rewards: `[capacity][num_envs]`
    rewards: Vec<Vec<f32>>,

    /// Next observations: `[capacity][num_envs][obs_dim]`
    next_observations: Vec<Vec<Vec<f32>>>,

    /// Done flags: `[capacity][num_envs]`
    dones: Vec<Vec<bool>>,

    /// Next write position
    pos: usize,

    /// Whether the ring has wrapped at least once
    full: bool,
}

impl ReplayBuffer {
    /// Create a new buffer
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of stored steps per environment
    /// * `num_envs` - Number of parallel environments
    /// * `obs_dim` - Observation dimensionality
    /// * `action_dim` - Action dimensionality
    /// * `device` - Device sampled batches are placed on
    pub fn new(
        capacity: usize,
        num_envs: usize,
        obs_dim: usize,
        action_dim: usize,
        device: Device,
    ) -> Self {
        assert!(capacity > 0, "capacity must be positive");
        assert!(num_envs > 0, "num_envs must be positive");
        Self {
            capacity,
            num_envs,
            obs_dim,
            action_dim,
            device,
            observations: Vec::with_capacity(capacity.min(4096)),
            actions: Vec::with_capacity(capacity.min(4096)),
            rewards: Vec::with_capacity(capacity.min(4096)),
            next_observations: Vec::with_capacity(capacity.min(4096)),
            dones: Vec::with_capacity(capacity.min(4096)),
            pos: 0,
            full: false,
        }
    }

    /// Append one transition row per environment, taking ownership of the
    /// batched arrays
    pub fn add_trajectory(
        &mut self,
        observations: Vec<Vec<f32>>,
        actions: Vec<Vec<f32>>,
        rewards: &[f32],
        next_observations: Vec<Vec<f32>>,
        dones: &[bool],
    ) {
        assert_eq!(observations.len(), self.num_envs, "observation batch size mismatch");
        assert_eq!(actions.len(), self.num_envs, "action batch size mismatch");
        assert_eq!(rewards.len(), self.num_envs, "reward batch size mismatch");
        assert_eq!(next_observations.len(), self.num_envs, "next observation batch size mismatch");
        assert_eq!(dones.len(), self.num_envs, "done batch size mismatch");

        if self.full || self.pos < self.observations.len() {
            self.observations[self.pos] = observations;
            self.actions[self.pos] = actions;
            self.rewards[self.pos] = rewards.to_vec();
            self.next_observations[self.pos] = next_observations;
            self.dones[self.pos] = dones.to_vec();
        } else {
            self.observations.push(observations);
            self.actions.push(actions);
            self.rewards.push(rewards.to_vec());
            self.next_observations.push(next_observations);
            self.dones.push(dones.to_vec());
        }

        self.pos += 1;
        if self.pos == self.capacity {
            self.pos = 0;
            self.full = true;
        }
    }

    /// Number of stored steps (not transitions; multiply by `num_envs`)
    pub fn len(&self) -> usize {
        if self.full {
            self.capacity
        } else {
            self.pos
        }
    }

    /// Whether the buffer holds no transitions
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of parallel environments per stored step
    pub fn num_envs(&self) -> usize {
        self.num_envs
    }

    /// Sample a minibatch uniformly at random (with replacement)
    ///
    /// With `flatten_env` the environment dimension is folded into the batch
    /// dimension and tensors come back as `[batch, ...]`; without it, whole
    /// steps are sampled and tensors come back as `[batch, num_envs, ...]`.
    pub fn sample(&self, batch_size: usize, flatten_env: bool) -> Result<TransitionBatch> {
        if self.is_empty() {
            return Err(anyhow!("cannot sample from an empty buffer"));
        }
        if batch_size == 0 {
            return Err(anyhow!("batch_size must be positive"));
        }

        let mut rng = rand::thread_rng();
        let len = self.len();

        if flatten_env {
            let indices: Vec<(usize, usize)> = (0..batch_size)
                .map(|_| (rng.gen_range(0..len), rng.gen_range(0..self.num_envs)))
                .collect();
            Ok(self.gather_flat(&indices))
        } else {
            let steps: Vec<usize> = (0..batch_size).map(|_| rng.gen_range(0..len)).collect();
            Ok(self.gather_steps(&steps))
        }
    }

    /// Every stored step, in insertion order, with the environment dimension
    /// kept
    pub fn all(&self) -> Result<TransitionBatch> {
        if self.is_empty() {
            return Err(anyhow!("buffer is empty"));
        }
        let steps: Vec<usize> = (0..self.len()).collect();
        Ok(self.gather_steps(&steps))
    }

    /// Forget everything stored
    pub fn reset(&mut self) {
        self.pos = 0;
        self.full = false;
        self.observations.clear();
        self.actions.clear();
        self.rewards.clear();
        self.next_observations.clear();
        self.dones.clear();
    }

    fn gather_flat(&self, indices: &[(usize, usize)]) -> TransitionBatch {
        let n = indices.len() as i64;
        let mut obs = Vec::with_capacity(indices.len() * self.obs_dim);
        let mut actions = Vec::with_capacity(indices.len() * self.action_dim);
        let mut rewards = Vec::with_capacity(indices.len());
        let mut next_obs = Vec::with_capacity(indices.len() * self.obs_dim);
        let mut dones = Vec::with_capacity(indices.len());

        for &(step, env) in indices {
            obs.extend_from_slice(&self.observations[step][env]);
            actions.extend_from_slice(&self.actions[step][env]);
            rewards.push(self.rewards[step][env]);
            next_obs.extend_from_slice(&self.next_observations[step][env]);
            dones.push(if self.dones[step][env] { 1.0 } else { 0.0 });
        }

        TransitionBatch {
            observations: self.to_device(Tensor::from_slice(&obs).view([n, self.obs_dim as i64])),
            actions: self.to_device(Tensor::from_slice(&actions).view([n, self.action_dim as i64])),
            rewards: self.to_device(Tensor::from_slice(&rewards)),
            next_observations: self
                .to_device(Tensor::from_slice(&next_obs).view([n, self.obs_dim as i64])),
            dones: self.to_device(Tensor::from_slice(&dones)),
        }
    }

    fn gather_steps(&self, steps: &[usize]) -> TransitionBatch {
        let n = steps.len() as i64;
        let envs = self.num_envs as i64;
        let mut obs = Vec::with_capacity(steps.len() * self.num_envs * self.obs_dim);
        let mut actions = Vec::with_capacity(steps.len() * self.num_envs * self.action_dim);
        let mut rewards = Vec::with_capacity(steps.len() * self.num_envs);
        let mut next_obs = Vec::with_capacity(steps.len() * self.num_envs * self.obs_dim);
        let mut dones = Vec::with_capacity(steps.len() * self.num_envs);

        for &step in steps {
            for env in 0..self.num_envs {
                obs.extend_from_slice(&self.observations[step][env]);
                actions.extend_from_slice(&self.actions[step][env]);
                rewards.push(self.rewards[step][env]);
                next_obs.extend_from_slice(&self.next_observations[step][env]);
                dones.push(if self.dones[step][env] { 1.0 } else { 0.0 });
            }
        }

        TransitionBatch {
            observations: self
                .to_device(Tensor::from_slice(&obs).view([n, envs, self.obs_dim as i64])),
            actions: self
                .to_device(Tensor::from_slice(&actions).view([n, envs, self.action_dim as i64])),
            rewards: self.to_device(Tensor::from_slice(&rewards).view([n, envs])),
            next_observations: self
                .to_device(Tensor::from_slice(&next_obs).view([n, envs, self.obs_dim as i64])),
            dones: self.to_device(Tensor::from_slice(&dones).view([n, envs])),
        }
    }

    fn to_device(&self, tensor: Tensor) -> Tensor {
        tensor.to_kind(Kind::Float).to_device(self.device)
    }
}

/// A batch of transitions ready for an update engine
///
/// Done flags are float tensors (0.0 / 1.0) so they can enter target
/// arithmetic directly.
#[derive(Debug)]
pub struct TransitionBatch {
    /// Observations: `[batch, obs_dim]` or `[batch, num_envs, obs_dim]`
    pub observations: Tensor,

    /// Actions: `[batch, action_dim]` or `[batch, num_envs, action_dim]`
    pub actions: Tensor,

    /// Rewards: `[batch]` or `[batch, num_envs]`
    pub rewards: Tensor,

    /// Next observations, shaped like `observations`
    pub next_observations: Tensor,

    /// Done flags, shaped like `rewards`
    pub dones: Tensor,
}

impl TransitionBatch {
    /// Leading batch dimension
    pub fn len(&self) -> usize {
        self.rewards.size()[0] as usize
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
