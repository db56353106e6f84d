//! Critic update engine
//!
//! Stateless configured functors, one per regression mode, each performing
//! exactly one gradient step of value/Q regression and returning the
//! detached loss. All three share [`run_optimizer`] for the
//! zero-backward-clip-step sequence, build their optimizer fresh from the
//! configured factory over the live critic variable store, and never touch
//! actor or target-network parameters.

use anyhow::{anyhow, Result};
use tch::{nn, Tensor};

use crate::buffer::TransitionBatch;
use crate::config::CriticUpdaterConfig;
use crate::model::{CriticStack, Model};
use crate::train::targets::soft_q_target;

/// Output record of a single gradient step
#[derive(Debug, Clone, Copy)]
pub struct UpdateLog {
    /// Detached scalar loss
    pub loss: f64,
}

/// Run one optimization step
///
/// Clears prior gradients, backpropagates, clips the gradient norm only
/// when the threshold is strictly positive, then applies the update. The
/// ordering is load-bearing: clipping must see the fresh gradients and must
/// happen before the step.
pub fn run_optimizer(optimizer: &mut nn::Optimizer, loss: &Tensor, max_grad: f64) {
    optimizer.zero_grad();
    loss.backward();
    if max_grad > 0.0 {
        optimizer.clip_grad_norm(max_grad);
    }
    optimizer.step();
}

fn critic_stack<M: Model>(model: &M) -> Result<&CriticStack> {
    model.critics().ok_or_else(|| anyhow!("model exposes no critic"))
}

fn detached_loss(loss: &Tensor) -> f64 {
    f64::try_from(&loss.detach()).unwrap_or(0.0)
}

/// Regression for a value function estimator
///
/// Regresses the model's critic path toward externally computed returns
/// (TD values, Monte-Carlo values, and so on).
pub struct ValueRegression {
    config: CriticUpdaterConfig,
}

impl ValueRegression {
    /// Create an updater from a validated configuration
    pub fn new(config: CriticUpdaterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Perform one optimization step
    ///
    /// # Arguments
    ///
    /// * `model` - Model carrying the critic to update
    /// * `observations` - Observation batch `[batch, obs_dim]`
    /// * `returns` - Regression targets `[batch]`
    pub fn update<M: Model>(
        &self,
        model: &M,
        observations: &Tensor,
        returns: &Tensor,
    ) -> Result<UpdateLog> {
        let critics = critic_stack(model)?;
        let mut optimizer =
            self.config.optimizer.build(critics.var_store(), self.config.learning_rate)?;

        let values = critics.predict(observations, None)?;
        let loss = self.config.loss.compute(&values, returns);
        run_optimizer(&mut optimizer, &loss, self.config.max_grad);

        Ok(UpdateLog { loss: detached_loss(&loss) })
    }
}

/// Regression for a Q function estimator
///
/// As [`ValueRegression`] with an optional action batch, required whenever
/// the critic is action-conditioned (continuous-control Q functions).
pub struct QRegression {
    config: CriticUpdaterConfig,
}

impl QRegression {
    /// Create an updater from a validated configuration
    pub fn new(config: CriticUpdaterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Perform one optimization step
    ///
    /// # Arguments
    ///
    /// * `model` - Model carrying the critic to update
    /// * `observations` - Observation batch `[batch, obs_dim]`
    /// * `returns` - Regression targets `[batch]`
    /// * `actions` - Action batch `[batch, action_dim]`; omitted for
    ///   action-free critics
    pub fn update<M: Model>(
        &self,
        model: &M,
        observations: &Tensor,
        returns: &Tensor,
        actions: Option<&Tensor>,
    ) -> Result<UpdateLog> {
        let critics = critic_stack(model)?;
        let mut optimizer =
            self.config.optimizer.build(critics.var_store(), self.config.learning_rate)?;

        let q_values = critics.predict(observations, actions)?;
        let loss = self.config.loss.compute(&q_values, returns);
        run_optimizer(&mut optimizer, &loss, self.config.max_grad);

        Ok(UpdateLog { loss: detached_loss(&loss) })
    }
}

/// Soft Q regression toward entropy-regularized bootstrapped targets
///
/// The soft-actor-critic critic update: next actions are sampled from the
/// model's current policy, the next-state value comes from the stack's
/// most stable estimator (min-clipped targets when available), and both
/// live critics regress to the same stop-gradient target.
pub struct SoftQRegression {
    config: CriticUpdaterConfig,
}

impl SoftQRegression {
    /// Create an updater from a validated configuration
    pub fn new(config: CriticUpdaterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Perform one optimization step
    ///
    /// # Arguments
    ///
    /// * `model` - Actor-critic model; needs both an action distribution
    ///   and a critic stack
    /// * `batch` - Flattened transition batch
    /// * `alpha` - Entropy temperature
    /// * `gamma` - Discount factor
    pub fn update<M: Model>(
        &self,
        model: &M,
        batch: &TransitionBatch,
        alpha: f64,
        gamma: f64,
    ) -> Result<UpdateLog> {
        let critics = critic_stack(model)?;
        let mut optimizer =
            self.config.optimizer.build(critics.var_store(), self.config.learning_rate)?;

        let distribution = model.action_distribution(&batch.next_observations)?;
        let next_actions = distribution.rsample();
        let log_probs = distribution.log_prob(&next_actions);

        let target = tch::no_grad(|| -> Result<Tensor> {
            let next_q = critics.bootstrap(&batch.next_observations, Some(&next_actions))?;
            Ok(soft_q_target(&batch.rewards, &batch.dones, &next_q, &log_probs, alpha, gamma))
        })?;

        let predictions = critics.predict(&batch.observations, Some(&batch.actions))?;
        let mut loss = self.config.loss.compute(&predictions, &target);
        if let Some(second) = critics.predict_second(&batch.observations, Some(&batch.actions))? {
            loss = loss + self.config.loss.compute(&second, &target);
        }
        run_optimizer(&mut optimizer, &loss, self.config.max_grad);

        Ok(UpdateLog { loss: detached_loss(&loss) })
    }
}
