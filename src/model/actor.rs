//! Gaussian policy networks and composite models

use anyhow::{anyhow, Result};
use tch::{nn, nn::Module, Device, Tensor};

use crate::model::{CriticStack, GaussianDistribution, Model};

const LOG_STD_MIN: f64 = -20.0;
const LOG_STD_MAX: f64 = 2.0;

/// Stochastic policy network emitting a diagonal Gaussian over actions
///
/// A shared trunk feeds separate mean and log-std heads; the log-std is
/// clamped to keep the distribution numerically sane early in training.
pub struct GaussianActor {
    vs: nn::VarStore,
    trunk: nn::Sequential,
    mean_head: nn::Linear,
    log_std_head: nn::Linear,
}

impl GaussianActor {
    /// Create a new actor
    ///
    /// # Arguments
    ///
    /// * `obs_dim` - Observation space dimensionality
    /// * `action_dim` - Action space dimensionality
    /// * `hidden_dim` - Size of hidden layers
    pub fn new(obs_dim: i64, action_dim: i64, hidden_dim: i64, device: Device) -> Self {
        let vs = nn::VarStore::new(device);
        let root = vs.root();

        let trunk = nn::seq()
            .add(nn::linear(&root / "trunk" / "fc1", obs_dim, hidden_dim, Default::default()))
            .add_fn(|x| x.relu())
            .add(nn::linear(&root / "trunk" / "fc2", hidden_dim, hidden_dim, Default::default()))
            .add_fn(|x| x.relu());

        let mean_head = nn::linear(&root / "mean", hidden_dim, action_dim, Default::default());
        let log_std_head =
            nn::linear(&root / "log_std", hidden_dim, action_dim, Default::default());

        Self { vs, trunk, mean_head, log_std_head }
    }

    /// The policy distribution for an observation batch
    pub fn distribution(&self, observations: &Tensor) -> GaussianDistribution {
        let features = self.trunk.forward(observations);
        let mean = self.mean_head.forward(&features);
        let log_std = self.log_std_head.forward(&features).clamp(LOG_STD_MIN, LOG_STD_MAX);
        GaussianDistribution::new(mean, log_std.exp())
    }

    /// The actor's parameter set
    pub fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }
}

/// Actor paired with a critic stack
///
/// The standard composite model for off-policy continuous control: a
/// Gaussian actor plus whichever critic topology the caller configured.
pub struct SacModel {
    actor: GaussianActor,
    critics: CriticStack,
    device: Device,
}

impl SacModel {
    /// Create a model from dimensions and a pre-built critic stack
    ///
    /// The actor is created on the same device as the critics.
    pub fn new(obs_dim: i64, action_dim: i64, hidden_dim: i64, critics: CriticStack) -> Self {
        let device = critics.device();
        let actor = GaussianActor::new(obs_dim, action_dim, hidden_dim, device);
        Self { actor, critics, device }
    }

    /// The actor network
    pub fn actor(&self) -> &GaussianActor {
        &self.actor
    }

    /// Mutable critic stack, e.g. for target synchronization
    pub fn critics_mut(&mut self) -> &mut CriticStack {
        &mut self.critics
    }
}

impl Model for SacModel {
    fn device(&self) -> Device {
        self.device
    }

    fn act(&self, observations: &Tensor) -> Result<Tensor> {
        Ok(self.actor.distribution(observations).sample())
    }

    fn action_distribution(&self, observations: &Tensor) -> Result<GaussianDistribution> {
        Ok(self.actor.distribution(observations))
    }

    fn critics(&self) -> Option<&CriticStack> {
        Some(&self.critics)
    }
}

/// A bare critic with no actor attached
///
/// Useful for plain value or Q regression where no policy network exists.
/// Action-producing calls fail with a model-shape error.
pub struct CriticModel {
    critics: CriticStack,
}

impl CriticModel {
    /// Wrap a critic stack
    pub fn new(critics: CriticStack) -> Self {
        Self { critics }
    }

    /// Mutable critic stack
    pub fn critics_mut(&mut self) -> &mut CriticStack {
        &mut self.critics
    }
}

impl Model for CriticModel {
    fn device(&self) -> Device {
        self.critics.device()
    }

    fn act(&self, _observations: &Tensor) -> Result<Tensor> {
        Err(anyhow!("model has no actor to sample actions from"))
    }

    fn action_distribution(&self, _observations: &Tensor) -> Result<GaussianDistribution> {
        Err(anyhow!("model has no actor to produce a distribution"))
    }

    fn critics(&self) -> Option<&CriticStack> {
        Some(&self.critics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Kind;

    #[test]
    fn test_actor_distribution_shapes() {
        let actor = GaussianActor::new(3, 2, 16, Device::Cpu);
        let obs = Tensor::randn([8, 3], (Kind::Float, Device::Cpu));

        let dist = actor.distribution(&obs);
        assert_eq!(dist.mean().size(), vec![8, 2]);
        assert_eq!(dist.std().size(), vec![8, 2]);

        // Clamped log-std keeps the std strictly positive and bounded.
        let std_max = f64::try_from(dist.std().max()).unwrap();
        let std_min = f64::try_from(dist.std().min()).unwrap();
        assert!(std_min > 0.0);
        assert!(std_max <= LOG_STD_MAX.exp() + 1e-6);
    }

    #[test]
    fn test_sac_model_act() {
        let critics = CriticStack::twin(3, Some(2), 16, Device::Cpu);
        let model = SacModel::new(3, 2, 16, critics);
        let obs = Tensor::randn([4, 3], (Kind::Float, Device::Cpu));

        let actions = model.act(&obs).unwrap();
        assert_eq!(actions.size(), vec![4, 2]);
        assert!(!actions.requires_grad());
        assert!(model.critics().is_some());
    }

    #[test]
    fn test_critic_model_has_no_actor() {
        let model = CriticModel::new(CriticStack::single(3, None, 16, Device::Cpu));
        let obs = Tensor::randn([4, 3], (Kind::Float, Device::Cpu));

        assert!(model.act(&obs).is_err());
        assert!(model.action_distribution(&obs).is_err());
        assert!(model.critics().is_some());
    }
}
