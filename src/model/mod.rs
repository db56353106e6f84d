//! Models: actors, critics, and critic topologies
//!
//! The training loops are generic over [`Model`], which exposes the three
//! capabilities the harness cares about: sampling actions, producing an
//! entropy-bearing action distribution, and (optionally) a critic stack.
//! Which critics exist, and whether slow-moving target copies exist, is a
//! closed set of topologies captured by [`CriticStack`]; the update engine
//! dispatches on the variant instead of probing attributes.

use anyhow::Result;
use tch::{Device, Kind, Tensor};

pub mod actor;
pub mod critic;

pub use actor::{CriticModel, GaussianActor, SacModel};
pub use critic::{CriticStack, QNetwork};

const LOG_2PI: f64 = 1.8378770664093453;

/// Capability surface the training loops need from a model
pub trait Model {
    /// Device the model's parameters live on
    fn device(&self) -> Device;

    /// Sample an action batch for the given observation batch, detached
    /// from the autograd graph
    fn act(&self, observations: &Tensor) -> Result<Tensor>;

    /// The policy distribution conditioned on the observation batch
    fn action_distribution(&self, observations: &Tensor) -> Result<GaussianDistribution>;

    /// The critic stack, when this model has a critic path at all
    fn critics(&self) -> Option<&CriticStack>;

    /// Toggle training mode; a no-op for models without mode-dependent
    /// layers
    fn set_train(&mut self, _train: bool) {}
}

/// Diagonal Gaussian action distribution
///
/// Supports reparameterized sampling so gradients can flow through sampled
/// actions when a caller needs them to.
#[derive(Debug)]
pub struct GaussianDistribution {
    mean: Tensor,
    std: Tensor,
}

impl GaussianDistribution {
    /// Create a distribution from a mean and (positive) std tensor of the
    /// same shape `[batch, action_dim]`
    pub fn new(mean: Tensor, std: Tensor) -> Self {
        Self { mean, std }
    }

    /// Reparameterized sample: `mean + std * eps`, `eps ~ N(0, 1)`
    pub fn rsample(&self) -> Tensor {
        &self.mean + &self.std * self.mean.randn_like()
    }

    /// Plain sample, detached from the graph
    pub fn sample(&self) -> Tensor {
        tch::no_grad(|| self.rsample())
    }

    /// Log-density of an action batch, summed over action components
    pub fn log_prob(&self, actions: &Tensor) -> Tensor {
        let z = (actions - &self.mean) / &self.std;
        let per_dim = z.square() * (-0.5) - self.std.log() - 0.5 * LOG_2PI;
        per_dim.sum_dim_intlist(-1, false, Kind::Float)
    }

    /// Differential entropy, summed over action components
    pub fn entropy(&self) -> Tensor {
        (self.std.log() + 0.5 * (1.0 + LOG_2PI)).sum_dim_intlist(-1, false, Kind::Float)
    }

    /// Distribution mean
    pub fn mean(&self) -> &Tensor {
        &self.mean
    }

    /// Distribution std
    pub fn std(&self) -> &Tensor {
        &self.std
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_gaussian(batch: i64, dim: i64) -> GaussianDistribution {
        GaussianDistribution::new(
            Tensor::zeros([batch, dim], (Kind::Float, Device::Cpu)),
            Tensor::ones([batch, dim], (Kind::Float, Device::Cpu)),
        )
    }

    #[test]
    fn test_sample_shape() {
        let dist = unit_gaussian(8, 2);
        assert_eq!(dist.sample().size(), vec![8, 2]);
        assert_eq!(dist.rsample().size(), vec![8, 2]);
    }

    #[test]
    fn test_log_prob_standard_normal_at_zero() {
        let dist = unit_gaussian(1, 1);
        let actions = Tensor::zeros([1, 1], (Kind::Float, Device::Cpu));

        // Density of N(0, 1) at 0 is 1 / sqrt(2 pi).
        let expected = -0.5 * LOG_2PI;
        let log_prob = f64::try_from(dist.log_prob(&actions)).unwrap();
        assert!((log_prob - expected).abs() < 1e-6);
    }

    #[test]
    fn test_log_prob_sums_over_components() {
        let dist = unit_gaussian(1, 3);
        let actions = Tensor::zeros([1, 3], (Kind::Float, Device::Cpu));

        let expected = 3.0 * (-0.5 * LOG_2PI);
        let log_prob = f64::try_from(dist.log_prob(&actions)).unwrap();
        assert!((log_prob - expected).abs() < 1e-6);
    }

    #[test]
    fn test_entropy_of_unit_gaussian() {
        let dist = unit_gaussian(1, 1);

        let expected = 0.5 * (1.0 + LOG_2PI);
        let entropy = f64::try_from(dist.entropy()).unwrap();
        assert!((entropy - expected).abs() < 1e-6);
    }
}
