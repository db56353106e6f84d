//! Q/value networks and critic topologies
//!
//! A [`QNetwork`] is a plain MLP estimator, action-conditioned or not. A
//! [`CriticStack`] arranges one or two of them, with or without frozen
//! target copies, into the four topologies the update engine knows how to
//! train. All live critics share one variable store so an optimizer built
//! over it covers exactly the live critic parameter set and nothing else.

use anyhow::{anyhow, Result};
use tch::{nn, nn::Module, Device, Tensor};

/// A feedforward Q or value estimator
///
/// With an action dimensionality the network scores (observation, action)
/// pairs; without one it scores observations alone.
pub struct QNetwork {
    net: nn::Sequential,
    action_dim: Option<i64>,
}

impl QNetwork {
    /// Build a two-layer MLP under the given variable path
    pub fn new(path: &nn::Path, obs_dim: i64, action_dim: Option<i64>, hidden_dim: i64) -> Self {
        let input_dim = obs_dim + action_dim.unwrap_or(0);
        let net = nn::seq()
            .add(nn::linear(path / "fc1", input_dim, hidden_dim, Default::default()))
            .add_fn(|x| x.relu())
            .add(nn::linear(path / "fc2", hidden_dim, hidden_dim, Default::default()))
            .add_fn(|x| x.relu())
            .add(nn::linear(path / "head", hidden_dim, 1, Default::default()));
        Self { net, action_dim }
    }

    /// Whether this network scores (observation, action) pairs
    pub fn is_action_conditioned(&self) -> bool {
        self.action_dim.is_some()
    }

    /// Estimate values for a batch, returning a `[batch]` tensor
    ///
    /// An action-conditioned network rejects a missing action batch; an
    /// action-free network rejects a supplied one.
    pub fn forward(&self, observations: &Tensor, actions: Option<&Tensor>) -> Result<Tensor> {
        let input = match (self.action_dim, actions) {
            (Some(_), Some(actions)) => Tensor::cat(&[observations, actions], 1),
            (Some(_), None) => {
                return Err(anyhow!("critic is action-conditioned but no actions were supplied"))
            }
            (None, Some(_)) => {
                return Err(anyhow!("critic takes no actions but an action batch was supplied"))
            }
            (None, None) => observations.shallow_clone(),
        };
        Ok(self.net.forward(&input).squeeze_dim(-1))
    }
}

/// Closed set of critic topologies
///
/// The four arrangements a model's critic side can take. Target copies live
/// in their own frozen variable store and are never trained here; keeping
/// them in step with the live critics is the caller's job (see
/// [`CriticStack::sync_targets`]).
pub enum CriticStack {
    /// One live critic
    Single {
        /// Live critic parameters
        vs: nn::VarStore,
        /// The critic
        q: QNetwork,
    },

    /// Two independently trained live critics
    Twin {
        /// Live critic parameters (both critics)
        vs: nn::VarStore,
        /// First critic
        q1: QNetwork,
        /// Second critic
        q2: QNetwork,
    },

    /// One live critic plus a frozen target copy
    SingleWithTarget {
        /// Live critic parameters
        vs: nn::VarStore,
        /// The live critic
        q: QNetwork,
        /// Frozen target parameters
        target_vs: nn::VarStore,
        /// The target copy
        target: QNetwork,
    },

    /// Two live critics, each with a frozen target copy
    TwinWithTarget {
        /// Live critic parameters (both critics)
        vs: nn::VarStore,
        /// First live critic
        q1: QNetwork,
        /// Second live critic
        q2: QNetwork,
        /// Frozen target parameters (both copies)
        target_vs: nn::VarStore,
        /// Target copy of the first critic
        target1: QNetwork,
        /// Target copy of the second critic
        target2: QNetwork,
    },
}

impl CriticStack {
    /// One live critic
    pub fn single(obs_dim: i64, action_dim: Option<i64>, hidden_dim: i64, device: Device) -> Self {
        let vs = nn::VarStore::new(device);
        let q = QNetwork::new(&(vs.root() / "q1"), obs_dim, action_dim, hidden_dim);
        Self::Single { vs, q }
    }

    /// Two live critics sharing one variable store
    pub fn twin(obs_dim: i64, action_dim: Option<i64>, hidden_dim: i64, device: Device) -> Self {
        let vs = nn::VarStore::new(device);
        let q1 = QNetwork::new(&(vs.root() / "q1"), obs_dim, action_dim, hidden_dim);
        let q2 = QNetwork::new(&(vs.root() / "q2"), obs_dim, action_dim, hidden_dim);
        Self::Twin { vs, q1, q2 }
    }

    /// One live critic plus a frozen target initialized to the same weights
    pub fn single_with_target(
        obs_dim: i64,
        action_dim: Option<i64>,
        hidden_dim: i64,
        device: Device,
    ) -> Result<Self> {
        let vs = nn::VarStore::new(device);
        let q = QNetwork::new(&(vs.root() / "q1"), obs_dim, action_dim, hidden_dim);
        let mut target_vs = nn::VarStore::new(device);
        let target = QNetwork::new(&(target_vs.root() / "q1"), obs_dim, action_dim, hidden_dim);
        target_vs.copy(&vs)?;
        target_vs.freeze();
        Ok(Self::SingleWithTarget { vs, q, target_vs, target })
    }

    /// Two live critics, each with a frozen target initialized to the same
    /// weights
    pub fn twin_with_target(
        obs_dim: i64,
        action_dim: Option<i64>,
        hidden_dim: i64,
        device: Device,
    ) -> Result<Self> {
        let vs = nn::VarStore::new(device);
        let q1 = QNetwork::new(&(vs.root() / "q1"), obs_dim, action_dim, hidden_dim);
        let q2 = QNetwork::new(&(vs.root() / "q2"), obs_dim, action_dim, hidden_dim);
        let mut target_vs = nn::VarStore::new(device);
        let target1 = QNetwork::new(&(target_vs.root() / "q1"), obs_dim, action_dim, hidden_dim);
        let target2 = QNetwork::new(&(target_vs.root() / "q2"), obs_dim, action_dim, hidden_dim);
        target_vs.copy(&vs)?;
        target_vs.freeze();
        Ok(Self::TwinWithTarget { vs, q1, q2, target_vs, target1, target2 })
    }

    /// Device the live critic parameters live on
    pub fn device(&self) -> Device {
        self.var_store().device()
    }

    /// The live critic parameter set, for optimizer construction
    pub fn var_store(&self) -> &nn::VarStore {
        match self {
            Self::Single { vs, .. }
            | Self::Twin { vs, .. }
            | Self::SingleWithTarget { vs, .. }
            | Self::TwinWithTarget { vs, .. } => vs,
        }
    }

    /// Mutable live critic parameter set, e.g. for loading saved weights
    pub fn var_store_mut(&mut self) -> &mut nn::VarStore {
        match self {
            Self::Single { vs, .. }
            | Self::Twin { vs, .. }
            | Self::SingleWithTarget { vs, .. }
            | Self::TwinWithTarget { vs, .. } => vs,
        }
    }

    /// Whether a second live critic exists
    pub fn has_twin(&self) -> bool {
        matches!(self, Self::Twin { .. } | Self::TwinWithTarget { .. })
    }

    /// Whether frozen target copies exist
    pub fn has_target(&self) -> bool {
        matches!(self, Self::SingleWithTarget { .. } | Self::TwinWithTarget { .. })
    }

    /// Prediction of the first live critic, `[batch]`
    pub fn predict(&self, observations: &Tensor, actions: Option<&Tensor>) -> Result<Tensor> {
        match self {
            Self::Single { q, .. } | Self::SingleWithTarget { q, .. } => {
                q.forward(observations, actions)
            }
            Self::Twin { q1, .. } | Self::TwinWithTarget { q1, .. } => {
                q1.forward(observations, actions)
            }
        }
    }

    /// Prediction of the second live critic, when one exists
    pub fn predict_second(
        &self,
        observations: &Tensor,
        actions: Option<&Tensor>,
    ) -> Result<Option<Tensor>> {
        match self {
            Self::Twin { q2, .. } | Self::TwinWithTarget { q2, .. } => {
                Ok(Some(q2.forward(observations, actions)?))
            }
            _ => Ok(None),
        }
    }

    /// Next-state value estimate for bootstrapped regression targets
    ///
    /// Picks the most stable estimator the topology offers: the element-wise
    /// minimum of the two target critics, a single target critic, or the
    /// live critic when no target exists. The live-critic fallback conflates
    /// on-policy and target-bootstrap semantics; it is kept for convenience
    /// but a target topology is the better configuration.
    pub fn bootstrap(&self, observations: &Tensor, actions: Option<&Tensor>) -> Result<Tensor> {
        match self {
            Self::TwinWithTarget { target1, target2, .. } => {
                let q1 = target1.forward(observations, actions)?;
                let q2 = target2.forward(observations, actions)?;
                Ok(q1.minimum(&q2))
            }
            Self::SingleWithTarget { target, .. } => target.forward(observations, actions),
            Self::Single { q, .. } => q.forward(observations, actions),
            Self::Twin { q1, .. } => q1.forward(observations, actions),
        }
    }

    /// Polyak-average the target copies toward the live critics:
    /// `target = tau * live + (1 - tau) * target`
    ///
    /// No-op for topologies without targets. The update engine never calls
    /// this; the interval is the caller's policy.
    pub fn sync_targets(&mut self, tau: f64) {
        let (vs, target_vs) = match self {
            Self::SingleWithTarget { vs, target_vs, .. }
            | Self::TwinWithTarget { vs, target_vs, .. } => (vs, target_vs),
            _ => return,
        };
        tch::no_grad(|| {
            let live = vs.variables();
            for (name, mut target) in target_vs.variables() {
                if let Some(live_var) = live.get(&name) {
                    let blended = live_var * tau + &target * (1.0 - tau);
                    target.copy_(&blended);
                }
            }
        });
    }
}
