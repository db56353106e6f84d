//! Configuration surface for the training harness
//!
//! Every tunable lives in a small struct with documented defaults, builder
//! methods, and a `validate()` that fails fast on nonsense values before any
//! environment interaction happens.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tch::{nn, nn::OptimizerConfig, Reduction, Tensor};

/// How often a training trigger fires, counted in environment steps or in
/// completed episodes.
///
/// Serializes to the wire shape `{"step": n}` / `{"episode": n}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainFrequency {
    /// Train after every `n` environment interactions
    Step(usize),

    /// Train after every `n` completed episodes
    Episode(usize),
}

impl TrainFrequency {
    /// Normalize a (kind, count) pair into a frequency
    ///
    /// The kind string is matched case-insensitively. Unknown kinds and a
    /// count of zero are fatal configuration errors.
    pub fn parse(kind: &str, count: usize) -> Result<Self> {
        if count == 0 {
            return Err(anyhow!("train frequency count must be at least 1"));
        }
        match kind.to_ascii_lowercase().as_str() {
            "step" => Ok(Self::Step(count)),
            "episode" => Ok(Self::Episode(count)),
            other => Err(anyhow!("unrecognized train frequency kind {other:?}")),
        }
    }

    /// The interval count, regardless of kind
    pub fn count(&self) -> usize {
        match *self {
            Self::Step(n) | Self::Episode(n) => n,
        }
    }
}

impl Default for TrainFrequency {
    fn default() -> Self {
        Self::Step(1)
    }
}

/// Distance loss used for critic regression
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub enum LossFn {
    /// Mean squared error
    #[default]
    Mse,

    /// Smooth L1 (Huber) loss, beta = 1.0
    SmoothL1,
}

impl LossFn {
    /// Compute the mean-reduced loss between predictions and targets
    pub fn compute(&self, predictions: &Tensor, targets: &Tensor) -> Tensor {
        match self {
            Self::Mse => predictions.mse_loss(targets, Reduction::Mean),
            Self::SmoothL1 => predictions.smooth_l1_loss(targets, Reduction::Mean, 1.0),
        }
    }
}

/// Gradient-based parameter updater to construct over a variable store
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub enum OptimizerKind {
    /// Adam with library defaults
    #[default]
    Adam,

    /// Plain stochastic gradient descent
    Sgd,

    /// RMSprop with library defaults
    RmsProp,
}

impl OptimizerKind {
    /// Build an optimizer over all trainable variables of `vs`
    pub fn build(&self, vs: &nn::VarStore, learning_rate: f64) -> Result<nn::Optimizer> {
        let optimizer = match self {
            Self::Adam => nn::Adam::default().build(vs, learning_rate)?,
            Self::Sgd => nn::Sgd::default().build(vs, learning_rate)?,
            Self::RmsProp => nn::RmsProp::default().build(vs, learning_rate)?,
        };
        Ok(optimizer)
    }
}

/// Configuration shared by all critic updaters
///
/// Immutable once handed to an updater; every update call reads the same
/// values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticUpdaterConfig {
    /// Regression loss
    pub loss: LossFn,

    /// Optimizer constructed fresh for each update call
    pub optimizer: OptimizerKind,

    /// Learning rate
    pub learning_rate: f64,

    /// Gradient-norm clip threshold; 0 disables clipping
    pub max_grad: f64,
}

impl Default for CriticUpdaterConfig {
    fn default() -> Self {
        Self {
            loss: LossFn::Mse,
            optimizer: OptimizerKind::Adam,
            learning_rate: 1e-3,
            max_grad: 0.0,
        }
    }
}

impl CriticUpdaterConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.learning_rate <= 0.0 {
            return Err(anyhow!("learning_rate must be positive"));
        }
        if self.max_grad < 0.0 {
            return Err(anyhow!("max_grad must be non-negative"));
        }
        Ok(())
    }

    /// Set the regression loss
    pub fn loss(mut self, loss: LossFn) -> Self {
        self.loss = loss;
        self
    }

    /// Set the optimizer kind
    pub fn optimizer(mut self, optimizer: OptimizerKind) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Set the learning rate
    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Set the gradient-norm clip threshold (0 disables clipping)
    pub fn max_grad(mut self, max_grad: f64) -> Self {
        self.max_grad = max_grad;
        self
    }
}

/// Per-run training schedule for the gradient-based trainer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitSchedule {
    /// Minibatch size for each gradient step; also the forced length of the
    /// very first collection phase so the buffer can serve a full batch
    pub batch_size: usize,

    /// Actor updates per training trigger
    pub actor_epochs: usize,

    /// Critic updates per training trigger
    pub critic_epochs: usize,

    /// Interval between training triggers
    pub train_frequency: TrainFrequency,
}

impl Default for FitSchedule {
    fn default() -> Self {
        Self {
            batch_size: 32,
            actor_epochs: 1,
            critic_epochs: 1,
            train_frequency: TrainFrequency::Step(1),
        }
    }
}

impl FitSchedule {
    /// Create a new default schedule
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate schedule parameters
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(anyhow!("batch_size must be positive"));
        }
        if self.actor_epochs == 0 {
            return Err(anyhow!("actor_epochs must be positive"));
        }
        if self.critic_epochs == 0 {
            return Err(anyhow!("critic_epochs must be positive"));
        }
        if self.train_frequency.count() == 0 {
            return Err(anyhow!("train frequency count must be at least 1"));
        }
        Ok(())
    }

    /// Set the minibatch size
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the actor epochs per trigger
    pub fn actor_epochs(mut self, epochs: usize) -> Self {
        self.actor_epochs = epochs;
        self
    }

    /// Set the critic epochs per trigger
    pub fn critic_epochs(mut self, epochs: usize) -> Self {
        self.critic_epochs = epochs;
        self
    }

    /// Set the train frequency
    pub fn train_frequency(mut self, frequency: TrainFrequency) -> Self {
        self.train_frequency = frequency;
        self
    }
}

/// Soft-actor-critic target parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SacConfig {
    /// Entropy temperature
    pub alpha: f64,

    /// Discount factor
    pub gamma: f64,
}

impl Default for SacConfig {
    fn default() -> Self {
        Self { alpha: 0.2, gamma: 0.99 }
    }
}

impl SacConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.alpha < 0.0 {
            return Err(anyhow!("alpha must be non-negative"));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(anyhow!("gamma must be in [0, 1]"));
        }
        Ok(())
    }

    /// Set the entropy temperature
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the discount factor
    pub fn gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }
}

/// Settings for the action explorer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerSettings {
    /// Number of initial steps with uniformly random actions
    pub start_steps: usize,

    /// Std of Gaussian noise added to model actions; `None` for no noise
    pub scale: Option<f64>,
}

impl Default for ExplorerSettings {
    fn default() -> Self {
        Self { start_steps: 1000, scale: None }
    }
}

/// Settings for the replay buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferSettings {
    /// Maximum number of transitions stored per environment
    pub capacity: usize,
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self { capacity: 1_000_000 }
    }
}

/// Settings for callbacks; pick the fields that apply
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackSettings {
    /// How often to save, in environment steps
    pub save_freq: Option<usize>,

    /// Where to save
    pub save_path: Option<String>,

    /// Hard cap on environment steps before the callback vetoes
    pub max_steps: Option<usize>,
}

/// Population initialization strategy for evolutionary search
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub enum InitStrategy {
    /// Gaussian around a starting point
    #[default]
    Normal,

    /// Uniform over the action bounds
    Uniform,
}

/// Settings for the population initializer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationSettings {
    /// Initialization strategy
    pub strategy: InitStrategy,

    /// Std for normal initialization
    pub std: f32,

    /// Central starting point for normal initialization; zeros when `None`
    pub starting_point: Option<Vec<f32>>,
}

impl Default for PopulationSettings {
    fn default() -> Self {
        Self { strategy: InitStrategy::Normal, std: 1.0, starting_point: None }
    }
}

/// Construction-time settings for the gradient-based trainer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainerSettings {
    /// Exploration settings
    pub explorer: ExplorerSettings,

    /// Replay buffer settings
    pub buffer: BufferSettings,

    /// Whether to render the environment each interaction
    pub render: bool,
}
