//! # Torque
//!
//! A reinforcement learning training harness in Rust + tch-rs.
//!
//! Torque drives the interaction loop between a learning agent and a
//! (possibly vectorized) environment, accumulates experience in a replay
//! buffer, and triggers periodic optimization of the agent's model. Two
//! optimization styles share the same loop machinery:
//!
//! - gradient-based critic regression ([`train::Trainer`] with a
//!   [`train::UpdateRule`]), including soft-actor-critic style bootstrapped
//!   targets with twin and target-network critic topologies;
//! - population-based search ([`train::EvolutionTrainer`] with an
//!   [`train::EvolutionUpdater`]), where the population itself is the acting
//!   policy and no gradient step ever runs.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use torque_rl::prelude::*;
//!
//! let env = EnvPool::new(Pendulum::new, 4);
//! let critics = CriticStack::twin_with_target(3, Some(1), 64, tch::Device::Cpu)?;
//! let model = SacModel::new(3, 1, 64, critics);
//! let updater = SoftQUpdate::new(CriticUpdaterConfig::default(), SacConfig::default())?;
//! let mut trainer = Trainer::new(env, model, updater, TrainerSettings::default())?;
//! trainer.fit(10_000, &FitSchedule::default().batch_size(64))?;
//! # Ok::<(), anyhow::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Experience replay storage and minibatch sampling
pub mod buffer;

/// Training callbacks (periodic hooks with veto power over the run)
pub mod callback;

/// Configuration structs with documented defaults
pub mod config;

/// Environment traits and implementations
pub mod env;

/// Action exploration (random warm-start and noise injection)
pub mod explore;

/// Episode and training diagnostics logging
pub mod logger;

/// Models: actors, critics, and critic topologies
pub mod model;

/// Training orchestration and update engines
pub mod train;

/// Utility functions and helpers
pub mod utils;

/// Prelude module for convenient imports
///
/// This module re-exports commonly used types and traits for convenience.
pub mod prelude {
    pub use crate::buffer::{ReplayBuffer, TransitionBatch};
    pub use crate::callback::{Callback, Callbacks, StepLimitCallback};
    pub use crate::config::{
        BufferSettings, CallbackSettings, CriticUpdaterConfig, ExplorerSettings, FitSchedule,
        LossFn, OptimizerKind, PopulationSettings, SacConfig, TrainFrequency, TrainerSettings,
    };
    pub use crate::env::{EnvPool, Environment, Pendulum, StepResult, VecEnv, VecStepResult};
    pub use crate::explore::Explorer;
    pub use crate::logger::{EpisodeLogger, TrainLog};
    pub use crate::model::{CriticModel, CriticStack, GaussianActor, Model, SacModel};
    pub use crate::train::{
        soft_q_target, EvolutionTrainer, EvolutionUpdater, QRegression, SoftQRegression,
        SoftQUpdate, Trainer, UpdateLog, UpdateRule, ValueRegression,
    };
}

/// Current version of torque-rl
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, "0.1.0");
    }
}
