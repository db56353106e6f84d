//! Training orchestration and update engines
//!
//! Two structurally parallel loops live here. [`Trainer`] drives
//! gradient-based agents: collect experience on a step or episode cadence,
//! then hand the model and buffer to an [`UpdateRule`]. [`EvolutionTrainer`]
//! drives population-based search with the same cadence and termination
//! machinery but no gradient step anywhere. The critic update engine
//! ([`ValueRegression`], [`QRegression`], [`SoftQRegression`]) performs the
//! actual regression toward (bootstrapped) targets.

pub mod critic;
pub mod evolution;
pub mod sac;
pub mod targets;
pub mod trainer;

pub use critic::{run_optimizer, QRegression, SoftQRegression, UpdateLog, ValueRegression};
pub use evolution::{EvolutionTrainer, EvolutionUpdater, Population};
pub use sac::SoftQUpdate;
pub use targets::soft_q_target;
pub use trainer::{Trainer, UpdateRule};

/// Loop-control signal returned by each interaction
///
/// `Stop` means a callback vetoed continued training; the caller is
/// expected to wind down at the next checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep interacting
    Continue,

    /// Stop interacting and terminate training
    Stop,
}
