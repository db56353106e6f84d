//! Soft-actor-critic style critic updates as an [`UpdateRule`]
//!
//! The minimal derived agent: each training trigger samples a fresh
//! flattened minibatch per critic epoch and applies [`SoftQRegression`].
//! Actor-side optimization is a separate concern and plugs in as its own
//! rule when needed.

use anyhow::Result;

use crate::buffer::ReplayBuffer;
use crate::config::{CriticUpdaterConfig, FitSchedule, SacConfig};
use crate::logger::TrainLog;
use crate::model::Model;
use crate::train::critic::SoftQRegression;
use crate::train::trainer::UpdateRule;

/// Critic-side soft Q update rule
pub struct SoftQUpdate {
    regression: SoftQRegression,
    config: SacConfig,
}

impl SoftQUpdate {
    /// Create a rule from updater and target configuration
    pub fn new(updater: CriticUpdaterConfig, config: SacConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { regression: SoftQRegression::new(updater)?, config })
    }
}

impl<M: Model> UpdateRule<M> for SoftQUpdate {
    fn update(
        &mut self,
        model: &mut M,
        buffer: &mut ReplayBuffer,
        schedule: &FitSchedule,
    ) -> Result<TrainLog> {
        let mut total = TrainLog::zeros();
        for _ in 0..schedule.critic_epochs {
            let batch = buffer.sample(schedule.batch_size, true)?;
            let log = self.regression.update(model, &batch, self.config.alpha, self.config.gamma)?;
            total.merge(&TrainLog::from_loss(log.loss));
        }
        Ok(total.average())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CriticStack, SacModel};
    use tch::Device;

    #[test]
    fn test_runs_critic_epochs() {
        let mut buffer = ReplayBuffer::new(64, 1, 3, 2, Device::Cpu);
        for _ in 0..16 {
            buffer.add_trajectory(
                vec![vec![0.0, 0.1, 0.2]],
                vec![vec![0.3, -0.3]],
                &[1.0],
                vec![vec![0.1, 0.2, 0.3]],
                &[false],
            );
        }

        let critics = CriticStack::twin_with_target(3, Some(2), 16, Device::Cpu).unwrap();
        let mut model = SacModel::new(3, 2, 16, critics);
        let mut rule = SoftQUpdate::new(CriticUpdaterConfig::default(), SacConfig::default())
            .unwrap();

        let schedule = FitSchedule::new().batch_size(8).critic_epochs(3);
        let log = rule.update(&mut model, &mut buffer, &schedule).unwrap();

        assert_eq!(log.updates, 1);
        assert!(log.loss.is_finite());
    }

    #[test]
    fn test_empty_buffer_is_an_error() {
        let critics = CriticStack::single(3, Some(2), 16, Device::Cpu);
        let mut model = SacModel::new(3, 2, 16, critics);
        let mut buffer = ReplayBuffer::new(64, 1, 3, 2, Device::Cpu);
        let mut rule = SoftQUpdate::new(CriticUpdaterConfig::default(), SacConfig::default())
            .unwrap();

        assert!(rule.update(&mut model, &mut buffer, &FitSchedule::default()).is_err());
    }
}
