//! Action exploration
//!
//! Wraps the model's policy with the two standard exploration tricks for
//! off-policy training: uniformly random actions for the first
//! `start_steps` interactions (so the buffer sees broad coverage before the
//! policy means anything) and optional Gaussian noise on top of model
//! actions afterwards. The explorer decides which branch applies from the
//! step counter it is handed; the orchestrator never needs to know.

use anyhow::Result;
use rand::Rng;

use crate::config::ExplorerSettings;
use crate::model::Model;
use crate::utils::{rows_to_tensor, tensor_to_rows};

/// Exploration layer between the orchestrator and the model
pub struct Explorer {
    start_steps: usize,
    scale: Option<f64>,
    action_dim: usize,
    low: f32,
    high: f32,
}

impl Explorer {
    /// Create an explorer for an action space
    ///
    /// # Arguments
    ///
    /// * `settings` - Warm-start length and noise scale
    /// * `action_dim` - Action dimensionality
    /// * `bounds` - Inclusive (low, high) action bounds
    pub fn new(settings: &ExplorerSettings, action_dim: usize, bounds: (f32, f32)) -> Self {
        Self {
            start_steps: settings.start_steps,
            scale: settings.scale,
            action_dim,
            low: bounds.0,
            high: bounds.1,
        }
    }

    /// Choose an action batch for the given observations at the given step
    pub fn act<M: Model>(
        &mut self,
        model: &M,
        observations: &[Vec<f32>],
        step: usize,
    ) -> Result<Vec<Vec<f32>>> {
        if step < self.start_steps {
            return Ok(self.random_actions(observations.len()));
        }

        let obs = rows_to_tensor(observations, model.device());
        let mut actions = model.act(&obs)?;
        if let Some(scale) = self.scale {
            actions = tch::no_grad(|| &actions + actions.randn_like() * scale);
        }
        let actions = actions.clamp(self.low as f64, self.high as f64);
        Ok(tensor_to_rows(&actions))
    }

    fn random_actions(&self, batch: usize) -> Vec<Vec<f32>> {
        let mut rng = rand::thread_rng();
        (0..batch)
            .map(|_| (0..self.action_dim).map(|_| rng.gen_range(self.low..=self.high)).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CriticModel, CriticStack, SacModel};
    use tch::Device;

    fn settings(start_steps: usize, scale: Option<f64>) -> ExplorerSettings {
        ExplorerSettings { start_steps, scale }
    }

    #[test]
    fn test_random_warm_start_respects_bounds() {
        let model = CriticModel::new(CriticStack::single(3, None, 8, Device::Cpu));
        let mut explorer = Explorer::new(&settings(10, None), 2, (-2.0, 2.0));

        let obs = vec![vec![0.0; 3]; 4];
        let actions = explorer.act(&model, &obs, 0).unwrap();

        assert_eq!(actions.len(), 4);
        for row in actions {
            assert_eq!(row.len(), 2);
            for value in row {
                assert!((-2.0..=2.0).contains(&value));
            }
        }
    }

    #[test]
    fn test_warm_start_skips_the_model() {
        // An actor-less model would fail if consulted; the warm start never
        // asks it.
        let model = CriticModel::new(CriticStack::single(3, None, 8, Device::Cpu));
        let mut explorer = Explorer::new(&settings(5, None), 1, (-1.0, 1.0));

        assert!(explorer.act(&model, &[vec![0.0; 3]], 4).is_ok());
        assert!(explorer.act(&model, &[vec![0.0; 3]], 5).is_err());
    }

    #[test]
    fn test_model_actions_after_warm_start() {
        let critics = CriticStack::single(3, Some(2), 8, Device::Cpu);
        let model = SacModel::new(3, 2, 8, critics);
        let mut explorer = Explorer::new(&settings(0, Some(0.1)), 2, (-1.0, 1.0));

        let actions = explorer.act(&model, &[vec![0.0; 3]; 4], 100).unwrap();
        assert_eq!(actions.len(), 4);
        for row in actions {
            for value in row {
                assert!((-1.0..=1.0).contains(&value));
            }
        }
    }
}
