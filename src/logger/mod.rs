//! Episode and training diagnostics logging
//!
//! The episode logger owns the per-environment reward sums and the
//! episode-done mask for the current episode. An episode log is flushed
//! (written and reset) exactly when every parallel environment has finished
//! its episode; partial completion only updates the mask. Output goes
//! through `tracing`.

use tracing::info;

/// Diagnostics from one training trigger
///
/// Gradient updates fill `loss`; population updates fill `divergence` and
/// `entropy`. Aggregation follows sum-then-average.
#[derive(Debug, Clone, Default)]
pub struct TrainLog {
    /// Mean loss over the trigger's gradient steps
    pub loss: f64,

    /// Population divergence (population-based search only)
    pub divergence: f64,

    /// Population entropy (population-based search only)
    pub entropy: f64,

    /// Number of updates merged into this log
    pub updates: usize,
}

impl TrainLog {
    /// Create a zero-initialized log
    pub fn zeros() -> Self {
        Self::default()
    }

    /// A log for a single gradient step with the given loss
    pub fn from_loss(loss: f64) -> Self {
        Self { loss, divergence: 0.0, entropy: 0.0, updates: 1 }
    }

    /// Accumulate another log into this one
    pub fn merge(&mut self, other: &TrainLog) {
        self.loss += other.loss;
        self.divergence += other.divergence;
        self.entropy += other.entropy;
        self.updates += other.updates;
    }

    /// Average the accumulated values over the merged update count
    pub fn average(&self) -> Self {
        if self.updates == 0 {
            return Self::zeros();
        }
        let scale = self.updates as f64;
        Self {
            loss: self.loss / scale,
            divergence: self.divergence / scale,
            entropy: self.entropy / scale,
            updates: 1,
        }
    }
}

/// Episode-level logger for one training run
pub struct EpisodeLogger {
    num_envs: usize,
    episode_rewards: Vec<f32>,
    episode_dones: Vec<bool>,
    episode_steps: usize,
    pending_train: TrainLog,
    logs_written: usize,
}

impl EpisodeLogger {
    /// Create a logger for `num_envs` parallel environments
    pub fn new(num_envs: usize) -> Self {
        assert!(num_envs > 0, "logger needs at least one environment");
        Self {
            num_envs,
            episode_rewards: vec![0.0; num_envs],
            episode_dones: vec![false; num_envs],
            episode_steps: 0,
            pending_train: TrainLog::zeros(),
            logs_written: 0,
        }
    }

    /// Accumulate one step's rewards into the episode log
    ///
    /// Accepts either one reward per environment or a single value
    /// broadcast to all of them.
    pub fn add_reward(&mut self, rewards: &[f32]) {
        match rewards.len() {
            1 => {
                for sum in &mut self.episode_rewards {
                    *sum += rewards[0];
                }
            }
            n if n == self.num_envs => {
                for (sum, reward) in self.episode_rewards.iter_mut().zip(rewards) {
                    *sum += reward;
                }
            }
            n => panic!("got {n} rewards for {} environments", self.num_envs),
        }
        self.episode_steps += 1;
    }

    /// Mark one environment's episode as finished
    pub fn mark_done(&mut self, index: usize) {
        self.episode_dones[index] = true;
    }

    /// Whether every environment has finished its episode
    pub fn all_done(&self) -> bool {
        self.episode_dones.iter().all(|&done| done)
    }

    /// Write the episode summary and any pending training diagnostics
    pub fn write_log(&mut self, step: usize) {
        let mean_reward = (self.episode_rewards.iter().sum::<f32>()
            / self.episode_rewards.len() as f32) as f64;
        let train = self.pending_train.average();
        info!(
            step,
            mean_reward,
            episode_steps = self.episode_steps,
            loss = train.loss,
            divergence = train.divergence,
            entropy = train.entropy,
            "episode complete"
        );
        self.pending_train = TrainLog::zeros();
        self.logs_written += 1;
    }

    /// Clear the episode reward sums and the done mask
    pub fn reset_episode_log(&mut self) {
        self.episode_rewards.iter_mut().for_each(|sum| *sum = 0.0);
        self.episode_dones.iter_mut().for_each(|done| *done = false);
        self.episode_steps = 0;
    }

    /// Queue training diagnostics for the next episode write
    pub fn add_train_log(&mut self, log: &TrainLog) {
        self.pending_train.merge(log);
    }

    /// Number of episode logs flushed so far
    pub fn logs_written(&self) -> usize {
        self.logs_written
    }

    /// Mean of the running per-environment reward sums
    pub fn episode_return(&self) -> f32 {
        self.episode_rewards.iter().sum::<f32>() / self.episode_rewards.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_completion_does_not_flush() {
        let mut logger = EpisodeLogger::new(3);
        logger.add_reward(&[1.0, 2.0, 3.0]);
        logger.mark_done(0);
        logger.mark_done(2);

        assert!(!logger.all_done());
        assert_eq!(logger.logs_written(), 0);
    }

    #[test]
    fn test_full_mask_flushes_once() {
        let mut logger = EpisodeLogger::new(2);
        logger.add_reward(&[1.0, 1.0]);
        logger.mark_done(0);
        logger.mark_done(1);

        assert!(logger.all_done());
        logger.write_log(10);
        logger.reset_episode_log();

        assert_eq!(logger.logs_written(), 1);
        assert!(!logger.all_done());
        assert_eq!(logger.episode_return(), 0.0);
    }

    #[test]
    fn test_reward_broadcast() {
        let mut logger = EpisodeLogger::new(4);
        logger.add_reward(&[2.0]);
        assert_eq!(logger.episode_return(), 2.0);
    }

    #[test]
    #[should_panic(expected = "rewards for")]
    fn test_reward_length_mismatch_panics() {
        let mut logger = EpisodeLogger::new(4);
        logger.add_reward(&[1.0, 2.0]);
    }

    #[test]
    fn test_train_log_merge_and_average() {
        let mut total = TrainLog::zeros();
        total.merge(&TrainLog::from_loss(2.0));
        total.merge(&TrainLog::from_loss(4.0));

        let mean = total.average();
        assert_eq!(mean.loss, 3.0);
        assert_eq!(mean.updates, 1);

        assert_eq!(TrainLog::zeros().average().loss, 0.0);
    }
}
