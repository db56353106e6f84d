//! Gradient-based training orchestrator
//!
//! [`Trainer`] owns everything around the actual update algorithm: the
//! environment, the model, the replay buffer, the exploration layer, the
//! episode logger, the callbacks, and the step/episode counters. The update
//! algorithm itself is supplied as an [`UpdateRule`]; the orchestrator never
//! defines a default gradient update.
//!
//! The loop alternates collection and training. Collection length follows
//! the configured cadence, except on the very first cycle where exactly
//! `batch_size` interactions run regardless, so the buffer can serve a full
//! minibatch to the first update.

use anyhow::Result;
use tracing::{debug, info};

use crate::buffer::ReplayBuffer;
use crate::callback::Callbacks;
use crate::config::{FitSchedule, TrainFrequency, TrainerSettings};
use crate::env::VecEnv;
use crate::explore::Explorer;
use crate::logger::{EpisodeLogger, TrainLog};
use crate::model::Model;
use crate::train::Flow;

/// The update algorithm a concrete agent plugs into the orchestrator
///
/// Called once per training trigger with the model, the buffer, and the
/// active schedule; returns diagnostics for the episode log.
pub trait UpdateRule<M: Model> {
    /// Perform one training trigger's worth of updates
    fn update(
        &mut self,
        model: &mut M,
        buffer: &mut ReplayBuffer,
        schedule: &FitSchedule,
    ) -> Result<TrainLog>;
}

/// Training orchestrator for gradient-based agents
pub struct Trainer<E: VecEnv, M: Model, U: UpdateRule<M>> {
    env: E,
    model: M,
    updater: U,
    explorer: Explorer,
    buffer: ReplayBuffer,
    logger: EpisodeLogger,
    callbacks: Callbacks,
    render: bool,

    /// Environment interactions so far; one logical step covers all
    /// parallel environments
    step: usize,

    /// Completed episode rounds (every parallel environment finished)
    episode: usize,

    /// Set once a callback vetoes; never cleared
    done: bool,
}

impl<E: VecEnv, M: Model, U: UpdateRule<M>> Trainer<E, M, U> {
    /// Create a trainer
    ///
    /// # Arguments
    ///
    /// * `env` - Batched environment
    /// * `model` - The model to train
    /// * `updater` - The update algorithm invoked on each trigger
    /// * `settings` - Exploration, buffer, and rendering settings
    pub fn new(env: E, model: M, updater: U, settings: TrainerSettings) -> Result<Self> {
        let num_envs = env.num_envs();
        let explorer = Explorer::new(&settings.explorer, env.action_dim(), env.action_bounds());
        let buffer = ReplayBuffer::new(
            settings.buffer.capacity,
            num_envs,
            env.observation_dim(),
            env.action_dim(),
            model.device(),
        );
        let logger = EpisodeLogger::new(num_envs);
        info!(device = ?model.device(), num_envs, "trainer ready");

        Ok(Self {
            env,
            model,
            updater,
            explorer,
            buffer,
            logger,
            callbacks: Callbacks::default(),
            render: settings.render,
            step: 0,
            episode: 0,
            done: false,
        })
    }

    /// Register callbacks queried on every interaction
    pub fn with_callbacks(mut self, callbacks: Callbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Environment interactions so far
    pub fn step(&self) -> usize {
        self.step
    }

    /// Completed episode rounds so far
    pub fn episode(&self) -> usize {
        self.episode
    }

    /// Whether a callback has vetoed continued training
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// The model being trained
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Mutable model access, e.g. for target synchronization between runs
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// The environment
    pub fn env(&self) -> &E {
        &self.env
    }

    /// The replay buffer
    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }

    /// The episode logger
    pub fn logger(&self) -> &EpisodeLogger {
        &self.logger
    }

    /// Step the agent through the environment
    ///
    /// Runs up to `num_steps` interactions starting from `observation` and
    /// returns the final observation. Stops early when a callback vetoes.
    pub fn step_env(
        &mut self,
        mut observation: Vec<Vec<f32>>,
        num_steps: usize,
    ) -> Result<Vec<Vec<f32>>> {
        self.model.set_train(false);
        for _ in 0..num_steps {
            if self.interact_once(&mut observation)? == Flow::Stop {
                self.done = true;
                break;
            }
        }
        Ok(observation)
    }

    /// One environment interaction: act, record, reset finished episodes,
    /// flush the episode log when every environment is done, and consult
    /// the callbacks
    fn interact_once(&mut self, observation: &mut Vec<Vec<f32>>) -> Result<Flow> {
        if self.render {
            self.env.render();
        }

        let actions = self.explorer.act(&self.model, observation, self.step)?;
        let result = self.env.step(&actions)?;

        self.buffer.add_trajectory(
            observation.clone(),
            actions,
            &result.rewards,
            result.observations.clone(),
            &result.dones,
        );
        debug!(step = self.step, rewards = ?result.rewards, dones = ?result.dones, "transition");
        self.logger.add_reward(&result.rewards);

        // Finished environments are reset individually; the rest carry
        // their next observation forward.
        for (index, &done) in result.dones.iter().enumerate() {
            if done {
                observation[index] = self.env.reset_env(index)?;
                self.logger.mark_done(index);
            } else {
                observation[index] = result.observations[index].clone();
            }
        }

        if self.logger.all_done() {
            self.logger.write_log(self.step);
            self.logger.reset_episode_log();
            self.episode += 1;
        }

        if !self.callbacks.on_step(self.step) {
            return Ok(Flow::Stop);
        }
        self.step += 1;
        Ok(Flow::Continue)
    }

    /// Train the agent in the environment
    ///
    /// Alternates collection and training until `num_steps` environment
    /// interactions are spent or a callback vetoes. For step cadence the
    /// cycle count is `num_steps` pre-divided by the per-cycle step count;
    /// for episode cadence the loop exits mid-cycle once the step budget is
    /// exhausted while waiting for the episode target.
    pub fn fit(&mut self, num_steps: usize, schedule: &FitSchedule) -> Result<()> {
        schedule.validate()?;
        let cycles = match schedule.train_frequency {
            TrainFrequency::Step(n) => num_steps / n,
            TrainFrequency::Episode(_) => num_steps,
        };

        let mut observation = self.env.reset()?;
        for cycle in 0..cycles {
            if cycle == 0 {
                // Fill the buffer with enough samples for the first update.
                observation = self.step_env(observation, schedule.batch_size)?;
            } else {
                match schedule.train_frequency {
                    TrainFrequency::Step(n) => {
                        observation = self.step_env(observation, n)?;
                    }
                    TrainFrequency::Episode(n) => {
                        let target = self.episode + n;
                        let mut exhausted = false;
                        while self.episode != target && !self.done {
                            if self.step >= num_steps {
                                exhausted = true;
                                break;
                            }
                            observation = self.step_env(observation, 1)?;
                        }
                        if exhausted {
                            break;
                        }
                    }
                }
            }

            if self.done {
                break;
            }

            self.model.set_train(true);
            let train_log = self.updater.update(&mut self.model, &mut self.buffer, schedule)?;
            self.logger.add_train_log(&train_log);
        }
        Ok(())
    }
}
