//! Population-based (gradient-free) training orchestrator
//!
//! Structurally mirrors the gradient-based loop: the same cadence handling,
//! callback vetoes, step budget, and episode-mask bookkeeping. What differs
//! is the acting policy and the update: the population itself is the policy
//! (every parallel environment executes one candidate's action vector), and
//! each cadence-satisfying collection phase ends with the whole stored
//! trajectory batch being scored and the updater re-sampling the
//! population. No model-gradient step occurs anywhere on this path.

use anyhow::Result;
use tch::Kind;
use tracing::info;

use crate::buffer::ReplayBuffer;
use crate::callback::Callbacks;
use crate::config::{BufferSettings, PopulationSettings, TrainFrequency};
use crate::env::VecEnv;
use crate::logger::{EpisodeLogger, TrainLog};
use crate::train::Flow;

/// A population of candidate action vectors, one row per parallel
/// environment
pub type Population = Vec<Vec<f32>>;

/// Population update operator
///
/// Owns the population between generations. `evolve` receives one fitness
/// value per candidate (the per-environment reward sums of the last
/// collection phase) and replaces the internal population; selection,
/// crossover, mutation, and elitism are entirely its business.
pub trait EvolutionUpdater {
    /// Create the initial population
    ///
    /// # Arguments
    ///
    /// * `num_candidates` - Population size (one candidate per environment)
    /// * `dim` - Candidate vector dimensionality
    /// * `bounds` - Inclusive value bounds for candidates
    /// * `settings` - Initialization strategy
    fn initialize(
        &mut self,
        num_candidates: usize,
        dim: usize,
        bounds: (f32, f32),
        settings: &PopulationSettings,
    ) -> Result<Population>;

    /// Produce the next generation from per-candidate fitness values
    fn evolve(&mut self, fitness: &[f32]) -> Result<TrainLog>;

    /// The current population
    fn population(&self) -> &Population;
}

/// Training orchestrator for population-based search
pub struct EvolutionTrainer<E: VecEnv, U: EvolutionUpdater> {
    env: E,
    updater: U,
    population: Population,
    population_settings: PopulationSettings,
    buffer: ReplayBuffer,
    logger: EpisodeLogger,
    callbacks: Callbacks,

    /// Environment interactions so far
    step: usize,

    /// Completed episode rounds
    episode: usize,

    /// Set once a callback vetoes; never cleared
    done: bool,
}

impl<E: VecEnv, U: EvolutionUpdater> EvolutionTrainer<E, U> {
    /// Create an evolution trainer
    ///
    /// # Arguments
    ///
    /// * `env` - Batched environment; one candidate acts per instance
    /// * `updater` - Population update operator
    /// * `population_settings` - Population initialization settings
    /// * `buffer_settings` - Trajectory storage settings
    pub fn new(
        env: E,
        updater: U,
        population_settings: PopulationSettings,
        buffer_settings: BufferSettings,
    ) -> Result<Self> {
        let num_envs = env.num_envs();
        let buffer = ReplayBuffer::new(
            buffer_settings.capacity,
            num_envs,
            env.observation_dim(),
            env.action_dim(),
            tch::Device::Cpu,
        );
        let logger = EpisodeLogger::new(num_envs);
        info!(num_envs, "evolution trainer ready");

        Ok(Self {
            env,
            updater,
            population: Population::new(),
            population_settings,
            buffer,
            logger,
            callbacks: Callbacks::default(),
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

    /// The current population
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// The environment
    pub fn env(&self) -> &E {
        &self.env
    }

    /// The trajectory buffer
    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }

    /// The episode logger
    pub fn logger(&self) -> &EpisodeLogger {
        &self.logger
    }

    /// Step the population through the environment
    fn step_env(&mut self, mut observation: Vec<Vec<f32>>, num_steps: usize) -> Result<Vec<Vec<f32>>> {
        for _ in 0..num_steps {
            if self.interact_once(&mut observation)? == Flow::Stop {
                self.done = true;
                break;
            }
        }
        Ok(observation)
    }

    fn interact_once(&mut self, observation: &mut Vec<Vec<f32>>) -> Result<Flow> {
        let result = self.env.step(&self.population)?;

        self.buffer.add_trajectory(
            observation.clone(),
            self.population.clone(),
            &result.rewards,
            result.observations.clone(),
            &result.dones,
        );

        for (index, &done) in result.dones.iter().enumerate() {
            if done {
                observation[index] = self.env.reset_env(index)?;
                self.logger.mark_done(index);
            } else {
                observation[index] = result.observations[index].clone();
            }
        }

        // Episode counting shares the deep loop's mask machinery, but log
        // emission belongs to the per-generation evaluation instead.
        if self.logger.all_done() {
            self.logger.reset_episode_log();
            self.episode += 1;
        }

        if !self.callbacks.on_step(self.step) {
            return Ok(Flow::Stop);
        }
        self.step += 1;
        Ok(Flow::Continue)
    }

    /// Score the stored trajectory batch and flush the generation log
    ///
    /// Fitness is the per-candidate reward sum over the collection phase;
    /// the representative logged value is the best candidate's fitness.
    fn evaluate(&mut self) -> Result<Vec<f32>> {
        let trajectories = self.buffer.all()?;
        let sums = trajectories.rewards.sum_dim_intlist(0, false, Kind::Float);
        let fitness: Vec<f32> = Vec::try_from(sums)?;

        let best = fitness.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        self.logger.add_reward(&[best]);
        self.logger.write_log(self.step);
        self.logger.reset_episode_log();

        Ok(fitness)
    }

    /// Train the population in the environment
    ///
    /// Same contract as the gradient-based loop: `num_steps` total
    /// environment interactions, cadence-controlled generation boundaries,
    /// early exit on callback veto or an exhausted budget mid-episode-wait.
    pub fn fit(&mut self, num_steps: usize, train_frequency: TrainFrequency) -> Result<()> {
        let cycles = match train_frequency {
            TrainFrequency::Step(n) => num_steps / n,
            TrainFrequency::Episode(_) => num_steps,
        };

        self.population = self.updater.initialize(
            self.env.num_envs(),
            self.env.action_dim(),
            self.env.action_bounds(),
            &self.population_settings,
        )?;

        let mut observation = self.env.reset()?;
        for _ in 0..cycles {
            match train_frequency {
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

            if self.done {
                break;
            }

            let fitness = self.evaluate()?;
            let log = self.updater.evolve(&fitness)?;
            self.population = self.updater.population().clone();
            self.logger.add_train_log(&log);
            self.buffer.reset();
        }
        Ok(())
    }
}
