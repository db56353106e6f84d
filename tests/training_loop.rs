//! Integration tests for the gradient-based training loop
//!
//! These drive the orchestrator end-to-end against a scripted environment
//! with fixed episode lengths, a trivial model, and a counting update rule,
//! so cadence, warmup, episode bookkeeping, and callback semantics are
//! observable exactly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tch::{Device, Kind, Tensor};

use torque_rl::buffer::ReplayBuffer;
use torque_rl::callback::{Callback, Callbacks};
use torque_rl::config::{
    BufferSettings, ExplorerSettings, FitSchedule, TrainFrequency, TrainerSettings,
};
use torque_rl::env::{StepInfo, VecEnv, VecStepResult};
use torque_rl::logger::TrainLog;
use torque_rl::model::{CriticStack, GaussianDistribution, Model};
use torque_rl::train::{Trainer, UpdateRule};

/// Environment with scripted per-instance episode lengths
struct ScriptedEnv {
    episode_lens: Vec<usize>,
    ticks: Vec<usize>,
    interactions: usize,
}

impl ScriptedEnv {
    fn new(episode_lens: Vec<usize>) -> Self {
        let ticks = vec![0; episode_lens.len()];
        Self { episode_lens, ticks, interactions: 0 }
    }
}

impl VecEnv for ScriptedEnv {
    fn num_envs(&self) -> usize {
        self.episode_lens.len()
    }

    fn observation_dim(&self) -> usize {
        1
    }

    fn action_dim(&self) -> usize {
        1
    }

    fn action_bounds(&self) -> (f32, f32) {
        (-1.0, 1.0)
    }

    fn reset(&mut self) -> Result<Vec<Vec<f32>>> {
        self.ticks.iter_mut().for_each(|tick| *tick = 0);
        Ok(vec![vec![0.0]; self.num_envs()])
    }

    fn reset_env(&mut self, index: usize) -> Result<Vec<f32>> {
        self.ticks[index] = 0;
        Ok(vec![0.0])
    }

    fn step(&mut self, actions: &[Vec<f32>]) -> Result<VecStepResult> {
        assert_eq!(actions.len(), self.num_envs());
        self.interactions += 1;

        let mut observations = Vec::new();
        let mut rewards = Vec::new();
        let mut dones = Vec::new();
        let mut infos = Vec::new();
        for index in 0..self.num_envs() {
            self.ticks[index] += 1;
            observations.push(vec![self.ticks[index] as f32]);
            rewards.push(1.0);
            dones.push(self.ticks[index] >= self.episode_lens[index]);
            infos.push(StepInfo::default());
        }
        Ok(VecStepResult { observations, rewards, dones, infos })
    }
}

/// Model stub: deterministic zero actions, no critics
struct ZeroModel;

impl Model for ZeroModel {
    fn device(&self) -> Device {
        Device::Cpu
    }

    fn act(&self, observations: &Tensor) -> Result<Tensor> {
        let batch = observations.size()[0];
        Ok(Tensor::zeros([batch, 1], (Kind::Float, Device::Cpu)))
    }

    fn action_distribution(&self, observations: &Tensor) -> Result<GaussianDistribution> {
        let batch = observations.size()[0];
        Ok(GaussianDistribution::new(
            Tensor::zeros([batch, 1], (Kind::Float, Device::Cpu)),
            Tensor::ones([batch, 1], (Kind::Float, Device::Cpu)),
        ))
    }

    fn critics(&self) -> Option<&CriticStack> {
        None
    }
}

/// Update rule that records every invocation and the buffer size it saw
#[derive(Clone)]
struct CountingRule {
    calls: Arc<AtomicUsize>,
    buffer_lens: Arc<Mutex<Vec<usize>>>,
}

impl CountingRule {
    fn new() -> Self {
        Self { calls: Arc::new(AtomicUsize::new(0)), buffer_lens: Arc::new(Mutex::new(Vec::new())) }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl UpdateRule<ZeroModel> for CountingRule {
    fn update(
        &mut self,
        _model: &mut ZeroModel,
        buffer: &mut ReplayBuffer,
        _schedule: &FitSchedule,
    ) -> Result<TrainLog> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.buffer_lens.lock().unwrap().push(buffer.len());
        Ok(TrainLog::from_loss(0.0))
    }
}

/// Callback vetoing on its nth invocation
struct VetoCallback {
    invocations: usize,
    veto_on: usize,
}

impl Callback for VetoCallback {
    fn on_step(&mut self, _step: usize) -> bool {
        self.invocations += 1;
        self.invocations != self.veto_on
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn settings() -> TrainerSettings {
    init_tracing();
    TrainerSettings {
        // Keep exploration on the random branch for the whole test run.
        explorer: ExplorerSettings { start_steps: usize::MAX, scale: None },
        buffer: BufferSettings { capacity: 1024 },
        render: false,
    }
}

fn build_trainer(
    episode_lens: Vec<usize>,
    rule: CountingRule,
) -> Trainer<ScriptedEnv, ZeroModel, CountingRule> {
    Trainer::new(ScriptedEnv::new(episode_lens), ZeroModel, rule, settings()).unwrap()
}

#[test]
fn test_warmup_fills_buffer_before_first_update() {
    let rule = CountingRule::new();
    let mut trainer = build_trainer(vec![100], rule.clone());

    // Cadence says train every step, but the first cycle must still run
    // batch_size interactions.
    let schedule = FitSchedule::new().batch_size(5).train_frequency(TrainFrequency::Step(1));
    trainer.fit(10, &schedule).unwrap();

    let lens = rule.buffer_lens.lock().unwrap();
    assert_eq!(lens[0], 5, "first update saw {} stored steps", lens[0]);
}

#[test]
fn test_step_cadence_triggers_every_nth_interaction() {
    let rule = CountingRule::new();
    let mut trainer = build_trainer(vec![100], rule.clone());

    let schedule = FitSchedule::new().batch_size(4).train_frequency(TrainFrequency::Step(4));
    trainer.fit(12, &schedule).unwrap();

    assert_eq!(rule.calls(), 3);
    assert_eq!(trainer.step(), 12);
    assert_eq!(trainer.env().interactions, 12);
}

#[test]
fn test_episode_cadence_ignores_step_count() {
    let rule = CountingRule::new();
    let mut trainer = build_trainer(vec![3], rule.clone());

    let schedule = FitSchedule::new().batch_size(3).train_frequency(TrainFrequency::Episode(2));
    trainer.fit(12, &schedule).unwrap();

    // Warmup covers episode 1, the second cycle waits for episodes 2 and 3,
    // and the budget runs out mid-wait during the third cycle.
    assert_eq!(rule.calls(), 2);
    assert_eq!(trainer.episode(), 4);
    assert_eq!(trainer.step(), 12);
}

#[test]
fn test_episode_cadence_end_to_end() {
    let rule = CountingRule::new();
    let mut trainer = build_trainer(vec![3], rule.clone());

    let schedule = FitSchedule::new().batch_size(3).train_frequency(TrainFrequency::Episode(1));
    trainer.fit(6, &schedule).unwrap();

    assert_eq!(rule.calls(), 2, "expected exactly two training triggers");
    assert_eq!(trainer.episode(), 2);
    assert_eq!(trainer.step(), 6);
}

#[test]
fn test_callback_veto_halts_interaction_exactly() {
    let rule = CountingRule::new();
    let callbacks =
        Callbacks::new(vec![Box::new(VetoCallback { invocations: 0, veto_on: 5 })]);
    let mut trainer = build_trainer(vec![100], rule.clone()).with_callbacks(callbacks);

    let schedule = FitSchedule::new().batch_size(2).train_frequency(TrainFrequency::Step(1));
    trainer.fit(100, &schedule).unwrap();

    // The fifth interaction is the last one; its step increment never runs.
    assert_eq!(trainer.env().interactions, 5);
    assert_eq!(trainer.step(), 4);
    assert!(trainer.is_done());
    // Updates ran after cycles 0..2, then the veto killed cycle 3.
    assert_eq!(rule.calls(), 3);
}

#[test]
fn test_partial_episode_completion_never_flushes() {
    let rule = CountingRule::new();
    let mut trainer = build_trainer(vec![2, 4], rule.clone());

    let schedule = FitSchedule::new().batch_size(4).train_frequency(TrainFrequency::Step(4));
    trainer.fit(4, &schedule).unwrap();

    // Env 0 finished twice and env 1 once, but the mask was only full once.
    assert_eq!(trainer.episode(), 1);
    assert_eq!(trainer.logger().logs_written(), 1);
}

#[test]
fn test_transitions_reach_the_buffer() {
    let rule = CountingRule::new();
    let mut trainer = build_trainer(vec![100], rule.clone());

    let schedule = FitSchedule::new().batch_size(4).train_frequency(TrainFrequency::Step(4));
    trainer.fit(8, &schedule).unwrap();

    assert_eq!(trainer.buffer().len(), 8);
    let batch = trainer.buffer().sample(4, true).unwrap();
    assert_eq!(batch.observations.size(), vec![4, 1]);
}

#[test]
fn test_invalid_schedule_rejected_before_interaction() {
    let rule = CountingRule::new();
    let mut trainer = build_trainer(vec![10], rule.clone());

    let schedule = FitSchedule::new().batch_size(0);
    assert!(trainer.fit(10, &schedule).is_err());
    assert_eq!(trainer.env().interactions, 0);
    assert_eq!(rule.calls(), 0);
}
