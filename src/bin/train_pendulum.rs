//! Train a soft Q critic on the pendulum swing-up task
//!
//! Runs the full harness end-to-end: four parallel pendulums, a Gaussian
//! actor with twin target critics, random warm-start exploration, and
//! Polyak target synchronization between training rounds.

use anyhow::Result;
use tch::Device;
use torque_rl::prelude::*;

const OBS_DIM: i64 = 3;
const ACTION_DIM: i64 = 1;
const HIDDEN_DIM: i64 = 64;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let device = Device::cuda_if_available();
    let env = EnvPool::new(Pendulum::new, 4);
    let critics = CriticStack::twin_with_target(OBS_DIM, Some(ACTION_DIM), HIDDEN_DIM, device)?;
    let model = SacModel::new(OBS_DIM, ACTION_DIM, HIDDEN_DIM, critics);

    let updater = SoftQUpdate::new(
        CriticUpdaterConfig::default().learning_rate(3e-4).max_grad(0.5),
        SacConfig::default(),
    )?;

    let settings = TrainerSettings {
        explorer: ExplorerSettings { start_steps: 1000, scale: Some(0.1) },
        ..Default::default()
    };
    let mut trainer = Trainer::new(env, model, updater, settings)?
        .with_callbacks(Callbacks::new(vec![Box::new(StepLimitCallback::new(60_000))]));

    let schedule = FitSchedule::new()
        .batch_size(256)
        .critic_epochs(1)
        .train_frequency(TrainFrequency::Step(1));

    // Train in rounds, nudging the target networks after each one.
    for round in 0..50 {
        trainer.fit(1000, &schedule)?;
        trainer.model_mut().critics_mut().sync_targets(0.01);
        tracing::info!(
            round,
            step = trainer.step(),
            episode = trainer.episode(),
            "round finished"
        );
        if trainer.is_done() {
            break;
        }
    }
    Ok(())
}
