use std::time::Instant;

use anyhow::Result;
use cleanup::{
    CentralizedAgent, CleanupConfig, CleanupEnv, DriverConfig, LearnerConfig, Trainer,
    device::DEVICE,
};
use tracing::info;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();

    let env = CleanupEnv::new(CleanupConfig::default())?;
    let learner = CentralizedAgent::new(LearnerConfig::default(), &DEVICE)?;
    let driver = DriverConfig::default();
    info!(
        epochs = driver.num_epochs,
        steps = driver.max_steps_per_epoch,
        "starting cleanup training"
    );

    let start = Instant::now();
    let mut trainer = Trainer::new(env, learner, driver);
    let summaries = trainer.run()?;

    let best = summaries.iter().map(|s| s.apple_reward).max().unwrap_or(0);
    info!(
        episodes = summaries.len(),
        best_reward = best,
        elapsed_s = start.elapsed().as_secs(),
        "training finished"
    );
    Ok(())
}
