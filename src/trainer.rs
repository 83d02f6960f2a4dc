use std::{
    fs::File,
    io::{BufWriter, Write},
};

use tracing::{debug, info};

use crate::{
    agent::CentralizedAgent,
    config::DriverConfig,
    environment::CleanupEnv,
    error::Result,
    report::EpisodeHistory,
};

/// What one episode produced, for callers and the running log.
#[derive(Debug, Clone)]
pub struct EpisodeSummary {
    pub epoch: usize,
    /// Apples eaten over the whole episode.
    pub apple_reward: u64,
    pub steps: usize,
    pub final_apples: usize,
    pub final_dirt: usize,
    pub final_dirt_reward: f32,
    pub last_loss: Option<f32>,
    pub history: EpisodeHistory,
}

/// Drives the world and the learner through repeated episodes.
pub struct Trainer {
    env: CleanupEnv,
    learner: CentralizedAgent,
    config: DriverConfig,
    reward_graph: Vec<u64>,
}

impl Trainer {
    pub fn new(env: CleanupEnv, learner: CentralizedAgent, config: DriverConfig) -> Self {
        Self {
            env,
            learner,
            config,
            reward_graph: Vec::new(),
        }
    }

    pub fn env(&self) -> &CleanupEnv {
        &self.env
    }

    pub fn learner(&self) -> &CentralizedAgent {
        &self.learner
    }

    pub fn reward_graph(&self) -> &[u64] {
        &self.reward_graph
    }

    /// Runs every configured epoch, writing the running and notable logs.
    pub fn run(&mut self) -> Result<Vec<EpisodeSummary>> {
        let mut log = BufWriter::new(File::create(&self.config.log_path)?);
        let mut good_log = BufWriter::new(File::create(&self.config.notable_log_path)?);
        let mut summaries = Vec::with_capacity(self.config.num_epochs);

        for epoch in 0..self.config.num_epochs {
            writeln!(log, "=============== episode {epoch} ===============")?;
            let summary = self.run_episode(epoch)?;

            if summary.apple_reward > self.config.notable_reward {
                info!(epoch, reward = summary.apple_reward, "notable episode");
                summary
                    .history
                    .write_notable(&mut good_log, epoch, summary.apple_reward)?;
            }
            if let Some(dir) = &self.config.csv_dir {
                summary
                    .history
                    .write_csv(&dir.join(format!("episode_{}.csv", epoch + 1)))?;
            }

            writeln!(log, "Reward graph: ")?;
            writeln!(log, "{:?}", self.reward_graph)?;
            summaries.push(summary);
        }

        log.flush()?;
        good_log.flush()?;
        Ok(summaries)
    }

    /// One episode: reset, then step until the horizon or the step limit,
    /// handing each aggregate transition to the learner as it happens.
    pub fn run_episode(&mut self, epoch: usize) -> Result<EpisodeSummary> {
        let info = self.env.reset(&self.learner)?;
        let mut info_vec = info.aggregate();
        info!(
            epoch,
            apples = info.apples,
            dirt = info.dirt,
            dirt_reward = self.env.dirt_reward(),
            "starting episode"
        );

        let mut history = EpisodeHistory::default();
        let mut epoch_reward = 0;
        let mut last_loss = None;
        let mut steps = 0;

        for step in 0..self.config.max_steps_per_epoch {
            let outcome = self.env.step(&self.learner)?;
            steps += 1;
            history.record(&outcome.info, self.env.dirt_reward());

            let new_info_vec = outcome.info.aggregate();
            epoch_reward = outcome.total_apple_consumed;
            if let Some(loss) =
                self.learner
                    .observe(outcome.step_apple_reward, info_vec, new_info_vec)?
            {
                last_loss = Some(loss);
            }
            info_vec = new_info_vec;

            debug!(
                step,
                apples = outcome.info.apples,
                dirt = outcome.info.dirt,
                dirt_reward = self.env.dirt_reward(),
                "episode step"
            );
            if outcome.done {
                break;
            }
        }

        self.reward_graph.push(epoch_reward);
        info!(
            epoch,
            reward = epoch_reward,
            apples = self.env.num_apples(),
            dirt = self.env.num_dirt(),
            dirt_reward = self.env.dirt_reward(),
            ?last_loss,
            "episode finished"
        );

        Ok(EpisodeSummary {
            epoch,
            apple_reward: epoch_reward,
            steps,
            final_apples: self.env.num_apples(),
            final_dirt: self.env.num_dirt(),
            final_dirt_reward: self.env.dirt_reward(),
            last_loss,
            history,
        })
    }
}

#[cfg(test)]
mod tests {
    use candle_core::Device;

    use super::*;
    use crate::config::{CleanupConfig, LearnerConfig};

    fn trainer(driver: DriverConfig) -> Trainer {
        let env = CleanupEnv::new(CleanupConfig {
            height: 9,
            width: 9,
            num_agents: 3,
            episode_horizon: 40,
            seed: 9,
            ..CleanupConfig::default()
        })
        .unwrap();
        let learner = CentralizedAgent::new(
            LearnerConfig {
                batch_size: 8,
                ..LearnerConfig::default()
            },
            &Device::Cpu,
        )
        .unwrap();
        Trainer::new(env, learner, driver)
    }

    #[test]
    fn episode_stops_at_the_horizon_and_feeds_the_learner() {
        let dir = tempfile::tempdir().unwrap();
        let mut trainer = trainer(DriverConfig {
            num_epochs: 1,
            max_steps_per_epoch: 100,
            log_path: dir.path().join("log.txt"),
            notable_log_path: dir.path().join("good.txt"),
            ..DriverConfig::default()
        });
        let summary = trainer.run_episode(0).unwrap();

        assert_eq!(summary.steps, 40);
        assert_eq!(summary.history.len(), 40);
        assert_eq!(trainer.learner().memory().len(), 40);
        assert_eq!(trainer.learner().train_steps(), 40 - 8 + 1);
        assert!(summary.last_loss.is_some_and(f32::is_finite));
        assert!(summary.final_dirt_reward.is_finite());
        assert_eq!(trainer.reward_graph(), &[summary.apple_reward]);
    }

    #[test]
    fn step_limit_cuts_episodes_short() {
        let dir = tempfile::tempdir().unwrap();
        let mut trainer = trainer(DriverConfig {
            num_epochs: 1,
            max_steps_per_epoch: 5,
            log_path: dir.path().join("log.txt"),
            notable_log_path: dir.path().join("good.txt"),
            ..DriverConfig::default()
        });
        let summary = trainer.run_episode(0).unwrap();
        assert_eq!(summary.steps, 5);
        assert_eq!(trainer.learner().train_steps(), 0);
        assert!(summary.last_loss.is_none());
    }

    #[test]
    fn run_writes_logs_and_csvs() {
        let dir = tempfile::tempdir().unwrap();
        let mut trainer = trainer(DriverConfig {
            num_epochs: 2,
            max_steps_per_epoch: 50,
            // Every episode with any apple counts as notable here.
            notable_reward: 0,
            log_path: dir.path().join("log.txt"),
            notable_log_path: dir.path().join("good.txt"),
            csv_dir: Some(dir.path().to_path_buf()),
        });
        let summaries = trainer.run().unwrap();
        assert_eq!(summaries.len(), 2);

        let log = std::fs::read_to_string(dir.path().join("log.txt")).unwrap();
        assert!(log.contains("=============== episode 0 ==============="));
        assert!(log.contains("=============== episode 1 ==============="));
        assert_eq!(log.matches("Reward graph:").count(), 2);

        let notable = std::fs::read_to_string(dir.path().join("good.txt")).unwrap();
        let expected = summaries.iter().filter(|s| s.apple_reward > 0).count();
        assert_eq!(notable.matches("Epoch number:").count(), expected);

        assert!(dir.path().join("episode_1.csv").exists());
        assert!(dir.path().join("episode_2.csv").exists());
    }
}
