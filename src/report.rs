use std::{fs::File, io::Write, path::Path};

use polars::{
    frame::DataFrame,
    io::SerWriter,
    prelude::{Column, CsvWriter},
};

use crate::{environment::StepInfo, error::Result};

/// Per-step metrics of one episode, kept for the notable-episode log and
/// the optional CSV dump.
#[derive(Debug, Default, Clone)]
pub struct EpisodeHistory {
    pub apple_dirt: Vec<f64>,
    pub apples: Vec<u32>,
    pub dirt: Vec<u32>,
    pub x1: Vec<u32>,
    pub x2: Vec<u32>,
    pub x3: Vec<u32>,
    pub pickers: Vec<u32>,
    pub cleaners: Vec<u32>,
    pub dirt_reward: Vec<f32>,
}

impl EpisodeHistory {
    pub fn record(&mut self, info: &StepInfo, dirt_reward: f32) {
        self.apple_dirt.push(info.apple_dirt_ratio());
        self.apples.push(info.apples as u32);
        self.dirt.push(info.dirt as u32);
        self.x1.push(info.bands[0] as u32);
        self.x2.push(info.bands[1] as u32);
        self.x3.push(info.bands[2] as u32);
        self.pickers.push(info.pickers as u32);
        self.cleaners.push(info.cleaners as u32);
        self.dirt_reward.push(dirt_reward);
    }

    pub fn len(&self) -> usize {
        self.dirt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirt.is_empty()
    }

    /// Appends one labeled block per metric for a notable episode.
    pub fn write_notable<W: Write>(&self, out: &mut W, epoch: usize, reward: u64) -> Result<()> {
        writeln!(out, "Epoch number: {epoch}")?;
        writeln!(out, "Epoch reward: {reward}")?;
        writeln!(out, "Epoch apple/dirt")?;
        writeln!(out, "{:?}\n", self.apple_dirt)?;
        writeln!(out, "Epoch dirt")?;
        writeln!(out, "{:?}\n", self.dirt)?;
        writeln!(out, "Epoch x1")?;
        writeln!(out, "{:?}\n", self.x1)?;
        writeln!(out, "Epoch x2")?;
        writeln!(out, "{:?}\n", self.x2)?;
        writeln!(out, "Epoch x3")?;
        writeln!(out, "{:?}\n", self.x3)?;
        Ok(())
    }

    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let steps: Vec<u32> = (1..=self.len() as u32).collect();
        Ok(DataFrame::new(vec![
            Column::new("step".into(), steps),
            Column::new("apples".into(), self.apples.clone()),
            Column::new("dirt".into(), self.dirt.clone()),
            Column::new("apple_dirt_ratio".into(), self.apple_dirt.clone()),
            Column::new("x1".into(), self.x1.clone()),
            Column::new("x2".into(), self.x2.clone()),
            Column::new("x3".into(), self.x3.clone()),
            Column::new("pickers".into(), self.pickers.clone()),
            Column::new("cleaners".into(), self.cleaners.clone()),
            Column::new("dirt_reward".into(), self.dirt_reward.clone()),
        ])?)
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut df = self.to_dataframe()?;
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file).finish(&mut df)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Position;

    fn info(apples: usize, dirt: usize) -> StepInfo {
        StepInfo {
            apples,
            dirt,
            bands: [1, 0, 2],
            pickers: 2,
            cleaners: 1,
            positions: vec![Position::new(0, 0); 3],
        }
    }

    #[test]
    fn ratio_falls_back_to_apples_on_a_clean_river() {
        let mut history = EpisodeHistory::default();
        history.record(&info(6, 3), 0.5);
        history.record(&info(4, 0), 0.25);
        assert_eq!(history.apple_dirt, vec![2.0, 4.0]);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn notable_block_lists_every_metric() {
        let mut history = EpisodeHistory::default();
        history.record(&info(1, 2), 0.1);
        let mut out = Vec::new();
        history.write_notable(&mut out, 7, 2500).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Epoch number: 7\nEpoch reward: 2500\n"));
        for label in ["Epoch apple/dirt", "Epoch dirt", "Epoch x1", "Epoch x2", "Epoch x3"] {
            assert!(text.contains(label), "missing {label}");
        }
        assert!(text.contains("Epoch x3\n[2]\n\n"));
    }

    #[test]
    fn dataframe_has_one_row_per_step() {
        let mut history = EpisodeHistory::default();
        for dirt in 0..5 {
            history.record(&info(1, dirt), 0.0);
        }
        let df = history.to_dataframe().unwrap();
        assert_eq!(df.height(), 5);
        assert_eq!(df.width(), 10);
    }

    #[test]
    fn csv_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episode.csv");
        let mut history = EpisodeHistory::default();
        history.record(&info(3, 1), 1.5);
        history.write_csv(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("step,apples,dirt,apple_dirt_ratio"));
    }
}
