// src/config.rs - Capture settings with JSON file overrides
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub camera_index: u32,
    pub target_frames: usize,
    pub frame_delay_ms: u64,
    pub output_dir: PathBuf,
    pub raw_landmarks_file: String,
    pub measurements_file: String,
    /// Program and arguments of the pose helper process
    pub oracle_command: Vec<String>,
    pub save_overlays: bool,
    /// Write into `output_dir/session_YYYYMMDD_HHMMSS/` instead of `output_dir`
    pub timestamped_session: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            target_frames: 10,
            frame_delay_ms: 300,
            output_dir: PathBuf::from("."),
            raw_landmarks_file: "body_landmarks.csv".to_string(),
            measurements_file: "final_body_measurements.csv".to_string(),
            oracle_command: vec!["python3".to_string(), "scripts/pose_landmarks.py".to_string()],
            save_overlays: false,
            timestamped_session: false,
        }
    }
}

impl CaptureConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: CaptureConfig = serde_json::from_str(text).context("Invalid config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Bad config {}", path.display()))
    }

    /// `config.json` in the platform config directory, if there is one
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "body_measure")
            .map(|dirs| dirs.config_dir().join("config.json"))
            .filter(|path| path.exists())
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_frames == 0 {
            anyhow::bail!("target_frames must be at least 1");
        }
        if self.oracle_command.is_empty() {
            anyhow::bail!("oracle_command must name a program");
        }
        Ok(())
    }

    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }
}
