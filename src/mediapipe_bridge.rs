// src/mediapipe_bridge.rs - Pose landmark oracle backed by a MediaPipe helper process
use crate::landmarks::{FrameLandmarks, LandmarkError};
use image::DynamicImage;
use serde::Deserialize;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("oracle command is empty")]
    EmptyCommand,
    #[error("failed to start pose helper `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("pose helper pipe error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to write frame for pose helper: {0}")]
    Image(#[from] image::ImageError),
    #[error("pose helper exited before answering")]
    HelperExited,
    #[error("malformed pose helper response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("pose helper reported an error: {0}")]
    Reported(String),
    #[error("pose helper returned a bad landmark set: {0}")]
    Landmarks(#[from] LandmarkError),
}

/// Detects at most one person per frame
pub trait LandmarkOracle {
    /// `Ok(None)` means the frame was processed but nobody was found
    fn detect(&mut self, frame: &DynamicImage) -> Result<Option<FrameLandmarks>, BridgeError>;
}

#[derive(Debug, Deserialize)]
struct HelperResponse {
    #[serde(default)]
    landmarks: Option<Vec<[f64; 3]>>,
    #[serde(default)]
    error: Option<String>,
}

/// Decode one JSON line from the helper
pub fn parse_response(line: &str) -> Result<Option<FrameLandmarks>, BridgeError> {
    let response: HelperResponse = serde_json::from_str(line.trim())?;
    if let Some(message) = response.error {
        return Err(BridgeError::Reported(message));
    }
    match response.landmarks {
        Some(triples) => Ok(Some(FrameLandmarks::from_triples(&triples)?)),
        None => Ok(None),
    }
}

/// Long-lived helper process speaking a line protocol:
/// one frame path per line on stdin, one JSON object per line on stdout.
pub struct MediaPipeBridge {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    scratch_dir: PathBuf,
    frames_sent: u64,
}

impl MediaPipeBridge {
    pub fn spawn(command: &[String]) -> Result<Self, BridgeError> {
        let (program, args) = command.split_first().ok_or(BridgeError::EmptyCommand)?;

        info!("Starting pose helper: {}", command.join(" "));
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        // keep terminal Ctrl-C away from the helper; capture decides when it ends
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        let mut child = cmd
            .spawn()
            .map_err(|source| BridgeError::Spawn {
                command: command.join(" "),
                source,
            })?;

        let stdin = child.stdin.take().ok_or(BridgeError::HelperExited)?;
        let stdout = child.stdout.take().ok_or(BridgeError::HelperExited)?;

        let scratch_dir = std::env::temp_dir().join(format!("body_measure_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&scratch_dir)?;

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            scratch_dir,
            frames_sent: 0,
        })
    }
}

impl LandmarkOracle for MediaPipeBridge {
    fn detect(&mut self, frame: &DynamicImage) -> Result<Option<FrameLandmarks>, BridgeError> {
        let frame_path = self.scratch_dir.join("frame.png");
        frame.to_rgb8().save(&frame_path)?;

        writeln!(self.stdin, "{}", frame_path.display())?;
        self.stdin.flush()?;
        self.frames_sent += 1;

        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(BridgeError::HelperExited);
        }
        debug!("frame {}: helper answered {} bytes", self.frames_sent, line.len());

        parse_response(&line)
    }
}

impl Drop for MediaPipeBridge {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            debug!("pose helper already stopped: {}", e);
        }
        let _ = self.child.wait();
        if let Err(e) = std::fs::remove_dir_all(&self.scratch_dir) {
            warn!("could not remove {}: {}", self.scratch_dir.display(), e);
        }
    }
}
