// src/app.rs - Capture and measure flows tying the components together
use crate::capture::{CaptureOutcome, FrameSampler};
use crate::config::CaptureConfig;
use crate::data::{self, DataExporter};
use crate::measurement::{derive_all, MeasureError, MeasurementSummary};
use crate::mediapipe_bridge::LandmarkOracle;
use crate::overlay::OverlayWriter;
use crate::video::FrameSource;
use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub enum RunOutcome {
    /// Nothing was detected; no file was written
    NoLandmarks,
    Completed {
        raw_path: Option<PathBuf>,
        measurements_path: PathBuf,
        summary: MeasurementSummary,
    },
}

/// Parse a height typed by the user, in centimeters
pub fn parse_height(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    let height: f64 = trimmed
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid height: {:?} is not a number", trimmed))?;
    if !height.is_finite() || height <= 0.0 {
        return Err(MeasureError::InvalidHeight(height).into());
    }
    Ok(height)
}

pub fn prompt_height<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<f64> {
    write!(output, "Enter your real height in cm: ")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        anyhow::bail!("invalid height: no input");
    }
    parse_height(&line)
}

/// Live flow: sample frames, save raw landmarks, ask for height, save measurements
pub fn run_capture(
    config: &CaptureConfig,
    source: &mut dyn FrameSource,
    oracle: &mut dyn LandmarkOracle,
    cancel: Arc<AtomicBool>,
    height: &mut dyn FnMut() -> Result<f64>,
) -> Result<RunOutcome> {
    let exporter = DataExporter::new(
        &config.output_dir,
        config.timestamped_session,
        config.raw_landmarks_file.as_str(),
        config.measurements_file.as_str(),
    );

    let mut sampler = FrameSampler::new(config.target_frames, config.frame_delay(), cancel);
    if config.save_overlays {
        sampler = sampler.with_overlays(OverlayWriter::new(exporter.output_dir()));
    }

    println!("Stand in front of the camera...");
    let CaptureOutcome { frames, stop, frames_read } = sampler.run(source, oracle)?;
    info!(
        "Capture finished ({:?}): {} detection(s) in {} frame(s)",
        stop,
        frames.len(),
        frames_read
    );

    if frames.is_empty() {
        println!("No landmarks detected. Exiting.");
        return Ok(RunOutcome::NoLandmarks);
    }

    let raw_path = exporter
        .export_landmarks(&frames)
        .context("Failed to save raw landmarks")?;
    println!("Raw landmarks saved to {}", raw_path.display());

    let real_height_cm = height()?;
    let records = derive_all(&frames, real_height_cm)?;

    let measurements_path = exporter
        .export_measurements(&records)
        .context("Failed to save measurements")?;
    println!("Final body measurements saved to {}!", measurements_path.display());

    let summary = MeasurementSummary::from_records(&records)
        .context("no measurements derived")?;
    print!("{}", summary.to_table());

    Ok(RunOutcome::Completed {
        raw_path: Some(raw_path),
        measurements_path,
        summary,
    })
}

/// Offline flow: recompute measurements from a saved raw landmark file
pub fn run_measure(
    input: &Path,
    output: &Path,
    height: &mut dyn FnMut() -> Result<f64>,
) -> Result<RunOutcome> {
    let frames = data::load_landmarks(input)
        .with_context(|| format!("Failed to load landmarks from {}", input.display()))?;
    if frames.is_empty() {
        println!("No landmarks detected. Exiting.");
        return Ok(RunOutcome::NoLandmarks);
    }
    info!("Loaded {} landmark set(s) from {}", frames.len(), input.display());

    let real_height_cm = height()?;
    let records = derive_all(&frames, real_height_cm)?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(output)
        .with_context(|| format!("Cannot create {}", output.display()))?;
    data::write_measurements(file, &records)?;
    println!("Final body measurements saved to {}!", output.display());

    let summary = MeasurementSummary::from_records(&records)
        .context("no measurements derived")?;
    print!("{}", summary.to_table());

    Ok(RunOutcome::Completed {
        raw_path: None,
        measurements_path: output.to_path_buf(),
        summary,
    })
}
