// src/main.rs
mod app;
mod capture;
mod config;
mod data;
mod landmarks;
mod measurement;
mod mediapipe_bridge;
mod overlay;
mod video;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tracing::info;

use crate::config::CaptureConfig;
use crate::mediapipe_bridge::MediaPipeBridge;
use crate::video::VideoSource;

/// Estimate body measurements from webcam pose landmarks, calibrated by your real height
#[derive(Parser, Debug)]
#[command(name = "body_measure")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    capture: CaptureArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture frames from the camera and measure (default)
    Capture(CaptureArgs),
    /// Recompute measurements from a saved raw landmark CSV
    Measure(MeasureArgs),
}

#[derive(Args, Debug, Clone, Default)]
struct CaptureArgs {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Camera device index
    #[arg(long)]
    camera: Option<u32>,

    /// Number of detected frames to collect
    #[arg(long)]
    frames: Option<usize>,

    /// Pause after every frame read, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Directory for the CSV files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Real height in cm; prompted for after capture when omitted
    #[arg(long, value_parser = app::parse_height)]
    height: Option<f64>,

    /// Read frames from a directory of images instead of the camera
    #[arg(long)]
    images: Option<PathBuf>,

    /// Save a skeleton overlay PNG for every detected frame
    #[arg(long)]
    overlays: bool,

    /// Write into a timestamped session directory
    #[arg(long)]
    session: bool,
}

#[derive(Args, Debug)]
struct MeasureArgs {
    /// Raw landmark CSV written by a previous capture
    #[arg(short, long)]
    input: PathBuf,

    /// Measurement CSV to write
    #[arg(short, long, default_value = "final_body_measurements.csv")]
    output: PathBuf,

    /// Real height in cm; prompted for when omitted
    #[arg(long, value_parser = app::parse_height)]
    height: Option<f64>,
}

impl CaptureArgs {
    fn resolve(&self) -> Result<CaptureConfig> {
        let mut config = match self.config.clone().or_else(CaptureConfig::default_path) {
            Some(path) => {
                info!("Loading config from {}", path.display());
                CaptureConfig::load(path)?
            }
            None => CaptureConfig::default(),
        };

        if let Some(index) = self.camera {
            config.camera_index = index;
        }
        if let Some(frames) = self.frames {
            config.target_frames = frames;
        }
        if let Some(delay) = self.delay_ms {
            config.frame_delay_ms = delay;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        config.save_overlays |= self.overlays;
        config.timestamped_session |= self.session;

        config.validate()?;
        Ok(config)
    }
}

fn ask_height(preset: Option<f64>) -> impl FnMut() -> Result<f64> {
    move || match preset {
        Some(height) => Ok(height),
        None => app::prompt_height(&mut io::stdin().lock(), &mut io::stdout()),
    }
}

fn run_capture(args: CaptureArgs) -> Result<()> {
    let config = args.resolve()?;
    info!("Capture settings: {:?}", config);

    let cancel = capture::install_interrupt_handler()?;
    let mut source = match &args.images {
        Some(dir) => VideoSource::new_images(dir)?,
        None => VideoSource::new_camera(config.camera_index)?,
    };
    let mut oracle = MediaPipeBridge::spawn(&config.oracle_command)?;

    let outcome = app::run_capture(
        &config,
        &mut source,
        &mut oracle,
        cancel,
        &mut ask_height(args.height),
    )?;

    report(&outcome);
    Ok(())
}

fn report(outcome: &app::RunOutcome) {
    if let app::RunOutcome::Completed { raw_path, measurements_path, summary } = outcome {
        if let Some(raw_path) = raw_path {
            info!("Raw landmarks: {}", raw_path.display());
        }
        info!(
            "Done: {} frame(s) measured into {}",
            summary.frames,
            measurements_path.display()
        );
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Capture(cli.capture)) {
        Command::Capture(args) => run_capture(args),
        Command::Measure(args) => {
            let outcome = app::run_measure(&args.input, &args.output, &mut ask_height(args.height))?;
            report(&outcome);
            Ok(())
        }
    }
}
