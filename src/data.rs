// src/data.rs - CSV stores for raw landmarks and derived measurements
use crate::landmarks::{FrameLandmarks, LandmarkError, LANDMARK_COUNT};
use crate::measurement::MeasurementRecord;
use chrono::Local;
use csv::{Reader, Writer};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected landmark header, expected x0,y0,z0,...,x32,y32,z32")]
    HeaderMismatch,
    #[error("row {row}: expected {expected} fields, found {found}")]
    RowWidth { row: usize, expected: usize, found: usize },
    #[error("row {row}: field {column} is not a number: {value:?}")]
    NotANumber { row: usize, column: String, value: String },
    #[error("row {row}: {source}")]
    Landmarks { row: usize, source: LandmarkError },
}

/// `x0, y0, z0, ..., x32, y32, z32`
pub fn landmark_header() -> Vec<String> {
    (0..LANDMARK_COUNT)
        .flat_map(|i| [format!("x{}", i), format!("y{}", i), format!("z{}", i)])
        .collect()
}

pub fn write_landmarks<W: Write>(out: W, frames: &[FrameLandmarks]) -> Result<(), StoreError> {
    let mut writer = Writer::from_writer(out);
    writer.write_record(landmark_header())?;
    for frame in frames {
        writer.write_record(frame.to_flat().iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_landmarks<R: Read>(input: R) -> Result<Vec<FrameLandmarks>, StoreError> {
    let mut reader = Reader::from_reader(input);
    let expected = landmark_header();

    let headers = reader.headers()?.clone();
    if headers.len() != expected.len() || headers.iter().zip(&expected).any(|(h, e)| h != e) {
        return Err(StoreError::HeaderMismatch);
    }

    let mut frames = Vec::new();
    for (i, result) in reader.records().enumerate() {
        // header is line 1
        let row = i + 2;
        let record = result.map_err(|e| {
            if let csv::ErrorKind::UnequalLengths { len, .. } = e.kind() {
                return StoreError::RowWidth {
                    row,
                    expected: expected.len(),
                    found: *len as usize,
                };
            }
            StoreError::Csv(e)
        })?;

        let values = record
            .iter()
            .zip(&expected)
            .map(|(value, column)| {
                value.trim().parse::<f64>().map_err(|_| StoreError::NotANumber {
                    row,
                    column: column.clone(),
                    value: value.to_string(),
                })
            })
            .collect::<Result<Vec<f64>, StoreError>>()?;

        let frame = FrameLandmarks::from_flat(&values)
            .map_err(|source| StoreError::Landmarks { row, source })?;
        frames.push(frame);
    }
    Ok(frames)
}

pub fn write_measurements<W: Write>(out: W, records: &[MeasurementRecord]) -> Result<(), StoreError> {
    let mut writer = Writer::from_writer(out);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Places both CSV files in one output directory, overwriting earlier runs
pub struct DataExporter {
    output_dir: PathBuf,
    raw_file: String,
    measurements_file: String,
}

impl DataExporter {
    pub fn new(
        output_dir: impl AsRef<Path>,
        timestamped: bool,
        raw_file: impl Into<String>,
        measurements_file: impl Into<String>,
    ) -> Self {
        let mut output_dir = output_dir.as_ref().to_path_buf();
        if timestamped {
            output_dir = output_dir.join(format!("session_{}", Local::now().format("%Y%m%d_%H%M%S")));
        }

        Self {
            output_dir,
            raw_file: raw_file.into(),
            measurements_file: measurements_file.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn raw_path(&self) -> PathBuf {
        self.output_dir.join(&self.raw_file)
    }

    pub fn measurements_path(&self) -> PathBuf {
        self.output_dir.join(&self.measurements_file)
    }

    pub fn export_landmarks(&self, frames: &[FrameLandmarks]) -> Result<PathBuf, StoreError> {
        let path = self.raw_path();
        let file = Self::create(&path)?;
        write_landmarks(file, frames)?;
        Ok(path)
    }

    pub fn export_measurements(&self, records: &[MeasurementRecord]) -> Result<PathBuf, StoreError> {
        let path = self.measurements_path();
        let file = Self::create(&path)?;
        write_measurements(file, records)?;
        Ok(path)
    }

    fn create(path: &Path) -> Result<File, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(File::create(path)?)
    }
}

pub fn load_landmarks(path: impl AsRef<Path>) -> Result<Vec<FrameLandmarks>, StoreError> {
    let file = File::open(path.as_ref())?;
    read_landmarks(file)
}
