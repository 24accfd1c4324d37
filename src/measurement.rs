// src/measurement.rs - Height-calibrated body measurements from one landmark set
use crate::landmarks::{distance, midpoint, FrameLandmarks, Landmark};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Heuristic: neck width as a fraction of shoulder width. Not an anatomical measurement.
pub const NECK_WIDTH_RATIO: f64 = 0.25;
/// Heuristic: chest circumference as a multiple of shoulder width. Not a measured circumference.
pub const CHEST_CIRCUMFERENCE_RATIO: f64 = 1.2;
/// Heuristic: waist circumference as a multiple of hip width. Not a measured circumference.
pub const WAIST_CIRCUMFERENCE_RATIO: f64 = 1.1;

#[derive(Debug, Error, PartialEq)]
pub enum MeasureError {
    #[error("invalid height: {0} cm (must be a finite value above zero)")]
    InvalidHeight(f64),
    #[error("degenerate calibration: nose to ankle distance is {raw_height}")]
    DegenerateCalibration { raw_height: f64 },
}

/// Scaled measurements for one frame, in centimeters.
/// Field order is the CSV column order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub shoulder_width: f64,
    pub hip_width: f64,
    pub left_arm_length: f64,
    pub right_arm_length: f64,
    pub left_leg_length: f64,
    pub right_leg_length: f64,
    pub body_height: f64,
    pub neck_width: f64,
    pub chest_circumference: f64,
    pub waist_circumference: f64,
    pub head_width: f64,
    pub head_height: f64,
}

impl MeasurementRecord {
    pub const FIELD_NAMES: [&'static str; 12] = [
        "shoulder_width",
        "hip_width",
        "left_arm_length",
        "right_arm_length",
        "left_leg_length",
        "right_leg_length",
        "body_height",
        "neck_width",
        "chest_circumference",
        "waist_circumference",
        "head_width",
        "head_height",
    ];

    /// Values in `FIELD_NAMES` order
    pub fn values(&self) -> [f64; 12] {
        [
            self.shoulder_width,
            self.hip_width,
            self.left_arm_length,
            self.right_arm_length,
            self.left_leg_length,
            self.right_leg_length,
            self.body_height,
            self.neck_width,
            self.chest_circumference,
            self.waist_circumference,
            self.head_width,
            self.head_height,
        ]
    }
}

/// Nose to ankle-midpoint distance in model units
pub fn raw_height(frame: &FrameLandmarks) -> f64 {
    let ankles = midpoint(frame.get(Landmark::LeftAnkle), frame.get(Landmark::RightAnkle));
    distance(frame.get(Landmark::Nose), &ankles)
}

/// Ratio converting model units to centimeters for this frame
pub fn calibration_scale(frame: &FrameLandmarks, real_height_cm: f64) -> Result<f64, MeasureError> {
    if !real_height_cm.is_finite() || real_height_cm <= 0.0 {
        return Err(MeasureError::InvalidHeight(real_height_cm));
    }

    let raw_height = raw_height(frame);
    if raw_height == 0.0 || !raw_height.is_finite() {
        return Err(MeasureError::DegenerateCalibration { raw_height });
    }

    let scale = real_height_cm / raw_height;
    if !scale.is_finite() {
        return Err(MeasureError::DegenerateCalibration { raw_height });
    }
    Ok(scale)
}

pub fn derive_measurements(
    frame: &FrameLandmarks,
    real_height_cm: f64,
) -> Result<MeasurementRecord, MeasureError> {
    let scale = calibration_scale(frame, real_height_cm)?;
    let p = |lm: Landmark| frame.get(lm);
    let segment = |a: Landmark, b: Landmark| distance(p(a), p(b));

    let shoulder_raw = segment(Landmark::LeftShoulder, Landmark::RightShoulder);
    let hip_raw = segment(Landmark::LeftHip, Landmark::RightHip);
    let eyes = midpoint(p(Landmark::LeftEye), p(Landmark::RightEye));

    Ok(MeasurementRecord {
        shoulder_width: shoulder_raw * scale,
        hip_width: hip_raw * scale,
        left_arm_length: (segment(Landmark::LeftShoulder, Landmark::LeftElbow)
            + segment(Landmark::LeftElbow, Landmark::LeftWrist))
            * scale,
        right_arm_length: (segment(Landmark::RightShoulder, Landmark::RightElbow)
            + segment(Landmark::RightElbow, Landmark::RightWrist))
            * scale,
        left_leg_length: (segment(Landmark::LeftHip, Landmark::LeftKnee)
            + segment(Landmark::LeftKnee, Landmark::LeftAnkle))
            * scale,
        right_leg_length: (segment(Landmark::RightHip, Landmark::RightKnee)
            + segment(Landmark::RightKnee, Landmark::RightAnkle))
            * scale,
        body_height: raw_height(frame) * scale,
        neck_width: shoulder_raw * NECK_WIDTH_RATIO * scale,
        chest_circumference: shoulder_raw * CHEST_CIRCUMFERENCE_RATIO * scale,
        waist_circumference: hip_raw * WAIST_CIRCUMFERENCE_RATIO * scale,
        head_width: segment(Landmark::LeftEye, Landmark::RightEye) * scale,
        head_height: distance(p(Landmark::Nose), &eyes) * scale,
    })
}

pub fn derive_all(
    frames: &[FrameLandmarks],
    real_height_cm: f64,
) -> Result<Vec<MeasurementRecord>, MeasureError> {
    frames
        .iter()
        .map(|frame| derive_measurements(frame, real_height_cm))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Per-measurement statistics across all captured frames
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementSummary {
    pub frames: usize,
    pub fields: Vec<(&'static str, FieldStats)>,
}

impl MeasurementSummary {
    pub fn from_records(records: &[MeasurementRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        let fields = MeasurementRecord::FIELD_NAMES
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let column = records.iter().map(|r| r.values()[i]);
                let (sum, min, max) = column.fold(
                    (0.0, f64::INFINITY, f64::NEG_INFINITY),
                    |(sum, min, max), v| (sum + v, min.min(v), max.max(v)),
                );
                let stats = FieldStats {
                    mean: sum / records.len() as f64,
                    min,
                    max,
                };
                (*name, stats)
            })
            .collect();

        Some(Self {
            frames: records.len(),
            fields,
        })
    }

    pub fn get(&self, name: &str) -> Option<FieldStats> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, stats)| *stats)
    }

    pub fn to_table(&self) -> String {
        let mut out = format!(
            "{:<22} {:>9} {:>9} {:>9}   ({} frames)\n",
            "measurement (cm)", "mean", "min", "max", self.frames
        );
        for (name, stats) in &self.fields {
            out.push_str(&format!(
                "{:<22} {:>9.2} {:>9.2} {:>9.2}\n",
                name, stats.mean, stats.min, stats.max
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::tests::standing_figure;
    use crate::landmarks::LANDMARK_COUNT;
    use nalgebra::Vector3;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() <= eps * b.abs().max(1.0)
    }

    #[test]
    fn test_reference_scenario() {
        let frame = standing_figure();
        assert!(approx_eq(raw_height(&frame), 1.0, 1e-12));

        let record = derive_measurements(&frame, 180.0).unwrap();
        assert!(approx_eq(calibration_scale(&frame, 180.0).unwrap(), 180.0, 1e-12));
        assert!(approx_eq(record.shoulder_width, 72.0, 1e-9));
        assert!(approx_eq(record.neck_width, 18.0, 1e-9));
        assert!(approx_eq(record.body_height, 180.0, 1e-9));
        assert!(approx_eq(record.chest_circumference, 72.0 * 1.2, 1e-9));
        assert!(approx_eq(record.hip_width, 36.0, 1e-9));
        assert!(approx_eq(record.waist_circumference, 36.0 * 1.1, 1e-9));
        assert!(approx_eq(record.left_leg_length, 72.0, 1e-9));
        assert!(approx_eq(record.head_width, 0.06 * 180.0, 1e-9));
    }

    #[test]
    fn test_body_height_matches_real_height() {
        let mut frame = standing_figure().to_flat();
        // tilt the figure so raw height is not a round number
        frame[0] = 0.13;
        frame[2] = -0.41;
        let frame = FrameLandmarks::from_flat(&frame).unwrap();

        for height in [150.0, 172.5, 181.3, 205.0] {
            let record = derive_measurements(&frame, height).unwrap();
            assert!(approx_eq(record.body_height, height, 1e-9));
        }
    }

    #[test]
    fn test_doubling_height_doubles_measurements() {
        let frame = standing_figure();
        let single = derive_measurements(&frame, 165.0).unwrap();
        let double = derive_measurements(&frame, 330.0).unwrap();

        for (a, b) in single.values().iter().zip(double.values().iter()) {
            assert!(approx_eq(*b, a * 2.0, 1e-9));
        }
    }

    #[test]
    fn test_degenerate_raw_height_fails() {
        let frame = FrameLandmarks::new([Vector3::new(0.5, 0.5, 0.0); LANDMARK_COUNT]);
        assert_eq!(
            derive_measurements(&frame, 180.0),
            Err(MeasureError::DegenerateCalibration { raw_height: 0.0 })
        );
    }

    #[test]
    fn test_invalid_height_fails() {
        let frame = standing_figure();
        assert_eq!(derive_measurements(&frame, 0.0), Err(MeasureError::InvalidHeight(0.0)));
        assert_eq!(derive_measurements(&frame, -170.0), Err(MeasureError::InvalidHeight(-170.0)));
        assert!(matches!(
            derive_measurements(&frame, f64::NAN),
            Err(MeasureError::InvalidHeight(_))
        ));
        assert!(derive_measurements(&frame, f64::INFINITY).is_err());
    }

    #[test]
    fn test_derive_all_stops_on_first_bad_frame() {
        let good = standing_figure();
        let bad = FrameLandmarks::new([Vector3::zeros(); LANDMARK_COUNT]);
        assert_eq!(derive_all(&[good.clone(), good.clone()], 170.0).unwrap().len(), 2);
        assert!(derive_all(&[good, bad], 170.0).is_err());
    }

    #[test]
    fn test_summary() {
        let frame = standing_figure();
        let records = vec![
            derive_measurements(&frame, 170.0).unwrap(),
            derive_measurements(&frame, 190.0).unwrap(),
        ];
        let summary = MeasurementSummary::from_records(&records).unwrap();

        assert_eq!(summary.frames, 2);
        assert_eq!(summary.fields.len(), 12);
        let height = summary.get("body_height").unwrap();
        assert!(approx_eq(height.mean, 180.0, 1e-9));
        assert!(approx_eq(height.min, 170.0, 1e-9));
        assert!(approx_eq(height.max, 190.0, 1e-9));
        assert!(summary.to_table().contains("shoulder_width"));
        assert!(MeasurementSummary::from_records(&[]).is_none());
    }
}
