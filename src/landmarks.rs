// src/landmarks.rs - Pose landmark layout and per-frame landmark sets
use nalgebra::Vector3;
use thiserror::Error;

/// Number of landmarks the pose model reports per frame
pub const LANDMARK_COUNT: usize = 33;

/// Landmark indices used by the measurement derivation.
/// Remaining indices (hands, feet, ears, mouth) are carried through but unnamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Landmark {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
}

impl Landmark {
    pub const ALL: [Landmark; 15] = [
        Landmark::Nose,
        Landmark::LeftEye,
        Landmark::RightEye,
        Landmark::LeftShoulder,
        Landmark::RightShoulder,
        Landmark::LeftElbow,
        Landmark::RightElbow,
        Landmark::LeftWrist,
        Landmark::RightWrist,
        Landmark::LeftHip,
        Landmark::RightHip,
        Landmark::LeftKnee,
        Landmark::RightKnee,
        Landmark::LeftAnkle,
        Landmark::RightAnkle,
    ];

    /// Limb segments drawn on overlays
    pub const CONNECTIONS: [(Landmark, Landmark); 12] = [
        (Landmark::LeftShoulder, Landmark::RightShoulder),
        (Landmark::LeftShoulder, Landmark::LeftElbow),
        (Landmark::LeftElbow, Landmark::LeftWrist),
        (Landmark::RightShoulder, Landmark::RightElbow),
        (Landmark::RightElbow, Landmark::RightWrist),
        (Landmark::LeftShoulder, Landmark::LeftHip),
        (Landmark::RightShoulder, Landmark::RightHip),
        (Landmark::LeftHip, Landmark::RightHip),
        (Landmark::LeftHip, Landmark::LeftKnee),
        (Landmark::LeftKnee, Landmark::LeftAnkle),
        (Landmark::RightHip, Landmark::RightKnee),
        (Landmark::RightKnee, Landmark::RightAnkle),
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum LandmarkError {
    #[error("expected {expected} landmarks per frame, found {found}")]
    WrongCount { expected: usize, found: usize },
}

/// The full skeleton detected in one frame, in the pose model's normalized units
#[derive(Debug, Clone, PartialEq)]
pub struct FrameLandmarks {
    points: [Vector3<f64>; LANDMARK_COUNT],
}

impl FrameLandmarks {
    pub fn new(points: [Vector3<f64>; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    pub fn from_points(points: &[Vector3<f64>]) -> Result<Self, LandmarkError> {
        let points: [Vector3<f64>; LANDMARK_COUNT] =
            points.try_into().map_err(|_| LandmarkError::WrongCount {
                expected: LANDMARK_COUNT,
                found: points.len(),
            })?;
        Ok(Self { points })
    }

    pub fn from_triples(triples: &[[f64; 3]]) -> Result<Self, LandmarkError> {
        let points: Vec<Vector3<f64>> = triples
            .iter()
            .map(|t| Vector3::new(t[0], t[1], t[2]))
            .collect();
        Self::from_points(&points)
    }

    /// Rebuild a set from a flat `x0, y0, z0, x1, ...` row
    pub fn from_flat(values: &[f64]) -> Result<Self, LandmarkError> {
        if values.len() != LANDMARK_COUNT * 3 {
            return Err(LandmarkError::WrongCount {
                expected: LANDMARK_COUNT,
                found: values.len() / 3,
            });
        }
        let points: Vec<Vector3<f64>> = values
            .chunks_exact(3)
            .map(|c| Vector3::new(c[0], c[1], c[2]))
            .collect();
        Self::from_points(&points)
    }

    pub fn get(&self, landmark: Landmark) -> &Vector3<f64> {
        &self.points[landmark.index()]
    }

    pub fn points(&self) -> &[Vector3<f64>] {
        &self.points
    }

    pub fn to_flat(&self) -> Vec<f64> {
        self.points
            .iter()
            .flat_map(|p| [p.x, p.y, p.z])
            .collect()
    }
}

/// 3D Euclidean distance
pub fn distance(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    (a - b).norm()
}

pub fn midpoint(a: &Vector3<f64>, b: &Vector3<f64>) -> Vector3<f64> {
    (a + b) / 2.0
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Upright figure in normalized units; nose at origin, ankle midpoint one unit below.
    pub(crate) fn standing_figure() -> FrameLandmarks {
        let mut points = [Vector3::zeros(); LANDMARK_COUNT];
        let mut set = |lm: Landmark, x: f64, y: f64, z: f64| {
            points[lm.index()] = Vector3::new(x, y, z);
        };
        set(Landmark::Nose, 0.0, 0.0, 0.0);
        set(Landmark::LeftEye, -0.03, -0.02, 0.0);
        set(Landmark::RightEye, 0.03, -0.02, 0.0);
        set(Landmark::LeftShoulder, -0.2, 0.5, 0.0);
        set(Landmark::RightShoulder, 0.2, 0.5, 0.0);
        set(Landmark::LeftElbow, -0.25, 0.65, 0.0);
        set(Landmark::RightElbow, 0.25, 0.65, 0.0);
        set(Landmark::LeftWrist, -0.27, 0.8, 0.0);
        set(Landmark::RightWrist, 0.27, 0.8, 0.0);
        set(Landmark::LeftHip, -0.1, 0.6, 0.0);
        set(Landmark::RightHip, 0.1, 0.6, 0.0);
        set(Landmark::LeftKnee, -0.1, 0.8, 0.0);
        set(Landmark::RightKnee, 0.1, 0.8, 0.0);
        set(Landmark::LeftAnkle, -0.1, 1.0, 0.0);
        set(Landmark::RightAnkle, 0.1, 1.0, 0.0);
        FrameLandmarks::new(points)
    }

    #[test]
    fn test_landmark_indices() {
        assert_eq!(Landmark::Nose.index(), 0);
        assert_eq!(Landmark::LeftShoulder.index(), 11);
        assert_eq!(Landmark::RightAnkle.index(), 28);
        assert!(Landmark::ALL.iter().all(|lm| lm.index() < LANDMARK_COUNT));
    }

    #[test]
    fn test_from_points_rejects_wrong_count() {
        let points = vec![Vector3::zeros(); 17];
        assert_eq!(
            FrameLandmarks::from_points(&points),
            Err(LandmarkError::WrongCount { expected: 33, found: 17 })
        );
    }

    #[test]
    fn test_flat_layout() {
        let triples: Vec<[f64; 3]> = (0..LANDMARK_COUNT)
            .map(|i| [i as f64, i as f64 + 0.25, -(i as f64)])
            .collect();
        let frame = FrameLandmarks::from_triples(&triples).unwrap();
        let flat = frame.to_flat();

        assert_eq!(flat.len(), 99);
        assert_eq!(&flat[33..36], &[11.0, 11.25, -11.0]);
        assert_eq!(FrameLandmarks::from_flat(&flat).unwrap(), frame);
        assert!(FrameLandmarks::from_flat(&flat[..98]).is_err());
    }

    #[test]
    fn test_distance_symmetry_and_identity() {
        let p = Vector3::new(0.1, -0.4, 0.7);
        let q = Vector3::new(-0.3, 0.2, 0.05);
        assert_eq!(distance(&p, &q), distance(&q, &p));
        assert_eq!(distance(&p, &p), 0.0);
        assert!((distance(&Vector3::zeros(), &Vector3::new(3.0, 4.0, 0.0)) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_midpoint() {
        let m = midpoint(&Vector3::new(-0.1, 1.0, 0.2), &Vector3::new(0.1, 1.0, -0.2));
        assert_eq!(m, Vector3::new(0.0, 1.0, 0.0));
    }
}
