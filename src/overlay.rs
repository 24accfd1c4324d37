// src/overlay.rs - Skeleton overlay snapshots of detected frames
use crate::landmarks::{FrameLandmarks, Landmark};
use anyhow::{Context, Result};
use image::{DynamicImage, Rgb, RgbImage};
use std::path::{Path, PathBuf};

const POINT_COLOR: Rgb<u8> = Rgb([70, 130, 240]);
const BONE_COLOR: Rgb<u8> = Rgb([255, 152, 0]);
const POINT_RADIUS: i64 = 2;

/// Draw all landmarks and the limb connections onto a copy of the frame.
/// Landmark x/y are normalized image coordinates.
pub fn draw_landmarks(frame: &DynamicImage, landmarks: &FrameLandmarks) -> RgbImage {
    let mut canvas = frame.to_rgb8();
    let (w, h) = canvas.dimensions();
    let to_pixel = |lm: &nalgebra::Vector3<f64>| ((lm.x * w as f64) as i64, (lm.y * h as f64) as i64);

    for (a, b) in Landmark::CONNECTIONS.iter() {
        let from = to_pixel(landmarks.get(*a));
        let to = to_pixel(landmarks.get(*b));
        draw_line(&mut canvas, from, to, BONE_COLOR);
    }

    for point in landmarks.points() {
        let (cx, cy) = to_pixel(point);
        for dy in -POINT_RADIUS..=POINT_RADIUS {
            for dx in -POINT_RADIUS..=POINT_RADIUS {
                put_pixel(&mut canvas, cx + dx, cy + dy, POINT_COLOR);
            }
        }
    }

    canvas
}

fn put_pixel(canvas: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < canvas.width() && (y as u32) < canvas.height() {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_line(canvas: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let steps = (to.0 - from.0).abs().max((to.1 - from.1).abs());
    if steps == 0 {
        put_pixel(canvas, from.0, from.1, color);
        return;
    }
    // cap pathological lengths from wild landmark values
    let steps = steps.min(8192);
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let x = from.0 as f64 + (to.0 - from.0) as f64 * t;
        let y = from.1 as f64 + (to.1 - from.1) as f64 * t;
        put_pixel(canvas, x.round() as i64, y.round() as i64, color);
    }
}

/// Writes `overlay_001.png`, `overlay_002.png`, ... into one directory
pub struct OverlayWriter {
    dir: PathBuf,
    count: usize,
}

impl OverlayWriter {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            count: 0,
        }
    }

    pub fn save(&mut self, frame: &DynamicImage, landmarks: &FrameLandmarks) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        self.count += 1;
        let path = self.dir.join(format!("overlay_{:03}.png", self.count));
        draw_landmarks(frame, landmarks)
            .save(&path)
            .with_context(|| format!("Failed to save overlay {}", path.display()))?;
        Ok(path)
    }
}
