// src/video.rs - Frame sources: live camera or a directory of still images
use anyhow::{Context, Result};
use image::DynamicImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

pub trait FrameSource {
    /// `None` when no frame could be read; capture stops there
    fn read_frame(&mut self) -> Option<DynamicImage>;
}

pub enum VideoSource {
    Camera(Camera),
    Images(ImageSequence),
}

impl VideoSource {
    pub fn new_camera(index: u32) -> Result<Self> {
        debug!("Opening camera index {}", index);

        let format = CameraFormat::new(Resolution::new(640, 480), FrameFormat::MJPEG, 30);
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

        let camera = Camera::new(CameraIndex::Index(index), requested)
            .map_err(|e| anyhow::anyhow!("Failed to open camera {}: {}", index, e))?;

        info!("Camera {} opened: {}", index, camera.info().human_name());
        Ok(VideoSource::Camera(camera))
    }

    pub fn new_images(dir: impl AsRef<Path>) -> Result<Self> {
        let sequence = ImageSequence::new(&dir)?;
        if sequence.is_empty() {
            warn!("No images in {}; capture will end immediately", dir.as_ref().display());
        }
        Ok(VideoSource::Images(sequence))
    }
}

impl FrameSource for VideoSource {
    fn read_frame(&mut self) -> Option<DynamicImage> {
        match self {
            VideoSource::Camera(cam) => {
                if !cam.is_stream_open() {
                    if let Err(e) = cam.open_stream() {
                        warn!("Failed to open camera stream: {}", e);
                        return None;
                    }
                }

                let frame = match cam.frame() {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("Failed to capture frame: {}", e);
                        return None;
                    }
                };

                match frame.decode_image::<RgbFormat>() {
                    Ok(decoded) => Some(DynamicImage::ImageRgb8(decoded)),
                    Err(e) => {
                        warn!("Failed to decode frame: {}", e);
                        None
                    }
                }
            }
            VideoSource::Images(sequence) => sequence.read_frame(),
        }
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        if let VideoSource::Camera(cam) = self {
            if cam.is_stream_open() {
                let _ = cam.stop_stream();
            }
        }
    }
}

/// Still images from one directory, read in file-name order
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    current: usize,
}

impl ImageSequence {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();

        for entry in std::fs::read_dir(dir).with_context(|| format!("Cannot read {}", dir.display()))? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if path.is_file() && is_image {
                paths.push(path);
            }
        }
        paths.sort();

        info!("Found {} image(s) in {}", paths.len(), dir.display());
        Ok(Self { paths, current: 0 })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FrameSource for ImageSequence {
    fn read_frame(&mut self) -> Option<DynamicImage> {
        let path = self.paths.get(self.current)?;
        self.current += 1;

        match image::open(path) {
            Ok(img) => Some(img),
            Err(e) => {
                warn!("Failed to load {}: {}", path.display(), e);
                None
            }
        }
    }
}
