// src/capture.rs - Frame sampling loop: read, detect, keep, pace
use crate::landmarks::FrameLandmarks;
use crate::mediapipe_bridge::LandmarkOracle;
use crate::overlay::OverlayWriter;
use crate::video::FrameSource;
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Target number of detections reached
    Completed,
    /// The frame source had nothing more to give
    SourceExhausted,
    /// The user interrupted capture
    Cancelled,
}

#[derive(Debug)]
pub struct CaptureOutcome {
    pub frames: Vec<FrameLandmarks>,
    pub stop: StopReason,
    pub frames_read: usize,
}

/// Ctrl-C sets the returned flag; a second Ctrl-C terminates the process.
pub fn install_interrupt_handler() -> Result<Arc<AtomicBool>> {
    use signal_hook::consts::SIGINT;

    let flag = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register_conditional_shutdown(SIGINT, 1, Arc::clone(&flag))?;
    signal_hook::flag::register(SIGINT, Arc::clone(&flag))?;
    Ok(flag)
}

pub struct FrameSampler {
    target_frames: usize,
    frame_delay: Duration,
    cancel: Arc<AtomicBool>,
    overlays: Option<OverlayWriter>,
}

impl FrameSampler {
    pub fn new(target_frames: usize, frame_delay: Duration, cancel: Arc<AtomicBool>) -> Self {
        Self {
            target_frames,
            frame_delay,
            cancel,
            overlays: None,
        }
    }

    pub fn with_overlays(mut self, writer: OverlayWriter) -> Self {
        self.overlays = Some(writer);
        self
    }

    /// Collect up to `target_frames` landmark sets. Frames without a detected
    /// person are skipped; a failed read or a cancel ends capture early with
    /// whatever was collected. Oracle errors are returned as-is unless capture
    /// was already cancelled.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        oracle: &mut dyn LandmarkOracle,
    ) -> Result<CaptureOutcome> {
        let mut frames = Vec::with_capacity(self.target_frames);
        let mut frames_read = 0;

        let stop = loop {
            if frames.len() >= self.target_frames {
                break StopReason::Completed;
            }
            if self.cancel.load(Ordering::Relaxed) {
                info!("Capture cancelled after {} detection(s)", frames.len());
                break StopReason::Cancelled;
            }

            let frame = match source.read_frame() {
                Some(frame) => frame,
                None => {
                    info!("No more frames after {} read(s)", frames_read);
                    break StopReason::SourceExhausted;
                }
            };
            frames_read += 1;

            let detection = match oracle.detect(&frame) {
                Ok(detection) => detection,
                // the helper shares our terminal and may die from the same Ctrl-C
                Err(e) if self.cancel.load(Ordering::Relaxed) => {
                    info!("Capture cancelled after {} detection(s): {}", frames.len(), e);
                    break StopReason::Cancelled;
                }
                Err(e) => return Err(e.into()),
            };

            match detection {
                Some(landmarks) => {
                    if let Some(writer) = self.overlays.as_mut() {
                        let path = writer.save(&frame, &landmarks)?;
                        debug!("overlay saved to {}", path.display());
                    }
                    frames.push(landmarks);
                    println!("Captured frame {}/{}", frames.len(), self.target_frames);
                }
                None => debug!("frame {}: no person detected", frames_read),
            }

            if !self.frame_delay.is_zero() {
                std::thread::sleep(self.frame_delay);
            }
        };

        Ok(CaptureOutcome {
            frames,
            stop,
            frames_read,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::landmarks::tests::standing_figure;
    use crate::mediapipe_bridge::BridgeError;
    use image::{DynamicImage, RgbImage};
    use std::collections::VecDeque;

    /// Hands out `remaining` blank frames, then reports a failed read
    pub(crate) struct BlankFrames {
        pub(crate) remaining: usize,
        pub(crate) cancel_after: Option<(usize, Arc<AtomicBool>)>,
        read: usize,
    }

    impl BlankFrames {
        pub(crate) fn new(remaining: usize) -> Self {
            Self {
                remaining,
                cancel_after: None,
                read: 0,
            }
        }
    }

    impl FrameSource for BlankFrames {
        fn read_frame(&mut self) -> Option<DynamicImage> {
            if self.remaining == 0 {
                return None;
            }
            self.remaining -= 1;
            self.read += 1;
            if let Some((after, flag)) = &self.cancel_after {
                if self.read >= *after {
                    flag.store(true, Ordering::Relaxed);
                }
            }
            Some(DynamicImage::ImageRgb8(RgbImage::new(8, 8)))
        }
    }

    /// Replays a fixed script of detections; `true` = person found
    pub(crate) struct ScriptedOracle {
        pub(crate) script: VecDeque<Result<bool, String>>,
        pub(crate) calls: usize,
    }

    impl ScriptedOracle {
        pub(crate) fn new(script: impl IntoIterator<Item = bool>) -> Self {
            Self {
                script: script.into_iter().map(Ok).collect(),
                calls: 0,
            }
        }

        pub(crate) fn never() -> Self {
            Self::new(std::iter::empty())
        }
    }

    impl LandmarkOracle for ScriptedOracle {
        fn detect(&mut self, _frame: &DynamicImage) -> Result<Option<FrameLandmarks>, BridgeError> {
            self.calls += 1;
            match self.script.pop_front() {
                Some(Ok(true)) => Ok(Some(standing_figure())),
                Some(Ok(false)) | None => Ok(None),
                Some(Err(message)) => Err(BridgeError::Reported(message)),
            }
        }
    }

    fn sampler(target: usize) -> FrameSampler {
        FrameSampler::new(target, Duration::ZERO, Arc::new(AtomicBool::new(false)))
    }

    #[test]
    fn test_stops_at_target() {
        let mut source = BlankFrames::new(100);
        let mut oracle = ScriptedOracle::new(vec![true; 20]);

        let outcome = sampler(10).run(&mut source, &mut oracle).unwrap();
        assert_eq!(outcome.stop, StopReason::Completed);
        assert_eq!(outcome.frames.len(), 10);
        assert_eq!(outcome.frames_read, 10);
        assert_eq!(oracle.calls, 10);
    }

    #[test]
    fn test_skips_frames_without_detection() {
        let mut source = BlankFrames::new(100);
        let mut oracle = ScriptedOracle::new([false, true, false, false, true, true]);

        let outcome = sampler(3).run(&mut source, &mut oracle).unwrap();
        assert_eq!(outcome.stop, StopReason::Completed);
        assert_eq!(outcome.frames.len(), 3);
        assert_eq!(outcome.frames_read, 6);
    }

    #[test]
    fn test_failed_read_keeps_partial_results() {
        let mut source = BlankFrames::new(4);
        let mut oracle = ScriptedOracle::new([true, false, true, true]);

        let outcome = sampler(10).run(&mut source, &mut oracle).unwrap();
        assert_eq!(outcome.stop, StopReason::SourceExhausted);
        assert_eq!(outcome.frames.len(), 3);
    }

    #[test]
    fn test_no_detection_at_all() {
        let mut source = BlankFrames::new(5);
        let mut oracle = ScriptedOracle::never();

        let outcome = sampler(10).run(&mut source, &mut oracle).unwrap();
        assert!(outcome.frames.is_empty());
        assert_eq!(outcome.frames_read, 5);
    }

    #[test]
    fn test_cancel_is_polled_each_iteration() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut source = BlankFrames::new(100);
        source.cancel_after = Some((2, Arc::clone(&flag)));
        let mut oracle = ScriptedOracle::new(vec![true; 100]);

        let mut sampler = FrameSampler::new(10, Duration::ZERO, flag);
        let outcome = sampler.run(&mut source, &mut oracle).unwrap();
        assert_eq!(outcome.stop, StopReason::Cancelled);
        // the frame in flight when the flag was set is still processed
        assert_eq!(outcome.frames.len(), 2);
    }

    #[test]
    fn test_oracle_error_propagates() {
        let mut source = BlankFrames::new(10);
        let mut oracle = ScriptedOracle::new([true]);
        oracle.script.push_back(Err("model crashed".to_string()));

        let err = sampler(5).run(&mut source, &mut oracle).unwrap_err();
        match err.downcast_ref::<BridgeError>() {
            Some(BridgeError::Reported(msg)) => assert_eq!(msg, "model crashed"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    /// Detects a person a few times, then dies the way the helper does on Ctrl-C
    struct InterruptedOracle {
        detections_left: usize,
        cancel: Arc<AtomicBool>,
    }

    impl LandmarkOracle for InterruptedOracle {
        fn detect(&mut self, _frame: &DynamicImage) -> Result<Option<FrameLandmarks>, BridgeError> {
            if self.detections_left > 0 {
                self.detections_left -= 1;
                return Ok(Some(standing_figure()));
            }
            self.cancel.store(true, Ordering::Relaxed);
            Err(BridgeError::HelperExited)
        }
    }

    #[test]
    fn test_helper_exit_after_interrupt_keeps_frames() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut source = BlankFrames::new(100);
        let mut oracle = InterruptedOracle {
            detections_left: 2,
            cancel: Arc::clone(&flag),
        };

        let mut sampler = FrameSampler::new(10, Duration::ZERO, flag);
        let outcome = sampler.run(&mut source, &mut oracle).unwrap();
        assert_eq!(outcome.stop, StopReason::Cancelled);
        assert_eq!(outcome.frames.len(), 2);
        assert_eq!(outcome.frames_read, 3);
    }

    #[test]
    fn test_delay_applies_after_every_read() {
        let delay = Duration::from_millis(20);
        let mut source = BlankFrames::new(3);
        let mut oracle = ScriptedOracle::new([true, false, true]);

        let mut sampler = FrameSampler::new(10, delay, Arc::new(AtomicBool::new(false)));
        let started = std::time::Instant::now();
        let outcome = sampler.run(&mut source, &mut oracle).unwrap();

        assert_eq!(outcome.stop, StopReason::SourceExhausted);
        assert_eq!(outcome.frames_read, 3);
        assert_eq!(outcome.frames.len(), 2);
        assert!(started.elapsed() >= delay * 3);
    }
}
