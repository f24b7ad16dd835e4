// src/looking_sensor.rs
//
// Per-frame "is the face turned toward the camera" decision:
//
//   Frame → LandmarkDetector → FaceGeometry (offset_norm, padded box)
//         → OffsetSmoother (EMA) → |moving_avg| < look_threshold
//
// One sensor per video stream. Calls must be serialized: the EMA state and
// the timestamp sequencer are mutated in place.

use crate::debug::{self, Overlay};
use crate::geometry::FaceGeometry;
use crate::landmarker::{LandmarkDetector, OnnxFaceLandmarker};
use crate::smoother::OffsetSmoother;
use crate::timestamp::TimestampSequencer;
use crate::types::{Decision, Frame, LandmarkerConfig, PixelBox, SensorConfig};
use anyhow::{bail, Result};
use tracing::{debug, info, warn};

pub struct LookingSensor<D: LandmarkDetector = OnnxFaceLandmarker> {
    config: SensorConfig,
    detector: D,
    smoother: OffsetSmoother,
    timestamps: TimestampSequencer,
    last_face_box: Option<PixelBox>,
    closed: bool,
}

impl LookingSensor<OnnxFaceLandmarker> {
    /// Load the landmark model. Fails if the model cannot be loaded.
    pub fn new(config: SensorConfig, landmarker: LandmarkerConfig) -> Result<Self> {
        info!(
            "Initializing looking sensor: model={}, debug={}, padding={:.2}, threshold={:.2}, alpha={:.2}",
            config.model_path,
            config.debug,
            config.padding_pct,
            config.look_threshold,
            config.smooth_alpha
        );

        config.validate()?;
        let detector = OnnxFaceLandmarker::new(&config.model_path, landmarker)?;
        Self::with_detector(config, detector)
    }
}

impl<D: LandmarkDetector> LookingSensor<D> {
    pub fn with_detector(config: SensorConfig, detector: D) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            smoother: OffsetSmoother::new(config.smooth_alpha),
            config,
            detector,
            timestamps: TimestampSequencer::new(),
            last_face_box: None,
            closed: false,
        })
    }

    /// Process one frame. `None` means no frame was captured this cycle.
    ///
    /// In debug mode the overlay is drawn into `frame` in place.
    pub fn process_frame(&mut self, frame: Option<&mut Frame>) -> Result<Decision> {
        if self.closed {
            bail!("Looking sensor is closed");
        }

        let Some(frame) = frame else {
            debug!("No frame");
            return Ok(Decision::no_face());
        };

        let timestamp_ms = self.timestamps.next_timestamp_ms();
        let Some(landmarks) = self.detector.detect(frame, timestamp_ms)? else {
            debug!("t={}ms: no face", timestamp_ms);
            return Ok(Decision::no_face());
        };

        let Some(geometry) = FaceGeometry::derive(&landmarks, self.config.nose_tip_index) else {
            debug!(
                "t={}ms: degenerate face geometry ({} landmarks), skipping",
                timestamp_ms,
                landmarks.len()
            );
            return Ok(Decision::no_face());
        };

        let moving_avg = self
            .smoother
            .update(geometry.offset_norm)
            .unwrap_or(geometry.offset_norm);
        let looking = self.smoother.is_looking(self.config.look_threshold);

        let face_box = geometry.padded_box(self.config.padding_pct, frame.width, frame.height);
        self.last_face_box = Some(face_box);

        debug!(
            "t={}ms: offset={:+.3} avg={:+.3} looking={}",
            timestamp_ms, geometry.offset_norm, moving_avg, looking
        );

        if self.config.debug {
            let overlay = Overlay {
                landmarks: &landmarks,
                geometry: &geometry,
                face_box,
                looking,
                moving_avg,
            };
            if let Err(e) = debug::draw_overlay(frame, &overlay) {
                warn!("Failed to draw debug overlay: {:#}", e);
            }
        }

        Ok(Decision::face(looking))
    }

    /// Smoothed nose offset; `None` until the first face is seen
    pub fn moving_avg(&self) -> Option<f32> {
        self.smoother.moving_avg()
    }

    /// Padded pixel box of the most recent face, for downstream cropping
    pub fn last_face_box(&self) -> Option<PixelBox> {
        self.last_face_box
    }

    /// Release the landmark detector. Safe to call more than once.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.detector.close();
    }
}

impl<D: LandmarkDetector> Drop for LookingSensor<D> {
    fn drop(&mut self) {
        self.close();
    }
}
