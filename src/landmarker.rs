// src/landmarker.rs

use crate::geometry::FaceExtent;
use crate::preprocessing::{preprocess, Roi};
use crate::types::{Frame, Landmark, LandmarkSet, LandmarkerConfig};
use anyhow::{bail, Context, Result};
use ort::{
    execution_providers::CUDAExecutionProvider,
    session::{builder::GraphOptimizationLevel, Session},
};
use tracing::{debug, info};

/// Index of the nose tip in the 468-point face mesh topology.
///
/// Fixed by the landmark model, not a tuning knob. A model with a different
/// topology needs a different value here (or `sensor.nose_tip_index`).
pub const NOSE_TIP_INDEX: usize = 1;

/// Face landmark capability consumed by the sensor.
///
/// Works in video mode: `timestamp_ms` must strictly increase call over call.
pub trait LandmarkDetector {
    /// Landmarks of at most one face, normalized to the frame
    fn detect(&mut self, frame: &Frame, timestamp_ms: i64) -> Result<Option<LandmarkSet>>;

    /// Release model resources. Calling it again is a no-op.
    fn close(&mut self);
}

/// Face mesh ONNX model with region-of-interest tracking between frames
pub struct OnnxFaceLandmarker {
    session: Option<Session>,
    config: LandmarkerConfig,
    roi: Option<Roi>,
    last_timestamp_ms: Option<i64>,
}

impl OnnxFaceLandmarker {
    pub fn new(model_path: &str, config: LandmarkerConfig) -> Result<Self> {
        info!("Loading face landmark model: {}", model_path);

        let mut session_builder = Session::builder()?;
        if config.use_cuda {
            info!("Enabling CUDA execution provider");
            session_builder = session_builder
                .with_execution_providers([CUDAExecutionProvider::default()
                    .with_device_id(0)
                    .build()])?;
        }

        let session = session_builder
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.num_threads)?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load face landmark model {}", model_path))?;

        info!(
            "✓ Face landmarker ready ({}x{} input, {} landmarks)",
            config.input_width, config.input_height, config.num_landmarks
        );

        Ok(Self {
            session: Some(session),
            config,
            roi: None,
            last_timestamp_ms: None,
        })
    }
}

impl LandmarkDetector for OnnxFaceLandmarker {
    fn detect(&mut self, frame: &Frame, timestamp_ms: i64) -> Result<Option<LandmarkSet>> {
        if self.session.is_none() {
            bail!("Face landmarker is closed");
        }
        check_timestamp(self.last_timestamp_ms, timestamp_ms)?;
        self.last_timestamp_ms = Some(timestamp_ms);

        let roi = self
            .roi
            .unwrap_or_else(|| Roi::centered_square(frame.width, frame.height));

        let (in_w, in_h) = (self.config.input_width, self.config.input_height);
        let input = preprocess(frame, &roi, in_w, in_h, self.config.nchw)?;

        let shape = if self.config.nchw {
            [1, 3, in_h, in_w]
        } else {
            [1, in_h, in_w, 3]
        };
        let input_value =
            ort::value::Value::from_array((shape.as_slice(), input.into_boxed_slice()))?;

        let Some(session) = self.session.as_mut() else {
            bail!("Face landmarker is closed");
        };

        let (raw_landmarks, presence_logit) = {
            let outputs =
                session.run(ort::inputs![self.config.input_name.as_str() => input_value])?;

            let (_, coords) = outputs[0].try_extract_tensor::<f32>()?;
            let coords = coords.to_vec();

            let logit = if outputs.len() > 1 {
                let (_, score) = outputs[1].try_extract_tensor::<f32>()?;
                score.first().copied()
            } else {
                None
            };
            (coords, logit)
        };

        if let Some(logit) = presence_logit {
            let presence = sigmoid(logit);
            if presence < self.config.presence_threshold {
                debug!("Face presence {:.2} below threshold, dropping ROI", presence);
                self.roi = None;
                return Ok(None);
            }
        }

        let landmarks = decode_landmarks(
            &raw_landmarks,
            self.config.num_landmarks,
            &roi,
            (in_w, in_h),
            (frame.width, frame.height),
        )?;

        self.roi = next_roi(&landmarks, frame.width, frame.height, self.config.roi_scale);

        Ok(Some(landmarks))
    }

    fn close(&mut self) {
        if self.session.take().is_some() {
            info!("Closing face landmarker");
        }
        self.roi = None;
    }
}

fn check_timestamp(last: Option<i64>, timestamp_ms: i64) -> Result<()> {
    if let Some(last) = last {
        if timestamp_ms <= last {
            bail!(
                "Timestamp {} ms is not greater than previous {} ms",
                timestamp_ms,
                last
            );
        }
    }
    Ok(())
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Model output is `num_landmarks` (x, y, z) triples in input pixel space
fn decode_landmarks(
    raw: &[f32],
    num_landmarks: usize,
    roi: &Roi,
    input_size: (usize, usize),
    frame_size: (usize, usize),
) -> Result<LandmarkSet> {
    if raw.len() < num_landmarks * 3 {
        bail!(
            "Landmark output has {} values, expected {}",
            raw.len(),
            num_landmarks * 3
        );
    }

    Ok(raw
        .chunks_exact(3)
        .take(num_landmarks)
        .map(|p| {
            let (x, y) = roi.to_frame_normalized(
                p[0],
                p[1],
                input_size.0,
                input_size.1,
                frame_size.0,
                frame_size.1,
            );
            Landmark::new(x, y)
        })
        .collect())
}

/// Square crop around this frame's face, enlarged by `scale`, for the next frame
fn next_roi(landmarks: &[Landmark], frame_w: usize, frame_h: usize, scale: f32) -> Option<Roi> {
    let extent = FaceExtent::from_landmarks(landmarks)?;
    let (w, h) = (frame_w as f32, frame_h as f32);

    let side = (extent.width() * w).max(extent.height() * h) * scale;
    if !side.is_finite() || side < 1.0 {
        return None;
    }

    let cx = extent.center_x() * w;
    let cy = (extent.top + extent.bottom) / 2.0 * h;

    Some(Roi {
        x: cx - side / 2.0,
        y: cy - side / 2.0,
        width: side,
        height: side,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_must_increase() {
        assert!(check_timestamp(None, 0).is_ok());
        assert!(check_timestamp(Some(10), 11).is_ok());
        assert!(check_timestamp(Some(10), 10).is_err());
        assert!(check_timestamp(Some(10), 3).is_err());
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(8.0) > 0.99);
        assert!(sigmoid(-8.0) < 0.01);
    }

    #[test]
    fn test_decode_maps_through_roi() {
        let roi = Roi {
            x: 100.0,
            y: 0.0,
            width: 200.0,
            height: 200.0,
        };
        // Two points: input center and input origin
        let raw = [96.0, 96.0, 0.0, 0.0, 0.0, -3.0];
        let lms = decode_landmarks(&raw, 2, &roi, (192, 192), (400, 200)).unwrap();

        assert_eq!(lms.len(), 2);
        assert!((lms[0].x - 0.5).abs() < 1e-6);
        assert!((lms[0].y - 0.5).abs() < 1e-6);
        assert!((lms[1].x - 0.25).abs() < 1e-6);
        assert!(lms[1].y.abs() < 1e-6);
    }

    #[test]
    fn test_decode_rejects_short_output() {
        let roi = Roi::centered_square(100, 100);
        assert!(decode_landmarks(&[0.0; 5], 2, &roi, (192, 192), (100, 100)).is_err());
    }

    #[test]
    fn test_next_roi_is_scaled_square_around_face() {
        let lms = vec![
            Landmark::new(0.4, 0.3),
            Landmark::new(0.6, 0.3),
            Landmark::new(0.5, 0.7),
        ];
        // 0.2 * 400 = 80 px wide, 0.4 * 200 = 80 px tall
        let roi = next_roi(&lms, 400, 200, 1.5).unwrap();
        assert!((roi.width - 120.0).abs() < 1e-3);
        assert_eq!(roi.width, roi.height);
        assert!((roi.x - 140.0).abs() < 1e-3);
        assert!((roi.y - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_next_roi_none_for_collapsed_face() {
        let lms = vec![Landmark::new(0.5, 0.5), Landmark::new(0.5, 0.5)];
        assert!(next_roi(&lms, 640, 480, 1.5).is_none());
        assert!(next_roi(&[], 640, 480, 1.5).is_none());
    }
}
