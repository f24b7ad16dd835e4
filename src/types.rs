// src/types.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sensor: SensorConfig,
    pub landmarker: LandmarkerConfig,
    pub video: VideoConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Location of the face landmark model asset
    pub model_path: String,
    /// Draw landmarks, box and decision text onto each processed frame
    pub debug: bool,
    /// Bounding box padding as a fraction of face width / height
    pub padding_pct: f32,
    /// |moving_avg| must stay strictly below this to count as looking
    pub look_threshold: f32,
    /// EMA decay factor in (0, 1); higher = smoother, slower
    pub smooth_alpha: f32,
    /// Nose tip position in the landmark model's fixed topology
    pub nose_tip_index: usize,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            model_path: "models/face_landmark.onnx".to_string(),
            debug: false,
            padding_pct: 0.10,
            look_threshold: 0.20,
            smooth_alpha: 0.7,
            nose_tip_index: crate::landmarker::NOSE_TIP_INDEX,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkerConfig {
    pub input_width: usize,
    pub input_height: usize,
    pub input_name: String,
    /// Tensor layout: NCHW when true, NHWC otherwise
    pub nchw: bool,
    pub num_landmarks: usize,
    /// Minimum face presence probability to report a face
    pub presence_threshold: f32,
    /// Region of interest size relative to the previous face extent
    pub roi_scale: f32,
    pub num_threads: usize,
    pub use_cuda: bool,
}

impl Default for LandmarkerConfig {
    fn default() -> Self {
        Self {
            input_width: 192,
            input_height: 192,
            input_name: "input".to_string(),
            nchw: false,
            num_landmarks: 468,
            presence_threshold: 0.5,
            roi_scale: 1.5,
            num_threads: 2,
            use_cuda: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Directory scanned for video files (ignored when `camera_index` is set)
    pub input_dir: String,
    pub camera_index: Option<i32>,
    pub output_dir: String,
    pub save_annotated: bool,
    /// Stop each stream after this many frames (0 = until exhausted)
    pub max_frames: usize,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            input_dir: "videos".to_string(),
            camera_index: None,
            output_dir: "output".to_string(),
            save_annotated: false,
            max_frames: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// JSON-lines file receiving one decision per processed frame
    pub decision_log: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "looking_sensor=info,ort=warn".to_string(),
        }
    }
}

/// Interleaved 8-bit BGR image, row-major, `width * height * 3` bytes
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub timestamp_ms: f64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: usize, height: usize, timestamp_ms: f64) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ms,
        }
    }

    #[cfg(test)]
    pub fn blank(width: usize, height: usize) -> Self {
        Self::new(vec![0u8; width * height * 3], width, height, 0.0)
    }
}

/// Facial keypoint normalized to frame width / height
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Landmarks of one face in the detector's fixed topology order
pub type LandmarkSet = Vec<Landmark>;

/// Padded face box in pixel coordinates, inclusive corners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// Per-frame output of the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub face_present: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub looking: Option<bool>,
}

impl Decision {
    pub fn no_face() -> Self {
        Self {
            face_present: false,
            looking: None,
        }
    }

    pub fn face(looking: bool) -> Self {
        Self {
            face_present: true,
            looking: Some(looking),
        }
    }
}
