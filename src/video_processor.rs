// src/video_processor.rs

use crate::debug::frame_to_mat;
use crate::types::{Frame, VideoConfig};
use anyhow::{bail, Context, Result};
use opencv::{
    core::{self, Mat},
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureTraitConst, VideoWriter},
};
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "avi", "mov", "mkv"];

pub struct VideoProcessor {
    config: VideoConfig,
}

impl VideoProcessor {
    pub fn new(config: VideoConfig) -> Self {
        Self { config }
    }

    pub fn find_video_files(&self) -> Result<Vec<PathBuf>> {
        let mut videos: Vec<PathBuf> = WalkDir::new(&self.config.input_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| is_video_file(p))
            .collect();
        videos.sort();

        info!(
            "Found {} video files in {}",
            videos.len(),
            self.config.input_dir
        );
        Ok(videos)
    }

    pub fn open_video(&self, path: &Path) -> Result<VideoReader> {
        info!("Opening video: {}", path.display());

        let path_str = path
            .to_str()
            .with_context(|| format!("Non UTF-8 video path {}", path.display()))?;
        let cap = VideoCapture::from_file(path_str, videoio::CAP_ANY)?;
        VideoReader::from_capture(cap, path.display().to_string())
    }

    pub fn open_camera(&self, index: i32) -> Result<VideoReader> {
        info!("Opening camera {}", index);
        let cap = VideoCapture::new(index, videoio::CAP_ANY)?;
        VideoReader::from_capture(cap, format!("camera:{}", index))
    }

    pub fn create_writer(
        &self,
        source_name: &str,
        reader: &VideoReader,
    ) -> Result<Option<VideoWriter>> {
        if !self.config.save_annotated {
            return Ok(None);
        }

        std::fs::create_dir_all(&self.config.output_dir)
            .with_context(|| format!("Failed to create {}", self.config.output_dir))?;

        let output_path =
            PathBuf::from(&self.config.output_dir).join(format!("{}_looking.mp4", source_name));
        info!("Output video: {}", output_path.display());

        let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
        let writer = VideoWriter::new(
            &output_path.to_string_lossy(),
            fourcc,
            reader.fps,
            core::Size::new(reader.width, reader.height),
            true,
        )?;

        Ok(Some(writer))
    }
}

fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

pub struct VideoReader {
    pub cap: VideoCapture,
    pub name: String,
    pub fps: f64,
    pub total_frames: i32,
    pub current_frame: i32,
    pub width: i32,
    pub height: i32,
}

impl VideoReader {
    fn from_capture(cap: VideoCapture, name: String) -> Result<Self> {
        if !cap.is_opened()? {
            bail!("Failed to open {}", name);
        }

        let fps = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FPS)?;
        // Cameras often report 0 fps
        let fps = if fps > 0.0 { fps } else { 30.0 };
        let total_frames = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_COUNT)? as i32;
        let width = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_WIDTH)? as i32;
        let height = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_HEIGHT)? as i32;

        info!(
            "Video properties: {}x{} @ {:.1} FPS, {} frames",
            width, height, fps, total_frames
        );

        Ok(Self {
            cap,
            name,
            fps,
            total_frames,
            current_frame: 0,
            width,
            height,
        })
    }

    /// Next BGR frame, or `None` once the stream is exhausted
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        use opencv::videoio::VideoCaptureTrait;

        let mut mat = Mat::default();

        if !VideoCaptureTrait::read(&mut self.cap, &mut mat)? || mat.empty() {
            return Ok(None);
        }

        self.current_frame += 1;
        let timestamp_ms = (self.current_frame as f64 / self.fps) * 1000.0;

        let mat = if mat.is_continuous() {
            mat
        } else {
            mat.try_clone()?
        };
        let data = mat.data_bytes()?.to_vec();

        Ok(Some(Frame::new(
            data,
            mat.cols() as usize,
            mat.rows() as usize,
            timestamp_ms,
        )))
    }

    pub fn progress(&self) -> f32 {
        if self.total_frames <= 0 {
            return 0.0;
        }
        (self.current_frame as f32 / self.total_frames as f32) * 100.0
    }
}

pub fn write_frame(writer: &mut VideoWriter, frame: &Frame) -> Result<()> {
    use opencv::videoio::VideoWriterTrait;

    let mat = frame_to_mat(frame)?;
    writer.write(&mat)?;
    Ok(())
}
