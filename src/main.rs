// src/main.rs

mod config;
mod debug;
mod decision_log;
mod geometry;
mod landmarker;
mod looking_sensor;
mod preprocessing;
mod smoother;
mod timestamp;
mod types;
mod video_processor;

use anyhow::Result;
use decision_log::DecisionLog;
use looking_sensor::LookingSensor;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use types::{Config, Decision};
use video_processor::{VideoProcessor, VideoReader};

fn main() -> Result<()> {
    let config_path =
        std::env::var("LOOKING_SENSOR_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = Config::load(&config_path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("👀 Looking Sensor Starting");
    info!("✓ Configuration loaded from {}", config_path);
    info!(
        "Decision thresholds: look_threshold={:.2}, smooth_alpha={:.2}, padding={:.2}",
        config.sensor.look_threshold, config.sensor.smooth_alpha, config.sensor.padding_pct
    );

    let video_processor = VideoProcessor::new(config.video.clone());

    let mut decision_log = match &config.output.decision_log {
        Some(path) => Some(DecisionLog::create(path)?),
        None => None,
    };

    if let Some(index) = config.video.camera_index {
        let reader = video_processor.open_camera(index)?;
        let source_name = format!("camera{}", index);
        let stats = process_stream(
            reader,
            &source_name,
            &video_processor,
            &config,
            decision_log.as_mut(),
        )?;
        stats.report();
        return Ok(());
    }

    let video_files = video_processor.find_video_files()?;
    if video_files.is_empty() {
        error!("No video files found in {}", config.video.input_dir);
        return Ok(());
    }

    for (idx, video_path) in video_files.iter().enumerate() {
        info!(
            "Processing video {}/{}: {}",
            idx + 1,
            video_files.len(),
            video_path.display()
        );

        let result = video_processor.open_video(video_path).and_then(|reader| {
            process_stream(
                reader,
                &source_stem(video_path),
                &video_processor,
                &config,
                decision_log.as_mut(),
            )
        });

        match result {
            Ok(stats) => stats.report(),
            Err(e) => error!("Failed to process {}: {:#}", video_path.display(), e),
        }
    }

    if let Some(log) = decision_log.as_mut() {
        log.flush()?;
        info!("Decision log: {} entries", log.entries());
    }

    Ok(())
}

fn source_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string())
}

/// Run one stream through its own sensor. The sensor is closed on every exit
/// path (explicitly on success, by `Drop` on error).
fn process_stream(
    mut reader: VideoReader,
    source_name: &str,
    video_processor: &VideoProcessor,
    config: &Config,
    mut decision_log: Option<&mut DecisionLog>,
) -> Result<ProcessingStats> {
    let start_time = Instant::now();

    let mut sensor = LookingSensor::new(config.sensor.clone(), config.landmarker.clone())?;
    let mut writer = video_processor.create_writer(source_name, &reader)?;
    let mut stats = ProcessingStats::new(source_name);

    while let Some(mut frame) = reader.read_frame()? {
        let decision = sensor.process_frame(Some(&mut frame))?;
        stats.record(decision);

        if let Some(log) = decision_log.as_deref_mut() {
            log.record(
                &reader.name,
                stats.total_frames - 1,
                frame.timestamp_ms,
                decision,
            )?;
        }

        if let Some(w) = writer.as_mut() {
            if let Err(e) = video_processor::write_frame(w, &frame) {
                warn!("Failed to write annotated frame: {:#}", e);
            }
        }

        if stats.total_frames % 300 == 0 {
            info!(
                "{}: {} frames ({:.1}%), looking {:.1}% of face frames, avg offset {}, face box {:?}",
                source_name,
                stats.total_frames,
                reader.progress(),
                stats.looking_ratio() * 100.0,
                sensor
                    .moving_avg()
                    .map(|v| format!("{:+.3}", v))
                    .unwrap_or_else(|| "-".to_string()),
                sensor.last_face_box()
            );
        }

        if config.video.max_frames > 0 && stats.total_frames as usize >= config.video.max_frames {
            info!("Reached max_frames={}", config.video.max_frames);
            break;
        }
    }

    sensor.close();

    stats.duration_secs = start_time.elapsed().as_secs_f64();
    Ok(stats)
}

struct ProcessingStats {
    source: String,
    total_frames: u64,
    face_frames: u64,
    looking_frames: u64,
    /// Changes of the looking decision between consecutive face frames
    attention_switches: u64,
    last_looking: Option<bool>,
    duration_secs: f64,
}

impl ProcessingStats {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            total_frames: 0,
            face_frames: 0,
            looking_frames: 0,
            attention_switches: 0,
            last_looking: None,
            duration_secs: 0.0,
        }
    }

    fn record(&mut self, decision: Decision) {
        self.total_frames += 1;

        let Some(looking) = decision.looking else {
            return;
        };
        self.face_frames += 1;
        if looking {
            self.looking_frames += 1;
        }
        if self.last_looking.is_some_and(|prev| prev != looking) {
            self.attention_switches += 1;
        }
        self.last_looking = Some(looking);
    }

    fn looking_ratio(&self) -> f64 {
        if self.face_frames == 0 {
            return 0.0;
        }
        self.looking_frames as f64 / self.face_frames as f64
    }

    fn report(&self) {
        info!("✓ {} processed", self.source);
        info!("  Total frames: {}", self.total_frames);
        info!(
            "  Face present: {} ({:.1}%)",
            self.face_frames,
            100.0 * self.face_frames as f64 / self.total_frames.max(1) as f64
        );
        info!(
            "  Looking: {} ({:.1}% of face frames)",
            self.looking_frames,
            self.looking_ratio() * 100.0
        );
        info!("  Attention switches: {}", self.attention_switches);
        if self.duration_secs > 0.0 {
            info!(
                "  Processing Speed: {:.1} FPS",
                self.total_frames as f64 / self.duration_secs
            );
        }
    }
}
