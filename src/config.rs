use crate::types::{Config, SensorConfig};
use anyhow::{bail, Context, Result};
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.sensor;
        s.validate()?;

        let l = &self.landmarker;
        if l.input_width == 0 || l.input_height == 0 {
            bail!(
                "landmarker input size must be non-zero, got {}x{}",
                l.input_width,
                l.input_height
            );
        }
        if l.num_landmarks == 0 {
            bail!("landmarker.num_landmarks must be non-zero");
        }
        if s.nose_tip_index >= l.num_landmarks {
            bail!(
                "sensor.nose_tip_index {} is outside the {} landmark topology",
                s.nose_tip_index,
                l.num_landmarks
            );
        }
        if !(0.0..=1.0).contains(&l.presence_threshold) {
            bail!(
                "landmarker.presence_threshold must be in [0, 1], got {}",
                l.presence_threshold
            );
        }
        if !l.roi_scale.is_finite() || l.roi_scale < 1.0 {
            bail!("landmarker.roi_scale must be >= 1, got {}", l.roi_scale);
        }
        Ok(())
    }
}

impl SensorConfig {
    /// Checked again by `LookingSensor` construction; the EMA only stays
    /// bounded for alpha in (0, 1).
    pub fn validate(&self) -> Result<()> {
        if !(self.smooth_alpha > 0.0 && self.smooth_alpha < 1.0) {
            bail!(
                "sensor.smooth_alpha must be in (0, 1), got {}",
                self.smooth_alpha
            );
        }
        if !self.look_threshold.is_finite() || self.look_threshold <= 0.0 {
            bail!(
                "sensor.look_threshold must be positive, got {}",
                self.look_threshold
            );
        }
        if !self.padding_pct.is_finite() || self.padding_pct < 0.0 {
            bail!("sensor.padding_pct must be >= 0, got {}", self.padding_pct);
        }
        Ok(())
    }
}
