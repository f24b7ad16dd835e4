// src/preprocessing.rs

use crate::types::Frame;
use anyhow::{bail, Result};

/// Crop region in source pixel coordinates; may extend past the frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roi {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Roi {
    /// Largest centred square that fits inside the frame
    pub fn centered_square(frame_w: usize, frame_h: usize) -> Self {
        let side = frame_w.min(frame_h) as f32;
        Self {
            x: (frame_w as f32 - side) / 2.0,
            y: (frame_h as f32 - side) / 2.0,
            width: side,
            height: side,
        }
    }

    /// Map a point in model input space back to frame-normalized coordinates
    pub fn to_frame_normalized(
        &self,
        px: f32,
        py: f32,
        input_w: usize,
        input_h: usize,
        frame_w: usize,
        frame_h: usize,
    ) -> (f32, f32) {
        let fx = self.x + px / input_w as f32 * self.width;
        let fy = self.y + py / input_h as f32 * self.height;
        (fx / frame_w as f32, fy / frame_h as f32)
    }
}

/// Crop `roi` out of a BGR frame, resize it bilinearly to `dst_w x dst_h`,
/// swap to RGB and scale to [0, 1].
///
/// Output is NCHW when `nchw` is set, NHWC otherwise. Samples outside the
/// frame are black.
pub fn preprocess(
    frame: &Frame,
    roi: &Roi,
    dst_w: usize,
    dst_h: usize,
    nchw: bool,
) -> Result<Vec<f32>> {
    if frame.width == 0 || frame.height == 0 {
        bail!("Empty frame {}x{}", frame.width, frame.height);
    }
    if frame.data.len() < frame.width * frame.height * 3 {
        bail!(
            "Frame buffer holds {} bytes, expected {} for {}x{} BGR",
            frame.data.len(),
            frame.width * frame.height * 3,
            frame.width,
            frame.height
        );
    }

    let mut output = vec![0.0f32; 3 * dst_w * dst_h];
    let x_ratio = roi.width / dst_w as f32;
    let y_ratio = roi.height / dst_h as f32;

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let sx = roi.x + (dx as f32 + 0.5) * x_ratio - 0.5;
            let sy = roi.y + (dy as f32 + 0.5) * y_ratio - 0.5;
            let bgr = sample_bilinear(frame, sx, sy);

            // BGR -> RGB
            let rgb = [bgr[2], bgr[1], bgr[0]];
            for (c, value) in rgb.iter().enumerate() {
                let idx = if nchw {
                    c * dst_h * dst_w + dy * dst_w + dx
                } else {
                    (dy * dst_w + dx) * 3 + c
                };
                output[idx] = value / 255.0;
            }
        }
    }

    Ok(output)
}

fn sample_bilinear(frame: &Frame, sx: f32, sy: f32) -> [f32; 3] {
    let (w, h) = (frame.width as f32, frame.height as f32);
    if sx < -0.5 || sy < -0.5 || sx > w - 0.5 || sy > h - 0.5 {
        return [0.0; 3];
    }

    let sx = sx.clamp(0.0, w - 1.0);
    let sy = sy.clamp(0.0, h - 1.0);
    let sx0 = sx.floor() as usize;
    let sy0 = sy.floor() as usize;
    let sx1 = (sx0 + 1).min(frame.width - 1);
    let sy1 = (sy0 + 1).min(frame.height - 1);
    let fx = sx - sx0 as f32;
    let fy = sy - sy0 as f32;

    let px = |x: usize, y: usize, c: usize| frame.data[(y * frame.width + x) * 3 + c] as f32;

    let mut out = [0.0f32; 3];
    for (c, slot) in out.iter_mut().enumerate() {
        *slot = px(sx0, sy0, c) * (1.0 - fx) * (1.0 - fy)
            + px(sx1, sy0, c) * fx * (1.0 - fy)
            + px(sx0, sy1, c) * (1.0 - fx) * fy
            + px(sx1, sy1, c) * fx * fy;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: usize, height: usize, bgr: [u8; 3]) -> Frame {
        let data = (0..width * height).flat_map(|_| bgr).collect();
        Frame::new(data, width, height, 0.0)
    }

    #[test]
    fn test_centered_square_roi() {
        let roi = Roi::centered_square(640, 480);
        assert_eq!(roi.x, 80.0);
        assert_eq!(roi.y, 0.0);
        assert_eq!(roi.width, 480.0);
        assert_eq!(roi.height, 480.0);
    }

    #[test]
    fn test_output_is_rgb_normalized_nhwc() {
        let frame = solid(32, 32, [255, 0, 51]);
        let roi = Roi::centered_square(32, 32);
        let out = preprocess(&frame, &roi, 8, 8, false).unwrap();

        assert_eq!(out.len(), 8 * 8 * 3);
        assert!((out[0] - 0.2).abs() < 1e-4); // R
        assert!(out[1].abs() < 1e-4); // G
        assert!((out[2] - 1.0).abs() < 1e-4); // B
    }

    #[test]
    fn test_nchw_layout_groups_channels() {
        let frame = solid(16, 16, [0, 255, 0]);
        let roi = Roi::centered_square(16, 16);
        let out = preprocess(&frame, &roi, 4, 4, true).unwrap();

        let plane = 4 * 4;
        assert!(out[..plane].iter().all(|v| v.abs() < 1e-4));
        assert!(out[plane..2 * plane].iter().all(|v| (v - 1.0).abs() < 1e-4));
        assert!(out[2 * plane..].iter().all(|v| v.abs() < 1e-4));
    }

    #[test]
    fn test_roi_outside_frame_is_black() {
        let frame = solid(16, 16, [200, 200, 200]);
        let roi = Roi {
            x: 100.0,
            y: 100.0,
            width: 16.0,
            height: 16.0,
        };
        let out = preprocess(&frame, &roi, 4, 4, false).unwrap();
        assert!(out.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_roi_maps_back_to_frame() {
        let roi = Roi {
            x: 100.0,
            y: 50.0,
            width: 200.0,
            height: 200.0,
        };
        let (x, y) = roi.to_frame_normalized(96.0, 96.0, 192, 192, 400, 300);
        assert!((x - 0.5).abs() < 1e-6);
        assert!((y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let frame = Frame::new(vec![0u8; 10], 16, 16, 0.0);
        let roi = Roi::centered_square(16, 16);
        assert!(preprocess(&frame, &roi, 4, 4, false).is_err());
    }
}
