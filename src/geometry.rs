// src/geometry.rs
//
// Face extent and horizontal nose offset from one frame's landmarks.

use crate::types::{Landmark, PixelBox};

/// Faces narrower than this (normalized units) are treated as undetected
pub const MIN_FACE_WIDTH: f32 = 1e-6;

/// Min / max landmark coordinates, normalized
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceExtent {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl FaceExtent {
    pub fn from_landmarks(landmarks: &[Landmark]) -> Option<Self> {
        let first = landmarks.first()?;
        let mut extent = Self {
            left: first.x,
            right: first.x,
            top: first.y,
            bottom: first.y,
        };

        for lm in &landmarks[1..] {
            extent.left = extent.left.min(lm.x);
            extent.right = extent.right.max(lm.x);
            extent.top = extent.top.min(lm.y);
            extent.bottom = extent.bottom.max(lm.y);
        }

        Some(extent)
    }

    pub fn width(&self) -> f32 {
        (self.right - self.left).abs()
    }

    pub fn height(&self) -> f32 {
        (self.bottom - self.top).abs()
    }

    pub fn center_x(&self) -> f32 {
        (self.left + self.right) / 2.0
    }
}

/// Per-frame geometry derived from a landmark set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceGeometry {
    pub extent: FaceExtent,
    pub nose: Landmark,
    /// (nose.x - center_x) / face width; sign gives turn direction
    pub offset_norm: f32,
}

impl FaceGeometry {
    /// Returns `None` when the frame cannot yield a usable offset: empty set,
    /// nose index outside the set, non-finite coordinates or a face narrower
    /// than [`MIN_FACE_WIDTH`].
    pub fn derive(landmarks: &[Landmark], nose_tip_index: usize) -> Option<Self> {
        if landmarks
            .iter()
            .any(|lm| !lm.x.is_finite() || !lm.y.is_finite())
        {
            return None;
        }

        let extent = FaceExtent::from_landmarks(landmarks)?;
        let nose = *landmarks.get(nose_tip_index)?;

        let width = extent.width();
        if width < MIN_FACE_WIDTH {
            return None;
        }

        let offset_norm = (nose.x - extent.center_x()) / width;

        Some(Self {
            extent,
            nose,
            offset_norm,
        })
    }

    pub fn width(&self) -> f32 {
        self.extent.width()
    }

    pub fn height(&self) -> f32 {
        self.extent.height()
    }

    pub fn center_x(&self) -> f32 {
        self.extent.center_x()
    }

    /// Face box padded by `padding_pct` of the face size, in pixels, clamped
    /// to the frame.
    pub fn padded_box(&self, padding_pct: f32, width: usize, height: usize) -> PixelBox {
        let pad_x = padding_pct * self.width();
        let pad_y = padding_pct * self.height();
        let (w, h) = (width as f32, height as f32);
        let max_x = (width.max(1) - 1) as f32;
        let max_y = (height.max(1) - 1) as f32;

        PixelBox {
            x1: ((self.extent.left - pad_x) * w).clamp(0.0, max_x) as i32,
            x2: ((self.extent.right + pad_x) * w).clamp(0.0, max_x) as i32,
            y1: ((self.extent.top - pad_y) * h).clamp(0.0, max_y) as i32,
            y2: ((self.extent.bottom + pad_y) * h).clamp(0.0, max_y) as i32,
        }
    }
}
