// src/debug.rs

use crate::geometry::FaceGeometry;
use crate::types::{Frame, Landmark, PixelBox};
use anyhow::{bail, Result};
use opencv::{core, imgproc, prelude::*};

/// Everything the overlay needs from one processed frame
pub struct Overlay<'a> {
    pub landmarks: &'a [Landmark],
    pub geometry: &'a FaceGeometry,
    pub face_box: PixelBox,
    pub looking: bool,
    pub moving_avg: f32,
}

/// Copy a BGR frame into an owned 3-channel Mat
pub fn frame_to_mat(frame: &Frame) -> Result<Mat> {
    let expected = frame.width * frame.height * 3;
    if frame.data.len() != expected {
        bail!(
            "Frame buffer holds {} bytes, expected {}",
            frame.data.len(),
            expected
        );
    }

    let mat = Mat::from_slice(frame.data.as_slice())?;
    let mat = mat.reshape(3, frame.height as i32)?;
    Ok(mat.try_clone()?)
}

/// Draw landmarks, padded box, nose / center markers and the decision text
/// into the frame buffer.
pub fn draw_overlay(frame: &mut Frame, overlay: &Overlay) -> Result<()> {
    let mut output = frame_to_mat(frame)?;
    let (w, h) = (frame.width as f32, frame.height as f32);
    let to_px = |x: f32, y: f32| core::Point::new((x * w) as i32, (y * h) as i32);

    for lm in overlay.landmarks {
        imgproc::circle(
            &mut output,
            to_px(lm.x, lm.y),
            1,
            core::Scalar::new(0.0, 255.0, 0.0, 0.0), // Green
            -1,
            imgproc::LINE_8,
            0,
        )?;
    }

    let b = overlay.face_box;
    imgproc::rectangle_points(
        &mut output,
        core::Point::new(b.x1, b.y1),
        core::Point::new(b.x2, b.y2),
        core::Scalar::new(255.0, 255.0, 0.0, 0.0), // Cyan
        1,
        imgproc::LINE_8,
        0,
    )?;

    let nose = overlay.geometry.nose;
    imgproc::circle(
        &mut output,
        to_px(nose.x, nose.y),
        4,
        core::Scalar::new(0.0, 0.0, 255.0, 0.0), // Red
        -1,
        imgproc::LINE_8,
        0,
    )?;
    imgproc::circle(
        &mut output,
        to_px(overlay.geometry.center_x(), nose.y),
        4,
        core::Scalar::new(255.0, 0.0, 0.0, 0.0), // Blue
        -1,
        imgproc::LINE_8,
        0,
    )?;

    imgproc::put_text(
        &mut output,
        &format!(
            "looking={} offset={:.3}",
            overlay.looking, overlay.moving_avg
        ),
        core::Point::new(10, 25),
        imgproc::FONT_HERSHEY_SIMPLEX,
        0.7,
        core::Scalar::new(255.0, 255.0, 255.0, 0.0),
        2,
        imgproc::LINE_8,
        false,
    )?;

    frame.data.copy_from_slice(output.data_bytes()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_marks_frame() {
        let mut frame = Frame::blank(120, 90);
        let landmarks = vec![
            Landmark::new(0.3, 0.5),
            Landmark::new(0.55, 0.55),
            Landmark::new(0.7, 0.5),
            Landmark::new(0.5, 0.2),
            Landmark::new(0.5, 0.8),
        ];
        let geometry = FaceGeometry::derive(&landmarks, 1).unwrap();
        let overlay = Overlay {
            landmarks: &landmarks,
            geometry: &geometry,
            face_box: geometry.padded_box(0.1, 120, 90),
            looking: true,
            moving_avg: 0.125,
        };

        draw_overlay(&mut frame, &overlay).unwrap();

        assert_eq!(frame.data.len(), 120 * 90 * 3);
        assert!(frame.data.iter().any(|&v| v != 0));

        // Nose marker is red in BGR
        let (nx, ny) = ((0.55 * 120.0) as usize, (0.55 * 90.0) as usize);
        let idx = (ny * 120 + nx) * 3;
        assert_eq!(&frame.data[idx..idx + 3], &[0, 0, 255]);
    }

    #[test]
    fn test_box_covers_inclusive_corners() {
        let mut frame = Frame::blank(120, 90);
        let landmarks = vec![
            Landmark::new(0.3, 0.5),
            Landmark::new(0.5, 0.55),
            Landmark::new(0.7, 0.5),
            Landmark::new(0.5, 0.2),
            Landmark::new(0.5, 0.8),
        ];
        let geometry = FaceGeometry::derive(&landmarks, 1).unwrap();
        let face_box = geometry.padded_box(0.1, 120, 90);
        let overlay = Overlay {
            landmarks: &landmarks,
            geometry: &geometry,
            face_box,
            looking: true,
            moving_avg: 0.0,
        };

        draw_overlay(&mut frame, &overlay).unwrap();

        let pixel = |x: i32, y: i32| {
            let idx = (y as usize * 120 + x as usize) * 3;
            frame.data[idx..idx + 3].to_vec()
        };
        // Cyan in BGR
        assert_eq!(pixel(face_box.x2, face_box.y2), vec![255, 255, 0]);
        assert_eq!(pixel(face_box.x1, face_box.y2), vec![255, 255, 0]);
        assert_eq!(pixel(face_box.x2 + 1, face_box.y2), vec![0, 0, 0]);
    }

    #[test]
    fn test_mismatched_buffer_is_rejected() {
        let frame = Frame::new(vec![0u8; 7], 4, 4, 0.0);
        assert!(frame_to_mat(&frame).is_err());
    }
}
