// src/smoother.rs

/// Exponential moving average over the per-frame nose offset.
///
/// Uninitialized until the first sample, which is taken as-is; every later
/// sample is blended as `alpha * avg + (1 - alpha) * sample`. Frames without
/// a face never reach the smoother, so the last trend survives detection
/// dropouts.
pub struct OffsetSmoother {
    alpha: f32,
    moving_avg: Option<f32>,
}

impl OffsetSmoother {
    /// # Arguments
    /// * `alpha` - decay factor in (0, 1); higher = slower response
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha,
            moving_avg: None,
        }
    }

    /// Feed one offset sample and return the updated average.
    ///
    /// Non-finite samples are dropped so the average always stays finite.
    pub fn update(&mut self, sample: f32) -> Option<f32> {
        if !sample.is_finite() {
            return self.moving_avg;
        }

        let next = match self.moving_avg {
            None => sample,
            Some(prev) => self.alpha * prev + (1.0 - self.alpha) * sample,
        };
        self.moving_avg = Some(next);
        self.moving_avg
    }

    pub fn moving_avg(&self) -> Option<f32> {
        self.moving_avg
    }

    /// Strict: an average exactly at the threshold is not looking
    pub fn is_looking(&self, threshold: f32) -> bool {
        self.moving_avg
            .map(|avg| avg.abs() < threshold)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_passes_through() {
        let mut s = OffsetSmoother::new(0.7);
        assert_eq!(s.moving_avg(), None);
        assert_eq!(s.update(0.42), Some(0.42));
        assert_eq!(s.moving_avg(), Some(0.42));
    }

    #[test]
    fn test_matches_recurrence() {
        let alpha = 0.7f32;
        let samples = [0.1f32, -0.3, 0.25, 0.0, 0.6, -0.05, 0.12];
        let mut s = OffsetSmoother::new(alpha);

        let mut expected: Option<f32> = None;
        for x in samples {
            expected = Some(match expected {
                None => x,
                Some(prev) => alpha * prev + (1.0 - alpha) * x,
            });
            let got = s.update(x).unwrap();
            assert!((got - expected.unwrap()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_single_turn_sample_stays_looking() {
        let mut s = OffsetSmoother::new(0.7);
        s.update(0.0);
        let avg = s.update(0.30).unwrap();
        assert!((avg - 0.09).abs() < 1e-6);
        assert!(s.is_looking(0.20));
    }

    #[test]
    fn test_sustained_turn_flips_to_not_looking() {
        let mut s = OffsetSmoother::new(0.7);
        s.update(0.0);
        s.update(0.30);

        let mut flipped_at = None;
        for i in 0..10 {
            s.update(0.30);
            if !s.is_looking(0.20) && flipped_at.is_none() {
                flipped_at = Some(i);
            }
        }

        // 0.3 * (1 - 0.7^n) crosses 0.2 at n = 4 samples of 0.3
        assert_eq!(flipped_at, Some(2));
        let avg = s.moving_avg().unwrap();
        assert!(avg > 0.29 && avg < 0.30);
    }

    #[test]
    fn test_threshold_boundary_is_not_looking() {
        let mut s = OffsetSmoother::new(0.7);
        s.update(0.25);
        assert!(!s.is_looking(0.25));
        assert!(s.is_looking(0.2500001));

        let mut s = OffsetSmoother::new(0.7);
        s.update(-0.25);
        assert!(!s.is_looking(0.25));
    }

    #[test]
    fn test_uninitialized_is_not_looking() {
        let s = OffsetSmoother::new(0.7);
        assert!(!s.is_looking(0.20));
        assert_eq!(s.moving_avg(), None);
    }

    #[test]
    fn test_non_finite_sample_is_ignored() {
        let mut s = OffsetSmoother::new(0.5);
        assert_eq!(s.update(f32::NAN), None);
        s.update(0.2);
        assert_eq!(s.update(f32::INFINITY), Some(0.2));
        assert_eq!(s.moving_avg(), Some(0.2));
    }
}
