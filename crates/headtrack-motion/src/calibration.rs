use crate::types::{Attitude, MotionSample};

/// Running `[min, max]` bounds of one angle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Envelope {
    pub min: f64,
    pub max: f64,
}

impl Envelope {
    /// Widen to include `value`. Never narrows.
    pub fn include(&mut self, value: f64) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// Tracks a user-chosen "center" pose and how far the head has moved from it.
///
/// Pitch and yaw are enveloped over the whole session; roll is only kept
/// for display. The offset fractions are relative to the envelope width, so
/// they are non-finite until both edges of an axis differ.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CalibrationTracker {
    /// Last attitude passed to `on_sample`.
    current: Attitude,
    /// Pose marked as center.
    reference: Attitude,
    pitch_range: Envelope,
    yaw_range: Envelope,
}

impl CalibrationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_sample(&mut self, sample: &MotionSample) {
        self.current = sample.attitude;
        self.pitch_range.include(sample.attitude.pitch);
        self.yaw_range.include(sample.attitude.yaw);
    }

    /// Mark the current attitude as center. Leaves the envelopes alone.
    pub fn set_reference(&mut self) {
        self.reference = self.current;
        tracing::info!(reference = %self.reference, "Center reference set");
    }

    pub fn current(&self) -> Attitude {
        self.current
    }

    pub fn reference(&self) -> Attitude {
        self.reference
    }

    pub fn pitch_range(&self) -> Envelope {
        self.pitch_range
    }

    pub fn yaw_range(&self) -> Envelope {
        self.yaw_range
    }

    /// Horizontal offset from center as a fraction of the yaw envelope.
    pub fn offset_x_fraction(&self) -> f64 {
        (self.reference.yaw - self.current.yaw) / self.yaw_range.width()
    }

    /// Vertical offset from center as a fraction of the pitch envelope.
    pub fn offset_y_fraction(&self) -> f64 {
        (self.reference.pitch - self.current.pitch) / self.pitch_range.width()
    }

    /// Offset scaled to a `width` x `height` area, or `None` while either
    /// fraction is non-finite.
    pub fn cursor_offset(&self, width: f64, height: f64) -> Option<(f64, f64)> {
        let x = self.offset_x_fraction();
        let y = self.offset_y_fraction();
        if x.is_finite() && y.is_finite() {
            Some((x * width, y * height))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn sample(pitch: f64, yaw: f64) -> MotionSample {
        MotionSample {
            attitude: Attitude::new(0.0, pitch, yaw),
            ..MotionSample::default()
        }
    }

    #[test]
    fn envelope_widens_from_zero() {
        let mut tracker = CalibrationTracker::new();

        tracker.on_sample(&sample(0.5, -0.3));
        assert_eq!(tracker.pitch_range(), Envelope { min: 0.0, max: 0.5 });
        assert_eq!(tracker.yaw_range(), Envelope { min: -0.3, max: 0.0 });

        tracker.on_sample(&sample(-0.1, 0.2));
        assert_eq!(tracker.pitch_range(), Envelope { min: -0.1, max: 0.5 });
        assert_eq!(tracker.yaw_range(), Envelope { min: -0.3, max: 0.2 });
    }

    #[test]
    fn envelope_contains_every_observed_angle() {
        let mut tracker = CalibrationTracker::new();
        let mut seen = Vec::new();

        // Deterministic wandering signal covering both signs.
        for i in 0..500 {
            let t = i as f64 * 0.37;
            let pitch = (t * 1.3).sin() * 0.8 + (t * 0.11).cos() * 0.2;
            let yaw = (t * 0.7).cos() * 1.5 - 0.4;
            tracker.on_sample(&sample(pitch, yaw));
            seen.push((pitch, yaw));

            let p = tracker.pitch_range();
            let y = tracker.yaw_range();
            for &(sp, sy) in &seen {
                assert!(p.min <= sp && sp <= p.max);
                assert!(y.min <= sy && sy <= y.max);
            }
        }
    }

    #[test]
    fn roll_is_not_enveloped() {
        let mut tracker = CalibrationTracker::new();
        tracker.on_sample(&MotionSample {
            attitude: Attitude::new(2.0, 0.0, 0.0),
            ..MotionSample::default()
        });
        assert_eq!(tracker.current().roll, 2.0);
        assert_eq!(tracker.pitch_range().width(), 0.0);
        assert_eq!(tracker.yaw_range().width(), 0.0);
    }

    #[test]
    fn offset_is_zero_right_after_set_reference() {
        let mut tracker = CalibrationTracker::new();
        tracker.on_sample(&sample(0.5, -0.3));
        tracker.on_sample(&sample(-0.1, 0.2));

        tracker.set_reference();

        assert!(tracker.offset_x_fraction().abs() < EPS);
        assert!(tracker.offset_y_fraction().abs() < EPS);
    }

    #[test]
    fn offset_relative_to_reference() {
        let mut tracker = CalibrationTracker::new();
        tracker.on_sample(&sample(0.5, -0.3));
        tracker.on_sample(&sample(-0.1, 0.2));
        tracker.set_reference();

        tracker.on_sample(&sample(0.0, 0.0));

        assert!((tracker.offset_x_fraction() - 0.4).abs() < EPS);
        // (-0.1 - 0.0) / 0.6
        assert!((tracker.offset_y_fraction() + 1.0 / 6.0).abs() < EPS);
    }

    #[test]
    fn set_reference_keeps_envelope() {
        let mut tracker = CalibrationTracker::new();
        tracker.on_sample(&sample(0.5, -0.3));
        tracker.on_sample(&sample(0.1, 0.1));
        tracker.set_reference();

        assert_eq!(tracker.reference(), Attitude::new(0.0, 0.1, 0.1));
        assert_eq!(tracker.pitch_range(), Envelope { min: 0.0, max: 0.5 });
        assert_eq!(tracker.yaw_range(), Envelope { min: -0.3, max: 0.1 });
    }

    #[test]
    fn zero_width_envelope_is_non_finite() {
        let mut tracker = CalibrationTracker::new();
        assert!(!tracker.offset_x_fraction().is_finite());
        assert!(!tracker.offset_y_fraction().is_finite());
        assert_eq!(tracker.cursor_offset(800.0, 600.0), None);

        // Pitch varies, yaw does not.
        tracker.on_sample(&sample(0.4, 0.0));
        assert!(tracker.offset_y_fraction().is_finite());
        assert!(!tracker.offset_x_fraction().is_finite());
        assert_eq!(tracker.cursor_offset(800.0, 600.0), None);
    }

    #[test]
    fn cursor_offset_scales_fractions() {
        let mut tracker = CalibrationTracker::new();
        tracker.on_sample(&sample(0.5, -0.3));
        tracker.on_sample(&sample(-0.1, 0.2));
        tracker.set_reference();
        tracker.on_sample(&sample(0.0, 0.0));

        let (x, y) = tracker.cursor_offset(1000.0, 600.0).unwrap();
        assert!((x - 400.0).abs() < 1e-9);
        assert!((y + 100.0).abs() < 1e-9);
    }
}
