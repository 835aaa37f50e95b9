use glam::{DQuat, DVec3};
use std::fmt;

/// Whether the source currently has a device attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

/// Device orientation as Euler angles (radians).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Attitude {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl Attitude {
    pub const ZERO: Self = Self {
        roll: 0.0,
        pitch: 0.0,
        yaw: 0.0,
    };

    pub fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { roll, pitch, yaw }
    }
}

impl fmt::Display for Attitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Direction(roll: {:.2}, pitch: {:.2}, yaw: {:.2})",
            self.roll, self.pitch, self.yaw
        )
    }
}

/// Calibration level reported alongside a magnetometer reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagneticAccuracy {
    Uncalibrated,
    Low,
    Medium,
    High,
    /// A level this crate does not know about.
    Unknown(i32),
}

impl From<i32> for MagneticAccuracy {
    fn from(raw: i32) -> Self {
        match raw {
            -1 => Self::Uncalibrated,
            0 => Self::Low,
            1 => Self::Medium,
            2 => Self::High,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MagneticField {
    /// Field vector in microtesla.
    pub field: DVec3,
    /// Raw accuracy level as reported by the device.
    pub accuracy: i32,
}

impl MagneticField {
    pub fn accuracy_level(&self) -> MagneticAccuracy {
        MagneticAccuracy::from(self.accuracy)
    }
}

/// One raw motion reading as delivered by a [`SampleSource`](crate::SampleSource).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawMotion {
    pub quaternion: DQuat,
    pub attitude: Attitude,
    /// Gravity in the device frame (g).
    pub gravity: DVec3,
    /// Angular velocity (rad/s).
    pub rotation_rate: DVec3,
    /// Acceleration with gravity removed (g).
    pub user_acceleration: DVec3,
    pub magnetic_field: MagneticField,
    /// Compass heading in degrees. Negative when unavailable.
    pub heading: f64,
}

/// Canonical motion record published to observers.
///
/// Connectivity fields are driven by source notifications, everything else
/// is copied from the most recent [`RawMotion`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    pub connection_state: ConnectionState,
    pub tracking_active: bool,
    pub tracking_available: bool,
    /// Stored exactly as reported; not guaranteed to be unit length.
    pub orientation: DQuat,
    pub attitude: Attitude,
    pub gravity: DVec3,
    pub rotation_rate: DVec3,
    pub user_acceleration: DVec3,
    pub heading: f64,
    pub magnetic_field: MagneticField,
}

impl Default for MotionSample {
    fn default() -> Self {
        Self {
            connection_state: ConnectionState::Disconnected,
            tracking_active: false,
            tracking_available: false,
            // All-zero until the first reading arrives, not identity.
            orientation: DQuat::from_xyzw(0.0, 0.0, 0.0, 0.0),
            attitude: Attitude::ZERO,
            gravity: DVec3::ZERO,
            rotation_rate: DVec3::ZERO,
            user_acceleration: DVec3::ZERO,
            heading: 0.0,
            magnetic_field: MagneticField::default(),
        }
    }
}

impl MotionSample {
    pub fn is_connected(&self) -> bool {
        self.connection_state == ConnectionState::Connected
    }

    /// Copy every motion field from `raw`, keeping connectivity as is.
    pub fn with_motion(&self, raw: &RawMotion) -> Self {
        Self {
            connection_state: self.connection_state,
            tracking_active: self.tracking_active,
            tracking_available: self.tracking_available,
            orientation: raw.quaternion,
            attitude: raw.attitude,
            gravity: raw.gravity,
            rotation_rate: raw.rotation_rate,
            user_acceleration: raw.user_acceleration,
            heading: raw.heading,
            magnetic_field: raw.magnetic_field,
        }
    }
}

fn write_xyz(f: &mut fmt::Formatter<'_>, title: &str, v: DVec3) -> fmt::Result {
    writeln!(f, "{title}:")?;
    writeln!(f, "    x: {:.2}", v.x)?;
    writeln!(f, "    y: {:.2}", v.y)?;
    writeln!(f, "    z: {:.2}", v.z)
}

impl fmt::Display for MotionSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Connected: {}", self.is_connected())?;
        writeln!(f, "Tracking Active: {}", self.tracking_active)?;
        writeln!(f, "Tracking Available: {}", self.tracking_available)?;
        writeln!(f, "Quaternion:")?;
        writeln!(f, "    x: {:.2}", self.orientation.x)?;
        writeln!(f, "    y: {:.2}", self.orientation.y)?;
        writeln!(f, "    z: {:.2}", self.orientation.z)?;
        writeln!(f, "    w: {:.2}", self.orientation.w)?;
        writeln!(f, "Attitude:")?;
        writeln!(f, "    pitch: {:.2}", self.attitude.pitch)?;
        writeln!(f, "    roll: {:.2}", self.attitude.roll)?;
        writeln!(f, "    yaw: {:.2}", self.attitude.yaw)?;
        write_xyz(f, "Gravitational Acceleration", self.gravity)?;
        write_xyz(f, "Rotation Rate", self.rotation_rate)?;
        write_xyz(f, "Acceleration", self.user_acceleration)?;
        writeln!(f, "Magnetic Field:")?;
        let m = self.magnetic_field.field;
        writeln!(f, "    field: ({:.2}, {:.2}, {:.2})", m.x, m.y, m.z)?;
        writeln!(f, "    accuracy: {:?}", self.magnetic_field.accuracy_level())?;
        writeln!(f, "Heading:")?;
        write!(f, "    {:.2}", self.heading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_orientation_is_all_zero() {
        let sample = MotionSample::default();
        assert_eq!(sample.orientation.x, 0.0);
        assert_eq!(sample.orientation.y, 0.0);
        assert_eq!(sample.orientation.z, 0.0);
        assert_eq!(sample.orientation.w, 0.0);
        assert_eq!(sample.connection_state, ConnectionState::Disconnected);
    }

    #[test]
    fn with_motion_keeps_connectivity() {
        let mut sample = MotionSample::default();
        sample.connection_state = ConnectionState::Connected;
        sample.tracking_available = true;

        let raw = RawMotion {
            quaternion: DQuat::from_xyzw(0.0, 0.0, 0.0, 2.0),
            attitude: Attitude::new(0.1, 0.2, 0.3),
            gravity: DVec3::new(0.0, 0.0, -1.0),
            rotation_rate: DVec3::X,
            user_acceleration: DVec3::Y,
            magnetic_field: MagneticField {
                field: DVec3::new(10.0, 20.0, 30.0),
                accuracy: 2,
            },
            heading: -1.0,
        };

        let next = sample.with_motion(&raw);
        assert!(next.is_connected());
        assert!(next.tracking_available);
        assert!(!next.tracking_active);
        // Non-unit quaternions pass through untouched.
        assert_eq!(next.orientation.w, 2.0);
        assert_eq!(next.attitude, raw.attitude);
        assert_eq!(next.heading, -1.0);
        assert_eq!(next.magnetic_field.accuracy_level(), MagneticAccuracy::High);
    }

    #[test]
    fn accuracy_levels() {
        assert_eq!(MagneticAccuracy::from(-1), MagneticAccuracy::Uncalibrated);
        assert_eq!(MagneticAccuracy::from(0), MagneticAccuracy::Low);
        assert_eq!(MagneticAccuracy::from(1), MagneticAccuracy::Medium);
        assert_eq!(MagneticAccuracy::from(7), MagneticAccuracy::Unknown(7));
    }

    #[test]
    fn attitude_display_uses_two_decimals() {
        let a = Attitude::new(0.123, -1.0, 3.14159);
        assert_eq!(
            a.to_string(),
            "Direction(roll: 0.12, pitch: -1.00, yaw: 3.14)"
        );
    }

    #[test]
    fn sample_display_lists_every_section() {
        let text = MotionSample::default().to_string();
        assert!(text.starts_with("Connected: false\n"));
        assert!(text.contains("Quaternion:\n    x: 0.00"));
        assert!(text.contains("Rotation Rate:"));
        assert!(text.contains("accuracy: Low"));
        assert!(text.ends_with("Heading:\n    0.00"));
    }
}
