use crate::source::{EventSink, SampleSource, SourceError, SourceEvent};
use crate::types::{Attitude, MagneticField, RawMotion};
use glam::{DQuat, DVec3, EulerRot};
use std::f64::consts::TAU;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Earth field used for the simulated magnetometer (microtesla, world frame).
const EARTH_FIELD: DVec3 = DVec3::new(22.0, 0.0, -42.0);

/// Accepted update rates in Hz.
pub const MIN_TICK_HZ: f64 = 0.1;
pub const MAX_TICK_HZ: f64 = 1000.0;
const DEFAULT_TICK_HZ: f64 = 25.0;

/// Parameters of the simulated head sweep.
#[derive(Debug, Clone)]
pub struct SimulatorSettings {
    /// Update rate while started.
    pub tick_hz: f64,
    /// Peak angles in radians.
    pub yaw_amplitude: f64,
    pub pitch_amplitude: f64,
    pub roll_amplitude: f64,
    /// Duration of one full yaw sweep.
    pub period: Duration,
    /// Replace every Nth tick with an error.
    pub error_every: Option<u32>,
    /// Delay before the device reports itself connected.
    pub connect_delay: Duration,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            tick_hz: DEFAULT_TICK_HZ,
            yaw_amplitude: 40f64.to_radians(),
            pitch_amplitude: 20f64.to_radians(),
            roll_amplitude: 10f64.to_radians(),
            period: Duration::from_secs(8),
            error_every: None,
            connect_delay: Duration::from_millis(200),
        }
    }
}

impl SimulatorSettings {
    /// Never zero: `tick_hz` is clamped to `MIN_TICK_HZ..=MAX_TICK_HZ`,
    /// and a non-finite rate falls back to the default.
    pub fn tick_interval(&self) -> Duration {
        let hz = if self.tick_hz.is_finite() {
            self.tick_hz.clamp(MIN_TICK_HZ, MAX_TICK_HZ)
        } else {
            DEFAULT_TICK_HZ
        };
        Duration::from_secs_f64(1.0 / hz)
    }

    /// Motion reading `t` seconds into the sweep.
    pub fn motion_at(&self, t: f64) -> RawMotion {
        let omega = TAU / self.period.as_secs_f64().max(f64::EPSILON);

        // Yaw sweeps once per period, pitch nods twice, roll lags a third.
        let yaw = self.yaw_amplitude * (omega * t).sin();
        let pitch = self.pitch_amplitude * (2.0 * omega * t).sin();
        let roll = self.roll_amplitude * (omega * t + TAU / 6.0).sin();

        let yaw_rate = self.yaw_amplitude * omega * (omega * t).cos();
        let pitch_rate = self.pitch_amplitude * 2.0 * omega * (2.0 * omega * t).cos();
        let roll_rate = self.roll_amplitude * omega * (omega * t + TAU / 6.0).cos();

        // Yaw about z, pitch about x, roll about y.
        let quaternion = DQuat::from_euler(EulerRot::ZXY, yaw, pitch, roll);
        let to_device = quaternion.inverse();

        RawMotion {
            quaternion,
            attitude: Attitude::new(roll, pitch, yaw),
            gravity: to_device * DVec3::NEG_Z,
            rotation_rate: DVec3::new(pitch_rate, roll_rate, yaw_rate),
            user_acceleration: DVec3::ZERO,
            magnetic_field: MagneticField {
                field: to_device * EARTH_FIELD,
                accuracy: 2,
            },
            heading: compass_heading(yaw),
        }
    }
}

/// Compass degrees in `[0, 360)` for a yaw angle (counter-clockwise radians).
fn compass_heading(yaw: f64) -> f64 {
    let heading = (-yaw.to_degrees()).rem_euclid(360.0);
    // rem_euclid rounds tiny negatives up to exactly 360.
    if heading >= 360.0 {
        0.0
    } else {
        heading
    }
}

/// A [`SampleSource`] that fakes a connected headset.
///
/// Needs a running tokio runtime once attached.
pub struct SimulatedSource {
    settings: SimulatorSettings,
    sink: Option<EventSink>,
    status_task: Option<JoinHandle<()>>,
    update_task: Option<JoinHandle<()>>,
}

impl SimulatedSource {
    pub fn new(settings: SimulatorSettings) -> Self {
        Self {
            settings,
            sink: None,
            status_task: None,
            update_task: None,
        }
    }
}

impl SampleSource for SimulatedSource {
    fn attach(&mut self, sink: EventSink) {
        let delay = self.settings.connect_delay;
        let status_sink = sink.clone();
        self.status_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::info!("Simulated headset connected");
            status_sink.send(SourceEvent::Connected);
            status_sink.send(SourceEvent::TrackingAvailable(true));
        }));
        self.sink = Some(sink);
    }

    fn start_updates(&mut self) -> Result<(), SourceError> {
        let sink = self.sink.clone().ok_or(SourceError::DeviceUnreachable)?;
        if self.update_task.is_some() {
            return Ok(());
        }

        let settings = self.settings.clone();
        self.update_task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(settings.tick_interval());
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let started = Instant::now();
            let mut tick: u64 = 0;

            sink.send(SourceEvent::TrackingActive(true));
            loop {
                interval.tick().await;
                tick += 1;

                let dropped = settings
                    .error_every
                    .is_some_and(|n| n > 0 && tick % u64::from(n) == 0);
                let delivered = if dropped {
                    sink.error(SourceError::Device("simulated dropout".into()))
                } else {
                    sink.motion(settings.motion_at(started.elapsed().as_secs_f64()))
                };
                if !delivered {
                    tracing::debug!("Simulated source sink closed");
                    break;
                }
            }
        }));
        Ok(())
    }

    fn stop_updates(&mut self) {
        if let Some(task) = self.update_task.take() {
            task.abort();
            if let Some(sink) = &self.sink {
                sink.send(SourceEvent::TrackingActive(false));
            }
        }
    }
}

impl Drop for SimulatedSource {
    fn drop(&mut self) {
        if let Some(task) = self.status_task.take() {
            task.abort();
        }
        if let Some(task) = self.update_task.take() {
            task.abort();
        }
    }
}
