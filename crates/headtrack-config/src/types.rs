use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Fallback tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Simulated headset parameters.
    pub simulator: SimulatorConfig,
    /// CSV recording.
    pub record: RecordConfig,
    /// Live view.
    pub display: DisplayConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_filter: "headtrack_app=info,headtrack_motion=info,headtrack_record=info".into(),
            simulator: SimulatorConfig::default(),
            record: RecordConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Updates per second while tracking is started.
    pub tick_hz: f64,
    /// Peak yaw of the simulated head sweep, in degrees.
    pub yaw_amplitude_deg: f64,
    pub pitch_amplitude_deg: f64,
    pub roll_amplitude_deg: f64,
    /// Seconds per full yaw sweep.
    pub period_secs: f64,
    /// Report a device error instead of a sample every N ticks.
    pub error_every: Option<u32>,
    /// Delay before the simulated headset reports a connection.
    pub connect_delay_ms: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tick_hz: 25.0,
            yaw_amplitude_deg: 40.0,
            pitch_amplitude_deg: 20.0,
            roll_amplitude_deg: 10.0,
            period_secs: 8.0,
            error_every: None,
            connect_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordMode {
    /// Every write replaces the file with the header and the latest row.
    Overwrite,
    /// Header once, then one row per sample.
    Append,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordConfig {
    pub enabled: bool,
    pub file_name: String,
    pub mode: RecordMode,
    /// Output directory. `None` means the user's documents folder.
    pub directory: Option<PathBuf>,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file_name: "motion.csv".into(),
            mode: RecordMode::Overwrite,
            directory: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Area the center offset is projected onto, in pixels.
    pub width: f64,
    pub height: f64,
    /// How often the live view is redrawn.
    pub refresh_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            refresh_ms: 500,
        }
    }
}
