use anyhow::Result;
use headtrack_config::{DisplayConfig, RecordConfig, SimulatorConfig};
use headtrack_motion::{
    MotionEngine, MotionSample, MotionSnapshot, SimulatedSource, SimulatorSettings, MAX_TICK_HZ,
    MIN_TICK_HZ,
};
use headtrack_record::{MotionRecorder, RecordWriter};
use std::io::BufRead;
use std::ops::RangeInclusive;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Commands read from stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Stop,
    Center,
    Status,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "start" | "g" => Some(Self::Start),
            "stop" | "x" => Some(Self::Stop),
            "center" | "c" => Some(Self::Center),
            "status" | "s" => Some(Self::Status),
            "quit" | "q" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

const PERIOD_SECS: RangeInclusive<f64> = 0.1..=3600.0;
const AMPLITUDE_DEG: RangeInclusive<f64> = -180.0..=180.0;

/// Clamp `value` into `range`; non-finite values take `fallback`.
fn bounded(setting: &str, value: f64, fallback: f64, range: RangeInclusive<f64>) -> f64 {
    let fixed = if value.is_finite() {
        value.clamp(*range.start(), *range.end())
    } else {
        fallback
    };
    if fixed != value {
        warn!(setting, value, fixed, "Simulator setting out of range, adjusted");
    }
    fixed
}

fn simulator_settings(config: &SimulatorConfig) -> SimulatorSettings {
    let defaults = SimulatorConfig::default();
    let amplitude = |setting: &str, value: f64, fallback: f64| {
        bounded(setting, value, fallback, AMPLITUDE_DEG).to_radians()
    };
    SimulatorSettings {
        tick_hz: bounded("tick_hz", config.tick_hz, defaults.tick_hz, MIN_TICK_HZ..=MAX_TICK_HZ),
        yaw_amplitude: amplitude(
            "yaw_amplitude_deg",
            config.yaw_amplitude_deg,
            defaults.yaw_amplitude_deg,
        ),
        pitch_amplitude: amplitude(
            "pitch_amplitude_deg",
            config.pitch_amplitude_deg,
            defaults.pitch_amplitude_deg,
        ),
        roll_amplitude: amplitude(
            "roll_amplitude_deg",
            config.roll_amplitude_deg,
            defaults.roll_amplitude_deg,
        ),
        period: Duration::from_secs_f64(bounded(
            "period_secs",
            config.period_secs,
            defaults.period_secs,
            PERIOD_SECS,
        )),
        error_every: config.error_every,
        connect_delay: Duration::from_millis(config.connect_delay_ms),
    }
}

fn open_recorder(config: &RecordConfig) -> Result<RecordWriter> {
    let dir = match &config.directory {
        Some(dir) => dir.clone(),
        None => headtrack_config::default_record_dir()?,
    };
    std::fs::create_dir_all(&dir)?;
    let recorder = MotionRecorder::new(dir.join(&config.file_name), config.mode)?;
    Ok(headtrack_record::spawn_writer(recorder))
}

/// Queue `sample` for recording. Once the writer thread has gone, warn once
/// and stop recording.
fn record_sample(recorder: &mut Option<RecordWriter>, sample: &MotionSample) {
    let Some(writer) = recorder else { return };
    if !writer.record(sample) {
        warn!("Motion recorder stopped, recording disabled");
        *recorder = None;
    }
}

/// Forward stdin lines from a plain thread so shutdown never waits on a blocking read.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// One-line live view.
fn status_line(snapshot: &MotionSnapshot, display: &DisplayConfig) -> String {
    let sample = &snapshot.sample;
    let calibration = &snapshot.calibration;
    let offset = match calibration.cursor_offset(display.width, display.height) {
        Some((x, y)) => format!("({x:+.0}, {y:+.0}) px"),
        None => "--".to_owned(),
    };
    let mut line = format!(
        "[{}] pitch {:+.2} roll {:+.2} yaw {:+.2} | center {} | offset {}",
        if sample.is_connected() { "connected" } else { "no device" },
        sample.attitude.pitch,
        sample.attitude.roll,
        sample.attitude.yaw,
        calibration.reference(),
        offset,
    );
    if !snapshot.last_error.is_empty() {
        line.push_str(&format!(" | error: {}", snapshot.last_error));
    }
    line
}

/// Full dump: the live line, every sample field, then calibration state.
fn status_report(snapshot: &MotionSnapshot, display: &DisplayConfig) -> String {
    let calibration = &snapshot.calibration;
    let pitch = calibration.pitch_range();
    let yaw = calibration.yaw_range();
    let last_error = if snapshot.last_error.is_empty() {
        "none"
    } else {
        snapshot.last_error.as_str()
    };
    format!(
        "{}\n{}\ncenter: {}\nminPitch: {:.2}\nmaxPitch: {:.2}\nminYaw: {:.2}\nmaxYaw: {:.2}\n\
         last error: {}",
        status_line(snapshot, display),
        snapshot.sample,
        calibration.reference(),
        pitch.min,
        pitch.max,
        yaw.min,
        yaw.max,
        last_error,
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    // Config first: it carries the fallback log filter.
    let loaded = headtrack_config::load_config();
    let config = loaded.as_ref().cloned().unwrap_or_default();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .init();

    if let Err(e) = &loaded {
        warn!(?e, "Failed to load config, using defaults");
    }
    info!("headtrack starting");

    let source = SimulatedSource::new(simulator_settings(&config.simulator));
    let mut engine = MotionEngine::new(source);
    if let Err(e) = engine.start() {
        warn!(?e, "Motion updates unavailable");
    }

    let mut recorder = if config.record.enabled {
        match open_recorder(&config.record) {
            Ok(writer) => Some(writer),
            Err(e) => {
                warn!(?e, "Recording disabled");
                None
            }
        }
    } else {
        None
    };

    println!("commands: start | stop | center | status | quit");

    let mut updates = engine.subscribe();
    let mut lines = spawn_stdin_reader();
    let refresh_every = Duration::from_millis(config.display.refresh_ms.max(16));
    let mut refresh = tokio::time::interval(refresh_every);
    let mut last_recorded = None;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    error!("Motion engine stopped unexpectedly");
                    break;
                }
                let sample = updates.borrow_and_update().sample;
                if last_recorded != Some(sample.attitude) {
                    last_recorded = Some(sample.attitude);
                    record_sample(&mut recorder, &sample);
                }
            }
            _ = refresh.tick() => {
                println!("{}\n", status_report(&engine.snapshot(), &config.display));
            }
            Some(line) = lines.recv() => {
                match Command::parse(&line) {
                    Some(Command::Start) => {
                        if let Err(e) = engine.start() {
                            warn!(?e, "Failed to start motion updates");
                        }
                    }
                    Some(Command::Stop) => engine.stop(),
                    Some(Command::Center) => {
                        if let Err(e) = engine.set_reference() {
                            warn!(?e, "Failed to set center");
                        }
                    }
                    Some(Command::Status) => {
                        println!("{}", status_line(&engine.snapshot(), &config.display));
                    }
                    Some(Command::Quit) => break,
                    None if line.trim().is_empty() => {}
                    None => println!("unknown command: {}", line.trim()),
                }
            }
        }
    }

    engine.stop();
    if let Some(writer) = recorder {
        writer.finish()?;
    }
    if let Err(e) = headtrack_config::save_config(&config) {
        error!(?e, "Failed to save config");
    }
    info!("headtrack stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use headtrack_config::RecordMode;
    use headtrack_motion::{Attitude, CalibrationTracker};

    fn snapshot_with(tracker: CalibrationTracker, last_error: &str) -> MotionSnapshot {
        MotionSnapshot {
            sample: MotionSample::default(),
            last_error: last_error.to_owned(),
            calibration: tracker,
        }
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse(" Center \n"), Some(Command::Center));
        assert_eq!(Command::parse("c"), Some(Command::Center));
        assert_eq!(Command::parse("start"), Some(Command::Start));
        assert_eq!(Command::parse("x"), Some(Command::Stop));
        assert_eq!(Command::parse("exit"), Some(Command::Quit));
        assert_eq!(Command::parse("jump"), None);
    }

    #[test]
    fn status_line_hides_undefined_offset() {
        let snapshot = snapshot_with(CalibrationTracker::new(), "");
        let line = status_line(&snapshot, &DisplayConfig::default());
        assert!(line.starts_with("[no device]"));
        assert!(line.ends_with("offset --"));
    }

    #[test]
    fn status_line_shows_offset_and_error() {
        let mut tracker = CalibrationTracker::new();
        for (pitch, yaw) in [(0.5, -0.3), (-0.1, 0.2)] {
            tracker.on_sample(&MotionSample {
                attitude: Attitude::new(0.0, pitch, yaw),
                ..MotionSample::default()
            });
        }
        tracker.set_reference();
        tracker.on_sample(&MotionSample::default());

        let display = DisplayConfig {
            width: 1000.0,
            height: 600.0,
            refresh_ms: 500,
        };
        let line = status_line(&snapshot_with(tracker, "Device is not reachable"), &display);
        assert!(line.contains("offset (+400, -100) px"));
        assert!(line.ends_with("error: Device is not reachable"));
    }

    #[test]
    fn report_lists_sample_calibration_and_offset() {
        let snapshot = snapshot_with(CalibrationTracker::new(), "");
        let report = status_report(&snapshot, &DisplayConfig::default());
        assert!(report.starts_with("[no device]"));
        assert!(report.contains("offset --"));
        assert!(report.contains(&snapshot.sample.to_string()));
        assert!(report.contains("center: Direction(roll: 0.00, pitch: 0.00, yaw: 0.00)"));
        assert!(report.contains("maxYaw: 0.00"));
        assert!(report.ends_with("last error: none"));
    }

    #[test]
    fn simulator_settings_convert_degrees() {
        let settings = simulator_settings(&SimulatorConfig {
            yaw_amplitude_deg: 90.0,
            period_secs: -1.0,
            ..SimulatorConfig::default()
        });
        assert!((settings.yaw_amplitude - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(settings.period, Duration::from_secs_f64(0.1));
    }

    #[test]
    fn simulator_settings_replace_unusable_values() {
        let huge = simulator_settings(&SimulatorConfig {
            tick_hz: 1e12,
            ..SimulatorConfig::default()
        });
        assert_eq!(huge.tick_hz, MAX_TICK_HZ);
        assert!(!huge.tick_interval().is_zero());

        let infinite = simulator_settings(&SimulatorConfig {
            tick_hz: f64::INFINITY,
            period_secs: f64::INFINITY,
            yaw_amplitude_deg: f64::NAN,
            ..SimulatorConfig::default()
        });
        let defaults = SimulatorConfig::default();
        assert_eq!(infinite.tick_hz, defaults.tick_hz);
        assert_eq!(infinite.period, Duration::from_secs_f64(defaults.period_secs));
        assert_eq!(infinite.yaw_amplitude, defaults.yaw_amplitude_deg.to_radians());
    }

    #[test]
    fn failed_recorder_is_dropped() {
        let path = std::env::temp_dir()
            .join(format!("headtrack-app-{}-missing", std::process::id()))
            .join("motion.csv");
        let writer = headtrack_record::spawn_writer(
            MotionRecorder::new(&path, RecordMode::Overwrite).unwrap(),
        );
        let mut recorder = Some(writer);

        for _ in 0..400 {
            record_sample(&mut recorder, &MotionSample::default());
            if recorder.is_none() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(recorder.is_none());

        // Nothing left to record into.
        record_sample(&mut recorder, &MotionSample::default());
        assert!(recorder.is_none());
    }
}
