//! CSV recording of motion samples.
//!
//! Each row is `time, roll, pitch, yaw`: Unix seconds followed by the
//! attitude in radians, every value formatted to two decimals.

use anyhow::Result;
use headtrack_motion::MotionSample;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Sender};
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

pub use headtrack_config::RecordMode;

pub const HEADER: [&str; 4] = ["time", "roll", "pitch", "yaw"];

/// Format one record as CSV fields.
pub fn format_row(time: f64, sample: &MotionSample) -> [String; 4] {
    let a = sample.attitude;
    [time, a.roll, a.pitch, a.yaw].map(|v| format!("{v:.2}"))
}

/// Seconds since the Unix epoch.
pub fn unix_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

pub struct MotionRecorder {
    path: PathBuf,
    mode: RecordMode,
    /// Open writer in append mode.
    appender: Option<csv::Writer<File>>,
}

impl MotionRecorder {
    pub fn new(path: impl Into<PathBuf>, mode: RecordMode) -> Result<Self> {
        let path = path.into();
        let appender = match mode {
            RecordMode::Overwrite => None,
            RecordMode::Append => {
                let file = OpenOptions::new().create(true).append(true).open(&path)?;
                let empty = file.metadata()?.len() == 0;
                let mut writer = csv::Writer::from_writer(file);
                if empty {
                    writer.write_record(HEADER)?;
                    writer.flush()?;
                }
                Some(writer)
            }
        };
        info!(?path, ?mode, "Recording motion samples");
        Ok(Self {
            path,
            mode,
            appender,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&mut self, time: f64, sample: &MotionSample) -> Result<()> {
        let row = format_row(time, sample);
        match &mut self.appender {
            Some(writer) => {
                writer.write_record(&row)?;
                writer.flush()?;
            }
            None => {
                let mut writer = csv::Writer::from_path(&self.path)?;
                writer.write_record(HEADER)?;
                writer.write_record(&row)?;
                writer.flush()?;
            }
        }
        Ok(())
    }

    pub fn mode(&self) -> RecordMode {
        self.mode
    }
}

/// Handle to a recorder running on its own thread.
pub struct RecordWriter {
    tx: Sender<(f64, MotionSample)>,
    handle: JoinHandle<()>,
}

/// Move `recorder` onto a dedicated thread so file I/O never blocks the caller.
///
/// The thread exits on the first failed write; later [`RecordWriter::record`]
/// calls then return `false`.
pub fn spawn_writer(mut recorder: MotionRecorder) -> RecordWriter {
    let (tx, rx) = channel::<(f64, MotionSample)>();
    let handle = thread::spawn(move || {
        let mut written: u64 = 0;
        while let Ok((time, sample)) = rx.recv() {
            if let Err(e) = recorder.write(time, &sample) {
                warn!(?e, path = ?recorder.path(), "Motion record write failed, recorder stopped");
                break;
            }
            written += 1;
        }
        info!(written, "Motion recorder finished");
    });
    RecordWriter { tx, handle }
}

impl RecordWriter {
    /// Queue `sample` stamped with the current time. Returns `false` once
    /// the writer thread is gone.
    pub fn record(&self, sample: &MotionSample) -> bool {
        self.tx.send((unix_time(), *sample)).is_ok()
    }

    /// Drain queued rows and wait for the thread to exit.
    pub fn finish(self) -> Result<()> {
        drop(self.tx);
        self.handle
            .join()
            .map_err(|_| anyhow::anyhow!("Motion recorder thread panicked"))
    }
}
