use crate::source::SourceEvent;
use crate::types::{ConnectionState, MotionSample};

/// What an applied event changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Changes {
    pub sample: bool,
    pub error: bool,
}

impl Changes {
    pub fn any(&self) -> bool {
        self.sample || self.error
    }
}

/// Latest known-good sample plus the latest source error.
///
/// Pure state: the engine task feeds it events one at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionState {
    sample: MotionSample,
    last_error: String,
}

impl MotionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&self) -> &MotionSample {
        &self.sample
    }

    /// Empty when no error has been reported.
    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    pub fn apply(&mut self, event: SourceEvent) -> Changes {
        let mut changes = Changes::default();
        match event {
            SourceEvent::Tick { motion, error } => {
                if let Some(error) = error {
                    let message = error.to_string();
                    if message != self.last_error {
                        self.last_error = message;
                        changes.error = true;
                    }
                }
                // An error-only tick keeps the previous sample.
                if let Some(raw) = motion {
                    let next = self.sample.with_motion(&raw);
                    changes.sample = next != self.sample;
                    self.sample = next;
                }
            }
            SourceEvent::Connected => {
                changes.sample = self.set_connection(ConnectionState::Connected);
            }
            SourceEvent::Disconnected => {
                changes.sample = self.set_connection(ConnectionState::Disconnected);
            }
            SourceEvent::TrackingActive(active) => {
                changes.sample = replace_flag(&mut self.sample.tracking_active, active);
            }
            SourceEvent::TrackingAvailable(available) => {
                changes.sample = replace_flag(&mut self.sample.tracking_available, available);
            }
        }
        changes
    }

    fn set_connection(&mut self, state: ConnectionState) -> bool {
        let changed = self.sample.connection_state != state;
        self.sample.connection_state = state;
        changed
    }
}

fn replace_flag(flag: &mut bool, value: bool) -> bool {
    let changed = *flag != value;
    *flag = value;
    changed
}
