pub mod aggregator;
pub mod calibration;
pub mod simulated;
pub mod source;
pub mod types;

pub use aggregator::{Changes, MotionState};
pub use calibration::{CalibrationTracker, Envelope};
pub use simulated::{SimulatedSource, SimulatorSettings, MAX_TICK_HZ, MIN_TICK_HZ};
pub use source::{EventReceiver, EventSink, SampleSource, SourceError, SourceEvent};
pub use types::*;

use source::Inbound;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Sample source refused to start: {0}")]
    Source(#[from] SourceError),
    #[error("Motion engine task is gone")]
    TaskGone,
}

/// Everything a presentation layer reads, published after every change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionSnapshot {
    pub sample: MotionSample,
    /// Empty when the source has not reported an error.
    pub last_error: String,
    pub calibration: CalibrationTracker,
}

/// Owns a [`SampleSource`] and the state derived from it.
///
/// Source events and calibration commands travel on one queue into one
/// background task, so a `set_reference` issued after a sample was sent is
/// applied after that sample. Observers get immutable [`MotionSnapshot`]s
/// through a watch channel.
pub struct MotionEngine<S: SampleSource> {
    source: S,
    started: bool,
    snapshot_rx: watch::Receiver<MotionSnapshot>,
    /// Engine's own handle on the inbound queue, used for commands.
    commands: EventSink,
    task: tokio::task::JoinHandle<()>,
}

impl<S: SampleSource> MotionEngine<S> {
    /// Attach to `source` and spawn the processing task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(mut source: S) -> Self {
        let (sink, inbound_rx) = EventSink::inbound_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(MotionSnapshot::default());

        let commands = sink.clone();
        source.attach(sink);
        let task = tokio::spawn(process_loop(inbound_rx, snapshot_tx));

        Self {
            source,
            started: false,
            snapshot_rx,
            commands,
            task,
        }
    }

    /// Begin consuming motion updates. No-op when already started.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.started {
            return Ok(());
        }
        self.source.start_updates()?;
        self.started = true;
        tracing::info!("Motion updates started");
        Ok(())
    }

    /// Stop consuming motion updates. No-op when not started.
    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.source.stop_updates();
        self.started = false;
        tracing::info!("Motion updates stopped");
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Mark the current attitude as center.
    ///
    /// Queued behind every event the source has already sent.
    pub fn set_reference(&self) -> Result<(), EngineError> {
        if self.commands.set_reference() {
            Ok(())
        } else {
            Err(EngineError::TaskGone)
        }
    }

    /// Latest published state (non-blocking).
    pub fn snapshot(&self) -> MotionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// A receiver notified on every published change.
    pub fn subscribe(&self) -> watch::Receiver<MotionSnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: SampleSource> Drop for MotionEngine<S> {
    fn drop(&mut self) {
        self.stop();
        self.task.abort();
    }
}

/// Background task: apply source events and commands in queue order,
/// publish snapshots.
async fn process_loop(
    mut inbound_rx: mpsc::UnboundedReceiver<Inbound>,
    snapshot_tx: watch::Sender<MotionSnapshot>,
) {
    let mut state = MotionState::new();
    let mut tracker = CalibrationTracker::new();
    let mut update_count: u64 = 0;

    let publish = |state: &MotionState, tracker: &CalibrationTracker| {
        let _ = snapshot_tx.send(MotionSnapshot {
            sample: *state.sample(),
            last_error: state.last_error().to_owned(),
            calibration: *tracker,
        });
    };

    while let Some(inbound) = inbound_rx.recv().await {
        match inbound {
            Inbound::Source(event) => {
                tracing::trace!(?event, "Source event");

                let changes = state.apply(event);
                if changes.error {
                    tracing::warn!(error = state.last_error(), "Motion source error");
                }
                if changes.sample {
                    tracker.on_sample(state.sample());
                    update_count += 1;
                    if update_count % 1000 == 0 {
                        tracing::debug!(update_count, "Motion updates processed");
                    }
                }
                if changes.any() {
                    publish(&state, &tracker);
                }
            }
            Inbound::SetReference => {
                tracker.set_reference();
                publish(&state, &tracker);
            }
        }
    }
    tracing::debug!("Motion inbound queue closed");
}
