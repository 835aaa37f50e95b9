use crate::types::RawMotion;
use thiserror::Error;
use tokio::sync::mpsc;

/// Per-tick failure reported by a sample source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    #[error("Device is not reachable")]
    DeviceUnreachable,
    #[error("Motion tracking is not supported by this device")]
    Unsupported,
    #[error("Device error: {0}")]
    Device(String),
}

/// Everything a source can push to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// One update tick. Either field may be absent, or both present.
    Tick {
        motion: Option<RawMotion>,
        error: Option<SourceError>,
    },
    Connected,
    Disconnected,
    /// Live updates started or stopped flowing.
    TrackingActive(bool),
    /// The device gained or lost motion capability.
    TrackingAvailable(bool),
}

/// Everything the engine task consumes. Source events and engine commands
/// share one queue so they are handled in the order they were sent.
#[derive(Debug)]
pub(crate) enum Inbound {
    Source(SourceEvent),
    SetReference,
}

/// Sending half handed to a source. The source never owns the engine,
/// only this sender; events are dropped once the engine is gone.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<Inbound>,
}

impl EventSink {
    /// A sink paired with a receiver of source events only.
    pub fn channel() -> (Self, EventReceiver) {
        let (sink, rx) = Self::inbound_channel();
        (sink, EventReceiver { rx })
    }

    pub(crate) fn inbound_channel() -> (Self, mpsc::UnboundedReceiver<Inbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Push an event. Returns `false` when the receiving side is closed.
    pub fn send(&self, event: SourceEvent) -> bool {
        self.tx.send(Inbound::Source(event)).is_ok()
    }

    pub fn motion(&self, motion: RawMotion) -> bool {
        self.send(SourceEvent::Tick {
            motion: Some(motion),
            error: None,
        })
    }

    pub fn error(&self, error: SourceError) -> bool {
        self.send(SourceEvent::Tick {
            motion: None,
            error: Some(error),
        })
    }

    pub(crate) fn set_reference(&self) -> bool {
        self.tx.send(Inbound::SetReference).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half returned by [`EventSink::channel`].
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<Inbound>,
}

impl EventReceiver {
    /// Next source event, or `None` once every sink is dropped.
    pub async fn recv(&mut self) -> Option<SourceEvent> {
        loop {
            match self.rx.recv().await? {
                Inbound::Source(event) => return Some(event),
                Inbound::SetReference => continue,
            }
        }
    }
}

/// Contract for anything that produces motion ticks.
///
/// Status notifications (connection, capability) may arrive at any time
/// after [`attach`](SampleSource::attach); ticks only flow between
/// `start_updates` and `stop_updates`.
pub trait SampleSource: Send + 'static {
    /// Called once when the engine is built.
    fn attach(&mut self, sink: EventSink);

    /// Begin delivering ticks to the attached sink.
    fn start_updates(&mut self) -> Result<(), SourceError>;

    /// Stop delivering ticks.
    fn stop_updates(&mut self);
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn attach(&mut self, sink: EventSink) {
        (**self).attach(sink)
    }

    fn start_updates(&mut self) -> Result<(), SourceError> {
        (**self).start_updates()
    }

    fn stop_updates(&mut self) {
        (**self).stop_updates()
    }
}
