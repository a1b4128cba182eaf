use crate::{
    midi::{decode, Command, DecodeError, FrameReader, FramingConfig, MidiSink},
    serial::SerialStream,
    transport::TransportError,
};
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

const READ_BUFFER_SIZE: usize = 256;
const EVENT_QUEUE_SIZE: usize = 1_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// A command was decoded and handed to the MIDI output, if any.
    Received(Command),
    /// Bytes or a frame were dropped, the binding is still up.
    Dropped(String),
    /// The serial line or MIDI output went away, the binding is over.
    TransportClosed(String),
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum RouteError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Decode one frame and send it to the sink.
pub(crate) fn route_frame(
    frame: &[u8],
    sink: Option<&mut (dyn MidiSink + Send + '_)>,
) -> Result<Command, RouteError> {
    let command = decode(frame)?;

    if let Some(sink) = sink {
        sink.send(&command)?;
    }

    Ok(command)
}

/// The handles one binding owns, each closed exactly once.
struct Binding {
    stream: Option<Box<dyn SerialStream + Send>>,
    sink: Option<Box<dyn MidiSink + Send>>,
}

impl Binding {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.stream.as_mut() {
            Some(stream) => stream.read_bytes(buf),
            None => Err(TransportError::Closed),
        }
    }

    fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }

        if let Some(mut sink) = self.sink.take() {
            sink.close();
        }
    }
}

impl Drop for Binding {
    fn drop(&mut self) {
        self.close();
    }
}

enum Flow {
    Continue,
    Stop,
}

/// Where the worker reports to the controller.
///
/// The transport closure is kept apart from the bounded event queue so it
/// is never lost to a full queue. The worker exits right after recording
/// it, which disconnects the queue once its last event has been read.
struct Reporter {
    events: Sender<BridgeEvent>,
    closed: Arc<Mutex<Option<String>>>,
}

impl Reporter {
    fn notify(&self, event: BridgeEvent) {
        match self.events.try_send(event) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => (),
            Err(TrySendError::Full(_)) => log::trace!("bridge event queue full, event dropped"),
        }
    }

    fn transport_closed(&self, reason: String) {
        match self.closed.lock() {
            Ok(mut closed) => *closed = Some(reason),
            Err(e) => log::error!("Failed to record transport closure : {e}"),
        }
    }
}

/// Background worker moving bytes from a serial line to a MIDI sink:
/// serial → [`FrameReader`] → [`decode`] → [`MidiSink`].
///
/// Frames are handled one at a time in arrival order. Stopping waits for
/// the worker to exit, and the worker closes its handles on the way out,
/// so nothing is sent once [`Pipeline::stop`] returns.
pub(crate) struct Pipeline {
    handle: Option<std::thread::JoinHandle<()>>,
    shutdown: Sender<()>,
    running: Arc<AtomicBool>,
    events: Receiver<BridgeEvent>,
    closed: Arc<Mutex<Option<String>>>,
}

impl Pipeline {
    pub fn launch(
        stream: Box<dyn SerialStream + Send>,
        sink: Option<Box<dyn MidiSink + Send>>,
        framing: FramingConfig,
    ) -> Self {
        let (shutdown_sender, shutdown_receiver) = crossbeam::channel::bounded::<()>(1);
        let (event_sender, event_receiver) = crossbeam::channel::bounded(EVENT_QUEUE_SIZE);
        let running = Arc::new(AtomicBool::new(true));
        let closed = Arc::new(Mutex::new(None));

        let handle = {
            let running = running.clone();
            let binding = Binding {
                stream: Some(stream),
                sink,
            };
            let reporter = Reporter {
                events: event_sender,
                closed: closed.clone(),
            };

            std::thread::spawn(move || run(binding, framing, shutdown_receiver, running, reporter))
        };

        Self {
            handle: Some(handle),
            shutdown: shutdown_sender,
            running,
            events: event_receiver,
            closed,
        }
    }

    /// Next event if one is queued. Once the worker has exited and its
    /// queue is empty, every call reports the transport closure.
    pub fn try_next(&self) -> Option<BridgeEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(self.closed_event()),
        }
    }

    /// Like [`try_next`](Self::try_next), waiting up to `timeout`.
    pub fn next(&self, timeout: Duration) -> Option<BridgeEvent> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(self.closed_event()),
        }
    }

    /// Events still queued, without the closure report.
    pub fn drain(&self) -> impl Iterator<Item = BridgeEvent> + '_ {
        self.events.try_iter()
    }

    /// Why the worker ended by itself, if it did.
    pub fn close_reason(&self) -> Option<String> {
        self.closed.lock().ok().and_then(|closed| closed.clone())
    }

    fn closed_event(&self) -> BridgeEvent {
        BridgeEvent::TransportClosed(
            self.close_reason()
                .unwrap_or_else(|| "bridge pipeline stopped".to_owned()),
        )
    }

    /// Stop routing and wait for the worker to release its handles.
    /// Stopping twice is a no-op.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        let Some(handle) = self.handle.take() else {
            return;
        };

        if let Err(e) = self.shutdown.try_send(()) {
            log::trace!("pipeline already stopping : {e}");
        }

        if handle.join().is_err() {
            log::error!("Failed to join bridge pipeline thread");
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    mut binding: Binding,
    framing: FramingConfig,
    shutdown: Receiver<()>,
    running: Arc<AtomicBool>,
    reporter: Reporter,
) {
    let mut reader = FrameReader::new(framing);
    let mut buffer = [0u8; READ_BUFFER_SIZE];

    log::trace!("bridge pipeline started");

    loop {
        let flow = crossbeam::select! {
            recv(shutdown) -> _ => Flow::Stop,
            default => pump(&mut binding, &mut reader, &mut buffer, &running, &reporter),
        };

        if matches!(flow, Flow::Stop) {
            break;
        }
    }

    binding.close();
    log::trace!("bridge pipeline stopped");
}

/// Read one chunk from the serial line and route every frame it completes.
fn pump(
    binding: &mut Binding,
    reader: &mut FrameReader,
    buffer: &mut [u8],
    running: &AtomicBool,
    reporter: &Reporter,
) -> Flow {
    let count = match binding.read(buffer) {
        Ok(count) => count,
        Err(e) => {
            log::error!("serial transport closed : {e}");
            reporter.transport_closed(e.to_string());
            return Flow::Stop;
        }
    };

    for frame in reader.extend(&buffer[..count]) {
        if !running.load(Ordering::SeqCst) {
            return Flow::Stop;
        }

        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("{e}");
                reporter.notify(BridgeEvent::Dropped(e.to_string()));
                continue;
            }
        };

        match route_frame(&frame, binding.sink.as_deref_mut()) {
            Ok(command) => {
                log::debug!("{command}");
                reporter.notify(BridgeEvent::Received(command));
            }
            Err(RouteError::Transport(e)) if e.is_closed() => {
                log::error!("MIDI output closed : {e}");
                reporter.transport_closed(e.to_string());
                return Flow::Stop;
            }
            Err(e) => {
                log::warn!("dropped frame {frame:02x?} : {e}");
                reporter.notify(BridgeEvent::Dropped(e.to_string()));
            }
        }
    }

    Flow::Continue
}
