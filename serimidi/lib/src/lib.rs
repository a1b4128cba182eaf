pub mod controllers;
pub mod midi;
pub mod serial;
pub mod transport;

#[cfg(test)]
pub(crate) mod test {
    use crate::{
        midi::{Command, MidiDeviceProvider, MidiSink, MidiSource},
        serial::{SerialPortInfo, SerialPortProvider, SerialStream},
        transport::TransportError,
    };
    use crossbeam::channel::{Receiver, RecvTimeoutError, Sender};
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc, Mutex,
        },
        time::{Duration, Instant},
    };

    pub const SERIAL_PORTS: &[&str] = &["/dev/ttyUSB0", "/dev/ttyUSB1"];
    pub const MIDI_INPUTS: &[&str] = &["in0", "in1"];
    pub const MIDI_OUTPUTS: &[&str] = &["out0", "out1", "broken"];
    pub const TIMEOUT: Duration = Duration::from_secs(1);

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        OpenSerial(String, u32),
        CloseSerial(String),
        OpenInput(String),
        CloseInput(String),
        OpenOutput(String),
        CloseOutput(String),
    }

    /// Every open and close, in order, across all mock handles.
    #[derive(Clone, Default)]
    pub struct Journal(Arc<Mutex<Vec<Call>>>);

    impl Journal {
        fn record(&self, call: Call) {
            self.0.lock().unwrap().push(call);
        }

        pub fn calls(&self) -> Vec<Call> {
            self.0.lock().unwrap().clone()
        }

        pub fn clear(&self) {
            self.0.lock().unwrap().clear();
        }
    }

    /// Test side of a mock serial line: bytes written here are read by
    /// whichever stream is currently open.
    #[derive(Clone)]
    pub struct SerialLine {
        sender: Sender<Vec<u8>>,
        broken: Arc<AtomicBool>,
    }

    impl SerialLine {
        pub fn write(&self, bytes: &[u8]) {
            self.sender.send(bytes.to_vec()).unwrap();
        }

        /// Make every open stream fail its next read.
        pub fn unplug(&self) {
            self.broken.store(true, Ordering::SeqCst);
        }

        pub fn plug(&self) {
            self.broken.store(false, Ordering::SeqCst);
        }
    }

    pub struct MockSerialPorts {
        journal: Journal,
        receiver: Receiver<Vec<u8>>,
        broken: Arc<AtomicBool>,
    }

    impl MockSerialPorts {
        pub fn new(journal: Journal) -> (Self, SerialLine) {
            let (sender, receiver) = crossbeam::channel::unbounded();
            let broken = Arc::new(AtomicBool::new(false));

            (
                Self {
                    journal,
                    receiver,
                    broken: broken.clone(),
                },
                SerialLine { sender, broken },
            )
        }
    }

    impl SerialPortProvider for MockSerialPorts {
        fn list_serial_ports(&self) -> anyhow::Result<Vec<SerialPortInfo>> {
            Ok(SERIAL_PORTS
                .iter()
                .map(|port| SerialPortInfo {
                    id: port.to_string(),
                    display_name: format!("mock ({port})"),
                })
                .collect())
        }

        fn open_serial_port(
            &self,
            id: &str,
            baud_rate: u32,
        ) -> anyhow::Result<Box<dyn SerialStream + Send>> {
            if !SERIAL_PORTS.contains(&id) {
                anyhow::bail!("no such port : {id}");
            }

            self.journal.record(Call::OpenSerial(id.into(), baud_rate));

            Ok(Box::new(MockSerialStream {
                id: id.into(),
                journal: self.journal.clone(),
                receiver: self.receiver.clone(),
                broken: self.broken.clone(),
                pending: VecDeque::new(),
                is_open: true,
            }))
        }
    }

    struct MockSerialStream {
        id: String,
        journal: Journal,
        receiver: Receiver<Vec<u8>>,
        broken: Arc<AtomicBool>,
        pending: VecDeque<u8>,
        is_open: bool,
    }

    impl SerialStream for MockSerialStream {
        fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
            if !self.is_open {
                return Err(TransportError::Closed);
            }

            if self.broken.load(Ordering::SeqCst) {
                return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into());
            }

            if self.pending.is_empty() {
                match self.receiver.recv_timeout(Duration::from_millis(5)) {
                    Ok(bytes) => self.pending.extend(bytes),
                    Err(RecvTimeoutError::Timeout) => return Ok(0),
                    Err(RecvTimeoutError::Disconnected) => return Err(TransportError::Closed),
                }
            }

            let count = buf.len().min(self.pending.len());
            for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..count)) {
                *slot = byte;
            }
            Ok(count)
        }

        fn close(&mut self) {
            if std::mem::replace(&mut self.is_open, false) {
                self.journal.record(Call::CloseSerial(self.id.clone()));
            }
        }
    }

    pub struct MockMidiDevices {
        journal: Journal,
        sent: Arc<Mutex<Vec<Command>>>,
    }

    impl MockMidiDevices {
        /// Returns the devices and the log of every command sent to any output.
        pub fn new(journal: Journal) -> (Self, Arc<Mutex<Vec<Command>>>) {
            let sent = Arc::new(Mutex::new(vec![]));
            (
                Self {
                    journal,
                    sent: sent.clone(),
                },
                sent,
            )
        }
    }

    impl MidiDeviceProvider for MockMidiDevices {
        fn list_midi_inputs(&self) -> anyhow::Result<Vec<String>> {
            Ok(MIDI_INPUTS.iter().map(|s| s.to_string()).collect())
        }

        fn list_midi_outputs(&self) -> anyhow::Result<Vec<String>> {
            Ok(MIDI_OUTPUTS.iter().map(|s| s.to_string()).collect())
        }

        fn open_midi_output(&self, device: &str) -> anyhow::Result<Box<dyn MidiSink + Send>> {
            if device == "broken" || !MIDI_OUTPUTS.contains(&device) {
                anyhow::bail!("cannot open {device}");
            }

            self.journal.record(Call::OpenOutput(device.into()));

            Ok(Box::new(MockOutput {
                device: device.into(),
                journal: self.journal.clone(),
                sent: self.sent.clone(),
                is_open: true,
            }))
        }

        fn open_midi_input(&self, device: &str) -> anyhow::Result<Box<dyn MidiSource + Send>> {
            if !MIDI_INPUTS.contains(&device) {
                anyhow::bail!("cannot open {device}");
            }

            self.journal.record(Call::OpenInput(device.into()));

            Ok(Box::new(MockInput {
                device: device.into(),
                journal: self.journal.clone(),
                is_open: true,
            }))
        }
    }

    struct MockOutput {
        device: String,
        journal: Journal,
        sent: Arc<Mutex<Vec<Command>>>,
        is_open: bool,
    }

    impl MidiSink for MockOutput {
        fn send(&mut self, command: &Command) -> Result<(), TransportError> {
            if !self.is_open {
                return Err(TransportError::Closed);
            }
            self.sent.lock().unwrap().push(command.clone());
            Ok(())
        }

        fn close(&mut self) {
            if std::mem::replace(&mut self.is_open, false) {
                self.journal.record(Call::CloseOutput(self.device.clone()));
            }
        }
    }

    struct MockInput {
        device: String,
        journal: Journal,
        is_open: bool,
    }

    impl MidiSource for MockInput {
        fn close(&mut self) {
            if std::mem::replace(&mut self.is_open, false) {
                self.journal.record(Call::CloseInput(self.device.clone()));
            }
        }
    }

    /// Poll `condition` until it holds or [`TIMEOUT`] elapses.
    pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < TIMEOUT {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        condition()
    }
}
