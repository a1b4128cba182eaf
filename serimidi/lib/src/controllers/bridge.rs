use super::pipeline::{BridgeEvent, Pipeline};
use crate::{
    midi::{FramingConfig, MidiDeviceProvider, MidiSource},
    serial::{SerialPortInfo, SerialPortProvider},
};
use std::{collections::VecDeque, time::Duration};

/// What the user picked. Mutated only through [`BridgeController::configure`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeConfig {
    pub serial_port: Option<String>,
    pub baud_rate: Option<u32>,
    pub midi_input: Option<String>,
    pub midi_output: Option<String>,
    pub enabled: bool,
}

impl BridgeConfig {
    /// A serial port, a baud rate and at least one MIDI endpoint are selected.
    pub fn is_ready(&self) -> bool {
        (self.midi_output.is_some() || self.midi_input.is_some())
            && self.serial_port.is_some()
            && self.baud_rate.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.serial_port.is_none()
            && self.baud_rate.is_none()
            && self.midi_input.is_none()
            && self.midi_output.is_none()
    }

    fn apply(&mut self, change: ConfigChange) {
        match change {
            ConfigChange::SerialPort(port) => self.serial_port = port,
            ConfigChange::BaudRate(rate) => self.baud_rate = rate,
            ConfigChange::MidiInput(device) => self.midi_input = device,
            ConfigChange::MidiOutput(device) => self.midi_output = device,
        }
    }
}

/// One field of [`BridgeConfig`] being selected or cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigChange {
    SerialPort(Option<String>),
    BaudRate(Option<u32>),
    MidiInput(Option<String>),
    MidiOutput(Option<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Nothing selected.
    Idle,
    /// Some but not all of the required selections made.
    Configuring,
    /// Fully configured, nothing open.
    Ready,
    /// Serial port and MIDI endpoints open, frames being routed.
    Bound,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("bridge configuration incomplete : select a serial port, a baud rate and a MIDI device")]
    ConfigurationIncomplete,
    #[error("invalid baud rate : {0}")]
    InvalidBaudRate(u32),
    #[error("failed to open {resource} : {reason}")]
    Open { resource: String, reason: String },
}

impl BridgeError {
    fn open(resource: &str, error: anyhow::Error) -> Self {
        Self::Open {
            resource: resource.to_owned(),
            reason: format!("{error:#}"),
        }
    }
}

struct ActiveBinding {
    pipeline: Pipeline,
    input: Option<Box<dyn MidiSource + Send>>,
}

/// Owns the bridge configuration and the binding between a serial port
/// and MIDI endpoints.
///
/// Every configuration change goes through [`configure`](Self::configure),
/// which tears the current binding down and rebuilds it when the bridge is
/// enabled. Callers sharing a controller between threads must wrap it in a
/// mutex, so that two rebinds never overlap.
pub struct BridgeController {
    serial: Box<dyn SerialPortProvider>,
    midi: Box<dyn MidiDeviceProvider>,
    framing: FramingConfig,
    config: BridgeConfig,
    binding: Option<ActiveBinding>,
    events: VecDeque<BridgeEvent>,
}

impl BridgeController {
    pub fn new(serial: Box<dyn SerialPortProvider>, midi: Box<dyn MidiDeviceProvider>) -> Self {
        Self {
            serial,
            midi,
            framing: FramingConfig::default(),
            config: BridgeConfig::default(),
            binding: None,
            events: VecDeque::new(),
        }
    }

    /// Framing used by the next binding.
    pub fn with_framing(mut self, framing: FramingConfig) -> Self {
        self.framing = framing;
        self
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Current state of the bridge.
    ///
    /// A lost transport is only noticed when events are polled or the
    /// configuration changes, so a bridge whose serial line just went away
    /// reports [`BridgeState::Bound`] until then.
    pub fn state(&self) -> BridgeState {
        if self.binding.is_some() {
            BridgeState::Bound
        } else if self.config.is_ready() {
            BridgeState::Ready
        } else if self.config.is_empty() {
            BridgeState::Idle
        } else {
            BridgeState::Configuring
        }
    }

    pub fn list_serial_ports(&self) -> anyhow::Result<Vec<SerialPortInfo>> {
        self.serial.list_serial_ports()
    }

    pub fn list_midi_inputs(&self) -> anyhow::Result<Vec<String>> {
        self.midi.list_midi_inputs()
    }

    pub fn list_midi_outputs(&self) -> anyhow::Result<Vec<String>> {
        self.midi.list_midi_outputs()
    }

    /// Apply one configuration change and re-evaluate the binding.
    ///
    /// A bound bridge is always torn down first. It is rebound when it is
    /// still enabled and the new configuration is ready. A failed rebind
    /// disables the bridge.
    pub fn configure(&mut self, change: ConfigChange) -> Result<BridgeState, BridgeError> {
        if let ConfigChange::BaudRate(Some(0)) = change {
            return Err(BridgeError::InvalidBaudRate(0));
        }

        log::debug!("configuration change : {change:?}");
        self.config.apply(change);
        self.reconnect()
    }

    /// Open the configured serial port and MIDI endpoints and start routing.
    pub fn enable(&mut self) -> Result<(), BridgeError> {
        if self.binding.is_some() {
            return Ok(());
        }

        if !self.config.is_ready() {
            return Err(BridgeError::ConfigurationIncomplete);
        }

        self.bind()
    }

    /// Stop routing and close every open handle.
    pub fn disable(&mut self) {
        self.config.enabled = false;
        if let Some(reason) = self.unbind() {
            self.events.push_back(BridgeEvent::TransportClosed(reason));
        }
    }

    /// Drain the events produced since the last call, without blocking.
    ///
    /// A [`BridgeEvent::TransportClosed`] means the binding is over and
    /// the bridge must be enabled again explicitly.
    pub fn process_events(&mut self) -> Vec<BridgeEvent> {
        let mut transport_closed = false;

        if let Some(binding) = &self.binding {
            while let Some(event) = binding.pipeline.try_next() {
                transport_closed = matches!(event, BridgeEvent::TransportClosed(_));
                self.events.push_back(event);
                if transport_closed {
                    break;
                }
            }
        }

        if transport_closed {
            self.on_transport_closed();
        }

        self.events.drain(..).collect()
    }

    /// Wait up to `timeout` for the next event.
    pub fn next_event(&mut self, timeout: Duration) -> Option<BridgeEvent> {
        if let Some(event) = self.events.pop_front() {
            return Some(event);
        }

        let event = self.binding.as_ref()?.pipeline.next(timeout)?;

        if matches!(event, BridgeEvent::TransportClosed(_)) {
            self.on_transport_closed();
        }

        Some(event)
    }

    fn reconnect(&mut self) -> Result<BridgeState, BridgeError> {
        // a transport lost before anyone polled still needs an explicit enable
        if let Some(reason) = self.unbind() {
            log::warn!("transport closed, bridge disabled until enabled again");
            self.config.enabled = false;
            self.events.push_back(BridgeEvent::TransportClosed(reason));
        }

        if self.config.enabled && self.config.is_ready() {
            if let Err(e) = self.bind() {
                self.config.enabled = false;
                return Err(e);
            }
        }

        Ok(self.state())
    }

    fn bind(&mut self) -> Result<(), BridgeError> {
        let (Some(port), Some(baud_rate)) = (self.config.serial_port.as_deref(), self.config.baud_rate)
        else {
            return Err(BridgeError::ConfigurationIncomplete);
        };

        let mut stream = self
            .serial
            .open_serial_port(port, baud_rate)
            .map_err(|e| BridgeError::open(port, e))?;

        let mut input = match self.config.midi_input.as_deref() {
            Some(device) => match self.midi.open_midi_input(device) {
                Ok(input) => Some(input),
                Err(e) => {
                    stream.close();
                    return Err(BridgeError::open(device, e));
                }
            },
            None => None,
        };

        let sink = match self.config.midi_output.as_deref() {
            Some(device) => match self.midi.open_midi_output(device) {
                Ok(sink) => Some(sink),
                Err(e) => {
                    stream.close();
                    if let Some(input) = input.as_mut() {
                        input.close();
                    }
                    return Err(BridgeError::open(device, e));
                }
            },
            None => None,
        };

        log::info!(
            "bridge bound : {port} @ {baud_rate} -> {}",
            self.config.midi_output.as_deref().unwrap_or("no output")
        );

        self.binding = Some(ActiveBinding {
            pipeline: Pipeline::launch(stream, sink, self.framing.clone()),
            input,
        });
        self.config.enabled = true;

        Ok(())
    }

    /// Tear the binding down: stop the pipeline, which closes the serial
    /// port and MIDI output, then close the MIDI input. Events the
    /// pipeline produced before stopping are kept.
    ///
    /// Returns the closure reason when the pipeline had already ended
    /// because its transport went away.
    fn unbind(&mut self) -> Option<String> {
        let Some(ActiveBinding {
            mut pipeline,
            mut input,
        }) = self.binding.take()
        else {
            return None;
        };

        pipeline.stop();

        if let Some(input) = input.as_mut() {
            input.close();
        }

        self.events.extend(pipeline.drain());
        log::info!("bridge unbound");

        pipeline.close_reason()
    }

    /// The closure was already reported to the caller.
    fn on_transport_closed(&mut self) {
        log::warn!("transport closed, bridge disabled until enabled again");
        self.config.enabled = false;
        self.unbind();
    }
}

impl Drop for BridgeController {
    fn drop(&mut self) {
        self.unbind();
    }
}
