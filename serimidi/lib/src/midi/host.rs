use super::*;
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};

const INPUT_CLIENT: &str = "serimidi-in";
const OUTPUT_CLIENT: &str = "serimidi-out";

/// [`MidiDeviceProvider`] backed by the platform MIDI host.
#[derive(Default)]
pub struct HostMidiDevices;

impl MidiDeviceProvider for HostMidiDevices {
    fn list_midi_inputs(&self) -> anyhow::Result<Vec<String>> {
        let midi = MidiInput::new(INPUT_CLIENT)?;
        let mut names = midi
            .ports()
            .iter()
            .map(|port| midi.port_name(port))
            .collect::<Result<Vec<_>, _>>()?;

        if cfg!(unix) {
            names.push(VIRTUAL_INPUT.to_owned());
        }

        Ok(names)
    }

    fn list_midi_outputs(&self) -> anyhow::Result<Vec<String>> {
        let midi = MidiOutput::new(OUTPUT_CLIENT)?;
        let mut names = midi
            .ports()
            .iter()
            .map(|port| midi.port_name(port))
            .collect::<Result<Vec<_>, _>>()?;

        if cfg!(unix) {
            names.push(VIRTUAL_OUTPUT.to_owned());
        }

        Ok(names)
    }

    fn open_midi_output(&self, device: &str) -> anyhow::Result<Box<dyn MidiSink + Send>> {
        let midi = MidiOutput::new(OUTPUT_CLIENT)?;

        let connection = if device == VIRTUAL_OUTPUT {
            virtual_output(midi)?
        } else {
            let ports = midi.ports();
            let Some(port) = ports
                .iter()
                .find(|port| midi.port_name(port).is_ok_and(|name| name == device))
            else {
                anyhow::bail!("Invalid port selection : {device}");
            };

            midi.connect(port, OUTPUT_CLIENT)
                .map_err(|e| anyhow::anyhow!(e.to_string()))?
        };

        log::trace!("MIDI Out connected : {device}");

        Ok(Box::new(HostMidiOutput {
            device: device.to_owned(),
            connection: Some(connection),
        }))
    }

    fn open_midi_input(&self, device: &str) -> anyhow::Result<Box<dyn MidiSource + Send>> {
        let midi = MidiInput::new(INPUT_CLIENT)?;

        let connection = if device == VIRTUAL_INPUT {
            virtual_input(midi)?
        } else {
            let ports = midi.ports();
            let Some(port) = ports
                .iter()
                .find(|port| midi.port_name(port).is_ok_and(|name| name == device))
            else {
                anyhow::bail!("Invalid port selection : {device}");
            };

            midi.connect(port, INPUT_CLIENT, on_input, ())
                .map_err(|e| anyhow::anyhow!(e.to_string()))?
        };

        log::trace!("MIDI In connected : {device}");

        Ok(Box::new(HostMidiInput {
            device: device.to_owned(),
            connection: Some(connection),
        }))
    }
}

fn on_input(timestamp: u64, bytes: &[u8], _: &mut ()) {
    log::trace!("MIDI In : [ {timestamp} ] : {bytes:02x?}");
}

#[cfg(unix)]
fn virtual_output(midi: MidiOutput) -> anyhow::Result<MidiOutputConnection> {
    use midir::os::unix::VirtualOutput;
    midi.create_virtual(OUTPUT_CLIENT)
        .map_err(|e| anyhow::anyhow!(e.to_string()))
}

#[cfg(not(unix))]
fn virtual_output(_: MidiOutput) -> anyhow::Result<MidiOutputConnection> {
    anyhow::bail!("virtual MIDI ports are not supported on this platform")
}

#[cfg(unix)]
fn virtual_input(midi: MidiInput) -> anyhow::Result<MidiInputConnection<()>> {
    use midir::os::unix::VirtualInput;
    midi.create_virtual(INPUT_CLIENT, on_input, ())
        .map_err(|e| anyhow::anyhow!(e.to_string()))
}

#[cfg(not(unix))]
fn virtual_input(_: MidiInput) -> anyhow::Result<MidiInputConnection<()>> {
    anyhow::bail!("virtual MIDI ports are not supported on this platform")
}

pub struct HostMidiOutput {
    device: String,
    connection: Option<MidiOutputConnection>,
}

impl MidiSink for HostMidiOutput {
    fn send(&mut self, command: &Command) -> Result<(), TransportError> {
        let Some(connection) = self.connection.as_mut() else {
            return Err(TransportError::Closed);
        };

        connection
            .send(&command.to_bytes())
            .map_err(|e| TransportError::Midi(e.to_string()))
    }

    fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
            log::trace!("MIDI Out closed : {}", self.device);
        }
    }
}

impl Drop for HostMidiOutput {
    fn drop(&mut self) {
        self.close();
    }
}

pub struct HostMidiInput {
    device: String,
    connection: Option<MidiInputConnection<()>>,
}

impl MidiSource for HostMidiInput {
    fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
            log::trace!("MIDI In closed : {}", self.device);
        }
    }
}

impl Drop for HostMidiInput {
    fn drop(&mut self) {
        self.close();
    }
}
