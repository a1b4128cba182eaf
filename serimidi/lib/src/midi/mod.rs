mod command;
mod decode;
mod framing;
mod status;

#[cfg(feature = "host")]
mod host;

pub use command::*;
pub use decode::*;
pub use framing::*;
pub use status::*;

#[cfg(feature = "host")]
pub use host::*;

use crate::transport::TransportError;

/// Device id that asks for a virtual MIDI input instead of a hardware one.
pub const VIRTUAL_INPUT: &str = "__virtualInput";
/// Device id that asks for a virtual MIDI output instead of a hardware one.
pub const VIRTUAL_OUTPUT: &str = "__virtualOutput";

/// Somewhere to send decoded commands, usually an open MIDI output port.
#[cfg_attr(test, mockall::automock)]
pub trait MidiSink {
    /// Send one command. Commands without a payload go out as their kind alone.
    fn send(&mut self, command: &Command) -> Result<(), TransportError>;

    /// Release the underlying port. Closing twice is a no-op.
    fn close(&mut self);
}

/// An open MIDI input. The bridge keeps it open for the lifetime of a
/// binding but does not route anything from it.
pub trait MidiSource {
    /// Release the underlying port. Closing twice is a no-op.
    fn close(&mut self);
}

pub trait MidiDeviceProvider {
    fn list_midi_inputs(&self) -> anyhow::Result<Vec<String>>;

    fn list_midi_outputs(&self) -> anyhow::Result<Vec<String>>;

    fn open_midi_output(&self, device: &str) -> anyhow::Result<Box<dyn MidiSink + Send>>;

    fn open_midi_input(&self, device: &str) -> anyhow::Result<Box<dyn MidiSource + Send>>;
}
