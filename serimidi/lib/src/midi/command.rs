use super::status::{CommandKind, SYSEX_END, SYSEX_START};

/// A decoded MIDI message.
///
/// Channels are zero-based (`0..=15`), 7-bit fields are `0..=127` and
/// 14-bit fields are `0..=16383`. The decoder only builds commands with
/// in-range fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    NoteOff { channel: u8, note: u8, velocity: u8 },
    NoteOn { channel: u8, note: u8, velocity: u8 },
    PolyAftertouch { channel: u8, note: u8, pressure: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, number: u8 },
    ChannelAftertouch { channel: u8, pressure: u8 },
    PitchBend { channel: u8, value: u16 },
    SongPosition { value: u16 },
    /// MTC quarter frame: `kind` is the piece number (`0..=7`), `value`
    /// the nibble it carries (`0..=15`).
    TimeCode { kind: u8, value: u8 },
    SongSelect { song: u8 },
    Clock,
    Start,
    Continue,
    Stop,
    ActiveSense,
    Reset,
    /// Payload between `F0` and `F7`, terminator excluded.
    SystemExclusive { bytes: Vec<u8> },
}

/// Center position of the pitch wheel.
pub const PITCH_BEND_CENTER: u16 = 0x2000;

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::NoteOff { .. } => CommandKind::NoteOff,
            Self::NoteOn { .. } => CommandKind::NoteOn,
            Self::PolyAftertouch { .. } => CommandKind::PolyAftertouch,
            Self::ControlChange { .. } => CommandKind::ControlChange,
            Self::ProgramChange { .. } => CommandKind::ProgramChange,
            Self::ChannelAftertouch { .. } => CommandKind::ChannelAftertouch,
            Self::PitchBend { .. } => CommandKind::PitchBend,
            Self::SongPosition { .. } => CommandKind::SongPosition,
            Self::TimeCode { .. } => CommandKind::TimeCode,
            Self::SongSelect { .. } => CommandKind::SongSelect,
            Self::Clock => CommandKind::Clock,
            Self::Start => CommandKind::Start,
            Self::Continue => CommandKind::Continue,
            Self::Stop => CommandKind::Stop,
            Self::ActiveSense => CommandKind::ActiveSense,
            Self::Reset => CommandKind::Reset,
            Self::SystemExclusive { .. } => CommandKind::SystemExclusive,
        }
    }

    pub fn channel(&self) -> Option<u8> {
        match *self {
            Self::NoteOff { channel, .. }
            | Self::NoteOn { channel, .. }
            | Self::PolyAftertouch { channel, .. }
            | Self::ControlChange { channel, .. }
            | Self::ProgramChange { channel, .. }
            | Self::ChannelAftertouch { channel, .. }
            | Self::PitchBend { channel, .. } => Some(channel),
            _ => None,
        }
    }

    /// Whether this command is sent with a payload or as its kind alone.
    pub fn has_payload(&self) -> bool {
        !self.kind().is_realtime()
    }

    /// Encode back into a raw MIDI message.
    pub fn to_bytes(&self) -> Vec<u8> {
        let status = |channel: u8| {
            self.kind()
                .status_base()
                .map(|base| base | (channel & 0x0F))
                .unwrap_or_default()
        };

        match *self {
            Self::NoteOff {
                channel,
                note,
                velocity,
            }
            | Self::NoteOn {
                channel,
                note,
                velocity,
            } => vec![status(channel), note, velocity],
            Self::PolyAftertouch {
                channel,
                note,
                pressure,
            } => vec![status(channel), note, pressure],
            Self::ControlChange {
                channel,
                controller,
                value,
            } => vec![status(channel), controller, value],
            Self::ProgramChange { channel, number } => vec![status(channel), number],
            Self::ChannelAftertouch { channel, pressure } => vec![status(channel), pressure],
            Self::PitchBend { channel, value } => {
                let [lsb, msb] = split_u14(value);
                vec![status(channel), lsb, msb]
            }
            Self::SongPosition { value } => {
                let [lsb, msb] = split_u14(value);
                vec![status(0), lsb, msb]
            }
            Self::TimeCode { kind, value } => vec![status(0), (kind << 4) | (value & 0x0F)],
            Self::SongSelect { song } => vec![status(0), song],
            Self::Clock
            | Self::Start
            | Self::Continue
            | Self::Stop
            | Self::ActiveSense
            | Self::Reset => vec![status(0)],
            Self::SystemExclusive { ref bytes } => {
                let mut raw = Vec::with_capacity(bytes.len() + 2);
                raw.push(SYSEX_START);
                raw.extend_from_slice(bytes);
                raw.push(SYSEX_END);
                raw
            }
        }
    }
}

/// Join a 14-bit value sent LSB first.
pub(crate) fn join_u14(lsb: u8, msb: u8) -> u16 {
    (u16::from(msb) << 7) | u16::from(lsb)
}

fn split_u14(value: u16) -> [u8; 2] {
    [(value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8]
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind())?;

        if let Some(channel) = self.channel() {
            write!(f, " ch:{channel}")?;
        }

        match self {
            Self::NoteOff { note, velocity, .. } | Self::NoteOn { note, velocity, .. } => {
                write!(f, " note:{note} vel:{velocity}")
            }
            Self::PolyAftertouch { note, pressure, .. } => {
                write!(f, " note:{note} pressure:{pressure}")
            }
            Self::ControlChange {
                controller, value, ..
            } => write!(f, " cc:{controller} value:{value}"),
            Self::ProgramChange { number, .. } => write!(f, " program:{number}"),
            Self::ChannelAftertouch { pressure, .. } => write!(f, " pressure:{pressure}"),
            Self::PitchBend { value, .. } => {
                write!(f, " bend:{}", i32::from(*value) - i32::from(PITCH_BEND_CENTER))
            }
            Self::SongPosition { value } => write!(f, " beats:{value}"),
            Self::TimeCode { kind, value } => write!(f, " type:{kind} value:{value}"),
            Self::SongSelect { song } => write!(f, " song:{song}"),
            Self::SystemExclusive { bytes } => write!(f, " {} bytes", bytes.len()),
            _ => Ok(()),
        }
    }
}
