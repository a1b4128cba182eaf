/// Every kind of message the bridge knows how to decode.
///
/// `Undefined` covers the reserved system status bytes, which are
/// classified but never decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    NoteOff,
    NoteOn,
    PolyAftertouch,
    ControlChange,
    ProgramChange,
    ChannelAftertouch,
    PitchBend,
    SongPosition,
    TimeCode,
    SongSelect,
    Clock,
    Start,
    Continue,
    Stop,
    ActiveSense,
    Reset,
    SystemExclusive,
    Undefined,
}

pub const SYSEX_START: u8 = 0xF0;
pub const SYSEX_END: u8 = 0xF7;

/// Channel message kinds indexed by `(status >> 4) - 8`.
const CHANNEL_KINDS: [CommandKind; 7] = [
    CommandKind::NoteOff,
    CommandKind::NoteOn,
    CommandKind::PolyAftertouch,
    CommandKind::ControlChange,
    CommandKind::ProgramChange,
    CommandKind::ChannelAftertouch,
    CommandKind::PitchBend,
];

/// System message kinds indexed by `status & 0x0F`.
const SYSTEM_KINDS: [CommandKind; 16] = [
    CommandKind::SystemExclusive,
    CommandKind::TimeCode,
    CommandKind::SongPosition,
    CommandKind::SongSelect,
    CommandKind::Undefined,
    CommandKind::Undefined,
    CommandKind::Undefined,
    CommandKind::Undefined,
    CommandKind::Clock,
    CommandKind::Undefined,
    CommandKind::Start,
    CommandKind::Continue,
    CommandKind::Stop,
    CommandKind::Undefined,
    CommandKind::ActiveSense,
    CommandKind::Reset,
];

impl CommandKind {
    /// Number of data bytes following the status byte, `None` when the
    /// length is open-ended (sysex) or meaningless (undefined).
    pub fn data_len(self) -> Option<usize> {
        match self {
            Self::NoteOff
            | Self::NoteOn
            | Self::PolyAftertouch
            | Self::ControlChange
            | Self::PitchBend
            | Self::SongPosition => Some(2),
            Self::ProgramChange | Self::ChannelAftertouch | Self::TimeCode | Self::SongSelect => {
                Some(1)
            }
            Self::Clock
            | Self::Start
            | Self::Continue
            | Self::Stop
            | Self::ActiveSense
            | Self::Reset => Some(0),
            Self::SystemExclusive | Self::Undefined => None,
        }
    }

    pub fn is_channel_message(self) -> bool {
        CHANNEL_KINDS.contains(&self)
    }

    /// Single-byte system real-time messages, which may appear anywhere
    /// in the stream, even between the bytes of another message.
    pub fn is_realtime(self) -> bool {
        matches!(
            self,
            Self::Clock | Self::Start | Self::Continue | Self::Stop | Self::ActiveSense | Self::Reset
        )
    }

    /// The status byte of this kind, with a zero channel for channel messages.
    pub fn status_base(self) -> Option<u8> {
        if let Some(index) = CHANNEL_KINDS.iter().position(|&kind| kind == self) {
            return Some(0x80 + ((index as u8) << 4));
        }

        match self {
            Self::Undefined => None,
            _ => SYSTEM_KINDS
                .iter()
                .position(|&kind| kind == self)
                .map(|index| 0xF0 | index as u8),
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NoteOff => "note off",
            Self::NoteOn => "note on",
            Self::PolyAftertouch => "poly aftertouch",
            Self::ControlChange => "control change",
            Self::ProgramChange => "program change",
            Self::ChannelAftertouch => "channel aftertouch",
            Self::PitchBend => "pitch bend",
            Self::SongPosition => "song position",
            Self::TimeCode => "time code",
            Self::SongSelect => "song select",
            Self::Clock => "clock",
            Self::Start => "start",
            Self::Continue => "continue",
            Self::Stop => "stop",
            Self::ActiveSense => "active sense",
            Self::Reset => "reset",
            Self::SystemExclusive => "sysex",
            Self::Undefined => "undefined",
        };
        f.write_str(name)
    }
}

/// A classified status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub kind: CommandKind,
    /// Zero-based channel, present for channel messages only.
    pub channel: Option<u8>,
}

impl Status {
    pub fn has_channel(&self) -> bool {
        self.channel.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{0:#04x} is a data byte, not a status byte")]
pub struct NotAStatusByte(pub u8);

/// Classify a status byte.
///
/// Bytes below `0x80` are data bytes and fail. Reserved system bytes
/// classify as [`CommandKind::Undefined`], it is up to the caller to
/// reject them.
pub fn classify(byte: u8) -> Result<Status, NotAStatusByte> {
    match byte {
        0x00..=0x7F => Err(NotAStatusByte(byte)),
        0x80..=0xEF => Ok(Status {
            kind: CHANNEL_KINDS[usize::from((byte >> 4) - 8)],
            channel: Some(byte & 0x0F),
        }),
        0xF0..=0xFF => Ok(Status {
            kind: SYSTEM_KINDS[usize::from(byte & 0x0F)],
            channel: None,
        }),
    }
}
