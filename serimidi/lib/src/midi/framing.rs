use super::status::{classify, CommandKind, SYSEX_END, SYSEX_START};

pub const DEFAULT_MAX_SYSEX_LEN: usize = 4096;
const MIN_FIXED_SYSEX_LEN: usize = 2;

/// How the end of a system-exclusive message is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SysexFraming {
    /// Sysex ends at the first `F7`.
    #[default]
    Terminated,
    /// Sysex frames are exactly this many bytes long, `F0` included.
    /// An `F7` still ends a frame early. Lengths below 2 count as 2, so a
    /// frame always carries at least one data byte.
    FixedLength(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramingConfig {
    pub sysex: SysexFraming,
    /// Accept data bytes that repeat the previous channel message
    /// without its status byte.
    pub running_status: bool,
    pub max_sysex_len: usize,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            sysex: SysexFraming::default(),
            running_status: false,
            max_sysex_len: DEFAULT_MAX_SYSEX_LEN,
        }
    }
}

/// Bytes were dropped while framing. The reader has already
/// resynchronized when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    #[error("framing desync : dropped {0:#04x}")]
    Desync(u8),
    #[error("sysex longer than {0} bytes dropped")]
    SysexOverflow(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Message { len: usize },
    Sysex,
    /// Swallow the rest of an oversized sysex.
    SkippingSysex,
}

/// Splits a raw MIDI byte stream into frames, one message per frame.
///
/// Real-time bytes are emitted as soon as they arrive, even in the middle
/// of another message, which is then completed by the bytes that follow.
#[derive(Debug)]
pub struct FrameReader {
    config: FramingConfig,
    state: State,
    buffer: Vec<u8>,
    running_status: Option<(u8, usize)>,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new(FramingConfig::default())
    }
}

impl FrameReader {
    pub fn new(config: FramingConfig) -> Self {
        Self {
            config,
            state: State::Idle,
            buffer: Vec::with_capacity(3),
            running_status: None,
        }
    }

    pub fn config(&self) -> &FramingConfig {
        &self.config
    }

    /// Drop any partially received frame.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.buffer.clear();
        self.running_status = None;
    }

    /// Feed one byte, returning a frame once one is complete.
    pub fn push(&mut self, byte: u8) -> Result<Option<Vec<u8>>, FramingError> {
        match byte {
            0xF8..=0xFF => Self::push_realtime(byte),
            SYSEX_END => self.push_sysex_end(),
            0x80..=0xF6 => self.push_status(byte),
            _ => self.push_data(byte),
        }
    }

    /// Feed a chunk of bytes, yielding frames and framing errors in order.
    pub fn extend<'a>(
        &'a mut self,
        bytes: &'a [u8],
    ) -> impl Iterator<Item = Result<Vec<u8>, FramingError>> + 'a {
        bytes
            .iter()
            .filter_map(move |&byte| self.push(byte).transpose())
    }

    fn push_realtime(byte: u8) -> Result<Option<Vec<u8>>, FramingError> {
        match classify(byte) {
            Ok(status) if status.kind != CommandKind::Undefined => Ok(Some(vec![byte])),
            _ => Err(FramingError::Desync(byte)),
        }
    }

    fn push_sysex_end(&mut self) -> Result<Option<Vec<u8>>, FramingError> {
        match self.state {
            State::Sysex => {
                self.buffer.push(SYSEX_END);
                Ok(Some(self.take_frame()))
            }
            State::SkippingSysex => {
                self.state = State::Idle;
                Ok(None)
            }
            _ => {
                self.reset();
                Err(FramingError::Desync(SYSEX_END))
            }
        }
    }

    fn push_status(&mut self, byte: u8) -> Result<Option<Vec<u8>>, FramingError> {
        // A status byte ends an open sysex and cancels a partial message.
        let interrupted = match self.state {
            State::Sysex => Ok(Some(self.take_frame())),
            State::Message { .. } => Err(FramingError::Desync(self.buffer[0])),
            State::Idle | State::SkippingSysex => Ok(None),
        };

        self.reset();

        let kind = match classify(byte) {
            Ok(status) => status.kind,
            Err(_) => CommandKind::Undefined,
        };

        match kind {
            CommandKind::Undefined => {
                return match interrupted {
                    Ok(Some(frame)) => Ok(Some(frame)),
                    _ => Err(FramingError::Desync(byte)),
                }
            }
            CommandKind::SystemExclusive => {
                self.state = State::Sysex;
                self.buffer.push(SYSEX_START);
            }
            kind => {
                let len = 1 + kind.data_len().unwrap_or_default();
                self.state = State::Message { len };
                self.buffer.push(byte);
                if kind.is_channel_message() {
                    self.running_status = Some((byte, len));
                }
            }
        }

        interrupted
    }

    fn push_data(&mut self, byte: u8) -> Result<Option<Vec<u8>>, FramingError> {
        match self.state {
            State::Sysex => {
                if self.buffer.len() >= self.config.max_sysex_len {
                    self.buffer.clear();
                    self.state = State::SkippingSysex;
                    return Err(FramingError::SysexOverflow(self.config.max_sysex_len));
                }

                self.buffer.push(byte);
                Ok(self.sysex_is_full().then(|| self.take_frame()))
            }
            State::SkippingSysex => Ok(None),
            State::Message { len } => {
                self.buffer.push(byte);
                Ok((self.buffer.len() >= len).then(|| self.take_frame()))
            }
            State::Idle => match self.running_status {
                Some((status, len)) if self.config.running_status => {
                    self.buffer.push(status);
                    self.buffer.push(byte);
                    self.state = State::Message { len };
                    Ok((self.buffer.len() >= len).then(|| self.take_frame()))
                }
                _ => Err(FramingError::Desync(byte)),
            },
        }
    }

    fn sysex_is_full(&self) -> bool {
        match self.config.sysex {
            SysexFraming::FixedLength(len) => self.buffer.len() >= len.max(MIN_FIXED_SYSEX_LEN),
            SysexFraming::Terminated => false,
        }
    }

    fn take_frame(&mut self) -> Vec<u8> {
        self.state = State::Idle;
        std::mem::replace(&mut self.buffer, Vec::with_capacity(3))
    }
}
