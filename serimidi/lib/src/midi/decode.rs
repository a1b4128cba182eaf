use super::{
    command::{join_u14, Command},
    status::{classify, CommandKind, SYSEX_END},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("empty message")]
    EmptyMessage,
    #[error("unknown status byte {0:#04x}")]
    UnknownStatus(u8),
    #[error("truncated {kind} message : expected {expected} data bytes, found {found}")]
    TruncatedMessage {
        kind: CommandKind,
        expected: usize,
        found: usize,
    },
    #[error("invalid data byte {byte:#04x} at index {index}")]
    InvalidDataByte { index: usize, byte: u8 },
}

/// Decode one complete raw MIDI message.
///
/// Fixed-length messages ignore any bytes past their data length. Sysex
/// takes every remaining byte, minus a trailing `F7` terminator.
pub fn decode(bytes: &[u8]) -> Result<Command, DecodeError> {
    let (&status_byte, data) = bytes.split_first().ok_or(DecodeError::EmptyMessage)?;

    let status = classify(status_byte).map_err(|_| DecodeError::UnknownStatus(status_byte))?;

    if status.kind == CommandKind::SystemExclusive {
        let payload = data.strip_suffix(&[SYSEX_END]).unwrap_or(data);
        return Ok(Command::SystemExclusive {
            bytes: data_bytes(payload)?.to_vec(),
        });
    }

    let Some(expected) = status.kind.data_len() else {
        return Err(DecodeError::UnknownStatus(status_byte));
    };

    if data.len() < expected {
        return Err(DecodeError::TruncatedMessage {
            kind: status.kind,
            expected,
            found: data.len(),
        });
    }

    let data = data_bytes(&data[..expected])?;
    let channel = status.channel.unwrap_or_default();

    let command = match status.kind {
        CommandKind::NoteOff => Command::NoteOff {
            channel,
            note: data[0],
            velocity: data[1],
        },
        CommandKind::NoteOn => Command::NoteOn {
            channel,
            note: data[0],
            velocity: data[1],
        },
        CommandKind::PolyAftertouch => Command::PolyAftertouch {
            channel,
            note: data[0],
            pressure: data[1],
        },
        CommandKind::ControlChange => Command::ControlChange {
            channel,
            controller: data[0],
            value: data[1],
        },
        CommandKind::ProgramChange => Command::ProgramChange {
            channel,
            number: data[0],
        },
        CommandKind::ChannelAftertouch => Command::ChannelAftertouch {
            channel,
            pressure: data[0],
        },
        CommandKind::PitchBend => Command::PitchBend {
            channel,
            value: join_u14(data[0], data[1]),
        },
        CommandKind::SongPosition => Command::SongPosition {
            value: join_u14(data[0], data[1]),
        },
        CommandKind::TimeCode => Command::TimeCode {
            kind: data[0] >> 4,
            value: data[0] & 0x0F,
        },
        CommandKind::SongSelect => Command::SongSelect { song: data[0] },
        CommandKind::Clock => Command::Clock,
        CommandKind::Start => Command::Start,
        CommandKind::Continue => Command::Continue,
        CommandKind::Stop => Command::Stop,
        CommandKind::ActiveSense => Command::ActiveSense,
        CommandKind::Reset => Command::Reset,
        CommandKind::SystemExclusive | CommandKind::Undefined => {
            return Err(DecodeError::UnknownStatus(status_byte))
        }
    };

    Ok(command)
}

/// Check every byte is a 7-bit data byte. Indices in errors are relative
/// to the whole message, status byte included.
fn data_bytes(data: &[u8]) -> Result<&[u8], DecodeError> {
    match data.iter().position(|byte| byte & 0x80 != 0) {
        Some(index) => Err(DecodeError::InvalidDataByte {
            index: index + 1,
            byte: data[index],
        }),
        None => Ok(data),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn note_on_on_the_first_channel() {
        assert_eq!(
            decode(&[0x90, 64, 100]).unwrap(),
            Command::NoteOn {
                channel: 0,
                note: 64,
                velocity: 100
            }
        );
    }

    #[test]
    fn note_on_on_the_last_channel() {
        assert_eq!(decode(&[0x9F, 64, 100]).unwrap().channel(), Some(15));
    }

    #[test]
    fn control_change() {
        assert_eq!(
            decode(&[0xB2, 7, 127]).unwrap(),
            Command::ControlChange {
                channel: 2,
                controller: 7,
                value: 127
            }
        );
    }

    #[test]
    fn sysex_takes_every_remaining_byte() {
        assert_eq!(
            decode(&[0xF0, 1, 2, 3]).unwrap(),
            Command::SystemExclusive {
                bytes: vec![1, 2, 3]
            }
        );
        assert_eq!(
            decode(&[0xF0]).unwrap(),
            Command::SystemExclusive { bytes: vec![] }
        );
    }

    #[test]
    fn sysex_terminator_is_not_part_of_the_payload() {
        assert_eq!(
            decode(&[0xF0, 0x43, 0x10, 0xF7]).unwrap(),
            Command::SystemExclusive {
                bytes: vec![0x43, 0x10]
            }
        );
    }

    #[test]
    fn missing_data_bytes_are_truncated_messages() {
        assert_eq!(
            decode(&[0x90, 64]),
            Err(DecodeError::TruncatedMessage {
                kind: CommandKind::NoteOn,
                expected: 2,
                found: 1
            })
        );
        assert!(matches!(
            decode(&[0xF2, 1]),
            Err(DecodeError::TruncatedMessage { .. })
        ));
        assert!(matches!(
            decode(&[0xC0]),
            Err(DecodeError::TruncatedMessage { .. })
        ));
    }

    #[test]
    fn empty_messages_fail() {
        assert_eq!(decode(&[]), Err(DecodeError::EmptyMessage));
    }

    #[test]
    fn undefined_and_data_status_bytes_are_unknown() {
        for status in [0xF4, 0xF5, 0xF6, 0xF7, 0xF9, 0xFD, 0x00, 0x45] {
            assert_eq!(
                decode(&[status, 0, 0]),
                Err(DecodeError::UnknownStatus(status))
            );
        }
    }

    #[test]
    fn out_of_range_data_bytes_are_rejected() {
        assert_eq!(
            decode(&[0x90, 64, 200]),
            Err(DecodeError::InvalidDataByte {
                index: 2,
                byte: 200
            })
        );
        assert_eq!(
            decode(&[0xF0, 1, 0x80, 0xF7]),
            Err(DecodeError::InvalidDataByte {
                index: 2,
                byte: 0x80
            })
        );
    }

    #[test]
    fn pitch_bend_reads_both_data_bytes() {
        assert_eq!(
            decode(&[0xE3, 0x00, 0x40]).unwrap(),
            Command::PitchBend {
                channel: 3,
                value: 0x2000
            }
        );
        assert_eq!(
            decode(&[0xE0, 0x7F, 0x7F]).unwrap(),
            Command::PitchBend {
                channel: 0,
                value: 0x3FFF
            }
        );
    }

    #[test]
    fn time_code_splits_the_quarter_frame() {
        assert_eq!(
            decode(&[0xF1, 0x73]).unwrap(),
            Command::TimeCode { kind: 7, value: 3 }
        );
    }

    #[test]
    fn trailing_bytes_after_a_fixed_length_message_are_ignored() {
        assert_eq!(decode(&[0xF8, 0x00, 0x00]).unwrap(), Command::Clock);
        assert_eq!(
            decode(&[0xC5, 10, 11]).unwrap(),
            Command::ProgramChange {
                channel: 5,
                number: 10
            }
        );
    }

    #[test]
    fn every_command_survives_an_encoding_round_trip() {
        let commands = vec![
            Command::NoteOff {
                channel: 1,
                note: 2,
                velocity: 3,
            },
            Command::NoteOn {
                channel: 15,
                note: 127,
                velocity: 0,
            },
            Command::PolyAftertouch {
                channel: 4,
                note: 60,
                pressure: 90,
            },
            Command::ControlChange {
                channel: 2,
                controller: 7,
                value: 127,
            },
            Command::ProgramChange {
                channel: 9,
                number: 42,
            },
            Command::ChannelAftertouch {
                channel: 0,
                pressure: 33,
            },
            Command::PitchBend {
                channel: 7,
                value: 16383,
            },
            Command::SongPosition { value: 1234 },
            Command::TimeCode { kind: 5, value: 15 },
            Command::SongSelect { song: 12 },
            Command::Clock,
            Command::Start,
            Command::Continue,
            Command::Stop,
            Command::ActiveSense,
            Command::Reset,
            Command::SystemExclusive {
                bytes: vec![0x7E, 0x7F, 0x06, 0x01],
            },
            Command::SystemExclusive { bytes: vec![] },
        ];

        for command in commands {
            assert_eq!(decode(&command.to_bytes()).unwrap(), command);
        }
    }
}
