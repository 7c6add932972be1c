//! # UMB Response Decoder
//!
//! Validates response frames and decodes their channel records.
//!
//! Validation fails fast in a fixed order: empty frame, SOH/EOT framing,
//! length field, CRC, echoed address (single-channel responses), frame
//! status, command. Any of these rejects the whole frame. Past that point,
//! errors belong to individual channel records and are reported next to the
//! records that decoded successfully.

use tracing::trace;

use super::address::Address;
use super::crc::crc16;
use super::encoder::RequestFrame;
use super::protocol::*;
use super::status::{describe, STATUS_OK};
use super::value::{decode_typed, Value};
use crate::error::{ChannelError, FrameError};

/// A successfully decoded channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelReading {
    pub channel: u16,
    pub data_type: DataType,
    pub value: Value,
}

/// Outcome for one channel record
pub type ChannelResult = std::result::Result<ChannelReading, ChannelError>;

/// How the walk over a response's records ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordsEnd {
    /// Single-channel response: exactly one record by construction
    Single,
    /// A record length of 0 marked the end
    EndMarker,
    /// The cursor reached the trailer
    Exhausted,
    /// A record claimed more bytes than the frame holds
    Truncated,
}

/// A structurally valid response
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Device id of the responding device
    pub device_id: u16,
    /// Class of the responding device
    pub class: u16,
    pub command: Command,
    /// Record count announced by a multi-channel response
    pub declared_count: Option<u8>,
    pub records: Vec<ChannelResult>,
    pub end: RecordsEnd,
}

impl Response {
    /// Successfully decoded channels
    pub fn readings(&self) -> impl Iterator<Item = &ChannelReading> {
        self.records.iter().filter_map(|record| record.as_ref().ok())
    }

    /// Per-channel errors
    pub fn channel_errors(&self) -> impl Iterator<Item = &ChannelError> {
        self.records.iter().filter_map(|record| record.as_ref().err())
    }
}

/// Parse and validate a response frame
///
/// # Arguments
///
/// * `frame` - Complete response frame (SOH through EOT)
/// * `expected_to` - Target address of the request that was sent
/// * `expected_from` - Sender address of the request that was sent
///
/// # Returns
///
/// * `Result<Response, FrameError>` - Decoded records, or the frame-level
///   rejection
///
/// # Errors
///
/// Returns the first failing check of: `EmptyFrame`, `UnframedPacket`,
/// `LengthMismatch`, `ChecksumMismatch`, `AddressMismatch` (single-channel
/// responses only), `DeviceStatus`, `UnknownCommand`.
///
/// A frame shorter than 15 bytes has no room for `Cmd`, `Verc` and `Status`
/// and is rejected with a frame-level `LengthMismatch`, for single-channel
/// responses too. A single-channel frame that holds the status but not the
/// channel id and type (15 to 17 bytes) passes and carries a record-level
/// `LengthMismatch` instead.
///
/// # Examples
///
/// ```
/// use umb_poller::umb::address::Address;
/// use umb_poller::umb::decoder::parse_response;
/// use umb_poller::umb::protocol::UMB_MASTER_ADDRESS;
/// use umb_poller::umb::value::Value;
///
/// let frame = [
///     0x01, 0x10, 0x01, 0xF0, 0x01, 0x40, 0x0A, 0x02, 0x23, 0x10, 0x00, 0x97, 0x00, 0x16,
///     0x66, 0x66, 0x96, 0xC1, 0x03, 0xFF, 0xEA, 0x04,
/// ];
/// let response = parse_response(&frame, Address::new(1, 4), UMB_MASTER_ADDRESS).unwrap();
/// let reading = response.records[0].as_ref().unwrap();
/// assert_eq!(reading.channel, 151);
/// assert!(matches!(reading.value, Value::F32(v) if (v + 18.8).abs() < 0.001));
/// ```
pub fn parse_response(
    frame: &[u8],
    expected_to: Address,
    expected_from: Address,
) -> Result<Response, FrameError> {
    let len = frame.len();

    if len < 2 {
        return Err(FrameError::EmptyFrame);
    }

    if frame[0] != UMB_SOH || frame[len - 1] != UMB_EOT {
        return Err(FrameError::UnframedPacket);
    }

    let expected_len = expected_frame_len(frame).ok_or(FrameError::LengthMismatch {
        expected: UMB_FRAME_OVERHEAD,
        actual: len,
    })?;
    if len != expected_len {
        return Err(FrameError::LengthMismatch {
            expected: expected_len,
            actual: len,
        });
    }

    let calculated_crc = crc16(&frame[..len - 3]);
    let received_crc = u16::from_le_bytes([frame[len - 3], frame[len - 2]]);
    if calculated_crc != received_crc {
        return Err(FrameError::ChecksumMismatch {
            expected: calculated_crc,
            actual: received_crc,
        });
    }

    // Cmd, Verc and Status must fit in front of the trailer
    if len < UMB_MIN_RESPONSE_SIZE {
        return Err(FrameError::LengthMismatch {
            expected: UMB_MIN_RESPONSE_SIZE,
            actual: len,
        });
    }

    let to = Address::from_le_bytes([frame[2], frame[3]]);
    let from = Address::from_le_bytes([frame[4], frame[5]]);
    let cmd = frame[UMB_CMD_OFFSET];
    let verc = frame[UMB_CMD_OFFSET + 1];
    let command = Command::from_bytes(cmd, verc);

    // The device answers with the request's addresses swapped
    if command == Some(Command::OnlineData) && (to != expected_from || from != expected_to) {
        return Err(FrameError::AddressMismatch {
            to: to.raw(),
            from: from.raw(),
        });
    }

    let status = frame[UMB_STATUS_OFFSET];
    if status != STATUS_OK {
        return Err(FrameError::DeviceStatus {
            code: status,
            description: describe(status).into_owned(),
        });
    }

    let command = command.ok_or(FrameError::UnknownCommand { cmd, verc })?;
    let body = &frame[UMB_RESPONSE_BODY_OFFSET..len - UMB_TRAILER_SIZE];

    let (declared_count, records, end) = match command {
        Command::OnlineData => (None, vec![decode_single(body)], RecordsEnd::Single),
        Command::MultiOnlineData => {
            let (&count, records) = body.split_first().ok_or(FrameError::LengthMismatch {
                expected: UMB_MIN_RESPONSE_SIZE + 1,
                actual: len,
            })?;
            let (results, end) = walk_records(records);
            (Some(count), results, end)
        }
    };

    trace!(
        "Parsed response from {} ({} records, {:?})",
        from,
        records.len(),
        end
    );

    Ok(Response {
        device_id: from.device_id(),
        class: from.class(),
        command,
        declared_count,
        records,
        end,
    })
}

impl RequestFrame {
    /// Parse the response to this request
    ///
    /// On top of [`parse_response`], checks that the response answers this
    /// request: same command, the announced record count equals the number
    /// of requested channels, and each record carries the channel requested
    /// at its position. Requested channels past the last record get a
    /// `Missing` error, so `records` always lines up with the request.
    ///
    /// # Errors
    ///
    /// Returns any [`parse_response`] error, `UnknownCommand` if the command
    /// differs from the request's, or `ChannelCountMismatch`.
    pub fn parse_response(&self, frame: &[u8]) -> Result<Response, FrameError> {
        let mut response = parse_response(frame, self.target(), self.sender())?;

        if response.command != self.command() {
            return Err(FrameError::UnknownCommand {
                cmd: response.command.code(),
                verc: response.command.version(),
            });
        }

        if let Some(count) = response.declared_count {
            if count as usize != self.channels().len() {
                return Err(FrameError::ChannelCountMismatch {
                    expected: self.channels().len(),
                    actual: count as usize,
                });
            }
        }

        for (record, &expected) in response.records.iter_mut().zip(self.channels()) {
            let actual = match record {
                Ok(reading) if reading.channel != expected => reading.channel,
                _ => continue,
            };
            *record = Err(ChannelError::ChannelMismatch { expected, actual });
        }

        // The walk can stop early at an end marker or the trailer
        let answered = response.records.len();
        response.records.extend(
            self.channels()
                .iter()
                .skip(answered)
                .map(|&channel| Err(ChannelError::Missing { channel })),
        );

        Ok(response)
    }
}

/// Decode the body of a single-channel response: channel(2) type(1) value
fn decode_single(body: &[u8]) -> ChannelResult {
    if body.len() < 3 {
        return Err(ChannelError::LengthMismatch {
            needed: 3,
            available: body.len(),
        });
    }

    let channel = u16::from_le_bytes([body[0], body[1]]);
    decode_value(channel, body[2], &body[3..])
}

/// Walk length-prefixed records: RecLen(1) Status(1) Channel(2) Type(1) Value
fn walk_records(records: &[u8]) -> (Vec<ChannelResult>, RecordsEnd) {
    let mut results = Vec::new();
    let mut cursor = 0;

    loop {
        let Some(&record_len) = records.get(cursor) else {
            return (results, RecordsEnd::Exhausted);
        };

        if record_len == 0 {
            return (results, RecordsEnd::EndMarker);
        }

        let start = cursor + 1;
        let end = start + record_len as usize;
        if end > records.len() {
            results.push(Err(ChannelError::LengthMismatch {
                needed: record_len as usize,
                available: records.len() - start,
            }));
            return (results, RecordsEnd::Truncated);
        }

        results.push(decode_record(&records[start..end]));
        cursor = end;
    }
}

/// Decode one record body (Status onwards); never empty
fn decode_record(record: &[u8]) -> ChannelResult {
    let status = record[0];
    let channel = (record.len() >= 3).then(|| u16::from_le_bytes([record[1], record[2]]));

    if status != STATUS_OK {
        return Err(ChannelError::DeviceStatus {
            channel,
            code: status,
            description: describe(status).into_owned(),
        });
    }

    match channel {
        Some(channel) if record.len() >= 4 => decode_value(channel, record[3], &record[4..]),
        _ => Err(ChannelError::LengthMismatch {
            needed: 4,
            available: record.len(),
        }),
    }
}

fn decode_value(channel: u16, type_tag: u8, bytes: &[u8]) -> ChannelResult {
    let data_type = DataType::try_from(type_tag)
        .map_err(|type_tag| ChannelError::UnknownChannelType { channel, type_tag })?;

    Ok(ChannelReading {
        channel,
        data_type,
        value: decode_typed(data_type, bytes),
    })
}
