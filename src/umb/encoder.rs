//! # UMB Request Encoder
//!
//! Encodes online data requests for one or more measurement channels.

use super::address::{encode_address, Address};
use super::crc::crc16;
use super::protocol::*;

/// One encoded request frame plus what it asked for
///
/// The target address, sender and channel list are kept so the matching
/// response can be validated against the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    target: Address,
    sender: Address,
    command: Command,
    channels: Vec<u16>,
    bytes: Vec<u8>,
}

impl RequestFrame {
    /// Complete wire frame
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn target(&self) -> Address {
        self.target
    }

    pub fn sender(&self) -> Address {
        self.sender
    }

    pub fn command(&self) -> Command {
        self.command
    }

    /// Channels requested by this frame, in wire order
    pub fn channels(&self) -> &[u16] {
        &self.channels
    }
}

/// Encode an online data request for a device
///
/// Requests of more than 100 channels are split into consecutive frames of
/// at most 100 channels each, all addressed identically. An empty channel
/// list encodes to no frames.
///
/// # Arguments
///
/// * `device_id` - 12-bit device id (masked)
/// * `class` - 4-bit device class (masked)
/// * `channels` - Channel ids to query
///
/// # Returns
///
/// * `Vec<RequestFrame>` - Frames in channel order
///
/// # Examples
///
/// ```
/// use umb_poller::umb::encoder::encode_request;
///
/// let frames = encode_request(1, 4, &[151]);
/// assert_eq!(
///     frames[0].as_bytes(),
///     &[0x01, 0x10, 0x01, 0x40, 0x01, 0xF0, 0x04, 0x02, 0x23, 0x10, 0x97, 0x00, 0x03, 0xD6, 0xC4, 0x04]
/// );
/// ```
pub fn encode_request(device_id: u16, class: u16, channels: &[u16]) -> Vec<RequestFrame> {
    encode_request_to(Address::new(device_id, class), channels)
}

/// Encode an online data request for an already packed address
pub fn encode_request_to(target: Address, channels: &[u16]) -> Vec<RequestFrame> {
    channels
        .chunks(UMB_MAX_CHANNELS_PER_FRAME)
        .map(|chunk| encode_frame(target, chunk))
        .collect()
}

/// Encode one frame of at most 100 channels
fn encode_frame(target: Address, channels: &[u16]) -> RequestFrame {
    let command = if channels.len() == 1 {
        Command::OnlineData
    } else {
        Command::MultiOnlineData
    };

    let mut payload = Vec::with_capacity(1 + 2 * channels.len());
    if command == Command::MultiOnlineData {
        payload.push(channels.len() as u8);
    }
    for channel in channels {
        payload.extend_from_slice(&channel.to_le_bytes());
    }

    RequestFrame {
        target,
        sender: UMB_MASTER_ADDRESS,
        command,
        channels: channels.to_vec(),
        bytes: assemble_frame(target, UMB_MASTER_ADDRESS, command, &payload),
    }
}

/// Assemble a complete frame around a command payload
///
/// `payload` is everything between `Verc` and `ETX`: the channel ids of a
/// request, or the status byte and records of a response. `Len` is set to
/// `payload.len() + 2` and the CRC covers SOH through ETX.
///
/// # Examples
///
/// ```
/// use umb_poller::umb::address::Address;
/// use umb_poller::umb::encoder::assemble_frame;
/// use umb_poller::umb::protocol::{Command, UMB_MASTER_ADDRESS};
///
/// // Response of an ARS31 to the master: status 0, channel 151, float -18.8
/// let frame = assemble_frame(
///     UMB_MASTER_ADDRESS,
///     Address::new(1, 4),
///     Command::OnlineData,
///     &[0x00, 0x97, 0x00, 0x16, 0x66, 0x66, 0x96, 0xC1],
/// );
/// assert_eq!(&frame[frame.len() - 4..], &[0x03, 0xFF, 0xEA, 0x04]);
/// ```
pub fn assemble_frame(to: Address, from: Address, command: Command, payload: &[u8]) -> Vec<u8> {
    let len = 2 + payload.len();

    let mut frame = Vec::with_capacity(len + UMB_FRAME_OVERHEAD);
    frame.push(UMB_SOH);
    frame.push(UMB_HEADER_VERSION);
    frame.extend_from_slice(&to.to_le_bytes());
    frame.extend_from_slice(&from.to_le_bytes());
    frame.push(len as u8);
    frame.push(UMB_STX);
    frame.push(command.code());
    frame.push(command.version());
    frame.extend_from_slice(payload);
    frame.push(UMB_ETX);

    let crc = crc16(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame.push(UMB_EOT);

    frame
}

/// ASCII protocol command that switches a device to the binary protocol
///
/// # Examples
///
/// ```
/// use umb_poller::umb::encoder::ascii_to_binary_command;
///
/// assert_eq!(ascii_to_binary_command(1, 7), b"& 28673 X\r".to_vec());
/// ```
pub fn ascii_to_binary_command(device_id: u16, class: u16) -> Vec<u8> {
    format!("& {} X\r", encode_address(device_id, class)).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_empty_request() {
        assert!(encode_request(1, 4, &[]).is_empty());
    }

    #[test]
    fn test_encode_single_channel_reference() {
        let frames = encode_request(1, DeviceClass::Ars31Ars31Pro.class(), &[151]);

        assert_eq!(frames.len(), 1);
        assert_eq!(
            frames[0].as_bytes(),
            &[
                0x01, 0x10, 0x01, 0x40, 0x01, 0xF0, 0x04, 0x02, 0x23, 0x10, 0x97, 0x00, 0x03,
                0xD6, 0xC4, 0x04
            ]
        );
        assert_eq!(frames[0].command(), Command::OnlineData);
        assert_eq!(frames[0].channels(), &[151]);
        assert_eq!(frames[0].target().raw(), 0x4001);
        assert_eq!(frames[0].sender(), UMB_MASTER_ADDRESS);
    }

    #[test]
    fn test_encode_multi_channel_structure() {
        let frames = encode_request(1, 7, &[100, 200, 4630]);
        let frame = frames[0].as_bytes();

        // Len = Cmd + Verc + count + 3 * 2
        assert_eq!(frame[UMB_LEN_OFFSET], 9);
        assert_eq!(frame.len(), 9 + UMB_FRAME_OVERHEAD);
        assert_eq!(frame[8], UMB_CMD_MULTI_ONLINE_DATA);
        assert_eq!(frame[9], UMB_CMD_VERSION);
        assert_eq!(frame[10], 3);
        assert_eq!(&frame[11..17], &[0x64, 0x00, 0xC8, 0x00, 0x16, 0x12]);
        assert_eq!(frame[17], UMB_ETX);
        assert_eq!(frame[frame.len() - 1], UMB_EOT);

        let crc = u16::from_le_bytes([frame[18], frame[19]]);
        assert_eq!(crc, crc16(&frame[..18]));
    }

    #[test]
    fn test_frame_length_invariant() {
        for count in [1usize, 2, 50, 100] {
            let channels: Vec<u16> = (0..count as u16).collect();
            let frames = encode_request(3, 2, &channels);
            let frame = frames[0].as_bytes();
            assert_eq!(frame.len(), frame[UMB_LEN_OFFSET] as usize + UMB_FRAME_OVERHEAD);
        }
    }

    #[test]
    fn test_encode_splits_large_requests() {
        let channels: Vec<u16> = (1000..1250).collect();
        let frames = encode_request(1, 7, &channels);

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].channels().len(), 100);
        assert_eq!(frames[1].channels().len(), 100);
        assert_eq!(frames[2].channels().len(), 50);

        let joined: Vec<u16> = frames.iter().flat_map(|f| f.channels().to_vec()).collect();
        assert_eq!(joined, channels);

        for frame in &frames {
            assert_eq!(&frame.as_bytes()[2..4], &[0x01, 0x70]);
        }
    }

    #[test]
    fn test_split_remainder_of_one_uses_single_command() {
        let channels: Vec<u16> = (0..101).collect();
        let frames = encode_request(1, 7, &channels);

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].command(), Command::MultiOnlineData);
        assert_eq!(frames[1].command(), Command::OnlineData);
        assert_eq!(frames[1].channels(), &[100]);
    }

    #[test]
    fn test_ascii_to_binary_command() {
        assert_eq!(ascii_to_binary_command(1, 4), b"& 16385 X\r".to_vec());
    }
}
