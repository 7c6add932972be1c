//! # UMB Protocol Constants and Types
//!
//! Core protocol definitions for the UMB binary frame format.
//!
//! ```text
//! Offset  Field   Size
//! 0       SOH     1     0x01
//! 1       Ver     1     0x10
//! 2-3     To      2     (class << 12) | device_id, LE
//! 4-5     From    2     LE
//! 6       Len     1     bytes from Cmd up to ETX; total = Len + 12
//! 7       STX     1     0x02
//! 8       Cmd     1
//! 9       Verc    1
//! 10      Status  1     responses only
//! 11..    body
//! len-4   ETX     1     0x03
//! len-3   Crc     2     CRC-16 of bytes[0..len-3], LE
//! len-1   EOT     1     0x04
//! ```

use super::address::Address;

/// Start of frame
pub const UMB_SOH: u8 = 0x01;

/// Header version
pub const UMB_HEADER_VERSION: u8 = 0x10;

/// Start of transmission
pub const UMB_STX: u8 = 0x02;

/// End of transmission
pub const UMB_ETX: u8 = 0x03;

/// End of frame
pub const UMB_EOT: u8 = 0x04;

/// Sender address used for requests (class 15, id 1: PC master)
pub const UMB_MASTER_ADDRESS: Address = Address::from_raw(0xF001);

/// Online data request, one channel
pub const UMB_CMD_ONLINE_DATA: u8 = 0x23;

/// Online data request, several channels
pub const UMB_CMD_MULTI_ONLINE_DATA: u8 = 0x2F;

/// Command version for both online data requests
pub const UMB_CMD_VERSION: u8 = 0x10;

/// Bytes outside the `Len` span: SOH Ver To(2) From(2) Len STX + ETX Crc(2) EOT
pub const UMB_FRAME_OVERHEAD: usize = 12;

/// Bytes after the body: ETX Crc(2) EOT
pub const UMB_TRAILER_SIZE: usize = 4;

/// Offset of the `Len` byte
pub const UMB_LEN_OFFSET: usize = 6;

/// Offset of the command byte
pub const UMB_CMD_OFFSET: usize = 8;

/// Offset of the response status byte
pub const UMB_STATUS_OFFSET: usize = 10;

/// Offset of the first body byte after the status in a response
pub const UMB_RESPONSE_BODY_OFFSET: usize = 11;

/// Smallest frame that carries Cmd, Verc and Status
pub const UMB_MIN_RESPONSE_SIZE: usize = UMB_STATUS_OFFSET + 1 + UMB_TRAILER_SIZE;

/// Maximum number of channels in one multi-channel request
pub const UMB_MAX_CHANNELS_PER_FRAME: usize = 100;

/// Command variant of a request or response frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `0x23`: one channel
    OnlineData,
    /// `0x2F`: up to 100 channels
    MultiOnlineData,
}

impl Command {
    /// Identify a `(Cmd, Verc)` byte pair
    pub fn from_bytes(cmd: u8, verc: u8) -> Option<Self> {
        match (cmd, verc) {
            (UMB_CMD_ONLINE_DATA, UMB_CMD_VERSION) => Some(Command::OnlineData),
            (UMB_CMD_MULTI_ONLINE_DATA, UMB_CMD_VERSION) => Some(Command::MultiOnlineData),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Command::OnlineData => UMB_CMD_ONLINE_DATA,
            Command::MultiOnlineData => UMB_CMD_MULTI_ONLINE_DATA,
        }
    }

    pub fn version(self) -> u8 {
        UMB_CMD_VERSION
    }
}

/// Numeric channel data types, tagged by the `Type` byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    UnsignedChar = 0x10,
    SignedChar = 0x11,
    UnsignedShort = 0x12,
    SignedShort = 0x13,
    UnsignedLong = 0x14,
    SignedLong = 0x15,
    Float = 0x16,
    Double = 0x17,
}

impl DataType {
    /// Exact value width in bytes
    pub fn width(self) -> usize {
        match self {
            DataType::UnsignedChar | DataType::SignedChar => 1,
            DataType::UnsignedShort | DataType::SignedShort => 2,
            DataType::UnsignedLong | DataType::SignedLong | DataType::Float => 4,
            DataType::Double => 8,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for DataType {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0x10 => Ok(DataType::UnsignedChar),
            0x11 => Ok(DataType::SignedChar),
            0x12 => Ok(DataType::UnsignedShort),
            0x13 => Ok(DataType::SignedShort),
            0x14 => Ok(DataType::UnsignedLong),
            0x15 => Ok(DataType::SignedLong),
            0x16 => Ok(DataType::Float),
            0x17 => Ok(DataType::Double),
            other => Err(other),
        }
    }
}

/// Known device families (the class nibble of an address)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum DeviceClass {
    Irs31Irs21Con = 1,
    R2s = 2,
    Vs20Vs2kVs25k = 3,
    Ars31Ars31Pro = 4,
    Nirs31 = 5,
    Anacon = 6,
    Wsx = 7,
    VentusV200a = 8,
    Irs31Pro = 9,
    Marwis = 10,
    Shm50 = 11,
    Unicon = 13,
    /// Also the class of the PC master
    Dacon8 = 15,
}

impl DeviceClass {
    pub fn class(self) -> u16 {
        self as u16
    }

    pub fn from_class(class: u16) -> Option<Self> {
        match class {
            1 => Some(DeviceClass::Irs31Irs21Con),
            2 => Some(DeviceClass::R2s),
            3 => Some(DeviceClass::Vs20Vs2kVs25k),
            4 => Some(DeviceClass::Ars31Ars31Pro),
            5 => Some(DeviceClass::Nirs31),
            6 => Some(DeviceClass::Anacon),
            7 => Some(DeviceClass::Wsx),
            8 => Some(DeviceClass::VentusV200a),
            9 => Some(DeviceClass::Irs31Pro),
            10 => Some(DeviceClass::Marwis),
            11 => Some(DeviceClass::Shm50),
            13 => Some(DeviceClass::Unicon),
            15 => Some(DeviceClass::Dacon8),
            _ => None,
        }
    }
}

/// Total frame length announced by a frame header
///
/// Returns `None` until the `Len` byte has been received.
///
/// # Examples
///
/// ```
/// use umb_poller::umb::protocol::expected_frame_len;
///
/// let header = [0x01, 0x10, 0x01, 0xF0, 0x01, 0x40, 0x0A];
/// assert_eq!(expected_frame_len(&header), Some(22));
/// assert_eq!(expected_frame_len(&header[..3]), None);
/// ```
pub fn expected_frame_len(header: &[u8]) -> Option<usize> {
    header
        .get(UMB_LEN_OFFSET)
        .map(|&len| len as usize + UMB_FRAME_OVERHEAD)
}
