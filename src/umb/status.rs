//! # Status Registry
//!
//! Diagnostic text for the 8-bit status codes devices report, both for a
//! whole frame and for individual channel records. Code 0 is success.

use std::borrow::Cow;

/// Success status
pub const STATUS_OK: u8 = 0x00;

/// Status descriptions indexed by code; empty strings are reserved codes
static STATUS_TABLE: [&str; 99] = [
    // 0x00
    "OK Command successful; no error; all OK",
    "", "", "", "", "", "", "", "", "", "", "", "", "", "", "",
    // 0x10
    "UNBEK_CMD Unknown command; not supported by this device",
    "UNGLTG_PARAM Invalid parameter",
    "UNGLTG_HEADER Invalid header version",
    "UNGLTG_VERC Invalid version of the command",
    "UNGLTG_PW Invalid password for command",
    "", "", "", "", "", "", "", "", "", "", "",
    // 0x20
    "LESE_ERR Read error",
    "SCHREIB_ERR Write error",
    "ZU_LANG Length too great; max. permissible length is designated in <maxlength>",
    "UNGLTG_ADRESS Invalid address / storage location",
    "UNGLTG_KANAL Invalid channel",
    "UNGLTG_CMD Command not possible in this mode",
    "UNBEK_CAL_CMD Unknown calibration command",
    "CAL_ERROR Calibration error",
    "BUSY Device not ready; e.g. initialisation / calibration running",
    "LOW_VOLTAGE Undervoltage",
    "HW_ERROR Hardware error",
    "MEAS_ERROR Measurement error",
    "INIT_ERROR Error on device initialization",
    "OS_ERROR Error in operating system",
    "", "",
    // 0x30
    "E2_DEFAULT_KONF Configuration error, default configuration was loaded",
    "E2_CAL_ERROR Calibration error / the calibration is invalid, measurement not possible",
    "E2_CRC_KONF_ERR CRC error on loading configuration; default configuration was loaded",
    "E2_CRC_KAL_ERR CRC error on loading calibration; measurement not possible",
    "ADJ_STEP1 Calibration Step 1",
    "ADJ_OK Calibration OK",
    "KANAL_AUS Channel deactivated",
    "", "", "", "", "", "", "", "", "",
    // 0x40
    "", "", "", "", "", "", "", "", "", "", "", "", "", "", "", "",
    // 0x50
    "VALUE_OVERFLOW Measurement variable (+offset) lies outside the set presentation range",
    "VALUE_UNDERFLOW Measurement variable (+offset) lies outside the set presentation range",
    "CHANNEL_OVERRANGE Measurement value (physical) lies outside the measurement range (e.g. ADC overrange)",
    "CHANNEL_UNDERRANGE Measurement value (physical) lies outside the measurement range (e.g. ADC overrange)",
    "DATA_ERROR Data error in measurement data or no valid data available",
    "MEAS_UNABLE Device / sensor is unable to execute valid measurement due to ambient conditions",
    "", "", "", "", "", "", "", "", "", "",
    // 0x60
    "FLASH_CRC_ERR CRC error in the flash data",
    "FLASH_WRITE_ERR Error writing to flash; e.g. memory location not erased",
    "FLASH_FLOAT_ERR Flash contains invalid float values",
];

/// Describe a status code
///
/// Reserved codes inside the table describe as `""`; codes past the end of
/// the table get a generic `"status error: <code>"` text.
///
/// # Examples
///
/// ```
/// use umb_poller::umb::status::describe;
///
/// assert_eq!(describe(0x24), "UNGLTG_KANAL Invalid channel");
/// assert_eq!(describe(0x01), "");
/// assert_eq!(describe(0xFF), "status error: 255");
/// ```
pub fn describe(code: u8) -> Cow<'static, str> {
    match STATUS_TABLE.get(code as usize) {
        Some(&text) => Cow::Borrowed(text),
        None => Cow::Owned(format!("status error: {}", code)),
    }
}

/// Whether a code sits in the table without a description
pub fn is_reserved(code: u8) -> bool {
    STATUS_TABLE
        .get(code as usize)
        .is_some_and(|text| text.is_empty())
}
