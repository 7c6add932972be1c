//! # Poller Module
//!
//! Queries the configured channels of one device over the bus and turns
//! the responses into timestamped readings.
//!
//! Frames are exchanged strictly one at a time: the next request is only
//! sent once the previous response arrived or timed out. The protocol has
//! no correlation id beyond the echoed address, so overlapping requests
//! could not be told apart.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::OutputFormat;
use crate::error::{ChannelError, FrameError, Result, UmbPollerError};
use crate::serial::UmbSerial;
use crate::umb::address::Address;
use crate::umb::decoder::ChannelReading;
use crate::umb::encoder::{ascii_to_binary_command, encode_request_to};
use crate::umb::value::Value;

/// One decoded channel value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub device_id: u16,
    pub class: u16,
    pub channel: u16,
    pub value: Value,
}

impl Reading {
    fn new(timestamp: DateTime<Utc>, device_id: u16, class: u16, reading: &ChannelReading) -> Self {
        Self {
            timestamp,
            device_id,
            class,
            channel: reading.channel,
            value: reading.value,
        }
    }
}

/// Everything one poll cycle produced
#[derive(Debug, Default)]
pub struct PollReport {
    pub readings: Vec<Reading>,
    pub channel_errors: Vec<ChannelError>,
    /// Responses rejected as a whole
    pub frame_errors: Vec<FrameError>,
    /// Requests that got no complete response in time
    pub timeouts: usize,
    /// Port failure that ended the cycle early; the port needs reopening
    pub serial_error: Option<UmbPollerError>,
}

impl PollReport {
    /// Report readings in the configured format
    ///
    /// # Errors
    ///
    /// Returns error if a reading cannot be serialised
    pub fn emit(&self, format: OutputFormat) -> Result<()> {
        for reading in &self.readings {
            match format {
                OutputFormat::Text => info!(
                    "device {} class {} channel {}: {} ({:?})",
                    reading.device_id,
                    reading.class,
                    reading.channel,
                    reading.value,
                    reading.value.data_type()
                ),
                OutputFormat::Json => println!("{}", serde_json::to_string(reading)?),
            }
        }
        Ok(())
    }
}

/// Polls a fixed channel list from one device
#[derive(Debug)]
pub struct Poller {
    serial: UmbSerial,
    target: Address,
    channels: Vec<u16>,
}

impl Poller {
    pub fn new(serial: UmbSerial, target: Address, channels: Vec<u16>) -> Self {
        Self {
            serial,
            target,
            channels,
        }
    }

    /// Ask the device to leave the ASCII protocol for the binary one
    ///
    /// The device's ASCII answer is not awaited; it is discarded as noise
    /// by the next frame read.
    pub async fn switch_to_binary(&mut self) -> Result<()> {
        let command = ascii_to_binary_command(self.target.device_id(), self.target.class());
        info!("Switching device {} to binary protocol", self.target);
        self.serial.send_packet(&command).await
    }

    /// Run one poll cycle over all configured channels
    ///
    /// Frame-level rejections and timeouts are recorded in the report and
    /// polling moves on to the next frame. A port failure ends the cycle;
    /// it is stored in `serial_error` next to the readings collected so far.
    pub async fn poll(&mut self) -> PollReport {
        let mut report = PollReport::default();

        for request in encode_request_to(self.target, &self.channels) {
            let frame = match self.serial.transact(request.as_bytes()).await {
                Ok(frame) => frame,
                Err(UmbPollerError::Timeout(ms)) => {
                    warn!(
                        "No response from {} within {} ms ({} channels)",
                        self.target,
                        ms,
                        request.channels().len()
                    );
                    report.timeouts += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Serial failure on {}: {}", self.serial.device_path(), e);
                    report.serial_error = Some(e);
                    break;
                }
            };

            let response = match request.parse_response(&frame) {
                Ok(response) => response,
                Err(e) => {
                    warn!("Rejected response from {}: {}", self.target, e);
                    report.frame_errors.push(e);
                    continue;
                }
            };

            let timestamp = Utc::now();
            for record in &response.records {
                match record {
                    Ok(reading) => report.readings.push(Reading::new(
                        timestamp,
                        response.device_id,
                        response.class,
                        reading,
                    )),
                    Err(e) => {
                        warn!("Device {}: {}", self.target, e);
                        report.channel_errors.push(e.clone());
                    }
                }
            }

            debug!(
                "Frame of {} channels: {} records ({:?})",
                request.channels().len(),
                response.records.len(),
                response.end
            );
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::port_trait::StreamPort;
    use crate::umb::encoder::{assemble_frame, encode_request};
    use crate::umb::protocol::{Command, UMB_MASTER_ADDRESS};
    use std::time::Duration;

    const REFERENCE_RESPONSE: [u8; 22] = [
        0x01, 0x10, 0x01, 0xF0, 0x01, 0x40, 0x0A, 0x02, 0x23, 0x10, 0x00, 0x97, 0x00, 0x16, 0x66,
        0x66, 0x96, 0xC1, 0x03, 0xFF, 0xEA, 0x04,
    ];

    fn poller(mock: tokio_test::io::Mock, target: Address, channels: Vec<u16>) -> Poller {
        let serial = UmbSerial::from_port(
            Box::new(StreamPort::new(mock)),
            "mock".to_string(),
            Duration::from_millis(50),
        );
        Poller::new(serial, target, channels)
    }

    #[tokio::test]
    async fn test_poll_single_channel() {
        let request = encode_request(1, 4, &[151]).remove(0);
        let mock = tokio_test::io::Builder::new()
            .write(request.as_bytes())
            .read(&REFERENCE_RESPONSE)
            .build();
        let mut poller = poller(mock, Address::new(1, 4), vec![151]);

        let report = poller.poll().await;
        assert_eq!(report.readings.len(), 1);
        assert_eq!(report.timeouts, 0);

        let reading = &report.readings[0];
        assert_eq!(reading.device_id, 1);
        assert_eq!(reading.class, 4);
        assert_eq!(reading.channel, 151);
        assert!(matches!(reading.value, Value::F32(v) if (v + 18.8).abs() < 0.001));
    }

    #[tokio::test]
    async fn test_poll_multi_channel_with_channel_error() {
        let target = Address::new(1, 7);
        let request = encode_request_to(target, &[100, 200]).remove(0);
        let response = assemble_frame(
            UMB_MASTER_ADDRESS,
            target,
            Command::MultiOnlineData,
            &[
                0x00, 0x02, //
                0x04, 0x36, 0x64, 0x00, 0x16, // channel 100 deactivated
                0x06, 0x00, 0xC8, 0x00, 0x13, 0x9C, 0xFF, // channel 200: -100
            ],
        );
        let mock = tokio_test::io::Builder::new()
            .write(request.as_bytes())
            .read(&response)
            .build();
        let mut poller = poller(mock, target, vec![100, 200]);

        let report = poller.poll().await;
        assert_eq!(report.readings.len(), 1);
        assert_eq!(report.readings[0].value, Value::I16(-100));
        assert_eq!(report.channel_errors.len(), 1);
        assert!(report.frame_errors.is_empty());
    }

    #[tokio::test]
    async fn test_poll_records_frame_error_and_continues() {
        let target = Address::new(1, 4);
        let channels: Vec<u16> = (0..101).collect();
        let requests = encode_request_to(target, &channels);

        let mut corrupted = REFERENCE_RESPONSE;
        corrupted[19] ^= 0xFF;

        let mut single = REFERENCE_RESPONSE.to_vec();
        // Answer channel 100 instead of 151
        single[11] = 0x64;
        let crc = crate::umb::crc::crc16(&single[..19]);
        single[19..21].copy_from_slice(&crc.to_le_bytes());

        let mock = tokio_test::io::Builder::new()
            .write(requests[0].as_bytes())
            .read(&corrupted)
            .write(requests[1].as_bytes())
            .read(&single)
            .build();
        let mut poller = poller(mock, target, channels);

        let report = poller.poll().await;
        assert_eq!(report.frame_errors.len(), 1);
        assert!(matches!(
            report.frame_errors[0],
            FrameError::ChecksumMismatch { .. }
        ));
        assert_eq!(report.readings.len(), 1);
        assert_eq!(report.readings[0].channel, 100);
    }

    #[tokio::test]
    async fn test_poll_timeout_is_counted() {
        let request = encode_request(1, 4, &[151]).remove(0);
        let mock = tokio_test::io::Builder::new()
            .write(request.as_bytes())
            .wait(Duration::from_secs(5))
            .build();
        let mut poller = poller(mock, Address::new(1, 4), vec![151]);

        let report = poller.poll().await;
        assert_eq!(report.timeouts, 1);
        assert!(report.readings.is_empty());
    }

    #[tokio::test]
    async fn test_poll_keeps_readings_after_serial_failure() {
        let target = Address::new(1, 7);
        let channels: Vec<u16> = (100..201).collect();
        let requests = encode_request_to(target, &channels);

        // First frame answers channel 100 only, then the port closes
        let response = assemble_frame(
            UMB_MASTER_ADDRESS,
            target,
            Command::MultiOnlineData,
            &[0x00, 100, 0x05, 0x00, 0x64, 0x00, 0x10, 0x2A, 0x00],
        );
        let mock = tokio_test::io::Builder::new()
            .write(requests[0].as_bytes())
            .read(&response)
            .write(requests[1].as_bytes())
            .build();
        let mut poller = poller(mock, target, channels);

        let report = poller.poll().await;
        assert!(matches!(report.serial_error, Some(UmbPollerError::Serial(_))));
        assert_eq!(report.readings.len(), 1);
        assert_eq!(report.readings[0].value, Value::U8(42));
        assert_eq!(report.channel_errors.len(), 99);
    }

    #[tokio::test]
    async fn test_switch_to_binary_sends_ascii_command() {
        let mock = tokio_test::io::Builder::new()
            .write(b"& 16385 X\r")
            .build();
        let mut poller = poller(mock, Address::new(1, 4), vec![151]);

        poller.switch_to_binary().await.unwrap();
    }

    #[test]
    fn test_reading_serializes_to_json() {
        let timestamp = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let reading = Reading {
            timestamp,
            device_id: 1,
            class: 7,
            channel: 100,
            value: Value::F32(21.5),
        };

        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["channel"], 100);
        assert_eq!(json["value"]["type"], "f32");
        assert_eq!(json["value"]["value"], 21.5);
        assert_eq!(json["timestamp"], "2024-05-01T12:00:00Z");
    }

    #[test]
    fn test_emit_text_and_json() {
        let report = PollReport {
            readings: vec![Reading {
                timestamp: Utc::now(),
                device_id: 1,
                class: 7,
                channel: 100,
                value: Value::U8(3),
            }],
            ..Default::default()
        };

        assert!(report.emit(OutputFormat::Text).is_ok());
        assert!(report.emit(OutputFormat::Json).is_ok());
    }
}
