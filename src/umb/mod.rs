//! # UMB Protocol Module
//!
//! Implementation of the UMB binary protocol used to poll measurement
//! channels from field devices over RS-485.
//!
//! This module handles:
//! - Online data requests for one or many channels (split at 100 per frame)
//! - Response validation (framing, length, CRC-16, address echo, status)
//! - Multi-channel record walking with per-channel status
//! - Typed value decoding for the eight numeric data types
//!
//! Nothing in here performs I/O; see [`crate::serial`] for the transport.

pub mod address;
pub mod crc;
pub mod decoder;
pub mod encoder;
pub mod protocol;
pub mod status;
pub mod value;
