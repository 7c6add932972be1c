//! # UMB Poller Library
//!
//! Poll measurement channels from UMB field devices over RS-485.
//!
//! The [`umb`] module is a pure codec for the UMB binary protocol: it builds
//! request frames and validates and decodes response frames without doing
//! any I/O. [`serial`] and [`poller`] put it on the wire.

pub mod config;
pub mod error;
pub mod poller;
pub mod serial;
pub mod umb;
