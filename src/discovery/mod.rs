//! LAN discovery of drone devices
//!
//! This module handles:
//! - Probing every host of an IPv4 /24 for an open service port
//! - Bounding the number of probes in flight
//! - Guessing the local subnet to suggest a default scan prefix

mod host;
mod probe;
mod scanner;

pub use host::default_prefix;
pub use scanner::LanScanner;
