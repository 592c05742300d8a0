//! Fatal input errors.
//!
//! Anything in here aborts a run before a single probe or API call is made.

use std::net::Ipv4Addr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("range expression is empty")]
    Empty,
    #[error("invalid target: {0}")]
    Unrecognized(String),
    #[error("invalid address '{0}'")]
    Address(String),
    #[error("invalid CIDR prefix '{0}'")]
    Prefix(String),
    #[error("invalid end of range '{input}': {reason}")]
    RangeEnd { input: String, reason: String },
    #[error("range start {start} is after range end {end}")]
    Reversed { start: Ipv4Addr, end: Ipv4Addr },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortError {
    #[error("port list is empty")]
    Empty,
    #[error("invalid port '{0}'")]
    Invalid(String),
    #[error("port range '{0}' ends before it starts")]
    Reversed(String),
}
