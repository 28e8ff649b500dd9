//! The dns module implements the DNS wire protocol and the single-query
//! client engine built on top of it

use derive_more::{Display, From};

pub mod buffer;
pub mod client;
pub mod protocol;
pub mod report;
pub mod udp;

#[derive(Debug, Display, PartialEq, Eq)]
pub enum ProtocolError {
    #[display(fmt = "invalid domain name {}", _0)]
    InvalidName(String),
    #[display(fmt = "message truncated")]
    Truncated,
    #[display(fmt = "malformed compression pointer")]
    MalformedPointer,
    #[display(fmt = "malformed record: {}", _0)]
    MalformedRecord(&'static str),
}

impl std::error::Error for ProtocolError {}

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[derive(Debug, Display, From)]
pub enum LookupError {
    Protocol(ProtocolError),
    Io(std::io::Error),
}

impl std::error::Error for LookupError {}
