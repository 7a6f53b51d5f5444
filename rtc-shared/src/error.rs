#![allow(dead_code)]

use std::io;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("packet too big")]
    ErrPacketTooBig,

    //RTCP errors
    /// Packet lost exceeds maximum amount of packets
    /// that can possibly be lost.
    #[error("Invalid total lost count")]
    InvalidTotalLost,
    /// Packet contains an invalid header.
    #[error("Invalid header")]
    InvalidHeader,
    /// Too many reports.
    #[error("Too many reports")]
    TooManyReports,
    /// Too many chunks.
    #[error("Too many chunks")]
    TooManyChunks,
    /// Packet received is too short.
    #[error("Packet too short to be read")]
    PacketTooShort,
    /// Buffer is too short.
    #[error("Buffer too short to be written")]
    BufferTooShort,
    /// Wrong packet type.
    #[error("Wrong packet type")]
    WrongType,
    /// SDES received is too long.
    #[error("SDES must be < 255 octets long")]
    SdesTextTooLong,
    /// SDES type is missing.
    #[error("SDES item missing type")]
    SdesMissingType,
    /// Invalid packet version.
    #[error("Invalid packet version")]
    BadVersion,
    /// Invalid padding value.
    #[error("Invalid padding value")]
    WrongPadding,

    //RtcpTransceiver configuration errors
    #[error("cname can be maximum {1} characters, got {0}")]
    ErrCnameTooLong(usize, usize),
    #[error("max packet size {0} is too small, expected at least {1}")]
    ErrMaxPacketSizeTooSmall(usize, usize),
    #[error("max packet size {0} more than {1} is unsupported")]
    ErrMaxPacketSizeTooLarge(usize, usize),
    #[error("outgoing transport must be set")]
    ErrNoOutgoingTransport,
    #[error("period between reports should be positive")]
    ErrNonPositiveReportPeriod,
    #[error("period between reports {0:?} is longer than {1:?}")]
    ErrReportPeriodTooLong(Duration, Duration),
    #[error("transport failed to send rtcp packet: {0}")]
    ErrTransportSend(String),

    #[error("{0}")]
    Io(#[source] IoError),

    //Other Errors
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
#[error("io error: {0}")]
pub struct IoError(#[from] pub io::Error);

// Workaround for wanting PartialEq for io::Error.
impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(IoError(e))
    }
}
