//! Walking the individual blocks of a compound RTCP packet.

use crate::header::{HEADER_LENGTH, Header, PacketType};
use shared::error::{Error, Result};
use shared::marshal::Unmarshal;

/// One RTCP block inside a (possibly compound) packet, borrowed from the
/// datagram it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonHeader<'a> {
    header: Header,
    payload: &'a [u8],
    packet_size: usize,
}

impl<'a> CommonHeader<'a> {
    /// Parses the block starting at `packet[0]`.
    ///
    /// Fails when the version is not 2, when the buffer is shorter than the
    /// length announced by the header, or when the padding count is zero or
    /// larger than the payload.
    pub fn parse(packet: &'a [u8]) -> Result<Self> {
        let mut reader = packet;
        let header = Header::unmarshal(&mut reader)?;

        let payload_size = header.length as usize * 4;
        let packet_size = HEADER_LENGTH + payload_size;
        if packet.len() < packet_size {
            return Err(Error::PacketTooShort);
        }

        let mut payload = &packet[HEADER_LENGTH..packet_size];
        if header.padding {
            let Some(&padding_size) = payload.last() else {
                return Err(Error::WrongPadding);
            };
            let padding_size = padding_size as usize;
            if padding_size == 0 || padding_size > payload.len() {
                return Err(Error::WrongPadding);
            }
            payload = &payload[..payload.len() - padding_size];
        }

        Ok(CommonHeader {
            header,
            payload,
            packet_size,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn packet_type(&self) -> PacketType {
        self.header.packet_type
    }

    pub fn count(&self) -> u8 {
        self.header.count
    }

    /// Payload following the 4-byte header, padding excluded.
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Size of the whole block including header and padding.
    pub fn packet_size(&self) -> usize {
        self.packet_size
    }
}

/// Iterator over the blocks of a compound RTCP packet.
///
/// Yields at most one error, after which iteration ends.
pub struct CompoundBlocks<'a> {
    remaining: &'a [u8],
    failed: bool,
}

impl<'a> CompoundBlocks<'a> {
    pub fn new(packet: &'a [u8]) -> Self {
        CompoundBlocks {
            remaining: packet,
            failed: false,
        }
    }
}

impl<'a> Iterator for CompoundBlocks<'a> {
    type Item = Result<CommonHeader<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining.is_empty() {
            return None;
        }

        match CommonHeader::parse(self.remaining) {
            Ok(block) => {
                self.remaining = &self.remaining[block.packet_size()..];
                Some(Ok(block))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
