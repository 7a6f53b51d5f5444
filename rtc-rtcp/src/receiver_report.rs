use bytes::{Buf, BufMut, Bytes};
use shared::error::{Error, Result};
use shared::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::header::{COUNT_MAX, HEADER_LENGTH, Header, PacketType, SSRC_LENGTH};
use crate::reception_report::{RECEPTION_REPORT_LENGTH, ReceptionReport};
use crate::util::{get_padding_size, put_padding};

/// Maximum number of report blocks a single Receiver Report can carry.
pub const MAX_NUMBER_OF_REPORT_BLOCKS: usize = COUNT_MAX;

/// A ReceiverReport (RR) packet provides reception quality feedback for an RTP stream
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct ReceiverReport {
    /// The synchronization source identifier for the originator of this RR packet.
    pub ssrc: u32,
    /// Zero or more reception report blocks depending on the number of other
    /// sources heard by this sender since the last report. Each reception report
    /// block conveys statistics on the reception of RTP packets from a
    /// single synchronization source.
    pub reports: Vec<ReceptionReport>,
    /// Extension contains additional, payload-specific information that needs to
    /// be reported regularly about the receiver.
    pub profile_extensions: Bytes,
}

impl ReceiverReport {
    /// Header returns the Header associated with this packet.
    pub fn header(&self) -> Header {
        Header {
            padding: get_padding_size(self.raw_size()) != 0,
            count: self.reports.len() as u8,
            packet_type: PacketType::ReceiverReport,
            length: ((self.marshal_size() / 4) - 1) as u16,
        }
    }

    fn raw_size(&self) -> usize {
        HEADER_LENGTH
            + SSRC_LENGTH
            + self.reports.len() * RECEPTION_REPORT_LENGTH
            + self.profile_extensions.len()
    }
}

impl MarshalSize for ReceiverReport {
    fn marshal_size(&self) -> usize {
        let l = self.raw_size();
        // align to 32-bit boundary
        l + get_padding_size(l)
    }
}

impl Marshal for ReceiverReport {
    /// marshal_to encodes the packet in binary.
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        /*
         *         0                   1                   2                   3
         *         0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
         *        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * header |V=2|P|    RC   |   PT=RR=201   |             length            |
         *        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *        |                     SSRC of packet sender                     |
         *        +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
         * report |                 SSRC_1 (SSRC of first source)                 |
         * block  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *   1    | fraction lost |       cumulative number of packets lost       |
         *        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *        |           extended highest sequence number received           |
         *        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *        |                      interarrival jitter                      |
         *        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *        |                         last SR (LSR)                         |
         *        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *        |                   delay since last SR (DLSR)                  |
         *        +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
         *        |                  profile-specific extensions                  |
         *        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         */
        if self.reports.len() > COUNT_MAX {
            return Err(Error::TooManyReports);
        }
        let size = self.marshal_size();
        if buf.len() < size {
            return Err(Error::BufferTooShort);
        }

        let h = self.header();
        let mut offset = h.marshal_to(buf)?;

        let mut ssrc_buf = &mut buf[offset..];
        ssrc_buf.put_u32(self.ssrc);
        offset += SSRC_LENGTH;

        for report in &self.reports {
            offset += report.marshal_to(&mut buf[offset..])?;
        }

        let ext_len = self.profile_extensions.len();
        buf[offset..offset + ext_len].copy_from_slice(&self.profile_extensions);
        offset += ext_len;

        put_padding(buf, offset, size - offset);

        Ok(size)
    }
}

impl Unmarshal for ReceiverReport {
    /// Unmarshal decodes the ReceiverReport from binary
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let header = Header::unmarshal(raw_packet)?;
        if header.packet_type != PacketType::ReceiverReport {
            return Err(Error::WrongType);
        }

        let block_len = header.length as usize * 4;
        let reports_len = header.count as usize * RECEPTION_REPORT_LENGTH;
        if raw_packet.remaining() < block_len || block_len < SSRC_LENGTH + reports_len {
            return Err(Error::PacketTooShort);
        }

        let ssrc = raw_packet.get_u32();

        let mut reports = Vec::with_capacity(header.count as usize);
        for _ in 0..header.count {
            reports.push(ReceptionReport::unmarshal(raw_packet)?);
        }

        let mut profile_extensions = raw_packet.copy_to_bytes(block_len - SSRC_LENGTH - reports_len);
        if header.padding {
            let padding_size = profile_extensions.last().copied().unwrap_or(0) as usize;
            if padding_size == 0 || padding_size > profile_extensions.len() {
                return Err(Error::WrongPadding);
            }
            profile_extensions.truncate(profile_extensions.len() - padding_size);
        }

        Ok(ReceiverReport {
            ssrc,
            reports,
            profile_extensions,
        })
    }
}
