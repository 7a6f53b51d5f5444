use bytes::{Buf, BufMut, Bytes};
use shared::error::{Error, Result};
use shared::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::header::{
    COUNT_MAX, HEADER_LENGTH, Header, PacketType, SDES_MAX_OCTET_COUNT,
};
use crate::util::get_padding_size;

const SDES_SOURCE_LEN: usize = 4;
const SDES_TYPE_LEN: usize = 1;
const SDES_OCTET_COUNT_LEN: usize = 1;

/// SDESType is the item type used in the RTCP SDES control packet.
/// RTP SDES item types registered with IANA. See: https://www.iana.org/assignments/rtp-parameters/rtp-parameters.xhtml#rtp-parameters-5
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum SdesType {
    #[default]
    SdesEnd = 0, // end of SDES list                RFC 3550, 6.5
    SdesCname = 1,    // canonical name                  RFC 3550, 6.5.1
    SdesName = 2,     // user name                       RFC 3550, 6.5.2
    SdesEmail = 3,    // user's electronic mail address  RFC 3550, 6.5.3
    SdesPhone = 4,    // user's phone number             RFC 3550, 6.5.4
    SdesLocation = 5, // geographic user location        RFC 3550, 6.5.5
    SdesTool = 6,     // name of application or tool     RFC 3550, 6.5.6
    SdesNote = 7,     // notice about the source         RFC 3550, 6.5.7
    SdesPrivate = 8,  // private extensions              RFC 3550, 6.5.8  (not implemented)
}

impl From<u8> for SdesType {
    fn from(b: u8) -> Self {
        match b {
            1 => SdesType::SdesCname,
            2 => SdesType::SdesName,
            3 => SdesType::SdesEmail,
            4 => SdesType::SdesPhone,
            5 => SdesType::SdesLocation,
            6 => SdesType::SdesTool,
            7 => SdesType::SdesNote,
            8 => SdesType::SdesPrivate,
            _ => SdesType::SdesEnd,
        }
    }
}

/// A SourceDescriptionItem is a part of a SourceDescription that describes a stream.
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct SourceDescriptionItem {
    /// The type identifier for this item. eg, SDESCNAME for canonical name description.
    ///
    /// Type zero or SDESEnd is interpreted as the end of an item list and cannot be used.
    pub sdes_type: SdesType,
    /// Text is a unicode text blob associated with the item. Its meaning varies based on the item's Type.
    pub text: Bytes,
}

impl MarshalSize for SourceDescriptionItem {
    fn marshal_size(&self) -> usize {
        SDES_TYPE_LEN + SDES_OCTET_COUNT_LEN + self.text.len()
    }
}

impl Marshal for SourceDescriptionItem {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        /*
         *   0                   1                   2                   3
         *   0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
         *  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *  |    CNAME=1    |     length    | user and domain name        ...
         *  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         */
        if self.sdes_type == SdesType::SdesEnd {
            return Err(Error::SdesMissingType);
        }
        if self.text.len() > SDES_MAX_OCTET_COUNT {
            return Err(Error::SdesTextTooLong);
        }
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::BufferTooShort);
        }

        buf.put_u8(self.sdes_type as u8);
        buf.put_u8(self.text.len() as u8);
        buf.put(self.text.clone());

        Ok(self.marshal_size())
    }
}

impl Unmarshal for SourceDescriptionItem {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        if raw_packet.remaining() < SDES_TYPE_LEN + SDES_OCTET_COUNT_LEN {
            return Err(Error::PacketTooShort);
        }

        let sdes_type = SdesType::from(raw_packet.get_u8());
        let octet_count = raw_packet.get_u8() as usize;
        if raw_packet.remaining() < octet_count {
            return Err(Error::PacketTooShort);
        }

        let text = raw_packet.copy_to_bytes(octet_count);

        Ok(SourceDescriptionItem { sdes_type, text })
    }
}

/// A SourceDescriptionChunk contains items describing a single RTP source
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct SourceDescriptionChunk {
    /// The source (ssrc) or contributing source (csrc) identifier this packet describes
    pub source: u32,
    pub items: Vec<SourceDescriptionItem>,
}

impl SourceDescriptionChunk {
    fn raw_size(&self) -> usize {
        let mut len = SDES_SOURCE_LEN;
        for it in &self.items {
            len += it.marshal_size();
        }
        len += SDES_TYPE_LEN; // for terminating null octet
        len
    }
}

impl MarshalSize for SourceDescriptionChunk {
    fn marshal_size(&self) -> usize {
        let l = self.raw_size();
        // align to 32-bit boundary
        l + get_padding_size(l)
    }
}

impl Marshal for SourceDescriptionChunk {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        /*
         *  +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
         *  |                          SSRC/CSRC_1                          |
         *  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *  |                           SDES items                          |
         *  |                              ...                              |
         *  +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
         */
        let size = self.marshal_size();
        if buf.len() < size {
            return Err(Error::BufferTooShort);
        }

        let mut source_buf = &mut buf[..];
        source_buf.put_u32(self.source);
        let mut offset = SDES_SOURCE_LEN;

        for it in &self.items {
            offset += it.marshal_to(&mut buf[offset..])?;
        }

        // terminating null octet plus padding to the next 32-bit boundary
        for b in &mut buf[offset..size] {
            *b = 0;
        }

        Ok(size)
    }
}

impl Unmarshal for SourceDescriptionChunk {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        /* Chunk =
         *   SSRC/CSRC: 32 bits
         *   Items: zero or more, followed by a null octet and zero padding
         */
        if raw_packet.remaining() < SDES_SOURCE_LEN + SDES_TYPE_LEN {
            return Err(Error::PacketTooShort);
        }

        let source = raw_packet.get_u32();
        let mut consumed = SDES_SOURCE_LEN;
        let mut items = vec![];

        loop {
            if !raw_packet.has_remaining() {
                return Err(Error::PacketTooShort);
            }
            if raw_packet.chunk()[0] == SdesType::SdesEnd as u8 {
                let padding = SDES_TYPE_LEN + get_padding_size(consumed + SDES_TYPE_LEN);
                if raw_packet.remaining() < padding {
                    return Err(Error::PacketTooShort);
                }
                raw_packet.advance(padding);
                return Ok(SourceDescriptionChunk { source, items });
            }

            let item = SourceDescriptionItem::unmarshal(raw_packet)?;
            consumed += item.marshal_size();
            items.push(item);
        }
    }
}

/// A SourceDescription (SDES) packet describes the sources in an RTP stream.
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct SourceDescription {
    pub chunks: Vec<SourceDescriptionChunk>,
}

impl SourceDescription {
    /// Builds a packet announcing `cname` for `ssrc`.
    pub fn with_cname(ssrc: u32, cname: &str) -> Self {
        SourceDescription {
            chunks: vec![SourceDescriptionChunk {
                source: ssrc,
                items: vec![SourceDescriptionItem {
                    sdes_type: SdesType::SdesCname,
                    text: Bytes::copy_from_slice(cname.as_bytes()),
                }],
            }],
        }
    }

    /// Header returns the Header associated with this packet.
    pub fn header(&self) -> Header {
        Header {
            padding: false,
            count: self.chunks.len() as u8,
            packet_type: PacketType::SourceDescription,
            length: ((self.marshal_size() / 4) - 1) as u16,
        }
    }

    /// Returns the CNAME announced for `ssrc`, if any.
    pub fn cname(&self, ssrc: u32) -> Option<&Bytes> {
        self.chunks
            .iter()
            .filter(|chunk| chunk.source == ssrc)
            .flat_map(|chunk| chunk.items.iter())
            .find(|item| item.sdes_type == SdesType::SdesCname)
            .map(|item| &item.text)
    }
}

impl MarshalSize for SourceDescription {
    fn marshal_size(&self) -> usize {
        let mut chunks_length = 0;
        for c in &self.chunks {
            chunks_length += c.marshal_size();
        }
        HEADER_LENGTH + chunks_length
    }
}

impl Marshal for SourceDescription {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        /*
         *         0                   1                   2                   3
         *         0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
         *        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * header |V=2|P|    SC   |  PT=SDES=202  |             length            |
         *        +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
         * chunk  |                          SSRC/CSRC_1                          |
         *   1    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *        |                           SDES items                          |
         *        |                              ...                              |
         *        +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
         */
        if self.chunks.len() > COUNT_MAX {
            return Err(Error::TooManyChunks);
        }
        let size = self.marshal_size();
        if buf.len() < size {
            return Err(Error::BufferTooShort);
        }

        let h = self.header();
        let mut offset = h.marshal_to(buf)?;

        for c in &self.chunks {
            offset += c.marshal_to(&mut buf[offset..])?;
        }

        Ok(offset)
    }
}

impl Unmarshal for SourceDescription {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let h = Header::unmarshal(raw_packet)?;
        if h.packet_type != PacketType::SourceDescription {
            return Err(Error::WrongType);
        }

        let block_len = h.length as usize * 4;
        if raw_packet.remaining() < block_len {
            return Err(Error::PacketTooShort);
        }
        let mut body = raw_packet.copy_to_bytes(block_len);
        if h.padding {
            let padding_size = body.last().copied().unwrap_or(0) as usize;
            if padding_size == 0 || padding_size > body.len() {
                return Err(Error::WrongPadding);
            }
            body.truncate(body.len() - padding_size);
        }

        let mut chunks = Vec::with_capacity(h.count as usize);
        for _ in 0..h.count {
            chunks.push(SourceDescriptionChunk::unmarshal(&mut body)?);
        }

        Ok(SourceDescription { chunks })
    }
}
