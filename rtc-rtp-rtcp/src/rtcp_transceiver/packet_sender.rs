use crate::transport::Transport;
use bytes::BytesMut;
use log::warn;
use shared::error::{Error, Result};
use shared::marshal::Marshal;

/// Packs RTCP blocks into compound packets no larger than `max_packet_size`.
///
/// The buffered packet is flushed to the transport whenever the next block
/// would not fit, and on [`send`](Self::send). It must be empty when the
/// sender is dropped.
pub(crate) struct PacketSender<'a> {
    transport: &'a dyn Transport,
    max_packet_size: usize,
    buffer: BytesMut,
    debug_id: &'a str,
}

impl<'a> PacketSender<'a> {
    pub(crate) fn new(transport: &'a dyn Transport, max_packet_size: usize, debug_id: &'a str) -> Self {
        PacketSender {
            transport,
            max_packet_size,
            buffer: BytesMut::with_capacity(max_packet_size),
            debug_id,
        }
    }

    pub(crate) fn add_block<M: Marshal>(&mut self, block: &M) -> Result<()> {
        let size = block.marshal_size();
        if size > self.max_packet_size {
            return Err(Error::ErrPacketTooBig);
        }
        if self.buffer.len() + size > self.max_packet_size {
            self.send();
        }

        let start = self.buffer.len();
        self.buffer.resize(start + size, 0);
        match block.marshal_to(&mut self.buffer[start..]) {
            Ok(n) => {
                self.buffer.truncate(start + n);
                Ok(())
            }
            Err(err) => {
                self.buffer.truncate(start);
                Err(err)
            }
        }
    }

    /// Sends whatever is buffered.
    pub(crate) fn send(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        if let Err(err) = self.transport.send_rtcp(&self.buffer) {
            warn!("{}failed to send rtcp packet: {err}", self.debug_id);
        }
        self.buffer.clear();
    }
}

impl Drop for PacketSender<'_> {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            debug_assert!(self.buffer.is_empty(), "unsent rtcp packet");
        }
    }
}
