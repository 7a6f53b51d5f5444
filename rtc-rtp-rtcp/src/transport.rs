use shared::error::Result;

/// Outgoing packet path used by RTP/RTCP senders.
pub trait Transport: Send + Sync {
    /// Sends one (possibly compound) RTCP packet.
    fn send_rtcp(&self, packet: &[u8]) -> Result<()>;
}
