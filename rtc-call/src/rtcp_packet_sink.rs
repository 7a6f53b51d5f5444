use std::sync::Arc;

/// Receiver of raw RTCP packets dispatched by an
/// [`RtcpDemuxer`](crate::RtcpDemuxer).
pub trait RtcpPacketSink: Send + Sync {
    fn on_rtcp_packet(&self, packet: &[u8]);
}

/// A registered sink. Two handles are equal when they refer to the same
/// sink allocation.
#[derive(Clone)]
pub(crate) struct SinkHandle(Arc<dyn RtcpPacketSink>);

impl SinkHandle {
    pub(crate) fn new(sink: &Arc<dyn RtcpPacketSink>) -> Self {
        SinkHandle(Arc::clone(sink))
    }

    pub(crate) fn is(&self, sink: &Arc<dyn RtcpPacketSink>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(sink))
    }

    pub(crate) fn on_rtcp_packet(&self, packet: &[u8]) {
        self.0.on_rtcp_packet(packet);
    }
}

impl PartialEq for SinkHandle {
    fn eq(&self, other: &Self) -> bool {
        self.is(&other.0)
    }
}

impl Eq for SinkHandle {}

impl std::fmt::Debug for SinkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SinkHandle({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}
