//! RTC Call - routing of inbound RTCP packets to the streams they belong to.
//!
//! [`RtcpDemuxer`] keeps sinks keyed by sender SSRC, RSID, MID, MID+RSID
//! and payload type. Sinks registered under a non-SSRC key start receiving
//! packets once that key is bound to an SSRC through
//! [`SsrcBindingObserver`]. Broadcast sinks receive everything.
//!
//! The demuxer does no locking of its own; wrap it in a mutex if packets
//! and registrations come from different threads.

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

mod rtcp_demuxer;
mod rtcp_packet_sink;
mod ssrc_binding_observer;
pub mod stream_id;

pub use rtcp_demuxer::RtcpDemuxer;
pub use rtcp_packet_sink::RtcpPacketSink;
pub use ssrc_binding_observer::SsrcBindingObserver;
