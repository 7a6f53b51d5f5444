//! RTC RTP/RTCP - RTCP feedback driven by a [`utility::ProcessThread`].
//!
//! [`RtcpTransceiver`] is a [`utility::Module`] that periodically sends a
//! compound Receiver Report (plus SDES CNAME) over a [`Transport`], using
//! report blocks from a [`ReceiveStatisticsProvider`].
//!
//! ```ignore
//! use rtc_rtp_rtcp::RtcpTransceiverBuilder;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use utility::ProcessThread;
//!
//! let transceiver = Arc::new(
//!     RtcpTransceiverBuilder::new()
//!         .with_feedback_ssrc(0x1234)
//!         .with_cname("alice@example.org")
//!         .with_outgoing_transport(transport)
//!         .with_min_periodic_report(Duration::from_millis(500))
//!         .build()?,
//! );
//!
//! let process_thread = ProcessThread::new("rtcp")?;
//! let id = process_thread.register_module(transceiver.clone());
//! process_thread.start();
//! transceiver.force_send_report();
//! ```

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

mod receive_statistics;
mod rtcp_transceiver;
mod transport;

pub use receive_statistics::ReceiveStatisticsProvider;
pub use rtcp_transceiver::config::{
    IP_PACKET_SIZE, MAX_CNAME_LENGTH, MAX_REPORT_PERIOD, MIN_MAX_PACKET_SIZE, RtcpTransceiverConfig,
};
pub use rtcp_transceiver::{RtcpTransceiver, RtcpTransceiverBuilder};
pub use transport::Transport;
