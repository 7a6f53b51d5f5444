//! RTC RTCP - the subset of the RTCP wire format (RFC 3550) needed to
//! demultiplex incoming compound packets by sender SSRC and to emit
//! periodic Receiver Reports with an attached CNAME.
//!
//! Every packet type implements [`shared::marshal::Marshal`] and
//! [`shared::marshal::Unmarshal`]:
//!
//! ```ignore
//! use rtc_rtcp::receiver_report::ReceiverReport;
//! use shared::marshal::{Marshal, Unmarshal};
//!
//! let rr = ReceiverReport {
//!     ssrc: 0x902f9e2e,
//!     ..Default::default()
//! };
//! let raw = rr.marshal()?;
//! let parsed = ReceiverReport::unmarshal(&mut raw.clone())?;
//! assert_eq!(rr, parsed);
//! ```

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod common_header;
pub mod header;
pub mod receiver_report;
pub mod reception_report;
pub mod sender_ssrc;
pub mod source_description;
mod util;

pub use sender_ssrc::parse_rtcp_packet_sender_ssrc;
