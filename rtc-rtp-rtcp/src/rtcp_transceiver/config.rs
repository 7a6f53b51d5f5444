use crate::receive_statistics::ReceiveStatisticsProvider;
use crate::transport::Transport;
use log::{error, warn};
use rtcp::header::SDES_MAX_OCTET_COUNT;
use shared::error::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

/// Largest packet the transceiver will hand to the transport.
pub const IP_PACKET_SIZE: usize = 1500;
/// Smallest accepted `max_packet_size`.
pub const MIN_MAX_PACKET_SIZE: usize = 100;
/// Longest accepted CNAME, in bytes.
pub const MAX_CNAME_LENGTH: usize = SDES_MAX_OCTET_COUNT;
/// Longest accepted period between reports.
pub const MAX_REPORT_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Settings of an [`RtcpTransceiver`](crate::RtcpTransceiver).
#[derive(Clone)]
pub struct RtcpTransceiverConfig {
    /// Prefix for log lines, to tell transceivers apart.
    pub debug_id: String,
    /// Sender SSRC of outgoing feedback packets.
    pub feedback_ssrc: u32,
    /// Canonical name sent in SDES. Empty means no SDES.
    pub cname: String,
    /// Outgoing compound packets are split to stay within this size.
    pub max_packet_size: usize,
    pub outgoing_transport: Option<Arc<dyn Transport>>,
    /// Period between periodic receiver reports.
    pub min_periodic_report: Duration,
    pub receive_statistics: Option<Arc<dyn ReceiveStatisticsProvider>>,
}

impl Default for RtcpTransceiverConfig {
    fn default() -> Self {
        Self {
            debug_id: String::new(),
            feedback_ssrc: 1,
            cname: String::new(),
            max_packet_size: 1200,
            outgoing_transport: None,
            min_periodic_report: Duration::from_secs(1),
            receive_statistics: None,
        }
    }
}

impl std::fmt::Debug for RtcpTransceiverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtcpTransceiverConfig")
            .field("debug_id", &self.debug_id)
            .field("feedback_ssrc", &self.feedback_ssrc)
            .field("cname", &self.cname)
            .field("max_packet_size", &self.max_packet_size)
            .field("outgoing_transport", &self.outgoing_transport.is_some())
            .field("min_periodic_report", &self.min_periodic_report)
            .field("receive_statistics", &self.receive_statistics.is_some())
            .finish()
    }
}

impl RtcpTransceiverConfig {
    /// Checks the settings, logging why they are rejected.
    ///
    /// A zero feedback SSRC and missing receive statistics are accepted with
    /// a warning.
    pub fn validate(&self) -> Result<()> {
        let debug_id = &self.debug_id;

        if self.feedback_ssrc == 0 {
            warn!("{debug_id}ssrc 0 may be treated by some implementations as invalid");
        }
        if self.cname.len() > MAX_CNAME_LENGTH {
            error!("{debug_id}cname can be maximum {MAX_CNAME_LENGTH} characters");
            return Err(Error::ErrCnameTooLong(self.cname.len(), MAX_CNAME_LENGTH));
        }
        if self.max_packet_size < MIN_MAX_PACKET_SIZE {
            error!(
                "{debug_id}max packet size {} is too small",
                self.max_packet_size
            );
            return Err(Error::ErrMaxPacketSizeTooSmall(
                self.max_packet_size,
                MIN_MAX_PACKET_SIZE,
            ));
        }
        if self.max_packet_size > IP_PACKET_SIZE {
            error!(
                "{debug_id}max packet size {} more than {IP_PACKET_SIZE} is unsupported",
                self.max_packet_size
            );
            return Err(Error::ErrMaxPacketSizeTooLarge(
                self.max_packet_size,
                IP_PACKET_SIZE,
            ));
        }
        if self.outgoing_transport.is_none() {
            error!("{debug_id}outgoing transport must be set");
            return Err(Error::ErrNoOutgoingTransport);
        }
        if self.min_periodic_report.is_zero() {
            error!("{debug_id}period between reports should be positive");
            return Err(Error::ErrNonPositiveReportPeriod);
        }
        if self.min_periodic_report > MAX_REPORT_PERIOD {
            error!(
                "{debug_id}period between reports {:?} is longer than {MAX_REPORT_PERIOD:?}",
                self.min_periodic_report
            );
            return Err(Error::ErrReportPeriodTooLong(
                self.min_periodic_report,
                MAX_REPORT_PERIOD,
            ));
        }
        if self.receive_statistics.is_none() {
            warn!("{debug_id}receive statistics should be set to generate rtcp report blocks");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullTransport;

    impl Transport for NullTransport {
        fn send_rtcp(&self, _packet: &[u8]) -> Result<()> {
            Ok(())
        }
    }

    fn valid_config() -> RtcpTransceiverConfig {
        RtcpTransceiverConfig {
            outgoing_transport: Some(Arc::new(NullTransport)),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_needs_transport() {
        assert_eq!(
            RtcpTransceiverConfig::default().validate(),
            Err(Error::ErrNoOutgoingTransport)
        );
        assert_eq!(valid_config().validate(), Ok(()));
    }

    #[test]
    fn test_validate() {
        type Modify = Box<dyn Fn(&mut RtcpTransceiverConfig)>;
        let tests: Vec<(&str, Modify, Result<()>)> = vec![
            (
                "zero ssrc only warns",
                Box::new(|c: &mut RtcpTransceiverConfig| c.feedback_ssrc = 0),
                Ok(()),
            ),
            (
                "cname at limit",
                Box::new(|c: &mut RtcpTransceiverConfig| c.cname = "a".repeat(255)),
                Ok(()),
            ),
            (
                "cname too long",
                Box::new(|c: &mut RtcpTransceiverConfig| c.cname = "a".repeat(256)),
                Err(Error::ErrCnameTooLong(256, 255)),
            ),
            (
                "packet size at lower limit",
                Box::new(|c: &mut RtcpTransceiverConfig| c.max_packet_size = 100),
                Ok(()),
            ),
            (
                "packet size too small",
                Box::new(|c: &mut RtcpTransceiverConfig| c.max_packet_size = 99),
                Err(Error::ErrMaxPacketSizeTooSmall(99, 100)),
            ),
            (
                "packet size at upper limit",
                Box::new(|c: &mut RtcpTransceiverConfig| c.max_packet_size = 1500),
                Ok(()),
            ),
            (
                "packet size too large",
                Box::new(|c: &mut RtcpTransceiverConfig| c.max_packet_size = 1501),
                Err(Error::ErrMaxPacketSizeTooLarge(1501, 1500)),
            ),
            (
                "zero period",
                Box::new(|c: &mut RtcpTransceiverConfig| c.min_periodic_report = Duration::ZERO),
                Err(Error::ErrNonPositiveReportPeriod),
            ),
            (
                "period at limit",
                Box::new(|c: &mut RtcpTransceiverConfig| c.min_periodic_report = MAX_REPORT_PERIOD),
                Ok(()),
            ),
            (
                "period too long",
                Box::new(|c: &mut RtcpTransceiverConfig| c.min_periodic_report = Duration::MAX),
                Err(Error::ErrReportPeriodTooLong(Duration::MAX, MAX_REPORT_PERIOD)),
            ),
        ];

        for (name, modify, want) in tests {
            let mut config = valid_config();
            modify(&mut config);
            assert_eq!(config.validate(), want, "{name}");
        }
    }
}
