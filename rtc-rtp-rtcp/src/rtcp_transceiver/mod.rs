//! RTCP Transceiver - sends periodic Receiver Reports from a process thread.

pub(crate) mod config;
mod packet_sender;

use crate::receive_statistics::ReceiveStatisticsProvider;
use crate::transport::Transport;
use config::RtcpTransceiverConfig;
use log::{trace, warn};
use packet_sender::PacketSender;
use parking_lot::Mutex;
use rtcp::receiver_report::{MAX_NUMBER_OF_REPORT_BLOCKS, ReceiverReport};
use rtcp::source_description::SourceDescription;
use shared::error::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use utility::{Module, ProcessThreadHandle};

/// Builder for the [`RtcpTransceiver`].
///
/// # Example
///
/// ```ignore
/// use rtc_rtp_rtcp::RtcpTransceiverBuilder;
/// use std::time::Duration;
///
/// let transceiver = RtcpTransceiverBuilder::new()
///     .with_feedback_ssrc(0x1234)
///     .with_outgoing_transport(transport)
///     .with_min_periodic_report(Duration::from_millis(500))
///     .build()?;
/// ```
#[derive(Default)]
pub struct RtcpTransceiverBuilder {
    config: RtcpTransceiverConfig,
}

impl RtcpTransceiverBuilder {
    /// Create a new builder with default settings.
    ///
    /// Defaults: feedback ssrc 1, no cname, 1200 byte packets, one report
    /// per second. An outgoing transport must be set before `build`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debug_id(mut self, debug_id: impl Into<String>) -> Self {
        self.config.debug_id = debug_id.into();
        self
    }

    pub fn with_feedback_ssrc(mut self, feedback_ssrc: u32) -> Self {
        self.config.feedback_ssrc = feedback_ssrc;
        self
    }

    pub fn with_cname(mut self, cname: impl Into<String>) -> Self {
        self.config.cname = cname.into();
        self
    }

    pub fn with_max_packet_size(mut self, max_packet_size: usize) -> Self {
        self.config.max_packet_size = max_packet_size;
        self
    }

    pub fn with_outgoing_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.config.outgoing_transport = Some(transport);
        self
    }

    pub fn with_min_periodic_report(mut self, period: Duration) -> Self {
        self.config.min_periodic_report = period;
        self
    }

    pub fn with_receive_statistics(mut self, statistics: Arc<dyn ReceiveStatisticsProvider>) -> Self {
        self.config.receive_statistics = Some(statistics);
        self
    }

    /// Validates the settings and creates the transceiver.
    pub fn build(self) -> Result<RtcpTransceiver> {
        RtcpTransceiver::new(self.config)
    }
}

/// Periodic RTCP feedback sender.
///
/// Register it with a [`utility::ProcessThread`]: every processing run
/// sends one compound packet made of a Receiver Report and, when a CNAME is
/// configured, an SDES chunk. The first report is due as soon as the
/// transceiver is driven, then one per `min_periodic_report`.
pub struct RtcpTransceiver {
    config: RtcpTransceiverConfig,
    next_report: Mutex<Instant>,
    process_thread: Mutex<Option<ProcessThreadHandle>>,
}

impl RtcpTransceiver {
    pub fn new(config: RtcpTransceiverConfig) -> Result<Self> {
        config.validate()?;
        Ok(RtcpTransceiver {
            config,
            next_report: Mutex::new(Instant::now()),
            process_thread: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &RtcpTransceiverConfig {
        &self.config
    }

    /// Sends a report as soon as the process thread is free. Does nothing
    /// while the transceiver is not attached to a process thread.
    pub fn force_send_report(&self) {
        // Released before waking up: the process thread takes its own lock
        // and then ours when attaching.
        let process_thread = self.process_thread.lock().clone();
        match process_thread {
            Some(process_thread) => process_thread.wake_up(),
            None => trace!(
                "{}report not forced, no process thread attached",
                self.config.debug_id
            ),
        }
    }

    fn send_report(&self) {
        let Some(transport) = self.config.outgoing_transport.as_deref() else {
            return;
        };
        let mut sender = PacketSender::new(
            transport,
            self.config.max_packet_size,
            &self.config.debug_id,
        );

        let mut reports = self
            .config
            .receive_statistics
            .as_ref()
            .map(|statistics| statistics.rtcp_report_blocks(MAX_NUMBER_OF_REPORT_BLOCKS))
            .unwrap_or_default();
        // TODO: send report blocks beyond the first 31 in additional RRs.
        reports.truncate(MAX_NUMBER_OF_REPORT_BLOCKS);

        let rr = ReceiverReport {
            ssrc: self.config.feedback_ssrc,
            reports,
            ..Default::default()
        };
        if let Err(err) = sender.add_block(&rr) {
            warn!("{}failed to add receiver report: {err}", self.config.debug_id);
        }

        if !self.config.cname.is_empty() {
            let sdes = SourceDescription::with_cname(self.config.feedback_ssrc, &self.config.cname);
            if let Err(err) = sender.add_block(&sdes) {
                warn!(
                    "{}failed to add cname {} to rtcp sdes packet: {err}",
                    self.config.debug_id, self.config.cname
                );
            }
        }

        sender.send();
    }
}

impl Module for RtcpTransceiver {
    fn time_until_next_process(&self) -> i64 {
        millis_until(*self.next_report.lock(), Instant::now())
    }

    fn process(&self) {
        self.send_report();
        *self.next_report.lock() = Instant::now() + self.config.min_periodic_report;
    }

    fn process_thread_attached(&self, process_thread: Option<ProcessThreadHandle>) {
        *self.process_thread.lock() = process_thread;
    }
}

/// Signed milliseconds from `now` to `deadline`, rounded up when positive.
fn millis_until(deadline: Instant, now: Instant) -> i64 {
    if deadline >= now {
        let micros = deadline.duration_since(now).as_micros();
        i64::try_from(micros.div_ceil(1000)).unwrap_or(i64::MAX)
    } else {
        let millis = now.duration_since(deadline).as_millis();
        i64::try_from(millis).map(|ms| -ms).unwrap_or(i64::MIN)
    }
}
