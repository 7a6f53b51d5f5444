use rtcp::reception_report::ReceptionReport;

/// Source of reception statistics for outgoing receiver reports.
pub trait ReceiveStatisticsProvider: Send + Sync {
    /// Returns report blocks for at most `max_blocks` remote senders.
    fn rtcp_report_blocks(&self, max_blocks: usize) -> Vec<ReceptionReport>;
}
