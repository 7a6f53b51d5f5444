/// Notified when a stream identifier has been resolved to the SSRC it is
/// carried on, typically by whoever demuxes the RTP side.
pub trait SsrcBindingObserver {
    fn on_ssrc_bound_to_rsid(&mut self, _rsid: &str, _ssrc: u32) {}

    fn on_ssrc_bound_to_mid(&mut self, _mid: &str, _ssrc: u32) {}

    fn on_ssrc_bound_to_mid_rsid(&mut self, _mid: &str, _rsid: &str, _ssrc: u32) {}

    fn on_ssrc_bound_to_payload_type(&mut self, _payload_type: u8, _ssrc: u32) {}
}
