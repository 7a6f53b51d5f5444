#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = rtc_rtcp::sender_ssrc::parse_rtcp_packet_sender_ssrc(data);
    for block in rtc_rtcp::common_header::CompoundBlocks::new(data) {
        if block.is_err() {
            break;
        }
    }
});
