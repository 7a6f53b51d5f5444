use crate::common_header::CompoundBlocks;
use crate::header::{PacketType, SSRC_LENGTH};

/// Returns the sender SSRC of a (possibly compound) RTCP packet.
///
/// The first SR, RR, BYE, RTPFB, PSFB or XR block decides: its first payload
/// word is the sender SSRC. SDES and APP blocks are skipped. A malformed
/// block, or a deciding block too short to carry an SSRC, yields `None`.
pub fn parse_rtcp_packet_sender_ssrc(packet: &[u8]) -> Option<u32> {
    for block in CompoundBlocks::new(packet) {
        let block = block.ok()?;
        match block.packet_type() {
            PacketType::Goodbye
            | PacketType::ExtendedReport
            | PacketType::PayloadSpecificFeedback
            | PacketType::ReceiverReport
            | PacketType::TransportSpecificFeedback
            | PacketType::SenderReport => {
                let payload = block.payload();
                if payload.len() < SSRC_LENGTH {
                    return None;
                }
                return Some(u32::from_be_bytes([
                    payload[0], payload[1], payload[2], payload[3],
                ]));
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::receiver_report::ReceiverReport;
    use crate::source_description::SourceDescription;
    use bytes::BytesMut;
    use shared::marshal::Marshal;

    #[test]
    fn test_sender_ssrc_from_receiver_report() {
        let rr = ReceiverReport {
            ssrc: 0x902f9e2e,
            ..Default::default()
        };
        let raw = rr.marshal().unwrap();
        assert_eq!(parse_rtcp_packet_sender_ssrc(&raw), Some(0x902f9e2e));
    }

    #[test]
    fn test_sender_ssrc_skips_leading_sdes() {
        let sdes = SourceDescription::with_cname(0x1111, "alice");
        let rr = ReceiverReport {
            ssrc: 0x2222,
            ..Default::default()
        };

        let mut compound = BytesMut::new();
        compound.extend_from_slice(&sdes.marshal().unwrap());
        compound.extend_from_slice(&rr.marshal().unwrap());

        assert_eq!(parse_rtcp_packet_sender_ssrc(&compound), Some(0x2222));
    }

    #[test]
    fn test_sender_ssrc_for_feedback_types() {
        for packet_type in [200u8, 203, 205, 206, 207] {
            let raw = [0x81, packet_type, 0x00, 0x01, 0x00, 0x00, 0x03, 0xe9];
            assert_eq!(
                parse_rtcp_packet_sender_ssrc(&raw),
                Some(1001),
                "packet type {packet_type}"
            );
        }
    }

    #[test]
    fn test_no_sender_ssrc() {
        // empty
        assert_eq!(parse_rtcp_packet_sender_ssrc(&[]), None);
        // SDES only
        let sdes = SourceDescription::with_cname(0x1111, "alice");
        assert_eq!(parse_rtcp_packet_sender_ssrc(&sdes.marshal().unwrap()), None);
        // BYE without sources
        assert_eq!(parse_rtcp_packet_sender_ssrc(&[0x80, 0xcb, 0x00, 0x00]), None);
        // truncated header
        assert_eq!(parse_rtcp_packet_sender_ssrc(&[0x80, 0xc9]), None);
        // not RTCP version 2
        assert_eq!(
            parse_rtcp_packet_sender_ssrc(&[0x40, 0xc9, 0x00, 0x01, 0, 0, 0, 1]),
            None
        );
    }

    #[test]
    fn test_malformed_block_before_sender_ssrc() {
        let raw = [
            // SDES claiming 8 payload words but carrying one
            0x81u8, 0xca, 0x00, 0x08, 0x00, 0x00, 0x00, 0x01, //
            0x80, 0xc9, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02,
        ];
        assert_eq!(parse_rtcp_packet_sender_ssrc(&raw), None);
    }
}
