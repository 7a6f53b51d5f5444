//! Legal names for the RTP stream identifiers carried in header extensions.

/// Both MID and RSID values are carried in a one-byte header extension,
/// which caps them at 16 bytes.
pub const MAX_STREAM_ID_LENGTH: usize = 16;

/// RSID (RFC 8852) is an `rid-id`: alphanumeric characters only.
pub fn is_legal_rsid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_STREAM_ID_LENGTH
        && name.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// MID (RFC 5888) is an SDP `token`.
pub fn is_legal_mid_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= MAX_STREAM_ID_LENGTH && name.bytes().all(is_token_char)
}

fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'^'
                | b'_'
                | b'`'
                | b'{'
                | b'|'
                | b'}'
                | b'~'
        )
}
