use bytes::BufMut;

/// get_padding_size returns the padding required to make the length a multiple of 4
pub(crate) fn get_padding_size(len: usize) -> usize {
    if len % 4 == 0 { 0 } else { 4 - (len % 4) }
}

/// put_padding fills the trailing `padding_size` bytes of the packet. The last
/// byte carries the padding count, as required by RFC 3550 section 6.4.1.
pub(crate) fn put_padding(buf: &mut [u8], offset: usize, padding_size: usize) {
    if padding_size == 0 {
        return;
    }
    let mut buf = &mut buf[offset..];
    for _ in 0..padding_size - 1 {
        buf.put_u8(0);
    }
    buf.put_u8(padding_size as u8);
}
