/// Splits the CBOR metadata trailer ("auxdata") solc appends to bytecode.
///
/// The trailer is a CBOR map followed by its own length as a 2-byte
/// big-endian integer. Returns `(code, auxdata)` with the length bytes
/// included in `auxdata`, or `None` when no plausible trailer is present
/// (built with `bytecode_hash = none`, or truncated input).
pub fn split_auxdata(code: &[u8]) -> Option<(&[u8], &[u8])> {
    if code.len() < 4 {
        return None;
    }
    let len = u16::from_be_bytes([code[code.len() - 2], code[code.len() - 1]]) as usize;
    let total = len + 2;
    if len == 0 || total >= code.len() {
        return None;
    }
    let (head, tail) = code.split_at(code.len() - total);
    // CBOR major type 5 (map)
    if !matches!(tail[0], 0xa0..=0xbf) {
        return None;
    }
    Some((head, tail))
}

pub fn has_auxdata(code: &[u8]) -> bool {
    split_auxdata(code).is_some()
}
