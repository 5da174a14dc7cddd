//! RFC 1071 Internet checksum with IPv6 pseudo-header friendly semantics.
//!
//! The only contract here is [`checksum`]: sum the data as big-endian 16-bit
//! words, fold carries back into the low 16 bits, and complement the result.
//! Callers build pseudo-headers by concatenating byte slices before calling
//! this function; this crate has no notion of IP addresses or headers.

/// Computes the RFC 1071 Internet checksum of `data`, seeded with `init`.
///
/// `init` lets callers fold several regions together without concatenating
/// them into one buffer first (e.g. pseudo-header, then message, then
/// payload) by threading the running accumulator's low-16-bit fold through
/// successive calls. Most callers just pass `0`.
///
/// If `data` has odd length, the trailing octet is treated as the high byte
/// of a final 16-bit word whose low byte is zero, per RFC 1071 §2.
pub fn checksum(data: &[u8], init: u16) -> u16 {
    let mut sum = init as u32;

    let mut chunks = data.chunks_exact(2);
    for word in &mut chunks {
        sum += u16::from_be_bytes([word[0], word[1]]) as u32;
    }
    if let [last] = *chunks.remainder() {
        sum += (last as u32) << 8;
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !(sum as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        let data = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(checksum(&data, 0), 0x220d);
    }

    #[test]
    fn empty_input() {
        assert_eq!(checksum(&[], 0), 0xffff);
    }

    #[test]
    fn odd_length_uses_trailing_byte_as_high_byte() {
        let even = checksum(&[0x12, 0x34, 0x56, 0x00], 0);
        let odd = checksum(&[0x12, 0x34, 0x56], 0);
        assert_eq!(even, odd);
    }

    fn field_verifies(data: &mut [u8], field_offset: usize) {
        data[field_offset] = 0;
        data[field_offset + 1] = 0;
        let value = checksum(data, 0);
        data[field_offset..field_offset + 2].copy_from_slice(&value.to_be_bytes());
        assert_eq!(checksum(data, 0), 0);
    }

    #[test]
    fn inserting_checksum_into_zeroed_field_verifies() {
        let mut data = vec![0xde, 0xad, 0xbe, 0xef, 0x01, 0x02, 0x03, 0x04, 0x05];
        field_verifies(&mut data, 2);
    }

    #[test]
    fn inserting_checksum_into_zeroed_field_verifies_odd_length() {
        let mut data = vec![0xde, 0xad, 0xbe, 0xef, 0x01, 0x02, 0x03];
        field_verifies(&mut data, 0);
    }

    proptest::proptest! {
        #[test]
        fn checksum_field_always_verifies(mut data in proptest::collection::vec(proptest::prelude::any::<u8>(), 2..256)) {
            let len = data.len();
            let offset = if len >= 4 { (len / 2) & !1 } else { 0 };
            data[offset] = 0;
            data[offset + 1] = 0;
            let value = checksum(&data, 0);
            data[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
            proptest::prop_assert_eq!(checksum(&data, 0), 0);
        }
    }
}
