//! Big-endian field readers.
//!
//! All multi-byte fields in geometry assets are big-endian. Callers check
//! bounds before reading; these helpers only slice.

/// Read a big-endian `u16` at `offset`.
#[inline]
pub(crate) fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

/// Read a big-endian `i16` at `offset`.
#[inline]
pub(crate) fn read_i16(data: &[u8], offset: usize) -> i16 {
    i16::from_be_bytes([data[offset], data[offset + 1]])
}

/// Read a big-endian 24-bit value at `offset`.
#[inline]
pub(crate) fn read_u24(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([0, data[offset], data[offset + 1], data[offset + 2]])
}

/// Read a big-endian `u32` at `offset`.
#[inline]
pub(crate) fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// Read a big-endian `u32` at `offset`, or `None` if it does not fit.
pub fn read_u32_checked(data: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    (end <= data.len()).then(|| read_u32(data, offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian() {
        let data = [0x12, 0x34, 0x56, 0x78, 0xFF, 0xFE];
        assert_eq!(read_u16(&data, 0), 0x1234);
        assert_eq!(read_u24(&data, 1), 0x34_5678);
        assert_eq!(read_u32(&data, 0), 0x1234_5678);
        assert_eq!(read_i16(&data, 4), -2);
    }

    #[test]
    fn checked_read_rejects_short_input() {
        let data = [0, 0, 0, 7];
        assert_eq!(read_u32_checked(&data, 0), Some(7));
        assert_eq!(read_u32_checked(&data, 1), None);
        assert_eq!(read_u32_checked(&data, usize::MAX), None);
    }
}
