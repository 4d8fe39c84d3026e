//! CAR archives prefix every frame with its length, encoded as an unsigned variable-length
//! integer (varint).
//!
//! CAR varints follow the [LEB128 encoding scheme](https://en.wikipedia.org/wiki/LEB128):
//! seven bits of payload per byte, least significant group first, with the high bit set on
//! every byte but the last.

use std::io::{self, Read};

/// Unsigned variable-length integer (varint) as used in CAR files.
///
/// - Use `UnsignedVarint::encode()` to encode the varint into a vector of bytes.
/// - Use `UnsignedVarint::decode(bytes)` to decode a varint from a slice of bytes, which returns
///   the decoded varint and the number of bytes read.
/// - Use `UnsignedVarint::read_from(reader)` to decode a varint straight off a byte stream.
///
/// ## Examples
/// ```
/// use carstore::wire::varint::UnsignedVarint;
///
/// let varint = UnsignedVarint(624485);
/// let encoded = varint.encode();
/// assert_eq!(encoded, vec![0xE5, 0x8E, 0x26]);
///
/// let (decoded, bytes_read) = UnsignedVarint::decode(&encoded).unwrap();
/// assert_eq!(decoded, UnsignedVarint(624485));
/// assert_eq!(bytes_read, encoded.len());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsignedVarint(
    /// The underlying unsigned integer value of the varint.
    pub u64,
);

impl UnsignedVarint {
    /// Encodes the UnsignedVarint into a vector of bytes using LEB128 encoding.
    pub fn encode(self) -> Vec<u8> {
        let mut value = self.0;
        let mut bytes = Vec::with_capacity(10);
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80; // Set continuation bit
            }
            bytes.push(byte);
            if value == 0 {
                break;
            }
        }
        bytes
    }

    /// Decodes an UnsignedVarint from a slice of bytes.
    ///
    /// ## Returns
    /// - `Some((UnsignedVarint, bytes_read))` if decoding is successful.
    /// - `None` if the input bytes do not represent a valid varint (e.g., incomplete varint or overflow).
    pub fn decode(bytes: &[u8]) -> Option<(Self, usize)> {
        let mut result = 0u64;
        let mut shift = 0;
        for (i, &byte) in bytes.iter().enumerate() {
            let value = (byte & 0x7F) as u64;
            if shift == 63 && value > 1 {
                return None; // Overflow
            }
            result |= value << shift;
            if (byte & 0x80) == 0 {
                return Some((UnsignedVarint(result), i + 1));
            }
            shift += 7;
            if shift >= 64 {
                return None; // Overflow
            }
        }
        None // Incomplete varint
    }

    /// Reads an UnsignedVarint from a byte stream, one byte at a time.
    ///
    /// Only the bytes belonging to the varint are consumed from `reader`, so the caller can keep
    /// reading the rest of the frame from the same stream.
    ///
    /// ## Returns
    /// - `Ok(Some((UnsignedVarint, bytes_read)))` if a varint was read.
    /// - `Ok(None)` if the stream was already exhausted (no byte could be read at all).
    /// - `Err(_)` of kind [io::ErrorKind::UnexpectedEof] if the stream ended in the middle of the
    ///   varint, or [io::ErrorKind::InvalidData] if the varint overflows 64 bits.
    pub fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Option<(Self, usize)>> {
        let mut result = 0u64;
        let mut shift = 0;
        let mut read = 0;
        let mut byte = [0u8; 1];
        loop {
            match reader.read(&mut byte) {
                Ok(0) if read == 0 => return Ok(None),
                Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
            read += 1;
            let value = (byte[0] & 0x7F) as u64;
            // The 10th byte only has room for the 64th bit
            if shift == 63 && value > 1 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "varint overflows 64 bits",
                ));
            }
            result |= value << shift;
            if (byte[0] & 0x80) == 0 {
                return Ok(Some((UnsignedVarint(result), read)));
            }
            shift += 7;
            if shift >= 64 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "varint overflows 64 bits",
                ));
            }
        }
    }
}

impl From<u64> for UnsignedVarint {
    fn from(value: u64) -> Self {
        UnsignedVarint(value)
    }
}

impl From<UnsignedVarint> for u64 {
    fn from(varint: UnsignedVarint) -> Self {
        varint.0
    }
}

#[cfg(test)]
mod tests {
    use super::UnsignedVarint;

    #[test]
    fn test_unsigned_varint_encoding() {
        let varint = UnsignedVarint(624485);
        let expected = vec![0xE5, 0x8E, 0x26];
        assert_eq!(varint.encode(), expected);
    }

    #[test]
    fn test_unsigned_varint_single_byte_values() {
        assert_eq!(UnsignedVarint(0).encode(), vec![0x00]);
        assert_eq!(UnsignedVarint(127).encode(), vec![0x7F]);
        assert_eq!(UnsignedVarint(128).encode(), vec![0x80, 0x01]);
    }

    #[test]
    fn test_unsigned_varint_decode_car_header_size() {
        let car = include_bytes!("../res/carv1-basic.car");
        let (decoded, bytes_read) = UnsignedVarint::decode(&car[..12]).unwrap();
        assert_eq!(decoded, UnsignedVarint(99));
        assert_eq!(bytes_read, 1);
    }

    #[test]
    fn test_unsigned_varint_decode_incomplete() {
        assert_eq!(UnsignedVarint::decode(&[0xE5, 0x8E]), None);
        assert_eq!(UnsignedVarint::decode(&[]), None);
    }

    #[test]
    fn test_unsigned_varint_read_from_stream_leaves_rest() {
        let bytes = [0xE5, 0x8E, 0x26, 0xAA, 0xBB];
        let mut cursor = &bytes[..];
        let (decoded, bytes_read) = UnsignedVarint::read_from(&mut cursor).unwrap().unwrap();
        assert_eq!(decoded, UnsignedVarint(624485));
        assert_eq!(bytes_read, 3);
        assert_eq!(cursor, &[0xAA, 0xBB]);
    }

    #[test]
    fn test_unsigned_varint_read_from_clean_eof() {
        let mut cursor: &[u8] = &[];
        assert!(UnsignedVarint::read_from(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn test_unsigned_varint_read_from_truncated() {
        let mut cursor: &[u8] = &[0xE5, 0x8E];
        let err = UnsignedVarint::read_from(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_unsigned_varint_max_value() {
        let bytes = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        assert_eq!(UnsignedVarint(u64::MAX).encode(), bytes.to_vec());
        assert_eq!(
            UnsignedVarint::decode(&bytes),
            Some((UnsignedVarint(u64::MAX), 10))
        );
        let mut cursor = &bytes[..];
        assert_eq!(
            UnsignedVarint::read_from(&mut cursor).unwrap(),
            Some((UnsignedVarint(u64::MAX), 10))
        );
    }

    #[test]
    fn test_unsigned_varint_tenth_byte_overflow() {
        let bytes = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02];
        assert_eq!(UnsignedVarint::decode(&bytes), None);
        let mut cursor = &bytes[..];
        let err = UnsignedVarint::read_from(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_unsigned_varint_read_from_overflow() {
        let mut cursor: &[u8] = &[0xFF; 11];
        let err = UnsignedVarint::read_from(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
