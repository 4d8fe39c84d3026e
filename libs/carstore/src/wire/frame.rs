//! Frames are the unit of a CAR archive: `<varint length><body>`.
//!
//! The first frame of an archive holds the CBOR header, every following frame holds a
//! block (`<cid><payload>`). Frames are read and written one at a time so neither side
//! ever needs to hold more than a single frame in memory.

use std::io::{Read, Write};

use crate::error::{CarError, Result};
use crate::wire::varint::UnsignedVarint;

/// Reads the length prefix of the next frame.
///
/// ## Returns
/// - `Ok(Some((body_length, prefix_size)))` for a well-formed prefix
/// - `Ok(None)` on a clean end of stream, i.e. right after a complete frame
/// - `Err(CarError::UnexpectedEof)` if the stream ended inside the prefix
/// - `Err(CarError::InvalidFrame)` for a zero length or an overflowing varint
pub fn read_frame_length<R: Read + ?Sized>(source: &mut R) -> Result<Option<(u64, usize)>> {
    let (length, prefix_size) = match UnsignedVarint::read_from(source) {
        Ok(Some((varint, size))) => (varint.0, size),
        Ok(None) => return Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            return Err(CarError::InvalidFrame(e.to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    if length == 0 {
        return Err(CarError::InvalidFrame("zero-length frame".to_owned()));
    }
    Ok(Some((length, prefix_size)))
}

/// Reads the next frame and returns its body.
///
/// `Ok(None)` means the stream ended cleanly between two frames. A stream ending before the
/// declared body length is reached fails with [CarError::UnexpectedEof].
pub fn read_frame<R: Read + ?Sized>(source: &mut R) -> Result<Option<Vec<u8>>> {
    let Some((length, _)) = read_frame_length(source)? else {
        return Ok(None);
    };
    // The buffer grows with the bytes actually available, the declared length is not trusted
    let mut body = Vec::new();
    let read = (&mut *source).take(length).read_to_end(&mut body)?;
    if (read as u64) < length {
        return Err(CarError::UnexpectedEof);
    }
    Ok(Some(body))
}

/// Writes one frame made of the concatenation of `parts` and flushes the sink.
///
/// Returns the total number of bytes written, length prefix included.
pub fn write_frame<W: Write + ?Sized>(sink: &mut W, parts: &[&[u8]]) -> Result<u64> {
    let body_length: usize = parts.iter().map(|part| part.len()).sum();
    if body_length == 0 {
        return Err(CarError::InvalidFrame("zero-length frame".to_owned()));
    }
    let prefix = UnsignedVarint(body_length as u64).encode();
    sink.write_all(&prefix)?;
    for part in parts {
        sink.write_all(part)?;
    }
    sink.flush()?;
    Ok((prefix.len() + body_length) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_frames() {
        let mut sink = Vec::new();
        assert_eq!(write_frame(&mut sink, &[b"abc", b"de"]).unwrap(), 6);
        assert_eq!(write_frame(&mut sink, &[b"fgh"]).unwrap(), 4);
        assert_eq!(sink, b"\x05abcde\x03fgh");

        let mut source = sink.as_slice();
        assert_eq!(read_frame(&mut source).unwrap().unwrap(), b"abcde");
        assert_eq!(read_frame(&mut source).unwrap().unwrap(), b"fgh");
        assert!(read_frame(&mut source).unwrap().is_none());
    }

    #[test]
    fn test_read_frame_truncated_body() {
        let mut source: &[u8] = b"\x05abc";
        let err = read_frame(&mut source).unwrap_err();
        assert!(err.is_truncation());
        assert_eq!(err.to_string(), "Unexpected end of file");
    }

    #[test]
    fn test_read_frame_truncated_prefix() {
        let mut source: &[u8] = &[0x80];
        assert!(read_frame(&mut source).unwrap_err().is_truncation());
    }

    #[test]
    fn test_read_frame_zero_length() {
        let mut source: &[u8] = &[0x00, 0x01];
        assert!(matches!(
            read_frame(&mut source),
            Err(CarError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_read_frame_huge_declared_length() {
        // Declares ~2^56 bytes but only carries 3: must fail without allocating the declared size
        let mut source: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F, 1, 2, 3];
        assert!(read_frame(&mut source).unwrap_err().is_truncation());
    }

    #[test]
    fn test_write_empty_frame_rejected() {
        let mut sink = Vec::new();
        assert!(write_frame(&mut sink, &[]).is_err());
        assert!(sink.is_empty());
    }
}
