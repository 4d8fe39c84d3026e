use serde::{Deserialize, Serialize};

use crate::error::{CarError, Result};
use crate::wire::cid::RawCid;

/// The only CAR version this crate reads and writes.
pub const CAR_V1_VERSION: u64 = 1;

/// CAR v1 Header structure
///
/// # Fields
/// - `roots`: The root CIDs of the archive, in order. They are metadata only and
///   do not need to be stored as blocks of the archive.
/// - `version`: The version of the CAR format (1 for CAR v1)
///
/// Fields are declared in the order used by the reference implementations so the encoded
/// header matches their output byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarHeader {
    roots: Vec<RawCid>,
    version: u64,
}

impl CarHeader {
    /// Creates a new CAR v1 header with the specified root CIDs
    pub fn new(roots: Vec<RawCid>) -> Self {
        CarHeader {
            roots,
            version: CAR_V1_VERSION,
        }
    }

    /// Returns the version of the CAR format
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the root CIDs
    pub fn roots(&self) -> &[RawCid] {
        &self.roots
    }

    /// Consumes the header and returns the root CIDs
    pub fn into_roots(self) -> Vec<RawCid> {
        self.roots
    }

    /// Checks if there are no root CIDs in the header
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Encodes the header as a CBOR frame body (without the length prefix)
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf)?;
        Ok(buf)
    }

    /// Decodes a header from a CBOR frame body, rejecting unknown versions
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header: CarHeader = ciborium::from_reader(bytes)?;
        if header.version != CAR_V1_VERSION {
            return Err(CarError::InvalidVersion(header.version));
        }
        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAR_V1_HEADER1: [u8; 99] = [
        0xA2, 0x65, 0x72, 0x6F, 0x6F, 0x74, 0x73, 0x82, 0xD8, 0x2A, 0x58, 0x25, 0x00, 0x01, 0x71,
        0x12, 0x20, 0xF8, 0x8B, 0xC8, 0x53, 0x80, 0x4C, 0xF2, 0x94, 0xFE, 0x41, 0x7E, 0x4F, 0xA8,
        0x30, 0x28, 0x68, 0x9F, 0xCD, 0xB1, 0xB1, 0x59, 0x2C, 0x51, 0x02, 0xE1, 0x47, 0x4D, 0xBC,
        0x20, 0x0F, 0xAB, 0x8B, 0xD8, 0x2A, 0x58, 0x25, 0x00, 0x01, 0x71, 0x12, 0x20, 0x69, 0xEA,
        0x07, 0x40, 0xF9, 0x80, 0x7A, 0x28, 0xF4, 0xD9, 0x32, 0xC6, 0x2E, 0x7C, 0x1C, 0x83, 0xBE,
        0x05, 0x5E, 0x55, 0x07, 0x2C, 0x90, 0x26, 0x6A, 0xB3, 0xE7, 0x9D, 0xF6, 0x3A, 0x36, 0x5B,
        0x67, 0x76, 0x65, 0x72, 0x73, 0x69, 0x6F, 0x6E, 0x01,
    ];

    fn fixture_roots() -> Vec<RawCid> {
        vec![
            RawCid::from_hex(
                "01711220f88bc853804cf294fe417e4fa83028689fcdb1b1592c5102e1474dbc200fab8b",
            )
            .unwrap(),
            RawCid::from_hex(
                "0171122069ea0740f9807a28f4d932c62e7c1c83be055e55072c90266ab3e79df63a365b",
            )
            .unwrap(),
        ]
    }

    #[test]
    fn test_car_v1_header_deserialization() {
        let header = CarHeader::from_bytes(&CAR_V1_HEADER1).unwrap();
        assert_eq!(header.version(), 1);
        assert_eq!(header.roots(), fixture_roots().as_slice());
    }

    #[test]
    fn test_car_v1_header_serialization_matches_go_car() {
        let header = CarHeader::new(fixture_roots());
        assert_eq!(header.to_bytes().unwrap(), CAR_V1_HEADER1.to_vec());
    }

    #[test]
    fn test_car_v1_header_empty_roots() {
        let header = CarHeader::new(Vec::new());
        let decoded = CarHeader::from_bytes(&header.to_bytes().unwrap()).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_car_v1_header_rejects_other_versions() {
        let mut bytes = CAR_V1_HEADER1;
        bytes[98] = 0x02;
        assert!(matches!(
            CarHeader::from_bytes(&bytes),
            Err(CarError::InvalidVersion(2))
        ));
    }

    #[test]
    fn test_car_v1_header_rejects_garbage() {
        assert!(matches!(
            CarHeader::from_bytes(b"blip"),
            Err(CarError::InvalidHeader(_))
        ));
        // A map without roots
        assert!(matches!(
            CarHeader::from_bytes(&[0xA1, 0x67, b'v', b'e', b'r', b's', b'i', b'o', b'n', 0x01]),
            Err(CarError::InvalidHeader(_))
        ));
    }
}
