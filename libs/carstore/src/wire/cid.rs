use std::io::{self, Read};
use std::str::FromStr;

use ciborium::Value;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

use crate::wire::varint::UnsignedVarint;

/// CBOR tag used by DAG-CBOR to mark a CID link.
const CID_CBOR_TAG: u64 = 42;

/// Multihash code of sha2-256, the only hash a CIDv0 can carry.
const SHA2_256: u64 = 0x12;

/// Represents a raw CID (Content Identifier) in byte format
///
/// The bytes are kept opaque: two RawCid are equal if and only if their binary
/// representation is equal. The canonical textual form of a RawCid is the lowercase
/// hexadecimal encoding of those bytes (see [RawCid::to_hex] and the [FromStr] impl).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawCid(Vec<u8>);

impl RawCid {
    /// Creates a new RawCid from a vector of bytes
    ///
    /// The bytes are not checked, use [RawCid::try_from_bytes] or [RawCid::validate]
    /// to make sure they describe a structurally valid CID.
    pub fn new(bytes: Vec<u8>) -> Self {
        RawCid(bytes)
    }

    /// Creates a RawCid from bytes, checking that they hold exactly one valid CID
    pub fn try_from_bytes(bytes: Vec<u8>) -> Result<Self, CidFormatError> {
        let (_, size) = Self::try_read_bytes(&bytes)?;
        if size != bytes.len() {
            return Err(CidFormatError::TrailingBytes(bytes.len() - size));
        }
        Ok(RawCid(bytes))
    }

    /// Creates a RawCid from a hexadecimal string representation
    pub fn from_hex(hex_str: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(hex_str)?;
        Ok(RawCid::new(bytes))
    }

    /// Returns the lowercase hexadecimal representation of the RawCid
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Returns the byte representation of the RawCid
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the RawCid and returns its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Checks that the bytes describe exactly one structurally valid CID
    pub fn validate(&self) -> Result<(), CidFormatError> {
        let (_, size) = Self::try_read_bytes(&self.0)?;
        if size != self.0.len() {
            return Err(CidFormatError::TrailingBytes(self.0.len() - size));
        }
        Ok(())
    }

    /// Tries to read a CID at the start of `bytes`
    ///
    /// # Returns
    ///
    /// * Ok((RawCid, cid_size)) - The CID and the number of bytes it occupies
    /// * Err(CidFormatError::InsufficientData) - `bytes` ends before the CID does
    /// * Err(CidFormatError) - The bytes do not start with a supported CID
    pub fn try_read_bytes(bytes: &[u8]) -> Result<(Self, usize), CidFormatError> {
        let mut cursor = bytes;
        Self::read_from(&mut cursor)
    }

    /// Reads a CID off a byte stream, consuming exactly the bytes of the CID
    ///
    /// Supported layouts:
    /// - CIDv0: a bare sha2-256 multihash, `0x12 0x20 <32 bytes digest>`
    /// - CIDv1: `0x01 <codec varint> <multihash code varint> <digest length varint> <digest>`
    pub fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<(Self, usize), CidFormatError> {
        let mut recorder = Recorder {
            inner: reader,
            bytes: Vec::with_capacity(40),
        };
        match read_varint(&mut recorder)? {
            SHA2_256 => {
                let digest_len = read_varint(&mut recorder)?;
                if digest_len != 32 {
                    return Err(CidFormatError::InvalidDigestLength(digest_len));
                }
                read_digest(&mut recorder, digest_len)?;
            }
            1 => {
                let _codec = read_varint(&mut recorder)?;
                let _hash_code = read_varint(&mut recorder)?;
                let digest_len = read_varint(&mut recorder)?;
                read_digest(&mut recorder, digest_len)?;
            }
            version => return Err(CidFormatError::UnsupportedVersion(version)),
        }
        let size = recorder.bytes.len();
        Ok((RawCid::new(recorder.bytes), size))
    }
}

/// Read adapter keeping a copy of every byte read through it
struct Recorder<'a, R: ?Sized> {
    inner: &'a mut R,
    bytes: Vec<u8>,
}

impl<R: Read + ?Sized> Read for Recorder<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bytes.extend_from_slice(&buf[..n]);
        Ok(n)
    }
}

fn read_varint<R: Read>(reader: &mut R) -> Result<u64, CidFormatError> {
    match UnsignedVarint::read_from(reader) {
        Ok(Some((varint, _))) => Ok(varint.0),
        Ok(None) => Err(CidFormatError::InsufficientData),
        Err(e) => Err(CidFormatError::from_io(e)),
    }
}

fn read_digest<R: Read>(reader: &mut R, len: u64) -> Result<(), CidFormatError> {
    // Bounded by `take` so a bogus length never turns into a huge allocation
    let mut digest = Vec::new();
    let read = reader
        .take(len)
        .read_to_end(&mut digest)
        .map_err(CidFormatError::from_io)?;
    if (read as u64) < len {
        return Err(CidFormatError::InsufficientData);
    }
    Ok(())
}

impl std::fmt::Debug for RawCid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawCid({})", hex::encode(&self.0))
    }
}

impl std::fmt::Display for RawCid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl FromStr for RawCid {
    type Err = CidFormatError;

    /// Parses the canonical (hexadecimal) form of a CID and checks its structure
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        RawCid::try_from_bytes(bytes)
    }
}

impl AsRef<[u8]> for RawCid {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(feature = "cid")]
impl From<&cid::Cid> for RawCid {
    fn from(cid: &cid::Cid) -> Self {
        RawCid::new(cid.to_bytes())
    }
}

#[cfg(feature = "cid")]
impl TryFrom<&RawCid> for cid::Cid {
    type Error = cid::Error;

    fn try_from(raw: &RawCid) -> Result<Self, Self::Error> {
        cid::Cid::try_from(raw.bytes())
    }
}

impl Serialize for RawCid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // DAG-CBOR links carry the identity multibase prefix (0x00) before the binary CID
        let mut bytes = Vec::with_capacity(self.0.len() + 1);
        bytes.push(0x00);
        bytes.extend_from_slice(&self.0);
        let value = Value::Tag(CID_CBOR_TAG, Box::new(Value::Bytes(bytes)));
        value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RawCid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if let Value::Tag(CID_CBOR_TAG, boxed_value) = value {
            if let Value::Bytes(mut bytes) = *boxed_value {
                if bytes.first() == Some(&0x00) {
                    bytes.remove(0);
                    return RawCid::try_from_bytes(bytes).map_err(D::Error::custom);
                }
            }
        }
        Err(D::Error::custom("Invalid CID format"))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CidFormatError {
    #[error("Insufficient data for CID")]
    InsufficientData,
    #[error("Unsupported CID version {0}")]
    UnsupportedVersion(u64),
    #[error("Invalid digest length {0} for a CIDv0")]
    InvalidDigestLength(u64),
    #[error("Invalid varint in CID")]
    InvalidVarint,
    #[error("{0} unexpected trailing bytes after CID")]
    TrailingBytes(usize),
    #[error("Invalid hexadecimal CID: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("I/O error while reading CID: {0}")]
    Io(io::Error),
}

impl CidFormatError {
    fn from_io(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => CidFormatError::InsufficientData,
            io::ErrorKind::InvalidData => CidFormatError::InvalidVarint,
            _ => CidFormatError::Io(e),
        }
    }
}


#[cfg(all(test, feature = "cid"))]
mod cid_bridge_tests {
    use super::RawCid;

    const CIDV1_DAG_CBOR: &str =
        "01711220f88bc853804cf294fe417e4fa83028689fcdb1b1592c5102e1474dbc200fab8b";
    const CIDV0: &str = "122002acecc5de2438ea4126a3010ecb1f8a599c8eff22fff1a1dcffe999b27fd3de";

    #[test]
    fn test_raw_cid_to_cid_and_back() {
        for hex in [CIDV1_DAG_CBOR, CIDV0] {
            let raw: RawCid = hex.parse().unwrap();
            let cid = cid::Cid::try_from(&raw).unwrap();
            assert_eq!(cid.to_bytes(), raw.bytes());
            assert_eq!(RawCid::from(&cid), raw);
        }
    }

    #[test]
    fn test_raw_cid_to_cid_codec() {
        let raw: RawCid = CIDV1_DAG_CBOR.parse().unwrap();
        let cid = cid::Cid::try_from(&raw).unwrap();
        assert_eq!(cid.version(), cid::Version::V1);
        assert_eq!(cid.codec(), 0x71);
        assert_eq!(cid.hash().code(), 0x12);
    }

    #[test]
    fn test_invalid_raw_cid_is_rejected() {
        assert!(cid::Cid::try_from(&RawCid::new(b"blip".to_vec())).is_err());
    }
}
