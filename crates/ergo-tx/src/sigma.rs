//! Sigma register encoding/decoding utilities
//!
//! Ergo registers use Sigma serialization format:
//! - Type tag (1 byte): 0x04 Int, 0x05 Long, 0x0e Coll[Byte], 0x11 Coll[Long],
//!   0x59 (Long, Long)
//! - VLQ zigzag encoded value(s); collections are prefixed by a VLQ length

const TAG_INT: u8 = 0x04;
const TAG_LONG: u8 = 0x05;
const TAG_COLL_BYTE: u8 = 0x0e;
const TAG_COLL_LONG: u8 = 0x11;
const TAG_LONG_PAIR: u8 = 0x59;

/// Encode an i32 value as a Sigma Int register value (hex string)
/// Format: 0x04 (SInt type tag) + VLQ zigzag encoded value
pub fn encode_sigma_int(value: i32) -> String {
    let mut bytes = vec![TAG_INT];
    let zigzag = ((value << 1) ^ (value >> 31)) as u32;
    vlq_encode(&mut bytes, zigzag as u64);
    hex::encode(bytes)
}

/// Encode an i64 value as a Sigma Long register value (hex string)
/// Format: 0x05 (SLong type tag) + VLQ zigzag encoded value
pub fn encode_sigma_long(value: i64) -> String {
    let mut bytes = vec![TAG_LONG];
    push_long(&mut bytes, value);
    hex::encode(bytes)
}

/// Decode a Sigma Long from register hex string
/// Format: 0x05 (type tag) + VLQ zigzag encoded value
pub fn decode_sigma_long(hex_str: &str) -> Result<i64, SigmaDecodeError> {
    let mut reader = SigmaReader::new(hex_str)?;
    reader.expect_tag(TAG_LONG)?;
    reader.read_long()
}

/// Decode a register holding either a Sigma Int or a Sigma Long.
///
/// Height registers are written as Long by current builders but older boxes
/// may carry an Int.
pub fn decode_sigma_int_or_long(hex_str: &str) -> Result<i64, SigmaDecodeError> {
    let mut reader = SigmaReader::new(hex_str)?;
    match reader.read_tag()? {
        TAG_LONG => reader.read_long(),
        TAG_INT => reader.read_zigzag().map(|v| v as i32 as i64),
        found => Err(SigmaDecodeError::InvalidTypeTag {
            expected: TAG_LONG,
            found,
        }),
    }
}

/// Encode a `(Long, Long)` tuple as a Sigma register value (hex string).
///
/// Sigma serialization format:
/// ```text
/// 0x59                 -- type descriptor: (SLong, SLong) tuple
/// <zigzag-VLQ(a)>     -- first Long value (bare, no 0x05 type tag)
/// <zigzag-VLQ(b)>     -- second Long value (bare, no 0x05 type tag)
/// ```
pub fn encode_sigma_long_pair(a: i64, b: i64) -> String {
    let mut bytes = vec![TAG_LONG_PAIR];
    push_long(&mut bytes, a);
    push_long(&mut bytes, b);
    hex::encode(bytes)
}

/// Decode a `(Long, Long)` tuple register.
pub fn decode_sigma_long_pair(hex_str: &str) -> Result<(i64, i64), SigmaDecodeError> {
    let mut reader = SigmaReader::new(hex_str)?;
    reader.expect_tag(TAG_LONG_PAIR)?;
    let a = reader.read_long()?;
    let b = reader.read_long()?;
    Ok((a, b))
}

/// Encode a `Coll[SLong]` value as a Sigma register hex string.
///
/// ```text
/// 0x11      -- type descriptor: Coll[SLong]
/// <VLQ>     -- number of elements
/// <zigzag-VLQ> per element
/// ```
pub fn encode_sigma_coll_long(values: &[i64]) -> String {
    let mut bytes = vec![TAG_COLL_LONG];
    vlq_encode(&mut bytes, values.len() as u64);
    for &value in values {
        push_long(&mut bytes, value);
    }
    hex::encode(bytes)
}

/// Decode a `Coll[SLong]` register.
pub fn decode_sigma_coll_long(hex_str: &str) -> Result<Vec<i64>, SigmaDecodeError> {
    let mut reader = SigmaReader::new(hex_str)?;
    reader.expect_tag(TAG_COLL_LONG)?;
    reader.read_longs()
}

/// Decode a register holding a list of longs, either as `Coll[Long]` or as a
/// `(Long, Long)` tuple. Both shapes are found on-chain for two-element pairs.
pub fn decode_sigma_long_list(hex_str: &str) -> Result<Vec<i64>, SigmaDecodeError> {
    let mut reader = SigmaReader::new(hex_str)?;
    match reader.read_tag()? {
        TAG_COLL_LONG => reader.read_longs(),
        TAG_LONG_PAIR => Ok(vec![reader.read_long()?, reader.read_long()?]),
        found => Err(SigmaDecodeError::InvalidTypeTag {
            expected: TAG_COLL_LONG,
            found,
        }),
    }
}

/// Encode a `Coll[SByte]` value as a Sigma register hex string.
///
/// Sigma serialization format:
/// ```text
/// 0e        -- type descriptor: Coll[SByte]
/// <VLQ>     -- length of byte array
/// <bytes>   -- raw bytes
/// ```
pub fn encode_sigma_coll_byte(data: &[u8]) -> String {
    let mut bytes = vec![TAG_COLL_BYTE];
    vlq_encode(&mut bytes, data.len() as u64);
    bytes.extend_from_slice(data);
    hex::encode(bytes)
}

/// Decode a `Coll[SByte]` register into its raw bytes.
pub fn decode_sigma_coll_byte(hex_str: &str) -> Result<Vec<u8>, SigmaDecodeError> {
    let mut reader = SigmaReader::new(hex_str)?;
    reader.expect_tag(TAG_COLL_BYTE)?;
    let len = reader.read_vlq()? as usize;
    reader.take(len).map(|b| b.to_vec())
}

/// Errors that can occur during Sigma decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigmaDecodeError {
    InvalidHex,
    EmptyInput,
    InvalidTypeTag { expected: u8, found: u8 },
    InvalidLength { expected: usize, found: usize },
    Overflow,
}

impl std::fmt::Display for SigmaDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidHex => write!(f, "Invalid hex string"),
            Self::EmptyInput => write!(f, "Empty input"),
            Self::InvalidTypeTag { expected, found } => {
                write!(
                    f,
                    "Invalid type tag: expected 0x{:02x}, found 0x{:02x}",
                    expected, found
                )
            }
            Self::InvalidLength { expected, found } => {
                write!(
                    f,
                    "Invalid length: expected {} bytes, found {}",
                    expected, found
                )
            }
            Self::Overflow => write!(f, "Value overflow during VLQ decoding"),
        }
    }
}

impl std::error::Error for SigmaDecodeError {}

/// VLQ-encode a u64 value and append to buffer
fn vlq_encode(buf: &mut Vec<u8>, mut n: u64) {
    loop {
        let mut byte = (n & 0x7F) as u8;
        n >>= 7;
        if n != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if n == 0 {
            break;
        }
    }
}

/// Zigzag + VLQ encode a bare Long (no type tag)
fn push_long(buf: &mut Vec<u8>, value: i64) {
    // Bitwise zigzag handles i64::MIN without overflow
    let zigzag = ((value << 1) ^ (value >> 63)) as u64;
    vlq_encode(buf, zigzag);
}

/// Cursor over a decoded register value
struct SigmaReader {
    bytes: Vec<u8>,
    pos: usize,
}

impl SigmaReader {
    fn new(hex_str: &str) -> Result<Self, SigmaDecodeError> {
        let bytes = hex::decode(hex_str).map_err(|_| SigmaDecodeError::InvalidHex)?;
        if bytes.is_empty() {
            return Err(SigmaDecodeError::EmptyInput);
        }
        Ok(Self { bytes, pos: 0 })
    }

    fn read_tag(&mut self) -> Result<u8, SigmaDecodeError> {
        let tag = *self
            .bytes
            .get(self.pos)
            .ok_or(SigmaDecodeError::EmptyInput)?;
        self.pos += 1;
        Ok(tag)
    }

    fn expect_tag(&mut self, expected: u8) -> Result<(), SigmaDecodeError> {
        let found = self.read_tag()?;
        if found != expected {
            return Err(SigmaDecodeError::InvalidTypeTag { expected, found });
        }
        Ok(())
    }

    fn take(&mut self, len: usize) -> Result<&[u8], SigmaDecodeError> {
        let remaining = self.bytes.len() - self.pos;
        if len > remaining {
            return Err(SigmaDecodeError::InvalidLength {
                expected: len,
                found: remaining,
            });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_vlq(&mut self) -> Result<u64, SigmaDecodeError> {
        let mut result: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = *self
                .bytes
                .get(self.pos)
                .ok_or(SigmaDecodeError::InvalidLength {
                    expected: self.pos + 1,
                    found: self.bytes.len(),
                })?;
            self.pos += 1;
            result |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift >= 64 {
                return Err(SigmaDecodeError::Overflow);
            }
        }
    }

    fn read_zigzag(&mut self) -> Result<i64, SigmaDecodeError> {
        let raw = self.read_vlq()?;
        Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64))
    }

    fn read_long(&mut self) -> Result<i64, SigmaDecodeError> {
        self.read_zigzag()
    }

    fn read_longs(&mut self) -> Result<Vec<i64>, SigmaDecodeError> {
        let len = self.read_vlq()? as usize;
        (0..len).map(|_| self.read_long()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_sigma_long_zero() {
        let encoded = encode_sigma_long(0);
        assert_eq!(encoded, "0500"); // Type tag + zigzag(0) = 0
    }

    #[test]
    fn test_encode_sigma_long_positive() {
        assert_eq!(encode_sigma_long(1), "0502");
        assert_eq!(encode_sigma_long(100), "05c801"); // zigzag(100) = 200
    }

    #[test]
    fn test_encode_sigma_long_negative() {
        assert_eq!(encode_sigma_long(-1), "0501");
        assert_eq!(encode_sigma_long(-100), "05c701");
    }

    #[test]
    fn test_decode_sigma_long_extremes() {
        for value in [0i64, -1, 1_000_000_000, i64::MAX, i64::MIN] {
            let decoded = decode_sigma_long(&encode_sigma_long(value)).unwrap();
            assert_eq!(decoded, value, "Failed for {}", value);
        }
    }

    #[test]
    fn test_decode_sigma_long_errors() {
        assert!(decode_sigma_long("xyz").is_err());
        assert!(decode_sigma_long("").is_err());
        assert!(matches!(
            decode_sigma_long("0600"),
            Err(SigmaDecodeError::InvalidTypeTag {
                expected: 0x05,
                found: 0x06
            })
        ));
        // Continuation bit set with nothing following
        assert!(matches!(
            decode_sigma_long("0580"),
            Err(SigmaDecodeError::InvalidLength { .. })
        ));
    }

    #[test]
    fn test_encode_sigma_int() {
        assert_eq!(encode_sigma_int(0), "0400");
        // Buyback top-up selector used as a context extension value
        assert_eq!(encode_sigma_int(1), "0402");
        assert_eq!(encode_sigma_int(100), "04c801");
        assert_eq!(encode_sigma_int(-1), "0401");
    }

    #[test]
    fn test_decode_int_or_long() {
        assert_eq!(decode_sigma_int_or_long("04c801").unwrap(), 100);
        assert_eq!(decode_sigma_int_or_long("0401").unwrap(), -1);
        let height = encode_sigma_long(1_296_000);
        assert_eq!(decode_sigma_int_or_long(&height).unwrap(), 1_296_000);
        assert!(decode_sigma_int_or_long("0e00").is_err());
    }

    #[test]
    fn test_encode_sigma_long_pair() {
        // zigzag(1250)=2500 -> c413, zigzag(500)=1000 -> e807
        assert_eq!(encode_sigma_long_pair(1250, 500), "59c413e807");
        assert_eq!(encode_sigma_long_pair(0, 0), "590000");
        assert_eq!(encode_sigma_long_pair(-1, 1), "590102");
        assert_eq!(decode_sigma_long_pair("59c413e807").unwrap(), (1250, 500));
    }

    #[test]
    fn test_encode_coll_long() {
        assert_eq!(encode_sigma_coll_long(&[]), "1100");
        // len=3, zigzag(1)=2, zigzag(-1)=1, zigzag(100)=200
        assert_eq!(encode_sigma_coll_long(&[1, -1, 100]), "11030201c801");
        let buckets = [10i64, 5, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let decoded = decode_sigma_coll_long(&encode_sigma_coll_long(&buckets)).unwrap();
        assert_eq!(decoded, buckets.to_vec());
    }

    #[test]
    fn test_decode_long_list_accepts_both_shapes() {
        assert_eq!(decode_sigma_long_list("59c413e807").unwrap(), vec![1250, 500]);
        let coll = encode_sigma_coll_long(&[1250, 500]);
        assert_eq!(decode_sigma_long_list(&coll).unwrap(), vec![1250, 500]);
        assert!(matches!(
            decode_sigma_long_list("0500"),
            Err(SigmaDecodeError::InvalidTypeTag { found: 0x05, .. })
        ));
    }

    #[test]
    fn test_encode_coll_byte() {
        let box_id =
            hex::decode("abcdef0123456789abcdef0123456789abcdef0123456789abcdef0123456789")
                .unwrap();
        let encoded = encode_sigma_coll_byte(&box_id);
        // 0e (type) + 20 (length = 32) + 32 bytes
        assert!(encoded.starts_with("0e20"));
        assert_eq!(encoded.len(), 2 + 2 + 64);
        assert_eq!(decode_sigma_coll_byte(&encoded).unwrap(), box_id);
        assert_eq!(encode_sigma_coll_byte(&[]), "0e00");
    }

    #[test]
    fn test_decode_coll_byte_truncated() {
        // Declares 4 bytes, carries 2
        assert!(matches!(
            decode_sigma_coll_byte("0e04abcd"),
            Err(SigmaDecodeError::InvalidLength {
                expected: 4,
                found: 2
            })
        ));
    }

    #[test]
    fn test_vlq_multi_byte_length() {
        let large = vec![0xABu8; 200];
        let bytes = hex::decode(encode_sigma_coll_byte(&large)).unwrap();
        // VLQ(200) = [0xC8, 0x01]
        assert_eq!(&bytes[..3], &[0x0e, 0xC8, 0x01]);
        assert_eq!(bytes.len(), 3 + 200);
    }
}
