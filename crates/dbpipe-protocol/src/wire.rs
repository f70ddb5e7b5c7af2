//! Wire codec for the primitive field types.
//!
//! Every field is written in a fixed big-endian layout shared with the
//! driver; nothing is negotiated per message:
//!
//! ```text
//! Int32     4 bytes, two's complement
//! Int64     8 bytes, two's complement
//! Double    8 bytes, IEEE-754 bit pattern
//! String    u32 byte length, then the UTF-8 bytes (no terminator)
//! Record(n) exactly n opaque bytes, size known from the shape
//! Sequence  u32 element count, then each element
//! ```
//!
//! Decoding is driven by the expected [`WireType`]: the codec reads exactly
//! the bytes of that shape from the channel and nothing more. Declared
//! lengths are checked against [`WireLimits`] before anything is read or
//! allocated for them.

use serde::Serialize;

use crate::channel::Channel;
use crate::error::{ProtocolError, WireError, WireResult};

/// Default limit for one string or record (1 MiB).
pub const DEFAULT_MAX_FIELD_LEN: u32 = 1024 * 1024;

/// Default limit for the element count of one sequence.
pub const DEFAULT_MAX_SEQUENCE_LEN: u32 = 65_536;

/// Size of a length or count prefix.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Sequences reserve at most this many slots before elements arrive.
const SEQUENCE_PREALLOC: usize = 64;

/// Expected shape of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Int32,
    Int64,
    Double,
    String,
    /// Opaque record of a fixed number of bytes.
    Record(usize),
    /// Count-prefixed sequence of elements of one shape.
    Sequence(&'static WireType),
}

impl WireType {
    /// Short name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Double => "double",
            Self::String => "string",
            Self::Record(_) => "record",
            Self::Sequence(_) => "sequence",
        }
    }
}

/// A decoded (or to-be-encoded) field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireValue {
    Int32(i32),
    Int64(i64),
    Double(f64),
    String(String),
    Record(Vec<u8>),
    Sequence(Vec<WireValue>),
}

impl WireValue {
    /// Short name of the variant, matching [`WireType::name`].
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Int32(_) => "int32",
            Self::Int64(_) => "int64",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Record(_) => "record",
            Self::Sequence(_) => "sequence",
        }
    }

    /// Checks that this value can be sent in a slot of the given shape.
    pub fn matches(&self, shape: &WireType) -> bool {
        match (self, shape) {
            (Self::Int32(_), WireType::Int32)
            | (Self::Int64(_), WireType::Int64)
            | (Self::Double(_), WireType::Double)
            | (Self::String(_), WireType::String) => true,
            (Self::Record(bytes), WireType::Record(size)) => bytes.len() == *size,
            (Self::Sequence(items), WireType::Sequence(element)) => {
                items.iter().all(|item| item.matches(element))
            }
            _ => false,
        }
    }

    /// Builds a sequence of strings.
    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Sequence(
            items
                .into_iter()
                .map(|item| Self::String(item.into()))
                .collect(),
        )
    }

    pub fn as_i32(&self) -> Result<i32, ProtocolError> {
        match self {
            Self::Int32(v) => Ok(*v),
            other => Err(other.unexpected("int32")),
        }
    }

    pub fn as_i64(&self) -> Result<i64, ProtocolError> {
        match self {
            Self::Int64(v) => Ok(*v),
            other => Err(other.unexpected("int64")),
        }
    }

    pub fn as_f64(&self) -> Result<f64, ProtocolError> {
        match self {
            Self::Double(v) => Ok(*v),
            other => Err(other.unexpected("double")),
        }
    }

    pub fn into_string(self) -> Result<String, ProtocolError> {
        match self {
            Self::String(s) => Ok(s),
            other => Err(other.unexpected("string")),
        }
    }

    pub fn into_record(self) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Self::Record(bytes) => Ok(bytes),
            other => Err(other.unexpected("record")),
        }
    }

    pub fn into_sequence(self) -> Result<Vec<WireValue>, ProtocolError> {
        match self {
            Self::Sequence(items) => Ok(items),
            other => Err(other.unexpected("sequence")),
        }
    }

    /// Unpacks a sequence of strings.
    pub fn into_strings(self) -> Result<Vec<String>, ProtocolError> {
        self.into_sequence()?
            .into_iter()
            .map(WireValue::into_string)
            .collect()
    }

    fn unexpected(&self, expected: &'static str) -> ProtocolError {
        ProtocolError::UnexpectedValue {
            expected,
            found: self.kind(),
        }
    }
}

impl From<i32> for WireValue {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for WireValue {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f64> for WireValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for WireValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for WireValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// Limits applied while decoding, protecting against a corrupt or hostile peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireLimits {
    /// Largest accepted string or record, in bytes.
    pub max_field_len: u32,
    /// Largest accepted sequence, in elements.
    pub max_sequence_len: u32,
}

impl Default for WireLimits {
    fn default() -> Self {
        Self {
            max_field_len: DEFAULT_MAX_FIELD_LEN,
            max_sequence_len: DEFAULT_MAX_SEQUENCE_LEN,
        }
    }
}

/// Appends the canonical encoding of `value` to `out`.
///
/// Fails only when a length does not fit the 32-bit prefix.
pub fn encode_value(value: &WireValue, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
    match value {
        WireValue::Int32(v) => out.extend_from_slice(&v.to_be_bytes()),
        WireValue::Int64(v) => out.extend_from_slice(&v.to_be_bytes()),
        WireValue::Double(v) => out.extend_from_slice(&v.to_bits().to_be_bytes()),
        WireValue::String(s) => {
            put_length(s.len(), out)?;
            out.extend_from_slice(s.as_bytes());
        }
        WireValue::Record(bytes) => {
            if u32::try_from(bytes.len()).is_err() {
                return Err(oversized(bytes.len() as u64, u32::MAX));
            }
            out.extend_from_slice(bytes);
        }
        WireValue::Sequence(items) => {
            put_length(items.len(), out)?;
            for item in items {
                encode_value(item, out)?;
            }
        }
    }
    Ok(())
}

/// Number of bytes [`encode_value`] produces for `value`.
pub fn encoded_len(value: &WireValue) -> usize {
    match value {
        WireValue::Int32(_) => 4,
        WireValue::Int64(_) | WireValue::Double(_) => 8,
        WireValue::String(s) => LENGTH_PREFIX_SIZE + s.len(),
        WireValue::Record(bytes) => bytes.len(),
        WireValue::Sequence(items) => {
            LENGTH_PREFIX_SIZE + items.iter().map(encoded_len).sum::<usize>()
        }
    }
}

/// Encodes `value` and writes it to the channel in one send.
pub fn write_value(value: &WireValue, channel: &mut Channel) -> WireResult<()> {
    let mut buf = Vec::with_capacity(encoded_len(value));
    encode_value(value, &mut buf)?;
    channel.send(&buf)?;
    Ok(())
}

/// Reads one value of the given shape from the channel.
pub fn decode_value(
    shape: &WireType,
    channel: &mut Channel,
    limits: &WireLimits,
) -> WireResult<WireValue> {
    match *shape {
        WireType::Int32 => Ok(WireValue::Int32(read_i32(channel)?)),
        WireType::Int64 => Ok(WireValue::Int64(i64::from_be_bytes(read_fixed(channel)?))),
        WireType::Double => Ok(WireValue::Double(f64::from_bits(u64::from_be_bytes(
            read_fixed(channel)?,
        )))),
        WireType::String => {
            let len = read_length(channel, limits.max_field_len)?;
            let bytes = read_bytes(channel, len)?;
            String::from_utf8(bytes)
                .map(WireValue::String)
                .map_err(|_| WireError::Protocol(ProtocolError::InvalidUtf8))
        }
        WireType::Record(size) => {
            if size > limits.max_field_len as usize {
                return Err(oversized(size as u64, limits.max_field_len).into());
            }
            Ok(WireValue::Record(read_bytes(channel, size)?))
        }
        WireType::Sequence(element) => {
            let count = read_length(channel, limits.max_sequence_len)?;
            let mut items = Vec::with_capacity(count.min(SEQUENCE_PREALLOC));
            for _ in 0..count {
                items.push(decode_value(element, channel, limits)?);
            }
            Ok(WireValue::Sequence(items))
        }
    }
}

/// Reads one big-endian `i32` (procedure ids and status codes use this too).
pub fn read_i32(channel: &mut Channel) -> WireResult<i32> {
    Ok(i32::from_be_bytes(read_fixed(channel)?))
}

fn read_fixed<const N: usize>(channel: &mut Channel) -> WireResult<[u8; N]> {
    let mut buf = [0u8; N];
    let received = channel.recv_exact_into(&mut buf)?;
    if received < N {
        return Err(ProtocolError::Truncated {
            expected: N,
            received,
        }
        .into());
    }
    Ok(buf)
}

fn read_length(channel: &mut Channel, max: u32) -> WireResult<usize> {
    let declared = u32::from_be_bytes(read_fixed(channel)?);
    if declared > max {
        return Err(oversized(u64::from(declared), max).into());
    }
    Ok(declared as usize)
}

fn read_bytes(channel: &mut Channel, len: usize) -> WireResult<Vec<u8>> {
    let bytes = channel.recv(len)?;
    if bytes.len() < len {
        return Err(ProtocolError::Truncated {
            expected: len,
            received: bytes.len(),
        }
        .into());
    }
    Ok(bytes)
}

fn put_length(len: usize, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
    let len = u32::try_from(len).map_err(|_| oversized(len as u64, u32::MAX))?;
    out.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

fn oversized(declared: u64, max: u32) -> ProtocolError {
    ProtocolError::OversizedField {
        declared,
        max: u64::from(max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChannelError;
    use std::io::{self, Cursor};

    const STRINGS: WireType = WireType::Sequence(&WireType::String);
    const NESTED: WireType = WireType::Sequence(&STRINGS);

    fn channel_over(bytes: Vec<u8>) -> Channel {
        Channel::new(Cursor::new(bytes), io::sink())
    }

    fn round_trip(value: &WireValue, shape: &WireType) -> WireValue {
        assert!(value.matches(shape), "{value:?} does not match {shape:?}");
        let mut buf = Vec::new();
        encode_value(value, &mut buf).unwrap();
        assert_eq!(buf.len(), encoded_len(value));

        let mut channel = channel_over(buf.clone());
        let decoded = decode_value(shape, &mut channel, &WireLimits::default()).unwrap();
        assert_eq!(
            channel.bytes_received(),
            buf.len() as u64,
            "decoder must consume exactly the encoded bytes"
        );
        decoded
    }

    #[test]
    fn scalars_round_trip() {
        for v in [0, 1, -1, i32::MIN, i32::MAX] {
            assert_eq!(round_trip(&v.into(), &WireType::Int32), WireValue::Int32(v));
        }
        for v in [0, i64::MIN, i64::MAX, 1 << 40] {
            assert_eq!(round_trip(&v.into(), &WireType::Int64), WireValue::Int64(v));
        }
        for v in [0.0, -0.0, 1.5, f64::MAX, f64::MIN_POSITIVE, f64::INFINITY] {
            let decoded = round_trip(&v.into(), &WireType::Double).as_f64().unwrap();
            assert_eq!(decoded.to_bits(), v.to_bits());
        }
    }

    #[test]
    fn nan_keeps_its_bit_pattern() {
        let nan = f64::from_bits(0x7ff8_0000_dead_beef);
        let decoded = round_trip(&nan.into(), &WireType::Double).as_f64().unwrap();
        assert_eq!(decoded.to_bits(), nan.to_bits());
    }

    #[test]
    fn strings_round_trip() {
        for s in ["", "salary", "naïve 数据", "with\0nul"] {
            assert_eq!(round_trip(&s.into(), &WireType::String), WireValue::from(s));
        }
    }

    #[test]
    fn records_and_sequences_round_trip() {
        let record = WireValue::Record(vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(round_trip(&record, &WireType::Record(8)), record);

        let empty = WireValue::Sequence(Vec::new());
        assert_eq!(round_trip(&empty, &STRINGS), empty);

        let tables = WireValue::strings(["employees", "", "departments"]);
        assert_eq!(round_trip(&tables, &STRINGS), tables);

        let nested = WireValue::Sequence(vec![
            WireValue::strings(["a"]),
            WireValue::Sequence(Vec::new()),
        ]);
        assert_eq!(round_trip(&nested, &NESTED), nested);
    }

    #[test]
    fn string_layout_is_length_prefixed_without_terminator() {
        let mut buf = Vec::new();
        encode_value(&"abc".into(), &mut buf).unwrap();
        assert_eq!(buf, [0, 0, 0, 3, b'a', b'b', b'c']);

        let mut buf = Vec::new();
        encode_value(&WireValue::Int32(0x0102_0304), &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
    }

    #[test]
    fn decode_leaves_following_bytes_unread() {
        let mut bytes = vec![0, 0, 0, 2, b'o', b'k'];
        bytes.extend_from_slice(b"trailing");
        let mut channel = channel_over(bytes);
        let value = decode_value(&WireType::String, &mut channel, &WireLimits::default()).unwrap();
        assert_eq!(value, WireValue::from("ok"));
        assert_eq!(channel.bytes_received(), 6);
    }

    #[test]
    fn oversized_string_is_rejected_before_reading_payload() {
        let limits = WireLimits {
            max_field_len: 16,
            ..WireLimits::default()
        };
        let mut bytes = u32::MAX.to_be_bytes().to_vec();
        bytes.extend_from_slice(&[b'x'; 32]);
        let mut channel = channel_over(bytes);

        let err = decode_value(&WireType::String, &mut channel, &limits).unwrap_err();
        assert_eq!(
            err,
            WireError::Protocol(ProtocolError::OversizedField {
                declared: u64::from(u32::MAX),
                max: 16,
            })
        );
        assert_eq!(channel.bytes_received(), LENGTH_PREFIX_SIZE as u64);
    }

    #[test]
    fn oversized_sequence_is_rejected() {
        let limits = WireLimits {
            max_sequence_len: 3,
            ..WireLimits::default()
        };
        let mut channel = channel_over(4u32.to_be_bytes().to_vec());
        let err = decode_value(&STRINGS, &mut channel, &limits).unwrap_err();
        assert!(matches!(
            err,
            WireError::Protocol(ProtocolError::OversizedField { declared: 4, max: 3 })
        ));
    }

    #[test]
    fn oversized_record_shape_reads_nothing() {
        let limits = WireLimits {
            max_field_len: 4,
            ..WireLimits::default()
        };
        let mut channel = channel_over(vec![0; 8]);
        let err = decode_value(&WireType::Record(8), &mut channel, &limits).unwrap_err();
        assert!(matches!(
            err,
            WireError::Protocol(ProtocolError::OversizedField { .. })
        ));
        assert_eq!(channel.bytes_received(), 0);
    }

    #[test]
    fn short_reads_are_truncation() {
        let mut channel = channel_over(vec![0, 0]);
        assert_eq!(
            decode_value(&WireType::Int32, &mut channel, &WireLimits::default()).unwrap_err(),
            WireError::Protocol(ProtocolError::Truncated {
                expected: 4,
                received: 2
            })
        );

        let mut channel = channel_over(vec![0, 0, 0, 10, b'a', b'b']);
        assert_eq!(
            decode_value(&WireType::String, &mut channel, &WireLimits::default()).unwrap_err(),
            WireError::Protocol(ProtocolError::Truncated {
                expected: 10,
                received: 2
            })
        );

        let mut channel = channel_over(Vec::new());
        assert!(matches!(
            decode_value(&WireType::Int64, &mut channel, &WireLimits::default()),
            Err(WireError::Protocol(ProtocolError::Truncated { received: 0, .. }))
        ));
    }

    #[test]
    fn invalid_utf8_is_a_protocol_error() {
        let mut channel = channel_over(vec![0, 0, 0, 2, 0xff, 0xfe]);
        assert_eq!(
            decode_value(&WireType::String, &mut channel, &WireLimits::default()).unwrap_err(),
            WireError::Protocol(ProtocolError::InvalidUtf8)
        );
    }

    #[test]
    fn channel_failures_stay_channel_errors() {
        let mut channel = channel_over(Vec::new());
        channel.poison("gone");
        assert_eq!(
            decode_value(&WireType::Int32, &mut channel, &WireLimits::default()).unwrap_err(),
            WireError::Channel(ChannelError::disconnected("gone"))
        );
        assert!(matches!(
            write_value(&WireValue::Int32(1), &mut channel),
            Err(WireError::Channel(_))
        ));
    }

    #[test]
    fn shape_matching() {
        assert!(WireValue::Int32(1).matches(&WireType::Int32));
        assert!(!WireValue::Int32(1).matches(&WireType::Int64));
        assert!(!WireValue::Record(vec![0; 7]).matches(&WireType::Record(8)));
        assert!(!WireValue::Sequence(vec![WireValue::Int32(1)]).matches(&STRINGS));
        assert!(WireValue::Sequence(Vec::new()).matches(&STRINGS));
    }

    #[test]
    fn accessors_report_mismatches() {
        assert_eq!(
            WireValue::Int32(3).into_string().unwrap_err(),
            ProtocolError::UnexpectedValue {
                expected: "string",
                found: "int32"
            }
        );
        assert_eq!(
            WireValue::strings(["a", "b"]).into_strings().unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn values_serialize_as_plain_json() {
        let value = WireValue::Sequence(vec![
            WireValue::from("t"),
            WireValue::Int64(7),
            WireValue::Double(0.5),
        ]);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"["t",7,0.5]"#);
    }
}
