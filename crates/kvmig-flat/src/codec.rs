//! Field codec
//!
//! Converts a present [`FieldValue`] to its flat string form and back.
//!
//! | type          | flat form                            | empty list |
//! |---------------|--------------------------------------|------------|
//! | Int / Uint    | decimal (Uint also decodes `0x..`)   |            |
//! | Bool          | `true` / `false`                     |            |
//! | String        | verbatim                             |            |
//! | StringList    | elements joined with the delimiter   | `""`       |
//! | ProtoPortList | `proto:port` records joined with `,` | `none`     |
//!
//! Absent fields never reach the codec, so every empty form above is still
//! distinguishable from "no entry".

use crate::value::{FieldType, FieldValue, ProtoPort, Protocol};

/// Marker stored for an explicitly empty protocol/port list
pub const EMPTY_PORT_LIST: &str = "none";

/// Separator between protocol/port records
pub const RECORD_SEPARATOR: char = ',';

/// Separator between the protocol and the port inside a record
pub const FIELD_SEPARATOR: char = ':';

/// Encode a present value as its flat string
///
/// # Errors
/// - `UnsupportedFieldType` for [`FieldType::Object`]
/// - `TypeMismatch` if the value is not of `field_type`
/// - `MalformedValue` for string lists that cannot round-trip
pub fn encode(field_type: FieldType, value: &FieldValue) -> Result<String, CodecError> {
    match (field_type, value) {
        (FieldType::Object, _) => Err(CodecError::UnsupportedFieldType(field_type)),
        (FieldType::Int, FieldValue::Int(v)) => Ok(v.to_string()),
        (FieldType::Uint, FieldValue::Uint(v)) => Ok(v.to_string()),
        (FieldType::Bool, FieldValue::Bool(v)) => Ok(v.to_string()),
        (FieldType::String, FieldValue::String(v)) => Ok(v.clone()),
        (FieldType::StringList { delimiter }, FieldValue::StringList(items)) => {
            encode_string_list(delimiter, items)
        }
        (FieldType::ProtoPortList, FieldValue::ProtoPortList(ports)) => Ok(encode_ports(ports)),
        (expected, found) => Err(CodecError::TypeMismatch {
            expected,
            found: found.type_name(),
        }),
    }
}

/// Decode a flat string into a value of `field_type`
///
/// # Errors
/// - `UnsupportedFieldType` for [`FieldType::Object`]
/// - `MalformedValue` if the text is not a valid encoding
pub fn decode(field_type: FieldType, raw: &str) -> Result<FieldValue, CodecError> {
    match field_type {
        FieldType::Object => Err(CodecError::UnsupportedFieldType(field_type)),
        FieldType::Int => raw
            .trim()
            .parse::<i64>()
            .map(FieldValue::Int)
            .map_err(|e| CodecError::malformed(raw, e.to_string())),
        FieldType::Uint => decode_uint(raw).map(FieldValue::Uint),
        FieldType::Bool => decode_bool(raw).map(FieldValue::Bool),
        FieldType::String => Ok(FieldValue::String(raw.to_string())),
        FieldType::StringList { delimiter } => Ok(FieldValue::StringList(decode_string_list(
            delimiter, raw,
        ))),
        FieldType::ProtoPortList => decode_ports(raw).map(FieldValue::ProtoPortList),
    }
}

fn decode_uint(raw: &str) -> Result<u32, CodecError> {
    let trimmed = raw.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => trimmed.parse::<u32>(),
    };
    parsed.map_err(|e| CodecError::malformed(raw, e.to_string()))
}

fn decode_bool(raw: &str) -> Result<bool, CodecError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(CodecError::malformed(raw, "expected true or false"))
    }
}

fn encode_string_list(delimiter: char, items: &[String]) -> Result<String, CodecError> {
    for item in items {
        if item.is_empty() || item.trim() != item {
            return Err(CodecError::malformed(
                item,
                "list element is empty or has surrounding whitespace",
            ));
        }
        if item.contains(delimiter) {
            return Err(CodecError::malformed(
                item,
                format!("list element contains delimiter {delimiter:?}"),
            ));
        }
    }
    Ok(items.join(&delimiter.to_string()))
}

fn decode_string_list(delimiter: char, raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split(delimiter)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn encode_ports(ports: &[ProtoPort]) -> String {
    if ports.is_empty() {
        return EMPTY_PORT_LIST.to_string();
    }
    ports
        .iter()
        .map(|pp| {
            format!(
                "{}{FIELD_SEPARATOR}{}",
                pp.protocol.as_str().to_ascii_lowercase(),
                pp.port
            )
        })
        .collect::<Vec<_>>()
        .join(&RECORD_SEPARATOR.to_string())
}

fn decode_ports(raw: &str) -> Result<Vec<ProtoPort>, CodecError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case(EMPTY_PORT_LIST) {
        return Ok(Vec::new());
    }
    if trimmed.is_empty() {
        return Err(CodecError::malformed(raw, "empty port list without marker"));
    }

    trimmed
        .split(RECORD_SEPARATOR)
        .map(|record| decode_port_record(raw, record.trim()))
        .collect()
}

fn decode_port_record(raw: &str, record: &str) -> Result<ProtoPort, CodecError> {
    let (proto, port) = record
        .split_once(FIELD_SEPARATOR)
        .ok_or_else(|| CodecError::malformed(raw, format!("record {record:?} is not proto:port")))?;

    if port.contains(FIELD_SEPARATOR) {
        return Err(CodecError::malformed(
            raw,
            format!("record {record:?} has too many fields"),
        ));
    }

    let protocol: Protocol = proto
        .trim()
        .parse()
        .map_err(|e: crate::value::UnknownProtocol| CodecError::malformed(raw, e.to_string()))?;
    let port: u16 = port
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| {
            CodecError::malformed(raw, format!("invalid port in {record:?}: {e}"))
        })?;

    Ok(ProtoPort::new(protocol, port))
}

/// Field codec errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The type has no flat representation
    #[error("unsupported field type: {0}")]
    UnsupportedFieldType(FieldType),

    /// Value variant does not match the declared type
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: FieldType,
        found: &'static str,
    },

    /// Flat text is not a valid encoding
    #[error("malformed value {value:?}: {reason}")]
    MalformedValue { value: String, reason: String },
}

impl CodecError {
    fn malformed(value: &str, reason: impl Into<String>) -> Self {
        Self::MalformedValue {
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error reflects a descriptor misconfiguration rather than bad data
    #[inline]
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::UnsupportedFieldType(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn list(items: &[&str]) -> FieldValue {
        FieldValue::StringList(items.iter().map(|s| (*s).to_string()).collect())
    }

    #[test]
    fn scalars_use_canonical_text() {
        assert_eq!(encode(FieldType::Int, &FieldValue::Int(12345)).unwrap(), "12345");
        assert_eq!(encode(FieldType::Int, &FieldValue::Int(-7)).unwrap(), "-7");
        assert_eq!(encode(FieldType::Uint, &FieldValue::Uint(1313)).unwrap(), "1313");
        assert_eq!(encode(FieldType::Bool, &FieldValue::Bool(false)).unwrap(), "false");
    }

    #[test]
    fn uint_decodes_hex() {
        assert_eq!(decode(FieldType::Uint, "0xff000000").unwrap(), FieldValue::Uint(0xff00_0000));
        assert_eq!(decode(FieldType::Uint, "1313").unwrap(), FieldValue::Uint(1313));
        assert!(decode(FieldType::Uint, "-1").is_err());
        assert!(decode(FieldType::Uint, "4294967296").is_err());
    }

    #[test]
    fn bool_decode_is_case_insensitive() {
        assert_eq!(decode(FieldType::Bool, "True").unwrap(), FieldValue::Bool(true));
        assert_eq!(decode(FieldType::Bool, "FALSE").unwrap(), FieldValue::Bool(false));
        assert!(matches!(
            decode(FieldType::Bool, "yes"),
            Err(CodecError::MalformedValue { .. })
        ));
    }

    #[test]
    fn empty_string_is_a_value() {
        let encoded = encode(FieldType::String, &FieldValue::String(String::new())).unwrap();
        assert_eq!(encoded, "");
        assert_eq!(
            decode(FieldType::String, &encoded).unwrap(),
            FieldValue::String(String::new())
        );
    }

    #[test]
    fn string_list_split_and_join() {
        let value = list(&["Mesos", "K8s"]);
        let encoded = encode(FieldType::COMMA_LIST, &value).unwrap();
        assert_eq!(encoded, "Mesos,K8s");
        assert_eq!(decode(FieldType::COMMA_LIST, &encoded).unwrap(), value);
        assert_eq!(decode(FieldType::COMMA_LIST, " Mesos , K8s ").unwrap(), value);
    }

    #[test]
    fn string_list_empty_round_trips() {
        let encoded = encode(FieldType::COMMA_LIST, &list(&[])).unwrap();
        assert_eq!(encoded, "");
        assert_eq!(decode(FieldType::COMMA_LIST, &encoded).unwrap(), list(&[]));
    }

    #[test]
    fn string_list_rejects_unrepresentable_elements() {
        for bad in [list(&["a,b"]), list(&[""]), list(&[" padded"])] {
            assert!(matches!(
                encode(FieldType::COMMA_LIST, &bad),
                Err(CodecError::MalformedValue { .. })
            ));
        }
        // A different delimiter makes the comma legal
        let semi = FieldType::StringList { delimiter: ';' };
        assert_eq!(encode(semi, &list(&["a,b", "c"])).unwrap(), "a,b;c");
    }

    #[test]
    fn ports_encode_lower_case_records() {
        let ports = FieldValue::ProtoPortList(vec![
            ProtoPort::tcp(1234),
            ProtoPort::udp(22),
            ProtoPort::tcp(65535),
        ]);
        let encoded = encode(FieldType::ProtoPortList, &ports).unwrap();
        assert_eq!(encoded, "tcp:1234,udp:22,tcp:65535");
        assert_eq!(decode(FieldType::ProtoPortList, &encoded).unwrap(), ports);
    }

    #[test]
    fn ports_empty_uses_marker() {
        let empty = FieldValue::ProtoPortList(vec![]);
        let encoded = encode(FieldType::ProtoPortList, &empty).unwrap();
        assert_eq!(encoded, EMPTY_PORT_LIST);
        assert_eq!(decode(FieldType::ProtoPortList, "none").unwrap(), empty);
        assert_eq!(decode(FieldType::ProtoPortList, "NONE").unwrap(), empty);
    }

    #[test]
    fn ports_reject_malformed_records() {
        for raw in [
            "",
            "tcp",
            "tcp:",
            "tcp:65536",
            "icmp:1",
            "tcp:1,",
            "tcp:1:2",
            "tcp:1,,udp:2",
            "tcp:abc",
        ] {
            assert!(
                matches!(
                    decode(FieldType::ProtoPortList, raw),
                    Err(CodecError::MalformedValue { .. })
                ),
                "expected {raw:?} to be rejected"
            );
        }
    }

    #[test]
    fn ports_order_is_preserved() {
        let a = decode(FieldType::ProtoPortList, "udp:22,tcp:80").unwrap();
        let b = decode(FieldType::ProtoPortList, "tcp:80,udp:22").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn object_is_unsupported() {
        let err = encode(FieldType::Object, &FieldValue::Bool(true)).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(matches!(
            decode(FieldType::Object, "{}"),
            Err(CodecError::UnsupportedFieldType(FieldType::Object))
        ));
    }

    #[test]
    fn mismatched_value_is_rejected() {
        let err = encode(FieldType::Int, &FieldValue::Bool(true)).unwrap_err();
        assert_eq!(
            err,
            CodecError::TypeMismatch {
                expected: FieldType::Int,
                found: "bool"
            }
        );
    }

    fn proto_port() -> impl Strategy<Value = ProtoPort> {
        (
            prop_oneof![Just(Protocol::Tcp), Just(Protocol::Udp), Just(Protocol::Sctp)],
            any::<u16>(),
        )
            .prop_map(|(protocol, port)| ProtoPort::new(protocol, port))
    }

    proptest! {
        #[test]
        fn prop_port_lists_round_trip(ports in proptest::collection::vec(proto_port(), 0..8)) {
            let value = FieldValue::ProtoPortList(ports);
            let encoded = encode(FieldType::ProtoPortList, &value).unwrap();
            prop_assert_eq!(decode(FieldType::ProtoPortList, &encoded).unwrap(), value);
        }

        #[test]
        fn prop_string_lists_round_trip(items in proptest::collection::vec("[A-Za-z0-9_.-]{1,12}", 0..6)) {
            let value = FieldValue::StringList(items);
            let encoded = encode(FieldType::COMMA_LIST, &value).unwrap();
            prop_assert_eq!(decode(FieldType::COMMA_LIST, &encoded).unwrap(), value);
        }
    }
}
