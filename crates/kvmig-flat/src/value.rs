//! Typed field values
//!
//! Provides [`FieldType`] (the semantic type a descriptor declares) and
//! [`FieldValue`] (a present value of one of those types).

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Semantic type of a resource field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Signed integer
    Int,

    /// Unsigned 32-bit integer
    Uint,

    /// Boolean
    Bool,

    /// String, stored verbatim
    String,

    /// List of strings joined with a delimiter
    StringList {
        /// Element separator
        delimiter: char,
    },

    /// List of protocol/port pairs
    ProtoPortList,

    /// Nested composite with no flat representation
    Object,
}

impl FieldType {
    /// Comma-delimited string list
    pub const COMMA_LIST: Self = Self::StringList { delimiter: ',' };

    /// Short name used in diagnostics
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Bool => "bool",
            Self::String => "string",
            Self::StringList { .. } => "string-list",
            Self::ProtoPortList => "proto-port-list",
            Self::Object => "object",
        }
    }

    /// Whether the flat codec can represent this type
    #[inline]
    #[must_use]
    pub fn is_flat(&self) -> bool {
        !matches!(self, Self::Object)
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::StringList { delimiter } => write!(f, "string-list({delimiter:?})"),
            other => f.write_str(other.name()),
        }
    }
}

/// A present field value
///
/// Unset fields have no `FieldValue` at all; there is no "null" variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldValue {
    Int(i64),
    Uint(u32),
    Bool(bool),
    String(String),
    StringList(Vec<String>),
    ProtoPortList(Vec<ProtoPort>),
}

impl FieldValue {
    /// Name of the variant, matching [`FieldType::name`]
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
            Self::StringList(_) => "string-list",
            Self::ProtoPortList(_) => "proto-port-list",
        }
    }

    /// Whether this value is of the given field type
    #[must_use]
    pub fn matches(&self, field_type: FieldType) -> bool {
        matches!(
            (self, field_type),
            (Self::Int(_), FieldType::Int)
                | (Self::Uint(_), FieldType::Uint)
                | (Self::Bool(_), FieldType::Bool)
                | (Self::String(_), FieldType::String)
                | (Self::StringList(_), FieldType::StringList { .. })
                | (Self::ProtoPortList(_), FieldType::ProtoPortList)
        )
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Uint(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<ProtoPort>> for FieldValue {
    fn from(value: Vec<ProtoPort>) -> Self {
        Self::ProtoPortList(value)
    }
}

/// Transport protocol of a [`ProtoPort`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
    Sctp,
}

impl Protocol {
    /// Canonical upper-case name, as used by v3 resources
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
            Self::Sctp => "SCTP",
        }
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = UnknownProtocol;

    /// Case-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("tcp") {
            Ok(Self::Tcp)
        } else if s.eq_ignore_ascii_case("udp") {
            Ok(Self::Udp)
        } else if s.eq_ignore_ascii_case("sctp") {
            Ok(Self::Sctp)
        } else {
            Err(UnknownProtocol(s.to_string()))
        }
    }
}

/// Unrecognized protocol name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown protocol: {0:?}")]
pub struct UnknownProtocol(pub String);

/// Protocol and port pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProtoPort {
    pub protocol: Protocol,
    pub port: u16,
}

impl ProtoPort {
    #[inline]
    #[must_use]
    pub fn new(protocol: Protocol, port: u16) -> Self {
        Self { protocol, port }
    }

    #[inline]
    #[must_use]
    pub fn tcp(port: u16) -> Self {
        Self::new(Protocol::Tcp, port)
    }

    #[inline]
    #[must_use]
    pub fn udp(port: u16) -> Self {
        Self::new(Protocol::Udp, port)
    }
}
