//! Flat key/value representation
//!
//! The leaf layer of the migration engine: everything needed to talk about
//! one field of one resource as a single store entry.
//!
//! # Core Concepts
//!
//! - [`FieldType`] / [`FieldValue`]: typed field values
//! - [`codec`]: value ⇄ flat string
//! - [`FlatKey`]: slash-delimited store key
//! - [`KeyScheme`]: (kind, scope, suffix) ⇄ [`FlatKey`]
//! - [`FlatEntry`]: one stored key/value pair
//!
//! # Example
//!
//! ```rust
//! use kvmig_flat::{codec, FieldType, FieldValue, KeyScheme, Kind, Scope};
//!
//! let scheme = KeyScheme::default();
//! let key = scheme
//!     .build_key(Kind::FelixConfiguration, &Scope::Global, "IpInIpEnabled")
//!     .unwrap();
//! let value = codec::encode(FieldType::Bool, &FieldValue::Bool(true)).unwrap();
//!
//! assert_eq!(key.to_string(), "/calico/v1/config/IpInIpEnabled");
//! assert_eq!(value, "true");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod codec;
mod entry;
mod key;
mod scheme;
mod value;

pub use codec::CodecError;
pub use entry::FlatEntry;
pub use key::{FlatKey, PathError, DELIMITER};
pub use scheme::{
    validate_suffix, KeyError, KeyScheme, Kind, ParsedKey, Scope, DEFAULT_ROOT, GLOBAL_INSTANCE,
    HOST_SEGMENT, NODE_PREFIX,
};
pub use value::{FieldType, FieldValue, ProtoPort, Protocol, UnknownProtocol};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
