//! Error types for the conversion engine
//!
//! Provides error handling for:
//! - Descriptor table misconfiguration (fatal at registry construction)
//! - Per-resource encode/decode failures (isolated by the coordinator)
//! - Configuration, document and store collaborators

use std::path::PathBuf;

use kvmig_flat::{CodecError, FieldType, FlatKey, KeyError, Kind, PathError};

use crate::resource::ResourceId;

/// Main conversion error type
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// Descriptor table rejected
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// One resource could not be converted
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// No descriptor table registered for the kind
    #[error("no descriptor table registered for {0}")]
    UnregisteredKind(Kind),

    /// Same resource appears twice in one batch
    #[error("duplicate resource in batch: {0}")]
    DuplicateResource(ResourceId),

    /// Effective view requested for resources that do not pair up
    #[error("cannot merge {global} into {instance}: {reason}")]
    IncompatibleMerge {
        global: ResourceId,
        instance: ResourceId,
        reason: &'static str,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Document error
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Store error
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ConvertError {
    /// Resource the error is attributed to, if any
    #[must_use]
    pub fn resource(&self) -> Option<&ResourceId> {
        match self {
            Self::Process(e) => e.resource(),
            Self::DuplicateResource(id) => Some(id),
            Self::IncompatibleMerge { instance, .. } => Some(instance),
            _ => None,
        }
    }
}

/// Descriptor table errors
///
/// All of these are programming-time errors in a table definition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// Field type has no flat representation
    #[error("{kind}.{field}: unsupported field type {field_type}")]
    UnsupportedFieldType {
        kind: Kind,
        field: &'static str,
        field_type: FieldType,
    },

    /// Key suffix is not a valid key segment
    #[error("{kind}.{field}: {source}")]
    InvalidSuffix {
        kind: Kind,
        field: &'static str,
        source: KeyError,
    },

    /// Field name listed twice
    #[error("{kind}.{field}: duplicate field name")]
    DuplicateField { kind: Kind, field: &'static str },

    /// Key suffix listed twice
    #[error("{kind}: duplicate key suffix {suffix}")]
    DuplicateSuffix { kind: Kind, suffix: &'static str },

    /// Instance-only field on a kind without instance scope
    #[error("{kind}.{field}: instance-only field on a global-only kind")]
    UnreachableField { kind: Kind, field: &'static str },

    /// Two tables for one kind
    #[error("duplicate descriptor table for {0}")]
    DuplicateKind(Kind),
}

/// Per-resource conversion errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessError {
    /// Resource handed to the processor of another kind
    #[error("kind mismatch: processor handles {expected}, resource is {found}")]
    KindMismatch { expected: Kind, found: Kind },

    /// Resource name does not map to a scope, or the scope has no keys
    #[error("{resource}: {source}")]
    Key {
        resource: ResourceId,
        source: KeyError,
    },

    /// Resource carries a field no descriptor names
    #[error("{resource}: unknown field {field}")]
    UnknownField { resource: ResourceId, field: String },

    /// Codec failed on a present value
    #[error("{resource}: encoding field {field} failed: {source}")]
    FieldEncodingFailed {
        resource: ResourceId,
        field: &'static str,
        source: CodecError,
    },

    /// Entry matched a descriptor but its value did not decode
    #[error("{resource}: decoding field {field} from {key} failed: {source}")]
    FieldDecodingFailed {
        resource: ResourceId,
        field: &'static str,
        key: FlatKey,
        source: CodecError,
    },
}

impl ProcessError {
    /// Resource the error is attributed to, if any
    #[must_use]
    pub fn resource(&self) -> Option<&ResourceId> {
        match self {
            Self::KindMismatch { .. } => None,
            Self::Key { resource, .. }
            | Self::UnknownField { resource, .. }
            | Self::FieldEncodingFailed { resource, .. }
            | Self::FieldDecodingFailed { resource, .. } => Some(resource),
        }
    }

    /// Field the error is attributed to, if any
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::UnknownField { field, .. } => Some(field.as_str()),
            Self::FieldEncodingFailed { field, .. } | Self::FieldDecodingFailed { field, .. } => {
                Some(*field)
            }
            _ => None,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Key root is not an absolute key
    #[error("invalid key root {root:?}: {source}")]
    InvalidKeyRoot { root: String, source: PathError },
}

/// v3 document errors
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// JSON syntax or shape error
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML syntax or shape error
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// No descriptor table for the document's kind
    #[error("no descriptor table registered for {0}")]
    UnregisteredKind(Kind),

    /// Spec field no descriptor names
    #[error("{resource}: unknown spec field {field}")]
    UnknownField { resource: ResourceId, field: String },

    /// Spec field value does not fit the descriptor type
    #[error("{resource}: field {field} expects {expected}: {reason}")]
    InvalidValue {
        resource: ResourceId,
        field: &'static str,
        expected: FieldType,
        reason: String,
    },
}

/// Backend store errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Store rejected the write
    #[error("store is read-only")]
    ReadOnly,
}
