//! kvmig Core - resource ⇄ flat key/value conversion
//!
//! Sits on top of [`kvmig_flat`] and adds the per-kind knowledge:
//! - Declares which fields each resource kind has ([`schema`])
//! - Splits one resource into flat entries and rebuilds it ([`processor`])
//! - Converts whole batches with per-resource failure isolation ([`coordinator`])
//! - Reads and writes v3 resource documents ([`document`])
//!
//! # Example
//!
//! ```rust
//! use kvmig_core::{Converter, ConverterConfig, Resource};
//! use kvmig_flat::Kind;
//!
//! let converter = Converter::with_defaults(ConverterConfig::new()).unwrap();
//! let res = Resource::new(Kind::FelixConfiguration, "node.n1").with_field("ipipEnabled", true);
//!
//! let entries = converter.decompose(&res).unwrap();
//! assert_eq!(entries[0].key.to_string(), "/calico/v1/host/n1/config/IpInIpEnabled");
//!
//! let report = converter.reconstruct_many(entries);
//! assert_eq!(report.resource(Kind::FelixConfiguration, "node.n1"), Some(&res));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod coordinator;
pub mod document;
pub mod error;
pub mod processor;
pub mod resource;
pub mod schema;
pub mod store;

pub use config::ConverterConfig;
pub use coordinator::{Converter, DecomposeReport, ReconstructReport, ResourceFailure};
pub use document::{parse_documents, render_yaml, Format, ResourceDocument, API_VERSION};
pub use error::{ConfigError, ConvertError, DocumentError, ProcessError, SchemaError, StoreError};
pub use processor::{Processor, Reconstruction, UnrecognizedEntry, UnrecognizedReason};
pub use resource::{Resource, ResourceId};
pub use schema::{
    builtin_table, DescriptorTable, FieldDescriptor, SchemaRegistry, ScopeRule,
    CLUSTER_INFORMATION, FELIX_CONFIGURATION,
};
pub use store::{KvStore, MemoryStore};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with kvmig Core
    pub use crate::{
        Converter, ConverterConfig, KvStore, MemoryStore, Resource, ResourceId, SchemaRegistry,
    };
    pub use kvmig_flat::{FieldType, FieldValue, FlatEntry, FlatKey, Kind, ProtoPort, Scope};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
