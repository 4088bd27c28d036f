//! Field descriptor tables
//!
//! Provides the static per-kind [`FieldDescriptor`] tables and the
//! [`SchemaRegistry`] that validates and holds them.
//!
//! A registry is built once, before any conversion, and is immutable from then
//! on. Share it between converters with `Arc`.

use std::collections::{BTreeMap, HashMap};

use kvmig_flat::{validate_suffix, FieldType, Kind, Scope};

use crate::error::SchemaError;

/// Scopes a field may be stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeRule {
    /// Global and instance scope
    #[default]
    Both,

    /// Only the cluster-wide default
    GlobalOnly,

    /// Only per instance
    InstanceOnly,
}

impl ScopeRule {
    /// Whether a field with this rule is stored in `scope`
    #[inline]
    #[must_use]
    pub fn applies_to(&self, scope: &Scope) -> bool {
        match self {
            Self::Both => true,
            Self::GlobalOnly => scope.is_global(),
            Self::InstanceOnly => !scope.is_global(),
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Both => "both",
            Self::GlobalOnly => "global",
            Self::InstanceOnly => "instance",
        }
    }
}

/// Static metadata for one field of one kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// v3 field name
    pub name: &'static str,

    /// Final key segment in the flat store
    pub key_suffix: &'static str,

    pub field_type: FieldType,

    pub scope: ScopeRule,
}

impl FieldDescriptor {
    /// Field stored in both scopes
    #[must_use]
    pub const fn new(name: &'static str, key_suffix: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            key_suffix,
            field_type,
            scope: ScopeRule::Both,
        }
    }

    /// Restrict to global scope
    #[must_use]
    pub const fn global_only(mut self) -> Self {
        self.scope = ScopeRule::GlobalOnly;
        self
    }

    /// Restrict to instance scope
    #[must_use]
    pub const fn instance_only(mut self) -> Self {
        self.scope = ScopeRule::InstanceOnly;
        self
    }
}

/// FelixConfiguration fields
pub static FELIX_CONFIGURATION: &[FieldDescriptor] = &[
    FieldDescriptor::new("routeRefreshIntervalSecs", "RouteRefreshInterval", FieldType::Int),
    FieldDescriptor::new("iptablesRefreshIntervalSecs", "IptablesRefreshInterval", FieldType::Int),
    FieldDescriptor::new("ipsetsRefreshIntervalSecs", "IpsetsRefreshInterval", FieldType::Int),
    FieldDescriptor::new("interfacePrefix", "InterfacePrefix", FieldType::String),
    FieldDescriptor::new("chainInsertMode", "ChainInsertMode", FieldType::String),
    FieldDescriptor::new(
        "defaultEndpointToHostAction",
        "DefaultEndpointToHostAction",
        FieldType::String,
    ),
    FieldDescriptor::new("logSeverityScreen", "LogSeverityScreen", FieldType::String),
    FieldDescriptor::new("logFilePath", "LogFilePath", FieldType::String),
    FieldDescriptor::new("ipipEnabled", "IpInIpEnabled", FieldType::Bool),
    FieldDescriptor::new("ipipMTU", "IpInIpMtu", FieldType::Int),
    FieldDescriptor::new("iptablesMarkMask", "IptablesMarkMask", FieldType::Uint),
    FieldDescriptor::new(
        "failsafeInboundHostPorts",
        "FailsafeInboundHostPorts",
        FieldType::ProtoPortList,
    ),
    FieldDescriptor::new(
        "failsafeOutboundHostPorts",
        "FailsafeOutboundHostPorts",
        FieldType::ProtoPortList,
    ),
    FieldDescriptor::new("prometheusMetricsEnabled", "PrometheusMetricsEnabled", FieldType::Bool),
    FieldDescriptor::new("prometheusMetricsPort", "PrometheusMetricsPort", FieldType::Int),
    FieldDescriptor::new("usageReportingEnabled", "UsageReportingEnabled", FieldType::Bool)
        .global_only(),
];

/// ClusterInformation fields
pub static CLUSTER_INFORMATION: &[FieldDescriptor] = &[
    FieldDescriptor::new("clusterGUID", "ClusterGUID", FieldType::String).global_only(),
    FieldDescriptor::new("clusterType", "ClusterType", FieldType::COMMA_LIST).global_only(),
    FieldDescriptor::new("calicoVersion", "CalicoVersion", FieldType::String).global_only(),
    FieldDescriptor::new("datastoreReady", "DatastoreReady", FieldType::Bool).global_only(),
];

/// Built-in table for `kind`
#[must_use]
pub fn builtin_table(kind: Kind) -> &'static [FieldDescriptor] {
    match kind {
        Kind::FelixConfiguration => FELIX_CONFIGURATION,
        Kind::ClusterInformation => CLUSTER_INFORMATION,
    }
}

/// Validated descriptor table for one kind
#[derive(Debug, Clone)]
pub struct DescriptorTable {
    kind: Kind,
    descriptors: Vec<FieldDescriptor>,
    by_name: HashMap<&'static str, usize>,
    by_suffix: HashMap<&'static str, usize>,
}

impl DescriptorTable {
    /// Validate and index a table
    ///
    /// # Errors
    /// - `UnsupportedFieldType` for a type the flat codec cannot represent
    /// - `InvalidSuffix` for a suffix that is not a plain key segment
    /// - `DuplicateField` / `DuplicateSuffix` for repeated names
    /// - `UnreachableField` for an instance-only field on a global-only kind
    pub fn new(kind: Kind, descriptors: &[FieldDescriptor]) -> Result<Self, SchemaError> {
        let mut by_name = HashMap::with_capacity(descriptors.len());
        let mut by_suffix = HashMap::with_capacity(descriptors.len());

        for (i, d) in descriptors.iter().enumerate() {
            if !d.field_type.is_flat() {
                return Err(SchemaError::UnsupportedFieldType {
                    kind,
                    field: d.name,
                    field_type: d.field_type,
                });
            }
            validate_suffix(d.key_suffix).map_err(|source| SchemaError::InvalidSuffix {
                kind,
                field: d.name,
                source,
            })?;
            if d.scope == ScopeRule::InstanceOnly && !kind.supports_instance_scope() {
                return Err(SchemaError::UnreachableField {
                    kind,
                    field: d.name,
                });
            }
            if by_name.insert(d.name, i).is_some() {
                return Err(SchemaError::DuplicateField {
                    kind,
                    field: d.name,
                });
            }
            if by_suffix.insert(d.key_suffix, i).is_some() {
                return Err(SchemaError::DuplicateSuffix {
                    kind,
                    suffix: d.key_suffix,
                });
            }
        }

        Ok(Self {
            kind,
            descriptors: descriptors.to_vec(),
            by_name,
            by_suffix,
        })
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Look up by v3 field name
    #[inline]
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.by_name.get(name).map(|&i| &self.descriptors[i])
    }

    /// Look up by key suffix
    #[inline]
    #[must_use]
    pub fn by_suffix(&self, suffix: &str) -> Option<&FieldDescriptor> {
        self.by_suffix.get(suffix).map(|&i| &self.descriptors[i])
    }

    /// Descriptors in table order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.descriptors.iter()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Immutable set of descriptor tables, one per kind
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: BTreeMap<Kind, DescriptorTable>,
}

impl SchemaRegistry {
    /// Build a registry from per-kind tables
    ///
    /// # Errors
    /// Returns the first table validation error, or `DuplicateKind`
    pub fn new<'a, I>(tables: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (Kind, &'a [FieldDescriptor])>,
    {
        let mut registry = BTreeMap::new();
        for (kind, descriptors) in tables {
            let table = DescriptorTable::new(kind, descriptors)?;
            if registry.insert(kind, table).is_some() {
                return Err(SchemaError::DuplicateKind(kind));
            }
        }
        Ok(Self { tables: registry })
    }

    /// Registry with the built-in tables for every kind
    ///
    /// # Errors
    /// Only if a built-in table is misconfigured
    pub fn with_defaults() -> Result<Self, SchemaError> {
        Self::new(Kind::ALL.into_iter().map(|kind| (kind, builtin_table(kind))))
    }

    /// Table for `kind`
    #[inline]
    #[must_use]
    pub fn table(&self, kind: Kind) -> Option<&DescriptorTable> {
        self.tables.get(&kind)
    }

    /// Check if a table is registered for `kind`
    #[inline]
    #[must_use]
    pub fn contains(&self, kind: Kind) -> bool {
        self.tables.contains_key(&kind)
    }

    /// Iterate over all tables
    pub fn iter(&self) -> impl Iterator<Item = &DescriptorTable> {
        self.tables.values()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
