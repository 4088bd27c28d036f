//! Structured resources
//!
//! A [`Resource`] is the v3 side of a conversion: a kind, an instance name and
//! a set of independently optional typed fields.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use kvmig_flat::{FieldValue, KeyError, Kind, Scope};

/// Identity of a resource within a conversion batch
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId {
    pub kind: Kind,
    pub name: String,
}

impl ResourceId {
    #[inline]
    #[must_use]
    pub fn new(kind: Kind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.name)
    }
}

/// Structured config resource
///
/// Fields are keyed by their v3 name. A field missing from the map is unset,
/// which is distinct from a field holding a zero or empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    kind: Kind,
    name: String,
    fields: BTreeMap<String, FieldValue>,
}

impl Resource {
    /// Create resource with all fields unset
    #[inline]
    #[must_use]
    pub fn new(kind: Kind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Create resource named for `scope`
    #[inline]
    #[must_use]
    pub fn for_scope(kind: Kind, scope: &Scope) -> Self {
        Self::new(kind, scope.resource_name())
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ResourceId {
        ResourceId::new(self.kind, self.name.clone())
    }

    /// Scope derived from the resource name
    ///
    /// # Errors
    /// Returns `InvalidInstanceName` if the name is neither `default` nor `node.<name>`
    #[inline]
    pub fn scope(&self) -> Result<Scope, KeyError> {
        Scope::from_resource_name(&self.name)
    }

    /// Get a field value, `None` if unset
    #[inline]
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Set a field, returning the previous value
    #[inline]
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.fields.insert(field.into(), value.into())
    }

    /// Unset a field, returning the previous value
    #[inline]
    pub fn unset(&mut self, field: &str) -> Option<FieldValue> {
        self.fields.remove(field)
    }

    /// Set a field, builder style
    #[inline]
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    /// Whether a field is set
    #[inline]
    #[must_use]
    pub fn is_set(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Iterate over set fields in name order
    #[inline]
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of set fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copy of this resource's fields under another name
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            kind: self.kind,
            name: name.into(),
            fields: self.fields.clone(),
        }
    }

    /// Overlay `other`'s set fields onto this resource; `other` wins
    pub fn overlay(&mut self, other: &Self) {
        for (field, value) in &other.fields {
            self.fields.insert(field.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvmig_flat::ProtoPort;

    #[test]
    fn unset_is_distinct_from_zero() {
        let res = Resource::new(Kind::FelixConfiguration, "default").with_field("ipipMTU", 0_i64);
        assert!(res.is_set("ipipMTU"));
        assert!(!res.is_set("routeRefreshIntervalSecs"));
        assert_eq!(res.get("ipipMTU"), Some(&FieldValue::Int(0)));
        assert_eq!(res.get("routeRefreshIntervalSecs"), None);
    }

    #[test]
    fn set_and_unset() {
        let mut res = Resource::new(Kind::FelixConfiguration, "default");
        assert_eq!(res.set("interfacePrefix", "cali"), None);
        assert_eq!(
            res.set("interfacePrefix", "tap"),
            Some(FieldValue::String("cali".into()))
        );
        assert_eq!(res.unset("interfacePrefix"), Some(FieldValue::String("tap".into())));
        assert!(res.is_empty());
    }

    #[test]
    fn scope_from_name() {
        let node = Resource::for_scope(Kind::FelixConfiguration, &Scope::Instance("n1".into()));
        assert_eq!(node.name(), "node.n1");
        assert_eq!(node.scope().unwrap(), Scope::Instance("n1".into()));
        assert!(Resource::new(Kind::FelixConfiguration, "bogus").scope().is_err());
    }

    #[test]
    fn overlay_prefers_other() {
        let mut base = Resource::new(Kind::FelixConfiguration, "node.n1")
            .with_field("ipipEnabled", true)
            .with_field("interfacePrefix", "cali");
        let top = Resource::new(Kind::FelixConfiguration, "default")
            .with_field("ipipEnabled", false)
            .with_field("failsafeInboundHostPorts", vec![ProtoPort::tcp(22)]);
        base.overlay(&top);

        assert_eq!(base.name(), "node.n1");
        assert_eq!(base.get("ipipEnabled"), Some(&FieldValue::Bool(false)));
        assert_eq!(base.get("interfacePrefix"), Some(&FieldValue::String("cali".into())));
        assert_eq!(base.len(), 3);
    }

    #[test]
    fn id_display() {
        let res = Resource::new(Kind::ClusterInformation, "default");
        assert_eq!(res.id().to_string(), "ClusterInformation(default)");
    }
}
