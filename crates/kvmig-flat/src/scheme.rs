//! Key scheme
//!
//! Maps a (kind, scope, field suffix) triple onto a [`FlatKey`] and back.
//!
//! Layout under the scheme root (default `/calico/v1`):
//!
//! ```text
//! <root>/<kind-segment>/<Suffix>                  global scope
//! <root>/host/<instance>/<kind-segment>/<Suffix>  instance scope
//! ```
//!
//! The layout and delimiters are part of the store compatibility contract.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::key::{FlatKey, PathError, DELIMITER};

/// Resource name reserved for the global scope
pub const GLOBAL_INSTANCE: &str = "default";

/// Prefix of per-node resource names
pub const NODE_PREFIX: &str = "node.";

/// Segment introducing an instance scope in flat keys
pub const HOST_SEGMENT: &str = "host";

/// Default key root
pub const DEFAULT_ROOT: &str = "/calico/v1";

/// Resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Kind {
    FelixConfiguration,
    ClusterInformation,
}

impl Kind {
    /// All known kinds
    pub const ALL: [Kind; 2] = [Kind::FelixConfiguration, Kind::ClusterInformation];

    /// Kind name as used in v3 documents
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FelixConfiguration => "FelixConfiguration",
            Self::ClusterInformation => "ClusterInformation",
        }
    }

    /// Key segment that holds this kind's fields
    #[must_use]
    pub fn key_segment(&self) -> &'static str {
        match self {
            Self::FelixConfiguration => "config",
            Self::ClusterInformation => "clusterinfo",
        }
    }

    /// Whether resources of this kind may be per-instance
    #[must_use]
    pub fn supports_instance_scope(&self) -> bool {
        matches!(self, Self::FelixConfiguration)
    }

    fn from_key_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.key_segment() == segment)
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| KeyError::UnknownKind(s.to_string()))
    }
}

/// Scope of a setting
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    /// Cluster-wide default
    Global,

    /// One named instance (a node)
    Instance(String),
}

impl Scope {
    /// Instance scope, validating the name
    ///
    /// # Errors
    /// Returns `InvalidInstanceName` if the name cannot be embedded in a key
    pub fn instance(name: impl Into<String>) -> Result<Self, KeyError> {
        let name = name.into();
        validate_instance_name(&name)?;
        Ok(Self::Instance(name))
    }

    /// Derive the scope from a v3 resource name
    ///
    /// - `default` → [`Scope::Global`]
    /// - `node.<name>` → [`Scope::Instance`]
    ///
    /// # Errors
    /// Returns `InvalidInstanceName` for any other name
    pub fn from_resource_name(name: &str) -> Result<Self, KeyError> {
        if name == GLOBAL_INSTANCE {
            return Ok(Self::Global);
        }
        match name.strip_prefix(NODE_PREFIX) {
            Some(node) => Self::instance(node),
            None => Err(KeyError::InvalidInstanceName {
                name: name.to_string(),
                reason: "expected \"default\" or \"node.<name>\"",
            }),
        }
    }

    /// v3 resource name for this scope
    #[must_use]
    pub fn resource_name(&self) -> String {
        match self {
            Self::Global => GLOBAL_INSTANCE.to_string(),
            Self::Instance(node) => format!("{NODE_PREFIX}{node}"),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Instance(node) => write!(f, "instance {node}"),
        }
    }
}

fn validate_instance_name(name: &str) -> Result<(), KeyError> {
    let reason = if name.is_empty() {
        Some("empty")
    } else if name.contains(DELIMITER) {
        Some("contains the key delimiter '/'")
    } else if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        Some("contains whitespace or control characters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(KeyError::InvalidInstanceName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Check a field suffix is a valid final key segment
///
/// # Errors
/// Returns `InvalidSuffix` unless the suffix is non-empty ASCII alphanumerics or `_`
pub fn validate_suffix(suffix: &str) -> Result<(), KeyError> {
    if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(KeyError::InvalidSuffix(suffix.to_string()));
    }
    Ok(())
}

/// A key decomposed into its kind, scope and field suffix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey {
    pub kind: Kind,
    pub scope: Scope,
    pub suffix: String,
}

/// Key scheme rooted at a fixed prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyScheme {
    root: FlatKey,
}

impl KeyScheme {
    /// Create scheme rooted at `root`
    #[inline]
    #[must_use]
    pub fn new(root: FlatKey) -> Self {
        Self { root }
    }

    /// Key root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &FlatKey {
        &self.root
    }

    /// Prefix under which all keys of `kind` in `scope` live
    ///
    /// # Errors
    /// - `UnsupportedScope` if `kind` has no instance scope
    /// - `InvalidInstanceName` if the instance name cannot be embedded
    pub fn scope_prefix(&self, kind: Kind, scope: &Scope) -> Result<FlatKey, KeyError> {
        let key = match scope {
            Scope::Global => self.root.child(kind.key_segment())?,
            Scope::Instance(node) => {
                if !kind.supports_instance_scope() {
                    return Err(KeyError::UnsupportedScope {
                        kind,
                        scope: scope.clone(),
                    });
                }
                validate_instance_name(node)?;
                self.root
                    .child(HOST_SEGMENT)?
                    .child(node.as_str())?
                    .child(kind.key_segment())?
            }
        };
        Ok(key)
    }

    /// Build the key for one field
    ///
    /// # Errors
    /// - `InvalidSuffix` for a suffix that is not a single plain segment
    /// - errors of [`KeyScheme::scope_prefix`]
    pub fn build_key(&self, kind: Kind, scope: &Scope, suffix: &str) -> Result<FlatKey, KeyError> {
        validate_suffix(suffix)?;
        Ok(self.scope_prefix(kind, scope)?.child(suffix)?)
    }

    /// Parse a key back into kind, scope and suffix
    ///
    /// # Errors
    /// Returns `UnrecognizedKey` if the key is outside this scheme's layout
    pub fn parse_key(&self, key: &FlatKey) -> Result<ParsedKey, KeyError> {
        let unrecognized = || KeyError::UnrecognizedKey(key.to_string());
        let rest = key.strip_prefix(&self.root).ok_or_else(unrecognized)?;

        let (kind, scope, suffix) = match rest {
            [segment, suffix] => {
                let kind = Kind::from_key_segment(segment).ok_or_else(unrecognized)?;
                (kind, Scope::Global, suffix)
            }
            [host, node, segment, suffix] if host == HOST_SEGMENT => {
                let kind = Kind::from_key_segment(segment)
                    .filter(Kind::supports_instance_scope)
                    .ok_or_else(unrecognized)?;
                validate_instance_name(node).map_err(|_| unrecognized())?;
                (kind, Scope::Instance(node.clone()), suffix)
            }
            _ => return Err(unrecognized()),
        };

        validate_suffix(suffix).map_err(|_| unrecognized())?;
        Ok(ParsedKey {
            kind,
            scope,
            suffix: suffix.clone(),
        })
    }
}

impl Default for KeyScheme {
    fn default() -> Self {
        Self::new(FlatKey::new(vec!["calico".to_string(), "v1".to_string()]).unwrap_or_default())
    }
}

/// Key scheme errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// Instance name cannot be embedded in a key
    #[error("invalid instance name {name:?}: {reason}")]
    InvalidInstanceName { name: String, reason: &'static str },

    /// Field suffix is not a single plain segment
    #[error("invalid field suffix {0:?}")]
    InvalidSuffix(String),

    /// Kind has no such scope
    #[error("{kind} does not support {scope} scope")]
    UnsupportedScope { kind: Kind, scope: Scope },

    /// Key is outside the scheme's layout
    #[error("unrecognized key: {0}")]
    UnrecognizedKey(String),

    /// Unknown kind name
    #[error("unknown kind: {0:?}")]
    UnknownKind(String),

    /// Key syntax error
    #[error(transparent)]
    Path(#[from] PathError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> FlatKey {
        s.parse().unwrap()
    }

    fn node(name: &str) -> Scope {
        Scope::instance(name).unwrap()
    }

    #[test]
    fn default_root() {
        assert_eq!(KeyScheme::default().root().to_string(), DEFAULT_ROOT);
    }

    #[test]
    fn build_global_and_instance_keys() {
        let scheme = KeyScheme::default();
        assert_eq!(
            scheme
                .build_key(Kind::FelixConfiguration, &Scope::Global, "InterfacePrefix")
                .unwrap(),
            key("/calico/v1/config/InterfacePrefix")
        );
        assert_eq!(
            scheme
                .build_key(Kind::FelixConfiguration, &node("mynode"), "IpInIpEnabled")
                .unwrap(),
            key("/calico/v1/host/mynode/config/IpInIpEnabled")
        );
        assert_eq!(
            scheme
                .build_key(Kind::ClusterInformation, &Scope::Global, "ClusterGUID")
                .unwrap(),
            key("/calico/v1/clusterinfo/ClusterGUID")
        );
    }

    #[test]
    fn parse_inverts_build() {
        let scheme = KeyScheme::default();
        for (kind, scope) in [
            (Kind::FelixConfiguration, Scope::Global),
            (Kind::FelixConfiguration, node("node-1.example.com")),
            (Kind::ClusterInformation, Scope::Global),
        ] {
            let built = scheme.build_key(kind, &scope, "Some_Field1").unwrap();
            let parsed = scheme.parse_key(&built).unwrap();
            assert_eq!(parsed.kind, kind);
            assert_eq!(parsed.scope, scope);
            assert_eq!(parsed.suffix, "Some_Field1");
        }
    }

    #[test]
    fn cluster_info_has_no_instance_scope() {
        let scheme = KeyScheme::default();
        let err = scheme
            .build_key(Kind::ClusterInformation, &node("n1"), "ClusterGUID")
            .unwrap_err();
        assert!(matches!(err, KeyError::UnsupportedScope { .. }));

        let parsed = scheme.parse_key(&key("/calico/v1/host/n1/clusterinfo/ClusterGUID"));
        assert!(matches!(parsed, Err(KeyError::UnrecognizedKey(_))));
    }

    #[test]
    fn instance_names_with_delimiter_are_rejected() {
        for bad in ["", "a/b", "with space", "tab\tname"] {
            assert!(
                matches!(Scope::instance(bad), Err(KeyError::InvalidInstanceName { .. })),
                "{bad:?} should be rejected"
            );
        }
        let scheme = KeyScheme::default();
        let err = scheme
            .build_key(
                Kind::FelixConfiguration,
                &Scope::Instance("a/b".into()),
                "X",
            )
            .unwrap_err();
        assert!(matches!(err, KeyError::InvalidInstanceName { .. }));
    }

    #[test]
    fn invalid_suffix_rejected() {
        let scheme = KeyScheme::default();
        for bad in ["", "a/b", "a-b", "a.b"] {
            assert!(matches!(
                scheme.build_key(Kind::FelixConfiguration, &Scope::Global, bad),
                Err(KeyError::InvalidSuffix(_))
            ));
        }
    }

    #[test]
    fn unrecognized_keys() {
        let scheme = KeyScheme::default();
        for raw in [
            "/calico/v1",
            "/calico/v1/config",
            "/calico/v1/Ready",
            "/calico/v1/policy/tier/default",
            "/calico/v2/config/X",
            "/calico/v1/host/n1/config",
            "/calico/v1/host/n1/bird_ip",
            "/calico/v1/config/bad-suffix",
            "/calico/v1/nodes/n1/config/X",
        ] {
            assert!(
                matches!(scheme.parse_key(&key(raw)), Err(KeyError::UnrecognizedKey(_))),
                "{raw} should be unrecognized"
            );
        }
    }

    #[test]
    fn custom_root() {
        let scheme = KeyScheme::new(key("/migration/felix"));
        let built = scheme
            .build_key(Kind::FelixConfiguration, &Scope::Global, "LogFilePath")
            .unwrap();
        assert_eq!(built, key("/migration/felix/config/LogFilePath"));
        assert!(KeyScheme::default().parse_key(&built).is_err());
    }

    #[test]
    fn scope_from_resource_name() {
        assert_eq!(Scope::from_resource_name("default").unwrap(), Scope::Global);
        assert_eq!(Scope::from_resource_name("node.mynode").unwrap(), node("mynode"));
        assert_eq!(node("mynode").resource_name(), "node.mynode");
        assert_eq!(Scope::Global.resource_name(), "default");
        for bad in ["", "mynode", "node.", "node.a/b", "Default"] {
            assert!(Scope::from_resource_name(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn scope_ordering_puts_global_first() {
        let mut scopes = vec![node("b"), Scope::Global, node("a")];
        scopes.sort();
        assert_eq!(scopes, vec![Scope::Global, node("a"), node("b")]);
    }

    #[test]
    fn kind_names() {
        assert_eq!("FelixConfiguration".parse::<Kind>().unwrap(), Kind::FelixConfiguration);
        assert!(matches!("Felix".parse::<Kind>(), Err(KeyError::UnknownKind(_))));
        assert_eq!(Kind::ClusterInformation.to_string(), "ClusterInformation");
    }
}
