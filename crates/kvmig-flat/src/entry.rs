//! Flat key/value entries

use serde::{Deserialize, Serialize};

use crate::key::FlatKey;
use crate::scheme::{KeyError, KeyScheme, ParsedKey};

/// One key/value pair as held by the flat store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlatEntry {
    pub key: FlatKey,
    pub value: String,
}

impl FlatEntry {
    #[inline]
    #[must_use]
    pub fn new(key: FlatKey, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    /// Parse this entry's key under `scheme`
    ///
    /// # Errors
    /// Returns `UnrecognizedKey` if the key is outside the scheme's layout
    #[inline]
    pub fn parse_key(&self, scheme: &KeyScheme) -> Result<ParsedKey, KeyError> {
        scheme.parse_key(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::{Kind, Scope};

    #[test]
    fn entry_serde_shape() {
        let entry = FlatEntry::new("/calico/v1/config/InterfacePrefix".parse().unwrap(), "cali");
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(
            json,
            r#"{"key":"/calico/v1/config/InterfacePrefix","value":"cali"}"#
        );
        let back: FlatEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn entry_parse_key() {
        let entry = FlatEntry::new("/calico/v1/host/n1/config/IpInIpEnabled".parse().unwrap(), "true");
        let parsed = entry.parse_key(&KeyScheme::default()).unwrap();
        assert_eq!(parsed.kind, Kind::FelixConfiguration);
        assert_eq!(parsed.scope, Scope::Instance("n1".into()));
        assert_eq!(parsed.suffix, "IpInIpEnabled");
    }
}
