//! Flat store keys
//!
//! Provides [`FlatKey`], the slash-delimited hierarchical key used by the
//! flat key/value store.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Key segment delimiter
pub const DELIMITER: char = '/';

/// Hierarchical key in the flat store
///
/// # Examples
/// - `["calico", "v1", "config", "InterfacePrefix"]` → `/calico/v1/config/InterfacePrefix`
/// - `["calico", "v1", "host", "node1", "config", "IpInIpEnabled"]`
///   → `/calico/v1/host/node1/config/IpInIpEnabled`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlatKey(Vec<String>);

impl FlatKey {
    /// Create key from segments
    ///
    /// # Errors
    /// Returns error if a segment is empty or contains the delimiter
    pub fn new(segments: Vec<String>) -> Result<Self, PathError> {
        for seg in &segments {
            validate_segment(seg)?;
        }
        Ok(Self(segments))
    }

    /// Empty key (store root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if key is the root
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get last segment (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Append a segment, returning new key
    ///
    /// # Errors
    /// Returns error if the segment is empty or contains the delimiter
    pub fn child(&self, segment: impl Into<String>) -> Result<Self, PathError> {
        let segment = segment.into();
        validate_segment(&segment)?;
        let mut new = self.clone();
        new.0.push(segment);
        Ok(new)
    }

    /// Check if this key is a prefix of another
    ///
    /// - `/calico/v1` is prefix of `/calico/v1/config/X`
    /// - `/calico/v1/config` is NOT prefix of `/calico/v1/configs`
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        self.0 == other.0[..self.0.len()]
    }

    /// Get the segments after `ancestor`
    ///
    /// Returns `None` if `ancestor` is not a prefix of this key.
    #[must_use]
    pub fn strip_prefix(&self, ancestor: &Self) -> Option<&[String]> {
        ancestor
            .is_prefix_of(self)
            .then(|| &self.0[ancestor.0.len()..])
    }
}

fn validate_segment(seg: &str) -> Result<(), PathError> {
    if seg.is_empty() {
        Err(PathError::EmptySegment)
    } else if seg.contains(DELIMITER) {
        Err(PathError::InvalidSegment(seg.to_string()))
    } else {
        Ok(())
    }
}

impl Display for FlatKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for seg in &self.0 {
            write!(f, "{DELIMITER}{seg}")?;
        }
        Ok(())
    }
}

impl FromStr for FlatKey {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.strip_prefix(DELIMITER).ok_or(PathError::NotAbsolute)?;
        // Tolerate a single trailing slash, as directory listings produce them
        let body = body.strip_suffix(DELIMITER).unwrap_or(body);
        if body.is_empty() {
            return Ok(Self::root());
        }

        let segments = body
            .split(DELIMITER)
            .map(|seg| {
                if seg.is_empty() {
                    Err(PathError::EmptySegment)
                } else {
                    Ok(seg.to_string())
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(Self(segments))
    }
}

impl Default for FlatKey {
    fn default() -> Self {
        Self::root()
    }
}

impl Serialize for FlatKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FlatKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors related to flat key syntax
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty segment in key
    #[error("key contains empty segment")]
    EmptySegment,

    /// Segment contains the delimiter
    #[error("invalid segment: {0:?} (must not contain '/')")]
    InvalidSegment(String),

    /// Key does not start with the delimiter
    #[error("key must start with '/'")]
    NotAbsolute,
}
