//! Resource processor
//!
//! Decomposes one [`Resource`] into flat entries and reconstructs one resource
//! from flat entries, driven by the kind's [`DescriptorTable`].
//!
//! The processor never merges across scopes: entries of any other kind or
//! scope are handed back as [`UnrecognizedEntry`] values.

use std::collections::{BTreeMap, HashSet};

use kvmig_flat::{codec, FieldValue, FlatEntry, KeyError, KeyScheme, Kind, Scope};

use crate::error::ProcessError;
use crate::resource::Resource;
use crate::schema::{DescriptorTable, FieldDescriptor};

/// Why an entry was not applied to a reconstruction
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnrecognizedReason {
    /// Key is outside the scheme's layout
    #[error(transparent)]
    Key(#[from] KeyError),

    /// Key belongs to a kind with no registered table
    #[error("no descriptor table for {0}")]
    UnregisteredKind(Kind),

    /// Key belongs to another kind
    #[error("belongs to {0}")]
    OtherKind(Kind),

    /// Key belongs to another scope
    #[error("belongs to {0} scope")]
    OtherScope(Scope),

    /// Suffix names no field of the kind
    #[error("unknown field suffix {0}")]
    UnknownSuffix(String),

    /// Field is not stored in this scope
    #[error("field {field} is not stored in {scope} scope")]
    NotApplicable { field: &'static str, scope: Scope },
}

/// Entry set aside during reconstruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrecognizedEntry {
    pub entry: FlatEntry,
    pub reason: UnrecognizedReason,
}

impl UnrecognizedEntry {
    #[inline]
    #[must_use]
    pub fn new(entry: FlatEntry, reason: impl Into<UnrecognizedReason>) -> Self {
        Self {
            entry,
            reason: reason.into(),
        }
    }
}

/// Output of a reconstruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconstruction {
    pub resource: Resource,
    pub unrecognized: Vec<UnrecognizedEntry>,
}

/// Converts resources of one kind
#[derive(Debug, Clone, Copy)]
pub struct Processor<'a> {
    table: &'a DescriptorTable,
    scheme: &'a KeyScheme,
}

impl<'a> Processor<'a> {
    #[inline]
    #[must_use]
    pub fn new(table: &'a DescriptorTable, scheme: &'a KeyScheme) -> Self {
        Self { table, scheme }
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.table.kind()
    }

    fn check_kind(&self, resource: &Resource) -> Result<Scope, ProcessError> {
        if resource.kind() != self.kind() {
            return Err(ProcessError::KindMismatch {
                expected: self.kind(),
                found: resource.kind(),
            });
        }
        let to_error = |source| ProcessError::Key {
            resource: resource.id(),
            source,
        };
        let scope = resource.scope().map_err(to_error)?;
        self.scheme
            .scope_prefix(self.kind(), &scope)
            .map_err(to_error)?;
        Ok(scope)
    }

    /// Decompose a resource into flat entries
    ///
    /// Entries follow table order. Unset fields produce no entry; fields whose
    /// scope rule excludes the resource's scope are skipped.
    ///
    /// # Errors
    /// - `KindMismatch` if the resource is of another kind
    /// - `Key` if the resource name maps to no usable scope
    /// - `UnknownField` if the resource sets a field with no descriptor
    /// - `FieldEncodingFailed` on the first value the codec rejects
    pub fn decompose(&self, resource: &Resource) -> Result<Vec<FlatEntry>, ProcessError> {
        let scope = self.check_kind(resource)?;
        let kind = self.kind();

        if let Some((field, _)) = resource
            .fields()
            .find(|(name, _)| self.table.by_name(name).is_none())
        {
            return Err(ProcessError::UnknownField {
                resource: resource.id(),
                field: field.to_string(),
            });
        }

        let mut entries = Vec::with_capacity(resource.len());
        for descriptor in self.table.iter() {
            let Some(value) = resource.get(descriptor.name) else {
                continue;
            };
            if !descriptor.scope.applies_to(&scope) {
                tracing::trace!(
                    resource = %resource.id(),
                    field = descriptor.name,
                    "field not stored in {scope} scope, skipping"
                );
                continue;
            }

            let raw = codec::encode(descriptor.field_type, value).map_err(|source| {
                ProcessError::FieldEncodingFailed {
                    resource: resource.id(),
                    field: descriptor.name,
                    source,
                }
            })?;
            let key = self
                .scheme
                .build_key(kind, &scope, descriptor.key_suffix)
                .map_err(|source| ProcessError::Key {
                    resource: resource.id(),
                    source,
                })?;
            entries.push(FlatEntry::new(key, raw));
        }

        Ok(entries)
    }

    /// Reconstruct a fresh resource for `scope`
    ///
    /// # Errors
    /// See [`Processor::reconstruct_into`]
    pub fn reconstruct<I>(&self, scope: &Scope, entries: I) -> Result<Reconstruction, ProcessError>
    where
        I: IntoIterator<Item = FlatEntry>,
    {
        let mut resource = Resource::for_scope(self.kind(), scope);
        let unrecognized = self.reconstruct_into(&mut resource, entries)?;
        Ok(Reconstruction {
            resource,
            unrecognized,
        })
    }

    /// Overlay decoded entries onto an existing resource
    ///
    /// Fields with no entry keep their current value, so a seeded resource is
    /// merged into rather than wiped. Entries for another kind or scope, with
    /// unknown suffixes, or for fields not stored in this scope are returned
    /// unapplied. On error `target` is left untouched.
    ///
    /// # Errors
    /// - `KindMismatch` / `Key` as for [`Processor::decompose`]
    /// - `FieldDecodingFailed` if a matched entry's value does not decode
    pub fn reconstruct_into<I>(
        &self,
        target: &mut Resource,
        entries: I,
    ) -> Result<Vec<UnrecognizedEntry>, ProcessError>
    where
        I: IntoIterator<Item = FlatEntry>,
    {
        let scope = self.check_kind(target)?;
        let mut staged: BTreeMap<&'static str, FieldValue> = BTreeMap::new();
        let mut seen: HashSet<&'static str> = HashSet::new();
        let mut unrecognized = Vec::new();

        for entry in entries {
            let descriptor = match self.match_entry(&scope, &entry) {
                Ok(descriptor) => descriptor,
                Err(reason) => {
                    unrecognized.push(UnrecognizedEntry::new(entry, reason));
                    continue;
                }
            };

            let value = codec::decode(descriptor.field_type, &entry.value).map_err(|source| {
                ProcessError::FieldDecodingFailed {
                    resource: target.id(),
                    field: descriptor.name,
                    key: entry.key.clone(),
                    source,
                }
            })?;

            if !seen.insert(descriptor.name) {
                tracing::debug!(key = %entry.key, "duplicate entry, later value wins");
            }
            staged.insert(descriptor.name, value);
        }

        for (field, value) in staged {
            target.set(field, value);
        }
        Ok(unrecognized)
    }

    fn match_entry(
        &self,
        scope: &Scope,
        entry: &FlatEntry,
    ) -> Result<&'a FieldDescriptor, UnrecognizedReason> {
        let parsed = self.scheme.parse_key(&entry.key)?;
        if parsed.kind != self.kind() {
            return Err(UnrecognizedReason::OtherKind(parsed.kind));
        }
        if parsed.scope != *scope {
            return Err(UnrecognizedReason::OtherScope(parsed.scope));
        }
        let descriptor = self
            .table
            .by_suffix(&parsed.suffix)
            .ok_or(UnrecognizedReason::UnknownSuffix(parsed.suffix))?;
        if !descriptor.scope.applies_to(scope) {
            return Err(UnrecognizedReason::NotApplicable {
                field: descriptor.name,
                scope: scope.clone(),
            });
        }
        Ok(descriptor)
    }
}
