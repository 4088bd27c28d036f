//! Conversion coordinator
//!
//! Drives the processor across whole batches:
//! - Decompose-many: one independent decomposition per resource
//! - Reconstruct-many: group entries by (kind, scope), one reconstruction per group
//!
//! A failure is recorded against the resource it belongs to and never stops
//! the rest of the batch.

use std::collections::{BTreeMap, HashSet};
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use kvmig_flat::{FlatEntry, KeyScheme, Kind, Scope};
use rayon::prelude::*;

use crate::config::ConverterConfig;
use crate::error::{ConvertError, ProcessError};
use crate::processor::{Processor, UnrecognizedEntry, UnrecognizedReason};
use crate::resource::{Resource, ResourceId};
use crate::schema::SchemaRegistry;
use crate::store::KvStore;

/// One resource that could not be converted
#[derive(Debug)]
pub struct ResourceFailure {
    pub id: ResourceId,
    pub error: ConvertError,
}

impl Display for ResourceFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.error)
    }
}

/// Result of decomposing a batch of resources
#[derive(Debug, Default)]
pub struct DecomposeReport {
    /// Entries of every converted resource, in input order
    pub entries: Vec<FlatEntry>,
    /// Resources that converted
    pub converted: Vec<ResourceId>,
    pub failures: Vec<ResourceFailure>,
}

impl DecomposeReport {
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// One-line summary for operators
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "decomposed {} resources into {} entries, {} failed",
            self.converted.len(),
            self.entries.len(),
            self.failures.len()
        )
    }
}

/// Result of reconstructing resources from a batch of entries
#[derive(Debug, Default)]
pub struct ReconstructReport {
    /// Reconstructed resources, global scope first within each kind
    pub resources: Vec<Resource>,
    pub failures: Vec<ResourceFailure>,
    /// Entries that were not applied to any resource
    pub unrecognized: Vec<UnrecognizedEntry>,
    strict: bool,
}

impl ReconstructReport {
    /// No failures, and no unrecognized entries when strict
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && (!self.strict || self.unrecognized.is_empty())
    }

    /// One-line summary for operators
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "reconstructed {} resources, {} failed, {} unrecognized entries",
            self.resources.len(),
            self.failures.len(),
            self.unrecognized.len()
        )
    }

    /// Find a reconstructed resource
    #[must_use]
    pub fn resource(&self, kind: Kind, name: &str) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|r| r.kind() == kind && r.name() == name)
    }
}

/// Entries split by the resource they belong to
#[derive(Debug, Default)]
struct Grouped {
    groups: BTreeMap<(Kind, Scope), Vec<FlatEntry>>,
    unrecognized: Vec<UnrecognizedEntry>,
}

enum GroupOutcome {
    Done {
        resource: Resource,
        unrecognized: Vec<UnrecognizedEntry>,
    },
    Failed(ResourceFailure),
}

/// Batch converter over an immutable schema registry
///
/// Holds no per-call mutable state; one converter may serve many threads.
#[derive(Debug, Clone)]
pub struct Converter {
    registry: Arc<SchemaRegistry>,
    scheme: KeyScheme,
    config: ConverterConfig,
}

impl Converter {
    /// Create converter
    ///
    /// # Errors
    /// Returns `Config` if the configured key root is invalid
    pub fn new(registry: Arc<SchemaRegistry>, config: ConverterConfig) -> Result<Self, ConvertError> {
        let scheme = config.key_scheme()?;
        Ok(Self {
            registry,
            scheme,
            config,
        })
    }

    /// Converter over the built-in tables
    ///
    /// # Errors
    /// Returns error if a built-in table or the config is invalid
    pub fn with_defaults(config: ConverterConfig) -> Result<Self, ConvertError> {
        let registry = SchemaRegistry::with_defaults().map_err(ConvertError::from)?;
        Self::new(Arc::new(registry), config)
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    #[inline]
    #[must_use]
    pub fn scheme(&self) -> &KeyScheme {
        &self.scheme
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Processor for `kind`
    ///
    /// # Errors
    /// Returns `UnregisteredKind` if the registry has no table for `kind`
    pub fn processor(&self, kind: Kind) -> Result<Processor<'_>, ConvertError> {
        self.registry
            .table(kind)
            .map(|table| Processor::new(table, &self.scheme))
            .ok_or(ConvertError::UnregisteredKind(kind))
    }

    /// Decompose one resource
    ///
    /// # Errors
    /// Returns the processor error for this resource
    pub fn decompose(&self, resource: &Resource) -> Result<Vec<FlatEntry>, ConvertError> {
        Ok(self.processor(resource.kind())?.decompose(resource)?)
    }

    /// Decompose every resource independently
    ///
    /// A resource that appears twice is converted once; the repeat is
    /// reported as `DuplicateResource`.
    pub fn decompose_many(&self, resources: &[Resource]) -> DecomposeReport {
        let mut seen = HashSet::with_capacity(resources.len());
        let duplicate: Vec<bool> = resources.iter().map(|r| !seen.insert(r.id())).collect();

        let run = |(resource, duplicate): (&Resource, bool)| {
            let id = resource.id();
            if duplicate {
                return (id.clone(), Err(ConvertError::DuplicateResource(id)));
            }
            let result = self.decompose(resource);
            (id, result)
        };

        let outcomes: Vec<_> = if self.config.parallel {
            resources
                .par_iter()
                .zip(duplicate.par_iter().copied())
                .map(run)
                .collect()
        } else {
            resources
                .iter()
                .zip(duplicate.iter().copied())
                .map(run)
                .collect()
        };

        let mut report = DecomposeReport::default();
        for (id, result) in outcomes {
            match result {
                Ok(entries) => {
                    tracing::debug!(resource = %id, entries = entries.len(), "decomposed");
                    report.entries.extend(entries);
                    report.converted.push(id);
                }
                Err(error) => {
                    tracing::warn!(resource = %id, %error, "decomposition failed");
                    report.failures.push(ResourceFailure { id, error });
                }
            }
        }
        report
    }

    fn group(&self, entries: Vec<FlatEntry>) -> Grouped {
        let mut grouped = Grouped::default();
        for entry in entries {
            match self.scheme.parse_key(&entry.key) {
                Ok(parsed) if self.registry.contains(parsed.kind) => grouped
                    .groups
                    .entry((parsed.kind, parsed.scope))
                    .or_default()
                    .push(entry),
                Ok(parsed) => grouped.unrecognized.push(UnrecognizedEntry::new(
                    entry,
                    UnrecognizedReason::UnregisteredKind(parsed.kind),
                )),
                Err(e) => grouped.unrecognized.push(UnrecognizedEntry::new(entry, e)),
            }
        }
        grouped
    }

    fn reconstruct_group(&self, kind: Kind, scope: &Scope, entries: Vec<FlatEntry>) -> GroupOutcome {
        let id = ResourceId::new(kind, scope.resource_name());
        let result = self
            .processor(kind)
            .and_then(|p| p.reconstruct(scope, entries).map_err(ConvertError::from));
        match result {
            Ok(out) => GroupOutcome::Done {
                resource: out.resource,
                unrecognized: out.unrecognized,
            },
            Err(error) => GroupOutcome::Failed(ResourceFailure { id, error }),
        }
    }

    /// Reconstruct one resource per (kind, scope) group
    ///
    /// Entries are never mixed across groups. Entries with unparseable keys or
    /// unregistered kinds land in `unrecognized`.
    pub fn reconstruct_many(&self, entries: Vec<FlatEntry>) -> ReconstructReport {
        let Grouped {
            groups,
            unrecognized,
        } = self.group(entries);
        let jobs: Vec<_> = groups.into_iter().collect();

        let run = |((kind, scope), entries): ((Kind, Scope), Vec<FlatEntry>)| {
            self.reconstruct_group(kind, &scope, entries)
        };
        let outcomes: Vec<GroupOutcome> = if self.config.parallel {
            jobs.into_par_iter().map(run).collect()
        } else {
            jobs.into_iter().map(run).collect()
        };

        let mut report = ReconstructReport {
            unrecognized,
            strict: self.config.strict_unrecognized,
            ..ReconstructReport::default()
        };
        for outcome in outcomes {
            match outcome {
                GroupOutcome::Done {
                    resource,
                    unrecognized,
                } => {
                    tracing::debug!(
                        resource = %resource.id(),
                        fields = resource.len(),
                        unrecognized = unrecognized.len(),
                        "reconstructed"
                    );
                    report.resources.push(resource);
                    report.unrecognized.extend(unrecognized);
                }
                GroupOutcome::Failed(failure) => {
                    tracing::warn!(resource = %failure.id, error = %failure.error, "reconstruction failed");
                    report.failures.push(failure);
                }
            }
        }
        for skipped in &report.unrecognized {
            tracing::debug!(key = %skipped.entry.key, reason = %skipped.reason, "entry not applied");
        }
        report
    }

    /// Reconstruct into a caller-seeded resource
    ///
    /// Only entries of the seed's own kind and scope reach the processor; all
    /// others are returned as unrecognized. Fields without an entry keep their
    /// seeded value.
    ///
    /// # Errors
    /// Returns the processor error; `seed` is then unchanged
    pub fn reconstruct_overlay(
        &self,
        seed: &mut Resource,
        entries: Vec<FlatEntry>,
    ) -> Result<Vec<UnrecognizedEntry>, ConvertError> {
        let processor = self.processor(seed.kind())?;
        let scope = seed.scope().map_err(|source| ProcessError::Key {
            resource: seed.id(),
            source,
        })?;

        let Grouped {
            mut groups,
            mut unrecognized,
        } = self.group(entries);
        let own = groups.remove(&(seed.kind(), scope)).unwrap_or_default();
        for ((kind, scope), rest) in groups {
            let reason = if kind == seed.kind() {
                UnrecognizedReason::OtherScope(scope)
            } else {
                UnrecognizedReason::OtherKind(kind)
            };
            unrecognized.extend(
                rest.into_iter()
                    .map(|entry| UnrecognizedEntry::new(entry, reason.clone())),
            );
        }

        unrecognized.extend(processor.reconstruct_into(seed, own)?);
        Ok(unrecognized)
    }

    /// Effective settings of one instance
    ///
    /// Starts from the global resource and overlays the instance resource;
    /// instance values win. The result carries the instance's name.
    ///
    /// # Errors
    /// Returns `IncompatibleMerge` unless `global` is the global resource and
    /// `instance` an instance resource of the same kind
    pub fn effective_view(&self, global: &Resource, instance: &Resource) -> Result<Resource, ConvertError> {
        let incompatible = |reason| ConvertError::IncompatibleMerge {
            global: global.id(),
            instance: instance.id(),
            reason,
        };
        if global.kind() != instance.kind() {
            return Err(incompatible("kinds differ"));
        }
        if !matches!(global.scope(), Ok(Scope::Global)) {
            return Err(incompatible("first resource is not global"));
        }
        if !matches!(instance.scope(), Ok(Scope::Instance(_))) {
            return Err(incompatible("second resource is not per-instance"));
        }

        let mut effective = global.renamed(instance.name());
        effective.overlay(instance);
        Ok(effective)
    }

    /// Reconstruct everything under the key root of `store`
    ///
    /// # Errors
    /// Returns `Store` if listing fails
    pub fn reconstruct_from_store(&self, store: &dyn KvStore) -> Result<ReconstructReport, ConvertError> {
        let entries = store.list(self.scheme.root())?;
        tracing::info!(entries = entries.len(), root = %self.scheme.root(), "listed store");
        Ok(self.reconstruct_many(entries))
    }

    /// Decompose `resources` and write every converted entry to `store`
    ///
    /// # Errors
    /// Returns `Store` if the write fails; per-resource failures are in the report
    pub fn decompose_to_store(
        &self,
        resources: &[Resource],
        store: &dyn KvStore,
    ) -> Result<DecomposeReport, ConvertError> {
        let report = self.decompose_many(resources);
        store.put(&report.entries)?;
        tracing::info!(entries = report.entries.len(), "wrote entries to store");
        Ok(report)
    }
}
