// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-peer type registration and schema deduplication.
//!
//! Each peer configures its own id -> type table; ids are a pure
//! optimization that substitutes a varint for a package/type name pair.
//! Unregistered types degrade to name-based encoding, and unknown ids on
//! decode resolve to a placeholder spec instead of failing (forward
//! compatibility -- the payload span is still known and skippable).
//!
//! The registry also owns the schema dedup table: schemas are interned by
//! their content-hash id, so a schema already seen by the session is never
//! re-parsed or re-transmitted. All maps are concurrent with
//! compute-if-absent semantics; a doubly-computed miss is idempotent.

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{MetaError, Result};
use crate::typedef::{ClassDef, ClassSpec};

/// Default bound on a single schema payload accepted by the decoder.
pub const DEFAULT_MAX_META_SIZE: usize = 1 << 20;

/// A type registered by id on this peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredType {
    pub type_id: u32,
    pub spec: ClassSpec,
    /// Exact runtime type known statically for values of this type.
    pub monomorphic: bool,
}

/// Peer-local registration state plus the schema dedup table.
pub struct TypeRegistry {
    by_id: DashMap<u32, Arc<RegisteredType>>,
    id_by_name: DashMap<String, u32>,
    /// Types registered under an explicit (namespace, type name) pair
    /// instead of an id.
    named: DashMap<String, (String, String)>,
    /// Schemas interned by content-hash id.
    schemas: DashMap<u64, Arc<ClassDef>>,
    max_meta_size: usize,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
            id_by_name: DashMap::new(),
            named: DashMap::new(),
            schemas: DashMap::new(),
            max_meta_size: DEFAULT_MAX_META_SIZE,
        }
    }

    /// Override the maximum schema payload size accepted by decode.
    pub fn with_max_meta_size(mut self, max_meta_size: usize) -> Self {
        self.max_meta_size = max_meta_size;
        self
    }

    pub fn max_meta_size(&self) -> usize {
        self.max_meta_size
    }

    /// Register `spec` under `type_id`. Duplicate ids are rejected.
    pub fn register(&self, type_id: u32, spec: ClassSpec, monomorphic: bool) -> Result<()> {
        let entry = Arc::new(RegisteredType {
            type_id,
            spec,
            monomorphic,
        });
        match self.by_id.entry(type_id) {
            dashmap::mapref::entry::Entry::Occupied(occupied) => {
                return Err(MetaError::Precondition {
                    reason: format!(
                        "type id {} already registered for {}",
                        type_id,
                        occupied.get().spec.name
                    ),
                });
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(entry.clone());
            }
        }
        self.id_by_name.insert(entry.spec.name.clone(), type_id);
        Ok(())
    }

    /// Register a type under an explicit (namespace, type name) pair.
    ///
    /// The encoder writes that pair verbatim instead of splitting the
    /// fully-qualified class name.
    pub fn register_named(
        &self,
        class_name: impl Into<String>,
        namespace: impl Into<String>,
        type_name: impl Into<String>,
    ) {
        self.named
            .insert(class_name.into(), (namespace.into(), type_name.into()));
    }

    pub fn id_of(&self, class_name: &str) -> Option<u32> {
        self.id_by_name.get(class_name).map(|id| *id.value())
    }

    pub fn type_by_id(&self, type_id: u32) -> Option<Arc<RegisteredType>> {
        self.by_id.get(&type_id).map(|e| e.value().clone())
    }

    pub fn named_tuple(&self, class_name: &str) -> Option<(String, String)> {
        self.named.get(class_name).map(|e| e.value().clone())
    }

    /// Resolve a decoded registered id to a spec.
    ///
    /// Unknown ids resolve to the nonexistent-type placeholder so that
    /// downstream value handling can still skip or forward the bytes.
    pub fn resolve_spec(&self, type_id: u32) -> ClassSpec {
        match self.type_by_id(type_id) {
            Some(registered) => registered.spec.clone(),
            None => {
                log::warn!(
                    "[TYPEDEF] type id {} not registered, resolving to placeholder",
                    type_id
                );
                ClassSpec::nonexistent()
            }
        }
    }

    /// Intern `def` by its content-hash id.
    ///
    /// The first definition wins; a concurrent insert of the same id
    /// converges on one shared instance.
    pub fn intern_schema(&self, def: ClassDef) -> Arc<ClassDef> {
        self.schemas
            .entry(def.id())
            .or_insert_with(|| Arc::new(def))
            .value()
            .clone()
    }

    pub fn schema_by_id(&self, id: u64) -> Option<Arc<ClassDef>> {
        self.schemas.get(&id).map(|e| e.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::type_ids;

    #[test]
    fn test_register_and_lookup() {
        let registry = TypeRegistry::new();
        registry
            .register(
                type_ids::FIRST_USER_ID,
                ClassSpec::named("org.example.Point"),
                true,
            )
            .unwrap();

        assert_eq!(
            registry.id_of("org.example.Point"),
            Some(type_ids::FIRST_USER_ID)
        );
        let entry = registry.type_by_id(type_ids::FIRST_USER_ID).unwrap();
        assert_eq!(entry.spec.name, "org.example.Point");
        assert!(entry.monomorphic);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let registry = TypeRegistry::new();
        registry
            .register(64, ClassSpec::named("org.example.A"), true)
            .unwrap();
        let err = registry.register(64, ClassSpec::named("org.example.B"), true);
        assert!(matches!(err, Err(MetaError::Precondition { .. })));
    }

    #[test]
    fn test_unknown_id_resolves_to_placeholder() {
        let registry = TypeRegistry::new();
        let spec = registry.resolve_spec(9999);
        assert!(spec.is_nonexistent());
    }

    #[test]
    fn test_named_registration() {
        let registry = TypeRegistry::new();
        registry.register_named("org.example.Point", "demo", "point");
        assert_eq!(
            registry.named_tuple("org.example.Point"),
            Some(("demo".to_string(), "point".to_string()))
        );
        assert_eq!(registry.named_tuple("org.example.Other"), None);
    }
}
