// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema reconciliation: merge a remote definition with the local type.
//!
//! Sender and receiver may disagree on a type's fields -- versions drift,
//! fields get added and removed. Reconciliation produces the field list a
//! value reader must use: every field the remote actually sent, backed by
//! local type information where a matching local field exists, synthesized
//! from the remote shape where it does not. Fields that exist only locally
//! are omitted. Neither direction of drift is an error.

use std::collections::HashMap;

use crate::error::{MetaError, Result};
use crate::schema::{Descriptor, FieldKind, FieldType};
use crate::typedef::{ClassDef, ClassSpec};

/// The local process's view of a type: identity, hierarchy and fields, as
/// supplied by the host's registry/introspection layer.
#[derive(Debug, Clone)]
pub struct TypeLayout {
    pub spec: ClassSpec,
    /// Class names owning fields, most-derived first. Defaults to just the
    /// root class for hierarchy-less types.
    pub hierarchy: Vec<String>,
    pub descriptors: Vec<Descriptor>,
}

impl TypeLayout {
    pub fn new(spec: ClassSpec, descriptors: Vec<Descriptor>) -> Self {
        let hierarchy = vec![spec.name.clone()];
        Self {
            spec,
            hierarchy,
            descriptors,
        }
    }

    /// Replace the default single-class hierarchy.
    pub fn with_hierarchy(mut self, hierarchy: Vec<String>) -> Self {
        self.hierarchy = hierarchy;
        self
    }
}

/// Merge `remote` against the locally known `local` layout.
///
/// The result follows the remote field order (the order values arrive in).
/// Reused local descriptors keep their full local type information but take
/// the remote's rendered type tag, so downstream dispatch matches what the
/// peer actually sent.
pub fn reconcile(remote: &ClassDef, local: &TypeLayout) -> Result<Vec<Descriptor>> {
    let mut by_identity: HashMap<String, &Descriptor> = HashMap::new();
    for d in &local.descriptors {
        if by_identity.insert(d.identity(), d).is_some() {
            return Err(MetaError::Precondition {
                reason: format!("duplicate field {} in local layout", d.identity()),
            });
        }
    }
    let mut reconciled = Vec::with_capacity(remote.fields().len());
    for field in remote.fields() {
        let remote_tag = field.field_type.render_name();
        match by_identity.get(&field.identity()) {
            Some(local_desc) if is_compatible(&local_desc.field_type, &field.field_type) => {
                reconciled.push(local_desc.with_type_name(remote_tag));
            }
            matched => {
                if matched.is_some() {
                    log::debug!(
                        "[TYPEDEF] field {} has incompatible local type, using remote shape",
                        field.identity()
                    );
                }
                reconciled.push(Descriptor::new(
                    field.defining_class.clone(),
                    field.field_name.clone(),
                    remote_tag,
                    field.field_type.clone(),
                ));
            }
        }
    }
    Ok(reconciled)
}

/// Whether the locally declared shape can absorb values of the remote shape.
///
/// An opaque local field accepts anything (it is the supertype catch-all);
/// otherwise both sides must agree on the shape family, and registered types
/// on the exact id. Nested generics are intentionally not compared: the
/// container reader adapts element-wise.
fn is_compatible(local: &FieldType, remote: &FieldType) -> bool {
    match (&local.kind, &remote.kind) {
        (FieldKind::Object, _) => true,
        (FieldKind::Enum, FieldKind::Enum) => true,
        (FieldKind::Registered { type_id: a }, FieldKind::Registered { type_id: b }) => a == b,
        (FieldKind::Collection { .. }, FieldKind::Collection { .. }) => true,
        (FieldKind::Map { .. }, FieldKind::Map { .. }) => true,
        (FieldKind::Array { .. }, FieldKind::Array { .. }) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::type_ids::{INT32, STRING};

    #[test]
    fn test_compatibility_rules() {
        let object = FieldType::object(false, true, true);
        let i32_field = FieldType::registered(INT32, true, false, false);
        let string_field = FieldType::registered(STRING, true, true, false);
        let list = FieldType::collection(string_field.clone(), true, true, false);

        assert!(is_compatible(&object, &i32_field));
        assert!(is_compatible(&object, &list));
        assert!(is_compatible(&i32_field, &i32_field));
        assert!(!is_compatible(&i32_field, &string_field));
        assert!(!is_compatible(&i32_field, &object));
        assert!(is_compatible(&list, &list));
        assert!(!is_compatible(&list, &i32_field));
        assert!(is_compatible(
            &FieldType::enumeration(true),
            &FieldType::enumeration(false)
        ));
    }
}
