// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Deterministic field ordering.
//!
//! Two peers must produce byte-identical schema blobs for the same type
//! without ever exchanging field order, because the blob's content hash is
//! the schema's identity. The grouper partitions fields into six buckets and
//! fully orders each bucket:
//!
//! 1. primitives -- widest first, compressible widths pushed to the tail
//!    when numeric compression is on (their encoded size is no longer
//!    type-determined, so they are kept contiguous)
//! 2. boxed primitives -- same ordering
//! 3. monomorphic object types
//! 4. polymorphic object types
//! 5. collections
//! 6. maps
//!
//! Ties break by field name, then declaring class, so a field a subclass
//! shares a name with still has one canonical position.

use std::cmp::Ordering;

use super::type_ids;
use super::Descriptor;

/// Ordering policy knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupOptions {
    /// i32-width fields use varint compression on the value wire.
    pub compress_i32: bool,
    /// i64-width fields use varint/small-long compression on the value wire.
    pub compress_i64: bool,
    /// Input is already in canonical order; bucket without re-sorting.
    pub already_grouped: bool,
}

/// Fields partitioned into their six canonical buckets.
pub struct DescriptorGrouper {
    primitives: Vec<Descriptor>,
    boxed: Vec<Descriptor>,
    monomorphic: Vec<Descriptor>,
    other: Vec<Descriptor>,
    collections: Vec<Descriptor>,
    maps: Vec<Descriptor>,
}

impl DescriptorGrouper {
    /// Partition and order `descriptors` under `options`.
    pub fn group(descriptors: impl IntoIterator<Item = Descriptor>, options: GroupOptions) -> Self {
        let mut grouper = Self {
            primitives: Vec::new(),
            boxed: Vec::new(),
            monomorphic: Vec::new(),
            other: Vec::new(),
            collections: Vec::new(),
            maps: Vec::new(),
        };
        for d in descriptors {
            grouper.bucket_for(&d).push(d);
        }
        if !options.already_grouped {
            let primitive_cmp = primitive_comparator(options);
            grouper.primitives.sort_by(&primitive_cmp);
            grouper.boxed.sort_by(&primitive_cmp);
            grouper.monomorphic.sort_by(compare_by_type_and_name);
            grouper.other.sort_by(compare_by_type_and_name);
            grouper.collections.sort_by(compare_by_type_and_name);
            grouper.maps.sort_by(compare_by_type_and_name);
        }
        grouper
    }

    fn bucket_for(&mut self, d: &Descriptor) -> &mut Vec<Descriptor> {
        use super::FieldKind;
        if d.field_type.is_primitive() {
            &mut self.primitives
        } else if d.field_type.is_boxed_primitive() {
            &mut self.boxed
        } else {
            match d.field_type.kind {
                FieldKind::Collection { .. } => &mut self.collections,
                FieldKind::Map { .. } => &mut self.maps,
                _ if d.field_type.monomorphic => &mut self.monomorphic,
                _ => &mut self.other,
            }
        }
    }

    /// All buckets concatenated in canonical order.
    pub fn into_sorted(self) -> Vec<Descriptor> {
        let mut out = Vec::with_capacity(self.len());
        out.extend(self.primitives);
        out.extend(self.boxed);
        out.extend(self.monomorphic);
        out.extend(self.other);
        out.extend(self.collections);
        out.extend(self.maps);
        out
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
            + self.boxed.len()
            + self.monomorphic.len()
            + self.other.len()
            + self.collections.len()
            + self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn primitives(&self) -> &[Descriptor] {
        &self.primitives
    }

    pub fn boxed(&self) -> &[Descriptor] {
        &self.boxed
    }

    pub fn monomorphic(&self) -> &[Descriptor] {
        &self.monomorphic
    }

    pub fn other(&self) -> &[Descriptor] {
        &self.other
    }

    pub fn collections(&self) -> &[Descriptor] {
        &self.collections
    }

    pub fn maps(&self) -> &[Descriptor] {
        &self.maps
    }
}

fn registered_id(d: &Descriptor) -> u32 {
    d.field_type.registered_id().unwrap_or(0)
}

fn is_compressed(d: &Descriptor, options: GroupOptions) -> bool {
    let id = registered_id(d);
    (type_ids::is_int32_class(id) && options.compress_i32)
        || (type_ids::is_int64_class(id) && options.compress_i64)
}

/// Widest first; compressible widths after every fixed width; then id,
/// name, declaring class.
fn primitive_comparator(options: GroupOptions) -> impl Fn(&Descriptor, &Descriptor) -> Ordering {
    move |a, b| {
        let a_compressed = is_compressed(a, options);
        let b_compressed = is_compressed(b, options);
        a_compressed
            .cmp(&b_compressed)
            .then_with(|| {
                let a_size = type_ids::primitive_size(registered_id(a)).unwrap_or(0);
                let b_size = type_ids::primitive_size(registered_id(b)).unwrap_or(0);
                b_size.cmp(&a_size)
            })
            .then_with(|| registered_id(b).cmp(&registered_id(a)))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.declaring_class.cmp(&b.declaring_class))
    }
}

/// Rendered type name, then field name, then declaring class.
fn compare_by_type_and_name(a: &Descriptor, b: &Descriptor) -> Ordering {
    a.type_name
        .cmp(&b.type_name)
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.declaring_class.cmp(&b.declaring_class))
}
