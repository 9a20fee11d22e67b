// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema encoder: class definition -> canonical bytes.
//!
//! Layout per class group (most-derived class first, one group per class in
//! the hierarchy that owns serialized fields):
//!
//! ```text
//! [ class-group count - 1, 4-bit inline / varint escape ]
//! repeat per group:
//!   [ varint: (field_count << 1) | registered_by_id ]
//!   [ varint registered id ]            when registered_by_id
//!   [ name header + package bytes ]     otherwise
//!   [ name header + type name bytes ]
//!   repeat per field (canonical order):
//!     [ u8: 3-bit size | 2-bit name encoding | mono | nullable | tracking ]
//!     [ varint: size - 7 ]              when the size field escapes
//!     [ field name bytes ]
//!     [ field type tree ]
//! ```
//!
//! The assembled payload is compressed opportunistically and framed with the
//! 64-bit identifying header (see the module docs of [`super`]).

use std::collections::HashSet;

use crate::buffer::WireWriter;
use crate::compress::MetaCompressor;
use crate::error::{MetaError, Result};
use crate::metastring::encoders::{
    self, FIELD_NAME_ENCODINGS, PKG_ENCODINGS, TYPE_NAME_ENCODINGS,
};
use crate::metastring::{Encoding, MetaString};
use crate::registry::TypeRegistry;
use crate::schema::{DescriptorGrouper, GroupOptions};
use crate::typedef::{
    ClassDef, ClassSpec, FieldInfo, TypeLayout, BIG_NAME_THRESHOLD, FIELD_NAME_SIZE_THRESHOLD,
    NUM_CLASS_THRESHOLD,
};

/// Build a schema for a local type: order the host-supplied descriptors
/// canonically, then encode.
pub fn build_class_def(
    registry: &TypeRegistry,
    layout: &TypeLayout,
    options: GroupOptions,
    has_fields_meta: bool,
    compressor: &dyn MetaCompressor,
) -> Result<ClassDef> {
    let ordered = DescriptorGrouper::group(layout.descriptors.clone(), options).into_sorted();
    let field_infos = ordered
        .into_iter()
        .map(|d| FieldInfo::new(d.declaring_class, d.name, d.field_type))
        .collect();
    build_grouped(
        registry,
        layout.spec.clone(),
        &layout.hierarchy,
        field_infos,
        has_fields_meta,
        compressor,
    )
}

/// Build a schema from pre-ordered field infos (used when rebuilding an
/// existing definition, e.g. after a root-class rename).
///
/// Hierarchy order is taken from the first appearance of each defining
/// class in `field_infos`, root class first.
pub fn build_class_def_from_field_infos(
    registry: &TypeRegistry,
    spec: ClassSpec,
    field_infos: Vec<FieldInfo>,
    has_fields_meta: bool,
    compressor: &dyn MetaCompressor,
) -> Result<ClassDef> {
    let mut hierarchy = vec![spec.name.clone()];
    for f in &field_infos {
        if !hierarchy.contains(&f.defining_class) {
            hierarchy.push(f.defining_class.clone());
        }
    }
    build_grouped(registry, spec, &hierarchy, field_infos, has_fields_meta, compressor)
}

fn build_grouped(
    registry: &TypeRegistry,
    spec: ClassSpec,
    hierarchy: &[String],
    field_infos: Vec<FieldInfo>,
    has_fields_meta: bool,
    compressor: &dyn MetaCompressor,
) -> Result<ClassDef> {
    if hierarchy.is_empty() {
        return Err(MetaError::Precondition {
            reason: "type has no field-owning classes".into(),
        });
    }
    if hierarchy[0] != spec.name {
        return Err(MetaError::Precondition {
            reason: format!(
                "hierarchy must start with the root class {}, found {}",
                spec.name, hierarchy[0]
            ),
        });
    }
    let groups = group_by_class(&spec, hierarchy, &field_infos)?;
    let ordered_fields: Vec<FieldInfo> = groups
        .iter()
        .flat_map(|(_, fields)| fields.iter().cloned())
        .collect();

    let mut w = WireWriter::with_capacity(128);
    write_group_count(&mut w, groups.len() as u32 - 1);
    for (class_name, fields) in &groups {
        write_group(registry, &mut w, &spec, class_name, fields)?;
    }
    let payload = w.into_bytes();

    let compressed = compressor.compress(&payload)?;
    let (body, is_compressed) = if compressed.len() < payload.len() {
        (compressed, true)
    } else {
        (payload, false)
    };
    let (id, encoded) = super::prepend_header(&body, is_compressed, has_fields_meta);
    log::debug!(
        "[TYPEDEF] encoded schema for {}: {} fields, {} bytes, id {:#018x}",
        spec.name,
        ordered_fields.len(),
        encoded.len(),
        id
    );
    Ok(ClassDef {
        spec,
        fields: ordered_fields,
        has_fields_meta,
        id,
        encoded,
    })
}

/// Partition fields by defining class, in hierarchy order.
///
/// The root class always gets a group, even when it owns no fields; other
/// classes appear only when they do. A field defined by a class outside the
/// hierarchy, or two fields with the same identity, are caller errors.
fn group_by_class<'a>(
    spec: &ClassSpec,
    hierarchy: &'a [String],
    field_infos: &[FieldInfo],
) -> Result<Vec<(&'a str, Vec<FieldInfo>)>> {
    let mut seen = HashSet::new();
    for f in field_infos {
        if !seen.insert(f.identity()) {
            return Err(MetaError::Precondition {
                reason: format!("duplicate field {}", f.identity()),
            });
        }
        if !hierarchy.contains(&f.defining_class) {
            return Err(MetaError::Precondition {
                reason: format!(
                    "field {} defined by {} which is not in the hierarchy of {}",
                    f.field_name, f.defining_class, spec.name
                ),
            });
        }
    }
    let mut groups = Vec::with_capacity(hierarchy.len());
    for class_name in hierarchy {
        let fields: Vec<FieldInfo> = field_infos
            .iter()
            .filter(|f| f.defining_class == *class_name)
            .cloned()
            .collect();
        if !fields.is_empty() || *class_name == spec.name {
            groups.push((class_name.as_str(), fields));
        }
    }
    Ok(groups)
}

fn write_group_count(w: &mut WireWriter, count: u32) {
    if count >= NUM_CLASS_THRESHOLD {
        w.write_u8(NUM_CLASS_THRESHOLD as u8);
        w.write_varuint32(count - NUM_CLASS_THRESHOLD);
    } else {
        w.write_u8(count as u8);
    }
}

fn write_group(
    registry: &TypeRegistry,
    w: &mut WireWriter,
    root_spec: &ClassSpec,
    class_name: &str,
    fields: &[FieldInfo],
) -> Result<()> {
    let group_header = (fields.len() as u32) << 1;
    if let Some(type_id) = registry.id_of(class_name) {
        w.write_varuint32(group_header | 1);
        w.write_varuint32(type_id);
    } else {
        w.write_varuint32(group_header);
        let (package, type_name) = match registry.named_tuple(class_name) {
            Some(tuple) => tuple,
            None => {
                // Root class carries enum/array structure; parents are plain.
                let class_spec = if class_name == root_spec.name {
                    root_spec.clone()
                } else {
                    ClassSpec::named(class_name)
                };
                encoders::split_spec(&class_spec)
            }
        };
        write_name(w, &encoders::encode_package(&package)?, &PKG_ENCODINGS)?;
        write_name(
            w,
            &encoders::encode_type_name(&type_name)?,
            &TYPE_NAME_ENCODINGS,
        )?;
    }
    for field in fields {
        write_field(w, field)?;
    }
    Ok(())
}

/// Name header: `6-bit size | 2-bit encoding`, escaping to a varint carrying
/// `size - 63` when the byte length does not fit inline.
fn write_name(w: &mut WireWriter, name: &MetaString, table: &[Encoding]) -> Result<()> {
    let encoding = encoders::encoding_index(table, name.encoding())?;
    let len = name.bytes().len();
    if len >= BIG_NAME_THRESHOLD {
        w.write_u8(((BIG_NAME_THRESHOLD as u8) << 2) | encoding);
        w.write_varuint32((len - BIG_NAME_THRESHOLD) as u32);
    } else {
        w.write_u8(((len as u8) << 2) | encoding);
    }
    w.write_bytes(name.bytes());
    Ok(())
}

fn write_field(w: &mut WireWriter, field: &FieldInfo) -> Result<()> {
    if field.field_name.is_empty() {
        return Err(MetaError::Precondition {
            reason: format!("empty field name in {}", field.defining_class),
        });
    }
    let name = encoders::encode_field_name(&field.field_name)?;
    let encoding = encoders::encoding_index(&FIELD_NAME_ENCODINGS, name.encoding())?;

    let ft = &field.field_type;
    let mut header = u8::from(ft.monomorphic) << 2;
    header |= u8::from(ft.nullable) << 1;
    header |= u8::from(ft.tracking_ref);
    header |= encoding << 3;

    // Size stores byte length - 1; names are never empty.
    let size = name.bytes().len() - 1;
    if size >= FIELD_NAME_SIZE_THRESHOLD {
        header |= (FIELD_NAME_SIZE_THRESHOLD as u8) << 5;
        w.write_u8(header);
        w.write_varuint32((size - FIELD_NAME_SIZE_THRESHOLD) as u32);
    } else {
        header |= (size as u8) << 5;
        w.write_u8(header);
    }
    w.write_bytes(name.bytes());
    ft.write(w, false);
    Ok(())
}
