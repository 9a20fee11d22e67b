// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Recursive field-shape model and its wire codec.
//!
//! A field's shape is a closed variant tree: a registered type, an enum, an
//! array, a collection, a map, or an opaque object. Encode/decode are
//! exhaustive matches over the variant set, so an unhandled shape is a
//! compile-time error rather than a fall-through at runtime.
//!
//! # Wire form
//!
//! The discriminant is a varint: `0` object, `1` map, `2` collection,
//! `3` array, `4` enum, `5 + id` registered. At the top level of a field the
//! three flags live in the field header (see `typedef::encoder`), so only the
//! bare discriminant is written; nested component types carry their flags in
//! the low three bits of the discriminant varint
//! (`tag << 3 | monomorphic << 2 | nullable << 1 | tracking_ref`).

use super::type_ids;
use crate::buffer::{WireReader, WireWriter};
use crate::error::{MetaError, Result};

const TAG_OBJECT: u32 = 0;
const TAG_MAP: u32 = 1;
const TAG_COLLECTION: u32 = 2;
const TAG_ARRAY: u32 = 3;
const TAG_ENUM: u32 = 4;
const TAG_REGISTERED_BASE: u32 = 5;

/// Nesting bound for decoded type trees; malicious input cannot recurse
/// past it.
const MAX_NESTING: u32 = 64;

/// The shape of a field, without its flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Opaque/polymorphic object; resolved at decode time to a placeholder.
    Object,
    /// Key/value map with typed entries.
    Map {
        key: Box<FieldType>,
        value: Box<FieldType>,
    },
    /// Homogeneous collection with a typed element.
    Collection { element: Box<FieldType> },
    /// N-dimensional array of a component type.
    Array {
        component: Box<FieldType>,
        dimensions: u32,
    },
    /// Enum known to both peers.
    Enum,
    /// Type known to both peers by a small registered id.
    Registered { type_id: u32 },
}

/// A field's shape plus its serialization flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldType {
    pub kind: FieldKind,
    /// Runtime type fully determined by the declaration; the value layer may
    /// omit its type tag.
    pub monomorphic: bool,
    /// Values may be null/absent.
    pub nullable: bool,
    /// Values participate in identity/cycle tracking.
    pub tracking_ref: bool,
}

impl FieldType {
    pub fn object(monomorphic: bool, nullable: bool, tracking_ref: bool) -> Self {
        Self {
            kind: FieldKind::Object,
            monomorphic,
            nullable,
            tracking_ref,
        }
    }

    pub fn registered(type_id: u32, monomorphic: bool, nullable: bool, tracking_ref: bool) -> Self {
        Self {
            kind: FieldKind::Registered { type_id },
            monomorphic,
            nullable,
            tracking_ref,
        }
    }

    /// Enum fields are always monomorphic and never reference-tracked.
    pub fn enumeration(nullable: bool) -> Self {
        Self {
            kind: FieldKind::Enum,
            monomorphic: true,
            nullable,
            tracking_ref: false,
        }
    }

    pub fn array(
        component: FieldType,
        dimensions: u32,
        monomorphic: bool,
        nullable: bool,
        tracking_ref: bool,
    ) -> Self {
        Self {
            kind: FieldKind::Array {
                component: Box::new(component),
                dimensions,
            },
            monomorphic,
            nullable,
            tracking_ref,
        }
    }

    pub fn collection(
        element: FieldType,
        monomorphic: bool,
        nullable: bool,
        tracking_ref: bool,
    ) -> Self {
        Self {
            kind: FieldKind::Collection {
                element: Box::new(element),
            },
            monomorphic,
            nullable,
            tracking_ref,
        }
    }

    pub fn map(
        key: FieldType,
        value: FieldType,
        monomorphic: bool,
        nullable: bool,
        tracking_ref: bool,
    ) -> Self {
        Self {
            kind: FieldKind::Map {
                key: Box::new(key),
                value: Box::new(value),
            },
            monomorphic,
            nullable,
            tracking_ref,
        }
    }

    /// The registered id, if this is a registered shape.
    pub fn registered_id(&self) -> Option<u32> {
        match self.kind {
            FieldKind::Registered { type_id } => Some(type_id),
            _ => None,
        }
    }

    /// Whether this field is a non-nullable numeric primitive.
    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, FieldKind::Registered { type_id }
            if type_ids::is_primitive(type_id))
            && !self.nullable
    }

    /// Whether this field is a nullable (boxed) numeric primitive.
    pub fn is_boxed_primitive(&self) -> bool {
        matches!(self.kind, FieldKind::Registered { type_id }
            if type_ids::is_primitive(type_id))
            && self.nullable
    }

    fn discriminant(&self) -> u32 {
        match &self.kind {
            FieldKind::Object => TAG_OBJECT,
            FieldKind::Map { .. } => TAG_MAP,
            FieldKind::Collection { .. } => TAG_COLLECTION,
            FieldKind::Array { .. } => TAG_ARRAY,
            FieldKind::Enum => TAG_ENUM,
            FieldKind::Registered { type_id } => TAG_REGISTERED_BASE + type_id,
        }
    }

    /// Deterministic rendering of the shape, used to order fields that only
    /// exist remotely and to tag reconciled descriptors.
    pub fn render_name(&self) -> String {
        match &self.kind {
            FieldKind::Object => "object".to_string(),
            FieldKind::Enum => "enum".to_string(),
            FieldKind::Registered { type_id } => type_id.to_string(),
            FieldKind::Collection { element } => format!("list<{}>", element.render_name()),
            FieldKind::Map { key, value } => {
                format!("map<{},{}>", key.render_name(), value.render_name())
            }
            FieldKind::Array {
                component,
                dimensions,
            } => format!("array<{},{}>", component.render_name(), dimensions),
        }
    }

    /// Write the type tree. Top-level field types pass `with_flags = false`
    /// because the enclosing field header already carries the flags.
    pub fn write(&self, w: &mut WireWriter, with_flags: bool) {
        let tag = self.discriminant();
        if with_flags {
            let mut packed = tag << 3;
            packed |= u32::from(self.monomorphic) << 2;
            packed |= u32::from(self.nullable) << 1;
            packed |= u32::from(self.tracking_ref);
            w.write_varuint32(packed);
        } else {
            w.write_varuint32(tag);
        }
        match &self.kind {
            FieldKind::Array {
                component,
                dimensions,
            } => {
                w.write_varuint32(*dimensions);
                component.write(w, true);
            }
            FieldKind::Collection { element } => element.write(w, true),
            FieldKind::Map { key, value } => {
                key.write(w, true);
                value.write(w, true);
            }
            FieldKind::Object | FieldKind::Enum | FieldKind::Registered { .. } => {}
        }
    }

    /// Read a nested type (flags embedded in the discriminant varint).
    pub fn read(r: &mut WireReader<'_>) -> Result<Self> {
        Self::read_nested(r, 0)
    }

    fn read_nested(r: &mut WireReader<'_>, depth: u32) -> Result<Self> {
        let packed = r.read_varuint32()?;
        let monomorphic = packed & 0b100 != 0;
        let nullable = packed & 0b010 != 0;
        let tracking_ref = packed & 0b001 != 0;
        Self::read_tagged(r, packed >> 3, monomorphic, nullable, tracking_ref, depth)
    }

    /// Read a type whose discriminant and flags were already consumed (the
    /// top-level case, where flags come from the field header).
    pub fn read_with_flags(
        r: &mut WireReader<'_>,
        tag: u32,
        monomorphic: bool,
        nullable: bool,
        tracking_ref: bool,
    ) -> Result<Self> {
        Self::read_tagged(r, tag, monomorphic, nullable, tracking_ref, 0)
    }

    fn read_tagged(
        r: &mut WireReader<'_>,
        tag: u32,
        monomorphic: bool,
        nullable: bool,
        tracking_ref: bool,
        depth: u32,
    ) -> Result<Self> {
        if depth > MAX_NESTING {
            return Err(MetaError::Decode {
                reason: format!("field type nesting deeper than {MAX_NESTING}"),
            });
        }
        match tag {
            TAG_OBJECT => Ok(Self::object(monomorphic, nullable, tracking_ref)),
            TAG_MAP => {
                let key = Self::read_nested(r, depth + 1)?;
                let value = Self::read_nested(r, depth + 1)?;
                Ok(Self::map(key, value, monomorphic, nullable, tracking_ref))
            }
            TAG_COLLECTION => {
                let element = Self::read_nested(r, depth + 1)?;
                Ok(Self::collection(
                    element,
                    monomorphic,
                    nullable,
                    tracking_ref,
                ))
            }
            TAG_ARRAY => {
                let dimensions = r.read_varuint32()?;
                let component = Self::read_nested(r, depth + 1)?;
                Ok(Self::array(
                    component,
                    dimensions,
                    monomorphic,
                    nullable,
                    tracking_ref,
                ))
            }
            TAG_ENUM => {
                // Flags other than nullability are fixed for enums.
                Ok(Self::enumeration(nullable))
            }
            registered => {
                let type_id = registered - TAG_REGISTERED_BASE;
                if type_id > type_ids::MAX_REGISTERED_ID {
                    return Err(MetaError::UnsupportedTypeTag { tag: registered });
                }
                Ok(Self::registered(
                    type_id,
                    monomorphic,
                    nullable,
                    tracking_ref,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::type_ids::{INT32, STRING};

    fn roundtrip_nested(ft: &FieldType) -> FieldType {
        let mut w = WireWriter::new();
        ft.write(&mut w, true);
        let bytes = w.into_bytes();
        let mut r = WireReader::new(&bytes);
        let back = FieldType::read(&mut r).unwrap();
        assert_eq!(r.remaining(), 0);
        back
    }

    #[test]
    fn test_roundtrip_registered() {
        let ft = FieldType::registered(INT32, true, false, false);
        assert_eq!(roundtrip_nested(&ft), ft);
    }

    #[test]
    fn test_roundtrip_object_flags() {
        for mono in [false, true] {
            for nullable in [false, true] {
                for tracking in [false, true] {
                    let ft = FieldType::object(mono, nullable, tracking);
                    assert_eq!(roundtrip_nested(&ft), ft);
                }
            }
        }
    }

    #[test]
    fn test_roundtrip_nested_generics() {
        // map<string, list<i32>>
        let ft = FieldType::map(
            FieldType::registered(STRING, true, true, false),
            FieldType::collection(
                FieldType::registered(INT32, true, true, false),
                true,
                true,
                false,
            ),
            false,
            true,
            true,
        );
        assert_eq!(roundtrip_nested(&ft), ft);
    }

    #[test]
    fn test_roundtrip_array() {
        let ft = FieldType::array(
            FieldType::registered(INT32, true, false, false),
            3,
            true,
            true,
            false,
        );
        assert_eq!(roundtrip_nested(&ft), ft);
    }

    #[test]
    fn test_roundtrip_enum() {
        let ft = FieldType::enumeration(true);
        let back = roundtrip_nested(&ft);
        assert_eq!(back, ft);
        assert!(back.monomorphic);
        assert!(!back.tracking_ref);
    }

    #[test]
    fn test_top_level_omits_flags() {
        let ft = FieldType::registered(INT32, true, false, true);
        let mut w = WireWriter::new();
        ft.write(&mut w, false);
        let bytes = w.into_bytes();
        let mut r = WireReader::new(&bytes);
        let tag = r.read_varuint32().unwrap();
        let back = FieldType::read_with_flags(&mut r, tag, true, false, true).unwrap();
        assert_eq!(back, ft);
    }

    #[test]
    fn test_oversized_registered_id_rejected() {
        let mut w = WireWriter::new();
        let tag = 5 + type_ids::MAX_REGISTERED_ID + 1;
        w.write_varuint32(tag << 3);
        let bytes = w.into_bytes();
        let mut r = WireReader::new(&bytes);
        assert!(matches!(
            FieldType::read(&mut r),
            Err(MetaError::UnsupportedTypeTag { .. })
        ));
    }

    #[test]
    fn test_runaway_nesting_rejected() {
        // A long chain of collection tags with flags; deeper than the bound.
        let mut w = WireWriter::new();
        for _ in 0..200 {
            w.write_varuint32(TAG_COLLECTION << 3);
        }
        w.write_varuint32(TAG_OBJECT << 3);
        let bytes = w.into_bytes();
        let mut r = WireReader::new(&bytes);
        assert!(matches!(
            FieldType::read(&mut r),
            Err(MetaError::Decode { .. })
        ));
    }

    #[test]
    fn test_primitive_classification() {
        assert!(FieldType::registered(INT32, true, false, false).is_primitive());
        assert!(FieldType::registered(INT32, true, true, false).is_boxed_primitive());
        assert!(!FieldType::registered(STRING, true, false, false).is_primitive());
        assert!(!FieldType::object(false, true, true).is_primitive());
    }

    #[test]
    fn test_render_name() {
        let ft = FieldType::map(
            FieldType::registered(STRING, true, true, false),
            FieldType::collection(FieldType::object(false, true, true), false, true, true),
            false,
            true,
            true,
        );
        assert_eq!(ft.render_name(), "map<12,list<object>>");
    }
}
