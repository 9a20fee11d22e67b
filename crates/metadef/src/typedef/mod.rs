// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema blobs: the encoded class definition and its identity.
//!
//! A [`ClassDef`] captures one type's shape -- class identity plus the
//! canonically-ordered field list -- together with its wire encoding and a
//! content-hash id. The id doubles as the dedup key: two processes that
//! build the same schema independently arrive at the same 64 bits, so a
//! schema only ever crosses the wire once per session.
//!
//! # Header layout
//!
//! The first 8 bytes of an encoded schema are a little-endian `u64`:
//!
//! ```text
//!  63                    14  13   12  11 10          0
//! +------------------------+----+----+--+-------------+
//! |  content hash (50 bit) | C  | M  |r |   size      |
//! +------------------------+----+----+--+-------------+
//! C = compressed flag   M = has-fields-meta flag   r = reserved
//! ```
//!
//! `size` holds the payload byte count inline; the escape value `0x7FF`
//! means a follow-up varint carries `size - 0x7FF`. Because the span is
//! always recoverable from the header alone, even a schema that fails to
//! parse can be skipped.

mod decoder;
mod encoder;
mod reconcile;

pub use decoder::decode_class_def;
pub use encoder::{build_class_def, build_class_def_from_field_infos};
pub use reconcile::{reconcile, TypeLayout};

use md5::{Digest, Md5};

use crate::buffer::{WireReader, WireWriter};
use crate::compress::MetaCompressor;
use crate::error::Result;
use crate::registry::TypeRegistry;
use crate::schema::FieldType;

/// Header bit: payload stored compressed.
pub const COMPRESS_META_FLAG: u64 = 0b1 << 13;
/// Header bit: schema carries per-field metadata.
pub const HAS_FIELDS_META_FLAG: u64 = 0b1 << 12;
/// Inline payload-size field (11 bits); the all-ones value escapes to a
/// follow-up varint.
pub const META_SIZE_MASK: u64 = 0b111_1111_1111;
/// Content-hash bits in the header.
pub const NUM_HASH_BITS: u32 = 50;

/// Class-group counts at or above this escape to a follow-up varint.
pub(crate) const NUM_CLASS_THRESHOLD: u32 = 0b1111;
/// Name byte-lengths at or above this escape to a follow-up varint.
pub(crate) const BIG_NAME_THRESHOLD: usize = 0b11_1111;
/// Field-name sizes at or above this escape to a follow-up varint.
pub(crate) const FIELD_NAME_SIZE_THRESHOLD: usize = 0b111;

/// Placeholder class name for registered ids with no local mapping.
pub const NONEXISTENT_TYPE_NAME: &str = "metadef.nonexistent.Unresolved";

/// Class identity as carried in a schema: fully-qualified name plus the
/// array/enum structure folded into the encoded type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassSpec {
    pub name: String,
    pub is_enum: bool,
    pub is_array: bool,
    pub dimensions: u32,
}

impl ClassSpec {
    /// Plain (non-enum, non-array) class.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_enum: false,
            is_array: false,
            dimensions: 0,
        }
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_enum: true,
            is_array: false,
            dimensions: 0,
        }
    }

    pub fn array(name: impl Into<String>, dimensions: u32) -> Self {
        Self {
            name: name.into(),
            is_enum: false,
            is_array: true,
            dimensions,
        }
    }

    /// Placeholder for a type the local process cannot resolve.
    pub fn nonexistent() -> Self {
        Self::named(NONEXISTENT_TYPE_NAME)
    }

    pub fn is_nonexistent(&self) -> bool {
        self.name == NONEXISTENT_TYPE_NAME
    }
}

/// One field of a schema. Identity is `(defining_class, field_name)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Class in the hierarchy that declares this field.
    pub defining_class: String,
    pub field_name: String,
    pub field_type: FieldType,
}

impl FieldInfo {
    pub fn new(
        defining_class: impl Into<String>,
        field_name: impl Into<String>,
        field_type: FieldType,
    ) -> Self {
        Self {
            defining_class: defining_class.into(),
            field_name: field_name.into(),
            field_type,
        }
    }

    /// `defining_class.field_name`, the reconciliation lookup key.
    pub fn identity(&self) -> String {
        format!("{}.{}", self.defining_class, self.field_name)
    }
}

/// An immutable, encoded class definition.
///
/// Built once per (type, configuration) pair and cached for the session;
/// freely shared across threads. `encoded` is canonical: re-encoding the
/// same fields reproduces it byte for byte, which is what makes `id` a
/// valid dedup key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub(crate) spec: ClassSpec,
    pub(crate) fields: Vec<FieldInfo>,
    pub(crate) has_fields_meta: bool,
    pub(crate) id: u64,
    pub(crate) encoded: Vec<u8>,
}

impl ClassDef {
    pub fn spec(&self) -> &ClassSpec {
        &self.spec
    }

    pub fn class_name(&self) -> &str {
        &self.spec.name
    }

    /// All fields, including those of parent classes, in canonical order.
    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    pub fn has_fields_meta(&self) -> bool {
        self.has_fields_meta
    }

    /// Content-derived schema id; equal across processes for equal schemas.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The canonical wire bytes, header included.
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    /// Append the encoded schema to `w`.
    pub fn write(&self, w: &mut WireWriter) {
        w.write_bytes(&self.encoded);
    }

    /// Decode a schema from `r`.
    pub fn read(
        r: &mut WireReader<'_>,
        registry: &TypeRegistry,
        compressor: &dyn MetaCompressor,
    ) -> Result<Self> {
        decode_class_def(r, registry, compressor)
    }

    /// Skip over an encoded schema without parsing its payload.
    pub fn skip(r: &mut WireReader<'_>) -> Result<()> {
        let header = r.read_u64_le()?;
        let mut size = (header & META_SIZE_MASK) as usize;
        if size == META_SIZE_MASK as usize {
            size += r.read_varuint32()? as usize;
        }
        r.skip(size)
    }

    /// Rebuild this definition with the root class renamed to `target`,
    /// keeping all field information.
    pub fn replace_root_class(
        &self,
        registry: &TypeRegistry,
        target: ClassSpec,
        compressor: &dyn MetaCompressor,
    ) -> Result<ClassDef> {
        let old_root = self.spec.name.clone();
        let fields = self
            .fields
            .iter()
            .map(|f| {
                if f.defining_class == old_root {
                    FieldInfo::new(target.name.clone(), f.field_name.clone(), f.field_type.clone())
                } else {
                    f.clone()
                }
            })
            .collect();
        build_class_def_from_field_infos(registry, target, fields, self.has_fields_meta, compressor)
    }
}

/// Derive the 50-bit content hash for a (possibly compressed) payload.
///
/// First 8 little-endian bytes of the MD5 digest, left-shifted into the
/// high bits of the header.
pub(crate) fn content_hash(payload: &[u8]) -> u64 {
    let digest = Md5::digest(payload);
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(raw) << (64 - NUM_HASH_BITS)
}

/// Assemble the 64-bit header and prepend it (plus the size escape varint)
/// to `body`.
pub(crate) fn prepend_header(
    body: &[u8],
    is_compressed: bool,
    has_fields_meta: bool,
) -> (u64, Vec<u8>) {
    let meta_size = body.len();
    let mut header = content_hash(body);
    if is_compressed {
        header |= COMPRESS_META_FLAG;
    }
    if has_fields_meta {
        header |= HAS_FIELDS_META_FLAG;
    }
    header |= (meta_size as u64).min(META_SIZE_MASK);
    let mut out = WireWriter::with_capacity(meta_size + 12);
    out.write_u64_le(header);
    if meta_size >= META_SIZE_MASK as usize {
        out.write_varuint32((meta_size - META_SIZE_MASK as usize) as u32);
    }
    out.write_bytes(body);
    (header, out.into_bytes())
}
