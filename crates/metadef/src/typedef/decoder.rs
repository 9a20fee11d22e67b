// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema decoder: canonical bytes -> class definition.
//!
//! Strict mirror of the encoder. The header is parsed first; the payload
//! span is sliced (and inflated when the compressed flag is set) before any
//! structural parsing, so a malformed payload never desynchronizes the
//! enclosing stream. Unknown registered ids resolve to a placeholder spec
//! instead of failing -- schema evolution must tolerate types the local
//! process has never seen.

use crate::buffer::{WireReader, WireWriter};
use crate::compress::MetaCompressor;
use crate::error::{MetaError, Result};
use crate::metastring::encoders::{
    FIELD_NAME_DECODER, FIELD_NAME_ENCODINGS, PACKAGE_DECODER, PKG_ENCODINGS, TYPE_NAME_DECODER,
    TYPE_NAME_ENCODINGS,
};
use crate::metastring::{Encoding, MetaStringDecoder};
use crate::registry::TypeRegistry;
use crate::schema::FieldType;
use crate::typedef::{
    ClassDef, ClassSpec, FieldInfo, BIG_NAME_THRESHOLD, COMPRESS_META_FLAG,
    FIELD_NAME_SIZE_THRESHOLD, HAS_FIELDS_META_FLAG, META_SIZE_MASK, NUM_CLASS_THRESHOLD,
};

/// Decode one schema from `r`.
pub fn decode_class_def(
    r: &mut WireReader<'_>,
    registry: &TypeRegistry,
    compressor: &dyn MetaCompressor,
) -> Result<ClassDef> {
    let header = r.read_u64_le()?;

    // Capture the canonical bytes as they sit on the wire, so a re-send of
    // this definition is byte-identical to what was received.
    let mut canonical = WireWriter::with_capacity(64);
    canonical.write_u64_le(header);

    let mut size = (header & META_SIZE_MASK) as usize;
    if size == META_SIZE_MASK as usize {
        let extra = r.read_varuint32()?;
        canonical.write_varuint32(extra);
        size += extra as usize;
    }
    if size > registry.max_meta_size() {
        return Err(MetaError::MetaSizeExceeded {
            size,
            max: registry.max_meta_size(),
        });
    }
    let body = r.read_bytes(size)?;
    canonical.write_bytes(body);

    let inflated;
    let payload: &[u8] = if header & COMPRESS_META_FLAG != 0 {
        inflated = compressor.decompress(body, registry.max_meta_size())?;
        &inflated
    } else {
        body
    };

    let mut pr = WireReader::new(payload);
    let num_classes = read_group_count(&mut pr)?;

    let mut spec: Option<ClassSpec> = None;
    let mut fields = Vec::new();
    for i in 0..num_classes {
        let group_header = pr.read_varuint32()?;
        let registered = group_header & 1 != 0;
        let num_fields = group_header >> 1;
        let group_spec = if registered {
            let type_id = pr.read_varuint32()?;
            registry.resolve_spec(type_id)
        } else {
            let package = read_name(&mut pr, &PACKAGE_DECODER, &PKG_ENCODINGS)?;
            let type_name = read_name(&mut pr, &TYPE_NAME_DECODER, &TYPE_NAME_ENCODINGS)?;
            crate::metastring::encoders::join_spec(&package, &type_name)
        };
        if i == 0 {
            spec = Some(group_spec.clone());
        }
        for _ in 0..num_fields {
            fields.push(read_field(&mut pr, &group_spec.name)?);
        }
    }
    if pr.remaining() != 0 {
        return Err(MetaError::Decode {
            reason: format!("{} trailing bytes after schema payload", pr.remaining()),
        });
    }
    // The group count is biased by one, so at least one group always exists.
    let spec = spec.ok_or_else(|| MetaError::Decode {
        reason: "schema with no class groups".into(),
    })?;
    Ok(ClassDef {
        spec,
        fields,
        has_fields_meta: header & HAS_FIELDS_META_FLAG != 0,
        id: header,
        encoded: canonical.into_bytes(),
    })
}

fn read_group_count(r: &mut WireReader<'_>) -> Result<u32> {
    let first = u32::from(r.read_u8()?);
    if first > NUM_CLASS_THRESHOLD {
        return Err(MetaError::Decode {
            reason: format!("invalid class-group count byte {first}"),
        });
    }
    let count = if first == NUM_CLASS_THRESHOLD {
        first + r.read_varuint32()?
    } else {
        first
    };
    Ok(count + 1)
}

/// Mirror of the encoder's name header: `6-bit size | 2-bit encoding`.
fn read_name(
    r: &mut WireReader<'_>,
    decoder: &MetaStringDecoder,
    table: &[Encoding],
) -> Result<String> {
    let header = usize::from(r.read_u8()?);
    let encoding = *table
        .get(header & 0b11)
        .ok_or_else(|| MetaError::Decode {
            reason: format!("invalid name encoding index {}", header & 0b11),
        })?;
    let mut size = header >> 2;
    if size == BIG_NAME_THRESHOLD {
        size += r.read_varuint32()? as usize;
    }
    decoder.decode(r.read_bytes(size)?, encoding)
}

fn read_field(r: &mut WireReader<'_>, defining_class: &str) -> Result<FieldInfo> {
    let header = r.read_u8()?;
    let encoding_index = usize::from((header >> 3) & 0b11);
    if encoding_index == 3 {
        return Err(MetaError::TagIdNotSupported);
    }
    let mut size = usize::from(header >> 5);
    if size == FIELD_NAME_SIZE_THRESHOLD {
        size += r.read_varuint32()? as usize;
    }
    size += 1;
    let encoding = FIELD_NAME_ENCODINGS[encoding_index];
    let field_name = FIELD_NAME_DECODER.decode(r.read_bytes(size)?, encoding)?;

    let monomorphic = header & 0b100 != 0;
    let nullable = header & 0b010 != 0;
    let tracking_ref = header & 0b001 != 0;
    let tag = r.read_varuint32()?;
    let field_type = FieldType::read_with_flags(r, tag, monomorphic, nullable, tracking_ref)?;
    Ok(FieldInfo::new(defining_class, field_name, field_type))
}
