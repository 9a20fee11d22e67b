// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-identifier-kind encoding policy.
//!
//! Package names, type names and field names each restrict which encodings
//! are legal on the wire (two header bits select among at most four), use
//! their own special-character pair, and memoize results for the process
//! lifetime. The caches are concurrent: two threads encoding the same
//! identifier both succeed and converge on the same entry; a doubly-computed
//! miss is idempotent, merely wasted work.
//!
//! This module also owns the type-name mangling that folds array dimensions
//! and enum-ness into the encoded name, so a [`ClassSpec`] survives the trip
//! through a plain (package, type name) pair.

use std::sync::OnceLock;

use dashmap::DashMap;

use super::{Encoding, MetaString, MetaStringDecoder, MetaStringEncoder};
use crate::error::{MetaError, Result};
use crate::typedef::ClassSpec;

/// Encoder for package/namespace segments.
pub const PACKAGE_ENCODER: MetaStringEncoder = MetaStringEncoder::new('.', '_');
/// Decoder for package/namespace segments.
pub const PACKAGE_DECODER: MetaStringDecoder = MetaStringDecoder::new('.', '_');
/// Encoder for type names.
pub const TYPE_NAME_ENCODER: MetaStringEncoder = MetaStringEncoder::new('$', '_');
/// Decoder for type names.
pub const TYPE_NAME_DECODER: MetaStringDecoder = MetaStringDecoder::new('$', '_');
/// Encoder for field names.
pub const FIELD_NAME_ENCODER: MetaStringEncoder = MetaStringEncoder::new('$', '_');
/// Decoder for field names.
pub const FIELD_NAME_DECODER: MetaStringDecoder = MetaStringDecoder::new('$', '_');

/// Legal package-name encodings, in wire-tag order.
pub const PKG_ENCODINGS: [Encoding; 3] = [
    Encoding::Utf8,
    Encoding::AllToLowerSpecial,
    Encoding::LowerUpperDigitSpecial,
];

/// Legal type-name encodings, in wire-tag order.
pub const TYPE_NAME_ENCODINGS: [Encoding; 4] = [
    Encoding::Utf8,
    Encoding::LowerUpperDigitSpecial,
    Encoding::FirstToLowerSpecial,
    Encoding::AllToLowerSpecial,
];

/// Legal field-name encodings, in wire-tag order.
///
/// Index 3 is reserved for the tag-id shortcut, which is not supported.
pub const FIELD_NAME_ENCODINGS: [Encoding; 3] = [
    Encoding::Utf8,
    Encoding::LowerUpperDigitSpecial,
    Encoding::AllToLowerSpecial,
];

/// One leading marker per array dimension in a mangled type name.
pub const ARRAY_PREFIX: char = '1';
/// Marker for enum types in a mangled type name.
pub const ENUM_PREFIX: char = '2';

fn package_cache() -> &'static DashMap<String, MetaString> {
    static CACHE: OnceLock<DashMap<String, MetaString>> = OnceLock::new();
    CACHE.get_or_init(DashMap::new)
}

fn type_name_cache() -> &'static DashMap<String, MetaString> {
    static CACHE: OnceLock<DashMap<String, MetaString>> = OnceLock::new();
    CACHE.get_or_init(DashMap::new)
}

fn field_name_cache() -> &'static DashMap<String, MetaString> {
    static CACHE: OnceLock<DashMap<String, MetaString>> = OnceLock::new();
    CACHE.get_or_init(DashMap::new)
}

fn encode_cached(
    cache: &DashMap<String, MetaString>,
    encoder: &MetaStringEncoder,
    allowed: &[Encoding],
    input: &str,
) -> Result<MetaString> {
    if let Some(hit) = cache.get(input) {
        return Ok(hit.clone());
    }
    let encoded = encoder.encode_with(input, allowed)?;
    cache.insert(input.to_string(), encoded.clone());
    Ok(encoded)
}

/// Encode a package name, memoized for the process lifetime.
pub fn encode_package(pkg: &str) -> Result<MetaString> {
    encode_cached(package_cache(), &PACKAGE_ENCODER, &PKG_ENCODINGS, pkg)
}

/// Encode a type name, memoized for the process lifetime.
pub fn encode_type_name(type_name: &str) -> Result<MetaString> {
    encode_cached(
        type_name_cache(),
        &TYPE_NAME_ENCODER,
        &TYPE_NAME_ENCODINGS,
        type_name,
    )
}

/// Encode a field name, memoized for the process lifetime.
pub fn encode_field_name(field_name: &str) -> Result<MetaString> {
    encode_cached(
        field_name_cache(),
        &FIELD_NAME_ENCODER,
        &FIELD_NAME_ENCODINGS,
        field_name,
    )
}

/// Position of `encoding` within a per-kind table (the 2-bit header value).
pub fn encoding_index(table: &[Encoding], encoding: Encoding) -> Result<u8> {
    table
        .iter()
        .position(|e| *e == encoding)
        .map(|i| i as u8)
        .ok_or_else(|| MetaError::Precondition {
            reason: format!("encoding {encoding:?} not legal for this identifier kind"),
        })
}

/// Split a [`ClassSpec`] into the (package, mangled type name) pair that goes
/// on the wire.
///
/// Array dimensions become leading [`ARRAY_PREFIX`] markers and enums get an
/// [`ENUM_PREFIX`] marker, so the receiving side can rebuild the spec without
/// extra header bits.
pub fn split_spec(spec: &ClassSpec) -> (String, String) {
    let (package, simple) = match spec.name.rfind('.') {
        Some(dot) => (spec.name[..dot].to_string(), &spec.name[dot + 1..]),
        None => (String::new(), spec.name.as_str()),
    };
    let mut mangled = String::with_capacity(simple.len() + spec.dimensions as usize + 1);
    if spec.is_array {
        for _ in 0..spec.dimensions {
            mangled.push(ARRAY_PREFIX);
        }
    }
    if spec.is_enum {
        mangled.push(ENUM_PREFIX);
    }
    mangled.push_str(simple);
    (package, mangled)
}

/// Rebuild a [`ClassSpec`] from a decoded (package, mangled type name) pair.
pub fn join_spec(package: &str, mangled: &str) -> ClassSpec {
    let mut rest = mangled;
    let mut dimensions = 0u32;
    while rest.starts_with(ARRAY_PREFIX) {
        dimensions += 1;
        rest = &rest[1..];
    }
    let is_array = dimensions > 0;
    let is_enum = rest.starts_with(ENUM_PREFIX);
    if is_enum {
        rest = &rest[1..];
    }
    let name = if package.is_empty() {
        rest.to_string()
    } else {
        format!("{package}.{rest}")
    };
    ClassSpec {
        name,
        is_enum,
        is_array,
        dimensions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_policy_excludes_first_to_lower() {
        // "Com" would pick FirstToLowerSpecial unrestricted; packages must
        // fall back to another legal encoding.
        let ms = encode_package("Com").unwrap();
        assert_ne!(ms.encoding(), Encoding::FirstToLowerSpecial);
        assert!(PKG_ENCODINGS.contains(&ms.encoding()));
    }

    #[test]
    fn test_type_name_policy_picks_first_to_lower() {
        let ms = encode_type_name("Point").unwrap();
        assert_eq!(ms.encoding(), Encoding::FirstToLowerSpecial);
    }

    #[test]
    fn test_field_name_policy_excludes_lower_special() {
        let ms = encode_field_name("my_field").unwrap();
        assert!(FIELD_NAME_ENCODINGS.contains(&ms.encoding()));
        assert_ne!(ms.encoding(), Encoding::LowerSpecial);
    }

    #[test]
    fn test_cache_converges() {
        let a = encode_field_name("cached_name").unwrap();
        let b = encode_field_name("cached_name").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_encoding_index() {
        assert_eq!(
            encoding_index(&FIELD_NAME_ENCODINGS, Encoding::Utf8).unwrap(),
            0
        );
        assert_eq!(
            encoding_index(&FIELD_NAME_ENCODINGS, Encoding::AllToLowerSpecial).unwrap(),
            2
        );
        assert!(encoding_index(&FIELD_NAME_ENCODINGS, Encoding::LowerSpecial).is_err());
    }

    #[test]
    fn test_split_join_plain_type() {
        let spec = ClassSpec::named("org.example.Point");
        let (pkg, mangled) = split_spec(&spec);
        assert_eq!(pkg, "org.example");
        assert_eq!(mangled, "Point");
        assert_eq!(join_spec(&pkg, &mangled), spec);
    }

    #[test]
    fn test_split_join_enum() {
        let spec = ClassSpec::enumeration("org.example.Color");
        let (pkg, mangled) = split_spec(&spec);
        assert_eq!(mangled, "2Color");
        let back = join_spec(&pkg, &mangled);
        assert!(back.is_enum);
        assert_eq!(back.name, "org.example.Color");
    }

    #[test]
    fn test_split_join_array() {
        let spec = ClassSpec::array("org.example.Point", 2);
        let (pkg, mangled) = split_spec(&spec);
        assert_eq!(mangled, "11Point");
        let back = join_spec(&pkg, &mangled);
        assert!(back.is_array);
        assert_eq!(back.dimensions, 2);
        assert_eq!(back.name, "org.example.Point");
    }

    #[test]
    fn test_split_join_no_package() {
        let spec = ClassSpec::named("Bare");
        let (pkg, mangled) = split_spec(&spec);
        assert_eq!(pkg, "");
        assert_eq!(join_spec(&pkg, &mangled), spec);
    }
}
