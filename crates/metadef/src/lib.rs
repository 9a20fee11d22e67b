// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # metadef - compact class-metadata codec
//!
//! A self-describing binary codec for class metadata, built for
//! cross-language serialization engines that ship schemas alongside values.
//! It turns a type's shape -- declared fields, their types and structural
//! modifiers -- into a compact, versioned blob ([`ClassDef`]) and rebuilds
//! an equivalent schema on a peer that may hold a different (but
//! compatible) version of the type.
//!
//! ## Quick Start
//!
//! ```rust
//! use metadef::{
//!     build_class_def, reconcile, ClassDef, ClassSpec, DeflateCompressor, Descriptor,
//!     FieldType, GroupOptions, TypeLayout, TypeRegistry,
//! };
//! use metadef::type_ids::{INT32, STRING};
//! use metadef::buffer::WireReader;
//!
//! fn main() -> metadef::Result<()> {
//!     let registry = TypeRegistry::new();
//!     let layout = TypeLayout::new(
//!         ClassSpec::named("org.example.Point"),
//!         vec![
//!             Descriptor::new(
//!                 "org.example.Point",
//!                 "x",
//!                 "4",
//!                 FieldType::registered(INT32, true, false, false),
//!             ),
//!             Descriptor::new(
//!                 "org.example.Point",
//!                 "label",
//!                 "12",
//!                 FieldType::registered(STRING, true, true, false),
//!             ),
//!         ],
//!     );
//!
//!     let compressor = DeflateCompressor;
//!     let def = build_class_def(&registry, &layout, GroupOptions::default(), true, &compressor)?;
//!
//!     // On the receiving peer:
//!     let mut reader = WireReader::new(def.encoded());
//!     let remote = ClassDef::read(&mut reader, &registry, &compressor)?;
//!     let fields = reconcile(&remote, &layout)?;
//!     assert_eq!(fields.len(), 2);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                      Host framework                          |
//! |   (introspection, value codec, object-graph engine)          |
//! +--------------------------------------------------------------+
//! |                        typedef                               |
//! |   ClassDef model | encoder | decoder | reconciliation        |
//! +--------------------------------------------------------------+
//! |        schema          |          metastring                 |
//! |  FieldType, grouping   |  5/6-bit identifier encodings       |
//! +--------------------------------------------------------------+
//! |   buffer (varints, LE cursors)  |  compress (Deflate)        |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ClassDef`] | Encoded schema descriptor with a content-hash identity |
//! | [`FieldType`] | Recursive tagged description of one field's shape |
//! | [`MetaString`] | Identifier plus the compact encoding chosen for it |
//! | [`TypeRegistry`] | Per-peer registered-id tables and schema dedup |
//! | [`TypeLayout`] | Host-supplied local view of a type |
//!
//! ## Concurrency
//!
//! Everything here is a synchronous, CPU-bound transform over in-memory
//! buffers, safe to call from any number of threads. The only shared
//! mutable state -- name-encoding memo caches and the schema dedup table --
//! lives in concurrent maps with compute-if-absent semantics. [`ClassDef`]
//! values are immutable once built.

/// Wire primitives (bounds-checked cursors, varints).
pub mod buffer;
/// Pluggable metadata compression (Deflate reference implementation).
pub mod compress;
/// Error types shared across the codec.
pub mod error;
/// Compact identifier-string codec and per-kind encoding policies.
pub mod metastring;
/// Per-peer type registration and schema deduplication.
pub mod registry;
/// Field-shape model and deterministic field ordering.
pub mod schema;
/// Schema blob model, encoder, decoder and reconciliation.
pub mod typedef;

pub use compress::{DeflateCompressor, MetaCompressor};
pub use error::{MetaError, Result};
pub use metastring::{Encoding, MetaString, MetaStringDecoder, MetaStringEncoder};
pub use registry::{RegisteredType, TypeRegistry, DEFAULT_MAX_META_SIZE};
pub use schema::type_ids;
pub use schema::{Descriptor, DescriptorGrouper, FieldKind, FieldType, GroupOptions};
pub use typedef::{
    build_class_def, build_class_def_from_field_infos, decode_class_def, reconcile, ClassDef,
    ClassSpec, FieldInfo, TypeLayout,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        // Compile-time check that the public surface is reachable.
        let _ = Encoding::LowerSpecial;
        let _ = TypeRegistry::new();
        let _ = DeflateCompressor;
        let _ = GroupOptions::default();
        let _ = ClassSpec::named("org.example.Demo");
    }
}
