// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Well-known registered type ids.
//!
//! Both peers agree on these small integers out of band; they substitute for
//! full package/type names on the wire. User types occupy the id space from
//! [`FIRST_USER_ID`] upward, assigned by each peer's configuration.

/// bool
pub const BOOL: u32 = 1;
/// i8
pub const INT8: u32 = 2;
/// i16
pub const INT16: u32 = 3;
/// i32, fixed width
pub const INT32: u32 = 4;
/// i32, varint-compressed on the value wire
pub const VAR_INT32: u32 = 5;
/// i64, fixed width
pub const INT64: u32 = 6;
/// i64, varint-compressed on the value wire
pub const VAR_INT64: u32 = 7;
/// i64, small-long-as-i32 compressed on the value wire
pub const SLI_INT64: u32 = 8;
/// f16
pub const FLOAT16: u32 = 9;
/// f32
pub const FLOAT32: u32 = 10;
/// f64
pub const FLOAT64: u32 = 11;
/// UTF-8 string
pub const STRING: u32 = 12;
/// enum with registered variants
pub const ENUM: u32 = 13;
/// homogeneous list/sequence
pub const LIST: u32 = 21;
/// homogeneous set
pub const SET: u32 = 22;
/// key/value map
pub const MAP: u32 = 23;
/// raw byte buffer
pub const BINARY: u32 = 28;

/// First id available for user-registered types.
pub const FIRST_USER_ID: u32 = 64;

/// Largest registered id representable in a field-type discriminant.
///
/// Anything above this decodes as an unsupported tag rather than silently
/// aliasing another type.
pub const MAX_REGISTERED_ID: u32 = (1 << 20) - 1;

/// Whether `id` denotes a fixed-size numeric primitive.
pub const fn is_primitive(id: u32) -> bool {
    matches!(
        id,
        BOOL | INT8 | INT16 | INT32 | VAR_INT32 | INT64 | VAR_INT64 | SLI_INT64 | FLOAT16
            | FLOAT32 | FLOAT64
    )
}

/// Byte width of a primitive id (None for non-primitives).
pub const fn primitive_size(id: u32) -> Option<u32> {
    match id {
        BOOL | INT8 => Some(1),
        INT16 | FLOAT16 => Some(2),
        INT32 | VAR_INT32 | FLOAT32 => Some(4),
        INT64 | VAR_INT64 | SLI_INT64 | FLOAT64 => Some(8),
        _ => None,
    }
}

/// Whether `id` belongs to the 32-bit integer width class.
pub const fn is_int32_class(id: u32) -> bool {
    matches!(id, INT32 | VAR_INT32)
}

/// Whether `id` belongs to the 64-bit integer width class.
pub const fn is_int64_class(id: u32) -> bool {
    matches!(id, INT64 | VAR_INT64 | SLI_INT64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_classification() {
        assert!(is_primitive(BOOL));
        assert!(is_primitive(FLOAT64));
        assert!(!is_primitive(STRING));
        assert!(!is_primitive(LIST));
        assert!(!is_primitive(FIRST_USER_ID));
    }

    #[test]
    fn test_primitive_sizes() {
        assert_eq!(primitive_size(BOOL), Some(1));
        assert_eq!(primitive_size(INT16), Some(2));
        assert_eq!(primitive_size(INT32), Some(4));
        assert_eq!(primitive_size(VAR_INT64), Some(8));
        assert_eq!(primitive_size(STRING), None);
    }

    #[test]
    fn test_width_classes() {
        assert!(is_int32_class(VAR_INT32));
        assert!(!is_int32_class(INT64));
        assert!(is_int64_class(SLI_INT64));
        assert!(!is_int64_class(FLOAT64));
    }
}
