// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Identifier decoder: the inverse of [`super::MetaStringEncoder`].
//!
//! Unpacks fixed-width character codes MSB-first, honoring the
//! strip-last-char marker in bit 0 of the packed stream, then reverses the
//! case transforms of the escape encodings.

use super::Encoding;
use crate::error::{MetaError, Result};

/// Decodes packed identifier bytes back into strings.
pub struct MetaStringDecoder {
    special_char1: char,
    special_char2: char,
}

impl MetaStringDecoder {
    pub const fn new(special_char1: char, special_char2: char) -> Self {
        Self {
            special_char1,
            special_char2,
        }
    }

    pub fn decode(&self, bytes: &[u8], encoding: Encoding) -> Result<String> {
        if bytes.is_empty() {
            return Ok(String::new());
        }
        match encoding {
            Encoding::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_string)
                .map_err(|e| MetaError::Decode {
                    reason: format!("invalid UTF-8 in identifier: {e}"),
                }),
            Encoding::LowerSpecial => self.decode_lower_special(bytes),
            Encoding::LowerUpperDigitSpecial => self.decode_lower_upper_digit_special(bytes),
            Encoding::FirstToLowerSpecial => {
                let mut decoded = self.decode_lower_special(bytes)?;
                // The 5-bit alphabet is pure ASCII, so slicing is safe.
                if !decoded.is_empty() {
                    decoded[..1].make_ascii_uppercase();
                }
                Ok(decoded)
            }
            Encoding::AllToLowerSpecial => {
                let escaped = self.decode_lower_special(bytes)?;
                let mut decoded = String::with_capacity(escaped.len());
                let mut upper_next = false;
                for c in escaped.chars() {
                    if upper_next {
                        decoded.push(c.to_ascii_uppercase());
                        upper_next = false;
                    } else if c == '|' {
                        upper_next = true;
                    } else {
                        decoded.push(c);
                    }
                }
                if upper_next {
                    return Err(MetaError::Decode {
                        reason: "dangling case-escape at end of identifier".into(),
                    });
                }
                Ok(decoded)
            }
        }
    }

    fn decode_lower_special(&self, bytes: &[u8]) -> Result<String> {
        let mut decoded = String::new();
        for value in unpack(bytes, 5) {
            decoded.push(lower_special_char(value)?);
        }
        Ok(decoded)
    }

    fn decode_lower_upper_digit_special(&self, bytes: &[u8]) -> Result<String> {
        let mut decoded = String::new();
        for value in unpack(bytes, 6) {
            decoded.push(self.lower_upper_digit_special_char(value)?);
        }
        Ok(decoded)
    }

    fn lower_upper_digit_special_char(&self, value: u8) -> Result<char> {
        match value {
            0..=25 => Ok((b'a' + value) as char),
            26..=51 => Ok((b'A' + value - 26) as char),
            52..=61 => Ok((b'0' + value - 52) as char),
            62 => Ok(self.special_char1),
            63 => Ok(self.special_char2),
            _ => Err(MetaError::Decode {
                reason: format!("value {value} outside 6-bit alphabet"),
            }),
        }
    }
}

fn lower_special_char(value: u8) -> Result<char> {
    match value {
        0..=25 => Ok((b'a' + value) as char),
        26 => Ok('.'),
        27 => Ok('_'),
        28 => Ok('$'),
        29 => Ok('|'),
        _ => Err(MetaError::Decode {
            reason: format!("value {value} outside 5-bit alphabet"),
        }),
    }
}

/// Extract fixed-width character codes starting at bit 1.
///
/// The strip marker in bit 0 drops the final slot that would otherwise fit
/// in the byte capacity.
fn unpack(bytes: &[u8], bits_per_char: usize) -> Vec<u8> {
    let total_bits = bytes.len() * 8;
    let strip_last = bytes[0] & 0x80 != 0;
    let mut values = Vec::with_capacity(total_bits / bits_per_char);
    let mut bit = 1usize;
    while bit + bits_per_char <= total_bits
        && !(strip_last && bit + 2 * bits_per_char > total_bits)
    {
        let mut value = 0u8;
        for i in 0..bits_per_char {
            let pos = bit + i;
            let set = (bytes[pos / 8] >> (7 - pos % 8)) & 1 != 0;
            value = (value << 1) | u8::from(set);
        }
        values.push(value);
        bit += bits_per_char;
    }
    values
}

#[cfg(test)]
mod tests {
    use super::super::MetaStringEncoder;
    use super::*;

    fn codec() -> (MetaStringEncoder, MetaStringDecoder) {
        (
            MetaStringEncoder::new('.', '_'),
            MetaStringDecoder::new('.', '_'),
        )
    }

    fn roundtrip(input: &str) {
        let (enc, dec) = codec();
        let ms = enc.encode(input).unwrap();
        let decoded = dec.decode(ms.bytes(), ms.encoding()).unwrap();
        assert_eq!(decoded, input, "encoding {:?}", ms.encoding());
    }

    #[test]
    fn test_roundtrip_lower_special() {
        roundtrip("my_field");
        roundtrip("org.example.demo$inner");
        roundtrip("a");
        roundtrip("abcdefghijklmnopqrstuvwxyz._$");
    }

    #[test]
    fn test_roundtrip_lower_upper_digit() {
        roundtrip("My_Field2");
        roundtrip("SCREAMING_CASE9");
        roundtrip("x0");
    }

    #[test]
    fn test_roundtrip_first_to_lower() {
        roundtrip("MyField");
        roundtrip("Point");
        roundtrip("Z");
    }

    #[test]
    fn test_roundtrip_all_to_lower() {
        roundtrip("helloWorld");
        roundtrip("someLongCamelIdentifier");
    }

    #[test]
    fn test_roundtrip_utf8() {
        roundtrip("名前");
        roundtrip("with-dash-and-ümlaut");
    }

    #[test]
    fn test_roundtrip_every_length() {
        // Lengths crossing every byte-boundary case of the 5-bit pack,
        // including those where the strip marker must fire.
        for len in 1..=24 {
            let s: String = std::iter::repeat('a')
                .take(len)
                .enumerate()
                .map(|(i, _)| (b'a' + (i % 26) as u8) as char)
                .collect();
            roundtrip(&s);
        }
    }

    #[test]
    fn test_roundtrip_every_length_6bit() {
        for len in 1..=24 {
            let s: String = (0..len)
                .map(|i| {
                    if i % 2 == 0 {
                        (b'A' + (i % 26) as u8) as char
                    } else {
                        (b'0' + (i % 10) as u8) as char
                    }
                })
                .collect();
            roundtrip(&s);
        }
    }

    #[test]
    fn test_decode_empty() {
        let (_, dec) = codec();
        assert_eq!(dec.decode(&[], Encoding::LowerSpecial).unwrap(), "");
    }

    #[test]
    fn test_decode_respects_special_chars() {
        // Type-name policy uses '$' and '_' as the 6-bit specials.
        let enc = MetaStringEncoder::new('$', '_');
        let dec = MetaStringDecoder::new('$', '_');
        let ms = enc
            .encode_as("Outer$Inner_2", Encoding::LowerUpperDigitSpecial)
            .unwrap();
        assert_eq!(
            dec.decode(ms.bytes(), ms.encoding()).unwrap(),
            "Outer$Inner_2"
        );
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let (_, dec) = codec();
        assert!(matches!(
            dec.decode(&[0xFF, 0xFE], Encoding::Utf8),
            Err(MetaError::Decode { .. })
        ));
    }
}
