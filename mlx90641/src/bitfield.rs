// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Field descriptors and the helpers for pulling scaled values out of EEPROM words.
//!
//! Most calibration values are packed into a few bits of one 16-bit word, some are split across
//! two words, and nearly all of them are scaled by a power of two. The descriptors here describe
//! where a value lives and how to interpret it, and are only ever declared as constants.

use num_traits::Float;

use crate::eeprom::EepromImage;
use crate::error::LibraryError;

/// The location of a bit field within a single EEPROM word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WordField {
    /// The EEPROM address of the word.
    pub address: u16,

    /// The index of the least significant bit of the field.
    pub start_bit: u8,

    /// The number of bits in the field.
    pub width: u8,
}

impl WordField {
    pub const fn new(address: u16, start_bit: u8, width: u8) -> Self {
        Self {
            address,
            start_bit,
            width,
        }
    }

    fn mask(&self) -> u32 {
        if self.width >= 32 {
            u32::MAX
        } else {
            (1u32 << self.width) - 1
        }
    }
}

/// A value stored in one word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SingleField {
    pub field: WordField,

    /// The power of two the value is scaled by. Whether it's a multiplier or a divisor depends on
    /// the value.
    pub scale_exponent: u8,

    /// Whether the field is a two's complement value.
    pub signed: bool,
}

impl SingleField {
    pub const fn new(field: WordField, scale_exponent: u8, signed: bool) -> Self {
        Self {
            field,
            scale_exponent,
            signed,
        }
    }

    /// An unscaled, signed field.
    pub const fn signed(address: u16, start_bit: u8, width: u8) -> Self {
        Self::new(WordField::new(address, start_bit, width), 0, true)
    }

    /// An unscaled, unsigned field.
    pub const fn unsigned(address: u16, start_bit: u8, width: u8) -> Self {
        Self::new(WordField::new(address, start_bit, width), 0, false)
    }
}

/// A value split across two words, with the upper bits in `upper`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DualField {
    pub upper: WordField,
    pub lower: WordField,
    pub scale_exponent: u8,
    pub signed: bool,
}

impl DualField {
    pub const fn new(upper: WordField, lower: WordField, scale_exponent: u8, signed: bool) -> Self {
        Self {
            upper,
            lower,
            scale_exponent,
            signed,
        }
    }

    /// The combined width of both halves.
    pub fn width(&self) -> u8 {
        self.upper.width.saturating_add(self.lower.width)
    }
}

/// Pull the unsigned value of a field out of an EEPROM image.
pub fn extract_raw_field(image: &EepromImage, field: &WordField) -> Result<u32, LibraryError> {
    let word = image.word(field.address)?;
    Ok((u32::from(word) >> field.start_bit) & field.mask())
}

/// Interpret the lowest `width` bits of `value` as a two's complement number.
pub fn apply_sign_extension(value: u32, width: u8) -> i32 {
    match width {
        0 => 0,
        32..=u8::MAX => value as i32,
        _ => {
            let value = i64::from(value & ((1u32 << width) - 1));
            let modulus = 1i64 << width;
            if value >= modulus >> 1 {
                (value - modulus) as i32
            } else {
                value as i32
            }
        }
    }
}

/// Extract a single-word field, sign extending it if needed.
///
/// The scale exponent is *not* applied, as some values are scaled up and some down.
pub fn extract_single(image: &EepromImage, field: &SingleField) -> Result<i32, LibraryError> {
    let raw = extract_raw_field(image, &field.field)?;
    Ok(if field.signed {
        apply_sign_extension(raw, field.field.width)
    } else {
        raw as i32
    })
}

/// Extract a field split across two words as `(upper << lower.width) | lower`.
pub fn extract_dual(image: &EepromImage, field: &DualField) -> Result<i32, LibraryError> {
    let width = field.width();
    if width > 32 {
        return Err(LibraryError::FieldTooWide(width));
    }
    let upper = extract_raw_field(image, &field.upper)?;
    let lower = extract_raw_field(image, &field.lower)?;
    let combined = (u64::from(upper) << field.lower.width) | u64::from(lower);
    let combined = combined as u32;
    Ok(if field.signed {
        apply_sign_extension(combined, width)
    } else {
        combined as i32
    })
}

/// `raw / 2^exponent`
pub fn scale_by_division(raw: i32, exponent: u8) -> f32 {
    raw as f32 / f32::from(exponent).exp2()
}

/// `raw * 2^exponent`, saturating instead of overflowing.
pub fn scale_by_multiplication(raw: i32, exponent: u8) -> i32 {
    if raw == 0 {
        return 0;
    }
    match 1i32.checked_shl(u32::from(exponent)) {
        Some(factor) if exponent < 31 => raw.saturating_mul(factor),
        _ if raw > 0 => i32::MAX,
        _ => i32::MIN,
    }
}
