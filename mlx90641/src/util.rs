// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

/// The word size of the sensor in terms of 8-bit bytes.
pub(crate) const WORD_SIZE: usize = (u16::BITS / u8::BITS) as usize;

/// Define addition and subtraction for address enumerations.
#[doc(hidden)]
#[macro_export]
macro_rules! address_enum_ops {
    ($typ:ident) => {
        impl ::core::ops::Add<$typ> for $typ {
            type Output = u16;
            fn add(self, other: $typ) -> Self::Output {
                self as u16 + other as u16
            }
        }
        impl ::core::ops::Sub<$typ> for $typ {
            type Output = u16;
            fn sub(self, other: $typ) -> Self::Output {
                self as u16 - other as u16
            }
        }
        impl ::core::ops::Add<u16> for $typ {
            type Output = u16;
            fn add(self, other: u16) -> Self::Output {
                self as u16 + other
            }
        }
    };
}

/// Generate a public getter returning a copy (or a reference, with `&`) of a field.
#[doc(hidden)]
#[macro_export]
macro_rules! expose_member {
    ($name:ident, $typ:ty) => {
        pub fn $name(&self) -> $typ {
            self.$name
        }
    };
    (&$name:ident, $typ:ty) => {
        pub fn $name(&self) -> &$typ {
            &self.$name
        }
    };
}

/// Check if the n-th bit is set.
///
/// Bits are 0-indexed, from the LSB.
pub(crate) fn is_bit_set<B>(value: B, index: usize) -> bool
where
    B: num_traits::PrimInt + num_traits::Unsigned,
{
    (value & (B::one() << index)) > B::zero()
}

/// Interpret a 16-bit word as a two's-complement value.
pub(crate) fn signed_word(word: u16) -> i16 {
    i16::from_ne_bytes(word.to_ne_bytes())
}

#[cfg(test)]
mod test {
    #[test]
    fn is_bit_set() {
        for n in 0..16 {
            let value: u16 = 1 << n;
            assert!(
                super::is_bit_set(value, n),
                "is_bit_set was incorrect for bit {}",
                n
            );
            assert!(!super::is_bit_set(!value, n));
        }
    }

    #[test]
    fn signed_word() {
        assert_eq!(super::signed_word(0xFFFF), -1);
        assert_eq!(super::signed_word(0xFF97), -105);
        assert_eq!(super::signed_word(0x7FFF), i16::MAX);
        assert_eq!(super::signed_word(0x03CC), 972);
    }
}
