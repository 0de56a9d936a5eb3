// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

//! MLX90641 EEPROM Hamming code
//!
//! Every calibration word in the MLX90641 EEPROM carries eleven data bits protected by a (16, 11)
//! [Hamming code]: a (15, 11) code plus an overall parity bit, with all five check bits packed
//! into the top of the word. Single bit errors can be corrected, and double bit errors detected.
//! The first 16 words of the EEPROM are device configuration and are not covered.
//!
//! [Hamming code]: https://en.wikipedia.org/wiki/Hamming_code
//!
//! | Check | Stored in | Covers data bits        |
//! |-------|-----------|-------------------------|
//! | P0    | bit 11    | 0, 1, 3, 4, 6, 8, 10    |
//! | P1    | bit 12    | 0, 2, 3, 5, 6, 9, 10    |
//! | P2    | bit 13    | 1, 2, 3, 7, 8, 9, 10    |
//! | P3    | bit 14    | 4, 5, 6, 7, 8, 9, 10    |
//! | P4    | bit 15    | every other bit         |
//!
//! Recomputing each check over its data bits *and* its own stored bit gives a five bit syndrome.
//! A zero syndrome means the word is intact. With a single flipped bit the overall parity (P4)
//! is always set, and the remaining four bits identify the flipped position.

use crate::eeprom::{EepromImage, EEPROM_LENGTH};

/// The bits of a word holding data.
pub const DATA_MASK: u16 = 0x07FF;

/// The first word index covered by the Hamming code.
pub const FIRST_PROTECTED_WORD: usize = 16;

const CHECK_BITS: usize = 5;

/// Each check's coverage, including the bit the check itself is stored in.
const CHECK_MASKS: [u16; CHECK_BITS] = [
    0b0000_1101_0101_1011,
    0b0001_0110_0110_1101,
    0b0010_0111_1000_1110,
    0b0100_0111_1111_0000,
    0b1111_1111_1111_1111,
];

/// Map a syndrome (minus 16) to the bit position it identifies.
const SYNDROME_BIT: [u8; 16] = [15, 11, 12, 0, 13, 1, 2, 3, 14, 4, 5, 6, 7, 8, 9, 10];

/// The outcome of checking a word, or an entire image.
///
/// The variants are ordered by severity, so the result for an image is the maximum of the result
/// for each word.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub enum DecodeStatus {
    /// No errors.
    Clean,

    /// At least one single bit error was found and corrected.
    Corrected,

    /// At least one word had an error that could not be corrected.
    Uncorrectable,
}

impl Default for DecodeStatus {
    fn default() -> Self {
        Self::Clean
    }
}

fn syndrome(word: u16) -> u8 {
    CHECK_MASKS
        .iter()
        .enumerate()
        .fold(0u8, |syndrome, (index, mask)| {
            let parity = ((word & mask).count_ones() % 2) as u8;
            syndrome | (parity << index)
        })
}

/// Compute the check bits for an 11-bit value.
///
/// Any bits above the data bits are ignored.
pub fn encode_word(data: u16) -> u16 {
    let mut word = data & DATA_MASK;
    for (index, mask) in CHECK_MASKS.iter().enumerate() {
        // Each check bit is in its own mask, but it's still zero at this point.
        let parity = (word & mask).count_ones() % 2;
        word |= (parity as u16) << (DATA_MASK.count_ones() as usize + index);
    }
    word
}

/// Check (and if possible correct) a single word.
///
/// The returned value is only the data bits, with any correction applied. Uncorrectable words
/// have their data bits returned unmodified.
pub fn decode_word(word: u16) -> (u16, DecodeStatus) {
    match syndrome(word) {
        0 => (word & DATA_MASK, DecodeStatus::Clean),
        check @ 16..=31 => {
            let bit = SYNDROME_BIT[usize::from(check - 16)];
            let corrected = word ^ (1 << bit);
            (corrected & DATA_MASK, DecodeStatus::Corrected)
        }
        _ => (word & DATA_MASK, DecodeStatus::Uncorrectable),
    }
}

/// Check and correct every protected word in an image, in place.
///
/// Scanning continues past uncorrectable words so that every correctable word is still repaired.
/// The check bits are stripped from every protected word.
pub fn decode_image(image: &mut EepromImage) -> DecodeStatus {
    image.words_mut()[FIRST_PROTECTED_WORD..EEPROM_LENGTH]
        .iter_mut()
        .fold(DecodeStatus::Clean, |worst, word| {
            let (data, status) = decode_word(*word);
            *word = data;
            worst.max(status)
        })
}

#[cfg(test)]
mod test {
    use mlx90641_test_data::mlx90641_datasheet_eeprom;

    use crate::eeprom::{EepromImage, EEPROM_LENGTH};

    use super::{decode_image, decode_word, encode_word, DecodeStatus, DATA_MASK};

    fn protected_words() -> impl Iterator<Item = u16> {
        let image = EepromImage::from_be_bytes(&mlx90641_datasheet_eeprom()).unwrap();
        let words = *image.words();
        words.into_iter().skip(super::FIRST_PROTECTED_WORD)
    }

    #[test]
    fn encode_matches_example() {
        for word in protected_words() {
            assert_eq!(
                encode_word(word & DATA_MASK),
                word,
                "{:#06X} was not reproduced",
                word
            );
        }
    }

    #[test]
    fn no_errors() {
        for word in protected_words() {
            assert_eq!(
                decode_word(word),
                (word & DATA_MASK, DecodeStatus::Clean),
                "{:#06X} did not pass validation",
                word
            );
        }
    }

    #[test]
    fn one_error() {
        for word in protected_words() {
            for bit_index in 0..16 {
                let bad_word = word ^ (1 << bit_index);
                assert_eq!(
                    decode_word(bad_word),
                    (word & DATA_MASK, DecodeStatus::Corrected),
                    "Unable to correct {:#06X} to {:#06X}",
                    bad_word,
                    word
                );
            }
        }
    }

    #[test]
    fn two_errors() {
        for word in protected_words() {
            for bit_index1 in 0..16 {
                for bit_index2 in (bit_index1 + 1)..16 {
                    let bad_word = word ^ (1 << bit_index1) ^ (1 << bit_index2);
                    let (_, status) = decode_word(bad_word);
                    assert_eq!(
                        status,
                        DecodeStatus::Uncorrectable,
                        "{:#06X} (originally {:#06X}) passed validation unexpectedly",
                        bad_word,
                        word,
                    );
                }
            }
        }
    }

    #[test]
    fn every_data_value() {
        for data in 0..=DATA_MASK {
            let encoded = encode_word(data);
            assert_eq!(decode_word(encoded), (data, DecodeStatus::Clean));
            assert_eq!(
                decode_word(encoded ^ 0x0400),
                (data, DecodeStatus::Corrected)
            );
        }
    }

    #[test]
    fn image_clean() {
        let mut image = EepromImage::from_be_bytes(&mlx90641_datasheet_eeprom()).unwrap();
        let mut header = [0u16; 16];
        header.copy_from_slice(&image.words()[..16]);
        assert_eq!(decode_image(&mut image), DecodeStatus::Clean);
        // The header isn't touched
        assert_eq!(image.words()[..16], header[..]);
        assert!(image.words()[16..].iter().all(|word| word & !DATA_MASK == 0));
    }

    #[test]
    fn image_worst_status() {
        let mut words = *EepromImage::from_be_bytes(&mlx90641_datasheet_eeprom())
            .unwrap()
            .words();
        let original = words;
        words[100] ^= 0x0001;
        let mut corrected = EepromImage::from_words(words);
        assert_eq!(decode_image(&mut corrected), DecodeStatus::Corrected);
        assert_eq!(corrected.words()[100], original[100] & DATA_MASK);

        // A later correctable error is still fixed after an uncorrectable one.
        words[20] ^= 0x0011;
        words[EEPROM_LENGTH - 1] ^= 0x0100;
        let mut broken = EepromImage::from_words(words);
        assert_eq!(decode_image(&mut broken), DecodeStatus::Uncorrectable);
        assert_eq!(broken.words()[100], original[100] & DATA_MASK);
        assert_eq!(
            broken.words()[EEPROM_LENGTH - 1],
            original[EEPROM_LENGTH - 1] & DATA_MASK
        );
    }

    #[test]
    fn status_ordering() {
        assert!(DecodeStatus::Clean < DecodeStatus::Corrected);
        assert!(DecodeStatus::Corrected < DecodeStatus::Uncorrectable);
    }
}
