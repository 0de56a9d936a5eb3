// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

/// The number of 16-bit words in the MLX90641 EEPROM.
pub const EEPROM_WORDS: usize = 0x2740 - 0x2400;

/// The size of the MLX90641 EEPROM in bytes.
pub const EEPROM_LENGTH: usize = EEPROM_WORDS * 2;

const NUM_PIXELS: usize = 16 * 12;

/// Example MLX90641 EEPROM data from the datasheet.
// Each line is 16 bytes. The first two lines are device configuration, and only the device select
// bit (0x0040 in word 10) matters here. The next six lines are the shared calibration data.
const MLX90641_EEPROM_HEADER: &[u8] = b"\
    \x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\
    \x00\x00\x00\x00\x00\x40\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\
    \x00\x00\xb7\xe8\xd0\x16\x00\x00\x00\x00\xc2\xfd\x1a\x43\xca\x9a\
    \x51\x64\x01\x8c\x01\x8c\x01\x8c\x9c\xb1\x95\x6c\xa5\xcc\x7d\xd1\
    \x6d\x7f\x3c\xd4\x27\xb8\x19\xe6\xf1\x37\x78\x14\x26\x58\xef\x9e\
    \x91\x7f\xf0\x18\xe1\x56\x48\x17\x1c\x80\x23\x3e\xc8\x26\xcf\xfc\
    \xa0\x09\xbb\x53\xf1\x94\xfc\x00\x78\x14\xed\x22\xed\x22\xed\x22\
    \xed\x22\xed\x22\x80\xc8\xed\x22\x41\x90\xed\x22\xda\x58\xed\x22";

/// Create a buffer with the example MLX90641 EEPROM data, as big-endian bytes.
pub fn mlx90641_datasheet_eeprom() -> [u8; EEPROM_LENGTH] {
    let offset_0 = b"\xf8\x49";
    let sensitivity = b"\xff\xff";
    let k_ta_with_k_v = b"\xb8\xc0";
    // The datasheet only gives subpage 0, so this is a slightly different value with its check
    // bits recomputed.
    let offset_1 = b"\xd8\x47";
    // The header is followed by offsets for subpage 0 for each pixel, then the sensitivity for
    // each pixel, then a combined K_ta and K_v for each pixel, then offsets for subpage 1.
    let mut eeprom_data = [0u8; EEPROM_LENGTH];
    eeprom_data[..MLX90641_EEPROM_HEADER.len()].copy_from_slice(MLX90641_EEPROM_HEADER);
    let mut offset = MLX90641_EEPROM_HEADER.len();
    let pixel_data_length = NUM_PIXELS * 2;
    for single_pixel_data in [offset_0, sensitivity, k_ta_with_k_v, offset_1] {
        eeprom_data[offset..(offset + pixel_data_length)]
            .iter_mut()
            .zip(single_pixel_data.iter().copied().cycle())
            .for_each(|(dest, src)| *dest = src);
        offset += pixel_data_length;
    }
    eeprom_data
}
