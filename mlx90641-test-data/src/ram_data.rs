// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

/// The number of 16-bit words of MLX90641 RAM, 0x0400 through 0x05BF.
///
/// This covers 192 pixels for each of the two subpages, along with 64 other addresses (most of
/// which are reserved).
pub const RAM_WORDS: usize = 0x05C0 - 0x0400;

const PIXEL_WORDS: usize = 0x0580 - 0x0400;

/// RAM from the datasheet's worked example.
///
/// Every pixel of both subpages has the same value.
pub fn mlx90641_datasheet_ram() -> [u16; RAM_WORDS] {
    let mut ram = [0u16; RAM_WORDS];
    ram[..PIXEL_WORDS].iter_mut().for_each(|pixel| *pixel = 0x03CC);
    let auxiliary = [
        // V_BE
        (0x0580, 0x4C54),
        // Compensation pixel, subpage 0
        (0x0588, 0xFF97),
        (0x058A, 0x2606),
        // V_PTAT
        (0x05A0, 0x06D8),
        // The worked example only gives one compensation pixel value, so it's used for both.
        (0x05A8, 0xFF97),
        // V_DD
        (0x05AA, 0xCB8A),
    ];
    for (address, value) in auxiliary.iter() {
        ram[usize::from(*address - 0x0400u16)] = *value;
    }
    ram
}
