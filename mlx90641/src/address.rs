// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Named locations in the MLX90641 memory map.
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::address_enum_ops;

/// Significant EEPROM addresses for the MLX90641.
///
/// Values that span two words are named for the word holding the most significant bits.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
#[allow(non_camel_case_types)]
pub enum EepromAddress {
    /// The start of the EEPROM address range.
    ///
    /// The first 16 words are device configuration and are not covered by the Hamming code.
    Base = 0x2400,

    /// Bit 6 is set on a valid MLX90641 EEPROM.
    DeviceSelect = 0x240A,

    /// The first word covered by the Hamming code. Bits 5 through 10 are the offset scaling
    /// exponent.
    OffsetScale = 0x2410,

    /// The reference offset is split across two words.
    OffsetReference = 0x2411,

    OffsetReferenceLow = 0x2412,

    K_TaAverage = 0x2415,

    K_TaScale = 0x2416,

    K_VAverage = 0x2417,

    K_VScale = 0x2418,

    /// Three words, each holding the scale for two groups of 32 pixels.
    AlphaScaleStart = 0x2419,

    /// Six words, one for each group of 32 pixels.
    AlphaRowMaxStart = 0x241C,

    KsTa = 0x2422,

    Emissivity = 0x2423,

    Gain = 0x2424,

    GainLow = 0x2425,

    Vdd25 = 0x2426,

    K_Vdd = 0x2427,

    VPtat25 = 0x2428,

    VPtat25Low = 0x2429,

    KtPtat = 0x242A,

    KvPtat = 0x242B,

    AlphaPtat = 0x242C,

    CompensationPixelAlpha = 0x242D,

    CompensationPixelAlphaScale = 0x242E,

    CompensationPixelOffset = 0x242F,

    CompensationPixelOffsetLow = 0x2430,

    CompensationPixelKta = 0x2431,

    CompensationPixelKv = 0x2432,

    /// Thermal gradient compensation, with the calibration resolution in bits 9 and 10.
    ThermalGradientCompensation = 0x2433,

    KsToScale = 0x2434,

    KsTo0 = 0x2435,

    KsTo1 = 0x2436,

    KsTo2 = 0x2437,

    KsTo3 = 0x2438,

    KsTo4 = 0x2439,

    CornerTemperature5 = 0x243A,

    KsTo5 = 0x243B,

    CornerTemperature6 = 0x243C,

    KsTo6 = 0x243D,

    CornerTemperature7 = 0x243E,

    KsTo7 = 0x243F,

    PixelOffsetSubpage0Start = 0x2440,

    PixelAlphaStart = 0x2500,

    /// Kta in bits 5 through 10, Kv in bits 0 through 4.
    PixelConstantsStart = 0x25C0,

    PixelOffsetSubpage1Start = 0x2680,

    /// The last valid address in the MLX90641 EEPROM.
    End = 0x273F,
}

address_enum_ops!(EepromAddress);

/// Significant RAM addresses for the MLX90641.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum RamAddress {
    /// The start of RAM in the MLX90641 address space. This is also the start of the pixel
    /// addresses, with the two subpages interleaved in blocks of 32 words.
    Base = 0x0400,

    /// Labelled V<sub>BE</sub> and Ta<sub>V<sub>BE</sub></sub> in the datasheet. This is also the
    /// start of the auxiliary block shared by both subpages.
    AmbientTemperatureVoltageBe = 0x0580,

    /// The compensation pixel. Both subpages share this location.
    CompensationPixel = 0x0588,

    /// The current (in the temporal sense, not electrical) gain.
    Gain = 0x058A,

    /// Ambient temperature voltage, labelled T<sub>a<sub>PTAT</sub></sub> in the datasheet.
    AmbientTemperatureVoltage = 0x05A0,

    /// The pixel supply voltage, labelled V<sub>DD<sub>pix</sub></sub> in the datasheet.
    PixelSupplyVoltage = 0x05AA,

    /// The last valid RAM address for the MLX90641.
    End = 0x05BF,
}

address_enum_ops!(RamAddress);
