// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

//! EEPROM access and calibration extraction.
//!
//! [`EepromImage`] is a raw dump of the sensor's EEPROM. Once it has been passed through
//! [`decode_image`][crate::hamming::decode_image], [`Mlx90641Calibration::from_eeprom`] unpacks it
//! into the coefficients used by [`calculations`][crate::calculations].
use core::convert::TryFrom;

use arrayvec::ArrayVec;
use bitvec::array::BitArray;
use bitvec::slice::BitSlice;

// Various floating point operations are not implemented in core, so we use libm to provide them as
// needed.
#[cfg_attr(feature = "std", allow(unused_imports))]
use num_traits::Float;

use crate::address::EepromAddress;
use crate::bitfield::{
    extract_dual, extract_raw_field, extract_single, scale_by_division, scale_by_multiplication,
    DualField, SingleField, WordField,
};
use crate::error::{Error, LibraryError};
use crate::expose_member;
use crate::register::{Resolution, Subpage};
use crate::transport::{FromTransport, Transport};
use crate::util::WORD_SIZE;
use crate::NUM_PIXELS;

/// The address of the first EEPROM word.
pub const EEPROM_BASE: u16 = EepromAddress::Base as u16;

/// The number of 16-bit words in the EEPROM.
pub const EEPROM_LENGTH: usize =
    (EepromAddress::End as usize) - (EepromAddress::Base as usize) + 1;

/// The number of corner temperatures (and temperature ranges) an MLX90641 has.
pub const NUM_CORNER_TEMPERATURES: usize = 8;

/// The temperature range the sensitivity calibration was taken in.
pub const BASIC_TEMPERATURE_RANGE: usize = 2;

/// The maximum number of broken pixels the calibration can describe.
pub const MAX_BROKEN_PIXELS: usize = 2;

/// Marks an unused entry in [`Mlx90641Calibration::broken_pixels`].
pub const NO_BROKEN_PIXEL: u16 = 0xFFFF;

const DEVICE_SELECT_MASK: u16 = 0x0040;

/// The number of pixels sharing one alpha scale.
const ALPHA_GROUP_SIZE: usize = 32;

const ALPHA_GROUPS: usize = NUM_PIXELS / ALPHA_GROUP_SIZE;

const ALPHA_SCALE_BIAS: u8 = 20;

// Not documented, but the row maximums are normalized against the largest 11-bit value.
const ALPHA_ROW_MAX_NORMALIZER: f32 = 2047.0;

type FlagSlice = BitSlice<usize>;
type FlagArray = BitArray<[usize; NUM_PIXELS / usize::BITS as usize]>;

const fn word(address: EepromAddress, start_bit: u8, width: u8) -> WordField {
    WordField::new(address as u16, start_bit, width)
}

/// An 11-bit signed value in a word of its own.
const fn signed_word(address: EepromAddress, scale_exponent: u8) -> SingleField {
    SingleField::new(word(address, 0, 11), scale_exponent, true)
}

/// A value split across two words, with the upper 11 bits first and the lower 5 bits second.
const fn split_word(upper: EepromAddress, lower: EepromAddress, signed: bool) -> DualField {
    DualField::new(word(upper, 0, 11), word(lower, 0, 5), 0, signed)
}

const K_VDD: SingleField = signed_word(EepromAddress::K_Vdd, 5);
const VDD_25: SingleField = signed_word(EepromAddress::Vdd25, 5);
const KV_PTAT: SingleField = signed_word(EepromAddress::KvPtat, 12);
const KT_PTAT: SingleField = signed_word(EepromAddress::KtPtat, 3);
const V_PTAT_25: DualField = split_word(EepromAddress::VPtat25, EepromAddress::VPtat25Low, false);
// The address map says 2^11, but the worked example uses 2^7.
const ALPHA_PTAT: SingleField =
    SingleField::new(word(EepromAddress::AlphaPtat, 0, 11), 7, false);
const GAIN: DualField = split_word(EepromAddress::Gain, EepromAddress::GainLow, true);
const TGC: SingleField = SingleField::new(
    word(EepromAddress::ThermalGradientCompensation, 0, 9),
    6,
    true,
);
const RESOLUTION: SingleField =
    SingleField::new(word(EepromAddress::ThermalGradientCompensation, 9, 2), 0, false);
const EMISSIVITY: SingleField =
    SingleField::new(word(EepromAddress::Emissivity, 0, 11), 9, false);
const KS_TA: SingleField = signed_word(EepromAddress::KsTa, 15);
const KS_TO_SCALE: WordField = word(EepromAddress::KsToScale, 0, 11);
const KS_TO: [EepromAddress; NUM_CORNER_TEMPERATURES] = [
    EepromAddress::KsTo0,
    EepromAddress::KsTo1,
    EepromAddress::KsTo2,
    EepromAddress::KsTo3,
    EepromAddress::KsTo4,
    EepromAddress::KsTo5,
    EepromAddress::KsTo6,
    EepromAddress::KsTo7,
];
const CORNER_TEMPERATURES: [EepromAddress; 3] = [
    EepromAddress::CornerTemperature5,
    EepromAddress::CornerTemperature6,
    EepromAddress::CornerTemperature7,
];
const FIXED_CORNER_TEMPERATURES: [i16; 5] = [-40, -20, 0, 80, 120];
const CP_ALPHA: WordField = word(EepromAddress::CompensationPixelAlpha, 0, 11);
const CP_ALPHA_SCALE: WordField = word(EepromAddress::CompensationPixelAlphaScale, 0, 11);
const CP_OFFSET: DualField = split_word(
    EepromAddress::CompensationPixelOffset,
    EepromAddress::CompensationPixelOffsetLow,
    true,
);
const OFFSET_SCALE: WordField = word(EepromAddress::OffsetScale, 5, 6);
const OFFSET_REFERENCE: DualField = split_word(
    EepromAddress::OffsetReference,
    EepromAddress::OffsetReferenceLow,
    true,
);

/// A value and its scale, packed into one word.
///
/// Both K<sub>V<sub>CP</sub></sub> and K<sub>Ta<sub>CP</sub></sub> use this layout.
struct ScaledField {
    value: SingleField,
    scale: WordField,
}

const CP_KTA: ScaledField = ScaledField {
    value: SingleField::signed(EepromAddress::CompensationPixelKta as u16, 0, 6),
    scale: word(EepromAddress::CompensationPixelKta, 6, 5),
};
const CP_KV: ScaledField = ScaledField {
    value: SingleField::signed(EepromAddress::CompensationPixelKv as u16, 0, 6),
    scale: word(EepromAddress::CompensationPixelKv, 6, 5),
};

/// The shared parts of a per-pixel coefficient: an average and two scales in the word after it.
struct PixelCoefficient {
    average: SingleField,
    scale1: WordField,
    scale2: WordField,
    start_bit: u8,
    width: u8,
}

const KTA: PixelCoefficient = PixelCoefficient {
    average: signed_word(EepromAddress::K_TaAverage, 0),
    scale1: word(EepromAddress::K_TaScale, 5, 5),
    scale2: word(EepromAddress::K_TaScale, 0, 5),
    start_bit: 5,
    width: 6,
};
const KV: PixelCoefficient = PixelCoefficient {
    average: signed_word(EepromAddress::K_VAverage, 0),
    scale1: word(EepromAddress::K_VScale, 5, 5),
    scale2: word(EepromAddress::K_VScale, 0, 5),
    start_bit: 0,
    width: 5,
};

/// The field for a pixel in one of the per-pixel regions of the EEPROM.
fn pixel_field(region: EepromAddress, pixel: usize, start_bit: u8, width: u8) -> WordField {
    // Pixel indices are always less than NUM_PIXELS, so this can't truncate.
    WordField::new(region as u16 + pixel as u16, start_bit, width)
}

fn small_exponent(raw: u32) -> Result<u8, LibraryError> {
    u8::try_from(raw).map_err(|_| LibraryError::InvalidData("Scale exponent is too large"))
}

fn narrow_i16(value: i32, message: &'static str) -> Result<i16, LibraryError> {
    i16::try_from(value).map_err(|_| LibraryError::InvalidData(message))
}

/// A copy of the MLX90641 EEPROM.
///
/// Each word is indexed by its offset from [`EEPROM_BASE`], and every address lookup is checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EepromImage {
    words: [u16; EEPROM_LENGTH],
}

impl EepromImage {
    pub fn from_words(words: [u16; EEPROM_LENGTH]) -> Self {
        Self { words }
    }

    /// Create an image from the big-endian bytes read off the bus.
    pub fn from_be_bytes(bytes: &[u8]) -> Result<Self, LibraryError> {
        if bytes.len() != EEPROM_LENGTH * WORD_SIZE {
            return Err(LibraryError::InvalidData(
                "EEPROM data is not the right length",
            ));
        }
        let mut words = [0u16; EEPROM_LENGTH];
        bytes
            .chunks_exact(WORD_SIZE)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .zip(words.iter_mut())
            .for_each(|(source, dest)| *dest = source);
        Ok(Self { words })
    }

    pub fn words(&self) -> &[u16; EEPROM_LENGTH] {
        &self.words
    }

    pub(crate) fn words_mut(&mut self) -> &mut [u16; EEPROM_LENGTH] {
        &mut self.words
    }

    /// Look up the word at an EEPROM address.
    pub fn word(&self, address: u16) -> Result<u16, LibraryError> {
        address
            .checked_sub(EEPROM_BASE)
            .and_then(|index| self.words.get(usize::from(index)))
            .copied()
            .ok_or(LibraryError::AddressOutOfRange(address))
    }

    /// Check that this EEPROM belongs to an MLX90641.
    pub fn device_selected(&self) -> Result<bool, LibraryError> {
        Ok(self.word(EepromAddress::DeviceSelect.into())? & DEVICE_SELECT_MASK != 0)
    }
}

impl<T: Transport> FromTransport<T> for EepromImage {
    /// Read the entire EEPROM in one request.
    fn from_transport(transport: &mut T, device: u8) -> Result<Self, Error<T::Error>> {
        let mut words = [0u16; EEPROM_LENGTH];
        transport
            .read(device, EEPROM_BASE, &mut words)
            .map_err(Error::Transport)?;
        Ok(Self::from_words(words))
    }
}

/// MLX90641 calibration coefficients.
///
/// This can only be created from an EEPROM image, and is read-only afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct Mlx90641Calibration {
    k_v_dd: i16,

    v_dd_25: i16,

    k_v_ptat: f32,

    k_t_ptat: f32,

    v_ptat_25: u16,

    alpha_ptat: f32,

    gain: i16,

    tgc: f32,

    k_s_ta: f32,

    emissivity: f32,

    resolution: Resolution,

    k_s_to: [f32; NUM_CORNER_TEMPERATURES],

    corner_temperatures: [i16; NUM_CORNER_TEMPERATURES],

    alpha_correction: [f32; NUM_CORNER_TEMPERATURES],

    alpha: [f32; NUM_PIXELS],

    offsets: [[i16; NUM_PIXELS]; 2],

    k_ta: [f32; NUM_PIXELS],

    k_v: [f32; NUM_PIXELS],

    cp_alpha: f32,

    cp_offset: i16,

    cp_k_v: f32,

    cp_k_ta: f32,

    failed_pixels: FlagArray,
}

impl Mlx90641Calibration {
    /// Extract the calibration from an EEPROM image.
    ///
    /// The image must already have been through the Hamming decoder, so that only the data bits
    /// are left in each word.
    pub fn from_eeprom(image: &EepromImage) -> Result<Self, LibraryError> {
        if !image.device_selected()? {
            return Err(LibraryError::Unusable(
                "EEPROM does not belong to an MLX90641",
            ));
        }
        let k_v_dd = scale_by_multiplication(extract_single(image, &K_VDD)?, K_VDD.scale_exponent);
        let v_dd_25 =
            scale_by_multiplication(extract_single(image, &VDD_25)?, VDD_25.scale_exponent);
        let k_v_ptat = scale_by_division(extract_single(image, &KV_PTAT)?, KV_PTAT.scale_exponent);
        let k_t_ptat = scale_by_division(extract_single(image, &KT_PTAT)?, KT_PTAT.scale_exponent);
        let alpha_ptat =
            scale_by_division(extract_single(image, &ALPHA_PTAT)?, ALPHA_PTAT.scale_exponent);
        let tgc = scale_by_division(extract_single(image, &TGC)?, TGC.scale_exponent);
        let k_s_ta = scale_by_division(extract_single(image, &KS_TA)?, KS_TA.scale_exponent);
        let emissivity =
            scale_by_division(extract_single(image, &EMISSIVITY)?, EMISSIVITY.scale_exponent);
        // Two bits, so always a valid resolution.
        let resolution = Resolution::from_raw(extract_single(image, &RESOLUTION)? as u16)?;
        let (k_s_to, corner_temperatures) = Self::temperature_ranges(image)?;
        let alpha_correction = alpha_correction_coefficients(&k_s_to, &corner_temperatures);
        let cp_alpha_scale = small_exponent(extract_raw_field(image, &CP_ALPHA_SCALE)?)?;
        let cp_alpha =
            scale_by_division(extract_raw_field(image, &CP_ALPHA)? as i32, cp_alpha_scale);
        let failed_pixels = Self::find_failed_pixels(image)?;
        Ok(Self {
            k_v_dd: narrow_i16(k_v_dd, "K_Vdd is out of range")?,
            v_dd_25: narrow_i16(v_dd_25, "Vdd_25 is out of range")?,
            k_v_ptat,
            k_t_ptat,
            // 16-bit unsigned value
            v_ptat_25: extract_dual(image, &V_PTAT_25)? as u16,
            alpha_ptat,
            gain: narrow_i16(extract_dual(image, &GAIN)?, "Gain is out of range")?,
            tgc,
            k_s_ta,
            emissivity,
            resolution,
            k_s_to,
            corner_temperatures,
            alpha_correction,
            alpha: Self::alpha_pixels(image)?,
            offsets: Self::offset_pixels(image)?,
            k_ta: Self::pixel_coefficients(image, &KTA)?,
            k_v: Self::pixel_coefficients(image, &KV)?,
            cp_alpha,
            cp_offset: narrow_i16(
                extract_dual(image, &CP_OFFSET)?,
                "Compensation pixel offset is out of range",
            )?,
            cp_k_v: Self::scaled_cp_value(image, &CP_KV)?,
            cp_k_ta: Self::scaled_cp_value(image, &CP_KTA)?,
            failed_pixels,
        })
    }

    fn scaled_cp_value(image: &EepromImage, field: &ScaledField) -> Result<f32, LibraryError> {
        let scale = small_exponent(extract_raw_field(image, &field.scale)?)?;
        Ok(scale_by_division(extract_single(image, &field.value)?, scale))
    }

    /// Extract the K<sub>s<sub>To</sub></sub> values and corner temperatures.
    #[allow(clippy::type_complexity)]
    fn temperature_ranges(
        image: &EepromImage,
    ) -> Result<
        (
            [f32; NUM_CORNER_TEMPERATURES],
            [i16; NUM_CORNER_TEMPERATURES],
        ),
        LibraryError,
    > {
        let scale = small_exponent(extract_raw_field(image, &KS_TO_SCALE)?)?;
        let mut k_s_to = [0f32; NUM_CORNER_TEMPERATURES];
        for (address, dest) in KS_TO.iter().zip(k_s_to.iter_mut()) {
            *dest = scale_by_division(extract_single(image, &signed_word(*address, 0))?, scale);
        }
        // The first five corner temperatures are fixed, while the last three are read from the
        // EEPROM.
        let mut corner_temperatures = [0i16; NUM_CORNER_TEMPERATURES];
        corner_temperatures[..FIXED_CORNER_TEMPERATURES.len()]
            .copy_from_slice(&FIXED_CORNER_TEMPERATURES);
        for (address, dest) in CORNER_TEMPERATURES
            .iter()
            .zip(corner_temperatures[FIXED_CORNER_TEMPERATURES.len()..].iter_mut())
        {
            // 11-bit unsigned values, so they can't be truncated.
            *dest = extract_raw_field(image, &word(*address, 0, 11))? as i16;
        }
        Ok((k_s_to, corner_temperatures))
    }

    fn alpha_pixels(image: &EepromImage) -> Result<[f32; NUM_PIXELS], LibraryError> {
        // Each scale word has the scale for two groups, the first group in the upper bits.
        let mut row_max_normalized = [0f32; ALPHA_GROUPS];
        for (group, dest) in row_max_normalized.iter_mut().enumerate() {
            let scale_address = EepromAddress::AlphaScaleStart as u16 + (group / 2) as u16;
            let start_bit = if group % 2 == 0 { 5 } else { 0 };
            let scale = extract_raw_field(image, &WordField::new(scale_address, start_bit, 5))?;
            // Five bits plus the bias still fits in a u8.
            let scale = scale as u8 + ALPHA_SCALE_BIAS;
            let row_max = extract_raw_field(
                image,
                &pixel_field(EepromAddress::AlphaRowMaxStart, group, 0, 11),
            )?;
            *dest = scale_by_division(row_max as i32, scale) / ALPHA_ROW_MAX_NORMALIZER;
        }
        let mut alpha = [0f32; NUM_PIXELS];
        for (pixel, dest) in alpha.iter_mut().enumerate() {
            let raw = extract_raw_field(
                image,
                &pixel_field(EepromAddress::PixelAlphaStart, pixel, 0, 11),
            )?;
            *dest = raw as f32 * row_max_normalized[pixel / ALPHA_GROUP_SIZE];
        }
        Ok(alpha)
    }

    fn offset_pixels(image: &EepromImage) -> Result<[[i16; NUM_PIXELS]; 2], LibraryError> {
        let scale = extract_raw_field(image, &OFFSET_SCALE)? as u8;
        let reference = extract_dual(image, &OFFSET_REFERENCE)?;
        let mut offsets = [[0i16; NUM_PIXELS]; 2];
        let regions = [
            EepromAddress::PixelOffsetSubpage0Start,
            EepromAddress::PixelOffsetSubpage1Start,
        ];
        for (region, subpage_offsets) in regions.iter().zip(offsets.iter_mut()) {
            for (pixel, dest) in subpage_offsets.iter_mut().enumerate() {
                let field = SingleField::new(pixel_field(*region, pixel, 0, 11), 0, true);
                let delta = scale_by_multiplication(extract_single(image, &field)?, scale);
                *dest = narrow_i16(
                    delta.saturating_add(reference),
                    "Pixel offset is out of range",
                )?;
            }
        }
        Ok(offsets)
    }

    /// Calculate K<sub>Ta</sub> or K<sub>V</sub> for every pixel.
    fn pixel_coefficients(
        image: &EepromImage,
        coefficient: &PixelCoefficient,
    ) -> Result<[f32; NUM_PIXELS], LibraryError> {
        let average = extract_single(image, &coefficient.average)? as f32;
        let scale1 = (extract_raw_field(image, &coefficient.scale1)? as f32).exp2();
        let scale2 = (extract_raw_field(image, &coefficient.scale2)? as f32).exp2();
        // Using ArrayVec to collect the fallible per-pixel results without double-initializing.
        let values: ArrayVec<f32, NUM_PIXELS> = (0..NUM_PIXELS)
            .map(|pixel| -> Result<f32, LibraryError> {
                let field = SingleField::new(
                    pixel_field(
                        EepromAddress::PixelConstantsStart,
                        pixel,
                        coefficient.start_bit,
                        coefficient.width,
                    ),
                    0,
                    true,
                );
                let raw = extract_single(image, &field)? as f32;
                Ok((raw * scale2 + average) / scale1)
            })
            .collect::<Result<_, LibraryError>>()?;
        values
            .into_inner()
            .map_err(|_| LibraryError::InvalidData("Missing pixel coefficients"))
    }

    /// Find the pixels with no calibration data.
    ///
    /// A pixel is considered broken if the raw values of its offset (subpage 0), sensitivity and
    /// K<sub>Ta</sub>/K<sub>V</sub> words are all zero.
    fn find_failed_pixels(image: &EepromImage) -> Result<FlagArray, LibraryError> {
        let mut failed_pixels = FlagArray::default();
        for pixel in 0..NUM_PIXELS {
            let regions = [
                EepromAddress::PixelOffsetSubpage0Start,
                EepromAddress::PixelAlphaStart,
                EepromAddress::PixelConstantsStart,
            ];
            let mut is_broken = true;
            for region in regions.iter() {
                is_broken &= extract_raw_field(image, &pixel_field(*region, pixel, 0, 11))? == 0;
            }
            failed_pixels.set(pixel, is_broken);
        }
        if failed_pixels.count_ones() > MAX_BROKEN_PIXELS {
            Err(LibraryError::Unusable("More than two broken pixels"))
        } else {
            Ok(failed_pixels)
        }
    }

    expose_member!(k_v_dd, i16);
    expose_member!(v_dd_25, i16);
    expose_member!(k_v_ptat, f32);
    expose_member!(k_t_ptat, f32);
    expose_member!(v_ptat_25, u16);
    expose_member!(alpha_ptat, f32);
    expose_member!(gain, i16);
    expose_member!(tgc, f32);
    expose_member!(k_s_ta, f32);
    expose_member!(emissivity, f32);
    expose_member!(resolution, Resolution);
    expose_member!(&k_s_to, [f32; NUM_CORNER_TEMPERATURES]);
    expose_member!(&corner_temperatures, [i16; NUM_CORNER_TEMPERATURES]);
    expose_member!(&alpha_correction, [f32; NUM_CORNER_TEMPERATURES]);
    expose_member!(&alpha, [f32; NUM_PIXELS]);
    expose_member!(&k_ta, [f32; NUM_PIXELS]);
    expose_member!(&k_v, [f32; NUM_PIXELS]);
    expose_member!(cp_alpha, f32);
    expose_member!(cp_offset, i16);
    expose_member!(cp_k_v, f32);
    expose_member!(cp_k_ta, f32);

    /// The offset of every pixel for the given subpage.
    pub fn offsets(&self, subpage: Subpage) -> &[i16; NUM_PIXELS] {
        match subpage {
            Subpage::Zero => &self.offsets[0],
            Subpage::One => &self.offsets[1],
        }
    }

    /// One flag per pixel, set if that pixel is broken.
    pub fn failed_pixels(&self) -> &FlagSlice {
        &self.failed_pixels
    }

    /// The indices of up to two broken pixels, with [`NO_BROKEN_PIXEL`] filling unused entries.
    pub fn broken_pixels(&self) -> [u16; MAX_BROKEN_PIXELS] {
        let mut broken = [NO_BROKEN_PIXEL; MAX_BROKEN_PIXELS];
        for (dest, index) in broken.iter_mut().zip(self.failed_pixels.iter_ones()) {
            *dest = index as u16;
        }
        broken
    }
}

/// Calculate the sensitivity correction for each temperature range.
///
/// The correction is 1 for the range the sensitivity was calibrated in, and each neighbouring
/// range is scaled by the K<sub>s<sub>To</sub></sub> over the temperature difference between them.
pub fn alpha_correction_coefficients(
    k_s_to: &[f32; NUM_CORNER_TEMPERATURES],
    corner_temperatures: &[i16; NUM_CORNER_TEMPERATURES],
) -> [f32; NUM_CORNER_TEMPERATURES] {
    let mut correction = [0f32; NUM_CORNER_TEMPERATURES];
    correction[BASIC_TEMPERATURE_RANGE] = 1.0;
    let span = |from: usize, to: usize| {
        f32::from(corner_temperatures[to]) - f32::from(corner_temperatures[from])
    };
    for range in (0..BASIC_TEMPERATURE_RANGE).rev() {
        correction[range] =
            correction[range + 1] / (1.0 + k_s_to[range] * span(range, range + 1));
    }
    for range in (BASIC_TEMPERATURE_RANGE + 1)..NUM_CORNER_TEMPERATURES {
        correction[range] =
            correction[range - 1] * (1.0 + k_s_to[range - 1] * span(range - 1, range));
    }
    correction
}

#[cfg(test)]
mod test {
    use float_cmp::{approx_eq, assert_approx_eq};
    use mlx90641_test_data::mlx90641_datasheet_eeprom;

    use crate::error::LibraryError;
    use crate::hamming::{decode_image, DecodeStatus};
    use crate::register::{Resolution, Subpage};
    use crate::test::{Operation, ScriptedError, ScriptedTransport};
    use crate::NUM_PIXELS;

    use super::*;

    fn datasheet_image() -> EepromImage {
        let mut image = EepromImage::from_be_bytes(&mlx90641_datasheet_eeprom()).unwrap();
        assert_eq!(decode_image(&mut image), DecodeStatus::Clean);
        image
    }

    fn datasheet_calibration() -> Mlx90641Calibration {
        Mlx90641Calibration::from_eeprom(&datasheet_image()).unwrap()
    }

    fn set_word(image: &mut EepromImage, address: u16, value: u16) {
        image.words_mut()[usize::from(address - EEPROM_BASE)] = value;
    }

    fn break_pixel(image: &mut EepromImage, pixel: u16) {
        set_word(image, 0x2440 + pixel, 0);
        set_word(image, 0x2500 + pixel, 0);
        set_word(image, 0x25C0 + pixel, 0);
    }

    #[test]
    fn image_word_lookup() {
        let image = datasheet_image();
        assert_eq!(image.word(0x2400), Ok(0));
        assert_eq!(image.word(0x2427), Ok(0x079E));
        assert_eq!(image.word(0x23FF), Err(LibraryError::AddressOutOfRange(0x23FF)));
        assert_eq!(image.word(0x2740), Err(LibraryError::AddressOutOfRange(0x2740)));
        assert!(image.word(0x273F).is_ok());
    }

    #[test]
    fn image_from_transport() {
        let mut transport = ScriptedTransport::datasheet();
        let image = EepromImage::from_transport(&mut transport, 0x33).unwrap();
        let expected = EepromImage::from_be_bytes(&mlx90641_datasheet_eeprom()).unwrap();
        assert_eq!(image, expected);
        assert_eq!(
            transport.operations(),
            &[Operation::Read {
                register: EEPROM_BASE,
                length: EEPROM_LENGTH
            }]
        );
    }

    #[test]
    fn image_from_transport_error() {
        let mut transport = ScriptedTransport::datasheet();
        transport.fail_read_at(EEPROM_BASE);
        let result = EepromImage::from_transport(&mut transport, 0x33);
        assert_eq!(result, Err(Error::Transport(ScriptedError::Injected(EEPROM_BASE))));
    }

    #[test]
    fn image_wrong_length() {
        let bytes = [0u8; 12];
        assert!(matches!(
            EepromImage::from_be_bytes(&bytes[..]),
            Err(LibraryError::InvalidData(_))
        ));
    }

    #[test]
    fn device_select() {
        let mut image = datasheet_image();
        assert_eq!(image.device_selected(), Ok(true));
        set_word(&mut image, 0x240A, 0x0000);
        assert_eq!(image.device_selected(), Ok(false));
        assert!(matches!(
            Mlx90641Calibration::from_eeprom(&image),
            Err(LibraryError::Unusable(_))
        ));
    }

    #[test]
    fn supply_voltage_constants() {
        let calibration = datasheet_calibration();
        assert_eq!(calibration.k_v_dd(), -3136);
        assert_eq!(calibration.v_dd_25(), -13568);
    }

    #[test]
    fn ptat_constants() {
        let calibration = datasheet_calibration();
        assert_approx_eq!(f32, calibration.k_v_ptat(), 0.005615234375);
        assert_approx_eq!(f32, calibration.k_t_ptat(), 42.75);
        assert_eq!(calibration.v_ptat_25(), 12280);
        assert_approx_eq!(f32, calibration.alpha_ptat(), 9.0);
    }

    #[test]
    fn gain_and_friends() {
        let calibration = datasheet_calibration();
        assert_eq!(calibration.gain(), 9972);
        assert_approx_eq!(f32, calibration.tgc(), 0.0);
        assert_approx_eq!(f32, calibration.emissivity(), 0.94921875);
        assert_eq!(calibration.resolution(), Resolution::Eighteen);
        assert_approx_eq!(f32, calibration.k_s_ta(), -0.002197265625);
    }

    #[test]
    fn gain_is_signed() {
        let mut image = datasheet_image();
        set_word(&mut image, 0x2424, 0x07FF);
        set_word(&mut image, 0x2425, 0x001E);
        assert_eq!(Mlx90641Calibration::from_eeprom(&image).unwrap().gain(), -2);
        set_word(&mut image, 0x2424, 0x0400);
        set_word(&mut image, 0x2425, 0x0000);
        assert_eq!(Mlx90641Calibration::from_eeprom(&image).unwrap().gain(), i16::MIN);
    }

    #[test]
    fn temperature_ranges() {
        let calibration = datasheet_calibration();
        for k_s_to in calibration.k_s_to().iter() {
            assert_approx_eq!(f32, *k_s_to, -0.0006999969482421875);
        }
        assert_eq!(
            calibration.corner_temperatures(),
            &[-40, -20, 0, 80, 120, 200, 400, 600]
        );
    }

    #[test]
    fn alpha_correction() {
        let calibration = datasheet_calibration();
        let expected = [
            1.0285990440162778,
            1.0141987201807532,
            1.0,
            0.944000244140625,
            0.9175683525390923,
            0.8661847488126142,
            0.7449194126560631,
            0.6406311495469417,
        ];
        for (actual, expected) in calibration.alpha_correction().iter().zip(expected.iter()) {
            assert_approx_eq!(f32, *actual, *expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn compensation_pixel() {
        let calibration = datasheet_calibration();
        assert_approx_eq!(f32, calibration.cp_k_ta(), 0.0023193359375);
        assert_approx_eq!(f32, calibration.cp_k_v(), 0.3125);
        assert_approx_eq!(
            f32,
            calibration.cp_alpha(),
            3.0195224098861217e-09,
            epsilon = 1e-15
        );
        assert_eq!(calibration.cp_offset(), -119);
    }

    #[test]
    fn alpha_pixels() {
        let calibration = datasheet_calibration();
        // The example data uses the same raw value for every pixel, but each group of 32 pixels
        // has its own scale.
        let expected_groups = [
            2.796296030282974e-07,
            3.2316893339157104e-07,
            3.4552067518234253e-07,
            3.466848284006119e-07,
            3.2759271562099457e-07,
            2.8777867555618286e-07,
        ];
        for (pixel, alpha) in calibration.alpha().iter().enumerate() {
            let expected = expected_groups[pixel / 32];
            assert!(
                approx_eq!(f32, *alpha, expected, epsilon = 1e-12),
                "alpha for pixel {} was {:e}, expected {:e}",
                pixel,
                alpha,
                expected
            );
        }
    }

    #[test]
    fn k_ta_and_k_v_pixels() {
        let calibration = datasheet_calibration();
        for (k_ta, k_v) in calibration.k_ta().iter().zip(calibration.k_v().iter()) {
            assert_approx_eq!(f32, *k_ta, 0.003101348876953125);
            assert_approx_eq!(f32, *k_v, 0.3251953125);
        }
    }

    #[test]
    fn offset_pixels() {
        let calibration = datasheet_calibration();
        assert_eq!(calibration.offsets(Subpage::Zero), &[-673i16; NUM_PIXELS]);
        assert_eq!(calibration.offsets(Subpage::One), &[-675i16; NUM_PIXELS]);
    }

    #[test]
    fn single_field_scaling() {
        // k_Vdd is sign_extend(raw, 11) * 2^5
        let mut image = datasheet_image();
        set_word(&mut image, 0x2427, 0x0400);
        set_word(&mut image, 0x2426, 0x03FF);
        let calibration = Mlx90641Calibration::from_eeprom(&image).unwrap();
        assert_eq!(calibration.k_v_dd(), -1024 * 32);
        assert_eq!(calibration.v_dd_25(), 1023 * 32);
    }

    #[test]
    fn offset_overflow() {
        let mut image = datasheet_image();
        // Set the offset scale to 2^20
        let scale_word = image.word(0x2410).unwrap();
        set_word(&mut image, 0x2410, (scale_word & 0x001F) | (20 << 5));
        assert!(matches!(
            Mlx90641Calibration::from_eeprom(&image),
            Err(LibraryError::InvalidData(_))
        ));
    }

    #[test]
    fn no_broken_pixels() {
        let calibration = datasheet_calibration();
        assert_eq!(
            calibration.broken_pixels(),
            [NO_BROKEN_PIXEL, NO_BROKEN_PIXEL]
        );
        assert!(calibration.failed_pixels().not_any());
    }

    #[test]
    fn two_broken_pixels() {
        let mut image = datasheet_image();
        break_pixel(&mut image, 17);
        break_pixel(&mut image, 130);
        let calibration = Mlx90641Calibration::from_eeprom(&image).unwrap();
        assert_eq!(calibration.broken_pixels(), [17, 130]);
        assert!(calibration.failed_pixels()[17]);
        assert!(calibration.failed_pixels()[130]);
        assert_eq!(calibration.failed_pixels().count_ones(), 2);
    }

    #[test]
    fn one_broken_pixel() {
        let mut image = datasheet_image();
        break_pixel(&mut image, 191);
        let calibration = Mlx90641Calibration::from_eeprom(&image).unwrap();
        assert_eq!(calibration.broken_pixels(), [191, NO_BROKEN_PIXEL]);
    }

    #[test]
    fn partially_zero_pixel_is_not_broken() {
        let mut image = datasheet_image();
        set_word(&mut image, 0x2440 + 3, 0);
        set_word(&mut image, 0x2500 + 3, 0);
        let calibration = Mlx90641Calibration::from_eeprom(&image).unwrap();
        assert_eq!(
            calibration.broken_pixels(),
            [NO_BROKEN_PIXEL, NO_BROKEN_PIXEL]
        );
    }

    #[test]
    fn three_broken_pixels() {
        let mut image = datasheet_image();
        break_pixel(&mut image, 0);
        break_pixel(&mut image, 50);
        break_pixel(&mut image, 100);
        assert!(matches!(
            Mlx90641Calibration::from_eeprom(&image),
            Err(LibraryError::Unusable(_))
        ));
    }

    #[test]
    fn alpha_correction_basic_range() {
        let k_s_to = [0.0; NUM_CORNER_TEMPERATURES];
        let corner_temperatures = [-40, -20, 0, 80, 120, 200, 400, 600];
        let correction = alpha_correction_coefficients(&k_s_to, &corner_temperatures);
        assert_eq!(correction, [1.0; NUM_CORNER_TEMPERATURES]);
    }
}
