// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Converting raw frames into temperatures.
//!
//! The functions here are stateless: they take the calibration and a [`FrameBuffer`], and write
//! one value per pixel into the provided buffer. [`Mlx90641Sensor`][crate::Mlx90641Sensor] is the
//! usual way of calling them.
//!
//! The conversion follows the MLX90641 datasheet. The supply voltage and ambient temperature are
//! calculated first, then each pixel is compensated for gain, offset and the thermal gradient
//! before being run through the radiometric model twice: once with the sensitivity of the first
//! temperature range to estimate which range the object is in, and again with that range's
//! sensitivity.
// Various floating point operations are not implemented in core, so we use libm to provide them as
// needed.
#[cfg_attr(feature = "std", allow(unused_imports))]
use num_traits::Float;

use crate::eeprom::{Mlx90641Calibration, NO_BROKEN_PIXEL, NUM_CORNER_TEMPERATURES};
use crate::error::LibraryError;
use crate::frame::FrameBuffer;
use crate::register::ControlRegister;
use crate::util::signed_word;
use crate::{NUM_PIXELS, WIDTH};

/// Constant needed a few times for the final pixel temperature calculations.
const KELVINS_TO_CELSIUS: f32 = 273.15;

/// The supply voltage the sensor was calibrated at.
const V_DD_0: f32 = 3.3;

/// The ambient temperature the sensor was calibrated at.
const T_A_0: f32 = 25.0;

/// The temperature range used for the first estimate of each pixel's temperature.
const FIRST_PASS_RANGE: usize = 1;

/// The ratio between the resolution the calibration was taken at and the current resolution.
fn resolution_correction(calibration: &Mlx90641Calibration, control: ControlRegister) -> f32 {
    let calibrated = f32::from(calibration.resolution().as_raw());
    let configured = f32::from(control.resolution().as_raw());
    calibrated.exp2() / configured.exp2()
}

/// Calculate the supply voltage (in volts) the frame was measured at.
pub fn supply_voltage(calibration: &Mlx90641Calibration, frame: &FrameBuffer) -> f32 {
    let correction = resolution_correction(calibration, frame.control());
    let raw = f32::from(frame.supply_voltage()) * correction;
    (raw - f32::from(calibration.v_dd_25())) / f32::from(calibration.k_v_dd()) + V_DD_0
}

fn v_ptat_art(calibration: &Mlx90641Calibration, t_a_ptat: i16, t_a_v_be: i16) -> f32 {
    let t_a_ptat = f32::from(t_a_ptat);
    t_a_ptat / (t_a_ptat * calibration.alpha_ptat() + f32::from(t_a_v_be)) * 18f32.exp2()
}

/// Calculate the ambient temperature (in degrees Celsius) of the sensor itself.
///
/// `v_dd` is the value from [`supply_voltage`] for the same frame.
pub fn ambient_temperature(
    calibration: &Mlx90641Calibration,
    frame: &FrameBuffer,
    v_dd: f32,
) -> f32 {
    // Labelled V_PTAT in the formulas, but T_a_PTAT in the memory map.
    let v_ptat_art = v_ptat_art(
        calibration,
        frame.ambient_voltage_ptat(),
        frame.ambient_voltage_be(),
    );
    let numerator = v_ptat_art / (1f32 + calibration.k_v_ptat() * (v_dd - V_DD_0))
        - f32::from(calibration.v_ptat_25());
    numerator / calibration.k_t_ptat() + T_A_0
}

/// Values that're common to all pixels when calculating raw IR values.
#[derive(Debug, PartialEq)]
struct CommonIrData {
    gain: f32,
    v_dd: f32,
    t_a: f32,
    /// The compensation pixel's IR signal, already scaled by the TGC.
    compensation_ir: f32,
}

impl CommonIrData {
    fn new(calibration: &Mlx90641Calibration, frame: &FrameBuffer) -> Result<Self, LibraryError> {
        let raw_gain = frame.gain();
        if raw_gain == 0 {
            return Err(LibraryError::InvalidData("The gain counter is zero"));
        }
        let v_dd = supply_voltage(calibration, frame);
        let t_a = ambient_temperature(calibration, frame, v_dd);
        let gain = f32::from(calibration.gain()) / f32::from(raw_gain);
        let compensation_ir = f32::from(frame.compensation_pixel()) * gain
            - f32::from(calibration.cp_offset())
                * (1f32 + calibration.cp_k_ta() * (t_a - T_A_0))
                * (1f32 + calibration.cp_k_v() * (v_dd - V_DD_0));
        Ok(Self {
            gain,
            v_dd,
            t_a,
            compensation_ir: calibration.tgc() * compensation_ir,
        })
    }
}

/// The per-pixel calculations to get a raw measurement of infrared radiation.
///
/// Emissivity is not applied here.
fn per_pixel_v_ir(pixel_data: i16, common: &CommonIrData, offset: i16, k_ta: f32, k_v: f32) -> f32 {
    f32::from(pixel_data) * common.gain
        - f32::from(offset)
            * (1f32 + k_ta * (common.t_a - T_A_0))
            * (1f32 + k_v * (common.v_dd - V_DD_0))
        - common.compensation_ir
}

/// T<sub>a-r</sub>, the ambient and reflected temperatures combined through the emissivity.
///
/// Both temperatures are in degrees Celsius, but the result is in Kelvin⁴.
fn t_ar(t_a: f32, t_r: f32, emissivity: f32) -> f32 {
    let t_a_k4 = (t_a + KELVINS_TO_CELSIUS).powi(4);
    let t_r_k4 = (t_r + KELVINS_TO_CELSIUS).powi(4);
    t_r_k4 - ((t_r_k4 - t_a_k4) / emissivity)
}

/// The first estimate of a pixel's temperature.
fn per_pixel_temperature(v_ir: f32, alpha: f32, t_ar: f32, k_s_to: f32) -> f32 {
    let s_x = k_s_to * (alpha.powi(3) * v_ir + alpha.powi(4) * t_ar).powf(0.25);
    let t_o_root = (v_ir / (alpha * (1f32 - k_s_to * KELVINS_TO_CELSIUS) + s_x) + t_ar).powf(0.25);
    t_o_root - KELVINS_TO_CELSIUS
}

/// Find the temperature range a temperature falls into.
///
/// Anything below the second corner temperature is in the first range.
fn temperature_range(corner_temperatures: &[i16; NUM_CORNER_TEMPERATURES], t_o: f32) -> usize {
    (1..NUM_CORNER_TEMPERATURES)
        .rev()
        .find(|range| t_o >= f32::from(corner_temperatures[*range]))
        .unwrap_or(0)
}

/// Recalculate a pixel's temperature using the sensitivity for its temperature range.
fn ranged_temperature(
    calibration: &Mlx90641Calibration,
    v_ir: f32,
    alpha: f32,
    t_ar: f32,
    estimate: f32,
) -> f32 {
    let range = temperature_range(calibration.corner_temperatures(), estimate);
    let k_s_to = calibration.k_s_to()[range];
    let corner_temperature = f32::from(calibration.corner_temperatures()[range]);
    let sensitivity = alpha
        * calibration.alpha_correction()[range]
        * (1f32 + k_s_to * (estimate - corner_temperature));
    (v_ir / sensitivity + t_ar).powf(0.25) - KELVINS_TO_CELSIUS
}

/// Calculate the temperature of every pixel, returning the ambient temperature.
///
/// `reflected_temperature` is the temperature of the surroundings reflected by the object. When
/// nothing better is known, the ambient temperature is a reasonable value. Broken pixels are not
/// corrected; see [`correct_broken_pixels`].
pub fn calculate_to(
    calibration: &Mlx90641Calibration,
    frame: &FrameBuffer,
    emissivity: f32,
    reflected_temperature: f32,
    destination: &mut [f32; NUM_PIXELS],
) -> Result<f32, LibraryError> {
    if emissivity.is_nan() || emissivity <= 0f32 {
        return Err(LibraryError::InvalidData("Emissivity must be positive"));
    }
    let common = CommonIrData::new(calibration, frame)?;
    let t_ar = t_ar(common.t_a, reflected_temperature, emissivity);
    let alpha_compensation_pixel = calibration.tgc() * calibration.cp_alpha();
    let alpha_coefficient = 1f32 + calibration.k_s_ta() * (common.t_a - T_A_0);
    let k_s_to = calibration.k_s_to()[FIRST_PASS_RANGE];
    destination
        .iter_mut()
        .zip(frame.pixels())
        .zip(calibration.offsets(frame.subpage()))
        .zip(calibration.k_ta())
        .zip(calibration.k_v())
        .zip(calibration.alpha())
        .for_each(|(((((output, pixel), offset), k_ta), k_v), alpha)| {
            let v_ir = per_pixel_v_ir(signed_word(*pixel), &common, *offset, *k_ta, *k_v);
            let v_ir = v_ir / emissivity;
            let compensated_alpha = (alpha - alpha_compensation_pixel) * alpha_coefficient;
            let estimate = per_pixel_temperature(v_ir, compensated_alpha, t_ar, k_s_to);
            *output = ranged_temperature(calibration, v_ir, compensated_alpha, t_ar, estimate);
        });
    Ok(common.t_a)
}

/// Generate a "raw" thermal image, returning the ambient temperature.
///
/// Each value is the compensated IR signal divided by the pixel's sensitivity. These aren't
/// temperatures, but they're quicker to calculate and good enough when only an image is needed.
pub fn calculate_image(
    calibration: &Mlx90641Calibration,
    frame: &FrameBuffer,
    destination: &mut [f32; NUM_PIXELS],
) -> Result<f32, LibraryError> {
    let common = CommonIrData::new(calibration, frame)?;
    let alpha_compensation_pixel = calibration.tgc() * calibration.cp_alpha();
    destination
        .iter_mut()
        .zip(frame.pixels())
        .zip(calibration.offsets(frame.subpage()))
        .zip(calibration.k_ta())
        .zip(calibration.k_v())
        .zip(calibration.alpha())
        .for_each(|(((((output, pixel), offset), k_ta), k_v), alpha)| {
            let v_ir = per_pixel_v_ir(signed_word(*pixel), &common, *offset, *k_ta, *k_v);
            *output = v_ir / (alpha - alpha_compensation_pixel);
        });
    Ok(common.t_a)
}

/// Estimate a pixel's value from its neighbours in the same row.
///
/// The pixels on either edge copy their only neighbour, and the pixels next to them average their
/// two neighbours. Everywhere else the value is extrapolated from whichever side is smoother.
///
/// # Panics
/// If `index` is not a valid pixel index.
pub fn interpolate_pixel(values: &[f32; NUM_PIXELS], index: usize) -> f32 {
    match index % WIDTH {
        0 => values[index + 1],
        1 => (values[index - 1] + values[index + 1]) / 2f32,
        column if column == WIDTH - 2 => (values[index - 1] + values[index + 1]) / 2f32,
        column if column == WIDTH - 1 => values[index - 1],
        _ => {
            let right = values[index + 1] - values[index + 2];
            let left = values[index - 1] - values[index - 2];
            if right.abs() > left.abs() {
                values[index - 1] + left
            } else {
                values[index + 1] + right
            }
        }
    }
}

/// Replace the values of the broken pixels listed in the calibration.
pub fn correct_broken_pixels(calibration: &Mlx90641Calibration, values: &mut [f32; NUM_PIXELS]) {
    calibration
        .broken_pixels()
        .iter()
        .take_while(|index| **index != NO_BROKEN_PIXEL)
        .map(|index| usize::from(*index))
        .filter(|index| *index < NUM_PIXELS)
        .for_each(|index| values[index] = interpolate_pixel(values, index));
}

#[cfg(test)]
mod test {
    use float_cmp::{approx_eq, assert_approx_eq};
    use mlx90641_test_data::{mlx90641_datasheet_eeprom, mlx90641_datasheet_ram};

    use crate::address::RamAddress;
    use crate::eeprom::{EepromImage, Mlx90641Calibration, EEPROM_BASE};
    use crate::error::LibraryError;
    use crate::frame::{FrameBuffer, TAIL_WORDS};
    use crate::hamming::decode_image;
    use crate::register::Subpage;
    use crate::{NUM_PIXELS, WIDTH};

    // Expected values were worked out in double precision from the datasheet example, so the f32
    // results are only compared approximately.
    const DATASHEET_V_DD: f32 = 3.2559948979591833;
    const DATASHEET_T_A: f32 = 42.09770245283625;

    fn datasheet_image() -> EepromImage {
        let mut image = EepromImage::from_be_bytes(&mlx90641_datasheet_eeprom()).unwrap();
        decode_image(&mut image);
        image
    }

    fn datasheet_calibration() -> Mlx90641Calibration {
        Mlx90641Calibration::from_eeprom(&datasheet_image()).unwrap()
    }

    fn datasheet_frame(control: u16, subpage: Subpage) -> FrameBuffer {
        let ram = mlx90641_datasheet_ram();
        let mut pixels = [0u16; NUM_PIXELS];
        pixels.copy_from_slice(&ram[..NUM_PIXELS]);
        let tail_start = usize::from(RamAddress::AmbientTemperatureVoltageBe - RamAddress::Base);
        let mut tail = [0u16; TAIL_WORDS];
        tail.copy_from_slice(&ram[tail_start..(tail_start + TAIL_WORDS)]);
        FrameBuffer::from_parts(&pixels, &tail, control, subpage)
    }

    #[test]
    fn supply_voltage() {
        let clb = datasheet_calibration();
        let frame = datasheet_frame(0x0901, Subpage::Zero);
        assert_approx_eq!(
            f32,
            super::supply_voltage(&clb, &frame),
            DATASHEET_V_DD,
            epsilon = 0.00001
        );
    }

    #[test]
    fn v_ptat_art() {
        let clb = datasheet_calibration();
        let frame = datasheet_frame(0x0901, Subpage::Zero);
        let v_ptat_art = super::v_ptat_art(
            &clb,
            frame.ambient_voltage_ptat(),
            frame.ambient_voltage_be(),
        );
        // 1752 / (1752 * 9 + 19540) * 2^18
        assert_approx_eq!(f32, v_ptat_art, 13007.711793361277, epsilon = 0.01);
    }

    #[test]
    fn ambient_temperature() {
        let clb = datasheet_calibration();
        let frame = datasheet_frame(0x0901, Subpage::Zero);
        let v_dd = super::supply_voltage(&clb, &frame);
        assert_approx_eq!(
            f32,
            super::ambient_temperature(&clb, &frame, v_dd),
            DATASHEET_T_A,
            epsilon = 0.001
        );
    }

    #[test]
    fn resolution_mismatch() {
        // The calibration was taken at 18 bits, this frame was measured at 19.
        let clb = datasheet_calibration();
        let frame = datasheet_frame(0x0D01, Subpage::Zero);
        assert_approx_eq!(f32, super::resolution_correction(&clb, frame.control()), 0.5);
        let v_dd = super::supply_voltage(&clb, &frame);
        assert_approx_eq!(f32, v_dd, 1.1147321, epsilon = 0.00001);
        assert_approx_eq!(
            f32,
            super::ambient_temperature(&clb, &frame, v_dd),
            45.8025647,
            epsilon = 0.001
        );
    }

    #[test]
    fn t_ar_same_temperatures() {
        // When the reflected and ambient temperatures are the same, emissivity has no effect.
        let expected = (30f32 + super::KELVINS_TO_CELSIUS).powi(4);
        assert_approx_eq!(f32, super::t_ar(30.0, 30.0, 0.5), expected, ulps = 4);
        assert_approx_eq!(f32, super::t_ar(30.0, 30.0, 1.0), expected, ulps = 4);
    }

    #[test]
    fn no_signal_is_reflected_temperature() {
        let t_ar = super::t_ar(30.0, 30.0, 1.0);
        let t_o = super::per_pixel_temperature(0.0, 3.0e-7, t_ar, -0.0007);
        assert_approx_eq!(f32, t_o, 30.0, epsilon = 0.001);
    }

    #[test]
    fn temperature_range() {
        let corners = [-40, -20, 0, 80, 120, 200, 400, 600];
        assert_eq!(super::temperature_range(&corners, -50.0), 0);
        assert_eq!(super::temperature_range(&corners, -30.0), 0);
        assert_eq!(super::temperature_range(&corners, -20.0), 1);
        assert_eq!(super::temperature_range(&corners, 50.0), 2);
        assert_eq!(super::temperature_range(&corners, 80.0), 3);
        assert_eq!(super::temperature_range(&corners, 119.9), 3);
        assert_eq!(super::temperature_range(&corners, 250.0), 5);
        assert_eq!(super::temperature_range(&corners, 1000.0), 7);
    }

    #[test]
    fn datasheet_temperatures() {
        let clb = datasheet_calibration();
        let frame = datasheet_frame(0x0901, Subpage::Zero);
        let mut temperatures = [0f32; NUM_PIXELS];
        let t_a = super::calculate_to(
            &clb,
            &frame,
            clb.emissivity(),
            DATASHEET_T_A,
            &mut temperatures,
        )
        .unwrap();
        assert_approx_eq!(f32, t_a, DATASHEET_T_A, epsilon = 0.001);
        // Every pixel in the example has the same raw value, but the sensitivity is different for
        // each group of 32 pixels.
        let expected_groups = [
            87.61779812630846,
            82.3145627343934,
            80.05036528631695,
            79.93934897793133,
            81.84496766015974,
            86.5197014379246,
        ];
        for (index, temperature) in temperatures.iter().enumerate() {
            let expected = expected_groups[index / 32];
            assert!(
                approx_eq!(f32, *temperature, expected, epsilon = 0.05),
                "Pixel {} is {}, expected {}",
                index,
                temperature,
                expected
            );
        }
    }

    #[test]
    fn odd_subpage_offsets() {
        let clb = datasheet_calibration();
        let frame = datasheet_frame(0x0901, Subpage::One);
        let mut temperatures = [0f32; NUM_PIXELS];
        super::calculate_to(
            &clb,
            &frame,
            clb.emissivity(),
            DATASHEET_T_A,
            &mut temperatures,
        )
        .unwrap();
        assert_approx_eq!(f32, temperatures[0], 87.66511772239602, epsilon = 0.05);
    }

    #[test]
    fn emissivity_and_reflected_temperature() {
        let clb = datasheet_calibration();
        let frame = datasheet_frame(0x0901, Subpage::Zero);
        let mut temperatures = [0f32; NUM_PIXELS];
        super::calculate_to(&clb, &frame, 1.0, DATASHEET_T_A, &mut temperatures).unwrap();
        assert_approx_eq!(f32, temperatures[0], 85.64242924241125, epsilon = 0.05);
        super::calculate_to(
            &clb,
            &frame,
            clb.emissivity(),
            DATASHEET_T_A - 8.0,
            &mut temperatures,
        )
        .unwrap();
        assert_approx_eq!(f32, temperatures[0], 87.89981896205114, epsilon = 0.05);
    }

    #[test]
    fn zero_gain_rejected() {
        let clb = datasheet_calibration();
        let mut ram = mlx90641_datasheet_ram();
        let gain_index = usize::from(RamAddress::Gain - RamAddress::Base);
        ram[gain_index] = 0;
        let tail_start = usize::from(RamAddress::AmbientTemperatureVoltageBe - RamAddress::Base);
        let mut pixels = [0u16; NUM_PIXELS];
        pixels.copy_from_slice(&ram[..NUM_PIXELS]);
        let mut tail = [0u16; TAIL_WORDS];
        tail.copy_from_slice(&ram[tail_start..(tail_start + TAIL_WORDS)]);
        let frame = FrameBuffer::from_parts(&pixels, &tail, 0x0901, Subpage::Zero);
        let mut temperatures = [0f32; NUM_PIXELS];
        assert!(matches!(
            super::calculate_to(&clb, &frame, 1.0, 25.0, &mut temperatures),
            Err(LibraryError::InvalidData(_))
        ));
        assert!(matches!(
            super::calculate_image(&clb, &frame, &mut temperatures),
            Err(LibraryError::InvalidData(_))
        ));
    }

    #[test]
    fn invalid_emissivity_rejected() {
        let clb = datasheet_calibration();
        let frame = datasheet_frame(0x0901, Subpage::Zero);
        let mut temperatures = [0f32; NUM_PIXELS];
        for emissivity in [0.0, -0.5, f32::NAN] {
            assert!(matches!(
                super::calculate_to(&clb, &frame, emissivity, 25.0, &mut temperatures),
                Err(LibraryError::InvalidData(_))
            ));
        }
    }

    #[test]
    fn no_signal_frame() {
        let mut image = datasheet_image();
        let words = image.words_mut();
        let offset_words = [0x2411, 0x2412, 0x242F, 0x2430]
            .into_iter()
            .chain(0x2440..0x2500)
            .chain(0x2680..0x2740);
        for address in offset_words {
            words[usize::from(address - EEPROM_BASE)] = 0;
        }
        let clb = Mlx90641Calibration::from_eeprom(&image).unwrap();
        assert_eq!(clb.cp_offset(), 0);
        let datasheet = datasheet_frame(0x0901, Subpage::Zero);
        let tail_start = usize::from(RamAddress::AmbientTemperatureVoltageBe - RamAddress::Base);
        let mut tail = [0u16; TAIL_WORDS];
        tail.copy_from_slice(&datasheet.words()[NUM_PIXELS..(NUM_PIXELS + TAIL_WORDS)]);
        let cp_index = usize::from(RamAddress::CompensationPixel - RamAddress::Base) - tail_start;
        tail[cp_index] = 0;
        for subpage in [Subpage::Zero, Subpage::One] {
            let frame = FrameBuffer::from_parts(&[0u16; NUM_PIXELS], &tail, 0x0901, subpage);
            let mut temperatures = [0f32; NUM_PIXELS];
            // With no signal, a pixel only sees the ambient temperature, either directly or
            // reflected.
            for emissivity in [1.0, clb.emissivity()] {
                let t_a =
                    super::calculate_to(&clb, &frame, emissivity, DATASHEET_T_A, &mut temperatures)
                        .unwrap();
                assert_approx_eq!(f32, t_a, DATASHEET_T_A, epsilon = 0.001);
                for (index, temperature) in temperatures.iter().enumerate() {
                    assert!(
                        approx_eq!(f32, *temperature, DATASHEET_T_A, epsilon = 0.01),
                        "Pixel {} is {}, expected {}",
                        index,
                        temperature,
                        DATASHEET_T_A
                    );
                }
            }
            let mut raw = [1f32; NUM_PIXELS];
            super::calculate_image(&clb, &frame, &mut raw).unwrap();
            assert!(raw.iter().all(|value| *value == 0.0));
        }
    }

    #[test]
    fn datasheet_image_values() {
        let clb = datasheet_calibration();
        let frame = datasheet_frame(0x0901, Subpage::Zero);
        let mut image = [0f32; NUM_PIXELS];
        let t_a = super::calculate_image(&clb, &frame, &mut image).unwrap();
        assert_approx_eq!(f32, t_a, DATASHEET_T_A, epsilon = 0.001);
        let expected = [(0, 6059125094.396824), (32, 5242802044.93558), (191, 5887547927.484293)];
        for (index, value) in expected.iter() {
            let ratio = image[*index] / value;
            assert!(
                approx_eq!(f32, ratio, 1.0, epsilon = 0.0001),
                "Pixel {} is {}, expected {}",
                index,
                image[*index],
                value
            );
        }
    }

    /// Each row is twice the column number, plus 100 times the row number.
    fn linear_plane() -> [f32; NUM_PIXELS] {
        let mut plane = [0f32; NUM_PIXELS];
        for (index, value) in plane.iter_mut().enumerate() {
            *value = (index % WIDTH) as f32 * 2.0 + (index / WIDTH) as f32 * 100.0;
        }
        plane
    }

    #[test]
    fn interpolate_edges() {
        let plane = linear_plane();
        // Row 3 starts at index 48
        assert_eq!(super::interpolate_pixel(&plane, 48), 302.0);
        assert_eq!(super::interpolate_pixel(&plane, 49), 302.0);
        assert_eq!(super::interpolate_pixel(&plane, 62), 328.0);
        assert_eq!(super::interpolate_pixel(&plane, 63), 328.0);
    }

    #[test]
    fn interpolate_interior() {
        let mut plane = linear_plane();
        // Linear data extrapolates exactly from either side.
        assert_eq!(super::interpolate_pixel(&plane, 7), 14.0);
        // With a jump on the right, the left side is used.
        plane[7] = 40.0;
        assert_eq!(super::interpolate_pixel(&plane, 5), 10.0);
        // And with a jump on the left, the right side is used.
        let mut plane = linear_plane();
        plane[3] = -40.0;
        assert_eq!(super::interpolate_pixel(&plane, 5), 10.0);
    }

    fn break_pixel(image: &mut EepromImage, pixel: u16) {
        for base in [0x2440, 0x2500, 0x25C0] {
            image.words_mut()[usize::from(base + pixel - EEPROM_BASE)] = 0;
        }
    }

    #[test]
    fn correct_broken_pixels() {
        let mut image = datasheet_image();
        break_pixel(&mut image, 17);
        break_pixel(&mut image, 100);
        let clb = Mlx90641Calibration::from_eeprom(&image).unwrap();
        let expected = linear_plane();
        let mut values = expected;
        values[17] = -1000.0;
        values[100] = f32::NAN;
        super::correct_broken_pixels(&clb, &mut values);
        assert_eq!(values, expected);
    }

    #[test]
    fn no_broken_pixels() {
        let clb = datasheet_calibration();
        let expected = linear_plane();
        let mut values = expected;
        super::correct_broken_pixels(&clb, &mut values);
        assert_eq!(values, expected);
    }
}
