// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Typed views of the MLX90641 status and control registers.
use core::convert::TryFrom;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::LibraryError;
use crate::expose_member;
use crate::util::is_bit_set;

/// Trait for common register functionality.
pub trait Register: From<u16> + Into<u16> + Copy {
    /// The address of this register in the sensor's memory map.
    const ADDRESS: u16;

    /// A bit mask of which bits can be modified by the controller.
    ///
    /// See [`merge_writable`][Register::merge_writable] for how it's applied.
    const WRITE_MASK: u16;

    /// Combine the writable bits of this value with the rest of `current`.
    ///
    /// `current` should be the value most recently read from the sensor, so that read-only and
    /// reserved bits are written back unchanged.
    fn merge_writable(self, current: u16) -> u16 {
        let new: u16 = self.into();
        (current & !Self::WRITE_MASK) | (new & Self::WRITE_MASK)
    }
}

/// Represents the possible states of the status register (0x8000).
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub struct StatusRegister {
    /// The subpage which was last updated by the sensor. Read-only.
    last_updated_subpage: Subpage,

    /// Set when there is new data available in RAM. Read-write.
    ///
    /// This flag is set to true by the sensor, and can only be reset by the controller.
    new_data: bool,

    /// Whether data in RAM can be overwritten.
    overwrite_enabled: bool,

    /// Start a measurement.
    ///
    /// Only meaningful in step mode, where the sensor resets it once the measurement is complete.
    start_measurement: bool,
}

impl StatusRegister {
    /// The value written to acknowledge a frame.
    ///
    /// This clears the new data flag, while enabling overwrites and (re)starting measurements.
    /// The subpage bits are read-only, but are included so that the value read back after writing
    /// matches.
    pub fn acknowledge(subpage: Subpage) -> Self {
        Self {
            last_updated_subpage: subpage,
            new_data: false,
            overwrite_enabled: true,
            start_measurement: true,
        }
    }

    pub fn last_updated_subpage(&self) -> Subpage {
        self.last_updated_subpage
    }

    pub fn new_data(&self) -> bool {
        self.new_data
    }

    pub fn overwrite_enabled(&self) -> bool {
        self.overwrite_enabled
    }

    pub fn start_measurement(&self) -> bool {
        self.start_measurement
    }
}

impl Register for StatusRegister {
    const ADDRESS: u16 = 0x8000;

    // The three least significant bits are read-only.
    const WRITE_MASK: u16 = 0x0038;
}

impl From<u16> for StatusRegister {
    fn from(raw: u16) -> Self {
        // Only the first bit is used, the other two bits for this value are reserved.
        Self {
            last_updated_subpage: Subpage::from_bit(is_bit_set(raw, 0)),
            new_data: is_bit_set(raw, 3),
            overwrite_enabled: is_bit_set(raw, 4),
            start_measurement: is_bit_set(raw, 5),
        }
    }
}

impl From<StatusRegister> for u16 {
    fn from(status: StatusRegister) -> Self {
        let subpage: usize = status.last_updated_subpage.into();
        let mut raw = subpage as u16;
        raw |= (status.new_data as u16) << 3;
        raw |= (status.overwrite_enabled as u16) << 4;
        raw |= (status.start_measurement as u16) << 5;
        raw
    }
}

/// Represents the control register (0x800D).
///
/// Bits this driver doesn't manage are kept as-is, so that writing a modified copy of a value
/// that was read doesn't disturb them.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub struct ControlRegister {
    /// Whether or not to use subpages. The default is enabled.
    use_subpages: bool,

    /// Only write data into RAM when [`StatusRegister::overwrite_enabled`] is set.
    data_hold: bool,

    /// Repeat the subpage given in `subpage` instead of alternating.
    subpage_repeat: bool,

    /// Which subpage to use when `subpage_repeat` is set.
    subpage: Subpage,

    /// See the note on [`FrameRate`] for I²C bus clock rate requirements.
    frame_rate: FrameRate,

    resolution: Resolution,

    /// Everything else.
    reserved: u16,
}

impl ControlRegister {
    const USE_SUBPAGES_BIT: usize = 0;
    const DATA_HOLD_BIT: usize = 2;
    const SUBPAGE_REPEAT_BIT: usize = 3;
    const SUBPAGE_BIT: usize = 4;
    const FRAME_RATE_SHIFT: u16 = 7;
    const FRAME_RATE_MASK: u16 = 0x0380;
    const RESOLUTION_SHIFT: u16 = 10;
    const RESOLUTION_MASK: u16 = 0x0C00;
    const MANAGED_MASK: u16 = 0x0001
        | 0x0004
        | 0x0008
        | 0x0010
        | Self::FRAME_RATE_MASK
        | Self::RESOLUTION_MASK;

    expose_member!(use_subpages, bool);
    expose_member!(data_hold, bool);
    expose_member!(subpage_repeat, bool);
    expose_member!(subpage, Subpage);
    expose_member!(frame_rate, FrameRate);
    expose_member!(resolution, Resolution);

    pub fn set_frame_rate(&mut self, frame_rate: FrameRate) {
        self.frame_rate = frame_rate;
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.resolution = resolution;
    }
}

impl Register for ControlRegister {
    const ADDRESS: u16 = 0x800D;

    // *Technically* it's 0x1FFD, but the second bit is documented to always be 0
    const WRITE_MASK: u16 = 0x1FFF;
}

impl From<u16> for ControlRegister {
    fn from(raw: u16) -> Self {
        Self {
            use_subpages: is_bit_set(raw, Self::USE_SUBPAGES_BIT),
            data_hold: is_bit_set(raw, Self::DATA_HOLD_BIT),
            subpage_repeat: is_bit_set(raw, Self::SUBPAGE_REPEAT_BIT),
            subpage: Subpage::from_bit(is_bit_set(raw, Self::SUBPAGE_BIT)),
            frame_rate: FrameRate::from_masked(
                (raw & Self::FRAME_RATE_MASK) >> Self::FRAME_RATE_SHIFT,
            ),
            resolution: Resolution::from_masked(
                (raw & Self::RESOLUTION_MASK) >> Self::RESOLUTION_SHIFT,
            ),
            reserved: raw & !Self::MANAGED_MASK,
        }
    }
}

impl From<ControlRegister> for u16 {
    fn from(register: ControlRegister) -> Self {
        let subpage: usize = register.subpage.into();
        let mut raw = register.reserved;
        raw |= (register.use_subpages as u16) << ControlRegister::USE_SUBPAGES_BIT;
        raw |= (register.data_hold as u16) << ControlRegister::DATA_HOLD_BIT;
        raw |= (register.subpage_repeat as u16) << ControlRegister::SUBPAGE_REPEAT_BIT;
        raw |= (subpage as u16) << ControlRegister::SUBPAGE_BIT;
        raw |= register.frame_rate.as_raw() << ControlRegister::FRAME_RATE_SHIFT;
        raw |= register.resolution.as_raw() << ControlRegister::RESOLUTION_SHIFT;
        raw
    }
}

/// Identify which subpage to access.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
#[repr(usize)]
pub enum Subpage {
    Zero = 0,
    One = 1,
}

impl Subpage {
    pub(crate) fn from_bit(set: bool) -> Self {
        if set {
            Self::One
        } else {
            Self::Zero
        }
    }
}

impl Default for Subpage {
    fn default() -> Self {
        Self::Zero
    }
}

/// The possible refresh rates supported by the sensor. Before using the higher refresh rates,
/// ensure your I²C bus is fast enough. A quick rundown of the the maximum frame rate some common
/// I²C bus speeds can support:
///
/// * 100kHz: [4Hz][FrameRate::Four]
/// * 400kHz: [16Hz][FrameRate::Sixteen]
/// * 1MHz: [64Hz][FrameRate::SixtyFour] (barely, [32Hz][FrameRate::ThirtyTwo] is safer)
///
/// The MLX90641 reads far less data per frame than its larger sibling, so in practice 400kHz is
/// enough for 32Hz.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum FrameRate {
    /// 0.5 Hz, one frame every two seconds.
    Half,

    /// 1Hz.
    One,

    /// 2Hz, the power-on default.
    Two,

    /// 4Hz.
    Four,

    /// 8Hz.
    Eight,

    /// 16Hz.
    Sixteen,

    /// 32Hz.
    ThirtyTwo,

    /// 64Hz.
    SixtyFour,
}

impl FrameRate {
    /// Attempt to create a `FrameRate` from a raw value from the sensor.
    pub(crate) fn from_raw(raw_value: u16) -> Result<Self, LibraryError> {
        match raw_value {
            0 => Ok(Self::Half),
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            3 => Ok(Self::Four),
            4 => Ok(Self::Eight),
            5 => Ok(Self::Sixteen),
            6 => Ok(Self::ThirtyTwo),
            7 => Ok(Self::SixtyFour),
            _ => Err(LibraryError::InvalidData("Invalid frame rate given")),
        }
    }

    /// Map three bits from the control register to a frame rate. Every value is valid.
    fn from_masked(raw_value: u16) -> Self {
        Self::from_raw(raw_value & 0x7).unwrap_or_default()
    }

    /// Map a frame rate variant into the representation used by the sensor.
    pub(crate) fn as_raw(&self) -> u16 {
        match self {
            Self::Half => 0,
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 3,
            Self::Eight => 4,
            Self::Sixteen => 5,
            Self::ThirtyTwo => 6,
            Self::SixtyFour => 7,
        }
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::Two
    }
}

impl TryFrom<f32> for FrameRate {
    type Error = LibraryError;

    /// Attempt to create a `FrameRate` from a number.
    ///
    /// This will only work if the source number *exactly* matches one of the values named as a
    /// variant.
    /// ```
    /// # use core::convert::TryFrom;
    /// # use mlx90641::FrameRate;
    /// assert_eq!(FrameRate::try_from(0.5), Ok(FrameRate::Half));
    /// let almost_half = 0.50001;
    /// assert!(FrameRate::try_from(almost_half).is_err());
    /// ```
    #[allow(clippy::float_cmp)]
    fn try_from(value: f32) -> Result<Self, Self::Error> {
        if value == 0.5 {
            Ok(Self::Half)
        } else {
            let whole = value as u8;
            if f32::from(whole) == value {
                Self::try_from(whole)
            } else {
                Err(LibraryError::InvalidData(
                    "The given number does not match a valid frame rate",
                ))
            }
        }
    }
}

impl TryFrom<u8> for FrameRate {
    type Error = LibraryError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        // No way to say 0.5, so skipping it
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            4 => Ok(Self::Four),
            8 => Ok(Self::Eight),
            16 => Ok(Self::Sixteen),
            32 => Ok(Self::ThirtyTwo),
            64 => Ok(Self::SixtyFour),
            _ => Err(LibraryError::InvalidData(
                "The given number does not match a valid frame rate",
            )),
        }
    }
}

impl From<FrameRate> for f32 {
    fn from(frame_rate: FrameRate) -> Self {
        match frame_rate {
            FrameRate::Half => 0.5,
            FrameRate::One => 1f32,
            FrameRate::Two => 2f32,
            FrameRate::Four => 4f32,
            FrameRate::Eight => 8f32,
            FrameRate::Sixteen => 16f32,
            FrameRate::ThirtyTwo => 32f32,
            FrameRate::SixtyFour => 64f32,
        }
    }
}

/// The resolution of the internal [ADC][adc].
///
/// [adc]: https://en.wikipedia.org/wiki/Analog-to-digital_converter
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Resolution {
    /// 16-bit.
    Sixteen,

    /// 17-bit.
    Seventeen,

    /// 18-bit, which is also the power-on default.
    Eighteen,

    /// 19-bit.
    Nineteen,
}

impl Resolution {
    /// Attempt to create a `Resolution` from a raw value from the sensor.
    pub(crate) fn from_raw(raw_value: u16) -> Result<Self, LibraryError> {
        match raw_value {
            0 => Ok(Self::Sixteen),
            1 => Ok(Self::Seventeen),
            2 => Ok(Self::Eighteen),
            3 => Ok(Self::Nineteen),
            _ => Err(LibraryError::InvalidData(
                "Invalid raw resolution value given",
            )),
        }
    }

    fn from_masked(raw_value: u16) -> Self {
        Self::from_raw(raw_value & 0x3).unwrap_or_default()
    }

    /// Map a resolution variant into the representation used by the sensor.
    pub(crate) fn as_raw(&self) -> u16 {
        match self {
            Self::Sixteen => 0,
            Self::Seventeen => 1,
            Self::Eighteen => 2,
            Self::Nineteen => 3,
        }
    }
}

impl TryFrom<u8> for Resolution {
    type Error = LibraryError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            16 => Ok(Self::Sixteen),
            17 => Ok(Self::Seventeen),
            18 => Ok(Self::Eighteen),
            19 => Ok(Self::Nineteen),
            _ => Err(LibraryError::InvalidData(
                "The given value did not match a valid ADC resolution",
            )),
        }
    }
}

impl From<Resolution> for u8 {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Sixteen => 16,
            Resolution::Seventeen => 17,
            Resolution::Eighteen => 18,
            Resolution::Nineteen => 19,
        }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::Eighteen
    }
}
