// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! A pure-Rust driver for the Melexis MLX90641 16×12 thermal sensor.
//!
//! The MLX90641 stores its factory calibration in an on-chip EEPROM protected by a Hamming code,
//! and reports raw ADC counts for each pixel. Turning those counts into temperatures takes a fair
//! amount of processing: the EEPROM has to be error-corrected and unpacked into a few hundred
//! calibration coefficients, and each frame then goes through supply-voltage, ambient
//! temperature, gain, offset and sensitivity compensation before an (eight-range, piecewise)
//! radiometric model produces the final object temperatures.
//!
//! This crate has two levels of API. [`Mlx90641Sensor`] handles all of the above for you: it
//! loads and validates the calibration once, then reads and converts frames on request. The
//! lower-level modules ([`bitfield`], [`hamming`], [`eeprom`], [`frame`], [`calculations`]) are
//! public for those who need to customize a step, for example storing pre-processed calibration
//! data in flash.
//!
//! The bus is abstracted behind the [`Transport`] trait. [`I2cTransport`] implements it for any
//! [`embedded-hal`][embedded-hal] I²C bus, so this library should work on any platform with an
//! `embedded-hal` implementation. The crate is `no_std` compatible; enable the `libm` feature
//! (and disable `std`) on targets without a floating point library.
//!
//! [embedded-hal]: https://docs.rs/embedded-hal/0.2/embedded_hal/blocking/i2c/index.html
//!
//! # Example
//! ```no_run
//! use linux_embedded_hal::{Delay, I2cdev};
//! use mlx90641::{I2cTransport, LogFacade, Mlx90641Sensor, SensorConfig};
//!
//! let bus = I2cdev::new("/dev/i2c-1").expect("/dev/i2c-1 needs to be an I2C controller");
//! let transport = I2cTransport::new(bus, Delay);
//! let mut sensor = Mlx90641Sensor::init(transport, LogFacade, SensorConfig::default())?;
//! sensor.read_frame()?;
//! sensor.calculate_temps()?;
//! println!("Ambient: {:.2}", sensor.ambient_temperature());
//! for row in sensor.temperatures().chunks(mlx90641::WIDTH) {
//!     println!("{:?}", row);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Subpages
//! The sensor measures in two interleaved half-frames called [subpages][Subpage]. Unlike the
//! MLX90640, each MLX90641 subpage covers *every* pixel, just stored at different RAM addresses
//! and compensated with a different set of offsets. [`Mlx90641Sensor::read_frame`] reports which
//! subpage it read.

#![no_std]
#![allow(clippy::float_cmp)]

#[cfg(not(any(feature = "std", feature = "libm")))]
compile_error!("Either the 'std' or 'libm' feature must be enabled.");

pub mod address;
pub mod bitfield;
pub mod calculations;
#[doc(hidden)]
pub mod driver;
pub mod eeprom;
#[doc(hidden)]
pub mod error;
pub mod frame;
pub mod hamming;
pub mod logger;
pub mod notification;
pub mod register;
pub mod transport;
mod util;

#[cfg(test)]
mod test;

#[doc(inline)]
pub use driver::{Mlx90641Sensor, SensorConfig};
pub use eeprom::{EepromImage, Mlx90641Calibration};
#[doc(inline)]
pub use error::{Error, LibraryError};
pub use frame::{FrameBuffer, FrameReader};
pub use hamming::DecodeStatus;
pub use logger::{LogFacade, Logger, NoopLogger};
pub use register::*;
pub use transport::{BusError, FromTransport, I2cTransport, Transport};

/// The number of pixel rows.
pub const HEIGHT: usize = 12;

/// The number of pixel columns.
pub const WIDTH: usize = 16;

/// The total number of pixels.
pub const NUM_PIXELS: usize = HEIGHT * WIDTH;

/// The default bus address for the MLX90641.
pub const DEFAULT_ADDRESS: u8 = 0x33;
