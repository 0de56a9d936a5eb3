// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
use log::Level;
use paste::paste;

use crate::calculations::{
    ambient_temperature, calculate_image, calculate_to, correct_broken_pixels, supply_voltage,
};
use crate::eeprom::{EepromImage, Mlx90641Calibration};
use crate::error::{Error, LibraryError};
use crate::frame::{FrameBuffer, FrameReader, DEFAULT_MAX_ATTEMPTS};
use crate::hamming::{decode_image, DecodeStatus};
use crate::logger::{sensor_log, Logger, NoopLogger};
use crate::register::*;
use crate::transport::{FromTransport, Transport};
use crate::{DEFAULT_ADDRESS, NUM_PIXELS};

/// The bus frequency used by default, in kHz.
pub const DEFAULT_BUS_FREQUENCY_KHZ: u32 = 400;

/// DRY macro for the set_* methods in `Mlx90641Sensor` that modify a register field.
macro_rules! set_register_field {
    { $register_access:ident, $field:ident, $typ:ty, $doc:literal } => {
    paste! {
        #[doc = $doc]
        pub fn [< set_ $field >](&mut self, new_value: $typ) -> Result<(), Error<T::Error>> {
            let current = self.$register_access()?;
            if current.$field() != new_value {
                let mut updated = current;
                updated.[< set_ $field >](new_value);
                self.[< set_ $register_access >](updated, current)
            } else {
                Ok(())
            }
        }
    }};
}

/// Settings applied when a sensor is initialized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensorConfig {
    /// The bus address of the sensor.
    pub address: u8,

    /// Passed to [`Transport::init`].
    pub bus_frequency_khz: u32,

    /// The ADC resolution to switch to, if any.
    pub resolution: Option<Resolution>,

    /// The frame rate to switch to, if any.
    pub frame_rate: Option<FrameRate>,

    /// How many times [`FrameReader`] will poll or re-read before giving up on a frame.
    pub max_frame_attempts: u8,

    /// An emissivity to use instead of the one stored in the sensor's EEPROM.
    pub emissivity: Option<f32>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            bus_frequency_khz: DEFAULT_BUS_FREQUENCY_KHZ,
            resolution: Some(Resolution::Nineteen),
            frame_rate: Some(FrameRate::ThirtyTwo),
            max_frame_attempts: DEFAULT_MAX_ATTEMPTS,
            emissivity: None,
        }
    }
}

/// A driver for the MLX90641 thermal sensor.
///
/// The calibration is loaded once, when the driver is [initialized][Mlx90641Sensor::init], and
/// is never modified afterwards. Each measurement is then a call to
/// [`read_frame`][Mlx90641Sensor::read_frame] followed by
/// [`calculate_temps`][Mlx90641Sensor::calculate_temps]:
///
/// ```no_run
/// # use mlx90641::{Mlx90641Sensor, Transport, WIDTH};
/// # fn print_frame<T: Transport>(sensor: &mut Mlx90641Sensor<T>) {
/// if sensor.read_frame().is_ok() && sensor.calculate_temps().is_ok() {
///     for row in sensor.temperatures().chunks(WIDTH) {
///         println!("{:?}", row);
///     }
/// }
/// # }
/// ```
///
/// Failed frames are not retried; that's left to the caller.
#[derive(Clone, Debug)]
pub struct Mlx90641Sensor<T, L = NoopLogger> {
    transport: T,

    logger: L,

    /// The bus address of the sensor.
    address: u8,

    reader: FrameReader,

    /// The factory calibration data for this sensor.
    calibration: Mlx90641Calibration,

    /// The raw data for the most recent frame.
    frame: FrameBuffer,

    /// The subpage of the most recent frame, if the most recent read was successful.
    last_subpage: Option<Subpage>,

    temperatures: [f32; NUM_PIXELS],

    /// The most recently calculated ambient temperature.
    ambient_temperature: f32,

    /// The most recently calculated supply voltage.
    supply_voltage: f32,

    /// The emissivity value to use when calculating pixel temperature.
    emissivity: f32,
}

impl<T, L> Mlx90641Sensor<T, L>
where
    T: Transport,
    L: Logger,
{
    /// Bring up the sensor and load its calibration.
    ///
    /// The transport is initialized first, then the EEPROM is read, error-corrected and unpacked.
    /// Errors in any of those steps are fatal. Single-bit EEPROM errors are corrected and logged.
    /// Finally the resolution and frame rate from `config` are applied, but failing to do so is
    /// only logged.
    pub fn init(
        mut transport: T,
        mut logger: L,
        config: SensorConfig,
    ) -> Result<Self, Error<T::Error>> {
        sensor_log!(
            logger,
            Level::Info,
            "Initializing MLX90641 at {:#04X} ({} kHz)",
            config.address,
            config.bus_frequency_khz
        );
        transport
            .init(config.bus_frequency_khz)
            .map_err(Error::Transport)?;
        let mut image = EepromImage::from_transport(&mut transport, config.address)?;
        sensor_log!(logger, Level::Debug, "EEPROM header: {:04X?}", &image.words()[..16]);
        match decode_image(&mut image) {
            DecodeStatus::Clean => (),
            DecodeStatus::Corrected => {
                sensor_log!(logger, Level::Warn, "Corrected single-bit errors in the EEPROM");
            }
            DecodeStatus::Uncorrectable => {
                sensor_log!(logger, Level::Error, "The EEPROM has uncorrectable errors");
                return Err(LibraryError::UncorrectableEeprom.into());
            }
        }
        let calibration = match Mlx90641Calibration::from_eeprom(&image) {
            Ok(calibration) => calibration,
            Err(error) => {
                sensor_log!(logger, Level::Error, "Unable to load calibration: {}", error);
                return Err(error.into());
            }
        };
        for index in calibration.failed_pixels().iter_ones() {
            sensor_log!(logger, Level::Info, "Pixel {} is broken", index);
        }
        let emissivity = config
            .emissivity
            .unwrap_or_else(|| calibration.emissivity());
        let mut sensor = Self {
            transport,
            logger,
            address: config.address,
            reader: FrameReader::new(config.address, config.max_frame_attempts),
            calibration,
            frame: FrameBuffer::default(),
            last_subpage: None,
            temperatures: [f32::NAN; NUM_PIXELS],
            ambient_temperature: f32::NAN,
            supply_voltage: f32::NAN,
            emissivity,
        };
        if let Some(resolution) = config.resolution {
            if sensor.set_resolution(resolution).is_err() {
                sensor_log!(
                    sensor.logger,
                    Level::Warn,
                    "Unable to set the resolution to {} bits",
                    u8::from(resolution)
                );
            }
        }
        if let Some(frame_rate) = config.frame_rate {
            if sensor.set_frame_rate(frame_rate).is_err() {
                sensor_log!(
                    sensor.logger,
                    Level::Warn,
                    "Unable to set the frame rate to {} Hz",
                    f32::from(frame_rate)
                );
            }
        }
        sensor_log!(sensor.logger, Level::Info, "MLX90641 ready");
        Ok(sensor)
    }

    fn read_register<R: Register>(&mut self) -> Result<R, Error<T::Error>> {
        let mut raw = [0u16];
        self.transport
            .read(self.address, R::ADDRESS, &mut raw)
            .map_err(Error::Transport)?;
        Ok(R::from(raw[0]))
    }

    /// Write the writable bits of `register`, keeping the rest of `current`.
    fn write_register<R: Register>(
        &mut self,
        register: R,
        current: R,
    ) -> Result<(), Error<T::Error>> {
        let value = register.merge_writable(current.into());
        sensor_log!(
            self.logger,
            Level::Debug,
            "Writing {:#06X} to {:#06X}",
            value,
            R::ADDRESS
        );
        self.transport
            .write(self.address, R::ADDRESS, value)
            .map_err(Error::Transport)
    }

    fn control_register(&mut self) -> Result<ControlRegister, Error<T::Error>> {
        self.read_register()
    }

    fn set_control_register(
        &mut self,
        register: ControlRegister,
        current: ControlRegister,
    ) -> Result<(), Error<T::Error>> {
        self.write_register(register, current)
    }

    /// Read the frame rate from the sensor.
    ///
    /// The power-on default is [2 FPS][FrameRate::Two].
    pub fn frame_rate(&mut self) -> Result<FrameRate, Error<T::Error>> {
        Ok(self.control_register()?.frame_rate())
    }

    set_register_field! {
        control_register,
        frame_rate,
        FrameRate,
        "Set the sensor's frame rate."
    }

    /// Get the current resolution of the ADC in the sensor.
    ///
    /// The power-on default is [18 bits][Resolution::Eighteen].
    pub fn resolution(&mut self) -> Result<Resolution, Error<T::Error>> {
        Ok(self.control_register()?.resolution())
    }

    set_register_field! {
        control_register,
        resolution,
        Resolution,
        "Set the ADC resolution within the sensor."
    }

    /// Change the bus clock frequency.
    pub fn set_bus_frequency(&mut self, frequency_khz: u32) -> Result<(), Error<T::Error>> {
        self.transport
            .set_frequency(frequency_khz)
            .map_err(Error::Transport)
    }

    /// Acquire a new frame from the sensor.
    ///
    /// On success, the ambient temperature and supply voltage are recalculated and the subpage
    /// that was read is returned. On failure the previous frame is discarded, and
    /// [`calculate_temps`][Mlx90641Sensor::calculate_temps] will fail until a frame is read.
    pub fn read_frame(&mut self) -> Result<Subpage, Error<T::Error>> {
        match self.reader.read(&mut self.transport, &mut self.frame) {
            Ok(subpage) => {
                self.supply_voltage = supply_voltage(&self.calibration, &self.frame);
                self.ambient_temperature =
                    ambient_temperature(&self.calibration, &self.frame, self.supply_voltage);
                self.last_subpage = Some(subpage);
                sensor_log!(
                    self.logger,
                    Level::Debug,
                    "Read subpage {}, ambient {:.2}°C, Vdd {:.3}V",
                    usize::from(subpage),
                    self.ambient_temperature,
                    self.supply_voltage
                );
                Ok(subpage)
            }
            Err(error) => {
                self.last_subpage = None;
                if matches!(error, Error::Library(LibraryError::FrameTimeout)) {
                    sensor_log!(self.logger, Level::Warn, "Timed out waiting for a frame");
                } else {
                    sensor_log!(self.logger, Level::Warn, "Unable to read a frame");
                }
                Err(error)
            }
        }
    }

    /// Calculate the temperature of every pixel from the most recent frame.
    ///
    /// The reflected temperature is assumed to be the ambient temperature. Broken pixels are
    /// interpolated from their neighbours.
    pub fn calculate_temps(&mut self) -> Result<(), LibraryError> {
        if self.last_subpage.is_none() {
            return Err(LibraryError::NoFrame);
        }
        let t_a = calculate_to(
            &self.calibration,
            &self.frame,
            self.emissivity,
            self.ambient_temperature,
            &mut self.temperatures,
        )?;
        correct_broken_pixels(&self.calibration, &mut self.temperatures);
        self.ambient_temperature = t_a;
        Ok(())
    }

    /// Generate a raw thermal image from the most recent frame.
    ///
    /// See [`calculate_image`][crate::calculations::calculate_image] for what the values are.
    pub fn calculate_image(
        &self,
        destination: &mut [f32; NUM_PIXELS],
    ) -> Result<(), LibraryError> {
        if self.last_subpage.is_none() {
            return Err(LibraryError::NoFrame);
        }
        calculate_image(&self.calibration, &self.frame, destination)?;
        correct_broken_pixels(&self.calibration, destination);
        Ok(())
    }

    /// The most recently calculated temperatures, in degrees Celsius, in row-major order.
    ///
    /// Every value is NaN until temperatures have been calculated.
    pub fn temperatures(&self) -> &[f32; NUM_PIXELS] {
        &self.temperatures
    }

    /// The most recent ambient temperature, in degrees Celsius.
    ///
    /// This is NaN until a frame has been read.
    pub fn ambient_temperature(&self) -> f32 {
        self.ambient_temperature
    }

    /// The most recent supply voltage, in volts.
    ///
    /// This is NaN until a frame has been read.
    pub fn supply_voltage(&self) -> f32 {
        self.supply_voltage
    }

    /// The subpage of the most recent frame, if the last read succeeded.
    pub fn last_subpage(&self) -> Option<Subpage> {
        self.last_subpage
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn calibration(&self) -> &Mlx90641Calibration {
        &self.calibration
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Get the emissivity value that is being used for calculations currently.
    ///
    /// Unless [overridden][Mlx90641Sensor::override_emissivity], this is the value stored in the
    /// sensor's EEPROM.
    pub fn effective_emissivity(&self) -> f32 {
        self.emissivity
    }

    /// Override the emissivity value used in temperature calculations.
    ///
    /// This change is not stored on the sensor.
    pub fn override_emissivity(&mut self, new_value: f32) {
        self.emissivity = new_value;
    }

    /// Go back to using the emissivity stored in the sensor's EEPROM.
    pub fn use_default_emissivity(&mut self) {
        self.emissivity = self.calibration.emissivity();
    }

    /// Destroy the driver, returning the transport and logger.
    pub fn release(self) -> (T, L) {
        (self.transport, self.logger)
    }
}
