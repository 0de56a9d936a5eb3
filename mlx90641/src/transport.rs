// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Word-oriented access to the sensor's memory map.
//!
//! The rest of this crate only ever talks to the sensor through [`Transport`], which deals in
//! 16-bit words at 16-bit register addresses. [`I2cTransport`] implements it on top of any
//! blocking [`embedded-hal`][embedded-hal] I²C bus.
//!
//! [embedded-hal]: https://docs.rs/embedded-hal/0.2/embedded_hal/blocking/i2c/index.html
#[cfg(feature = "std")]
extern crate std;

use core::fmt;

use embedded_hal::blocking::{delay, i2c};

use crate::error::Error;
use crate::util::WORD_SIZE;

/// The largest number of bytes read in a single bus transaction.
pub const MAX_CHUNK_BYTES: usize = 128;

/// The default delay before each bus transaction, in microseconds.
pub const DEFAULT_SETTLE_DELAY_US: u32 = 5;

/// The bus operations the driver needs.
///
/// Implementations are expected to block until the operation is complete.
pub trait Transport {
    type Error;

    /// Prepare the bus for use at the given clock frequency.
    fn init(&mut self, frequency_khz: u32) -> Result<(), Self::Error>;

    /// Change the bus clock frequency.
    fn set_frequency(&mut self, frequency_khz: u32) -> Result<(), Self::Error>;

    /// Fill `destination` with consecutive words, starting at `register`.
    fn read(&mut self, device: u8, register: u16, destination: &mut [u16])
        -> Result<(), Self::Error>;

    /// Write a single word to `register`, then read it back to verify the write.
    fn write(&mut self, device: u8, register: u16, value: u16) -> Result<(), Self::Error>;
}

/// Create an instance of a type using data retrieved from the sensor.
pub trait FromTransport<T: Transport>: Sized {
    fn from_transport(transport: &mut T, device: u8) -> Result<Self, Error<T::Error>>;
}

/// Errors from [`I2cTransport`].
pub enum BusError<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    /// Errors from a combined write and read.
    WriteRead(<I2C as i2c::WriteRead>::Error),

    /// Errors from a plain write.
    Write(<I2C as i2c::Write>::Error),

    /// The value read back after a write did not match what was written.
    Verification {
        register: u16,
        written: u16,
        read_back: u16,
    },
}

impl<I2C> Clone for BusError<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
    <I2C as i2c::WriteRead>::Error: Clone,
    <I2C as i2c::Write>::Error: Clone,
{
    fn clone(&self) -> Self {
        match self {
            BusError::WriteRead(err) => BusError::WriteRead(err.clone()),
            BusError::Write(err) => BusError::Write(err.clone()),
            BusError::Verification {
                register,
                written,
                read_back,
            } => BusError::Verification {
                register: *register,
                written: *written,
                read_back: *read_back,
            },
        }
    }
}

impl<I2C> PartialEq for BusError<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
    <I2C as i2c::WriteRead>::Error: PartialEq,
    <I2C as i2c::Write>::Error: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (BusError::WriteRead(a), BusError::WriteRead(b)) => a == b,
            (BusError::Write(a), BusError::Write(b)) => a == b,
            (
                BusError::Verification {
                    register: r1,
                    written: w1,
                    read_back: b1,
                },
                BusError::Verification {
                    register: r2,
                    written: w2,
                    read_back: b2,
                },
            ) => r1 == r2 && w1 == w2 && b1 == b2,
            _ => false,
        }
    }
}

// Custom Debug implementation so that I2C doesn't need to implement Debug (like the one from
// linux-embedded-hal).
impl<I2C> fmt::Debug for BusError<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
    <I2C as i2c::WriteRead>::Error: fmt::Debug,
    <I2C as i2c::Write>::Error: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::WriteRead(err) => f.debug_tuple("BusError::WriteRead").field(err).finish(),
            BusError::Write(err) => f.debug_tuple("BusError::Write").field(err).finish(),
            BusError::Verification {
                register,
                written,
                read_back,
            } => f
                .debug_struct("BusError::Verification")
                .field("register", register)
                .field("written", written)
                .field("read_back", read_back)
                .finish(),
        }
    }
}

impl<I2C> fmt::Display for BusError<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
    <I2C as i2c::WriteRead>::Error: fmt::Debug,
    <I2C as i2c::Write>::Error: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::WriteRead(err) => write!(f, "I2C write-read error: {:?}", err),
            BusError::Write(err) => write!(f, "I2C write error: {:?}", err),
            BusError::Verification {
                register,
                written,
                read_back,
            } => write!(
                f,
                "wrote {:#06X} to {:#06X}, but read back {:#06X}",
                written, register, read_back
            ),
        }
    }
}

#[cfg(feature = "std")]
impl<I2C> std::error::Error for BusError<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
    <I2C as i2c::WriteRead>::Error: std::error::Error + 'static,
    <I2C as i2c::Write>::Error: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BusError::WriteRead(err) => Some(err),
            BusError::Write(err) => Some(err),
            BusError::Verification { .. } => None,
        }
    }
}

/// A [`Transport`] for a blocking `embedded-hal` I²C bus.
///
/// Reads are split into chunks of at most [`MAX_CHUNK_BYTES`], with each chunk addressed
/// separately. Every transaction is preceded by a short delay to let the sensor settle.
#[derive(Clone, Debug)]
pub struct I2cTransport<I2C, D> {
    bus: I2C,
    delay: D,
    settle_delay_us: u32,
    chunk_bytes: usize,
    frequency_khz: Option<u32>,
}

impl<I2C, D> I2cTransport<I2C, D>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: delay::DelayUs<u32>,
{
    /// Create a transport with the default settle delay and chunk size.
    pub fn new(bus: I2C, delay: D) -> Self {
        Self::with_settings(bus, delay, DEFAULT_SETTLE_DELAY_US, MAX_CHUNK_BYTES)
    }

    /// Create a transport with a custom settle delay and chunk size.
    ///
    /// The chunk size is rounded down to a whole number of words, and clamped to between one word
    /// and [`MAX_CHUNK_BYTES`].
    pub fn with_settings(bus: I2C, delay: D, settle_delay_us: u32, chunk_bytes: usize) -> Self {
        let chunk_bytes = (chunk_bytes - chunk_bytes % WORD_SIZE).clamp(WORD_SIZE, MAX_CHUNK_BYTES);
        Self {
            bus,
            delay,
            settle_delay_us,
            chunk_bytes,
            frequency_khz: None,
        }
    }

    /// The bus frequency most recently requested, if any.
    ///
    /// `embedded-hal` buses have their clock configured when they're created, so this is only a
    /// record of what was asked for.
    pub fn frequency_khz(&self) -> Option<u32> {
        self.frequency_khz
    }

    /// Give back the bus and delay provider.
    pub fn release(self) -> (I2C, D) {
        (self.bus, self.delay)
    }

    fn read_chunk(
        &mut self,
        device: u8,
        register: u16,
        destination: &mut [u16],
    ) -> Result<(), BusError<I2C>> {
        let mut scratch = [0u8; MAX_CHUNK_BYTES];
        let byte_count = destination.len() * WORD_SIZE;
        self.delay.delay_us(self.settle_delay_us);
        self.bus
            .write_read(device, &register.to_be_bytes(), &mut scratch[..byte_count])
            .map_err(BusError::WriteRead)?;
        destination
            .iter_mut()
            .zip(scratch[..byte_count].chunks_exact(WORD_SIZE))
            .for_each(|(word, bytes)| *word = u16::from_be_bytes([bytes[0], bytes[1]]));
        Ok(())
    }
}

impl<I2C, D> Transport for I2cTransport<I2C, D>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: delay::DelayUs<u32>,
{
    type Error = BusError<I2C>;

    fn init(&mut self, frequency_khz: u32) -> Result<(), Self::Error> {
        self.frequency_khz = Some(frequency_khz);
        Ok(())
    }

    fn set_frequency(&mut self, frequency_khz: u32) -> Result<(), Self::Error> {
        self.frequency_khz = Some(frequency_khz);
        Ok(())
    }

    fn read(
        &mut self,
        device: u8,
        register: u16,
        destination: &mut [u16],
    ) -> Result<(), Self::Error> {
        let words_per_chunk = self.chunk_bytes / WORD_SIZE;
        let mut address = register;
        for chunk in destination.chunks_mut(words_per_chunk) {
            self.read_chunk(device, address, chunk)?;
            address = address.wrapping_add(chunk.len() as u16);
        }
        Ok(())
    }

    fn write(&mut self, device: u8, register: u16, value: u16) -> Result<(), Self::Error> {
        let register_bytes = register.to_be_bytes();
        let value_bytes = value.to_be_bytes();
        let combined = [
            register_bytes[0],
            register_bytes[1],
            value_bytes[0],
            value_bytes[1],
        ];
        self.delay.delay_us(self.settle_delay_us);
        self.bus.write(device, &combined).map_err(BusError::Write)?;
        let mut read_back = [0u16];
        self.read_chunk(device, register, &mut read_back)?;
        if read_back[0] == value {
            Ok(())
        } else {
            Err(BusError::Verification {
                register,
                written: value,
                read_back: read_back[0],
            })
        }
    }
}

#[cfg(test)]
mod test {
    use mlx90641_test_data::i2c_mock::{mock_mlx90641_at_address, I2cOperation, NoDelay};

    use super::*;

    #[test]
    fn read_single_word() {
        let mock = mock_mlx90641_at_address(0x33);
        let mut transport = I2cTransport::new(mock.clone(), NoDelay);
        let mut status = [0u16];
        transport.read(0x33, 0x8000, &mut status).unwrap();
        assert_eq!(status[0], 0x0008);
        assert_eq!(
            mock.recent_operations().back(),
            Some(&I2cOperation::WriteRead {
                address: 0x8000,
                length: 2
            })
        );
    }

    #[test]
    fn read_is_chunked() {
        let mock = mock_mlx90641_at_address(0x33);
        let mut transport = I2cTransport::new(mock.clone(), NoDelay);
        let mut eeprom = [0u16; 832];
        transport.read(0x33, 0x2400, &mut eeprom).unwrap();
        // 832 words, 64 words per chunk
        let operations = mock.recent_operations();
        assert_eq!(operations.len(), 13);
        for (index, operation) in operations.iter().enumerate() {
            assert_eq!(
                operation,
                &I2cOperation::WriteRead {
                    address: 0x2400 + index as u16 * 64,
                    length: 128
                }
            );
        }
        assert_eq!(eeprom[10], 0x0040);
    }

    #[test]
    fn small_chunks() {
        let mock = mock_mlx90641_at_address(0x33);
        let mut transport = I2cTransport::with_settings(mock.clone(), NoDelay, 0, 33);
        let mut pixels = [0u16; 32];
        transport.read(0x33, 0x0400, &mut pixels).unwrap();
        // 33 bytes rounds down to 16 words
        assert_eq!(mock.recent_operations().len(), 2);
        assert!(pixels.iter().all(|pixel| *pixel == 0x03CC));
    }

    #[test]
    fn wrong_device() {
        let mock = mock_mlx90641_at_address(0x33);
        let mut transport = I2cTransport::new(mock, NoDelay);
        let mut status = [0u16];
        assert!(matches!(
            transport.read(0x30, 0x8000, &mut status),
            Err(BusError::WriteRead(_))
        ));
    }

    #[test]
    fn write_verified() {
        let mock = mock_mlx90641_at_address(0x33);
        let mut transport = I2cTransport::new(mock.clone(), NoDelay);
        transport.write(0x33, 0x800D, 0x0D01).unwrap();
        let mut control = [0u16];
        transport.read(0x33, 0x800D, &mut control).unwrap();
        assert_eq!(control[0], 0x0D01);
    }

    #[test]
    fn write_rejected() {
        let mock = mock_mlx90641_at_address(0x33);
        let mut transport = I2cTransport::new(mock, NoDelay);
        // Calibration data can't be written
        let result = transport.write(0x33, 0x240A, 0x1234);
        assert!(matches!(result, Err(BusError::Write(_))));
        // Nor can reserved bits of the I²C configuration register
        let result = transport.write(0x33, 0x800F, 0xFF00);
        assert!(matches!(result, Err(BusError::Write(_))));
    }

    #[test]
    fn write_verification_failure() {
        let mock = mock_mlx90641_at_address(0x33);
        mock.ignore_writes(true);
        let mut transport = I2cTransport::new(mock, NoDelay);
        let result = transport.write(0x33, 0x800D, 0x0D01);
        assert!(matches!(
            result,
            Err(BusError::Verification {
                register: 0x800D,
                written: 0x0D01,
                read_back: 0x0901
            })
        ));
    }

    #[test]
    fn frequency_recorded() {
        let mock = mock_mlx90641_at_address(0x33);
        let mut transport = I2cTransport::new(mock, NoDelay);
        assert_eq!(transport.frequency_khz(), None);
        transport.init(400).unwrap();
        assert_eq!(transport.frequency_khz(), Some(400));
        transport.set_frequency(1000).unwrap();
        assert_eq!(transport.frequency_khz(), Some(1000));
    }
}
