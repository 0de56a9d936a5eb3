// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! An `embedded-hal` I²C device emulating the memory map of an MLX90641.
use std::cell::{Cell, Ref, RefCell};
use std::collections::VecDeque;
use std::ops::RangeInclusive;
use std::rc::Rc;

use embedded_hal::blocking::{delay, i2c};

use crate::eeprom_data::{mlx90641_datasheet_eeprom, EEPROM_WORDS};
use crate::ram_data::{mlx90641_datasheet_ram, RAM_WORDS};

const ROM_RANGE: RangeInclusive<u16> = 0x0000..=0x03FF;

const RAM_RANGE: RangeInclusive<u16> = 0x0400..=0x05BF;

const EEPROM_RANGE: RangeInclusive<u16> = 0x2400..=0x273F;

const REGISTER_RANGE: RangeInclusive<u16> = 0x8000..=0x8016;

const STATUS_REGISTER_ADDRESS: u16 = 0x8000;

// The lowest three bits are read-only.
const STATUS_REGISTER_WRITE_MASK: u16 = 0x0038;

const CONTROL_REGISTER_ONE_ADDRESS: u16 = 0x800D;

// Only the top three bits of control register 1 are reserved.
const CONTROL_REGISTER_1_WRITE_MASK: u16 = 0x1FFF;

const I2C_CONFIG_REGISTER_ADDRESS: u16 = 0x800F;

// Only the last four bits of the I2C config register are documented.
const I2C_CONFIG_REGISTER_WRITE_MASK: u16 = 0x000F;

/// The EEPROM words that may be written, and which bits of each.
///
/// Control register 2 is not documented, so it's treated as entirely reserved.
const EEPROM_WRITE_MASKS: [(u16, u16); 4] = [
    (0x240C, CONTROL_REGISTER_1_WRITE_MASK),
    (0x240D, 0x0000),
    (0x240E, I2C_CONFIG_REGISTER_WRITE_MASK),
    (0x240F, 0x007F),
];

const RECENT_OPERATIONS_QUEUE_LENGTH: usize = 32;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MockError {
    /// The given address shouldn't be accessed.
    IllegalAccess(u16),

    /// The given address should not be written to.
    IllegalWriteAddress(u16),

    /// The given value is illegal for the given location.
    IllegalWriteValue(u16, u16),

    /// The given address isn't valid for the device.
    UnknownMemoryAddress(u16),

    /// An unknown I2C address was given.
    UnknownI2cAddress(u8),

    /// The requested operation is not allowed.
    ///
    /// This covers things situations such as:
    /// * A combined write-read transaction with a write amount other than 2 bytes (so more than
    ///   just an address).
    /// * A write-read transaction with a 0-length read (which causes the camera to reject the next
    ///   operation).
    /// * Operations that aren't a full number of words (each word is two bytes).
    IllegalOperation,
}

/// A record of a successful bus transaction. Lengths are in bytes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum I2cOperation {
    Write { address: u16, length: usize },
    WriteRead { address: u16, length: usize },
}

/// A mock MLX90641.
///
/// Clones share the same state, so a clone can be kept to inspect (or change) the device after
/// the original has been moved into a driver.
#[derive(Clone, Debug)]
pub struct MockCameraBus {
    i2c_address: u8,
    eeprom_data: Rc<RefCell<[u16; EEPROM_WORDS]>>,
    ram_data: Rc<RefCell<[u16; RAM_WORDS]>>,
    status_register: Rc<Cell<u16>>,
    control_register: Rc<Cell<u16>>,
    i2c_config_register: Rc<Cell<u16>>,
    ignore_writes: Rc<Cell<bool>>,
    recent_operations: Rc<RefCell<VecDeque<I2cOperation>>>,
}

impl MockCameraBus {
    pub fn new(
        i2c_address: u8,
        eeprom: [u16; EEPROM_WORDS],
        ram: [u16; RAM_WORDS],
        status_register: u16,
        control_register: u16,
    ) -> Self {
        Self {
            i2c_address,
            eeprom_data: Rc::new(RefCell::new(eeprom)),
            ram_data: Rc::new(RefCell::new(ram)),
            status_register: Rc::new(Cell::new(status_register)),
            control_register: Rc::new(Cell::new(control_register)),
            i2c_config_register: Rc::new(Cell::new(0x0000)),
            ignore_writes: Rc::new(Cell::new(false)),
            recent_operations: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    fn read_words(&self, start_address: u16, destination: &mut [u16]) -> Result<(), MockError> {
        let end_address = start_address as usize + destination.len() - 1;
        if ROM_RANGE.contains(&start_address) {
            // Shouldn't access the ROM
            Err(MockError::IllegalAccess(start_address))
        } else if RAM_RANGE.contains(&start_address) {
            // Can only read from RAM, but must stay within RAM bounds
            if end_address > usize::from(*RAM_RANGE.end()) {
                return Err(MockError::IllegalAccess(end_address as u16));
            }
            let start = usize::from(start_address - RAM_RANGE.start());
            let ram = self.ram_data.borrow();
            destination.copy_from_slice(&ram[start..(start + destination.len())]);
            Ok(())
        } else if EEPROM_RANGE.contains(&start_address) {
            if end_address > usize::from(*EEPROM_RANGE.end()) {
                return Err(MockError::IllegalAccess(end_address as u16));
            }
            let start = usize::from(start_address - EEPROM_RANGE.start());
            let eeprom = self.eeprom_data.borrow();
            destination.copy_from_slice(&eeprom[start..(start + destination.len())]);
            Ok(())
        } else if REGISTER_RANGE.contains(&start_address) {
            // There are only three registers, and they're non-contiguous, so only 1 word can be
            // read at a time.
            if destination.len() != 1 {
                return Err(MockError::IllegalAccess(end_address as u16));
            }
            destination[0] = match start_address {
                STATUS_REGISTER_ADDRESS => self.status_register.get(),
                CONTROL_REGISTER_ONE_ADDRESS => self.control_register.get(),
                I2C_CONFIG_REGISTER_ADDRESS => self.i2c_config_register.get(),
                _ => return Err(MockError::IllegalAccess(start_address)),
            };
            Ok(())
        } else {
            Err(MockError::UnknownMemoryAddress(start_address))
        }
    }

    fn write_word(&self, address: u16, new_word: u16) -> Result<(), MockError> {
        if ROM_RANGE.contains(&address) || RAM_RANGE.contains(&address) {
            // Only the camera is allowed to write to its RAM.
            Err(MockError::IllegalWriteAddress(address))
        } else if EEPROM_RANGE.contains(&address) {
            // Technically you can write anywhere in the EEPROM, but then the calibration data is
            // lost and can't be recovered.
            let mask = EEPROM_WRITE_MASKS
                .iter()
                .find(|(writeable, _)| *writeable == address)
                .map(|(_, mask)| *mask)
                .ok_or(MockError::IllegalWriteAddress(address))?;
            let index = usize::from(address - EEPROM_RANGE.start());
            let existing_word = self.eeprom_data.borrow()[index];
            if !check_new_against_mask(existing_word, mask, new_word) {
                return Err(MockError::IllegalWriteValue(address, new_word));
            }
            if !self.ignore_writes.get() {
                self.eeprom_data.borrow_mut()[index] = new_word;
            }
            Ok(())
        } else if REGISTER_RANGE.contains(&address) {
            let (mask, register) = match address {
                STATUS_REGISTER_ADDRESS => (STATUS_REGISTER_WRITE_MASK, &self.status_register),
                CONTROL_REGISTER_ONE_ADDRESS => {
                    (CONTROL_REGISTER_1_WRITE_MASK, &self.control_register)
                }
                I2C_CONFIG_REGISTER_ADDRESS => {
                    (I2C_CONFIG_REGISTER_WRITE_MASK, &self.i2c_config_register)
                }
                _ => return Err(MockError::IllegalWriteAddress(address)),
            };
            if !check_new_against_mask(register.get(), mask, new_word) {
                return Err(MockError::IllegalWriteValue(address, new_word));
            }
            if !self.ignore_writes.get() {
                register.set(new_word);
            }
            Ok(())
        } else {
            Err(MockError::UnknownMemoryAddress(address))
        }
    }

    /// Replace part of RAM, as if the camera had just taken a new measurement.
    ///
    /// The status register is not changed.
    pub fn update_ram(&self, address: u16, words: &[u16]) {
        let start = usize::from(address - RAM_RANGE.start());
        self.ram_data.borrow_mut()[start..(start + words.len())].copy_from_slice(words);
    }

    /// Flip bits in an EEPROM word.
    pub fn corrupt_eeprom(&self, address: u16, bits: u16) {
        let index = usize::from(address - EEPROM_RANGE.start());
        self.eeprom_data.borrow_mut()[index] ^= bits;
    }

    /// Overwrite the status register, bypassing the usual write checks.
    pub fn set_status(&self, status: u16) {
        self.status_register.set(status);
    }

    pub fn status(&self) -> u16 {
        self.status_register.get()
    }

    pub fn control(&self) -> u16 {
        self.control_register.get()
    }

    /// Set the "new data available" flag in the status register to a new value.
    pub fn set_data_available(&self, available: bool) {
        let status = self.status_register.get();
        if available {
            self.status_register.set(status | 0x0008);
        } else {
            self.status_register.set(status & !0x0008);
        }
    }

    /// Accept (valid) writes without storing them.
    pub fn ignore_writes(&self, ignore: bool) {
        self.ignore_writes.set(ignore);
    }

    fn add_operation(&self, operation: I2cOperation) {
        let mut recent_ops = self.recent_operations.borrow_mut();
        recent_ops.push_back(operation);
        while recent_ops.len() > RECENT_OPERATIONS_QUEUE_LENGTH {
            recent_ops.pop_front();
        }
    }

    /// The most recent operations, oldest first.
    pub fn recent_operations(&self) -> Ref<VecDeque<I2cOperation>> {
        self.recent_operations.borrow()
    }

    pub fn clear_recent_operations(&self) {
        self.recent_operations.borrow_mut().clear()
    }
}

fn extract_address(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

impl i2c::Write for MockCameraBus {
    type Error = MockError;

    fn write(&mut self, i2c_address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        if i2c_address != self.i2c_address {
            return Err(MockError::UnknownI2cAddress(i2c_address));
        }
        // Only single word writes are supported by the camera.
        if bytes.len() != 4 {
            return Err(MockError::IllegalOperation);
        }
        let address = extract_address(bytes);
        let payload = &bytes[2..];
        self.write_word(address, extract_address(payload))?;
        self.add_operation(I2cOperation::Write {
            address,
            length: payload.len(),
        });
        Ok(())
    }
}

impl i2c::WriteRead for MockCameraBus {
    type Error = MockError;

    fn write_read(
        &mut self,
        i2c_address: u8,
        write_buffer: &[u8],
        out_buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        if i2c_address != self.i2c_address {
            return Err(MockError::UnknownI2cAddress(i2c_address));
        }
        // Write-reads should only be writing the address, so write_buffer should only be two bytes
        if write_buffer.len() != 2 || out_buffer.is_empty() || out_buffer.len() % 2 != 0 {
            return Err(MockError::IllegalOperation);
        }
        let address = extract_address(write_buffer);
        self.add_operation(I2cOperation::WriteRead {
            address,
            length: out_buffer.len(),
        });
        let mut words = vec![0u16; out_buffer.len() / 2];
        self.read_words(address, &mut words)?;
        out_buffer
            .chunks_exact_mut(2)
            .zip(words.iter())
            .for_each(|(bytes, word)| bytes.copy_from_slice(&word.to_be_bytes()));
        Ok(())
    }
}

fn check_new_against_mask(existing: u16, mask: u16, new: u16) -> bool {
    (new & !mask) == (existing & !mask)
}

/// A delay provider that returns immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDelay;

impl delay::DelayUs<u32> for NoDelay {
    fn delay_us(&mut self, _us: u32) {}
}

/// A mock camera with the datasheet's EEPROM and RAM, at the given address.
///
/// The worked example uses subpage 0, so the status register marks that as the current subpage
/// with new data. The control register is the power-on default (18-bit resolution, 2Hz).
pub fn mock_mlx90641_at_address(i2c_address: u8) -> MockCameraBus {
    let eeprom_bytes = mlx90641_datasheet_eeprom();
    let mut eeprom = [0u16; EEPROM_WORDS];
    eeprom
        .iter_mut()
        .zip(eeprom_bytes.chunks_exact(2))
        .for_each(|(word, bytes)| *word = extract_address(bytes));
    MockCameraBus::new(
        i2c_address,
        eeprom,
        mlx90641_datasheet_ram(),
        0x0008,
        0x0901,
    )
}

#[cfg(test)]
mod test {
    use embedded_hal::blocking::i2c::{Write, WriteRead};

    use super::*;

    #[test]
    fn read_status() {
        let mut mock = mock_mlx90641_at_address(0x33);
        let mut buf = [0u8; 2];
        mock.write_read(0x33, &[0x80, 0x00], &mut buf).unwrap();
        assert_eq!(buf, [0x00, 0x08]);
    }

    #[test]
    fn read_past_ram() {
        let mut mock = mock_mlx90641_at_address(0x33);
        let mut buf = [0u8; 4];
        assert_eq!(
            mock.write_read(0x33, &[0x05, 0xBF], &mut buf),
            Err(MockError::IllegalAccess(0x05C0))
        );
    }

    #[test]
    fn status_read_only_bits() {
        let mut mock = mock_mlx90641_at_address(0x33);
        assert_eq!(
            mock.write(0x33, &[0x80, 0x00, 0x00, 0x31]),
            Err(MockError::IllegalWriteValue(0x8000, 0x0031))
        );
        mock.write(0x33, &[0x80, 0x00, 0x00, 0x30]).unwrap();
        assert_eq!(mock.status(), 0x0030);
    }

    #[test]
    fn shared_state() {
        let mock = mock_mlx90641_at_address(0x33);
        let mut clone = mock.clone();
        clone.write(0x33, &[0x80, 0x0D, 0x0D, 0x01]).unwrap();
        assert_eq!(mock.control(), 0x0D01);
        assert_eq!(
            mock.recent_operations().front(),
            Some(&I2cOperation::Write {
                address: 0x800D,
                length: 2
            })
        );
    }
}
