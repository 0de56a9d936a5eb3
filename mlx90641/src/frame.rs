// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Acquiring raw frames from the sensor.
//!
//! The MLX90641 keeps both subpages in RAM at once, interleaved in blocks of 32 words. A frame is
//! acquired by waiting for the data-ready flag, acknowledging it, copying the six pixel blocks for
//! the subpage that was just measured along with the shared auxiliary block, then checking that
//! the sensor didn't start writing a new measurement while that was happening.
use crate::address::RamAddress;
use crate::error::{Error, LibraryError};
use crate::register::{ControlRegister, Register, StatusRegister, Subpage};
use crate::transport::Transport;
use crate::util::signed_word;
use crate::NUM_PIXELS;

/// The number of words in a [`FrameBuffer`].
pub const FRAME_LENGTH: usize = 834;

/// The number of words read for each pixel block.
pub const WINDOW_WORDS: usize = 32;

const PIXEL_WINDOWS: usize = NUM_PIXELS / WINDOW_WORDS;

/// The distance between the start of two pixel blocks for the same subpage.
const WINDOW_STRIDE: u16 = (WINDOW_WORDS * 2) as u16;

/// Where the auxiliary block starts in the buffer.
const TAIL_OFFSET: usize = NUM_PIXELS;

/// The number of words in the auxiliary block.
pub const TAIL_WORDS: usize = 48;

const CONTROL_OFFSET: usize = TAIL_OFFSET + TAIL_WORDS;

const SUBPAGE_OFFSET: usize = CONTROL_OFFSET + 1;

/// The default number of attempts [`FrameReader`] makes.
pub const DEFAULT_MAX_ATTEMPTS: u8 = 5;

const fn tail_index(address: RamAddress) -> usize {
    TAIL_OFFSET + (address as usize - RamAddress::AmbientTemperatureVoltageBe as usize)
}

/// Raw words copied out of the sensor's RAM for one subpage.
///
/// The pixel data is first, followed by the auxiliary block starting at
/// [`RamAddress::AmbientTemperatureVoltageBe`], then the value of the control register and the
/// subpage the pixels were read for.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameBuffer {
    words: [u16; FRAME_LENGTH],
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self {
            words: [0u16; FRAME_LENGTH],
        }
    }
}

impl FrameBuffer {
    /// Assemble a frame from its parts, for when the RAM has been retrieved some other way.
    pub fn from_parts(
        pixels: &[u16; NUM_PIXELS],
        tail: &[u16; TAIL_WORDS],
        control: u16,
        subpage: Subpage,
    ) -> Self {
        let mut frame = Self::default();
        frame.pixels_mut().copy_from_slice(pixels);
        frame.tail_mut().copy_from_slice(tail);
        frame.set_trailer(control, subpage);
        frame
    }

    pub fn words(&self) -> &[u16; FRAME_LENGTH] {
        &self.words
    }

    /// The raw pixel values, in row-major order.
    pub fn pixels(&self) -> &[u16] {
        &self.words[..NUM_PIXELS]
    }

    fn pixels_mut(&mut self) -> &mut [u16] {
        &mut self.words[..NUM_PIXELS]
    }

    fn tail_mut(&mut self) -> &mut [u16] {
        &mut self.words[TAIL_OFFSET..CONTROL_OFFSET]
    }

    fn window_mut(&mut self, window: usize) -> &mut [u16] {
        let start = window * WINDOW_WORDS;
        &mut self.words[start..(start + WINDOW_WORDS)]
    }

    fn set_trailer(&mut self, control: u16, subpage: Subpage) {
        let subpage: usize = subpage.into();
        self.words[CONTROL_OFFSET] = control;
        self.words[SUBPAGE_OFFSET] = subpage as u16;
    }

    /// A single pixel, as the signed value the sensor reports.
    pub fn pixel(&self, index: usize) -> i16 {
        signed_word(self.words[index])
    }

    /// V<sub>BE</sub>
    pub fn ambient_voltage_be(&self) -> i16 {
        signed_word(self.words[tail_index(RamAddress::AmbientTemperatureVoltageBe)])
    }

    /// The compensation pixel.
    ///
    /// The same RAM location is used for both subpages.
    pub fn compensation_pixel(&self) -> i16 {
        signed_word(self.words[tail_index(RamAddress::CompensationPixel)])
    }

    pub fn gain(&self) -> i16 {
        signed_word(self.words[tail_index(RamAddress::Gain)])
    }

    /// V<sub>PTAT</sub>
    pub fn ambient_voltage_ptat(&self) -> i16 {
        signed_word(self.words[tail_index(RamAddress::AmbientTemperatureVoltage)])
    }

    /// V<sub>DD<sub>pix</sub></sub>
    pub fn supply_voltage(&self) -> i16 {
        signed_word(self.words[tail_index(RamAddress::PixelSupplyVoltage)])
    }

    /// The control register at the time the frame was read.
    pub fn control(&self) -> ControlRegister {
        ControlRegister::from(self.words[CONTROL_OFFSET])
    }

    pub fn subpage(&self) -> Subpage {
        Subpage::from_bit(self.words[SUBPAGE_OFFSET] & 0x0001 != 0)
    }
}

/// The frame acquisition protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameReader {
    address: u8,
    max_attempts: u8,
}

impl FrameReader {
    pub fn new(address: u8, max_attempts: u8) -> Self {
        Self {
            address,
            max_attempts,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn max_attempts(&self) -> u8 {
        self.max_attempts
    }

    fn status<T: Transport>(&self, transport: &mut T) -> Result<StatusRegister, Error<T::Error>> {
        let mut raw = [0u16];
        transport
            .read(self.address, StatusRegister::ADDRESS, &mut raw)
            .map_err(Error::Transport)?;
        Ok(StatusRegister::from(raw[0]))
    }

    /// Poll the status register until there's new data, giving up after `max_attempts` polls.
    fn wait_for_data<T: Transport>(
        &self,
        transport: &mut T,
    ) -> Result<StatusRegister, Error<T::Error>> {
        for _ in 0..self.max_attempts {
            let status = self.status(transport)?;
            if status.new_data() {
                return Ok(status);
            }
        }
        Err(LibraryError::FrameTimeout.into())
    }

    fn read_subpage<T: Transport>(
        &self,
        transport: &mut T,
        subpage: Subpage,
        frame: &mut FrameBuffer,
    ) -> Result<(), Error<T::Error>> {
        let subpage_offset = if subpage == Subpage::One {
            WINDOW_WORDS as u16
        } else {
            0
        };
        for window in 0..PIXEL_WINDOWS {
            let register = RamAddress::Base + (window as u16 * WINDOW_STRIDE + subpage_offset);
            transport
                .read(self.address, register, frame.window_mut(window))
                .map_err(Error::Transport)?;
        }
        transport
            .read(
                self.address,
                RamAddress::AmbientTemperatureVoltageBe.into(),
                frame.tail_mut(),
            )
            .map_err(Error::Transport)
    }

    /// Wait for a new measurement, then copy it into `frame`.
    ///
    /// The returned subpage is the one the pixel data was read for. If the sensor still reports
    /// new data after `max_attempts` copies, the frame is abandoned with
    /// [`LibraryError::FrameTimeout`]. Bus errors are returned immediately.
    pub fn read<T: Transport>(
        &self,
        transport: &mut T,
        frame: &mut FrameBuffer,
    ) -> Result<Subpage, Error<T::Error>> {
        let mut status = self.wait_for_data(transport)?;
        for _ in 0..self.max_attempts {
            let subpage = status.last_updated_subpage();
            let acknowledge = StatusRegister::acknowledge(subpage).merge_writable(status.into());
            transport
                .write(self.address, StatusRegister::ADDRESS, acknowledge)
                .map_err(Error::Transport)?;
            self.read_subpage(transport, subpage, frame)?;
            status = self.status(transport)?;
            if !status.new_data() {
                let mut control = [0u16];
                transport
                    .read(self.address, ControlRegister::ADDRESS, &mut control)
                    .map_err(Error::Transport)?;
                frame.set_trailer(control[0], subpage);
                return Ok(subpage);
            }
        }
        Err(LibraryError::FrameTimeout.into())
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new(crate::DEFAULT_ADDRESS, DEFAULT_MAX_ATTEMPTS)
    }
}
