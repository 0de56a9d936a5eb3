// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
#[cfg(feature = "std")]
extern crate std;

use core::fmt;

/// Errors that don't involve the bus.
#[derive(Clone, Debug, PartialEq)]
pub enum LibraryError {
    /// When a value from the sensor is malformed in some way.
    InvalidData(&'static str),

    /// A field descriptor points outside of the EEPROM image.
    AddressOutOfRange(u16),

    /// A two-word field descriptor is wider than 32 bits.
    FieldTooWide(u8),

    /// The EEPROM contains at least one word with more than one flipped bit.
    UncorrectableEeprom,

    /// The calibration data cannot be used with this driver.
    Unusable(&'static str),

    /// The data-ready flag did not settle within the configured number of attempts.
    FrameTimeout,

    /// Temperatures were requested before any frame was read.
    NoFrame,
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryError::InvalidData(msg) => write!(f, "{}", msg),
            LibraryError::AddressOutOfRange(address) => {
                write!(f, "address {:#06X} is outside of the EEPROM", address)
            }
            LibraryError::FieldTooWide(width) => {
                write!(f, "combined field width of {} bits exceeds 32", width)
            }
            LibraryError::UncorrectableEeprom => {
                write!(f, "EEPROM contains uncorrectable errors")
            }
            LibraryError::Unusable(msg) => write!(f, "calibration data is unusable: {}", msg),
            LibraryError::FrameTimeout => write!(f, "timed out waiting for a stable frame"),
            LibraryError::NoFrame => write!(f, "no frame has been read yet"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LibraryError {}

/// Errors from the driver, generic over the transport's error type.
#[derive(Clone, PartialEq)]
pub enum Error<E> {
    /// Errors originating from the transport.
    Transport(E),

    /// Errors originating from within this library.
    Library(LibraryError),
}

impl<E> fmt::Debug for Error<E>
where
    E: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(err) => f.debug_tuple("Error::Transport").field(err).finish(),
            Error::Library(err) => f.debug_tuple("Error::Library").field(err).finish(),
        }
    }
}

impl<E> fmt::Display for Error<E>
where
    E: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(err) => write!(f, "Transport Error: {:?}", err),
            Error::Library(err) => write!(f, "Library Error: {}", err),
        }
    }
}

#[cfg(feature = "std")]
impl<E> std::error::Error for Error<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport(err) => Some(err),
            Error::Library(err) => Some(err),
        }
    }
}

impl<E> From<LibraryError> for Error<E> {
    fn from(lib_err: LibraryError) -> Self {
        Self::Library(lib_err)
    }
}
