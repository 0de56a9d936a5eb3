// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Shared fixtures for testing and benchmarking the `mlx90641` crate.
//!
//! The data here is based on the worked example in the MLX90641 datasheet, with the values the
//! example leaves out filled in so that every word passes its Hamming check.
mod eeprom_data;
pub mod i2c_mock;
mod ram_data;

pub use eeprom_data::{mlx90641_datasheet_eeprom, EEPROM_LENGTH, EEPROM_WORDS};
pub use i2c_mock::{mock_mlx90641_at_address, MockCameraBus, NoDelay};
pub use ram_data::{mlx90641_datasheet_ram, RAM_WORDS};
