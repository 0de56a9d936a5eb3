// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
use std::env;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

use anyhow::{bail, Context};
use linux_embedded_hal::{Delay, I2cdev};
use mlx90641::{
    Error, I2cTransport, LibraryError, LogFacade, Mlx90641Sensor, SensorConfig, DEFAULT_ADDRESS,
    WIDTH,
};

/// How many frames to try before giving up.
const MAX_FRAMES: usize = 10;

fn parse_address(argument: &str) -> anyhow::Result<u8> {
    let address = match argument.strip_prefix("0x") {
        Some(hex_digits) => u8::from_str_radix(hex_digits, 16)?,
        None => argument.parse()?,
    };
    Ok(address)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env().init();
    let args: Vec<String> = env::args().collect();
    let (bus_path, address) = match args.len() {
        2 => (Path::new(&args[1]), DEFAULT_ADDRESS),
        3 => (Path::new(&args[1]), parse_address(&args[2])?),
        _ => bail!("Usage: {} <I2C bus> [sensor address]", args[0]),
    };
    let bus = I2cdev::new(bus_path)
        .with_context(|| format!("{} needs to be an I2C controller", bus_path.display()))?;
    let transport = I2cTransport::new(bus, Delay);
    let config = SensorConfig {
        address,
        ..SensorConfig::default()
    };
    let mut sensor = Mlx90641Sensor::init(transport, LogFacade, config)?;
    // At 32 FPS this is a little under two frames.
    let delay = Duration::from_millis(50);
    for _ in 0..MAX_FRAMES {
        match sensor.read_frame() {
            Ok(_) => {
                sensor.calculate_temps()?;
                print_temperatures(sensor.temperatures());
                println!("Ambient: {:.2}°C", sensor.ambient_temperature());
                return Ok(());
            }
            Err(Error::Library(LibraryError::FrameTimeout)) => sleep(delay),
            Err(err) => return Err(err.into()),
        }
    }
    bail!("No frame was available after {} attempts", MAX_FRAMES)
}

fn print_temperatures(temperatures: &[f32]) {
    for row in temperatures.chunks(WIDTH) {
        for temperature in row {
            print!("{:6.2} ", temperature);
        }
        println!();
    }
}
