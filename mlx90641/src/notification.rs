// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Compact summaries of a temperature frame for low-bandwidth links.
//!
//! These records are built by the caller after
//! [`calculate_temps`][crate::Mlx90641Sensor::calculate_temps], and are little-endian so they can
//! be handed to a radio stack as-is. Temperatures are in tenths of a degree Celsius, truncated
//! towards zero.
use crate::{HEIGHT, NUM_PIXELS, WIDTH};

/// The number of temperatures in each [`ColumnPacket`].
pub const COLUMNS_PER_PACKET: usize = 8;

/// The number of [`ColumnPacket`]s needed for a frame.
pub const COLUMN_PACKETS: usize = WIDTH / COLUMNS_PER_PACKET;

/// The number of pairs of rows in a frame.
pub const ROW_PAIRS: usize = HEIGHT / 2;

/// Scale a temperature to tenths of a degree.
///
/// Out of range values saturate, and NaN becomes 0.
fn scaled(temperature: f32) -> i16 {
    (temperature * 10f32) as i16
}

/// The average temperature of each column.
pub fn column_averages(temperatures: &[f32; NUM_PIXELS]) -> [f32; WIDTH] {
    let mut averages = [0f32; WIDTH];
    for row in temperatures.chunks_exact(WIDTH) {
        averages
            .iter_mut()
            .zip(row)
            .for_each(|(average, temperature)| *average += temperature);
    }
    averages
        .iter_mut()
        .for_each(|average| *average /= HEIGHT as f32);
    averages
}

/// Half of the column averages for a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ColumnPacket {
    pub protocol: u8,

    /// Which half of the columns this packet has.
    pub packet_id: u8,

    pub reserved: u8,

    pub temperatures: [i16; COLUMNS_PER_PACKET],
}

impl ColumnPacket {
    /// The length of the encoded packet, in bytes.
    pub const LENGTH: usize = 3 + COLUMNS_PER_PACKET * 2;

    /// Split the averages from [`column_averages`] into packets.
    pub fn from_averages(protocol: u8, averages: &[f32; WIDTH]) -> [Self; COLUMN_PACKETS] {
        let mut packets = [Self::default(); COLUMN_PACKETS];
        for (packet_id, (packet, columns)) in packets
            .iter_mut()
            .zip(averages.chunks_exact(COLUMNS_PER_PACKET))
            .enumerate()
        {
            packet.protocol = protocol;
            packet.packet_id = packet_id as u8;
            packet
                .temperatures
                .iter_mut()
                .zip(columns)
                .for_each(|(dest, average)| *dest = scaled(*average));
        }
        packets
    }

    pub fn to_le_bytes(&self) -> [u8; Self::LENGTH] {
        let mut bytes = [0u8; Self::LENGTH];
        bytes[0] = self.protocol;
        bytes[1] = self.packet_id;
        bytes[2] = self.reserved;
        bytes[3..]
            .chunks_exact_mut(2)
            .zip(self.temperatures.iter())
            .for_each(|(dest, temperature)| dest.copy_from_slice(&temperature.to_le_bytes()));
        bytes
    }
}

/// Row averages for a frame, grouped into pairs of rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RowPairAverages {
    /// The averages of rows 0, 2, 4, and so on.
    pub even: [i16; ROW_PAIRS],

    /// The averages of rows 1, 3, 5, and so on.
    pub odd: [i16; ROW_PAIRS],

    /// The larger of the two averages in each pair.
    pub max: [i16; ROW_PAIRS],
}

/// Average each row, in tenths of a degree.
pub fn row_pair_averages(temperatures: &[f32; NUM_PIXELS]) -> RowPairAverages {
    let mut averages = RowPairAverages::default();
    let row_average = |row: &[f32]| scaled(row.iter().sum::<f32>() / WIDTH as f32);
    for (pair, rows) in temperatures.chunks_exact(WIDTH * 2).enumerate() {
        let (even, odd) = rows.split_at(WIDTH);
        averages.even[pair] = row_average(even);
        averages.odd[pair] = row_average(odd);
        averages.max[pair] = averages.even[pair].max(averages.odd[pair]);
    }
    averages
}

/// One set of row averages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RowPairPacket {
    pub protocol: u8,

    pub temperatures: [i16; ROW_PAIRS],
}

impl RowPairPacket {
    /// The length of the encoded packet, in bytes.
    pub const LENGTH: usize = 4 + ROW_PAIRS * 2;

    /// Build the even, odd and max packets, in that order.
    pub fn from_averages(protocol: u8, averages: &RowPairAverages) -> [Self; 3] {
        [averages.even, averages.odd, averages.max].map(|temperatures| Self {
            protocol,
            temperatures,
        })
    }

    /// Encode the packet. The three bytes after the protocol are padding.
    pub fn to_le_bytes(&self) -> [u8; Self::LENGTH] {
        let mut bytes = [0u8; Self::LENGTH];
        bytes[0] = self.protocol;
        bytes[4..]
            .chunks_exact_mut(2)
            .zip(self.temperatures.iter())
            .for_each(|(dest, temperature)| dest.copy_from_slice(&temperature.to_le_bytes()));
        bytes
    }
}
