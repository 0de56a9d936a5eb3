// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use mlx90641::hamming::decode_image;
use mlx90641::{EepromImage, FromTransport, I2cTransport, Mlx90641Calibration};
use mlx90641_test_data::{mlx90641_datasheet_eeprom, mock_mlx90641_at_address, NoDelay};

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Calibration Loading");

    let eeprom = mlx90641_datasheet_eeprom();
    let raw_image = EepromImage::from_be_bytes(&eeprom).unwrap();
    let mut decoded_image = raw_image.clone();
    decode_image(&mut decoded_image);

    group.bench_function("Hamming decode", |b| {
        b.iter_batched(
            || raw_image.clone(),
            |mut image| decode_image(&mut image),
            BatchSize::SmallInput,
        )
    });
    group.bench_with_input("Extract", &decoded_image, |b, image| {
        b.iter(|| Mlx90641Calibration::from_eeprom(image))
    });
    group.bench_with_input("Decode and extract", &eeprom, |b, eeprom| {
        b.iter(|| {
            let mut image = EepromImage::from_be_bytes(eeprom).unwrap();
            decode_image(&mut image);
            Mlx90641Calibration::from_eeprom(&image)
        })
    });

    let mut transport = I2cTransport::new(mock_mlx90641_at_address(0x33), NoDelay);
    group.bench_function("Read over I2C", |b| {
        b.iter(|| EepromImage::from_transport(&mut transport, 0x33))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
