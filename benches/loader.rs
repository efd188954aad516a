//! Benchmarks for image loading.
//!
//! Loads a synthetic PE32 image whose import directory carries a few hundred named thunks, with
//! every analyzer enabled and with the minimal preset.

extern crate pescope;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use pescope::{LoaderConfig, PeObject};
use std::hint::black_box;

const SYMBOLS: u32 = 400;

/// Headers, a `.text` page and a 0x4000 byte `.idata` section at RVA 0x2000.
fn build_image() -> Vec<u8> {
    let idata: u32 = 0x2000;
    let mut image = vec![0_u8; 0x400 + 0x200 + 0x4000];

    let put = |image: &mut Vec<u8>, offset: usize, bytes: &[u8]| {
        image[offset..offset + bytes.len()].copy_from_slice(bytes);
    };

    put(&mut image, 0, b"MZ");
    put(&mut image, 0x3C, &0x40_u32.to_le_bytes());
    put(&mut image, 0x40, b"PE\0\0");
    put(&mut image, 0x44, &0x014C_u16.to_le_bytes());
    put(&mut image, 0x46, &2_u16.to_le_bytes());
    put(&mut image, 0x54, &224_u16.to_le_bytes());
    put(&mut image, 0x56, &0x0102_u16.to_le_bytes());

    let optional = 0x58;
    put(&mut image, optional, &0x10B_u16.to_le_bytes());
    put(&mut image, optional + 16, &0x1000_u32.to_le_bytes());
    put(&mut image, optional + 28, &0x0040_0000_u32.to_le_bytes());
    put(&mut image, optional + 32, &0x1000_u32.to_le_bytes());
    put(&mut image, optional + 36, &0x200_u32.to_le_bytes());
    put(&mut image, optional + 56, &0x6000_u32.to_le_bytes());
    put(&mut image, optional + 60, &0x400_u32.to_le_bytes());
    put(&mut image, optional + 92, &16_u32.to_le_bytes());
    put(&mut image, optional + 104, &idata.to_le_bytes());
    put(&mut image, optional + 108, &40_u32.to_le_bytes());

    let sections = optional + 224;
    put(&mut image, sections, b".text\0\0\0");
    put(&mut image, sections + 8, &0x100_u32.to_le_bytes());
    put(&mut image, sections + 12, &0x1000_u32.to_le_bytes());
    put(&mut image, sections + 16, &0x200_u32.to_le_bytes());
    put(&mut image, sections + 20, &0x400_u32.to_le_bytes());
    put(&mut image, sections + 36, &0x6000_0020_u32.to_le_bytes());
    put(&mut image, sections + 40, b".idata\0\0");
    put(&mut image, sections + 48, &0x4000_u32.to_le_bytes());
    put(&mut image, sections + 52, &idata.to_le_bytes());
    put(&mut image, sections + 56, &0x4000_u32.to_le_bytes());
    put(&mut image, sections + 60, &0x600_u32.to_le_bytes());
    put(&mut image, sections + 76, &0xC000_0040_u32.to_le_bytes());

    let at = |rva: u32| 0x600 + (rva - idata) as usize;
    let lookup = idata + 0x100;
    let iat = idata + 0x800;
    let names = idata + 0x1000;

    put(&mut image, at(idata), &lookup.to_le_bytes());
    put(&mut image, at(idata + 12), &(idata + 0x40).to_le_bytes());
    put(&mut image, at(idata + 16), &iat.to_le_bytes());
    put(&mut image, at(idata + 0x40), b"kernel32.dll\0");

    for index in 0..SYMBOLS {
        let hint_name = names + index * 0x10;
        put(&mut image, at(lookup + index * 4), &hint_name.to_le_bytes());
        put(&mut image, at(iat + index * 4), &hint_name.to_le_bytes());
        put(
            &mut image,
            at(hint_name + 2),
            format!("Function{index:04}\0").as_bytes(),
        );
    }

    image
}

fn bench_load(c: &mut Criterion) {
    let data = build_image();

    let mut group = c.benchmark_group("load");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("comprehensive", |b| {
        b.iter(|| {
            let object = PeObject::from_mem(black_box(data.clone())).unwrap();
            black_box(object)
        });
    });
    group.bench_function("minimal", |b| {
        b.iter(|| {
            let object =
                PeObject::from_mem_with_config(black_box(data.clone()), LoaderConfig::minimal())
                    .unwrap();
            black_box(object)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_load);
criterion_main!(benches);
