use criterion::{black_box, criterion_group, criterion_main, Criterion};

use nes_core::config::{Config, Region};
use nes_core::system::NesSystem;

/// NROM image that turns on background rendering and spins
fn spin_rom() -> Vec<u8> {
    let mut image = b"NES\x1A".to_vec();
    image.extend_from_slice(&[1, 0, 0, 0]);
    image.extend_from_slice(&[0; 8]);
    let mut prg = vec![0xEA; 0x4000];
    let code = [
        0xA9, 0x1E, // LDA #$1E
        0x8D, 0x01, 0x20, // STA $2001
        0x4C, 0x05, 0x80, // JMP $8005
    ];
    prg[..code.len()].copy_from_slice(&code);
    prg[0x3FFA..].copy_from_slice(&[0x00, 0x80, 0x00, 0x80, 0x00, 0x80]);
    image.extend_from_slice(&prg);
    image
}

fn bench_frame(c: &mut Criterion) {
    let config = Config {
        region: Region::Ntsc,
        warm_up: false,
    };
    let mut system = NesSystem::with_config(config).unwrap();
    system.load_rom(&spin_rom()).unwrap();

    c.bench_function("run_frame", |b| {
        b.iter(|| {
            system.run_frame();
            black_box(system.frame_buffer()[0])
        })
    });

    c.bench_function("save_state", |b| b.iter(|| black_box(system.save_state().len())));
}

criterion_group!(benches, bench_frame);
criterion_main!(benches);
