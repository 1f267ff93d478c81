use std::io::Write;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::NamedTempFile;

use rvooo_rust::backend::config::BackendConfig;
use rvooo_rust::backend::scheduler::{Scheduler, SimOptions};

fn addi(rd: u32, imm: u32) -> u32 {
    ((imm & 0xFFF) << 20) | (rd << 7) | 0b0010011
}

fn add(rd: u32, rs1: u32, rs2: u32) -> u32 {
    (rs2 << 20) | (rs1 << 15) | (rd << 7) | 0b0110011
}

/// A dependency chain interleaved with independent work, long enough to keep
/// the backend busy.
fn write_trace(n: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    let mut pc = 0u32;
    for i in 0..n {
        let raw = if i % 3 == 0 {
            addi((i % 30 + 1) as u32, (i % 100) as u32)
        } else {
            add((i % 30 + 1) as u32, ((i + 1) % 30 + 1) as u32, 0)
        };
        writeln!(file, "{:x}: {:08x}  instr", pc, raw).unwrap();
        pc += 4;
    }
    file.flush().unwrap();
    file
}

fn backend_benchmark(c: &mut Criterion) {
    let trace = write_trace(512);
    let mem = NamedTempFile::new().unwrap();

    c.bench_function("backend_drain_512_instructions", |b| {
        b.iter(|| {
            let mut opts = SimOptions::new(
                trace.path().to_path_buf(),
                mem.path().to_path_buf(),
            );
            opts.config = BackendConfig::default();
            let mut scheduler = Scheduler::new(opts).unwrap();
            black_box(scheduler.run().unwrap())
        });
    });
}

criterion_group!(benches, backend_benchmark);
criterion_main!(benches);
