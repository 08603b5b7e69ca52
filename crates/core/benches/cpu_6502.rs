use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use famicom_cpu::{
    Cpu6502, CpuConfig, FlatMemory, FrameScheduler, InterruptController, InterruptKind,
};

/// Busy loop touching the common addressing modes
const PROGRAM: &[u8] = &[
    0xA9, 0x42, // LDA #$42
    0x8D, 0x00, 0x02, // STA $0200
    0xA2, 0x10, // LDX #$10
    0xA0, 0x20, // LDY #$20
    0xB5, 0x10, // LDA $10,X
    0xBD, 0xF8, 0x02, // LDA $02F8,X (page cross)
    0xB1, 0x40, // LDA ($40),Y
    0xE8, // INX
    0xC8, // INY
    0x69, 0x01, // ADC #$01
    0xE6, 0x30, // INC $30
    0xD0, 0x00, // BNE +0
    0x4C, 0x00, 0x80, // JMP $8000
];

/// Tiny NMI handler: INC $31 ; RTI
const NMI_HANDLER: &[u8] = &[0xE6, 0x31, 0x40];

fn bench_memory() -> FlatMemory {
    let mut mem = FlatMemory::new();
    mem.load_program(0x8000, PROGRAM);
    mem.load(0x9000, NMI_HANDLER);
    mem.set_vector(famicom_cpu::bus::NMI_VECTOR, 0x9000);
    mem.load(0x0040, &[0x00, 0x03]);
    mem
}

fn booted() -> (Cpu6502, FlatMemory) {
    let mut mem = bench_memory();
    let mut cpu = Cpu6502::new(CpuConfig::default());
    cpu.reset(&mut mem);
    (cpu, mem)
}

fn bench_cpu_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_6502_step");

    group.bench_function("single_instruction", |b| {
        let (mut cpu, mut mem) = booted();
        b.iter(|| {
            black_box(cpu.step(&mut mem).ok());
        });
    });

    group.bench_function("single_instruction_with_stats", |b| {
        let mut mem = bench_memory();
        let mut cpu = Cpu6502::new(CpuConfig {
            collect_stats: true,
            ..CpuConfig::default()
        });
        cpu.reset(&mut mem);
        b.iter(|| {
            black_box(cpu.step(&mut mem).ok());
        });
    });

    group.finish();
}

fn bench_cpu_multiple_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_6502_multiple_steps");

    for step_count in [10, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(step_count),
            step_count,
            |b, &count| {
                b.iter(|| {
                    let (mut cpu, mut mem) = booted();
                    for _ in 0..count {
                        let _ = cpu.step(&mut mem);
                    }
                    black_box(cpu.total_cycles());
                });
            },
        );
    }

    group.finish();
}

fn bench_frame(c: &mut Criterion) {
    c.bench_function("cpu_6502_frame", |b| {
        let (mut cpu, mut mem) = booted();
        let mut sched = FrameScheduler::new();
        let mut line = 0u32;
        // 262 lines, NMI at the start of vblank
        let mut sync = |ic: &mut InterruptController| {
            line = (line + 1) % 262;
            if line == 241 {
                ic.request(InterruptKind::Nmi);
            }
            line == 0
        };
        b.iter(|| {
            black_box(sched.run_frame(&mut cpu, &mut mem, &mut sync).ok());
        });
    });
}

fn bench_cpu_reset(c: &mut Criterion) {
    c.bench_function("cpu_6502_reset", |b| {
        let (mut cpu, mut mem) = booted();
        b.iter(|| {
            cpu.reset(&mut mem);
            black_box(cpu.registers().pc);
        });
    });
}

criterion_group!(
    benches,
    bench_cpu_step,
    bench_cpu_multiple_steps,
    bench_frame,
    bench_cpu_reset
);
criterion_main!(benches);
