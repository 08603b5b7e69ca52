//! End-to-end behavior of the CPU against the bus contract and the
//! documented fixtures.

use famicom_cpu::bus::{IRQ_VECTOR, NMI_VECTOR};
use famicom_cpu::{
    Bus, Cpu6502, CpuConfig, CpuError, Diagnostic, DiagnosticSink, Flag, FlatMemory,
    FrameScheduler, IllegalOpcodePolicy, Instruction, InterruptController, InterruptKind,
    ScanlineSync, Severity,
};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read(u16),
    Write(u16, u8),
}

/// Flat memory that records every access
struct RecordingBus {
    mem: FlatMemory,
    log: Vec<Access>,
}

impl RecordingBus {
    fn with_program(program: &[u8]) -> Self {
        let mut mem = FlatMemory::new();
        mem.load_program(0x8000, program);
        Self { mem, log: Vec::new() }
    }
}

impl Bus for RecordingBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.log.push(Access::Read(addr));
        self.mem.read(addr)
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.log.push(Access::Write(addr, value));
        self.mem.write(addr, value);
    }
}

#[derive(Default, Clone)]
struct RecordingSink(Rc<RefCell<Vec<Diagnostic>>>);

impl DiagnosticSink for RecordingSink {
    fn report(&mut self, diagnostic: &Diagnostic) {
        self.0.borrow_mut().push(diagnostic.clone());
    }
}

fn boot(program: &[u8]) -> (Cpu6502, FlatMemory) {
    let mut mem = FlatMemory::new();
    mem.load_program(0x8000, program);
    let mut cpu = Cpu6502::new(CpuConfig::default());
    cpu.reset(&mut mem);
    (cpu, mem)
}

#[test]
fn reset_reads_only_the_vector() {
    let mut bus = RecordingBus::with_program(&[0xEA]);
    let mut cpu = Cpu6502::default();
    cpu.reset(&mut bus);
    assert_eq!(bus.log, vec![Access::Read(0xFFFC), Access::Read(0xFFFD)]);
}

#[test]
fn store_writes_exactly_once() {
    // LDA #$42 ; STA $0200
    let mut bus = RecordingBus::with_program(&[0xA9, 0x42, 0x8D, 0x00, 0x02]);
    let mut cpu = Cpu6502::default();
    cpu.reset(&mut bus);
    cpu.step(&mut bus).unwrap();
    bus.log.clear();
    cpu.step(&mut bus).unwrap();
    let writes: Vec<_> = bus
        .log
        .iter()
        .filter(|a| matches!(a, Access::Write(..)))
        .collect();
    assert_eq!(writes, vec![&Access::Write(0x0200, 0x42)]);
}

#[test]
fn read_modify_write_touches_target_once_each_way() {
    // INC $0300
    let mut bus = RecordingBus::with_program(&[0xEE, 0x00, 0x03]);
    bus.mem.write(0x0300, 0x7F);
    let mut cpu = Cpu6502::default();
    cpu.reset(&mut bus);
    bus.log.clear();
    cpu.step(&mut bus).unwrap();
    let target: Vec<_> = bus
        .log
        .iter()
        .copied()
        .filter(|a| matches!(a, Access::Read(0x0300) | Access::Write(0x0300, _)))
        .collect();
    assert_eq!(target, vec![Access::Read(0x0300), Access::Write(0x0300, 0x80)]);
}

#[test]
fn register_only_instructions_fetch_just_the_opcode() {
    let opcodes = [
        0xAA, 0xA8, 0x8A, 0x98, 0xBA, 0x9A, // TAX TAY TXA TYA TSX TXS
        0xE8, 0xC8, 0xCA, 0x88, // INX INY DEX DEY
        0x18, 0x38, 0x58, 0x78, 0xD8, 0xF8, 0xB8, // CLC SEC CLI SEI CLD SED CLV
        0xEA, // NOP
        0x0A, 0x4A, 0x2A, 0x6A, // ASL A, LSR A, ROL A, ROR A
    ];
    for opcode in opcodes {
        let mut bus = RecordingBus::with_program(&[opcode]);
        let mut cpu = Cpu6502::default();
        cpu.reset(&mut bus);
        bus.log.clear();
        cpu.step(&mut bus).unwrap();
        assert_eq!(bus.log, vec![Access::Read(0x8000)], "opcode ${:02X}", opcode);
    }
}

#[test]
fn cmp_fixture() {
    for (operand, carry, zero, negative) in [
        (0x30, true, false, false),
        (0x50, true, true, false),
        (0x60, false, false, true),
    ] {
        let (mut cpu, mut mem) = boot(&[0xA9, 0x50, 0xC9, operand]);
        cpu.step(&mut mem).unwrap();
        cpu.step(&mut mem).unwrap();
        let p = cpu.registers().p;
        assert_eq!(p.test(Flag::Carry), carry);
        assert_eq!(p.test(Flag::Zero), zero);
        assert_eq!(p.test(Flag::Negative), negative);
    }
}

#[test]
fn jsr_rts_fixture() {
    let (mut cpu, mut mem) = boot(&[0x20, 0x34, 0x12]);
    mem.write(0x1234, 0x60);
    cpu.step(&mut mem).unwrap();
    cpu.step(&mut mem).unwrap();
    assert_eq!(cpu.registers().pc, 0x8003);
}

#[test]
fn jmp_indirect_fixture() {
    let (mut cpu, mut mem) = boot(&[0x6C, 0xFF, 0x30]);
    mem.write(0x30FF, 0x80);
    mem.write(0x3000, 0x50);
    mem.write(0x3100, 0x40);
    cpu.step(&mut mem).unwrap();
    assert_eq!(cpu.registers().pc, 0x5080);
}

#[test]
fn adc_overflow_fixture() {
    let (mut cpu, mut mem) = boot(&[0xA9, 0xFF, 0x69, 0x01]);
    cpu.step(&mut mem).unwrap();
    cpu.step(&mut mem).unwrap();
    let r = cpu.registers();
    assert_eq!(r.a, 0);
    assert!(r.p.test(Flag::Carry));
    assert!(r.p.test(Flag::Zero));
}

#[test]
fn nmi_preempts_while_irq_is_masked() {
    // SEI ; NOP ; NOP
    let (mut cpu, mut mem) = boot(&[0x78, 0xEA, 0xEA]);
    mem.set_vector(NMI_VECTOR, 0x9000);
    mem.set_vector(IRQ_VECTOR, 0xA000);
    mem.write(0x9000, 0xEA);
    mem.write(0xA000, 0xEA);
    cpu.step(&mut mem).unwrap();

    cpu.request_interrupt(InterruptKind::Irq);
    cpu.step(&mut mem).unwrap();
    assert_eq!(cpu.registers().pc, 0x8002);

    cpu.request_interrupt(InterruptKind::Nmi);
    cpu.step(&mut mem).unwrap();
    assert_eq!(cpu.registers().pc, 0x9001);
}

#[test]
fn php_plp_preserves_flags() {
    // SEC ; SEI ; PHP ; CLC ; CLI ; PLP
    let (mut cpu, mut mem) = boot(&[0x38, 0x78, 0x08, 0x18, 0x58, 0x28]);
    for _ in 0..3 {
        cpu.step(&mut mem).unwrap();
    }
    let before = cpu.registers().p;
    for _ in 0..3 {
        cpu.step(&mut mem).unwrap();
    }
    let after = cpu.registers().p;
    assert_eq!(after.bits(), before.bits() | 0x10);
    assert!(after.test(Flag::Reserved));
}

#[test]
fn irq_handler_returns_to_interrupted_code() {
    // CLI ; INX ; INX ; INX
    let (mut cpu, mut mem) = boot(&[0x58, 0xE8, 0xE8, 0xE8]);
    mem.set_vector(IRQ_VECTOR, 0xA000);
    // INY ; RTI
    mem.load(0xA000, &[0xC8, 0x40]);
    cpu.step(&mut mem).unwrap();
    cpu.step(&mut mem).unwrap();
    cpu.request_interrupt(InterruptKind::Irq);
    // 7 + INY
    assert_eq!(cpu.step(&mut mem), Ok(9));
    cpu.step(&mut mem).unwrap();
    assert_eq!(cpu.registers().pc, 0x8002);
    assert!(!cpu.registers().p.test(Flag::InterruptDisable));
    cpu.step(&mut mem).unwrap();
    cpu.step(&mut mem).unwrap();
    assert_eq!((cpu.registers().x, cpu.registers().y), (3, 1));
}

#[test]
fn diagnostics_flow_through_one_sink() {
    let sink = RecordingSink::default();
    let config = CpuConfig {
        strict_address_wrap: true,
        ..CpuConfig::default()
    };
    // illegal $02 ; RTS with an empty stack
    let mut mem = FlatMemory::new();
    mem.load_program(0x8000, &[0x02, 0x60]);
    let mut cpu = Cpu6502::new(config);
    cpu.set_diagnostic_sink(Box::new(sink.clone()));
    cpu.reset(&mut mem);

    assert_eq!(cpu.step(&mut mem), Ok(2));
    assert!(matches!(
        cpu.step(&mut mem),
        Err(CpuError::Fatal(Diagnostic::StackUnderflow { pc: 0x8001 }))
    ));

    let seen = sink.0.borrow();
    let severities: Vec<Severity> = seen.iter().map(Diagnostic::severity).collect();
    assert_eq!(severities, vec![Severity::Recoverable, Severity::Fatal]);
}

#[test]
fn halted_cpu_resumes_after_latched_reset() {
    let config = CpuConfig {
        illegal_opcode: IllegalOpcodePolicy::Halt,
        ..CpuConfig::default()
    };
    let mut mem = FlatMemory::new();
    mem.load_program(0x8000, &[0xEA, 0x02]);
    let mut cpu = Cpu6502::new(config);
    cpu.reset(&mut mem);
    cpu.step(&mut mem).unwrap();
    assert!(cpu.step(&mut mem).is_err());
    assert!(cpu.is_jammed());

    cpu.request_interrupt(InterruptKind::Reset);
    assert_eq!(cpu.step(&mut mem), Ok(9));
    assert!(!cpu.is_jammed());
    assert_eq!(cpu.registers().pc, 0x8001);
}

/// Counts lines; raises NMI at line 241 of a 262-line frame
struct Video {
    line: u32,
}

impl ScanlineSync for Video {
    fn step_scanline(&mut self, interrupts: &mut InterruptController) -> bool {
        self.line = (self.line + 1) % 262;
        if self.line == 241 {
            interrupts.request(InterruptKind::Nmi);
        }
        self.line == 0
    }
}

#[test]
fn frame_loop_drives_nmi_handler() {
    // main: JMP $8000 ; NMI handler: INC $10 ; RTI
    let (mut cpu, mut mem) = boot(&[0x4C, 0x00, 0x80]);
    mem.set_vector(NMI_VECTOR, 0x9000);
    mem.load(0x9000, &[0xE6, 0x10, 0x40]);
    let mut sched = FrameScheduler::new();
    let mut video = Video { line: 0 };

    for frame in 1..=3u8 {
        let report = sched.run_frame(&mut cpu, &mut mem, &mut video).unwrap();
        assert_eq!(report.scanlines, 262);
        assert_eq!(mem.peek(0x0010), frame);
    }
    assert_eq!(sched.frames(), 3);
    assert!(sched.residual() <= sched.budget() + 7);
}

#[test]
fn frame_cycles_are_conserved_across_frames() {
    let (mut cpu, mut mem) = boot(&[0x4C, 0x00, 0x80]);
    let mut sched = FrameScheduler::new();
    let mut video = Video { line: 0 };
    let mut total = 0;
    for _ in 0..4 {
        total += sched.run_frame(&mut cpu, &mut mem, &mut video).unwrap().cycles;
    }
    assert_eq!(total, cpu.total_cycles());
    assert_eq!(
        total,
        4 * 262 * sched.budget() as u64 + sched.residual() as u64
    );
}

#[test]
fn stats_track_a_small_loop() {
    let config = CpuConfig {
        collect_stats: true,
        ..CpuConfig::default()
    };
    // LDX #$05 ; DEX ; BNE -3
    let mut mem = FlatMemory::new();
    mem.load_program(0x8000, &[0xA2, 0x05, 0xCA, 0xD0, 0xFD]);
    let mut cpu = Cpu6502::new(config);
    cpu.reset(&mut mem);
    for _ in 0..11 {
        cpu.step(&mut mem).unwrap();
    }
    let stats = cpu.stats();
    assert_eq!(stats.count(Instruction::Dex), 5);
    assert_eq!(stats.count(Instruction::Bne), 5);
    assert_eq!(stats.busiest(1)[0].1, 5);
    assert_eq!(stats.to_json()["instructions"], 11);
}
