//! CPU tests for the NES emulator

use nes_core::config::Region;
use nes_core::cpu::interrupt::{Interrupt, IrqLine};
use nes_core::cpu::table::{decode, AddressingMode, Opcode};
use nes_core::cpu::{Bus, Cpu, StatusFlags, IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR};

/// Flat memory above $2000 that records OAM DMA traffic
struct TestBus {
    memory: Vec<u8>,
    dma: Option<u8>,
    oam_writes: Vec<u8>,
}

impl TestBus {
    fn new(program: &[u8]) -> Self {
        let mut memory = vec![0; 0x10000];
        memory[0x8000..0x8000 + program.len()].copy_from_slice(program);
        let mut bus = Self {
            memory,
            dma: None,
            oam_writes: Vec::new(),
        };
        bus.set_vector(RESET_VECTOR, 0x8000);
        bus
    }

    fn set_vector(&mut self, vector: u16, target: u16) {
        self.memory[vector as usize] = target as u8;
        self.memory[vector as usize + 1] = (target >> 8) as u8;
    }
}

impl Bus for TestBus {
    fn read(&mut self, address: u16, _cycle: u64) -> Option<u8> {
        Some(self.memory[address as usize])
    }

    fn write(&mut self, address: u16, value: u8, _cycle: u64) {
        match address {
            0x2004 => self.oam_writes.push(value),
            0x4014 => self.dma = Some(value),
            _ => self.memory[address as usize] = value,
        }
    }

    fn sync(&mut self, _cycle: u64, _interrupt: &mut Interrupt) {}

    fn take_dma(&mut self) -> Option<u8> {
        self.dma.take()
    }
}

fn boot(program: &[u8]) -> (Cpu, TestBus) {
    let mut bus = TestBus::new(program);
    let mut cpu = Cpu::new(Region::Ntsc).unwrap();
    cpu.reset(&mut bus, true);
    (cpu, bus)
}

/// Step once and return the CPU cycles taken
fn step(cpu: &mut Cpu, bus: &mut TestBus) -> u64 {
    let before = cpu.elapsed_cycles();
    cpu.step(bus);
    cpu.elapsed_cycles() - before
}

#[test]
fn test_cpu_reset() {
    let (cpu, _) = boot(&[]);
    assert_eq!(cpu.registers().a, 0);
    assert_eq!(cpu.registers().x, 0);
    assert_eq!(cpu.registers().y, 0);
    assert_eq!(cpu.registers().sp, 0xFD);
    assert_eq!(cpu.registers().pc, 0x8000);
    assert_eq!(cpu.elapsed_cycles(), 7);
}

#[test]
fn test_soft_reset_drops_stack_pointer() {
    let (mut cpu, mut bus) = boot(&[0xA2, 0x42]);
    cpu.step(&mut bus);
    cpu.reset(&mut bus, false);
    assert_eq!(cpu.registers().sp, 0xFA);
    assert_eq!(cpu.registers().x, 0x42);
    assert!(cpu.status().interrupt());
}

#[test]
fn test_lda_immediate_sets_flags() {
    let (mut cpu, mut bus) = boot(&[0xA9, 0x80]);
    assert_eq!(step(&mut cpu, &mut bus), 2);
    assert_eq!(cpu.registers().a, 0x80);
    assert!(cpu.status().negative());
    assert!(!cpu.status().zero());
}

#[test]
fn test_adc_sets_overflow() {
    // LDA #$50; ADC #$50
    let (mut cpu, mut bus) = boot(&[0xA9, 0x50, 0x69, 0x50]);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.registers().a, 0xA0);
    assert!(cpu.status().overflow());
    assert!(cpu.status().negative());
    assert!(!cpu.status().carry());
}

#[test]
fn test_sbc_borrow() {
    // SEC; LDA #$00; SBC #$01
    let (mut cpu, mut bus) = boot(&[0x38, 0xA9, 0x00, 0xE9, 0x01]);
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.registers().a, 0xFF);
    assert!(!cpu.status().carry());
    assert!(cpu.status().negative());
}

#[test]
fn test_decimal_flag_is_ignored() {
    // SED; LDA #$09; ADC #$01
    let (mut cpu, mut bus) = boot(&[0xF8, 0xA9, 0x09, 0x69, 0x01]);
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert!(cpu.status().decimal());
    assert_eq!(cpu.registers().a, 0x0A);
}

#[test]
fn test_page_cross_penalty() {
    // LDX #$01; LDA $8000,X; LDA $80FF,X; STA $80FF,X
    let (mut cpu, mut bus) = boot(&[0xA2, 0x01, 0xBD, 0x00, 0x80, 0xBD, 0xFF, 0x80, 0x9D, 0xFF, 0x80]);
    cpu.step(&mut bus);
    assert_eq!(step(&mut cpu, &mut bus), 4);
    assert_eq!(step(&mut cpu, &mut bus), 5);
    assert_eq!(step(&mut cpu, &mut bus), 5);
}

#[test]
fn test_branch_cycles() {
    // CLC; BCS +2 (not taken); BCC +0 (taken); BCC -> page cross
    let mut program = vec![0x18, 0xB0, 0x02, 0x90, 0x00];
    program.resize(0xF0, 0xEA);
    program.extend_from_slice(&[0x90, 0x20]);
    let (mut cpu, mut bus) = boot(&program);
    cpu.step(&mut bus);
    assert_eq!(step(&mut cpu, &mut bus), 2);
    assert_eq!(step(&mut cpu, &mut bus), 3);
    cpu.registers_mut().pc = 0x80F0;
    assert_eq!(step(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.registers().pc, 0x8112);
}

#[test]
fn test_jsr_rts() {
    // JSR $8010; ... $8010: RTS
    let mut program = vec![0x20, 0x10, 0x80];
    program.resize(0x10, 0xEA);
    program.push(0x60);
    let (mut cpu, mut bus) = boot(&program);
    assert_eq!(step(&mut cpu, &mut bus), 6);
    assert_eq!(cpu.registers().pc, 0x8010);
    assert_eq!(cpu.peek_ram(0x01FD), 0x80);
    assert_eq!(cpu.peek_ram(0x01FC), 0x02);
    assert_eq!(step(&mut cpu, &mut bus), 6);
    assert_eq!(cpu.registers().pc, 0x8003);
    assert_eq!(cpu.registers().sp, 0xFD);
}

#[test]
fn test_indirect_jump_page_wrap() {
    // JMP ($02FF) takes its high byte from $0200
    let (mut cpu, mut bus) = boot(&[0x6C, 0xFF, 0x02]);
    cpu.poke_ram(0x02FF, 0x34);
    cpu.poke_ram(0x0200, 0x92);
    cpu.poke_ram(0x0300, 0x80);
    assert_eq!(step(&mut cpu, &mut bus), 5);
    assert_eq!(cpu.registers().pc, 0x9234);
}

#[test]
fn test_internal_ram_mirrors() {
    // STA $0800
    let (mut cpu, mut bus) = boot(&[0xA9, 0x5A, 0x8D, 0x00, 0x08]);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.peek_ram(0x0000), 0x5A);
    assert_eq!(cpu.ram()[0], 0x5A);
}

#[test]
fn test_rmw_zero_page_cycles() {
    // INC $10; ASL A
    let (mut cpu, mut bus) = boot(&[0xE6, 0x10, 0x0A]);
    cpu.poke_ram(0x10, 0xFF);
    assert_eq!(step(&mut cpu, &mut bus), 5);
    assert_eq!(cpu.peek_ram(0x10), 0x00);
    assert!(cpu.status().zero());
    assert_eq!(step(&mut cpu, &mut bus), 2);
}

#[test]
fn test_lax_and_sax() {
    // LAX $10; LDA #$F0; LDX #$3C; SAX $20
    let (mut cpu, mut bus) = boot(&[0xA7, 0x10, 0xA9, 0xF0, 0xA2, 0x3C, 0x87, 0x20]);
    cpu.poke_ram(0x10, 0x5A);
    assert_eq!(step(&mut cpu, &mut bus), 3);
    assert_eq!(cpu.registers().a, 0x5A);
    assert_eq!(cpu.registers().x, 0x5A);
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.peek_ram(0x20), 0x30);
}

#[test]
fn test_dcp_and_isc() {
    // LDA #$0F; DCP $10; ISC $11
    let (mut cpu, mut bus) = boot(&[0xA9, 0x0F, 0xC7, 0x10, 0xE7, 0x11]);
    cpu.poke_ram(0x10, 0x10);
    cpu.poke_ram(0x11, 0x00);
    cpu.step(&mut bus);
    assert_eq!(step(&mut cpu, &mut bus), 5);
    assert_eq!(cpu.peek_ram(0x10), 0x0F);
    assert!(cpu.status().zero());
    assert!(cpu.status().carry());
    // carry set: A = $0F - $01
    cpu.step(&mut bus);
    assert_eq!(cpu.peek_ram(0x11), 0x01);
    assert_eq!(cpu.registers().a, 0x0E);
}

#[test]
fn test_slo_and_alr() {
    // LDA #$01; SLO $10; ALR #$FF
    let (mut cpu, mut bus) = boot(&[0xA9, 0x01, 0x07, 0x10, 0x4B, 0xFF]);
    cpu.poke_ram(0x10, 0x81);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.peek_ram(0x10), 0x02);
    assert_eq!(cpu.registers().a, 0x03);
    assert!(cpu.status().carry());
    cpu.step(&mut bus);
    assert_eq!(cpu.registers().a, 0x01);
    assert!(cpu.status().carry());
}

#[test]
fn test_lxa_uses_magic_constant() {
    // LXA #$FF with A = 0
    let (mut cpu, mut bus) = boot(&[0xAB, 0xFF]);
    cpu.step(&mut bus);
    assert_eq!(cpu.registers().a, 0xEE);
    assert_eq!(cpu.registers().x, 0xEE);
}

#[test]
fn test_undocumented_nops_consume_operands() {
    // NOP $1234,X; NOP #$00
    let (mut cpu, mut bus) = boot(&[0x1C, 0x34, 0x12, 0x80, 0x00]);
    assert_eq!(step(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.registers().pc, 0x8003);
    assert_eq!(step(&mut cpu, &mut bus), 2);
    assert_eq!(cpu.registers().pc, 0x8005);
}

/// One undocumented opcode run from a known machine state
struct Case {
    program: &'static [u8],
    a: u8,
    x: u8,
    y: u8,
    carry: bool,
    /// Initial value at $0010
    operand: u8,
    expect: (u8, u8, u8),
    expect_sp: u8,
    /// `StatusFlags` display after the instruction
    flags: &'static str,
    expect_operand: u8,
}

#[rustfmt::skip]
const UNDOCUMENTED: &[Case] = &[
    // ANC #$81: carry copies bit 7
    Case { program: &[0x0B, 0x81], a: 0xC3, x: 0, y: 0, carry: false, operand: 0, expect: (0x81, 0, 0), expect_sp: 0xFD, flags: "NvdizC", expect_operand: 0 },
    Case { program: &[0x2B, 0x80], a: 0x7F, x: 0, y: 0, carry: true, operand: 0, expect: (0x00, 0, 0), expect_sp: 0xFD, flags: "nvdiZc", expect_operand: 0 },
    // ALR #$03
    Case { program: &[0x4B, 0x03], a: 0xFF, x: 0, y: 0, carry: false, operand: 0, expect: (0x01, 0, 0), expect_sp: 0xFD, flags: "nvdizC", expect_operand: 0 },
    // ARR: C from bit 6, V from bit 6 xor bit 5
    Case { program: &[0x6B, 0xFF], a: 0xFF, x: 0, y: 0, carry: true, operand: 0, expect: (0xFF, 0, 0), expect_sp: 0xFD, flags: "NvdizC", expect_operand: 0 },
    Case { program: &[0x6B, 0x80], a: 0xFF, x: 0, y: 0, carry: false, operand: 0, expect: (0x40, 0, 0), expect_sp: 0xFD, flags: "nVdizC", expect_operand: 0 },
    Case { program: &[0x6B, 0xFF], a: 0x40, x: 0, y: 0, carry: false, operand: 0, expect: (0x20, 0, 0), expect_sp: 0xFD, flags: "nVdizc", expect_operand: 0 },
    // AXS #imm: X = (A & X) - imm, carry as in CMP
    Case { program: &[0xCB, 0x10], a: 0xF0, x: 0x3C, y: 0, carry: false, operand: 0, expect: (0xF0, 0x20, 0), expect_sp: 0xFD, flags: "nvdizC", expect_operand: 0 },
    Case { program: &[0xCB, 0x40], a: 0xF0, x: 0x3C, y: 0, carry: true, operand: 0, expect: (0xF0, 0xF0, 0), expect_sp: 0xFD, flags: "Nvdizc", expect_operand: 0 },
    // ANE #imm: (A | $EE) & X & imm
    Case { program: &[0x8B, 0xFF], a: 0x00, x: 0xFF, y: 0, carry: false, operand: 0, expect: (0xEE, 0xFF, 0), expect_sp: 0xFD, flags: "Nvdizc", expect_operand: 0 },
    // LXA #imm: (A | $EE) & imm into A and X
    Case { program: &[0xAB, 0x0F], a: 0x01, x: 0x00, y: 0, carry: false, operand: 0, expect: (0x0F, 0x0F, 0), expect_sp: 0xFD, flags: "nvdizc", expect_operand: 0 },
    // LAS $0010,Y: M & SP into A, X and SP
    Case { program: &[0xBB, 0x10, 0x00], a: 0, x: 0, y: 0, carry: false, operand: 0xF3, expect: (0xF1, 0xF1, 0), expect_sp: 0xF1, flags: "Nvdizc", expect_operand: 0xF3 },
    // LAX / SAX
    Case { program: &[0xA7, 0x10], a: 0, x: 0, y: 0, carry: false, operand: 0x80, expect: (0x80, 0x80, 0), expect_sp: 0xFD, flags: "Nvdizc", expect_operand: 0x80 },
    Case { program: &[0x87, 0x10], a: 0xF0, x: 0x3C, y: 0, carry: false, operand: 0, expect: (0xF0, 0x3C, 0), expect_sp: 0xFD, flags: "nvdizc", expect_operand: 0x30 },
    // SLO: ASL then ORA
    Case { program: &[0x07, 0x10], a: 0x01, x: 0, y: 0, carry: false, operand: 0x81, expect: (0x03, 0, 0), expect_sp: 0xFD, flags: "nvdizC", expect_operand: 0x02 },
    // RLA: ROL then AND
    Case { program: &[0x27, 0x10], a: 0xFF, x: 0, y: 0, carry: true, operand: 0x80, expect: (0x01, 0, 0), expect_sp: 0xFD, flags: "nvdizC", expect_operand: 0x01 },
    // SRE: LSR then EOR
    Case { program: &[0x47, 0x10], a: 0x80, x: 0, y: 0, carry: false, operand: 0x03, expect: (0x81, 0, 0), expect_sp: 0xFD, flags: "NvdizC", expect_operand: 0x01 },
    // RRA: ROR then ADC, the rotated-out bit is the carry in
    Case { program: &[0x67, 0x10], a: 0x10, x: 0, y: 0, carry: true, operand: 0x02, expect: (0x91, 0, 0), expect_sp: 0xFD, flags: "Nvdizc", expect_operand: 0x81 },
    Case { program: &[0x67, 0x10], a: 0x10, x: 0, y: 0, carry: false, operand: 0x01, expect: (0x11, 0, 0), expect_sp: 0xFD, flags: "nvdizc", expect_operand: 0x00 },
    // DCP: DEC then CMP
    Case { program: &[0xC7, 0x10], a: 0x05, x: 0, y: 0, carry: false, operand: 0x06, expect: (0x05, 0, 0), expect_sp: 0xFD, flags: "nvdiZC", expect_operand: 0x05 },
    // ISC: INC then SBC
    Case { program: &[0xE7, 0x10], a: 0x10, x: 0, y: 0, carry: true, operand: 0x0F, expect: (0x00, 0, 0), expect_sp: 0xFD, flags: "nvdiZC", expect_operand: 0x10 },
    // SBC #imm duplicate at $EB
    Case { program: &[0xEB, 0x01], a: 0x10, x: 0, y: 0, carry: true, operand: 0, expect: (0x0F, 0, 0), expect_sp: 0xFD, flags: "nvdizC", expect_operand: 0 },
];

#[test]
fn test_undocumented_opcode_results() {
    for case in UNDOCUMENTED {
        let (mut cpu, mut bus) = boot(case.program);
        let name = format!("{:?}", decode(case.program[0]).opcode);
        {
            let r = cpu.registers_mut();
            r.a = case.a;
            r.x = case.x;
            r.y = case.y;
        }
        *cpu.status_mut() = StatusFlags::new(if case.carry { StatusFlags::CARRY } else { 0 });
        cpu.poke_ram(0x0010, case.operand);

        cpu.step(&mut bus);
        let r = *cpu.registers();
        assert_eq!((r.a, r.x, r.y), case.expect, "{} registers", name);
        assert_eq!(r.sp, case.expect_sp, "{} stack pointer", name);
        assert_eq!(cpu.status().to_string(), case.flags, "{} flags", name);
        assert_eq!(cpu.peek_ram(0x0010), case.expect_operand, "{} memory", name);
        assert_eq!(r.pc, 0x8000 + case.program.len() as u16, "{} length", name);
    }
}

#[test]
fn test_high_byte_stores() {
    // (program, a, x, y, address written, value, sp after)
    let cases: &[(&[u8], u8, u8, u8, u16, u8, u8)] = &[
        // SHX $6000,Y: X & ($60 + 1)
        (&[0x9E, 0x00, 0x60], 0, 0xFF, 0x01, 0x6001, 0x61, 0xFD),
        // SHX across a page: the stored value becomes the high byte
        (&[0x9E, 0xFF, 0x60], 0, 0x40, 0x02, 0x4001, 0x40, 0xFD),
        // SHY $6000,X
        (&[0x9C, 0x00, 0x60], 0, 0x01, 0xFF, 0x6001, 0x61, 0xFD),
        (&[0x9C, 0xFF, 0x60], 0, 0x02, 0x41, 0x4101, 0x41, 0xFD),
        // SHA $6000,Y: A & X & ($60 + 1)
        (&[0x9F, 0x00, 0x60], 0xFF, 0xF3, 0x05, 0x6005, 0x61, 0xFD),
        // TAS $6000,Y: SP = A & X, then stores SP & ($60 + 1)
        (&[0x9B, 0x00, 0x60], 0xFF, 0x33, 0x00, 0x6000, 0x21, 0x33),
    ];
    for &(program, a, x, y, address, value, sp) in cases {
        let (mut cpu, mut bus) = boot(program);
        let name = format!("{:?}", decode(program[0]).opcode);
        {
            let r = cpu.registers_mut();
            r.a = a;
            r.x = x;
            r.y = y;
        }
        assert_eq!(step(&mut cpu, &mut bus), 5, "{} cycles", name);
        assert_eq!(bus.memory[address as usize], value, "{} at ${:04X}", name, address);
        assert_eq!(cpu.registers().sp, sp, "{} stack pointer", name);
        // flags are untouched
        assert_eq!(cpu.status().to_string(), "nvdIzc", "{} flags", name);
    }

    // the unfixed target stays clean when the page is crossed
    let (mut cpu, mut bus) = boot(&[0x9E, 0xFF, 0x60]);
    cpu.registers_mut().x = 0x40;
    cpu.registers_mut().y = 0x02;
    cpu.step(&mut bus);
    assert_eq!(bus.memory[0x6101], 0x00);
}

#[test]
fn test_kil_jams_cpu() {
    let (mut cpu, mut bus) = boot(&[0x02]);
    cpu.step(&mut bus);
    assert!(cpu.is_jammed());
    assert_eq!(cpu.registers().pc, 0x8000);
    let now = cpu.cycles();
    cpu.interrupt_mut().do_irq(IrqLine::External, now);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.registers().pc, 0x8000);
    assert!(cpu.interrupt().is_jammed());
}

#[test]
fn test_nmi_after_one_instruction() {
    let (mut cpu, mut bus) = boot(&[0xEA, 0xEA, 0xEA]);
    bus.set_vector(NMI_VECTOR, 0x9000);
    let now = cpu.cycles();
    cpu.interrupt_mut().do_nmi(now);
    cpu.step(&mut bus);
    assert_eq!(cpu.registers().pc, 0x8001);
    assert_eq!(step(&mut cpu, &mut bus), 7);
    assert_eq!(cpu.registers().pc, 0x9000);
    assert!(cpu.status().interrupt());
    // pushed P has B clear and U set
    assert_eq!(cpu.peek_ram(0x01FB) & 0x30, 0x20);
}

#[test]
fn test_irq_masked_by_interrupt_flag() {
    let (mut cpu, mut bus) = boot(&[0xEA, 0xEA, 0x58, 0xEA, 0xEA]);
    bus.set_vector(IRQ_VECTOR, 0x9000);
    let now = cpu.cycles();
    cpu.interrupt_mut().do_irq(IrqLine::FrameCounter, now);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.registers().pc, 0x8002);

    // CLI, then one more instruction before the IRQ is taken
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.registers().pc, 0x8004);
    cpu.step(&mut bus);
    assert_eq!(cpu.registers().pc, 0x9000);
    assert_eq!(cpu.interrupt().irq_lines(), IrqLine::FrameCounter as u8);
}

#[test]
fn test_irq_line_release_cancels_interrupt() {
    let (mut cpu, mut bus) = boot(&[0x58, 0xEA, 0xEA, 0xEA]);
    bus.set_vector(IRQ_VECTOR, 0x9000);
    cpu.step(&mut bus);
    let now = cpu.cycles();
    cpu.interrupt_mut().do_irq(IrqLine::Dmc, now);
    cpu.interrupt_mut().clear_irq(IrqLine::Dmc);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.registers().pc, 0x8003);
}

#[test]
fn test_rti_restores_flags() {
    // PHA-free handler: $9000 RTI
    let (mut cpu, mut bus) = boot(&[0x38, 0xEA]);
    bus.set_vector(NMI_VECTOR, 0x9000);
    bus.memory[0x9000] = 0x40;
    cpu.step(&mut bus);
    let now = cpu.cycles();
    cpu.interrupt_mut().do_nmi(now);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.registers().pc, 0x9000);
    assert_eq!(step(&mut cpu, &mut bus), 6);
    assert_eq!(cpu.registers().pc, 0x8002);
    assert!(cpu.status().carry());
    assert!(cpu.status().interrupt());
}

#[test]
fn test_oam_dma_stalls_cpu() {
    // LDA #$02; STA $4014
    let (mut cpu, mut bus) = boot(&[0xA9, 0x02, 0x8D, 0x14, 0x40]);
    for i in 0..256u16 {
        cpu.poke_ram(0x0200 + i, i as u8);
    }
    cpu.step(&mut bus);
    let cycles = step(&mut cpu, &mut bus);
    assert!(cycles == 4 + 513 || cycles == 4 + 514, "took {} cycles", cycles);
    assert_eq!(bus.oam_writes.len(), 256);
    assert_eq!(bus.oam_writes[0x80], 0x80);
}

#[test]
fn test_status_flags() {
    let mut flags = StatusFlags::new(0xFF);
    assert!(flags.carry());
    assert!(flags.zero());
    assert!(flags.interrupt());
    assert!(flags.overflow());
    assert!(flags.negative());

    flags.set_carry(false);
    assert!(!flags.carry());

    flags.set_overflow(true);
    assert!(flags.overflow());
}

#[test]
fn test_decode_covers_every_byte() {
    let kil = (0..=255u8).filter(|&b| decode(b).opcode == Opcode::KIL).count();
    assert_eq!(kil, 12);
    assert_eq!(decode(0xA9).mode, AddressingMode::Immediate);
    assert_eq!(decode(0x6C).opcode, Opcode::JMP);
    assert_eq!(decode(0xEB).opcode, Opcode::SBC);
    assert!(decode(0x9C).opcode.is_unstable());
}
