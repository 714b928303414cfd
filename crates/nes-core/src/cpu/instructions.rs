//! Addressing modes and instruction semantics
//!
//! Each helper performs exactly the bus accesses the 6502 does, including the
//! dummy reads and writes, so cycle counts fall out of the access count.

use log::warn;

use super::table::{AddressingMode, InstructionInfo, Opcode};
use super::{Bus, Cpu};
use crate::warnings::Warning;

/// Magic constant of the unstable ANE/LXA opcodes
const ANE_MAGIC: u8 = 0xEE;

impl Cpu {
    pub(super) fn execute<B: Bus>(&mut self, bus: &mut B, info: InstructionInfo) {
        use Opcode::*;

        let mode = info.mode;
        if info.opcode.is_unstable() && self.warnings.first(Warning::UnstableOpcode) {
            warn!("cpu: unstable opcode {:?} at ${:04X}", info.opcode, self.registers.pc.wrapping_sub(1));
        }

        match info.opcode {
            // reads
            LDA => {
                let v = self.read_operand(bus, mode);
                self.op_lda(v)
            }
            LDX => {
                let v = self.read_operand(bus, mode);
                self.op_ldx(v)
            }
            LDY => {
                let v = self.read_operand(bus, mode);
                self.op_ldy(v)
            }
            LAX => {
                let v = self.read_operand(bus, mode);
                self.op_lda(v);
                self.registers.x = v;
            }
            ADC => {
                let v = self.read_operand(bus, mode);
                self.op_adc(v)
            }
            SBC => {
                let v = self.read_operand(bus, mode);
                self.op_adc(!v)
            }
            AND => {
                let v = self.read_operand(bus, mode);
                self.op_lda(self.registers.a & v)
            }
            ORA => {
                let v = self.read_operand(bus, mode);
                self.op_lda(self.registers.a | v)
            }
            EOR => {
                let v = self.read_operand(bus, mode);
                self.op_lda(self.registers.a ^ v)
            }
            CMP => {
                let v = self.read_operand(bus, mode);
                self.compare(self.registers.a, v)
            }
            CPX => {
                let v = self.read_operand(bus, mode);
                self.compare(self.registers.x, v)
            }
            CPY => {
                let v = self.read_operand(bus, mode);
                self.compare(self.registers.y, v)
            }
            BIT => {
                let v = self.read_operand(bus, mode);
                self.status.set_zero(self.registers.a & v == 0);
                self.status.set_negative(v & 0x80 != 0);
                self.status.set_overflow(v & 0x40 != 0);
            }
            NOP => match mode {
                AddressingMode::Implied => self.idle(bus),
                _ => {
                    self.read_operand(bus, mode);
                }
            },
            ANC => {
                let v = self.read_operand(bus, mode);
                self.op_lda(self.registers.a & v);
                self.status.set_carry(self.registers.a & 0x80 != 0);
            }
            ALR => {
                let v = self.read_operand(bus, mode);
                let a = self.op_lsr(self.registers.a & v);
                self.registers.a = a;
            }
            ARR => {
                let v = self.read_operand(bus, mode);
                let carry = (self.status.carry() as u8) << 7;
                let a = ((self.registers.a & v) >> 1) | carry;
                self.op_lda(a);
                self.status.set_carry(a & 0x40 != 0);
                self.status.set_overflow(((a >> 6) ^ (a >> 5)) & 1 != 0);
            }
            AXS => {
                let v = self.read_operand(bus, mode);
                let ax = self.registers.a & self.registers.x;
                self.status.set_carry(ax >= v);
                self.op_ldx(ax.wrapping_sub(v));
            }
            ANE => {
                let v = self.read_operand(bus, mode);
                self.op_lda((self.registers.a | ANE_MAGIC) & self.registers.x & v);
            }
            LXA => {
                let v = self.read_operand(bus, mode);
                let a = (self.registers.a | ANE_MAGIC) & v;
                self.op_lda(a);
                self.registers.x = a;
            }
            LAS => {
                let v = self.read_operand(bus, mode);
                let value = v & self.registers.sp;
                self.registers.sp = value;
                self.registers.x = value;
                self.op_lda(value);
            }

            // writes
            STA => self.store(bus, mode, self.registers.a),
            STX => self.store(bus, mode, self.registers.x),
            STY => self.store(bus, mode, self.registers.y),
            SAX => self.store(bus, mode, self.registers.a & self.registers.x),
            SHA => self.store_high_and(bus, mode, self.registers.a & self.registers.x),
            SHX => self.store_high_and(bus, mode, self.registers.x),
            SHY => self.store_high_and(bus, mode, self.registers.y),
            TAS => {
                self.registers.sp = self.registers.a & self.registers.x;
                self.store_high_and(bus, mode, self.registers.sp)
            }

            // read-modify-write
            ASL => self.modify(bus, mode, Cpu::op_asl),
            LSR => self.modify(bus, mode, Cpu::op_lsr),
            ROL => self.modify(bus, mode, Cpu::op_rol),
            ROR => self.modify(bus, mode, Cpu::op_ror),
            INC => self.modify(bus, mode, |cpu, v| {
                let r = v.wrapping_add(1);
                cpu.status.set_zn(r);
                r
            }),
            DEC => self.modify(bus, mode, |cpu, v| {
                let r = v.wrapping_sub(1);
                cpu.status.set_zn(r);
                r
            }),
            SLO => self.modify(bus, mode, |cpu, v| {
                let r = cpu.op_asl(v);
                cpu.op_lda(cpu.registers.a | r);
                r
            }),
            RLA => self.modify(bus, mode, |cpu, v| {
                let r = cpu.op_rol(v);
                cpu.op_lda(cpu.registers.a & r);
                r
            }),
            SRE => self.modify(bus, mode, |cpu, v| {
                let r = cpu.op_lsr(v);
                cpu.op_lda(cpu.registers.a ^ r);
                r
            }),
            RRA => self.modify(bus, mode, |cpu, v| {
                let r = cpu.op_ror(v);
                cpu.op_adc(r);
                r
            }),
            DCP => self.modify(bus, mode, |cpu, v| {
                let r = v.wrapping_sub(1);
                cpu.compare(cpu.registers.a, r);
                r
            }),
            ISC => self.modify(bus, mode, |cpu, v| {
                let r = v.wrapping_add(1);
                cpu.op_adc(!r);
                r
            }),

            // register transfers and counters
            TAX => self.implied(bus, |cpu| cpu.op_ldx(cpu.registers.a)),
            TAY => self.implied(bus, |cpu| cpu.op_ldy(cpu.registers.a)),
            TXA => self.implied(bus, |cpu| cpu.op_lda(cpu.registers.x)),
            TYA => self.implied(bus, |cpu| cpu.op_lda(cpu.registers.y)),
            TSX => self.implied(bus, |cpu| cpu.op_ldx(cpu.registers.sp)),
            TXS => self.implied(bus, |cpu| cpu.registers.sp = cpu.registers.x),
            INX => self.implied(bus, |cpu| cpu.op_ldx(cpu.registers.x.wrapping_add(1))),
            INY => self.implied(bus, |cpu| cpu.op_ldy(cpu.registers.y.wrapping_add(1))),
            DEX => self.implied(bus, |cpu| cpu.op_ldx(cpu.registers.x.wrapping_sub(1))),
            DEY => self.implied(bus, |cpu| cpu.op_ldy(cpu.registers.y.wrapping_sub(1))),

            // flags
            CLC => self.implied(bus, |cpu| cpu.status.set_carry(false)),
            SEC => self.implied(bus, |cpu| cpu.status.set_carry(true)),
            CLI => self.implied(bus, |cpu| cpu.status.set_interrupt(false)),
            SEI => self.implied(bus, |cpu| cpu.status.set_interrupt(true)),
            CLD => self.implied(bus, |cpu| cpu.status.set_decimal(false)),
            SED => self.implied(bus, |cpu| cpu.status.set_decimal(true)),
            CLV => self.implied(bus, |cpu| cpu.status.set_overflow(false)),

            // branches
            BCC => self.branch(bus, !self.status.carry()),
            BCS => self.branch(bus, self.status.carry()),
            BNE => self.branch(bus, !self.status.zero()),
            BEQ => self.branch(bus, self.status.zero()),
            BPL => self.branch(bus, !self.status.negative()),
            BMI => self.branch(bus, self.status.negative()),
            BVC => self.branch(bus, !self.status.overflow()),
            BVS => self.branch(bus, self.status.overflow()),

            // stack
            PHA => {
                self.idle(bus);
                self.push(bus, self.registers.a);
            }
            PHP => {
                self.idle(bus);
                let p = self.status.pushed(true);
                self.push(bus, p);
            }
            PLA => {
                self.idle(bus);
                self.stack_idle(bus);
                let v = self.pull(bus);
                self.op_lda(v);
            }
            PLP => {
                self.idle(bus);
                self.stack_idle(bus);
                let v = self.pull(bus);
                self.status = super::StatusFlags::new(v);
            }

            // control flow
            JMP => {
                self.registers.pc = match mode {
                    AddressingMode::Indirect => {
                        let pointer = self.fetch_word(bus);
                        self.read_word_in_page(bus, pointer)
                    }
                    _ => self.fetch_word(bus),
                };
            }
            JSR => {
                let lo = self.fetch(bus) as u16;
                self.stack_idle(bus);
                let pc = self.registers.pc;
                self.push(bus, (pc >> 8) as u8);
                self.push(bus, pc as u8);
                let hi = self.fetch(bus) as u16;
                self.registers.pc = (hi << 8) | lo;
            }
            RTS => {
                self.idle(bus);
                self.stack_idle(bus);
                let lo = self.pull(bus) as u16;
                let hi = self.pull(bus) as u16;
                self.registers.pc = (hi << 8) | lo;
                self.fetch(bus);
            }
            RTI => {
                self.idle(bus);
                self.stack_idle(bus);
                let p = self.pull(bus);
                self.status = super::StatusFlags::new(p);
                let lo = self.pull(bus) as u16;
                let hi = self.pull(bus) as u16;
                self.registers.pc = (hi << 8) | lo;
            }
            BRK => self.interrupt_sequence(bus, super::IRQ_VECTOR, true),
            KIL => self.jam(bus),
        }
    }

    /// Dummy read of the byte after the opcode
    fn idle<B: Bus>(&mut self, bus: &mut B) {
        let pc = self.registers.pc;
        self.read(bus, pc);
    }

    /// Dummy read of the current stack slot
    fn stack_idle<B: Bus>(&mut self, bus: &mut B) {
        let address = 0x0100 | self.registers.sp as u16;
        self.read(bus, address);
    }

    fn implied<B: Bus>(&mut self, bus: &mut B, op: impl FnOnce(&mut Self)) {
        self.idle(bus);
        op(self);
    }

    pub(super) fn fetch_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch(bus) as u16;
        let hi = self.fetch(bus) as u16;
        (hi << 8) | lo
    }

    /// Word read whose high byte wraps within the page ($xxFF -> $xx00)
    fn read_word_in_page<B: Bus>(&mut self, bus: &mut B, pointer: u16) -> u16 {
        let lo = self.read(bus, pointer) as u16;
        let hi_address = (pointer & 0xFF00) | (pointer.wrapping_add(1) & 0x00FF);
        let hi = self.read(bus, hi_address) as u16;
        (hi << 8) | lo
    }

    /// Base address and index register for the indexed modes
    fn indexed_base<B: Bus>(&mut self, bus: &mut B, mode: AddressingMode) -> (u16, u8) {
        match mode {
            AddressingMode::AbsoluteX => (self.fetch_word(bus), self.registers.x),
            AddressingMode::AbsoluteY => (self.fetch_word(bus), self.registers.y),
            AddressingMode::IndirectY => {
                let pointer = self.fetch(bus) as u16;
                (self.read_word_in_page(bus, pointer), self.registers.y)
            }
            _ => (self.address(bus, mode, true), 0),
        }
    }

    /// Effective address of a memory operand
    ///
    /// Indexed reads only pay the extra cycle on a page cross. Writes and
    /// read-modify-write always do the dummy read at the unfixed address.
    fn address<B: Bus>(&mut self, bus: &mut B, mode: AddressingMode, write: bool) -> u16 {
        match mode {
            AddressingMode::ZeroPage => self.fetch(bus) as u16,
            AddressingMode::ZeroPageX | AddressingMode::ZeroPageY => {
                let base = self.fetch(bus);
                self.read(bus, base as u16);
                let index = if mode == AddressingMode::ZeroPageX {
                    self.registers.x
                } else {
                    self.registers.y
                };
                base.wrapping_add(index) as u16
            }
            AddressingMode::Absolute => self.fetch_word(bus),
            AddressingMode::AbsoluteX | AddressingMode::AbsoluteY | AddressingMode::IndirectY => {
                let (base, index) = self.indexed_base(bus, mode);
                let effective = base.wrapping_add(index as u16);
                if write || (base ^ effective) & 0xFF00 != 0 {
                    self.read(bus, (base & 0xFF00) | (effective & 0x00FF));
                }
                effective
            }
            AddressingMode::IndirectX => {
                let pointer = self.fetch(bus);
                self.read(bus, pointer as u16);
                let pointer = pointer.wrapping_add(self.registers.x);
                self.read_word_in_page(bus, pointer as u16)
            }
            AddressingMode::Indirect => {
                let pointer = self.fetch_word(bus);
                self.read_word_in_page(bus, pointer)
            }
            AddressingMode::Implied
            | AddressingMode::Accumulator
            | AddressingMode::Immediate
            | AddressingMode::Relative => {
                let pc = self.registers.pc;
                self.registers.pc = pc.wrapping_add(1);
                pc
            }
        }
    }

    fn read_operand<B: Bus>(&mut self, bus: &mut B, mode: AddressingMode) -> u8 {
        match mode {
            AddressingMode::Immediate => self.fetch(bus),
            _ => {
                let address = self.address(bus, mode, false);
                self.read(bus, address)
            }
        }
    }

    fn store<B: Bus>(&mut self, bus: &mut B, mode: AddressingMode, value: u8) {
        let address = self.address(bus, mode, true);
        self.write(bus, address, value);
    }

    /// SHA/SHX/SHY/TAS: store `value & (H + 1)`; on a page cross the
    /// stored value also replaces the high byte of the target address
    fn store_high_and<B: Bus>(&mut self, bus: &mut B, mode: AddressingMode, value: u8) {
        let (base, index) = self.indexed_base(bus, mode);
        let effective = base.wrapping_add(index as u16);
        self.read(bus, (base & 0xFF00) | (effective & 0x00FF));
        let data = value & ((base >> 8) as u8).wrapping_add(1);
        let address = if (base ^ effective) & 0xFF00 != 0 {
            ((data as u16) << 8) | (effective & 0x00FF)
        } else {
            effective
        };
        self.write(bus, address, data);
    }

    /// Read-modify-write with the double write real hardware performs
    fn modify<B: Bus>(&mut self, bus: &mut B, mode: AddressingMode, op: impl FnOnce(&mut Self, u8) -> u8) {
        if mode == AddressingMode::Accumulator {
            self.idle(bus);
            let a = self.registers.a;
            self.registers.a = op(self, a);
            return;
        }
        let address = self.address(bus, mode, true);
        let value = self.read(bus, address);
        self.write(bus, address, value);
        let result = op(self, value);
        self.write(bus, address, result);
    }

    fn branch<B: Bus>(&mut self, bus: &mut B, taken: bool) {
        let offset = self.fetch(bus) as i8;
        if !taken {
            return;
        }
        let pc = self.registers.pc;
        self.read(bus, pc);
        let target = pc.wrapping_add(offset as u16);
        if (pc ^ target) & 0xFF00 != 0 {
            self.read(bus, (pc & 0xFF00) | (target & 0x00FF));
        }
        self.registers.pc = target;
    }

    // ALU

    fn op_lda(&mut self, value: u8) {
        self.registers.a = value;
        self.status.set_zn(value);
    }

    fn op_ldx(&mut self, value: u8) {
        self.registers.x = value;
        self.status.set_zn(value);
    }

    fn op_ldy(&mut self, value: u8) {
        self.registers.y = value;
        self.status.set_zn(value);
    }

    /// Binary add with carry; SBC is ADC of the complement
    fn op_adc(&mut self, value: u8) {
        let a = self.registers.a;
        let sum = a as u16 + value as u16 + self.status.carry() as u16;
        let result = sum as u8;
        self.status.set_carry(sum > 0xFF);
        self.status.set_overflow((a ^ result) & (value ^ result) & 0x80 != 0);
        self.op_lda(result);
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.status.set_carry(register >= value);
        self.status.set_zn(register.wrapping_sub(value));
    }

    fn op_asl(&mut self, value: u8) -> u8 {
        let r = value << 1;
        self.status.set_carry(value & 0x80 != 0);
        self.status.set_zn(r);
        r
    }

    fn op_lsr(&mut self, value: u8) -> u8 {
        let r = value >> 1;
        self.status.set_carry(value & 0x01 != 0);
        self.status.set_zn(r);
        r
    }

    fn op_rol(&mut self, value: u8) -> u8 {
        let r = (value << 1) | self.status.carry() as u8;
        self.status.set_carry(value & 0x80 != 0);
        self.status.set_zn(r);
        r
    }

    fn op_ror(&mut self, value: u8) -> u8 {
        let r = (value >> 1) | (self.status.carry() as u8) << 7;
        self.status.set_carry(value & 0x01 != 0);
        self.status.set_zn(r);
        r
    }
}
