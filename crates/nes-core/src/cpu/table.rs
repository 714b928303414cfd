//! 256-entry opcode tables
//!
//! Every byte value decodes to a mnemonic and an addressing mode, including the
//! undocumented ones. The twelve JAM bytes decode to [`Opcode::KIL`].

/// Addressing modes of the 6502
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
}

impl AddressingMode {
    /// Operand bytes following the opcode
    pub const fn operand_len(self) -> u8 {
        match self {
            AddressingMode::Implied | AddressingMode::Accumulator => 0,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 2,
            _ => 1,
        }
    }
}

/// Instruction mnemonics, official and undocumented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    // loads, stores, transfers
    LDA, LDX, LDY, STA, STX, STY,
    TAX, TAY, TSX, TXA, TXS, TYA,
    // arithmetic and logic
    ADC, SBC, AND, EOR, ORA, BIT,
    CMP, CPX, CPY,
    INC, INX, INY, DEC, DEX, DEY,
    ASL, LSR, ROL, ROR,
    // control flow
    BCC, BCS, BEQ, BNE, BMI, BPL, BVC, BVS,
    JMP, JSR, RTS, RTI, BRK,
    // stack and flags
    PHA, PHP, PLA, PLP,
    CLC, CLD, CLI, CLV, SEC, SED, SEI,
    NOP,
    // undocumented
    SLO, RLA, SRE, RRA, SAX, LAX, DCP, ISC,
    ANC, ALR, ARR, AXS, ANE, LXA, LAS,
    SHA, SHX, SHY, TAS,
    KIL,
}

impl Opcode {
    /// Opcodes whose result depends on analog bus effects
    pub const fn is_unstable(self) -> bool {
        matches!(self, Opcode::ANE | Opcode::LXA | Opcode::SHA | Opcode::SHX | Opcode::SHY | Opcode::TAS)
    }
}

/// Decoded opcode byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionInfo {
    pub opcode: Opcode,
    pub mode: AddressingMode,
}

/// Decode an opcode byte
pub const fn decode(byte: u8) -> InstructionInfo {
    InstructionInfo {
        opcode: OPCODES[byte as usize],
        mode: MODES[byte as usize],
    }
}

use AddressingMode::{
    Absolute as ABS, AbsoluteX as ABX, AbsoluteY as ABY, Accumulator as ACC, Immediate as IMM,
    Implied as IMP, Indirect as IND, IndirectX as IZX, IndirectY as IZY, Relative as REL,
    ZeroPage as ZP0, ZeroPageX as ZPX, ZeroPageY as ZPY,
};
use Opcode::*;

#[rustfmt::skip]
pub const OPCODES: [Opcode; 256] = [
//  x0   x1   x2   x3   x4   x5   x6   x7   x8   x9   xA   xB   xC   xD   xE   xF
    BRK, ORA, KIL, SLO, NOP, ORA, ASL, SLO, PHP, ORA, ASL, ANC, NOP, ORA, ASL, SLO, // 0x
    BPL, ORA, KIL, SLO, NOP, ORA, ASL, SLO, CLC, ORA, NOP, SLO, NOP, ORA, ASL, SLO, // 1x
    JSR, AND, KIL, RLA, BIT, AND, ROL, RLA, PLP, AND, ROL, ANC, BIT, AND, ROL, RLA, // 2x
    BMI, AND, KIL, RLA, NOP, AND, ROL, RLA, SEC, AND, NOP, RLA, NOP, AND, ROL, RLA, // 3x
    RTI, EOR, KIL, SRE, NOP, EOR, LSR, SRE, PHA, EOR, LSR, ALR, JMP, EOR, LSR, SRE, // 4x
    BVC, EOR, KIL, SRE, NOP, EOR, LSR, SRE, CLI, EOR, NOP, SRE, NOP, EOR, LSR, SRE, // 5x
    RTS, ADC, KIL, RRA, NOP, ADC, ROR, RRA, PLA, ADC, ROR, ARR, JMP, ADC, ROR, RRA, // 6x
    BVS, ADC, KIL, RRA, NOP, ADC, ROR, RRA, SEI, ADC, NOP, RRA, NOP, ADC, ROR, RRA, // 7x
    NOP, STA, NOP, SAX, STY, STA, STX, SAX, DEY, NOP, TXA, ANE, STY, STA, STX, SAX, // 8x
    BCC, STA, KIL, SHA, STY, STA, STX, SAX, TYA, STA, TXS, TAS, SHY, STA, SHX, SHA, // 9x
    LDY, LDA, LDX, LAX, LDY, LDA, LDX, LAX, TAY, LDA, TAX, LXA, LDY, LDA, LDX, LAX, // Ax
    BCS, LDA, KIL, LAX, LDY, LDA, LDX, LAX, CLV, LDA, TSX, LAS, LDY, LDA, LDX, LAX, // Bx
    CPY, CMP, NOP, DCP, CPY, CMP, DEC, DCP, INY, CMP, DEX, AXS, CPY, CMP, DEC, DCP, // Cx
    BNE, CMP, KIL, DCP, NOP, CMP, DEC, DCP, CLD, CMP, NOP, DCP, NOP, CMP, DEC, DCP, // Dx
    CPX, SBC, NOP, ISC, CPX, SBC, INC, ISC, INX, SBC, NOP, SBC, CPX, SBC, INC, ISC, // Ex
    BEQ, SBC, KIL, ISC, NOP, SBC, INC, ISC, SED, SBC, NOP, ISC, NOP, SBC, INC, ISC, // Fx
];

#[rustfmt::skip]
pub const MODES: [AddressingMode; 256] = [
//  x0   x1   x2   x3   x4   x5   x6   x7   x8   x9   xA   xB   xC   xD   xE   xF
    IMP, IZX, IMP, IZX, ZP0, ZP0, ZP0, ZP0, IMP, IMM, ACC, IMM, ABS, ABS, ABS, ABS, // 0x
    REL, IZY, IMP, IZY, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX, // 1x
    ABS, IZX, IMP, IZX, ZP0, ZP0, ZP0, ZP0, IMP, IMM, ACC, IMM, ABS, ABS, ABS, ABS, // 2x
    REL, IZY, IMP, IZY, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX, // 3x
    IMP, IZX, IMP, IZX, ZP0, ZP0, ZP0, ZP0, IMP, IMM, ACC, IMM, ABS, ABS, ABS, ABS, // 4x
    REL, IZY, IMP, IZY, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX, // 5x
    IMP, IZX, IMP, IZX, ZP0, ZP0, ZP0, ZP0, IMP, IMM, ACC, IMM, IND, ABS, ABS, ABS, // 6x
    REL, IZY, IMP, IZY, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX, // 7x
    IMM, IZX, IMM, IZX, ZP0, ZP0, ZP0, ZP0, IMP, IMM, IMP, IMM, ABS, ABS, ABS, ABS, // 8x
    REL, IZY, IMP, IZY, ZPX, ZPX, ZPY, ZPY, IMP, ABY, IMP, ABY, ABX, ABX, ABY, ABY, // 9x
    IMM, IZX, IMM, IZX, ZP0, ZP0, ZP0, ZP0, IMP, IMM, IMP, IMM, ABS, ABS, ABS, ABS, // Ax
    REL, IZY, IMP, IZY, ZPX, ZPX, ZPY, ZPY, IMP, ABY, IMP, ABY, ABX, ABX, ABY, ABY, // Bx
    IMM, IZX, IMM, IZX, ZP0, ZP0, ZP0, ZP0, IMP, IMM, IMP, IMM, ABS, ABS, ABS, ABS, // Cx
    REL, IZY, IMP, IZY, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX, // Dx
    IMM, IZX, IMM, IZX, ZP0, ZP0, ZP0, ZP0, IMP, IMM, IMP, IMM, ABS, ABS, ABS, ABS, // Ex
    REL, IZY, IMP, IZY, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX, // Fx
];
