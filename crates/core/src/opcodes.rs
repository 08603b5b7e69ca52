//! Opcode metadata table.
//!
//! Maps every opcode byte to its instruction, addressing mode, base cycle
//! count and length. The table is plain data: the CPU consults it through a
//! single lookup, and tests can build a modified copy with
//! [`OpcodeTable::with_entry`].

/// Instruction tags. The accumulator forms of the shifts are separate tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Instruction {
    Adc,
    And,
    Asl,
    AslA,
    Bcc,
    Bcs,
    Beq,
    Bit,
    Bmi,
    Bne,
    Bpl,
    Brk,
    Bvc,
    Bvs,
    Clc,
    Cld,
    Cli,
    Clv,
    Cmp,
    Cpx,
    Cpy,
    Dec,
    Dex,
    Dey,
    Eor,
    Inc,
    Inx,
    Iny,
    Jmp,
    Jsr,
    Lda,
    Ldx,
    Ldy,
    Lsr,
    LsrA,
    Nop,
    Ora,
    Pha,
    Php,
    Pla,
    Plp,
    Rol,
    RolA,
    Ror,
    RorA,
    Rti,
    Rts,
    Sbc,
    Sec,
    Sed,
    Sei,
    Sta,
    Stx,
    Sty,
    Tax,
    Tay,
    Tsx,
    Txa,
    Txs,
    Tya,
}

impl Instruction {
    pub const COUNT: usize = Instruction::Tya as usize + 1;

    /// Every tag, in declaration order
    pub const ALL: [Instruction; Instruction::COUNT] = {
        use Instruction::*;
        [
            Adc, And, Asl, AslA, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc, Cld, Cli,
            Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp, Jsr, Lda, Ldx, Ldy, Lsr,
            LsrA, Nop, Ora, Pha, Php, Pla, Plp, Rol, RolA, Ror, RorA, Rti, Rts, Sbc, Sec, Sed,
            Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
        ]
    };

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn mnemonic(self) -> &'static str {
        use Instruction::*;
        match self {
            Adc => "ADC",
            And => "AND",
            Asl | AslA => "ASL",
            Bcc => "BCC",
            Bcs => "BCS",
            Beq => "BEQ",
            Bit => "BIT",
            Bmi => "BMI",
            Bne => "BNE",
            Bpl => "BPL",
            Brk => "BRK",
            Bvc => "BVC",
            Bvs => "BVS",
            Clc => "CLC",
            Cld => "CLD",
            Cli => "CLI",
            Clv => "CLV",
            Cmp => "CMP",
            Cpx => "CPX",
            Cpy => "CPY",
            Dec => "DEC",
            Dex => "DEX",
            Dey => "DEY",
            Eor => "EOR",
            Inc => "INC",
            Inx => "INX",
            Iny => "INY",
            Jmp => "JMP",
            Jsr => "JSR",
            Lda => "LDA",
            Ldx => "LDX",
            Ldy => "LDY",
            Lsr | LsrA => "LSR",
            Nop => "NOP",
            Ora => "ORA",
            Pha => "PHA",
            Php => "PHP",
            Pla => "PLA",
            Plp => "PLP",
            Rol | RolA => "ROL",
            Ror | RorA => "ROR",
            Rti => "RTI",
            Rts => "RTS",
            Sbc => "SBC",
            Sec => "SEC",
            Sed => "SED",
            Sei => "SEI",
            Sta => "STA",
            Stx => "STX",
            Sty => "STY",
            Tax => "TAX",
            Tay => "TAY",
            Tsx => "TSX",
            Txa => "TXA",
            Txs => "TXS",
            Tya => "TYA",
        }
    }

    /// Statistics key; distinguishes the accumulator shift forms
    pub const fn key(self) -> &'static str {
        match self {
            Instruction::AslA => "ASL A",
            Instruction::LsrA => "LSR A",
            Instruction::RolA => "ROL A",
            Instruction::RorA => "ROR A",
            other => other.mnemonic(),
        }
    }

    /// True when the instruction needs an effective address
    pub const fn uses_operand(self) -> bool {
        use Instruction::*;
        matches!(
            self,
            Adc | And
                | Asl
                | Bcc
                | Bcs
                | Beq
                | Bit
                | Bmi
                | Bne
                | Bpl
                | Bvc
                | Bvs
                | Cmp
                | Cpx
                | Cpy
                | Dec
                | Eor
                | Inc
                | Jmp
                | Jsr
                | Lda
                | Ldx
                | Ldy
                | Lsr
                | Ora
                | Rol
                | Ror
                | Sbc
                | Sta
                | Stx
                | Sty
        )
    }
}

/// Addressing modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressingMode {
    Implied,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    /// (zp,X)
    IndexedIndirect,
    /// (zp),Y
    IndirectIndexed,
    Relative,
}

impl AddressingMode {
    pub const COUNT: usize = AddressingMode::Relative as usize + 1;

    pub const ALL: [AddressingMode; AddressingMode::COUNT] = {
        use AddressingMode::*;
        [
            Implied,
            Immediate,
            ZeroPage,
            ZeroPageX,
            ZeroPageY,
            Absolute,
            AbsoluteX,
            AbsoluteY,
            Indirect,
            IndexedIndirect,
            IndirectIndexed,
            Relative,
        ]
    };

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Instruction length in bytes, opcode included
    pub const fn size(self) -> u8 {
        use AddressingMode::*;
        match self {
            Implied => 1,
            Immediate | ZeroPage | ZeroPageX | ZeroPageY | IndexedIndirect | IndirectIndexed
            | Relative => 2,
            Absolute | AbsoluteX | AbsoluteY | Indirect => 3,
        }
    }

    pub const fn name(self) -> &'static str {
        use AddressingMode::*;
        match self {
            Implied => "implied",
            Immediate => "immediate",
            ZeroPage => "zero_page",
            ZeroPageX => "zero_page_x",
            ZeroPageY => "zero_page_y",
            Absolute => "absolute",
            AbsoluteX => "absolute_x",
            AbsoluteY => "absolute_y",
            Indirect => "indirect",
            IndexedIndirect => "indexed_indirect",
            IndirectIndexed => "indirect_indexed",
            Relative => "relative",
        }
    }
}

/// One row of the opcode table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    pub instruction: Instruction,
    pub mode: AddressingMode,
    /// Base cycle count, before page-cross and branch penalties
    pub cycles: u8,
    /// Length in bytes, opcode included
    pub size: u8,
}

impl OpcodeInfo {
    pub const fn new(instruction: Instruction, mode: AddressingMode, cycles: u8) -> Self {
        Self {
            instruction,
            mode,
            cycles,
            size: mode.size(),
        }
    }
}

/// 256-entry opcode table; `None` marks an illegal opcode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpcodeTable {
    entries: [Option<OpcodeInfo>; 256],
}

/// The documented NMOS opcode set
pub static OFFICIAL: OpcodeTable = OpcodeTable::official();

impl OpcodeTable {
    /// Table with no legal opcodes at all
    pub const fn empty() -> Self {
        Self {
            entries: [None; 256],
        }
    }

    /// The 151 documented opcodes
    pub const fn official() -> Self {
        use AddressingMode::*;
        use Instruction::*;

        const ROWS: [(u8, Instruction, AddressingMode, u8); 151] = [
            (0x69, Adc, Immediate, 2),
            (0x65, Adc, ZeroPage, 3),
            (0x75, Adc, ZeroPageX, 4),
            (0x6D, Adc, Absolute, 4),
            (0x7D, Adc, AbsoluteX, 4),
            (0x79, Adc, AbsoluteY, 4),
            (0x61, Adc, IndexedIndirect, 6),
            (0x71, Adc, IndirectIndexed, 5),
            (0x29, And, Immediate, 2),
            (0x25, And, ZeroPage, 3),
            (0x35, And, ZeroPageX, 4),
            (0x2D, And, Absolute, 4),
            (0x3D, And, AbsoluteX, 4),
            (0x39, And, AbsoluteY, 4),
            (0x21, And, IndexedIndirect, 6),
            (0x31, And, IndirectIndexed, 5),
            (0x0A, AslA, Implied, 2),
            (0x06, Asl, ZeroPage, 5),
            (0x16, Asl, ZeroPageX, 6),
            (0x0E, Asl, Absolute, 6),
            (0x1E, Asl, AbsoluteX, 7),
            (0x90, Bcc, Relative, 2),
            (0xB0, Bcs, Relative, 2),
            (0xF0, Beq, Relative, 2),
            (0x24, Bit, ZeroPage, 3),
            (0x2C, Bit, Absolute, 4),
            (0x30, Bmi, Relative, 2),
            (0xD0, Bne, Relative, 2),
            (0x10, Bpl, Relative, 2),
            (0x00, Brk, Implied, 7),
            (0x50, Bvc, Relative, 2),
            (0x70, Bvs, Relative, 2),
            (0x18, Clc, Implied, 2),
            (0xD8, Cld, Implied, 2),
            (0x58, Cli, Implied, 2),
            (0xB8, Clv, Implied, 2),
            (0xC9, Cmp, Immediate, 2),
            (0xC5, Cmp, ZeroPage, 3),
            (0xD5, Cmp, ZeroPageX, 4),
            (0xCD, Cmp, Absolute, 4),
            (0xDD, Cmp, AbsoluteX, 4),
            (0xD9, Cmp, AbsoluteY, 4),
            (0xC1, Cmp, IndexedIndirect, 6),
            (0xD1, Cmp, IndirectIndexed, 5),
            (0xE0, Cpx, Immediate, 2),
            (0xE4, Cpx, ZeroPage, 3),
            (0xEC, Cpx, Absolute, 4),
            (0xC0, Cpy, Immediate, 2),
            (0xC4, Cpy, ZeroPage, 3),
            (0xCC, Cpy, Absolute, 4),
            (0xC6, Dec, ZeroPage, 5),
            (0xD6, Dec, ZeroPageX, 6),
            (0xCE, Dec, Absolute, 6),
            (0xDE, Dec, AbsoluteX, 7),
            (0xCA, Dex, Implied, 2),
            (0x88, Dey, Implied, 2),
            (0x49, Eor, Immediate, 2),
            (0x45, Eor, ZeroPage, 3),
            (0x55, Eor, ZeroPageX, 4),
            (0x4D, Eor, Absolute, 4),
            (0x5D, Eor, AbsoluteX, 4),
            (0x59, Eor, AbsoluteY, 4),
            (0x41, Eor, IndexedIndirect, 6),
            (0x51, Eor, IndirectIndexed, 5),
            (0xE6, Inc, ZeroPage, 5),
            (0xF6, Inc, ZeroPageX, 6),
            (0xEE, Inc, Absolute, 6),
            (0xFE, Inc, AbsoluteX, 7),
            (0xE8, Inx, Implied, 2),
            (0xC8, Iny, Implied, 2),
            (0x4C, Jmp, Absolute, 3),
            (0x6C, Jmp, Indirect, 5),
            (0x20, Jsr, Absolute, 6),
            (0xA9, Lda, Immediate, 2),
            (0xA5, Lda, ZeroPage, 3),
            (0xB5, Lda, ZeroPageX, 4),
            (0xAD, Lda, Absolute, 4),
            (0xBD, Lda, AbsoluteX, 4),
            (0xB9, Lda, AbsoluteY, 4),
            (0xA1, Lda, IndexedIndirect, 6),
            (0xB1, Lda, IndirectIndexed, 5),
            (0xA2, Ldx, Immediate, 2),
            (0xA6, Ldx, ZeroPage, 3),
            (0xB6, Ldx, ZeroPageY, 4),
            (0xAE, Ldx, Absolute, 4),
            (0xBE, Ldx, AbsoluteY, 4),
            (0xA0, Ldy, Immediate, 2),
            (0xA4, Ldy, ZeroPage, 3),
            (0xB4, Ldy, ZeroPageX, 4),
            (0xAC, Ldy, Absolute, 4),
            (0xBC, Ldy, AbsoluteX, 4),
            (0x4A, LsrA, Implied, 2),
            (0x46, Lsr, ZeroPage, 5),
            (0x56, Lsr, ZeroPageX, 6),
            (0x4E, Lsr, Absolute, 6),
            (0x5E, Lsr, AbsoluteX, 7),
            (0xEA, Nop, Implied, 2),
            (0x09, Ora, Immediate, 2),
            (0x05, Ora, ZeroPage, 3),
            (0x15, Ora, ZeroPageX, 4),
            (0x0D, Ora, Absolute, 4),
            (0x1D, Ora, AbsoluteX, 4),
            (0x19, Ora, AbsoluteY, 4),
            (0x01, Ora, IndexedIndirect, 6),
            (0x11, Ora, IndirectIndexed, 5),
            (0x48, Pha, Implied, 3),
            (0x08, Php, Implied, 3),
            (0x68, Pla, Implied, 4),
            (0x28, Plp, Implied, 4),
            (0x2A, RolA, Implied, 2),
            (0x26, Rol, ZeroPage, 5),
            (0x36, Rol, ZeroPageX, 6),
            (0x2E, Rol, Absolute, 6),
            (0x3E, Rol, AbsoluteX, 7),
            (0x6A, RorA, Implied, 2),
            (0x66, Ror, ZeroPage, 5),
            (0x76, Ror, ZeroPageX, 6),
            (0x6E, Ror, Absolute, 6),
            (0x7E, Ror, AbsoluteX, 7),
            (0x40, Rti, Implied, 6),
            (0x60, Rts, Implied, 6),
            (0xE9, Sbc, Immediate, 2),
            (0xE5, Sbc, ZeroPage, 3),
            (0xF5, Sbc, ZeroPageX, 4),
            (0xED, Sbc, Absolute, 4),
            (0xFD, Sbc, AbsoluteX, 4),
            (0xF9, Sbc, AbsoluteY, 4),
            (0xE1, Sbc, IndexedIndirect, 6),
            (0xF1, Sbc, IndirectIndexed, 5),
            (0x38, Sec, Implied, 2),
            (0xF8, Sed, Implied, 2),
            (0x78, Sei, Implied, 2),
            (0x85, Sta, ZeroPage, 3),
            (0x95, Sta, ZeroPageX, 4),
            (0x8D, Sta, Absolute, 4),
            (0x9D, Sta, AbsoluteX, 5),
            (0x99, Sta, AbsoluteY, 5),
            (0x81, Sta, IndexedIndirect, 6),
            (0x91, Sta, IndirectIndexed, 6),
            (0x86, Stx, ZeroPage, 3),
            (0x96, Stx, ZeroPageY, 4),
            (0x8E, Stx, Absolute, 4),
            (0x84, Sty, ZeroPage, 3),
            (0x94, Sty, ZeroPageX, 4),
            (0x8C, Sty, Absolute, 4),
            (0xAA, Tax, Implied, 2),
            (0xA8, Tay, Implied, 2),
            (0xBA, Tsx, Implied, 2),
            (0x8A, Txa, Implied, 2),
            (0x9A, Txs, Implied, 2),
            (0x98, Tya, Implied, 2),
        ];

        let mut table = Self::empty();
        let mut i = 0;
        while i < ROWS.len() {
            let (opcode, instruction, mode, cycles) = ROWS[i];
            table.entries[opcode as usize] = Some(OpcodeInfo::new(instruction, mode, cycles));
            i += 1;
        }
        table
    }

    #[inline]
    pub fn get(&self, opcode: u8) -> Option<OpcodeInfo> {
        self.entries[opcode as usize]
    }

    /// Copy of this table with one entry replaced
    #[must_use]
    pub fn with_entry(mut self, opcode: u8, info: Option<OpcodeInfo>) -> Self {
        self.entries[opcode as usize] = info;
        self
    }

    /// Number of legal opcodes
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for OpcodeTable {
    fn default() -> Self {
        OFFICIAL.clone()
    }
}
