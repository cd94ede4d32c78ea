/// Instruction mnemonic, including the commonly-used unofficial opcodes
/// real cartridge software relies on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    Adc,
    And,
    Asl,
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
    Nop,
    Ora,
    Pha,
    Php,
    Pla,
    Plp,
    Rol,
    Ror,
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
    // Unofficial
    Dcp,
    Isb,
    Lax,
    Rla,
    Rra,
    Sax,
    Slo,
    Sre,
}

/// Addressing mode, the closed set of operand resolution rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Accumulator,
    Implied,
    Immediate,
    Relative,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    /// ($nn,X)
    IndirectX,
    /// ($nn),Y
    IndirectY,
    /// ($nnnn), JMP only
    Indirect,
}

/// One decode table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpCode {
    /// The opcode byte value
    pub code: u8,
    pub mnemonic: Mnemonic,
    pub mode: Mode,
    /// Base cycle count before page-cross and branch-taken penalties
    pub cycles: u8,
    /// Whether a page crossing during operand resolution adds one cycle.
    /// Stores and read-modify-write instructions pay the fixed cost instead.
    pub page_penalty: bool,
}

impl OpCode {
    const fn new(code: u8, mnemonic: Mnemonic, mode: Mode, cycles: u8, page_penalty: bool) -> Self {
        Self {
            code,
            mnemonic,
            mode,
            cycles,
            page_penalty,
        }
    }
}

use Mnemonic::*;
use Mode::*;

/// Complete decode table: every documented opcode plus the unofficial
/// load-and-transfer, store-combine, read-modify-write-combine and
/// multi-byte NOP variants. Bytes absent from this table halt emulation.
pub static OPCODE_TABLE: &[OpCode] = &[
    // 0x00
    OpCode::new(0x00, Brk, Implied, 7, false),
    OpCode::new(0x01, Ora, IndirectX, 6, false),
    OpCode::new(0x03, Slo, IndirectX, 8, false),
    OpCode::new(0x04, Nop, ZeroPage, 3, false),
    OpCode::new(0x05, Ora, ZeroPage, 3, false),
    OpCode::new(0x06, Asl, ZeroPage, 5, false),
    OpCode::new(0x07, Slo, ZeroPage, 5, false),
    OpCode::new(0x08, Php, Implied, 3, false),
    OpCode::new(0x09, Ora, Immediate, 2, false),
    OpCode::new(0x0A, Asl, Accumulator, 2, false),
    OpCode::new(0x0C, Nop, Absolute, 4, false),
    OpCode::new(0x0D, Ora, Absolute, 4, false),
    OpCode::new(0x0E, Asl, Absolute, 6, false),
    OpCode::new(0x0F, Slo, Absolute, 6, false),
    // 0x10
    OpCode::new(0x10, Bpl, Relative, 2, true),
    OpCode::new(0x11, Ora, IndirectY, 5, true),
    OpCode::new(0x13, Slo, IndirectY, 8, false),
    OpCode::new(0x14, Nop, ZeroPageX, 4, false),
    OpCode::new(0x15, Ora, ZeroPageX, 4, false),
    OpCode::new(0x16, Asl, ZeroPageX, 6, false),
    OpCode::new(0x17, Slo, ZeroPageX, 6, false),
    OpCode::new(0x18, Clc, Implied, 2, false),
    OpCode::new(0x19, Ora, AbsoluteY, 4, true),
    OpCode::new(0x1A, Nop, Implied, 2, false),
    OpCode::new(0x1B, Slo, AbsoluteY, 7, false),
    OpCode::new(0x1C, Nop, AbsoluteX, 4, true),
    OpCode::new(0x1D, Ora, AbsoluteX, 4, true),
    OpCode::new(0x1E, Asl, AbsoluteX, 7, false),
    OpCode::new(0x1F, Slo, AbsoluteX, 7, false),
    // 0x20
    OpCode::new(0x20, Jsr, Absolute, 6, false),
    OpCode::new(0x21, And, IndirectX, 6, false),
    OpCode::new(0x23, Rla, IndirectX, 8, false),
    OpCode::new(0x24, Bit, ZeroPage, 3, false),
    OpCode::new(0x25, And, ZeroPage, 3, false),
    OpCode::new(0x26, Rol, ZeroPage, 5, false),
    OpCode::new(0x27, Rla, ZeroPage, 5, false),
    OpCode::new(0x28, Plp, Implied, 4, false),
    OpCode::new(0x29, And, Immediate, 2, false),
    OpCode::new(0x2A, Rol, Accumulator, 2, false),
    OpCode::new(0x2C, Bit, Absolute, 4, false),
    OpCode::new(0x2D, And, Absolute, 4, false),
    OpCode::new(0x2E, Rol, Absolute, 6, false),
    OpCode::new(0x2F, Rla, Absolute, 6, false),
    // 0x30
    OpCode::new(0x30, Bmi, Relative, 2, true),
    OpCode::new(0x31, And, IndirectY, 5, true),
    OpCode::new(0x33, Rla, IndirectY, 8, false),
    OpCode::new(0x34, Nop, ZeroPageX, 4, false),
    OpCode::new(0x35, And, ZeroPageX, 4, false),
    OpCode::new(0x36, Rol, ZeroPageX, 6, false),
    OpCode::new(0x37, Rla, ZeroPageX, 6, false),
    OpCode::new(0x38, Sec, Implied, 2, false),
    OpCode::new(0x39, And, AbsoluteY, 4, true),
    OpCode::new(0x3A, Nop, Implied, 2, false),
    OpCode::new(0x3B, Rla, AbsoluteY, 7, false),
    OpCode::new(0x3C, Nop, AbsoluteX, 4, true),
    OpCode::new(0x3D, And, AbsoluteX, 4, true),
    OpCode::new(0x3E, Rol, AbsoluteX, 7, false),
    OpCode::new(0x3F, Rla, AbsoluteX, 7, false),
    // 0x40
    OpCode::new(0x40, Rti, Implied, 6, false),
    OpCode::new(0x41, Eor, IndirectX, 6, false),
    OpCode::new(0x43, Sre, IndirectX, 8, false),
    OpCode::new(0x44, Nop, ZeroPage, 3, false),
    OpCode::new(0x45, Eor, ZeroPage, 3, false),
    OpCode::new(0x46, Lsr, ZeroPage, 5, false),
    OpCode::new(0x47, Sre, ZeroPage, 5, false),
    OpCode::new(0x48, Pha, Implied, 3, false),
    OpCode::new(0x49, Eor, Immediate, 2, false),
    OpCode::new(0x4A, Lsr, Accumulator, 2, false),
    OpCode::new(0x4C, Jmp, Absolute, 3, false),
    OpCode::new(0x4D, Eor, Absolute, 4, false),
    OpCode::new(0x4E, Lsr, Absolute, 6, false),
    OpCode::new(0x4F, Sre, Absolute, 6, false),
    // 0x50
    OpCode::new(0x50, Bvc, Relative, 2, true),
    OpCode::new(0x51, Eor, IndirectY, 5, true),
    OpCode::new(0x53, Sre, IndirectY, 8, false),
    OpCode::new(0x54, Nop, ZeroPageX, 4, false),
    OpCode::new(0x55, Eor, ZeroPageX, 4, false),
    OpCode::new(0x56, Lsr, ZeroPageX, 6, false),
    OpCode::new(0x57, Sre, ZeroPageX, 6, false),
    OpCode::new(0x58, Cli, Implied, 2, false),
    OpCode::new(0x59, Eor, AbsoluteY, 4, true),
    OpCode::new(0x5A, Nop, Implied, 2, false),
    OpCode::new(0x5B, Sre, AbsoluteY, 7, false),
    OpCode::new(0x5C, Nop, AbsoluteX, 4, true),
    OpCode::new(0x5D, Eor, AbsoluteX, 4, true),
    OpCode::new(0x5E, Lsr, AbsoluteX, 7, false),
    OpCode::new(0x5F, Sre, AbsoluteX, 7, false),
    // 0x60
    OpCode::new(0x60, Rts, Implied, 6, false),
    OpCode::new(0x61, Adc, IndirectX, 6, false),
    OpCode::new(0x63, Rra, IndirectX, 8, false),
    OpCode::new(0x64, Nop, ZeroPage, 3, false),
    OpCode::new(0x65, Adc, ZeroPage, 3, false),
    OpCode::new(0x66, Ror, ZeroPage, 5, false),
    OpCode::new(0x67, Rra, ZeroPage, 5, false),
    OpCode::new(0x68, Pla, Implied, 4, false),
    OpCode::new(0x69, Adc, Immediate, 2, false),
    OpCode::new(0x6A, Ror, Accumulator, 2, false),
    OpCode::new(0x6C, Jmp, Indirect, 5, false),
    OpCode::new(0x6D, Adc, Absolute, 4, false),
    OpCode::new(0x6E, Ror, Absolute, 6, false),
    OpCode::new(0x6F, Rra, Absolute, 6, false),
    // 0x70
    OpCode::new(0x70, Bvs, Relative, 2, true),
    OpCode::new(0x71, Adc, IndirectY, 5, true),
    OpCode::new(0x73, Rra, IndirectY, 8, false),
    OpCode::new(0x74, Nop, ZeroPageX, 4, false),
    OpCode::new(0x75, Adc, ZeroPageX, 4, false),
    OpCode::new(0x76, Ror, ZeroPageX, 6, false),
    OpCode::new(0x77, Rra, ZeroPageX, 6, false),
    OpCode::new(0x78, Sei, Implied, 2, false),
    OpCode::new(0x79, Adc, AbsoluteY, 4, true),
    OpCode::new(0x7A, Nop, Implied, 2, false),
    OpCode::new(0x7B, Rra, AbsoluteY, 7, false),
    OpCode::new(0x7C, Nop, AbsoluteX, 4, true),
    OpCode::new(0x7D, Adc, AbsoluteX, 4, true),
    OpCode::new(0x7E, Ror, AbsoluteX, 7, false),
    OpCode::new(0x7F, Rra, AbsoluteX, 7, false),
    // 0x80
    OpCode::new(0x80, Nop, Immediate, 2, false),
    OpCode::new(0x81, Sta, IndirectX, 6, false),
    OpCode::new(0x82, Nop, Immediate, 2, false),
    OpCode::new(0x83, Sax, IndirectX, 6, false),
    OpCode::new(0x84, Sty, ZeroPage, 3, false),
    OpCode::new(0x85, Sta, ZeroPage, 3, false),
    OpCode::new(0x86, Stx, ZeroPage, 3, false),
    OpCode::new(0x87, Sax, ZeroPage, 3, false),
    OpCode::new(0x88, Dey, Implied, 2, false),
    OpCode::new(0x89, Nop, Immediate, 2, false),
    OpCode::new(0x8A, Txa, Implied, 2, false),
    OpCode::new(0x8C, Sty, Absolute, 4, false),
    OpCode::new(0x8D, Sta, Absolute, 4, false),
    OpCode::new(0x8E, Stx, Absolute, 4, false),
    OpCode::new(0x8F, Sax, Absolute, 4, false),
    // 0x90
    OpCode::new(0x90, Bcc, Relative, 2, true),
    OpCode::new(0x91, Sta, IndirectY, 6, false),
    OpCode::new(0x94, Sty, ZeroPageX, 4, false),
    OpCode::new(0x95, Sta, ZeroPageX, 4, false),
    OpCode::new(0x96, Stx, ZeroPageY, 4, false),
    OpCode::new(0x97, Sax, ZeroPageY, 4, false),
    OpCode::new(0x98, Tya, Implied, 2, false),
    OpCode::new(0x99, Sta, AbsoluteY, 5, false),
    OpCode::new(0x9A, Txs, Implied, 2, false),
    OpCode::new(0x9D, Sta, AbsoluteX, 5, false),
    // 0xA0
    OpCode::new(0xA0, Ldy, Immediate, 2, false),
    OpCode::new(0xA1, Lda, IndirectX, 6, false),
    OpCode::new(0xA2, Ldx, Immediate, 2, false),
    OpCode::new(0xA3, Lax, IndirectX, 6, false),
    OpCode::new(0xA4, Ldy, ZeroPage, 3, false),
    OpCode::new(0xA5, Lda, ZeroPage, 3, false),
    OpCode::new(0xA6, Ldx, ZeroPage, 3, false),
    OpCode::new(0xA7, Lax, ZeroPage, 3, false),
    OpCode::new(0xA8, Tay, Implied, 2, false),
    OpCode::new(0xA9, Lda, Immediate, 2, false),
    OpCode::new(0xAA, Tax, Implied, 2, false),
    OpCode::new(0xAC, Ldy, Absolute, 4, false),
    OpCode::new(0xAD, Lda, Absolute, 4, false),
    OpCode::new(0xAE, Ldx, Absolute, 4, false),
    OpCode::new(0xAF, Lax, Absolute, 4, false),
    // 0xB0
    OpCode::new(0xB0, Bcs, Relative, 2, true),
    OpCode::new(0xB1, Lda, IndirectY, 5, true),
    OpCode::new(0xB3, Lax, IndirectY, 5, true),
    OpCode::new(0xB4, Ldy, ZeroPageX, 4, false),
    OpCode::new(0xB5, Lda, ZeroPageX, 4, false),
    OpCode::new(0xB6, Ldx, ZeroPageY, 4, false),
    OpCode::new(0xB7, Lax, ZeroPageY, 4, false),
    OpCode::new(0xB8, Clv, Implied, 2, false),
    OpCode::new(0xB9, Lda, AbsoluteY, 4, true),
    OpCode::new(0xBA, Tsx, Implied, 2, false),
    OpCode::new(0xBC, Ldy, AbsoluteX, 4, true),
    OpCode::new(0xBD, Lda, AbsoluteX, 4, true),
    OpCode::new(0xBE, Ldx, AbsoluteY, 4, true),
    OpCode::new(0xBF, Lax, AbsoluteY, 4, true),
    // 0xC0
    OpCode::new(0xC0, Cpy, Immediate, 2, false),
    OpCode::new(0xC1, Cmp, IndirectX, 6, false),
    OpCode::new(0xC2, Nop, Immediate, 2, false),
    OpCode::new(0xC3, Dcp, IndirectX, 8, false),
    OpCode::new(0xC4, Cpy, ZeroPage, 3, false),
    OpCode::new(0xC5, Cmp, ZeroPage, 3, false),
    OpCode::new(0xC6, Dec, ZeroPage, 5, false),
    OpCode::new(0xC7, Dcp, ZeroPage, 5, false),
    OpCode::new(0xC8, Iny, Implied, 2, false),
    OpCode::new(0xC9, Cmp, Immediate, 2, false),
    OpCode::new(0xCA, Dex, Implied, 2, false),
    OpCode::new(0xCC, Cpy, Absolute, 4, false),
    OpCode::new(0xCD, Cmp, Absolute, 4, false),
    OpCode::new(0xCE, Dec, Absolute, 6, false),
    OpCode::new(0xCF, Dcp, Absolute, 6, false),
    // 0xD0
    OpCode::new(0xD0, Bne, Relative, 2, true),
    OpCode::new(0xD1, Cmp, IndirectY, 5, true),
    OpCode::new(0xD3, Dcp, IndirectY, 8, false),
    OpCode::new(0xD4, Nop, ZeroPageX, 4, false),
    OpCode::new(0xD5, Cmp, ZeroPageX, 4, false),
    OpCode::new(0xD6, Dec, ZeroPageX, 6, false),
    OpCode::new(0xD7, Dcp, ZeroPageX, 6, false),
    OpCode::new(0xD8, Cld, Implied, 2, false),
    OpCode::new(0xD9, Cmp, AbsoluteY, 4, true),
    OpCode::new(0xDA, Nop, Implied, 2, false),
    OpCode::new(0xDB, Dcp, AbsoluteY, 7, false),
    OpCode::new(0xDC, Nop, AbsoluteX, 4, true),
    OpCode::new(0xDD, Cmp, AbsoluteX, 4, true),
    OpCode::new(0xDE, Dec, AbsoluteX, 7, false),
    OpCode::new(0xDF, Dcp, AbsoluteX, 7, false),
    // 0xE0
    OpCode::new(0xE0, Cpx, Immediate, 2, false),
    OpCode::new(0xE1, Sbc, IndirectX, 6, false),
    OpCode::new(0xE2, Nop, Immediate, 2, false),
    OpCode::new(0xE3, Isb, IndirectX, 8, false),
    OpCode::new(0xE4, Cpx, ZeroPage, 3, false),
    OpCode::new(0xE5, Sbc, ZeroPage, 3, false),
    OpCode::new(0xE6, Inc, ZeroPage, 5, false),
    OpCode::new(0xE7, Isb, ZeroPage, 5, false),
    OpCode::new(0xE8, Inx, Implied, 2, false),
    OpCode::new(0xE9, Sbc, Immediate, 2, false),
    OpCode::new(0xEA, Nop, Implied, 2, false),
    OpCode::new(0xEB, Sbc, Immediate, 2, false),
    OpCode::new(0xEC, Cpx, Absolute, 4, false),
    OpCode::new(0xED, Sbc, Absolute, 4, false),
    OpCode::new(0xEE, Inc, Absolute, 6, false),
    OpCode::new(0xEF, Isb, Absolute, 6, false),
    // 0xF0
    OpCode::new(0xF0, Beq, Relative, 2, true),
    OpCode::new(0xF1, Sbc, IndirectY, 5, true),
    OpCode::new(0xF3, Isb, IndirectY, 8, false),
    OpCode::new(0xF4, Nop, ZeroPageX, 4, false),
    OpCode::new(0xF5, Sbc, ZeroPageX, 4, false),
    OpCode::new(0xF6, Inc, ZeroPageX, 6, false),
    OpCode::new(0xF7, Isb, ZeroPageX, 6, false),
    OpCode::new(0xF8, Sed, Implied, 2, false),
    OpCode::new(0xF9, Sbc, AbsoluteY, 4, true),
    OpCode::new(0xFA, Nop, Implied, 2, false),
    OpCode::new(0xFB, Isb, AbsoluteY, 7, false),
    OpCode::new(0xFC, Nop, AbsoluteX, 4, true),
    OpCode::new(0xFD, Sbc, AbsoluteX, 4, true),
    OpCode::new(0xFE, Inc, AbsoluteX, 7, false),
    OpCode::new(0xFF, Isb, AbsoluteX, 7, false),
];

/// Look up an opcode by its byte value
pub fn lookup(code: u8) -> Option<&'static OpCode> {
    OPCODE_TABLE.iter().find(|op| op.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Documented base cycle count for every implemented opcode byte;
    /// 0 marks bytes intentionally absent from the table.
    #[rustfmt::skip]
    const REFERENCE_CYCLES: [u8; 256] = [
        /*0x00*/ 7,6,0,8,3,3,5,5,3,2,2,0,4,4,6,6,
        /*0x10*/ 2,5,0,8,4,4,6,6,2,4,2,7,4,4,7,7,
        /*0x20*/ 6,6,0,8,3,3,5,5,4,2,2,0,4,4,6,6,
        /*0x30*/ 2,5,0,8,4,4,6,6,2,4,2,7,4,4,7,7,
        /*0x40*/ 6,6,0,8,3,3,5,5,3,2,2,0,3,4,6,6,
        /*0x50*/ 2,5,0,8,4,4,6,6,2,4,2,7,4,4,7,7,
        /*0x60*/ 6,6,0,8,3,3,5,5,4,2,2,0,5,4,6,6,
        /*0x70*/ 2,5,0,8,4,4,6,6,2,4,2,7,4,4,7,7,
        /*0x80*/ 2,6,2,6,3,3,3,3,2,2,2,0,4,4,4,4,
        /*0x90*/ 2,6,0,0,4,4,4,4,2,5,2,0,0,5,0,0,
        /*0xA0*/ 2,6,2,6,3,3,3,3,2,2,2,0,4,4,4,4,
        /*0xB0*/ 2,5,0,5,4,4,4,4,2,4,2,0,4,4,4,4,
        /*0xC0*/ 2,6,2,8,3,3,5,5,2,2,2,0,4,4,6,6,
        /*0xD0*/ 2,5,0,8,4,4,6,6,2,4,2,7,4,4,7,7,
        /*0xE0*/ 2,6,2,8,3,3,5,5,2,2,2,2,4,4,6,6,
        /*0xF0*/ 2,5,0,8,4,4,6,6,2,4,2,7,4,4,7,7,
    ];

    #[test]
    fn test_every_entry_matches_reference_cycles() {
        for op in OPCODE_TABLE {
            assert_eq!(
                op.cycles, REFERENCE_CYCLES[op.code as usize],
                "base cycles wrong for opcode 0x{:02X} ({:?} {:?})",
                op.code, op.mnemonic, op.mode
            );
        }
    }

    #[test]
    fn test_every_reference_slot_has_an_entry() {
        for (code, &cycles) in REFERENCE_CYCLES.iter().enumerate() {
            if cycles > 0 {
                assert!(
                    lookup(code as u8).is_some(),
                    "opcode 0x{code:02X} missing from table"
                );
            }
        }
    }

    #[test]
    fn test_all_opcodes_unique() {
        use std::collections::HashSet;
        let mut codes = HashSet::new();
        for op in OPCODE_TABLE {
            assert!(codes.insert(op.code), "Duplicate opcode: 0x{:02X}", op.code);
        }
    }

    #[test]
    fn test_lookup_lda_immediate() {
        let op = lookup(0xA9).unwrap();
        assert_eq!(op.mnemonic, Mnemonic::Lda);
        assert_eq!(op.mode, Mode::Immediate);
        assert_eq!(op.cycles, 2);
    }

    #[test]
    fn test_lookup_unknown_byte_is_none() {
        assert!(lookup(0x02).is_none());
        assert!(lookup(0x92).is_none());
    }

    #[test]
    fn test_stores_and_rmw_carry_no_page_penalty() {
        for op in OPCODE_TABLE {
            let is_store_or_rmw = matches!(
                op.mnemonic,
                Mnemonic::Sta
                    | Mnemonic::Stx
                    | Mnemonic::Sty
                    | Mnemonic::Sax
                    | Mnemonic::Asl
                    | Mnemonic::Lsr
                    | Mnemonic::Rol
                    | Mnemonic::Ror
                    | Mnemonic::Inc
                    | Mnemonic::Dec
                    | Mnemonic::Slo
                    | Mnemonic::Sre
                    | Mnemonic::Rla
                    | Mnemonic::Rra
                    | Mnemonic::Dcp
                    | Mnemonic::Isb
            );
            if is_store_or_rmw {
                assert!(
                    !op.page_penalty,
                    "opcode 0x{:02X} must not take a page-cross penalty",
                    op.code
                );
            }
        }
    }

    #[test]
    fn test_branches_take_page_penalty() {
        for op in OPCODE_TABLE {
            if op.mode == Mode::Relative {
                assert!(op.page_penalty, "branch 0x{:02X} missing penalty", op.code);
            }
        }
    }
}
