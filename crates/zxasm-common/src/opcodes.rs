//! Z80 instruction set.
//!
//! Every mnemonic/operand combination, documented and undocumented, is one
//! [`OpcodeEntry`]. Operands written in the source are classified into
//! [`Operand`]s by the parser and matched against the entries in table order.

use crate::{
    expr::{EvalContext, ExprId},
    types::{AssemblerError, Result, SourceLocation},
};

/// Register and condition names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    A,
    B,
    C,
    D,
    E,
    H,
    L,
    I,
    R,
    Ixh,
    Ixl,
    Iyh,
    Iyl,
    Af,
    AfAlt,
    Bc,
    De,
    Hl,
    Sp,
    Ix,
    Iy,
    Nz,
    Z,
    Nc,
    Po,
    Pe,
    P,
    M,
}

impl Register {
    pub fn from_name(name: &str) -> Option<Self> {
        let register = match name.to_ascii_lowercase().as_str() {
            "a" => Register::A,
            "b" => Register::B,
            "c" => Register::C,
            "d" => Register::D,
            "e" => Register::E,
            "h" => Register::H,
            "l" => Register::L,
            "i" => Register::I,
            "r" => Register::R,
            "ixh" | "xh" => Register::Ixh,
            "ixl" | "xl" => Register::Ixl,
            "iyh" | "yh" => Register::Iyh,
            "iyl" | "yl" => Register::Iyl,
            "af" => Register::Af,
            "af'" => Register::AfAlt,
            "bc" => Register::Bc,
            "de" => Register::De,
            "hl" => Register::Hl,
            "sp" => Register::Sp,
            "ix" => Register::Ix,
            "iy" => Register::Iy,
            "nz" => Register::Nz,
            "z" => Register::Z,
            "nc" => Register::Nc,
            "po" => Register::Po,
            "pe" => Register::Pe,
            "p" => Register::P,
            "m" => Register::M,
            _ => return None,
        };
        Some(register)
    }

    pub fn is_index(self) -> bool {
        matches!(self, Register::Ix | Register::Iy)
    }
}

/// An operand as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// `a`, `hl`, `nz`, ...
    Name(Register),
    /// `(hl)`, `(ix)`, `(c)`, ...
    Indirect(Register),
    /// `(ix+d)` / `(iy-d)`
    Indexed(Register, ExprId),
    /// `(expr)`
    Memory(ExprId),
    Immediate(ExprId),
}

impl Operand {
    pub fn expr(&self) -> Option<ExprId> {
        match self {
            Operand::Indexed(_, e) | Operand::Memory(e) | Operand::Immediate(e) => Some(*e),
            Operand::Name(_) | Operand::Indirect(_) => None,
        }
    }
}

/// Operand slot of a table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    A,
    B,
    C,
    D,
    E,
    H,
    L,
    I,
    R,
    Ixh,
    Ixl,
    Iyh,
    Iyl,
    Af,
    AfAlt,
    Bc,
    De,
    Hl,
    Sp,
    Ix,
    Iy,
    IxByte,
    IyByte,
    MemHl,
    MemBc,
    MemDe,
    MemSp,
    MemIx,
    MemIy,
    MemAddr,
    Byte,
    Word,
    Bit,
    RelOffset,
    PortAddr,
    PortC,
    IntMode,
    RstIndex,
    FlagC,
    FlagNc,
    FlagZ,
    FlagNz,
    FlagM,
    FlagP,
    FlagPe,
    FlagPo,
}

impl OperandKind {
    pub fn accepts(self, operand: &Operand) -> bool {
        use OperandKind as K;
        use Register as R;
        match (self, operand) {
            (K::IxByte, Operand::Indexed(R::Ix, _) | Operand::Indirect(R::Ix)) => true,
            (K::IyByte, Operand::Indexed(R::Iy, _) | Operand::Indirect(R::Iy)) => true,
            (K::MemAddr | K::PortAddr, Operand::Memory(_)) => true,
            (K::Byte | K::Word | K::Bit | K::RelOffset | K::IntMode | K::RstIndex, Operand::Immediate(_)) => true,
            (_, Operand::Indirect(register)) => self.indirect() == Some(*register),
            (_, Operand::Name(register)) => self.name() == Some(*register),
            _ => false,
        }
    }

    fn name(self) -> Option<Register> {
        use OperandKind as K;
        use Register as R;
        let register = match self {
            K::A => R::A,
            K::B => R::B,
            K::C | K::FlagC => R::C,
            K::D => R::D,
            K::E => R::E,
            K::H => R::H,
            K::L => R::L,
            K::I => R::I,
            K::R => R::R,
            K::Ixh => R::Ixh,
            K::Ixl => R::Ixl,
            K::Iyh => R::Iyh,
            K::Iyl => R::Iyl,
            K::Af => R::Af,
            K::AfAlt => R::AfAlt,
            K::Bc => R::Bc,
            K::De => R::De,
            K::Hl => R::Hl,
            K::Sp => R::Sp,
            K::Ix => R::Ix,
            K::Iy => R::Iy,
            K::FlagNc => R::Nc,
            K::FlagZ => R::Z,
            K::FlagNz => R::Nz,
            K::FlagM => R::M,
            K::FlagP => R::P,
            K::FlagPe => R::Pe,
            K::FlagPo => R::Po,
            _ => return None,
        };
        Some(register)
    }

    fn indirect(self) -> Option<Register> {
        match self {
            OperandKind::MemHl => Some(Register::Hl),
            OperandKind::MemBc => Some(Register::Bc),
            OperandKind::MemDe => Some(Register::De),
            OperandKind::MemSp => Some(Register::Sp),
            OperandKind::MemIx => Some(Register::Ix),
            OperandKind::MemIy => Some(Register::Iy),
            OperandKind::PortC => Some(Register::C),
            _ => None,
        }
    }
}

/// One atom of an instruction encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emit {
    Byte(u8),
    /// The first operand as a byte.
    Op1,
    Op2,
    /// The first operand as a little-endian word.
    Op1Word,
    Op2Word,
    /// The first operand OR-ed into a base byte: `bit << 3` or a restart vector.
    Op1Or(u8),
    /// Offset of the first operand from the end of the instruction.
    Op1Relative,
    Op2Relative,
}

#[derive(Debug)]
pub struct OpcodeEntry {
    pub mnemonic: &'static str,
    pub operands: &'static [OperandKind],
    pub encoding: &'static [Emit],
}

impl OpcodeEntry {
    /// Encoded length. Never depends on operand values.
    pub fn size(&self) -> usize {
        self.encoding.len()
    }

    pub fn matches(&self, operands: &[Operand]) -> bool {
        self.operands.len() == operands.len()
            && self
                .operands
                .iter()
                .zip(operands)
                .all(|(kind, operand)| kind.accepts(operand))
    }

    /// Encodes the instruction placed at `address`.
    pub fn encode(&self, operands: &[Operand], ctx: &EvalContext<'_>, address: u64) -> Result<Vec<u8>> {
        let next_address = address as i64 + self.size() as i64;
        let mut bytes = Vec::with_capacity(self.size());
        for emit in self.encoding {
            match *emit {
                Emit::Byte(b) => bytes.push(b),
                Emit::Op1 => bytes.push(self.operand_byte(0, operands, ctx)?),
                Emit::Op2 => bytes.push(self.operand_byte(1, operands, ctx)?),
                Emit::Op1Word => bytes.extend_from_slice(&self.operand_word(0, operands, ctx)?.to_le_bytes()),
                Emit::Op2Word => bytes.extend_from_slice(&self.operand_word(1, operands, ctx)?.to_le_bytes()),
                Emit::Op1Or(base) => bytes.push(self.operand_or(base, operands, ctx)?),
                Emit::Op1Relative => bytes.push(ctx.byte_offset(expr_of(&operands[0])?, next_address)?),
                Emit::Op2Relative => bytes.push(ctx.byte_offset(expr_of(&operands[1])?, next_address)?),
            }
        }
        Ok(bytes)
    }

    fn operand_byte(&self, index: usize, operands: &[Operand], ctx: &EvalContext<'_>) -> Result<u8> {
        let operand = &operands[index];
        match (self.operands[index], operand) {
            (OperandKind::IxByte | OperandKind::IyByte, Operand::Indirect(_)) => Ok(0),
            (OperandKind::IntMode, Operand::Immediate(e)) => match ctx.value(*e)?.number {
                0 => Ok(0x46),
                1 => Ok(0x56),
                2 => Ok(0x5e),
                _ => Err(AssemblerError::evaluation(
                    Some(ctx.exprs.location(*e)),
                    "invalid operand for IM instruction.",
                )),
            },
            (_, operand) => ctx.byte(expr_of(operand)?),
        }
    }

    fn operand_word(&self, index: usize, operands: &[Operand], ctx: &EvalContext<'_>) -> Result<u16> {
        ctx.word(expr_of(&operands[index])?)
    }

    fn operand_or(&self, base: u8, operands: &[Operand], ctx: &EvalContext<'_>) -> Result<u8> {
        let e = expr_of(&operands[0])?;
        let value = ctx.value(e)?.number;
        match self.operands[0] {
            OperandKind::Bit => {
                if !(0..=7).contains(&value) {
                    return Err(AssemblerError::evaluation(
                        Some(ctx.exprs.location(e)),
                        "bit index is out of range.",
                    ));
                }
                Ok(base | ((value as u8) << 3))
            }
            _ => {
                if !(0..=0x38).contains(&value) || value & 7 != 0 {
                    return Err(AssemblerError::evaluation(
                        Some(ctx.exprs.location(e)),
                        "invalid operand for RST instruction.",
                    ));
                }
                Ok(base | value as u8)
            }
        }
    }
}

fn expr_of(operand: &Operand) -> Result<ExprId> {
    operand
        .expr()
        .ok_or_else(|| AssemblerError::internal(None, "operand has no value expression."))
}

/// Finds the first entry for `mnemonic` (case-insensitive) accepting the
/// operands.
pub fn find_opcode(mnemonic: &str, operands: &[Operand], location: &SourceLocation) -> Result<&'static OpcodeEntry> {
    let upper = mnemonic.to_ascii_uppercase();
    Z80_OPCODES
        .iter()
        .filter(|entry| entry.mnemonic == upper)
        .find(|entry| entry.matches(operands))
        .ok_or_else(|| {
            AssemblerError::syntax(Some(location), format!("invalid operands for opcode '{}'.", upper))
        })
}

pub fn is_mnemonic(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    Z80_OPCODES.iter().any(|entry| entry.mnemonic == upper)
}

macro_rules! z80 {
    ($mnemonic:literal, [$($operand:ident),*], [$($emit:expr),*]) => {
        OpcodeEntry {
            mnemonic: $mnemonic,
            operands: &[$(OperandKind::$operand),*],
            encoding: &[$($emit),*],
        }
    };
}

pub use table::Z80_OPCODES;

mod table {
    use super::{Emit::*, OpcodeEntry, OperandKind};

    pub static Z80_OPCODES: &[OpcodeEntry] = &[
        z80!("ADC", [A, A], [Byte(0x8F)]),
        z80!("ADC", [A, B], [Byte(0x88)]),
        z80!("ADC", [A, C], [Byte(0x89)]),
        z80!("ADC", [A, D], [Byte(0x8A)]),
        z80!("ADC", [A, E], [Byte(0x8B)]),
        z80!("ADC", [A, H], [Byte(0x8C)]),
        z80!("ADC", [A, L], [Byte(0x8D)]),
        z80!("ADC", [A, Byte], [Byte(0xCE), Op2]),
        z80!("ADC", [A, MemHl], [Byte(0x8E)]),
        z80!("ADC", [A, Ixh], [Byte(0xDD), Byte(0x8C)]),
        z80!("ADC", [A, Iyh], [Byte(0xFD), Byte(0x8C)]),
        z80!("ADC", [A, Ixl], [Byte(0xDD), Byte(0x8D)]),
        z80!("ADC", [A, Iyl], [Byte(0xFD), Byte(0x8D)]),
        z80!("ADC", [A, IxByte], [Byte(0xDD), Byte(0x8E), Op2]),
        z80!("ADC", [A, IyByte], [Byte(0xFD), Byte(0x8E), Op2]),
        z80!("ADC", [Hl, Bc], [Byte(0xED), Byte(0x4A)]),
        z80!("ADC", [Hl, De], [Byte(0xED), Byte(0x5A)]),
        z80!("ADC", [Hl, Hl], [Byte(0xED), Byte(0x6A)]),
        z80!("ADC", [Hl, Sp], [Byte(0xED), Byte(0x7A)]),
        z80!("ADD", [A, A], [Byte(0x87)]),
        z80!("ADD", [A, B], [Byte(0x80)]),
        z80!("ADD", [A, C], [Byte(0x81)]),
        z80!("ADD", [A, D], [Byte(0x82)]),
        z80!("ADD", [A, E], [Byte(0x83)]),
        z80!("ADD", [A, H], [Byte(0x84)]),
        z80!("ADD", [A, L], [Byte(0x85)]),
        z80!("ADD", [A, Byte], [Byte(0xC6), Op2]),
        z80!("ADD", [A, MemHl], [Byte(0x86)]),
        z80!("ADD", [A, Ixh], [Byte(0xDD), Byte(0x84)]),
        z80!("ADD", [A, Iyh], [Byte(0xFD), Byte(0x84)]),
        z80!("ADD", [A, Ixl], [Byte(0xDD), Byte(0x85)]),
        z80!("ADD", [A, Iyl], [Byte(0xFD), Byte(0x85)]),
        z80!("ADD", [A, IxByte], [Byte(0xDD), Byte(0x86), Op2]),
        z80!("ADD", [A, IyByte], [Byte(0xFD), Byte(0x86), Op2]),
        z80!("ADD", [Hl, Bc], [Byte(0x09)]),
        z80!("ADD", [Hl, De], [Byte(0x19)]),
        z80!("ADD", [Hl, Hl], [Byte(0x29)]),
        z80!("ADD", [Hl, Sp], [Byte(0x39)]),
        z80!("ADD", [Ix, Bc], [Byte(0xDD), Byte(0x09)]),
        z80!("ADD", [Ix, De], [Byte(0xDD), Byte(0x19)]),
        z80!("ADD", [Ix, Ix], [Byte(0xDD), Byte(0x29)]),
        z80!("ADD", [Ix, Sp], [Byte(0xDD), Byte(0x39)]),
        z80!("ADD", [Iy, Bc], [Byte(0xFD), Byte(0x09)]),
        z80!("ADD", [Iy, De], [Byte(0xFD), Byte(0x19)]),
        z80!("ADD", [Iy, Iy], [Byte(0xFD), Byte(0x29)]),
        z80!("ADD", [Iy, Sp], [Byte(0xFD), Byte(0x39)]),
        z80!("AND", [A], [Byte(0xA7)]),
        z80!("AND", [B], [Byte(0xA0)]),
        z80!("AND", [C], [Byte(0xA1)]),
        z80!("AND", [D], [Byte(0xA2)]),
        z80!("AND", [E], [Byte(0xA3)]),
        z80!("AND", [H], [Byte(0xA4)]),
        z80!("AND", [L], [Byte(0xA5)]),
        z80!("AND", [Byte], [Byte(0xE6), Op1]),
        z80!("AND", [MemHl], [Byte(0xA6)]),
        z80!("AND", [IxByte], [Byte(0xDD), Byte(0xA6), Op1]),
        z80!("AND", [IyByte], [Byte(0xFD), Byte(0xA6), Op1]),
        z80!("AND", [Ixh], [Byte(0xDD), Byte(0xA4)]),
        z80!("AND", [Iyh], [Byte(0xFD), Byte(0xA4)]),
        z80!("AND", [Ixl], [Byte(0xDD), Byte(0xA5)]),
        z80!("AND", [Iyl], [Byte(0xFD), Byte(0xA5)]),
        z80!("BIT", [Bit, MemHl], [Byte(0xCB), Op1Or(0x46)]),
        z80!("BIT", [Bit, IxByte], [Byte(0xDD), Byte(0xCB), Op2, Op1Or(0x46)]),
        z80!("BIT", [Bit, IyByte], [Byte(0xFD), Byte(0xCB), Op2, Op1Or(0x46)]),
        z80!("BIT", [Bit, A], [Byte(0xCB), Op1Or(0x47)]),
        z80!("BIT", [Bit, B], [Byte(0xCB), Op1Or(0x40)]),
        z80!("BIT", [Bit, C], [Byte(0xCB), Op1Or(0x41)]),
        z80!("BIT", [Bit, D], [Byte(0xCB), Op1Or(0x42)]),
        z80!("BIT", [Bit, E], [Byte(0xCB), Op1Or(0x43)]),
        z80!("BIT", [Bit, H], [Byte(0xCB), Op1Or(0x44)]),
        z80!("BIT", [Bit, L], [Byte(0xCB), Op1Or(0x45)]),
        z80!("CALL", [Word], [Byte(0xCD), Op1Word]),
        z80!("CALL", [FlagC, Word], [Byte(0xDC), Op2Word]),
        z80!("CALL", [FlagM, Word], [Byte(0xFC), Op2Word]),
        z80!("CALL", [FlagNc, Word], [Byte(0xD4), Op2Word]),
        z80!("CALL", [FlagNz, Word], [Byte(0xC4), Op2Word]),
        z80!("CALL", [FlagP, Word], [Byte(0xF4), Op2Word]),
        z80!("CALL", [FlagPe, Word], [Byte(0xEC), Op2Word]),
        z80!("CALL", [FlagPo, Word], [Byte(0xE4), Op2Word]),
        z80!("CALL", [FlagZ, Word], [Byte(0xCC), Op2Word]),
        z80!("CCF", [], [Byte(0x3F)]),
        z80!("CP", [A], [Byte(0xBF)]),
        z80!("CP", [B], [Byte(0xB8)]),
        z80!("CP", [C], [Byte(0xB9)]),
        z80!("CP", [D], [Byte(0xBA)]),
        z80!("CP", [E], [Byte(0xBB)]),
        z80!("CP", [H], [Byte(0xBC)]),
        z80!("CP", [L], [Byte(0xBD)]),
        z80!("CP", [Byte], [Byte(0xFE), Op1]),
        z80!("CP", [MemHl], [Byte(0xBE)]),
        z80!("CP", [IxByte], [Byte(0xDD), Byte(0xBE), Op1]),
        z80!("CP", [IyByte], [Byte(0xFD), Byte(0xBE), Op1]),
        z80!("CP", [Ixh], [Byte(0xDD), Byte(0xBC)]),
        z80!("CP", [Iyh], [Byte(0xFD), Byte(0xBC)]),
        z80!("CP", [Ixl], [Byte(0xDD), Byte(0xBD)]),
        z80!("CP", [Iyl], [Byte(0xFD), Byte(0xBD)]),
        z80!("CPD", [], [Byte(0xED), Byte(0xA9)]),
        z80!("CPDR", [], [Byte(0xED), Byte(0xB9)]),
        z80!("CPI", [], [Byte(0xED), Byte(0xA1)]),
        z80!("CPIR", [], [Byte(0xED), Byte(0xB1)]),
        z80!("CPL", [], [Byte(0x2F)]),
        z80!("DAA", [], [Byte(0x27)]),
        z80!("DEC", [A], [Byte(0x3D)]),
        z80!("DEC", [B], [Byte(0x05)]),
        z80!("DEC", [C], [Byte(0x0D)]),
        z80!("DEC", [D], [Byte(0x15)]),
        z80!("DEC", [E], [Byte(0x1D)]),
        z80!("DEC", [H], [Byte(0x25)]),
        z80!("DEC", [L], [Byte(0x2D)]),
        z80!("DEC", [MemHl], [Byte(0x35)]),
        z80!("DEC", [IxByte], [Byte(0xDD), Byte(0x35), Op1]),
        z80!("DEC", [IyByte], [Byte(0xFD), Byte(0x35), Op1]),
        z80!("DEC", [Ix], [Byte(0xDD), Byte(0x2B)]),
        z80!("DEC", [Iy], [Byte(0xFD), Byte(0x2B)]),
        z80!("DEC", [Bc], [Byte(0x0B)]),
        z80!("DEC", [De], [Byte(0x1B)]),
        z80!("DEC", [Hl], [Byte(0x2B)]),
        z80!("DEC", [Sp], [Byte(0x3B)]),
        z80!("DEC", [Ixh], [Byte(0xDD), Byte(0x25)]),
        z80!("DEC", [Iyh], [Byte(0xFD), Byte(0x25)]),
        z80!("DEC", [Ixl], [Byte(0xDD), Byte(0x2D)]),
        z80!("DEC", [Iyl], [Byte(0xFD), Byte(0x2D)]),
        z80!("DI", [], [Byte(0xF3)]),
        z80!("DJNZ", [RelOffset], [Byte(0x10), Op1Relative]),
        z80!("EI", [], [Byte(0xFB)]),
        z80!("EX", [MemSp, Hl], [Byte(0xE3)]),
        z80!("EX", [MemSp, Ix], [Byte(0xDD), Byte(0xE3)]),
        z80!("EX", [MemSp, Iy], [Byte(0xFD), Byte(0xE3)]),
        z80!("EX", [Af, AfAlt], [Byte(0x08)]),
        z80!("EX", [De, Hl], [Byte(0xEB)]),
        z80!("EXX", [], [Byte(0xD9)]),
        z80!("HALT", [], [Byte(0x76)]),
        z80!("IM", [IntMode], [Byte(0xED), Op1]),
        z80!("IN", [A, PortAddr], [Byte(0xDB), Op2]),
        z80!("IN", [A, PortC], [Byte(0xED), Byte(0x78)]),
        z80!("IN", [B, PortC], [Byte(0xED), Byte(0x40)]),
        z80!("IN", [C, PortC], [Byte(0xED), Byte(0x48)]),
        z80!("IN", [D, PortC], [Byte(0xED), Byte(0x50)]),
        z80!("IN", [E, PortC], [Byte(0xED), Byte(0x58)]),
        z80!("IN", [H, PortC], [Byte(0xED), Byte(0x60)]),
        z80!("IN", [L, PortC], [Byte(0xED), Byte(0x68)]),
        z80!("INC", [A], [Byte(0x3C)]),
        z80!("INC", [B], [Byte(0x04)]),
        z80!("INC", [C], [Byte(0x0C)]),
        z80!("INC", [D], [Byte(0x14)]),
        z80!("INC", [E], [Byte(0x1C)]),
        z80!("INC", [H], [Byte(0x24)]),
        z80!("INC", [L], [Byte(0x2C)]),
        z80!("INC", [MemHl], [Byte(0x34)]),
        z80!("INC", [IxByte], [Byte(0xDD), Byte(0x34), Op1]),
        z80!("INC", [IyByte], [Byte(0xFD), Byte(0x34), Op1]),
        z80!("INC", [Ix], [Byte(0xDD), Byte(0x23)]),
        z80!("INC", [Iy], [Byte(0xFD), Byte(0x23)]),
        z80!("INC", [Bc], [Byte(0x03)]),
        z80!("INC", [De], [Byte(0x13)]),
        z80!("INC", [Hl], [Byte(0x23)]),
        z80!("INC", [Sp], [Byte(0x33)]),
        z80!("INC", [Ixh], [Byte(0xDD), Byte(0x24)]),
        z80!("INC", [Iyh], [Byte(0xFD), Byte(0x24)]),
        z80!("INC", [Ixl], [Byte(0xDD), Byte(0x2C)]),
        z80!("INC", [Iyl], [Byte(0xFD), Byte(0x2C)]),
        z80!("IND", [], [Byte(0xED), Byte(0xAA)]),
        z80!("INDR", [], [Byte(0xED), Byte(0xBA)]),
        z80!("INI", [], [Byte(0xED), Byte(0xA2)]),
        z80!("INIR", [], [Byte(0xED), Byte(0xB2)]),
        z80!("JP", [Word], [Byte(0xC3), Op1Word]),
        z80!("JP", [FlagC, Word], [Byte(0xDA), Op2Word]),
        z80!("JP", [FlagM, Word], [Byte(0xFA), Op2Word]),
        z80!("JP", [FlagNc, Word], [Byte(0xD2), Op2Word]),
        z80!("JP", [FlagNz, Word], [Byte(0xC2), Op2Word]),
        z80!("JP", [FlagP, Word], [Byte(0xF2), Op2Word]),
        z80!("JP", [FlagPe, Word], [Byte(0xEA), Op2Word]),
        z80!("JP", [FlagPo, Word], [Byte(0xE2), Op2Word]),
        z80!("JP", [FlagZ, Word], [Byte(0xCA), Op2Word]),
        z80!("JP", [MemHl], [Byte(0xE9)]),
        z80!("JP", [MemIx], [Byte(0xDD), Byte(0xE9)]),
        z80!("JP", [MemIy], [Byte(0xFD), Byte(0xE9)]),
        z80!("JR", [RelOffset], [Byte(0x18), Op1Relative]),
        z80!("JR", [FlagC, RelOffset], [Byte(0x38), Op2Relative]),
        z80!("JR", [FlagNc, RelOffset], [Byte(0x30), Op2Relative]),
        z80!("JR", [FlagNz, RelOffset], [Byte(0x20), Op2Relative]),
        z80!("JR", [FlagZ, RelOffset], [Byte(0x28), Op2Relative]),
        z80!("LD", [A, MemAddr], [Byte(0x3A), Op2Word]),
        z80!("LD", [A, MemBc], [Byte(0x0A)]),
        z80!("LD", [A, MemDe], [Byte(0x1A)]),
        z80!("LD", [A, I], [Byte(0xED), Byte(0x57)]),
        z80!("LD", [A, R], [Byte(0xED), Byte(0x5F)]),
        z80!("LD", [MemBc, A], [Byte(0x02)]),
        z80!("LD", [MemDe, A], [Byte(0x12)]),
        z80!("LD", [MemHl, Byte], [Byte(0x36), Op2]),
        z80!("LD", [IxByte, Byte], [Byte(0xDD), Byte(0x36), Op1, Op2]),
        z80!("LD", [IyByte, Byte], [Byte(0xFD), Byte(0x36), Op1, Op2]),
        z80!("LD", [MemAddr, A], [Byte(0x32), Op1Word]),
        z80!("LD", [MemAddr, Hl], [Byte(0x22), Op1Word]),
        z80!("LD", [MemAddr, Bc], [Byte(0xED), Byte(0x43), Op1Word]),
        z80!("LD", [MemAddr, De], [Byte(0xED), Byte(0x53), Op1Word]),
        z80!("LD", [MemAddr, Sp], [Byte(0xED), Byte(0x73), Op1Word]),
        z80!("LD", [MemAddr, Ix], [Byte(0xDD), Byte(0x22), Op1Word]),
        z80!("LD", [MemAddr, Iy], [Byte(0xFD), Byte(0x22), Op1Word]),
        z80!("LD", [Bc, Word], [Byte(0x01), Op2Word]),
        z80!("LD", [De, Word], [Byte(0x11), Op2Word]),
        z80!("LD", [Hl, Word], [Byte(0x21), Op2Word]),
        z80!("LD", [Sp, Word], [Byte(0x31), Op2Word]),
        z80!("LD", [Bc, MemAddr], [Byte(0xED), Byte(0x4B), Op2Word]),
        z80!("LD", [De, MemAddr], [Byte(0xED), Byte(0x5B), Op2Word]),
        z80!("LD", [Hl, MemAddr], [Byte(0x2A), Op2Word]),
        z80!("LD", [Sp, MemAddr], [Byte(0xED), Byte(0x7B), Op2Word]),
        z80!("LD", [MemHl, A], [Byte(0x77)]),
        z80!("LD", [MemHl, B], [Byte(0x70)]),
        z80!("LD", [MemHl, C], [Byte(0x71)]),
        z80!("LD", [MemHl, D], [Byte(0x72)]),
        z80!("LD", [MemHl, E], [Byte(0x73)]),
        z80!("LD", [MemHl, H], [Byte(0x74)]),
        z80!("LD", [MemHl, L], [Byte(0x75)]),
        z80!("LD", [IxByte, A], [Byte(0xDD), Byte(0x77), Op1]),
        z80!("LD", [IxByte, B], [Byte(0xDD), Byte(0x70), Op1]),
        z80!("LD", [IxByte, C], [Byte(0xDD), Byte(0x71), Op1]),
        z80!("LD", [IxByte, D], [Byte(0xDD), Byte(0x72), Op1]),
        z80!("LD", [IxByte, E], [Byte(0xDD), Byte(0x73), Op1]),
        z80!("LD", [IxByte, H], [Byte(0xDD), Byte(0x74), Op1]),
        z80!("LD", [IxByte, L], [Byte(0xDD), Byte(0x75), Op1]),
        z80!("LD", [IyByte, A], [Byte(0xFD), Byte(0x77), Op1]),
        z80!("LD", [IyByte, B], [Byte(0xFD), Byte(0x70), Op1]),
        z80!("LD", [IyByte, C], [Byte(0xFD), Byte(0x71), Op1]),
        z80!("LD", [IyByte, D], [Byte(0xFD), Byte(0x72), Op1]),
        z80!("LD", [IyByte, E], [Byte(0xFD), Byte(0x73), Op1]),
        z80!("LD", [IyByte, H], [Byte(0xFD), Byte(0x74), Op1]),
        z80!("LD", [IyByte, L], [Byte(0xFD), Byte(0x75), Op1]),
        z80!("LD", [I, A], [Byte(0xED), Byte(0x47)]),
        z80!("LD", [Ix, Word], [Byte(0xDD), Byte(0x21), Op2Word]),
        z80!("LD", [Ix, MemAddr], [Byte(0xDD), Byte(0x2A), Op2Word]),
        z80!("LD", [Iy, Word], [Byte(0xFD), Byte(0x21), Op2Word]),
        z80!("LD", [Iy, MemAddr], [Byte(0xFD), Byte(0x2A), Op2Word]),
        z80!("LD", [R, A], [Byte(0xED), Byte(0x4F)]),
        z80!("LD", [A, MemHl], [Byte(0x7E)]),
        z80!("LD", [B, MemHl], [Byte(0x46)]),
        z80!("LD", [C, MemHl], [Byte(0x4E)]),
        z80!("LD", [D, MemHl], [Byte(0x56)]),
        z80!("LD", [E, MemHl], [Byte(0x5E)]),
        z80!("LD", [H, MemHl], [Byte(0x66)]),
        z80!("LD", [L, MemHl], [Byte(0x6E)]),
        z80!("LD", [A, IxByte], [Byte(0xDD), Byte(0x7E), Op2]),
        z80!("LD", [B, IxByte], [Byte(0xDD), Byte(0x46), Op2]),
        z80!("LD", [C, IxByte], [Byte(0xDD), Byte(0x4E), Op2]),
        z80!("LD", [D, IxByte], [Byte(0xDD), Byte(0x56), Op2]),
        z80!("LD", [E, IxByte], [Byte(0xDD), Byte(0x5E), Op2]),
        z80!("LD", [H, IxByte], [Byte(0xDD), Byte(0x66), Op2]),
        z80!("LD", [L, IxByte], [Byte(0xDD), Byte(0x6E), Op2]),
        z80!("LD", [A, IyByte], [Byte(0xFD), Byte(0x7E), Op2]),
        z80!("LD", [B, IyByte], [Byte(0xFD), Byte(0x46), Op2]),
        z80!("LD", [C, IyByte], [Byte(0xFD), Byte(0x4E), Op2]),
        z80!("LD", [D, IyByte], [Byte(0xFD), Byte(0x56), Op2]),
        z80!("LD", [E, IyByte], [Byte(0xFD), Byte(0x5E), Op2]),
        z80!("LD", [H, IyByte], [Byte(0xFD), Byte(0x66), Op2]),
        z80!("LD", [L, IyByte], [Byte(0xFD), Byte(0x6E), Op2]),
        z80!("LD", [A, Byte], [Byte(0x3E), Op2]),
        z80!("LD", [B, Byte], [Byte(0x06), Op2]),
        z80!("LD", [C, Byte], [Byte(0x0E), Op2]),
        z80!("LD", [D, Byte], [Byte(0x16), Op2]),
        z80!("LD", [E, Byte], [Byte(0x1E), Op2]),
        z80!("LD", [H, Byte], [Byte(0x26), Op2]),
        z80!("LD", [L, Byte], [Byte(0x2E), Op2]),
        z80!("LD", [Ixh, Byte], [Byte(0xDD), Byte(0x26), Op2]),
        z80!("LD", [Iyh, Byte], [Byte(0xFD), Byte(0x26), Op2]),
        z80!("LD", [Ixl, Byte], [Byte(0xDD), Byte(0x2E), Op2]),
        z80!("LD", [Iyl, Byte], [Byte(0xFD), Byte(0x2E), Op2]),
        z80!("LD", [A, A], [Byte(0x7F)]),
        z80!("LD", [B, A], [Byte(0x47)]),
        z80!("LD", [C, A], [Byte(0x4F)]),
        z80!("LD", [D, A], [Byte(0x57)]),
        z80!("LD", [E, A], [Byte(0x5F)]),
        z80!("LD", [H, A], [Byte(0x67)]),
        z80!("LD", [L, A], [Byte(0x6F)]),
        z80!("LD", [A, B], [Byte(0x78)]),
        z80!("LD", [B, B], [Byte(0x40)]),
        z80!("LD", [C, B], [Byte(0x48)]),
        z80!("LD", [D, B], [Byte(0x50)]),
        z80!("LD", [E, B], [Byte(0x58)]),
        z80!("LD", [H, B], [Byte(0x60)]),
        z80!("LD", [L, B], [Byte(0x68)]),
        z80!("LD", [A, C], [Byte(0x79)]),
        z80!("LD", [B, C], [Byte(0x41)]),
        z80!("LD", [C, C], [Byte(0x49)]),
        z80!("LD", [D, C], [Byte(0x51)]),
        z80!("LD", [E, C], [Byte(0x59)]),
        z80!("LD", [H, C], [Byte(0x61)]),
        z80!("LD", [L, C], [Byte(0x69)]),
        z80!("LD", [A, D], [Byte(0x7A)]),
        z80!("LD", [B, D], [Byte(0x42)]),
        z80!("LD", [C, D], [Byte(0x4A)]),
        z80!("LD", [D, D], [Byte(0x52)]),
        z80!("LD", [E, D], [Byte(0x5A)]),
        z80!("LD", [H, D], [Byte(0x62)]),
        z80!("LD", [L, D], [Byte(0x6A)]),
        z80!("LD", [A, E], [Byte(0x7B)]),
        z80!("LD", [B, E], [Byte(0x43)]),
        z80!("LD", [C, E], [Byte(0x4B)]),
        z80!("LD", [D, E], [Byte(0x53)]),
        z80!("LD", [E, E], [Byte(0x5B)]),
        z80!("LD", [H, E], [Byte(0x63)]),
        z80!("LD", [L, E], [Byte(0x6B)]),
        z80!("LD", [A, H], [Byte(0x7C)]),
        z80!("LD", [B, H], [Byte(0x44)]),
        z80!("LD", [C, H], [Byte(0x4C)]),
        z80!("LD", [D, H], [Byte(0x54)]),
        z80!("LD", [E, H], [Byte(0x5C)]),
        z80!("LD", [H, H], [Byte(0x64)]),
        z80!("LD", [L, H], [Byte(0x6C)]),
        z80!("LD", [A, L], [Byte(0x7D)]),
        z80!("LD", [B, L], [Byte(0x45)]),
        z80!("LD", [C, L], [Byte(0x4D)]),
        z80!("LD", [D, L], [Byte(0x55)]),
        z80!("LD", [E, L], [Byte(0x5D)]),
        z80!("LD", [H, L], [Byte(0x65)]),
        z80!("LD", [L, L], [Byte(0x6D)]),
        z80!("LD", [B, Ixh], [Byte(0xDD), Byte(0x44)]),
        z80!("LD", [B, Iyh], [Byte(0xFD), Byte(0x44)]),
        z80!("LD", [B, Ixl], [Byte(0xDD), Byte(0x45)]),
        z80!("LD", [B, Iyl], [Byte(0xFD), Byte(0x45)]),
        z80!("LD", [C, Ixh], [Byte(0xDD), Byte(0x4C)]),
        z80!("LD", [C, Iyh], [Byte(0xFD), Byte(0x4C)]),
        z80!("LD", [C, Ixl], [Byte(0xDD), Byte(0x4D)]),
        z80!("LD", [C, Iyl], [Byte(0xFD), Byte(0x4D)]),
        z80!("LD", [D, Ixh], [Byte(0xDD), Byte(0x54)]),
        z80!("LD", [D, Iyh], [Byte(0xFD), Byte(0x54)]),
        z80!("LD", [D, Ixl], [Byte(0xDD), Byte(0x55)]),
        z80!("LD", [D, Iyl], [Byte(0xFD), Byte(0x55)]),
        z80!("LD", [E, Ixh], [Byte(0xDD), Byte(0x5C)]),
        z80!("LD", [E, Iyh], [Byte(0xFD), Byte(0x5C)]),
        z80!("LD", [E, Ixl], [Byte(0xDD), Byte(0x5D)]),
        z80!("LD", [E, Iyl], [Byte(0xFD), Byte(0x5D)]),
        z80!("LD", [Ixh, B], [Byte(0xDD), Byte(0x60)]),
        z80!("LD", [Iyh, B], [Byte(0xFD), Byte(0x60)]),
        z80!("LD", [Ixh, C], [Byte(0xDD), Byte(0x61)]),
        z80!("LD", [Iyh, C], [Byte(0xFD), Byte(0x61)]),
        z80!("LD", [Ixh, D], [Byte(0xDD), Byte(0x62)]),
        z80!("LD", [Iyh, D], [Byte(0xFD), Byte(0x62)]),
        z80!("LD", [Ixh, E], [Byte(0xDD), Byte(0x63)]),
        z80!("LD", [Iyh, E], [Byte(0xFD), Byte(0x63)]),
        z80!("LD", [Ixh, Ixh], [Byte(0xDD), Byte(0x64)]),
        z80!("LD", [Iyh, Iyh], [Byte(0xFD), Byte(0x64)]),
        z80!("LD", [Ixh, Ixl], [Byte(0xDD), Byte(0x65)]),
        z80!("LD", [Iyh, Iyl], [Byte(0xFD), Byte(0x65)]),
        z80!("LD", [Ixh, A], [Byte(0xDD), Byte(0x67)]),
        z80!("LD", [Iyh, A], [Byte(0xFD), Byte(0x67)]),
        z80!("LD", [Ixl, B], [Byte(0xDD), Byte(0x68)]),
        z80!("LD", [Iyl, B], [Byte(0xFD), Byte(0x68)]),
        z80!("LD", [Ixl, C], [Byte(0xDD), Byte(0x69)]),
        z80!("LD", [Iyl, C], [Byte(0xFD), Byte(0x69)]),
        z80!("LD", [Ixl, D], [Byte(0xDD), Byte(0x6A)]),
        z80!("LD", [Iyl, D], [Byte(0xFD), Byte(0x6A)]),
        z80!("LD", [Ixl, E], [Byte(0xDD), Byte(0x6B)]),
        z80!("LD", [Iyl, E], [Byte(0xFD), Byte(0x6B)]),
        z80!("LD", [Ixl, Ixh], [Byte(0xDD), Byte(0x6C)]),
        z80!("LD", [Iyl, Iyh], [Byte(0xFD), Byte(0x6C)]),
        z80!("LD", [Ixl, Ixl], [Byte(0xDD), Byte(0x6D)]),
        z80!("LD", [Iyl, Iyl], [Byte(0xFD), Byte(0x6D)]),
        z80!("LD", [Ixl, A], [Byte(0xDD), Byte(0x6F)]),
        z80!("LD", [Iyl, A], [Byte(0xFD), Byte(0x6F)]),
        z80!("LD", [A, Ixh], [Byte(0xDD), Byte(0x7C)]),
        z80!("LD", [A, Iyh], [Byte(0xFD), Byte(0x7C)]),
        z80!("LD", [A, Ixl], [Byte(0xDD), Byte(0x7D)]),
        z80!("LD", [A, Iyl], [Byte(0xFD), Byte(0x7D)]),
        z80!("LD", [Sp, Hl], [Byte(0xF9)]),
        z80!("LD", [Sp, Ix], [Byte(0xDD), Byte(0xF9)]),
        z80!("LD", [Sp, Iy], [Byte(0xFD), Byte(0xF9)]),
        z80!("LDD", [], [Byte(0xED), Byte(0xA8)]),
        z80!("LDDR", [], [Byte(0xED), Byte(0xB8)]),
        z80!("LDI", [], [Byte(0xED), Byte(0xA0)]),
        z80!("LDIR", [], [Byte(0xED), Byte(0xB0)]),
        z80!("NEG", [], [Byte(0xED), Byte(0x44)]),
        z80!("NOP", [], [Byte(0x00)]),
        z80!("OR", [A], [Byte(0xB7)]),
        z80!("OR", [B], [Byte(0xB0)]),
        z80!("OR", [C], [Byte(0xB1)]),
        z80!("OR", [D], [Byte(0xB2)]),
        z80!("OR", [E], [Byte(0xB3)]),
        z80!("OR", [H], [Byte(0xB4)]),
        z80!("OR", [L], [Byte(0xB5)]),
        z80!("OR", [Byte], [Byte(0xF6), Op1]),
        z80!("OR", [MemHl], [Byte(0xB6)]),
        z80!("OR", [IxByte], [Byte(0xDD), Byte(0xB6), Op1]),
        z80!("OR", [IyByte], [Byte(0xFD), Byte(0xB6), Op1]),
        z80!("OR", [Ixh], [Byte(0xDD), Byte(0xB4)]),
        z80!("OR", [Iyh], [Byte(0xFD), Byte(0xB4)]),
        z80!("OR", [Ixl], [Byte(0xDD), Byte(0xB5)]),
        z80!("OR", [Iyl], [Byte(0xFD), Byte(0xB5)]),
        z80!("OTDR", [], [Byte(0xED), Byte(0xBB)]),
        z80!("OTIR", [], [Byte(0xED), Byte(0xB3)]),
        z80!("OUT", [PortAddr, A], [Byte(0xD3), Op1]),
        z80!("OUT", [PortC, A], [Byte(0xED), Byte(0x79)]),
        z80!("OUT", [PortC, B], [Byte(0xED), Byte(0x41)]),
        z80!("OUT", [PortC, C], [Byte(0xED), Byte(0x49)]),
        z80!("OUT", [PortC, D], [Byte(0xED), Byte(0x51)]),
        z80!("OUT", [PortC, E], [Byte(0xED), Byte(0x59)]),
        z80!("OUT", [PortC, H], [Byte(0xED), Byte(0x61)]),
        z80!("OUT", [PortC, L], [Byte(0xED), Byte(0x69)]),
        z80!("OUTD", [], [Byte(0xED), Byte(0xAB)]),
        z80!("OUTI", [], [Byte(0xED), Byte(0xA3)]),
        z80!("POP", [Ix], [Byte(0xDD), Byte(0xE1)]),
        z80!("POP", [Iy], [Byte(0xFD), Byte(0xE1)]),
        z80!("POP", [Bc], [Byte(0xC1)]),
        z80!("POP", [De], [Byte(0xD1)]),
        z80!("POP", [Hl], [Byte(0xE1)]),
        z80!("POP", [Af], [Byte(0xF1)]),
        z80!("PUSH", [Ix], [Byte(0xDD), Byte(0xE5)]),
        z80!("PUSH", [Iy], [Byte(0xFD), Byte(0xE5)]),
        z80!("PUSH", [Bc], [Byte(0xC5)]),
        z80!("PUSH", [De], [Byte(0xD5)]),
        z80!("PUSH", [Hl], [Byte(0xE5)]),
        z80!("PUSH", [Af], [Byte(0xF5)]),
        z80!("RES", [Bit, A], [Byte(0xCB), Op1Or(0x87)]),
        z80!("RES", [Bit, B], [Byte(0xCB), Op1Or(0x80)]),
        z80!("RES", [Bit, C], [Byte(0xCB), Op1Or(0x81)]),
        z80!("RES", [Bit, D], [Byte(0xCB), Op1Or(0x82)]),
        z80!("RES", [Bit, E], [Byte(0xCB), Op1Or(0x83)]),
        z80!("RES", [Bit, H], [Byte(0xCB), Op1Or(0x84)]),
        z80!("RES", [Bit, L], [Byte(0xCB), Op1Or(0x85)]),
        z80!("RES", [Bit, MemHl], [Byte(0xCB), Op1Or(0x86)]),
        z80!("RES", [Bit, IxByte], [Byte(0xDD), Byte(0xCB), Op2, Op1Or(0x86)]),
        z80!("RES", [Bit, IyByte], [Byte(0xFD), Byte(0xCB), Op2, Op1Or(0x86)]),
        z80!("RET", [], [Byte(0xC9)]),
        z80!("RET", [FlagC], [Byte(0xD8)]),
        z80!("RET", [FlagM], [Byte(0xF8)]),
        z80!("RET", [FlagNc], [Byte(0xD0)]),
        z80!("RET", [FlagNz], [Byte(0xC0)]),
        z80!("RET", [FlagP], [Byte(0xF0)]),
        z80!("RET", [FlagPe], [Byte(0xE8)]),
        z80!("RET", [FlagPo], [Byte(0xE0)]),
        z80!("RET", [FlagZ], [Byte(0xC8)]),
        z80!("RETI", [], [Byte(0xED), Byte(0x4D)]),
        z80!("RETN", [], [Byte(0xED), Byte(0x45)]),
        z80!("RL", [A], [Byte(0xCB), Byte(0x17)]),
        z80!("RL", [B], [Byte(0xCB), Byte(0x10)]),
        z80!("RL", [C], [Byte(0xCB), Byte(0x11)]),
        z80!("RL", [D], [Byte(0xCB), Byte(0x12)]),
        z80!("RL", [E], [Byte(0xCB), Byte(0x13)]),
        z80!("RL", [H], [Byte(0xCB), Byte(0x14)]),
        z80!("RL", [L], [Byte(0xCB), Byte(0x15)]),
        z80!("RL", [MemHl], [Byte(0xCB), Byte(0x16)]),
        z80!("RL", [IxByte], [Byte(0xDD), Byte(0xCB), Op1, Byte(0x16)]),
        z80!("RL", [IyByte], [Byte(0xFD), Byte(0xCB), Op1, Byte(0x16)]),
        z80!("RLA", [], [Byte(0x17)]),
        z80!("RLC", [A], [Byte(0xCB), Byte(0x07)]),
        z80!("RLC", [B], [Byte(0xCB), Byte(0x00)]),
        z80!("RLC", [C], [Byte(0xCB), Byte(0x01)]),
        z80!("RLC", [D], [Byte(0xCB), Byte(0x02)]),
        z80!("RLC", [E], [Byte(0xCB), Byte(0x03)]),
        z80!("RLC", [H], [Byte(0xCB), Byte(0x04)]),
        z80!("RLC", [L], [Byte(0xCB), Byte(0x05)]),
        z80!("RLC", [MemHl], [Byte(0xCB), Byte(0x06)]),
        z80!("RLC", [IxByte], [Byte(0xDD), Byte(0xCB), Op1, Byte(0x06)]),
        z80!("RLC", [IyByte], [Byte(0xFD), Byte(0xCB), Op1, Byte(0x06)]),
        z80!("RLCA", [], [Byte(0x07)]),
        z80!("RLD", [], [Byte(0xED), Byte(0x6F)]),
        z80!("RR", [A], [Byte(0xCB), Byte(0x1F)]),
        z80!("RR", [B], [Byte(0xCB), Byte(0x18)]),
        z80!("RR", [C], [Byte(0xCB), Byte(0x19)]),
        z80!("RR", [D], [Byte(0xCB), Byte(0x1A)]),
        z80!("RR", [E], [Byte(0xCB), Byte(0x1B)]),
        z80!("RR", [H], [Byte(0xCB), Byte(0x1C)]),
        z80!("RR", [L], [Byte(0xCB), Byte(0x1D)]),
        z80!("RR", [MemHl], [Byte(0xCB), Byte(0x1E)]),
        z80!("RR", [IxByte], [Byte(0xDD), Byte(0xCB), Op1, Byte(0x1E)]),
        z80!("RR", [IyByte], [Byte(0xFD), Byte(0xCB), Op1, Byte(0x1E)]),
        z80!("RRA", [], [Byte(0x1F)]),
        z80!("RRC", [A], [Byte(0xCB), Byte(0x0F)]),
        z80!("RRC", [B], [Byte(0xCB), Byte(0x08)]),
        z80!("RRC", [C], [Byte(0xCB), Byte(0x09)]),
        z80!("RRC", [D], [Byte(0xCB), Byte(0x0A)]),
        z80!("RRC", [E], [Byte(0xCB), Byte(0x0B)]),
        z80!("RRC", [H], [Byte(0xCB), Byte(0x0C)]),
        z80!("RRC", [L], [Byte(0xCB), Byte(0x0D)]),
        z80!("RRC", [MemHl], [Byte(0xCB), Byte(0x0E)]),
        z80!("RRC", [IxByte], [Byte(0xDD), Byte(0xCB), Op1, Byte(0x0E)]),
        z80!("RRC", [IyByte], [Byte(0xFD), Byte(0xCB), Op1, Byte(0x0E)]),
        z80!("RRCA", [], [Byte(0x0F)]),
        z80!("RRD", [], [Byte(0xED), Byte(0x67)]),
        z80!("RST", [RstIndex], [Op1Or(0xC7)]),
        z80!("SBC", [A, A], [Byte(0x9F)]),
        z80!("SBC", [A, B], [Byte(0x98)]),
        z80!("SBC", [A, C], [Byte(0x99)]),
        z80!("SBC", [A, D], [Byte(0x9A)]),
        z80!("SBC", [A, E], [Byte(0x9B)]),
        z80!("SBC", [A, H], [Byte(0x9C)]),
        z80!("SBC", [A, L], [Byte(0x9D)]),
        z80!("SBC", [A, Byte], [Byte(0xDE), Op2]),
        z80!("SBC", [A, MemHl], [Byte(0x9E)]),
        z80!("SBC", [A, IxByte], [Byte(0xDD), Byte(0x9E), Op2]),
        z80!("SBC", [A, IyByte], [Byte(0xFD), Byte(0x9E), Op2]),
        z80!("SBC", [Hl, Bc], [Byte(0xED), Byte(0x42)]),
        z80!("SBC", [Hl, De], [Byte(0xED), Byte(0x52)]),
        z80!("SBC", [Hl, Hl], [Byte(0xED), Byte(0x62)]),
        z80!("SBC", [Hl, Sp], [Byte(0xED), Byte(0x72)]),
        z80!("SBC", [A, Ixh], [Byte(0xDD), Byte(0x9C)]),
        z80!("SBC", [A, Iyh], [Byte(0xFD), Byte(0x9C)]),
        z80!("SBC", [A, Ixl], [Byte(0xDD), Byte(0x9D)]),
        z80!("SBC", [A, Iyl], [Byte(0xFD), Byte(0x9D)]),
        z80!("SCF", [], [Byte(0x37)]),
        z80!("SET", [Bit, A], [Byte(0xCB), Op1Or(0xC7)]),
        z80!("SET", [Bit, B], [Byte(0xCB), Op1Or(0xC0)]),
        z80!("SET", [Bit, C], [Byte(0xCB), Op1Or(0xC1)]),
        z80!("SET", [Bit, D], [Byte(0xCB), Op1Or(0xC2)]),
        z80!("SET", [Bit, E], [Byte(0xCB), Op1Or(0xC3)]),
        z80!("SET", [Bit, H], [Byte(0xCB), Op1Or(0xC4)]),
        z80!("SET", [Bit, L], [Byte(0xCB), Op1Or(0xC5)]),
        z80!("SET", [Bit, MemHl], [Byte(0xCB), Op1Or(0xC6)]),
        z80!("SET", [Bit, IxByte], [Byte(0xDD), Byte(0xCB), Op2, Op1Or(0xC6)]),
        z80!("SET", [Bit, IyByte], [Byte(0xFD), Byte(0xCB), Op2, Op1Or(0xC6)]),
        z80!("SLA", [A], [Byte(0xCB), Byte(0x27)]),
        z80!("SLA", [B], [Byte(0xCB), Byte(0x20)]),
        z80!("SLA", [C], [Byte(0xCB), Byte(0x21)]),
        z80!("SLA", [D], [Byte(0xCB), Byte(0x22)]),
        z80!("SLA", [E], [Byte(0xCB), Byte(0x23)]),
        z80!("SLA", [H], [Byte(0xCB), Byte(0x24)]),
        z80!("SLA", [L], [Byte(0xCB), Byte(0x25)]),
        z80!("SLA", [MemHl], [Byte(0xCB), Byte(0x26)]),
        z80!("SLA", [IxByte], [Byte(0xDD), Byte(0xCB), Op1, Byte(0x26)]),
        z80!("SLA", [IyByte], [Byte(0xFD), Byte(0xCB), Op1, Byte(0x26)]),
        z80!("SLL", [B], [Byte(0xCB), Byte(0x30)]),
        z80!("SLL", [C], [Byte(0xCB), Byte(0x31)]),
        z80!("SLL", [D], [Byte(0xCB), Byte(0x32)]),
        z80!("SLL", [E], [Byte(0xCB), Byte(0x33)]),
        z80!("SLL", [H], [Byte(0xCB), Byte(0x34)]),
        z80!("SLL", [L], [Byte(0xCB), Byte(0x35)]),
        z80!("SLL", [MemHl], [Byte(0xCB), Byte(0x36)]),
        z80!("SLL", [IxByte], [Byte(0xDD), Byte(0xCB), Op1, Byte(0x36)]),
        z80!("SLL", [IyByte], [Byte(0xFD), Byte(0xCB), Op1, Byte(0x36)]),
        z80!("SLL", [A], [Byte(0xCB), Byte(0x37)]),
        z80!("SRA", [A], [Byte(0xCB), Byte(0x2F)]),
        z80!("SRA", [B], [Byte(0xCB), Byte(0x28)]),
        z80!("SRA", [C], [Byte(0xCB), Byte(0x29)]),
        z80!("SRA", [D], [Byte(0xCB), Byte(0x2A)]),
        z80!("SRA", [E], [Byte(0xCB), Byte(0x2B)]),
        z80!("SRA", [H], [Byte(0xCB), Byte(0x2C)]),
        z80!("SRA", [L], [Byte(0xCB), Byte(0x2D)]),
        z80!("SRA", [MemHl], [Byte(0xCB), Byte(0x2E)]),
        z80!("SRA", [IxByte], [Byte(0xDD), Byte(0xCB), Op1, Byte(0x2E)]),
        z80!("SRA", [IyByte], [Byte(0xFD), Byte(0xCB), Op1, Byte(0x2E)]),
        z80!("SRL", [A], [Byte(0xCB), Byte(0x3F)]),
        z80!("SRL", [B], [Byte(0xCB), Byte(0x38)]),
        z80!("SRL", [C], [Byte(0xCB), Byte(0x39)]),
        z80!("SRL", [D], [Byte(0xCB), Byte(0x3A)]),
        z80!("SRL", [E], [Byte(0xCB), Byte(0x3B)]),
        z80!("SRL", [H], [Byte(0xCB), Byte(0x3C)]),
        z80!("SRL", [L], [Byte(0xCB), Byte(0x3D)]),
        z80!("SRL", [MemHl], [Byte(0xCB), Byte(0x3E)]),
        z80!("SRL", [IxByte], [Byte(0xDD), Byte(0xCB), Op1, Byte(0x3E)]),
        z80!("SRL", [IyByte], [Byte(0xFD), Byte(0xCB), Op1, Byte(0x3E)]),
        z80!("SUB", [A], [Byte(0x97)]),
        z80!("SUB", [B], [Byte(0x90)]),
        z80!("SUB", [C], [Byte(0x91)]),
        z80!("SUB", [D], [Byte(0x92)]),
        z80!("SUB", [E], [Byte(0x93)]),
        z80!("SUB", [H], [Byte(0x94)]),
        z80!("SUB", [L], [Byte(0x95)]),
        z80!("SUB", [Byte], [Byte(0xD6), Op1]),
        z80!("SUB", [MemHl], [Byte(0x96)]),
        z80!("SUB", [Ixh], [Byte(0xDD), Byte(0x94)]),
        z80!("SUB", [Iyh], [Byte(0xFD), Byte(0x94)]),
        z80!("SUB", [Ixl], [Byte(0xDD), Byte(0x95)]),
        z80!("SUB", [Iyl], [Byte(0xFD), Byte(0x95)]),
        z80!("SUB", [IxByte], [Byte(0xDD), Byte(0x96), Op1]),
        z80!("SUB", [IyByte], [Byte(0xFD), Byte(0x96), Op1]),
        z80!("XOR", [A], [Byte(0xAF)]),
        z80!("XOR", [B], [Byte(0xA8)]),
        z80!("XOR", [C], [Byte(0xA9)]),
        z80!("XOR", [D], [Byte(0xAA)]),
        z80!("XOR", [E], [Byte(0xAB)]),
        z80!("XOR", [H], [Byte(0xAC)]),
        z80!("XOR", [L], [Byte(0xAD)]),
        z80!("XOR", [Byte], [Byte(0xEE), Op1]),
        z80!("XOR", [MemHl], [Byte(0xAE)]),
        z80!("XOR", [IxByte], [Byte(0xDD), Byte(0xAE), Op1]),
        z80!("XOR", [IyByte], [Byte(0xFD), Byte(0xAE), Op1]),
        z80!("XOR", [Ixh], [Byte(0xDD), Byte(0xAC)]),
        z80!("XOR", [Iyh], [Byte(0xFD), Byte(0xAC)]),
        z80!("XOR", [Ixl], [Byte(0xDD), Byte(0xAD)]),
        z80!("XOR", [Iyl], [Byte(0xFD), Byte(0xAD)]),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{BinaryOp, ExprArena, ExprKind, LoopBindings, NoSections, UnaryOp};
    use crate::label::LabelArena;
    use crate::symbol::SymbolTable;

    fn loc() -> SourceLocation {
        SourceLocation::new("opcodes", 1)
    }

    fn encode(exprs: &ExprArena, mnemonic: &str, operands: &[Operand], address: u64) -> Result<Vec<u8>> {
        let symbols = SymbolTable::new();
        let labels = LabelArena::new();
        let bindings = LoopBindings::new();
        let ctx = EvalContext {
            exprs,
            symbols: &symbols,
            labels: &labels,
            sections: &NoSections,
            bindings: &bindings,
            current_address: Some(address as i64),
        };
        find_opcode(mnemonic, operands, &loc())?.encode(operands, &ctx, address)
    }

    #[test]
    fn table_has_every_combination() {
        assert_eq!(Z80_OPCODES.len(), 579);
    }

    #[test]
    fn indexed_with_negative_displacement() {
        let mut exprs = ExprArena::new();
        let five = exprs.alloc(ExprKind::Number(5), loc());
        let d = exprs.alloc(ExprKind::Unary(UnaryOp::Negate, five), loc());
        let operands = [Operand::Name(Register::A), Operand::Indexed(Register::Ix, d)];
        let bytes = encode(&exprs, "adc", &operands, 0).unwrap();
        assert_eq!(bytes, vec![0xdd, 0x8e, 0xfb]);
    }

    #[test]
    fn plain_index_means_zero_displacement() {
        let exprs = ExprArena::new();
        let operands = [Operand::Name(Register::A), Operand::Indirect(Register::Iy)];
        assert_eq!(encode(&exprs, "LD", &operands, 0).unwrap(), vec![0xfd, 0x7e, 0x00]);
    }

    #[test]
    fn c_is_register_and_condition() {
        let mut exprs = ExprArena::new();
        let target = exprs.alloc(ExprKind::Number(0x8000), loc());
        let jp = [Operand::Name(Register::C), Operand::Immediate(target)];
        assert_eq!(encode(&exprs, "jp", &jp, 0).unwrap(), vec![0xda, 0x00, 0x80]);
        let ld = [Operand::Name(Register::A), Operand::Name(Register::C)];
        assert_eq!(encode(&exprs, "ld", &ld, 0).unwrap(), vec![0x79]);
    }

    #[test]
    fn relative_jump_counts_from_next_instruction() {
        let mut exprs = ExprArena::new();
        let target = exprs.alloc(ExprKind::Number(0x8000), loc());
        let operands = [Operand::Immediate(target)];
        assert_eq!(encode(&exprs, "jr", &operands, 0x8000).unwrap(), vec![0x18, 0xfe]);
        assert_eq!(encode(&exprs, "djnz", &operands, 0x8010).unwrap(), vec![0x10, 0xee]);
    }

    #[test]
    fn bit_index_and_restart_vectors() {
        let mut exprs = ExprArena::new();
        let seven = exprs.alloc(ExprKind::Number(7), loc());
        let eight = exprs.alloc(ExprKind::Number(8), loc());
        let bit = [Operand::Immediate(seven), Operand::Name(Register::A)];
        assert_eq!(encode(&exprs, "bit", &bit, 0).unwrap(), vec![0xcb, 0x7f]);
        let bad = [Operand::Immediate(eight), Operand::Name(Register::A)];
        assert_eq!(encode(&exprs, "set", &bad, 0).unwrap_err().message(), "bit index is out of range.");
        assert_eq!(encode(&exprs, "rst", &[Operand::Immediate(eight)], 0).unwrap(), vec![0xcf]);
        assert_eq!(
            encode(&exprs, "rst", &[Operand::Immediate(seven)], 0).unwrap_err().message(),
            "invalid operand for RST instruction."
        );
    }

    #[test]
    fn interrupt_modes() {
        let mut exprs = ExprArena::new();
        let two = exprs.alloc(ExprKind::Number(2), loc());
        let three = exprs.alloc(ExprKind::Number(3), loc());
        assert_eq!(encode(&exprs, "im", &[Operand::Immediate(two)], 0).unwrap(), vec![0xed, 0x5e]);
        assert_eq!(
            encode(&exprs, "im", &[Operand::Immediate(three)], 0).unwrap_err().message(),
            "invalid operand for IM instruction."
        );
    }

    #[test]
    fn memory_and_word_operands() {
        let mut exprs = ExprArena::new();
        let hi = exprs.alloc(ExprKind::Number(0x12), loc());
        let lo = exprs.alloc(ExprKind::Number(0x34), loc());
        let addr = exprs.alloc(ExprKind::Binary(BinaryOp::Add, hi, lo), loc());
        let operands = [Operand::Name(Register::Hl), Operand::Memory(addr)];
        assert_eq!(hex::encode(encode(&exprs, "ld", &operands, 0).unwrap()), "2a4600");
        let port = [Operand::Name(Register::A), Operand::Indirect(Register::C)];
        assert_eq!(hex::encode(encode(&exprs, "in", &port, 0).unwrap()), "ed78");
    }

    #[test]
    fn no_matching_operands() {
        let exprs = ExprArena::new();
        let operands = [Operand::Name(Register::I), Operand::Name(Register::B)];
        let err = encode(&exprs, "ld", &operands, 0).unwrap_err();
        assert_eq!(err.message(), "invalid operands for opcode 'LD'.");
    }
}
