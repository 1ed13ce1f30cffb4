use std::fmt;

use crate::value::Value;
use crate::{Addr, Reg};

/// Parse failure for a mnemonic enum.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseEnumError {
    pub value: String,
    pub enum_name: &'static str,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Failed to parse \"{}\" as {}.",
            &self.value, &self.enum_name
        )
    }
}

impl std::error::Error for ParseEnumError {}

/// Wires a mnemonic table to `Display` and `FromStr` for an opcode enum.
macro_rules! impl_mnemonics {
    ($e:ident { $( $variant:ident => $text:expr ),+ $(,)? }) => {
        impl $e {
            pub fn mnemonic(self) -> &'static str {
                match self {
                    $( $e::$variant => $text, )+
                }
            }
        }

        impl fmt::Display for $e {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(self.mnemonic())
            }
        }

        impl std::str::FromStr for $e {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok($e::$variant), )+
                    _ => Err(ParseEnumError {
                        value: s.to_owned(),
                        enum_name: stringify!($e),
                    }),
                }
            }
        }
    };
}

/// Three-operand arithmetic opcodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    //  Mnemonic | Effect
    //-----------+--------------------------------------------------
    Add, // ADD  | dst = lhs + rhs
    Sub, // SUB  | dst = lhs - rhs
    Mtp, // MTP  | dst = lhs * rhs
    Div, // DIV  | dst = lhs / rhs (always float)
    Exp, // EXP  | dst = lhs ^ rhs
    Mod, // MOD  | dst = lhs mod rhs (floored)
    Fdv, // FDV  | dst = lhs div rhs (floored, always integer)
}

impl_mnemonics!(BinaryOp {
    Add => "ADD",
    Sub => "SUB",
    Mtp => "MTP",
    Div => "DIV",
    Exp => "EXP",
    Mod => "MOD",
    Fdv => "FDV",
});

/// Branch conditions, tested against the status register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchCond {
    Al, // BAL | always
    Eq, // BEQ | last compare was equal
    Ne, // BNE | last compare was not equal
    Gt, // BGT | last compare was greater than
    Lt, // BLT | last compare was less than
}

impl_mnemonics!(BranchCond {
    Al => "BAL",
    Eq => "BEQ",
    Ne => "BNE",
    Gt => "BGT",
    Lt => "BLT",
});

/// An instruction operand.
///
/// The textual forms are `#42` / `#2.5` for immediates, `r0`..`r7` for
/// registers, and a bare integer for a data-memory address.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Operand {
    Immediate(Value),
    Register(Reg),
    Address(Addr),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Operand::Immediate(value) => write!(f, "#{}", value),
            Operand::Register(reg) => write!(f, "r{}", reg),
            Operand::Address(addr) => write!(f, "{}", addr),
        }
    }
}

/// A fully resolved machine instruction.
///
/// | Mnemonic | Operands          | Effect                                     |
/// |----------|-------------------|--------------------------------------------|
/// | `MOV`    | rd, src           | rd = src (immediate or register)           |
/// | `LDR`    | rd, addr          | rd = memory\[addr\]                        |
/// | `STR`    | rs, addr          | memory\[addr\] = rs                        |
/// | `ADD`..  | rd, lhs, rhs      | rd = lhs op rhs (see [`BinaryOp`])         |
/// | `CMP`    | lhs, rhs          | status = (eq, ne, gt, lt) of lhs vs rhs    |
/// | `BAL`..  | target            | jump to absolute index (see [`BranchCond`])|
/// | `PRT`    | src               | append src to the output stream            |
/// | `HALT`   |                   | stop execution                             |
///
/// Load and store addresses may be given as a bare address, an immediate, or
/// a register holding a cell index.
///
/// [`BinaryOp`]: enum.BinaryOp.html
/// [`BranchCond`]: enum.BranchCond.html
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Instruction {
    Mov {
        dst: Reg,
        src: Operand,
    },
    Ldr {
        dst: Reg,
        addr: Operand,
    },
    Str {
        src: Reg,
        addr: Operand,
    },
    Binary {
        op: BinaryOp,
        dst: Reg,
        lhs: Operand,
        rhs: Operand,
    },
    Cmp {
        lhs: Operand,
        rhs: Operand,
    },
    Branch {
        cond: BranchCond,
        target: usize,
    },
    Prt {
        src: Operand,
    },
    Halt,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Instruction::*;

        match *self {
            Mov { dst, src } => write!(f, "MOV r{} {}", dst, src),
            Ldr { dst, addr } => write!(f, "LDR r{} {}", dst, addr),
            Str { src, addr } => write!(f, "STR r{} {}", src, addr),
            Binary { op, dst, lhs, rhs } => write!(f, "{} r{} {} {}", op, dst, lhs, rhs),
            Cmp { lhs, rhs } => write!(f, "CMP {} {}", lhs, rhs),
            Branch { cond, target } => write!(f, "{} {}", cond, target),
            Prt { src } => write!(f, "PRT {}", src),
            Halt => f.write_str("HALT"),
        }
    }
}
