use std::fmt;

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::ToPrimitive;
use pvm::{BinaryOp, BranchCond, Instruction, Operand, Value};

/// Number of 16-bit words in a persisted memory image.
pub const IMAGE_WORDS: usize = 256;

/// Opcode tags of the 16-bit machine encoding (top four bits of the word).
///
/// Word layouts, low bit first:
///
/// | Instruction | Bits 0-2 | Bits 3-10      | Bit 11           |
/// |-------------|----------|----------------|------------------|
/// | `LDR`/`STR` | register | address        | address register |
/// | `MOV`       | dst      | src (bits 6-8) | src is register  |
/// | `CMP`       | -        | lhs 3-5, rhs 6-8 | rhs is register |
/// | arithmetic  | dst      | lhs 3-5, rhs 6-8 | rhs is register |
/// | branches    | target (bits 0-7) | condition (bits 10-11, tag 7 only) | - |
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum Tag {
    Ldr = 0,
    Str = 1,
    Add = 2,
    Sub = 3,
    Mov = 4,
    Cmp = 5,
    Bal = 6,
    Cond = 7,
    Mtp = 8,
    Div = 9,
    Exp = 10,
    Mod = 11,
    Fdv = 12,
    Halt = 15,
}

const TAG_SHIFT: u32 = 12;
const REGISTER_FLAG: u16 = 1 << 11;

/// An instruction that does not fit the fixed-width encoding.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodeError {
    /// Index of the offending instruction.
    pub index: usize,
    pub kind: EncodeErrorKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EncodeErrorKind {
    FieldOverflow { value: i64, width: u32 },
    FloatImmediate(f64),
    ProgramTooLarge(usize),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "instruction {}: {}", self.index, self.kind)
    }
}

impl fmt::Display for EncodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            EncodeErrorKind::FieldOverflow { value, width } => {
                write!(f, "value {} does not fit in a {}-bit field", value, width)
            }
            EncodeErrorKind::FloatImmediate(value) => {
                write!(f, "float immediate {} cannot be encoded", value)
            }
            EncodeErrorKind::ProgramTooLarge(len) => {
                write!(f, "program of {} words exceeds the {}-word image", len, IMAGE_WORDS)
            }
        }
    }
}

impl std::error::Error for EncodeError {}

/// Encodes a program into 16-bit machine words.
///
/// `PRT` rows are dropped: they have no hardware counterpart, and skipping
/// them keeps compiled programs assemblable.
pub fn encode(program: &[Instruction]) -> Result<Vec<u16>, EncodeError> {
    let mut words = Vec::with_capacity(program.len());
    for (index, instruction) in program.iter().enumerate() {
        if let Instruction::Prt { .. } = instruction {
            continue;
        }
        words.push(encode_instruction(index, instruction)?);
    }
    if words.len() > IMAGE_WORDS {
        return Err(EncodeError {
            index: 0,
            kind: EncodeErrorKind::ProgramTooLarge(words.len()),
        });
    }
    Ok(words)
}

fn encode_instruction(index: usize, instruction: &Instruction) -> Result<u16, EncodeError> {
    let word = match *instruction {
        Instruction::Ldr { dst, addr } => {
            tag_bits(Tag::Ldr)
                | field(index, dst as i64, 3, 0)?
                | field(index, operand_value(index, addr)?, 8, 3)?
                | register_flag(addr)
        }
        Instruction::Str { src, addr } => {
            tag_bits(Tag::Str)
                | field(index, src as i64, 3, 0)?
                | field(index, operand_value(index, addr)?, 8, 3)?
                | register_flag(addr)
        }
        Instruction::Mov { dst, src } => {
            tag_bits(Tag::Mov)
                | field(index, dst as i64, 3, 0)?
                | field(index, operand_value(index, src)?, 3, 6)?
                | register_flag(src)
        }
        Instruction::Cmp { lhs, rhs } => {
            tag_bits(Tag::Cmp)
                | field(index, operand_value(index, lhs)?, 3, 3)?
                | field(index, operand_value(index, rhs)?, 3, 6)?
                | register_flag(rhs)
        }
        Instruction::Binary { op, dst, lhs, rhs } => {
            tag_bits(binary_tag(op))
                | field(index, dst as i64, 3, 0)?
                | field(index, operand_value(index, lhs)?, 3, 3)?
                | field(index, operand_value(index, rhs)?, 3, 6)?
                | register_flag(rhs)
        }
        Instruction::Branch { cond, target } => {
            let selector = match cond {
                BranchCond::Al => 0,
                BranchCond::Eq => 0,
                BranchCond::Gt => 1 << 10,
                BranchCond::Lt => 2 << 10,
                BranchCond::Ne => 3 << 10,
            };
            let tag = if let BranchCond::Al = cond {
                Tag::Bal
            } else {
                Tag::Cond
            };
            tag_bits(tag) | selector | field(index, target as i64, 8, 0)?
        }
        Instruction::Prt { .. } => unreachable!("PRT rows are skipped"),
        Instruction::Halt => tag_bits(Tag::Halt),
    };
    Ok(word)
}

fn tag_bits(tag: Tag) -> u16 {
    (tag.to_u16().unwrap()) << TAG_SHIFT
}

fn binary_tag(op: BinaryOp) -> Tag {
    match op {
        BinaryOp::Add => Tag::Add,
        BinaryOp::Sub => Tag::Sub,
        BinaryOp::Mtp => Tag::Mtp,
        BinaryOp::Div => Tag::Div,
        BinaryOp::Exp => Tag::Exp,
        BinaryOp::Mod => Tag::Mod,
        BinaryOp::Fdv => Tag::Fdv,
    }
}

fn field(index: usize, value: i64, width: u32, shift: u32) -> Result<u16, EncodeError> {
    if value < 0 || value >= (1 << width) {
        Err(EncodeError {
            index,
            kind: EncodeErrorKind::FieldOverflow { value, width },
        })
    } else {
        Ok((value as u16) << shift)
    }
}

/// The numeric payload of an operand: register index, immediate value, or
/// bare address.
fn operand_value(index: usize, operand: Operand) -> Result<i64, EncodeError> {
    match operand {
        Operand::Register(reg) => Ok(reg as i64),
        Operand::Address(addr) => Ok(addr as i64),
        Operand::Immediate(Value::Int(i)) => Ok(i),
        Operand::Immediate(Value::Float(x)) => Err(EncodeError {
            index,
            kind: EncodeErrorKind::FloatImmediate(x),
        }),
    }
}

fn register_flag(operand: Operand) -> u16 {
    if let Operand::Register(_) = operand {
        REGISTER_FLAG
    } else {
        0
    }
}

/// Renders the words as the persisted image: 256 hex-encoded 16-bit words,
/// space-separated, zero-padded to full length.
pub fn write_image(words: &[u16]) -> String {
    debug_assert!(words.len() <= IMAGE_WORDS);
    let mut image = String::with_capacity(IMAGE_WORDS * 5);
    for i in 0..IMAGE_WORDS {
        if i > 0 {
            image.push(' ');
        }
        let word = words.get(i).copied().unwrap_or(0);
        image.push_str(&format!("{:04X}", word));
    }
    image.push('\n');
    image
}
