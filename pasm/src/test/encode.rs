use num_traits::FromPrimitive;
use pvm::{BinaryOp, BranchCond, Instruction, Operand, Value};

use crate::{assemble, encode, write_image, EncodeErrorKind, Tag, IMAGE_WORDS};

fn imm(n: i64) -> Operand {
    Operand::Immediate(Value::Int(n))
}

fn reg(r: u8) -> Operand {
    Operand::Register(r)
}

fn tag_of(word: u16) -> Tag {
    Tag::from_u16(word >> 12).unwrap()
}

#[test]
fn top_four_bits_are_the_opcode_tag() {
    let words = encode(&[
        Instruction::Ldr {
            dst: 0,
            addr: Operand::Address(34),
        },
        Instruction::Str {
            src: 1,
            addr: Operand::Address(35),
        },
        Instruction::Binary {
            op: BinaryOp::Add,
            dst: 0,
            lhs: reg(1),
            rhs: reg(2),
        },
        Instruction::Mov { dst: 0, src: imm(5) },
        Instruction::Cmp {
            lhs: reg(0),
            rhs: imm(3),
        },
        Instruction::Branch {
            cond: BranchCond::Al,
            target: 2,
        },
        Instruction::Branch {
            cond: BranchCond::Eq,
            target: 2,
        },
        Instruction::Binary {
            op: BinaryOp::Fdv,
            dst: 0,
            lhs: reg(0),
            rhs: reg(1),
        },
        Instruction::Halt,
    ])
    .unwrap();

    let tags: Vec<Tag> = words.iter().map(|&w| tag_of(w)).collect();
    assert_eq!(
        tags,
        [
            Tag::Ldr,
            Tag::Str,
            Tag::Add,
            Tag::Mov,
            Tag::Cmp,
            Tag::Bal,
            Tag::Cond,
            Tag::Fdv,
            Tag::Halt,
        ]
    );
}

#[test]
fn load_packs_register_address_and_flag() {
    let words = encode(&[
        Instruction::Ldr {
            dst: 3,
            addr: Operand::Address(200),
        },
        Instruction::Ldr { dst: 3, addr: reg(2) },
    ])
    .unwrap();
    assert_eq!(words[0], (0 << 12) | (200 << 3) | 3);
    assert_eq!(words[1], (1 << 11) | (2 << 3) | 3);
}

#[test]
fn conditional_branches_share_a_tag_with_a_selector() {
    let target = 9usize;
    let words = encode(&[
        Instruction::Branch { cond: BranchCond::Eq, target },
        Instruction::Branch { cond: BranchCond::Gt, target },
        Instruction::Branch { cond: BranchCond::Lt, target },
        Instruction::Branch { cond: BranchCond::Ne, target },
    ])
    .unwrap();
    assert_eq!(words[0], (7 << 12) | 9);
    assert_eq!(words[1], (7 << 12) | (1 << 10) | 9);
    assert_eq!(words[2], (7 << 12) | (2 << 10) | 9);
    assert_eq!(words[3], (7 << 12) | (3 << 10) | 9);
}

#[test]
fn print_rows_are_dropped() {
    let words = encode(&[
        Instruction::Prt { src: imm(1) },
        Instruction::Halt,
    ])
    .unwrap();
    assert_eq!(words.len(), 1);
    assert_eq!(tag_of(words[0]), Tag::Halt);
}

#[test]
fn oversized_fields_are_rejected() {
    let err = encode(&[Instruction::Mov {
        dst: 0,
        src: imm(100),
    }])
    .unwrap_err();
    assert_eq!(err.index, 0);
    assert!(matches!(err.kind, EncodeErrorKind::FieldOverflow { .. }));
}

#[test]
fn float_immediates_are_rejected() {
    let err = encode(&[Instruction::Mov {
        dst: 0,
        src: Operand::Immediate(Value::Float(1.5)),
    }])
    .unwrap_err();
    assert!(matches!(err.kind, EncodeErrorKind::FloatImmediate(_)));
}

#[test]
fn image_is_256_padded_hex_words() {
    let image = write_image(&[0x6007, 0xF000]);
    let words: Vec<&str> = image.trim_end().split(' ').collect();
    assert_eq!(words.len(), IMAGE_WORDS);
    assert_eq!(words[0], "6007");
    assert_eq!(words[1], "F000");
    assert!(words[2..].iter().all(|&w| w == "0000"));
}

#[test]
fn assemble_goes_from_text_to_words() {
    let words = assemble("BAL 7\nHALT\n").unwrap();
    assert_eq!(words, [0x6007, 0xF000]);
}
