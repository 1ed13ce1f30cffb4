use pvm::{BinaryOp, Instruction, Operand, Value};

use crate::code::Slot;
use crate::error::ErrorKind;
use crate::expr::ExprCompiler;
use crate::registers::RegisterFile;
use crate::rpn::to_rpn;
use crate::symbols::SymbolTable;

fn imm(n: i64) -> Operand {
    Operand::Immediate(Value::Int(n))
}

fn reg(r: u8) -> Operand {
    Operand::Register(r)
}

fn instr(instruction: Instruction) -> Slot {
    Slot::Instr(instruction)
}

/// A register file and a symbol table with `x` at 32, `y` at 33 and a
/// ten-cell array `a` at 192.
fn context() -> (RegisterFile, SymbolTable) {
    let mut symbols = SymbolTable::new();
    symbols.declare_scalar("x").unwrap();
    symbols.declare_scalar("y").unwrap();
    symbols.declare_array("a", 10).unwrap();
    (RegisterFile::new(), symbols)
}

#[test]
fn immediates_pass_through_as_operands() {
    let (mut registers, symbols) = context();
    let mut expr = ExprCompiler::new(&mut registers, &symbols);
    let (code, operand) = expr.compile_operand(&to_rpn("5").unwrap()).unwrap();
    assert!(code.is_empty());
    assert_eq!(operand, imm(5));
    assert!(registers.all_free());
}

#[test]
fn variables_load_into_fresh_registers() {
    let (mut registers, symbols) = context();
    let mut expr = ExprCompiler::new(&mut registers, &symbols);
    let (code, result) = expr.compile(&to_rpn("x").unwrap()).unwrap();
    assert_eq!(
        code,
        [instr(Instruction::Ldr {
            dst: 0,
            addr: Operand::Address(32),
        })]
    );
    assert_eq!(result, 0);
}

#[test]
fn binary_operations_allocate_destination_first() {
    let (mut registers, symbols) = context();
    let mut expr = ExprCompiler::new(&mut registers, &symbols);
    let (code, result) = expr.compile(&to_rpn("x+y").unwrap()).unwrap();
    assert_eq!(
        code,
        [
            instr(Instruction::Ldr {
                dst: 1,
                addr: Operand::Address(32),
            }),
            instr(Instruction::Ldr {
                dst: 2,
                addr: Operand::Address(33),
            }),
            instr(Instruction::Binary {
                op: BinaryOp::Add,
                dst: 0,
                lhs: reg(1),
                rhs: reg(2),
            }),
        ]
    );
    assert_eq!(result, 0);
    // the operand registers were given back
    registers.free(0);
    assert!(registers.all_free());
}

#[test]
fn constant_index_folds_the_effective_address() {
    let (mut registers, symbols) = context();
    let mut expr = ExprCompiler::new(&mut registers, &symbols);
    let (code, result) = expr.compile(&to_rpn("a[3]").unwrap()).unwrap();
    assert_eq!(
        code,
        [
            instr(Instruction::Mov {
                dst: 0,
                src: imm(195),
            }),
            instr(Instruction::Ldr {
                dst: 0,
                addr: reg(0),
            }),
        ]
    );
    assert_eq!(result, 0);
}

#[test]
fn computed_index_adds_the_array_base() {
    let (mut registers, symbols) = context();
    let mut expr = ExprCompiler::new(&mut registers, &symbols);
    let (code, result) = expr.compile(&to_rpn("a[x]").unwrap()).unwrap();
    assert_eq!(
        code,
        [
            instr(Instruction::Ldr {
                dst: 1,
                addr: Operand::Address(32),
            }),
            instr(Instruction::Binary {
                op: BinaryOp::Add,
                dst: 2,
                lhs: imm(192),
                rhs: reg(1),
            }),
            instr(Instruction::Ldr {
                dst: 0,
                addr: reg(2),
            }),
        ]
    );
    assert_eq!(result, 0);
    registers.free(0);
    assert!(registers.all_free());
}

#[test]
fn undefined_variables_are_rejected() {
    let (mut registers, symbols) = context();
    let mut expr = ExprCompiler::new(&mut registers, &symbols);
    let err = expr.compile(&to_rpn("q+1").unwrap()).unwrap_err();
    assert_eq!(err, ErrorKind::UndefinedSymbol("q".to_owned()));
}

#[test]
fn indexing_a_scalar_is_rejected() {
    let (mut registers, symbols) = context();
    let mut expr = ExprCompiler::new(&mut registers, &symbols);
    assert!(matches!(
        expr.compile(&to_rpn("x[0]").unwrap()),
        Err(ErrorKind::Syntax(_))
    ));
}

#[test]
fn array_without_index_is_rejected() {
    let (mut registers, symbols) = context();
    let mut expr = ExprCompiler::new(&mut registers, &symbols);
    assert!(matches!(
        expr.compile(&to_rpn("a+1").unwrap()),
        Err(ErrorKind::Syntax(_))
    ));
}

#[test]
fn strings_are_rejected_in_expressions() {
    let (mut registers, symbols) = context();
    let mut expr = ExprCompiler::new(&mut registers, &symbols);
    assert!(matches!(
        expr.compile(&to_rpn("'s'").unwrap()),
        Err(ErrorKind::Syntax(_))
    ));
}

#[test]
fn deep_expressions_exhaust_the_register_file() {
    let (mut registers, symbols) = context();
    let mut expr = ExprCompiler::new(&mut registers, &symbols);
    // seven pending pair-sums force a ninth live register
    let source = "(x+x)*((x+x)*((x+x)*((x+x)*((x+x)*((x+x)*(x+x))))))";
    let err = expr.compile(&to_rpn(source).unwrap()).unwrap_err();
    assert_eq!(err, ErrorKind::RegisterPressure);
}

#[test]
fn malformed_rpn_underflows_gracefully() {
    let (mut registers, symbols) = context();
    let mut expr = ExprCompiler::new(&mut registers, &symbols);
    assert!(matches!(
        expr.compile(&to_rpn("1+").unwrap()),
        Err(ErrorKind::Syntax(_))
    ));
    assert!(matches!(
        expr.compile(&to_rpn("1 2").unwrap()),
        Err(ErrorKind::Syntax(_))
    ));
}
