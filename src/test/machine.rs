use super::*;

#[test]
fn halt_stops_execution() {
    let machine = run_program(vec![Instruction::Halt]);
    assert_eq!(machine.pc(), 0);
    assert!(machine.output().is_empty());
}

#[test]
fn mov_and_add() {
    let machine = run_program(vec![
        Instruction::Mov { dst: 0, src: imm(42) },
        Instruction::Mov { dst: 1, src: imm(64) },
        Instruction::Binary {
            op: BinaryOp::Add,
            dst: 2,
            lhs: reg(0),
            rhs: reg(1),
        },
        Instruction::Halt,
    ]);
    assert_eq!(machine.registers()[2], Value::Int(106));
}

#[test]
fn store_and_load_round_trip() {
    let machine = run_program(vec![
        Instruction::Mov { dst: 0, src: imm(7) },
        Instruction::Str {
            src: 0,
            addr: Operand::Address(40),
        },
        Instruction::Ldr {
            dst: 1,
            addr: Operand::Address(40),
        },
        Instruction::Halt,
    ]);
    assert_eq!(machine.registers()[1], Value::Int(7));
    assert_eq!(machine.memory().get(40), Some(Value::Int(7)));
}

#[test]
fn register_indirect_addressing() {
    // the address lives in r0, the value in r1
    let machine = run_program(vec![
        Instruction::Mov { dst: 0, src: imm(200) },
        Instruction::Mov { dst: 1, src: imm(9) },
        Instruction::Str { src: 1, addr: reg(0) },
        Instruction::Ldr { dst: 2, addr: reg(0) },
        Instruction::Halt,
    ]);
    assert_eq!(machine.registers()[2], Value::Int(9));
}

#[test]
fn conditional_branch_taken_and_not_taken() {
    // prints #1 only, because the BEQ skips the first PRT
    let machine = run_program(vec![
        Instruction::Cmp {
            lhs: imm(3),
            rhs: imm(3),
        },
        Instruction::Branch {
            cond: BranchCond::Eq,
            target: 3,
        },
        Instruction::Prt { src: imm(0) },
        Instruction::Prt { src: imm(1) },
        Instruction::Halt,
    ]);
    assert_eq!(machine.output(), ["1"]);
}

#[test]
fn falling_through_untaken_branch() {
    let machine = run_program(vec![
        Instruction::Cmp {
            lhs: imm(1),
            rhs: imm(2),
        },
        Instruction::Branch {
            cond: BranchCond::Gt,
            target: 3,
        },
        Instruction::Prt { src: imm(7) },
        Instruction::Halt,
    ]);
    assert_eq!(machine.output(), ["7"]);
}

#[test]
fn unconditional_branch_loops() {
    // counts r0 down from 2 to 0 by re-running the same SUB
    let machine = run_program(vec![
        Instruction::Mov { dst: 0, src: imm(2) },
        Instruction::Binary {
            op: BinaryOp::Sub,
            dst: 0,
            lhs: reg(0),
            rhs: imm(1),
        },
        Instruction::Cmp {
            lhs: reg(0),
            rhs: imm(0),
        },
        Instruction::Branch {
            cond: BranchCond::Gt,
            target: 1,
        },
        Instruction::Halt,
    ]);
    assert_eq!(machine.registers()[0], Value::Int(0));
}

#[test]
fn print_formats_ints_and_floats() {
    let machine = run_program(vec![
        Instruction::Prt { src: imm(50) },
        Instruction::Prt { src: fimm(2.5) },
        Instruction::Binary {
            op: BinaryOp::Div,
            dst: 0,
            lhs: imm(8),
            rhs: imm(2),
        },
        Instruction::Prt { src: reg(0) },
        Instruction::Halt,
    ]);
    assert_eq!(machine.output(), ["50", "2.5", "4.0"]);
}

#[test]
fn division_by_zero_reports_pc() {
    let err = run_failing(vec![
        Instruction::Mov { dst: 0, src: imm(1) },
        Instruction::Binary {
            op: BinaryOp::Div,
            dst: 0,
            lhs: reg(0),
            rhs: imm(0),
        },
        Instruction::Halt,
    ]);
    assert_eq!(err.pc, 1);
    assert_eq!(err.kind, RuntimeErrorKind::DivisionByZero);
}

#[test]
fn uninitialized_load_fails() {
    let err = run_failing(vec![
        Instruction::Ldr {
            dst: 0,
            addr: Operand::Address(100),
        },
        Instruction::Halt,
    ]);
    assert_eq!(err.kind, RuntimeErrorKind::UninitializedMemory(100));
}

#[test]
fn out_of_range_store_fails() {
    let err = run_failing(vec![
        Instruction::Mov { dst: 0, src: imm(999) },
        Instruction::Str { src: 1, addr: reg(0) },
        Instruction::Halt,
    ]);
    assert_eq!(err.pc, 1);
    assert_eq!(err.kind, RuntimeErrorKind::MemoryOutOfRange(999));
}

#[test]
fn bad_branch_target_fails() {
    let err = run_failing(vec![
        Instruction::Branch {
            cond: BranchCond::Al,
            target: 9,
        },
        Instruction::Halt,
    ]);
    assert_eq!(err.kind, RuntimeErrorKind::BadBranchTarget(9));
}

#[test]
fn conditional_branch_without_cmp_fails() {
    let err = run_failing(vec![
        Instruction::Branch {
            cond: BranchCond::Eq,
            target: 1,
        },
        Instruction::Halt,
    ]);
    assert_eq!(err.kind, RuntimeErrorKind::StatusUndefined);
}

#[test]
fn missing_halt_fails() {
    let err = run_failing(vec![Instruction::Prt { src: imm(1) }]);
    assert_eq!(err.kind, RuntimeErrorKind::PcOutOfRange(1));
}

#[test]
fn step_pauses_between_instructions() {
    let mut machine = Machine::new(vec![
        Instruction::Mov { dst: 0, src: imm(5) },
        Instruction::Prt { src: reg(0) },
        Instruction::Halt,
    ]);

    assert_eq!(machine.step().unwrap(), Step::Running);
    assert_eq!(machine.pc(), 1);
    assert_eq!(machine.registers()[0], Value::Int(5));
    assert!(machine.output().is_empty());

    assert_eq!(machine.step().unwrap(), Step::Running);
    assert_eq!(machine.output(), ["5"]);

    assert_eq!(machine.step().unwrap(), Step::Halted);
    assert_eq!(machine.pc(), 2);
}

#[test]
fn display_round_trips_operands() {
    let lines = vec![
        Instruction::Mov { dst: 0, src: imm(42) },
        Instruction::Ldr {
            dst: 1,
            addr: Operand::Address(34),
        },
        Instruction::Binary {
            op: BinaryOp::Mtp,
            dst: 2,
            lhs: imm(3),
            rhs: reg(1),
        },
        Instruction::Branch {
            cond: BranchCond::Ne,
            target: 7,
        },
        Instruction::Prt { src: fimm(1.5) },
        Instruction::Halt,
    ];
    let text: Vec<String> = lines.iter().map(|i| i.to_string()).collect();
    assert_eq!(
        text,
        [
            "MOV r0 #42",
            "LDR r1 34",
            "MTP r2 #3 r1",
            "BNE 7",
            "PRT #1.5",
            "HALT",
        ]
    );
}
