use std::fmt;

use crate::constants;
use crate::instruction::{BranchCond, Instruction, Operand};
use crate::memory::{Memory, MemoryError};
use crate::status::Status;
use crate::value::Value;
use crate::Reg;

/// Outcome of executing a single instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Running,
    Halted,
}

/// A fatal execution failure, annotated with the offending program counter.
#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeError {
    pub pc: usize,
    pub kind: RuntimeErrorKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RuntimeErrorKind {
    /// The program counter ran off the end of the program (missing `HALT`).
    PcOutOfRange(usize),
    BadBranchTarget(usize),
    BadRegister(Reg),
    /// The operand kind is not legal for the opcode, e.g. a bare address in
    /// an arithmetic instruction.
    InvalidOperand(Operand),
    /// A load or store address that is not an integer.
    AddressNotInteger(Value),
    MemoryOutOfRange(i64),
    UninitializedMemory(usize),
    DivisionByZero,
    /// A conditional branch before the first `CMP`.
    StatusUndefined,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "error at instruction {}: {}", self.pc, self.kind)
    }
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use RuntimeErrorKind::*;

        match *self {
            PcOutOfRange(pc) => write!(f, "program counter {} is past the end of the program", pc),
            BadBranchTarget(target) => write!(f, "branch target {} is out of range", target),
            BadRegister(reg) => write!(f, "register r{} does not exist", reg),
            InvalidOperand(ref operand) => write!(f, "operand {} is not valid here", operand),
            AddressNotInteger(value) => write!(f, "{} is not a valid memory address", value),
            MemoryOutOfRange(address) => write!(f, "memory address {} is out of range", address),
            UninitializedMemory(address) => {
                write!(f, "memory address {} was never written", address)
            }
            DivisionByZero => f.write_str("division by zero"),
            StatusUndefined => f.write_str("status register is undefined before the first CMP"),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// The virtual machine: program counter, register file, status register and
/// flat data memory, executed one instruction at a time.
///
/// [`step`](#method.step) is the whole execution interface; the debugger
/// drives it directly and [`run`](#method.run) just loops it to completion.
pub struct Machine {
    program: Vec<Instruction>,
    pc: usize,
    registers: [Value; constants::REGISTER_COUNT],
    status: Option<Status>,
    memory: Memory,
    output: Vec<String>,
}

impl Machine {
    pub fn new(program: Vec<Instruction>) -> Machine {
        Machine {
            program,
            pc: 0,
            registers: [Value::Int(0); constants::REGISTER_COUNT],
            status: None,
            memory: Memory::new(),
            output: Vec::new(),
        }
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn registers(&self) -> &[Value] {
        &self.registers
    }

    pub fn status(&self) -> Option<Status> {
        self.status
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Everything printed so far, one entry per `PRT`.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn into_output(self) -> Vec<String> {
        self.output
    }

    /// The instruction the next `step` will execute.
    pub fn current(&self) -> Option<&Instruction> {
        self.program.get(self.pc)
    }

    /// Executes instructions until `HALT` or a runtime failure.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            if let Step::Halted = self.step()? {
                return Ok(());
            }
        }
    }

    /// Executes a single instruction.
    pub fn step(&mut self) -> Result<Step, RuntimeError> {
        let instruction = *self
            .program
            .get(self.pc)
            .ok_or_else(|| self.fail(RuntimeErrorKind::PcOutOfRange(self.pc)))?;

        match instruction {
            Instruction::Mov { dst, src } => {
                let value = self.operand_value(src)?;
                self.write_register(dst, value)?;
                self.pc += 1;
            }
            Instruction::Ldr { dst, addr } => {
                let address = self.operand_address(addr)?;
                let value = self
                    .memory
                    .load(address)
                    .map_err(|err| self.memory_fail(err))?;
                self.write_register(dst, value)?;
                self.pc += 1;
            }
            Instruction::Str { src, addr } => {
                let value = self.read_register(src)?;
                let address = self.operand_address(addr)?;
                self.memory
                    .store(address, value)
                    .map_err(|err| self.memory_fail(err))?;
                self.pc += 1;
            }
            Instruction::Binary { op, dst, lhs, rhs } => {
                let lhs = self.operand_value(lhs)?;
                let rhs = self.operand_value(rhs)?;
                let value = Value::apply(op, lhs, rhs)
                    .ok_or_else(|| self.fail(RuntimeErrorKind::DivisionByZero))?;
                self.write_register(dst, value)?;
                self.pc += 1;
            }
            Instruction::Cmp { lhs, rhs } => {
                let lhs = self.operand_value(lhs)?;
                let rhs = self.operand_value(rhs)?;
                self.status = Some(Status::compare(lhs, rhs));
                self.pc += 1;
            }
            Instruction::Branch { cond, target } => {
                let taken = match cond {
                    BranchCond::Al => true,
                    _ => self
                        .status
                        .ok_or_else(|| self.fail(RuntimeErrorKind::StatusUndefined))?
                        .test(cond),
                };
                if taken {
                    if target >= self.program.len() {
                        return Err(self.fail(RuntimeErrorKind::BadBranchTarget(target)));
                    }
                    self.pc = target;
                } else {
                    self.pc += 1;
                }
            }
            Instruction::Prt { src } => {
                let value = self.operand_value(src)?;
                self.output.push(value.to_string());
                self.pc += 1;
            }
            Instruction::Halt => return Ok(Step::Halted),
        }

        Ok(Step::Running)
    }

    fn fail(&self, kind: RuntimeErrorKind) -> RuntimeError {
        RuntimeError { pc: self.pc, kind }
    }

    fn memory_fail(&self, err: MemoryError) -> RuntimeError {
        self.fail(match err {
            MemoryError::OutOfRange(address) => RuntimeErrorKind::MemoryOutOfRange(address as i64),
            MemoryError::Uninitialized(address) => RuntimeErrorKind::UninitializedMemory(address),
        })
    }

    fn read_register(&self, reg: Reg) -> Result<Value, RuntimeError> {
        self.registers
            .get(reg as usize)
            .copied()
            .ok_or_else(|| self.fail(RuntimeErrorKind::BadRegister(reg)))
    }

    fn write_register(&mut self, reg: Reg, value: Value) -> Result<(), RuntimeError> {
        if (reg as usize) < self.registers.len() {
            self.registers[reg as usize] = value;
            Ok(())
        } else {
            Err(self.fail(RuntimeErrorKind::BadRegister(reg)))
        }
    }

    /// An immediate or register operand, as a value.
    fn operand_value(&self, operand: Operand) -> Result<Value, RuntimeError> {
        match operand {
            Operand::Immediate(value) => Ok(value),
            Operand::Register(reg) => self.read_register(reg),
            Operand::Address(_) => Err(self.fail(RuntimeErrorKind::InvalidOperand(operand))),
        }
    }

    /// A load/store address operand: a bare address, an integer immediate,
    /// or a register holding a cell index.
    fn operand_address(&self, operand: Operand) -> Result<usize, RuntimeError> {
        let value = match operand {
            Operand::Address(addr) => return Ok(addr as usize),
            Operand::Immediate(value) => value,
            Operand::Register(reg) => self.read_register(reg)?,
        };
        match value {
            Value::Int(i) if i >= 0 => Ok(i as usize),
            Value::Int(i) => Err(self.fail(RuntimeErrorKind::MemoryOutOfRange(i))),
            Value::Float(_) => Err(self.fail(RuntimeErrorKind::AddressNotInteger(value))),
        }
    }
}
