use pvm::{BinaryOp, Instruction, Operand, Reg, Value};

use crate::code::Slot;
use crate::error::{syntax, ErrorKind};
use crate::lexer::Token;
use crate::registers::RegisterFile;
use crate::rpn::{ExprOp, RpnToken};
use crate::symbols::{Symbol, SymbolTable};

/// An operand descriptor on the RPN evaluation stack.
enum Entry {
    Imm(Value),
    Reg(Reg),
    Var(String),
}

/// Compiles RPN sequences into instruction slots.
///
/// Variables are lowered on demand with `LDR` into freshly allocated
/// registers; the destination register of each operation is allocated
/// before its operands are lowered, and operand registers are freed as soon
/// as the operation consumed them.
pub struct ExprCompiler<'a> {
    registers: &'a mut RegisterFile,
    symbols: &'a SymbolTable,
}

impl<'a> ExprCompiler<'a> {
    pub fn new(registers: &'a mut RegisterFile, symbols: &'a SymbolTable) -> ExprCompiler<'a> {
        ExprCompiler { registers, symbols }
    }

    /// Compiles RPN, leaving the result in a register. The register stays
    /// blocked; the caller frees it.
    pub fn compile(&mut self, rpn: &[RpnToken]) -> Result<(Vec<Slot>, Reg), ErrorKind> {
        let (mut code, entry) = self.eval(rpn)?;
        let reg = self.into_register(&mut code, entry)?;
        Ok((code, reg))
    }

    /// Compiles RPN into an operand: immediates pass through, everything
    /// else lands in a register the caller frees.
    pub fn compile_operand(&mut self, rpn: &[RpnToken]) -> Result<(Vec<Slot>, Operand), ErrorKind> {
        let (mut code, entry) = self.eval(rpn)?;
        let operand = match entry {
            Entry::Imm(value) => Operand::Immediate(value),
            entry => Operand::Register(self.into_register(&mut code, entry)?),
        };
        Ok((code, operand))
    }

    /// Loads a named scalar into a fresh register.
    pub fn load_variable(&mut self, name: &str) -> Result<(Vec<Slot>, Reg), ErrorKind> {
        match self.symbols.resolve(name) {
            Some(Symbol::Scalar(addr)) => {
                let reg = self.registers.allocate()?;
                let code = vec![Slot::Instr(Instruction::Ldr {
                    dst: reg,
                    addr: Operand::Address(addr),
                })];
                Ok((code, reg))
            }
            Some(Symbol::Array { .. }) => {
                Err(syntax(format!("array '{}' used without an index", name)))
            }
            None => Err(ErrorKind::UndefinedSymbol(name.to_owned())),
        }
    }

    fn eval(&mut self, rpn: &[RpnToken]) -> Result<(Vec<Slot>, Entry), ErrorKind> {
        let mut code = Vec::new();
        let mut stack: Vec<Entry> = Vec::new();

        for token in rpn {
            match token {
                RpnToken::Operand(Token::Number(lexeme)) => {
                    stack.push(Entry::Imm(parse_number(lexeme)?));
                }
                RpnToken::Operand(Token::Variable(name)) => {
                    stack.push(Entry::Var(name.clone()));
                }
                RpnToken::Operand(Token::Str(_)) => {
                    return Err(syntax("strings cannot appear in expressions"));
                }
                RpnToken::Operand(Token::Punct(c)) => {
                    return Err(syntax(format!("unexpected character '{}'", c)));
                }
                RpnToken::Operator(op) => self.operation(&mut code, &mut stack, *op)?,
            }
        }

        if stack.len() != 1 {
            return Err(syntax("malformed expression"));
        }
        Ok((code, stack.pop().unwrap()))
    }

    fn operation(
        &mut self,
        code: &mut Vec<Slot>,
        stack: &mut Vec<Entry>,
        op: ExprOp,
    ) -> Result<(), ErrorKind> {
        let dst = self.registers.allocate()?;
        let rhs = stack.pop().ok_or_else(|| syntax("malformed expression"))?;
        let lhs = stack.pop().ok_or_else(|| syntax("malformed expression"))?;

        match op {
            ExprOp::Index => self.index(code, dst, lhs, rhs)?,
            ExprOp::Binary(op) => {
                let (lhs, free_lhs) = self.lower(code, lhs)?;
                let (rhs, free_rhs) = self.lower(code, rhs)?;
                code.push(Slot::Instr(Instruction::Binary { op, dst, lhs, rhs }));
                if let Some(reg) = free_lhs {
                    self.registers.free(reg);
                }
                if let Some(reg) = free_rhs {
                    self.registers.free(reg);
                }
            }
        }

        stack.push(Entry::Reg(dst));
        Ok(())
    }

    /// `~`: loads one array cell into `dst`.
    fn index(
        &mut self,
        code: &mut Vec<Slot>,
        dst: Reg,
        array: Entry,
        index: Entry,
    ) -> Result<(), ErrorKind> {
        let name = match array {
            Entry::Var(name) => name,
            _ => return Err(syntax("only named arrays can be indexed")),
        };
        let (base, length) = match self.symbols.resolve(&name) {
            Some(Symbol::Array { base, length }) => (base, length),
            Some(Symbol::Scalar(_)) => {
                return Err(syntax(format!("'{}' is not an array", name)));
            }
            None => return Err(ErrorKind::UndefinedSymbol(name)),
        };

        match index {
            // constant index: the effective address is known at compile time
            Entry::Imm(Value::Int(i)) if 0 <= i && i < length as i64 => {
                code.push(Slot::Instr(Instruction::Mov {
                    dst,
                    src: Operand::Immediate(Value::Int(base as i64 + i)),
                }));
                code.push(Slot::Instr(Instruction::Ldr {
                    dst,
                    addr: Operand::Register(dst),
                }));
            }
            Entry::Imm(Value::Int(i)) => {
                return Err(syntax(format!(
                    "index {} is out of bounds for '{}' (length {})",
                    i, name, length
                )));
            }
            Entry::Imm(_) => return Err(syntax("array index must be an integer")),
            index => {
                let index_reg = match index {
                    Entry::Reg(reg) => reg,
                    Entry::Var(name) => {
                        let (load, reg) = self.load_variable(&name)?;
                        code.extend(load);
                        reg
                    }
                    Entry::Imm(_) => unreachable!(),
                };
                let addr_reg = self.registers.allocate()?;
                code.push(Slot::Instr(Instruction::Binary {
                    op: BinaryOp::Add,
                    dst: addr_reg,
                    lhs: Operand::Immediate(Value::Int(base as i64)),
                    rhs: Operand::Register(index_reg),
                }));
                code.push(Slot::Instr(Instruction::Ldr {
                    dst,
                    addr: Operand::Register(addr_reg),
                }));
                self.registers.free(addr_reg);
                self.registers.free(index_reg);
            }
        }
        Ok(())
    }

    /// Turns a stack entry into an instruction operand, loading variables.
    /// Returns the register to free once the operand was consumed.
    fn lower(
        &mut self,
        code: &mut Vec<Slot>,
        entry: Entry,
    ) -> Result<(Operand, Option<Reg>), ErrorKind> {
        match entry {
            Entry::Imm(value) => Ok((Operand::Immediate(value), None)),
            Entry::Reg(reg) => Ok((Operand::Register(reg), Some(reg))),
            Entry::Var(name) => {
                let (load, reg) = self.load_variable(&name)?;
                code.extend(load);
                Ok((Operand::Register(reg), Some(reg)))
            }
        }
    }

    fn into_register(&mut self, code: &mut Vec<Slot>, entry: Entry) -> Result<Reg, ErrorKind> {
        match entry {
            Entry::Reg(reg) => Ok(reg),
            Entry::Imm(value) => {
                let reg = self.registers.allocate()?;
                code.push(Slot::Instr(Instruction::Mov {
                    dst: reg,
                    src: Operand::Immediate(value),
                }));
                Ok(reg)
            }
            Entry::Var(name) => {
                let (load, reg) = self.load_variable(&name)?;
                code.extend(load);
                Ok(reg)
            }
        }
    }
}

/// Parses a numeric lexeme: float when it contains a decimal point.
pub fn parse_number(lexeme: &str) -> Result<Value, ErrorKind> {
    if lexeme.contains('.') {
        lexeme
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| syntax(format!("malformed number '{}'", lexeme)))
    } else {
        lexeme
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| syntax(format!("malformed number '{}'", lexeme)))
    }
}
