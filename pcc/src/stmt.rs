use std::collections::HashMap;

use pvm::{Addr, BinaryOp, BranchCond, Instruction, Operand, Value};

use crate::code::{self, Slot, Target};
use crate::error::{syntax, CompileError, ErrorKind};
use crate::expr::{parse_number, ExprCompiler};
use crate::lexer::Token;
use crate::registers::RegisterFile;
use crate::rpn::{to_rpn, ExprOp, RpnToken};
use crate::symbols::{Symbol, SymbolTable};

/// Source indentation unit, in spaces.
const INDENT_SIZE: usize = 4;

/// Compound assignment operators, desugared to `NAME = NAME OP (RHS)`.
const COMPOUND_OPS: [(&str, char); 7] = [
    ("+=", '+'),
    ("-=", '-'),
    ("*=", '*'),
    ("/=", '/'),
    ("%=", '%'),
    ("^=", '^'),
    ("\\=", '\\'),
];

/// One statement: 1-based source line number, indent depth, and the
/// statement text with all blanks stripped.
#[derive(Clone, Debug)]
struct Line {
    number: usize,
    indent: usize,
    text: String,
}

/// The statement compiler: register bank, symbol table and loop-nesting
/// state threaded through a line-driven, recursive walk over the indented
/// blocks of a source program.
pub struct Compiler {
    registers: RegisterFile,
    symbols: SymbolTable,
    loop_depth: usize,
}

impl Compiler {
    pub fn new() -> Compiler {
        Compiler {
            registers: RegisterFile::new(),
            symbols: SymbolTable::new(),
            loop_depth: 0,
        }
    }

    /// Compiles a complete source program into an executable instruction
    /// list ending in `HALT`.
    pub fn compile(&mut self, source: &str) -> Result<Vec<Instruction>, CompileError> {
        let lines = scan_lines(source)?;
        let slots = self.compile_block(&lines)?;
        code::finalize(slots).map_err(|kind| CompileError { line: 0, kind })
    }

    /// Compiles one block of statements into slots with block-relative
    /// branch targets. An `END` sentinel is appended so that every pending
    /// end-of-chain fixup resolves inside the block.
    fn compile_block(&mut self, block: &[Line]) -> Result<Vec<Slot>, CompileError> {
        let mut lines: Vec<Line> = block.to_vec();
        if !lines.is_empty() && !lines.iter().any(|line| line.text == "END") {
            lines.push(Line {
                number: lines[lines.len() - 1].number,
                indent: lines[0].indent,
                text: "END".to_owned(),
            });
        }

        let mut slots: Vec<Slot> = Vec::new();
        let mut chain_fixups: HashMap<usize, Vec<usize>> = HashMap::new();

        let mut ln = 0;
        while ln < lines.len() {
            if let Some(sites) = chain_fixups.remove(&ln) {
                let here = slots.len();
                for site in sites {
                    code::patch(&mut slots, site, here);
                }
            }
            ln = self.compile_statement(&lines, ln, &mut slots, &mut chain_fixups)?;
            debug_assert!(self.registers.all_free());
        }
        if let Some(sites) = chain_fixups.remove(&lines.len()) {
            let here = slots.len();
            for site in sites {
                code::patch(&mut slots, site, here);
            }
        }
        debug_assert!(chain_fixups.is_empty());

        Ok(slots)
    }

    /// Compiles the statement at `ln` and returns the index of the next
    /// statement of the enclosing block.
    fn compile_statement(
        &mut self,
        lines: &[Line],
        ln: usize,
        slots: &mut Vec<Slot>,
        chain_fixups: &mut HashMap<usize, Vec<usize>>,
    ) -> Result<usize, CompileError> {
        let line = lines[ln].clone();
        let text = line.text.as_str();
        let number = line.number;
        let fail = move |kind: ErrorKind| CompileError { line: number, kind };

        // if / elif / while headers
        if (text.starts_with("if") || text.starts_with("elif") || text.starts_with("while"))
            && text.contains(':')
        {
            let keyword_len = if text.starts_with("while") {
                5
            } else if text.starts_with("elif") {
                4
            } else {
                2
            };
            let is_loop = text.starts_with("while");
            let colon = text.find(':').unwrap();
            let condition = &text[keyword_len..colon];
            let trailer = text[colon + 1..].to_owned();

            let start = slots.len();
            self.compile_comparison(condition, slots).map_err(fail)?;
            let else_site = slots.len();
            slots.push(Slot::Branch {
                cond: BranchCond::Al,
                target: Target::EndOfChain,
            });

            let (body, next) = if trailer.is_empty() {
                let end = end_of_block(lines, ln + 1, line.indent);
                (lines[ln + 1..end].to_vec(), end)
            } else {
                (inline_body(&line, &trailer), ln + 1)
            };

            if is_loop {
                self.loop_depth += 1;
            }
            let compiled = self.compile_block(&body);
            if is_loop {
                self.loop_depth -= 1;
            }
            code::splice(slots, compiled?);

            if is_loop {
                // jump back to the compare, then route any break past it
                slots.push(Slot::Branch {
                    cond: BranchCond::Al,
                    target: Target::Index(start),
                });
                let exit = slots.len();
                code::resolve(&mut slots[start..], Target::LoopExit, exit);
                code::patch(slots, else_site, exit);
            } else {
                let trailing = slots.len();
                slots.push(Slot::Branch {
                    cond: BranchCond::Al,
                    target: Target::EndOfChain,
                });
                let chain_end = end_of_chain(lines, next, line.indent);
                chain_fixups.entry(chain_end).or_insert_with(Vec::new).push(trailing);
                let after = slots.len();
                code::patch(slots, else_site, after);
            }
            return Ok(next);
        }

        // for loops, desugared to init + while + step
        if text.starts_with("for(") {
            let open = 3;
            let close = find_close(text, open, b'(', b')')
                .ok_or_else(|| fail(syntax("malformed for loop")))?;
            if text.as_bytes().get(close + 1) != Some(&b':') {
                return Err(fail(syntax("malformed for loop")));
            }
            let header = &text[open + 1..close];
            let trailer = &text[close + 2..];
            let parts = split_top_level(header, ',');
            if parts.len() != 3 {
                return Err(fail(syntax("for loop takes (init, condition, step)")));
            }

            let (body, next) = if trailer.is_empty() {
                let end = end_of_chain(lines, ln + 1, line.indent);
                (lines[ln + 1..end].to_vec(), end)
            } else {
                (inline_body(&line, trailer), ln + 1)
            };

            let mut loop_lines = vec![
                Line {
                    number: line.number,
                    indent: line.indent,
                    text: parts[0].clone(),
                },
                Line {
                    number: line.number,
                    indent: line.indent,
                    text: format!("while{}:", parts[1]),
                },
            ];
            loop_lines.extend(body);
            loop_lines.push(Line {
                number: line.number,
                indent: line.indent + 1,
                text: parts[2].clone(),
            });

            let compiled = self.compile_block(&loop_lines)?;
            code::splice(slots, compiled);
            return Ok(next);
        }

        // else blocks compile inline at the spot the preceding chain jump
        // falls through to
        if text.starts_with("else:") {
            let trailer = &text[5..];
            let (body, next) = if trailer.is_empty() {
                let end = end_of_chain(lines, ln + 1, line.indent);
                (lines[ln + 1..end].to_vec(), end)
            } else {
                (inline_body(&line, trailer), ln + 1)
            };
            let compiled = self.compile_block(&body)?;
            code::splice(slots, compiled);
            return Ok(next);
        }

        if text == "break" {
            if self.loop_depth == 0 {
                return Err(fail(syntax("'break' outside of a loop")));
            }
            slots.push(Slot::Branch {
                cond: BranchCond::Al,
                target: Target::LoopExit,
            });
            return Ok(ln + 1);
        }

        // array declarations: NAME = array(SIZE)
        if let Some(pos) = text.find("=array(") {
            if is_identifier(&text[..pos]) {
                self.compile_array_declaration(&text[..pos], &text[pos + 7..], slots)
                    .map_err(fail)?;
                return Ok(ln + 1);
            }
        }

        // assignments to an array element: NAME[INDEX] = EXPR
        if let Some((name, index_text, value_text)) = match_array_assign(text) {
            self.compile_array_store(name, index_text, value_text, slots)
                .map_err(fail)?;
            return Ok(ln + 1);
        }

        // compound assignments, desugared and recompiled
        for &(pattern, op) in COMPOUND_OPS.iter() {
            if let Some(pos) = text.find(pattern) {
                let target = &text[..pos];
                let operand = &text[pos + pattern.len()..];
                let rewritten = Line {
                    number: line.number,
                    indent: line.indent,
                    text: format!("{}={}{}({})", target, target, op, operand),
                };
                let compiled = self.compile_block(std::slice::from_ref(&rewritten))?;
                code::splice(slots, compiled);
                return Ok(ln + 1);
            }
        }

        // plain assignment: NAME = EXPR
        if let Some(pos) = text.find('=') {
            let name = &text[..pos];
            if !is_identifier(name) {
                return Err(fail(syntax(format!("cannot assign to '{}'", name))));
            }
            let rpn = to_rpn(&text[pos + 1..]).map_err(fail)?;
            let mut expr = ExprCompiler::new(&mut self.registers, &self.symbols);
            let (value_code, value_reg) = expr.compile(&rpn).map_err(fail)?;
            code::splice(slots, value_code);
            let addr = self.symbols.declare_scalar(name).map_err(fail)?;
            slots.push(Slot::Instr(Instruction::Str {
                src: value_reg,
                addr: Operand::Address(addr),
            }));
            self.registers.free(value_reg);
            // literal assignments keep the scalar foldable for array sizes
            match fold(&rpn, |_| None) {
                Some(value) => self.symbols.set_constant(name, value),
                None => self.symbols.clear_constant(name),
            }
            return Ok(ln + 1);
        }

        // increment and decrement, desugared and recompiled
        if text.ends_with("++") || text.ends_with("--") {
            let name = &text[..text.len() - 2];
            let op = if text.ends_with("++") { '+' } else { '-' };
            let rewritten = Line {
                number: line.number,
                indent: line.indent,
                text: format!("{}={}{}1", name, name, op),
            };
            let compiled = self.compile_block(std::slice::from_ref(&rewritten))?;
            code::splice(slots, compiled);
            return Ok(ln + 1);
        }

        if text.starts_with("print(") && text.ends_with(')') {
            let rpn = to_rpn(&text[6..text.len() - 1]).map_err(fail)?;
            let mut expr = ExprCompiler::new(&mut self.registers, &self.symbols);
            let (arg_code, operand) = expr.compile_operand(&rpn).map_err(fail)?;
            code::splice(slots, arg_code);
            slots.push(Slot::Instr(Instruction::Prt { src: operand }));
            if let Operand::Register(reg) = operand {
                self.registers.free(reg);
            }
            return Ok(ln + 1);
        }

        if text == "END" {
            slots.push(Slot::Pass);
            return Ok(ln + 1);
        }

        Err(fail(syntax("unrecognized statement")))
    }

    /// Compiles `LHS REL RHS` into operand loads, `CMP`, and the conditional
    /// branch that skips the following block-exit jump.
    fn compile_comparison(
        &mut self,
        condition: &str,
        slots: &mut Vec<Slot>,
    ) -> Result<(), ErrorKind> {
        const RELATIONS: [(&str, BranchCond); 4] = [
            ("==", BranchCond::Eq),
            ("!=", BranchCond::Ne),
            (">", BranchCond::Gt),
            ("<", BranchCond::Lt),
        ];
        let (pos, pattern, cond) = RELATIONS
            .iter()
            .find_map(|&(pattern, cond)| condition.find(pattern).map(|pos| (pos, pattern, cond)))
            .ok_or_else(|| syntax("missing comparison operator"))?;

        let lhs_rpn = to_rpn(&condition[..pos])?;
        let rhs_rpn = to_rpn(&condition[pos + pattern.len()..])?;

        let snapshot = self.registers.snapshot();
        let mut expr = ExprCompiler::new(&mut self.registers, &self.symbols);
        let (lhs_code, lhs) = expr.compile_operand(&lhs_rpn)?;
        let (rhs_code, rhs) = expr.compile_operand(&rhs_rpn)?;
        code::splice(slots, lhs_code);
        code::splice(slots, rhs_code);
        slots.push(Slot::Instr(Instruction::Cmp { lhs, rhs }));
        self.registers.restore(snapshot);

        let own = slots.len();
        slots.push(Slot::Branch {
            cond,
            target: Target::Index(own + 2),
        });
        Ok(())
    }

    fn compile_array_declaration(
        &mut self,
        name: &str,
        size_text: &str,
        slots: &mut Vec<Slot>,
    ) -> Result<(), ErrorKind> {
        let mut size_text = size_text;
        if size_text.ends_with(':') {
            size_text = &size_text[..size_text.len() - 1];
        }
        if !size_text.ends_with(')') {
            return Err(syntax("malformed array declaration"));
        }
        let rpn = to_rpn(&size_text[..size_text.len() - 1])?;
        let length = fold(&rpn, |name| self.symbols.constant(name))
            .ok_or(ErrorKind::VariableLengthArray)?;
        if length < 0 || length > i64::from(u16::max_value()) {
            return Err(syntax("array size out of range"));
        }

        let (_base, size_addr) = self.symbols.declare_array(name, length as Addr)?;
        let reg = self.registers.allocate()?;
        slots.push(Slot::Instr(Instruction::Mov {
            dst: reg,
            src: Operand::Immediate(Value::Int(length)),
        }));
        slots.push(Slot::Instr(Instruction::Str {
            src: reg,
            addr: Operand::Address(size_addr),
        }));
        self.registers.free(reg);
        Ok(())
    }

    fn compile_array_store(
        &mut self,
        name: &str,
        index_text: &str,
        value_text: &str,
        slots: &mut Vec<Slot>,
    ) -> Result<(), ErrorKind> {
        let (base, length) = match self.symbols.resolve(name) {
            Some(Symbol::Array { base, length }) => (base, length),
            Some(Symbol::Scalar(_)) => {
                return Err(syntax(format!("'{}' is not an array", name)));
            }
            None => return Err(ErrorKind::UndefinedSymbol(name.to_owned())),
        };

        let index_rpn = to_rpn(index_text)?;
        let value_rpn = to_rpn(value_text)?;

        let snapshot = self.registers.snapshot();
        let mut expr = ExprCompiler::new(&mut self.registers, &self.symbols);
        let (index_code, index) = expr.compile_operand(&index_rpn)?;
        if let Operand::Immediate(Value::Int(i)) = index {
            if i < 0 || i >= length as i64 {
                return Err(syntax(format!(
                    "index {} is out of bounds for '{}' (length {})",
                    i, name, length
                )));
            }
        }
        let (value_code, value_reg) = expr.compile(&value_rpn)?;
        let addr_reg = self.registers.allocate()?;

        code::splice(slots, index_code);
        code::splice(slots, value_code);
        slots.push(Slot::Instr(Instruction::Binary {
            op: BinaryOp::Add,
            dst: addr_reg,
            lhs: Operand::Immediate(Value::Int(base as i64)),
            rhs: index,
        }));
        slots.push(Slot::Instr(Instruction::Str {
            src: value_reg,
            addr: Operand::Register(addr_reg),
        }));
        self.registers.restore(snapshot);
        Ok(())
    }
}

impl Default for Compiler {
    fn default() -> Compiler {
        Compiler::new()
    }
}

/// Splits source text into statement lines: blank lines dropped, indentation
/// measured in four-space blocks, all other blanks stripped.
fn scan_lines(source: &str) -> Result<Vec<Line>, CompileError> {
    let mut lines = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        let number = index + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let leading = raw.len() - raw.trim_start_matches(' ').len();
        if leading % INDENT_SIZE != 0 {
            return Err(CompileError {
                line: number,
                kind: ErrorKind::Indent,
            });
        }
        lines.push(Line {
            number,
            indent: leading / INDENT_SIZE,
            text: raw.chars().filter(|c| *c != ' ').collect(),
        });
    }
    Ok(lines)
}

fn inline_body(header: &Line, trailer: &str) -> Vec<Line> {
    vec![Line {
        number: header.number,
        indent: header.indent + 1,
        text: trailer.to_owned(),
    }]
}

/// First line at the header's own indent: where an if/while body ends.
fn end_of_block(lines: &[Line], start: usize, indent: usize) -> usize {
    (start..lines.len())
        .find(|&i| lines[i].indent == indent)
        .unwrap_or_else(|| lines.len())
}

fn is_chain_continuation(text: &str) -> bool {
    text.starts_with("else:") || (text.starts_with("elif") && text.contains(':'))
}

/// First line past the whole if/elif/else chain.
fn end_of_chain(lines: &[Line], start: usize, indent: usize) -> usize {
    (start..lines.len())
        .find(|&i| lines[i].indent <= indent && !is_chain_continuation(&lines[i].text))
        .unwrap_or_else(|| lines.len())
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric())
}

/// Index of the bracket closing the one at `open`.
fn find_close(text: &str, open: usize, open_ch: u8, close_ch: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if b == open_ch {
            depth += 1;
        } else if b == close_ch {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Matches `NAME[INDEX]=VALUE`, leaving compound operators on the element
/// (`a[i] += 1`) to the desugaring pass.
fn match_array_assign(text: &str) -> Option<(&str, &str, &str)> {
    let open = text.find('[')?;
    if open == 0 || !is_identifier(&text[..open]) {
        return None;
    }
    let close = find_close(text, open, b'[', b']')?;
    let rest = &text[close + 1..];
    if !rest.starts_with('=') {
        return None;
    }
    Some((&text[..open], &text[open + 1..close], &rest[1..]))
}

/// Splits on `separator` at bracket depth zero.
fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = vec![String::new()];
    let mut depth = 0i32;
    for c in text.chars() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            _ => {}
        }
        if c == separator && depth == 0 {
            parts.push(String::new());
        } else {
            parts.last_mut().unwrap().push(c);
        }
    }
    parts
}

/// Folds an RPN sequence to a compile-time integer, with `lookup` supplying
/// values for names. Anything float, indexed, or unknown refuses to fold.
fn fold(rpn: &[RpnToken], lookup: impl Fn(&str) -> Option<i64>) -> Option<i64> {
    let mut stack: Vec<i64> = Vec::new();
    for token in rpn {
        match token {
            RpnToken::Operand(Token::Number(lexeme)) => match parse_number(lexeme).ok()? {
                Value::Int(i) => stack.push(i),
                Value::Float(_) => return None,
            },
            RpnToken::Operand(Token::Variable(name)) => stack.push(lookup(name)?),
            RpnToken::Operand(_) => return None,
            RpnToken::Operator(ExprOp::Binary(op)) => {
                let rhs = stack.pop()?;
                let lhs = stack.pop()?;
                match Value::apply(*op, Value::Int(lhs), Value::Int(rhs))? {
                    Value::Int(i) => stack.push(i),
                    Value::Float(_) => return None,
                }
            }
            RpnToken::Operator(ExprOp::Index) => return None,
        }
    }
    if stack.len() == 1 {
        stack.pop()
    } else {
        None
    }
}
