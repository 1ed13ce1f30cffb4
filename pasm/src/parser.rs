use matches::debug_assert_matches;
use pest::iterators::Pair;
use pest::{Parser, Span};
use pest_derive::Parser;
use pvm::{BinaryOp, BranchCond, Instruction, Operand, ParseEnumError, Reg, Value};

#[derive(Parser)]
#[grammar = "pasm.pest"]
struct AsmParser;

pub type Error = pest::error::Error<Rule>;

pub type Result<T> = std::result::Result<T, Error>;

fn new_parser_error(span: Span, message: String) -> Error {
    Error::new_from_span(pest::error::ErrorVariant::CustomError { message }, span)
}

/// Parses an assembly listing, one instruction per line, into the
/// instruction sequence the machine executes.
pub fn parse(input: &str) -> Result<Vec<Instruction>> {
    let program = AsmParser::parse(Rule::program, input)?.next().unwrap();
    debug_assert_matches!(program.as_rule(), Rule::program);

    let mut instructions = Vec::new();
    for pair in program.into_inner() {
        if pair.as_rule() == Rule::EOI {
            continue;
        }
        instructions.push(process_instruction(pair)?);
    }
    Ok(instructions)
}

fn process_instruction(pair: Pair<Rule>) -> Result<Instruction> {
    debug_assert_matches!(pair.as_rule(), Rule::instruction);
    let inner = pair.into_inner().next().unwrap();
    let rule = inner.as_rule();
    let mut pairs = inner.into_inner();

    Ok(match rule {
        Rule::mov => {
            let dst = process_register(pairs.next().unwrap())?;
            let src = process_operand(pairs.next().unwrap())?;
            Instruction::Mov { dst, src }
        }
        Rule::ldr => {
            let dst = process_register(pairs.next().unwrap())?;
            let addr = process_operand(pairs.next().unwrap())?;
            Instruction::Ldr { dst, addr }
        }
        Rule::store => {
            let src = process_register(pairs.next().unwrap())?;
            let addr = process_operand(pairs.next().unwrap())?;
            Instruction::Str { src, addr }
        }
        Rule::binary => {
            let op: BinaryOp = process_enum(pairs.next().unwrap())?;
            let dst = process_register(pairs.next().unwrap())?;
            let lhs = process_operand(pairs.next().unwrap())?;
            let rhs = process_operand(pairs.next().unwrap())?;
            Instruction::Binary { op, dst, lhs, rhs }
        }
        Rule::cmp => {
            let lhs = process_operand(pairs.next().unwrap())?;
            let rhs = process_operand(pairs.next().unwrap())?;
            Instruction::Cmp { lhs, rhs }
        }
        Rule::branch => {
            let cond: BranchCond = process_enum(pairs.next().unwrap())?;
            let target = process_target(pairs.next().unwrap())?;
            Instruction::Branch { cond, target }
        }
        Rule::prt => {
            let src = process_operand(pairs.next().unwrap())?;
            Instruction::Prt { src }
        }
        Rule::halt => Instruction::Halt,
        _ => unreachable!(),
    })
}

fn process_enum<T: std::str::FromStr<Err = ParseEnumError>>(pair: Pair<Rule>) -> Result<T> {
    pair.as_str()
        .to_uppercase()
        .parse()
        .map_err(|err| new_parser_error(pair.as_span(), format!("{}", err)))
}

fn process_register(pair: Pair<Rule>) -> Result<Reg> {
    debug_assert_matches!(pair.as_rule(), Rule::register);
    pair.as_str()[1..]
        .parse()
        .map_err(|_| new_parser_error(pair.as_span(), "Invalid register index".to_owned()))
}

fn process_operand(pair: Pair<Rule>) -> Result<Operand> {
    debug_assert_matches!(pair.as_rule(), Rule::operand);
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::register => Ok(Operand::Register(process_register(inner)?)),
        Rule::immediate => {
            let lexeme = &inner.as_str()[1..];
            let value = if lexeme.contains('.') {
                lexeme.parse().ok().map(Value::Float)
            } else {
                lexeme.parse().ok().map(Value::Int)
            };
            value
                .map(Operand::Immediate)
                .ok_or_else(|| new_parser_error(inner.as_span(), "Invalid immediate".to_owned()))
        }
        Rule::address => inner
            .as_str()
            .parse()
            .map(Operand::Address)
            .map_err(|_| new_parser_error(inner.as_span(), "Address out of range".to_owned())),
        _ => unreachable!(),
    }
}

fn process_target(pair: Pair<Rule>) -> Result<usize> {
    debug_assert_matches!(pair.as_rule(), Rule::uint);
    pair.as_str()
        .parse()
        .map_err(|_| new_parser_error(pair.as_span(), "Branch target out of range".to_owned()))
}
