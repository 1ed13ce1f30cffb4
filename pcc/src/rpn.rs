use pvm::BinaryOp;

use crate::error::{syntax, ErrorKind};
use crate::lexer::{lex, Token};

/// An operator as it appears in RPN output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExprOp {
    Binary(BinaryOp),
    /// `~`: array indexing, rewritten from `[` `]` by the lexer.
    Index,
}

impl ExprOp {
    fn from_char(c: char) -> Option<ExprOp> {
        Some(match c {
            '+' => ExprOp::Binary(BinaryOp::Add),
            '-' => ExprOp::Binary(BinaryOp::Sub),
            '*' => ExprOp::Binary(BinaryOp::Mtp),
            '/' => ExprOp::Binary(BinaryOp::Div),
            '^' => ExprOp::Binary(BinaryOp::Exp),
            '%' => ExprOp::Binary(BinaryOp::Mod),
            '\\' => ExprOp::Binary(BinaryOp::Fdv),
            '~' => ExprOp::Index,
            _ => return None,
        })
    }

    fn precedence(self) -> u8 {
        match self {
            ExprOp::Index => 4,
            ExprOp::Binary(BinaryOp::Exp) => 3,
            ExprOp::Binary(BinaryOp::Mtp)
            | ExprOp::Binary(BinaryOp::Div)
            | ExprOp::Binary(BinaryOp::Fdv) => 2,
            ExprOp::Binary(BinaryOp::Add) | ExprOp::Binary(BinaryOp::Sub) => 1,
            ExprOp::Binary(BinaryOp::Mod) => 2,
        }
    }

    fn is_right_associative(self) -> bool {
        self == ExprOp::Binary(BinaryOp::Exp)
    }
}

/// One element of an RPN sequence.
#[derive(Clone, Debug, PartialEq)]
pub enum RpnToken {
    Operand(Token),
    Operator(ExprOp),
}

enum StackItem {
    Op(ExprOp),
    Paren,
}

/// Lexes an infix expression and converts it to RPN with the shunting-yard
/// algorithm.
pub fn to_rpn(expression: &str) -> Result<Vec<RpnToken>, ErrorKind> {
    let mut output = Vec::new();
    let mut stack: Vec<StackItem> = Vec::new();

    for token in lex(expression)? {
        match token {
            Token::Number(_) | Token::Str(_) | Token::Variable(_) => {
                output.push(RpnToken::Operand(token));
            }
            Token::Punct('(') => stack.push(StackItem::Paren),
            Token::Punct(')') => {
                loop {
                    match stack.pop() {
                        Some(StackItem::Op(op)) => output.push(RpnToken::Operator(op)),
                        Some(StackItem::Paren) => break,
                        None => return Err(syntax("mismatched brackets")),
                    }
                }
            }
            Token::Punct(c) => {
                // the lexer only emits operator and bracket punctuation
                let op = ExprOp::from_char(c)
                    .ok_or_else(|| syntax(format!("unexpected character '{}'", c)))?;
                while let Some(StackItem::Op(top)) = stack.last() {
                    let pops = top.precedence() > op.precedence()
                        || (top.precedence() == op.precedence() && !op.is_right_associative());
                    if !pops {
                        break;
                    }
                    output.push(RpnToken::Operator(*top));
                    stack.pop();
                }
                stack.push(StackItem::Op(op));
            }
        }
    }

    while let Some(item) = stack.pop() {
        match item {
            StackItem::Op(op) => output.push(RpnToken::Operator(op)),
            StackItem::Paren => return Err(syntax("mismatched brackets")),
        }
    }

    if output.is_empty() {
        return Err(syntax("empty expression"));
    }

    Ok(output)
}
