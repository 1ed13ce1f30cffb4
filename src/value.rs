use std::fmt;

use crate::instruction::BinaryOp;

/// A runtime number.
///
/// A numeric lexeme is an integer unless it carries a decimal point.
/// Arithmetic is integral as long as both sides are integers and promotes to
/// IEEE-754 double as soon as either side is a float; integer arithmetic
/// wraps. `DIV` always produces a float, `FDV` always an integer (floored
/// toward negative infinity), and `MOD` is the floored modulo whose result
/// takes the sign of the divisor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
}

impl Value {
    pub fn is_float(self) -> bool {
        match self {
            Value::Int(_) => false,
            Value::Float(_) => true,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Value::Int(i) => i as f64,
            Value::Float(f) => f,
        }
    }

    /// Applies a binary arithmetic operation. Returns `None` on division
    /// (or modulo, or floor division) by zero.
    pub fn apply(op: BinaryOp, lhs: Value, rhs: Value) -> Option<Value> {
        use Value::*;

        match op {
            BinaryOp::Add => Some(match (lhs, rhs) {
                (Int(a), Int(b)) => Int(a.wrapping_add(b)),
                _ => Float(lhs.as_f64() + rhs.as_f64()),
            }),
            BinaryOp::Sub => Some(match (lhs, rhs) {
                (Int(a), Int(b)) => Int(a.wrapping_sub(b)),
                _ => Float(lhs.as_f64() - rhs.as_f64()),
            }),
            BinaryOp::Mtp => Some(match (lhs, rhs) {
                (Int(a), Int(b)) => Int(a.wrapping_mul(b)),
                _ => Float(lhs.as_f64() * rhs.as_f64()),
            }),
            BinaryOp::Div => {
                if rhs.as_f64() == 0.0 {
                    None
                } else {
                    Some(Float(lhs.as_f64() / rhs.as_f64()))
                }
            }
            BinaryOp::Exp => Some(match (lhs, rhs) {
                (Int(a), Int(b)) if 0 <= b && b <= u32::max_value() as i64 => {
                    Int(a.wrapping_pow(b as u32))
                }
                _ => Float(lhs.as_f64().powf(rhs.as_f64())),
            }),
            BinaryOp::Mod => match (lhs, rhs) {
                (_, Int(0)) => None,
                (Int(a), Int(b)) => Some(Int(a.wrapping_sub(b.wrapping_mul(floor_div(a, b))))),
                _ => {
                    let b = rhs.as_f64();
                    if b == 0.0 {
                        None
                    } else {
                        let a = lhs.as_f64();
                        Some(Float(a - b * (a / b).floor()))
                    }
                }
            },
            BinaryOp::Fdv => match (lhs, rhs) {
                (_, Int(0)) => None,
                (Int(a), Int(b)) => Some(Int(floor_div(a, b))),
                _ => {
                    let b = rhs.as_f64();
                    if b == 0.0 {
                        None
                    } else {
                        Some(Int((lhs.as_f64() / b).floor() as i64))
                    }
                }
            },
        }
    }
}

/// Integer division rounding toward negative infinity.
fn floor_div(a: i64, b: i64) -> i64 {
    let q = a.wrapping_div(b);
    if a.wrapping_rem(b) != 0 && (a < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Value::Int(i) => write!(f, "{}", i),
            // whole floats keep their decimal point, so the textual form
            // stays distinguishable from an integer
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{:.1}", x),
            Value::Float(x) => write!(f, "{}", x),
        }
    }
}
