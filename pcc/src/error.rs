use std::fmt;

/// A fatal compile error, annotated with the 1-based source line number
/// (0 when no single line is to blame).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileError {
    pub line: usize,
    pub kind: ErrorKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Indentation that is not a whole number of four-space blocks.
    Indent,
    Syntax(String),
    UndefinedSymbol(String),
    /// `array(...)` with a size that is not known at compile time.
    VariableLengthArray,
    /// Expression too deep for the register file.
    RegisterPressure,
    /// The scalar or array address range is exhausted.
    MemoryExhausted,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::Indent => f.write_str("indentation is not a multiple of 4 spaces"),
            ErrorKind::Syntax(message) => f.write_str(message),
            ErrorKind::UndefinedSymbol(name) => write!(f, "variable '{}' does not exist", name),
            ErrorKind::VariableLengthArray => {
                f.write_str("variable length arrays are not supported")
            }
            ErrorKind::RegisterPressure => {
                f.write_str("expression is too deep for the register file")
            }
            ErrorKind::MemoryExhausted => f.write_str("out of data memory"),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.line > 0 {
            write!(f, "line {}: {}", self.line, self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl std::error::Error for CompileError {}

pub fn syntax(message: impl Into<String>) -> ErrorKind {
    ErrorKind::Syntax(message.into())
}
