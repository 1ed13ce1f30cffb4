//! Assembler for the [pvm](../pvm/index.html) virtual machine.
//!
//! Two stages live here. [`parse`](fn.parse.html) reads the textual
//! assembly format (one instruction per line, opcode and operands
//! space-separated, branch operands as decimal instruction indices) into
//! `pvm::Instruction`s, ready to execute. [`encode`](fn.encode.html) packs
//! a program into fixed-width 16-bit machine words for the downstream
//! hardware model, and [`write_image`](fn.write_image.html) renders the
//! 256-word hex image.
//!
//! Parsing is implemented with [pest]; the [`Error`](type.Error.html) type
//! is an alias of `pest::error::Error`, so callers get pretty
//! source-anchored diagnostics for free.
//!
//! # The assembly text format
//!
//! Mnemonic | Operands | Example
//! ---------|----------|--------
//! `MOV`    | register, immediate or register | `MOV r0 #42`
//! `LDR`    | register, address or register   | `LDR r1 34`
//! `STR`    | register, address or register   | `STR r1 r2`
//! `ADD` `SUB` `MTP` `DIV` `EXP` `MOD` `FDV` | register, two operands | `ADD r0 #192 r1`
//! `CMP`    | two operands | `CMP r0 #20`
//! `BAL` `BEQ` `BNE` `BGT` `BLT` | instruction index | `BLT 6`
//! `PRT`    | immediate or register | `PRT r0`
//! `HALT`   | - | `HALT`
//!
//! Immediates carry a `#` prefix and are floats when they contain a `.`;
//! bare integers are data-memory addresses. Mnemonics are matched
//! case-insensitively.
//!
//! [pest]: https://docs.rs/pest/

mod encode;
mod parser;

#[cfg(test)]
mod test;

use std::fmt;

pub use crate::encode::{
    encode, write_image, EncodeError, EncodeErrorKind, Tag, IMAGE_WORDS,
};
pub use crate::parser::{parse, Error, Rule};

/// Any failure while assembling text to a machine image.
#[derive(Debug)]
pub enum AsmError {
    Parse(Error),
    Encode(EncodeError),
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AsmError::Parse(err) => write!(f, "{}", err),
            AsmError::Encode(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AsmError {}

impl From<Error> for AsmError {
    fn from(err: Error) -> AsmError {
        AsmError::Parse(err)
    }
}

impl From<EncodeError> for AsmError {
    fn from(err: EncodeError) -> AsmError {
        AsmError::Encode(err)
    }
}

/// Parses and encodes an assembly listing in one step.
pub fn assemble(input: &str) -> Result<Vec<u16>, AsmError> {
    Ok(encode(&parse(input)?)?)
}
