//! Command-line driver for the P toolchain.
//!
//! `compile` turns a source program into assembly text, `run` executes a
//! compiled program and prints its output stream, and `debug` single-steps
//! one and dumps `(pc, registers, status, output-so-far)` between steps.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use pvm::{Machine, Step};

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error, PathBuf),
    Compile(pcc::CompileError),
    Parse(pasm::Error),
    Runtime(pvm::RuntimeError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err, path) => write!(f, "{}: {}", path.display(), err),
            Error::Compile(err) => write!(f, "compile error: {}", err),
            Error::Parse(err) => write!(f, "parse error:\n{}", err),
            Error::Runtime(err) => write!(f, "runtime {}", err),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Process exit code: 1 for input and compile problems, 2 for runtime
    /// failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Runtime(_) => 2,
            _ => 1,
        }
    }
}

/// Compiles a source file and writes the assembly listing.
pub fn compile_file(source: &Path, dest: &Path) -> Result<(), Error> {
    let text = fs::read_to_string(source).map_err(|err| Error::Io(err, source.to_owned()))?;
    let program = pcc::compile(&text).map_err(Error::Compile)?;

    let mut listing = String::new();
    for instruction in &program {
        listing.push_str(&instruction.to_string());
        listing.push('\n');
    }
    fs::write(dest, listing).map_err(|err| Error::Io(err, dest.to_owned()))?;
    Ok(())
}

/// Reads an assembly listing into a machine ready to run.
pub fn load_program(path: &Path) -> Result<Machine, Error> {
    let text = fs::read_to_string(path).map_err(|err| Error::Io(err, path.to_owned()))?;
    let program = pasm::parse(&text).map_err(Error::Parse)?;
    Ok(Machine::new(program))
}

/// Runs a compiled program to completion, returning its print stream.
pub fn run_file(path: &Path) -> Result<Vec<String>, Error> {
    let mut machine = load_program(path)?;
    machine.run().map_err(Error::Runtime)?;
    Ok(machine.into_output())
}

/// Single-steps a compiled program, writing one state dump per step.
pub fn debug_file(path: &Path, out: &mut dyn Write) -> Result<(), Error> {
    let mut machine = load_program(path)?;
    loop {
        writeln!(out, "{}", dump(&machine)).map_err(|err| Error::Io(err, path.to_owned()))?;
        match machine.step().map_err(Error::Runtime)? {
            Step::Running => {}
            Step::Halted => return Ok(()),
        }
    }
}

/// One line of debugger state: pc, registers, status flags and the output
/// stream so far.
pub fn dump(machine: &Machine) -> String {
    let registers: Vec<String> = machine
        .registers()
        .iter()
        .enumerate()
        .map(|(i, value)| format!("r{}={}", i, value))
        .collect();
    let status = match machine.status() {
        None => "----".to_owned(),
        Some(s) => format!(
            "{}{}{}{}",
            if s.eq { 'E' } else { '-' },
            if s.ne { 'N' } else { '-' },
            if s.gt { 'G' } else { '-' },
            if s.lt { 'L' } else { '-' },
        ),
    };
    format!(
        "pc={:<3} {} status={} output=[{}]",
        machine.pc(),
        registers.join(" "),
        status,
        machine.output().join(", ")
    )
}

#[cfg(test)]
mod test;
