use std::fmt;

use crate::constants;
use crate::value::Value;

/// Flat data memory of the virtual machine.
///
/// All cells start out uninitialized; loading a cell that was never stored
/// to is an error, as is any access outside of the address space.
///
/// # Examples
/// ```
/// use pvm::{Memory, Value};
///
/// let mut memory = Memory::new();
/// memory.store(40, Value::Int(7)).unwrap();
/// assert_eq!(memory.load(40), Ok(Value::Int(7)));
/// ```
pub struct Memory {
    cells: Vec<Option<Value>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryError {
    OutOfRange(usize),
    Uninitialized(usize),
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            MemoryError::OutOfRange(address) => {
                write!(f, "memory address {} is out of range", address)
            }
            MemoryError::Uninitialized(address) => {
                write!(f, "memory address {} was never written", address)
            }
        }
    }
}

impl std::error::Error for MemoryError {}

impl Memory {
    pub fn new() -> Memory {
        Memory {
            cells: vec![None; constants::MEMORY_SIZE],
        }
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn check_address(&self, address: usize) -> bool {
        address < self.cells.len()
    }

    pub fn load(&self, address: usize) -> Result<Value, MemoryError> {
        self.cells
            .get(address)
            .copied()
            .ok_or(MemoryError::OutOfRange(address))?
            .ok_or(MemoryError::Uninitialized(address))
    }

    pub fn store(&mut self, address: usize, value: Value) -> Result<(), MemoryError> {
        let cell = self
            .cells
            .get_mut(address)
            .ok_or(MemoryError::OutOfRange(address))?;
        *cell = Some(value);
        Ok(())
    }

    /// Raw view of a cell, for debuggers and tests.
    pub fn get(&self, address: usize) -> Option<Value> {
        self.cells.get(address).copied().flatten()
    }
}

impl Default for Memory {
    fn default() -> Memory {
        Memory::new()
    }
}
