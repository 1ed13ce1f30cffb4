use std::collections::HashMap;

use pvm::constants::{ARRAY_BASE, ARRAY_END, SCALAR_BASE, SCALAR_END};
use pvm::Addr;

use crate::error::{syntax, ErrorKind};

/// What a name resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Symbol {
    Scalar(Addr),
    Array { base: Addr, length: Addr },
}

/// Maps scalar and array names to addresses in the flat data memory.
///
/// Scalars get one cell each, assigned in increasing order from the scalar
/// base; arrays get `length` contiguous cells, packed tightly from the array
/// base, so the two ranges stay disjoint by construction.
///
/// The table also remembers which scalars currently hold a compile-time
/// constant (their last assignment was an integer literal expression); array
/// declarations use this to fold their size.
pub struct SymbolTable {
    scalars: HashMap<String, Addr>,
    arrays: HashMap<String, (Addr, Addr)>,
    next_scalar: Addr,
    next_array: Addr,
    constants: HashMap<String, i64>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable {
            scalars: HashMap::new(),
            arrays: HashMap::new(),
            next_scalar: SCALAR_BASE,
            next_array: ARRAY_BASE,
            constants: HashMap::new(),
        }
    }

    /// Address of the named scalar, allocating the next free cell on first
    /// use. Idempotent for known names.
    pub fn declare_scalar(&mut self, name: &str) -> Result<Addr, ErrorKind> {
        if let Some(&addr) = self.scalars.get(name) {
            return Ok(addr);
        }
        if self.arrays.contains_key(name) {
            return Err(syntax(format!("'{}' is an array", name)));
        }
        if self.next_scalar > SCALAR_END {
            return Err(ErrorKind::MemoryExhausted);
        }
        let addr = self.next_scalar;
        self.next_scalar += 1;
        self.scalars.insert(name.to_owned(), addr);
        Ok(addr)
    }

    /// Reserves `length` contiguous cells for a new array and declares the
    /// hidden `__name__size__` scalar. Returns the array base and the
    /// address of the size scalar.
    pub fn declare_array(&mut self, name: &str, length: Addr) -> Result<(Addr, Addr), ErrorKind> {
        if self.arrays.contains_key(name) || self.scalars.contains_key(name) {
            return Err(syntax(format!("'{}' is already declared", name)));
        }
        let end = self.next_array as u32 + length as u32;
        if end > ARRAY_END as u32 + 1 {
            return Err(ErrorKind::MemoryExhausted);
        }
        let base = self.next_array;
        self.next_array = end as Addr;
        self.arrays.insert(name.to_owned(), (base, length));
        let size_addr = self.declare_scalar(&format!("__{}__size__", name))?;
        Ok((base, size_addr))
    }

    pub fn resolve(&self, name: &str) -> Option<Symbol> {
        if let Some(&addr) = self.scalars.get(name) {
            Some(Symbol::Scalar(addr))
        } else {
            self.arrays
                .get(name)
                .map(|&(base, length)| Symbol::Array { base, length })
        }
    }

    pub fn set_constant(&mut self, name: &str, value: i64) {
        self.constants.insert(name.to_owned(), value);
    }

    pub fn clear_constant(&mut self, name: &str) {
        self.constants.remove(name);
    }

    pub fn constant(&self, name: &str) -> Option<i64> {
        self.constants.get(name).copied()
    }
}

impl Default for SymbolTable {
    fn default() -> SymbolTable {
        SymbolTable::new()
    }
}
