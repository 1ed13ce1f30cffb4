use pvm::constants::REGISTER_COUNT;
use pvm::Reg;

use crate::error::ErrorKind;

/// Compile-time view of the register bank: one busy flag per register.
///
/// Allocation always hands out the lowest-indexed free register, which keeps
/// code generation deterministic.
pub struct RegisterFile {
    busy: [bool; REGISTER_COUNT],
}

/// Saved allocation state, restored after a nested sub-expression.
#[derive(Clone, Copy, Debug)]
pub struct Snapshot {
    busy: [bool; REGISTER_COUNT],
}

impl RegisterFile {
    pub fn new() -> RegisterFile {
        RegisterFile {
            busy: [false; REGISTER_COUNT],
        }
    }

    /// Claims the lowest-indexed free register.
    pub fn allocate(&mut self) -> Result<Reg, ErrorKind> {
        for index in 0..REGISTER_COUNT {
            if !self.busy[index] {
                let reg = index as Reg;
                self.block(reg);
                return Ok(reg);
            }
        }
        Err(ErrorKind::RegisterPressure)
    }

    /// Marks a known register busy without allocating it.
    pub fn block(&mut self, reg: Reg) {
        self.busy[reg as usize] = true;
    }

    pub fn free(&mut self, reg: Reg) {
        self.busy[reg as usize] = false;
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot { busy: self.busy }
    }

    pub fn restore(&mut self, snapshot: Snapshot) {
        self.busy = snapshot.busy;
    }

    pub fn all_free(&self) -> bool {
        self.busy.iter().all(|busy| !busy)
    }
}

impl Default for RegisterFile {
    fn default() -> RegisterFile {
        RegisterFile::new()
    }
}
