use pvm::{BranchCond, Instruction};

use crate::error::{syntax, ErrorKind};

/// Branch destination during compilation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// Resolved absolute index, relative to the enclosing block until the
    /// block is spliced into its parent.
    Index(usize),
    /// `ptr`: the end of the enclosing if/elif/else chain, filled in by a
    /// recorded fixup site.
    EndOfChain,
    /// `break`: the first instruction after the innermost enclosing loop.
    LoopExit,
}

/// One emitted row: an instruction, a branch that may still await its
/// target, or the PASS placeholder that is eliminated before execution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Slot {
    Instr(Instruction),
    Branch { cond: BranchCond, target: Target },
    Pass,
}

/// Appends a compiled block, offsetting its already-resolved branch targets
/// by the splice base. Placeholder targets are left for later fixup.
pub fn splice(code: &mut Vec<Slot>, block: Vec<Slot>) {
    let base = code.len();
    for slot in block {
        code.push(match slot {
            Slot::Branch {
                cond,
                target: Target::Index(index),
            } => Slot::Branch {
                cond,
                target: Target::Index(index + base),
            },
            other => other,
        });
    }
}

/// Fills in the target of a single branch site recorded earlier.
pub fn patch(code: &mut [Slot], site: usize, index: usize) {
    match &mut code[site] {
        Slot::Branch { target, .. } => {
            debug_assert!(*target == Target::EndOfChain);
            *target = Target::Index(index);
        }
        _ => debug_assert!(false, "fixup site is not a branch"),
    }
}

/// Resolves every placeholder of the given kind in `code` to `index`.
pub fn resolve(code: &mut [Slot], placeholder: Target, index: usize) {
    for slot in code.iter_mut() {
        if let Slot::Branch { target, .. } = slot {
            if *target == placeholder {
                *target = Target::Index(index);
            }
        }
    }
}

/// Eliminates PASS rows, renumbers branch targets and terminates the
/// program with `HALT`.
///
/// A branch into a removed PASS lands on the next surviving instruction, or
/// on the final `HALT` when nothing survives after it. On success no
/// placeholder targets remain and every branch operand is in range.
pub fn finalize(slots: Vec<Slot>) -> Result<Vec<Instruction>, ErrorKind> {
    // new_index[i]: number of surviving rows before row i
    let mut new_index = Vec::with_capacity(slots.len() + 1);
    let mut survivors = 0;
    for slot in &slots {
        new_index.push(survivors);
        if let Slot::Pass = slot {
        } else {
            survivors += 1;
        }
    }
    new_index.push(survivors);

    let map_target = |target: usize| -> usize {
        let mut t = target;
        while t < slots.len() {
            if let Slot::Pass = slots[t] {
                t += 1;
            } else {
                return new_index[t];
            }
        }
        // past the end, or nothing but PASS follows: the HALT slot
        survivors
    };

    let mut program = Vec::with_capacity(survivors + 1);
    for slot in &slots {
        match *slot {
            Slot::Pass => {}
            Slot::Instr(instruction) => program.push(instruction),
            Slot::Branch { cond, target } => match target {
                Target::Index(index) => program.push(Instruction::Branch {
                    cond,
                    target: map_target(index),
                }),
                Target::LoopExit => return Err(syntax("'break' outside of a loop")),
                Target::EndOfChain => return Err(syntax("unresolved branch target")),
            },
        }
    }
    program.push(Instruction::Halt);
    Ok(program)
}
