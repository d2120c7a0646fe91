//! Test case reduction.

use crate::mutation::replay;
use crate::program::Program;
use fuzzir_core::Result;
use std::ops::RangeInclusive;
use tracing::{debug, trace, warn};

/// Shrinks a program by deleting instructions while a predicate keeps holding.
///
/// Block begins are removed together with their whole block group. A
/// deletion that would leave the program invalid (a later instruction using
/// a removed variable, for example) is simply skipped.
#[derive(Debug, Clone)]
pub struct Minimizer {
    max_rounds: usize,
}

impl Minimizer {
    pub fn new(max_rounds: usize) -> Self {
        Self {
            max_rounds: max_rounds.max(1),
        }
    }

    pub fn minimize(&self, program: &Program, mut keep: impl FnMut(&Program) -> bool) -> Result<Program> {
        if !keep(program) {
            warn!(size = program.size(), "predicate does not hold for the original program");
            return Ok(program.clone());
        }

        let mut current = program.clone();
        for round in 0..self.max_rounds {
            let mut changed = false;
            let mut index = current.size();
            while index > 0 {
                index -= 1;
                let Some(range) = removal_range(&current, index) else {
                    continue;
                };
                match without(&current, range.clone()) {
                    Ok(candidate) if keep(&candidate) => {
                        trace!(?range, "removed");
                        current = candidate;
                        changed = true;
                    }
                    Ok(_) => {}
                    Err(e) => trace!(?range, error = %e, "removal leaves program invalid"),
                }
            }
            debug!(round, size = current.size(), "minimization round finished");
            if !changed {
                break;
            }
        }
        Ok(current)
    }
}

impl Default for Minimizer {
    fn default() -> Self {
        Self::new(8)
    }
}

/// Instructions that go away when the instruction at `index` is removed
fn removal_range(program: &Program, index: usize) -> Option<RangeInclusive<usize>> {
    let inst = program.get(index)?;
    if inst.is_block_end() {
        return None;
    }
    if inst.is_block_begin() {
        return Some(index..=program.block_group_end(index)?);
    }
    Some(index..=index)
}

fn without(program: &Program, range: RangeInclusive<usize>) -> Result<Program> {
    replay(program, |inst, b| {
        if range.contains(&inst.index()) {
            Ok(())
        } else {
            b.adopt(inst, true)
        }
    })
}
