//! Register scoreboard
//!
//! Tracks, per register, how many in-flight instructions still owe it a
//! write. A register with a non-zero count must not be read by Decode.

use crate::error::ExecutionError;
use crate::error::SimulatorResult;
use crate::instruction::RegisterIndex;
use crate::instruction::NUM_REGISTERS;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Scoreboard {
    pending: [u32; NUM_REGISTERS],
}

impl Scoreboard {
    /// Whether a write to `register` is still outstanding
    pub fn is_pending(&self, register: RegisterIndex) -> bool {
        self.pending[register.index()] > 0
    }

    /// Records an outstanding write to `register`
    pub fn reserve(&mut self, register: RegisterIndex) {
        self.pending[register.index()] += 1;
        tracing::trace!(%register, pending = self.pending[register.index()], "scoreboard reserve");
    }

    /// Retires one outstanding write to `register`
    pub fn release(&mut self, register: RegisterIndex) -> SimulatorResult<()> {
        let slot = &mut self.pending[register.index()];
        if *slot == 0 {
            return Err(ExecutionError::ScoreboardUnderflow { register: register.index() }.into());
        }
        *slot -= 1;
        tracing::trace!(%register, pending = *slot, "scoreboard release");
        Ok(())
    }

    /// Outstanding write count of every register
    pub fn pending_counts(&self) -> [u32; NUM_REGISTERS] {
        self.pending
    }

    /// True once no register owes a write
    pub fn is_clear(&self) -> bool {
        self.pending.iter().all(|&p| p == 0)
    }
}
