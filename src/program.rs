//! Program store: the loaded instruction array, addressed by PC

use crate::instruction::Instruction;

/// PC of the first instruction
pub const CODE_BASE: u32 = 4000;
/// Bytes between consecutive instructions
pub const INSTRUCTION_SIZE: u32 = 4;

/// Immutable, ordered instruction sequence
#[derive(Clone, Debug, Default)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Converts a PC into an index of the instruction array
    pub fn index_of(pc: u32) -> Option<usize> {
        let offset = pc.checked_sub(CODE_BASE)?;
        if offset % INSTRUCTION_SIZE != 0 {
            return None;
        }
        Some((offset / INSTRUCTION_SIZE) as usize)
    }

    /// Converts an array index back into its PC
    pub fn pc_of(index: usize) -> u32 {
        CODE_BASE + INSTRUCTION_SIZE * index as u32
    }

    /// PC one past the last instruction
    pub fn end_pc(&self) -> u32 {
        Self::pc_of(self.len())
    }

    /// Instruction at `pc`, `None` past the end of the program
    pub fn fetch(&self, pc: u32) -> Option<&Instruction> {
        Self::index_of(pc).and_then(|i| self.instructions.get(i))
    }

    /// Whether `pc` may be the target of a control transfer;
    /// the end address is allowed and falls off the program
    pub fn is_valid_target(&self, pc: i64) -> bool {
        u32::try_from(pc)
            .ok()
            .and_then(Self::index_of)
            .is_some_and(|i| i <= self.len())
    }
}
