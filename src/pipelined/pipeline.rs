//! Pipeline state
use crate::cpu::CPUState;
use crate::instruction::Instruction;

use super::control;

/// The five pipeline stages, head to tail
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Decode,
    Execute,
    Memory,
    WriteBack,
}

impl Stage {
    pub const ALL: [Stage; 5] =
        [Stage::Fetch, Stage::Decode, Stage::Execute, Stage::Memory, Stage::WriteBack];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Fetch => "Fetch",
            Stage::Decode => "Decode/RF",
            Stage::Execute => "Execute",
            Stage::Memory => "Memory",
            Stage::WriteBack => "Writeback",
        }
    }
}

/// Latch of one stage: the instruction it holds and its in-flight values
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageLatch {
    /// Program counter of the held instruction
    pub pc: u32,

    /// Held instruction, `None` for an empty latch
    pub inst: Option<Instruction>,

    /// Source operands, resolved in Decode
    pub rs1_value: i32,
    pub rs2_value: i32,

    /// Result headed for write-back
    pub buffer: i32,
    /// Effective address of LOAD/STORE
    pub mem_address: i32,

    /// Mid multi-cycle operation
    pub busy: bool,
    /// Held by a hazard
    pub stalled: bool,
}

impl StageLatch {
    pub fn new(pc: u32, inst: Instruction) -> Self {
        Self { pc, inst: Some(inst), ..Default::default() }
    }

    /// The instruction this stage should work on.
    /// Copies of a busy or stalled latch are bubbles
    pub fn live(&self) -> Option<Instruction> {
        if self.busy || self.stalled {
            None
        } else {
            self.inst
        }
    }

    /// View of a downstream latch: bubbles show as empty
    pub fn live_snapshot(&self, stage: Stage) -> StageSnapshot {
        if self.live().is_some() {
            self.snapshot(stage)
        } else {
            StageSnapshot::empty(stage)
        }
    }

    pub fn snapshot(&self, stage: Stage) -> StageSnapshot {
        StageSnapshot {
            stage,
            pc: self.pc,
            inst: self.inst,
            stalled: self.stalled,
            busy: self.busy,
        }
    }
}

/// Read-only view of a latch as its stage processed it in one cycle
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StageSnapshot {
    pub stage: Stage,
    pub pc: u32,
    pub inst: Option<Instruction>,
    pub stalled: bool,
    pub busy: bool,
}

impl StageSnapshot {
    pub fn empty(stage: Stage) -> Self {
        StageLatch::default().snapshot(stage)
    }
}

/// Pipeline state = 5 stage latches
#[derive(Clone, Copy, Debug, Default)]
pub struct PipelineState {
    pub fetch: StageLatch,
    pub decode: StageLatch,
    pub execute: StageLatch,
    pub memory: StageLatch,
    pub write_back: StageLatch,
}

impl PipelineState {
    pub fn latch(&self, stage: Stage) -> &StageLatch {
        match stage {
            Stage::Fetch => &self.fetch,
            Stage::Decode => &self.decode,
            Stage::Execute => &self.execute,
            Stage::Memory => &self.memory,
            Stage::WriteBack => &self.write_back,
        }
    }

    /// Structural hazard:
    /// Execute is still in the first cycle of a multi-cycle op
    pub fn execute_occupied(&self) -> bool {
        self.execute.busy && self.execute.inst.is_some_and(|inst| inst.is_multi_cycle())
    }

    /// Data hazard:
    /// a source of the instruction in Decode still has a write pending
    pub fn data_hazard(&self, cpu: &CPUState) -> bool {
        self.decode.inst.is_some_and(|inst| {
            control::reads_operands(cpu, &inst)
                && inst.sources().any(|r| cpu.scoreboard.is_pending(r))
        })
    }

    /// No latch holds an instruction
    pub fn is_drained(&self) -> bool {
        Stage::ALL.iter().all(|&stage| self.latch(stage).inst.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CPUPolicy;
    use crate::instruction::{Attributes, Opcode, RegisterIndex};

    fn r(i: i64) -> Option<RegisterIndex> {
        Some(RegisterIndex::new(i).unwrap())
    }

    fn mul() -> Instruction {
        Instruction::new(Opcode::Mul, Attributes { rd: r(3), rs1: r(1), rs2: r(2), imm: None })
            .unwrap()
    }

    #[test]
    fn test_live() {
        let mut latch = StageLatch::new(4000, mul());
        assert!(latch.live().is_some());
        latch.stalled = true;
        assert!(latch.live().is_none());
        latch.stalled = false;
        latch.busy = true;
        assert!(latch.live().is_none());
        assert_eq!(latch.live_snapshot(Stage::Memory), StageSnapshot::empty(Stage::Memory));
        assert_eq!(latch.snapshot(Stage::Memory).inst, Some(mul()));
        assert!(StageLatch::default().live().is_none());
    }

    #[test]
    fn test_execute_occupied() {
        let mut state = PipelineState::default();
        state.execute = StageLatch::new(4000, mul());
        assert!(!state.execute_occupied());
        state.execute.busy = true;
        assert!(state.execute_occupied());
    }

    #[test]
    fn test_data_hazard() {
        let mut cpu = CPUState::make(CPUPolicy::default());
        let mut state = PipelineState::default();
        assert!(!state.data_hazard(&cpu));

        state.decode = StageLatch::new(4000, mul());
        assert!(!state.data_hazard(&cpu));
        cpu.scoreboard.reserve(RegisterIndex::new(2).unwrap());
        assert!(state.data_hazard(&cpu));
        // The destination alone is not a hazard
        cpu.scoreboard.release(RegisterIndex::new(2).unwrap()).unwrap();
        cpu.scoreboard.reserve(RegisterIndex::new(3).unwrap());
        assert!(!state.data_hazard(&cpu));
    }

    #[test]
    fn test_drained() {
        let mut state = PipelineState::default();
        assert!(state.is_drained());
        state.memory = StageLatch::new(4000, mul());
        assert!(!state.is_drained());
    }
}
