//! Pipelined implementation

use crate::cpu::CPUState;
use crate::cpu::ControlFlow;
use crate::error::ExecutionError;
use crate::error::SimulatorResult;
use crate::instruction::NUM_REGISTERS;
use crate::memory::DataMemory;
use crate::program::Program;
use pipeline::PipelineState;
use pipeline::Stage;
use pipeline::StageSnapshot;

pub mod control;
pub mod pipeline;
pub mod stages;

/// Driver state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulationStatus {
    Running,
    Complete,
}

/// The pipeline engine: architectural state, data memory
/// and the five latches, advanced one clock cycle per tick
pub struct Pipeline<'p> {
    program: &'p Program,
    cpu: CPUState,
    mem: DataMemory,
    state: PipelineState,
    /// Each latch as its stage processed it in the last cycle
    last_cycle: [StageSnapshot; 5],
}

impl<'p> Pipeline<'p> {
    pub fn new(program: &'p Program, cpu: CPUState, mem: DataMemory) -> Self {
        Self {
            program,
            cpu,
            mem,
            state: PipelineState::default(),
            last_cycle: Stage::ALL.map(StageSnapshot::empty),
        }
    }

    pub fn cpu(&self) -> &CPUState {
        &self.cpu
    }

    pub fn memory(&self) -> &DataMemory {
        &self.mem
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn last_cycle(&self) -> &[StageSnapshot; 5] {
        &self.last_cycle
    }

    /// Register file, for the final report
    pub fn registers(&self) -> [i32; NUM_REGISTERS] {
        self.cpu.registers()
    }

    pub fn clock(&self) -> u64 {
        self.cpu.history.cycle_count
    }

    pub fn retired(&self) -> u64 {
        self.cpu.history.inst_count
    }

    pub fn into_parts(self) -> (CPUState, DataMemory) {
        (self.cpu, self.mem)
    }

    pub fn status(&self) -> SimulationStatus {
        let complete = match self.cpu.policy.control_flow {
            ControlFlow::Disabled => self.retired() == self.program.len() as u64,
            // Retirements no longer track the program length
            ControlFlow::Enabled => {
                control::fetch_exhausted(&self.cpu, self.program) && self.state.is_drained()
            }
        };
        if complete {
            SimulationStatus::Complete
        } else {
            SimulationStatus::Running
        }
    }

    /// Advances every stage by one clock cycle, tail first
    pub fn tick(&mut self) -> SimulatorResult<()> {
        let cpu = &mut self.cpu;
        let state = &mut self.state;

        self.last_cycle[4] = stages::write_back(cpu, state)?;
        self.last_cycle[3] = stages::memory_access(&mut self.mem, state)?;
        self.last_cycle[2] = stages::execute(cpu, self.program, state)?;
        self.last_cycle[1] = stages::instruction_decode(cpu, state);
        self.last_cycle[0] = stages::instruction_fetch(cpu, self.program, state);

        tracing::debug!("Clock Cycle #: {}", cpu.history.cycle_count);
        for snapshot in &self.last_cycle {
            tracing::debug!("{}", snapshot);
        }

        cpu.update_cycle_count(1);
        Ok(())
    }

    /// Runs until every instruction has retired
    pub fn run(&mut self) -> SimulatorResult<()> {
        self.run_with(|_, _| Ok(()))
    }

    /// Runs to completion, handing each finished cycle to `observer`
    pub fn run_with<F>(&mut self, mut observer: F) -> SimulatorResult<()>
    where
        F: FnMut(u64, &[StageSnapshot; 5]) -> SimulatorResult<()>,
    {
        while self.status() == SimulationStatus::Running {
            if let Some(limit) = self.cpu.policy.max_cycles {
                if self.clock() >= limit {
                    return Err(ExecutionError::ExecutionLimitReached(limit).into());
                }
            }

            let cycle = self.clock();
            self.tick()?;
            observer(cycle, &self.last_cycle)?;
        }

        tracing::info!(
            "Simulation complete: {} instructions retired in {} cycles",
            self.retired(),
            self.clock()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CPUPolicy;
    use crate::error::{MemoryError, MemoryErrorKind, SimulatorError};
    use crate::instruction::{Attributes, Instruction, Opcode, RegisterIndex};
    use crate::loader::parse_program;
    use crate::single_cycle;
    use proptest::prelude::*;

    fn policy(control_flow: ControlFlow) -> CPUPolicy {
        CPUPolicy { control_flow, max_cycles: Some(10_000), ..Default::default() }
    }

    fn pipeline(program: &Program) -> Pipeline<'_> {
        Pipeline::new(program, CPUState::make(policy(ControlFlow::Disabled)), DataMemory::make())
    }

    /// Runs the program and collects every cycle's snapshots
    fn run_traced(pipe: &mut Pipeline<'_>) -> Vec<[StageSnapshot; 5]> {
        let mut cycles = Vec::new();
        pipe.run_with(|_, snapshots| {
            cycles.push(*snapshots);
            Ok(())
        })
        .unwrap();
        cycles
    }

    #[test]
    fn test_data_hazard_stall() {
        let program = parse_program("MOVC,R1,#5\nADD,R2,R1,R1").unwrap();
        let mut pipe = pipeline(&program);
        let cycles = run_traced(&mut pipe);

        assert_eq!(pipe.registers()[1], 5);
        assert_eq!(pipe.registers()[2], 10);
        assert_eq!(pipe.retired(), 2);
        assert_eq!(pipe.clock(), 8);

        // ADD waits in Decode until MOVC writes back in cycle 4
        let decode_stalls: Vec<bool> = cycles.iter().map(|c| c[1].stalled).collect();
        assert_eq!(decode_stalls, vec![false, false, true, true, false, false, false, false]);
        assert_eq!(pipe.cpu().history.data_stall_count, 2);

        // No stalled copy ever executes or retires
        assert!(pipe.cpu().scoreboard.is_clear());
    }

    #[test]
    fn test_back_to_back_dependency_is_caught() {
        // The reader sits right behind the writer: the reservation made in
        // Execute is visible to Decode within the same cycle
        let program = parse_program("MOVC,R1,#1\nMOVC,R1,#2\nADD,R2,R1,R1\nSUB,R3,R2,R1").unwrap();
        let mut pipe = pipeline(&program);
        pipe.run().unwrap();
        assert_eq!(pipe.registers()[1], 2);
        assert_eq!(pipe.registers()[2], 4);
        assert_eq!(pipe.registers()[3], 2);
        assert!(pipe.cpu().scoreboard.is_clear());
    }

    #[test]
    fn test_multiply_structural_stall() {
        let program = parse_program("MUL,R3,R1,R2\nADD,R4,R1,R2").unwrap();
        let mut pipe = pipeline(&program);
        let cycles = run_traced(&mut pipe);

        let fetch_stalled: Vec<bool> = cycles.iter().map(|c| c[0].stalled).collect();
        let decode_stalled: Vec<bool> = cycles.iter().map(|c| c[1].stalled).collect();
        let execute_busy: Vec<bool> = cycles.iter().map(|c| c[2].busy).collect();

        assert_eq!(execute_busy, vec![false, false, true, false, false, false, false]);
        assert_eq!(fetch_stalled, execute_busy);
        assert_eq!(decode_stalled, execute_busy);
        assert_eq!(cycles[2][2].inst.map(|i| i.opcode), Some(Opcode::Mul));
        assert_eq!(cycles[2][1].inst.map(|i| i.opcode), Some(Opcode::Add));

        assert_eq!(pipe.retired(), 2);
        assert_eq!(pipe.clock(), 7);
        assert_eq!(pipe.cpu().history.structural_stall_count, 1);
    }

    #[test]
    fn test_multiply_values() {
        let program =
            parse_program("MOVC,R1,#3\nMOVC,R2,#4\nMUL,R3,R1,R2\nADD,R4,R3,R1\nMUL,R5,R4,R4")
                .unwrap();
        let mut pipe = pipeline(&program);
        pipe.run().unwrap();
        assert_eq!(pipe.registers()[3], 12);
        assert_eq!(pipe.registers()[4], 15);
        assert_eq!(pipe.registers()[5], 225);
        assert_eq!(pipe.retired(), 5);
    }

    #[test]
    fn test_memory_round_trip() {
        let program = parse_program("MOVC,R1,#7\nSTORE,R1,R0,#100\nLOAD,R2,R0,#100").unwrap();
        let mut pipe = pipeline(&program);
        pipe.run().unwrap();
        assert_eq!(pipe.registers()[2], 7);
        assert_eq!(pipe.memory().load(100).unwrap(), 7);
        assert_eq!(pipe.retired(), 3);
    }

    #[test]
    fn test_store_out_of_bounds() {
        let program = parse_program("MOVC,R1,#7\nSTORE,R1,R0,#4000").unwrap();
        let mut pipe = pipeline(&program);
        match pipe.run() {
            Err(SimulatorError::MemoryError(MemoryError::AccessError { address, kind })) => {
                assert_eq!(address, 4000);
                assert_eq!(kind, MemoryErrorKind::OutOfBounds);
            }
            other => panic!("expected bounds violation, got {:?}", other),
        }
        assert!(pipe.memory().words().iter().all(|&w| w == 0));
        assert!(pipe.retired() < 2);
    }

    #[test]
    fn test_load_out_of_bounds() {
        let program = parse_program("MOVC,R1,#-1\nLOAD,R2,R1,#0").unwrap();
        let mut pipe = pipeline(&program);
        assert!(matches!(
            pipe.run(),
            Err(SimulatorError::MemoryError(MemoryError::AccessError { address: -1, .. }))
        ));
    }

    #[test]
    fn test_independent_program_timing() {
        let program =
            parse_program("MOVC,R1,#1\nMOVC,R2,#2\nMOVC,R3,#3\nMOVC,R4,#4\nMOVC,R5,#5").unwrap();
        let mut pipe = pipeline(&program);
        pipe.run().unwrap();
        assert_eq!(pipe.retired(), 5);
        assert_eq!(pipe.clock(), 9);
        assert!(pipe.clock() <= 5 + program.len() as u64);
        assert_eq!(pipe.registers()[1..6], [1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_empty_program() {
        let program = Program::default();
        let mut pipe = pipeline(&program);
        assert_eq!(pipe.status(), SimulationStatus::Complete);
        pipe.run().unwrap();
        assert_eq!(pipe.clock(), 0);
    }

    #[test]
    fn test_control_ops_pass_through_when_disabled() {
        let program = parse_program("MOVC,R1,#1\nBZ,#-4\nJUMP,R9,#0\nHALT\nMOVC,R2,#2").unwrap();
        let mut pipe = pipeline(&program);
        pipe.run().unwrap();
        assert_eq!(pipe.retired(), 5);
        assert_eq!(pipe.registers()[2], 2);
        assert_eq!(pipe.cpu().history.flush_count, 0);
    }

    const COUNTDOWN: &str = "MOVC,R1,#3\n\
                             MOVC,R2,#1\n\
                             SUB,R1,R1,R2\n\
                             BNZ,#-4\n\
                             HALT\n\
                             MOVC,R5,#9";

    #[test]
    fn test_branch_loop() {
        let program = parse_program(COUNTDOWN).unwrap();
        let mut pipe =
            Pipeline::new(&program, CPUState::make(policy(ControlFlow::Enabled)), DataMemory::make());
        pipe.run().unwrap();

        assert_eq!(pipe.registers()[1], 0);
        assert_eq!(pipe.registers()[5], 0);
        assert_eq!(pipe.retired(), 9);
        assert_eq!(pipe.cpu().history.flush_count, 2);
        assert!(pipe.state().is_drained());
        assert!(pipe.cpu().scoreboard.is_clear());
    }

    #[test]
    fn test_jump() {
        let program = parse_program("MOVC,R1,#4012\nJUMP,R1,#0\nMOVC,R2,#1\nMOVC,R3,#1").unwrap();
        let mut pipe =
            Pipeline::new(&program, CPUState::make(policy(ControlFlow::Enabled)), DataMemory::make());
        pipe.run().unwrap();
        assert_eq!(pipe.registers()[2], 0);
        assert_eq!(pipe.registers()[3], 1);
        assert_eq!(pipe.retired(), 3);
    }

    #[test]
    fn test_jump_out_of_program() {
        let program = parse_program("MOVC,R1,#5000\nJUMP,R1,#0").unwrap();
        let mut pipe =
            Pipeline::new(&program, CPUState::make(policy(ControlFlow::Enabled)), DataMemory::make());
        assert!(matches!(
            pipe.run(),
            Err(SimulatorError::ExecutionError(ExecutionError::InvalidBranchTarget {
                pc: 4004,
                target: 5000
            }))
        ));
    }

    #[test]
    fn test_execution_limit() {
        let program = parse_program("BNZ,#0").unwrap();
        let mut policy = policy(ControlFlow::Enabled);
        policy.max_cycles = Some(50);
        let mut pipe = Pipeline::new(&program, CPUState::make(policy), DataMemory::make());
        assert!(matches!(
            pipe.run(),
            Err(SimulatorError::ExecutionError(ExecutionError::ExecutionLimitReached(50)))
        ));
        assert_eq!(pipe.clock(), 50);
    }

    #[test]
    fn test_matches_single_cycle_with_control_flow() {
        let program = parse_program(COUNTDOWN).unwrap();
        let policy = policy(ControlFlow::Enabled);

        let mut pipe = Pipeline::new(&program, CPUState::make(policy), DataMemory::make());
        pipe.run().unwrap();

        let mut cpu = CPUState::make(policy);
        let mut mem = DataMemory::make();
        single_cycle::run(&mut cpu, &mut mem, &program).unwrap();

        assert_eq!(pipe.registers(), cpu.registers());
        assert_eq!(pipe.retired(), cpu.history.inst_count);
    }

    fn build(opcode: Opcode, rd: i64, rs1: i64, rs2: i64, imm: i32) -> Instruction {
        let r = |i| RegisterIndex::new(i).ok();
        Instruction::new(opcode, Attributes { rd: r(rd), rs1: r(rs1), rs2: r(rs2), imm: Some(imm) })
            .unwrap()
    }

    /// Straight-line instructions that never write R0, so R0-based
    /// addresses stay within data memory
    fn arb_instruction() -> impl Strategy<Value = Instruction> {
        let alu_ops = vec![Opcode::Add, Opcode::Sub, Opcode::Mul, Opcode::And, Opcode::Or, Opcode::Xor];
        prop_oneof![
            (1i64..16, -50i32..50).prop_map(|(rd, imm)| build(Opcode::Movc, rd, 0, 0, imm)),
            (prop::sample::select(alu_ops), 1i64..16, 0i64..16, 0i64..16)
                .prop_map(|(op, rd, rs1, rs2)| build(op, rd, rs1, rs2, 0)),
            (1i64..16, 0i32..4000).prop_map(|(rd, imm)| build(Opcode::Load, rd, 0, 0, imm)),
            (0i64..16, 0i32..4000).prop_map(|(rs1, imm)| build(Opcode::Store, 0, rs1, 0, imm)),
        ]
    }

    proptest! {
        #[test]
        fn pipeline_matches_single_cycle(insts in prop::collection::vec(arb_instruction(), 0..24)) {
            let program = Program::new(insts);
            let policy = policy(ControlFlow::Disabled);

            let mut pipe = Pipeline::new(&program, CPUState::make(policy), DataMemory::make());
            pipe.run().unwrap();

            let mut cpu = CPUState::make(policy);
            let mut mem = DataMemory::make();
            single_cycle::run(&mut cpu, &mut mem, &program).unwrap();

            prop_assert_eq!(pipe.retired(), program.len() as u64);
            prop_assert_eq!(pipe.registers(), cpu.registers());
            prop_assert_eq!(pipe.memory().words(), mem.words());
            prop_assert!(pipe.cpu().scoreboard.is_clear());
        }
    }
}
