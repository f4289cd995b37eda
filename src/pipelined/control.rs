//! Control-flow extension: BZ, BNZ, JUMP and HALT.
//!
//! With `ControlFlow::Disabled` these opcodes read nothing, do nothing and
//! retire like any other instruction. When enabled, branches and jumps
//! resolve in Execute, redirect the PC and flush the two younger latches;
//! HALT stops fetching once decoded.

use crate::cpu::CPUState;
use crate::cpu::ControlFlow;
use crate::error::SimulatorResult;
use crate::instruction::Instruction;
use crate::instruction::Opcode;
use crate::program::Program;
use crate::stages_simple;

use super::pipeline::PipelineState;
use super::pipeline::StageLatch;

pub fn is_enabled(cpu: &CPUState) -> bool {
    cpu.policy.control_flow == ControlFlow::Enabled
}

/// Whether Decode checks and reads the sources of `inst`
pub fn reads_operands(cpu: &CPUState, inst: &Instruction) -> bool {
    !inst.controls.control || is_enabled(cpu)
}

/// Nothing more will enter the pipeline
pub fn fetch_exhausted(cpu: &CPUState, program: &Program) -> bool {
    cpu.fetch_halted || program.fetch(cpu.pc).is_none()
}

/// ID: a decoded HALT closes the front end
pub fn decode(cpu: &mut CPUState, inst: &Instruction) {
    if is_enabled(cpu) && inst.opcode == Opcode::Halt {
        tracing::debug!("HALT decoded, fetch stopped");
        cpu.fetch_halted = true;
    }
}

/// EX: resolve a branch or jump; on a taken transfer
/// redirect the PC and squash Fetch and Decode
pub fn resolve(
    cpu: &mut CPUState,
    program: &Program,
    state: &mut PipelineState,
    inst: &Instruction,
) -> SimulatorResult<()> {
    if !is_enabled(cpu) {
        return Ok(());
    }

    let latch = &state.execute;
    let Some(target) =
        stages_simple::control_target(program, cpu, inst, latch.pc, latch.rs1_value)?
    else {
        return Ok(());
    };

    tracing::debug!("{} at pc({}) taken to pc({})", inst, latch.pc, target);

    if state.decode.inst.is_some() {
        cpu.history.flush_count += 1;
    }
    state.fetch = StageLatch::default();
    state.decode = StageLatch::default();
    cpu.pc = target;
    Ok(())
}
