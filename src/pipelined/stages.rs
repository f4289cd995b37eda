//! 5 stages adapted for pipelined execution.
//!
//! Each stage works on its own latch, then copies it into the next stage's
//! latch. The driver calls them tail first, so a copy made this cycle is
//! what the downstream stage sees next cycle. Every stage returns the view
//! of its latch as it processed it.

use super::control;
use super::pipeline::PipelineState;
use super::pipeline::Stage;
use super::pipeline::StageLatch;
use super::pipeline::StageSnapshot;
use crate::cpu::CPUState;
use crate::error::SimulatorResult;
use crate::memory::DataMemory;
use crate::program::Program;
use crate::program::INSTRUCTION_SIZE;
use crate::stages_simple;

/// IF stage
pub fn instruction_fetch(
    cpu: &mut CPUState,
    program: &Program,
    state: &mut PipelineState,
) -> StageSnapshot {
    if state.fetch.busy || state.fetch.stalled {
        return state.fetch.snapshot(Stage::Fetch);
    }

    // Past the end (or halted) the latch becomes a bubble,
    // which still has to displace the last instruction from Decode
    let next = if cpu.fetch_halted { None } else { program.fetch(cpu.pc) };
    state.fetch = match next {
        Some(inst) => StageLatch::new(cpu.pc, *inst),
        None => StageLatch::default(),
    };
    let snapshot = state.fetch.snapshot(Stage::Fetch);

    // Decode is holding its instruction: keep this one and retry next cycle
    if state.decode.stalled {
        return snapshot;
    }

    if state.fetch.inst.is_some() {
        cpu.pc += INSTRUCTION_SIZE;
    }
    state.decode = state.fetch;
    snapshot
}

/// ID/RF stage
pub fn instruction_decode(cpu: &mut CPUState, state: &mut PipelineState) -> StageSnapshot {
    // Execute is busy with a multiply: hold, and hand nothing forward
    if state.execute_occupied() {
        state.decode.stalled = true;
        if state.decode.inst.is_some() {
            cpu.history.structural_stall_count += 1;
        }
        return state.decode.snapshot(Stage::Decode);
    }

    state.decode.stalled = state.data_hazard(cpu);
    if state.decode.stalled {
        cpu.history.data_stall_count += 1;
    }

    if let Some(inst) = state.decode.live() {
        if control::reads_operands(cpu, &inst) && inst.sources().next().is_some() {
            let (rs1, rs2) = stages_simple::register_read(&inst, cpu);
            state.decode.rs1_value = rs1;
            state.decode.rs2_value = rs2;
        }
        control::decode(cpu, &inst);
    }

    let snapshot = state.decode.snapshot(Stage::Decode);
    // A stalled latch is re-offered every cycle; Execute sees it as a bubble
    state.execute = state.decode;
    snapshot
}

/// EX stage
pub fn execute(
    cpu: &mut CPUState,
    program: &Program,
    state: &mut PipelineState,
) -> SimulatorResult<StageSnapshot> {
    if state.execute_occupied() {
        // Second cycle of a multiply: hand it on and release the front end
        state.execute.busy = false;
        state.fetch.stalled = false;
        state.decode.stalled = false;
    } else if let Some(inst) = state.execute.live() {
        if inst.is_multi_cycle() {
            state.execute.busy = true;
            state.fetch.stalled = true;
            state.decode.stalled = true;
        }

        let latch = &mut state.execute;
        let result = stages_simple::execute(cpu, &inst, latch.rs1_value, latch.rs2_value);
        if inst.controls.mem_read || inst.controls.mem_write {
            latch.mem_address = result;
        } else {
            latch.buffer = result;
        }

        // Readers of rd hold in Decode until write-back releases it
        if let Some(rd) = inst.dest() {
            cpu.scoreboard.reserve(rd);
        }

        if inst.controls.control {
            control::resolve(cpu, program, state, &inst)?;
        }
    }

    // A stalled copy from Decode is a bubble; a busy multiply is shown
    let snapshot = if state.execute.stalled {
        StageSnapshot::empty(Stage::Execute)
    } else {
        state.execute.snapshot(Stage::Execute)
    };
    state.memory = state.execute;
    Ok(snapshot)
}

/// MEM stage
pub fn memory_access(
    mem: &mut DataMemory,
    state: &mut PipelineState,
) -> SimulatorResult<StageSnapshot> {
    if let Some(inst) = state.memory.live() {
        let latch = &mut state.memory;
        if inst.controls.mem_read || inst.controls.mem_write {
            let value =
                stages_simple::memory_access(&inst, mem, latch.mem_address, latch.rs1_value)?;
            if inst.controls.mem_read {
                latch.buffer = value;
            }
        }
    }

    let snapshot = state.memory.live_snapshot(Stage::Memory);
    state.write_back = state.memory;
    Ok(snapshot)
}

/// WB stage
pub fn write_back(cpu: &mut CPUState, state: &mut PipelineState) -> SimulatorResult<StageSnapshot> {
    let latch = &state.write_back;
    if let Some(inst) = latch.live() {
        stages_simple::write_back(&inst, cpu, latch.buffer);
        if let Some(rd) = inst.dest() {
            cpu.scoreboard.release(rd)?;
        }
        cpu.update_inst_count(1);
    }
    Ok(latch.live_snapshot(Stage::WriteBack))
}
