//! Single cycle implementation

use crate::cpu::CPUState;
use crate::cpu::ControlFlow;
use crate::error::ExecutionError;
use crate::error::SimulatorResult;
use crate::instruction::Opcode;
use crate::memory::DataMemory;
use crate::program::Program;
use crate::program::INSTRUCTION_SIZE;
use crate::stages_simple::*;

/// Runs `program` one instruction per cycle, without hazards.
/// Reference semantics for the pipelined implementation
pub fn run(cpu: &mut CPUState, mem: &mut DataMemory, program: &Program) -> SimulatorResult<()> {
    let control_flow = cpu.policy.control_flow == ControlFlow::Enabled;

    while !cpu.fetch_halted {
        let pc = cpu.pc;
        // IF
        let Some(&inst) = program.fetch(pc) else {
            break;
        };

        if let Some(limit) = cpu.policy.max_cycles {
            if cpu.history.cycle_count >= limit {
                return Err(ExecutionError::ExecutionLimitReached(limit).into());
            }
        }
        cpu.update_cycle_count(1);
        cpu.pc = pc + INSTRUCTION_SIZE;

        tracing::trace!("pc({}) {}", pc, inst);

        // ID
        let (rs1, rs2) = register_read(&inst, cpu);
        // EX
        let exec_result = execute(cpu, &inst, rs1, rs2);
        // MEM
        let wb_result = memory_access(&inst, mem, exec_result, rs1)?;
        // WB
        write_back(&inst, cpu, wb_result);
        cpu.update_inst_count(1);

        if !control_flow {
            continue;
        }
        if inst.opcode == Opcode::Halt {
            cpu.fetch_halted = true;
        } else if let Some(target) = control_target(program, cpu, &inst, pc, rs1)? {
            tracing::debug!("{} at pc({}) taken to pc({})", inst, pc, target);
            cpu.pc = target;
        }
    }

    tracing::info!(
        "Simulation complete: {} instructions retired in {} cycles",
        cpu.history.inst_count,
        cpu.history.cycle_count
    );
    Ok(())
}
