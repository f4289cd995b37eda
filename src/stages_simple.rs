//! Primitive implementation of the stage operations,
//! shared by the single-cycle and pipelined implementations

use crate::alu::alu;
use crate::cpu::CPUState;
use crate::instruction::Instruction;
use crate::instruction::Opcode;
use crate::memory::DataMemory;
use crate::program::Program;
use crate::error::ExecutionError;
use crate::error::SimulatorResult;

/// ID: Register read
pub fn register_read(inst: &Instruction, cpu: &CPUState) -> (i32, i32) {
    let rs1 = inst.attributes.rs1.map_or(0, |r| cpu.read(r));
    let rs2 = inst.attributes.rs2.map_or(0, |r| cpu.read(r));
    (rs1, rs2)
}

/// EX: Compute the result, or the effective address for memory ops
pub fn execute(cpu: &mut CPUState, inst: &Instruction, op1: i32, op2: i32) -> i32 {
    if let Some(alu_op) = inst.controls.alu_op {
        let result = alu(alu_op, op1, op2);
        if alu_op.sets_zero_flag() {
            cpu.zero_flag = result == 0;
        }
        return result;
    }

    match inst.opcode {
        Opcode::Movc => inst.imm(),
        Opcode::Load => op1.wrapping_add(inst.imm()),
        Opcode::Store => op2.wrapping_add(inst.imm()),
        _ => 0,
    }
}

/// MEM: Access memory; returns the value headed for write-back
pub fn memory_access(
    inst: &Instruction,
    mem: &mut DataMemory,
    exec_result: i32,
    store_value: i32,
) -> SimulatorResult<i32> {
    if inst.controls.mem_read {
        mem.load(exec_result)
    } else {
        if inst.controls.mem_write {
            mem.store(exec_result, store_value)?;
        }
        Ok(exec_result)
    }
}

/// WB: Write stuff back to the selected register
pub fn write_back(inst: &Instruction, cpu: &mut CPUState, wb_result: i32) {
    if let Some(rd) = inst.dest() {
        cpu.write(rd, wb_result);
    }
}

/// EX: Resolve a control transfer.
/// Returns the new PC when the transfer is taken
pub fn control_target(
    program: &Program,
    cpu: &CPUState,
    inst: &Instruction,
    pc: u32,
    op1: i32,
) -> SimulatorResult<Option<u32>> {
    let target = match inst.opcode {
        Opcode::Bz if cpu.zero_flag => i64::from(pc) + i64::from(inst.imm()),
        Opcode::Bnz if !cpu.zero_flag => i64::from(pc) + i64::from(inst.imm()),
        Opcode::Jump => i64::from(op1) + i64::from(inst.imm()),
        _ => return Ok(None),
    };

    if !program.is_valid_target(target) {
        return Err(ExecutionError::InvalidBranchTarget { pc, target }.into());
    }
    // In range after the check above
    Ok(Some(target as u32))
}
