//! Decoding helper functions.

use super::Attributes;
use super::Controls;
use super::Format;
use super::Instruction;
use super::Opcode;
use crate::alu::ALUOp;
use crate::error::ProgramError;
use crate::error::SimulatorResult;

/// Determines the operand layout of an opcode
pub fn opcode_to_format(opcode: Opcode) -> Format {
    use Opcode::*;
    match opcode {
        Movc => Format::RI,
        Add | Sub | Mul | And | Or | Xor => Format::R,
        Load => Format::I,
        Store => Format::S,
        Bz | Bnz => Format::B,
        Jump => Format::J,
        Halt => Format::Sys,
    }
}

/// Determines the control signals of an opcode
pub fn opcode_to_controls(opcode: Opcode) -> Controls {
    use Opcode::*;
    let mut controls = Controls::default();
    match opcode {
        Movc => controls.reg_write = true,
        Add | Sub | Mul | And | Or | Xor => {
            controls.reg_write = true;
            controls.alu_op = Some(match opcode {
                Add => ALUOp::ADD,
                Sub => ALUOp::SUB,
                Mul => ALUOp::MUL,
                And => ALUOp::AND,
                Or => ALUOp::OR,
                _ => ALUOp::XOR,
            });
            controls.multi_cycle = opcode == Mul;
        }
        Load => {
            controls.reg_write = true;
            controls.mem_read = true;
        }
        Store => controls.mem_write = true,
        Bz | Bnz | Jump | Halt => controls.control = true,
    }
    controls
}

/// Validates the operands required by the format and
/// clears every field the format does not use
pub fn parse(inst: &mut Instruction) -> SimulatorResult<()> {
    let (rd, rs1, rs2, imm) = match inst.format {
        Format::RI => (true, false, false, true),
        Format::R => (true, true, true, false),
        Format::I => (true, true, false, true),
        Format::S => (false, true, true, true),
        Format::B => (false, false, false, true),
        Format::J => (false, true, false, true),
        Format::Sys => (false, false, false, false),
    };

    let opcode = inst.opcode;
    let a = inst.attributes;
    let missing = |operand| ProgramError::MissingOperand { opcode, operand };

    if rd && a.rd.is_none() {
        return Err(missing("rd").into());
    }
    if rs1 && a.rs1.is_none() {
        return Err(missing("rs1").into());
    }
    if rs2 && a.rs2.is_none() {
        return Err(missing("rs2").into());
    }
    if imm && a.imm.is_none() {
        return Err(missing("imm").into());
    }

    inst.attributes = Attributes {
        rd: a.rd.filter(|_| rd),
        rs1: a.rs1.filter(|_| rs1),
        rs2: a.rs2.filter(|_| rs2),
        imm: a.imm.filter(|_| imm),
    };
    Ok(())
}
