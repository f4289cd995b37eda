//! Loads a program listing into the program store
//!
//! One instruction per line, comma separated: `MOVC,R1,#5`,
//! `ADD,R2,R1,R1`, `STORE,R1,R0,#100`, `BNZ,#-8`, `HALT`.
//! Text after `;` or `//` is ignored.

use std::fs;
use std::path::Path;

use text_io::try_read;

use crate::error::ProgramError;
use crate::error::SimulatorResult;
use crate::instruction::decode_helper::opcode_to_format;
use crate::instruction::Attributes;
use crate::instruction::Format;
use crate::instruction::Instruction;
use crate::instruction::Opcode;
use crate::instruction::RegisterIndex;
use crate::program::Program;

/// Reads and parses a program file
pub fn load_program(path: &Path) -> SimulatorResult<Program> {
    let source = fs::read_to_string(path)
        .map_err(|e| ProgramError::FileReadError(path.to_path_buf(), e))?;
    let program = parse_program(&source)?;

    tracing::info!("Loaded {} instructions from {}", program.len(), path.display());
    for (i, inst) in program.instructions().iter().enumerate() {
        tracing::debug!("pc({}) {}", Program::pc_of(i), inst);
    }
    Ok(program)
}

/// Parses a program listing
pub fn parse_program(source: &str) -> SimulatorResult<Program> {
    let mut instructions = Vec::new();
    for (line_num, line) in source.lines().enumerate() {
        if let Some(inst) = parse_line(line, line_num + 1)? {
            instructions.push(inst);
        }
    }
    Ok(Program::new(instructions))
}

/// Parses one line; `None` for blank and comment-only lines
fn parse_line(line: &str, line_num: usize) -> SimulatorResult<Option<Instruction>> {
    let code = line.split(';').next().unwrap_or_default();
    let code = code.split("//").next().unwrap_or_default();

    let mut tokens = code
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty());

    let Some(mnemonic) = tokens.next() else {
        return Ok(None);
    };
    let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| {
        ProgramError::UnknownOpcode { line: line_num, mnemonic: mnemonic.to_string() }
    })?;
    let operands: Vec<&str> = tokens.collect();

    let format = opcode_to_format(opcode);
    let expected = match format {
        Format::RI | Format::J => 2,
        Format::R | Format::I | Format::S => 3,
        Format::B => 1,
        Format::Sys => 0,
    };
    if operands.len() != expected {
        return Err(ProgramError::ParseError {
            line: line_num,
            message: format!(
                "{} expects {} operands, found {}",
                opcode,
                expected,
                operands.len()
            ),
        }
        .into());
    }

    let reg = |i: usize| parse_register(operands[i], line_num).map(Some);
    let imm = |i: usize| parse_immediate(operands[i], line_num).map(Some);

    let attributes = match format {
        Format::RI => Attributes { rd: reg(0)?, imm: imm(1)?, ..Default::default() },
        Format::R => Attributes { rd: reg(0)?, rs1: reg(1)?, rs2: reg(2)?, imm: None },
        Format::I => Attributes { rd: reg(0)?, rs1: reg(1)?, imm: imm(2)?, ..Default::default() },
        Format::S => Attributes { rs1: reg(0)?, rs2: reg(1)?, imm: imm(2)?, ..Default::default() },
        Format::B => Attributes { imm: imm(0)?, ..Default::default() },
        Format::J => Attributes { rs1: reg(0)?, imm: imm(1)?, ..Default::default() },
        Format::Sys => Attributes::default(),
    };

    Instruction::new(opcode, attributes).map(Some)
}

/// `R<n>`, n in [0, 16)
fn parse_register(token: &str, line_num: usize) -> Result<RegisterIndex, ProgramError> {
    let token = token.to_uppercase();
    let index: i64 = try_read!("R{}", token.bytes()).map_err(|_| ProgramError::ParseError {
        line: line_num,
        message: format!("expected a register, found '{}'", token),
    })?;
    RegisterIndex::new(index)
}

/// `#<n>`
fn parse_immediate(token: &str, line_num: usize) -> Result<i32, ProgramError> {
    let value: i32 = try_read!("#{}", token.bytes()).map_err(|_| ProgramError::ParseError {
        line: line_num,
        message: format!("expected an immediate, found '{}'", token),
    })?;
    Ok(value)
}
