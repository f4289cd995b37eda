//! Instruction representation

use std::fmt;

use crate::alu::ALUOp;
use crate::error::ProgramError;
use crate::error::SimulatorResult;

pub mod decode_helper;

/// Number of general purpose registers
pub const NUM_REGISTERS: usize = 16;

/// Decoded instruction, immutable once loaded
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instruction {
    /// Opcode
    pub opcode: Opcode,
    /// Operand layout
    pub format: Format,
    /// Operand fields
    pub attributes: Attributes,
    /// Control signals
    pub controls: Controls,
}

impl Instruction {
    /// Builds an instruction, rejecting missing operands and
    /// dropping the ones the opcode does not use
    pub fn new(opcode: Opcode, attributes: Attributes) -> SimulatorResult<Self> {
        let format = decode_helper::opcode_to_format(opcode);
        let controls = decode_helper::opcode_to_controls(opcode);

        let mut inst = Self { opcode, format, attributes, controls };

        decode_helper::parse(&mut inst)?;
        Ok(inst)
    }

    /// Destination register, present only for register-writing opcodes
    pub fn dest(&self) -> Option<RegisterIndex> {
        if self.controls.reg_write {
            self.attributes.rd
        } else {
            None
        }
    }

    /// Source registers read in Decode
    pub fn sources(&self) -> impl Iterator<Item = RegisterIndex> {
        [self.attributes.rs1, self.attributes.rs2].into_iter().flatten()
    }

    /// Immediate, zero when the opcode carries none
    pub fn imm(&self) -> i32 {
        self.attributes.imm.unwrap_or(0)
    }

    /// Whether Execute occupies more than one cycle
    pub fn is_multi_cycle(&self) -> bool {
        self.controls.multi_cycle
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = &self.attributes;
        let reg = |r: Option<RegisterIndex>| r.map(|r| r.to_string()).unwrap_or_default();
        write!(f, "{}", self.opcode)?;
        match self.format {
            Format::RI => write!(f, ",{},#{}", reg(a.rd), self.imm()),
            Format::R => write!(f, ",{},{},{}", reg(a.rd), reg(a.rs1), reg(a.rs2)),
            Format::I => write!(f, ",{},{},#{}", reg(a.rd), reg(a.rs1), self.imm()),
            Format::S => write!(f, ",{},{},#{}", reg(a.rs1), reg(a.rs2), self.imm()),
            Format::B => write!(f, ",#{}", self.imm()),
            Format::J => write!(f, ",{},#{}", reg(a.rs1), self.imm()),
            Format::Sys => Ok(()),
        }
    }
}

/// APEX opcode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    Movc,
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
    Load,
    Store,
    Bz,
    Bnz,
    Jump,
    Halt,
}

impl Opcode {
    pub const ALL: [Opcode; 13] = [
        Opcode::Movc,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::And,
        Opcode::Or,
        Opcode::Xor,
        Opcode::Load,
        Opcode::Store,
        Opcode::Bz,
        Opcode::Bnz,
        Opcode::Jump,
        Opcode::Halt,
    ];

    /// Listing mnemonic
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Movc => "MOVC",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Xor => "XOR",
            Opcode::Load => "LOAD",
            Opcode::Store => "STORE",
            Opcode::Bz => "BZ",
            Opcode::Bnz => "BNZ",
            Opcode::Jump => "JUMP",
            Opcode::Halt => "HALT",
        }
    }

    /// Case-insensitive lookup; `EX-OR` is the listing's other name for XOR
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        let s = s.to_uppercase();
        if s == "EX-OR" {
            return Some(Opcode::Xor);
        }
        Self::ALL.into_iter().find(|op| op.mnemonic() == s)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Operand layout in the listing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// rd, #imm
    RI,
    /// rd, rs1, rs2
    R,
    /// rd, rs1, #imm
    I,
    /// rs1, rs2, #imm
    S,
    /// #imm
    B,
    /// rs1, #imm
    J,
    /// no operands
    Sys,
}

/// Register index, always in [0, 16)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegisterIndex(u8);

impl RegisterIndex {
    pub fn new(index: i64) -> Result<Self, ProgramError> {
        if (0..NUM_REGISTERS as i64).contains(&index) {
            Ok(Self(index as u8))
        } else {
            Err(ProgramError::InvalidRegister(index))
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RegisterIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// Instruction attributes
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Attributes {
    pub rd: Option<RegisterIndex>,
    pub rs1: Option<RegisterIndex>,
    pub rs2: Option<RegisterIndex>,
    pub imm: Option<i32>,
}

/// Control signals
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Controls {
    pub reg_write: bool,
    pub mem_read: bool,
    pub mem_write: bool,
    /// Occupies Execute for two cycles
    pub multi_cycle: bool,
    /// BZ, BNZ, JUMP, HALT
    pub control: bool,
    pub alu_op: Option<ALUOp>,
}
