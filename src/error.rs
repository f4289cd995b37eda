use std::path::PathBuf;

use thiserror::Error;

use crate::instruction::Opcode;

/// Top-level error type for the simulator
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("Failed to load program: {0}")]
    ProgramError(#[from] ProgramError),

    #[error("CPU execution error: {0}")]
    ExecutionError(#[from] ExecutionError),

    #[error("Memory error: {0}")]
    MemoryError(#[from] MemoryError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Trace output error: {0}")]
    TraceError(#[from] csv::Error),
}

/// Errors related to malformed programs
#[derive(Error, Debug)]
pub enum ProgramError {
    #[error("Failed to read program file '{0}': {1}")]
    FileReadError(PathBuf, #[source] std::io::Error),

    #[error("Line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("Line {line}: unknown opcode '{mnemonic}'")]
    UnknownOpcode { line: usize, mnemonic: String },

    #[error("Register index out of range: R{0}")]
    InvalidRegister(i64),

    #[error("{opcode} requires operand {operand}")]
    MissingOperand { opcode: Opcode, operand: &'static str },
}

/// Errors related to CPU execution
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Scoreboard released R{register} with no write pending")]
    ScoreboardUnderflow { register: usize },

    #[error("Execution limit reached: {0} cycles")]
    ExecutionLimitReached(u64),

    #[error("Invalid control transfer at PC={pc}: target {target}")]
    InvalidBranchTarget { pc: u32, target: i64 },
}

/// Errors related to memory operations
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Memory access error at address {address}: {kind}")]
    AccessError { address: i64, kind: MemoryErrorKind },
}

/// Specific kinds of memory errors
#[derive(Error, Debug, PartialEq)]
pub enum MemoryErrorKind {
    #[error("Attempted to access memory outside addressable range")]
    OutOfBounds,
}

/// Type alias for Result with SimulatorError
pub type SimulatorResult<T> = Result<T, SimulatorError>;
