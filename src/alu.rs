//! ALU implementation

/// Performs an atomic ALU operation
/// Signed, wrapping arithmetic on the 32-bit datapath
pub fn alu(op: ALUOp, op1: i32, op2: i32) -> i32 {
    match op {
        ALUOp::ADD => op1.wrapping_add(op2),
        ALUOp::SUB => op1.wrapping_sub(op2),
        ALUOp::MUL => op1.wrapping_mul(op2),
        ALUOp::AND => op1 & op2,
        ALUOp::OR => op1 | op2,
        ALUOp::XOR => op1 ^ op2,
    }
}

/// Set of ALU operations needed for the APEX register-register ops
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ALUOp {
    // Arithmetic
    ADD,
    SUB,
    MUL,
    // Logical
    AND,
    OR,
    XOR,
}

impl ALUOp {
    /// Whether the result updates the zero flag
    pub fn sets_zero_flag(self) -> bool {
        matches!(self, ALUOp::ADD | ALUOp::SUB | ALUOp::MUL)
    }
}
