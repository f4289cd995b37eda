//! APEX CPU architectural state

use crate::instruction::RegisterIndex;
use crate::instruction::NUM_REGISTERS;
use crate::program::CODE_BASE;
use crate::scoreboard::Scoreboard;

/// CPU state
#[derive(Clone, Copy, Debug)]
pub struct CPUState {
    /// Program counter
    pub pc: u32,
    /// General purpose registers
    pub gpr: [Register; NUM_REGISTERS],
    /// Outstanding register writes
    pub scoreboard: Scoreboard,
    /// Set by the last ADD/SUB/MUL whose result was zero
    pub zero_flag: bool,
    /// A HALT has been decoded; nothing more is fetched
    pub fetch_halted: bool,

    /// CPU policy
    pub policy: CPUPolicy,

    /// History of execution
    pub history: CPUHistory,
}

impl CPUState {
    pub fn make(policy: CPUPolicy) -> Self {
        Self {
            pc: CODE_BASE,
            gpr: [Register::new(0); NUM_REGISTERS],
            scoreboard: Scoreboard::default(),
            zero_flag: false,
            fetch_halted: false,
            policy,
            history: CPUHistory::default(),
        }
    }

    /// Reads a general purpose register
    pub fn read(&self, register: RegisterIndex) -> i32 {
        self.gpr[register.index()].read()
    }

    /// Writes a general purpose register
    pub fn write(&mut self, register: RegisterIndex, value: i32) {
        self.gpr[register.index()].write(value);
    }

    /// Snapshot of the register file
    pub fn registers(&self) -> [i32; NUM_REGISTERS] {
        self.gpr.map(|r| r.read())
    }

    /// Increments history cycle count
    pub fn update_cycle_count(&mut self, value: u64) {
        self.history.cycle_count += value;
    }

    /// Increments history instruction count
    pub fn update_inst_count(&mut self, value: u64) {
        self.history.inst_count += value;
    }
}

/// Register file simulation
#[derive(Clone, Copy, Debug)]
pub struct Register {
    /// Current data in the register
    data: i32,
}

impl Register {
    pub fn new(data: i32) -> Self {
        Self { data }
    }

    /// Reads the register
    pub fn read(&self) -> i32 {
        self.data
    }

    /// Writes to register
    pub fn write(&mut self, value: i32) {
        self.data = value;
    }
}

/// Implementation enum
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Implementation {
    SingleCycle,
    #[default]
    Pipelined,
}

/// Whether BZ, BNZ, JUMP and HALT redirect execution or pass through as no-ops
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum ControlFlow {
    #[default]
    Disabled,
    Enabled,
}

/// CPU policy
#[derive(Clone, Copy, Debug, Default)]
pub struct CPUPolicy {
    pub implementation: Implementation,
    pub history: bool,
    pub control_flow: ControlFlow,
    /// Abort with an error after this many cycles
    pub max_cycles: Option<u64>,
}

/// History module
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CPUHistory {
    pub cycle_count: u64,
    /// Retired instructions
    pub inst_count: u64,
    /// Cycles Decode spent waiting on the scoreboard
    pub data_stall_count: u64,
    /// Cycles Decode spent behind a busy Execute
    pub structural_stall_count: u64,
    /// Instructions discarded by taken control transfers
    pub flush_count: u64,
}
