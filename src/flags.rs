use std::path::PathBuf;
use std::str::FromStr;

use crate::cpu::CPUPolicy;
use crate::cpu::ControlFlow;
use crate::cpu::Implementation;

xflags::xflags! {
    /// APEX five-stage in-order pipeline simulator.
    cmd ApexSimArgs {
        /// Path to the program listing to simulate.
        required program: PathBuf

        /// Enables history module, printing cycle, stall and flush counts after simulation.
        optional --history

        /// Specifies the simulator implementation.
        /// P: Pipelined (default)
        /// S: Naive single-cycle
        optional -i, --implementation backend: BackendArg

        /// Lets BZ, BNZ and JUMP redirect fetch and HALT stop it.
        /// Without it they pass through the pipeline as no-ops.
        optional --control-flow

        /// Aborts the simulation after this many cycles.
        optional --max-cycles cycles: u64

        /// Writes every stage of every cycle to a CSV file.
        optional --trace path: PathBuf

        /// Enables verbose mode, printing the pipeline contents every cycle.
        optional -v, --verbose
    }
}

#[derive(Debug, PartialEq)]
pub enum BackendArg {
    Pipelined,
    SingleCycle,
}

impl FromStr for BackendArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "P" => Ok(BackendArg::Pipelined),
            "S" => Ok(BackendArg::SingleCycle),
            _ => Err(format!("Invalid implementation: '{}'. Expected 'P' or 'S'.", s)),
        }
    }
}

impl From<BackendArg> for Implementation {
    fn from(val: BackendArg) -> Self {
        match val {
            BackendArg::Pipelined => Implementation::Pipelined,
            BackendArg::SingleCycle => Implementation::SingleCycle,
        }
    }
}

impl ApexSimArgs {
    pub fn policy(&self) -> CPUPolicy {
        CPUPolicy {
            implementation: match self.implementation {
                Some(BackendArg::SingleCycle) => Implementation::SingleCycle,
                _ => Implementation::Pipelined,
            },
            history: self.history,
            control_flow: if self.control_flow {
                ControlFlow::Enabled
            } else {
                ControlFlow::Disabled
            },
            max_cycles: self.max_cycles,
        }
    }
}
