//! A simulator wrapper

use std::path::Path;

use crate::cpu::CPUHistory;
use crate::cpu::CPUPolicy;
use crate::cpu::CPUState;
use crate::cpu::Implementation;
use crate::error::SimulatorResult;
use crate::instruction::NUM_REGISTERS;
use crate::loader;
use crate::memory::DataMemory;
use crate::pipelined::pipeline::StageSnapshot;
use crate::pipelined::Pipeline;
use crate::program::Program;
use crate::single_cycle;
use crate::trace::CycleTraceWriter;

/// Final architectural state of a run
#[derive(Clone, Debug)]
pub struct RunReport {
    pub registers: [i32; NUM_REGISTERS],
    pub history: CPUHistory,
    pub memory: DataMemory,
}

impl RunReport {
    fn new(cpu: &CPUState, memory: DataMemory) -> Self {
        Self { registers: cpu.registers(), history: cpu.history, memory }
    }

    /// Cycles per retired instruction
    pub fn cpi(&self) -> f64 {
        if self.history.inst_count == 0 {
            return 0.0;
        }
        self.history.cycle_count as f64 / self.history.inst_count as f64
    }

    pub fn print_history(&self) {
        let h = &self.history;
        eprintln!("[HISTORY] # cycles = {}, # instructions = {}", h.cycle_count, h.inst_count);
        eprintln!("[HISTORY] CPI = {:.2}", self.cpi());
        eprintln!(
            "[HISTORY] data stalls = {}, structural stalls = {}, flushes = {}",
            h.data_stall_count, h.structural_stall_count, h.flush_count
        );
    }
}

/// Run simulation on the given program file,
/// optionally recording every cycle to a CSV trace
pub fn run(path: &Path, policy: CPUPolicy, trace: Option<&Path>) -> SimulatorResult<RunReport> {
    let program = loader::load_program(path)?;

    let report = match trace {
        Some(trace_path) => {
            let mut writer = CycleTraceWriter::create(trace_path)?;
            let report = run_program(&program, policy, |cycle, snapshots| {
                writer.write_cycle(cycle, snapshots)
            })?;
            writer.into_inner()?;
            report
        }
        None => run_program(&program, policy, |_, _| Ok(()))?,
    };

    if policy.history {
        report.print_history();
    }
    Ok(report)
}

/// Run simulation on a loaded program.
/// `observer` sees every pipeline cycle; the single-cycle backend has none
pub fn run_program<F>(program: &Program, policy: CPUPolicy, observer: F) -> SimulatorResult<RunReport>
where
    F: FnMut(u64, &[StageSnapshot; 5]) -> SimulatorResult<()>,
{
    match policy.implementation {
        Implementation::SingleCycle => {
            let mut cpu = CPUState::make(policy);
            let mut mem = DataMemory::make();
            single_cycle::run(&mut cpu, &mut mem, program)?;
            Ok(RunReport::new(&cpu, mem))
        }
        Implementation::Pipelined => {
            let mut pipe = Pipeline::new(program, CPUState::make(policy), DataMemory::make());
            pipe.run_with(observer)?;
            let (cpu, mem) = pipe.into_parts();
            Ok(RunReport::new(&cpu, mem))
        }
    }
}
