//! Per-cycle pipeline trace: console lines and CSV records

use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::SimulatorResult;
use crate::pipelined::pipeline::StageSnapshot;

impl fmt::Display for StageSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inst {
            Some(inst) => write!(
                f,
                "{:<15}: pc({}) {} stalled: {}, busy: {}",
                self.stage.name(),
                self.pc,
                inst,
                u8::from(self.stalled),
                u8::from(self.busy)
            ),
            None => write!(f, "{:<15}: EMPTY", self.stage.name()),
        }
    }
}

/// Writes one CSV record per stage per cycle
pub struct CycleTraceWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl CycleTraceWriter<File> {
    pub fn create(path: &Path) -> SimulatorResult<Self> {
        let writer = csv::Writer::from_path(path)?;
        tracing::info!("Writing cycle trace to {}", path.display());
        Self::with_header(writer)
    }
}

impl<W: Write> CycleTraceWriter<W> {
    pub fn from_writer(inner: W) -> SimulatorResult<Self> {
        Self::with_header(csv::Writer::from_writer(inner))
    }

    fn with_header(mut writer: csv::Writer<W>) -> SimulatorResult<Self> {
        writer.write_record(["cycle", "stage", "pc", "instruction", "stalled", "busy"])?;
        Ok(Self { writer })
    }

    pub fn write_cycle(&mut self, cycle: u64, snapshots: &[StageSnapshot]) -> SimulatorResult<()> {
        for snapshot in snapshots {
            let (pc, inst) = match snapshot.inst {
                Some(inst) => (snapshot.pc.to_string(), inst.to_string()),
                None => (String::new(), String::new()),
            };
            self.writer.write_record([
                cycle.to_string(),
                snapshot.stage.name().to_string(),
                pc,
                inst,
                snapshot.stalled.to_string(),
                snapshot.busy.to_string(),
            ])?;
        }
        Ok(())
    }

    /// Flushes and returns the underlying writer
    pub fn into_inner(self) -> SimulatorResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| e.into_error().into())
    }
}
