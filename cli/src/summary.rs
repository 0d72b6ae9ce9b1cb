//! The state of the machine at the end of a run, as dumped by
//! `--dump`.
use serde::Serialize;

use cpu::{Core, Cpu, Fault, FaultStatus, RegisterSnapshot, TickOutcome};

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub architecture: &'static str,
    pub outcome: &'static str,
    pub instructions: u64,
    pub cycles: u64,
    pub simulated_seconds: f64,
    pub registers: RegisterSnapshot,
    /// Only faults which have been raised are listed.
    pub faults: Vec<FaultStatus>,
    pub error: Option<String>,
}

pub fn outcome_name(result: &Result<TickOutcome, Fault>) -> &'static str {
    match result {
        Ok(TickOutcome::Continue) => "instruction-limit",
        Ok(TickOutcome::Halted) => "halted",
        Ok(TickOutcome::EndOfStream) => "end-of-stream",
        Ok(TickOutcome::Stopped) => "stopped",
        Err(_) => "fault",
    }
}

impl RunSummary {
    pub fn new<C: Core>(cpu: &Cpu<C>, result: &Result<TickOutcome, Fault>) -> RunSummary {
        RunSummary {
            architecture: cpu.description().name,
            outcome: outcome_name(result),
            instructions: cpu.instructions_executed(),
            cycles: cpu.clock().cycles(),
            simulated_seconds: cpu.elapsed().as_secs_f64(),
            registers: cpu.snapshot(),
            faults: cpu
                .faults()
                .get_fault_statuses()
                .into_iter()
                .filter(|status| status.active)
                .collect(),
            error: result.as_ref().err().map(|fault| fault.to_string()),
        }
    }
}
