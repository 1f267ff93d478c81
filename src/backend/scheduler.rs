// Copyright (c) 2024 Mudit Bhargava
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.
//

// scheduler.rs
//
// This file contains the scheduler: the single owner of every module and
// the fixed intra-cycle phase ordering. A value broadcast on the CDB in
// cycle N is observed by the ROB and by the reservation stations in cycle
// N+1; that invariant falls out of running commit first and CDB arbitration
// last.

use std::path::PathBuf;

use log::{info, warn};

use crate::backend::arith_unit::ArithUnit;
use crate::backend::branch_unit::BranchUnit;
use crate::backend::cdb::{CdbSource, CommonDataBus};
use crate::backend::commit::{CommitRecord, CommitUnit};
use crate::backend::config::BackendConfig;
use crate::backend::dispatcher::Dispatcher;
use crate::backend::dmem::DataMemory;
use crate::backend::lsu::LoadStoreUnit;
use crate::backend::rf::RegisterFile;
use crate::backend::stats::SimStats;
use crate::errors::SimulatorError;
use crate::frontend::iq::InstrQueue;
use crate::utils::dump::DumpSink;

pub const COMMIT_HISTORY_DUMP: &str = "commit.log";
pub const ROB_DUMP: &str = "rob.log";
pub const MEM_DUMP: &str = "memory.log";

/// Everything the simulation needs to start.
pub struct SimOptions {
    pub trace_path: PathBuf,
    pub mem_path: PathBuf,
    pub mem_dump: bool,
    pub commit_history_dump: bool,
    pub rob_dump: bool,
    pub max_cycles: u64,
    pub config: BackendConfig,
}

impl SimOptions {
    pub fn new<P: Into<PathBuf>>(trace_path: P, mem_path: P) -> Self {
        Self {
            trace_path: trace_path.into(),
            mem_path: mem_path.into(),
            mem_dump: false,
            commit_history_dump: false,
            rob_dump: false,
            max_cycles: 100_000,
            config: BackendConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Running,
    /// Front-end, dispatch buffer, and ROB are all empty.
    Drained,
}

pub struct Scheduler {
    iq: InstrQueue,
    dispatcher: Dispatcher,
    arith_unit: ArithUnit,
    branch_unit: BranchUnit,
    lsu: LoadStoreUnit,
    dmem: DataMemory,
    cdb: CommonDataBus,
    commit_unit: CommitUnit,
    rf: RegisterFile,
    stats: SimStats,
    cycle: u64,
    max_cycles: u64,
    commit_history_dump: bool,
    rob_sink: Option<DumpSink>,
    mem_sink: Option<DumpSink>,
}

impl Scheduler {
    pub fn new(opts: SimOptions) -> Result<Self, SimulatorError> {
        let iq = InstrQueue::from_file(&opts.trace_path)?;

        let mut dmem = DataMemory::new(&opts.config.dmem);
        dmem.load_image(&opts.mem_path)?;

        let config = &opts.config;
        Ok(Self {
            iq,
            dispatcher: Dispatcher::new(config.issue_width),
            arith_unit: ArithUnit::new(
                config.arith_unit.n_entries,
                config.arith_unit.latency,
                config.arith_unit.iterative,
                config.pick_policy.clone(),
            ),
            branch_unit: BranchUnit::new(
                config.branch_unit.n_entries,
                config.branch_unit.latency,
                config.branch_unit.iterative,
                config.pick_policy.clone(),
            ),
            lsu: LoadStoreUnit::new(config),
            dmem,
            cdb: CommonDataBus::new(),
            commit_unit: CommitUnit::new(config),
            rf: RegisterFile::new(),
            stats: SimStats::default(),
            cycle: 0,
            max_cycles: opts.max_cycles,
            commit_history_dump: opts.commit_history_dump,
            rob_sink: if opts.rob_dump {
                Some(DumpSink::create(ROB_DUMP)?)
            } else {
                None
            },
            mem_sink: if opts.mem_dump {
                Some(DumpSink::create(MEM_DUMP)?)
            } else {
                None
            },
        })
    }

    /// One clock cycle across every module, in the fixed phase order:
    /// commit, arithmetic, branch, LSU, dispatch, CDB arbitration.
    pub fn step(&mut self) -> Result<StepOutcome, SimulatorError> {
        // Phase 1: commit ingests last cycle's broadcast and drains to the RF.
        let broadcast = self
            .commit_unit
            .step(&mut self.cdb, &mut self.rf, self.cycle)?;

        // The packet the commit unit just consumed is visible to the
        // reservation stations this same cycle.
        if let Some(packet) = &broadcast {
            self.arith_unit.update_from_cdb(packet.rob_idx, packet.res_value);
            self.branch_unit.update_from_cdb(packet.rob_idx, packet.res_value);
            self.lsu.update_from_cdb(packet.rob_idx, packet.res_value);
        }

        // Phases 2-3: integer and branch units.
        self.arith_unit.step()?;
        self.branch_unit.step()?;

        // Phase 4: memory subsystem, gated on the current ROB head.
        self.lsu.step(&mut self.dmem, self.commit_unit.rob.head)?;

        // Phase 5: dispatch.
        self.dispatcher.step(
            &mut self.iq,
            &mut self.commit_unit,
            &self.rf,
            &self.cdb,
            &mut self.arith_unit,
            &mut self.branch_unit,
            &mut self.lsu,
        )?;

        // Phase 6: CDB arbitration in registration order.
        self.cdb.arbitrate(&mut [
            &mut self.arith_unit as &mut dyn CdbSource,
            &mut self.lsu.load_unit,
            &mut self.lsu.store_unit,
            &mut self.branch_unit,
        ]);
        if !self.cdb.is_empty() {
            self.stats.cdb_broadcasts += 1;
        }

        self.dump_cycle()?;

        self.cycle += 1;
        self.sync_stats();

        if self.is_drained() {
            Ok(StepOutcome::Drained)
        } else {
            Ok(StepOutcome::Running)
        }
    }

    /// Run until the drain predicate holds or max_cycles elapse.
    pub fn run(&mut self) -> Result<StepOutcome, SimulatorError> {
        while self.cycle < self.max_cycles {
            if self.step()? == StepOutcome::Drained {
                info!("Simulation drained after {} cycles", self.cycle);
                self.finish()?;
                return Ok(StepOutcome::Drained);
            }
        }

        warn!("Reached max cycles ({}) before drain", self.max_cycles);
        self.finish()?;
        Ok(StepOutcome::Running)
    }

    fn is_drained(&self) -> bool {
        self.iq.is_empty() && self.dispatcher.is_empty() && self.commit_unit.is_empty()
    }

    fn dump_cycle(&mut self) -> Result<(), SimulatorError> {
        if let Some(sink) = self.rob_sink.as_mut() {
            sink.write_cycle(self.cycle, &self.commit_unit.rob.to_string())?;
        }
        if let Some(sink) = self.mem_sink.as_mut() {
            sink.write_cycle(self.cycle, &self.dmem.to_string())?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SimulatorError> {
        if self.commit_history_dump {
            let mut sink = DumpSink::create(COMMIT_HISTORY_DUMP)?;
            let mut content = String::new();
            for record in self.commit_unit.commit_history() {
                content.push_str(&record.to_string());
                content.push('\n');
            }
            sink.write_raw(&content)?;
        }
        Ok(())
    }

    fn sync_stats(&mut self) {
        self.stats.cycles = self.cycle;
        self.stats.instructions_dispatched = self.dispatcher.dispatched;
        self.stats.instructions_committed = self.commit_unit.committed;
        self.stats.dmem_hits = self.dmem.hits;
        self.stats.dmem_misses = self.dmem.misses;
        self.stats.dmem_transactions = self.dmem.hits + self.dmem.misses;
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn register_file(&self) -> &RegisterFile {
        &self.rf
    }

    pub fn data_memory(&self) -> &DataMemory {
        &self.dmem
    }

    pub fn commit_history(&self) -> &[CommitRecord] {
        self.commit_unit.commit_history()
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }
}
