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

// commit.rs
//
// This file contains the commit unit: the owner of the reorder buffer and
// of the small commit queue between the ROB head and the register-file
// write port. Results enter through the CDB, percolate to the head in
// program order, and drain into the RF one per cycle.

use std::collections::VecDeque;
use std::fmt;

use log::debug;

use crate::backend::cdb::{CdbPacket, CommonDataBus};
use crate::backend::config::BackendConfig;
use crate::backend::rf::RegisterFile;
use crate::backend::rob::{ProducerHit, ReorderBuffer, ROBEntry};
use crate::errors::SimulatorError;
use crate::isa::instruction::Instruction;

/// One architecturally completed instruction, for the commit-history dump.
#[derive(Debug, Clone)]
pub struct CommitRecord {
    pub cycle: u64,
    pub pc: u32,
    pub mnemonic: String,
    pub rd_idx: i32,
    pub res_value: u32,
    pub branch_taken: Option<bool>,
    pub branch_target: Option<u32>,
}

impl fmt::Display for CommitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:08x}: {:<30} rd={:<3} value=0x{:08x}",
            self.pc, self.mnemonic, self.rd_idx, self.res_value
        )?;
        if let (Some(taken), Some(target)) = (self.branch_taken, self.branch_target) {
            write!(f, " taken={} target=0x{:08x}", taken, target)?;
        }
        Ok(())
    }
}

pub struct CommitUnit {
    pub rob: ReorderBuffer,
    commit_queue: VecDeque<ROBEntry>,
    queue_depth: usize,
    history: Vec<CommitRecord>,
    pub committed: u64,
}

impl CommitUnit {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            rob: ReorderBuffer::new(config.rob_size),
            commit_queue: VecDeque::with_capacity(config.commit_queue_depth),
            queue_depth: config.commit_queue_depth,
            history: Vec::new(),
            committed: 0,
        }
    }

    /// One clock cycle, in order:
    /// 1. drain the CDB into the ROB,
    /// 2. drain at most one commit-queue entry into the RF,
    /// 3. stall if the queue was full before the drain,
    /// 4. promote a committable ROB head into the queue,
    /// (free ROB slots are advertised through `free_slots`).
    ///
    /// Returns the drained CDB packet so the scheduler can broadcast it to
    /// the reservation stations within the same cycle.
    pub fn step(
        &mut self,
        cdb: &mut CommonDataBus,
        rf: &mut RegisterFile,
        cycle: u64,
    ) -> Result<Option<CdbPacket>, SimulatorError> {
        // Step 1
        let packet = cdb.get();
        if let Some(pkt) = &packet {
            self.rob.update(pkt.rob_idx, pkt.rd_idx, pkt.res_value)?;
            if let Some(outcome) = pkt.branch {
                self.rob.record_branch(pkt.rob_idx, outcome);
            }
        }

        // Step 2
        let queue_was_full = self.commit_queue.len() >= self.queue_depth;
        if let Some(entry) = self.commit_queue.pop_front() {
            if entry.valid && entry.rd_idx >= 0 {
                rf.write(entry.rd_idx as u32, entry.res_value);
            }
            debug!("Committing {}", entry);
            self.record(&entry, cycle);
        }

        // Step 3
        if queue_was_full {
            return Ok(packet);
        }

        // Step 4
        if self.rob.can_commit() {
            if let Some(entry) = self.rob.pop() {
                self.commit_queue.push_back(entry);
            }
        }

        Ok(packet)
    }

    fn record(&mut self, entry: &ROBEntry, cycle: u64) {
        let mnemonic = entry
            .instruction
            .as_ref()
            .map(|instr: &Instruction| instr.mnemonic.clone())
            .unwrap_or_default();
        self.history.push(CommitRecord {
            cycle,
            pc: entry.instr_pc,
            mnemonic,
            rd_idx: entry.rd_idx,
            res_value: entry.res_value,
            branch_taken: entry.branch_taken,
            branch_target: entry.branch_target,
        });
        self.committed += 1;
    }

    /// Closest-in-order producer of architectural register `rs_idx`: the ROB
    /// is consulted newest-first, then the commit queue (whose entries are
    /// older than anything still in the ROB).
    pub fn search_operand(&self, rs_idx: u32, requester_pc: u32) -> Option<ProducerHit> {
        if let Some(hit) = self.rob.search_operand(rs_idx, requester_pc) {
            return Some(hit);
        }

        self.commit_queue
            .iter()
            .rev()
            .find(|entry| entry.valid && entry.rd_idx == rs_idx as i32)
            .map(|entry| ProducerHit::Ready(entry.res_value))
    }

    pub fn free_slots(&self) -> usize {
        self.rob.free_slots()
    }

    pub fn is_empty(&self) -> bool {
        self.rob.is_empty() && self.commit_queue.is_empty()
    }

    pub fn commit_history(&self) -> &[CommitRecord] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::decode::decode_fields;

    fn addi(pc: u32, rd: u32, imm: u32) -> Instruction {
        let raw = (imm << 20) | (rd << 7) | 0b0010011;
        decode_fields(pc, raw, "addi").unwrap()
    }

    fn unit() -> CommitUnit {
        CommitUnit::new(&BackendConfig::default())
    }

    #[test]
    fn test_result_percolates_to_rf() {
        let mut commit = unit();
        let mut cdb = CommonDataBus::new();
        let mut rf = RegisterFile::new();

        let rob_idx = commit.rob.push(&addi(0, 1, 5)).unwrap();
        commit.rob.update(rob_idx, 1, 5).unwrap();

        // Cycle 1 promotes the head into the queue, cycle 2 writes the RF.
        commit.step(&mut cdb, &mut rf, 1).unwrap();
        assert_eq!(rf.read(1), 0);
        commit.step(&mut cdb, &mut rf, 2).unwrap();
        assert_eq!(rf.read(1), 5);
        assert!(commit.is_empty());
        assert_eq!(commit.commit_history().len(), 1);
    }

    #[test]
    fn test_invalid_entry_skips_rf_write() {
        let mut commit = unit();
        let mut cdb = CommonDataBus::new();
        let mut rf = RegisterFile::new();

        let sw = decode_fields(0, 0x0020_A423, "sw x2, 8(x1)").unwrap();
        let rob_idx = commit.rob.push(&sw).unwrap();
        commit.rob.update(rob_idx, -1, 0).unwrap();

        commit.step(&mut cdb, &mut rf, 1).unwrap();
        commit.step(&mut cdb, &mut rf, 2).unwrap();
        assert!(rf.data.iter().all(|&value| value == 0));
        // Still observed in the commit history.
        assert_eq!(commit.commit_history().len(), 1);
    }

    #[test]
    fn test_full_queue_stalls_head_promotion() {
        let mut commit = CommitUnit::new(&BackendConfig::default().with_commit_queue_depth(1));
        let mut cdb = CommonDataBus::new();
        let mut rf = RegisterFile::new();

        for i in 0..3 {
            let rob_idx = commit.rob.push(&addi(i * 4, 1 + i, 5)).unwrap();
            commit.rob.update(rob_idx, (1 + i) as i32, 5).unwrap();
        }

        // Cycle 1: queue empty, head promoted.
        commit.step(&mut cdb, &mut rf, 1).unwrap();
        assert_eq!(commit.rob.count, 2);
        // Cycle 2: queue was full at entry, so the drain happens but no new
        // promotion does.
        commit.step(&mut cdb, &mut rf, 2).unwrap();
        assert_eq!(commit.rob.count, 2);
        assert_eq!(rf.read(1), 5);
    }

    #[test]
    fn test_search_prefers_rob_over_queue() {
        let mut commit = unit();
        let mut cdb = CommonDataBus::new();
        let mut rf = RegisterFile::new();

        let first = commit.rob.push(&addi(0, 1, 5)).unwrap();
        commit.rob.update(first, 1, 5).unwrap();
        commit.step(&mut cdb, &mut rf, 1).unwrap();
        // The old producer of x1 now sits in the commit queue.
        assert_eq!(commit.search_operand(1, 8), Some(ProducerHit::Ready(5)));

        let second = commit.rob.push(&addi(4, 1, 9)).unwrap();
        assert_eq!(
            commit.search_operand(1, 8),
            Some(ProducerHit::InFlight(second))
        );
    }

    #[test]
    fn test_cdb_drain_updates_rob() {
        let mut commit = unit();
        let mut cdb = CommonDataBus::new();
        let mut rf = RegisterFile::new();

        let rob_idx = commit.rob.push(&addi(0, 1, 5)).unwrap();

        struct One(Option<CdbPacket>);
        impl crate::backend::cdb::CdbSource for One {
            fn has_result(&self) -> bool {
                self.0.is_some()
            }
            fn take_result(&mut self) -> Option<CdbPacket> {
                self.0.take()
            }
        }
        let mut unit = One(Some(CdbPacket {
            rd_idx: 1,
            res_value: 5,
            rob_idx,
            valid: true,
            branch: None,
        }));
        cdb.arbitrate(&mut [&mut unit]);

        let drained = commit.step(&mut cdb, &mut rf, 1).unwrap();
        assert!(drained.is_some());
        assert!(commit.rob.can_commit());
    }
}
