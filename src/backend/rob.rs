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

// rob.rs
//
// This file contains the reorder buffer: a fixed-size circular buffer of
// in-flight instructions. Entries are allocated at the tail in program order
// and retired from the head, so walking head->tail always yields program
// order.

use std::fmt;

use crate::backend::cdb::BranchOutcome;
use crate::errors::SimulatorError;
use crate::isa::instruction::Instruction;

/// Result of an operand search: either the producer already has its value,
/// or it is still in flight and the requester must wait on its ROB index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProducerHit {
    Ready(u32),
    InFlight(usize),
}

#[derive(Debug, Clone)]
pub struct ROBEntry {
    pub instruction: Option<Instruction>,
    pub instr_pc: u32,
    pub res_ready: bool,
    pub res_value: u32,
    pub rd_idx: i32,
    pub mem_crit: bool,
    pub order_crit: bool,
    pub except_raised: bool,
    pub except_code: Option<u32>,
    pub branch_taken: Option<bool>,
    pub branch_target: Option<u32>,
    pub valid: bool,
}

impl Default for ROBEntry {
    fn default() -> Self {
        Self {
            instruction: None,
            instr_pc: 0,
            res_ready: false,
            res_value: 0,
            rd_idx: -1,
            mem_crit: false,
            order_crit: false,
            except_raised: false,
            except_code: None,
            branch_taken: None,
            branch_target: None,
            valid: false,
        }
    }
}

impl ROBEntry {
    pub fn from_instruction(instr: &Instruction) -> Self {
        Self {
            instr_pc: instr.pc,
            rd_idx: instr.dest_idx(),
            mem_crit: instr.is_mem_critical(),
            order_crit: instr.is_order_critical(),
            valid: true,
            instruction: Some(instr.clone()),
            ..Self::default()
        }
    }
}

impl fmt::Display for ROBEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self
            .instruction
            .as_ref()
            .map(|i| i.mnemonic.as_str())
            .unwrap_or("-");
        write!(
            f,
            "ROBEntry(instr={}, pc=0x{:08x}, res_ready={}, res_value=0x{:08x}, rd_idx={}, valid={})",
            mnemonic, self.instr_pc, self.res_ready, self.res_value, self.rd_idx, self.valid
        )
    }
}

/// Reorder buffer data structure.
pub struct ReorderBuffer {
    pub size: usize,
    entries: Vec<ROBEntry>,
    pub head: usize,
    pub tail: usize,
    pub count: usize,
}

impl ReorderBuffer {
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "ROB size must be positive");
        Self {
            size,
            entries: vec![ROBEntry::default(); size],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.size
    }

    pub fn free_slots(&self) -> usize {
        self.size - self.count
    }

    pub fn entry(&self, rob_idx: usize) -> &ROBEntry {
        &self.entries[rob_idx]
    }

    /// Allocate the tail slot for the instruction. Returns the assigned
    /// index, or None when the buffer is full (back-pressure, not an error).
    pub fn push(&mut self, instr: &Instruction) -> Option<usize> {
        if self.is_full() {
            return None;
        }

        self.entries[self.tail] = ROBEntry::from_instruction(instr);
        let rob_idx = self.tail;

        self.tail = (self.tail + 1) % self.size;
        self.count += 1;

        Some(rob_idx)
    }

    /// Record a result arriving from the CDB. Entries without an
    /// architectural destination are marked ready but invalidated so commit
    /// will not touch the register file.
    pub fn update(
        &mut self,
        rob_idx: usize,
        rd_idx: i32,
        res_value: u32,
    ) -> Result<(), SimulatorError> {
        if rob_idx >= self.size {
            return Err(SimulatorError::InvariantViolation(format!(
                "ROB update with out-of-range index {}",
                rob_idx
            )));
        }

        let entry = &mut self.entries[rob_idx];
        if entry.rd_idx == -1 {
            entry.res_ready = true;
            entry.res_value = 0;
            entry.valid = false;
            Ok(())
        } else if entry.rd_idx == rd_idx {
            entry.res_ready = true;
            entry.res_value = res_value;
            Ok(())
        } else {
            Err(SimulatorError::InvariantViolation(format!(
                "ROB[{}] expects destination {} but the CDB delivered {}",
                rob_idx, entry.rd_idx, rd_idx
            )))
        }
    }

    /// Stamp the taken/target observation of a resolved branch.
    pub fn record_branch(&mut self, rob_idx: usize, outcome: BranchOutcome) {
        if rob_idx < self.size {
            let entry = &mut self.entries[rob_idx];
            entry.branch_taken = Some(outcome.taken);
            entry.branch_target = Some(outcome.target);
        }
    }

    /// The head may be retired once its result has landed.
    pub fn can_commit(&self) -> bool {
        !self.is_empty() && self.entries[self.head].res_ready
    }

    /// Pop a copy of the head entry and clear the slot.
    pub fn pop(&mut self) -> Option<ROBEntry> {
        if self.is_empty() {
            return None;
        }

        let entry = std::mem::take(&mut self.entries[self.head]);

        self.head = (self.head + 1) % self.size;
        self.count -= 1;

        Some(entry)
    }

    /// Newest-first scan from tail-1 back to head for the most recent valid
    /// producer of architectural register `rs_idx`. The requester-PC check
    /// keeps an instruction from shadowing itself.
    pub fn search_operand(&self, rs_idx: u32, requester_pc: u32) -> Option<ProducerHit> {
        let mut i = (self.tail + self.size - 1) % self.size;
        let mut cnt = 0;

        while cnt < self.count {
            let entry = &self.entries[i];

            if entry.rd_idx == rs_idx as i32 && entry.valid && entry.instr_pc != requester_pc {
                if entry.res_ready {
                    return Some(ProducerHit::Ready(entry.res_value));
                }
                return Some(ProducerHit::InFlight(i));
            }

            i = (i + self.size - 1) % self.size;
            cnt += 1;
        }

        None
    }
}

impl fmt::Display for ReorderBuffer {
    /// Dump the occupied entries walking head to tail.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut i = self.head;
        let mut cnt = 0;
        while cnt < self.count {
            writeln!(f, "ROB[{}] = {}", i, self.entries[i])?;
            i = (i + 1) % self.size;
            cnt += 1;
        }
        Ok(())
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

    fn sw(pc: u32) -> Instruction {
        decode_fields(pc, 0x0020_A423, "sw x2, 8(x1)").unwrap()
    }

    #[test]
    fn test_push_assigns_ring_indices() {
        let mut rob = ReorderBuffer::new(4);
        assert_eq!(rob.push(&addi(0, 1, 5)), Some(0));
        assert_eq!(rob.push(&addi(4, 2, 6)), Some(1));
        assert_eq!(rob.count, 2);
    }

    #[test]
    fn test_full_rob_rejects_push() {
        let mut rob = ReorderBuffer::new(2);
        rob.push(&addi(0, 1, 1)).unwrap();
        rob.push(&addi(4, 2, 2)).unwrap();
        assert!(rob.push(&addi(8, 3, 3)).is_none());
        assert_eq!(rob.free_slots(), 0);
    }

    #[test]
    fn test_pop_requires_ready_head() {
        let mut rob = ReorderBuffer::new(4);
        let idx = rob.push(&addi(0, 1, 5)).unwrap();
        assert!(!rob.can_commit());

        rob.update(idx, 1, 5).unwrap();
        assert!(rob.can_commit());

        let entry = rob.pop().unwrap();
        assert_eq!(entry.res_value, 5);
        assert!(rob.is_empty());
    }

    #[test]
    fn test_update_mismatched_destination_is_invariant_violation() {
        let mut rob = ReorderBuffer::new(4);
        let idx = rob.push(&addi(0, 1, 5)).unwrap();
        assert!(rob.update(idx, 2, 5).is_err());
    }

    #[test]
    fn test_update_no_destination_invalidates() {
        let mut rob = ReorderBuffer::new(4);
        let idx = rob.push(&sw(0)).unwrap();
        rob.update(idx, -1, 0).unwrap();

        assert!(rob.can_commit());
        let entry = rob.pop().unwrap();
        assert!(!entry.valid);
    }

    #[test]
    fn test_search_returns_newest_producer() {
        let mut rob = ReorderBuffer::new(4);
        let first = rob.push(&addi(0, 1, 5)).unwrap();
        let second = rob.push(&addi(4, 1, 6)).unwrap();

        rob.update(first, 1, 5).unwrap();
        // The newest producer of x1 is still in flight, so the requester must
        // wait on it even though an older one already has a value.
        assert_eq!(
            rob.search_operand(1, 8),
            Some(ProducerHit::InFlight(second))
        );
    }

    #[test]
    fn test_search_excludes_requester() {
        let mut rob = ReorderBuffer::new(4);
        rob.push(&addi(0, 1, 5)).unwrap();
        assert_eq!(rob.search_operand(1, 0), None);
    }

    #[test]
    fn test_search_wraps_around_ring() {
        let mut rob = ReorderBuffer::new(2);
        let idx = rob.push(&addi(0, 1, 1)).unwrap();
        rob.update(idx, 1, 1).unwrap();
        rob.pop().unwrap();

        rob.push(&addi(4, 2, 2)).unwrap();
        let wrapped = rob.push(&addi(8, 3, 3)).unwrap();
        assert_eq!(wrapped, 0);
        assert_eq!(
            rob.search_operand(3, 12),
            Some(ProducerHit::InFlight(wrapped))
        );
    }
}
