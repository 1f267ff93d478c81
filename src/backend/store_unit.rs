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

// store_unit.rs
//
// This file contains the store unit. A store becomes architecturally done
// the moment its transaction is handed to memory; it still broadcasts a
// synthetic packet with rd_idx = -1 so the ROB can mark the no-destination
// entry ready for commit.

use std::fmt;

use crate::backend::cdb::{CdbPacket, CdbSource};
use crate::backend::exec_unit::ExecUnit;
use crate::backend::mem_unit::MemRsEntry;
use crate::backend::operand::Operand;
use crate::backend::pick::PickPolicy;
use crate::backend::rs::RsEntry;
use crate::errors::SimulatorError;
use crate::isa::instruction::Instruction;

#[derive(Debug, Clone)]
pub struct StoreEntry {
    pub pc: u32,
    pub rob_idx: usize,
    /// Base address register.
    pub rs1: Operand,
    /// Data to write.
    pub rs2: Operand,
    pub offset: i32,
    pub funct3: u32,
    pub address: Option<u32>,
    pub res_value: Option<u32>,
}

impl StoreEntry {
    pub fn from_instruction(instr: &Instruction, rob_idx: usize) -> Self {
        Self {
            pc: instr.pc,
            rob_idx,
            rs1: Operand::Arch(instr.rs1),
            rs2: Operand::Arch(instr.rs2),
            offset: instr.imm,
            funct3: instr.funct3,
            address: None,
            res_value: None,
        }
    }

    /// Access size in bytes, from funct3.
    pub fn access_size(&self) -> usize {
        match self.funct3 {
            0b000 => 1, // sb
            0b001 => 2, // sh
            _ => 4,     // sw
        }
    }

    pub fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        std::iter::once(&mut self.rs1).chain(std::iter::once(&mut self.rs2))
    }
}

impl RsEntry for StoreEntry {
    fn rob_idx(&self) -> usize {
        self.rob_idx
    }

    fn pc(&self) -> u32 {
        self.pc
    }

    fn is_ready(&self) -> bool {
        self.rs1.is_resolved() && self.rs2.is_resolved()
    }

    fn update_from_cdb(&mut self, rob_idx: usize, value: u32) {
        self.rs1.update_from_cdb(rob_idx, value);
        self.rs2.update_from_cdb(rob_idx, value);
    }

    fn set_result(&mut self, value: u32) {
        self.res_value = Some(value);
    }

    fn result(&self) -> Option<u32> {
        self.res_value
    }

    fn dest_idx(&self) -> i32 {
        -1
    }
}

impl MemRsEntry for StoreEntry {
    fn address(&self) -> Option<u32> {
        self.address
    }

    fn set_address(&mut self, addr: u32) {
        self.address = Some(addr);
    }

    fn base_value(&self) -> Option<u32> {
        self.rs1.value()
    }

    fn offset(&self) -> i32 {
        self.offset
    }
}

impl fmt::Display for StoreEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StoreEntry(pc=0x{:08x}, rob_idx={}, rs1={}, rs2={}, offset={}, address={:?})",
            self.pc, self.rob_idx, self.rs1, self.rs2, self.offset, self.address
        )
    }
}

pub struct StoreUnit {
    pub eu: ExecUnit<StoreEntry>,
}

impl StoreUnit {
    pub fn new(n_entries: usize, latency: usize, iterative: bool, policy: PickPolicy) -> Self {
        Self {
            eu: ExecUnit::new(n_entries, latency, iterative, policy),
        }
    }

    /// Advance the address generator.
    pub fn step(&mut self) -> Result<(), SimulatorError> {
        self.eu.step_agu()
    }

    pub fn has_space(&self) -> bool {
        self.eu.rs.has_space()
    }

    pub fn issue(&mut self, entry: StoreEntry) -> bool {
        self.eu.rs.issue(entry)
    }

    pub fn update_from_cdb(&mut self, rob_idx: usize, value: u32) {
        self.eu.rs.update_from_cdb(rob_idx, value);
    }

    pub fn is_empty(&self) -> bool {
        self.eu.rs.is_empty()
    }
}

impl CdbSource for StoreUnit {
    fn has_result(&self) -> bool {
        self.eu.rs.has_done()
    }

    fn take_result(&mut self) -> Option<CdbPacket> {
        // Stores never produce a register value.
        self.eu.rs.get_done().map(|entry| CdbPacket {
            rd_idx: -1,
            res_value: 0,
            rob_idx: entry.rob_idx,
            valid: true,
            branch: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::rs::SlotStatus;
    use crate::isa::decode::decode_fields;

    fn sw_entry() -> StoreEntry {
        // sw x2, 8(x1)
        let instr = decode_fields(0, 0x0020_A423, "sw x2, 8(x1)").unwrap();
        StoreEntry::from_instruction(&instr, 0)
    }

    #[test]
    fn test_needs_both_operands() {
        let mut entry = sw_entry();
        entry.rs1 = Operand::Resolved(0x100);
        assert!(!entry.is_ready());
        entry.rs2 = Operand::Resolved(42);
        assert!(entry.is_ready());
    }

    #[test]
    fn test_address_generation() {
        let mut unit = StoreUnit::new(2, 1, true, PickPolicy::OldestReady);
        let mut entry = sw_entry();
        entry.rs1 = Operand::Resolved(0x100);
        entry.rs2 = Operand::Resolved(42);
        unit.issue(entry);

        unit.step().unwrap();
        unit.step().unwrap();
        assert_eq!(unit.eu.rs.slots[0].status, SlotStatus::AddressReady);
        assert_eq!(unit.eu.rs.entry(0).unwrap().address, Some(0x108));
    }

    #[test]
    fn test_broadcast_packet_has_no_destination() {
        let mut unit = StoreUnit::new(2, 1, true, PickPolicy::OldestReady);
        let mut entry = sw_entry();
        entry.rs1 = Operand::Resolved(0x100);
        entry.rs2 = Operand::Resolved(42);
        unit.issue(entry);
        unit.eu.rs.slots[0].status = SlotStatus::Done;

        let packet = unit.take_result().unwrap();
        assert_eq!(packet.rd_idx, -1);
        assert_eq!(packet.res_value, 0);
    }
}
