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

// load_unit.rs
//
// This file contains the load unit. A load's slot walks the full memory
// lifecycle: operands -> ready -> executing (address generation) ->
// address_ready -> executing (memory access) -> done -> CDB broadcast.

use std::fmt;

use crate::backend::cdb::{CdbPacket, CdbSource};
use crate::backend::exec_unit::ExecUnit;
use crate::backend::mem_unit::MemRsEntry;
use crate::backend::operand::Operand;
use crate::backend::pick::PickPolicy;
use crate::backend::rs::{RsEntry, SlotStatus};
use crate::errors::SimulatorError;
use crate::isa::instruction::Instruction;

#[derive(Debug, Clone)]
pub struct LoadEntry {
    pub pc: u32,
    pub rob_idx: usize,
    pub rd_idx: i32,
    pub rs1: Operand,
    pub offset: i32,
    pub funct3: u32,
    pub address: Option<u32>,
    pub res_value: Option<u32>,
}

impl LoadEntry {
    pub fn from_instruction(instr: &Instruction, rob_idx: usize) -> Self {
        Self {
            pc: instr.pc,
            rob_idx,
            rd_idx: instr.rd as i32,
            rs1: Operand::Arch(instr.rs1),
            offset: instr.imm,
            funct3: instr.funct3,
            address: None,
            res_value: None,
        }
    }

    /// Access size in bytes, from funct3.
    pub fn access_size(&self) -> usize {
        match self.funct3 {
            0b000 | 0b100 => 1, // lb / lbu
            0b001 | 0b101 => 2, // lh / lhu
            _ => 4,             // lw
        }
    }

    /// Sign- or zero-extend the raw bytes returned by memory.
    pub fn extend(&self, raw: u32) -> u32 {
        match self.funct3 {
            0b000 => (raw as u8 as i8) as i32 as u32,   // lb
            0b001 => (raw as u16 as i16) as i32 as u32, // lh
            0b100 => raw as u8 as u32,                  // lbu
            0b101 => raw as u16 as u32,                 // lhu
            _ => raw,                                   // lw
        }
    }
}

impl RsEntry for LoadEntry {
    fn rob_idx(&self) -> usize {
        self.rob_idx
    }

    fn pc(&self) -> u32 {
        self.pc
    }

    fn is_ready(&self) -> bool {
        self.rs1.is_resolved()
    }

    fn update_from_cdb(&mut self, rob_idx: usize, value: u32) {
        self.rs1.update_from_cdb(rob_idx, value);
    }

    fn set_result(&mut self, value: u32) {
        self.res_value = Some(value);
    }

    fn result(&self) -> Option<u32> {
        self.res_value
    }

    fn dest_idx(&self) -> i32 {
        self.rd_idx
    }
}

impl MemRsEntry for LoadEntry {
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

impl fmt::Display for LoadEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LoadEntry(pc=0x{:08x}, rob_idx={}, rd_idx={}, rs1={}, offset={}, address={:?})",
            self.pc, self.rob_idx, self.rd_idx, self.rs1, self.offset, self.address
        )
    }
}

pub struct LoadUnit {
    pub eu: ExecUnit<LoadEntry>,
}

impl LoadUnit {
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

    pub fn issue(&mut self, entry: LoadEntry) -> bool {
        self.eu.rs.issue(entry)
    }

    pub fn update_from_cdb(&mut self, rob_idx: usize, value: u32) {
        self.eu.rs.update_from_cdb(rob_idx, value);
    }

    pub fn is_empty(&self) -> bool {
        self.eu.rs.is_empty()
    }

    /// Route a completed memory read back to its slot: the raw bytes are
    /// extended per the access width and the slot moves to done.
    pub fn complete(&mut self, rob_idx: usize, raw: u32) -> Result<(), SimulatorError> {
        let extended = self.eu.rs.slots.iter().find_map(|slot| {
            if slot.status != SlotStatus::Executing {
                return None;
            }
            slot.entry
                .as_ref()
                .filter(|entry| entry.rob_idx == rob_idx)
                .map(|entry| entry.extend(raw))
        });

        match extended {
            Some(value) => self.eu.rs.update_result(rob_idx, value),
            None => Err(SimulatorError::InvariantViolation(format!(
                "memory returned data for ROB index {} but no load is executing",
                rob_idx
            ))),
        }
    }
}

impl CdbSource for LoadUnit {
    fn has_result(&self) -> bool {
        self.eu.rs.has_done()
    }

    fn take_result(&mut self) -> Option<CdbPacket> {
        self.eu.take_done_packet()
    }
}
