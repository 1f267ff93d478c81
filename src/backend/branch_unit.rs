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

// branch_unit.rs
//
// This file contains the branch unit. Conditional branches produce a taken
// verdict; jumps produce the PC+4 link value. The front-end consumes a
// pre-disassembled trace, so resolved branches never redirect fetch: the
// verdict and target travel on the CDB packet and are recorded in the ROB
// for observation at commit.

use std::fmt;

use crate::backend::cdb::{BranchOutcome, CdbPacket, CdbSource};
use crate::backend::exec_unit::ExecUnit;
use crate::backend::operand::Operand;
use crate::backend::pick::PickPolicy;
use crate::backend::rs::RsEntry;
use crate::errors::SimulatorError;
use crate::isa::instruction::{InstrType, Instruction};

#[derive(Debug, Clone)]
pub struct BranchEntry {
    pub pc: u32,
    pub rob_idx: usize,
    /// Link register for JAL/JALR; -1 for conditional branches.
    pub rd_idx: i32,
    pub opcode: u32,
    pub funct3: u32,
    pub imm: i32,
    /// First source; None for JAL.
    pub rs1: Option<Operand>,
    /// Second source; conditional branches only.
    pub rs2: Option<Operand>,
    pub taken: Option<bool>,
    pub target: Option<u32>,
    pub res_value: Option<u32>,
}

impl BranchEntry {
    pub fn from_instruction(instr: &Instruction, rob_idx: usize) -> Self {
        let (rd_idx, rs1, rs2) = match instr.itype {
            InstrType::B => (
                -1,
                Some(Operand::Arch(instr.rs1)),
                Some(Operand::Arch(instr.rs2)),
            ),
            InstrType::IJalr => (instr.rd as i32, Some(Operand::Arch(instr.rs1)), None),
            // JAL needs nothing from the register file.
            _ => (instr.rd as i32, None, None),
        };
        Self {
            pc: instr.pc,
            rob_idx,
            rd_idx,
            opcode: instr.opcode,
            funct3: instr.funct3,
            imm: instr.imm,
            rs1,
            rs2,
            taken: None,
            target: None,
            res_value: None,
        }
    }

    pub fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        self.rs1.iter_mut().chain(self.rs2.iter_mut())
    }
}

impl RsEntry for BranchEntry {
    fn rob_idx(&self) -> usize {
        self.rob_idx
    }

    fn pc(&self) -> u32 {
        self.pc
    }

    fn is_ready(&self) -> bool {
        self.rs1.map_or(true, |op| op.is_resolved())
            && self.rs2.map_or(true, |op| op.is_resolved())
    }

    fn update_from_cdb(&mut self, rob_idx: usize, value: u32) {
        if let Some(rs1) = self.rs1.as_mut() {
            rs1.update_from_cdb(rob_idx, value);
        }
        if let Some(rs2) = self.rs2.as_mut() {
            rs2.update_from_cdb(rob_idx, value);
        }
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

impl fmt::Display for BranchEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BranchEntry(pc=0x{:08x}, rob_idx={}, rd_idx={}, imm={}, taken={:?}, target={:?})",
            self.pc, self.rob_idx, self.rd_idx, self.imm, self.taken, self.target
        )
    }
}

/// Resolve a control-transfer instruction. The comparator verdict and the
/// computed target are written back onto the entry; the returned value is
/// the link value for jumps (zero for conditional branches).
pub fn execute(entry: &mut BranchEntry) -> Result<u32, SimulatorError> {
    if entry.rs2.is_some() {
        // Conditional branch
        let a = entry.rs1.and_then(|op| op.value()).unwrap_or(0);
        let b = entry.rs2.and_then(|op| op.value()).unwrap_or(0);

        let taken = match entry.funct3 {
            0b000 => a == b,                       // beq
            0b001 => a != b,                       // bne
            0b100 => (a as i32) < (b as i32),      // blt
            0b101 => (a as i32) >= (b as i32),     // bge
            0b110 => a < b,                        // bltu
            0b111 => a >= b,                       // bgeu
            _ => {
                return Err(SimulatorError::UnknownOperation {
                    opcode: entry.opcode,
                    funct3: entry.funct3,
                    funct7: 0,
                })
            },
        };

        entry.taken = Some(taken);
        entry.target = Some(entry.pc.wrapping_add(entry.imm as u32));
        Ok(0)
    } else if let Some(rs1) = entry.rs1 {
        // jalr
        if entry.funct3 != 0b000 {
            return Err(SimulatorError::UnknownOperation {
                opcode: entry.opcode,
                funct3: entry.funct3,
                funct7: 0,
            });
        }
        let base = rs1.value().unwrap_or(0);
        entry.taken = Some(true);
        entry.target = Some(base.wrapping_add(entry.imm as u32) & !1);
        Ok(entry.pc.wrapping_add(4))
    } else {
        // jal
        entry.taken = Some(true);
        entry.target = Some(entry.pc.wrapping_add(entry.imm as u32));
        Ok(entry.pc.wrapping_add(4))
    }
}

pub struct BranchUnit {
    pub eu: ExecUnit<BranchEntry>,
}

impl BranchUnit {
    pub fn new(n_entries: usize, latency: usize, iterative: bool, policy: PickPolicy) -> Self {
        Self {
            eu: ExecUnit::new(n_entries, latency, iterative, policy),
        }
    }

    pub fn step(&mut self) -> Result<(), SimulatorError> {
        self.eu.step(execute)
    }

    pub fn has_space(&self) -> bool {
        self.eu.rs.has_space()
    }

    pub fn issue(&mut self, entry: BranchEntry) -> bool {
        self.eu.rs.issue(entry)
    }

    pub fn update_from_cdb(&mut self, rob_idx: usize, value: u32) {
        self.eu.rs.update_from_cdb(rob_idx, value);
    }

    pub fn is_empty(&self) -> bool {
        self.eu.rs.is_empty()
    }
}

impl CdbSource for BranchUnit {
    fn has_result(&self) -> bool {
        self.eu.rs.has_done()
    }

    fn take_result(&mut self) -> Option<CdbPacket> {
        self.eu.rs.get_done().map(|entry| CdbPacket {
            rd_idx: entry.rd_idx,
            res_value: entry.res_value.unwrap_or(0),
            rob_idx: entry.rob_idx,
            valid: true,
            branch: match (entry.taken, entry.target) {
                (Some(taken), Some(target)) => Some(BranchOutcome { taken, target }),
                _ => None,
            },
        })
    }
}
