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

// arith_unit.rs
//
// This file contains the arithmetic unit: the RV32I integer ALU covering
// R-type and I-type operations. Decoding is by (opcode, funct3, funct7);
// unknown combinations are decode errors.

use std::fmt;

use crate::backend::cdb::{CdbPacket, CdbSource};
use crate::backend::exec_unit::ExecUnit;
use crate::backend::operand::Operand;
use crate::backend::pick::PickPolicy;
use crate::backend::rs::RsEntry;
use crate::errors::SimulatorError;
use crate::isa::instruction::{InstrType, Instruction};

const OPCODE_OP: u32 = 0b0110011;
const OPCODE_OP_IMM: u32 = 0b0010011;
const FUNCT7_ALT: u32 = 0b0100000;

#[derive(Debug, Clone)]
pub struct ArithEntry {
    pub pc: u32,
    pub rob_idx: usize,
    pub rd_idx: i32,
    pub opcode: u32,
    pub funct3: u32,
    pub funct7: u32,
    /// I-type immediate; None for R-type.
    pub imm: Option<i32>,
    pub rs1: Operand,
    /// Second register source; None for I-type.
    pub rs2: Option<Operand>,
    pub res_value: Option<u32>,
}

impl ArithEntry {
    pub fn from_instruction(instr: &Instruction, rob_idx: usize) -> Self {
        let (imm, rs2) = match instr.itype {
            InstrType::R => (None, Some(Operand::Arch(instr.rs2))),
            _ => (Some(instr.imm), None),
        };
        Self {
            pc: instr.pc,
            rob_idx,
            rd_idx: instr.rd as i32,
            opcode: instr.opcode,
            funct3: instr.funct3,
            funct7: instr.funct7,
            imm,
            rs1: Operand::Arch(instr.rs1),
            rs2,
            res_value: None,
        }
    }

    /// Mutable views of the source operands, for issue-time forwarding.
    pub fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        std::iter::once(&mut self.rs1).chain(self.rs2.as_mut())
    }
}

impl RsEntry for ArithEntry {
    fn rob_idx(&self) -> usize {
        self.rob_idx
    }

    fn pc(&self) -> u32 {
        self.pc
    }

    fn is_ready(&self) -> bool {
        self.rs1.is_resolved() && self.rs2.map_or(true, |op| op.is_resolved())
    }

    fn update_from_cdb(&mut self, rob_idx: usize, value: u32) {
        self.rs1.update_from_cdb(rob_idx, value);
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

impl fmt::Display for ArithEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ArithEntry(pc=0x{:08x}, rob_idx={}, rd_idx={}, rs1={}, rs2={}, imm={:?})",
            self.pc,
            self.rob_idx,
            self.rd_idx,
            self.rs1,
            self.rs2.map(|op| op.to_string()).unwrap_or_default(),
            self.imm
        )
    }
}

/// Evaluate an integer operation on its resolved operands.
pub fn execute(entry: &mut ArithEntry) -> Result<u32, SimulatorError> {
    let a = entry.rs1.value().unwrap_or(0);
    let b = match entry.rs2 {
        Some(op) => op.value().unwrap_or(0),
        None => entry.imm.unwrap_or(0) as u32,
    };

    let unknown = || SimulatorError::UnknownOperation {
        opcode: entry.opcode,
        funct3: entry.funct3,
        funct7: entry.funct7,
    };

    let result = match (entry.opcode, entry.funct3) {
        (OPCODE_OP, 0b000) => match entry.funct7 {
            0 => a.wrapping_add(b),
            FUNCT7_ALT => a.wrapping_sub(b),
            _ => return Err(unknown()),
        },
        (OPCODE_OP_IMM, 0b000) => a.wrapping_add(b),
        (OPCODE_OP, 0b001) | (OPCODE_OP_IMM, 0b001) => {
            if entry.funct7 != 0 {
                return Err(unknown());
            }
            a.wrapping_shl(b & 0x1F)
        },
        (OPCODE_OP, 0b010) | (OPCODE_OP_IMM, 0b010) => ((a as i32) < (b as i32)) as u32,
        (OPCODE_OP, 0b011) | (OPCODE_OP_IMM, 0b011) => (a < b) as u32,
        (OPCODE_OP, 0b100) | (OPCODE_OP_IMM, 0b100) => a ^ b,
        (OPCODE_OP, 0b101) | (OPCODE_OP_IMM, 0b101) => match entry.funct7 {
            0 => a.wrapping_shr(b & 0x1F),
            FUNCT7_ALT => ((a as i32).wrapping_shr(b & 0x1F)) as u32,
            _ => return Err(unknown()),
        },
        (OPCODE_OP, 0b110) | (OPCODE_OP_IMM, 0b110) => a | b,
        (OPCODE_OP, 0b111) | (OPCODE_OP_IMM, 0b111) => a & b,
        _ => return Err(unknown()),
    };

    Ok(result)
}

pub struct ArithUnit {
    pub eu: ExecUnit<ArithEntry>,
}

impl ArithUnit {
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

    pub fn issue(&mut self, entry: ArithEntry) -> bool {
        self.eu.rs.issue(entry)
    }

    pub fn update_from_cdb(&mut self, rob_idx: usize, value: u32) {
        self.eu.rs.update_from_cdb(rob_idx, value);
    }

    pub fn is_empty(&self) -> bool {
        self.eu.rs.is_empty()
    }
}

impl CdbSource for ArithUnit {
    fn has_result(&self) -> bool {
        self.eu.rs.has_done()
    }

    fn take_result(&mut self) -> Option<CdbPacket> {
        self.eu.take_done_packet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_r(funct3: u32, funct7: u32, a: u32, b: u32) -> ArithEntry {
        ArithEntry {
            pc: 0,
            rob_idx: 0,
            rd_idx: 1,
            opcode: OPCODE_OP,
            funct3,
            funct7,
            imm: None,
            rs1: Operand::Resolved(a),
            rs2: Some(Operand::Resolved(b)),
            res_value: None,
        }
    }

    fn entry_i(funct3: u32, funct7: u32, a: u32, imm: i32) -> ArithEntry {
        ArithEntry {
            pc: 0,
            rob_idx: 0,
            rd_idx: 1,
            opcode: OPCODE_OP_IMM,
            funct3,
            funct7,
            imm: Some(imm),
            rs1: Operand::Resolved(a),
            rs2: None,
            res_value: None,
        }
    }

    #[test]
    fn test_add_sub_wrap() {
        assert_eq!(execute(&mut entry_r(0b000, 0, u32::MAX, 1)).unwrap(), 0);
        assert_eq!(execute(&mut entry_r(0b000, FUNCT7_ALT, 0, 1)).unwrap(), u32::MAX);
    }

    #[test]
    fn test_logic_ops() {
        assert_eq!(execute(&mut entry_r(0b111, 0, 0b1100, 0b1010)).unwrap(), 0b1000);
        assert_eq!(execute(&mut entry_r(0b110, 0, 0b1100, 0b1010)).unwrap(), 0b1110);
        assert_eq!(execute(&mut entry_r(0b100, 0, 0b1100, 0b1010)).unwrap(), 0b0110);
    }

    #[test]
    fn test_arithmetic_shift_keeps_sign() {
        let v = 0x8000_0000u32;
        assert_eq!(execute(&mut entry_r(0b101, FUNCT7_ALT, v, 4)).unwrap(), 0xF800_0000);
        assert_eq!(execute(&mut entry_r(0b101, 0, v, 4)).unwrap(), 0x0800_0000);
    }

    #[test]
    fn test_set_less_than_signed_vs_unsigned() {
        let minus_one = (-1i32) as u32;
        // slt: -1 < 1
        assert_eq!(execute(&mut entry_r(0b010, 0, minus_one, 1)).unwrap(), 1);
        // sltu: 0xFFFFFFFF > 1
        assert_eq!(execute(&mut entry_r(0b011, 0, minus_one, 1)).unwrap(), 0);
    }

    #[test]
    fn test_immediate_variants() {
        assert_eq!(execute(&mut entry_i(0b000, 0, 5, 7)).unwrap(), 12);
        assert_eq!(execute(&mut entry_i(0b000, 0, 5, -7)).unwrap(), (-2i32) as u32);
        // slti
        assert_eq!(execute(&mut entry_i(0b010, 0, (-3i32) as u32, 0)).unwrap(), 1);
        // srai
        assert_eq!(
            execute(&mut entry_i(0b101, FUNCT7_ALT, 0x8000_0000, 1)).unwrap(),
            0xC000_0000
        );
    }

    #[test]
    fn test_unknown_funct_is_decode_error() {
        assert!(execute(&mut entry_r(0b000, 0b0000001, 1, 1)).is_err());
    }

    #[test]
    fn test_entry_readiness_tracks_operands() {
        let mut entry = ArithEntry {
            rs1: Operand::Pending(2),
            ..entry_i(0b000, 0, 0, 1)
        };
        assert!(!entry.is_ready());

        entry.update_from_cdb(2, 9);
        assert!(entry.is_ready());
        assert_eq!(execute(&mut entry).unwrap(), 10);
    }
}
