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

// instruction.rs
//
// This file contains the decoded-instruction data model shared by the
// front-end and the backend. An Instruction is created once by the trace
// parser and never mutated afterwards.

use std::fmt;

/// RISC-V instruction format tag used by the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrType {
    R,
    IArith,
    IJalr,
    ILoad,
    S,
    B,
    J,
    U,
}

impl fmt::Display for InstrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstrType::R => "R",
            InstrType::IArith => "I-arith",
            InstrType::IJalr => "I-jalr",
            InstrType::ILoad => "I-load",
            InstrType::S => "S",
            InstrType::B => "B",
            InstrType::J => "J",
            InstrType::U => "U",
        };
        write!(f, "{}", name)
    }
}

/// A fully decoded trace instruction.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub pc: u32,
    pub raw: u32,
    pub mnemonic: String,
    pub opcode: u32,
    pub funct3: u32,
    pub funct7: u32,
    pub rd: u32,
    pub rs1: u32,
    pub rs2: u32,
    /// Sign-extended immediate for the instruction's format; 0 for R-type.
    pub imm: i32,
    pub itype: InstrType,
}

impl Instruction {
    /// Architectural destination register, or -1 when the instruction has
    /// none (stores and conditional branches).
    pub fn dest_idx(&self) -> i32 {
        match self.itype {
            InstrType::S | InstrType::B => -1,
            _ => self.rd as i32,
        }
    }

    /// Loads and stores touch data memory.
    pub fn is_mem_critical(&self) -> bool {
        matches!(self.itype, InstrType::ILoad | InstrType::S)
    }

    /// Stores and control transfers must not be reordered past each other.
    pub fn is_order_critical(&self) -> bool {
        matches!(
            self.itype,
            InstrType::S | InstrType::B | InstrType::J | InstrType::IJalr
        )
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}: {}", self.pc, self.mnemonic)
    }
}
