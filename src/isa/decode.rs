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

// decode.rs
//
// RV32I field decoder. Extracts register indices, funct fields, and the
// format-specific sign-extended immediate from a raw 32-bit encoding.

use crate::errors::SimulatorError;
use crate::isa::instruction::{InstrType, Instruction};

const OPCODE_OP: u32 = 0b0110011;
const OPCODE_OP_IMM: u32 = 0b0010011;
const OPCODE_LOAD: u32 = 0b0000011;
const OPCODE_STORE: u32 = 0b0100011;
const OPCODE_BRANCH: u32 = 0b1100011;
const OPCODE_JAL: u32 = 0b1101111;
const OPCODE_JALR: u32 = 0b1100111;
const OPCODE_LUI: u32 = 0b0110111;
const OPCODE_AUIPC: u32 = 0b0010111;

/// Decode a raw encoding into the shared instruction record.
pub fn decode_fields(pc: u32, raw: u32, mnemonic: &str) -> Result<Instruction, SimulatorError> {
    let opcode = raw & 0x7F;
    let itype = instr_type(opcode).ok_or(SimulatorError::UnknownInstruction(raw))?;

    Ok(Instruction {
        pc,
        raw,
        mnemonic: mnemonic.to_string(),
        opcode,
        funct3: (raw >> 12) & 0x7,
        funct7: (raw >> 25) & 0x7F,
        rd: (raw >> 7) & 0x1F,
        rs1: (raw >> 15) & 0x1F,
        rs2: (raw >> 20) & 0x1F,
        imm: immediate(raw, itype),
        itype,
    })
}

fn instr_type(opcode: u32) -> Option<InstrType> {
    match opcode {
        OPCODE_OP => Some(InstrType::R),
        OPCODE_OP_IMM => Some(InstrType::IArith),
        OPCODE_LOAD => Some(InstrType::ILoad),
        OPCODE_JALR => Some(InstrType::IJalr),
        OPCODE_STORE => Some(InstrType::S),
        OPCODE_BRANCH => Some(InstrType::B),
        OPCODE_JAL => Some(InstrType::J),
        OPCODE_LUI | OPCODE_AUIPC => Some(InstrType::U),
        _ => None,
    }
}

/// Format-specific immediate, sign-extended to 32 bits.
fn immediate(raw: u32, itype: InstrType) -> i32 {
    match itype {
        InstrType::R => 0,
        InstrType::IArith | InstrType::IJalr | InstrType::ILoad => (raw as i32) >> 20,
        InstrType::S => {
            ((raw & 0xFE00_0000) as i32 >> 20) | (((raw >> 7) & 0x1F) as i32)
        },
        InstrType::B => {
            ((raw & 0x8000_0000) as i32 >> 19)
                | ((((raw >> 7) & 0x1) as i32) << 11)
                | ((((raw >> 25) & 0x3F) as i32) << 5)
                | ((((raw >> 8) & 0xF) as i32) << 1)
        },
        InstrType::U => (raw & 0xFFFF_F000) as i32,
        InstrType::J => {
            ((raw & 0x8000_0000) as i32 >> 11)
                | ((raw & 0x000F_F000) as i32)
                | ((((raw >> 20) & 0x1) as i32) << 11)
                | ((((raw >> 21) & 0x3FF) as i32) << 1)
        },
    }
}
