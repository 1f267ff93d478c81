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

// iq.rs
//
// This file contains the instruction queue: it reads a pre-disassembled
// trace file and hands decoded instructions to the dispatcher in program
// order. Lines that do not look like `<addr>: <encoding> <mnemonic>` are
// skipped (section headers, labels, blank lines).

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::info;
use regex::Regex;

use crate::errors::SimulatorError;
use crate::isa::decode::decode_fields;
use crate::isa::instruction::Instruction;

pub struct InstrQueue {
    queue: VecDeque<Instruction>,
}

impl InstrQueue {
    /// Parse a disassembly trace file into a queue of decoded instructions.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SimulatorError> {
        let file = File::open(&path)?;
        let reader = BufReader::new(file);

        // <hex-addr>: <hex-encoding> <mnemonic...>
        let pattern = Regex::new(r"^\s*([0-9a-fA-F]+):\s+([0-9a-fA-F]+)\s+(.+)$")
            .map_err(|e| SimulatorError::InvariantViolation(e.to_string()))?;

        let mut queue = VecDeque::new();
        for line in reader.lines() {
            let line = line?;
            let Some(caps) = pattern.captures(&line) else {
                continue;
            };

            let pc = u32::from_str_radix(&caps[1], 16)
                .map_err(|_| SimulatorError::MalformedInput(line.clone()))?;
            let raw = u32::from_str_radix(&caps[2], 16)
                .map_err(|_| SimulatorError::MalformedInput(line.clone()))?;
            let mnemonic = caps[3].trim();

            queue.push_back(decode_fields(pc, raw, mnemonic)?);
        }

        info!(
            "Parsed {} instructions from {}",
            queue.len(),
            path.as_ref().display()
        );
        Ok(Self { queue })
    }

    /// Build a queue directly from decoded instructions (tests).
    pub fn from_instructions(instrs: Vec<Instruction>) -> Self {
        Self {
            queue: instrs.into(),
        }
    }

    pub fn pop(&mut self) -> Option<Instruction> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parses_trace_lines_and_skips_noise() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Disassembly of section .text:").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "00000000 <main>:").unwrap();
        writeln!(file, "       0:\t00500093          \taddi x1, x0, 5").unwrap();
        writeln!(file, "       4:\t00708113          \taddi x2, x1, 7").unwrap();

        let mut iq = InstrQueue::from_file(file.path()).unwrap();
        assert_eq!(iq.len(), 2);

        let first = iq.pop().unwrap();
        assert_eq!(first.pc, 0);
        assert_eq!(first.rd, 1);
        assert_eq!(first.imm, 5);

        let second = iq.pop().unwrap();
        assert_eq!(second.pc, 4);
        assert_eq!(second.rs1, 1);
    }

    #[test]
    fn test_unknown_encoding_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "       0:\t0000001b          \tunknown").unwrap();

        assert!(InstrQueue::from_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(InstrQueue::from_file("/nonexistent/trace.dis").is_err());
    }
}
