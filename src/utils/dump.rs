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

// dump.rs
//
// This file contains the dump-file sink used for the per-cycle ROB and
// memory dumps and the end-of-run commit history. The file is truncated
// when the sink is created, then appended to for the rest of the run.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::errors::SimulatorError;

pub struct DumpSink {
    file: File,
}

impl DumpSink {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, SimulatorError> {
        Ok(Self {
            file: File::create(path)?,
        })
    }

    /// Append one cycle section: `Cycle: <n>` followed by the rendered
    /// structure.
    pub fn write_cycle(&mut self, cycle: u64, content: &str) -> Result<(), SimulatorError> {
        writeln!(self.file, "Cycle: {}", cycle)?;
        self.file.write_all(content.as_bytes())?;
        Ok(())
    }

    /// Append raw content with no cycle header (commit history).
    pub fn write_raw(&mut self, content: &str) -> Result<(), SimulatorError> {
        self.file.write_all(content.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rob.log");

        let mut sink = DumpSink::create(&path).unwrap();
        sink.write_cycle(0, "ROB[0] = x\n").unwrap();
        sink.write_cycle(1, "").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Cycle: 0\nROB[0] = x\nCycle: 1\n");
    }
}
