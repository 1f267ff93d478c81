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

// mem_unit.rs
//
// This file contains the address-generation base shared by the load and
// store units. The generator computes base + signed offset; when the result
// leaves the pipeline the owning slot moves from executing to address_ready
// (not to done) with the address written into the entry, where the LSU will
// find it.

use crate::backend::exec_unit::ExecUnit;
use crate::backend::pipeline::PipelineEntry;
use crate::backend::rs::{ReservationStation, RsEntry, SlotStatus};
use crate::errors::SimulatorError;

/// Extra surface the memory-unit schemas expose on top of RsEntry.
pub trait MemRsEntry: RsEntry {
    fn address(&self) -> Option<u32>;
    fn set_address(&mut self, addr: u32);
    /// Resolved base register value.
    fn base_value(&self) -> Option<u32>;
    fn offset(&self) -> i32;
}

/// Effective-address calculation.
pub fn agu_execute<E: MemRsEntry>(entry: &E) -> u32 {
    entry
        .base_value()
        .unwrap_or(0)
        .wrapping_add(entry.offset() as u32)
}

impl<E: MemRsEntry> ReservationStation<E> {
    /// Deliver a computed address to the matching in-flight slot, moving it
    /// to address_ready.
    pub fn set_address(&mut self, rob_idx: usize, addr: u32) -> Result<(), SimulatorError> {
        for slot in &mut self.slots {
            if slot.status != SlotStatus::Executing {
                continue;
            }
            if let Some(entry) = slot.entry.as_mut() {
                if entry.rob_idx() == rob_idx {
                    entry.set_address(addr);
                    slot.status = SlotStatus::AddressReady;
                    return Ok(());
                }
            }
        }

        Err(SimulatorError::InvariantViolation(format!(
            "no executing memory slot matches ROB index {} for address delivery",
            rob_idx
        )))
    }
}

impl<E: MemRsEntry> ExecUnit<E> {
    /// Address-generation step. Identical to the generic unit step except
    /// the pipeline output carries an address, not a result.
    pub fn step_agu(&mut self) -> Result<(), SimulatorError> {
        if let Some(out) = self.pipeline.take_output() {
            self.rs.set_address(out.rob_idx, out.res_value)?;
        }

        self.pipeline.advance();

        if self.pipeline.can_accept() {
            if let Some(idx) = self.rs.pick_ready() {
                if let Some(entry) = self.rs.entry_mut(idx) {
                    let addr = agu_execute(entry);
                    let pipeline_entry = PipelineEntry {
                        res_value: addr,
                        rd_idx: entry.dest_idx(),
                        rob_idx: entry.rob_idx(),
                        valid: true,
                    };
                    self.pipeline.insert(pipeline_entry);
                }
            }
        }

        Ok(())
    }
}
