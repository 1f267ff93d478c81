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

// exec_unit.rs
//
// This file contains the execution-unit base: a reservation station paired
// with an execution pipeline of depth = latency. The per-cycle step is the
// same for every unit; only the execute function differs. A finished result
// is parked in the reservation station (status done) until the CDB collects
// it, so losing bus arbitration never drops a value.

use crate::backend::cdb::CdbPacket;
use crate::backend::pick::PickPolicy;
use crate::backend::pipeline::{Pipeline, PipelineEntry};
use crate::backend::rs::{ReservationStation, RsEntry};
use crate::errors::SimulatorError;

pub struct ExecUnit<E: RsEntry> {
    pub rs: ReservationStation<E>,
    pub pipeline: Pipeline,
}

impl<E: RsEntry> ExecUnit<E> {
    pub fn new(n_entries: usize, latency: usize, iterative: bool, policy: PickPolicy) -> Self {
        Self {
            rs: ReservationStation::new(n_entries, policy),
            pipeline: Pipeline::new(latency, iterative),
        }
    }

    /// One clock cycle:
    /// 1. a result in the output stage moves its slot to done,
    /// 2. the pipeline shifts,
    /// 3. if the pipeline can accept, a ready slot is picked, executed, and
    ///    pushed into the entry stage.
    pub fn step<F>(&mut self, mut execute: F) -> Result<(), SimulatorError>
    where
        F: FnMut(&mut E) -> Result<u32, SimulatorError>,
    {
        if let Some(out) = self.pipeline.take_output() {
            self.rs.update_result(out.rob_idx, out.res_value)?;
        }

        self.pipeline.advance();

        if self.pipeline.can_accept() {
            if let Some(idx) = self.rs.pick_ready() {
                if let Some(entry) = self.rs.entry_mut(idx) {
                    let res_value = execute(entry)?;
                    let pipeline_entry = PipelineEntry {
                        res_value,
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

    /// Build a broadcast packet from the oldest done slot, releasing it.
    pub fn take_done_packet(&mut self) -> Option<CdbPacket> {
        self.rs.get_done().map(|entry| CdbPacket {
            rd_idx: entry.dest_idx(),
            res_value: entry.result().unwrap_or(0),
            rob_idx: entry.rob_idx(),
            valid: true,
            branch: None,
        })
    }
}
