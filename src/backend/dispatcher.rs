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

// dispatcher.rs
//
// This file contains the dispatcher: it pulls decoded instructions from the
// front-end queue, allocates ROB entries, builds the schema-specific
// reservation-station entries with issue-time operand forwarding, and routes
// them to the execution units through a static dispatch table.
//
// If you add custom instructions or new execution units, the dispatch table
// must be extended, otherwise dispatching raises a decode error.

use std::collections::VecDeque;

use log::{debug, trace};

use crate::backend::arith_unit::{ArithEntry, ArithUnit};
use crate::backend::branch_unit::{BranchEntry, BranchUnit};
use crate::backend::cdb::CommonDataBus;
use crate::backend::commit::CommitUnit;
use crate::backend::load_unit::LoadEntry;
use crate::backend::lsu::LoadStoreUnit;
use crate::backend::rf::RegisterFile;
use crate::backend::store_unit::StoreEntry;
use crate::errors::SimulatorError;
use crate::frontend::iq::InstrQueue;
use crate::isa::instruction::{InstrType, Instruction};

/// Which execution-unit family an instruction type is served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Arith,
    Branch,
    Load,
    Store,
}

/// The static dispatch table. Unmapped types (U at present) are decode
/// errors.
pub fn dispatch_table(itype: InstrType) -> Result<UnitKind, SimulatorError> {
    match itype {
        InstrType::R | InstrType::IArith => Ok(UnitKind::Arith),
        InstrType::ILoad => Ok(UnitKind::Load),
        InstrType::S => Ok(UnitKind::Store),
        InstrType::B | InstrType::J | InstrType::IJalr => Ok(UnitKind::Branch),
        other => Err(SimulatorError::UndispatchableType(other.to_string())),
    }
}

struct BufferedInstr {
    instr: Instruction,
    rob_idx: Option<usize>,
}

pub struct Dispatcher {
    buffer: VecDeque<BufferedInstr>,
    n_issue: usize,
    pub dispatched: u64,
}

impl Dispatcher {
    pub fn new(n_issue: usize) -> Self {
        assert!(n_issue > 0, "issue width must be positive");
        Self {
            buffer: VecDeque::with_capacity(n_issue),
            n_issue,
            dispatched: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// One clock cycle:
    /// 1. refill the dispatch buffer from the instruction queue, allocating
    ///    a ROB entry per instruction (a full ROB stops the refill and the
    ///    instruction waits in the buffer without an index),
    /// 2. issue every buffered instruction that holds a ROB index into its
    ///    unit's reservation station, if the station has capacity.
    #[allow(clippy::too_many_arguments)]
    pub fn step(
        &mut self,
        iq: &mut InstrQueue,
        commit: &mut CommitUnit,
        rf: &RegisterFile,
        cdb: &CommonDataBus,
        arith: &mut ArithUnit,
        branch: &mut BranchUnit,
        lsu: &mut LoadStoreUnit,
    ) -> Result<(), SimulatorError> {
        self.refill(iq, commit);
        self.issue(commit, rf, cdb, arith, branch, lsu)
    }

    fn refill(&mut self, iq: &mut InstrQueue, commit: &mut CommitUnit) {
        // Instructions stranded by a full ROB in an earlier cycle get their
        // entry first; program order must match allocation order.
        for buffered in self.buffer.iter_mut() {
            if buffered.rob_idx.is_none() {
                match commit.rob.push(&buffered.instr) {
                    Some(rob_idx) => buffered.rob_idx = Some(rob_idx),
                    None => return,
                }
            }
        }

        while self.buffer.len() < self.n_issue && !iq.is_empty() {
            let Some(instr) = iq.pop() else {
                break;
            };
            trace!("Dispatch refill: {}", instr);

            let rob_idx = commit.rob.push(&instr);
            let stalled = rob_idx.is_none();
            self.buffer.push_back(BufferedInstr { instr, rob_idx });
            if stalled {
                // ROB full: the instruction stays buffered without an index.
                return;
            }
        }
    }

    fn issue(
        &mut self,
        commit: &CommitUnit,
        rf: &RegisterFile,
        cdb: &CommonDataBus,
        arith: &mut ArithUnit,
        branch: &mut BranchUnit,
        lsu: &mut LoadStoreUnit,
    ) -> Result<(), SimulatorError> {
        let mut i = 0;
        while i < self.buffer.len() {
            let Some(rob_idx) = self.buffer[i].rob_idx else {
                i += 1;
                continue;
            };

            let kind = dispatch_table(self.buffer[i].instr.itype)?;
            let issued = {
                let instr = &self.buffer[i].instr;
                match kind {
                    UnitKind::Arith => {
                        arith.has_space() && {
                            let mut entry = ArithEntry::from_instruction(instr, rob_idx);
                            for operand in entry.operands_mut() {
                                operand.forward(instr.pc, rf, commit, cdb);
                            }
                            arith.issue(entry)
                        }
                    },
                    UnitKind::Branch => {
                        branch.has_space() && {
                            let mut entry = BranchEntry::from_instruction(instr, rob_idx);
                            for operand in entry.operands_mut() {
                                operand.forward(instr.pc, rf, commit, cdb);
                            }
                            branch.issue(entry)
                        }
                    },
                    UnitKind::Load => {
                        lsu.load_unit.has_space() && {
                            let mut entry = LoadEntry::from_instruction(instr, rob_idx);
                            entry.rs1.forward(instr.pc, rf, commit, cdb);
                            lsu.load_unit.issue(entry)
                        }
                    },
                    UnitKind::Store => {
                        lsu.store_unit.has_space() && {
                            let mut entry = StoreEntry::from_instruction(instr, rob_idx);
                            for operand in entry.operands_mut() {
                                operand.forward(instr.pc, rf, commit, cdb);
                            }
                            lsu.store_unit.issue(entry)
                        }
                    },
                }
            };

            if issued {
                debug!(
                    "Issued {} to {:?} (rob_idx={})",
                    self.buffer[i].instr, kind, rob_idx
                );
                self.dispatched += 1;
                let _ = self.buffer.remove(i);
            } else {
                i += 1;
            }
        }

        Ok(())
    }
}
