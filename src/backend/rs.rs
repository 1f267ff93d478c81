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

// rs.rs
//
// This file contains the generic reservation station: a slot array
// parameterised by the per-unit entry schema. Slots are allocated at
// newest_ptr and released from oldest_ptr, so the occupied slots always form
// a contiguous circular window in program order.

use std::fmt;

use crate::backend::pick::PickPolicy;
use crate::errors::SimulatorError;

/// Per-slot state machine. AddressReady is only reachable in the memory
/// units, after the address generator has produced the effective address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Clear,
    WaitingOperands,
    Ready,
    Executing,
    AddressReady,
    Done,
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlotStatus::Clear => "clear",
            SlotStatus::WaitingOperands => "waiting_operands",
            SlotStatus::Ready => "ready",
            SlotStatus::Executing => "executing",
            SlotStatus::AddressReady => "address_ready",
            SlotStatus::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// Behavior every entry schema provides to the station and the units.
pub trait RsEntry {
    fn rob_idx(&self) -> usize;
    fn pc(&self) -> u32;
    /// All source operands resolved.
    fn is_ready(&self) -> bool;
    /// Try to fill operands waiting on this producer.
    fn update_from_cdb(&mut self, rob_idx: usize, value: u32);
    fn set_result(&mut self, value: u32);
    fn result(&self) -> Option<u32>;
    /// Architectural destination, -1 when none.
    fn dest_idx(&self) -> i32;
}

#[derive(Debug)]
pub struct Slot<E> {
    pub entry: Option<E>,
    pub status: SlotStatus,
}

pub struct ReservationStation<E: RsEntry> {
    pub n_entries: usize,
    pub slots: Vec<Slot<E>>,
    pub oldest_ptr: usize,
    pub newest_ptr: usize,
    count: usize,
    policy: PickPolicy,
}

impl<E: RsEntry> ReservationStation<E> {
    pub fn new(n_entries: usize, policy: PickPolicy) -> Self {
        assert!(n_entries > 0, "reservation station needs at least one slot");
        let slots = (0..n_entries)
            .map(|_| Slot {
                entry: None,
                status: SlotStatus::Clear,
            })
            .collect();
        Self {
            n_entries,
            slots,
            oldest_ptr: 0,
            newest_ptr: 0,
            count: 0,
            policy,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn occupied(&self) -> usize {
        self.count
    }

    /// A new entry can only land in the slot at newest_ptr; a cleared slot
    /// in the middle of the window is not reusable until the ring wraps to
    /// it.
    pub fn has_space(&self) -> bool {
        self.slots[self.newest_ptr].status == SlotStatus::Clear
    }

    /// Place an entry in the newest slot. Returns false on back-pressure.
    pub fn issue(&mut self, entry: E) -> bool {
        if !self.has_space() {
            return false;
        }

        let status = if entry.is_ready() {
            SlotStatus::Ready
        } else {
            SlotStatus::WaitingOperands
        };

        self.slots[self.newest_ptr] = Slot {
            entry: Some(entry),
            status,
        };
        self.newest_ptr = (self.newest_ptr + 1) % self.n_entries;
        self.count += 1;
        true
    }

    /// Broadcast a CDB value to every slot still waiting on operands.
    pub fn update_from_cdb(&mut self, rob_idx: usize, value: u32) {
        for slot in &mut self.slots {
            if slot.status != SlotStatus::WaitingOperands {
                continue;
            }
            if let Some(entry) = slot.entry.as_mut() {
                entry.update_from_cdb(rob_idx, value);
                if entry.is_ready() {
                    slot.status = SlotStatus::Ready;
                }
            }
        }
    }

    /// Policy-driven selection of a ready slot, transitioned to executing.
    pub fn pick_ready(&mut self) -> Option<usize> {
        self.pick(SlotStatus::Ready, SlotStatus::Executing)
    }

    pub fn pick(&mut self, status: SlotStatus, next_status: SlotStatus) -> Option<usize> {
        self.policy.pick(
            &mut self.slots,
            self.oldest_ptr,
            self.newest_ptr,
            status,
            next_status,
        )
    }

    pub fn entry(&self, idx: usize) -> Option<&E> {
        self.slots[idx].entry.as_ref()
    }

    pub fn entry_mut(&mut self, idx: usize) -> Option<&mut E> {
        self.slots[idx].entry.as_mut()
    }

    /// Store the execution result on the matching in-flight slot and mark it
    /// done. A missing match is a modelling bug.
    pub fn update_result(&mut self, rob_idx: usize, value: u32) -> Result<(), SimulatorError> {
        for slot in &mut self.slots {
            if slot.status != SlotStatus::Executing {
                continue;
            }
            if let Some(entry) = slot.entry.as_mut() {
                if entry.rob_idx() == rob_idx {
                    entry.set_result(value);
                    slot.status = SlotStatus::Done;
                    return Ok(());
                }
            }
        }

        Err(SimulatorError::InvariantViolation(format!(
            "no executing reservation-station slot matches ROB index {}",
            rob_idx
        )))
    }

    pub fn has_done(&self) -> bool {
        self.has_status(SlotStatus::Done)
    }

    pub fn has_status(&self, status: SlotStatus) -> bool {
        self.slots.iter().any(|slot| slot.status == status)
    }

    /// Hand the oldest done entry to the CDB, release its slot, and pull
    /// oldest_ptr forward past released slots.
    pub fn get_done(&mut self) -> Option<E> {
        let mut i = self.oldest_ptr;
        for _ in 0..self.n_entries {
            if self.slots[i].status == SlotStatus::Done {
                let entry = self.slots[i].entry.take();
                self.slots[i].status = SlotStatus::Clear;
                self.count -= 1;
                self.retire_cleared();
                return entry;
            }
            i = (i + 1) % self.n_entries;
        }
        None
    }

    fn retire_cleared(&mut self) {
        if self.count == 0 {
            self.oldest_ptr = self.newest_ptr;
            return;
        }
        while self.slots[self.oldest_ptr].status == SlotStatus::Clear {
            self.oldest_ptr = (self.oldest_ptr + 1) % self.n_entries;
        }
    }
}

impl<E: RsEntry + fmt::Display> fmt::Display for ReservationStation<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.status == SlotStatus::Clear {
                continue;
            }
            match &slot.entry {
                Some(entry) => writeln!(f, "RS[{}] ({}) = {}", i, slot.status, entry)?,
                None => writeln!(f, "RS[{}] ({}) = <empty>", i, slot.status)?,
            }
        }
        Ok(())
    }
}
