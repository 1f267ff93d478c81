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

// lsu.rs
//
// This file contains the load-store unit: the orchestrator between the load
// unit, the store unit, and the data memory. Memory issue is restricted to
// the slot whose ROB index equals the current ROB head, so data memory
// observes accesses in commit order; a load is additionally blocked while
// any older store has an unresolved or matching address.

use log::{debug, trace};

use crate::backend::config::BackendConfig;
use crate::backend::dmem::{DataMemory, MemOp, MemRequest};
use crate::backend::load_unit::LoadUnit;
use crate::backend::rs::SlotStatus;
use crate::backend::store_unit::StoreUnit;
use crate::errors::SimulatorError;

pub struct LoadStoreUnit {
    pub load_unit: LoadUnit,
    pub store_unit: StoreUnit,
    store_to_load_forwarding: bool,
}

impl LoadStoreUnit {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            load_unit: LoadUnit::new(
                config.load_unit.n_entries,
                config.load_unit.latency,
                config.load_unit.iterative,
                config.pick_policy.clone(),
            ),
            store_unit: StoreUnit::new(
                config.store_unit.n_entries,
                config.store_unit.latency,
                config.store_unit.iterative,
                config.pick_policy.clone(),
            ),
            store_to_load_forwarding: config.store_to_load_forwarding,
        }
    }

    /// One clock cycle:
    /// 1. route a completed memory transaction back to the load unit,
    /// 2. otherwise start one hazard-checked, ROB-head-gated transaction,
    /// 3. tick the load unit, the store unit, and the memory,
    /// 4. optionally forward store data to waiting loads.
    pub fn step(&mut self, dmem: &mut DataMemory, rob_head: usize) -> Result<(), SimulatorError> {
        if let Some(resp) = dmem.take_ready() {
            if let Some(raw) = resp.value {
                debug!(
                    "LSU: memory returned 0x{:08x} for rob_idx={}",
                    raw, resp.rob_idx
                );
                self.load_unit.complete(resp.rob_idx, raw)?;
            }
            // Store completions need no routing: the slot went done at issue.
        } else if dmem.can_start() {
            if let Some(req) = self.pick_transaction(rob_head) {
                dmem.start(req);
            }
        }

        self.load_unit.step()?;
        self.store_unit.step()?;
        dmem.step();

        if self.store_to_load_forwarding {
            self.forward_stores_to_loads();
        }

        Ok(())
    }

    /// Pick the transaction to hand to memory. Loads take priority over
    /// stores; only the instruction sitting at the ROB head may issue.
    fn pick_transaction(&mut self, rob_head: usize) -> Option<MemRequest> {
        // Load candidate first.
        let load_candidate = self.load_unit.eu.rs.slots.iter().position(|slot| {
            slot.status == SlotStatus::AddressReady
                && slot
                    .entry
                    .as_ref()
                    .map_or(false, |entry| entry.rob_idx == rob_head)
        });

        if let Some(idx) = load_candidate {
            let addr = self.load_unit.eu.rs.entry(idx).and_then(|e| e.address);
            if self.speculative_load_hazard(addr) {
                trace!("LSU: load at ROB head blocked by speculative-load hazard");
                return None;
            }

            let slot = &mut self.load_unit.eu.rs.slots[idx];
            slot.status = SlotStatus::Executing;
            let entry = slot.entry.as_ref()?;
            return Some(MemRequest {
                rob_idx: entry.rob_idx,
                addr: entry.address.unwrap_or(0),
                size: entry.access_size(),
                op: MemOp::Read,
            });
        }

        // Store candidate. The slot is done the moment the write is handed
        // to memory; the data travels inside the request.
        let store_candidate = self.store_unit.eu.rs.slots.iter().position(|slot| {
            slot.status == SlotStatus::AddressReady
                && slot
                    .entry
                    .as_ref()
                    .map_or(false, |entry| entry.rob_idx == rob_head)
        });

        if let Some(idx) = store_candidate {
            let slot = &mut self.store_unit.eu.rs.slots[idx];
            slot.status = SlotStatus::Done;
            let entry = slot.entry.as_ref()?;
            return Some(MemRequest {
                rob_idx: entry.rob_idx,
                addr: entry.address.unwrap_or(0),
                size: entry.access_size(),
                op: MemOp::Write(entry.rs2.value().unwrap_or(0)),
            });
        }

        None
    }

    /// A load must not pass an older store whose address is unresolved or
    /// equal to its own.
    fn speculative_load_hazard(&self, load_addr: Option<u32>) -> bool {
        self.store_unit.eu.rs.slots.iter().any(|slot| {
            if matches!(slot.status, SlotStatus::Clear | SlotStatus::Done) {
                return false;
            }
            match slot.entry.as_ref().and_then(|entry| entry.address) {
                None => true,
                Some(addr) => Some(addr) == load_addr,
            }
        })
    }

    /// Exact-address store-to-load forwarding: completed store data is copied
    /// into waiting loads at the same address, which become ready without a
    /// memory access.
    fn forward_stores_to_loads(&mut self) {
        for store_slot in &self.store_unit.eu.rs.slots {
            if store_slot.status != SlotStatus::Done {
                continue;
            }
            let Some(store) = store_slot.entry.as_ref() else {
                continue;
            };
            let (Some(store_addr), Some(data)) = (store.address, store.rs2.value()) else {
                continue;
            };

            for load_slot in &mut self.load_unit.eu.rs.slots {
                if load_slot.status != SlotStatus::WaitingOperands {
                    continue;
                }
                if let Some(load) = load_slot.entry.as_mut() {
                    if load.address == Some(store_addr) {
                        load.res_value = Some(load.extend(data));
                        load_slot.status = SlotStatus::Ready;
                    }
                }
            }
        }
    }

    pub fn update_from_cdb(&mut self, rob_idx: usize, value: u32) {
        self.load_unit.update_from_cdb(rob_idx, value);
        self.store_unit.update_from_cdb(rob_idx, value);
    }

    pub fn is_empty(&self) -> bool {
        self.load_unit.is_empty() && self.store_unit.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::operand::Operand;
    use crate::backend::store_unit::StoreEntry;
    use crate::isa::decode::decode_fields;

    fn lsu() -> LoadStoreUnit {
        LoadStoreUnit::new(&BackendConfig::default())
    }

    fn store_entry(rob_idx: usize, addr: Option<u32>) -> StoreEntry {
        let instr = decode_fields(0, 0x0020_A423, "sw x2, 8(x1)").unwrap();
        let mut entry = StoreEntry::from_instruction(&instr, rob_idx);
        entry.rs1 = Operand::Resolved(0);
        entry.rs2 = Operand::Resolved(0);
        entry.address = addr;
        entry
    }

    #[test]
    fn test_hazard_on_unresolved_store_address() {
        let mut unit = lsu();
        unit.store_unit.issue(store_entry(1, None));
        unit.store_unit.eu.rs.slots[0].status = SlotStatus::WaitingOperands;

        assert!(unit.speculative_load_hazard(Some(0x100)));
    }

    #[test]
    fn test_hazard_on_matching_store_address() {
        let mut unit = lsu();
        unit.store_unit.issue(store_entry(1, Some(0x100)));
        unit.store_unit.eu.rs.slots[0].status = SlotStatus::AddressReady;

        assert!(unit.speculative_load_hazard(Some(0x100)));
        assert!(!unit.speculative_load_hazard(Some(0x104)));
    }

    #[test]
    fn test_done_store_is_not_a_hazard() {
        let mut unit = lsu();
        unit.store_unit.issue(store_entry(1, Some(0x100)));
        unit.store_unit.eu.rs.slots[0].status = SlotStatus::Done;

        assert!(!unit.speculative_load_hazard(Some(0x100)));
    }

    #[test]
    fn test_only_rob_head_may_issue() {
        let mut unit = lsu();
        unit.store_unit.issue(store_entry(5, Some(0x100)));
        unit.store_unit.eu.rs.slots[0].status = SlotStatus::AddressReady;

        assert!(unit.pick_transaction(4).is_none());
        let req = unit.pick_transaction(5).unwrap();
        assert_eq!(req.addr, 0x100);
        assert_eq!(unit.store_unit.eu.rs.slots[0].status, SlotStatus::Done);
    }
}
