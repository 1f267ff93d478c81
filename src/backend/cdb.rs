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

// cdb.rs
//
// This file contains the common data bus: a single-slot broadcast channel
// shared by all execution units. The scheduler arbitrates among units in
// registration order once per cycle; the winning packet sits on the bus
// until the commit unit's destructive read the following cycle. In hardware
// the priority comes from a priority encoder; here it comes from the order
// in which the scheduler walks the units.

use log::debug;

/// Taken/target observation of a resolved branch, carried along the packet
/// so the ROB can record it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchOutcome {
    pub taken: bool,
    pub target: u32,
}

/// The single broadcast payload. `rd_idx` is the architectural destination
/// (-1 for stores and conditional branches).
#[derive(Debug, Clone)]
pub struct CdbPacket {
    pub rd_idx: i32,
    pub res_value: u32,
    pub rob_idx: usize,
    pub valid: bool,
    pub branch: Option<BranchOutcome>,
}

/// Anything that can win a broadcast slot. `take_result` must only be called
/// after `has_result` reports true, and consumes the unit's done entry.
pub trait CdbSource {
    fn has_result(&self) -> bool;
    fn take_result(&mut self) -> Option<CdbPacket>;
}

pub struct CommonDataBus {
    slot: Option<CdbPacket>,
    last: Option<CdbPacket>,
}

impl Default for CommonDataBus {
    fn default() -> Self {
        Self::new()
    }
}

impl CommonDataBus {
    pub fn new() -> Self {
        Self {
            slot: None,
            last: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    /// Destructive read used by the commit unit.
    pub fn get(&mut self) -> Option<CdbPacket> {
        self.slot.take()
    }

    /// The most recent packet ever broadcast, used by issue-time forwarding.
    pub fn last_result(&self) -> Option<&CdbPacket> {
        self.last.as_ref()
    }

    /// Walk the units in registration order and move the first available
    /// result onto the bus. At most one broadcast per cycle; units that lose
    /// arbitration keep their results parked in their reservation stations.
    pub fn arbitrate(&mut self, sources: &mut [&mut dyn CdbSource]) {
        if self.slot.is_some() {
            return;
        }

        for source in sources.iter_mut() {
            if source.has_result() {
                if let Some(packet) = source.take_result() {
                    debug!(
                        "CDB broadcast: rob_idx={} rd_idx={} value=0x{:08x}",
                        packet.rob_idx, packet.rd_idx, packet.res_value
                    );
                    self.last = Some(packet.clone());
                    self.slot = Some(packet);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeUnit {
        pending: Option<CdbPacket>,
    }

    impl CdbSource for FakeUnit {
        fn has_result(&self) -> bool {
            self.pending.is_some()
        }

        fn take_result(&mut self) -> Option<CdbPacket> {
            self.pending.take()
        }
    }

    fn packet(rob_idx: usize, value: u32) -> CdbPacket {
        CdbPacket {
            rd_idx: 1,
            res_value: value,
            rob_idx,
            valid: true,
            branch: None,
        }
    }

    #[test]
    fn test_registration_order_wins_arbitration() {
        let mut cdb = CommonDataBus::new();
        let mut first = FakeUnit { pending: Some(packet(0, 10)) };
        let mut second = FakeUnit { pending: Some(packet(1, 20)) };

        cdb.arbitrate(&mut [&mut first, &mut second]);

        let broadcast = cdb.get().unwrap();
        assert_eq!(broadcast.res_value, 10);
        // The loser keeps its result for the next cycle.
        assert!(second.has_result());
    }

    #[test]
    fn test_occupied_bus_blocks_arbitration() {
        let mut cdb = CommonDataBus::new();
        let mut unit = FakeUnit { pending: Some(packet(0, 10)) };
        cdb.arbitrate(&mut [&mut unit]);

        let mut late = FakeUnit { pending: Some(packet(1, 20)) };
        cdb.arbitrate(&mut [&mut late]);
        assert!(late.has_result());

        assert_eq!(cdb.get().unwrap().res_value, 10);
    }

    #[test]
    fn test_last_result_survives_destructive_read() {
        let mut cdb = CommonDataBus::new();
        let mut unit = FakeUnit { pending: Some(packet(3, 42)) };
        cdb.arbitrate(&mut [&mut unit]);

        assert!(cdb.get().is_some());
        assert!(cdb.get().is_none());
        assert_eq!(cdb.last_result().unwrap().res_value, 42);
    }
}
