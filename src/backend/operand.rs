// operand.rs
//
// This file contains the tagged operand representation shared by every
// reservation-station entry schema. An operand starts as an architectural
// register name, collapses at issue time to either a concrete value or an
// in-flight producer (ROB index), and is finally resolved by a CDB
// broadcast.

use std::fmt;

use crate::backend::cdb::CommonDataBus;
use crate::backend::commit::CommitUnit;
use crate::backend::rf::RegisterFile;
use crate::backend::rob::ProducerHit;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    /// Architectural register, not yet looked up.
    Arch(u32),
    /// Waiting on the in-flight producer at this ROB index.
    Pending(usize),
    /// Value in hand.
    Resolved(u32),
}

impl Operand {
    pub fn value(&self) -> Option<u32> {
        match self {
            Operand::Resolved(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Operand::Resolved(_))
    }

    /// Collapse a pending tag when the matching producer broadcasts.
    pub fn update_from_cdb(&mut self, rob_idx: usize, value: u32) {
        if let Operand::Pending(tag) = self {
            if *tag == rob_idx {
                *self = Operand::Resolved(value);
            }
        }
    }

    /// Issue-time forwarding. Precedence, highest first:
    /// 1. commit-unit lookup (ROB newest-first, then the commit queue),
    /// 2. the CDB's last valid packet,
    /// 3. the register file.
    /// Register 0 always resolves to the literal zero.
    pub fn forward(
        &mut self,
        requester_pc: u32,
        rf: &RegisterFile,
        commit: &CommitUnit,
        cdb: &CommonDataBus,
    ) {
        let reg = match *self {
            Operand::Arch(reg) => reg,
            _ => return,
        };

        if reg == 0 {
            *self = Operand::Resolved(0);
            return;
        }

        *self = match commit.search_operand(reg, requester_pc) {
            Some(ProducerHit::Ready(value)) => Operand::Resolved(value),
            Some(ProducerHit::InFlight(rob_idx)) => Operand::Pending(rob_idx),
            None => match cdb.last_result() {
                Some(packet) if packet.rd_idx == reg as i32 => {
                    Operand::Resolved(packet.res_value)
                },
                _ => Operand::Resolved(rf.read(reg)),
            },
        };
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Arch(reg) => write!(f, "x{}", reg),
            Operand::Pending(rob_idx) => write!(f, "ROB[{}]", rob_idx),
            Operand::Resolved(value) => write!(f, "0x{:08x}", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cdb_update_resolves_matching_tag() {
        let mut op = Operand::Pending(3);
        op.update_from_cdb(2, 99);
        assert_eq!(op, Operand::Pending(3));

        op.update_from_cdb(3, 42);
        assert_eq!(op, Operand::Resolved(42));
    }

    #[test]
    fn test_resolved_operand_is_final() {
        let mut op = Operand::Resolved(7);
        op.update_from_cdb(0, 99);
        assert_eq!(op, Operand::Resolved(7));
    }
}
