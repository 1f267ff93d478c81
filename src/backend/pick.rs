// pick.rs
//
// This file contains the pick policies used by the reservation stations.
// A policy deterministically selects one slot holding a nominated status and
// moves it to the next status. The default oldest-ready policy walks the
// circular slot window from oldest_ptr so program order falls out of the
// ring pointers without any sorting.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::backend::rs::{RsEntry, Slot, SlotStatus};

#[derive(Debug, Clone)]
pub enum PickPolicy {
    OldestReady,
    NewestReady,
    FirstIndex,
    LastIndex,
    /// Stress-test policy. Deterministic for a given seed.
    Random(StdRng),
}

impl PickPolicy {
    pub fn random(seed: u64) -> Self {
        PickPolicy::Random(StdRng::seed_from_u64(seed))
    }

    /// Select a slot with `status`, transition it to `next_status`, and
    /// return its index.
    pub fn pick<E: RsEntry>(
        &mut self,
        slots: &mut [Slot<E>],
        oldest_ptr: usize,
        newest_ptr: usize,
        status: SlotStatus,
        next_status: SlotStatus,
    ) -> Option<usize> {
        let n = slots.len();
        let found = match self {
            PickPolicy::OldestReady => {
                let mut i = oldest_ptr;
                let mut hit = None;
                for _ in 0..n {
                    if slots[i].status == status {
                        hit = Some(i);
                        break;
                    }
                    i = (i + 1) % n;
                }
                hit
            },
            PickPolicy::NewestReady => {
                let mut i = newest_ptr;
                let mut hit = None;
                for _ in 0..n {
                    if slots[i].status == status {
                        hit = Some(i);
                        break;
                    }
                    i = (i + n - 1) % n;
                }
                hit
            },
            PickPolicy::FirstIndex => (0..n).find(|&i| slots[i].status == status),
            PickPolicy::LastIndex => (0..n).rev().find(|&i| slots[i].status == status),
            PickPolicy::Random(rng) => {
                let mut order: Vec<usize> = (0..n).collect();
                order.shuffle(rng);
                order.into_iter().find(|&i| slots[i].status == status)
            },
        };

        if let Some(i) = found {
            slots[i].status = next_status;
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::rs::tests::TestEntry;

    fn slots_with(statuses: &[SlotStatus]) -> Vec<Slot<TestEntry>> {
        statuses
            .iter()
            .map(|&status| Slot {
                entry: Some(TestEntry::ready(0)),
                status,
            })
            .collect()
    }

    #[test]
    fn test_oldest_ready_walks_from_oldest_ptr() {
        use SlotStatus::*;
        let mut slots = slots_with(&[Ready, Clear, Ready, Executing]);

        let mut policy = PickPolicy::OldestReady;
        let picked = policy.pick(&mut slots, 2, 0, Ready, Executing);
        assert_eq!(picked, Some(2));
        assert_eq!(slots[2].status, Executing);
    }

    #[test]
    fn test_newest_ready_walks_backward() {
        use SlotStatus::*;
        let mut slots = slots_with(&[Ready, Ready, Clear, Clear]);

        let mut policy = PickPolicy::NewestReady;
        let picked = policy.pick(&mut slots, 0, 2, Ready, Executing);
        assert_eq!(picked, Some(1));
    }

    #[test]
    fn test_index_order_policies() {
        use SlotStatus::*;
        let mut slots = slots_with(&[Clear, Ready, Ready, Clear]);

        let mut first = PickPolicy::FirstIndex;
        assert_eq!(first.pick(&mut slots, 0, 0, Ready, Ready), Some(1));

        let mut last = PickPolicy::LastIndex;
        assert_eq!(last.pick(&mut slots, 0, 0, Ready, Ready), Some(2));
    }

    #[test]
    fn test_random_policy_is_seeded_deterministic() {
        use SlotStatus::*;
        let statuses = [Ready, Ready, Ready, Ready];

        let mut a = PickPolicy::random(7);
        let mut b = PickPolicy::random(7);
        for _ in 0..4 {
            let mut slots_a = slots_with(&statuses);
            let mut slots_b = slots_with(&statuses);
            assert_eq!(
                a.pick(&mut slots_a, 0, 0, Ready, Executing),
                b.pick(&mut slots_b, 0, 0, Ready, Executing)
            );
        }
    }

    #[test]
    fn test_no_candidate_returns_none() {
        use SlotStatus::*;
        let mut slots = slots_with(&[Clear, Executing]);
        let mut policy = PickPolicy::OldestReady;
        assert_eq!(policy.pick(&mut slots, 0, 0, Ready, Executing), None);
    }
}
