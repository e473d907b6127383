//! Arbitration engine
//!
//! Pure allocation math, no IO: given the set of agents currently
//! transferring, divide the budget among them and pin everyone else to the
//! floor. Kept free of the loop and the adapters so the properties in the
//! tests below hold by inspection.

use std::collections::{BTreeMap, BTreeSet};

use crate::agents::AgentId;

/// Per-agent download ceilings in KiB/s. Always derived from an active set,
/// never mutated in place; every known agent has exactly one entry.
pub type Allocation = BTreeMap<AgentId, u64>;

/// Compute the allocation for one tick.
///
/// Active agents split `budget_kib` by integer division; the remainder is
/// dropped, so up to n−1 KiB/s of the budget goes unused rather than being
/// redistributed. Inactive agents — and everyone, when nothing is active —
/// get `floor_kib`.
pub fn allocate(active: &BTreeSet<AgentId>, budget_kib: u64, floor_kib: u64) -> Allocation {
    let n = active.len() as u64;
    let share = if n > 0 { budget_kib / n } else { floor_kib };

    AgentId::ALL
        .iter()
        .map(|id| {
            let rate = if active.contains(id) { share } else { floor_kib };
            (*id, rate)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[AgentId]) -> BTreeSet<AgentId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_every_agent_always_has_an_entry() {
        for ids in [
            &[][..],
            &[AgentId::Sabnzbd][..],
            &[AgentId::Deluge, AgentId::Qbittorrent][..],
            &AgentId::ALL[..],
        ] {
            let allocation = allocate(&set(ids), 3000, 1000);
            assert_eq!(allocation.len(), AgentId::ALL.len());
        }
    }

    #[test]
    fn test_empty_active_set_yields_floor_for_all() {
        let allocation = allocate(&set(&[]), 3000, 1000);
        for id in AgentId::ALL {
            assert_eq!(allocation[&id], 1000);
        }
        // Budget is irrelevant when nothing is active.
        let allocation = allocate(&set(&[]), 999_999, 1000);
        for id in AgentId::ALL {
            assert_eq!(allocation[&id], 1000);
        }
    }

    #[test]
    fn test_single_active_agent_takes_whole_budget() {
        let allocation = allocate(&set(&[AgentId::Deluge]), 3000, 1000);
        assert_eq!(allocation[&AgentId::Deluge], 3000);
        assert_eq!(allocation[&AgentId::Sabnzbd], 1000);
        assert_eq!(allocation[&AgentId::Qbittorrent], 1000);
    }

    #[test]
    fn test_two_active_agents_split_evenly() {
        let allocation = allocate(&set(&[AgentId::Deluge, AgentId::Qbittorrent]), 3000, 1000);
        assert_eq!(allocation[&AgentId::Sabnzbd], 1000);
        assert_eq!(allocation[&AgentId::Deluge], 1500);
        assert_eq!(allocation[&AgentId::Qbittorrent], 1500);
    }

    #[test]
    fn test_three_way_split_drops_remainder() {
        let allocation = allocate(&set(&AgentId::ALL), 1000, 500);
        for id in AgentId::ALL {
            assert_eq!(allocation[&id], 333);
        }
        // 1 KiB/s is lost to rounding: 3 * 333 = 999.
        let spent: u64 = allocation.values().sum();
        assert_eq!(spent, 999);
    }

    #[test]
    fn test_share_floor_property_for_all_n() {
        let budget = 3000;
        let floor = 250;
        for n in 1..=AgentId::ALL.len() {
            let active = set(&AgentId::ALL[..n]);
            let allocation = allocate(&active, budget, floor);
            for id in AgentId::ALL {
                if active.contains(&id) {
                    assert_eq!(allocation[&id], budget / n as u64);
                } else {
                    assert_eq!(allocation[&id], floor);
                }
            }
        }
    }
}
