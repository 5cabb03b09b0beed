use super::decision::Admission;
use crate::request::{Request, RequestId};
use std::cmp::Reverse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VictimAction {
    /// Roll back an admission made earlier in the same cycle
    Retract,
    /// Push an established request out of memory
    Evict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Victim {
    pub id: RequestId,
    pub action: VictimAction,
}

/// Choose which running requests leave memory so that the running set fits
/// in `capacity`.
///
/// Victims are taken most-recently-entered first (ties on higher id), in
/// three passes:
///
/// 1. non-preemptive admissions are rolled back;
/// 2. preemptive admissions are rolled back until the remaining ones could
///    be made to fit by displacing established requests;
/// 3. established requests are evicted.
///
/// The longest-resident established request is only displaced by a
/// preemptive admission that has never run before. Since such an admission
/// is kept, it can displace the senior request at most once, which bounds
/// the number of times any request loses its place.
pub fn plan_evictions(running: &[Request], admissions: &[Admission], capacity: u64) -> Vec<Victim> {
    let mut used: u64 = running.iter().map(Request::footprint).sum();
    let mut victims = Vec::new();
    if used <= capacity {
        return victims;
    }

    let admission = |id: RequestId| admissions.iter().find(|a| a.id == id);
    let mut newest_first: Vec<&Request> = running.iter().collect();
    newest_first.sort_by_key(|r| Reverse(r.seniority()));

    let established: Vec<&Request> = newest_first
        .iter()
        .copied()
        .filter(|r| admission(r.id).is_none())
        .collect();
    let senior = established.last().map(|r| r.id);

    // Pass 1
    for request in &newest_first {
        if used <= capacity {
            return victims;
        }
        if matches!(admission(request.id), Some(a) if !a.preemptive) {
            victims.push(Victim {
                id: request.id,
                action: VictimAction::Retract,
            });
            used -= request.footprint();
        }
    }

    // Pass 2
    let mut kept: Vec<(&Request, bool)> = newest_first
        .iter()
        .filter_map(|r| match admission(r.id) {
            Some(a) if a.preemptive => Some((*r, a.is_first_run())),
            _ => None,
        })
        .collect();
    while used > capacity && !kept.is_empty() {
        let senior_open = kept.iter().any(|&(_, first_run)| first_run);
        let reclaimable: u64 = established
            .iter()
            .filter(|r| senior_open || Some(r.id) != senior)
            .map(|r| r.footprint())
            .sum();
        if used.saturating_sub(reclaimable) <= capacity {
            break;
        }
        let (request, _) = kept.remove(0);
        victims.push(Victim {
            id: request.id,
            action: VictimAction::Retract,
        });
        used -= request.footprint();
    }

    // Pass 3
    let senior_open = kept.is_empty() || kept.iter().any(|&(_, first_run)| first_run);
    for request in established {
        if used <= capacity {
            break;
        }
        if !senior_open && Some(request.id) == senior {
            continue;
        }
        victims.push(Victim {
            id: request.id,
            action: VictimAction::Evict,
        });
        used -= request.footprint();
    }

    victims
}
