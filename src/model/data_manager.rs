//! Per-site data manager: owns committed variables and staged writes.

use std::collections::HashMap;

use crate::model::ids::{SiteId, Time, TransactionId, VariableId};
use crate::model::variable::{SiteHome, Variable};

/// Non-replicated variable's sole home site, given the fleet size.
pub fn home_site_of(variable: VariableId, num_sites: u32) -> SiteId {
    1 + (variable % num_sites)
}

/// Owns a site's committed variables and the transient per-transaction
/// write-sets ("local copies") staged against them.
pub struct DataManager {
    site_id: SiteId,
    variables: HashMap<VariableId, Variable>,
    /// `local_writes[tid][v] = pending_value`, cleared on commit.
    local_writes: HashMap<TransactionId, HashMap<VariableId, i64>>,
}

impl DataManager {
    /// Build the set of variables present at `site_id`: every even-
    /// indexed (replicated) variable, plus the odd-indexed
    /// (non-replicated) variables whose home site is this one.
    pub fn new(site_id: SiteId, num_variables: u32, num_sites: u32) -> Self {
        let mut variables = HashMap::new();
        for i in 1..=num_variables {
            let lives_here = if i % 2 == 0 {
                true
            } else {
                home_site_of(i, num_sites) == site_id
            };
            if lives_here {
                let home = if i % 2 == 0 {
                    SiteHome::Every
                } else {
                    SiteHome::Single(site_id)
                };
                variables.insert(i, Variable::new(i, home));
            }
        }
        DataManager {
            site_id,
            variables,
            local_writes: HashMap::new(),
        }
    }

    pub fn site_id(&self) -> SiteId {
        self.site_id
    }

    pub fn variable(&self, v: VariableId) -> Option<&Variable> {
        self.variables.get(&v)
    }

    /// Committed variables in ascending index order, for `dump`.
    pub fn variables_sorted(&self) -> Vec<&Variable> {
        let mut vars: Vec<&Variable> = self.variables.values().collect();
        vars.sort_by_key(|v| v.index);
        vars
    }

    /// Overwrite the pending value `tid` has staged for `v`.
    pub fn stage_write(&mut self, tid: TransactionId, v: VariableId, value: i64) {
        self.local_writes.entry(tid).or_default().insert(v, value);
    }

    /// A transaction reads its own writes first; otherwise the
    /// committed value visible as of `start_time`.
    pub fn read_own(&self, tid: TransactionId, v: VariableId, start_time: Time) -> Option<i64> {
        if let Some(value) = self.local_writes.get(&tid).and_then(|w| w.get(&v)) {
            return Some(*value);
        }
        self.variables.get(&v).and_then(|var| var.value_before(start_time))
    }

    /// Apply every staged write this transaction made at this site,
    /// then clear its staging map.
    pub fn apply_commit(&mut self, tid: TransactionId, commit_time: Time) {
        if let Some(writes) = self.local_writes.remove(&tid) {
            for (v, value) in writes {
                if let Some(var) = self.variables.get_mut(&v) {
                    var.commit_snapshot(commit_time, value);
                }
            }
        }
    }

    pub fn has_committed_between(&self, v: VariableId, t1: Time, t2: Time) -> bool {
        self.variables
            .get(&v)
            .map(|var| var.committed_between(t1, t2))
            .unwrap_or(false)
    }

    pub fn last_commit_time(&self, v: VariableId) -> Option<Time> {
        self.variables.get(&v).and_then(|var| var.last_commit_time())
    }

    pub fn value_before(&self, v: VariableId, t: Time) -> Option<i64> {
        self.variables.get(&v).and_then(|var| var.value_before(t))
    }

    pub fn time_before(&self, v: VariableId, t: Time) -> Option<Time> {
        self.variables.get(&v).and_then(|var| var.time_before(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replicated_variables_live_on_every_site() {
        let dm = DataManager::new(3, 20, 10);
        assert!(dm.variable(2).is_some());
        assert!(dm.variable(4).is_some());
    }

    #[test]
    fn non_replicated_variable_lives_only_on_home_site() {
        // x1 -> home site = 1 + (1 % 10) = 2
        let dm_home = DataManager::new(2, 20, 10);
        let dm_other = DataManager::new(3, 20, 10);
        assert!(dm_home.variable(1).is_some());
        assert!(dm_other.variable(1).is_none());
    }

    #[test]
    fn own_write_is_visible_before_commit() {
        let mut dm = DataManager::new(2, 20, 10);
        dm.stage_write(1, 2, 999);
        assert_eq!(dm.read_own(1, 2, 5), Some(999));
        // another transaction still sees the committed value
        assert_eq!(dm.read_own(2, 2, 5), Some(20));
    }

    #[test]
    fn commit_clears_staging_and_updates_history() {
        let mut dm = DataManager::new(2, 20, 10);
        dm.stage_write(1, 2, 999);
        dm.apply_commit(1, 7);
        assert_eq!(dm.read_own(1, 2, 8), Some(999));
        assert_eq!(dm.value_before(2, 8), Some(999));
        assert!(dm.has_committed_between(2, 6, 8));
    }
}
