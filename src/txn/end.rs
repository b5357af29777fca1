//! The end-of-transaction validator (module E.4): available-copies
//! check, first-committer-wins snapshot check, and serialization-graph
//! cycle detection.

use std::collections::HashSet;

use log::info;

use crate::model::ids::{Operation, SiteId, Time, TransactionId, VariableId};
use crate::model::site::SiteStatus;
use crate::model::site_manager::SiteManager;
use crate::model::transaction::TransactionStatus;
use crate::txn::manager::TransactionManager;

impl TransactionManager {
    /// `end(Ti)`: commit `Ti` if every validator check passes, abort
    /// otherwise.
    pub fn end(&mut self, sm: &mut SiteManager, txn_id: TransactionId, now: Time) {
        let (start, status) = match self.transactions.get(&txn_id) {
            Some(t) => (t.start_time, t.status),
            None => {
                log::error!("end(T{}) but it was never begun", txn_id);
                return;
            }
        };

        if status == TransactionStatus::Waiting {
            info!("T{} : was waiting on a read, aborting", txn_id);
            self.abort(txn_id);
            return;
        }

        if self.available_copies_violated(sm, txn_id) {
            info!("T{} : aborted, a site it wrote to failed afterward", txn_id);
            self.abort(txn_id);
            return;
        }

        if self.snapshot_violated(sm, txn_id, start) {
            info!("T{} : aborted, first-committer-wins violation", txn_id);
            self.abort(txn_id);
            return;
        }

        let added_edges = self.build_conflict_edges(txn_id, start, now);
        if self.graph.has_cycle() {
            for &(from, to) in &added_edges {
                self.graph.remove_edge(from, to);
            }
            info!("T{} : aborted, would close a cycle in the serialization graph", txn_id);
            self.abort(txn_id);
            return;
        }

        self.commit(sm, txn_id, now);
    }

    fn abort(&mut self, txn_id: TransactionId) {
        if let Some(txn) = self.transactions.get_mut(&txn_id) {
            txn.status = TransactionStatus::Aborted;
        }
    }

    /// For every write access, has the site it wrote to failed since?
    fn available_copies_violated(&self, sm: &SiteManager, txn_id: TransactionId) -> bool {
        let txn = &self.transactions[&txn_id];
        txn.sites_accessed.iter().any(|&(site_id, op, t_w)| {
            op == Operation::Write
                && sm.failure_history(site_id).iter().any(|&fail_time| fail_time > t_w)
        })
    }

    /// For every variable this transaction wrote, did some other
    /// transaction commit a write to it, on a site holding a copy,
    /// after this transaction began?
    fn snapshot_violated(&self, sm: &SiteManager, txn_id: TransactionId, start: Time) -> bool {
        let Some(accesses) = self.access_log.get(&txn_id) else {
            return false;
        };
        for (&v, access) in accesses {
            if !access.write {
                continue;
            }
            let holders = self.sites_holding(sm, v);
            for site_id in holders {
                if let Some(last) = sm.site(site_id).data_manager.last_commit_time(v) {
                    if last > start {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn sites_holding(&self, sm: &SiteManager, v: VariableId) -> Vec<SiteId> {
        if v % 2 == 0 {
            sm.all_site_ids().collect()
        } else {
            vec![self.home_site(v)]
        }
    }

    /// Add conflict edges between this (ending) transaction and every
    /// already-committed transaction sharing a variable with it.
    /// Returns exactly the edges newly added, for rollback on abort.
    fn build_conflict_edges(
        &mut self,
        txn_id: TransactionId,
        start: Time,
        now: Time,
    ) -> Vec<(TransactionId, TransactionId)> {
        let mut added = Vec::new();
        let Some(accesses) = self.access_log.get(&txn_id).cloned() else {
            return added;
        };

        for (v, access) in accesses {
            let w_end = access.write;
            let r_end = access.read;

            for other_id in self.all_ids_sorted() {
                if other_id == txn_id {
                    continue;
                }
                let other = &self.transactions[&other_id];
                if other.status != TransactionStatus::Committed {
                    continue;
                }
                let other_start = other.start_time;
                let other_commit = other.commit_time;

                let other_access = self
                    .access_log
                    .get(&other_id)
                    .and_then(|m| m.get(&v))
                    .copied()
                    .unwrap_or_default();
                let w_other = other_access.write;
                let r_other = other_access.read;

                // ww: other committed before this txn began, both wrote v.
                if let Some(other_commit) = other_commit {
                    if other_commit < start && w_end && w_other {
                        if self.graph.add_edge(other_id, txn_id) {
                            added.push((other_id, txn_id));
                        }
                    }
                    // wr: other wrote v, committed before this txn began, this txn read v.
                    if w_other && r_end && other_commit < start {
                        if self.graph.add_edge(other_id, txn_id) {
                            added.push((other_id, txn_id));
                        }
                    }
                }

                // rw: other read v, this txn wrote v, other began before now.
                if r_other && w_end && other_start < now {
                    if self.graph.add_edge(other_id, txn_id) {
                        added.push((other_id, txn_id));
                    }
                }

                // rw: this txn read v, other wrote v, this txn began before other committed.
                if r_end && w_other {
                    if let Some(other_commit) = other_commit {
                        if start < other_commit && self.graph.add_edge(txn_id, other_id) {
                            added.push((txn_id, other_id));
                        }
                    }
                }
            }
        }

        added
    }

    fn commit(&mut self, sm: &mut SiteManager, txn_id: TransactionId, now: Time) {
        let written_sites: HashSet<SiteId> = self.transactions[&txn_id]
            .sites_accessed
            .iter()
            .filter(|&&(_, op, _)| op == Operation::Write)
            .map(|&(site_id, _, _)| site_id)
            .collect();

        for site_id in written_sites {
            let site = sm.site_mut(site_id);
            if matches!(site.status, SiteStatus::Up | SiteStatus::Recovered) {
                site.data_manager.apply_commit(txn_id, now);
                site.mark_up_after_commit();
            }
        }

        if let Some(txn) = self.transactions.get_mut(&txn_id) {
            txn.commit_time = Some(now);
            txn.status = TransactionStatus::Committed;
        }
        info!("T{} : committed", txn_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trivial_end_with_no_accesses_commits() {
        let mut sm = SiteManager::new(2, 4);
        let mut tm = TransactionManager::new(2);
        tm.begin(1, 1);
        tm.end(&mut sm, 1, 2);
        assert_eq!(tm.transaction(1).unwrap().status, TransactionStatus::Committed);
    }

    #[test]
    fn fail_after_write_aborts_at_end() {
        let mut sm = SiteManager::new(2, 4);
        let mut tm = TransactionManager::new(2);
        tm.begin(1, 1);
        tm.write(&mut sm, 1, 2, 100, 2);
        sm.fail(2, 3);
        tm.end(&mut sm, 1, 4);
        assert_eq!(tm.transaction(1).unwrap().status, TransactionStatus::Aborted);
    }

    #[test]
    fn first_committer_wins() {
        let mut sm = SiteManager::new(2, 4);
        let mut tm = TransactionManager::new(2);
        tm.begin(1, 1);
        tm.begin(2, 2);
        tm.write(&mut sm, 1, 4, 44, 3);
        tm.end(&mut sm, 1, 4); // T1 commits at t=4
        tm.write(&mut sm, 2, 4, 77, 5);
        tm.end(&mut sm, 2, 6);
        assert_eq!(tm.transaction(1).unwrap().status, TransactionStatus::Committed);
        assert_eq!(tm.transaction(2).unwrap().status, TransactionStatus::Aborted);
    }
}
