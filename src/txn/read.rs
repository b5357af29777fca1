//! The read rule (module E.2): choosing a readable replica given
//! failure/recovery history, or parking the transaction as `Waiting`.

use log::{debug, info};

use crate::model::ids::{Operation, Time, TransactionId, VariableId};
use crate::model::site::SiteStatus;
use crate::model::site_manager::SiteManager;
use crate::model::transaction::TransactionStatus;
use crate::txn::manager::TransactionManager;

impl TransactionManager {
    /// `Ti` reads `xj`. On success the value is recorded via the access
    /// log and the site-access list; on failure the transaction is
    /// parked `Waiting` or moved straight to `Aborted`.
    pub fn read(&mut self, sm: &mut SiteManager, txn_id: TransactionId, v: VariableId, now: Time) {
        let start = match self.transactions.get(&txn_id) {
            Some(t) => t.start_time,
            None => {
                log::error!("T{} read x{} but was never begun", txn_id, v);
                return;
            }
        };

        if v % 2 == 1 {
            self.read_nonreplicated(sm, txn_id, v, start, now);
        } else {
            self.read_replicated(sm, txn_id, v, start, now);
        }
    }

    fn read_nonreplicated(
        &mut self,
        sm: &mut SiteManager,
        txn_id: TransactionId,
        v: VariableId,
        start: Time,
        now: Time,
    ) {
        let site_id = self.home_site(v);
        if sm.is_available(site_id) {
            let value = sm.site(site_id).data_manager.read_own(txn_id, v, start);
            info!("T{} : reading x{} = {:?} from site {}", txn_id, v, value, site_id);
            self.finish_read(txn_id, site_id, v, now);
        } else {
            info!(
                "T{} : x{} unreadable, site {} is down, waiting",
                txn_id, v, site_id
            );
            sm.enqueue_nonrepl_wait(site_id, txn_id, v);
            self.set_status(txn_id, TransactionStatus::Waiting);
        }
    }

    fn read_replicated(
        &mut self,
        sm: &mut SiteManager,
        txn_id: TransactionId,
        v: VariableId,
        start: Time,
        now: Time,
    ) {
        let mut wait_candidates = Vec::new();

        for site_id in sm.all_site_ids().collect::<Vec<_>>() {
            if !site_passes_checks(sm, site_id, v, start) {
                continue;
            }
            match sm.status(site_id) {
                SiteStatus::Up | SiteStatus::Recovered => {
                    let value = sm.site(site_id).data_manager.read_own(txn_id, v, start);
                    info!("T{} : reading x{} = {:?} from site {}", txn_id, v, value, site_id);
                    self.finish_read(txn_id, site_id, v, now);
                    return;
                }
                SiteStatus::Down => {
                    debug!("T{} : x{} servable by site {} once it recovers", txn_id, v, site_id);
                    wait_candidates.push(site_id);
                }
            }
        }

        if !wait_candidates.is_empty() {
            for site_id in wait_candidates {
                sm.enqueue_repl_wait(site_id, v, txn_id);
            }
            self.set_status(txn_id, TransactionStatus::Waiting);
        } else {
            info!("T{} : x{} has no valid replica, aborting", txn_id, v);
            self.set_status(txn_id, TransactionStatus::Aborted);
        }
    }

    fn finish_read(&mut self, txn_id: TransactionId, site_id: crate::model::ids::SiteId, v: VariableId, now: Time) {
        self.note_access(txn_id, v, Operation::Read);
        if let Some(txn) = self.transactions.get_mut(&txn_id) {
            txn.record_access(site_id, Operation::Read, now);
        }
    }

    fn set_status(&mut self, txn_id: TransactionId, status: TransactionStatus) {
        if let Some(txn) = self.transactions.get_mut(&txn_id) {
            txn.status = status;
        }
    }

    /// Service a read that a site recovery just made servable. Matches
    /// `original_source/SiteManager.py.recover_site` exactly: the
    /// transaction must still be `Waiting` (it may have been aborted
    /// independently while queued); the read is performed only for its
    /// logged value and the transaction is returned to `Running` — no
    /// access-log or site-access entry is recorded for it, the same as
    /// the source.
    pub fn reactivate(&mut self, sm: &SiteManager, reactivated: crate::model::site_manager::ReactivatedRead) {
        let crate::model::site_manager::ReactivatedRead {
            txn_id,
            variable,
            serving_site,
        } = reactivated;
        let start = match self.transactions.get(&txn_id) {
            Some(t) if t.status == TransactionStatus::Waiting => t.start_time,
            _ => return,
        };
        let value = sm.site(serving_site).data_manager.read_own(txn_id, variable, start);
        info!(
            "T{} : reading x{} = {:?} from site {} (woken by recovery)",
            txn_id, variable, value, serving_site
        );
        self.set_status(txn_id, TransactionStatus::Running);
    }
}

/// Both checks a candidate replica must pass before it can serve (or be
/// waited on for) a read of `v` at time `start`:
///
/// 1. Freshness: the site did not fail during the window between the
///    commit of the snapshot it would serve and `start`.
/// 2. Post-recovery durability: if the site recovered before `start`,
///    it must have received a committed write to `v` since its last
///    such recovery.
fn site_passes_checks(sm: &SiteManager, site_id: crate::model::ids::SiteId, v: VariableId, start: Time) -> bool {
    let t_c = sm.site(site_id).data_manager.time_before(v, start).unwrap_or(0);
    let failure_history = sm.failure_history(site_id);
    let failed_in_window = failure_history
        .iter()
        .any(|&fail_time| fail_time > t_c && fail_time < start);
    if failed_in_window {
        return false;
    }

    let recovers_before_start: Vec<Time> = sm
        .recovery_history(site_id)
        .iter()
        .copied()
        .filter(|&t| t < start)
        .collect();
    if recovers_before_start.is_empty() {
        return true;
    }
    let last_recovery = *recovers_before_start.iter().max().unwrap();
    sm.site(site_id)
        .data_manager
        .has_committed_between(v, last_recovery, start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_replicated_read_commits() {
        let mut sm = SiteManager::new(3, 4);
        let mut tm = TransactionManager::new(3);
        tm.begin(1, 1);
        tm.read(&mut sm, 1, 2, 2);
        assert_eq!(tm.transaction(1).unwrap().status, TransactionStatus::Running);
        assert_eq!(tm.access_log[&1][&2], crate::txn::manager::VarAccess { read: true, write: false });
    }

    #[test]
    fn down_home_site_blocks_nonreplicated_read() {
        let mut sm = SiteManager::new(10, 4);
        sm.fail(2, 1); // x1's home site is 1 + (1 % 10) = 2
        let mut tm = TransactionManager::new(10);
        tm.begin(1, 2);
        tm.read(&mut sm, 1, 1, 3);
        assert_eq!(tm.transaction(1).unwrap().status, TransactionStatus::Waiting);
    }

    #[test]
    fn no_replica_at_all_aborts() {
        let mut sm = SiteManager::new(1, 4);
        // Fail the only site, then set its failure time ahead of the variable's
        // last commit but still require the recovery-durability check to fail:
        // actually with one site and no history, a Down site is always a wait
        // candidate — to force an outright abort we need the freshness check to
        // fail instead, e.g. a fail strictly between commit(0) and start.
        sm.fail(1, 1);
        sm.recover(1, 2);
        sm.fail(1, 3);
        let mut tm = TransactionManager::new(1);
        tm.begin(1, 10);
        tm.read(&mut sm, 1, 2, 11);
        // Site failed at t=3 which is within (0, 10) and the site never got a
        // fresh committed write after recovering at t=2, so it is unreadable
        // and, being the only site, there is nothing left to wait on.
        assert_eq!(tm.transaction(1).unwrap().status, TransactionStatus::Aborted);
    }
}
