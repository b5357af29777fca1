//! The write rule (module E.3): stage writes on every currently
//! available replica; Down replicas are silently skipped (the
//! available-copies check at `end` is what may later abort over this).

use log::info;

use crate::model::ids::{Operation, Time, TransactionId, VariableId};
use crate::model::site_manager::SiteManager;
use crate::txn::manager::TransactionManager;

impl TransactionManager {
    /// `Ti` writes `value` to `xj`.
    pub fn write(
        &mut self,
        sm: &mut SiteManager,
        txn_id: TransactionId,
        v: VariableId,
        value: i64,
        now: Time,
    ) {
        if !self.transactions.contains_key(&txn_id) {
            log::error!("T{} wrote x{} but was never begun", txn_id, v);
            return;
        }

        if v % 2 == 1 {
            let site_id = self.home_site(v);
            if sm.is_available(site_id) {
                sm.site_mut(site_id).data_manager.stage_write(txn_id, v, value);
                info!("T{} : write x{} = {} staged at site {}", txn_id, v, value, site_id);
                self.note_write(txn_id, site_id, v, now);
            } else {
                info!(
                    "T{} : write x{} = {} dropped, site {} is down",
                    txn_id, v, value, site_id
                );
            }
        } else {
            for site_id in sm.all_site_ids().collect::<Vec<_>>() {
                if sm.is_available(site_id) {
                    sm.site_mut(site_id).data_manager.stage_write(txn_id, v, value);
                    info!("T{} : write x{} = {} staged at site {}", txn_id, v, value, site_id);
                    self.note_write(txn_id, site_id, v, now);
                } else {
                    info!("T{} : write x{} = {} skipped, site {} is down", txn_id, v, value, site_id);
                }
            }
        }
    }

    fn note_write(&mut self, txn_id: TransactionId, site_id: crate::model::ids::SiteId, v: VariableId, now: Time) {
        self.note_access(txn_id, v, Operation::Write);
        if let Some(txn) = self.transactions.get_mut(&txn_id) {
            txn.record_access(site_id, Operation::Write, now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::transaction::TransactionStatus;

    #[test]
    fn replicated_write_stages_on_every_up_site() {
        let mut sm = SiteManager::new(3, 4);
        sm.fail(2, 1);
        let mut tm = TransactionManager::new(3);
        tm.begin(1, 2);
        tm.write(&mut sm, 1, 2, 100, 3);
        assert_eq!(sm.site(1).data_manager.read_own(1, 2, 100), Some(100));
        assert_eq!(sm.site(3).data_manager.read_own(1, 2, 100), Some(100));
        // site 2 was down, never got the staged write
        assert_eq!(sm.site(2).data_manager.read_own(1, 2, 100), Some(20));
        assert_eq!(tm.transaction(1).unwrap().status, TransactionStatus::Running);
    }

    #[test]
    fn nonreplicated_write_to_down_site_is_a_silent_noop() {
        let mut sm = SiteManager::new(10, 4);
        sm.fail(2, 1); // x1's home site
        let mut tm = TransactionManager::new(10);
        tm.begin(1, 2);
        tm.write(&mut sm, 1, 1, 999, 3);
        assert!(tm.transaction(1).unwrap().sites_accessed.is_empty());
    }
}
