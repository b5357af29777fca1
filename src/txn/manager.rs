//! Transaction lifecycle state shared by the read rule, write rule, and
//! end-of-transaction validator (split across sibling modules the way
//! the teacher splits executor operations across `executor/{ddl,dml,
//! query,transaction}.rs`).

use std::collections::HashMap;

use crate::model::ids::{SiteId, Time, TransactionId, VariableId};
use crate::model::transaction::Transaction;
use crate::txn::graph::SerializationGraph;

/// Which operations a transaction has performed against one variable.
/// A multiset collapsed to two flags — order never matters to the
/// validator, only "did T read x" / "did T write x".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VarAccess {
    pub read: bool,
    pub write: bool,
}

pub struct TransactionManager {
    pub(crate) num_sites: u32,
    pub(crate) transactions: HashMap<TransactionId, Transaction>,
    pub(crate) access_log: HashMap<TransactionId, HashMap<VariableId, VarAccess>>,
    pub(crate) graph: SerializationGraph,
}

impl TransactionManager {
    pub fn new(num_sites: u32) -> Self {
        TransactionManager {
            num_sites,
            transactions: HashMap::new(),
            access_log: HashMap::new(),
            graph: SerializationGraph::new(),
        }
    }

    /// Non-replicated variable's sole home site.
    pub(crate) fn home_site(&self, v: VariableId) -> SiteId {
        crate::model::data_manager::home_site_of(v, self.num_sites)
    }

    pub fn begin(&mut self, txn_id: TransactionId, now: Time) {
        log::info!("Starting T{}", txn_id);
        self.transactions.insert(txn_id, Transaction::new(txn_id, now));
    }

    pub fn transaction(&self, txn_id: TransactionId) -> Option<&Transaction> {
        self.transactions.get(&txn_id)
    }

    pub(crate) fn note_access(&mut self, txn_id: TransactionId, v: VariableId, op: crate::model::ids::Operation) {
        let entry = self
            .access_log
            .entry(txn_id)
            .or_default()
            .entry(v)
            .or_default();
        match op {
            crate::model::ids::Operation::Read => entry.read = true,
            crate::model::ids::Operation::Write => entry.write = true,
        }
    }

    /// All transaction ids currently known, for iterating the
    /// committed-transaction universe during end-of-transaction edge
    /// construction.
    pub(crate) fn all_ids_sorted(&self) -> Vec<TransactionId> {
        let mut ids: Vec<TransactionId> = self.transactions.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
