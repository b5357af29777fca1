//! A running (or finished) transaction.

use crate::model::ids::{Operation, SiteId, Time, TransactionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Running,
    Waiting,
    Aborted,
    Committed,
}

pub struct Transaction {
    pub id: TransactionId,
    pub name: String,
    pub status: TransactionStatus,
    pub start_time: Time,
    pub commit_time: Option<Time>,
    /// Ordered `(site_id, op, time)` triples — the authoritative record
    /// of which sites this transaction actually touched.
    pub sites_accessed: Vec<(SiteId, Operation, Time)>,
}

impl Transaction {
    pub fn new(id: TransactionId, start_time: Time) -> Self {
        Transaction {
            id,
            name: format!("T{}", id),
            status: TransactionStatus::Running,
            start_time,
            commit_time: None,
            sites_accessed: Vec::new(),
        }
    }

    pub fn record_access(&mut self, site_id: SiteId, op: Operation, time: Time) {
        self.sites_accessed.push((site_id, op, time));
    }

    /// Terminal states (`Aborted`, `Committed`) never transition further.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            TransactionStatus::Aborted | TransactionStatus::Committed
        )
    }
}
