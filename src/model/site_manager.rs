//! Fleet of sites: failure/recovery histories, pending-read queues, dump.

use std::collections::HashMap;
use std::fmt::Write as _;

use log::{debug, info};

use crate::model::ids::{SiteId, Time, TransactionId, VariableId};
use crate::model::site::{Site, SiteStatus};

/// A pending read that became servable because its site just recovered.
/// The caller (the transaction manager) is responsible for checking the
/// transaction is still `Waiting` before acting on this — a transaction
/// may have been independently aborted while queued.
#[derive(Debug, Clone, Copy)]
pub struct ReactivatedRead {
    pub txn_id: TransactionId,
    pub variable: VariableId,
    pub serving_site: SiteId,
}

pub struct SiteManager {
    num_sites: u32,
    /// 0-indexed storage for sites `1..=num_sites`.
    sites: Vec<Site>,
    /// Seeded with `[0]` per site (sentinel: "just became live at time 0").
    failure_history: HashMap<SiteId, Vec<Time>>,
    /// Empty until the first real recovery (equivalent to the source's
    /// `[+inf]` sentinel: "length > 1" there is "non-empty" here).
    recovery_history: HashMap<SiteId, Vec<Time>>,
    /// Non-replicated reads blocked on a Down home site.
    pending_reads_nonrepl: HashMap<SiteId, Vec<(TransactionId, VariableId)>>,
    /// Replicated reads blocked on a Down replica, keyed by variable.
    pending_reads_repl: HashMap<SiteId, HashMap<VariableId, Vec<TransactionId>>>,
}

impl SiteManager {
    pub fn new(num_sites: u32, num_variables: u32) -> Self {
        let mut sites = Vec::with_capacity(num_sites as usize);
        let mut failure_history = HashMap::new();
        let mut recovery_history = HashMap::new();
        for id in 1..=num_sites {
            sites.push(Site::new(id, num_variables, num_sites));
            failure_history.insert(id, vec![0]);
            recovery_history.insert(id, Vec::new());
        }
        SiteManager {
            num_sites,
            sites,
            failure_history,
            recovery_history,
            pending_reads_nonrepl: HashMap::new(),
            pending_reads_repl: HashMap::new(),
        }
    }

    pub fn num_sites(&self) -> u32 {
        self.num_sites
    }

    pub fn site(&self, id: SiteId) -> &Site {
        &self.sites[(id - 1) as usize]
    }

    pub fn site_mut(&mut self, id: SiteId) -> &mut Site {
        &mut self.sites[(id - 1) as usize]
    }

    pub fn all_site_ids(&self) -> impl Iterator<Item = SiteId> + '_ {
        self.sites.iter().map(|s| s.id)
    }

    pub fn failure_history(&self, id: SiteId) -> &[Time] {
        &self.failure_history[&id]
    }

    pub fn recovery_history(&self, id: SiteId) -> &[Time] {
        &self.recovery_history[&id]
    }

    pub fn enqueue_nonrepl_wait(&mut self, site_id: SiteId, txn_id: TransactionId, v: VariableId) {
        self.pending_reads_nonrepl
            .entry(site_id)
            .or_default()
            .push((txn_id, v));
    }

    pub fn enqueue_repl_wait(&mut self, site_id: SiteId, v: VariableId, txn_id: TransactionId) {
        self.pending_reads_repl
            .entry(site_id)
            .or_default()
            .entry(v)
            .or_default()
            .push(txn_id);
    }

    /// Fail a site: mark it Down and record the failure time. Pending
    /// reads remain queued.
    pub fn fail(&mut self, site_id: SiteId, now: Time) {
        info!("Site {} failed", site_id);
        self.site_mut(site_id).fail();
        self.failure_history.entry(site_id).or_default().push(now);
    }

    /// Recover a site: mark it Recovered, record the recovery time, and
    /// service every pending read this site can now satisfy. Once any
    /// replica serves a replicated read, that variable's pending queue
    /// is cleared at every site — other sites' entries for it are
    /// obsolete now that the transaction is Running again.
    pub fn recover(&mut self, site_id: SiteId, now: Time) -> Vec<ReactivatedRead> {
        info!("Site {} recovered", site_id);
        self.site_mut(site_id).recover();
        self.recovery_history.entry(site_id).or_default().push(now);

        let mut reactivated = Vec::new();

        let mut cleared_variables = Vec::new();
        if let Some(pending) = self.pending_reads_repl.get(&site_id) {
            for (&v, txns) in pending {
                if !txns.is_empty() {
                    debug!(
                        "Servicing pending replicated reads for x{} from site {}",
                        v, site_id
                    );
                    for &txn_id in txns {
                        reactivated.push(ReactivatedRead {
                            txn_id,
                            variable: v,
                            serving_site: site_id,
                        });
                    }
                    cleared_variables.push(v);
                }
            }
        }
        for v in &cleared_variables {
            for queue in self.pending_reads_repl.values_mut() {
                if let Some(txns) = queue.get_mut(v) {
                    txns.clear();
                }
            }
        }

        if let Some(queue) = self.pending_reads_nonrepl.remove(&site_id) {
            for (txn_id, v) in queue {
                reactivated.push(ReactivatedRead {
                    txn_id,
                    variable: v,
                    serving_site: site_id,
                });
            }
        }

        reactivated
    }

    /// Print every site, every variable, current committed value, in
    /// site then variable order. `original_source/SiteManager.py.dump`
    /// opens every per-site line with a blank line (`print("\nSite " +
    /// str(i) + " -", ...)`, not just the last one), so a blank line
    /// precedes each `Site N` block here too, plus one more after the
    /// final site.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for site in &self.sites {
            writeln!(out).unwrap();
            write!(out, "Site {} -", site.id).unwrap();
            for var in site.data_manager.variables_sorted() {
                write!(out, " {} : {},", var.name, var.current_value()).unwrap();
            }
            writeln!(out).unwrap();
        }
        writeln!(out).unwrap();
        out
    }

    /// True iff `site_id`'s status is Up or Recovered.
    pub fn is_available(&self, site_id: SiteId) -> bool {
        self.site(site_id).is_readable_or_writable()
    }

    pub fn status(&self, site_id: SiteId) -> SiteStatus {
        self.site(site_id).status
    }
}
