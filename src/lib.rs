//! RepCRec — a discrete-event simulator for a replicated, multi-version
//! database under Serializable Snapshot Isolation with an
//! Available-Copies replication policy.

pub mod error;
pub mod instruction;
pub mod model;
pub mod simulator;
pub mod txn;

use crate::simulator::Simulator;

/// Runtime-tunable knobs: fleet size and variable count. Mirrors
/// `original_source/start.py`'s `plac`-annotated `num_sites` and
/// `num_variables` parameters.
#[derive(Clone, Debug)]
pub struct Config {
    pub num_sites: u32,
    pub num_variables: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            num_sites: 10,
            num_variables: 20,
        }
    }
}

/// Build a fresh `Simulator` from a `Config`.
pub fn new_simulator(config: &Config) -> Simulator {
    Simulator::new(config.num_sites, config.num_variables)
}
