//! The dispatcher (module F): ticks the logical clock and routes each
//! parsed instruction to the site manager or the transaction manager.

use std::io::{BufRead, Write};

use log::error;

use crate::error::{RepCRecError, Result};
use crate::instruction::{parse_instruction, split_line, Instruction};
use crate::model::ids::Time;
use crate::model::site_manager::SiteManager;
use crate::txn::TransactionManager;

/// Owns the two subsystems and the clock that drives them.
pub struct Simulator {
    site_manager: SiteManager,
    transaction_manager: TransactionManager,
    current_time: Time,
}

impl Simulator {
    pub fn new(num_sites: u32, num_variables: u32) -> Self {
        Simulator {
            site_manager: SiteManager::new(num_sites, num_variables),
            transaction_manager: TransactionManager::new(num_sites),
            current_time: 0,
        }
    }

    /// Run the full instruction stream from `input`, writing `dump`
    /// output to `out`. Malformed lines are logged and skipped; the run
    /// never aborts because of one.
    ///
    /// Mirrors `original_source/Simulator.py.run`'s clock cadence
    /// exactly, including its quirk of bumping `current_time` once
    /// before the first line is dispatched — a tick whose value is
    /// immediately overwritten by the per-instruction increment inside
    /// the loop, so the first dispatched instruction actually runs at
    /// time 2, not 1.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> Result<()> {
        self.current_time += 1;

        for line in input.lines() {
            let line = line?;
            for text in split_line(&line) {
                self.current_time += 1;
                self.dispatch(text, &mut out)?;
            }
        }
        Ok(())
    }

    /// Parse one instruction and route it to the site manager or the
    /// transaction manager, the same membership test `Simulator.py.run`
    /// does against `SITE_MANAGER_FUNCS` before dispatching.
    fn dispatch<W: Write>(&mut self, text: &str, out: &mut W) -> Result<()> {
        let instruction = match parse_instruction(text) {
            Ok(i) => i,
            Err(msg) => {
                let err = RepCRecError::Parse(msg);
                error!("Malformed instruction '{}': {}", text, err);
                return Ok(());
            }
        };

        if instruction.is_site_directed() {
            self.dispatch_to_site_manager(instruction, out)?;
        } else {
            self.dispatch_to_transaction_manager(instruction);
        }
        Ok(())
    }

    fn dispatch_to_site_manager<W: Write>(&mut self, instruction: Instruction, out: &mut W) -> Result<()> {
        match instruction {
            Instruction::Fail(site_id) => {
                self.site_manager.fail(site_id, self.current_time);
            }
            Instruction::Recover(site_id) => {
                let reactivated = self.site_manager.recover(site_id, self.current_time);
                for candidate in reactivated {
                    self.transaction_manager.reactivate(&self.site_manager, candidate);
                }
            }
            Instruction::Dump => {
                write!(out, "{}", self.site_manager.dump())?;
            }
            _ => unreachable!("is_site_directed() guarantees only Fail/Recover/Dump reach here"),
        }
        Ok(())
    }

    fn dispatch_to_transaction_manager(&mut self, instruction: Instruction) {
        match instruction {
            Instruction::Begin(txn_id) => {
                self.transaction_manager.begin(txn_id, self.current_time);
            }
            Instruction::Read(txn_id, v) => {
                self.transaction_manager
                    .read(&mut self.site_manager, txn_id, v, self.current_time);
            }
            Instruction::Write(txn_id, v, value) => {
                self.transaction_manager
                    .write(&mut self.site_manager, txn_id, v, value, self.current_time);
            }
            Instruction::End(txn_id) => {
                self.transaction_manager
                    .end(&mut self.site_manager, txn_id, self.current_time);
            }
            _ => unreachable!("is_site_directed() guarantees Fail/Recover/Dump never reach here"),
        }
    }

    pub fn transaction_manager(&self) -> &TransactionManager {
        &self.transaction_manager
    }

    pub fn site_manager(&self) -> &SiteManager {
        &self.site_manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::transaction::TransactionStatus;
    use std::io::Cursor;

    #[test]
    fn basic_replicated_read_scenario() {
        let mut sim = Simulator::new(10, 20);
        let script = "begin(T1); R(T1, x2); end(T1)";
        let mut out = Vec::new();
        sim.run(Cursor::new(script), &mut out).unwrap();
        assert_eq!(
            sim.transaction_manager().transaction(1).unwrap().status,
            TransactionStatus::Committed
        );
    }

    #[test]
    fn dump_writes_site_lines() {
        let mut sim = Simulator::new(2, 4);
        let mut out = Vec::new();
        sim.run(Cursor::new("dump()"), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Site 1 -"));
        assert!(text.contains("Site 2 -"));
    }

    #[test]
    fn malformed_line_is_skipped_not_fatal() {
        let mut sim = Simulator::new(2, 4);
        let mut out = Vec::new();
        let script = "bogus(T1); begin(T1); end(T1)";
        sim.run(Cursor::new(script), &mut out).unwrap();
        assert_eq!(
            sim.transaction_manager().transaction(1).unwrap().status,
            TransactionStatus::Committed
        );
    }
}
