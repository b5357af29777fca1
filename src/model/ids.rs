//! Shared identifier aliases and small enums used across the data model.

/// Identifier of a transaction (the `N` in `TN`).
pub type TransactionId = u32;

/// Identifier of a variable (the `N` in `xN`), 1-based.
pub type VariableId = u32;

/// Identifier of a site, 1-based.
pub type SiteId = u32;

/// Logical clock reading. The simulator has no wall-clock time, only
/// this monotonically increasing counter.
pub type Time = u64;

/// A read or a write, as recorded in a transaction's access log and
/// site-access list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Read,
    Write,
}

impl Operation {
    pub fn as_letter(self) -> char {
        match self {
            Operation::Read => 'R',
            Operation::Write => 'W',
        }
    }
}
