//! Instruction tokenizer: parses one textual instruction into a typed
//! variant with typed payloads (REDESIGN FLAGS §9 — a tagged enum
//! replaces the source's string-compared `{op, args}` pair).

use crate::model::ids::{SiteId, TransactionId, VariableId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Begin(TransactionId),
    Read(TransactionId, VariableId),
    Write(TransactionId, VariableId, i64),
    End(TransactionId),
    Fail(SiteId),
    Recover(SiteId),
    Dump,
}

impl Instruction {
    /// True for the instructions the simulator routes to the site
    /// manager rather than the transaction manager.
    pub fn is_site_directed(&self) -> bool {
        matches!(self, Instruction::Fail(_) | Instruction::Recover(_) | Instruction::Dump)
    }
}

fn parse_txn_id(s: &str) -> Result<TransactionId, String> {
    let s = s.trim();
    s.strip_prefix('T')
        .ok_or_else(|| format!("expected a transaction name like T1, got '{}'", s))?
        .parse()
        .map_err(|_| format!("transaction name '{}' has a non-numeric id", s))
}

fn parse_var_id(s: &str) -> Result<VariableId, String> {
    let s = s.trim();
    s.strip_prefix('x')
        .ok_or_else(|| format!("expected a variable name like x1, got '{}'", s))?
        .parse()
        .map_err(|_| format!("variable name '{}' has a non-numeric id", s))
}

fn parse_site_id(s: &str) -> Result<SiteId, String> {
    s.trim()
        .parse()
        .map_err(|_| format!("expected a numeric site id, got '{}'", s))
}

/// Parse one `name(arg1, arg2, ...)` instruction. Whitespace around
/// arguments is ignored. Returns `Err` (message, not a thrown
/// exception) for anything malformed — the caller logs and skips it.
pub fn parse_instruction(text: &str) -> Result<Instruction, String> {
    let text = text.trim();
    let open = text
        .find('(')
        .ok_or_else(|| format!("missing '(' in instruction '{}'", text))?;
    let name = text[..open].trim();
    let close = text
        .rfind(')')
        .ok_or_else(|| format!("missing ')' in instruction '{}'", text))?;
    if close < open {
        return Err(format!("malformed parentheses in instruction '{}'", text));
    }
    let args: Vec<&str> = text[open + 1..close]
        .split(',')
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .collect();

    match name {
        "begin" => {
            require_args(&args, 1, name)?;
            Ok(Instruction::Begin(parse_txn_id(args[0])?))
        }
        "R" => {
            require_args(&args, 2, name)?;
            Ok(Instruction::Read(parse_txn_id(args[0])?, parse_var_id(args[1])?))
        }
        "W" => {
            require_args(&args, 3, name)?;
            let value: i64 = args[2]
                .parse()
                .map_err(|_| format!("write value '{}' is not an integer", args[2]))?;
            Ok(Instruction::Write(
                parse_txn_id(args[0])?,
                parse_var_id(args[1])?,
                value,
            ))
        }
        "end" => {
            require_args(&args, 1, name)?;
            Ok(Instruction::End(parse_txn_id(args[0])?))
        }
        "fail" => {
            require_args(&args, 1, name)?;
            Ok(Instruction::Fail(parse_site_id(args[0])?))
        }
        "recover" => {
            require_args(&args, 1, name)?;
            Ok(Instruction::Recover(parse_site_id(args[0])?))
        }
        "dump" => Ok(Instruction::Dump),
        other => Err(format!("unknown instruction '{}'", other)),
    }
}

fn require_args(args: &[&str], n: usize, name: &str) -> Result<(), String> {
    if args.len() != n {
        Err(format!(
            "'{}' expects {} argument(s), got {}",
            name,
            n,
            args.len()
        ))
    } else {
        Ok(())
    }
}

/// Split a raw input line on `;` into individual instruction texts,
/// dropping a leading `//` comment line entirely.
pub fn split_line(line: &str) -> Vec<&str> {
    let line = line.trim();
    if line.starts_with("//") || line.is_empty() {
        return Vec::new();
    }
    line.split(';')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && !s.starts_with("//"))
        .collect()
}
