//! Command parsing and dispatch: turns a request line into a `Command`, then runs
//! it against a `Tree`.

use crate::error::DispatchError;
use crate::inode::NewInodeKind;
use crate::path::PathName;
use crate::tree::Tree;

/// A parsed request line, ready to run against a `Tree`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create(PathName, NewInodeKind),
    Delete(PathName),
    Lookup(PathName),
    Move(PathName, PathName),
    /// `p <file>`: dump the tree to `file`. This is a barrier operation; the
    /// barrier choreography lives in the transport layer, not here — `apply` just
    /// performs the dump once it is safe to do so.
    Dump(String),
}

/// Parses one request line (`c <name> f|d`, `l <name>`, `d <name>`, `m <src> <dst>`,
/// `p <file>`) into a `Command`. Paths are validated against `max_name_len`/
/// `max_path_len` as part of parsing.
pub fn parse(line: &str, max_name_len: usize, max_path_len: usize) -> Result<Command, DispatchError> {
    let mut tokens = line.split_whitespace();
    let opcode = tokens
        .next()
        .and_then(|t| t.chars().next())
        .ok_or(DispatchError::EmptyCommand)?;

    let path_of = |raw: &str| -> Result<PathName, DispatchError> {
        PathName::parse(raw, max_name_len, max_path_len)
            .map_err(|_| DispatchError::Malformed(line.to_string()))
    };

    match opcode {
        'c' => {
            let name = tokens.next().ok_or_else(|| DispatchError::Malformed(line.to_string()))?;
            let kind = tokens.next().ok_or_else(|| DispatchError::Malformed(line.to_string()))?;
            if tokens.next().is_some() {
                return Err(DispatchError::Malformed(line.to_string()));
            }
            let kind = match kind {
                "f" => NewInodeKind::File,
                "d" => NewInodeKind::Directory,
                other => {
                    return Err(DispatchError::UnknownKind(
                        other.chars().next().unwrap_or('?'),
                    ))
                }
            };
            Ok(Command::Create(path_of(name)?, kind))
        }
        'l' => {
            let name = tokens.next().ok_or_else(|| DispatchError::Malformed(line.to_string()))?;
            if tokens.next().is_some() {
                return Err(DispatchError::Malformed(line.to_string()));
            }
            Ok(Command::Lookup(path_of(name)?))
        }
        'd' => {
            let name = tokens.next().ok_or_else(|| DispatchError::Malformed(line.to_string()))?;
            if tokens.next().is_some() {
                return Err(DispatchError::Malformed(line.to_string()));
            }
            Ok(Command::Delete(path_of(name)?))
        }
        'm' => {
            let src = tokens.next().ok_or_else(|| DispatchError::Malformed(line.to_string()))?;
            let dst = tokens.next().ok_or_else(|| DispatchError::Malformed(line.to_string()))?;
            if tokens.next().is_some() {
                return Err(DispatchError::Malformed(line.to_string()));
            }
            Ok(Command::Move(path_of(src)?, path_of(dst)?))
        }
        'p' => {
            let file = tokens.next().ok_or_else(|| DispatchError::Malformed(line.to_string()))?;
            if tokens.next().is_some() {
                return Err(DispatchError::Malformed(line.to_string()));
            }
            Ok(Command::Dump(file.to_string()))
        }
        other => Err(DispatchError::UnknownOpcode(other)),
    }
}

/// Runs a parsed command against `tree` and returns the wire-protocol status: the
/// resolved inumber for a successful `lookup`, `0` for any other success, `-1` on
/// failure. `Dump` is executed here too — the caller is responsible for having
/// already done any barrier synchronisation a dump requires before calling `apply`
/// with a `Command::Dump`.
pub fn apply(tree: &Tree, command: &Command) -> i32 {
    match command {
        Command::Create(path, kind) => match tree.create(path, *kind) {
            Ok(_) => 0,
            Err(_) => -1,
        },
        Command::Delete(path) => match tree.delete(path) {
            Ok(()) => 0,
            Err(_) => -1,
        },
        Command::Lookup(path) => match tree.lookup(path) {
            Ok(inumber) => inumber.0 as i32,
            Err(_) => -1,
        },
        Command::Move(src, dst) => match tree.move_node(src, dst) {
            Ok(()) => 0,
            Err(_) => -1,
        },
        Command::Dump(file) => match crate::dump::dump_to_file(tree, file) {
            Ok(()) => 0,
            Err(_) => -1,
        },
    }
}
