//! Path resolution: a single loop that, at each step, adds the current node's lock
//! to the set, then either (a) finds no segment left to consume — in which case
//! `current` is already the fully resolved target and gets locked in
//! `terminal_mode` — or (b) read-locks `current` as an ancestor and descends into
//! the child named by the next segment. The target itself is always locked in
//! `terminal_mode`, never its parent: `current` only advances to a child once that
//! child has been looked up, so the segment that ends the loop is the one that
//! named the node already sitting in `current`.

use crate::error::TreeError;
use crate::inode::{InodeTable, Inumber, ROOT};
use crate::lockset::LockSet;
use crate::path::PathName;

/// What to do with the final resolved node's lock once the walk reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalMode {
    Read,
    Write,
    /// Record the node in the lock-set without locking it. `move_node` probes the
    /// destination parent this way before deciding whether it can write-lock it
    /// immediately or must go through the deadlock-avoidance loop.
    None,
}

/// Walks `path` from the root, acquiring a read lock on every ancestor and applying
/// `terminal_mode` to the final node, then returns that node's inumber.
///
/// Every node visited — ancestors and target alike — is added to `locks` in descent
/// order, so releasing `locks` (on drop, or this operation's error exit) unwinds them
/// root-to-leaf in reverse. Fails with `NotFound` if any segment names a nonexistent
/// child, or if an intermediate segment names something that isn't a directory.
pub fn resolve<'a>(
    table: &'a InodeTable,
    locks: &mut LockSet<'a>,
    path: &PathName,
    terminal_mode: TerminalMode,
) -> Result<Inumber, TreeError> {
    let segments = path.segments();
    let mut current = ROOT;
    let mut next_segment = segments.into_iter();

    loop {
        locks.add(current);
        match next_segment.next() {
            None => {
                match terminal_mode {
                    TerminalMode::Read => {
                        locks.lock_last_for_read();
                    }
                    TerminalMode::Write => {
                        locks.lock_last_for_write();
                    }
                    TerminalMode::None => {}
                }
                return Ok(current);
            }
            Some(name) => {
                let slot = locks.lock_last_for_read();
                if !slot.is_directory() {
                    return Err(TreeError::NotFound(path.clone()));
                }
                current = slot
                    .find_child(name)
                    .ok_or_else(|| TreeError::NotFound(path.clone()))?;
            }
        }
    }
}
