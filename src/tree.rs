//! Tree operations: `create`, `delete`, `lookup`, `move_node`, built on the resolver
//! and inode table. The lock release on every exit path is the `LockSet`'s `Drop`,
//! not a call each function remembers to make.

use std::thread;
use std::time::Duration;

use rand::Rng;

use crate::error::TreeError;
use crate::inode::{InodeTable, Inumber, NewInodeKind};
use crate::lockset::LockSet;
use crate::path::PathName;
use crate::resolver::{resolve, TerminalMode};

/// Owns the inode table and the configuration bounds tree operations need at
/// runtime (everything else in `ServerConfig` only matters to path parsing and the
/// transport layer). Shared across worker threads behind an `Arc`.
pub struct Tree {
    table: InodeTable,
    move_backoff_ms: u64,
}

impl Tree {
    pub fn new(inode_table_size: usize, max_dir_entries: usize, move_backoff_ms: u64) -> Self {
        Tree {
            table: InodeTable::new(inode_table_size, max_dir_entries),
            move_backoff_ms,
        }
    }

    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn table(&self) -> &InodeTable {
        &self.table
    }

    /// Creates a file or directory at `path`. Fails if the parent doesn't exist, isn't
    /// a directory, already has an entry with that name, or the table is full.
    pub fn create(&self, path: &PathName, kind: NewInodeKind) -> Result<Inumber, TreeError> {
        if path.is_root() {
            return Err(TreeError::NameAlreadyExists(path.clone()));
        }
        let (parent_path, child_name) = path.split();
        let mut locks = LockSet::new(&self.table);
        let parent = resolve(&self.table, &mut locks, &parent_path, TerminalMode::Write)?;
        {
            let parent_slot = locks.get(parent);
            if !parent_slot.is_directory() {
                return Err(TreeError::NotADirectory(parent_path));
            }
            if parent_slot.name_exists(&child_name) {
                return Err(TreeError::NameAlreadyExists(path.clone()));
            }
        }
        let new = self.table.create_inode(kind)?;
        locks.add(new);
        locks.lock_last_for_write();
        locks.get_mut(parent).add_entry(new, &child_name, path)?;
        Ok(new)
    }

    /// Removes the node at `path`. Fails if it doesn't exist, is the root, or is a
    /// non-empty directory.
    pub fn delete(&self, path: &PathName) -> Result<(), TreeError> {
        if path.is_root() {
            return Err(TreeError::RootRemovalForbidden);
        }
        let (parent_path, child_name) = path.split();
        let mut locks = LockSet::new(&self.table);
        let parent = resolve(&self.table, &mut locks, &parent_path, TerminalMode::Write)?;
        let child = {
            let parent_slot = locks.get(parent);
            if !parent_slot.is_directory() {
                return Err(TreeError::NotADirectory(parent_path));
            }
            parent_slot
                .find_child(&child_name)
                .ok_or_else(|| TreeError::NotFound(path.clone()))?
        };
        locks.add(child);
        locks.lock_last_for_write();
        {
            let child_slot = locks.get(child);
            if child_slot.is_directory() && !child_slot.is_empty_dir() {
                return Err(TreeError::DirectoryNotEmpty(path.clone()));
            }
        }
        locks.get_mut(parent).remove_entry(child, path)?;
        self.table.delete_inode(child, locks.get_mut(child));
        Ok(())
    }

    /// Resolves `path` and returns its inumber. No lock is retained past the call:
    /// the returned inumber is advisory only.
    pub fn lookup(&self, path: &PathName) -> Result<Inumber, TreeError> {
        let mut locks = LockSet::new(&self.table);
        resolve(&self.table, &mut locks, path, TerminalMode::Read)
    }

    /// Moves the node at `src` to `dst`, which must not yet exist. The hardest
    /// operation here: it holds `src`'s parent and the moved node itself
    /// write-locked while it also needs to write-lock `dst`'s parent, which may be
    /// an ancestor already read-locked along `src`'s path. Rather than upgrade that
    /// read lock in place (which could deadlock against a concurrent mover doing
    /// the reverse), it releases and retries under a randomised backoff until it
    /// holds both sides at once.
    pub fn move_node(&self, src: &PathName, dst: &PathName) -> Result<(), TreeError> {
        if src == dst {
            return Err(TreeError::SamePath(src.clone()));
        }
        if dst.is_within(src) {
            return Err(TreeError::SelfNested(src.clone(), dst.clone()));
        }
        if src.is_root() || dst.is_root() {
            return Err(TreeError::RootMoveForbidden);
        }

        let (src_parent_path, src_child_name) = src.split();
        let (dst_parent_path, dst_child_name) = dst.split();

        let mut locks = LockSet::new(&self.table);

        let src_parent = resolve(&self.table, &mut locks, &src_parent_path, TerminalMode::Write)?;
        let src_child = {
            let slot = locks.get(src_parent);
            if !slot.is_directory() {
                return Err(TreeError::NotADirectory(src_parent_path));
            }
            slot.find_child(&src_child_name)
                .ok_or_else(|| TreeError::NotFound(src.clone()))?
        };
        locks.add(src_child);
        locks.lock_last_for_write();

        let dst_parent = resolve(&self.table, &mut locks, &dst_parent_path, TerminalMode::None)?;

        if dst_parent != src_parent {
            if locks.is_read_locked(dst_parent) {
                // Case A: dst_parent is an ancestor already read-locked along src's
                // descent. Drop that read lock before attempting to write-acquire it,
                // same-thread read-then-write escalation is never safe to assume.
                locks.release(dst_parent);
                self.acquire_dst_parent_write(&mut locks, dst_parent, src_child);
            } else if !locks.try_write(dst_parent) {
                // Case B: unrelated lock, contended.
                self.acquire_dst_parent_write(&mut locks, dst_parent, src_child);
            }
        }

        {
            let slot = locks.get(dst_parent);
            if !slot.is_directory() {
                return Err(TreeError::NotADirectory(dst_parent_path));
            }
            if slot.name_exists(&dst_child_name) {
                return Err(TreeError::NameAlreadyExists(dst.clone()));
            }
        }

        locks.get_mut(dst_parent).add_entry(src_child, &dst_child_name, dst)?;
        locks.get_mut(src_parent).remove_entry(src_child, src)?;
        Ok(())
    }

    /// The deadlock-avoidance loop: release the source child, block for the
    /// destination parent, then try the source child back non-blocking. If the
    /// source child loses the race, give both up and retry after a backoff that
    /// grows with the attempt count, so two movers racing for each other's locks
    /// don't livelock in lockstep.
    fn acquire_dst_parent_write(&self, locks: &mut LockSet, dst_parent: Inumber, src_child: Inumber) {
        let mut attempt: u64 = 1;
        loop {
            locks.release(src_child);
            locks.write(dst_parent);
            if locks.try_write(src_child) {
                return;
            }
            locks.release(dst_parent);
            let ceiling = self.move_backoff_ms.saturating_mul(attempt).max(1);
            let sleep_ms = rand::thread_rng().gen_range(0..ceiling);
            thread::sleep(Duration::from_millis(sleep_ms));
            attempt += 1;
        }
    }
}
