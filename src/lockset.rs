//! Per-operation ordered collection of held locks. Release is the `Drop` impl,
//! not a call the caller must remember to make on every exit path.

use std::sync::{RwLockReadGuard, RwLockWriteGuard};

use crate::inode::{InodeTable, Inumber, Slot};

enum Held<'a> {
    None,
    Read(RwLockReadGuard<'a, Slot>),
    Write(RwLockWriteGuard<'a, Slot>),
}

struct Entry<'a> {
    inumber: Inumber,
    held: Held<'a>,
}

/// Holds locks for one tree operation, in acquisition order. Locks are released in
/// reverse insertion order when the `LockSet` is dropped, regardless of which
/// exit path (success or `?`-propagated error) the caller takes.
///
/// `add` is idempotent per inumber: re-adding an inumber already in the set (which
/// happens when a move resolves a destination path that shares an ancestor with the
/// already-resolved source path) reuses the existing entry instead of acquiring a
/// second, redundant lock on it. `last_requested` tracks which inumber the *next*
/// `lock_last_for_*` call applies to, independent of the entry's position in
/// `entries` (a reused entry is rarely the last element of the vec).
pub struct LockSet<'a> {
    table: &'a InodeTable,
    entries: Vec<Entry<'a>>,
    last_requested: Option<Inumber>,
}

impl<'a> LockSet<'a> {
    pub fn new(table: &'a InodeTable) -> Self {
        LockSet { table, entries: Vec::new(), last_requested: None }
    }

    /// Records `inumber` as the target of the next `lock_last_for_*` call. Pushes a
    /// fresh, unlocked entry unless `inumber` is already tracked, in which case its
    /// existing lock state (possibly already held) is left untouched.
    pub fn add(&mut self, inumber: Inumber) {
        if self.entries.iter().all(|e| e.inumber != inumber) {
            self.entries.push(Entry { inumber, held: Held::None });
        }
        self.last_requested = Some(inumber);
    }

    fn index_of(&self, inumber: Inumber) -> usize {
        self.entries
            .iter()
            .position(|e| e.inumber == inumber)
            .expect("inumber must have been added before locking")
    }

    fn last(&self) -> Inumber {
        self.last_requested.expect("lock-set has no pending request")
    }

    /// Acquires the lock of the most recently requested inumber for reading. A no-op
    /// if that inumber is already held (for read or write) from an earlier request.
    pub fn lock_last_for_read(&mut self) -> &Slot {
        let inumber = self.last();
        let idx = self.index_of(inumber);
        if matches!(self.entries[idx].held, Held::None) {
            self.entries[idx].held = Held::Read(self.table.lock(inumber).read().unwrap());
        }
        self.get(inumber)
    }

    /// Acquires the lock of the most recently requested inumber for writing.
    pub fn lock_last_for_write(&mut self) -> &mut Slot {
        let inumber = self.last();
        let idx = self.index_of(inumber);
        self.entries[idx].held = Held::Write(self.table.lock(inumber).write().unwrap());
        self.get_mut(inumber)
    }

    /// Non-blocking write attempt on the most recently requested inumber.
    pub fn try_lock_last_for_write(&mut self) -> bool {
        self.try_write(self.last())
    }

    /// Non-blocking write attempt on an already-added inumber (used to probe a
    /// destination parent without blocking).
    pub fn try_write(&mut self, inumber: Inumber) -> bool {
        let idx = self.index_of(inumber);
        match self.table.lock(inumber).try_write() {
            Ok(guard) => {
                self.entries[idx].held = Held::Write(guard);
                true
            }
            Err(_) => false,
        }
    }

    /// Blocking write acquire on an already-added inumber (used in the move
    /// deadlock-avoidance loop).
    pub fn write(&mut self, inumber: Inumber) {
        let idx = self.index_of(inumber);
        self.entries[idx].held = Held::Write(self.table.lock(inumber).write().unwrap());
    }

    /// Releases whichever lock is currently held for `inumber`, if any, keeping the
    /// inumber recorded in the set (so a later call can re-lock it, and so final
    /// `Drop` cleanup doesn't double-release). Returns whether a lock was held.
    pub fn release(&mut self, inumber: Inumber) -> bool {
        let idx = self.index_of(inumber);
        let was_held = !matches!(self.entries[idx].held, Held::None);
        self.entries[idx].held = Held::None;
        was_held
    }

    pub fn is_write_locked(&self, inumber: Inumber) -> bool {
        let idx = self.index_of(inumber);
        matches!(self.entries[idx].held, Held::Write(_))
    }

    pub fn is_read_locked(&self, inumber: Inumber) -> bool {
        let idx = self.index_of(inumber);
        matches!(self.entries[idx].held, Held::Read(_))
    }

    pub fn is_locked(&self, inumber: Inumber) -> bool {
        let idx = self.index_of(inumber);
        !matches!(self.entries[idx].held, Held::None)
    }

    /// True if `inumber` has already been recorded in this set (regardless of
    /// whether it is currently locked). Used to tell whether a destination parent
    /// coincides with a node already visited while resolving the source path.
    pub fn contains(&self, inumber: Inumber) -> bool {
        self.entries.iter().any(|e| e.inumber == inumber)
    }

    pub fn get(&self, inumber: Inumber) -> &Slot {
        let idx = self.index_of(inumber);
        match &self.entries[idx].held {
            Held::Read(g) => g,
            Held::Write(g) => g,
            Held::None => panic!("inumber {} is not locked", inumber),
        }
    }

    pub fn get_mut(&mut self, inumber: Inumber) -> &mut Slot {
        let idx = self.index_of(inumber);
        match &mut self.entries[idx].held {
            Held::Write(g) => g,
            Held::Read(_) => panic!("inumber {} is only read-locked", inumber),
            Held::None => panic!("inumber {} is not locked", inumber),
        }
    }

    pub fn last_inumber(&self) -> Inumber {
        self.last()
    }
}

impl<'a> Drop for LockSet<'a> {
    fn drop(&mut self) {
        // Release in reverse insertion order: drain the entry vec back-to-front.
        while let Some(entry) = self.entries.pop() {
            drop(entry.held);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inode::{NewInodeKind, ROOT};

    #[test]
    fn read_then_write_on_distinct_inumbers() {
        let table = InodeTable::new(10, 20);
        let child = table.create_inode(NewInodeKind::File).unwrap();
        let mut locks = LockSet::new(&table);
        locks.add(ROOT);
        locks.lock_last_for_read();
        assert!(locks.get(ROOT).is_directory());
        locks.add(child);
        locks.lock_last_for_write();
        assert!(!locks.get(child).is_directory());
    }

    #[test]
    fn release_allows_relock() {
        let table = InodeTable::new(10, 20);
        let mut locks = LockSet::new(&table);
        locks.add(ROOT);
        locks.lock_last_for_read();
        locks.release(ROOT);
        assert!(locks.try_write(ROOT));
        assert!(locks.is_write_locked(ROOT));
    }

    #[test]
    fn drop_releases_all_locks() {
        let table = InodeTable::new(10, 20);
        {
            let mut locks = LockSet::new(&table);
            locks.add(ROOT);
            locks.lock_last_for_write();
        }
        // if the write lock had leaked, this would deadlock/panic on a poisoned lock
        let _ = table.lock(ROOT).write().unwrap();
    }
}
