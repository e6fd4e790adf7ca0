//! Fixed-size inode table: a pool of slots, each independently lockable, each
//! either free or holding a file or directory.

use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::{Mutex, RwLock};

use crate::error::TreeError;
use crate::path::{Name, PathName};

/// Small integer identifier of an inode slot. Inumber 0 is always the root directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Inumber(pub usize);

pub const ROOT: Inumber = Inumber(0);

impl Display for Inumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One directory entry, `inumber = FREE` slots are simply absent from the `Vec`
/// (modeled as `None` in the fixed-capacity backing array).
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub inumber: Inumber,
    pub name: Name,
}

/// The kind requested when allocating a new inode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewInodeKind {
    File,
    Directory,
}

/// Tagged inode payload. The file variant carries no data: file content I/O is out
/// of scope here.
#[derive(Debug, Clone)]
pub enum InodeKind {
    File,
    Directory(Vec<Option<DirEntry>>),
}

/// The contents of one inode slot. `None` means `FREE`.
#[derive(Debug, Clone)]
pub struct Slot {
    kind: Option<InodeKind>,
}

impl Slot {
    fn free() -> Self {
        Slot { kind: None }
    }

    pub fn is_free(&self) -> bool {
        self.kind.is_none()
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, Some(InodeKind::Directory(_)))
    }

    /// Live (non-`FREE`) entries of a directory slot, as `(inumber, name)` pairs.
    /// Panics if called on a file slot — callers must check `is_directory` first.
    pub fn entries(&self) -> Vec<(Inumber, &str)> {
        match &self.kind {
            Some(InodeKind::Directory(entries)) => entries
                .iter()
                .filter_map(|e| e.as_ref().map(|e| (e.inumber, e.name.as_str())))
                .collect(),
            _ => panic!("entries() called on a non-directory inode"),
        }
    }

    pub fn is_empty_dir(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn find_child(&self, name: &str) -> Option<Inumber> {
        self.entries()
            .into_iter()
            .find(|(_, n)| *n == name)
            .map(|(i, _)| i)
    }

    pub fn name_exists(&self, name: &str) -> bool {
        self.find_child(name).is_some()
    }

    /// Resets a slot to `FREE`. The caller is expected to already hold this slot's
    /// own write lock (via its lock-set); this never locks anything itself.
    pub fn clear(&mut self) {
        self.kind = None;
    }

    /// Inserts into the first free entry slot. Does not check uniqueness — the
    /// caller must have already looked up.
    pub fn add_entry(&mut self, child: Inumber, name: &str, path: &PathName) -> Result<(), TreeError> {
        match &mut self.kind {
            Some(InodeKind::Directory(entries)) => {
                for slot in entries.iter_mut() {
                    if slot.is_none() {
                        *slot = Some(DirEntry {
                            inumber: child,
                            name: name.to_string(),
                        });
                        return Ok(());
                    }
                }
                Err(TreeError::DirectoryFull(path.clone()))
            }
            _ => Err(TreeError::NotADirectory(path.clone())),
        }
    }

    /// Removes the entry with matching `child`.
    pub fn remove_entry(&mut self, child: Inumber, path: &PathName) -> Result<(), TreeError> {
        match &mut self.kind {
            Some(InodeKind::Directory(entries)) => {
                for slot in entries.iter_mut() {
                    if matches!(slot, Some(e) if e.inumber == child) {
                        *slot = None;
                        return Ok(());
                    }
                }
                Err(TreeError::NotFound(path.clone()))
            }
            _ => Err(TreeError::NotADirectory(path.clone())),
        }
    }
}

/// Fixed-capacity pool of inode slots, each owning a private read/write lock.
/// Allocation state (which inumbers are free) is tracked separately, in its own
/// mutex, rather than by probing each slot's own `RwLock` in turn: a caller
/// allocating or freeing an inode commonly already holds that inode's *parent* (or,
/// on delete, the inode itself) write-locked through its lock-set, and `RwLock` is
/// not reentrant, so re-locking a slot the calling thread already holds would
/// self-deadlock. The free-list mutex is held only long enough to pop or push an
/// index; it is never held while touching slot content.
pub struct InodeTable {
    slots: Vec<RwLock<Slot>>,
    free_list: Mutex<VecDeque<usize>>,
    max_dir_entries: usize,
}

impl InodeTable {
    pub fn new(capacity: usize, max_dir_entries: usize) -> Self {
        let mut slots: Vec<RwLock<Slot>> = (0..capacity).map(|_| RwLock::new(Slot::free())).collect();
        slots[ROOT.0] = RwLock::new(Slot {
            kind: Some(InodeKind::Directory(vec![None; max_dir_entries])),
        });
        let free_list: VecDeque<usize> = (1..capacity).collect();
        InodeTable { slots, free_list: Mutex::new(free_list), max_dir_entries }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Per-slot lock, borrowed for the lifetime of the table: the table exclusively
    /// owns every slot and its lock, everyone else borrows by inumber.
    pub fn lock(&self, inumber: Inumber) -> &RwLock<Slot> {
        &self.slots[inumber.0]
    }

    /// Pops the lowest free inumber and marks it `IN_USE` with the given kind. Fails
    /// with `TableFull` when none is free. The popped inumber cannot coincide with
    /// any lock the calling thread already holds (it was, by definition, unused),
    /// so write-locking it here is always safe.
    pub fn create_inode(&self, kind: NewInodeKind) -> Result<Inumber, TreeError> {
        let index = self.free_list.lock().unwrap().pop_front().ok_or(TreeError::TableFull)?;
        let inumber = Inumber(index);
        let mut guard = self.lock(inumber).write().unwrap();
        guard.kind = Some(match kind {
            NewInodeKind::File => InodeKind::File,
            NewInodeKind::Directory => InodeKind::Directory(vec![None; self.max_dir_entries]),
        });
        Ok(inumber)
    }

    /// Resets `slot` to `FREE` and returns its inumber to the free list. `slot` must
    /// be the `&mut Slot` the caller already holds write-locked (through its
    /// lock-set) for `inumber` — this never re-acquires that slot's own lock, so it
    /// cannot deadlock against the write guard the caller is still holding.
    pub fn delete_inode(&self, inumber: Inumber, slot: &mut Slot) {
        slot.clear();
        self.free_list.lock().unwrap().push_back(inumber.0);
    }
}
