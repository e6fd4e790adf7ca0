use thiserror::Error;

use crate::path::PathName;

pub type Result<T> = std::result::Result<T, TreeError>;

/// Errors produced by tree operations: operation-level, expected, reported to the
/// client as status `-1`, never a side effect.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TreeError {
    #[error("node at path '{0}' not found")]
    NotFound(PathName),
    #[error("'{0}' is not a directory")]
    NotADirectory(PathName),
    #[error("node at '{0}' already exists")]
    NameAlreadyExists(PathName),
    #[error("directory '{0}' is not empty")]
    DirectoryNotEmpty(PathName),
    #[error("removing root is forbidden")]
    RootRemovalForbidden,
    #[error("moving root is forbidden")]
    RootMoveForbidden,
    #[error("inode table is full")]
    TableFull,
    #[error("directory '{0}' has no free entry slots")]
    DirectoryFull(PathName),
    #[error("invalid path '{0}'")]
    InvalidPath(PathName),
    #[error("name '{0}' exceeds the maximum name length")]
    NameTooLong(String),
    #[error("cannot move '{0}' into its own subtree at '{1}'")]
    SelfNested(PathName, PathName),
    #[error("source and destination paths are identical: '{0}'")]
    SamePath(PathName),
}

/// Errors produced while parsing a single request line: protocol/parse error,
/// reported as `-1`, server continues.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DispatchError {
    #[error("empty command")]
    EmptyCommand,
    #[error("unknown opcode '{0}'")]
    UnknownOpcode(char),
    #[error("malformed command: '{0}'")]
    Malformed(String),
    #[error("unknown node kind '{0}', expected 'f' or 'd'")]
    UnknownKind(char),
}
