pub mod args;
pub mod config;
pub mod dispatcher;
pub mod dump;
pub mod error;
pub mod inode;
pub mod lockset;
pub mod path;
pub mod queue;
pub mod resolver;
pub mod transport;
pub mod tree;

pub use config::ServerConfig;
pub use error::{DispatchError, TreeError};
pub use inode::{InodeKind, Inumber, ROOT};
pub use path::PathName;
pub use transport::{mount, ClientError, Connection, ServerContext};
pub use tree::Tree;
