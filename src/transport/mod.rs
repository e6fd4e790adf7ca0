//! UNIX-domain datagram transport (§4.5, §6). Grounded on
//! `original_source/v3/server/tecnicofs-server.c` (listener + worker pool) and
//! `original_source/v3/client/tecnicofs-client-api.c` (client request/reply).

pub mod client;
pub mod server;

pub use client::{mount, ClientError, Connection};
pub use server::{run, ServerContext};

use crate::config::ServerConfig;
use crate::tree::Tree;

impl ServerContext {
    pub fn new(config: ServerConfig) -> Self {
        let tree = Tree::new(config.inode_table_size, config.max_dir_entries, config.move_backoff_ms);
        ServerContext { tree, config }
    }
}
