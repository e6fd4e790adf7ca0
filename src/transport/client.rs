//! Client side of the transport (§6). Grounded on
//! `original_source/v3/client/tecnicofs-client-api.c` (`tfsMount`/`tfsCreate`/
//! `tfsDelete`/`tfsLookup`/`tfsMove`/`tfsUnmount`): one request datagram out, one
//! reply datagram back, no framing.

use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};

use anyhow::Context;
use thiserror::Error;

use crate::inode::NewInodeKind;

const MAX_REPLY: usize = 32;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("server reported failure for this request")]
    OperationFailed,
    #[error("malformed reply from server: '{0}'")]
    MalformedReply(String),
}

/// An established client connection: a bound local datagram socket plus the server's
/// socket path. Each call sends one request line and parses one integer reply.
pub struct Connection {
    socket: UnixDatagram,
    server_path: PathBuf,
    client_path: PathBuf,
}

/// Binds a client-side socket at `client_path` and records `server_path` as the
/// destination for every request (§6 `mount`). Mirrors `tfsMount`, except the client
/// socket path is caller-chosen rather than hardcoded, so more than one client can
/// run at once.
pub fn mount(server_path: impl AsRef<Path>, client_path: impl AsRef<Path>) -> anyhow::Result<Connection> {
    let client_path = client_path.as_ref().to_path_buf();
    let _ = std::fs::remove_file(&client_path);
    let socket = UnixDatagram::bind(&client_path)
        .with_context(|| format!("binding client socket at {}", client_path.display()))?;
    Ok(Connection {
        socket,
        server_path: server_path.as_ref().to_path_buf(),
        client_path,
    })
}

impl Connection {
    /// Sends an already-formatted request line verbatim and returns the raw status.
    /// Used by the batch client binary, which replays pre-written command lines
    /// instead of building them through the typed helpers below.
    pub fn raw(&self, line: &str) -> anyhow::Result<i32> {
        self.request(line)
    }

    fn request(&self, line: &str) -> anyhow::Result<i32> {
        self.socket
            .send_to(line.as_bytes(), &self.server_path)
            .with_context(|| format!("sending request to {}", self.server_path.display()))?;
        let mut buf = [0u8; MAX_REPLY];
        let n = self.socket.recv(&mut buf).context("receiving reply from server")?;
        let text = std::str::from_utf8(&buf[..n]).context("server reply was not valid utf-8")?;
        text.trim()
            .parse::<i32>()
            .map_err(|_| ClientError::MalformedReply(text.to_string()).into())
    }

    pub fn create(&self, path: &str, kind: NewInodeKind) -> anyhow::Result<()> {
        let kind_char = match kind {
            NewInodeKind::File => 'f',
            NewInodeKind::Directory => 'd',
        };
        status_to_result(self.request(&format!("c {path} {kind_char}"))?)
    }

    pub fn delete(&self, path: &str) -> anyhow::Result<()> {
        status_to_result(self.request(&format!("d {path}"))?)
    }

    /// Returns the resolved inumber on success.
    pub fn lookup(&self, path: &str) -> anyhow::Result<i32> {
        let status = self.request(&format!("l {path}"))?;
        if status < 0 {
            Err(ClientError::OperationFailed.into())
        } else {
            Ok(status)
        }
    }

    pub fn move_node(&self, from: &str, to: &str) -> anyhow::Result<()> {
        status_to_result(self.request(&format!("m {from} {to}"))?)
    }

    pub fn dump(&self, out_path: &str) -> anyhow::Result<()> {
        status_to_result(self.request(&format!("p {out_path}"))?)
    }

    /// Unbinds the client socket and removes its path (§6 `unmount`).
    pub fn unmount(self) -> anyhow::Result<()> {
        std::fs::remove_file(&self.client_path)
            .with_context(|| format!("removing client socket at {}", self.client_path.display()))
    }
}

fn status_to_result(status: i32) -> anyhow::Result<()> {
    if status == 0 {
        Ok(())
    } else {
        Err(ClientError::OperationFailed.into())
    }
}
