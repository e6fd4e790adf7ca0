//! Server side of the transport (§4.5, §6): one listening thread feeds a bounded
//! queue, a pool of workers drains it. Grounded on
//! `original_source/v3/server/tecnicofs-server.c` — `process_client`'s receive loop
//! for the listener, and `threads_waiting_client`/`printing`/`process_commands` for
//! the `print_tree` barrier, reimplemented with `std::sync::Condvar` in place of the
//! original's busy-wait on a plain `int`.

use std::fs;
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use anyhow::Context;
use log::{debug, info, warn};

use crate::config::ServerConfig;
use crate::dispatcher::{self, Command};
use crate::queue::Queue;
use crate::tree::Tree;

/// Longest request line accepted; comfortably covers two full paths plus opcode and
/// separators at the configured maximum path length.
const MAX_DATAGRAM: usize = 4096;
const QUEUE_CAPACITY: usize = 64;

/// Shared, read-only-after-construction state handed to every worker (§9): the tree
/// itself plus the bounds workers need when parsing requests.
pub struct ServerContext {
    pub tree: Tree,
    pub config: ServerConfig,
}

struct Request {
    line: String,
    reply_path: PathBuf,
}

struct BarrierState {
    idle: usize,
    num_workers: usize,
    printing: bool,
}

/// Coordinates the `print_tree` global barrier (§5): a dump waits until every other
/// worker is idle, then runs alone while new dispatches are held off.
struct Barrier {
    state: Mutex<BarrierState>,
    changed: Condvar,
}

impl Barrier {
    fn new(num_workers: usize) -> Self {
        Barrier {
            state: Mutex::new(BarrierState { idle: 0, num_workers, printing: false }),
            changed: Condvar::new(),
        }
    }

    /// Marks this worker parked at the queue, about to wait for its next command —
    /// the analogue of `threads_waiting_client++` right before `recvfrom`.
    fn mark_idle(&self) {
        let mut state = self.state.lock().unwrap();
        state.idle += 1;
        self.changed.notify_all();
    }

    fn mark_busy(&self) {
        let mut state = self.state.lock().unwrap();
        state.idle -= 1;
        self.changed.notify_all();
    }

    /// Parks this worker while another one is mid-dump.
    fn wait_if_printing(&self) {
        let mut state = self.state.lock().unwrap();
        while state.printing {
            state = self.changed.wait(state).unwrap();
        }
    }

    /// Blocks until every other worker is idle and no other dump is in progress,
    /// then marks a dump in progress. Matches
    /// `while(threads_waiting_client < numberThreads - 1)`, extended with a check
    /// against a concurrent printer: two `p` commands popped back to back must not
    /// both observe the idle threshold and print at once, so `printing` is part of
    /// the same wait condition, checked and set while still holding the mutex.
    fn begin_printing(&self) {
        let mut state = self.state.lock().unwrap();
        while state.printing || state.idle < state.num_workers - 1 {
            state = self.changed.wait(state).unwrap();
        }
        state.printing = true;
    }

    fn finish_printing(&self) {
        let mut state = self.state.lock().unwrap();
        state.printing = false;
        self.changed.notify_all();
    }
}

/// Binds the server socket at `socket_path`, spawns `num_threads` workers, and runs
/// the listener loop on the calling thread. Never returns under normal operation —
/// the original project has no graceful shutdown path either, the process is killed
/// to stop the server.
pub fn run(context: Arc<ServerContext>, socket_path: &Path, num_threads: usize) -> anyhow::Result<()> {
    let _ = fs::remove_file(socket_path);
    let socket = UnixDatagram::bind(socket_path)
        .with_context(|| format!("binding server socket at {}", socket_path.display()))?;
    info!("listening on {}", socket_path.display());

    let queue: Arc<Queue<Request>> = Arc::new(Queue::new(QUEUE_CAPACITY));
    let barrier = Arc::new(Barrier::new(num_threads));

    for id in 0..num_threads {
        let queue = Arc::clone(&queue);
        let barrier = Arc::clone(&barrier);
        let context = Arc::clone(&context);
        let worker_socket = socket
            .try_clone()
            .with_context(|| "cloning server socket for a worker thread")?;
        thread::Builder::new()
            .name(format!("tecnicofs-worker-{id}"))
            .spawn(move || worker_loop(id, context, queue, barrier, worker_socket))
            .with_context(|| format!("spawning worker thread {id}"))?;
    }

    let mut buf = [0u8; MAX_DATAGRAM];
    loop {
        let (n, addr) = match socket.recv_from(&mut buf) {
            Ok(pair) => pair,
            Err(e) => {
                warn!("recv_from failed: {e}");
                continue;
            }
        };
        let Some(reply_path) = addr.as_pathname().map(Path::to_path_buf) else {
            warn!("dropping datagram from an unbound client socket");
            continue;
        };
        let line = String::from_utf8_lossy(&buf[..n]).into_owned();
        debug!("received: {line}");
        queue.push(Request { line, reply_path });
    }
}

fn worker_loop(
    id: usize,
    context: Arc<ServerContext>,
    queue: Arc<Queue<Request>>,
    barrier: Arc<Barrier>,
    socket: UnixDatagram,
) {
    loop {
        barrier.mark_idle();
        let request = match queue.pop() {
            Some(request) => request,
            None => {
                barrier.mark_busy();
                break;
            }
        };
        barrier.wait_if_printing();
        barrier.mark_busy();

        let status = match dispatcher::parse(
            &request.line,
            context.config.max_name_len,
            context.config.max_path_len,
        ) {
            Ok(Command::Dump(file)) => {
                barrier.begin_printing();
                let status = dispatcher::apply(&context.tree, &Command::Dump(file));
                barrier.finish_printing();
                status
            }
            Ok(command) => dispatcher::apply(&context.tree, &command),
            Err(e) => {
                warn!("worker {id}: {e}");
                -1
            }
        };

        let reply = status.to_string();
        if let Err(e) = socket.send_to(reply.as_bytes(), &request.reply_path) {
            warn!("worker {id}: failed to reply to {}: {e}", request.reply_path.display());
        }
    }
}
