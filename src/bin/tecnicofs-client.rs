use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::Context;
use clap::Parser;
use log::{error, info};

use tecnicofs::args::ClientArgs;
use tecnicofs::transport::{self, Connection};

fn main() {
    log4rs::init_file("log4rs.yaml", Default::default()).unwrap();
    if let Err(e) = run() {
        error!("{e:?}");
        eprintln!("tecnicofs-client: {e:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = ClientArgs::parse();
    if args.numthreads == 0 {
        anyhow::bail!("numthreads must be a positive integer");
    }

    let input = fs::read_to_string(&args.inputfile).with_context(|| format!("reading {}", args.inputfile))?;
    let requests: Arc<Vec<String>> = Arc::new(
        input
            .lines()
            .map(str::to_string)
            .filter(|line| !line.trim().is_empty())
            .collect(),
    );

    let server_path = PathBuf::from("/tmp").join(&args.socketname);
    let next = Arc::new(Mutex::new(0usize));
    let replies: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(vec![String::new(); requests.len()]));

    let mut workers = Vec::with_capacity(args.numthreads);
    for id in 0..args.numthreads {
        let next = Arc::clone(&next);
        let replies = Arc::clone(&replies);
        let requests = Arc::clone(&requests);
        let server_path = server_path.clone();
        let client_path =
            std::env::temp_dir().join(format!("tecnicofs-client-{}-{id}", std::process::id()));

        workers.push(thread::spawn(move || -> anyhow::Result<()> {
            let connection = transport::mount(&server_path, &client_path)
                .with_context(|| format!("client worker {id} mounting"))?;
            loop {
                let index = {
                    let mut next = next.lock().unwrap();
                    if *next >= requests.len() {
                        break;
                    }
                    let index = *next;
                    *next += 1;
                    index
                };
                let status = apply_one(&connection, &requests[index]);
                replies.lock().unwrap()[index] = status;
            }
            connection.unmount()
        }));
    }

    for (id, worker) in workers.into_iter().enumerate() {
        worker
            .join()
            .expect("client worker thread panicked")
            .with_context(|| format!("client worker {id}"))?;
    }

    let replies = replies.lock().unwrap();
    let mut output = replies.join("\n");
    if !output.is_empty() {
        output.push('\n');
    }
    fs::write(&args.outputfile, output).with_context(|| format!("writing {}", args.outputfile))?;
    info!("processed {} requests", requests.len());
    Ok(())
}

fn apply_one(connection: &Connection, line: &str) -> String {
    match connection.raw(line) {
        Ok(status) => status.to_string(),
        Err(_) => "-1".to_string(),
    }
}
