use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

use tecnicofs::args::ServerArgs;
use tecnicofs::config::ServerConfig;
use tecnicofs::transport::{self, ServerContext};

fn main() {
    log4rs::init_file("log4rs.yaml", Default::default()).unwrap();
    if let Err(e) = run() {
        error!("{e:?}");
        eprintln!("tecnicofs-server: {e:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = ServerArgs::parse();
    if args.numthreads == 0 {
        anyhow::bail!("numthreads must be a positive integer");
    }

    let config = match ServerConfig::load(&PathBuf::from(&args.config)) {
        Ok(config) => config,
        Err(e) => {
            info!("could not load {}, using defaults ({e})", args.config);
            ServerConfig::default()
        }
    };

    let socket_path = PathBuf::from("/tmp").join(&args.socketname);
    let context = Arc::new(ServerContext::new(config));

    info!("starting tecnicofs-server with {} threads", args.numthreads);
    transport::run(context, &socket_path, args.numthreads)
}
