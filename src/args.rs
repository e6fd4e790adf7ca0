//! Command-line argument parsing for both binaries.

use clap::Parser;

/// `tecnicofs-server numthreads socketname [--config <path>]`
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct ServerArgs {
    /// Size of the worker thread pool. Must be a positive integer.
    pub numthreads: usize,

    /// Socket file name, created under `/tmp/`.
    pub socketname: String,

    #[arg(
        long,
        help = "Path to configuration file in TOML format",
        default_value_t = String::from("./config.toml"),
    )]
    pub config: String,
}

/// `tecnicofs-client inputfile outputfile numthreads socketname`
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct ClientArgs {
    /// File of newline-separated request lines to replay against the server.
    pub inputfile: String,

    /// Where to write one reply status per line, in request order.
    pub outputfile: String,

    /// Number of concurrent client connections replaying `inputfile`.
    pub numthreads: usize,

    /// Socket file name of the running server, under `/tmp/`.
    pub socketname: String,
}
