//! Command-line flags.
//!
//! Grounded on `sky-bench`/`sky-migrate`'s plain `clap::Parser` derive
//! rather than `server/src/config`'s multi-source `Configset` machinery:
//! this crate's surface is the three flags named in the spec, not a
//! merged file/env/cli configuration layer.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "literedis-server", about = "An in-memory, RESP-speaking key-value server")]
pub struct Cli {
    /// Run the server. Without this flag the binary parses its
    /// arguments and exits, matching the teacher CLIs' dry-run shape.
    #[arg(long)]
    pub serve: bool,

    /// Address to bind the TCP listener on.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind the TCP listener on.
    #[arg(long, default_value_t = 6379)]
    pub port: u16,

    /// Directory holding the RDB snapshot and AOF log.
    #[arg(long, default_value = "/tmp/redis-files")]
    pub dir: PathBuf,

    /// RDB snapshot filename, relative to `--dir`.
    #[arg(long, default_value = "redis.rdb")]
    pub dbfilename: String,

    /// Append-only log filename, relative to `--dir`.
    #[arg(long, default_value = "literedis.aof")]
    pub aof_filename: String,

    /// Maximum number of simultaneously connected clients.
    #[arg(long, default_value_t = 10_000)]
    pub max_connections: usize,
}
