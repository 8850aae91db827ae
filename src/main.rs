//! Binary entry point: parse flags, load durable state, run the
//! listener until `ctrl_c()`, save once more on the way out.
//!
//! Grounded on `server/src/main.rs`'s overall shape (logger init →
//! runtime build → run the network layer → await shutdown signal → log
//! a farewell line) minus the PID-file lock and terminal banner, which
//! have no counterpart in this crate's CLI surface.

use clap::Parser;

use literedis::cli::Cli;
use literedis::net::listener::{self, ServerConfig};
use literedis::persist::{aof, rdb};
use literedis::store::{Corestore, RdbPath};
use literedis::util::error::{Error, SkyResult};

#[cfg(not(target_env = "msvc"))]
use jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn main() {
    env_logger::Builder::new()
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_owned()))
        .init();

    let cli = Cli::parse();

    if !cli.serve {
        log::info!("not starting (pass --serve to run the server)");
        return;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("literedis-worker")
        .enable_all()
        .build()
        .expect("failed to build the tokio runtime");

    let exit = runtime.block_on(run(cli));
    drop(runtime);

    match exit {
        Ok(()) => {
            log::info!("literedis stopped cleanly");
        }
        Err(e) => {
            log::error!("fatal: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> SkyResult<()> {
    std::fs::create_dir_all(&cli.dir).map_err(|e| Error::io_extra(e, format!("creating data directory {}", cli.dir.display())))?;

    let rdb_path = RdbPath { dir: cli.dir.clone(), dbfilename: cli.dbfilename.clone() };
    let aof_path = cli.dir.join(&cli.aof_filename);

    // RDB first, then AOF on top, so the log can resurrect a key a
    // prior session deleted after its last snapshot (see DESIGN.md).
    let store = Corestore::with_rdb_path(None, rdb_path.clone());
    rdb::load(&rdb_path.full_path(), &store)?;
    aof::replay(&aof_path, &store)?;

    let writer = aof::AofWriter::open(&aof_path)?;
    *store.0.aof.lock() = Some(writer);

    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
    let cfg = ServerConfig { host: cli.host.clone(), port: cli.port, max_connections: cli.max_connections };

    let store_for_signal = store.clone();
    let rdb_path_for_signal = rdb_path.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        log::info!("received shutdown signal");
        let ks = store_for_signal.0.keyspace.lock();
        if let Err(e) = rdb::save(&rdb_path_for_signal.full_path(), &ks) {
            log::warn!("failed to save RDB snapshot on shutdown: {e}");
        }
        drop(ks);
        let _ = shutdown_tx.send(());
    });

    listener::run(cfg, store, shutdown_rx).await
}
