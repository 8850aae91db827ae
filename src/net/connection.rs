//! Per-connection read/dispatch/write loop.

use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;

use crate::dispatch;
use crate::dispatch::streams::{parse_xread, xread_scan};
use crate::resp::{ParseOutcome, Parser, Value};
use crate::store::Corestore;

/// How long an indefinite `XREAD ... BLOCK 0` is allowed to sit idle
/// before this implementation gives up and returns a null reply. Real
/// Redis blocks forever; this crate bounds it so a single connection
/// cannot pin a task indefinitely, and documents the deviation here
/// rather than in the wire contract (the client sees the same reply
/// shape it would see from a timeout).
const INDEFINITE_BLOCK_CEILING: Duration = Duration::from_secs(24 * 60 * 60);

const READ_CHUNK: usize = 4096;

pub struct ConnectionHandler {
    stream: TcpStream,
    store: Corestore,
    inbuf: BytesMut,
    outbuf: BytesMut,
    termination_signal: broadcast::Receiver<()>,
}

impl ConnectionHandler {
    pub fn new(stream: TcpStream, store: Corestore, termination_signal: broadcast::Receiver<()>) -> Self {
        Self { stream, store, inbuf: BytesMut::with_capacity(READ_CHUNK), outbuf: BytesMut::new(), termination_signal }
    }

    pub async fn run(mut self) {
        loop {
            match self.process_one_frame().await {
                Ok(true) => continue,
                Ok(false) => {
                    if !self.read_more().await {
                        break;
                    }
                }
                Err(()) => break,
            }
        }
    }

    /// Tries to parse and execute one buffered frame. Returns `Ok(true)`
    /// if it did, `Ok(false)` if more bytes are needed, `Err(())` on a
    /// fatal protocol error or shutdown signal.
    async fn process_one_frame(&mut self) -> Result<bool, ()> {
        if self.inbuf.is_empty() {
            return Ok(false);
        }
        let outcome = match Parser::parse(&self.inbuf) {
            Ok(o) => o,
            Err(e) => {
                log::warn!("protocol error: {e:?}");
                self.write_value(&Value::error(format!("ERR Protocol error: {e:?}"))).await;
                return Err(());
            }
        };
        let (value, consumed) = match outcome {
            ParseOutcome::Complete(v, n) => (v, n),
            ParseOutcome::Incomplete => return Ok(false),
        };
        self.inbuf.advance_drain(consumed);
        let Some(args) = value.into_command_args() else {
            self.write_value(&Value::error("ERR Protocol error: expected command array")).await;
            return Err(());
        };
        if args.is_empty() {
            return Ok(true);
        }
        let verb = String::from_utf8_lossy(&args[0]).to_ascii_uppercase();
        let response = if verb == "XREAD" {
            self.handle_xread(args).await
        } else {
            dispatch::execute(&self.store, args)
        };
        self.write_value(&response).await;
        Ok(true)
    }

    async fn handle_xread(&mut self, args: Vec<bytes::Bytes>) -> Value {
        let opts = match parse_xread(&args) {
            Ok(o) => o,
            Err(e) => return e.into_value(),
        };
        let immediate = match xread_scan(&self.store, &opts) {
            Ok(v) => v,
            Err(e) => return e.into_value(),
        };
        let Some(block_ms) = opts.block_ms else {
            return immediate;
        };
        if !matches!(immediate, Value::NullArray) {
            return immediate;
        }
        let deadline = tokio::time::Instant::now() + block_ms.map(Duration::from_millis).unwrap_or(INDEFINITE_BLOCK_CEILING);
        loop {
            let notified = self.store.0.notify.notified();
            tokio::select! {
                _ = notified => {}
                _ = tokio::time::sleep_until(deadline) => return Value::NullArray,
                _ = self.termination_signal.recv() => return Value::NullArray,
            }
            match xread_scan(&self.store, &opts) {
                Ok(Value::NullArray) => {
                    if tokio::time::Instant::now() >= deadline {
                        return Value::NullArray;
                    }
                }
                Ok(v) => return v,
                Err(e) => return e.into_value(),
            }
        }
    }

    async fn write_value(&mut self, value: &Value) {
        self.outbuf.clear();
        value.write_into(&mut self.outbuf);
        if let Err(e) = self.stream.write_all(&self.outbuf).await {
            log::debug!("write error, closing connection: {e}");
        }
    }

    /// Reads more bytes from the socket into `inbuf`. Returns `false`
    /// on EOF, error, or shutdown signal.
    async fn read_more(&mut self) -> bool {
        let mut chunk = [0u8; READ_CHUNK];
        tokio::select! {
            result = self.stream.read(&mut chunk) => {
                match result {
                    Ok(0) => false,
                    Ok(n) => {
                        self.inbuf.extend_from_slice(&chunk[..n]);
                        true
                    }
                    Err(e) => {
                        log::debug!("read error, closing connection: {e}");
                        false
                    }
                }
            }
            _ = self.termination_signal.recv() => false,
        }
    }
}

/// A small extension so call sites read naturally; `BytesMut::advance`
/// (via `bytes::Buf`) would also work but pulling in the trait just for
/// this one call site isn't worth it.
trait DrainFront {
    fn advance_drain(&mut self, n: usize);
}

impl DrainFront for BytesMut {
    fn advance_drain(&mut self, n: usize) {
        let _ = self.split_to(n);
    }
}
